//! Concrete `ContactInfo`/`Connection` pairs.

pub mod loopback;
pub mod tcp;

pub use loopback::{LoopbackConnection, LoopbackContactInfo};
pub use tcp::{TcpConnection, TcpContactInfo};

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide connection identity. Never reused.
fn next_connection_id() -> u64 {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}
