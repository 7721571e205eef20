#![allow(dead_code)]
use ferrous_orb_domain::{Connection, ContactInfo};
use parking_lot::Mutex;
use std::hash::{Hash, Hasher};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default)]
struct Endpoint {
    created: AtomicUsize,
    failures_left: AtomicUsize,
    fail_close: AtomicBool,
    create_delay_ms: AtomicU64,
    closed: Mutex<Vec<u64>>,
}

/// Contact info whose connections record their closes. Equality is by
/// name; clones share the same endpoint state.
#[derive(Debug, Clone)]
pub struct MockContactInfo {
    name: String,
    endpoint: Arc<Endpoint>,
}

impl MockContactInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: Arc::new(Endpoint::default()),
        }
    }

    /// The next `count` creations fail with `ConnectionRefused`.
    pub fn fail_next(&self, count: usize) -> &Self {
        self.endpoint.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Every close of this endpoint's connections reports an error.
    pub fn fail_close(&self) -> &Self {
        self.endpoint.fail_close.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_create_delay(self, delay: Duration) -> Self {
        self.set_create_delay(delay);
        self
    }

    /// Slows down later creations, including those of clones.
    pub fn set_create_delay(&self, delay: Duration) {
        self.endpoint
            .create_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.endpoint.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> Vec<u64> {
        self.endpoint.closed.lock().clone()
    }
}

impl PartialEq for MockContactInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for MockContactInfo {}

impl Hash for MockContactInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl ContactInfo for MockContactInfo {
    type Connection = MockConnection;

    fn create_connection(&self) -> io::Result<MockConnection> {
        let delay = self.endpoint.create_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        let failing = self
            .endpoint
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{} refused", self.name),
            ));
        }
        self.endpoint.created.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
            endpoint: Arc::clone(&self.endpoint),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MockConnection {
    pub id: u64,
    endpoint: Arc<Endpoint>,
}

impl MockConnection {
    /// A connection no cache has ever seen.
    pub fn stray() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
            endpoint: Arc::new(Endpoint::default()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.endpoint.closed.lock().contains(&self.id)
    }
}

impl PartialEq for MockConnection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MockConnection {}

impl Hash for MockConnection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Connection for MockConnection {
    fn close(&self) -> io::Result<()> {
        self.endpoint.closed.lock().push(self.id);
        if self.endpoint.fail_close.load(Ordering::SeqCst) {
            return Err(io::Error::other("close failed"));
        }
        Ok(())
    }
}
