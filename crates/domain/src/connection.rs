use std::fmt::Debug;
use std::hash::Hash;
use std::io;

/// A pooled, closeable transport resource (socket-like).
///
/// Implementations are cheap handles: the cache clones them into its
/// bookkeeping maps and LRU queues, so identity must come from `Eq`/`Hash`
/// and never from the address of the value.
pub trait Connection: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Closes the underlying resource. In-flight users of a closed
    /// connection may observe failures.
    fn close(&self) -> io::Result<()>;
}

/// Describes how to reach an endpoint and produces connections to it.
///
/// A `ContactInfo` owns no resources; it is only a factory key.
pub trait ContactInfo: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    type Connection: Connection;

    /// Opens a new connection. May block on I/O.
    fn create_connection(&self) -> io::Result<Self::Connection>;
}
