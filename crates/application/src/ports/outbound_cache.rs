use super::{ConnectionCache, ConnectionFinder};
use ferrous_orb_domain::{ConnectionError, ContactInfo};

/// Client-side cache of connections keyed by ContactInfo.
pub trait OutboundConnectionCache<CI: ContactInfo>: ConnectionCache<CI::Connection> {
    /// Per-ContactInfo creation bound.
    fn max_parallel_connections(&self) -> usize;

    /// Returns a connection for `contact_info` and marks it busy.
    ///
    /// Selection order: the finder's choice, then the oldest idle
    /// connection, then a new connection when creation is allowed, then a
    /// busy connection. Only a failed creation produces an error.
    fn get(
        &self,
        contact_info: &CI,
        finder: Option<&dyn ConnectionFinder<CI>>,
    ) -> Result<CI::Connection, ConnectionError>;

    /// Ends one `get` on `conn`, expecting `num_responses_expected` more
    /// responses on it.
    fn release(&self, conn: &CI::Connection, num_responses_expected: usize);

    /// One expected response arrived, or the caller gave up waiting for it.
    fn response_received(&self, conn: &CI::Connection);

    /// Whether `get` would be allowed to open a new connection for
    /// `contact_info` right now.
    fn can_create_new_connection(&self, contact_info: &CI) -> bool;
}
