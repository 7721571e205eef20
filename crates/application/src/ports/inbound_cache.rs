use super::ConnectionCache;
use ferrous_orb_domain::Connection;

/// Server-side cache of connections discovered by an acceptor.
pub trait InboundConnectionCache<C: Connection>: ConnectionCache<C> {
    /// A request arrived on `conn`. Registers the connection if unknown.
    fn request_received(&self, conn: &C);

    /// The request finished processing; `num_responses_expected` responses
    /// are still owed on `conn`.
    fn request_processed(&self, conn: &C, num_responses_expected: usize);

    /// One owed response was written, or abandoned.
    fn response_sent(&self, conn: &C);
}
