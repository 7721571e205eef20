use ferrous_orb_domain::ContactInfo;

/// Caller-supplied strategy that picks a connection for a ContactInfo.
///
/// `idle` and `busy` are snapshots of the connections of that ContactInfo,
/// oldest first. Returning `None` falls back to the cache's own selection.
pub trait ConnectionFinder<CI: ContactInfo>: Send + Sync {
    fn find(
        &self,
        contact_info: &CI,
        idle: &[CI::Connection],
        busy: &[CI::Connection],
    ) -> Option<CI::Connection>;
}

impl<CI, F> ConnectionFinder<CI> for F
where
    CI: ContactInfo,
    F: Fn(&CI, &[CI::Connection], &[CI::Connection]) -> Option<CI::Connection> + Send + Sync,
{
    fn find(
        &self,
        contact_info: &CI,
        idle: &[CI::Connection],
        busy: &[CI::Connection],
    ) -> Option<CI::Connection> {
        self(contact_info, idle, busy)
    }
}
