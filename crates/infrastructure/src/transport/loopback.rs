use super::next_connection_id;
use ferrous_orb_domain::{Connection, ContactInfo};
use std::hash::{Hash, Hasher};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-process endpoint. Connections carry no I/O, only an open/closed flag,
/// which makes them suitable for load runs and cache tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoopbackContactInfo {
    name: Arc<str>,
}

impl LoopbackContactInfo {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ContactInfo for LoopbackContactInfo {
    type Connection = LoopbackConnection;

    fn create_connection(&self) -> io::Result<LoopbackConnection> {
        Ok(LoopbackConnection {
            id: next_connection_id(),
            endpoint: Arc::clone(&self.name),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoopbackConnection {
    id: u64,
    endpoint: Arc<str>,
    closed: Arc<AtomicBool>,
}

impl LoopbackConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl PartialEq for LoopbackConnection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LoopbackConnection {}

impl Hash for LoopbackConnection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Connection for LoopbackConnection {
    fn close(&self) -> io::Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_connection_is_distinct() {
        let contact = LoopbackContactInfo::new("orb-a");
        let a = contact.create_connection().unwrap();
        let b = contact.create_connection().unwrap();

        assert_ne!(a, b);
        assert_eq!(a.endpoint(), "orb-a");
    }

    #[test]
    fn test_close_is_visible_through_clones() {
        let conn = LoopbackContactInfo::new("orb-b").create_connection().unwrap();
        let copy = conn.clone();

        conn.close().unwrap();
        assert!(copy.is_closed());
        assert!(copy.close().is_ok());
    }
}
