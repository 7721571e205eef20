pub mod builders;
pub mod mock_transport;

#[allow(unused_imports)]
pub use builders::{inbound_caches, outbound_caches, Inbound, Outbound};
#[allow(unused_imports)]
pub use mock_transport::{MockConnection, MockContactInfo};
