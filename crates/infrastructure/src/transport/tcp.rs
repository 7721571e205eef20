use super::next_connection_id;
use ferrous_orb_domain::{Connection, ContactInfo};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::hash::{Hash, Hasher};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// A TCP endpoint plus the connect timeout used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TcpContactInfo {
    addr: SocketAddr,
    connect_timeout: Duration,
}

impl TcpContactInfo {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl ContactInfo for TcpContactInfo {
    type Connection = TcpConnection;

    fn create_connection(&self) -> io::Result<TcpConnection> {
        let socket = Socket::new(
            Domain::for_address(self.addr),
            Type::STREAM,
            Some(Protocol::TCP),
        )?;
        socket.set_keepalive(true)?;
        socket.connect_timeout(&SockAddr::from(self.addr), self.connect_timeout)?;

        let stream: TcpStream = socket.into();
        stream.set_nodelay(true)?;

        let conn = TcpConnection {
            id: next_connection_id(),
            peer: self.addr,
            stream: Arc::new(stream),
        };
        debug!(id = conn.id, peer = %self.addr, "TCP connection opened");
        Ok(conn)
    }
}

/// Shared handle to one TCP stream. Clones refer to the same stream;
/// identity is the connection id.
#[derive(Debug, Clone)]
pub struct TcpConnection {
    id: u64,
    peer: SocketAddr,
    stream: Arc<TcpStream>,
}

impl TcpConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// The stream for request/response I/O. `&TcpStream` implements
    /// `Read` and `Write`.
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Wraps a stream produced by an acceptor, for inbound caches.
    pub fn from_accepted(stream: TcpStream) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        Ok(Self {
            id: next_connection_id(),
            peer,
            stream: Arc::new(stream),
        })
    }
}

impl PartialEq for TcpConnection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TcpConnection {}

impl Hash for TcpConnection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Connection for TcpConnection {
    fn close(&self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}
