use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to create connection to {contact_info}: {source}")]
    CreationFailed {
        contact_info: String,
        #[source]
        source: io::Error,
    },
}

impl ConnectionError {
    pub fn creation_failed(contact_info: &impl std::fmt::Debug, source: io::Error) -> Self {
        Self::CreationFailed {
            contact_info: format!("{:?}", contact_info),
            source,
        }
    }

    /// Kind of the I/O error reported by the transport.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::CreationFailed { source, .. } => source.kind(),
        }
    }

    /// The transport error, untouched.
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::CreationFailed { source, .. } => source,
        }
    }

    pub fn into_io_error(self) -> io::Error {
        match self {
            Self::CreationFailed { source, .. } => source,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue node arena exhausted")]
    CapacityExhausted,
}
