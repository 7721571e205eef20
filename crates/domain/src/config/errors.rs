use std::io;

/// Failures while loading, validating or saving an ORB configuration.
///
/// File errors keep the underlying `io::Error` as their source so the binary
/// can report the OS cause next to the path.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read ORB config {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write ORB config {path}: {source}")]
    FileWrite {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Malformed TOML, or a config that cannot be serialized back.
    #[error("Invalid ORB config: {0}")]
    Parse(String),

    /// A cache bound or load-driver parameter out of range. The message
    /// names the offending field.
    #[error("ORB config rejected: {0}")]
    Validation(String),
}

impl ConfigError {
    /// Path of the file involved, for file errors.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::FileRead { path, .. } | Self::FileWrite { path, .. } => Some(path),
            Self::Parse(_) | Self::Validation(_) => None,
        }
    }
}
