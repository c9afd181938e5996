//! Error handling for the host-stats crate.

use std::path::{Path, PathBuf};

/// A specialized `Result` type for host-stats operations.
pub type Result<T> = std::result::Result<T, SystemError>;

/// The main error type for host-stats operations.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Reading a host-mounted file failed
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Host data was present but could not be parsed
    #[error("Failed to parse system information: {0}")]
    ParseError(String),

    /// An external tool could not be spawned or exited unsuccessfully
    #[error("Command `{program}` failed: {reason}")]
    Command { program: String, reason: String },

    /// Serialization of a wire message failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Watch client error
    #[error("Client error: {0}")]
    Client(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SystemError {
    /// Create an I/O error that remembers the offending path
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a new command error
    pub fn command_error(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Command {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new client error
    pub fn client_error(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error means the source simply does not exist on this host.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
