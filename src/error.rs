use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by [`crate::connection::Client`].
///
/// Adapters translate protocol errors into one of these kinds before they
/// leave the adapter, so callers never see `suppaftp` or `ssh2` types.
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication or network failure while opening a session.
    #[error("unable to connect to {host}: {message}")]
    Connection { host: String, message: String },

    /// The requested remote file or directory does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A fetch or put did not complete; the file should be treated as not
    /// transferred.
    #[error("transfer of {name} failed: {message}")]
    Transfer { name: String, message: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A malformed field on a single listing entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognised permission string {0:?}")]
    Permissions(String),

    #[error("unrecognised timestamp {0:?}")]
    Timestamp(String),

    #[error("malformed listing entry {0:?}")]
    Entry(String),
}

impl Error {
    pub(crate) fn connection(host: &str, message: impl std::fmt::Display) -> Self {
        Self::Connection {
            host: host.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn transfer(name: &str, message: impl std::fmt::Display) -> Self {
        Self::Transfer {
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
