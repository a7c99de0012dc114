//! Errors - error taxonomy shared by stores, clients and the dispatcher.
//!
//! A transport failure while fetching is deliberately absent here: the fetch
//! client reports it as a degraded `Response`, not as an error.

use thiserror::Error;

use super::ids::RequestId;

/// ErrorKind is the coarse classification callers branch on
/// (the gateway maps it to a status code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Absent or malformed fetch spec / response.
    InvalidInput,
    /// HTTP verb outside GET/POST/DELETE.
    WrongMethod,
    /// Unknown request id.
    NotFound,
    /// The dispatcher no longer accepts jobs.
    Closed,
    /// Persistence layer or runtime failure.
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input data: {0}")]
    InvalidInput(String),

    #[error("wrong HTTP method: {0}")]
    WrongMethod(String),

    #[error("request not found: {0}")]
    NotFound(RequestId),

    #[error("dispatcher is closed")]
    DispatcherClosed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::WrongMethod(_) => ErrorKind::WrongMethod,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::DispatcherClosed => ErrorKind::Closed,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
