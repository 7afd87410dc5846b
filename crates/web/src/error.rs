//! Error types of the web layer.
//!
//! [`ServerError`] is returned by the lifecycle calls, [`RouterError`] by
//! [`RouterBuilder::build`](crate::router::RouterBuilder::build) and
//! [`HandlerError`] by request handlers. A [`HandlerError`] never escapes a
//! connection: it is logged and answered with `500 Internal Server Error`.

use std::error::Error;
use std::io;

use thiserror::Error;

use crate::asset::AssetError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid port {port}, expect a value in 1..=65535")]
    InvalidPort { port: u32 },

    #[error("can't bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("server is already running")]
    AlreadyRunning,
}

impl ServerError {
    pub fn configuration<S: ToString>(str: S) -> Self {
        Self::Configuration { reason: str.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl RouterError {
    pub fn invalid_pattern<P: ToString, S: ToString>(pattern: P, reason: S) -> Self {
        Self::InvalidPattern { pattern: pattern.to_string(), reason: reason.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The server was set up with something that can't be served, such as a
    /// pinned asset that does not exist.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("internal error: {source}")]
    Internal {
        #[from]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl HandlerError {
    pub fn configuration<S: ToString>(str: S) -> Self {
        Self::Configuration { reason: str.to_string() }
    }

    pub fn internal<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Internal { source: e.into() }
    }
}

impl From<io::Error> for HandlerError {
    fn from(e: io::Error) -> Self {
        Self::internal(e)
    }
}

impl From<AssetError> for HandlerError {
    fn from(e: AssetError) -> Self {
        Self::internal(e)
    }
}
