//! CoveDb Client Library
//!
//! HTTP client for the CoveDb document database API: design document
//! management, map/reduce view queries, and reconciliation of sparse view
//! responses into complete, ordered result sets.

mod client;
mod config;
mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use transport::{HttpTransport, Method, Request, Response, Transport};

pub use cove_core::{
    Document, FunctionKind, InvalidArgument, QueryOptions, QueryResult, StaleMode,
    ValidationError, ViewRow,
};
pub use cove_core::view::{BuiltInReduce, DesignDocument, Reduce, ViewDefinition};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Non-success response; `error` and `reason` are the server's own
    /// words, passed through unmodified.
    #[error("server rejected request: {status} {error}: {reason}")]
    Remote {
        status: u16,
        error: String,
        reason: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
}

pub type Result<T> = std::result::Result<T, ClientError>;
