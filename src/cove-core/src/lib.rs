//! CoveDb Core Library
//!
//! This crate provides the client-side core for CoveDb, including:
//! - View and design document definitions
//! - Map/reduce function validation for the embedded dialect
//! - Query options
//! - Sparse-result reconciliation and the query result collection
//! - Canonical JSON key hashing

pub mod canon;
pub mod document;
pub mod error;
pub mod query;
pub mod result;
pub mod script;
pub mod view;

// Re-export commonly used types
pub use canon::{canonical_json, key_digest};
pub use document::Document;
pub use error::{FunctionKind, InvalidArgument, ValidationError};
pub use query::{QueryOptions, StaleMode};
pub use result::{reconcile_missing_keys, QueryResult, ViewResponse, ViewRow};
pub use script::{Script, ScriptValidator, EMBEDDED_DIALECT};
pub use view::{BuiltInReduce, DesignDocument, Reduce, ViewDefinition};
