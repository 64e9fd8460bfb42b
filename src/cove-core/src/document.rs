use serde_json::Value;

use crate::view::DesignDocument;

/// A document loaded from the server, classified by the `_id` discriminant
/// rather than by any type metadata embedded in the body.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// `_design/*`: holds views and server-side logic.
    Design(DesignDocument),
    /// `_local/*`: node-local, never replicated.
    Local(Value),
    /// Any other id: an ordinary user document.
    Generic(Value),
}

impl Document {
    /// Classify a decoded document body by its `_id` prefix. Bodies whose
    /// `_id` marks them as design documents must decode as one.
    pub fn from_value(body: Value) -> Result<Self, serde_json::Error> {
        let id = body.get("_id").and_then(Value::as_str).unwrap_or_default();
        if id.starts_with("_design/") {
            Ok(Document::Design(serde_json::from_value(body)?))
        } else if id.starts_with("_local/") {
            Ok(Document::Local(body))
        } else {
            Ok(Document::Generic(body))
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Document::Design(doc) => Some(&doc.id),
            Document::Local(body) | Document::Generic(body) => {
                body.get("_id").and_then(Value::as_str)
            }
        }
    }
}
