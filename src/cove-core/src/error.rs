use std::fmt;

/// Role a view function plays, used in validation diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Map,
    Reduce,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::Map => write!(f, "map"),
            FunctionKind::Reduce => write!(f, "reduce"),
        }
    }
}

/// Rejection of user-supplied view function source, raised before anything
/// is sent to the server.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    /// The source does not parse in the embedded function dialect.
    #[error("syntax error in {kind} function: {detail}")]
    Syntax { kind: FunctionKind, detail: String },

    /// The source parses but does not match the required signature shape.
    #[error("{kind} function does not match the required shape, expected `{expected}`")]
    Shape {
        kind: FunctionKind,
        expected: &'static str,
    },
}

/// Structurally invalid local input, detected before a request is built.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid argument: {0}")]
pub struct InvalidArgument(pub String);
