//! The error kinds the engine surfaces to its callers.
//!
//! One enum serves every layer (codec, page engine, fsm, file store, table
//! manager): there's no sub-layer here with failure modes distinct enough
//! to warrant its own error type, so `Error` is built once at the crate
//! root and threaded through with `?` rather than composed upward through
//! a chain of per-layer `From` impls.

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("table or schema file not found: {0}")]
    NotFound(String),
    #[error("table already exists: {0}")]
    AlreadyExists(String),
    #[error("value for column {column} has the wrong type: expected {expected}, got {got}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("malformed on-disk buffer: {0}")]
    Decode(String),
    #[error("invalid filter/projection plan: {0}")]
    PlanInvalid(String),
    #[error("fsm data is not compatible with table: {0}")]
    Inconsistent(String),
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
