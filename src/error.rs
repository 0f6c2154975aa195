//! Error types for designtree operations.
//!
//! Only whole-input problems surface here. Per-node and per-resource
//! failures are absorbed where they happen (see `convert::vector` and
//! `resources`).

use thiserror::Error;

/// Errors that can terminate a conversion before any tree is built.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid capture bundle: {0}")]
    InvalidCapture(#[from] CaptureError),

    #[error("Unsupported capture version: {0}")]
    UnsupportedCaptureVersion(String),
}

/// Structural problems found while validating a capture bundle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("capture bundle must be a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
