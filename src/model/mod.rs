//! Network model loading.
//!
//! A persisted model is a UTF-8 JSON document, optionally packaged as a ZIP
//! archive with exactly one member. The document is parsed once, at load
//! time, into the typed tree representation; per-call code never touches
//! raw JSON. See [`loader`] for the document grammar.

pub mod loader;

use thiserror::Error;

/// Errors raised while loading or validating a network model.
///
/// Every variant is fatal for the model in question: callers either abort or
/// reject the model, there is no partial recovery.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Failed to read the model file.
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON.
    #[error("model is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The ZIP archive could not be opened or read.
    #[error("model archive is unreadable: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The document parses but violates the model grammar or invariants.
    #[error("malformed model: {0}")]
    Malformed(String),
}
