//! Error types for the SceneTrack domain.
//!
//! The reconciliation engine itself never fails; these errors only cover the
//! fallible boundaries around it (schema loading, text codec, input I/O).
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all SceneTrack operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Schema errors ---
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    // --- Codec errors ---
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    // --- I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("Schema root must be a map of field id to descriptor, got {0}")]
    NotAMap(String),

    #[error("Invalid schema document: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("Failed to decode {format} text: {reason}")]
    Decode { format: String, reason: String },

    #[error("Failed to encode tracker as {format}: {reason}")]
    Encode { format: String, reason: String },

    #[error("Unsupported text format: {0}")]
    UnsupportedFormat(String),
}
