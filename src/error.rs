//! Error types for graph document persistence.

use crate::id::ObjectId;

/// Errors that abort a whole operation. Per-object failures during
/// deserialization are not represented here: they are logged and the batch
/// continues.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fragment after the first lacks a type, or the document cannot be
    /// sliced into fragments at all.
    #[error("malformed document: {reason}")]
    MalformedDocument { reason: String },

    /// A serialize or deserialize was started while one was already in
    /// flight on the same codec.
    #[error("nested {operation} is not supported")]
    ReentrantOperation { operation: &'static str },

    /// A required collaborator was missing, e.g. render-pass cleanup invoked
    /// without a command buffer.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// An object failed to produce its JSON fragment during a save.
    #[error("failed to encode object of type '{type_name}' ({id})")]
    ObjectEncode {
        type_name: String,
        id: ObjectId,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
