use crate::codec::CodecError;
use thiserror::Error;

/// Misuse of the [`PacketWrapper`](crate::PacketWrapper) contract by a transform.
/// These are bugs in a handler, not bad input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreconditionViolation {
    #[error("field {index} was never written ({written} fields emitted)")]
    FieldNotWritten { index: usize, written: usize },
    #[error("field {index} was written as {expected}, cannot set it as {actual}")]
    FieldTypeMismatch {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Why a packet transform failed. Every variant is fatal to the connection.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Malformed packet: {0}")]
    Decode(#[from] CodecError),
    #[error("Transform bug: {0}")]
    Precondition(#[from] PreconditionViolation),
    #[error("No handler for {kind} '{value}'")]
    UnmappedDiscriminant { kind: &'static str, value: String },
}

pub type TransformResult<T> = Result<T, TransformError>;
