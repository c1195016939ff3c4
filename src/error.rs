//! Error taxonomy shared by every engine operation.

use thiserror::Error;

/// Failure reported by an engine operation.
///
/// Every operation is a deterministic pure computation, so none of these are
/// worth retrying with the same input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A parameter is outside its allowed range or closed set of values.
    #[error("invalid {parameter}: {reason}")]
    Validation {
        parameter: &'static str,
        reason: String,
    },

    /// The input cannot produce a meaningful result (empty samples, no regions).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A palette lookup had nothing to look up in.
    #[error("lookup failed: {0}")]
    Lookup(String),
}

impl EngineError {
    pub(crate) fn validation(parameter: &'static str, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        EngineError::DegenerateInput(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
