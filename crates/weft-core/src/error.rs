#![forbid(unsafe_code)]

//! Error type for the few operations that can fail.
//!
//! Policy violations (adding a root-level property at runtime, mutating a
//! primitive) are not errors; they are reported through the warning channel
//! and otherwise ignored. The variants below are either implementation
//! defects in the caller (context stack misuse) or input validation failures
//! at the edges (configuration, value conversion).

use thiserror::Error;

use crate::dep::SubscriberId;

pub type Result<T> = std::result::Result<T, ReactivityError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactivityError {
    #[error("evaluation context stack underflow: pop without matching push")]
    StackUnderflow,

    #[error("evaluation context mismatch: expected {expected:?}, popped {found:?}")]
    ContextMismatch {
        expected: Option<SubscriberId>,
        found: Option<SubscriberId>,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidConfig { var: &'static str, value: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl ReactivityError {
    #[must_use]
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Whether this error indicates a broken push/pop pairing.
    #[must_use]
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::StackUnderflow | Self::ContextMismatch { .. })
    }
}
