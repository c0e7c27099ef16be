#![forbid(unsafe_code)]

//! Runtime error type.

use thiserror::Error;
use weft_core::ReactivityError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// A watch path contains characters other than word characters, `$`
    /// and `.` separators, or an empty segment.
    #[error("invalid watch path {path:?}: only dot-delimited identifiers are accepted")]
    InvalidPath { path: String },

    #[error("app has been destroyed")]
    Destroyed,

    #[error(transparent)]
    Core(#[from] ReactivityError),
}
