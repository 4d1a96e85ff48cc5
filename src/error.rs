//! Top-level error type for formatid.
//!
//! Each area keeps its own error enum; [`FormatIdError`] rolls them up into the four
//! categories callers act on, each with a stable process exit code.

use crate::io::error::IoError;
use crate::signature::{CompileError, SignatureLoadError};
use thiserror::Error;

/// Stable exit codes, one per error category.
pub mod exit_codes {
    /// Bad command-line usage.
    pub const USAGE: i32 = 1;
    pub const COMPILE: i32 = 3;
    pub const SIGNATURE_LOAD: i32 = 10;
    pub const IO: i32 = 19;
    pub const INVARIANT_VIOLATION: i32 = 70;
}

#[derive(Debug, Error)]
pub enum FormatIdError {
    /// A malformed pattern expression.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// A malformed or unreadable signature catalogue.
    #[error("Signature load error: {0}")]
    SignatureLoad(#[from] SignatureLoadError),

    /// A submitted file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An internal state that should be impossible.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<std::io::Error> for FormatIdError {
    fn from(err: std::io::Error) -> Self {
        FormatIdError::Io(IoError::StdIo(err))
    }
}

impl FormatIdError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FormatIdError::Compile(_) => exit_codes::COMPILE,
            FormatIdError::SignatureLoad(_) => exit_codes::SIGNATURE_LOAD,
            FormatIdError::Io(_) => exit_codes::IO,
            FormatIdError::InvariantViolation(_) => exit_codes::INVARIANT_VIOLATION,
        }
    }
}

pub type Result<T> = std::result::Result<T, FormatIdError>;

/// Exit code for an error that reached a binary's `main`, looking through context.
pub fn exit_code_of(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<FormatIdError>() {
        e.exit_code()
    } else if err.downcast_ref::<CompileError>().is_some() {
        exit_codes::COMPILE
    } else if err.downcast_ref::<SignatureLoadError>().is_some() {
        exit_codes::SIGNATURE_LOAD
    } else if err.downcast_ref::<IoError>().is_some()
        || err.downcast_ref::<std::io::Error>().is_some()
    {
        exit_codes::IO
    } else {
        exit_codes::USAGE
    }
}
