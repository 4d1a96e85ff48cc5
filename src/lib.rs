//! File format identification by byte signatures.
//!
//! Signature expressions compile into [`ByteSequence`] models that are matched against
//! files anchored at the beginning, the end, or anywhere. The [`Engine`] combines the
//! binary pass with container-entry identification, format priorities and extension
//! checks into one result set per file.

/// Core data types module
pub mod core;
pub mod error;
pub mod identify;
pub mod io;
pub mod logging;
pub mod signature;

pub use crate::core::{
    FileFormat, IdentificationMethod, IdentificationRequest, IdentificationResult,
    IdentificationResultCollection, Specificity,
};
pub use crate::error::{FormatIdError, Result};
pub use crate::identify::{Engine, EngineConfig};
pub use crate::signature::{compile, Anchor, ByteSequence, CompileError, SignatureLoadError};
