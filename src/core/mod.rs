//! Core data types for format identification.
//!
//! Plain records shared by the signature engine and the identification pipeline:
//! catalogue formats, submitted requests, and the results handed back to callers.

pub mod format;
pub mod request;
pub mod result;

pub use format::FileFormat;
pub use request::{IdGenerator, IdentificationRequest, RequestIdentifier, RequestMetaData};
pub use result::{
    IdentificationMethod, IdentificationResult, IdentificationResultCollection, Specificity,
};
