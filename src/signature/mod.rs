//! Byte pattern signatures: the expression language, its compiled model, and matching.
//!
//! Expressions compile into a [`ByteSequence`]; a [`SequenceMatcher`] evaluates one
//! against a byte source. [`InternalSignature`]s group sequences that must all match.

pub mod anchor;
pub mod collection;
pub mod compiler;
pub mod error;
pub mod matcher;
pub mod sequence;
pub mod serializer;
pub mod xml;

pub use anchor::Anchor;
pub use collection::{InternalSignature, InternalSignatureCollection};
pub use compiler::{compile, compile_anchored};
pub use error::{CompileError, CompileErrorKind, SignatureLoadError};
pub use matcher::{matches, SequenceMatcher};
pub use sequence::{ByteClass, ByteSequence, Gap, SubSequence, Token};
pub use serializer::{serialize, Syntax};
pub use xml::{from_xml, to_xml, to_xml_pretty};
