//! Format identification over signature catalogues.
//!
//! The [`Engine`] runs the binary signature pass, re-routes wrapper formats to the
//! container identifiers, applies format priorities and extension checks, and falls
//! back to extension-only identification when no signature matched.

pub mod api;
pub mod binary;
pub mod config;
pub mod container;
pub mod definitions;
pub mod priority;

pub use api::Engine;
pub use binary::BinarySignatureIdentifier;
pub use config::{ContainerConfig, EngineConfig, ExtensionFallback};
pub use container::{
    ContainerArchive, ContainerError, ContainerIdentifier, ContainerKind, Ole2Container,
    ZipContainer,
};
pub use definitions::{
    BinarySignatureDefinitions, ContainerFileDefinition, ContainerSignatureDefinition,
    ContainerSignatureDefinitions, FormatMapping, SequenceDefinition, SignatureDefinition,
    SignatureFile,
};
pub use priority::PriorityGraph;
