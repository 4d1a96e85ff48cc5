//! Pre-parsed signature catalogues.
//!
//! Catalogues arrive as JSON: a binary catalogue of formats and their signatures, and
//! a container catalogue of entry-based signatures plus their format mappings.
//! Expressions stay as text here and are compiled when an engine is built.

use crate::core::FileFormat;
use crate::identify::container::ContainerKind;
use crate::signature::SignatureLoadError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One byte sequence as `(anchor keyword, expression)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDefinition {
    pub anchor: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl SequenceDefinition {
    pub fn new(anchor: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            expression: expression.into(),
            tag: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDefinition {
    pub id: u32,
    /// Specific signatures outrank generic ones for the same format.
    #[serde(default)]
    pub specific: bool,
    pub sequences: Vec<SequenceDefinition>,
    /// PUIDs this signature identifies. Unused inside container entries.
    #[serde(default)]
    pub formats: Vec<String>,
}

/// The binary signature catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinarySignatureDefinitions {
    #[serde(default)]
    pub version: String,
    pub formats: Vec<FileFormat>,
    #[serde(default)]
    pub signatures: Vec<SignatureDefinition>,
}

/// An entry that must be present in the archive, optionally with content checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerFileDefinition {
    pub path: String,
    #[serde(default)]
    pub signatures: Vec<SignatureDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSignatureDefinition {
    pub id: u32,
    #[serde(default)]
    pub description: String,
    pub container_type: ContainerKind,
    pub files: Vec<ContainerFileDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatMapping {
    pub signature_id: u32,
    pub puid: String,
}

/// The container signature catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSignatureDefinitions {
    #[serde(default)]
    pub version: String,
    pub signatures: Vec<ContainerSignatureDefinition>,
    #[serde(default)]
    pub format_mappings: Vec<FormatMapping>,
}

/// A catalogue file of either kind.
#[derive(Debug, Clone)]
pub enum SignatureFile {
    Binary(BinarySignatureDefinitions),
    Container(ContainerSignatureDefinitions),
}

impl BinarySignatureDefinitions {
    pub fn from_json_str(json: &str) -> Result<Self, SignatureLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SignatureLoadError> {
        Self::from_json_str(&read(path.as_ref())?)
    }
}

impl ContainerSignatureDefinitions {
    pub fn from_json_str(json: &str) -> Result<Self, SignatureLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SignatureLoadError> {
        Self::from_json_str(&read(path.as_ref())?)
    }
}

impl SignatureFile {
    /// Load a catalogue, telling the kinds apart by their top-level keys.
    pub fn from_json_str(json: &str) -> Result<Self, SignatureLoadError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let object = value
            .as_object()
            .ok_or(SignatureLoadError::UnknownFileType)?;
        if object.contains_key("format_mappings") {
            Ok(SignatureFile::Container(serde_json::from_value(value)?))
        } else if object.contains_key("formats") {
            Ok(SignatureFile::Binary(serde_json::from_value(value)?))
        } else {
            Err(SignatureLoadError::UnknownFileType)
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SignatureLoadError> {
        Self::from_json_str(&read(path.as_ref())?)
    }
}

fn read(path: &Path) -> Result<String, SignatureLoadError> {
    std::fs::read_to_string(path).map_err(|source| SignatureLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}
