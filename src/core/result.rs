//! Identification results.

use crate::core::format::FileFormat;
use crate::core::request::{RequestIdentifier, RequestMetaData};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentificationMethod {
    Binary,
    Container,
    Extension,
}

impl fmt::Display for IdentificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdentificationMethod::Binary => "Signature",
            IdentificationMethod::Container => "Container",
            IdentificationMethod::Extension => "Extension",
        })
    }
}

/// Whether a hit came from a generic or a precise signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specificity {
    Generic,
    Specific,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationResult {
    pub puid: String,
    pub name: String,
    pub version: Option<String>,
    pub mime_type: Option<String>,
    pub method: IdentificationMethod,
    pub specificity: Specificity,
    /// The claimed extension is not one the format registers.
    pub extension_mismatch: bool,
}

impl IdentificationResult {
    pub fn from_format(
        format: &FileFormat,
        method: IdentificationMethod,
        specificity: Specificity,
    ) -> Self {
        Self {
            puid: format.puid.clone(),
            name: format.name.clone(),
            version: format.version.clone(),
            mime_type: format.mime_type.clone(),
            method,
            specificity,
            extension_mismatch: false,
        }
    }
}

/// The ordered results of one identification, with the request's facts attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationResultCollection {
    results: Vec<IdentificationResult>,
    file_length: Option<u64>,
    request_metadata: Option<RequestMetaData>,
    request_identifier: Option<RequestIdentifier>,
}

impl IdentificationResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a result. A PUID appears once; a specific hit replaces a generic one.
    pub fn add_result(&mut self, result: IdentificationResult) {
        match self.results.iter_mut().find(|r| r.puid == result.puid) {
            Some(existing) => {
                if existing.specificity == Specificity::Generic
                    && result.specificity == Specificity::Specific
                {
                    *existing = result;
                }
            }
            None => self.results.push(result),
        }
    }

    pub fn results(&self) -> &[IdentificationResult] {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut [IdentificationResult] {
        &mut self.results
    }

    /// Drop every result the predicate selects; returns how many went.
    pub fn remove_where<F: FnMut(&IdentificationResult) -> bool>(&mut self, mut remove: F) -> usize {
        let before = self.results.len();
        self.results.retain(|r| !remove(r));
        before - self.results.len()
    }

    pub fn contains(&self, puid: &str) -> bool {
        self.results.iter().any(|r| r.puid == puid)
    }

    pub fn puids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.puid.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn file_length(&self) -> Option<u64> {
        self.file_length
    }

    pub fn set_file_length(&mut self, length: u64) {
        self.file_length = Some(length);
    }

    pub fn request_metadata(&self) -> Option<&RequestMetaData> {
        self.request_metadata.as_ref()
    }

    pub fn set_request_metadata(&mut self, metadata: RequestMetaData) {
        self.request_metadata = Some(metadata);
    }

    pub fn request_identifier(&self) -> Option<&RequestIdentifier> {
        self.request_identifier.as_ref()
    }

    pub fn set_request_identifier(&mut self, identifier: RequestIdentifier) {
        self.request_identifier = Some(identifier);
    }
}

impl<'a> IntoIterator for &'a IdentificationResultCollection {
    type Item = &'a IdentificationResult;
    type IntoIter = std::slice::Iter<'a, IdentificationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
