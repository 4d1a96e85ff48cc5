//! Container identification.
//!
//! A binary hit on a generic wrapper format (ZIP or OLE2) re-routes identification to
//! the entries inside the archive. Each container signature names entries that must be
//! present and, optionally, binary signatures one of which must match the entry bytes.

pub mod ole2;
pub mod zip;

use crate::core::{
    FileFormat, IdentificationMethod, IdentificationRequest, IdentificationResult,
    IdentificationResultCollection, Specificity,
};
use crate::identify::binary::{compile_signature, new_collection, BinarySignatureIdentifier};
use crate::identify::config::{ContainerConfig, EngineConfig};
use crate::identify::definitions::ContainerSignatureDefinitions;
use crate::io::ByteSource;
use crate::signature::{InternalSignatureCollection, SignatureLoadError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, trace, warn};

pub use self::ole2::Ole2Container;
pub use self::zip::ZipContainer;

/// The closed set of wrapper formats that trigger container identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    #[serde(rename = "ZIP")]
    Zip,
    #[serde(rename = "OLE2")]
    Ole2,
}

impl ContainerKind {
    pub const ALL: [ContainerKind; 2] = [ContainerKind::Zip, ContainerKind::Ole2];

    /// The PUID of the generic wrapper format.
    pub fn trigger_puid(self) -> &'static str {
        match self {
            ContainerKind::Zip => "x-fmt/263",
            ContainerKind::Ole2 => "fmt/111",
        }
    }

    pub fn from_puid(puid: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.trigger_puid() == puid)
    }

    pub fn is_container_puid(puid: &str) -> bool {
        Self::from_puid(puid).is_some()
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ContainerKind::Zip => "ZIP",
            ContainerKind::Ole2 => "OLE2",
        })
    }
}

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("ZIP error: {0}")]
    Zip(#[from] ::zip::result::ZipError),

    #[error("Malformed compound document: {0}")]
    Ole2(&'static str),

    #[error("Archive lists {found} entries, limit is {limit}")]
    TooManyEntries { found: usize, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Named entries with byte streams.
pub trait ContainerArchive {
    fn contains(&self, name: &str) -> bool;

    /// Up to `max_bytes` of the named entry, or `None` when it does not exist.
    fn read_entry(&mut self, name: &str, max_bytes: u64) -> Result<Option<Bytes>, ContainerError>;
}

#[derive(Debug, Clone)]
struct ContainerFile {
    path: String,
    /// At least one must match the entry bytes. `None` checks presence only.
    signatures: Option<InternalSignatureCollection>,
}

#[derive(Debug, Clone)]
struct ContainerSignature {
    id: u32,
    description: String,
    files: Vec<ContainerFile>,
    formats: Vec<FileFormat>,
}

/// The container signatures of one wrapper kind.
#[derive(Debug, Clone)]
pub struct ContainerIdentifier {
    kind: ContainerKind,
    signatures: Vec<ContainerSignature>,
    config: ContainerConfig,
    max_bytes_to_scan: Option<u64>,
}

impl ContainerIdentifier {
    /// Build the identifier for `kind`, resolving format mappings against the binary
    /// catalogue.
    pub fn new(
        kind: ContainerKind,
        definitions: &ContainerSignatureDefinitions,
        binary: &BinarySignatureIdentifier,
        config: &EngineConfig,
    ) -> Result<Self, SignatureLoadError> {
        let mut ids = HashSet::new();
        for definition in &definitions.signatures {
            if !ids.insert(definition.id) {
                return Err(SignatureLoadError::DuplicateSignature(definition.id));
            }
            if definition.files.is_empty() {
                return Err(SignatureLoadError::EmptyContainerSignature(definition.id));
            }
        }

        let mut formats: HashMap<u32, Vec<FileFormat>> = HashMap::new();
        for mapping in &definitions.format_mappings {
            if !ids.contains(&mapping.signature_id) {
                return Err(SignatureLoadError::UnknownContainerSignature(
                    mapping.signature_id,
                ));
            }
            let format = binary
                .format(&mapping.puid)
                .ok_or_else(|| SignatureLoadError::UnknownFormat {
                    owner: format!("container signature {}", mapping.signature_id),
                    puid: mapping.puid.clone(),
                })?;
            formats
                .entry(mapping.signature_id)
                .or_default()
                .push(format.clone());
        }

        let mut signatures = Vec::new();
        'signatures: for definition in definitions
            .signatures
            .iter()
            .filter(|d| d.container_type == kind)
        {
            let mut files = Vec::with_capacity(definition.files.len());
            for file in &definition.files {
                let entry_signatures = if file.signatures.is_empty() {
                    None
                } else {
                    let mut collection = InternalSignatureCollection::new();
                    for sig in &file.signatures {
                        match compile_signature(sig, config.strict_signatures)? {
                            Some(compiled) => collection.add_signature(compiled),
                            None => {
                                warn!(
                                    container_signature = definition.id,
                                    entry = %file.path,
                                    "Skipping container signature with an entry signature that does not compile"
                                );
                                continue 'signatures;
                            }
                        }
                    }
                    Some(collection)
                };
                files.push(ContainerFile {
                    path: file.path.clone(),
                    signatures: entry_signatures,
                });
            }
            signatures.push(ContainerSignature {
                id: definition.id,
                description: definition.description.clone(),
                files,
                formats: formats.remove(&definition.id).unwrap_or_default(),
            });
        }

        debug!(
            kind = %kind,
            signatures = signatures.len(),
            "Loaded container signatures"
        );

        Ok(Self {
            kind,
            signatures,
            config: config.containers.clone(),
            max_bytes_to_scan: config.max_bytes_to_scan,
        })
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Identify the request by its archive entries.
    ///
    /// An archive that cannot be opened yields an empty collection; the caller then
    /// keeps the binary-level result.
    pub fn submit<S: ByteSource>(
        &self,
        request: &IdentificationRequest<S>,
    ) -> IdentificationResultCollection {
        let mut results = new_collection(request);
        let data = request.source().bytes();
        let uri = &request.identifier().uri;

        let outcome = match self.kind {
            ContainerKind::Zip => {
                ZipContainer::open(data, &self.config).map(|mut a| self.identify(&mut a))
            }
            ContainerKind::Ole2 => Ole2Container::open(data).map(|mut a| self.identify(&mut a)),
        };
        match outcome {
            Ok(formats) => {
                for format in formats {
                    results.add_result(IdentificationResult::from_format(
                        format,
                        IdentificationMethod::Container,
                        Specificity::Specific,
                    ));
                }
            }
            Err(error) => {
                warn!(uri = %uri, kind = %self.kind, error = %error, "Could not open container");
            }
        }

        debug!(uri = %uri, kind = %self.kind, hits = results.len(), "Container pass finished");
        results
    }

    fn identify<A: ContainerArchive>(&self, archive: &mut A) -> Vec<&FileFormat> {
        let mut cache: HashMap<&str, Option<Bytes>> = HashMap::new();
        let mut hits = Vec::new();
        for signature in &self.signatures {
            if self.signature_matches(signature, archive, &mut cache) {
                trace!(
                    container_signature = signature.id,
                    description = %signature.description,
                    "Container signature matched"
                );
                hits.extend(signature.formats.iter());
            }
        }
        hits
    }

    fn signature_matches<'s, A: ContainerArchive>(
        &self,
        signature: &'s ContainerSignature,
        archive: &mut A,
        cache: &mut HashMap<&'s str, Option<Bytes>>,
    ) -> bool {
        for file in &signature.files {
            if !archive.contains(&file.path) {
                return false;
            }
            let Some(collection) = &file.signatures else {
                continue;
            };
            let entry = cache.entry(file.path.as_str()).or_insert_with(|| {
                match archive.read_entry(&file.path, self.config.max_entry_bytes) {
                    Ok(bytes) => bytes,
                    Err(error) => {
                        warn!(entry = %file.path, error = %error, "Could not read container entry");
                        None
                    }
                }
            });
            let Some(bytes) = entry.as_ref() else {
                return false;
            };
            if collection
                .get_matching_signatures(bytes, self.max_bytes_to_scan)
                .is_empty()
            {
                return false;
            }
        }
        true
    }
}
