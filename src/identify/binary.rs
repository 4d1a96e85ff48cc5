//! The binary signature pass and the filters applied to its results.

use crate::core::{
    FileFormat, IdentificationMethod, IdentificationRequest, IdentificationResult,
    IdentificationResultCollection, Specificity,
};
use crate::identify::config::EngineConfig;
use crate::identify::definitions::{BinarySignatureDefinitions, SignatureDefinition};
use crate::identify::priority::PriorityGraph;
use crate::io::ByteSource;
use crate::signature::{
    compile_anchored, ByteSequence, InternalSignature, InternalSignatureCollection,
    SignatureLoadError,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace, warn};

/// Compile one signature definition. In non-strict mode a bad sequence yields
/// `Ok(None)` after a warning, so the catalogue still loads.
pub(crate) fn compile_signature(
    definition: &SignatureDefinition,
    strict: bool,
) -> Result<Option<InternalSignature>, SignatureLoadError> {
    let mut sequences: Vec<ByteSequence> = Vec::with_capacity(definition.sequences.len());
    for seq in &definition.sequences {
        match compile_anchored(&seq.expression, &seq.anchor) {
            Ok(compiled) => sequences.push(match &seq.tag {
                Some(tag) => compiled.with_tag(tag.clone()),
                None => compiled,
            }),
            Err(source) if strict => {
                return Err(SignatureLoadError::InvalidSequence {
                    signature: definition.id,
                    source,
                })
            }
            Err(error) => {
                warn!(
                    signature = definition.id,
                    expression = %seq.expression,
                    error = %error,
                    "Skipping signature that does not compile"
                );
                return Ok(None);
            }
        }
    }
    InternalSignature::new(definition.id, sequences, definition.formats.clone())
        .map(|sig| Some(sig.with_specific(definition.specific)))
}

/// Identifies resources by their binary signatures.
#[derive(Debug, Clone)]
pub struct BinarySignatureIdentifier {
    version: String,
    formats: Vec<FileFormat>,
    by_puid: HashMap<String, usize>,
    signatures: InternalSignatureCollection,
    /// Formats with at least one binary signature.
    signed: HashSet<String>,
    priorities: PriorityGraph,
    max_bytes_to_scan: Option<u64>,
}

impl BinarySignatureIdentifier {
    pub fn new(
        definitions: &BinarySignatureDefinitions,
        config: &EngineConfig,
    ) -> Result<Self, SignatureLoadError> {
        let mut by_puid = HashMap::with_capacity(definitions.formats.len());
        for (index, format) in definitions.formats.iter().enumerate() {
            if by_puid.insert(format.puid.clone(), index).is_some() {
                return Err(SignatureLoadError::DuplicateFormat(format.puid.clone()));
            }
        }
        let priorities = PriorityGraph::build(&definitions.formats)?;

        let mut seen_ids = HashSet::new();
        let mut signatures = InternalSignatureCollection::new();
        let mut signed = HashSet::new();
        let mut skipped = 0usize;
        for definition in &definitions.signatures {
            if !seen_ids.insert(definition.id) {
                return Err(SignatureLoadError::DuplicateSignature(definition.id));
            }
            for puid in &definition.formats {
                if !by_puid.contains_key(puid) {
                    return Err(SignatureLoadError::UnknownFormat {
                        owner: format!("signature {}", definition.id),
                        puid: puid.clone(),
                    });
                }
            }
            match compile_signature(definition, config.strict_signatures)? {
                Some(signature) => {
                    signed.extend(signature.formats().iter().cloned());
                    signatures.add_signature(signature);
                }
                None => skipped += 1,
            }
        }

        debug!(
            version = %definitions.version,
            formats = definitions.formats.len(),
            signatures = signatures.len(),
            skipped,
            "Loaded binary signatures"
        );

        Ok(Self {
            version: definitions.version.clone(),
            formats: definitions.formats.clone(),
            by_puid,
            signatures,
            signed,
            priorities,
            max_bytes_to_scan: config.max_bytes_to_scan,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn format(&self, puid: &str) -> Option<&FileFormat> {
        self.by_puid.get(puid).map(|&i| &self.formats[i])
    }

    pub fn formats(&self) -> &[FileFormat] {
        &self.formats
    }

    pub fn signatures(&self) -> &InternalSignatureCollection {
        &self.signatures
    }

    pub fn priorities(&self) -> &PriorityGraph {
        &self.priorities
    }

    pub fn max_bytes_to_scan(&self) -> Option<u64> {
        self.max_bytes_to_scan
    }

    /// Run every binary signature against the request's bytes.
    pub fn match_binary_signatures<S: ByteSource>(
        &self,
        request: &IdentificationRequest<S>,
    ) -> IdentificationResultCollection {
        let mut results = new_collection(request);
        for signature in self
            .signatures
            .get_matching_signatures(request.source(), self.max_bytes_to_scan)
        {
            let specificity = if signature.is_specific() {
                Specificity::Specific
            } else {
                Specificity::Generic
            };
            for puid in signature.formats() {
                if let Some(format) = self.format(puid) {
                    results.add_result(IdentificationResult::from_format(
                        format,
                        IdentificationMethod::Binary,
                        specificity,
                    ));
                }
            }
        }
        trace!(
            uri = %request.identifier().uri,
            hits = results.len(),
            "Binary signature pass finished"
        );
        results
    }

    /// Drop results outranked by other results in the same collection.
    pub fn remove_lower_priority_hits(&self, results: &mut IdentificationResultCollection) {
        let removed = self.priorities.remove_lower_priority_hits(results);
        if removed > 0 {
            trace!(removed, "Removed lower priority hits");
        }
    }

    /// Flag results whose format registers extensions but not the claimed one.
    pub fn check_for_extension_mismatches(
        &self,
        results: &mut IdentificationResultCollection,
        extension: &str,
    ) {
        for result in results.results_mut() {
            if let Some(format) = self.format(&result.puid) {
                if format.has_extensions() && !format.has_matching_extension(extension) {
                    result.extension_mismatch = true;
                }
            }
        }
    }

    /// Formats registering the request's extension. With `all_formats == false` only
    /// formats lacking a binary signature are considered.
    pub fn match_extensions<S: ByteSource>(
        &self,
        request: &IdentificationRequest<S>,
        all_formats: bool,
    ) -> IdentificationResultCollection {
        let mut results = new_collection(request);
        let extension = request.extension();
        if extension.is_empty() {
            return results;
        }
        for format in &self.formats {
            if !all_formats && self.signed.contains(&format.puid) {
                continue;
            }
            if format.has_matching_extension(extension) {
                results.add_result(IdentificationResult::from_format(
                    format,
                    IdentificationMethod::Extension,
                    Specificity::Generic,
                ));
            }
        }
        results
    }
}

/// An empty collection carrying the request's facts.
pub(crate) fn new_collection<S: ByteSource>(
    request: &IdentificationRequest<S>,
) -> IdentificationResultCollection {
    let mut results = IdentificationResultCollection::new();
    results.set_file_length(request.size());
    results.set_request_metadata(request.metadata().clone());
    results.set_request_identifier(request.identifier().clone());
    results
}
