//! Internal signatures and the collections that evaluate them.

use crate::io::ByteSource;
use crate::signature::error::SignatureLoadError;
use crate::signature::matcher::SequenceMatcher;
use crate::signature::sequence::ByteSequence;
use tracing::trace;

/// A named conjunction of byte sequences tied to one or more formats.
#[derive(Debug, Clone)]
pub struct InternalSignature {
    id: u32,
    specific: bool,
    sequences: Vec<ByteSequence>,
    matchers: Vec<SequenceMatcher>,
    formats: Vec<String>,
}

impl InternalSignature {
    /// Build a signature. A signature without sequences would match everything, so it
    /// is rejected.
    pub fn new(
        id: u32,
        sequences: Vec<ByteSequence>,
        formats: Vec<String>,
    ) -> Result<Self, SignatureLoadError> {
        if sequences.is_empty() {
            return Err(SignatureLoadError::EmptySignature(id));
        }
        let matchers = sequences.iter().map(SequenceMatcher::new).collect();
        Ok(Self {
            id,
            specific: false,
            sequences,
            matchers,
            formats,
        })
    }

    /// Mark the signature as a specific (rather than generic) identification.
    pub fn with_specific(mut self, specific: bool) -> Self {
        self.specific = specific;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_specific(&self) -> bool {
        self.specific
    }

    pub fn sequences(&self) -> &[ByteSequence] {
        &self.sequences
    }

    /// PUIDs of the formats this signature identifies.
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// True when every sequence matches.
    pub fn matches<S: ByteSource + ?Sized>(&self, source: &S, max_bytes_to_scan: Option<u64>) -> bool {
        let data = source.bytes();
        self.matchers
            .iter()
            .all(|m| m.matches(data, max_bytes_to_scan))
    }
}

/// An ordered set of signatures evaluated independently against one source.
#[derive(Debug, Clone, Default)]
pub struct InternalSignatureCollection {
    signatures: Vec<InternalSignature>,
}

impl InternalSignatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_signature(&mut self, signature: InternalSignature) {
        self.signatures.push(signature);
    }

    pub fn signatures(&self) -> &[InternalSignature] {
        &self.signatures
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Every signature whose sequences all match, in collection order.
    pub fn get_matching_signatures<S: ByteSource + ?Sized>(
        &self,
        source: &S,
        max_bytes_to_scan: Option<u64>,
    ) -> Vec<&InternalSignature> {
        let matched: Vec<&InternalSignature> = self
            .signatures
            .iter()
            .filter(|sig| sig.matches(source, max_bytes_to_scan))
            .collect();
        trace!(
            evaluated = self.signatures.len(),
            matched = matched.len(),
            "Evaluated signature collection"
        );
        matched
    }
}

impl FromIterator<InternalSignature> for InternalSignatureCollection {
    fn from_iter<I: IntoIterator<Item = InternalSignature>>(iter: I) -> Self {
        Self {
            signatures: iter.into_iter().collect(),
        }
    }
}
