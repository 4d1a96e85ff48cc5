//! The identification engine.
//!
//! An [`Engine`] is built once from the two catalogues and shared freely: it is
//! immutable after construction and cheap to clone, so any number of threads may
//! submit requests at once.

use crate::core::{IdentificationRequest, IdentificationResultCollection};
use crate::error::{FormatIdError, Result};
use crate::identify::binary::BinarySignatureIdentifier;
use crate::identify::config::{EngineConfig, ExtensionFallback};
use crate::identify::container::{ContainerIdentifier, ContainerKind};
use crate::identify::definitions::{BinarySignatureDefinitions, ContainerSignatureDefinitions};
use crate::io::ByteSource;
use crate::signature::SignatureLoadError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct EngineInner {
    config: EngineConfig,
    binary: BinarySignatureIdentifier,
    containers: HashMap<ContainerKind, ContainerIdentifier>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Build an engine with the default configuration.
    pub fn new(
        binary: &BinarySignatureDefinitions,
        containers: &ContainerSignatureDefinitions,
    ) -> std::result::Result<Self, SignatureLoadError> {
        Self::with_config(binary, containers, EngineConfig::default())
    }

    pub fn with_config(
        binary: &BinarySignatureDefinitions,
        containers: &ContainerSignatureDefinitions,
        config: EngineConfig,
    ) -> std::result::Result<Self, SignatureLoadError> {
        let binary = BinarySignatureIdentifier::new(binary, &config)?;
        let containers = ContainerKind::ALL
            .into_iter()
            .map(|kind| {
                ContainerIdentifier::new(kind, containers, &binary, &config)
                    .map(|identifier| (kind, identifier))
            })
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        debug!(
            binary_version = %binary.version(),
            binary_signatures = binary.signatures().len(),
            container_signatures = containers.values().map(ContainerIdentifier::len).sum::<usize>(),
            "Engine ready"
        );
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                binary,
                containers,
            }),
        })
    }

    /// Load both catalogues from JSON files.
    pub fn from_json_files<P: AsRef<Path>, Q: AsRef<Path>>(
        binary: P,
        containers: Q,
        config: EngineConfig,
    ) -> std::result::Result<Self, SignatureLoadError> {
        let binary = BinarySignatureDefinitions::from_json_file(binary)?;
        let containers = ContainerSignatureDefinitions::from_json_file(containers)?;
        Self::with_config(&binary, &containers, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn binary(&self) -> &BinarySignatureIdentifier {
        &self.inner.binary
    }

    pub fn container(&self, kind: ContainerKind) -> Option<&ContainerIdentifier> {
        self.inner.containers.get(&kind)
    }

    /// Identify one file. The file is mapped for the duration of the call only.
    pub fn submit<P: AsRef<Path>>(&self, path: P) -> Result<IdentificationResultCollection> {
        let request = IdentificationRequest::open(path, &self.inner.config.io)?;
        self.submit_request(&request)
    }

    /// Identify an already-opened request.
    pub fn submit_request<S: ByteSource>(
        &self,
        request: &IdentificationRequest<S>,
    ) -> Result<IdentificationResultCollection> {
        let span = crate::span_trace!("identify", uri = %request.identifier().uri);
        let _guard = span.enter();
        let binary = &self.inner.binary;
        let extension = request.extension();

        let mut results = binary.match_binary_signatures(request);

        if let Some(kind) = results
            .results()
            .iter()
            .find_map(|r| ContainerKind::from_puid(&r.puid))
        {
            let identifier = self.inner.containers.get(&kind).ok_or_else(|| {
                FormatIdError::InvariantViolation(format!(
                    "no container identifier for {kind} wrapper"
                ))
            })?;
            let mut container_results = identifier.submit(request);
            if !container_results.is_empty() {
                binary.remove_lower_priority_hits(&mut container_results);
                binary.check_for_extension_mismatches(&mut container_results, extension);
                debug!(hits = container_results.len(), "Identified by container");
                return Ok(container_results);
            }
            // The binary result stands as it was matched, without filtering or flags.
            debug!(kind = %kind, "No container hits, keeping binary result");
            return Ok(results);
        }

        binary.remove_lower_priority_hits(&mut results);
        binary.check_for_extension_mismatches(&mut results, extension);

        if results.is_empty() {
            let all_formats = self.inner.config.extension_fallback == ExtensionFallback::AllFormats;
            results = binary.match_extensions(request, all_formats);
            binary.remove_lower_priority_hits(&mut results);
            debug!(hits = results.len(), "Identified by extension");
        } else {
            debug!(hits = results.len(), "Identified by binary signature");
        }
        Ok(results)
    }
}
