//! Configuration for the identification engine.
//!
//! Every field has a default, so a configuration file only needs the values it
//! changes.

use crate::io::IOLimits;
use crate::signature::SignatureLoadError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Master configuration for an [`Engine`](crate::identify::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bytes examined from the anchored end of each resource. `None` scans everything.
    pub max_bytes_to_scan: Option<u64>,
    /// Limits applied when opening files.
    pub io: IOLimits,
    /// Limits on container traversal.
    pub containers: ContainerConfig,
    /// Which formats extension-only identification may return.
    pub extension_fallback: ExtensionFallback,
    /// Fail engine construction on any signature that does not compile, instead of
    /// skipping it with a warning.
    pub strict_signatures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_bytes_to_scan: None,
            io: IOLimits::default(),
            containers: ContainerConfig::default(),
            extension_fallback: ExtensionFallback::AllFormats,
            strict_signatures: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SignatureLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SignatureLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SignatureLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

/// Container traversal limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Largest number of bytes read from a single entry (default: 64 MiB).
    pub max_entry_bytes: u64,
    /// Archives listing more entries than this are not examined (default: 65536).
    pub max_entries: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_entry_bytes: 64 * 1024 * 1024,
            max_entries: 65_536,
        }
    }
}

/// Candidate formats for extension-only identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionFallback {
    /// Any format registering the extension.
    AllFormats,
    /// Only formats that have no binary signature of their own.
    TentativeOnly,
}
