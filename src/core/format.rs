//! File format records from the signature catalogue.

use serde::{Deserialize, Serialize};

/// One format registry entry, keyed by its PUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFormat {
    pub puid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Registered extensions, without the leading dot.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// PUIDs this format outranks when both are identified for the same resource.
    #[serde(default)]
    pub has_priority_over: Vec<String>,
}

impl FileFormat {
    pub fn new(puid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            puid: puid.into(),
            name: name.into(),
            version: None,
            mime_type: None,
            extensions: Vec::new(),
            has_priority_over: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority_over<I, S>(mut self, puids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.has_priority_over = puids.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_extensions(&self) -> bool {
        !self.extensions.is_empty()
    }

    /// Case-insensitive; a leading dot on `extension` is ignored.
    pub fn has_matching_extension(&self, extension: &str) -> bool {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}
