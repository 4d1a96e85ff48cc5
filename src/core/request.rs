//! Identification requests: one submitted resource with its metadata and bytes.

use crate::io::error::{IoError, Result};
use crate::io::{ByteSource, FileSource, IOLimits, MemorySource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide source of unique request node ids.
pub struct IdGenerator;

impl IdGenerator {
    /// Allocate the next id. Safe to call from any number of threads.
    pub fn next_id() -> u64 {
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    }
}

/// Facts about the submitted resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetaData {
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub name: String,
}

/// Where the resource came from and where it sits in the request tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIdentifier {
    pub uri: String,
    pub parent_id: Option<u64>,
    pub node_id: u64,
}

impl RequestIdentifier {
    /// A fresh top-level identifier.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            parent_id: Some(IdGenerator::next_id()),
            node_id: IdGenerator::next_id(),
        }
    }
}

/// One resource submitted for identification. Owns its byte source; dropping the
/// request releases it.
#[derive(Debug)]
pub struct IdentificationRequest<S: ByteSource = FileSource> {
    metadata: RequestMetaData,
    identifier: RequestIdentifier,
    extension: String,
    source: S,
}

impl IdentificationRequest<FileSource> {
    /// Open a file, reading its size and modification time.
    pub fn open<P: AsRef<Path>>(path: P, limits: &IOLimits) -> Result<Self> {
        let path = path.as_ref();
        let source = FileSource::open(path, limits)?;
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let absolute = std::fs::canonicalize(path).map_err(|e| IoError::open(path, e))?;

        Ok(Self {
            metadata: RequestMetaData {
                size: source.size(),
                last_modified: modified,
                name: path.display().to_string(),
            },
            identifier: RequestIdentifier::new(format!("file://{}", absolute.display())),
            extension: extension_of(path),
            source,
        })
    }
}

impl IdentificationRequest<MemorySource> {
    /// A request over in-memory bytes; `name` supplies the claimed extension.
    pub fn from_bytes(name: &str, data: impl Into<bytes::Bytes>) -> Self {
        let source = MemorySource::new(data);
        Self {
            metadata: RequestMetaData {
                size: source.len(),
                last_modified: None,
                name: name.to_string(),
            },
            identifier: RequestIdentifier::new(format!("memory:{}", name)),
            extension: extension_of(Path::new(name)),
            source,
        }
    }
}

impl<S: ByteSource> IdentificationRequest<S> {
    pub fn metadata(&self) -> &RequestMetaData {
        &self.metadata
    }

    pub fn identifier(&self) -> &RequestIdentifier {
        &self.identifier
    }

    /// The extension the resource claims, without the dot; empty when none.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Release the byte source now rather than at end of scope.
    pub fn close(self) {}
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_string)
        .unwrap_or_default()
}
