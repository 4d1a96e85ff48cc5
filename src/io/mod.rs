//! Byte sources for identification.
//!
//! A [`ByteSource`] gives random access to the bytes of one submitted resource.
//! [`FileSource`] memory-maps a file for the lifetime of a request and unmaps it when
//! dropped, so every exit path releases the handle. [`MemorySource`] wraps bytes that
//! are already in memory, such as container entries.

pub mod error;

use crate::io::error::{IoError, Result};
use bytes::Bytes;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Resource limits applied when opening files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IOLimits {
    /// The absolute maximum file size that can be opened.
    pub max_file_size: u64,
}

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_file_size: u64::MAX,
        }
    }
}

/// Random access to the bytes of one resource.
///
/// Sources are read-only; any number of independent scans may run over the same
/// source without reopening it.
pub trait ByteSource {
    /// All bytes of the resource.
    fn bytes(&self) -> &[u8];

    fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// Up to `len` bytes starting at `offset`; short or empty past the end.
    fn read_at(&self, offset: u64, len: u64) -> &[u8] {
        let data = self.bytes();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start
            .saturating_add(usize::try_from(len).unwrap_or(usize::MAX))
            .min(data.len());
        &data[start..end]
    }

    /// Up to `len` bytes ending `offset` bytes before the end of the resource.
    fn read_from_end(&self, offset: u64, len: u64) -> &[u8] {
        let data = self.bytes();
        let end = data
            .len()
            .saturating_sub(usize::try_from(offset).unwrap_or(usize::MAX));
        let start = end.saturating_sub(usize::try_from(len).unwrap_or(usize::MAX));
        &data[start..end]
    }
}

impl ByteSource for [u8] {
    fn bytes(&self) -> &[u8] {
        self
    }
}

impl ByteSource for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self
    }
}

impl ByteSource for Bytes {
    fn bytes(&self) -> &[u8] {
        self
    }
}

/// A memory-mapped file, released when dropped.
pub struct FileSource {
    path: PathBuf,
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
    file_size: u64,
}

impl FileSource {
    /// Opens and maps a file.
    ///
    /// This function will fail if the file size exceeds `limits.max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, limits: &IOLimits) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| IoError::open(path, e))?;
        let metadata = file.metadata()?;
        let file_size = metadata.len();

        debug!(
            path = %path.display(),
            size = file_size,
            limits.max_file_size = limits.max_file_size,
            "Opening file for identification"
        );

        if file_size > limits.max_file_size {
            warn!(
                path = %path.display(),
                size = file_size,
                limit = limits.max_file_size,
                "File is too large"
            );
            return Err(IoError::FileTooLarge {
                limit: limits.max_file_size,
                found: file_size,
            });
        }

        let mmap = if file_size == 0 {
            None
        } else {
            // Safety: The file is backed by a real file on disk and we only request a read-only map.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            file_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.file_size
    }
}

impl ByteSource for FileSource {
    fn bytes(&self) -> &[u8] {
        match &self.mmap {
            Some(map) => map,
            None => &[],
        }
    }

    fn len(&self) -> u64 {
        self.file_size
    }
}

impl Drop for FileSource {
    fn drop(&mut self) {
        trace!(path = %self.path.display(), "Released file source");
    }
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("path", &self.path)
            .field("size", &self.file_size)
            .finish()
    }
}

/// Bytes already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl ByteSource for MemorySource {
    fn bytes(&self) -> &[u8] {
        &self.data
    }
}
