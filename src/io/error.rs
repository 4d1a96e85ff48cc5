//! Custom error types for the I/O module.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("File size of {found} bytes exceeds the maximum allowed size of {limit} bytes.")]
    FileTooLarge { limit: u64, found: u64 },

    #[error("Cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("An underlying I/O error occurred: {0}")]
    StdIo(#[from] std::io::Error),
}

impl IoError {
    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::Open {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IoError>;
