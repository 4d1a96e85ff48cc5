//! ZIP archives through the `zip` crate.

use super::{ContainerArchive, ContainerError};
use crate::identify::config::ContainerConfig;
use ::zip::result::ZipError;
use ::zip::ZipArchive;
use bytes::Bytes;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use tracing::trace;

pub struct ZipContainer<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    names: HashSet<String>,
}

impl<'a> ZipContainer<'a> {
    pub fn open(data: &'a [u8], config: &ContainerConfig) -> Result<Self, ContainerError> {
        let archive = ZipArchive::new(Cursor::new(data))?;
        if archive.len() > config.max_entries {
            return Err(ContainerError::TooManyEntries {
                found: archive.len(),
                limit: config.max_entries,
            });
        }
        let names: HashSet<String> = archive.file_names().map(str::to_string).collect();
        trace!(entries = names.len(), "Opened ZIP container");
        Ok(Self { archive, names })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl ContainerArchive for ZipContainer<'_> {
    fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn read_entry(&mut self, name: &str, max_bytes: u64) -> Result<Option<Bytes>, ContainerError> {
        if !self.contains(name) {
            return Ok(None);
        }
        let file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let capacity = usize::try_from(file.size().min(max_bytes)).unwrap_or(0);
        let mut buf = Vec::with_capacity(capacity);
        file.take(max_bytes).read_to_end(&mut buf)?;
        Ok(Some(Bytes::from(buf)))
    }
}
