//! A read-only view of OLE2 compound documents.
//!
//! Only what entry lookup needs: the allocation tables, the directory tree and the
//! mini stream. Entry names are matched case-insensitively, as the format itself does.

use super::{ContainerArchive, ContainerError};
use bytes::Bytes;
use std::collections::HashMap;
use tracing::trace;

const MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const HEADER_LEN: usize = 512;
const HEADER_DIFAT_ENTRIES: usize = 109;
const END_OF_CHAIN: u32 = 0xFFFF_FFFE;
const FREE_SECTOR: u32 = 0xFFFF_FFFF;
const NO_STREAM: u32 = 0xFFFF_FFFF;
const DIR_ENTRY_LEN: usize = 128;

const TYPE_STORAGE: u8 = 1;
const TYPE_STREAM: u8 = 2;
const TYPE_ROOT: u8 = 5;

type Result<T> = std::result::Result<T, ContainerError>;

#[derive(Debug, Clone, Copy)]
struct Stream {
    start: u32,
    size: u64,
}

#[derive(Debug)]
struct DirEntry {
    name: String,
    kind: u8,
    left: u32,
    right: u32,
    child: u32,
    start: u32,
    size: u64,
}

pub struct Ole2Container<'a> {
    data: &'a [u8],
    sector_size: usize,
    mini_sector_size: usize,
    mini_cutoff: u64,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    mini_stream: Vec<u8>,
    /// Lower-cased '/'-joined path to stream.
    streams: HashMap<String, Stream>,
}

fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn u32s(bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

impl<'a> Ole2Container<'a> {
    pub fn open(data: &'a [u8]) -> Result<Self> {
        if data.len() < HEADER_LEN || data[..8] != MAGIC {
            return Err(ContainerError::Ole2("missing compound document signature"));
        }
        let sector_shift = u16_at(data, 0x1E);
        if sector_shift != 9 && sector_shift != 12 {
            return Err(ContainerError::Ole2("unsupported sector size"));
        }
        let mini_shift = u16_at(data, 0x20);
        if mini_shift >= sector_shift {
            return Err(ContainerError::Ole2("unsupported mini sector size"));
        }

        let mut doc = Self {
            data,
            sector_size: 1 << sector_shift,
            mini_sector_size: 1 << mini_shift,
            mini_cutoff: u64::from(u32_at(data, 0x38)),
            fat: Vec::new(),
            minifat: Vec::new(),
            mini_stream: Vec::new(),
            streams: HashMap::new(),
        };

        doc.fat = doc.load_fat()?;

        let directory = doc.read_chain(u32_at(data, 0x30), u64::MAX)?;
        let entries: Vec<DirEntry> = directory
            .chunks_exact(DIR_ENTRY_LEN)
            .map(|raw| doc.parse_entry(raw))
            .collect();
        let root = entries
            .first()
            .filter(|e| e.kind == TYPE_ROOT)
            .ok_or(ContainerError::Ole2("missing root entry"))?;

        let minifat_sectors = u64::from(u32_at(data, 0x40));
        if minifat_sectors > 0 {
            let raw = doc.read_chain(u32_at(data, 0x3C), minifat_sectors * doc.sector_size as u64)?;
            doc.minifat = u32s(&raw).collect();
            doc.mini_stream = doc.read_chain(root.start, root.size)?;
        }

        doc.streams = Self::walk(&entries, root.child);
        trace!(streams = doc.streams.len(), "Opened OLE2 container");
        Ok(doc)
    }

    /// Stream paths in the document, lower-cased.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    fn load_fat(&self) -> Result<Vec<u32>> {
        let fat_count = u32_at(self.data, 0x2C) as usize;
        let mut fat_sectors: Vec<u32> = u32s(&self.data[0x4C..0x4C + HEADER_DIFAT_ENTRIES * 4])
            .take(fat_count.min(HEADER_DIFAT_ENTRIES))
            .collect();

        let per_sector = self.sector_size / 4 - 1;
        let mut next = u32_at(self.data, 0x44);
        let mut remaining = u32_at(self.data, 0x48);
        while fat_sectors.len() < fat_count && remaining > 0 && next < END_OF_CHAIN {
            let sector = self.sector(next)?;
            let mut ids = u32s(sector);
            fat_sectors.extend(ids.by_ref().take(per_sector).filter(|&s| s != FREE_SECTOR));
            next = ids.next().unwrap_or(END_OF_CHAIN);
            remaining -= 1;
        }
        fat_sectors.truncate(fat_count);

        let mut fat = Vec::with_capacity(fat_sectors.len() * self.sector_size / 4);
        for id in fat_sectors {
            fat.extend(u32s(self.sector(id)?));
        }
        Ok(fat)
    }

    fn sector(&self, id: u32) -> Result<&'a [u8]> {
        let start = (id as usize + 1)
            .checked_mul(self.sector_size)
            .filter(|&s| s < self.data.len())
            .ok_or(ContainerError::Ole2("sector outside the file"))?;
        let end = (start + self.sector_size).min(self.data.len());
        Ok(&self.data[start..end])
    }

    /// Follow a FAT chain, stopping once `size` bytes are collected.
    fn read_chain(&self, start: u32, size: u64) -> Result<Vec<u8>> {
        let cap = size.min(self.data.len() as u64) as usize;
        let mut out = Vec::with_capacity(cap);
        let mut sector = start;
        let mut steps = 0usize;
        while sector != END_OF_CHAIN && (out.len() as u64) < size {
            if steps > self.fat.len() {
                return Err(ContainerError::Ole2("sector chain loops"));
            }
            out.extend_from_slice(self.sector(sector)?);
            sector = *self
                .fat
                .get(sector as usize)
                .ok_or(ContainerError::Ole2("sector chain leaves the allocation table"))?;
            steps += 1;
        }
        if (out.len() as u64) > size {
            out.truncate(size as usize);
        }
        Ok(out)
    }

    fn read_mini_chain(&self, start: u32, size: u64) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(size.min(self.mini_stream.len() as u64) as usize);
        let mut sector = start;
        let mut steps = 0usize;
        while sector != END_OF_CHAIN && (out.len() as u64) < size {
            if steps > self.minifat.len() {
                return Err(ContainerError::Ole2("mini sector chain loops"));
            }
            let begin = sector as usize * self.mini_sector_size;
            let end = (begin + self.mini_sector_size).min(self.mini_stream.len());
            if begin >= end {
                return Err(ContainerError::Ole2("mini sector outside the mini stream"));
            }
            out.extend_from_slice(&self.mini_stream[begin..end]);
            sector = *self
                .minifat
                .get(sector as usize)
                .ok_or(ContainerError::Ole2("mini sector chain leaves the allocation table"))?;
            steps += 1;
        }
        if (out.len() as u64) > size {
            out.truncate(size as usize);
        }
        Ok(out)
    }

    fn parse_entry(&self, raw: &[u8]) -> DirEntry {
        let name_len = (u16_at(raw, 64) as usize / 2).saturating_sub(1).min(31);
        let units: Vec<u16> = (0..name_len).map(|i| u16_at(raw, i * 2)).collect();
        let mut size = u64::from_le_bytes([
            raw[120], raw[121], raw[122], raw[123], raw[124], raw[125], raw[126], raw[127],
        ]);
        // Version 3 documents only define the low half.
        if self.sector_size == 512 {
            size &= 0xFFFF_FFFF;
        }
        DirEntry {
            name: String::from_utf16_lossy(&units),
            kind: raw[66],
            left: u32_at(raw, 68),
            right: u32_at(raw, 72),
            child: u32_at(raw, 76),
            start: u32_at(raw, 116),
            size,
        }
    }

    fn walk(entries: &[DirEntry], first: u32) -> HashMap<String, Stream> {
        let mut streams = HashMap::new();
        let mut visited = vec![false; entries.len()];
        let mut stack: Vec<(u32, String)> = vec![(first, String::new())];
        while let Some((index, prefix)) = stack.pop() {
            let Some(entry) = entries.get(index as usize) else {
                continue;
            };
            if index == NO_STREAM || std::mem::replace(&mut visited[index as usize], true) {
                continue;
            }
            for sibling in [entry.left, entry.right] {
                if sibling != NO_STREAM {
                    stack.push((sibling, prefix.clone()));
                }
            }
            let path = format!("{prefix}{}", entry.name).to_lowercase();
            match entry.kind {
                TYPE_STREAM => {
                    streams.insert(
                        path,
                        Stream {
                            start: entry.start,
                            size: entry.size,
                        },
                    );
                }
                TYPE_STORAGE if entry.child != NO_STREAM => {
                    stack.push((entry.child, format!("{path}/")));
                }
                _ => {}
            }
        }
        streams
    }
}

impl ContainerArchive for Ole2Container<'_> {
    fn contains(&self, name: &str) -> bool {
        self.streams.contains_key(&name.to_lowercase())
    }

    fn read_entry(&mut self, name: &str, max_bytes: u64) -> Result<Option<Bytes>> {
        let Some(stream) = self.streams.get(&name.to_lowercase()).copied() else {
            return Ok(None);
        };
        let wanted = stream.size.min(max_bytes);
        let data = if stream.size < self.mini_cutoff {
            self.read_mini_chain(stream.start, wanted)?
        } else {
            self.read_chain(stream.start, wanted)?
        };
        Ok(Some(Bytes::from(data)))
    }
}
