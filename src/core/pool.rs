//! Purpose: Build and read the string pool and the data (blob) pool.
//! Exports: `StringPool`, `StringPoolRef`, `DataPool`, `DataPoolRef`, `BlobRef`.
//! Role: Variable-length storage referenced by offset from columns and rows.
//! Invariants: Strings dedup by exact match except entries appended as unshared.
//! Invariants: Blobs never dedup; each blob's end is padded to the next 32-byte boundary.
//! Invariants: A zero-size blob occupies no pool bytes and is referenced as (0, 0).

use std::collections::HashMap;

use bstr::{BStr, ByteSlice};

use crate::core::error::{Error, ErrorKind};
use crate::core::format::align32;

#[derive(Debug, Default)]
pub struct StringPool {
    bytes: Vec<u8>,
    index: HashMap<Vec<u8>, u32>,
    entries: usize,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the offset of an identical shared entry, appending one if none exists.
    pub fn intern(&mut self, text: impl AsRef<[u8]>) -> Result<u32, Error> {
        let text = text.as_ref();
        if let Some(offset) = self.index.get(text) {
            return Ok(*offset);
        }
        let offset = self.push(text)?;
        self.index.insert(text.to_vec(), offset);
        Ok(offset)
    }

    /// Appends an entry that is neither deduplicated nor reusable by later strings.
    pub fn append_unshared(&mut self, text: &str) -> Result<u32, Error> {
        self.push(text.as_bytes())
    }

    pub fn offset_of(&self, text: impl AsRef<[u8]>) -> Option<u32> {
        self.index.get(text.as_ref()).copied()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn push(&mut self, text: &[u8]) -> Result<u32, Error> {
        if text.contains(&0) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("string values cannot contain NUL bytes"));
        }
        let offset = u32::try_from(self.bytes.len()).map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("string pool exceeds 4 GiB")
        })?;
        self.bytes.extend_from_slice(text);
        self.bytes.push(0);
        self.entries += 1;
        Ok(offset)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BlobRef {
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Default)]
pub struct DataPool {
    bytes: Vec<u8>,
    refs: Vec<BlobRef>,
}

impl DataPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, blob: &[u8]) -> Result<BlobRef, Error> {
        let blob_ref = if blob.is_empty() {
            BlobRef::default()
        } else {
            let offset = u32::try_from(self.bytes.len());
            let size = u32::try_from(blob.len());
            let (Ok(offset), Ok(size)) = (offset, size) else {
                return Err(Error::new(ErrorKind::Usage).with_message("data pool exceeds 4 GiB"));
            };
            self.bytes.extend_from_slice(blob);
            self.bytes.resize(align32(self.bytes.len()), 0);
            BlobRef { offset, size }
        };
        self.refs.push(blob_ref);
        Ok(blob_ref)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// References in push order, including zero-size blobs.
    pub fn refs(&self) -> &[BlobRef] {
        &self.refs
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StringPoolRef<'a> {
    bytes: &'a [u8],
}

impl<'a> StringPoolRef<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Raw bytes of the entry at `offset`, without its terminator.
    pub fn get_bytes(&self, offset: u32) -> Result<&'a BStr, Error> {
        let start = offset as usize;
        let tail = self.bytes.get(start..).ok_or_else(|| {
            Error::new(ErrorKind::Corrupt)
                .with_message(format!(
                    "string offset beyond pool of {} bytes",
                    self.bytes.len()
                ))
                .with_offset(offset as u64)
        })?;
        let end = tail.find_byte(0).ok_or_else(|| {
            Error::new(ErrorKind::Corrupt)
                .with_message("unterminated string in pool")
                .with_offset(offset as u64)
        })?;
        Ok(tail[..end].as_bstr())
    }

    /// Entry at `offset` as text, for names that must be valid UTF-8.
    pub fn get(&self, offset: u32) -> Result<&'a str, Error> {
        let bytes = self.get_bytes(offset)?;
        bytes.to_str().map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message(format!("name is not utf-8: {bytes:?}"))
                .with_offset(offset as u64)
                .with_source(err)
        })
    }

    pub fn starts_with_entry(&self, text: &str) -> bool {
        self.bytes.starts_with(text.as_bytes())
            && self.bytes.get(text.len()).copied() == Some(0)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DataPoolRef<'a> {
    bytes: &'a [u8],
}

impl<'a> DataPoolRef<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn get(&self, blob: BlobRef) -> Result<&'a [u8], Error> {
        if blob.size == 0 {
            return Ok(&[]);
        }
        let start = blob.offset as usize;
        start
            .checked_add(blob.size as usize)
            .and_then(|end| self.bytes.get(start..end))
            .ok_or_else(|| {
                Error::new(ErrorKind::Corrupt)
                    .with_message(format!(
                        "blob of {} bytes exceeds data pool of {} bytes",
                        blob.size,
                        self.bytes.len()
                    ))
                    .with_offset(blob.offset as u64)
            })
    }
}
