//! Database metadata file (`db_info.info`).
//!
//! Written once at creation and read back at resume; it is the authority on
//! the schema and the configured limits, so a reopened process needs no
//! arguments beyond the root path.
//!
//! ## Layout (little-endian throughout)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  u8 version, 3 zero bytes (4-byte version slot)             │
//! │  i32 init_time                                              │
//! │  i32 bytes_per_file                                         │
//! │  i32 files_per_folder                                       │
//! │  i32 L (format length)                                      │
//! │  L bytes user format codes                                  │
//! │  L bytes dense format codes                                 │
//! │  repeated { i32 name_len, name bytes } per field            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The field-name list includes the synthetic `"timestamp"` entry.

use crate::error::{Result, StoreError};
use std::fs;
use std::path::Path;

/// Current metadata format version.
pub const META_VERSION: u8 = 0;

/// Persisted database metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Metadata format version.
    pub version: u8,
    /// Epoch second the database was created.
    pub init_time: i32,
    /// Configured data-file capacity in bytes.
    pub bytes_per_file: i32,
    /// Configured number of data files per folder.
    pub files_per_folder: i32,
    /// User-declared format codes, timestamp field included.
    pub user_format: String,
    /// Derived dense format codes.
    pub dense_format: String,
    /// Field names in user order, `"timestamp"` included.
    pub field_names: Vec<String>,
}

impl Metadata {
    /// Serializes the metadata.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[self.version, 0, 0, 0]);
        bytes.extend_from_slice(&self.init_time.to_le_bytes());
        bytes.extend_from_slice(&self.bytes_per_file.to_le_bytes());
        bytes.extend_from_slice(&self.files_per_folder.to_le_bytes());
        bytes.extend_from_slice(&(self.user_format.len() as i32).to_le_bytes());
        bytes.extend_from_slice(self.user_format.as_bytes());
        bytes.extend_from_slice(self.dense_format.as_bytes());
        for name in &self.field_names {
            bytes.extend_from_slice(&(name.len() as i32).to_le_bytes());
            bytes.extend_from_slice(name.as_bytes());
        }
        bytes
    }

    /// Deserializes metadata written by [`Metadata::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let version = cursor.take(4)?[0];
        let init_time = cursor.i32()?;
        let bytes_per_file = cursor.i32()?;
        let files_per_folder = cursor.i32()?;
        let format_len = cursor.i32()?;
        if format_len <= 0 {
            return Err(StoreError::Reopen(format!(
                "metadata declares format length {format_len}"
            )));
        }
        let user_format = cursor.string(format_len as usize)?;
        let dense_format = cursor.string(format_len as usize)?;

        let mut field_names = Vec::new();
        while !cursor.is_empty() {
            let name_len = cursor.i32()?;
            if name_len < 0 {
                return Err(StoreError::Reopen(format!(
                    "metadata declares field name length {name_len}"
                )));
            }
            field_names.push(cursor.string(name_len as usize)?);
        }
        if field_names.len() != format_len as usize {
            return Err(StoreError::Reopen(format!(
                "metadata holds {} field names for {} fields",
                field_names.len(),
                format_len
            )));
        }

        Ok(Self {
            version,
            init_time,
            bytes_per_file,
            files_per_folder,
            user_format,
            dense_format,
            field_names,
        })
    }

    /// Writes the metadata file. Written exactly once, at creation.
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.encode())?;
        Ok(())
    }

    /// Reads and decodes a metadata file.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).map_err(|e| StoreError::Reopen(format!("metadata unreadable: {e}")))?;
        Self::decode(&bytes)
    }
}

/// Bounds-checked reader over the raw metadata bytes.
struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn is_empty(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).filter(|&e| e <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.offset..end];
                self.offset = end;
                Ok(slice)
            }
            None => Err(StoreError::Reopen(format!(
                "metadata truncated at offset {}",
                self.offset
            ))),
        }
    }

    fn i32(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().expect("length checked")))
    }

    fn string(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| StoreError::Reopen(format!("metadata holds invalid UTF-8: {e}")))
    }
}
