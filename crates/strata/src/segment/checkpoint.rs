//! Rotation checkpoint.
//!
//! Four little-endian `i32` values persisted to `R/temp` after every
//! rotation, letting a later process resume the folder/file counters
//! exactly where the previous one left them.

use crate::error::{Result, StoreError};
use std::fs;
use std::path::Path;

/// Checkpointed rotation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    /// Current folder number (1-based, never reused).
    pub folders: i32,
    /// Current file number within the folder (1-based).
    pub files: i32,
    /// Start time of the current folder's interval.
    pub folder_start: i32,
    /// Start time of the current file's interval.
    pub file_start: i32,
}

impl Checkpoint {
    /// Encoded size in bytes.
    pub const SIZE: usize = 16;

    /// Writes the checkpoint, replacing any previous one.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.folders.to_le_bytes());
        bytes.extend_from_slice(&self.files.to_le_bytes());
        bytes.extend_from_slice(&self.folder_start.to_le_bytes());
        bytes.extend_from_slice(&self.file_start.to_le_bytes());
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Reads a checkpoint written by a previous process.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|e| StoreError::Reopen(format!("checkpoint unreadable: {e}")))?;
        if bytes.len() < Self::SIZE {
            return Err(StoreError::Reopen(format!(
                "checkpoint truncated: {} bytes",
                bytes.len()
            )));
        }
        let field = |i: usize| {
            i32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().expect("length checked"))
        };
        Ok(Self {
            folders: field(0),
            files: field(1),
            folder_start: field(2),
            file_start: field(3),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_checkpoint_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp");
        let checkpoint = Checkpoint {
            folders: 3,
            files: 17,
            folder_start: 1_000,
            file_start: 1_042,
        };
        checkpoint.write(&path).unwrap();
        assert_eq!(Checkpoint::read(&path).unwrap(), checkpoint);
    }

    #[test]
    fn test_checkpoint_overwrites_previous() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp");
        let first = Checkpoint {
            folders: 1,
            files: 1,
            folder_start: 0,
            file_start: 0,
        };
        first.write(&path).unwrap();
        let second = Checkpoint {
            folders: 2,
            files: 1,
            folder_start: 50,
            file_start: 50,
        };
        second.write(&path).unwrap();
        assert_eq!(Checkpoint::read(&path).unwrap(), second);
    }

    #[test]
    fn test_missing_checkpoint_is_reopen_error() {
        let dir = TempDir::new().unwrap();
        let result = Checkpoint::read(&dir.path().join("temp"));
        assert!(matches!(result, Err(StoreError::Reopen(_))));
    }

    #[test]
    fn test_truncated_checkpoint_is_reopen_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp");
        fs::write(&path, [0u8; 7]).unwrap();
        assert!(matches!(
            Checkpoint::read(&path),
            Err(StoreError::Reopen(_))
        ));
    }
}
