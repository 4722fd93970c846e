//! Append-only time index files.
//!
//! Both index levels share one 12-byte entry layout: the database index
//! (`db_map.map`) maps closed time intervals to folder ids, and each
//! folder's `.map` maps them to file ids. An entry is appended only when
//! its unit retires; the open unit has no entry and implicitly covers from
//! the last recorded end time onward.

use crate::error::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// One `(start, end, id)` triple in a time index.
///
/// `start` is inclusive and `end` exclusive for point lookup; range lookup
/// treats the entry as the closed interval it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeIndexEntry {
    /// First timestamp written to the unit.
    pub start: i32,
    /// Timestamp at which the unit retired.
    pub end: i32,
    /// Folder or file id the interval maps to.
    pub id: i32,
}

impl TimeIndexEntry {
    /// Encoded size in bytes.
    pub const SIZE: usize = 12;

    /// Serializes the entry little-endian.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.start.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.end.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.id.to_le_bytes());
        bytes
    }

    /// Deserializes an entry from exactly [`Self::SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let field = |i: usize| {
            i32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().expect("length checked"))
        };
        Self {
            start: field(0),
            end: field(1),
            id: field(2),
        }
    }

    /// True if `t` falls in `[start, end)`.
    pub fn contains(&self, t: i32) -> bool {
        self.start <= t && t < self.end
    }

    /// True if the closed intervals `[start, end]` and `[range_start,
    /// range_end]` intersect.
    pub fn overlaps(&self, range_start: i32, range_end: i32) -> bool {
        self.start <= range_end && range_start <= self.end
    }
}

/// Appends one entry to an index file.
///
/// A dropped index entry would permanently break time lookup for its unit,
/// so failures here are fatal to the caller rather than logged.
pub fn append_entry(path: &Path, entry: TimeIndexEntry) -> Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(&entry.to_bytes())?;
    Ok(())
}

/// Reads every complete entry in an index file.
///
/// Stops at the first short triple; a torn tail hides at most the entry
/// being appended when a previous process died.
pub fn read_entries(path: &Path) -> Result<Vec<TimeIndexEntry>> {
    let bytes = std::fs::read(path)?;
    Ok(bytes
        .chunks_exact(TimeIndexEntry::SIZE)
        .map(|chunk| {
            TimeIndexEntry::from_bytes(chunk.try_into().expect("chunks_exact yields full chunks"))
        })
        .collect())
}
