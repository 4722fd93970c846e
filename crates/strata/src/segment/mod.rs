//! On-disk segment layout, rotation, and time-indexed lookup.
//!
//! A database root holds the metadata file, the checkpoint, the
//! database-level time index, and numbered folders of numbered data files:
//!
//! ```text
//! R/db_info.info          metadata, written once at creation
//! R/temp                  checkpoint: 4 x i32
//! R/db_map.map            database time index: {start, end, folder} triples
//! R/{folder}/.map         folder time index: {start, end, file} triples
//! R/{folder}/{file:05}.db fixed-length dense records, no framing
//! ```
//!
//! The [`SegmentManager`] owns the rotation counters for exactly one open
//! database handle. Folders are numbered from 1 for the database's life;
//! files are numbered from 1 within their folder. Every append opens and
//! closes the target file, so there is no long-lived writer handle to flush.

pub mod checkpoint;
pub mod index;
pub mod meta;

use crate::error::{Result, StoreError};
use checkpoint::Checkpoint;
use index::TimeIndexEntry;
use meta::Metadata;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builds the on-disk paths under a database root.
#[derive(Debug, Clone)]
pub struct SegmentLayout {
    root: PathBuf,
}

impl SegmentLayout {
    /// Creates a layout rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The database root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the metadata file.
    pub fn db_info(&self) -> PathBuf {
        self.root.join("db_info.info")
    }

    /// Path of the checkpoint file.
    pub fn checkpoint(&self) -> PathBuf {
        self.root.join("temp")
    }

    /// Path of the database-level time index.
    pub fn db_map(&self) -> PathBuf {
        self.root.join("db_map.map")
    }

    /// Directory of the given folder.
    pub fn folder_dir(&self, folder: i32) -> PathBuf {
        self.root.join(folder.to_string())
    }

    /// Path of the given folder's time index.
    pub fn folder_map(&self, folder: i32) -> PathBuf {
        self.folder_dir(folder).join(".map")
    }

    /// Path of a data file within a folder.
    pub fn data_file(&self, folder: i32, file: i32) -> PathBuf {
        self.folder_dir(folder).join(format!("{file:05}.db"))
    }
}

/// Owns rotation state and the two-level time index for one open database.
#[derive(Debug)]
pub struct SegmentManager {
    layout: SegmentLayout,
    files_per_folder: i32,
    lines_per_file: usize,
    record_len: usize,
    folders: i32,
    files: i32,
    folder_start: i32,
    file_start: i32,
}

impl SegmentManager {
    /// Creates a fresh database on disk.
    ///
    /// Fails with [`StoreError::DatabaseExists`] if the root already holds a
    /// database. Otherwise creates the root, an empty database index,
    /// folder 1 with its empty index, the metadata file, and the initial
    /// checkpoint; file 1 itself is created by the first append.
    pub fn create(layout: SegmentLayout, meta: &Metadata, record_len: usize) -> Result<Self> {
        if layout.db_info().exists() {
            return Err(StoreError::DatabaseExists(layout.root().to_path_buf()));
        }
        fs::create_dir_all(layout.root())?;

        let mut manager = Self {
            layout,
            files_per_folder: meta.files_per_folder,
            lines_per_file: lines_per_file(meta.bytes_per_file, record_len),
            record_len,
            folders: 0,
            files: 0,
            folder_start: meta.init_time,
            file_start: meta.init_time,
        };

        File::create(manager.layout.db_map())?;
        manager.new_folder()?;
        manager.new_file();
        meta.write(&manager.layout.db_info())?;
        manager.write_checkpoint()?;
        debug!(root = %manager.layout.root().display(), "created database");
        Ok(manager)
    }

    /// Resumes an existing database from its checkpoint.
    ///
    /// The caller reads the metadata first (it holds the schema needed to
    /// compute `record_len`) and must force one rotation before writing so
    /// the previous process's possibly-torn last file is never appended to
    /// again.
    pub fn resume(layout: SegmentLayout, meta: &Metadata, record_len: usize) -> Result<Self> {
        let checkpoint = Checkpoint::read(&layout.checkpoint())?;
        if checkpoint.folders < 1 || checkpoint.files < 1 {
            return Err(StoreError::Reopen(format!(
                "checkpoint holds invalid counters: folders {}, files {}",
                checkpoint.folders, checkpoint.files
            )));
        }
        let manager = Self {
            layout,
            files_per_folder: meta.files_per_folder,
            lines_per_file: lines_per_file(meta.bytes_per_file, record_len),
            record_len,
            folders: checkpoint.folders,
            files: checkpoint.files,
            folder_start: checkpoint.folder_start,
            file_start: checkpoint.file_start,
        };
        debug!(
            root = %manager.layout.root().display(),
            folders = manager.folders,
            files = manager.files,
            "resumed database"
        );
        Ok(manager)
    }

    /// Records capacity of one data file.
    pub fn lines_per_file(&self) -> usize {
        self.lines_per_file
    }

    /// Fixed byte length of one record.
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    /// Current folder number.
    pub fn folders(&self) -> i32 {
        self.folders
    }

    /// Current file number within the current folder.
    pub fn files(&self) -> i32 {
        self.files
    }

    /// Path of the currently open data file.
    pub fn current_file(&self) -> PathBuf {
        self.layout.data_file(self.folders, self.files)
    }

    /// The on-disk layout.
    pub fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    /// Retires the current file (and the current folder when full) and
    /// opens the next one.
    ///
    /// Closes the file's interval with an entry `(file_start, now, file)` in
    /// the folder index; when the folder has reached capacity, closes its
    /// interval in the database index and opens the next folder. The
    /// checkpoint is persisted before returning, so a crash after rotation
    /// never loses index consistency.
    pub fn rotate(&mut self, now: i32) -> Result<()> {
        index::append_entry(
            &self.layout.folder_map(self.folders),
            TimeIndexEntry {
                start: self.file_start,
                end: now,
                id: self.files,
            },
        )?;

        if self.files >= self.files_per_folder {
            index::append_entry(
                &self.layout.db_map(),
                TimeIndexEntry {
                    start: self.folder_start,
                    end: now,
                    id: self.folders,
                },
            )?;
            self.new_folder()?;
            self.folder_start = now;
        }

        self.new_file();
        self.file_start = now;
        self.write_checkpoint()?;
        debug!(file = %self.current_file().display(), "rotated to new data file");
        Ok(())
    }

    /// Appends one packed record to the current file.
    ///
    /// Opens, writes, and closes per call; the file comes into existence on
    /// the first append. Failures surface to the caller and are never
    /// retried here.
    pub fn append(&self, bytes: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.current_file())?;
        file.write_all(bytes)?;
        Ok(())
    }

    /// Resolves a timestamp to the data file that covers it.
    ///
    /// Linear scan of the database index, then of the matching folder's
    /// index. A time no closed interval covers belongs to the still-open
    /// unit. Precondition: `t` is at or after the database start time.
    pub fn locate_by_time(&self, t: i32) -> Result<PathBuf> {
        let folder = index::read_entries(&self.layout.db_map())?
            .iter()
            .find(|e| e.contains(t))
            .map_or(self.folders, |e| e.id);

        let file = index::read_entries(&self.layout.folder_map(folder))?
            .iter()
            .find(|e| e.contains(t))
            .map_or(self.files, |e| e.id);

        Ok(self.layout.data_file(folder, file))
    }

    /// Resolves a closed time range to the set of data files that may hold
    /// records in it, in (folder, file) order.
    ///
    /// Every closed interval overlapping `[start, end]` contributes its
    /// unit; the open folder (and its open file) is included when `end`
    /// reaches past the last closed interval. The index narrows only to
    /// file granularity, so callers still filter by exact timestamp.
    pub fn locate_range(&self, start: i32, end: i32) -> Result<Vec<PathBuf>> {
        let db_entries = index::read_entries(&self.layout.db_map())?;
        let mut folders: Vec<i32> = db_entries
            .iter()
            .filter(|e| e.overlaps(start, end))
            .map(|e| e.id)
            .collect();
        if db_entries.last().is_none_or(|e| end >= e.end) {
            folders.push(self.folders);
        }

        let mut paths = Vec::new();
        for folder in folders {
            let folder_entries = index::read_entries(&self.layout.folder_map(folder))?;
            for entry in folder_entries.iter().filter(|e| e.overlaps(start, end)) {
                let path = self.layout.data_file(folder, entry.id);
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
            if folder == self.folders && folder_entries.last().is_none_or(|e| end >= e.end) {
                let path = self.current_file();
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }

    /// Opens the next folder: bumps the folder counter, resets the file
    /// counter, and creates the directory with its empty index file.
    fn new_folder(&mut self) -> Result<()> {
        self.folders += 1;
        self.files = 0;
        fs::create_dir(self.layout.folder_dir(self.folders))?;
        File::create(self.layout.folder_map(self.folders))?;
        debug!(folder = self.folders, "opened new folder");
        Ok(())
    }

    fn new_file(&mut self) {
        self.files += 1;
    }

    fn write_checkpoint(&self) -> Result<()> {
        Checkpoint {
            folders: self.folders,
            files: self.files,
            folder_start: self.folder_start,
            file_start: self.file_start,
        }
        .write(&self.layout.checkpoint())
    }
}

/// Capacity of one data file in records.
fn lines_per_file(bytes_per_file: i32, record_len: usize) -> usize {
    bytes_per_file as usize / record_len + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_meta(bytes_per_file: i32, files_per_folder: i32) -> Metadata {
        Metadata {
            version: meta::META_VERSION,
            init_time: 1_000,
            bytes_per_file,
            files_per_folder,
            user_format: "ii".to_string(),
            dense_format: "ii".to_string(),
            field_names: vec!["timestamp".to_string(), "value".to_string()],
        }
    }

    fn manager(dir: &TempDir) -> SegmentManager {
        let layout = SegmentLayout::new(dir.path().join("db"));
        SegmentManager::create(layout, &test_meta(8, 2), 8).unwrap()
    }

    #[test]
    fn test_create_lays_out_database() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let layout = manager.layout();
        assert!(layout.db_info().exists());
        assert!(layout.db_map().exists());
        assert!(layout.checkpoint().exists());
        assert!(layout.folder_map(1).exists());
        assert_eq!(manager.folders(), 1);
        assert_eq!(manager.files(), 1);
        assert_eq!(manager.lines_per_file(), 2);
    }

    #[test]
    fn test_create_rejects_existing_database() {
        let dir = TempDir::new().unwrap();
        let _manager = manager(&dir);
        let layout = SegmentLayout::new(dir.path().join("db"));
        let result = SegmentManager::create(layout, &test_meta(8, 2), 8);
        assert!(matches!(result, Err(StoreError::DatabaseExists(_))));
    }

    #[test]
    fn test_rotation_closes_intervals_and_advances_counters() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);

        manager.rotate(1_004).unwrap();
        assert_eq!((manager.folders(), manager.files()), (1, 2));

        manager.rotate(1_008).unwrap();
        assert_eq!((manager.folders(), manager.files()), (2, 1));

        let folder1 = index::read_entries(&manager.layout().folder_map(1)).unwrap();
        assert_eq!(
            folder1,
            vec![
                TimeIndexEntry {
                    start: 1_000,
                    end: 1_004,
                    id: 1
                },
                TimeIndexEntry {
                    start: 1_004,
                    end: 1_008,
                    id: 2
                },
            ]
        );
        let db = index::read_entries(&manager.layout().db_map()).unwrap();
        assert_eq!(
            db,
            vec![TimeIndexEntry {
                start: 1_000,
                end: 1_008,
                id: 1
            }]
        );
    }

    #[test]
    fn test_rotation_persists_checkpoint() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        manager.rotate(1_004).unwrap();

        let checkpoint = Checkpoint::read(&manager.layout().checkpoint()).unwrap();
        assert_eq!(
            checkpoint,
            Checkpoint {
                folders: 1,
                files: 2,
                folder_start: 1_000,
                file_start: 1_004,
            }
        );
    }

    #[test]
    fn test_locate_by_time_prefers_closed_intervals() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        manager.rotate(1_004).unwrap();
        manager.rotate(1_008).unwrap();

        let layout = manager.layout();
        assert_eq!(
            manager.locate_by_time(1_001).unwrap(),
            layout.data_file(1, 1)
        );
        assert_eq!(
            manager.locate_by_time(1_005).unwrap(),
            layout.data_file(1, 2)
        );
        // Past every closed interval: the open folder and file.
        assert_eq!(
            manager.locate_by_time(1_009).unwrap(),
            layout.data_file(2, 1)
        );
    }

    #[test]
    fn test_locate_range_spans_folders_and_open_file() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        manager.rotate(1_004).unwrap();
        manager.rotate(1_008).unwrap();

        let layout = manager.layout();
        let paths = manager.locate_range(1_001, 1_010).unwrap();
        assert_eq!(
            paths,
            vec![
                layout.data_file(1, 1),
                layout.data_file(1, 2),
                layout.data_file(2, 1),
            ]
        );
    }

    #[test]
    fn test_locate_range_inside_one_closed_file() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        manager.rotate(1_010).unwrap();

        // Range strictly inside the closed interval must still match it.
        let paths = manager.locate_range(1_002, 1_003).unwrap();
        assert_eq!(paths, vec![manager.layout().data_file(1, 1)]);
    }

    #[test]
    fn test_locate_range_excludes_current_when_range_is_old() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        manager.rotate(1_004).unwrap();

        let paths = manager.locate_range(1_000, 1_003).unwrap();
        assert_eq!(paths, vec![manager.layout().data_file(1, 1)]);
    }

    #[test]
    fn test_append_creates_and_extends_current_file() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        manager.append(&[1u8; 8]).unwrap();
        manager.append(&[2u8; 8]).unwrap();
        let bytes = fs::read(manager.current_file()).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &[1u8; 8]);
    }

    #[test]
    fn test_resume_restores_counters() {
        let dir = TempDir::new().unwrap();
        let layout = SegmentLayout::new(dir.path().join("db"));
        let meta = test_meta(8, 2);
        {
            let mut manager = SegmentManager::create(layout.clone(), &meta, 8).unwrap();
            manager.rotate(1_004).unwrap();
        }
        let manager = SegmentManager::resume(layout, &meta, 8).unwrap();
        assert_eq!((manager.folders(), manager.files()), (1, 2));
    }

    #[test]
    fn test_resume_without_checkpoint_fails() {
        let dir = TempDir::new().unwrap();
        let layout = SegmentLayout::new(dir.path().join("db"));
        let result = SegmentManager::resume(layout, &test_meta(8, 2), 8);
        assert!(matches!(result, Err(StoreError::Reopen(_))));
    }
}
