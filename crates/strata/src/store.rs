//! Top-level record store: logging and queries.
//!
//! [`RecordStore`] composes the dense packer and the segment manager. It
//! prepends the implicit `i32` timestamp field to every user schema,
//! enforces the monotonic-timestamp invariant, rotates files as they fill,
//! and answers point, range, and predicate queries through the two-level
//! time index.

use crate::clock::Clock;
use crate::error::{Result, StoreError};
use crate::format::FormatSpec;
use crate::packer::{DensePacker, Value};
use crate::segment::meta::{Metadata, META_VERSION};
use crate::segment::{SegmentLayout, SegmentManager};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// One decoded record in user order, timestamp at logical index 0.
pub type Record = Vec<Value>;

/// Store configuration.
///
/// `bytes_per_file` sizes data files (`lines_per_file` is derived from it
/// and the record length); `files_per_folder` caps a folder before it
/// retires.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Data file capacity in bytes.
    pub bytes_per_file: i32,
    /// Number of data files per folder.
    pub files_per_folder: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bytes_per_file: 1024,
            files_per_folder: 50,
        }
    }
}

/// An open database handle: single writer, synchronous blocking I/O.
///
/// # Examples
/// ```rust,ignore
/// use strata::{RecordStore, StoreConfig, SystemClock, Value};
///
/// let mut store = RecordStore::create(
///     "/data/telemetry",
///     "if",
///     &["index", "reading"],
///     StoreConfig::default(),
///     SystemClock,
/// )?;
/// store.log(&[Value::Int32(1), Value::Float32(20.5)])?;
/// let recent = store.get_in_range(start, end)?;
/// ```
pub struct RecordStore<C: Clock> {
    packer: DensePacker,
    segments: SegmentManager,
    field_names: Vec<String>,
    clock: C,
    init_time: i32,
    prev_timestamp: i32,
    cursor: usize,
}

impl<C: Clock> RecordStore<C> {
    /// Creates a new database at `root`.
    ///
    /// `user_format` declares the caller's fields; the implicit `i32`
    /// timestamp field and its `"timestamp"` name are prepended here, so
    /// `field_names` must match `user_format` one to one.
    pub fn create(
        root: impl AsRef<Path>,
        user_format: &str,
        field_names: &[&str],
        config: StoreConfig,
        clock: C,
    ) -> Result<Self> {
        if field_names.len() != user_format.chars().count() {
            return Err(StoreError::RecordMismatch(format!(
                "{} field names for {} format codes",
                field_names.len(),
                user_format.chars().count()
            )));
        }
        let full_format = format!("i{user_format}");
        let spec = FormatSpec::parse(&full_format)?;
        let init_time = clock.now();

        let mut names = Vec::with_capacity(field_names.len() + 1);
        names.push("timestamp".to_string());
        names.extend(field_names.iter().map(|n| n.to_string()));

        let meta = Metadata {
            version: META_VERSION,
            init_time,
            bytes_per_file: config.bytes_per_file,
            files_per_folder: config.files_per_folder,
            user_format: spec.user_string(),
            dense_format: spec.dense_string(),
            field_names: names.clone(),
        };
        let record_len = spec.record_len();
        let segments = SegmentManager::create(SegmentLayout::new(root), &meta, record_len)?;

        Ok(Self {
            packer: DensePacker::from_spec(spec),
            segments,
            field_names: names,
            clock,
            init_time,
            prev_timestamp: init_time,
            cursor: 0,
        })
    }

    /// Reopens an existing database at `root`.
    ///
    /// The schema and limits come from the metadata file; the counters come
    /// from the checkpoint. One unconditional rotation runs before any
    /// write, so the previous process's last file, which may hold a torn
    /// record, is never appended to again.
    pub fn open(root: impl AsRef<Path>, clock: C) -> Result<Self> {
        let layout = SegmentLayout::new(root);
        let meta = Metadata::read(&layout.db_info())?;
        let spec = FormatSpec::parse(&meta.user_format)
            .map_err(|e| StoreError::Reopen(format!("metadata holds invalid format: {e}")))?;
        if spec.dense_string() != meta.dense_format {
            return Err(StoreError::Reopen(format!(
                "stored dense format {:?} does not match derived {:?}",
                meta.dense_format,
                spec.dense_string()
            )));
        }

        let record_len = spec.record_len();
        let mut segments = SegmentManager::resume(layout, &meta, record_len)?;
        let now = clock.now();
        segments.rotate(now)?;
        debug!(root = %segments.layout().root().display(), "reopened into fresh data file");

        Ok(Self {
            packer: DensePacker::from_spec(spec),
            segments,
            field_names: meta.field_names,
            clock,
            init_time: meta.init_time,
            prev_timestamp: now,
            cursor: 0,
        })
    }

    /// The database's recorded start time.
    pub fn init_time(&self) -> i32 {
        self.init_time
    }

    /// Field names in user order, `"timestamp"` included.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// The segment manager backing this store.
    pub fn segments(&self) -> &SegmentManager {
        &self.segments
    }

    /// Logs one record at the current clock time.
    ///
    /// Fails with [`StoreError::TimeOrder`] when the clock ran backwards;
    /// nothing is written in that case. Rotates to the next file first when
    /// the current one is full. `values` excludes the timestamp.
    pub fn log(&mut self, values: &[Value]) -> Result<()> {
        let timestamp = self.clock.now();
        if timestamp < self.prev_timestamp {
            return Err(StoreError::TimeOrder {
                timestamp,
                previous: self.prev_timestamp,
            });
        }

        if self.cursor >= self.segments.lines_per_file() {
            self.segments.rotate(timestamp)?;
            self.cursor = 0;
        }

        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(Value::Int32(timestamp));
        record.extend_from_slice(values);
        let bytes = self.packer.pack(&record)?;
        self.segments.append(&bytes)?;

        self.cursor += 1;
        self.prev_timestamp = timestamp;
        Ok(())
    }

    /// Reads record `n` of the current file, timestamp stripped.
    pub fn nth(&self, n: usize) -> Result<Record> {
        let record_len = self.packer.record_len();
        let mut file = File::open(self.segments.current_file())?;
        file.seek(SeekFrom::Start((n * record_len) as u64))?;
        let mut bytes = vec![0u8; record_len];
        file.read_exact(&mut bytes)?;
        let mut record = self.packer.unpack(&bytes)?;
        record.remove(0);
        Ok(record)
    }

    /// Collects logical field `i` from every record in the current file.
    ///
    /// Bounded by the file's record capacity and by end-of-file, whichever
    /// comes first; the result is rotated so the oldest record comes first
    /// relative to the in-file cursor.
    pub fn column(&self, i: usize) -> Result<Vec<Value>> {
        if i >= self.packer.spec().arity() {
            return Err(StoreError::RecordMismatch(format!(
                "field index {i} out of range for arity {}",
                self.packer.spec().arity()
            )));
        }
        let mut values = Vec::new();
        for record in self.scan_file(&self.segments.current_file())? {
            values.push(record[i]);
        }
        if !values.is_empty() {
            let len = values.len();
            values.rotate_left(self.cursor % len);
        }
        Ok(values)
    }

    /// Returns the first record logged at exactly `t`, if any.
    ///
    /// Fails with [`StoreError::BeforeStart`] when `t` precedes the
    /// database's recorded start time.
    pub fn get_at_time(&self, t: i32) -> Result<Option<Record>> {
        if t < self.init_time {
            return Err(StoreError::BeforeStart {
                time: t,
                start: self.init_time,
            });
        }
        let path = self.segments.locate_by_time(t)?;
        for record in self.scan_file(&path)? {
            if record[0] == Value::Int32(t) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Returns every record whose timestamp lies in `[start, end]`, in time
    /// order.
    pub fn get_in_range(&self, start: i32, end: i32) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for path in self.segments.locate_range(start, end)? {
            for record in self.scan_file(&path)? {
                let ts = record[0].as_i32().unwrap_or(i32::MIN);
                if start <= ts && ts <= end {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// Returns every record in `[start, end]` whose named field satisfies
    /// `predicate`, in time order.
    ///
    /// `start` defaults to the database start time and `end` to the current
    /// clock time. The field name matches case-insensitively against the
    /// stored names (`"timestamp"` included).
    pub fn get_filtered<P>(
        &self,
        field: &str,
        predicate: P,
        start: Option<i32>,
        end: Option<i32>,
    ) -> Result<Vec<Record>>
    where
        P: Fn(&Value) -> bool,
    {
        let start = start.unwrap_or(self.init_time);
        let end = end.unwrap_or_else(|| self.clock.now());
        let field_index = self
            .field_names
            .iter()
            .position(|name| name.eq_ignore_ascii_case(field))
            .ok_or_else(|| StoreError::UnknownField(field.to_string()))?;

        let mut records = Vec::new();
        for path in self.segments.locate_range(start, end)? {
            for record in self.scan_file(&path)? {
                let ts = record[0].as_i32().unwrap_or(i32::MIN);
                if start <= ts && ts <= end && predicate(&record[field_index]) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// Reads every full-length record of one data file.
    ///
    /// A missing file yields no records (the open file may not exist yet);
    /// a short trailing record is treated as end-of-file for the segment,
    /// per the recovery policy. Reads at most `lines_per_file` records.
    fn scan_file(&self, path: &Path) -> Result<Vec<Record>> {
        let record_len = self.packer.record_len();
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        let mut bytes = vec![0u8; record_len];
        for _ in 0..self.segments.lines_per_file() {
            match file.read_exact(&mut bytes) {
                Ok(()) => records.push(self.packer.unpack(&bytes)?),
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(records)
    }
}
