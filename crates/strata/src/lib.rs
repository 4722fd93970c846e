//! Strata - embedded append-only time-series record store.
//!
//! A single writer logs fixed-shape tuples of typed values, each implicitly
//! timestamped, into a rotating sequence of data files grouped into folders.
//! A two-level time index (database level and folder level) narrows lookups
//! by timestamp or time range to file granularity without scanning the whole
//! database.
//!
//! # Components
//!
//! - [`FormatSpec`] / [`DensePacker`]: byte-width-sorted record layout and
//!   fixed-width packing
//! - [`SegmentManager`]: data-file and folder rotation, time indexes,
//!   checkpointed restart
//! - [`RecordStore`]: the open-database handle with logging and point,
//!   range, and predicate queries
//!
//! # Example
//!
//! ```rust,ignore
//! use strata::{RecordStore, StoreConfig, SystemClock, Value};
//!
//! let mut store = RecordStore::create(
//!     "/data/telemetry",
//!     "if",
//!     &["index", "reading"],
//!     StoreConfig::default(),
//!     SystemClock,
//! )?;
//!
//! store.log(&[Value::Int32(1), Value::Float32(20.5)])?;
//!
//! // Later, or from a fresh process:
//! let store = RecordStore::open("/data/telemetry", SystemClock)?;
//! let hot = store.get_filtered("reading", |v| v.as_f32() > Some(30.0), None, None)?;
//! ```
//!
//! One writer process per database directory; no locking is provided.

#![deny(missing_docs)]

pub mod clock;
pub mod error;
pub mod format;
pub mod packer;
pub mod segment;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, StoreError};
pub use format::{FieldType, FormatSpec};
pub use packer::{DensePacker, Value};
pub use segment::{SegmentLayout, SegmentManager};
pub use store::{Record, RecordStore, StoreConfig};
