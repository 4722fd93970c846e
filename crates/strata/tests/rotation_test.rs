//! Rotation and time-index correctness against a deterministic clock.
//!
//! Mirrors the reference scenario: a store sized so each data file holds
//! two records and each folder two files, fed five records at two-second
//! intervals, must close exactly the intervals the index files record.

use strata::segment::index::{read_entries, TimeIndexEntry};
use strata::{ManualClock, RecordStore, StoreConfig, Value};
use tempfile::TempDir;

const T0: i32 = 1_000;

/// Record format "ifc" plus the implicit timestamp packs to 13 bytes, so
/// 20 bytes per file gives `lines_per_file == 2`.
fn two_by_two_store(dir: &TempDir, clock: ManualClock) -> RecordStore<ManualClock> {
    RecordStore::create(
        dir.path().join("db"),
        "ifc",
        &["integer", "float", "character"],
        StoreConfig {
            bytes_per_file: 20,
            files_per_folder: 2,
        },
        clock,
    )
    .unwrap()
}

fn log_sample(store: &mut RecordStore<ManualClock>, clock: &ManualClock, count: usize) {
    for i in 0..count {
        store
            .log(&[
                Value::Int32(i as i32),
                Value::Float32(i as f32 + 0.5),
                Value::Char(b'a' + i as u8),
            ])
            .unwrap();
        clock.advance(2);
    }
}

#[test]
fn test_five_records_close_two_files_and_one_folder() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(T0);
    let mut store = two_by_two_store(&dir, clock.clone());
    log_sample(&mut store, &clock, 5);

    let layout = store.segments().layout();
    let folder1 = read_entries(&layout.folder_map(1)).unwrap();
    assert_eq!(
        folder1,
        vec![
            TimeIndexEntry {
                start: T0,
                end: T0 + 4,
                id: 1
            },
            TimeIndexEntry {
                start: T0 + 4,
                end: T0 + 8,
                id: 2
            },
        ]
    );

    let db = read_entries(&layout.db_map()).unwrap();
    assert_eq!(
        db,
        vec![TimeIndexEntry {
            start: T0,
            end: T0 + 8,
            id: 1
        }]
    );
}

#[test]
fn test_rotation_lands_records_in_numbered_files() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(T0);
    let mut store = two_by_two_store(&dir, clock.clone());
    log_sample(&mut store, &clock, 5);

    let layout = store.segments().layout();
    // Two full files in folder 1, the fifth record alone in folder 2.
    assert_eq!(
        std::fs::read(layout.data_file(1, 1)).unwrap().len(),
        2 * 13
    );
    assert_eq!(
        std::fs::read(layout.data_file(1, 2)).unwrap().len(),
        2 * 13
    );
    assert_eq!(std::fs::read(layout.data_file(2, 1)).unwrap().len(), 13);
    assert_eq!((store.segments().folders(), store.segments().files()), (2, 1));
}

#[test]
fn test_open_units_have_no_index_entry() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(T0);
    let mut store = two_by_two_store(&dir, clock.clone());
    log_sample(&mut store, &clock, 3);

    // One rotation so far: file 1 closed, file 2 and folder 1 still open.
    let layout = store.segments().layout();
    assert_eq!(read_entries(&layout.folder_map(1)).unwrap().len(), 1);
    assert!(read_entries(&layout.db_map()).unwrap().is_empty());
}

#[test]
fn test_located_paths_cover_all_closed_and_open_units() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(T0);
    let mut store = two_by_two_store(&dir, clock.clone());
    log_sample(&mut store, &clock, 5);

    let layout = store.segments().layout();
    let paths = store.segments().locate_range(T0, T0 + 8).unwrap();
    assert_eq!(
        paths,
        vec![
            layout.data_file(1, 1),
            layout.data_file(1, 2),
            layout.data_file(2, 1),
        ]
    );

    // A range ending before the open units were started stays narrow.
    let paths = store.segments().locate_range(T0, T0 + 2).unwrap();
    assert_eq!(paths, vec![layout.data_file(1, 1)]);
}
