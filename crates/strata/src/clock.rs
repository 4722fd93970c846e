//! Injectable time source.
//!
//! The store never reads the system clock directly. It is handed a [`Clock`]
//! at open time: production code passes [`SystemClock`], tests pass a
//! [`ManualClock`] (or a closure) so rotation and query behavior is
//! deterministic.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A capability producing the current epoch time in whole seconds.
pub trait Clock {
    /// Returns the current epoch time in seconds.
    fn now(&self) -> i32;
}

/// Production clock backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i32)
            .unwrap_or(0)
    }
}

/// Any zero-argument closure returning an epoch second is a clock.
impl<F: Fn() -> i32> Clock for F {
    fn now(&self) -> i32 {
        self()
    }
}

/// Deterministic clock for tests.
///
/// Clones share the same underlying time, so a test can keep one handle to
/// advance time while the store owns another.
///
/// # Examples
/// ```rust,ignore
/// use strata::clock::ManualClock;
///
/// let clock = ManualClock::new(1_000);
/// let handle = clock.clone();
/// handle.advance(2);
/// assert_eq!(clock.now(), 1_002);
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<i32>>);

impl ManualClock {
    /// Creates a manual clock starting at the given epoch second.
    pub fn new(start: i32) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    /// Sets the current time.
    pub fn set(&self, now: i32) {
        self.0.set(now);
    }

    /// Advances the current time by `secs` (may be negative).
    pub fn advance(&self, secs: i32) {
        self.0.set(self.0.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i32 {
        self.0.get()
    }
}
