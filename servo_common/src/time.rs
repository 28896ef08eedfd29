//! Monotonic millisecond timebase.
//!
//! The control loop never reads the wall clock directly; it asks a
//! [`Timebase`]. [`MonotonicClock`] backs production runs, [`ManualClock`]
//! gives tests full control over elapsed time.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic millisecond counter that never resets during a session.
pub trait Timebase {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since construction, from `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Timebase for MonotonicClock {
    #[inline]
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock. Clones share the same counter.
///
/// Single-threaded by construction (`Rc<Cell<_>>`), matching the loop it
/// drives.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    /// Jump to `ms`. Ignored if it would move time backwards.
    pub fn set(&self, ms: u64) {
        if ms >= self.now.get() {
            self.now.set(ms);
        }
    }
}

impl Timebase for ManualClock {
    #[inline]
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

impl<T: Timebase + ?Sized> Timebase for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
