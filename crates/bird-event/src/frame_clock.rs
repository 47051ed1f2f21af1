#![forbid(unsafe_code)]

//! Frame-to-frame delta tracking for the per-frame tick adapter.

/// Remembers the timestamp of the previous frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    last_ms: f64,
}

impl FrameClock {
    /// Start the clock at `now_ms`; the first delta is measured from here.
    #[must_use]
    pub const fn starting_at(now_ms: f64) -> Self {
        Self { last_ms: now_ms }
    }

    #[must_use]
    pub const fn last_ms(&self) -> f64 {
        self.last_ms
    }

    /// Record a frame at `now_ms` and return the time since the previous one.
    pub fn tick(&mut self, now_ms: f64) -> f64 {
        let dt = now_ms - self.last_ms;
        self.last_ms = now_ms;
        dt
    }
}
