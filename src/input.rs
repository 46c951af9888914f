//! Coalescing of high-frequency input samples.
//!
//! A slider drag produces far more samples than it is worth re-rendering
//! for. [`Throttle`] lets at most one render through per window; samples
//! that land inside the window are remembered and flushed by [`Throttle::tick`]
//! once the window elapses, so the last value of a burst is never lost.
//! Callers pass `Instant`s explicitly, which keeps the behavior
//! deterministic under test.

use std::time::{Duration, Instant};

pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(75);

#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last_render: Option<Instant>,
    pending: bool,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE)
    }
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_render: None,
            pending: false,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn window_open(&self, now: Instant) -> bool {
        match self.last_render {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.window,
        }
    }

    /// A new sample arrived. Returns true if it should render now.
    pub fn sample(&mut self, now: Instant) -> bool {
        if self.window_open(now) {
            self.last_render = Some(now);
            self.pending = false;
            true
        } else {
            self.pending = true;
            false
        }
    }

    /// Trailing edge: true if a held-back sample is due for rendering.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.pending && self.window_open(now) {
            self.last_render = Some(now);
            self.pending = false;
            true
        } else {
            false
        }
    }

    /// Whether a sample is waiting for the trailing flush.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// The gesture ended and its final value was rendered.
    pub fn settle(&mut self) {
        self.last_render = None;
        self.pending = false;
    }
}
