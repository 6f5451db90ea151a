use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Millisecond clock used for throttling, render timing and frame metrics.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Monotonic clock anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock. Time only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    // f64 bits
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: AtomicU64::new(start_ms.to_bits()),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.store(ms.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, ms: f64) {
        let next = self.now_ms() + ms;
        self.set(next);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.now.load(Ordering::SeqCst))
    }
}
