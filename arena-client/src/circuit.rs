//! Per-endpoint circuit breaker: atomic counters,
//! no locks on the request path.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const FAILURE_WINDOW: Duration = Duration::from_secs(30);
const OPEN_COOLDOWN: Duration = Duration::from_secs(15);
const FAILURE_THRESHOLD: u32 = 3;

const UNSET: u64 = u64::MAX;

pub struct CircuitBreaker {
    start: Instant,
    consecutive_unreachable: AtomicU32,
    window_start_ms: AtomicU64,
    opened_at_ms: AtomicU64,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            consecutive_unreachable: AtomicU32::new(0),
            window_start_ms: AtomicU64::new(UNSET),
            opened_at_ms: AtomicU64::new(UNSET),
        }
    }

    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// True if the breaker is open and the cooldown hasn't elapsed yet —
    /// callers must skip the HTTP attempt entirely and report `Unreachable`.
    pub fn is_open(&self) -> bool {
        let opened_at = self.opened_at_ms.load(Ordering::SeqCst);
        if opened_at == UNSET {
            return false;
        }
        self.now_ms().saturating_sub(opened_at) < OPEN_COOLDOWN.as_millis() as u64
    }

    pub fn record_success(&self) {
        self.consecutive_unreachable.store(0, Ordering::SeqCst);
        self.window_start_ms.store(UNSET, Ordering::SeqCst);
        self.opened_at_ms.store(UNSET, Ordering::SeqCst);
    }

    pub fn record_unreachable(&self) {
        let now = self.now_ms();

        // A failure while the breaker was open is the probe attempt failing:
        // re-open immediately for another cooldown window.
        if self.opened_at_ms.load(Ordering::SeqCst) != UNSET {
            self.opened_at_ms.store(now, Ordering::SeqCst);
            return;
        }

        let window_start = self.window_start_ms.load(Ordering::SeqCst);
        let count = if window_start == UNSET
            || now.saturating_sub(window_start) > FAILURE_WINDOW.as_millis() as u64
        {
            self.window_start_ms.store(now, Ordering::SeqCst);
            self.consecutive_unreachable.store(1, Ordering::SeqCst);
            1
        } else {
            self.consecutive_unreachable.fetch_add(1, Ordering::SeqCst) + 1
        };

        if count >= FAILURE_THRESHOLD {
            self.opened_at_ms.store(now, Ordering::SeqCst);
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
