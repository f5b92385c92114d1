//! Per-process state machine: `COLD -> WARMING ->
//! READY -> DRAINING -> STOPPED`. `/health` reports 200 only in `READY`.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Cold = 0,
    Warming = 1,
    Ready = 2,
    Draining = 3,
    Stopped = 4,
}

impl State {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => State::Cold,
            1 => State::Warming,
            2 => State::Ready,
            3 => State::Draining,
            _ => State::Stopped,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Cold => "cold",
            State::Warming => "warming",
            State::Ready => "ready",
            State::Draining => "draining",
            State::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

/// Atomic holder so the HTTP health handler can read current state without
/// touching the batcher loop's internals.
pub struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub fn new() -> Self {
        Self(AtomicU8::new(State::Cold as u8))
    }

    pub fn get(&self) -> State {
        State::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: State) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.get() == State::Ready
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
