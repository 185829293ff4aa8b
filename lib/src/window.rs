//! Validity window for a freshly generated commitment.
//!
//! The countdown is a value, not a timer: callers feed it ticks from
//! whatever clock drives the session and act on [`WindowState::Expired`].

/// Default lifetime of a pending commitment, in seconds.
pub const DEFAULT_VALIDITY_SECS: u64 = 60;

/// A running countdown with one-second granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
    /// Unix second of the last tick applied.
    last_tick: u64,
}

/// Result of advancing a countdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowState {
    Running(Countdown),
    /// Reached zero. The countdown is consumed, so this is observed once.
    Expired,
}

impl Countdown {
    /// Start a countdown of `duration_secs` at unix second `now`.
    pub fn start(duration_secs: u64, now: u64) -> Self {
        Countdown {
            remaining: duration_secs,
            last_tick: now,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Decrement by one second.
    pub fn tick(self) -> WindowState {
        let remaining = self.remaining.saturating_sub(1);
        if remaining == 0 {
            WindowState::Expired
        } else {
            WindowState::Running(Countdown {
                remaining,
                last_tick: self.last_tick + 1,
            })
        }
    }

    /// Apply one tick per whole second elapsed since the last tick.
    ///
    /// A clock that reads the same second twice, or goes backwards, leaves
    /// the countdown unchanged.
    pub fn advance(self, now: u64) -> WindowState {
        let mut state = WindowState::Running(self);
        while let WindowState::Running(countdown) = state {
            if countdown.last_tick >= now {
                break;
            }
            state = countdown.tick();
        }
        state
    }
}
