#![forbid(unsafe_code)]

//! Key-repeat emulation.
//!
//! While a key is held the browser delivers its own auto-repeat `keydown`
//! events at an OS-defined rate. [`KeyRepeat`] ignores those and instead runs
//! one fixed-rate timer between the first matching `keydown` and the next
//! matching `keyup`:
//!
//! ```text
//!            keydown(k) / start timer
//!   Idle ─────────────────────────────▶ Repeating(id)
//!    ▲                                      │  keydown(k): no-op
//!    └──────────────────────────────────────┘
//!            keyup(k) / clear timer
//! ```
//!
//! The state machine only decides; starting and clearing the timer is done
//! by the caller, which keeps this module free of platform types.

use crate::platform::IntervalId;

/// Current state of one key-repeat registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatState {
    #[default]
    Idle,
    Repeating(IntervalId),
}

/// Outcome of feeding one key event to [`KeyRepeat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatTransition {
    /// The event was for a different key.
    Ignored,
    /// Idle → Repeating; the timer was started.
    Started(IntervalId),
    /// Keydown while already repeating (browser auto-repeat).
    AlreadyRepeating,
    /// Repeating → Idle; the caller must clear this timer.
    Stopped(IntervalId),
    /// Keyup with no timer running.
    AlreadyIdle,
}

/// Per-registration key-repeat state machine. Holds at most one timer.
#[derive(Debug, Clone)]
pub struct KeyRepeat {
    key: String,
    state: RepeatState,
}

impl KeyRepeat {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: RepeatState::Idle,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn state(&self) -> RepeatState {
        self.state
    }

    #[must_use]
    pub const fn is_repeating(&self) -> bool {
        matches!(self.state, RepeatState::Repeating(_))
    }

    /// Feed a `keydown` with DOM key label `key`.
    ///
    /// `start` is only called on the Idle → Repeating edge. If it fails the
    /// state stays Idle and the error is returned.
    pub fn key_down<E>(
        &mut self,
        key: &str,
        start: impl FnOnce() -> Result<IntervalId, E>,
    ) -> Result<RepeatTransition, E> {
        if key != self.key {
            return Ok(RepeatTransition::Ignored);
        }
        match self.state {
            RepeatState::Repeating(_) => Ok(RepeatTransition::AlreadyRepeating),
            RepeatState::Idle => {
                let id = start()?;
                self.state = RepeatState::Repeating(id);
                Ok(RepeatTransition::Started(id))
            }
        }
    }

    /// Feed a `keyup` with DOM key label `key`.
    pub fn key_up(&mut self, key: &str) -> RepeatTransition {
        if key != self.key {
            return RepeatTransition::Ignored;
        }
        match core::mem::take(&mut self.state) {
            RepeatState::Repeating(id) => RepeatTransition::Stopped(id),
            RepeatState::Idle => RepeatTransition::AlreadyIdle,
        }
    }
}
