// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Stream clock: explicit timestamps with a logical fallback.
use tracing::warn;

use crate::update::Timestamp;

/// Tracks the current stream time and the time of the first update.
///
/// The clock starts at 0; an update without a timestamp advances it by one,
/// so the first untimed update is stamped 1. Time never moves backwards: an
/// explicit timestamp earlier than the current time is clamped to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Clock {
    now: Timestamp,
    start: Option<Timestamp>,
}

impl Clock {
    /// Advances the clock for one update and returns the update's time.
    pub fn tick(&mut self, explicit: Option<Timestamp>) -> Timestamp {
        let now = match explicit {
            Some(t) if self.start.is_some() && t < self.now => {
                warn!(timestamp = t, now = self.now, "out-of-order timestamp clamped");
                self.now
            }
            Some(t) => t,
            None => self.now + 1,
        };
        self.now = now;
        self.start.get_or_insert(now);
        now
    }

    /// Current time (time of the most recent update, or 0 before any).
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Time of the first update ever seen, if any.
    pub fn stream_start(&self) -> Option<Timestamp> {
        self.start
    }
}
