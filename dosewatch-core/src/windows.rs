//! Dose-time windows and the resolver mapping wall-clock time to slots.
//!
//! Offsets are milliseconds since local midnight. The resolver is a pure
//! function of a caller-supplied "now" and the window table, so it is
//! testable without touching the wall clock.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::drug::DoseSlot;
use crate::error::ConfigurationError;

pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Milliseconds since midnight for a wall-clock hour/minute.
pub fn clock_ms(hour: i64, minute: i64) -> i64 {
    (hour * 60 + minute) * 60 * 1000
}

fn offset_ms(t: NaiveTime) -> i64 {
    i64::from(t.num_seconds_from_midnight()) * 1000 + i64::from(t.nanosecond() / 1_000_000)
}

/// One slot's `[begin, end)` period, in milliseconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotWindow {
    pub begin_ms: i64,
    pub end_ms: i64,
}

impl SlotWindow {
    pub fn new(begin_ms: i64, end_ms: i64) -> Self {
        Self { begin_ms, end_ms }
    }

    fn contains(&self, offset: i64) -> bool {
        offset >= self.begin_ms && offset < self.end_ms
    }
}

/// The four timed windows plus the snooze interval.
///
/// Validated on construction: a table that deserializes around the
/// constructor still fails fast in [`DoseWindows::next_slot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseWindows {
    windows: [SlotWindow; 4],
    snooze_ms: i64,
}

impl DoseWindows {
    pub fn new(windows: [SlotWindow; 4], snooze_ms: i64) -> Result<Self, ConfigurationError> {
        for (slot, w) in DoseSlot::TIMED.iter().zip(windows.iter()) {
            if w.begin_ms < 0
                || w.begin_ms >= MILLIS_PER_DAY
                || w.end_ms > MILLIS_PER_DAY
                || w.begin_ms >= w.end_ms
            {
                return Err(ConfigurationError::InvalidWindow { slot: slot.label() });
            }
        }

        // Overlapping windows would make "the" active slot ambiguous; that
        // is a configuration error, not a tie to break.
        let mut ordered: Vec<(DoseSlot, SlotWindow)> = DoseSlot::TIMED
            .iter()
            .copied()
            .zip(windows.iter().copied())
            .collect();
        ordered.sort_by_key(|(_, w)| w.begin_ms);
        for pair in ordered.windows(2) {
            if pair[0].1.end_ms > pair[1].1.begin_ms {
                return Err(ConfigurationError::OverlappingWindows {
                    first: pair[0].0.label(),
                    second: pair[1].0.label(),
                });
            }
        }

        Ok(Self {
            windows,
            snooze_ms: snooze_ms.max(0),
        })
    }

    pub fn window(&self, slot: DoseSlot) -> Option<SlotWindow> {
        slot.is_timed().then(|| self.windows[slot.index()])
    }

    /// Zero disables repeated reminders within a slot.
    pub fn snooze(&self) -> Duration {
        Duration::milliseconds(self.snooze_ms)
    }

    /// The unique slot whose window contains `t`, if any.
    pub fn active_slot(&self, t: NaiveTime) -> Option<DoseSlot> {
        let offset = offset_ms(t);
        DoseSlot::TIMED
            .iter()
            .copied()
            .find(|slot| self.windows[slot.index()].contains(offset))
    }

    /// The next slot to begin at or after `t`, wrapping to tomorrow's
    /// first slot once every begin has passed.
    pub fn next_slot(&self, t: NaiveTime) -> Result<DoseSlot, ConfigurationError> {
        let offset = offset_ms(t);
        self.next_slot_from(offset)
            .or_else(|| self.next_slot_from(offset - MILLIS_PER_DAY))
            .ok_or(ConfigurationError::NoUpcomingWindow)
    }

    fn next_slot_from(&self, offset: i64) -> Option<DoseSlot> {
        let mut best: Option<(i64, DoseSlot)> = None;
        for slot in DoseSlot::TIMED {
            let diff = self.windows[slot.index()].begin_ms - offset;
            if diff >= 0 && best.map(|(d, _)| diff < d).unwrap_or(true) {
                best = Some((diff, slot));
            }
        }
        best.map(|(_, slot)| slot)
    }

    /// Wall-clock time until the next occurrence of `slot`'s begin.
    /// Never negative; a boundary already past today refers to tomorrow.
    /// `slot` must be timed.
    pub fn until_begin(&self, now: NaiveDateTime, slot: DoseSlot) -> Duration {
        self.until_boundary(now, self.windows[slot.index()].begin_ms)
    }

    /// Wall-clock time until the next occurrence of `slot`'s end.
    /// `slot` must be timed.
    pub fn until_end(&self, now: NaiveDateTime, slot: DoseSlot) -> Duration {
        self.until_boundary(now, self.windows[slot.index()].end_ms)
    }

    fn until_boundary(&self, now: NaiveDateTime, boundary_ms: i64) -> Duration {
        let midnight = now.date().and_time(NaiveTime::MIN);
        let mut at = midnight + Duration::milliseconds(boundary_ms);
        if at < now {
            at += Duration::days(1);
        }
        at - now
    }
}

impl Default for DoseWindows {
    /// morning 06:00–11:00, noon 11:00–15:00, evening 15:00–20:00,
    /// night 20:00–24:00, snooze 30 min.
    fn default() -> Self {
        Self {
            windows: [
                SlotWindow::new(clock_ms(6, 0), clock_ms(11, 0)),
                SlotWindow::new(clock_ms(11, 0), clock_ms(15, 0)),
                SlotWindow::new(clock_ms(15, 0), clock_ms(20, 0)),
                SlotWindow::new(clock_ms(20, 0), clock_ms(24, 0)),
            ],
            snooze_ms: clock_ms(0, 30),
        }
    }
}
