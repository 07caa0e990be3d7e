//! Preference port: dose-time boundaries, snooze interval, supply threshold.
//!
//! Missing or malformed values fall back to documented defaults instead of
//! failing; a structurally broken window table (overlaps, inverted
//! windows) still surfaces as a `ConfigurationError`.

use tracing::debug;

use crate::error::ConfigurationError;
use crate::windows::{DoseWindows, SlotWindow, clock_ms, MILLIS_PER_DAY};

/// Key-value preference reads. Change notifications arrive as key-name
/// callbacks; the engine filters them with [`is_scheduling_key`].
pub trait Preferences: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl Preferences for std::collections::HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        std::collections::HashMap::get(self, key).cloned()
    }
}

pub mod keys {
    pub const MORNING_BEGIN: &str = "time_morning_begin";
    pub const MORNING_END: &str = "time_morning_end";
    pub const NOON_BEGIN: &str = "time_noon_begin";
    pub const NOON_END: &str = "time_noon_end";
    pub const EVENING_BEGIN: &str = "time_evening_begin";
    pub const EVENING_END: &str = "time_evening_end";
    pub const NIGHT_BEGIN: &str = "time_night_begin";
    pub const NIGHT_END: &str = "time_night_end";
    pub const SNOOZE: &str = "time_snooze";
    pub const MIN_SUPPLY_DAYS: &str = "num_min_supply_days";
}

pub mod defaults {
    pub const MORNING: (&str, &str) = ("06:00", "11:00");
    pub const NOON: (&str, &str) = ("11:00", "15:00");
    pub const EVENING: (&str, &str) = ("15:00", "20:00");
    pub const NIGHT: (&str, &str) = ("20:00", "24:00");
    pub const SNOOZE: &str = "00:30";
    pub const MIN_SUPPLY_DAYS: u32 = 7;
}

/// Does a change to `key` affect scheduling? Everything else is ignored.
pub fn is_scheduling_key(key: &str) -> bool {
    key.starts_with("time_") || key == keys::MIN_SUPPLY_DAYS
}

/// Parse `"HH:MM"` (or `"HH:MM:SS"`) into milliseconds since midnight.
/// `"24:00"` is accepted as an end-of-day boundary.
pub fn parse_clock(s: &str) -> Option<i64> {
    let mut parts = s.trim().split(':');
    let h: i64 = parts.next()?.parse().ok()?;
    let m: i64 = parts.next()?.parse().ok()?;
    let sec: i64 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    if !(0..=24).contains(&h) || !(0..60).contains(&m) || !(0..60).contains(&sec) {
        return None;
    }
    let ms = ((h * 60 + m) * 60 + sec) * 1000;
    (ms <= MILLIS_PER_DAY).then_some(ms)
}

fn read_clock(prefs: &dyn Preferences, key: &str, default: &str) -> i64 {
    match prefs.get(key).as_deref().and_then(parse_clock) {
        Some(ms) => ms,
        None => {
            debug!(key, default, "missing or malformed time preference");
            parse_clock(default).unwrap_or(clock_ms(0, 0))
        }
    }
}

/// Build the window table from preferences, falling back per value.
pub fn load_windows(prefs: &dyn Preferences) -> Result<DoseWindows, ConfigurationError> {
    let window = |begin_key, end_key, default: (&str, &str)| {
        SlotWindow::new(
            read_clock(prefs, begin_key, default.0),
            read_clock(prefs, end_key, default.1),
        )
    };

    DoseWindows::new(
        [
            window(keys::MORNING_BEGIN, keys::MORNING_END, defaults::MORNING),
            window(keys::NOON_BEGIN, keys::NOON_END, defaults::NOON),
            window(keys::EVENING_BEGIN, keys::EVENING_END, defaults::EVENING),
            window(keys::NIGHT_BEGIN, keys::NIGHT_END, defaults::NIGHT),
        ],
        read_clock(prefs, keys::SNOOZE, defaults::SNOOZE),
    )
}

/// Minimum days of supply before a drug is flagged for reorder.
pub fn min_supply_days(prefs: &dyn Preferences) -> u32 {
    match prefs.get(keys::MIN_SUPPLY_DAYS).map(|v| v.parse::<u32>()) {
        Some(Ok(days)) => days,
        Some(Err(_)) | None => {
            debug!(key = keys::MIN_SUPPLY_DAYS, "falling back to default");
            defaults::MIN_SUPPLY_DAYS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn prefs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_clock_accepts_boundaries() {
        assert_eq!(parse_clock("00:00"), Some(0));
        assert_eq!(parse_clock("06:30"), Some(clock_ms(6, 30)));
        assert_eq!(parse_clock("24:00"), Some(MILLIS_PER_DAY));
        assert_eq!(parse_clock("09:15:30"), Some(clock_ms(9, 15) + 30_000));
    }

    #[test]
    fn parse_clock_rejects_garbage() {
        for input in ["", "25:00", "12:60", "12", "1:2:3:4", "ab:cd", "24:01"] {
            assert_eq!(parse_clock(input), None, "input {input:?}");
        }
    }

    #[test]
    fn empty_prefs_yield_documented_defaults() {
        let windows = load_windows(&prefs(&[])).unwrap();
        assert_eq!(windows, DoseWindows::default());
        assert_eq!(min_supply_days(&prefs(&[])), 7);
    }

    #[test]
    fn malformed_values_fall_back_per_key() {
        let p = prefs(&[
            (keys::MORNING_BEGIN, "05:00"),
            (keys::NOON_END, "not a time"),
            (keys::MIN_SUPPLY_DAYS, "-3"),
        ]);
        let windows = load_windows(&p).unwrap();
        assert_eq!(
            windows.window(crate::drug::DoseSlot::Morning).unwrap().begin_ms,
            clock_ms(5, 0)
        );
        assert_eq!(
            windows.window(crate::drug::DoseSlot::Noon).unwrap().end_ms,
            clock_ms(15, 0)
        );
        assert_eq!(min_supply_days(&p), 7);
    }

    #[test]
    fn valid_but_overlapping_prefs_are_a_configuration_error() {
        let p = prefs(&[(keys::MORNING_END, "12:00")]);
        assert!(load_windows(&p).is_err());
    }

    #[test]
    fn scheduling_key_filter() {
        assert!(is_scheduling_key(keys::NOON_BEGIN));
        assert!(is_scheduling_key(keys::SNOOZE));
        assert!(is_scheduling_key(keys::MIN_SUPPLY_DAYS));
        assert!(!is_scheduling_key("display_theme"));
    }
}
