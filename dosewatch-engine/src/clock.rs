//! Clock port so the loop can be driven by tests without wall-clock
//! mocking tricks.

use chrono::{Local, NaiveDateTime};

pub trait Clock: Send + Sync {
    /// Local wall-clock time; the whole engine works in local time
    /// because dose-time windows are offsets from local midnight.
    fn now_local(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
