//! The scheduler loop.
//!
//! A single tokio worker wakes at dose-time boundaries and snooze ticks,
//! recomputes compliance and supply state, and drives the notification
//! sink. At most one worker exists at a time; a restart aborts the
//! in-flight suspension and relaunches, preserving the dedup fingerprint
//! so an unrelated data change does not force a redundant alert tone.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use dosewatch_core::compliance::{forgotten_count, pending_count};
use dosewatch_core::drug::DoseSlot;
use dosewatch_core::error::EngineError;
use dosewatch_core::notify::{Aggregator, NotificationSink, NOTIFICATION_ID};
use dosewatch_core::prefs::{self, Preferences};
use dosewatch_core::store::{ChangeEvent, DoseStore};
use dosewatch_core::supply::drugs_below_threshold;

use crate::clock::Clock;
use crate::crashlog;

/// Handle owning the worker. Restart and shutdown are safe to call from
/// any context, including collaborator change callbacks, while the loop
/// is mid-suspend.
pub struct Scheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    store: Arc<dyn DoseStore>,
    prefs: Arc<dyn Preferences>,
    clock: Arc<dyn Clock>,
    sink: Mutex<Box<dyn NotificationSink>>,
    aggregator: Mutex<Aggregator>,
    crash_dir: Option<PathBuf>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn DoseStore>,
        prefs: Arc<dyn Preferences>,
        clock: Arc<dyn Clock>,
        sink: Box<dyn NotificationSink>,
        crash_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                prefs,
                clock,
                sink: Mutex::new(sink),
                aggregator: Mutex::new(Aggregator::new()),
                crash_dir,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Launch the worker if it is not already running.
    pub fn start(&self) {
        self.launch(false);
    }

    /// Cancel any in-flight suspension and relaunch. Idempotent; rapid
    /// repeated calls coalesce into a single live worker.
    pub fn restart(&self) {
        self.launch(true);
    }

    fn launch(&self, force: bool) {
        let mut worker = lock(&self.worker);
        if let Some(handle) = worker.as_ref() {
            if !handle.is_finished() {
                if !force {
                    debug!("scheduler already running; ignoring start request");
                    return;
                }
                handle.abort();
            }
        }
        info!(force, "launching scheduler worker");
        let shared = Arc::clone(&self.shared);
        *worker = Some(tokio::spawn(run_worker(shared)));
    }

    pub fn is_running(&self) -> bool {
        lock(&self.worker)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Ledger change callback. Mutations flagged by bulk imports are
    /// ignored to avoid a reschedule storm.
    pub fn on_data_changed(&self, event: ChangeEvent) {
        if event.ignore_for_scheduling {
            debug!(?event, "ignoring suppressed data change");
            return;
        }
        self.restart();
    }

    /// Preference change callback; only scheduling keys trigger a restart.
    pub fn on_pref_changed(&self, key: &str) {
        if prefs::is_scheduling_key(key) {
            self.restart();
        } else {
            debug!(key, "ignoring preference change");
        }
    }

    /// Stop for good: abort the worker and remove the displayed
    /// notification. Unlike restart, nothing is relaunched.
    pub fn shutdown(&self) {
        let mut worker = lock(&self.worker);
        if let Some(handle) = worker.take() {
            handle.abort();
        }
        lock(&self.shared.aggregator).reset();
        lock(&self.shared.sink).cancel(NOTIFICATION_ID);
        info!("scheduler stopped");
    }
}

async fn run_worker(shared: Arc<Shared>) {
    info!("scheduler loop starting");
    if let Err(err) = cycle_forever(&shared).await {
        error!(error = %err, "scheduler loop aborted");
        if let Some(dir) = shared.crash_dir.as_deref() {
            match crashlog::write_crash_record(dir, &err) {
                Ok(path) => info!(path = %path.display(), "crash record written"),
                Err(io_err) => error!(error = %io_err, "failed to write crash record"),
            }
        }
    }
}

/// The loop body. Every sleep is a cancellation point: aborting the
/// worker task aborts the suspension.
async fn cycle_forever(shared: &Shared) -> Result<(), EngineError> {
    // A restart zaps the displayed content but keeps the dedup
    // fingerprint; supplies are checked immediately but only queued, so
    // the message surfaces with the first publish.
    lock(&shared.aggregator).clear_messages();
    refresh_low_supply(shared, false)?;

    let windows = prefs::load_windows(shared.prefs.as_ref())?;

    loop {
        let now = shared.clock.now_local();
        let today = now.date();

        let active = windows.active_slot(now.time());
        let next = windows.next_slot(now.time())?;
        let last = active.unwrap_or(next).prev_timed();
        debug!(?active, ?next, ?last, "dose-time state");

        if let Some(last) = last {
            let count = forgotten_count(shared.store.as_ref(), today, today, Some(last))?;
            publish_forgotten(shared, count);
        }

        let Some(slot) = active else {
            let wait = windows.until_begin(now, next);
            debug!(
                slot = next.label(),
                wait_ms = wait.num_milliseconds(),
                "sleeping until slot begins"
            );
            sleep_for(wait).await;
            continue;
        };

        if slot == DoseSlot::Morning {
            // First slot of the day: yesterday's forgotten doses stop
            // nagging, and supplies are checked once per day.
            publish_forgotten(shared, 0);
            refresh_low_supply(shared, true)?;
        }

        let mut remaining = windows.until_end(now, slot);
        let pending = pending_count(shared.store.as_ref(), today, slot)?;
        debug!(pending, slot = slot.label(), "pending intakes");

        if pending != 0 {
            let snooze = windows.snooze();
            if snooze > Duration::zero() {
                loop {
                    publish_pending(shared, pending);
                    sleep_for(snooze).await;
                    remaining = remaining - snooze;
                    if remaining <= snooze {
                        break;
                    }
                }
            } else {
                // Zero snooze disables the repeats, not the reminder.
                publish_pending(shared, pending);
            }
        }

        if remaining > Duration::zero() {
            debug!(
                slot = slot.label(),
                remaining_ms = remaining.num_milliseconds(),
                "sleeping until slot ends"
            );
            sleep_for(remaining).await;
        }

        publish_pending(shared, 0);
        let count = forgotten_count(shared.store.as_ref(), today, today, Some(slot))?;
        publish_forgotten(shared, count);
    }
}

fn publish_pending(shared: &Shared, count: usize) {
    let mut aggregator = lock(&shared.aggregator);
    aggregator.set_pending(count);
    let mut sink = lock(&shared.sink);
    aggregator.publish(&mut **sink);
}

fn publish_forgotten(shared: &Shared, count: usize) {
    let mut aggregator = lock(&shared.aggregator);
    aggregator.set_forgotten(count);
    let mut sink = lock(&shared.sink);
    aggregator.publish(&mut **sink);
}

fn refresh_low_supply(shared: &Shared, publish: bool) -> Result<(), EngineError> {
    let min_days = prefs::min_supply_days(shared.prefs.as_ref());
    let low = drugs_below_threshold(shared.store.as_ref(), min_days)?;
    let mut aggregator = lock(&shared.aggregator);
    aggregator.set_low_supply(&low);
    if publish {
        let mut sink = lock(&shared.sink);
        aggregator.publish(&mut **sink);
    }
    Ok(())
}

async fn sleep_for(duration: Duration) {
    match duration.to_std() {
        Ok(d) if !d.is_zero() => tokio::time::sleep(d).await,
        _ => debug!(ms = duration.num_milliseconds(), "skipping non-positive sleep"),
    }
}
