//! Aggregates compliance and supply state into one deduplicated
//! notification.
//!
//! Three concerns (pending doses, forgotten doses, low supply) share a
//! single notification. Re-publishing a payload whose content fingerprint
//! matches the previous one is marked `alert_once`: the sink refreshes
//! the visible content but must not re-trigger sound or vibration.

use tracing::debug;

use crate::drug::Drug;

/// Identity of the single aggregated notification at the sink.
pub const NOTIFICATION_ID: u32 = 1;

const ICON: &str = "pill";
const ALERT_DEFAULTS: &str = "sound,vibrate,lights";
const TITLE: &str = "Dose reminders";
const BULLET: &str = "\u{2022} ";

/// What the sink renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    /// At most two lines: dose message, then low-supply summary.
    pub lines: Vec<String>,
    /// Number of distinct concerns represented.
    pub badge: u32,
    /// Refresh content without re-alerting.
    pub alert_once: bool,
    pub icon: &'static str,
}

/// Display surface for notifications.
pub trait NotificationSink: Send {
    fn show(&mut self, id: u32, payload: &NotificationPayload);
    fn cancel(&mut self, id: u32);
}

/// Low-supply summary: the first affected drug plus how many others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowSupply {
    pub first_drug: String,
    pub additional: usize,
}

/// Message-slot state plus the dedup fingerprint.
#[derive(Debug, Default)]
pub struct Aggregator {
    pending: Option<usize>,
    forgotten: Option<usize>,
    low_supply: Option<LowSupply>,
    last_fingerprint: Option<String>,
    displayed: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A count of zero clears the slot.
    pub fn set_pending(&mut self, count: usize) {
        self.pending = (count != 0).then_some(count);
    }

    pub fn set_forgotten(&mut self, count: usize) {
        self.forgotten = (count != 0).then_some(count);
    }

    pub fn set_low_supply(&mut self, drugs: &[Drug]) {
        self.low_supply = drugs.first().map(|first| LowSupply {
            first_drug: first.name().to_string(),
            additional: drugs.len() - 1,
        });
    }

    /// Zap the message slots but keep the fingerprint, so an unrelated
    /// restart does not force a redundant alert tone.
    pub fn clear_messages(&mut self) {
        self.pending = None;
        self.forgotten = None;
        self.low_supply = None;
    }

    /// Full reset: messages, fingerprint, and displayed state.
    pub fn reset(&mut self) {
        self.clear_messages();
        self.last_fingerprint = None;
        self.displayed = false;
    }

    fn compose(&self) -> Option<(Vec<String>, u32)> {
        let dose_line = match (self.pending, self.forgotten) {
            (Some(p), Some(f)) => Some(format!("{f} doses forgotten, {p} pending")),
            (Some(p), None) => Some(format!("{p} doses pending")),
            (None, Some(f)) => Some(format!("{f} doses forgotten")),
            (None, None) => None,
        };

        let supply_line = self.low_supply.as_ref().map(|low| {
            if low.additional == 0 {
                format!("Low supply of {}", low.first_drug)
            } else {
                format!("Low supply of {} and {} more", low.first_drug, low.additional)
            }
        });

        if dose_line.is_none() && supply_line.is_none() {
            return None;
        }

        let badge = u32::from(dose_line.is_some()) + u32::from(supply_line.is_some());
        let bullet = if badge > 1 { BULLET } else { "" };
        let lines = [dose_line, supply_line]
            .into_iter()
            .flatten()
            .map(|line| format!("{bullet}{line}"))
            .collect();

        Some((lines, badge))
    }

    /// Compose the payload, or `None` when every slot is absent.
    ///
    /// Updates the fingerprint: identical content on consecutive renders
    /// comes back with `alert_once` set.
    pub fn render(&mut self) -> Option<NotificationPayload> {
        let (lines, badge) = self.compose()?;
        let fingerprint = fingerprint(&lines, badge);
        let alert_once = self.last_fingerprint.as_deref() == Some(fingerprint.as_str());
        if !alert_once {
            self.last_fingerprint = Some(fingerprint);
        }
        Some(NotificationPayload {
            title: TITLE.to_string(),
            lines,
            badge,
            alert_once,
            icon: ICON,
        })
    }

    /// Push the current state to the sink: show the composed payload, or
    /// cancel on the transition to "nothing to show" (and reset the
    /// fingerprint so the next non-empty state re-alerts).
    pub fn publish(&mut self, sink: &mut dyn NotificationSink) {
        match self.render() {
            Some(payload) => {
                debug!(badge = payload.badge, alert_once = payload.alert_once, "show");
                sink.show(NOTIFICATION_ID, &payload);
                self.displayed = true;
            }
            None => {
                if self.displayed {
                    debug!("cancel");
                    sink.cancel(NOTIFICATION_ID);
                    self.displayed = false;
                }
                self.last_fingerprint = None;
            }
        }
    }
}

/// Content fingerprint over exactly the rendering-affecting fields.
fn fingerprint(lines: &[String], badge: u32) -> String {
    format!("{ICON}|{ALERT_DEFAULTS}|{badge}|{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drug::DrugForm;

    #[derive(Default)]
    struct RecordingSink {
        shown: Vec<NotificationPayload>,
        cancelled: usize,
    }

    impl NotificationSink for RecordingSink {
        fn show(&mut self, _id: u32, payload: &NotificationPayload) {
            self.shown.push(payload.clone());
        }

        fn cancel(&mut self, _id: u32) {
            self.cancelled += 1;
        }
    }

    fn low(names: &[&str]) -> Vec<Drug> {
        names
            .iter()
            .map(|n| Drug::new(*n, DrugForm::Tablet).unwrap())
            .collect()
    }

    #[test]
    fn all_absent_renders_none() {
        let mut agg = Aggregator::new();
        agg.set_pending(0);
        agg.set_forgotten(0);
        agg.set_low_supply(&[]);
        assert!(agg.render().is_none());
    }

    #[test]
    fn second_identical_render_is_alert_once() {
        let mut agg = Aggregator::new();
        agg.set_pending(3);

        let first = agg.render().unwrap();
        assert!(!first.alert_once);
        assert_eq!(first.badge, 1);

        let second = agg.render().unwrap();
        assert!(second.alert_once);
        assert_eq!(second.badge, 1);
        assert_eq!(first.lines, second.lines);
    }

    #[test]
    fn changed_content_re_alerts() {
        let mut agg = Aggregator::new();
        agg.set_pending(3);
        assert!(!agg.render().unwrap().alert_once);
        agg.set_pending(2);
        assert!(!agg.render().unwrap().alert_once);
    }

    #[test]
    fn dose_message_counts_once_in_badge() {
        let mut agg = Aggregator::new();
        agg.set_pending(2);
        agg.set_forgotten(1);

        let payload = agg.render().unwrap();
        assert_eq!(payload.badge, 1);
        assert_eq!(payload.lines, ["1 doses forgotten, 2 pending"]);
    }

    #[test]
    fn two_concerns_get_bullets() {
        let mut agg = Aggregator::new();
        agg.set_pending(2);
        agg.set_low_supply(&low(&["Aspirin"]));

        let payload = agg.render().unwrap();
        assert_eq!(payload.badge, 2);
        assert_eq!(
            payload.lines,
            ["\u{2022} 2 doses pending", "\u{2022} Low supply of Aspirin"]
        );
    }

    #[test]
    fn low_supply_summarizes_additional_drugs() {
        let mut agg = Aggregator::new();
        agg.set_low_supply(&low(&["Aspirin", "Ibuprofen", "Zyrtec"]));

        let payload = agg.render().unwrap();
        assert_eq!(payload.badge, 1);
        assert_eq!(payload.lines, ["Low supply of Aspirin and 2 more"]);
    }

    #[test]
    fn transition_to_empty_cancels_and_resets_fingerprint() {
        let mut agg = Aggregator::new();
        let mut sink = RecordingSink::default();

        agg.set_pending(1);
        agg.publish(&mut sink);
        assert_eq!(sink.shown.len(), 1);

        agg.set_pending(0);
        agg.publish(&mut sink);
        assert_eq!(sink.cancelled, 1);

        // After the cancel the same content must alert again.
        agg.set_pending(1);
        agg.publish(&mut sink);
        assert_eq!(sink.shown.len(), 2);
        assert!(!sink.shown[1].alert_once);
    }

    #[test]
    fn publish_without_prior_show_does_not_cancel() {
        let mut agg = Aggregator::new();
        let mut sink = RecordingSink::default();
        agg.publish(&mut sink);
        assert_eq!(sink.cancelled, 0);
    }

    #[test]
    fn restart_keeps_fingerprint_across_clear() {
        let mut agg = Aggregator::new();
        agg.set_pending(3);
        assert!(!agg.render().unwrap().alert_once);

        agg.clear_messages();
        agg.set_pending(3);
        // Same content after a restart: no redundant alert tone.
        assert!(agg.render().unwrap().alert_once);
    }
}
