use dosewatch_core::{NotificationPayload, NotificationSink};

/// Renders notifications to the terminal. A real host would hand the
/// payload to its notification surface instead.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn show(&mut self, id: u32, payload: &NotificationPayload) {
        // Ring the bell only for a full alert; alert-once refreshes stay
        // silent.
        let bell = if payload.alert_once { "" } else { "\u{7}" };
        println!("{bell}[{id}] {} ({})", payload.title, payload.badge);
        for line in &payload.lines {
            println!("    {line}");
        }
    }

    fn cancel(&mut self, id: u32) {
        println!("[{id}] notification cleared");
    }
}
