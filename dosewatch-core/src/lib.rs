//! dosewatch-core: dose-time windows, compliance and supply evaluation,
//! and notification aggregation for the dosewatch scheduler.

pub mod compliance;
pub mod drug;
pub mod error;
pub mod notify;
pub mod prefs;
pub mod quantity;
pub mod store;
pub mod supply;
pub mod windows;

pub use compliance::{forgotten_count, pending_count};
pub use drug::{DoseFrequency, DoseSlot, Drug, DrugForm, Intake};
pub use error::{ConfigurationError, EngineError, StorageError, ValidationError};
pub use notify::{Aggregator, LowSupply, NotificationPayload, NotificationSink, NOTIFICATION_ID};
pub use prefs::Preferences;
pub use quantity::Quantity;
pub use store::{ChangeEvent, ChangeKind, DoseStore, MemoryStore};
pub use supply::{days_of_supply, drugs_below_threshold};
pub use windows::{DoseWindows, SlotWindow};
