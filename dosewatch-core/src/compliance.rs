//! Classification of outstanding intakes: pending vs. forgotten.
//!
//! Both counts are recomputed from scratch on every call; there is no
//! incremental cache to invalidate, so concurrent ledger edits at worst
//! make one cycle momentarily stale.

use chrono::NaiveDate;
use tracing::debug;

use crate::drug::DoseSlot;
use crate::error::StorageError;
use crate::store::DoseStore;

/// Drugs due in `slot` on `date` with no recorded intake yet.
///
/// A drug counts iff it is active, has a nonzero dose for the slot, its
/// schedule applies on `date`, and the ledger has no intake for
/// `(drug, date, slot)`.
pub fn pending_count(
    store: &dyn DoseStore,
    date: NaiveDate,
    slot: DoseSlot,
) -> Result<usize, StorageError> {
    let mut count = 0;
    for drug in store.list_drugs()? {
        if !drug.is_active() || drug.dose(slot).is_zero() || !drug.has_dose_on_date(date) {
            continue;
        }
        // A drug without an id has never been persisted; it cannot have
        // ledger entries, but it also cannot be due.
        let Some(id) = drug.id() else { continue };
        if store.find_intakes(id, date, slot)?.is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Doses whose slot has already ended on `date` without an intake.
///
/// Future dates have no forgotten doses. For dates strictly before
/// `today`, every timed slot counts as completed regardless of
/// `last_completed`. For `today`, slots from morning up to and including
/// `last_completed` are summed; `None` means no slot has completed yet.
/// The whole-day slot is never forgettable.
pub fn forgotten_count(
    store: &dyn DoseStore,
    today: NaiveDate,
    date: NaiveDate,
    last_completed: Option<DoseSlot>,
) -> Result<usize, StorageError> {
    if date > today {
        return Ok(0);
    }

    let last = if date < today {
        Some(DoseSlot::Night)
    } else {
        match last_completed.filter(|slot| slot.is_timed()) {
            Some(slot) => Some(slot),
            None => return Ok(0),
        }
    };

    let mut count = 0;
    for slot in DoseSlot::TIMED {
        count += pending_count(store, date, slot)?;
        if Some(slot) == last {
            break;
        }
    }

    debug!(%date, ?last, count, "forgotten intakes");
    Ok(count)
}
