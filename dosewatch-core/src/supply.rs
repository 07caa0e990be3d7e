//! Days-of-supply estimation and low-supply detection.

use tracing::debug;

use crate::drug::Drug;
use crate::error::StorageError;
use crate::store::DoseStore;

/// Estimated days of supply left, or `None` when supply tracking is
/// disabled (`refill_size == 0`) or the drug has no timed daily dose.
///
/// A floating approximation: this is a display estimate, not a balance.
pub fn days_of_supply(drug: &Drug) -> Option<f64> {
    if drug.refill_size() == 0 {
        return None;
    }
    let daily = drug.daily_dose();
    if daily.is_zero() {
        return None;
    }
    Some(drug.current_supply().to_f64() / daily.to_f64())
}

/// Drugs whose estimate is strictly below `min_days`, in storage order.
/// Consumers needing a different order must sort explicitly.
pub fn drugs_below_threshold(
    store: &dyn DoseStore,
    min_days: u32,
) -> Result<Vec<Drug>, StorageError> {
    let mut low = Vec::new();
    for drug in store.list_drugs()? {
        if let Some(days) = days_of_supply(&drug) {
            debug!(drug = drug.name(), days, "supply estimate");
            if days < f64::from(min_days) {
                low.push(drug);
            }
        }
    }
    Ok(low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drug::{DoseSlot, DrugForm};
    use crate::quantity::Quantity;
    use crate::store::MemoryStore;

    fn drug(name: &str, daily: i64, supply: i64, refill: u32) -> Drug {
        Drug::new(name, DrugForm::Tablet)
            .unwrap()
            .with_dose(DoseSlot::Morning, Quantity::whole(daily))
            .unwrap()
            .with_supply(Quantity::whole(supply), refill)
            .unwrap()
    }

    #[test]
    fn threshold_is_strict() {
        let store = MemoryStore::new();
        // 10 units at 2/day = 5 days left.
        store.add_drug(drug("A", 2, 10, 30));

        let below = drugs_below_threshold(&store, 7).unwrap();
        assert_eq!(below.len(), 1);
        assert_eq!(below[0].name(), "A");

        assert!(drugs_below_threshold(&store, 4).unwrap().is_empty());
        // 5 days < 5 is false.
        assert!(drugs_below_threshold(&store, 5).unwrap().is_empty());
    }

    #[test]
    fn zero_refill_size_disables_tracking() {
        let store = MemoryStore::new();
        store.add_drug(drug("A", 2, 0, 0));
        assert!(drugs_below_threshold(&store, 7).unwrap().is_empty());
    }

    #[test]
    fn zero_daily_dose_is_skipped() {
        let store = MemoryStore::new();
        store.add_drug(drug("A", 0, 10, 30));
        assert!(drugs_below_threshold(&store, 7).unwrap().is_empty());
    }

    #[test]
    fn whole_day_dose_does_not_count_toward_rate() {
        let d = Drug::new("A", DrugForm::Tablet)
            .unwrap()
            .with_dose(DoseSlot::WholeDay, Quantity::whole(4))
            .unwrap()
            .with_supply(Quantity::whole(10), 30)
            .unwrap();
        assert_eq!(days_of_supply(&d), None);
    }

    #[test]
    fn result_preserves_storage_order() {
        let store = MemoryStore::new();
        store.add_drug(drug("Zyrtec", 1, 2, 30));
        store.add_drug(drug("Aspirin", 1, 3, 30));
        let names: Vec<_> = drugs_below_threshold(&store, 7)
            .unwrap()
            .into_iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, ["Zyrtec", "Aspirin"]);
    }

    #[test]
    fn fractional_doses_estimate() {
        let d = Drug::new("A", DrugForm::Tablet)
            .unwrap()
            .with_dose(DoseSlot::Morning, Quantity::new(1, 2).unwrap())
            .unwrap()
            .with_dose(DoseSlot::Night, Quantity::new(1, 2).unwrap())
            .unwrap()
            .with_supply(Quantity::whole(7), 30)
            .unwrap();
        assert_eq!(days_of_supply(&d), Some(7.0));
    }
}
