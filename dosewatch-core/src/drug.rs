//! Drug dose schedules and recorded intakes.
//!
//! A "dose" is the smallest amount of a drug taken without splitting; a
//! "dose-time" is one of the named subdivisions of the day during which a
//! dose may be due. A drug's schedule assigns a (possibly zero) dose to
//! each slot.

use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::quantity::Quantity;

/// A named period of the day during which a dose may be due.
///
/// `WholeDay` is tracked in the schedule but never takes part in
/// active/next resolution, forgotten-intake evaluation, or the daily
/// supply rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoseSlot {
    Morning,
    Noon,
    Evening,
    Night,
    WholeDay,
}

impl DoseSlot {
    /// The canonical morning → night sequence.
    pub const TIMED: [DoseSlot; 4] = [
        DoseSlot::Morning,
        DoseSlot::Noon,
        DoseSlot::Evening,
        DoseSlot::Night,
    ];

    pub fn index(self) -> usize {
        match self {
            DoseSlot::Morning => 0,
            DoseSlot::Noon => 1,
            DoseSlot::Evening => 2,
            DoseSlot::Night => 3,
            DoseSlot::WholeDay => 4,
        }
    }

    pub fn is_timed(self) -> bool {
        !matches!(self, DoseSlot::WholeDay)
    }

    /// The timed slot preceding this one, if any.
    pub fn prev_timed(self) -> Option<DoseSlot> {
        match self {
            DoseSlot::Morning | DoseSlot::WholeDay => None,
            DoseSlot::Noon => Some(DoseSlot::Morning),
            DoseSlot::Evening => Some(DoseSlot::Noon),
            DoseSlot::Night => Some(DoseSlot::Evening),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DoseSlot::Morning => "morning",
            DoseSlot::Noon => "noon",
            DoseSlot::Evening => "evening",
            DoseSlot::Night => "night",
            DoseSlot::WholeDay => "whole day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrugForm {
    Tablet,
    Injection,
    Spray,
    Drop,
    Gel,
    Other,
}

/// Schedule applicability: on which calendar dates doses are due at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoseFrequency {
    Daily,
    /// Every `interval` days, counted from `anchor`.
    EveryNDays { interval: u32, anchor: NaiveDate },
}

impl DoseFrequency {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        match self {
            DoseFrequency::Daily => true,
            DoseFrequency::EveryNDays { interval, anchor } => {
                let interval = i64::from((*interval).max(1));
                (date - *anchor).num_days().rem_euclid(interval) == 0
            }
        }
    }
}

/// One drug's dose table plus supply bookkeeping.
///
/// Created and edited by the UI through the data-access layer; read-only
/// to the engine. Equality and hashing deliberately ignore the
/// storage-assigned `id` so duplicate detection works on rows that have
/// not been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drug {
    id: Option<i64>,
    name: String,
    form: DrugForm,
    active: bool,
    /// Doses per refill; 0 disables supply tracking for this drug.
    refill_size: u32,
    current_supply: Quantity,
    doses: [Quantity; 5],
    frequency: DoseFrequency,
    comment: Option<String>,
}

impl Drug {
    pub fn new(name: impl Into<String>, form: DrugForm) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self {
            id: None,
            name,
            form,
            active: true,
            refill_size: 0,
            current_supply: Quantity::zero(),
            doses: [Quantity::zero(); 5],
            frequency: DoseFrequency::Daily,
            comment: None,
        })
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_dose(mut self, slot: DoseSlot, dose: Quantity) -> Result<Self, ValidationError> {
        if dose.is_negative() {
            return Err(ValidationError::NegativeQuantity);
        }
        self.doses[slot.index()] = dose;
        Ok(self)
    }

    pub fn with_supply(
        mut self,
        current_supply: Quantity,
        refill_size: u32,
    ) -> Result<Self, ValidationError> {
        if current_supply.is_negative() {
            return Err(ValidationError::NegativeQuantity);
        }
        self.current_supply = current_supply;
        self.refill_size = refill_size;
        Ok(self)
    }

    pub fn with_frequency(mut self, frequency: DoseFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn form(&self) -> DrugForm {
        self.form
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn refill_size(&self) -> u32 {
        self.refill_size
    }

    pub fn current_supply(&self) -> Quantity {
        self.current_supply
    }

    pub fn dose(&self, slot: DoseSlot) -> Quantity {
        self.doses[slot.index()]
    }

    pub fn frequency(&self) -> DoseFrequency {
        self.frequency
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Sum of the four timed doses; the whole-day dose is not part of the
    /// daily rate.
    pub fn daily_dose(&self) -> Quantity {
        DoseSlot::TIMED
            .iter()
            .fold(Quantity::zero(), |acc, slot| acc + self.dose(*slot))
    }

    pub fn has_dose_on_date(&self, date: NaiveDate) -> bool {
        self.frequency.applies_on(date)
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn set_current_supply(&mut self, current_supply: Quantity) -> Result<(), ValidationError> {
        if current_supply.is_negative() {
            return Err(ValidationError::NegativeQuantity);
        }
        self.current_supply = current_supply;
        Ok(())
    }
}

impl PartialEq for Drug {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.form == other.form
            && self.active == other.active
            && self.refill_size == other.refill_size
            && self.current_supply == other.current_supply
            && self.doses == other.doses
            && self.frequency == other.frequency
            && self.comment == other.comment
    }
}

impl Eq for Drug {}

impl Hash for Drug {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.form.hash(state);
        self.active.hash(state);
        self.refill_size.hash(state);
        self.current_supply.hash(state);
        self.doses.hash(state);
        self.frequency.hash(state);
        self.comment.hash(state);
    }
}

/// A dose the user marked as taken.
///
/// `date` is the calendar date the dose was *scheduled* for; it may differ
/// from `timestamp`'s date when a night dose is taken shortly after
/// midnight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Intake {
    pub drug_id: i64,
    pub date: NaiveDate,
    pub timestamp: NaiveDateTime,
    pub slot: DoseSlot,
}

impl Intake {
    pub fn new(drug_id: i64, date: NaiveDate, timestamp: NaiveDateTime, slot: DoseSlot) -> Self {
        Self {
            drug_id,
            date,
            timestamp,
            slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn equality_ignores_id() {
        let a = Drug::new("Aspirin", DrugForm::Tablet).unwrap();
        let b = a.clone().with_id(42);
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn empty_name_rejected() {
        assert_eq!(
            Drug::new("  ", DrugForm::Tablet).unwrap_err(),
            ValidationError::EmptyName
        );
    }

    #[test]
    fn negative_supply_rejected() {
        let mut drug = Drug::new("Aspirin", DrugForm::Tablet).unwrap();
        assert_eq!(
            drug.set_current_supply(Quantity::whole(-1)),
            Err(ValidationError::NegativeQuantity)
        );
        assert!(drug.set_current_supply(Quantity::zero()).is_ok());
    }

    #[test]
    fn daily_dose_excludes_whole_day() {
        let drug = Drug::new("Aspirin", DrugForm::Tablet)
            .unwrap()
            .with_dose(DoseSlot::Morning, Quantity::whole(1))
            .unwrap()
            .with_dose(DoseSlot::Night, Quantity::new(1, 2).unwrap())
            .unwrap()
            .with_dose(DoseSlot::WholeDay, Quantity::whole(5))
            .unwrap();
        assert_eq!(drug.daily_dose(), Quantity::new(3, 2).unwrap());
    }

    #[test]
    fn every_n_days_frequency() {
        let freq = DoseFrequency::EveryNDays {
            interval: 2,
            anchor: date(2021, 6, 1),
        };
        assert!(freq.applies_on(date(2021, 6, 1)));
        assert!(!freq.applies_on(date(2021, 6, 2)));
        assert!(freq.applies_on(date(2021, 6, 3)));
        // Dates before the anchor follow the same grid.
        assert!(freq.applies_on(date(2021, 5, 30)));
        assert!(!freq.applies_on(date(2021, 5, 31)));
    }

    #[test]
    fn serde_round_trip_keeps_exact_doses() {
        let drug = Drug::new("Aspirin", DrugForm::Tablet)
            .unwrap()
            .with_dose(DoseSlot::Morning, Quantity::new(1, 2).unwrap())
            .unwrap()
            .with_supply(Quantity::whole(30), 30)
            .unwrap()
            .with_id(3);

        let json = serde_json::to_string(&drug).unwrap();
        let back: Drug = serde_json::from_str(&json).unwrap();
        assert_eq!(back, drug);
        assert_eq!(back.id(), Some(3));
        assert_eq!(back.dose(DoseSlot::Morning), Quantity::new(1, 2).unwrap());
    }

    #[test]
    fn slot_order() {
        assert_eq!(DoseSlot::Noon.prev_timed(), Some(DoseSlot::Morning));
        assert_eq!(DoseSlot::Morning.prev_timed(), None);
        assert_eq!(DoseSlot::WholeDay.prev_timed(), None);
        assert!(!DoseSlot::WholeDay.is_timed());
    }
}
