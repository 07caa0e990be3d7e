//! Data-access port: drug schedules and the intake ledger.
//!
//! Storage itself (files, sqlite, sync) is a later layer; the engine only
//! needs ordered drug listing, intake lookup by (drug, date, slot), and
//! change notifications to know when to reschedule.

use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::drug::{DoseSlot, Drug, Intake};
use crate::error::StorageError;

/// Read-only view of drugs and intakes. May be mutated concurrently by
/// external collaborators; the engine tolerates a snapshot changing
/// between the start and end of one evaluation cycle.
pub trait DoseStore: Send + Sync {
    /// Drugs in storage order. The order is stable and meaningful to
    /// consumers (low-supply lists preserve it).
    fn list_drugs(&self) -> Result<Vec<Drug>, StorageError>;

    /// Recorded intakes for `(drug, scheduled date, slot)`.
    fn find_intakes(
        &self,
        drug_id: i64,
        date: NaiveDate,
        slot: DoseSlot,
    ) -> Result<Vec<Intake>, StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A data mutation reported by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Set by bulk imports so a flood of writes does not trigger a
    /// reschedule storm.
    pub ignore_for_scheduling: bool,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind) -> Self {
        Self {
            kind,
            ignore_for_scheduling: false,
        }
    }

    pub fn suppressed(kind: ChangeKind) -> Self {
        Self {
            kind,
            ignore_for_scheduling: true,
        }
    }
}

/// In-memory store for tests, demos, and file-backed frontends that load
/// a whole snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    drugs: Vec<Drug>,
    intakes: Vec<Intake>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a snapshot, assigning ids to drugs that lack one.
    pub fn with_data(drugs: Vec<Drug>, intakes: Vec<Intake>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.write();
            inner.next_id = drugs.iter().filter_map(|d| d.id()).max().unwrap_or(0) + 1;
            for drug in drugs {
                let drug = match drug.id() {
                    Some(_) => drug,
                    None => {
                        let id = inner.next_id;
                        inner.next_id += 1;
                        drug.with_id(id)
                    }
                };
                inner.drugs.push(drug);
            }
            inner.intakes = intakes;
        }
        store
    }

    /// Insert a drug, assigning an id if it has none. Returns the id.
    pub fn add_drug(&self, drug: Drug) -> i64 {
        let mut inner = self.write();
        let (id, drug) = match drug.id() {
            Some(id) => (id, drug),
            None => {
                let id = inner.next_id;
                (id, drug.with_id(id))
            }
        };
        inner.next_id = inner.next_id.max(id + 1);
        inner.drugs.push(drug);
        id
    }

    pub fn record_intake(&self, intake: Intake) {
        self.write().intakes.push(intake);
    }

    pub fn remove_drug(&self, id: i64) {
        self.write().drugs.retain(|d| d.id() != Some(id));
    }

    pub fn snapshot(&self) -> (Vec<Drug>, Vec<Intake>) {
        let inner = self.read();
        (inner.drugs.clone(), inner.intakes.clone())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl DoseStore for MemoryStore {
    fn list_drugs(&self) -> Result<Vec<Drug>, StorageError> {
        Ok(self.read().drugs.clone())
    }

    fn find_intakes(
        &self,
        drug_id: i64,
        date: NaiveDate,
        slot: DoseSlot,
    ) -> Result<Vec<Intake>, StorageError> {
        Ok(self
            .read()
            .intakes
            .iter()
            .filter(|i| i.drug_id == drug_id && i.date == date && i.slot == slot)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drug::DrugForm;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, d).unwrap()
    }

    #[test]
    fn add_drug_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.add_drug(Drug::new("A", DrugForm::Tablet).unwrap());
        let b = store.add_drug(Drug::new("B", DrugForm::Tablet).unwrap());
        assert_ne!(a, b);

        let drugs = store.list_drugs().unwrap();
        assert_eq!(drugs.len(), 2);
        assert_eq!(drugs[0].name(), "A");
        assert_eq!(drugs[1].name(), "B");
    }

    #[test]
    fn find_intakes_matches_all_three_keys() {
        let store = MemoryStore::new();
        let id = store.add_drug(Drug::new("A", DrugForm::Tablet).unwrap());
        let ts = date(15).and_hms_opt(8, 0, 0).unwrap();
        store.record_intake(Intake::new(id, date(15), ts, DoseSlot::Morning));

        assert_eq!(
            store.find_intakes(id, date(15), DoseSlot::Morning).unwrap().len(),
            1
        );
        assert!(store.find_intakes(id, date(15), DoseSlot::Noon).unwrap().is_empty());
        assert!(store.find_intakes(id, date(16), DoseSlot::Morning).unwrap().is_empty());
        assert!(store.find_intakes(id + 1, date(15), DoseSlot::Morning).unwrap().is_empty());
    }

    #[test]
    fn with_data_backfills_missing_ids() {
        let drugs = vec![
            Drug::new("A", DrugForm::Tablet).unwrap().with_id(7),
            Drug::new("B", DrugForm::Tablet).unwrap(),
        ];
        let store = MemoryStore::with_data(drugs, vec![]);
        let drugs = store.list_drugs().unwrap();
        assert_eq!(drugs[0].id(), Some(7));
        assert_eq!(drugs[1].id(), Some(8));
    }
}
