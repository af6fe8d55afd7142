use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use incidents_core::{NaturalKey, RecordId, Stored};

use super::r#trait::{EntityStore, StoreError, UniqueIndex};
use tables::{MemoryTable, Tables};

/// In-memory entity store.
///
/// Intended for tests/dev. One lock guards all tables so constraint checks and
/// cascades see a consistent snapshot. The lock is never held across an await.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

impl core::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl<E: MemoryTable> EntityStore<E> for InMemoryStore {
    async fn find(&self, id: E::Id) -> Result<Option<Stored<E>>, StoreError> {
        let tables = self.read()?;
        Ok(E::table(&tables).rows.get(&id).cloned())
    }

    async fn insert(&self, record: E) -> Result<Stored<E>, StoreError> {
        let mut tables = self.write()?;
        E::check(&tables, None, &record)?;

        let table = E::table_mut(&mut tables);
        let stored = Stored::new(table.next_id(), 1, record);
        table.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, row: Stored<E>) -> Result<Stored<E>, StoreError> {
        let mut tables = self.write()?;

        let current = match E::table(&tables).rows.get(&row.id) {
            Some(current) => current.version,
            None => {
                return Err(StoreError::Conflict(format!(
                    "{} {} no longer exists",
                    E::KIND,
                    row.id
                )));
            }
        };
        if !row.expected_version().matches(current) {
            return Err(StoreError::Conflict(format!(
                "{} {}: expected version {}, found {}",
                E::KIND,
                row.id,
                row.version,
                current
            )));
        }
        E::check(&tables, Some(row.id), &row.record)?;

        let stored = Stored::new(row.id, current + 1, row.record);
        E::table_mut(&mut tables)
            .rows
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: E::Id) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if E::table_mut(&mut tables).rows.remove(&id).is_none() {
            return Err(StoreError::NotFound {
                kind: E::KIND,
                id: id.raw(),
            });
        }
        E::cascade(&mut tables, id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Stored<E>>, StoreError> {
        let tables = self.read()?;
        Ok(E::table(&tables).rows.values().cloned().collect())
    }
}

#[async_trait]
impl<E: MemoryTable + NaturalKey> UniqueIndex<E> for InMemoryStore {
    async fn exists_by_key(&self, key: &E::Key, exclude: Option<E::Id>) -> Result<bool, StoreError> {
        let tables = self.read()?;
        Ok(E::table(&tables).key_taken(key, exclude))
    }
}

mod tables {
    use std::collections::BTreeMap;

    use incidents_core::{NaturalKey, Record, RecordId, Stored};
    use incidents_domain::{Disease, Incident, Location, Patient, Symptom};

    use crate::store::StoreError;

    pub struct Table<E: Record> {
        pub rows: BTreeMap<E::Id, Stored<E>>,
        last_id: i64,
    }

    impl<E: Record> Default for Table<E> {
        fn default() -> Self {
            Self {
                rows: BTreeMap::new(),
                last_id: 0,
            }
        }
    }

    impl<E: Record> Table<E> {
        /// Ids are never reused, even after deletes.
        pub fn next_id(&mut self) -> E::Id {
            self.last_id += 1;
            E::Id::from_raw(self.last_id)
        }

        pub fn contains(&self, id: E::Id) -> bool {
            self.rows.contains_key(&id)
        }
    }

    impl<E: NaturalKey> Table<E> {
        pub fn key_taken(&self, key: &E::Key, exclude: Option<E::Id>) -> bool {
            self.rows
                .values()
                .any(|row| Some(row.id) != exclude && row.record.natural_key() == *key)
        }
    }

    #[derive(Default)]
    pub struct Tables {
        pub diseases: Table<Disease>,
        pub patients: Table<Patient>,
        pub locations: Table<Location>,
        pub symptoms: Table<Symptom>,
        pub incidents: Table<Incident>,
    }

    /// Table access plus the constraints and cascades of one record kind.
    pub trait MemoryTable: Record {
        fn table(tables: &Tables) -> &Table<Self>;

        fn table_mut(tables: &mut Tables) -> &mut Table<Self>;

        /// Constraints a row must satisfy before it is written.
        fn check(tables: &Tables, id: Option<Self::Id>, record: &Self) -> Result<(), StoreError>;

        /// Applied to dependent rows after a delete. Every incident a cascade
        /// rewrites gets a new version, so writers holding the old one conflict.
        fn cascade(_tables: &mut Tables, _id: Self::Id) {}
    }

    fn check_key<E: MemoryTable + NaturalKey>(
        tables: &Tables,
        id: Option<E::Id>,
        record: &E,
    ) -> Result<(), StoreError> {
        let key = record.natural_key();
        if E::table(tables).key_taken(&key, id) {
            return Err(StoreError::UniqueViolation {
                kind: E::KIND,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    impl MemoryTable for Disease {
        fn table(tables: &Tables) -> &Table<Self> {
            &tables.diseases
        }

        fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
            &mut tables.diseases
        }

        fn check(tables: &Tables, id: Option<Self::Id>, record: &Self) -> Result<(), StoreError> {
            check_key(tables, id, record)
        }

        fn cascade(tables: &mut Tables, id: Self::Id) {
            tables.incidents.rows.retain(|_, row| row.record.disease_id != id);
        }
    }

    impl MemoryTable for Patient {
        fn table(tables: &Tables) -> &Table<Self> {
            &tables.patients
        }

        fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
            &mut tables.patients
        }

        fn check(tables: &Tables, id: Option<Self::Id>, record: &Self) -> Result<(), StoreError> {
            check_key(tables, id, record)
        }

        fn cascade(tables: &mut Tables, id: Self::Id) {
            for row in tables.incidents.rows.values_mut() {
                if row.record.patient_id == Some(id) {
                    row.record.patient_id = None;
                    row.version += 1;
                }
            }
        }
    }

    impl MemoryTable for Location {
        fn table(tables: &Tables) -> &Table<Self> {
            &tables.locations
        }

        fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
            &mut tables.locations
        }

        fn check(tables: &Tables, id: Option<Self::Id>, record: &Self) -> Result<(), StoreError> {
            check_key(tables, id, record)
        }

        fn cascade(tables: &mut Tables, id: Self::Id) {
            for row in tables.incidents.rows.values_mut() {
                if row.record.location_id == Some(id) {
                    row.record.location_id = None;
                    row.version += 1;
                }
            }
        }
    }

    impl MemoryTable for Symptom {
        fn table(tables: &Tables) -> &Table<Self> {
            &tables.symptoms
        }

        fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
            &mut tables.symptoms
        }

        fn check(tables: &Tables, id: Option<Self::Id>, record: &Self) -> Result<(), StoreError> {
            check_key(tables, id, record)
        }

        fn cascade(tables: &mut Tables, id: Self::Id) {
            for row in tables.incidents.rows.values_mut() {
                if row.record.symptom_ids.contains(&id) {
                    row.record.symptom_ids.retain(|s| *s != id);
                    row.version += 1;
                }
            }
        }
    }

    impl MemoryTable for Incident {
        fn table(tables: &Tables) -> &Table<Self> {
            &tables.incidents
        }

        fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
            &mut tables.incidents
        }

        fn check(tables: &Tables, _id: Option<Self::Id>, record: &Self) -> Result<(), StoreError> {
            if !tables.diseases.contains(record.disease_id) {
                return Err(StoreError::ForeignKey(format!(
                    "disease {} does not exist",
                    record.disease_id
                )));
            }
            if let Some(patient_id) = record.patient_id {
                if !tables.patients.contains(patient_id) {
                    return Err(StoreError::ForeignKey(format!(
                        "patient {patient_id} does not exist"
                    )));
                }
            }
            if let Some(location_id) = record.location_id {
                if !tables.locations.contains(location_id) {
                    return Err(StoreError::ForeignKey(format!(
                        "location {location_id} does not exist"
                    )));
                }
            }
            if let Some(missing) = record
                .symptom_ids
                .iter()
                .find(|id| !tables.symptoms.contains(**id))
            {
                return Err(StoreError::ForeignKey(format!(
                    "symptom {missing} does not exist"
                )));
            }
            Ok(())
        }
    }
}
