//! SQLite-backed entity store.
//!
//! The schema is the final authority on integrity; the engine's own checks
//! only produce friendlier errors earlier.
//!
//! ## Constraints
//!
//! | Constraint | Definition |
//! |------------|------------|
//! | `IX_Unique_Disease_Name` | `diseases(name)` |
//! | `IX_Unique_Patient_NIN` | `patients(national_id)` |
//! | `IX_Unique_Location_City_Country` | `locations(city, country)` |
//! | `IX_Unique_Symptom_Name` | `symptoms(name)` |
//! | `incidents.disease_id` | `ON DELETE CASCADE` |
//! | `incidents.patient_id`, `incidents.location_id` | `ON DELETE SET NULL` |
//! | `incident_symptoms` (both sides) | `ON DELETE CASCADE` |
//! | `TR_*_Delete_Bumps_Incidents` | bump `version` of incidents a cascade is about to touch |
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database (unique violation) | `UniqueViolation` |
//! | Database (foreign key violation) | `ForeignKey` |
//! | Update matched no `(id, version)` row | `Conflict` |
//! | Delete matched no row | `NotFound` |
//! | Anything else | `Backend` |

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool, Transaction};
use tracing::{Span, instrument};

use incidents_core::{
    DiseaseId, IncidentId, LocationId, NaturalKey, PatientId, RecordId, Stored, SymptomId,
};
use incidents_domain::Incident;

use super::r#trait::{EntityStore, StoreError, UniqueIndex};
use mapping::SqlTable;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS diseases (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        description TEXT NOT NULL,
        version     INTEGER NOT NULL DEFAULT 1
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS IX_Unique_Disease_Name ON diseases (name)",
    r#"
    CREATE TABLE IF NOT EXISTS patients (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        national_id   TEXT NOT NULL,
        first_name    TEXT NOT NULL,
        last_name     TEXT NOT NULL,
        date_of_birth TEXT NOT NULL,
        gender        TEXT NOT NULL,
        contact_info  TEXT NOT NULL,
        version       INTEGER NOT NULL DEFAULT 1
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS IX_Unique_Patient_NIN ON patients (national_id)",
    r#"
    CREATE TABLE IF NOT EXISTS locations (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        city    TEXT NOT NULL,
        country TEXT NOT NULL,
        version INTEGER NOT NULL DEFAULT 1
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS IX_Unique_Location_City_Country ON locations (city, country)",
    r#"
    CREATE TABLE IF NOT EXISTS symptoms (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        description TEXT NOT NULL,
        version     INTEGER NOT NULL DEFAULT 1
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS IX_Unique_Symptom_Name ON symptoms (name)",
    r#"
    CREATE TABLE IF NOT EXISTS incidents (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        disease_id    INTEGER NOT NULL REFERENCES diseases (id) ON DELETE CASCADE,
        patient_id    INTEGER NULL REFERENCES patients (id) ON DELETE SET NULL,
        location_id   INTEGER NULL REFERENCES locations (id) ON DELETE SET NULL,
        date_reported TEXT NOT NULL,
        version       INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS incident_symptoms (
        incident_id INTEGER NOT NULL REFERENCES incidents (id) ON DELETE CASCADE,
        symptom_id  INTEGER NOT NULL REFERENCES symptoms (id) ON DELETE CASCADE,
        position    INTEGER NOT NULL,
        PRIMARY KEY (incident_id, symptom_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS IX_Incident_Symptoms_Symptom ON incident_symptoms (symptom_id)",
    r#"
    CREATE TRIGGER IF NOT EXISTS TR_Patient_Delete_Bumps_Incidents
    BEFORE DELETE ON patients
    BEGIN
        UPDATE incidents SET version = version + 1 WHERE patient_id = OLD.id;
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS TR_Location_Delete_Bumps_Incidents
    BEFORE DELETE ON locations
    BEGIN
        UPDATE incidents SET version = version + 1 WHERE location_id = OLD.id;
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS TR_Symptom_Delete_Bumps_Incidents
    BEFORE DELETE ON symptoms
    BEGIN
        UPDATE incidents SET version = version + 1
        WHERE id IN (SELECT incident_id FROM incident_symptoms WHERE symptom_id = OLD.id);
    END
    "#,
];

/// SQLite entity store. Cheap to clone (the pool is shared).
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool. The pool must have foreign keys enabled.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database at `url` with foreign keys enforced.
    ///
    /// In-memory databases get a single long-lived connection, since every
    /// new connection would otherwise see a fresh empty database.
    #[instrument(err)]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("connect", e))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if url.contains(":memory:") || url.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(8)
                .connect_with(options)
                .await
        }
        .map_err(|e| map_sqlx_error("connect", e))?;

        Ok(Self::new(pool))
    }

    /// A migrated, private in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let store = Self::connect("sqlite::memory:").await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        tracing::info!(statements = SCHEMA.len(), "sqlite schema ready");
        Ok(())
    }
}

#[async_trait]
impl<E: SqlTable> EntityStore<E> for SqliteStore {
    #[instrument(skip(self), fields(kind = %E::KIND), err)]
    async fn find(&self, id: E::Id) -> Result<Option<Stored<E>>, StoreError> {
        let sql = select_sql::<E>("WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.raw())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find", e))?;

        row.map(|r| stored_from_row::<E>(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("find", e))
    }

    #[instrument(skip(self, record), fields(kind = %E::KIND, id = tracing::field::Empty), err)]
    async fn insert(&self, record: E) -> Result<Stored<E>, StoreError> {
        let sql = insert_sql::<E>();
        let result = record
            .bind_record(sqlx::query(&sql))
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("insert", e, &record))?;

        let id = E::Id::from_raw(result.last_insert_rowid());
        Span::current().record("id", id.raw());
        Ok(Stored::new(id, 1, record))
    }

    #[instrument(skip(self, row), fields(kind = %E::KIND, id = %row.id, version = row.version), err)]
    async fn update(&self, row: Stored<E>) -> Result<Stored<E>, StoreError> {
        let sql = update_sql::<E>();
        let result = row
            .record
            .bind_record(sqlx::query(&sql))
            .bind(row.id.raw())
            .bind(version_to_db(row.version))
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("update", e, &row.record))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "{} {} was modified or deleted since version {}",
                E::KIND,
                row.id,
                row.version
            )));
        }
        Ok(Stored::new(row.id, row.version + 1, row.record))
    }

    #[instrument(skip(self), fields(kind = %E::KIND), err)]
    async fn delete(&self, id: E::Id) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(id.raw())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: E::KIND,
                id: id.raw(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(kind = %E::KIND), err)]
    async fn list_all(&self) -> Result<Vec<Stored<E>>, StoreError> {
        let sql = select_sql::<E>("ORDER BY id");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_all", e))?;

        rows.iter()
            .map(stored_from_row::<E>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_all", e))
    }
}

#[async_trait]
impl<E: SqlTable> UniqueIndex<E> for SqliteStore {
    #[instrument(skip(self), fields(kind = %E::KIND), err)]
    async fn exists_by_key(&self, key: &E::Key, exclude: Option<E::Id>) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE {} AND id IS NOT ?)",
            E::TABLE,
            E::KEY_COLUMNS
                .iter()
                .map(|c| format!("{c} = ?"))
                .collect::<Vec<_>>()
                .join(" AND ")
        );
        let row = E::bind_key(key, sqlx::query(&sql))
            .bind(exclude.map(RecordId::raw))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists_by_key", e))?;

        let found: i64 = row
            .try_get(0)
            .map_err(|e| map_sqlx_error("exists_by_key", e))?;
        Ok(found != 0)
    }
}

const INCIDENT_COLUMNS: &str = "id, version, disease_id, patient_id, location_id, date_reported";

#[async_trait]
impl EntityStore<Incident> for SqliteStore {
    #[instrument(skip(self), fields(kind = "incident"), err)]
    async fn find(&self, id: IncidentId) -> Result<Option<Stored<Incident>>, StoreError> {
        // Row and links are read in one transaction so they share a version.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("find", e))?;

        let row = sqlx::query(&format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?"))
            .bind(id.raw())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("find", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let symptom_ids = read_symptoms(&mut tx, id).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("find", e))?;

        incident_from_row(&row, symptom_ids)
            .map(Some)
            .map_err(|e| map_sqlx_error("find", e))
    }

    #[instrument(skip(self, record), fields(kind = "incident", id = tracing::field::Empty), err)]
    async fn insert(&self, record: Incident) -> Result<Stored<Incident>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;

        let result = sqlx::query(
            "INSERT INTO incidents (disease_id, patient_id, location_id, date_reported) VALUES (?, ?, ?, ?)",
        )
        .bind(record.disease_id.get())
        .bind(record.patient_id.map(PatientId::get))
        .bind(record.location_id.map(LocationId::get))
        .bind(record.date_reported)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;

        let id = IncidentId::from_raw(result.last_insert_rowid());
        write_symptoms(&mut tx, id, &record.symptom_ids).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;

        Span::current().record("id", id.raw());
        Ok(Stored::new(id, 1, record))
    }

    #[instrument(skip(self, row), fields(kind = "incident", id = %row.id, version = row.version), err)]
    async fn update(&self, row: Stored<Incident>) -> Result<Stored<Incident>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update", e))?;

        let result = sqlx::query(
            r#"
            UPDATE incidents
            SET disease_id = ?, patient_id = ?, location_id = ?, date_reported = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(row.record.disease_id.get())
        .bind(row.record.patient_id.map(PatientId::get))
        .bind(row.record.location_id.map(LocationId::get))
        .bind(row.record.date_reported)
        .bind(row.id.raw())
        .bind(version_to_db(row.version))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        if result.rows_affected() == 0 {
            // Dropping `tx` rolls back.
            return Err(StoreError::Conflict(format!(
                "incident {} was modified or deleted since version {}",
                row.id, row.version
            )));
        }

        sqlx::query("DELETE FROM incident_symptoms WHERE incident_id = ?")
            .bind(row.id.raw())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update", e))?;
        write_symptoms(&mut tx, row.id, &row.record.symptom_ids).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update", e))?;
        Ok(Stored::new(row.id, row.version + 1, row.record))
    }

    #[instrument(skip(self), fields(kind = "incident"), err)]
    async fn delete(&self, id: IncidentId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM incidents WHERE id = ?")
            .bind(id.raw())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: incidents_core::EntityKind::Incident,
                id: id.raw(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(kind = "incident"), err)]
    async fn list_all(&self) -> Result<Vec<Stored<Incident>>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("list_all", e))?;

        let rows = sqlx::query(&format!("SELECT {INCIDENT_COLUMNS} FROM incidents ORDER BY id"))
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("list_all", e))?;

        let links = sqlx::query(
            "SELECT incident_id, symptom_id FROM incident_symptoms ORDER BY incident_id, position",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("list_all", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("list_all", e))?;

        let mut symptoms: HashMap<i64, Vec<SymptomId>> = HashMap::new();
        for link in &links {
            let incident_id: i64 = link
                .try_get("incident_id")
                .map_err(|e| map_sqlx_error("list_all", e))?;
            let symptom_id: i64 = link
                .try_get("symptom_id")
                .map_err(|e| map_sqlx_error("list_all", e))?;
            symptoms
                .entry(incident_id)
                .or_default()
                .push(SymptomId::new(symptom_id));
        }

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id")?;
                incident_from_row(row, symptoms.remove(&id).unwrap_or_default())
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_all", e))
    }
}

async fn read_symptoms(
    tx: &mut Transaction<'_, Sqlite>,
    id: IncidentId,
) -> Result<Vec<SymptomId>, StoreError> {
    let rows = sqlx::query(
        "SELECT symptom_id FROM incident_symptoms WHERE incident_id = ? ORDER BY position",
    )
    .bind(id.raw())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("read_symptoms", e))?;

    rows.iter()
        .map(|row| row.try_get::<i64, _>("symptom_id").map(SymptomId::new))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error("read_symptoms", e))
}

async fn write_symptoms(
    tx: &mut Transaction<'_, Sqlite>,
    id: IncidentId,
    symptom_ids: &[SymptomId],
) -> Result<(), StoreError> {
    for (position, symptom_id) in symptom_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO incident_symptoms (incident_id, symptom_id, position) VALUES (?, ?, ?)",
        )
        .bind(id.raw())
        .bind(symptom_id.get())
        .bind(position as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("write_symptoms", e))?;
    }
    Ok(())
}

fn incident_from_row(
    row: &SqliteRow,
    symptom_ids: Vec<SymptomId>,
) -> Result<Stored<Incident>, sqlx::Error> {
    let record = Incident {
        disease_id: DiseaseId::new(row.try_get("disease_id")?),
        patient_id: row.try_get::<Option<i64>, _>("patient_id")?.map(PatientId::new),
        location_id: row
            .try_get::<Option<i64>, _>("location_id")?
            .map(LocationId::new),
        date_reported: row.try_get("date_reported")?,
        symptom_ids,
    };
    Ok(Stored::new(
        IncidentId::new(row.try_get("id")?),
        version_from_db(row.try_get("version")?),
        record,
    ))
}

fn stored_from_row<E: SqlTable>(row: &SqliteRow) -> Result<Stored<E>, sqlx::Error> {
    Ok(Stored::new(
        E::Id::from_raw(row.try_get("id")?),
        version_from_db(row.try_get("version")?),
        E::from_row(row)?,
    ))
}

fn select_sql<E: SqlTable>(tail: &str) -> String {
    format!(
        "SELECT id, version, {} FROM {} {}",
        E::COLUMNS.join(", "),
        E::TABLE,
        tail
    )
}

fn insert_sql<E: SqlTable>() -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        E::COLUMNS.join(", "),
        vec!["?"; E::COLUMNS.len()].join(", ")
    )
}

fn update_sql<E: SqlTable>() -> String {
    format!(
        "UPDATE {} SET {}, version = version + 1 WHERE id = ? AND version = ?",
        E::TABLE,
        E::COLUMNS
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

fn version_to_db(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

fn version_from_db(version: i64) -> u64 {
    u64::try_from(version).unwrap_or_default()
}

/// Map a failed write, naming the natural key on unique violations.
fn write_error<E: SqlTable>(operation: &str, err: sqlx::Error, record: &E) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::UniqueViolation {
            kind: E::KIND,
            key: record.natural_key().to_string(),
        };
    }
    map_sqlx_error(operation, err)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            if db_err.is_foreign_key_violation() {
                StoreError::ForeignKey(msg)
            } else {
                StoreError::Backend(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => {
            StoreError::Backend(format!("unexpected row not found in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

mod mapping {
    use sqlx::Row;
    use sqlx::query::Query;
    use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};

    use incidents_core::NaturalKey;
    use incidents_domain::{Disease, Location, Patient, Symptom};

    pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

    /// Column layout of a keyed record table.
    pub trait SqlTable: NaturalKey {
        const TABLE: &'static str;
        /// Data columns, excluding `id` and `version`, in bind order.
        const COLUMNS: &'static [&'static str];
        const KEY_COLUMNS: &'static [&'static str];

        fn bind_record<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

        fn bind_key<'q>(key: &Self::Key, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

        fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
    }

    impl SqlTable for Disease {
        const TABLE: &'static str = "diseases";
        const COLUMNS: &'static [&'static str] = &["name", "description"];
        const KEY_COLUMNS: &'static [&'static str] = &["name"];

        fn bind_record<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
            query.bind(self.name.clone()).bind(self.description.clone())
        }

        fn bind_key<'q>(key: &String, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
            query.bind(key.clone())
        }

        fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
            Ok(Disease {
                name: row.try_get("name")?,
                description: row.try_get("description")?,
            })
        }
    }

    impl SqlTable for Patient {
        const TABLE: &'static str = "patients";
        const COLUMNS: &'static [&'static str] = &[
            "national_id",
            "first_name",
            "last_name",
            "date_of_birth",
            "gender",
            "contact_info",
        ];
        const KEY_COLUMNS: &'static [&'static str] = &["national_id"];

        fn bind_record<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
            query
                .bind(self.national_id.clone())
                .bind(self.first_name.clone())
                .bind(self.last_name.clone())
                .bind(self.date_of_birth)
                .bind(self.gender.clone())
                .bind(self.contact_info.clone())
        }

        fn bind_key<'q>(key: &String, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
            query.bind(key.clone())
        }

        fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
            Ok(Patient {
                national_id: row.try_get("national_id")?,
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                date_of_birth: row.try_get("date_of_birth")?,
                gender: row.try_get("gender")?,
                contact_info: row.try_get("contact_info")?,
            })
        }
    }

    impl SqlTable for Location {
        const TABLE: &'static str = "locations";
        const COLUMNS: &'static [&'static str] = &["city", "country"];
        const KEY_COLUMNS: &'static [&'static str] = &["city", "country"];

        fn bind_record<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
            query.bind(self.city.clone()).bind(self.country.clone())
        }

        fn bind_key<'q>(key: &incidents_domain::LocationKey, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
            query.bind(key.city.clone()).bind(key.country.clone())
        }

        fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
            Ok(Location {
                city: row.try_get("city")?,
                country: row.try_get("country")?,
            })
        }
    }

    impl SqlTable for Symptom {
        const TABLE: &'static str = "symptoms";
        const COLUMNS: &'static [&'static str] = &["name", "description"];
        const KEY_COLUMNS: &'static [&'static str] = &["name"];

        fn bind_record<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
            query.bind(self.name.clone()).bind(self.description.clone())
        }

        fn bind_key<'q>(key: &String, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
            query.bind(key.clone())
        }

        fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
            Ok(Symptom {
                name: row.try_get("name")?,
                description: row.try_get("description")?,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use incidents_domain::{Disease, Location, Symptom};

    async fn test_store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = test_store().await;
        store.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn round_trips_a_location() {
        let store = test_store().await;
        let row = EntityStore::<Location>::insert(&store, Location::new("Lagos", "Nigeria"))
            .await
            .unwrap();
        let found = EntityStore::<Location>::find(&store, row.id).await.unwrap().unwrap();
        assert_eq!(found, row);
    }

    #[tokio::test]
    async fn unique_index_is_enforced_by_the_schema() {
        let store = test_store().await;
        EntityStore::<Symptom>::insert(&store, Symptom::new("Cough", "x")).await.unwrap();
        let err = EntityStore::<Symptom>::insert(&store, Symptom::new("Cough", "y"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation {
                kind: incidents_core::EntityKind::Symptom,
                key: "Cough".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn exists_by_key_honours_exclude() {
        let store = test_store().await;
        let row = EntityStore::<Location>::insert(&store, Location::new("Lagos", "Nigeria"))
            .await
            .unwrap();
        let key = row.record.natural_key();
        assert!(UniqueIndex::<Location>::exists_by_key(&store, &key, None).await.unwrap());
        assert!(!UniqueIndex::<Location>::exists_by_key(&store, &key, Some(row.id)).await.unwrap());
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let store = test_store().await;
        let row = EntityStore::<Disease>::insert(&store, Disease::new("Flu", "x")).await.unwrap();
        EntityStore::<Disease>::update(&store, row.with_record(Disease::new("Flu", "y")))
            .await
            .unwrap();
        let err = EntityStore::<Disease>::update(&store, row.with_record(Disease::new("Flu", "z")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn incident_symptoms_keep_their_order() {
        let store = test_store().await;
        let disease = EntityStore::<Disease>::insert(&store, Disease::new("Flu", "x")).await.unwrap();
        let a = EntityStore::<Symptom>::insert(&store, Symptom::new("Cough", "x")).await.unwrap();
        let b = EntityStore::<Symptom>::insert(&store, Symptom::new("Fever", "x")).await.unwrap();

        let row = EntityStore::<Incident>::insert(
            &store,
            Incident {
                disease_id: disease.id,
                patient_id: None,
                location_id: None,
                date_reported: Utc::now(),
                symptom_ids: vec![b.id, a.id],
            },
        )
        .await
        .unwrap();

        let found = EntityStore::<Incident>::find(&store, row.id).await.unwrap().unwrap();
        assert_eq!(found.record.symptom_ids, vec![b.id, a.id]);
        let all = EntityStore::<Incident>::list_all(&store).await.unwrap();
        assert_eq!(all[0].record.symptom_ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn deleting_a_disease_cascades_to_incidents() {
        let store = test_store().await;
        let disease = EntityStore::<Disease>::insert(&store, Disease::new("Flu", "x")).await.unwrap();
        let row = EntityStore::<Incident>::insert(
            &store,
            Incident {
                disease_id: disease.id,
                patient_id: None,
                location_id: None,
                date_reported: Utc::now(),
                symptom_ids: vec![],
            },
        )
        .await
        .unwrap();

        EntityStore::<Disease>::delete(&store, disease.id).await.unwrap();
        assert!(EntityStore::<Incident>::find(&store, row.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_linked_symptom_bumps_only_linking_incidents() {
        let store = test_store().await;
        let disease = EntityStore::<Disease>::insert(&store, Disease::new("Flu", "x")).await.unwrap();
        let cough = EntityStore::<Symptom>::insert(&store, Symptom::new("Cough", "x")).await.unwrap();
        let fever = EntityStore::<Symptom>::insert(&store, Symptom::new("Fever", "x")).await.unwrap();
        let incident = |symptom_ids| Incident {
            disease_id: disease.id,
            patient_id: None,
            location_id: None,
            date_reported: Utc::now(),
            symptom_ids,
        };
        let linked = EntityStore::<Incident>::insert(&store, incident(vec![cough.id, fever.id]))
            .await
            .unwrap();
        let other = EntityStore::<Incident>::insert(&store, incident(vec![cough.id]))
            .await
            .unwrap();

        EntityStore::<Symptom>::delete(&store, fever.id).await.unwrap();

        let found = EntityStore::<Incident>::find(&store, linked.id).await.unwrap().unwrap();
        assert_eq!(found.version, 2);
        assert_eq!(found.record.symptom_ids, vec![cough.id]);
        let all = EntityStore::<Incident>::list_all(&store).await.unwrap();
        let versions: Vec<_> = all.iter().map(|row| (row.id, row.version)).collect();
        assert_eq!(versions, vec![(linked.id, 2), (other.id, 1)]);
        assert_eq!(all[0].record.symptom_ids, found.record.symptom_ids);

        let err = EntityStore::<Incident>::update(&store, linked).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(EntityStore::<Incident>::update(&store, other).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_disease_is_rejected_by_the_foreign_key() {
        let store = test_store().await;
        let err = EntityStore::<Incident>::insert(
            &store,
            Incident {
                disease_id: DiseaseId::new(42),
                patient_id: None,
                location_id: None,
                date_reported: Utc::now(),
                symptom_ids: vec![],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey(_)));
    }
}
