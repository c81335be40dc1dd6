//! SQLite-backed store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::core::data::normalize_set;
use crate::db::ClinicStore;
use crate::error::StoreError;
use crate::models::patient::PatientRecord;
use crate::models::{
    Appointment, ContactLogEntry, ContactMethod, Dentist, EmergencyPatient, FilterPreset, RegisteredPatient,
    TriageLevel,
};

const PATIENT_COLUMNS: &str = "id, user_id, name, phone, reason, preferred_time, availability, \
     preferred_dentist, existing_patient, pain_level, symptom_score, systemic_risk_score, \
     triage_score, triage_level, scheduled_time";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = pool_options(url, max_connections).connect_with(options).await?;

        // Initialize tables if they don't exist
        Self::initialize_schema(&pool).await?;
        info!(url, "sqlite store ready");

        Ok(Self { pool })
    }

    /// Private database that lives as long as the store. One connection,
    /// since every `:memory:` connection opens a separate database, and that
    /// connection is never reaped.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn initialize_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        for table in ["emergency_patients", "archived_patients"] {
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    phone TEXT NOT NULL,
                    reason TEXT NOT NULL,
                    preferred_time TEXT NOT NULL,
                    availability TEXT NOT NULL,
                    preferred_dentist TEXT,
                    existing_patient INTEGER NOT NULL,
                    pain_level INTEGER NOT NULL,
                    symptom_score INTEGER NOT NULL,
                    systemic_risk_score INTEGER NOT NULL,
                    triage_score INTEGER NOT NULL,
                    triage_level TEXT NOT NULL,
                    scheduled_time TEXT
                )",
                table
            ))
            .execute(pool)
            .await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS contact_logs (
                id TEXT PRIMARY KEY,
                patient_id TEXT NOT NULL,
                method TEXT NOT NULL,
                notes TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS filter_presets (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                filters TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS appointments (
                id TEXT PRIMARY KEY,
                patient_id TEXT NOT NULL,
                appointment_time TEXT NOT NULL,
                location TEXT,
                notes TEXT
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS patient_data (
                id TEXT PRIMARY KEY,
                full_name TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                email TEXT
            )",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn insert_patient_into(&self, table: &str, patient: &EmergencyPatient) -> Result<(), StoreError> {
        let severity = patient.severity();
        sqlx::query(&format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            table, PATIENT_COLUMNS
        ))
        .bind(patient.id.to_string())
        .bind(patient.user_id.to_string())
        .bind(&patient.name)
        .bind(&patient.phone)
        .bind(&patient.reason)
        .bind(serde_json::to_string(&patient.preferred_time)?)
        .bind(serde_json::to_string(&patient.availability)?)
        .bind(patient.preferred_dentist.map(|d| d.as_str()))
        .bind(severity.existing_patient())
        .bind(i64::from(severity.pain()))
        .bind(i64::from(severity.symptom()))
        .bind(i64::from(severity.systemic()))
        .bind(i64::from(patient.triage_score()))
        .bind(patient.triage_level().as_str())
        .bind(patient.scheduled_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Unreadable rows are logged and left out so the rest of the queue still shows.
    async fn select_patients(&self, table: &str) -> Result<Vec<EmergencyPatient>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {} FROM {} ORDER BY rowid", PATIENT_COLUMNS, table))
            .fetch_all(&self.pool)
            .await?;

        let mut patients = Vec::with_capacity(rows.len());
        for row in &rows {
            match patient_from_row(row) {
                Ok(patient) => patients.push(patient),
                Err(e) => {
                    let id: Option<String> = row.try_get("id").ok();
                    warn!(table, id = ?id, error = %e, "skipping unreadable patient row");
                }
            }
        }
        Ok(patients)
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// An in-memory database disappears with its last connection, so that
/// connection is held open for the life of the pool.
fn pool_options(url: &str, max_connections: u32) -> SqlitePoolOptions {
    let options = SqlitePoolOptions::new().max_connections(max_connections);
    if is_in_memory(url) {
        options
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        options
    }
}

fn uuid_column(row: &SqliteRow, column: &str, entity: &'static str) -> Result<Uuid, StoreError> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| StoreError::Corrupt {
        entity,
        reason: format!("{}: {}", column, e),
    })
}

fn small_column(row: &SqliteRow, column: &str) -> Result<u8, StoreError> {
    let raw: i64 = row.try_get(column)?;
    u8::try_from(raw).map_err(|_| StoreError::Corrupt {
        entity: "emergency patient",
        reason: format!("{} out of range: {}", column, raw),
    })
}

fn parsed_column<T: FromStr<Err = String>>(
    row: &SqliteRow,
    column: &str,
    entity: &'static str,
) -> Result<Option<T>, StoreError> {
    let raw: Option<String> = row.try_get(column)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|reason| StoreError::Corrupt { entity, reason }),
    }
}

fn patient_from_row(row: &SqliteRow) -> Result<EmergencyPatient, StoreError> {
    const ENTITY: &str = "emergency patient";

    let preferred_time: String = row.try_get("preferred_time")?;
    let availability: String = row.try_get("availability")?;

    let record = PatientRecord {
        id: uuid_column(row, "id", ENTITY)?,
        user_id: uuid_column(row, "user_id", ENTITY)?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        reason: row.try_get("reason")?,
        preferred_time: normalize_set(loose_json(&preferred_time))?,
        availability: normalize_set(loose_json(&availability))?,
        preferred_dentist: parsed_column::<Dentist>(row, "preferred_dentist", ENTITY)?,
        existing_patient: row.try_get("existing_patient")?,
        pain: small_column(row, "pain_level")?,
        symptom: small_column(row, "symptom_score")?,
        systemic: small_column(row, "systemic_risk_score")?,
        triage_score: Some(small_column(row, "triage_score")?),
        triage_level: parsed_column::<TriageLevel>(row, "triage_level", ENTITY)?,
        scheduled_time: row.try_get("scheduled_time")?,
    };

    EmergencyPatient::try_from(record).map_err(|e| StoreError::Corrupt {
        entity: ENTITY,
        reason: e.to_string(),
    })
}

/// Set columns hold JSON, but bare words written by hand are accepted too.
fn loose_json(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn contact_from_row(row: &SqliteRow) -> Result<ContactLogEntry, StoreError> {
    const ENTITY: &str = "contact log";
    Ok(ContactLogEntry {
        id: uuid_column(row, "id", ENTITY)?,
        patient_id: uuid_column(row, "patient_id", ENTITY)?,
        method: parsed_column::<ContactMethod>(row, "method", ENTITY)?.unwrap_or_default(),
        notes: row.try_get("notes")?,
        timestamp: row.try_get("timestamp")?,
    })
}

fn preset_from_row(row: &SqliteRow) -> Result<FilterPreset, StoreError> {
    const ENTITY: &str = "filter preset";
    let filters: String = row.try_get("filters")?;
    Ok(FilterPreset {
        id: uuid_column(row, "id", ENTITY)?,
        user_id: uuid_column(row, "user_id", ENTITY)?,
        name: row.try_get("name")?,
        filters: serde_json::from_str(&filters)?,
        created_at: row.try_get("created_at")?,
    })
}

fn appointment_from_row(row: &SqliteRow) -> Result<Appointment, StoreError> {
    const ENTITY: &str = "appointment";
    Ok(Appointment {
        id: uuid_column(row, "id", ENTITY)?,
        patient_id: uuid_column(row, "patient_id", ENTITY)?,
        appointment_time: row.try_get("appointment_time")?,
        location: row.try_get("location")?,
        notes: row.try_get("notes")?,
    })
}

fn registered_from_row(row: &SqliteRow) -> Result<RegisteredPatient, StoreError> {
    Ok(RegisteredPatient {
        id: uuid_column(row, "id", "registered patient")?,
        full_name: row.try_get("full_name")?,
        phone_number: row.try_get("phone_number")?,
        email: row.try_get("email")?,
    })
}

#[async_trait]
impl ClinicStore for SqliteStore {
    #[instrument(skip(self, patient), fields(patient_id = %patient.id))]
    async fn insert_patient(&self, patient: &EmergencyPatient) -> Result<(), StoreError> {
        self.insert_patient_into("emergency_patients", patient).await
    }

    async fn list_patients(&self) -> Result<Vec<EmergencyPatient>, StoreError> {
        self.select_patients("emergency_patients").await
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<EmergencyPatient>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM emergency_patients WHERE id = ?",
            PATIENT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(patient_from_row).transpose()
    }

    #[instrument(skip(self), fields(patient_id = %id))]
    async fn set_scheduled_time(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE emergency_patients SET scheduled_time = ? WHERE id = ?")
            .bind(at)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("emergency patient", id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(patient_id = %id))]
    async fn archive_patient(&self, id: Uuid) -> Result<EmergencyPatient, StoreError> {
        let patient = self
            .get_patient(id)
            .await?
            .ok_or_else(|| StoreError::not_found("emergency patient", id))?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            "INSERT INTO archived_patients ({cols}) SELECT {cols} FROM emergency_patients WHERE id = ?",
            cols = PATIENT_COLUMNS
        ))
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM emergency_patients WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("patient moved to archive");
        Ok(patient)
    }

    async fn list_archived_patients(&self) -> Result<Vec<EmergencyPatient>, StoreError> {
        self.select_patients("archived_patients").await
    }

    async fn insert_contact_log(&self, entry: &ContactLogEntry) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO contact_logs (id, patient_id, method, notes, timestamp) VALUES (?, ?, ?, ?, ?)")
            .bind(entry.id.to_string())
            .bind(entry.patient_id.to_string())
            .bind(entry.method.as_str())
            .bind(&entry.notes)
            .bind(entry.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_contact_logs(&self) -> Result<Vec<ContactLogEntry>, StoreError> {
        let rows = sqlx::query("SELECT id, patient_id, method, notes, timestamp FROM contact_logs ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(contact_from_row).collect()
    }

    async fn insert_preset(&self, preset: &FilterPreset) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO filter_presets (id, user_id, name, filters, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(preset.id.to_string())
            .bind(preset.user_id.to_string())
            .bind(&preset.name)
            .bind(serde_json::to_string(&preset.filters)?)
            .bind(preset.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_presets(&self, owner: Uuid) -> Result<Vec<FilterPreset>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, filters, created_at FROM filter_presets
             WHERE user_id = ?
             ORDER BY rowid DESC",
        )
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(preset_from_row).collect()
    }

    async fn get_preset(&self, id: Uuid) -> Result<Option<FilterPreset>, StoreError> {
        let row = sqlx::query("SELECT id, user_id, name, filters, created_at FROM filter_presets WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(preset_from_row).transpose()
    }

    async fn delete_preset(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM filter_presets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("filter preset", id));
        }
        Ok(())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO appointments (id, patient_id, appointment_time, location, notes) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(appointment.id.to_string())
        .bind(appointment.patient_id.to_string())
        .bind(appointment.appointment_time)
        .bind(&appointment.location)
        .bind(&appointment.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        let rows = sqlx::query("SELECT id, patient_id, appointment_time, location, notes FROM appointments ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(appointment_from_row).collect()
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("appointment", id));
        }
        Ok(())
    }

    async fn insert_registered_patient(&self, patient: &RegisteredPatient) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO patient_data (id, full_name, phone_number, email) VALUES (?, ?, ?, ?)")
            .bind(patient.id.to_string())
            .bind(&patient.full_name)
            .bind(&patient.phone_number)
            .bind(&patient.email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_registered_patients(&self) -> Result<Vec<RegisteredPatient>, StoreError> {
        let rows = sqlx::query("SELECT id, full_name, phone_number, email FROM patient_data ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(registered_from_row).collect()
    }

    async fn get_registered_patient(&self, id: Uuid) -> Result<Option<RegisteredPatient>, StoreError> {
        let row = sqlx::query("SELECT id, full_name, phone_number, email FROM patient_data WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(registered_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmergencyIntake, PreferredTime, QueueFilter, StatusFilter, Weekday};
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn patient() -> EmergencyPatient {
        let intake = EmergencyIntake {
            user_id: Uuid::new_v4(),
            name: "Iker".into(),
            phone: "611".into(),
            reason: "Abscess".into(),
            preferred_time: BTreeSet::from([PreferredTime::Afternoon]),
            availability: BTreeSet::from([Weekday::Monday, Weekday::Thursday]),
            preferred_dentist: Some(Dentist::Tamara),
            existing_patient: false,
            pain: 2,
            symptom: 3,
            systemic: 1,
        };
        EmergencyPatient::admit(Uuid::new_v4(), intake).unwrap()
    }

    #[tokio::test]
    async fn test_patient_round_trip_and_archive() {
        let store = SqliteStore::in_memory().await.unwrap();
        let p = patient();
        store.insert_patient(&p).await.unwrap();

        let listed = store.list_patients().await.unwrap();
        assert_eq!(listed, vec![p.clone()]);

        let at = Utc.with_ymd_and_hms(2024, 9, 2, 10, 30, 0).unwrap();
        store.set_scheduled_time(p.id, at).await.unwrap();
        let stored = store.get_patient(p.id).await.unwrap().unwrap();
        assert_eq!(stored.scheduled_time, Some(at));

        let archived = store.archive_patient(p.id).await.unwrap();
        assert_eq!(archived.id, p.id);
        assert!(store.list_patients().await.unwrap().is_empty());
        assert_eq!(store.list_archived_patients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hand_written_scalar_set_column_is_accepted() {
        let store = SqliteStore::in_memory().await.unwrap();
        let p = patient();
        store.insert_patient(&p).await.unwrap();
        sqlx::query("UPDATE emergency_patients SET preferred_time = 'morning' WHERE id = ?")
            .bind(p.id.to_string())
            .execute(&store.pool)
            .await
            .unwrap();

        let stored = store.get_patient(p.id).await.unwrap().unwrap();
        assert_eq!(stored.preferred_time, BTreeSet::from([PreferredTime::Morning]));
    }

    #[test]
    fn test_in_memory_pool_keeps_its_connection() {
        let options = pool_options("sqlite::memory:", 1);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);

        let options = pool_options("sqlite://hellomolar.db", 5);
        assert_eq!(options.get_min_connections(), 0);
        assert!(options.get_idle_timeout().is_some());
    }

    #[tokio::test]
    async fn test_unreadable_rows_do_not_hide_the_rest() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = patient();
        let second = patient();
        let third = patient();
        for p in [&first, &second, &third] {
            store.insert_patient(p).await.unwrap();
        }
        sqlx::query("UPDATE emergency_patients SET preferred_dentist = 'Dr. Who' WHERE id = ?")
            .bind(second.id.to_string())
            .execute(&store.pool)
            .await
            .unwrap();
        sqlx::query("UPDATE emergency_patients SET pain_level = 9 WHERE id = ?")
            .bind(third.id.to_string())
            .execute(&store.pool)
            .await
            .unwrap();

        let ids: Vec<_> = store.list_patients().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.id]);
    }

    #[tokio::test]
    async fn test_presets_and_appointments() {
        let store = SqliteStore::in_memory().await.unwrap();
        let owner = Uuid::new_v4();
        let preset = FilterPreset {
            id: Uuid::new_v4(),
            user_id: owner,
            name: "Waiting mornings".into(),
            filters: QueueFilter::default()
                .with_preferred_time(PreferredTime::Morning)
                .with_status(StatusFilter::Waiting),
            created_at: Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap(),
        };
        store.insert_preset(&preset).await.unwrap();
        assert_eq!(store.list_presets(owner).await.unwrap(), vec![preset.clone()]);
        store.delete_preset(preset.id).await.unwrap();
        assert!(store.delete_preset(preset.id).await.is_err());

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            appointment_time: Utc.with_ymd_and_hms(2024, 9, 3, 15, 0, 0).unwrap(),
            location: Some("Room 1".into()),
            notes: None,
        };
        store.insert_appointment(&appointment).await.unwrap();
        assert_eq!(store.list_appointments().await.unwrap(), vec![appointment.clone()]);
        store.delete_appointment(appointment.id).await.unwrap();
        assert!(store.list_appointments().await.unwrap().is_empty());
    }
}
