//! In-process store backed by concurrent maps.
//!
//! Each row carries an insertion sequence so listings come back in the order
//! records were written, the way a table scan would return them.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::db::ClinicStore;
use crate::error::StoreError;
use crate::models::{Appointment, ContactLogEntry, EmergencyPatient, FilterPreset, RegisteredPatient};

#[derive(Debug, Clone)]
struct Row<T> {
    seq: u64,
    record: T,
}

type Table<T> = DashMap<Uuid, Row<T>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    seq: AtomicU64,
    patients: Table<EmergencyPatient>,
    archived: Table<EmergencyPatient>,
    contact_logs: Table<ContactLogEntry>,
    presets: Table<FilterPreset>,
    appointments: Table<Appointment>,
    registered: Table<RegisteredPatient>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert<T>(&self, table: &Table<T>, id: Uuid, record: T) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        table.insert(id, Row { seq, record });
    }
}

fn ordered<T: Clone>(table: &Table<T>) -> Vec<T> {
    let mut rows: Vec<(u64, T)> = table
        .iter()
        .map(|entry| (entry.seq, entry.record.clone()))
        .collect();
    rows.sort_by_key(|(seq, _)| *seq);
    rows.into_iter().map(|(_, record)| record).collect()
}

fn fetch<T: Clone>(table: &Table<T>, id: &Uuid) -> Option<T> {
    table.get(id).map(|row| row.record.clone())
}

#[async_trait]
impl ClinicStore for MemoryStore {
    async fn insert_patient(&self, patient: &EmergencyPatient) -> Result<(), StoreError> {
        self.insert(&self.patients, patient.id, patient.clone());
        Ok(())
    }

    async fn list_patients(&self) -> Result<Vec<EmergencyPatient>, StoreError> {
        Ok(ordered(&self.patients))
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<EmergencyPatient>, StoreError> {
        Ok(fetch(&self.patients, &id))
    }

    async fn set_scheduled_time(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut row = self
            .patients
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("emergency patient", id))?;
        row.record.scheduled_time = Some(at);
        Ok(())
    }

    async fn archive_patient(&self, id: Uuid) -> Result<EmergencyPatient, StoreError> {
        let (_, row) = self
            .patients
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("emergency patient", id))?;
        let patient = row.record;
        self.insert(&self.archived, id, patient.clone());
        debug!(patient_id = %id, "patient moved to archive");
        Ok(patient)
    }

    async fn list_archived_patients(&self) -> Result<Vec<EmergencyPatient>, StoreError> {
        Ok(ordered(&self.archived))
    }

    async fn insert_contact_log(&self, entry: &ContactLogEntry) -> Result<(), StoreError> {
        self.insert(&self.contact_logs, entry.id, entry.clone());
        Ok(())
    }

    async fn list_contact_logs(&self) -> Result<Vec<ContactLogEntry>, StoreError> {
        Ok(ordered(&self.contact_logs))
    }

    async fn insert_preset(&self, preset: &FilterPreset) -> Result<(), StoreError> {
        self.insert(&self.presets, preset.id, preset.clone());
        Ok(())
    }

    async fn list_presets(&self, owner: Uuid) -> Result<Vec<FilterPreset>, StoreError> {
        let mut presets: Vec<_> = ordered(&self.presets)
            .into_iter()
            .filter(|preset| preset.user_id == owner)
            .collect();
        presets.reverse();
        Ok(presets)
    }

    async fn get_preset(&self, id: Uuid) -> Result<Option<FilterPreset>, StoreError> {
        Ok(fetch(&self.presets, &id))
    }

    async fn delete_preset(&self, id: Uuid) -> Result<(), StoreError> {
        self.presets
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("filter preset", id))
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.insert(&self.appointments, appointment.id, appointment.clone());
        Ok(())
    }

    async fn list_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        Ok(ordered(&self.appointments))
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError> {
        self.appointments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("appointment", id))
    }

    async fn insert_registered_patient(&self, patient: &RegisteredPatient) -> Result<(), StoreError> {
        self.insert(&self.registered, patient.id, patient.clone());
        Ok(())
    }

    async fn list_registered_patients(&self) -> Result<Vec<RegisteredPatient>, StoreError> {
        Ok(ordered(&self.registered))
    }

    async fn get_registered_patient(&self, id: Uuid) -> Result<Option<RegisteredPatient>, StoreError> {
        Ok(fetch(&self.registered, &id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactMethod, QueueFilter};
    use chrono::{Duration, TimeZone};

    fn log(patient_id: Uuid, n: i64) -> ContactLogEntry {
        ContactLogEntry {
            id: Uuid::new_v4(),
            patient_id,
            method: ContactMethod::Sms,
            notes: format!("attempt {}", n),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap() + Duration::minutes(n),
        }
    }

    #[tokio::test]
    async fn test_listing_preserves_insertion_order() {
        let store = MemoryStore::new();
        let patient = Uuid::new_v4();
        let logs: Vec<_> = (0..20).map(|n| log(patient, n)).collect();
        for entry in &logs {
            store.insert_contact_log(entry).await.unwrap();
        }
        assert_eq!(store.list_contact_logs().await.unwrap(), logs);
    }

    #[tokio::test]
    async fn test_presets_are_newest_first_per_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        for (n, user_id) in [(1, owner), (2, other), (3, owner)] {
            let preset = FilterPreset {
                id: Uuid::new_v4(),
                user_id,
                name: format!("preset {}", n),
                filters: QueueFilter::default(),
                created_at: Utc::now(),
            };
            store.insert_preset(&preset).await.unwrap();
        }

        let names: Vec<_> = store
            .list_presets(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["preset 3", "preset 1"]);
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.delete_appointment(id).await,
            Err(StoreError::NotFound { entity: "appointment", .. })
        ));
        assert!(store.archive_patient(id).await.is_err());
        assert!(store.set_scheduled_time(id, Utc::now()).await.is_err());
        assert!(store.get_preset(id).await.unwrap().is_none());
    }
}
