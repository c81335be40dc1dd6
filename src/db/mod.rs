//! Data store module for the HelloMolar clinic
//!
//! The store is an external collaborator: plain record CRUD keyed by opaque
//! ids. Any filtering beyond lookup by id happens in the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Appointment, ContactLogEntry, EmergencyPatient, FilterPreset, RegisteredPatient};

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[async_trait]
pub trait ClinicStore: Send + Sync {
    // ===== Emergency queue =====
    async fn insert_patient(&self, patient: &EmergencyPatient) -> Result<(), StoreError>;
    async fn list_patients(&self) -> Result<Vec<EmergencyPatient>, StoreError>;
    async fn get_patient(&self, id: Uuid) -> Result<Option<EmergencyPatient>, StoreError>;
    async fn set_scheduled_time(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
    /// Copies the record to the archive and removes it from the queue.
    async fn archive_patient(&self, id: Uuid) -> Result<EmergencyPatient, StoreError>;
    async fn list_archived_patients(&self) -> Result<Vec<EmergencyPatient>, StoreError>;

    // ===== Contact attempts =====
    async fn insert_contact_log(&self, entry: &ContactLogEntry) -> Result<(), StoreError>;
    async fn list_contact_logs(&self) -> Result<Vec<ContactLogEntry>, StoreError>;

    // ===== Filter presets =====
    async fn insert_preset(&self, preset: &FilterPreset) -> Result<(), StoreError>;
    /// Newest first.
    async fn list_presets(&self, owner: Uuid) -> Result<Vec<FilterPreset>, StoreError>;
    async fn get_preset(&self, id: Uuid) -> Result<Option<FilterPreset>, StoreError>;
    async fn delete_preset(&self, id: Uuid) -> Result<(), StoreError>;

    // ===== Appointments =====
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;
    async fn list_appointments(&self) -> Result<Vec<Appointment>, StoreError>;
    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError>;

    // ===== Registered patients =====
    async fn insert_registered_patient(&self, patient: &RegisteredPatient) -> Result<(), StoreError>;
    async fn list_registered_patients(&self) -> Result<Vec<RegisteredPatient>, StoreError>;
    async fn get_registered_patient(&self, id: Uuid) -> Result<Option<RegisteredPatient>, StoreError>;
}
