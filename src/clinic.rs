//! Clinic service facade.
//!
//! Every operation reads a fresh snapshot from the store, runs the pure core
//! logic over it and writes back through the same store. Nothing is cached
//! between calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthProvider, StaffUser};
use crate::core::contacts::ContactSummary;
use crate::core::queue::{build_queue, derive_status, PatientStatus, QueueRow};
use crate::core::schedule::{filter_appointments, search_registered};
use crate::db::ClinicStore;
use crate::error::{ClinicError, StoreError};
use crate::models::{
    non_blank, Appointment, AppointmentFilter, AppointmentRequest, ContactLogEntry, EmergencyIntake,
    EmergencyPatient, FilterPreset, NewContactLog, NewRegisteredPatient, QueueFilter, RegisteredPatient,
};

pub type Result<T> = std::result::Result<T, ClinicError>;

#[derive(Debug, Validate)]
struct PresetDraft {
    #[validate(custom = "non_blank")]
    name: String,
}

pub struct Clinic {
    store: Arc<dyn ClinicStore>,
    auth: Arc<dyn AuthProvider>,
}

impl Clinic {
    pub fn new(store: Arc<dyn ClinicStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    pub fn current_user(&self) -> Option<StaffUser> {
        self.auth.current_user()
    }

    // ===== Emergency queue =====

    /// Validates the intake, scores it and puts the patient on the queue.
    #[instrument(skip(self, intake), fields(user_id = %intake.user_id))]
    pub async fn admit(&self, intake: EmergencyIntake) -> Result<EmergencyPatient> {
        intake.validate()?;
        self.registered_patient(intake.user_id).await?;

        let patient = EmergencyPatient::admit(Uuid::new_v4(), intake)?;
        self.store.insert_patient(&patient).await?;

        info!(
            patient_id = %patient.id,
            score = patient.triage_score(),
            level = %patient.triage_level(),
            "emergency patient admitted"
        );
        Ok(patient)
    }

    pub async fn patients(&self) -> Result<Vec<EmergencyPatient>> {
        Ok(self.store.list_patients().await?)
    }

    pub async fn patient(&self, id: Uuid) -> Result<EmergencyPatient> {
        self.store
            .get_patient(id)
            .await?
            .ok_or_else(|| StoreError::not_found("emergency patient", id).into())
    }

    pub async fn archived_patients(&self) -> Result<Vec<EmergencyPatient>> {
        Ok(self.store.list_archived_patients().await?)
    }

    #[instrument(skip(self, filter))]
    pub async fn queue(&self, filter: &QueueFilter) -> Result<Vec<QueueRow>> {
        let patients = self.store.list_patients().await?;
        let logs = self.store.list_contact_logs().await?;
        let rows = build_queue(&patients, &logs, filter);
        debug!(
            patients = patients.len(),
            logs = logs.len(),
            shown = rows.len(),
            "queue assembled"
        );
        Ok(rows)
    }

    #[instrument(skip(self), fields(patient_id = %id))]
    pub async fn status_of(&self, id: Uuid) -> Result<PatientStatus> {
        let patient = self.patient(id).await?;
        let summary = self.contact_summary().await?;
        Ok(derive_status(&patient, &summary))
    }

    // ===== Contact attempts =====

    #[instrument(skip(self, contact), fields(patient_id = %contact.patient_id, method = %contact.method))]
    pub async fn log_contact(&self, contact: NewContactLog) -> Result<ContactLogEntry> {
        contact.validate()?;
        self.patient(contact.patient_id).await?;

        let entry = contact.into_entry(Uuid::new_v4(), Utc::now());
        self.store.insert_contact_log(&entry).await?;

        info!(entry_id = %entry.id, "contact attempt logged");
        Ok(entry)
    }

    pub async fn contact_summary(&self) -> Result<ContactSummary> {
        let logs = self.store.list_contact_logs().await?;
        Ok(ContactSummary::aggregate(&logs))
    }

    // ===== Appointments =====

    #[instrument(skip(self, request), fields(patient_id = %request.patient_id))]
    pub async fn schedule_appointment(&self, request: AppointmentRequest) -> Result<Appointment> {
        self.registered_patient(request.patient_id).await?;

        let appointment = request.into_appointment(Uuid::new_v4());
        self.store.insert_appointment(&appointment).await?;

        info!(
            appointment_id = %appointment.id,
            at = %appointment.appointment_time,
            "appointment scheduled"
        );
        Ok(appointment)
    }

    /// Books an appointment for a waiting emergency patient and marks the
    /// queue entry scheduled. Notes default to the emergency reason.
    #[instrument(skip(self, location, notes), fields(patient_id = %patient_id))]
    pub async fn book_emergency(
        &self,
        patient_id: Uuid,
        at: DateTime<Utc>,
        location: Option<String>,
        notes: Option<String>,
    ) -> Result<Appointment> {
        let patient = self.patient(patient_id).await?;
        let status = derive_status(&patient, &self.contact_summary().await?);
        if status != PatientStatus::Waiting {
            warn!(%status, "booking rejected");
            return Err(ClinicError::InvalidTransition {
                patient_id,
                action: "book",
                status,
            });
        }

        let appointment = self
            .schedule_appointment(AppointmentRequest {
                patient_id: patient.user_id,
                appointment_time: at,
                location,
                notes: notes.or_else(|| Some(patient.reason.clone())),
            })
            .await?;

        // the appointment is kept even if this fails
        self.store.set_scheduled_time(patient_id, at).await?;

        info!(appointment_id = %appointment.id, "emergency patient scheduled");
        Ok(appointment)
    }

    /// Moves a scheduled patient off the queue into the archive.
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub async fn discharge(&self, patient_id: Uuid) -> Result<EmergencyPatient> {
        let patient = self.patient(patient_id).await?;
        if !patient.is_scheduled() {
            let status = derive_status(&patient, &self.contact_summary().await?);
            warn!(%status, "discharge rejected");
            return Err(ClinicError::InvalidTransition {
                patient_id,
                action: "discharge",
                status,
            });
        }

        let archived = self.store.archive_patient(patient_id).await?;
        info!("patient discharged");
        Ok(archived)
    }

    pub async fn appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let all = self.store.list_appointments().await?;
        Ok(filter_appointments(&all, filter).into_iter().cloned().collect())
    }

    #[instrument(skip(self), fields(appointment_id = %id))]
    pub async fn cancel_appointment(&self, id: Uuid) -> Result<()> {
        self.store.delete_appointment(id).await?;
        info!("appointment cancelled");
        Ok(())
    }

    // ===== Registered patients =====

    #[instrument(skip(self, patient))]
    pub async fn register_patient(&self, patient: NewRegisteredPatient) -> Result<RegisteredPatient> {
        patient.validate()?;
        let patient = patient.into_patient(Uuid::new_v4());
        self.store.insert_registered_patient(&patient).await?;
        info!(patient_id = %patient.id, "patient registered");
        Ok(patient)
    }

    pub async fn registered_patient(&self, id: Uuid) -> Result<RegisteredPatient> {
        self.store
            .get_registered_patient(id)
            .await?
            .ok_or_else(|| StoreError::not_found("registered patient", id).into())
    }

    pub async fn find_registered(&self, query: &str) -> Result<Vec<RegisteredPatient>> {
        let all = self.store.list_registered_patients().await?;
        Ok(search_registered(&all, query.trim()).into_iter().cloned().collect())
    }

    // ===== Filter presets =====

    #[instrument(skip(self, filters))]
    pub async fn save_preset(&self, name: &str, filters: QueueFilter) -> Result<FilterPreset> {
        let user = self
            .current_user()
            .ok_or(ClinicError::Unauthenticated("save presets"))?;
        let draft = PresetDraft {
            name: name.trim().to_string(),
        };
        draft.validate()?;

        let preset = FilterPreset {
            id: Uuid::new_v4(),
            user_id: user.id,
            name: draft.name,
            filters,
            created_at: Utc::now(),
        };
        self.store.insert_preset(&preset).await?;

        info!(preset_id = %preset.id, user_id = %user.id, "filter preset saved");
        Ok(preset)
    }

    /// The signed-in user's presets, newest first. Empty when signed out.
    pub async fn presets(&self) -> Result<Vec<FilterPreset>> {
        match self.current_user() {
            Some(user) => Ok(self.store.list_presets(user.id).await?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn load_preset(&self, id: Uuid) -> Result<QueueFilter> {
        self.store
            .get_preset(id)
            .await?
            .map(|preset| preset.filters)
            .ok_or_else(|| StoreError::not_found("filter preset", id).into())
    }

    #[instrument(skip(self), fields(preset_id = %id))]
    pub async fn delete_preset(&self, id: Uuid) -> Result<()> {
        self.store.delete_preset(id).await?;
        info!("filter preset deleted");
        Ok(())
    }
}
