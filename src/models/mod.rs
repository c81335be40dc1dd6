//! Record types exchanged with the data store and the UI layer.

pub mod appointment;
pub mod contact;
pub mod patient;
pub mod preset;
pub mod triage;

pub use appointment::{Appointment, AppointmentFilter, AppointmentRequest};
pub use contact::{ContactLogEntry, ContactMethod, NewContactLog};
pub use patient::{
    Dentist, EmergencyIntake, EmergencyPatient, NewRegisteredPatient, PreferredTime,
    RegisteredPatient, Weekday,
};
pub use preset::{FilterPreset, QueueFilter, StatusFilter};
pub use triage::{TriageAssessment, TriageInput, TriageLevel};

use validator::ValidationError;

/// Rejects empty or whitespace-only text fields.
pub(crate) fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
