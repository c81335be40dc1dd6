use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::data::non_empty;

/// A booked visit for a registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    /// Registered patient id
    pub patient_id: Uuid,
    pub appointment_time: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentRequest {
    pub patient_id: Uuid,
    pub appointment_time: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AppointmentRequest {
    pub fn into_appointment(self, id: Uuid) -> Appointment {
        Appointment {
            id,
            patient_id: self.patient_id,
            appointment_time: self.appointment_time,
            location: non_empty(self.location),
            notes: non_empty(self.notes),
        }
    }
}

/// Overview filter; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    /// Calendar date (UTC) of the appointment
    pub date: Option<NaiveDate>,
}
