use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::core::data::{empty_as_none, flag_from_loose, set_from_loose};
use crate::error::TriageError;
use crate::models::non_blank;
use crate::models::triage::{TriageAssessment, TriageInput, TriageLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredTime {
    #[serde(alias = "Morning")]
    Morning,
    #[serde(alias = "Afternoon")]
    Afternoon,
}

impl PreferredTime {
    pub const ALL: [PreferredTime; 2] = [PreferredTime::Morning, PreferredTime::Afternoon];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferredTime::Morning => "morning",
            PreferredTime::Afternoon => "afternoon",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PreferredTime::Morning => "Morning",
            PreferredTime::Afternoon => "Afternoon",
        }
    }
}

impl fmt::Display for PreferredTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreferredTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PreferredTime::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown preferred time: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown weekday: {}", s))
    }
}

/// Dentists on the clinic roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dentist {
    Nerea,
    Tamara,
    #[serde(rename = "Juley-Ann")]
    JuleyAnn,
    Dominique,
    Elia,
}

impl Dentist {
    pub const ROSTER: [Dentist; 5] = [
        Dentist::Nerea,
        Dentist::Tamara,
        Dentist::JuleyAnn,
        Dentist::Dominique,
        Dentist::Elia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dentist::Nerea => "Nerea",
            Dentist::Tamara => "Tamara",
            Dentist::JuleyAnn => "Juley-Ann",
            Dentist::Dominique => "Dominique",
            Dentist::Elia => "Elia",
        }
    }
}

impl fmt::Display for Dentist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dentist {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dentist::ROSTER
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown dentist: {}", s))
    }
}

/// Emergency intake form as submitted by front-desk staff.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmergencyIntake {
    /// Registered patient this emergency belongs to
    pub user_id: Uuid,
    #[validate(custom = "non_blank")]
    pub name: String,
    #[validate(custom = "non_blank")]
    pub phone: String,
    #[validate(custom = "non_blank")]
    pub reason: String,
    #[serde(default, deserialize_with = "set_from_loose")]
    pub preferred_time: BTreeSet<PreferredTime>,
    #[serde(default, deserialize_with = "set_from_loose")]
    pub availability: BTreeSet<Weekday>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub preferred_dentist: Option<Dentist>,
    #[serde(default, deserialize_with = "flag_from_loose")]
    pub existing_patient: bool,
    #[serde(default)]
    pub pain: u8,
    #[serde(default)]
    pub symptom: u8,
    #[serde(default)]
    pub systemic: u8,
}

impl EmergencyIntake {
    pub fn triage_input(&self) -> Result<TriageInput, TriageError> {
        TriageInput::new(self.pain, self.symptom, self.systemic, self.existing_patient)
    }
}

/// An entry on the emergency queue.
///
/// The triage score and level are private and only ever derived from the
/// severity inputs, both on admission and when a stored record is read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PatientRecord", into = "PatientRecord")]
pub struct EmergencyPatient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub reason: String,
    pub preferred_time: BTreeSet<PreferredTime>,
    pub availability: BTreeSet<Weekday>,
    pub preferred_dentist: Option<Dentist>,
    pub scheduled_time: Option<DateTime<Utc>>,
    severity: TriageInput,
    triage: TriageAssessment,
}

impl EmergencyPatient {
    pub fn admit(id: Uuid, intake: EmergencyIntake) -> Result<Self, TriageError> {
        let severity = intake.triage_input()?;
        Ok(Self {
            id,
            user_id: intake.user_id,
            name: intake.name,
            phone: intake.phone,
            reason: intake.reason,
            preferred_time: intake.preferred_time,
            availability: intake.availability,
            preferred_dentist: intake.preferred_dentist,
            scheduled_time: None,
            triage: severity.assess(),
            severity,
        })
    }

    pub fn severity(&self) -> TriageInput {
        self.severity
    }

    pub fn existing_patient(&self) -> bool {
        self.severity.existing_patient()
    }

    pub fn triage_score(&self) -> u8 {
        self.triage.score
    }

    pub fn triage_level(&self) -> TriageLevel {
        self.triage.level
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled_time.is_some()
    }
}

/// Column layout of an emergency patient row in the data store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, deserialize_with = "set_from_loose")]
    pub preferred_time: BTreeSet<PreferredTime>,
    #[serde(default, deserialize_with = "set_from_loose")]
    pub availability: BTreeSet<Weekday>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub preferred_dentist: Option<Dentist>,
    #[serde(default, deserialize_with = "flag_from_loose")]
    pub existing_patient: bool,
    #[serde(rename = "pain_level", default)]
    pub pain: u8,
    #[serde(rename = "symptom_score", default)]
    pub symptom: u8,
    #[serde(rename = "systemic_risk_score", default)]
    pub systemic: u8,
    #[serde(default)]
    pub triage_score: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub triage_level: Option<TriageLevel>,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
}

impl TryFrom<PatientRecord> for EmergencyPatient {
    type Error = TriageError;

    fn try_from(record: PatientRecord) -> Result<Self, Self::Error> {
        let severity = TriageInput::new(record.pain, record.symptom, record.systemic, record.existing_patient)?;
        let triage = severity.assess();
        let stored_level_differs = record.triage_level.map_or(false, |level| level != triage.level);
        let stored_score_differs = record.triage_score.map_or(false, |score| score != triage.score);
        if stored_level_differs || stored_score_differs {
            warn!(
                patient_id = %record.id,
                stored_level = ?record.triage_level,
                stored_score = ?record.triage_score,
                level = %triage.level,
                score = triage.score,
                "stored triage disagrees with severity inputs, using recomputed values"
            );
        }

        Ok(Self {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            phone: record.phone,
            reason: record.reason,
            preferred_time: record.preferred_time,
            availability: record.availability,
            preferred_dentist: record.preferred_dentist,
            scheduled_time: record.scheduled_time,
            severity,
            triage,
        })
    }
}

impl From<EmergencyPatient> for PatientRecord {
    fn from(patient: EmergencyPatient) -> Self {
        Self {
            id: patient.id,
            user_id: patient.user_id,
            name: patient.name,
            phone: patient.phone,
            reason: patient.reason,
            preferred_time: patient.preferred_time,
            availability: patient.availability,
            preferred_dentist: patient.preferred_dentist,
            existing_patient: patient.severity.existing_patient(),
            pain: patient.severity.pain(),
            symptom: patient.severity.symptom(),
            systemic: patient.severity.systemic(),
            triage_score: Some(patient.triage.score),
            triage_level: Some(patient.triage.level),
            scheduled_time: patient.scheduled_time,
        }
    }
}

/// A patient with a clinic account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredPatient {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRegisteredPatient {
    #[validate(custom = "non_blank")]
    pub full_name: String,
    #[validate(custom = "non_blank")]
    pub phone_number: String,
    #[validate(email)]
    pub email: Option<String>,
}

impl NewRegisteredPatient {
    pub fn into_patient(self, id: Uuid) -> RegisteredPatient {
        RegisteredPatient {
            id,
            full_name: self.full_name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            email: self.email,
        }
    }
}
