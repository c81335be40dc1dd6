//! Emergency-queue status derivation and multi-field filtering.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::core::contacts::ContactSummary;
use crate::models::{ContactLogEntry, EmergencyPatient, PreferredTime, QueueFilter, StatusFilter};

/// Lookup of which patients have at least one contact attempt.
pub trait ContactIndex {
    fn has_contact(&self, patient_id: &Uuid) -> bool;
}

impl ContactIndex for HashSet<Uuid> {
    fn has_contact(&self, patient_id: &Uuid) -> bool {
        self.contains(patient_id)
    }
}

impl<C: ContactIndex + ?Sized> ContactIndex for &C {
    fn has_contact(&self, patient_id: &Uuid) -> bool {
        (**self).has_contact(patient_id)
    }
}

/// Visible status of a queue entry, computed at read time and never stored.
///
/// `Untouched -> Waiting` on the first contact attempt, `Waiting -> Scheduled`
/// once a scheduled time is set. Nothing leads back from `Scheduled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    #[default]
    #[serde(rename = "")]
    Untouched,
    Waiting,
    Scheduled,
}

impl PatientStatus {
    /// Text for the status column; untouched rows show nothing.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Untouched => "",
            PatientStatus::Waiting => "waiting",
            PatientStatus::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientStatus::Untouched => f.write_str("untouched"),
            other => f.write_str(other.as_str()),
        }
    }
}

pub fn derive_status<C: ContactIndex + ?Sized>(patient: &EmergencyPatient, contacts: &C) -> PatientStatus {
    if patient.scheduled_time.is_some() {
        PatientStatus::Scheduled
    } else if contacts.has_contact(&patient.id) {
        PatientStatus::Waiting
    } else {
        PatientStatus::Untouched
    }
}

fn intersects<T: Ord>(wanted: &BTreeSet<T>, offered: &BTreeSet<T>) -> bool {
    wanted.is_empty() || !wanted.is_disjoint(offered)
}

/// True when the patient satisfies every set field of the filter.
pub fn matches<C: ContactIndex + ?Sized>(patient: &EmergencyPatient, filter: &QueueFilter, contacts: &C) -> bool {
    let status_ok = match filter.status {
        None => true,
        Some(StatusFilter::Waiting) => derive_status(patient, contacts) == PatientStatus::Waiting,
        Some(StatusFilter::Scheduled) => patient.scheduled_time.is_some(),
    };

    intersects(&filter.preferred_time, &patient.preferred_time)
        && intersects(&filter.availability, &patient.availability)
        && status_ok
        && filter
            .triage_level
            .map_or(true, |level| patient.triage_level() == level)
        && filter
            .preferred_dentist
            .map_or(true, |dentist| patient.preferred_dentist == Some(dentist))
}

/// Stable filter: output keeps the relative order of the input.
pub fn filter_patients<'a, C: ContactIndex + ?Sized>(
    patients: &'a [EmergencyPatient],
    filter: &QueueFilter,
    contacts: &C,
) -> Vec<&'a EmergencyPatient> {
    patients
        .iter()
        .filter(|patient| matches(patient, filter, contacts))
        .collect()
}

/// One rendered line of the emergency queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueRow {
    pub patient: EmergencyPatient,
    pub status: PatientStatus,
    pub attempts: usize,
    pub history: Vec<ContactLogEntry>,
}

impl QueueRow {
    pub fn preferred_time_display(&self) -> String {
        display_preferred_time(&self.patient.preferred_time)
    }
}

/// Aggregates the logs, filters the patients and assembles display rows.
pub fn build_queue(patients: &[EmergencyPatient], logs: &[ContactLogEntry], filter: &QueueFilter) -> Vec<QueueRow> {
    let summary = ContactSummary::aggregate(logs);
    filter_patients(patients, filter, &summary)
        .into_iter()
        .map(|patient| QueueRow {
            status: derive_status(patient, &summary),
            attempts: summary.attempts(&patient.id),
            history: summary.history(&patient.id).to_vec(),
            patient: patient.clone(),
        })
        .collect()
}

/// "Morning, Afternoon"
pub fn display_preferred_time(times: &BTreeSet<PreferredTime>) -> String {
    times
        .iter()
        .map(PreferredTime::display_name)
        .collect::<Vec<_>>()
        .join(", ")
}
