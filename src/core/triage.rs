//! Triage scoring for emergency dental intake.
//!
//! The score is the sum of the three severity inputs plus one for existing
//! patients, giving a range of 0..=8. Levels come from an ordered table of
//! `(minimum score, level)` pairs checked highest first; anything below the
//! last threshold is routine.

use crate::error::TriageError;
use crate::models::triage::{TriageAssessment, TriageInput, TriageLevel};

/// Checked in order; first match wins.
pub const LEVEL_THRESHOLDS: [(u8, TriageLevel); 4] = [
    (6, TriageLevel::Critical),
    (4, TriageLevel::Urgent),
    (3, TriageLevel::SemiUrgent),
    (2, TriageLevel::LowUrgency),
];

pub const FALLBACK_LEVEL: TriageLevel = TriageLevel::Routine;

pub fn score(input: &TriageInput) -> u8 {
    input.pain() + input.symptom() + input.systemic() + u8::from(input.existing_patient())
}

pub fn level_for_score(score: u8) -> TriageLevel {
    LEVEL_THRESHOLDS
        .iter()
        .find(|(minimum, _)| score >= *minimum)
        .map(|(_, level)| *level)
        .unwrap_or(FALLBACK_LEVEL)
}

pub fn assess(input: &TriageInput) -> TriageAssessment {
    let score = score(input);
    TriageAssessment {
        score,
        level: level_for_score(score),
    }
}

/// Validates raw form values and assesses them in one step.
pub fn assess_raw(pain: u8, symptom: u8, systemic: u8, existing_patient: bool) -> Result<TriageAssessment, TriageError> {
    TriageInput::new(pain, symptom, systemic, existing_patient).map(|input| assess(&input))
}
