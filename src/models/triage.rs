use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::triage;
use crate::error::TriageError;

pub const MAX_PAIN: u8 = 2;
pub const MAX_SYMPTOM: u8 = 3;
pub const MAX_SYSTEMIC: u8 = 2;

/// Urgency rank, "1" (most critical) to "5" (routine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TriageLevel {
    #[serde(rename = "1")]
    Critical,
    #[serde(rename = "2")]
    Urgent,
    #[serde(rename = "3")]
    SemiUrgent,
    #[serde(rename = "4")]
    LowUrgency,
    #[serde(rename = "5")]
    Routine,
}

impl TriageLevel {
    pub const ALL: [TriageLevel; 5] = [
        TriageLevel::Critical,
        TriageLevel::Urgent,
        TriageLevel::SemiUrgent,
        TriageLevel::LowUrgency,
        TriageLevel::Routine,
    ];

    /// Numeric rank (1 = highest)
    pub fn rank(&self) -> u8 {
        match self {
            TriageLevel::Critical => 1,
            TriageLevel::Urgent => 2,
            TriageLevel::SemiUrgent => 3,
            TriageLevel::LowUrgency => 4,
            TriageLevel::Routine => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriageLevel::Critical => "1",
            TriageLevel::Urgent => "2",
            TriageLevel::SemiUrgent => "3",
            TriageLevel::LowUrgency => "4",
            TriageLevel::Routine => "5",
        }
    }

    /// Label shown in the level picker
    pub fn label(&self) -> &'static str {
        match self {
            TriageLevel::Critical => "Level 1 - Critical",
            TriageLevel::Urgent => "Level 2 - Urgent",
            TriageLevel::SemiUrgent => "Level 3 - Semi-Urgent",
            TriageLevel::LowUrgency => "Level 4 - Low Urgency",
            TriageLevel::Routine => "Level 5 - Routine",
        }
    }
}

impl fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriageLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriageLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s.trim())
            .ok_or_else(|| format!("unknown triage level: {}", s))
    }
}

/// The four severity/eligibility inputs, each checked against its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriageInput {
    pain: u8,
    symptom: u8,
    systemic: u8,
    existing_patient: bool,
}

impl TriageInput {
    /// Out-of-domain values are rejected, never clamped.
    pub fn new(pain: u8, symptom: u8, systemic: u8, existing_patient: bool) -> Result<Self, TriageError> {
        check("pain", pain, MAX_PAIN)?;
        check("symptom", symptom, MAX_SYMPTOM)?;
        check("systemic", systemic, MAX_SYSTEMIC)?;
        Ok(Self {
            pain,
            symptom,
            systemic,
            existing_patient,
        })
    }

    pub fn pain(&self) -> u8 {
        self.pain
    }

    pub fn symptom(&self) -> u8 {
        self.symptom
    }

    pub fn systemic(&self) -> u8 {
        self.systemic
    }

    pub fn existing_patient(&self) -> bool {
        self.existing_patient
    }

    /// Score and level for these inputs. Pure; safe to call on every change.
    pub fn assess(&self) -> TriageAssessment {
        triage::assess(self)
    }
}

fn check(field: &'static str, value: u8, max: u8) -> Result<(), TriageError> {
    if value > max {
        return Err(TriageError::OutOfRange { field, value, max });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriageAssessment {
    pub score: u8,
    pub level: TriageLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_round_trips_through_wire_form() {
        for level in TriageLevel::ALL {
            assert_eq!(level.as_str().parse::<TriageLevel>(), Ok(level));
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level.rank()));
        }
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        assert!("0".parse::<TriageLevel>().is_err());
        assert!("".parse::<TriageLevel>().is_err());
    }

    #[test]
    fn test_out_of_domain_inputs_are_rejected() {
        assert_eq!(
            TriageInput::new(3, 0, 0, false),
            Err(TriageError::OutOfRange { field: "pain", value: 3, max: 2 })
        );
        assert_eq!(
            TriageInput::new(0, 4, 0, false),
            Err(TriageError::OutOfRange { field: "symptom", value: 4, max: 3 })
        );
        assert_eq!(
            TriageInput::new(0, 0, 9, true),
            Err(TriageError::OutOfRange { field: "systemic", value: 9, max: 2 })
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(TriageLevel::Critical.label(), "Level 1 - Critical");
        assert_eq!(TriageLevel::LowUrgency.label(), "Level 4 - Low Urgency");
    }
}
