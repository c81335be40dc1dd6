use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::non_blank;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactMethod {
    #[default]
    Phone,
    WhatsApp,
    #[serde(rename = "SMS")]
    Sms,
    Email,
}

impl ContactMethod {
    pub const ALL: [ContactMethod; 4] = [
        ContactMethod::Phone,
        ContactMethod::WhatsApp,
        ContactMethod::Sms,
        ContactMethod::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::Phone => "Phone",
            ContactMethod::WhatsApp => "WhatsApp",
            ContactMethod::Sms => "SMS",
            ContactMethod::Email => "Email",
        }
    }
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContactMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown contact method: {}", s))
    }
}

/// One attempt to reach a patient. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactLogEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub method: ContactMethod,
    #[serde(default)]
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewContactLog {
    pub patient_id: Uuid,
    #[serde(default)]
    pub method: ContactMethod,
    #[validate(custom = "non_blank")]
    pub notes: String,
}

impl NewContactLog {
    pub fn into_entry(self, id: Uuid, timestamp: DateTime<Utc>) -> ContactLogEntry {
        ContactLogEntry {
            id,
            patient_id: self.patient_id,
            method: self.method,
            notes: self.notes.trim().to_string(),
            timestamp,
        }
    }
}
