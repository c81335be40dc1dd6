use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::data::{empty_as_none, none_as_empty, set_from_loose};
use crate::models::patient::{Dentist, PreferredTime, Weekday};
use crate::models::triage::TriageLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Waiting,
    Scheduled,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::Waiting => "waiting",
            StatusFilter::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "waiting" => Ok(StatusFilter::Waiting),
            "scheduled" => Ok(StatusFilter::Scheduled),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Filter fields for the emergency queue. Empty sets and `None` match everything.
///
/// Serialized with the camelCase keys and `""`-for-unset convention of saved
/// preset snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueFilter {
    #[serde(deserialize_with = "set_from_loose")]
    pub preferred_time: BTreeSet<PreferredTime>,
    #[serde(deserialize_with = "set_from_loose")]
    pub availability: BTreeSet<Weekday>,
    #[serde(deserialize_with = "empty_as_none", serialize_with = "none_as_empty")]
    pub status: Option<StatusFilter>,
    #[serde(deserialize_with = "empty_as_none", serialize_with = "none_as_empty")]
    pub triage_level: Option<TriageLevel>,
    #[serde(deserialize_with = "empty_as_none", serialize_with = "none_as_empty")]
    pub preferred_dentist: Option<Dentist>,
}

impl QueueFilter {
    pub fn is_empty(&self) -> bool {
        self == &QueueFilter::default()
    }

    pub fn with_preferred_time(mut self, time: PreferredTime) -> Self {
        self.preferred_time.insert(time);
        self
    }

    pub fn with_availability(mut self, day: Weekday) -> Self {
        self.availability.insert(day);
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_triage_level(mut self, level: TriageLevel) -> Self {
        self.triage_level = Some(level);
        self
    }

    pub fn with_dentist(mut self, dentist: Dentist) -> Self {
        self.preferred_dentist = Some(dentist);
        self
    }
}

/// A named snapshot of filter values owned by one staff user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub filters: QueueFilter,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_with_scalar_fields_is_normalized() {
        let filter: QueueFilter = serde_json::from_value(json!({
            "preferredTime": "afternoon",
            "availability": "Wednesday",
            "status": "",
            "triageLevel": "2"
        }))
        .unwrap();

        assert_eq!(filter.preferred_time, BTreeSet::from([PreferredTime::Afternoon]));
        assert_eq!(filter.availability, BTreeSet::from([Weekday::Wednesday]));
        assert_eq!(filter.status, None);
        assert_eq!(filter.triage_level, Some(TriageLevel::Urgent));
        assert_eq!(filter.preferred_dentist, None);
    }

    #[test]
    fn test_missing_snapshot_is_empty_filter() {
        let filter: QueueFilter = serde_json::from_value(json!({})).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_unset_fields_serialize_as_empty_strings() {
        let filter = QueueFilter::default().with_status(StatusFilter::Waiting);
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            value,
            json!({
                "preferredTime": [],
                "availability": [],
                "status": "waiting",
                "triageLevel": "",
                "preferredDentist": ""
            })
        );
        let back: QueueFilter = serde_json::from_value(value).unwrap();
        assert_eq!(back, filter);
    }
}
