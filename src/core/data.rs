//! Normalization of loosely shaped store values at the ingestion boundary.
//!
//! Rows written by older clients carry a preferred time as a bare string, a
//! JSON-encoded array inside a string, or a real array; unset enum fields are
//! stored as `""`; the existing-patient flag is sometimes `0`/`1`. Everything
//! is folded into one canonical shape here so the rest of the crate never sees
//! the difference.

use std::collections::BTreeSet;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Folds null, `""`, a scalar, a JSON-array string or an array into a set.
pub fn normalize_set<T>(raw: Value) -> Result<BTreeSet<T>, serde_json::Error>
where
    T: DeserializeOwned + Ord,
{
    match raw {
        Value::Null => Ok(BTreeSet::new()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(BTreeSet::new())
            } else if trimmed.starts_with('[') {
                let items: Vec<T> = serde_json::from_str(trimmed)?;
                Ok(items.into_iter().collect())
            } else {
                let item = serde_json::from_value(Value::String(trimmed.to_string()))?;
                Ok(BTreeSet::from([item]))
            }
        }
        Value::Array(items) => items.into_iter().map(serde_json::from_value).collect(),
        other => Ok(BTreeSet::from([serde_json::from_value(other)?])),
    }
}

pub fn set_from_loose<'de, D, T>(deserializer: D) -> Result<BTreeSet<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Ord,
{
    let raw = Value::deserialize(deserializer)?;
    normalize_set(raw).map_err(de::Error::custom)
}

/// Treats null and blank strings as unset.
pub fn normalize_optional<T>(raw: Value) -> Result<Option<T>, serde_json::Error>
where
    T: DeserializeOwned,
{
    match raw {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::Number(n) => match serde_json::from_value(Value::Number(n.clone())) {
            Ok(value) => Ok(Some(value)),
            // enum wire forms such as triage levels are numeric strings
            Err(_) => serde_json::from_value(Value::String(n.to_string())).map(Some),
        },
        other => serde_json::from_value(other).map(Some),
    }
}

pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    normalize_optional(raw).map_err(de::Error::custom)
}

/// Writes unset fields back as `""`, the form the preset snapshots use.
pub fn none_as_empty<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match value {
        Some(inner) => inner.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

pub fn flag_from_loose<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(flag) => Ok(flag),
        Value::Number(n) => Ok(n.as_i64().map_or(false, |v| v != 0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            other => Err(de::Error::custom(format!("invalid flag: {}", other))),
        },
        other => Err(de::Error::custom(format!("invalid flag: {}", other))),
    }
}

/// Blank free-text fields are stored as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PreferredTime, TriageLevel, Weekday};
    use serde_json::json;

    #[test]
    fn test_scalar_becomes_singleton() {
        let set: BTreeSet<PreferredTime> = normalize_set(json!("morning")).unwrap();
        assert_eq!(set, BTreeSet::from([PreferredTime::Morning]));
    }

    #[test]
    fn test_json_encoded_array_string() {
        let set: BTreeSet<PreferredTime> = normalize_set(json!("[\"morning\",\"afternoon\"]")).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_null_and_blank_are_empty() {
        let set: BTreeSet<Weekday> = normalize_set(Value::Null).unwrap();
        assert!(set.is_empty());
        let set: BTreeSet<Weekday> = normalize_set(json!("  ")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_array_with_duplicates_collapses() {
        let set: BTreeSet<Weekday> = normalize_set(json!(["Monday", "Monday", "Friday"])).unwrap();
        assert_eq!(set, BTreeSet::from([Weekday::Monday, Weekday::Friday]));
    }

    #[test]
    fn test_unknown_member_is_an_error() {
        assert!(normalize_set::<Weekday>(json!(["Funday"])).is_err());
    }

    #[test]
    fn test_optional_accepts_numeric_level() {
        let level: Option<TriageLevel> = normalize_optional(json!(2)).unwrap();
        assert_eq!(level, Some(TriageLevel::Urgent));
        let level: Option<TriageLevel> = normalize_optional(json!("")).unwrap();
        assert_eq!(level, None);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" Room 2 ".into())), Some("Room 2".into()));
        assert_eq!(non_empty(None), None);
    }
}
