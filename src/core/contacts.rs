//! Grouping of contact attempts by patient for the queue view.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::core::queue::ContactIndex;
use crate::models::ContactLogEntry;

/// Attempt counts and histories keyed by patient.
///
/// Patients without entries are absent from both maps; `attempts` and
/// `history` read an absent patient as zero attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSummary {
    counts: HashMap<Uuid, usize>,
    histories: HashMap<Uuid, Vec<ContactLogEntry>>,
}

impl ContactSummary {
    /// Histories keep input order; nothing is re-sorted by time.
    pub fn aggregate<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a ContactLogEntry>,
    {
        let mut summary = ContactSummary::default();
        for entry in entries {
            *summary.counts.entry(entry.patient_id).or_insert(0) += 1;
            summary
                .histories
                .entry(entry.patient_id)
                .or_default()
                .push(entry.clone());
        }
        summary
    }

    pub fn counts(&self) -> &HashMap<Uuid, usize> {
        &self.counts
    }

    pub fn histories(&self) -> &HashMap<Uuid, Vec<ContactLogEntry>> {
        &self.histories
    }

    pub fn attempts(&self, patient_id: &Uuid) -> usize {
        self.counts.get(patient_id).copied().unwrap_or(0)
    }

    pub fn history(&self, patient_id: &Uuid) -> &[ContactLogEntry] {
        self.histories
            .get(patient_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contacted(&self) -> HashSet<Uuid> {
        self.counts.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl ContactIndex for ContactSummary {
    fn has_contact(&self, patient_id: &Uuid) -> bool {
        self.attempts(patient_id) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContactMethod;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(patient_id: Uuid, minutes: i64, method: ContactMethod) -> ContactLogEntry {
        ContactLogEntry {
            id: Uuid::new_v4(),
            patient_id,
            method,
            notes: format!("attempt at +{}m", minutes),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_counts_and_histories() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        // deliberately out of time order
        let logs = vec![
            entry(a, 30, ContactMethod::Phone),
            entry(a, 10, ContactMethod::Sms),
            entry(a, 20, ContactMethod::WhatsApp),
        ];

        let summary = ContactSummary::aggregate(&logs);

        assert_eq!(summary.counts().len(), 1);
        assert_eq!(summary.counts().get(&a), Some(&3));
        assert!(!summary.counts().contains_key(&b));
        assert!(!summary.histories().contains_key(&b));
        assert_eq!(summary.history(&a), logs.as_slice());
        assert_eq!(summary.attempts(&b), 0);
        assert!(summary.history(&b).is_empty());
    }

    #[test]
    fn test_interleaved_patients_keep_their_own_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let logs = vec![
            entry(a, 1, ContactMethod::Phone),
            entry(b, 2, ContactMethod::Email),
            entry(a, 3, ContactMethod::Email),
        ];

        let summary = ContactSummary::aggregate(&logs);

        let methods: Vec<_> = summary.history(&a).iter().map(|e| e.method).collect();
        assert_eq!(methods, vec![ContactMethod::Phone, ContactMethod::Email]);
        assert_eq!(summary.attempts(&b), 1);
        assert_eq!(summary.contacted(), HashSet::from([a, b]));
        assert!(summary.has_contact(&b));
    }

    #[test]
    fn test_empty_input() {
        let summary = ContactSummary::aggregate(Vec::<ContactLogEntry>::new().iter());
        assert!(summary.is_empty());
        assert!(summary.contacted().is_empty());
    }
}
