//! Appointment overview filtering and registered-patient lookup.

use crate::models::{Appointment, AppointmentFilter, RegisteredPatient};

pub fn appointment_matches(appointment: &Appointment, filter: &AppointmentFilter) -> bool {
    let patient_ok = filter
        .patient_id
        .map_or(true, |id| appointment.patient_id == id);
    let date_ok = filter
        .date
        .map_or(true, |date| appointment.appointment_time.date_naive() == date);
    patient_ok && date_ok
}

pub fn filter_appointments<'a>(appointments: &'a [Appointment], filter: &AppointmentFilter) -> Vec<&'a Appointment> {
    appointments
        .iter()
        .filter(|appointment| appointment_matches(appointment, filter))
        .collect()
}

/// Case-insensitive substring search on full name. An empty query returns everyone.
pub fn search_registered<'a>(patients: &'a [RegisteredPatient], query: &str) -> Vec<&'a RegisteredPatient> {
    if query.is_empty() {
        return patients.iter().collect();
    }
    let needle = query.to_lowercase();
    patients
        .iter()
        .filter(|patient| patient.full_name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn appointment(patient_id: Uuid, day: u32, hour: u32) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            appointment_time: Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap(),
            location: None,
            notes: None,
        }
    }

    #[test]
    fn test_filter_by_patient_and_date() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let appointments = vec![appointment(a, 3, 9), appointment(b, 3, 23), appointment(a, 4, 0)];

        let all = filter_appointments(&appointments, &AppointmentFilter::default());
        assert_eq!(all.len(), 3);

        let by_patient = AppointmentFilter { patient_id: Some(a), date: None };
        assert_eq!(filter_appointments(&appointments, &by_patient).len(), 2);

        let by_date = AppointmentFilter {
            patient_id: None,
            date: NaiveDate::from_ymd_opt(2024, 6, 3),
        };
        let ids: Vec<_> = filter_appointments(&appointments, &by_date).iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![appointments[0].id, appointments[1].id]);

        let both = AppointmentFilter {
            patient_id: Some(a),
            date: NaiveDate::from_ymd_opt(2024, 6, 4),
        };
        assert_eq!(filter_appointments(&appointments, &both)[0].id, appointments[2].id);
    }

    #[test]
    fn test_search_registered_is_case_insensitive() {
        let patients = vec![
            RegisteredPatient {
                id: Uuid::new_v4(),
                full_name: "Elena García".into(),
                phone_number: "1".into(),
                email: None,
            },
            RegisteredPatient {
                id: Uuid::new_v4(),
                full_name: "Mark Elsen".into(),
                phone_number: "2".into(),
                email: None,
            },
        ];

        assert_eq!(search_registered(&patients, "").len(), 2);
        assert_eq!(search_registered(&patients, "EL").len(), 2);
        assert_eq!(search_registered(&patients, "garc")[0].full_name, "Elena García");
        assert!(search_registered(&patients, "zz").is_empty());
    }
}
