use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use hellomolar::auth::{StaffUser, StaticAuth};
use hellomolar::core::PatientStatus;
use hellomolar::db::{ClinicStore, MemoryStore};
use hellomolar::models::{
    AppointmentFilter, ContactMethod, Dentist, EmergencyIntake, NewContactLog, NewRegisteredPatient,
    PreferredTime, QueueFilter, StatusFilter, TriageLevel, Weekday,
};
use hellomolar::{Clinic, ClinicError};

fn front_desk(store: Arc<dyn ClinicStore>) -> Clinic {
    let auth = StaticAuth::signed_in(StaffUser {
        id: Uuid::new_v4(),
        email: Some("reception@hellomolar.example".into()),
    });
    Clinic::new(store, Arc::new(auth))
}

fn intake(user_id: Uuid, name: &str, severity: (u8, u8, u8), time: PreferredTime) -> EmergencyIntake {
    let (pain, symptom, systemic) = severity;
    EmergencyIntake {
        user_id,
        name: name.into(),
        phone: "+34 611 000 000".into(),
        reason: "Severe toothache".into(),
        preferred_time: BTreeSet::from([time]),
        availability: BTreeSet::from([Weekday::Monday, Weekday::Tuesday]),
        preferred_dentist: Some(Dentist::Dominique),
        existing_patient: true,
        pain,
        symptom,
        systemic,
    }
}

async fn run_emergency_day(clinic: Clinic) {
    let registered = clinic
        .register_patient(NewRegisteredPatient {
            full_name: "Nora Sáez".into(),
            phone_number: "+34 611 000 000".into(),
            email: Some("nora@example.com".into()),
        })
        .await
        .unwrap();

    let critical = clinic
        .admit(intake(registered.id, "Nora Sáez", (2, 3, 2), PreferredTime::Morning))
        .await
        .unwrap();
    let routine = clinic
        .admit(intake(registered.id, "Nora Sáez", (0, 0, 0), PreferredTime::Afternoon))
        .await
        .unwrap();
    assert_eq!(critical.triage_level(), TriageLevel::Critical);
    assert_eq!(routine.triage_score(), 1);
    assert_eq!(routine.triage_level(), TriageLevel::Routine);

    // first contact moves the patient to waiting
    clinic
        .log_contact(NewContactLog {
            patient_id: critical.id,
            method: ContactMethod::Sms,
            notes: "Sent available slots".into(),
        })
        .await
        .unwrap();
    assert_eq!(clinic.status_of(critical.id).await.unwrap(), PatientStatus::Waiting);
    assert_eq!(clinic.status_of(routine.id).await.unwrap(), PatientStatus::Untouched);

    let mornings = QueueFilter::default().with_preferred_time(PreferredTime::Morning);
    let preset = clinic.save_preset("Morning emergencies", mornings.clone()).await.unwrap();
    let loaded = clinic.load_preset(preset.id).await.unwrap();
    let rows = clinic.queue(&loaded).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].patient.id, critical.id);
    assert_eq!(rows[0].attempts, 1);
    assert_eq!(rows[0].preferred_time_display(), "Morning");

    let at = Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap();
    let booked = clinic
        .book_emergency(critical.id, at, Some("Room 2".into()), None)
        .await
        .unwrap();
    assert_eq!(booked.patient_id, registered.id);
    assert_eq!(clinic.status_of(critical.id).await.unwrap(), PatientStatus::Scheduled);

    let scheduled = clinic
        .queue(&QueueFilter::default().with_status(StatusFilter::Scheduled))
        .await
        .unwrap();
    assert_eq!(scheduled.len(), 1);

    let overview = clinic
        .appointments(&AppointmentFilter {
            patient_id: None,
            date: Some(at.date_naive()),
        })
        .await
        .unwrap();
    assert_eq!(overview, vec![booked]);

    let rejected = clinic.discharge(routine.id).await;
    assert!(matches!(rejected, Err(ClinicError::InvalidTransition { .. })));

    clinic.discharge(critical.id).await.unwrap();
    let remaining: Vec<_> = clinic.patients().await.unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(remaining, vec![routine.id]);
    assert_eq!(clinic.archived_patients().await.unwrap()[0].id, critical.id);
}

#[tokio::test]
async fn test_emergency_day_in_memory() {
    run_emergency_day(front_desk(Arc::new(MemoryStore::new()))).await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_emergency_day_on_sqlite() {
    let store = hellomolar::db::SqliteStore::in_memory().await.unwrap();
    run_emergency_day(front_desk(Arc::new(store))).await;
}

#[tokio::test]
async fn test_signed_out_staff_cannot_save_presets() {
    let clinic = Clinic::new(Arc::new(MemoryStore::new()), Arc::new(StaticAuth::anonymous()));
    let err = clinic.save_preset("Mine", QueueFilter::default()).await.unwrap_err();
    assert_eq!(err.to_string(), "you must be signed in to save presets");
}
