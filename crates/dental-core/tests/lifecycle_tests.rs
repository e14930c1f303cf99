//! Appointment lifecycle integration tests.

use std::sync::Arc;

use dental_core::store::{self, MemoryStore, Store, APPOINTMENTS_KEY};
use dental_core::{
    Appointment, AppointmentStatus, Clinic, ClinicError, Completion, NewAppointment, NewPatient,
    Upload,
};

fn new_patient(name: &str, contact: &str) -> NewPatient {
    NewPatient {
        name: name.to_string(),
        dob: "1990-05-15".to_string(),
        contact: contact.to_string(),
        health_info: "None".to_string(),
        user_id: None,
    }
}

fn cleaning(patient_id: &str) -> NewAppointment {
    NewAppointment {
        patient_id: patient_id.to_string(),
        title: "Cleaning".to_string(),
        description: "Routine cleaning".to_string(),
        comments: "First visit".to_string(),
        appointment_date: "2025-01-10".to_string(),
    }
}

fn stored_appointments(store: &Arc<dyn Store>) -> Vec<Appointment> {
    store::load(&**store, APPOINTMENTS_KEY)
}

#[test]
fn test_schedule_then_complete_cleaning() {
    let mut clinic = Clinic::in_memory();

    let scheduled = clinic
        .appointments_mut()
        .schedule(cleaning("p1"))
        .unwrap()
        .into_value();
    let stored = stored_appointments(clinic.store());
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, AppointmentStatus::Scheduled);

    let completed = clinic
        .appointments_mut()
        .complete(
            &scheduled.id,
            Completion {
                treatment: "Cleaning done".to_string(),
                cost: 80.0,
                ..Default::default()
            },
        )
        .unwrap();
    assert!(completed.is_durable());

    let stored = stored_appointments(clinic.store());
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, scheduled.id);
    assert_eq!(stored[0].status, AppointmentStatus::Completed);
    assert_eq!(stored[0].cost, Some(80.0));
    assert_eq!(stored[0].title, "Cleaning");
    assert_eq!(stored[0].patient_id, "p1");
}

#[test]
fn test_oversized_upload_rejected_without_transition() {
    let mut clinic = Clinic::in_memory();
    let scheduled = clinic
        .appointments_mut()
        .schedule(cleaning("p1"))
        .unwrap()
        .into_value();

    let xray = Upload::new("xray.png", Some("image/png".to_string()), vec![0u8; 6 * 1024 * 1024]);
    let err = clinic
        .appointments_mut()
        .complete(
            &scheduled.id,
            Completion {
                treatment: "Cleaning done".to_string(),
                cost: 80.0,
                files: vec![xray],
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ClinicError::FileTooLarge { .. }));

    let stored = stored_appointments(clinic.store());
    assert_eq!(stored[0].status, AppointmentStatus::Scheduled);
    assert!(stored[0].files.is_empty());
    assert_eq!(clinic.appointments().find_by_id(&scheduled.id), Some(&scheduled));
}

#[test]
fn test_top_patient_by_appointment_count() {
    let mut clinic = Clinic::in_memory();
    let p1 = clinic
        .patients_mut()
        .create(new_patient("Harshit", "9999999999"))
        .unwrap()
        .into_value();
    let p2 = clinic
        .patients_mut()
        .create(new_patient("Arvind", "8888888888"))
        .unwrap()
        .into_value();

    for patient_id in [&p1.id, &p1.id, &p2.id] {
        clinic.appointments_mut().schedule(cleaning(patient_id)).unwrap();
    }

    let top = clinic.top_patients(1);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].patient.id, p1.id);
    assert_eq!(top[0].visits, 2);
}

#[test]
fn test_failed_completion_leaves_collection_unchanged() {
    let mut clinic = Clinic::in_memory();
    let scheduled = clinic
        .appointments_mut()
        .schedule(cleaning("p1"))
        .unwrap()
        .into_value();
    let done = Completion {
        treatment: "Cleaning done".to_string(),
        cost: 80.0,
        ..Default::default()
    };

    let missing = clinic.appointments_mut().complete("app_missing", done.clone()).unwrap_err();
    assert!(matches!(missing, ClinicError::NotFound { .. }));

    clinic.appointments_mut().complete(&scheduled.id, done.clone()).unwrap();
    let before = stored_appointments(clinic.store());

    let again = clinic.appointments_mut().complete(&scheduled.id, done).unwrap_err();
    assert!(matches!(again, ClinicError::NotFound { .. }));
    assert_eq!(stored_appointments(clinic.store()), before);
}

#[test]
fn test_cancelled_appointment_cannot_complete() {
    let mut clinic = Clinic::in_memory();
    let scheduled = clinic
        .appointments_mut()
        .schedule(cleaning("p1"))
        .unwrap()
        .into_value();

    let cancelled = clinic
        .appointments_mut()
        .cancel(&scheduled.id, Some("Patient unwell".to_string()))
        .unwrap()
        .into_value();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Patient unwell"));

    let err = clinic
        .appointments_mut()
        .complete(
            &scheduled.id,
            Completion {
                treatment: "Cleaning done".to_string(),
                cost: 80.0,
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ClinicError::NotFound { .. }));
    assert_eq!(clinic.stats().cancelled_count, 1);
    assert!(clinic.appointments().list_upcoming().is_empty());
}

#[test]
fn test_write_failure_keeps_completion_in_memory() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::with_quota(1024));
    let mut clinic = Clinic::with_store(store);
    let scheduled = clinic
        .appointments_mut()
        .schedule(cleaning("p1"))
        .unwrap()
        .into_value();

    let completed = clinic
        .appointments_mut()
        .complete(
            &scheduled.id,
            Completion {
                treatment: "Cleaning done".to_string(),
                cost: 80.0,
                post_visit_notes: Some("x".repeat(2048)),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(!completed.is_durable());

    // Memory moved on, the store did not.
    assert!(clinic.appointments().find_by_id(&scheduled.id).unwrap().is_completed());
    let stored = stored_appointments(clinic.store());
    assert_eq!(stored[0].status, AppointmentStatus::Scheduled);
}

#[test]
fn test_patient_history_and_dashboard_views() {
    let mut clinic = Clinic::in_memory();
    let p = clinic
        .patients_mut()
        .create(new_patient("Harshit", "9999999999"))
        .unwrap()
        .into_value();

    let mut first = cleaning(&p.id);
    first.appointment_date = "2025-01-10".to_string();
    let mut second = cleaning(&p.id);
    second.appointment_date = "2025-03-10".to_string();
    let mut third = cleaning(&p.id);
    third.appointment_date = "2025-02-10".to_string();

    let first = clinic.appointments_mut().schedule(first).unwrap().into_value();
    clinic.appointments_mut().schedule(second).unwrap();
    clinic.appointments_mut().schedule(third).unwrap();
    clinic
        .appointments_mut()
        .complete(
            &first.id,
            Completion {
                treatment: "Scaling".to_string(),
                cost: 120.0,
                next_date: Some("2025-07-10".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    let history = clinic.appointments().history_for_patient(&p.id);
    assert_eq!(history.past.len(), 1);
    let upcoming_dates: Vec<String> = history
        .upcoming
        .iter()
        .map(|a| a.appointment_date.to_string())
        .collect();
    assert_eq!(upcoming_dates, vec!["2025-02-10", "2025-03-10"]);

    let stats = clinic.stats();
    assert_eq!(stats.total_patients, 1);
    assert_eq!(stats.completed_count, 1);
    assert_eq!(stats.scheduled_count, 2);
    assert_eq!(stats.total_revenue, 120.0);

    let found = clinic.patients().search("harsh");
    assert_eq!(found.len(), 1);
    assert_eq!(clinic.revenue_by_month()[0].month, "2025-01");
}
