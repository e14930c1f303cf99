//! Appointment lifecycle: scheduling, completion, cancellation and the views
//! the dashboards read.
//!
//! ```text
//!              schedule()
//!                  │
//!                  ▼
//!            ┌───────────┐   complete()   ┌───────────┐
//!            │ scheduled │ ─────────────▶ │ completed │
//!            └───────────┘                └───────────┘
//!                  │
//!                  │ cancel()             ┌───────────┐
//!                  └────────────────────▶ │ cancelled │
//!                                         └───────────┘
//! ```
//!
//! Every mutation rebuilds the whole collection in memory and writes it back
//! under [`APPOINTMENTS_KEY`]. A rejected operation leaves the collection
//! untouched.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{ClinicError, ClinicResult, ValidationErrors};
use crate::models::{
    new_appointment_id, Appointment, AppointmentStatus, Upload, DEFAULT_MAX_ATTACHMENT_BYTES,
};
use crate::store::{self, Persisted, Store, APPOINTMENTS_KEY};

/// Fields submitted by the scheduling form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAppointment {
    /// Not checked against the patient registry
    pub patient_id: String,
    pub title: String,
    pub description: String,
    pub comments: String,
    /// `YYYY-MM-DD`
    pub appointment_date: String,
}

/// Fields submitted by the completion form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub treatment: String,
    pub cost: f64,
    /// Follow-up date, `YYYY-MM-DD`
    pub next_date: Option<String>,
    pub post_visit_notes: Option<String>,
    pub medications_prescribed: Option<String>,
    pub files: Vec<Upload>,
}

/// A patient's appointments split the way the patient dashboard shows them.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientHistory {
    /// Still scheduled, soonest first
    pub upcoming: Vec<Appointment>,
    /// Completed, most recent first
    pub past: Vec<Appointment>,
}

/// The appointment collection and the store it is persisted to.
pub struct AppointmentBook {
    store: Arc<dyn Store>,
    appointments: Vec<Appointment>,
    max_attachment_bytes: u64,
}

impl AppointmentBook {
    /// Load the collection from the store (empty if missing or malformed).
    pub fn load(store: Arc<dyn Store>) -> Self {
        let appointments = store::load(&*store, APPOINTMENTS_KEY);
        Self {
            store,
            appointments,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }

    /// Override the per-file upload cap.
    pub fn with_max_attachment_bytes(mut self, limit: u64) -> Self {
        self.max_attachment_bytes = limit;
        self
    }

    pub fn max_attachment_bytes(&self) -> u64 {
        self.max_attachment_bytes
    }

    /// Book a new appointment in the `scheduled` state.
    pub fn schedule(&mut self, input: NewAppointment) -> ClinicResult<Persisted<Appointment>> {
        let mut errors = ValidationErrors::new();
        errors.require("title", "Title", &input.title);
        errors.require("description", "Description", &input.description);
        errors.require("comments", "Comment", &input.comments);
        let date =
            errors.require_date("appointmentDate", "Appointment date", &input.appointment_date);
        let (Some(date), true) = (date, errors.is_empty()) else {
            return Err(ClinicError::Validation(errors));
        };

        let mut appointment = Appointment::new(
            input.patient_id.trim().to_string(),
            input.title.trim().to_string(),
            input.description.trim().to_string(),
            input.comments.trim().to_string(),
            date,
        );
        while self.appointments.iter().any(|a| a.id == appointment.id) {
            appointment.id = new_appointment_id();
        }

        let mut next = self.appointments.clone();
        next.push(appointment.clone());
        tracing::info!(
            appointment_id = %appointment.id,
            patient_id = %appointment.patient_id,
            date = %appointment.appointment_date,
            "appointment scheduled"
        );
        Ok(self.commit(next, appointment))
    }

    /// Record the outcome of a visit.
    ///
    /// Checks run in order: the appointment must exist and still be
    /// scheduled, the form must be valid, and every upload must fit under the
    /// size cap. Only then are files converted and the record merged; the
    /// scheduling fields are never overwritten.
    pub fn complete(
        &mut self,
        id: &str,
        completion: Completion,
    ) -> ClinicResult<Persisted<Appointment>> {
        let current = self.scheduled(id)?.clone();

        let mut errors = ValidationErrors::new();
        errors.require("treatment", "Treatment", &completion.treatment);
        if !completion.cost.is_finite() {
            errors.push("cost", "Cost must be a number");
        } else if completion.cost < 0.0 {
            errors.push("cost", "Cost must not be negative");
        }
        let next_date = match completion.next_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => errors.require_date("nextDate", "Next date", raw),
            _ => None,
        };
        errors.into_result()?;

        if let Some(file) = completion.files.iter().find(|f| f.size() > self.max_attachment_bytes) {
            tracing::warn!(
                appointment_id = %id,
                file = %file.name,
                size = file.size(),
                limit = self.max_attachment_bytes,
                "upload rejected"
            );
            return Err(ClinicError::FileTooLarge {
                name: file.name.clone(),
                size: file.size(),
                limit: self.max_attachment_bytes,
            });
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut completed = current;
        completed.status = AppointmentStatus::Completed;
        completed.treatment = Some(completion.treatment.trim().to_string());
        completed.cost = Some(completion.cost);
        completed.next_date = next_date;
        completed.post_visit_notes = trimmed(completion.post_visit_notes);
        completed.medications_prescribed = trimmed(completion.medications_prescribed);
        completed
            .files
            .extend(completion.files.iter().map(Upload::to_attachment));
        completed.completed_at = Some(now.clone());
        completed.updated_at = Some(now);

        let next = self.replaced(&completed);
        tracing::info!(
            appointment_id = %id,
            cost = completion.cost,
            files = completion.files.len(),
            "appointment completed"
        );
        Ok(self.commit(next, completed))
    }

    /// Call off a scheduled appointment.
    pub fn cancel(
        &mut self,
        id: &str,
        reason: Option<String>,
    ) -> ClinicResult<Persisted<Appointment>> {
        let mut cancelled = self.scheduled(id)?.clone();
        cancelled.status = AppointmentStatus::Cancelled;
        cancelled.cancellation_reason = trimmed(reason);
        cancelled.cancelled_at = Some(chrono::Utc::now().to_rfc3339());
        cancelled.touch();

        let next = self.replaced(&cancelled);
        tracing::info!(appointment_id = %id, "appointment cancelled");
        Ok(self.commit(next, cancelled))
    }

    pub fn list(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn list_by_status(&self, status: AppointmentStatus) -> Vec<&Appointment> {
        self.appointments.iter().filter(|a| a.status == status).collect()
    }

    pub fn list_by_patient(&self, patient_id: &str) -> Vec<&Appointment> {
        self.appointments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .collect()
    }

    /// Every scheduled appointment, regardless of date. Past-dated visits
    /// that were never completed still count.
    pub fn list_upcoming(&self) -> Vec<&Appointment> {
        self.list_by_status(AppointmentStatus::Scheduled)
    }

    /// Scheduled appointments on or after `from`, soonest first.
    pub fn list_upcoming_from(&self, from: NaiveDate) -> Vec<&Appointment> {
        let mut upcoming: Vec<&Appointment> = self
            .list_upcoming()
            .into_iter()
            .filter(|a| a.appointment_date >= from)
            .collect();
        upcoming.sort_by_key(|a| a.appointment_date);
        upcoming
    }

    /// Appointments of any status falling on `day` (calendar view).
    pub fn list_on(&self, day: NaiveDate) -> Vec<&Appointment> {
        self.appointments
            .iter()
            .filter(|a| a.appointment_date == day)
            .collect()
    }

    /// Upcoming and past visits for one patient.
    pub fn history_for_patient(&self, patient_id: &str) -> PatientHistory {
        let mine = self.list_by_patient(patient_id);

        let mut upcoming: Vec<Appointment> = mine
            .iter()
            .filter(|a| a.is_scheduled())
            .map(|a| (*a).clone())
            .collect();
        upcoming.sort_by_key(|a| a.appointment_date);

        let mut past: Vec<Appointment> = mine
            .iter()
            .filter(|a| a.is_completed())
            .map(|a| (*a).clone())
            .collect();
        past.sort_by(|a, b| b.appointment_date.cmp(&a.appointment_date));

        PatientHistory { upcoming, past }
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    /// The appointment with `id`, provided it can still transition.
    fn scheduled(&self, id: &str) -> ClinicResult<&Appointment> {
        self.appointments
            .iter()
            .find(|a| a.id == id && a.is_scheduled())
            .ok_or_else(|| ClinicError::appointment_not_found(id))
    }

    /// The collection with `updated` substituted for the record sharing its id.
    fn replaced(&self, updated: &Appointment) -> Vec<Appointment> {
        self.appointments
            .iter()
            .map(|a| if a.id == updated.id { updated.clone() } else { a.clone() })
            .collect()
    }

    /// Adopt `next` as the collection and write it out whole.
    fn commit<T>(&mut self, next: Vec<Appointment>, value: T) -> Persisted<T> {
        self.appointments = next;
        let result = store::save(self.store.as_ref(), APPOINTMENTS_KEY, &self.appointments);
        Persisted::from_save(value, APPOINTMENTS_KEY, result)
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
