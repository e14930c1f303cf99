//! Patient registry: CRUD over the `patients` collection.

use std::sync::Arc;

use crate::error::{ClinicError, ClinicResult, ValidationErrors};
use crate::models::Patient;
use crate::store::{self, Persisted, Store, PATIENTS_KEY};

/// Fields for a new patient, as submitted by the add-patient form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPatient {
    pub name: String,
    /// `YYYY-MM-DD`
    pub dob: String,
    pub contact: String,
    pub health_info: String,
    /// Set when an account registers its own profile
    pub user_id: Option<String>,
}

/// Partial edit. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub contact: Option<String>,
    pub health_info: Option<String>,
}

/// The patient collection and the store it is persisted to.
pub struct PatientRegistry {
    store: Arc<dyn Store>,
    patients: Vec<Patient>,
}

impl PatientRegistry {
    /// Load the collection from the store (empty if missing or malformed).
    pub fn load(store: Arc<dyn Store>) -> Self {
        let patients = store::load(&*store, PATIENTS_KEY);
        Self { store, patients }
    }

    /// Validate and add a patient.
    pub fn create(&mut self, input: NewPatient) -> ClinicResult<Persisted<Patient>> {
        let mut errors = ValidationErrors::new();
        errors.require("name", "Name", &input.name);
        let dob = errors.require_date("dob", "Date of birth", &input.dob);
        errors.require("contact", "Contact", &input.contact);
        errors.require("healthInfo", "Health information", &input.health_info);
        let (Some(dob), true) = (dob, errors.is_empty()) else {
            return Err(ClinicError::Validation(errors));
        };

        let mut patient = Patient::new(
            input.name.trim().to_string(),
            dob,
            input.contact.trim().to_string(),
            input.health_info.trim().to_string(),
        );
        patient.user_id = input.user_id.filter(|u| !u.trim().is_empty());

        // UUIDv7 collisions need two IDs in the same millisecond with equal
        // random bits; regenerate rather than break uniqueness.
        while self.contains(&patient.id) {
            patient.id = crate::models::new_patient_id();
        }

        let mut next = self.patients.clone();
        next.push(patient.clone());
        tracing::info!(patient_id = %patient.id, "patient created");
        Ok(self.commit(next, patient))
    }

    /// Merge `update` over the patient with `id`.
    pub fn update(&mut self, id: &str, update: PatientUpdate) -> ClinicResult<Persisted<Patient>> {
        let current = self
            .find_by_id(id)
            .cloned()
            .ok_or_else(|| ClinicError::patient_not_found(id))?;

        let mut errors = ValidationErrors::new();
        let mut merged = current;
        if let Some(name) = update.name {
            errors.require("name", "Name", &name);
            merged.name = name.trim().to_string();
        }
        if let Some(dob) = update.dob {
            if let Some(date) = errors.require_date("dob", "Date of birth", &dob) {
                merged.dob = date;
            }
        }
        if let Some(contact) = update.contact {
            errors.require("contact", "Contact", &contact);
            merged.contact = contact.trim().to_string();
        }
        if let Some(health_info) = update.health_info {
            errors.require("healthInfo", "Health information", &health_info);
            merged.health_info = health_info.trim().to_string();
        }
        errors.into_result()?;
        merged.touch();

        let next = self
            .patients
            .iter()
            .map(|p| if p.id == id { merged.clone() } else { p.clone() })
            .collect();
        tracing::info!(patient_id = %id, "patient updated");
        Ok(self.commit(next, merged))
    }

    /// Remove the patient with `id`. Returns whether anything was removed;
    /// an unknown id is not an error. Appointments referencing the patient
    /// are left alone.
    pub fn delete(&mut self, id: &str) -> Persisted<bool> {
        let next: Vec<Patient> = self.patients.iter().filter(|p| p.id != id).cloned().collect();
        let removed = next.len() != self.patients.len();
        if removed {
            tracing::info!(patient_id = %id, "patient deleted");
        } else {
            tracing::debug!(patient_id = %id, "delete of unknown patient ignored");
        }
        self.commit(next, removed)
    }

    pub fn list(&self) -> &[Patient] {
        &self.patients
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    /// The profile registered by an account, if any.
    pub fn find_by_user_id(&self, user_id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.is_owned_by(user_id))
    }

    /// Case-insensitive match on name, plain substring match on contact.
    /// A blank term matches everyone.
    pub fn search(&self, term: &str) -> Vec<&Patient> {
        let term = term.trim();
        let needle = term.to_lowercase();
        self.patients
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle) || p.contact.contains(term))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    fn contains(&self, id: &str) -> bool {
        self.patients.iter().any(|p| p.id == id)
    }

    /// Adopt `next` as the collection and write it out whole.
    fn commit<T>(&mut self, next: Vec<Patient>, value: T) -> Persisted<T> {
        self.patients = next;
        let result = store::save(self.store.as_ref(), PATIENTS_KEY, &self.patients);
        Persisted::from_save(value, PATIENTS_KEY, result)
    }
}
