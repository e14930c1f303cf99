//! Dental Desk Core Library
//!
//! Local-first practice management: a patient registry, the appointment
//! lifecycle and the dashboard figures derived from them.
//!
//! # Architecture
//!
//! ```text
//!        Admin forms                       Patient dashboard
//!   (add patient, schedule,              (own profile, upcoming
//!    complete, cancel)                     and past visits)
//!            │                                   │
//!            └─────────────────┬─────────────────┘
//!                              │
//!                   ┌──────────▼──────────┐
//!                   │       Clinic        │
//!                   ├──────────┬──────────┤
//!                   │ Patient  │Appointment│
//!                   │ Registry │   Book    │
//!                   └────┬─────┴─────┬────┘
//!                        │           │   whole-collection
//!                        ▼           ▼   read-modify-write
//!                ┌──────────────────────────┐
//!                │  Store ("patients",      │
//!                │         "appointments")  │
//!                │  memory  │  sqlite       │
//!                └──────────────────────────┘
//!                              │
//!             ┌────────────────┼────────────────┐
//!             ▼                ▼                ▼
//!        Practice stats   Top patients     Billing export
//! ```
//!
//! # Core Principle
//!
//! **Storage failures never lose the in-memory change.** A failed write is
//! returned alongside the updated record as a warning, never as an error.
//!
//! # Modules
//!
//! - [`store`]: Key-value persistence (in-memory and SQLite backends)
//! - [`models`]: Domain types (Patient, Appointment, Attachment)
//! - [`registry`]: Patient CRUD and search
//! - [`appointments`]: Scheduling, completion and cancellation
//! - [`stats`]: Dashboard aggregates
//! - [`export`]: Billing export
//! - [`clinic`]: The above wired to one store
//! - [`config`]: TOML configuration

pub mod appointments;
pub mod clinic;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod registry;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use appointments::{AppointmentBook, Completion, NewAppointment, PatientHistory};
pub use clinic::Clinic;
pub use config::{ConfigError, CoreConfig, StorageBackend};
pub use error::{ClinicError, ClinicResult, ValidationErrors};
pub use models::{Appointment, AppointmentStatus, Attachment, Patient, Upload};
pub use registry::{NewPatient, PatientRegistry, PatientUpdate};
pub use stats::{MonthlyRevenue, PatientVisits, PracticeStats};
pub use store::{MemoryStore, Persisted, SqliteStore, Store, StoreError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DentalError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ClinicError> for DentalError {
    fn from(e: ClinicError) -> Self {
        match e {
            ClinicError::Validation(errors) => DentalError::Validation(errors.to_string()),
            e @ ClinicError::NotFound { .. } => DentalError::NotFound(e.to_string()),
            e @ ClinicError::FileTooLarge { .. } => DentalError::FileTooLarge(e.to_string()),
            ClinicError::Storage(e) => e.into(),
        }
    }
}

impl From<StoreError> for DentalError {
    fn from(e: StoreError) -> Self {
        DentalError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for DentalError {
    fn from(e: serde_json::Error) -> Self {
        DentalError::Serialization(e.to_string())
    }
}

impl From<ConfigError> for DentalError {
    fn from(e: ConfigError) -> Self {
        DentalError::Config(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DentalError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        DentalError::Storage(format!("Lock poisoned: {}", e))
    }
}

/// Counts cross the FFI boundary as `u32`; larger values saturate.
fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, DentalError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DentalError::Validation(format!("{}: must be a date (YYYY-MM-DD)", field)))
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the store described by a TOML configuration file.
#[uniffi::export]
pub fn open_core(config_path: String) -> Result<Arc<DentalCore>, DentalError> {
    let config = CoreConfig::load(&config_path)?;
    Ok(DentalCore::new(Clinic::open(&config)?))
}

/// Open or create a SQLite-backed store at the given path.
#[uniffi::export]
pub fn open_core_at(db_path: String) -> Result<Arc<DentalCore>, DentalError> {
    let config = CoreConfig::sqlite(db_path);
    Ok(DentalCore::new(Clinic::open(&config)?))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_core_in_memory() -> Arc<DentalCore> {
    DentalCore::new(Clinic::in_memory())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe clinic wrapper for FFI.
#[derive(uniffi::Object)]
pub struct DentalCore {
    clinic: Arc<Mutex<Clinic>>,
    last_warning: Mutex<Option<String>>,
}

impl DentalCore {
    fn new(clinic: Clinic) -> Arc<Self> {
        Arc::new(Self {
            clinic: Arc::new(Mutex::new(clinic)),
            last_warning: Mutex::new(None),
        })
    }

    /// Unwrap a mutation result, remembering a failed write for the UI.
    fn settle<T>(&self, persisted: Persisted<T>) -> Result<T, DentalError> {
        if let Some(warning) = &persisted.warning {
            *self.last_warning.lock()? = Some(warning.to_string());
        }
        Ok(persisted.into_value())
    }
}

#[uniffi::export]
impl DentalCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a new patient.
    pub fn create_patient(&self, input: FfiNewPatient) -> Result<FfiPatient, DentalError> {
        let mut clinic = self.clinic.lock()?;
        let created = clinic.patients_mut().create(input.into())?;
        Ok(self.settle(created)?.into())
    }

    /// Edit an existing patient. Absent fields keep their value.
    pub fn update_patient(
        &self,
        id: String,
        update: FfiPatientUpdate,
    ) -> Result<FfiPatient, DentalError> {
        let mut clinic = self.clinic.lock()?;
        let updated = clinic.patients_mut().update(&id, update.into())?;
        Ok(self.settle(updated)?.into())
    }

    /// Delete a patient. Returns false if no patient had that ID.
    pub fn delete_patient(&self, id: String) -> Result<bool, DentalError> {
        let mut clinic = self.clinic.lock()?;
        let deleted = clinic.patients_mut().delete(&id);
        self.settle(deleted)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: String) -> Result<Option<FfiPatient>, DentalError> {
        let clinic = self.clinic.lock()?;
        Ok(clinic.patients().find_by_id(&id).cloned().map(Into::into))
    }

    /// All patients, in registration order.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, DentalError> {
        let clinic = self.clinic.lock()?;
        Ok(clinic.patients().list().iter().cloned().map(Into::into).collect())
    }

    /// Search patients by name or contact.
    pub fn search_patients(&self, term: String) -> Result<Vec<FfiPatient>, DentalError> {
        let clinic = self.clinic.lock()?;
        Ok(clinic
            .patients()
            .search(&term)
            .into_iter()
            .cloned()
            .map(Into::into)
            .collect())
    }

    /// The profile registered by an account, if any.
    pub fn patient_for_user(&self, user_id: String) -> Result<Option<FfiPatient>, DentalError> {
        let clinic = self.clinic.lock()?;
        Ok(clinic.patients().find_by_user_id(&user_id).cloned().map(Into::into))
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// Book a visit.
    pub fn schedule_appointment(
        &self,
        input: FfiNewAppointment,
    ) -> Result<FfiAppointment, DentalError> {
        let mut clinic = self.clinic.lock()?;
        let scheduled = clinic.appointments_mut().schedule(input.into())?;
        Ok(self.settle(scheduled)?.into())
    }

    /// Record the outcome of a scheduled visit.
    pub fn complete_appointment(
        &self,
        id: String,
        completion: FfiCompletion,
    ) -> Result<FfiAppointment, DentalError> {
        let mut clinic = self.clinic.lock()?;
        let completed = clinic.appointments_mut().complete(&id, completion.into())?;
        Ok(self.settle(completed)?.into())
    }

    /// Call off a scheduled visit.
    pub fn cancel_appointment(
        &self,
        id: String,
        reason: Option<String>,
    ) -> Result<FfiAppointment, DentalError> {
        let mut clinic = self.clinic.lock()?;
        let cancelled = clinic.appointments_mut().cancel(&id, reason)?;
        Ok(self.settle(cancelled)?.into())
    }

    /// Get an appointment by ID.
    pub fn get_appointment(&self, id: String) -> Result<Option<FfiAppointment>, DentalError> {
        let clinic = self.clinic.lock()?;
        Ok(clinic.appointments().find_by_id(&id).cloned().map(Into::into))
    }

    /// Appointments, optionally filtered by status name.
    pub fn list_appointments(
        &self,
        status: Option<String>,
    ) -> Result<Vec<FfiAppointment>, DentalError> {
        let clinic = self.clinic.lock()?;
        let book = clinic.appointments();
        let appointments: Vec<&Appointment> = match status {
            Some(status) => {
                let status: AppointmentStatus = status.parse().map_err(DentalError::Validation)?;
                book.list_by_status(status)
            }
            None => book.list().iter().collect(),
        };
        Ok(appointments.into_iter().cloned().map(Into::into).collect())
    }

    /// Every appointment referencing a patient.
    pub fn list_for_patient(&self, patient_id: String) -> Result<Vec<FfiAppointment>, DentalError> {
        let clinic = self.clinic.lock()?;
        Ok(clinic
            .appointments()
            .list_by_patient(&patient_id)
            .into_iter()
            .cloned()
            .map(Into::into)
            .collect())
    }

    /// Scheduled appointments. With `from`, only those on or after that date,
    /// soonest first.
    pub fn upcoming_appointments(
        &self,
        from: Option<String>,
    ) -> Result<Vec<FfiAppointment>, DentalError> {
        let clinic = self.clinic.lock()?;
        let book = clinic.appointments();
        let upcoming = match from {
            Some(from) => book.list_upcoming_from(parse_date("from", &from)?),
            None => book.list_upcoming(),
        };
        Ok(upcoming.into_iter().cloned().map(Into::into).collect())
    }

    /// Appointments falling on one day (calendar view).
    pub fn appointments_on(&self, date: String) -> Result<Vec<FfiAppointment>, DentalError> {
        let day = parse_date("date", &date)?;
        let clinic = self.clinic.lock()?;
        Ok(clinic
            .appointments()
            .list_on(day)
            .into_iter()
            .cloned()
            .map(Into::into)
            .collect())
    }

    /// A patient's upcoming and past visits.
    pub fn patient_history(&self, patient_id: String) -> Result<FfiPatientHistory, DentalError> {
        let clinic = self.clinic.lock()?;
        Ok(clinic.appointments().history_for_patient(&patient_id).into())
    }

    // =========================================================================
    // Dashboard Operations
    // =========================================================================

    /// Headline practice figures.
    pub fn get_stats(&self) -> Result<FfiStats, DentalError> {
        let clinic = self.clinic.lock()?;
        Ok(clinic.stats().into())
    }

    /// Patients with the most appointments. Without `limit`, the configured
    /// dashboard length is used.
    pub fn top_patients(&self, limit: Option<u32>) -> Result<Vec<FfiPatientVisits>, DentalError> {
        let clinic = self.clinic.lock()?;
        let top = match limit {
            Some(n) => clinic.top_patients(usize::try_from(n).unwrap_or(usize::MAX)),
            None => clinic.dashboard_top_patients(),
        };
        Ok(top.into_iter().map(Into::into).collect())
    }

    /// Completed revenue per month.
    pub fn revenue_by_month(&self) -> Result<Vec<FfiMonthlyRevenue>, DentalError> {
        let clinic = self.clinic.lock()?;
        Ok(clinic.revenue_by_month().into_iter().map(Into::into).collect())
    }

    /// The last failed write, cleared once read.
    pub fn take_storage_warning(&self) -> Result<Option<String>, DentalError> {
        Ok(self.last_warning.lock()?.take())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export billing data as JSON.
    pub fn export_billing_json(&self) -> Result<String, DentalError> {
        let clinic = self.clinic.lock()?;
        let batch = clinic.billing().export_all();
        Ok(batch.to_json()?)
    }

    /// Export billing data as CSV.
    pub fn export_billing_csv(&self) -> Result<String, DentalError> {
        let clinic = self.clinic.lock()?;
        Ok(clinic.billing().export_all().to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub dob: String,
    /// Whole years as of today
    pub age: u32,
    pub contact: String,
    pub health_info: String,
    pub user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            age: patient.age_on(today),
            id: patient.id,
            name: patient.name,
            dob: patient.dob.to_string(),
            contact: patient.contact,
            health_info: patient.health_info,
            user_id: patient.user_id,
            created_at: patient.created_at,
            updated_at: patient.updated_at,
        }
    }
}

/// FFI-safe new patient form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPatient {
    pub name: String,
    pub dob: String,
    pub contact: String,
    pub health_info: String,
    pub user_id: Option<String>,
}

impl From<FfiNewPatient> for NewPatient {
    fn from(input: FfiNewPatient) -> Self {
        NewPatient {
            name: input.name,
            dob: input.dob,
            contact: input.contact,
            health_info: input.health_info,
            user_id: input.user_id,
        }
    }
}

/// FFI-safe patient edit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientUpdate {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub contact: Option<String>,
    pub health_info: Option<String>,
}

impl From<FfiPatientUpdate> for PatientUpdate {
    fn from(update: FfiPatientUpdate) -> Self {
        PatientUpdate {
            name: update.name,
            dob: update.dob,
            contact: update.contact,
            health_info: update.health_info,
        }
    }
}

/// FFI-safe scheduling form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewAppointment {
    pub patient_id: String,
    pub title: String,
    pub description: String,
    pub comments: String,
    pub appointment_date: String,
}

impl From<FfiNewAppointment> for NewAppointment {
    fn from(input: FfiNewAppointment) -> Self {
        NewAppointment {
            patient_id: input.patient_id,
            title: input.title,
            description: input.description,
            comments: input.comments,
            appointment_date: input.appointment_date,
        }
    }
}

/// FFI-safe uploaded file.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUpload {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl From<FfiUpload> for Upload {
    fn from(upload: FfiUpload) -> Self {
        Upload::new(upload.name, upload.mime_type, upload.bytes)
    }
}

/// FFI-safe completion form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCompletion {
    pub treatment: String,
    pub cost: f64,
    pub next_date: Option<String>,
    pub post_visit_notes: Option<String>,
    pub medications_prescribed: Option<String>,
    pub files: Vec<FfiUpload>,
}

impl From<FfiCompletion> for Completion {
    fn from(completion: FfiCompletion) -> Self {
        Completion {
            treatment: completion.treatment,
            cost: completion.cost,
            next_date: completion.next_date,
            post_visit_notes: completion.post_visit_notes,
            medications_prescribed: completion.medications_prescribed,
            files: completion.files.into_iter().map(Into::into).collect(),
        }
    }
}

/// FFI-safe stored attachment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAttachment {
    pub name: String,
    /// `data:<mime>;base64,<payload>`
    pub url: String,
}

impl From<Attachment> for FfiAttachment {
    fn from(attachment: Attachment) -> Self {
        Self {
            name: attachment.name,
            url: attachment.url,
        }
    }
}

/// FFI-safe appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: String,
    pub patient_id: String,
    pub title: String,
    pub description: String,
    pub comments: String,
    pub appointment_date: String,
    pub status: String,
    pub created_at: String,
    pub treatment: Option<String>,
    pub cost: Option<f64>,
    pub next_date: Option<String>,
    pub post_visit_notes: Option<String>,
    pub medications_prescribed: Option<String>,
    pub files: Vec<FfiAttachment>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub cancellation_reason: Option<String>,
}

impl From<Appointment> for FfiAppointment {
    fn from(apt: Appointment) -> Self {
        Self {
            id: apt.id,
            patient_id: apt.patient_id,
            title: apt.title,
            description: apt.description,
            comments: apt.comments,
            appointment_date: apt.appointment_date.to_string(),
            status: apt.status.to_string(),
            created_at: apt.created_at,
            treatment: apt.treatment,
            cost: apt.cost,
            next_date: apt.next_date.map(|d| d.to_string()),
            post_visit_notes: apt.post_visit_notes,
            medications_prescribed: apt.medications_prescribed,
            files: apt.files.into_iter().map(Into::into).collect(),
            completed_at: apt.completed_at,
            cancelled_at: apt.cancelled_at,
            cancellation_reason: apt.cancellation_reason,
        }
    }
}

/// FFI-safe patient history.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientHistory {
    pub upcoming: Vec<FfiAppointment>,
    pub past: Vec<FfiAppointment>,
}

impl From<PatientHistory> for FfiPatientHistory {
    fn from(history: PatientHistory) -> Self {
        Self {
            upcoming: history.upcoming.into_iter().map(Into::into).collect(),
            past: history.past.into_iter().map(Into::into).collect(),
        }
    }
}

/// FFI-safe practice statistics.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStats {
    pub total_revenue: f64,
    pub total_patients: u32,
    pub completed_count: u32,
    pub scheduled_count: u32,
    pub cancelled_count: u32,
    pub average_cost: Option<f64>,
}

impl From<PracticeStats> for FfiStats {
    fn from(stats: PracticeStats) -> Self {
        Self {
            total_revenue: stats.total_revenue,
            total_patients: count_u32(stats.total_patients),
            completed_count: count_u32(stats.completed_count),
            scheduled_count: count_u32(stats.scheduled_count),
            cancelled_count: count_u32(stats.cancelled_count),
            average_cost: stats.average_cost,
        }
    }
}

/// FFI-safe top-patients entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientVisits {
    pub patient: FfiPatient,
    pub visits: u32,
    pub last_visit: Option<String>,
}

impl From<PatientVisits> for FfiPatientVisits {
    fn from(entry: PatientVisits) -> Self {
        Self {
            patient: entry.patient.into(),
            visits: count_u32(entry.visits),
            last_visit: entry.last_visit.map(|d| d.to_string()),
        }
    }
}

/// FFI-safe monthly revenue.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMonthlyRevenue {
    pub month: String,
    pub revenue: f64,
    pub appointments: u32,
}

impl From<MonthlyRevenue> for FfiMonthlyRevenue {
    fn from(entry: MonthlyRevenue) -> Self {
        Self {
            month: entry.month,
            revenue: entry.revenue,
            appointments: count_u32(entry.appointments),
        }
    }
}
