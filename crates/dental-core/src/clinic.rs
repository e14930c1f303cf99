//! One store, the two collections persisted in it, and the derived views.

use std::sync::Arc;

use crate::appointments::AppointmentBook;
use crate::config::CoreConfig;
use crate::error::ClinicResult;
use crate::export::BillingExporter;
use crate::registry::PatientRegistry;
use crate::stats::{self, MonthlyRevenue, PatientVisits, PracticeStats};
use crate::store::{MemoryStore, Store};

/// The practice's data, wired to a single store.
pub struct Clinic {
    store: Arc<dyn Store>,
    patients: PatientRegistry,
    appointments: AppointmentBook,
    top_patients_limit: usize,
}

impl Clinic {
    /// Open the configured store and load both collections.
    pub fn open(config: &CoreConfig) -> ClinicResult<Self> {
        let store = config.open_store()?;
        let clinic = Self::with_store(store)
            .with_limits(config.attachments.max_bytes, config.dashboard.top_patients);
        tracing::info!(
            backend = ?config.storage.backend,
            patients = clinic.patients.len(),
            appointments = clinic.appointments.len(),
            "clinic opened"
        );
        Ok(clinic)
    }

    /// Load both collections from an existing store.
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        let defaults = CoreConfig::default();
        Self {
            patients: PatientRegistry::load(store.clone()),
            appointments: AppointmentBook::load(store.clone()),
            store,
            top_patients_limit: defaults.dashboard.top_patients,
        }
    }

    /// Fresh, empty clinic (for testing).
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    fn with_limits(mut self, max_attachment_bytes: u64, top_patients: usize) -> Self {
        self.appointments = self.appointments.with_max_attachment_bytes(max_attachment_bytes);
        self.top_patients_limit = top_patients;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn patients(&self) -> &PatientRegistry {
        &self.patients
    }

    pub fn patients_mut(&mut self) -> &mut PatientRegistry {
        &mut self.patients
    }

    pub fn appointments(&self) -> &AppointmentBook {
        &self.appointments
    }

    pub fn appointments_mut(&mut self) -> &mut AppointmentBook {
        &mut self.appointments
    }

    pub fn stats(&self) -> PracticeStats {
        stats::summarize(self.patients.list(), self.appointments.list())
    }

    pub fn top_patients(&self, n: usize) -> Vec<PatientVisits> {
        stats::top_patients(self.patients.list(), self.appointments.list(), n)
    }

    /// Top patients using the configured list length.
    pub fn dashboard_top_patients(&self) -> Vec<PatientVisits> {
        self.top_patients(self.top_patients_limit)
    }

    pub fn revenue_by_month(&self) -> Vec<MonthlyRevenue> {
        stats::revenue_by_month(self.appointments.list())
    }

    pub fn billing(&self) -> BillingExporter<'_> {
        BillingExporter::new(self.patients.list(), self.appointments.list())
    }
}
