//! Dashboard statistics, recomputed from the collections on every call.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{Appointment, AppointmentStatus, Patient};

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticeStats {
    /// Sum of `cost` over all appointments, absent costs counting as 0
    pub total_revenue: f64,
    pub total_patients: usize,
    pub completed_count: usize,
    pub scheduled_count: usize,
    pub cancelled_count: usize,
    /// Mean cost of completed appointments that carry a cost
    pub average_cost: Option<f64>,
}

/// A patient with their appointment count, for the top-patients list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientVisits {
    pub patient: Patient,
    /// Appointments of any status referencing the patient
    pub visits: usize,
    /// Latest appointment date among them
    pub last_visit: Option<NaiveDate>,
}

/// Completed revenue for one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: f64,
    pub appointments: usize,
}

/// Compute the dashboard summary.
pub fn summarize(patients: &[Patient], appointments: &[Appointment]) -> PracticeStats {
    let count =
        |status: AppointmentStatus| appointments.iter().filter(|a| a.status == status).count();

    let completed_costs: Vec<f64> = appointments
        .iter()
        .filter(|a| a.is_completed())
        .filter_map(|a| a.cost)
        .collect();
    let average_cost = if completed_costs.is_empty() {
        None
    } else {
        Some(completed_costs.iter().sum::<f64>() / completed_costs.len() as f64)
    };

    PracticeStats {
        total_revenue: appointments.iter().map(Appointment::cost_or_zero).sum(),
        total_patients: patients.len(),
        completed_count: count(AppointmentStatus::Completed),
        scheduled_count: count(AppointmentStatus::Scheduled),
        cancelled_count: count(AppointmentStatus::Cancelled),
        average_cost,
    }
}

/// Patients ordered by how many appointments reference them, most first.
///
/// The sort is stable, so patients with equal counts keep their collection
/// order. Appointments pointing at unknown patients are ignored.
pub fn top_patients(
    patients: &[Patient],
    appointments: &[Appointment],
    n: usize,
) -> Vec<PatientVisits> {
    let mut tally: HashMap<&str, (usize, Option<NaiveDate>)> = HashMap::new();
    for apt in appointments {
        let entry = tally.entry(apt.patient_id.as_str()).or_insert((0, None));
        entry.0 += 1;
        entry.1 = entry.1.max(Some(apt.appointment_date));
    }

    let mut ranked: Vec<PatientVisits> = patients
        .iter()
        .map(|p| {
            let (visits, last_visit) = tally.get(p.id.as_str()).copied().unwrap_or((0, None));
            PatientVisits {
                patient: p.clone(),
                visits,
                last_visit,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.visits.cmp(&a.visits));
    ranked.truncate(n);
    ranked
}

/// Revenue from completed appointments per month of the visit, oldest first.
pub fn revenue_by_month(appointments: &[Appointment]) -> Vec<MonthlyRevenue> {
    let mut months: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
    for apt in appointments.iter().filter(|a| a.is_completed()) {
        let date = apt.appointment_date;
        let entry = months.entry((date.year(), date.month())).or_insert((0.0, 0));
        entry.0 += apt.cost_or_zero();
        entry.1 += 1;
    }

    months
        .into_iter()
        .map(|((year, month), (revenue, count))| MonthlyRevenue {
            month: format!("{:04}-{:02}", year, month),
            revenue,
            appointments: count,
        })
        .collect()
}
