//! Billing export of completed appointments.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Appointment, Patient};

/// One billed visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingLine {
    pub appointment_id: String,
    pub patient_id: String,
    /// Empty when the patient has since been deleted
    pub patient_name: String,
    pub appointment_date: NaiveDate,
    pub title: String,
    pub treatment: String,
    pub cost: f64,
    pub completed_at: Option<String>,
}

impl BillingLine {
    fn from_appointment(apt: &Appointment, patient_name: Option<&str>) -> Self {
        Self {
            appointment_id: apt.id.clone(),
            patient_id: apt.patient_id.clone(),
            patient_name: patient_name.unwrap_or_default().to_string(),
            appointment_date: apt.appointment_date,
            title: apt.title.clone(),
            treatment: apt.treatment.clone().unwrap_or_default(),
            cost: apt.cost_or_zero(),
            completed_at: apt.completed_at.clone(),
        }
    }
}

/// Batch billing export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingBatch {
    /// Export timestamp
    pub exported_at: String,
    pub lines: Vec<BillingLine>,
    pub total_revenue: f64,
}

impl BillingBatch {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str(
            "appointment_id,patient_id,patient_name,appointment_date,title,treatment,cost,completed_at\n",
        );

        for line in &self.lines {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{:.2},{}\n",
                escape_csv(&line.appointment_id),
                escape_csv(&line.patient_id),
                escape_csv(&line.patient_name),
                line.appointment_date,
                escape_csv(&line.title),
                escape_csv(&line.treatment),
                line.cost,
                escape_csv(line.completed_at.as_deref().unwrap_or("")),
            ));
        }

        csv
    }
}

/// Billing exporter over the current collections.
pub struct BillingExporter<'a> {
    patients: &'a [Patient],
    appointments: &'a [Appointment],
}

impl<'a> BillingExporter<'a> {
    /// Create a new billing exporter.
    pub fn new(patients: &'a [Patient], appointments: &'a [Appointment]) -> Self {
        Self {
            patients,
            appointments,
        }
    }

    /// Export every completed appointment, in collection order.
    pub fn export_all(&self) -> BillingBatch {
        self.export_where(|_| true)
    }

    /// Export completed appointments dated within `from..=to`.
    pub fn export_between(&self, from: NaiveDate, to: NaiveDate) -> BillingBatch {
        self.export_where(|apt| apt.appointment_date >= from && apt.appointment_date <= to)
    }

    fn export_where(&self, keep: impl Fn(&Appointment) -> bool) -> BillingBatch {
        let names: HashMap<&str, &str> = self
            .patients
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();

        let lines: Vec<BillingLine> = self
            .appointments
            .iter()
            .filter(|apt| apt.is_completed() && keep(*apt))
            .map(|apt| {
                BillingLine::from_appointment(apt, names.get(apt.patient_id.as_str()).copied())
            })
            .collect();
        let total_revenue: f64 = lines.iter().map(|l| l.cost).sum();

        tracing::debug!(lines = lines.len(), total_revenue, "billing batch built");
        BillingBatch {
            exported_at: chrono::Utc::now().to_rfc3339(),
            lines,
            total_revenue,
        }
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;

    fn make_patient(id: &str, name: &str) -> Patient {
        let mut p = Patient::new(
            name.into(),
            NaiveDate::from_ymd_opt(1988, 7, 12).unwrap(),
            "6666667777".into(),
            "None".into(),
        );
        p.id = id.into();
        p
    }

    fn make_completed(patient_id: &str, date: &str, treatment: &str, cost: f64) -> Appointment {
        let mut a = Appointment::new(
            patient_id.into(),
            "Visit".into(),
            "d".into(),
            "c".into(),
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        );
        a.status = AppointmentStatus::Completed;
        a.treatment = Some(treatment.into());
        a.cost = Some(cost);
        a.completed_at = Some("2025-01-10T10:00:00+00:00".into());
        a
    }

    fn fixtures() -> (Vec<Patient>, Vec<Appointment>) {
        let patients = vec![make_patient("p1", "Harshit Sharma")];
        let scheduled = Appointment::new(
            "p1".into(),
            "Later".into(),
            "d".into(),
            "c".into(),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        );
        let appointments = vec![
            make_completed("p1", "2025-01-10", "Scaling, polishing", 80.0),
            scheduled,
            make_completed("gone", "2025-02-10", "Extraction", 150.5),
        ];
        (patients, appointments)
    }

    #[test]
    fn test_export_all_completed() {
        let (patients, appointments) = fixtures();
        let batch = BillingExporter::new(&patients, &appointments).export_all();

        assert_eq!(batch.lines.len(), 2);
        assert_eq!(batch.total_revenue, 230.5);
        assert_eq!(batch.lines[0].patient_name, "Harshit Sharma");
        assert_eq!(batch.lines[1].patient_name, "");
    }

    #[test]
    fn test_export_between() {
        let (patients, appointments) = fixtures();
        let batch = BillingExporter::new(&patients, &appointments).export_between(
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
        );
        assert_eq!(batch.lines.len(), 1);
        assert_eq!(batch.lines[0].treatment, "Extraction");
    }

    #[test]
    fn test_billing_csv() {
        let (patients, appointments) = fixtures();
        let csv = BillingExporter::new(&patients, &appointments).export_all().to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3); // Header + 2 visits
        assert!(lines[0].starts_with("appointment_id,"));
        assert!(lines[1].contains("\"Scaling, polishing\",80.00,"));
        assert!(lines[2].contains(",150.50,"));
    }

    #[test]
    fn test_billing_json() {
        let (patients, appointments) = fixtures();
        let json = BillingExporter::new(&patients, &appointments)
            .export_all()
            .to_json()
            .unwrap();
        assert!(json.contains("Harshit Sharma"));
        assert!(json.contains("\"total_revenue\": 230.5"));
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_csv("carriage\rreturn"), "\"carriage\rreturn\"");
    }
}
