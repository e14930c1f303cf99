//! Appointment models and the scheduled → completed lifecycle record.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::attachment::Attachment;

/// Appointment lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// Booked, not yet seen
    Scheduled,
    /// Seen, treatment recorded (terminal)
    Completed,
    /// Called off before the visit (terminal)
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("Unknown appointment status: {}", other)),
        }
    }
}

/// An appointment record as stored in the `appointments` collection.
///
/// One record carries both lifecycle phases. The completion fields stay empty
/// until the visit is completed; `title`, `description`, `comments`,
/// `appointment_date` and `patient_id` never change after scheduling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "StoredAppointment")]
pub struct Appointment {
    /// Timestamp-derived ID
    pub id: String,
    /// Weak reference to a patient; not checked on write
    pub patient_id: String,
    pub title: String,
    pub description: String,
    pub comments: String,
    /// Date of the visit
    pub appointment_date: NaiveDate,
    pub status: AppointmentStatus,
    /// Creation timestamp
    pub created_at: String,

    // Completion phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Follow-up date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_visit_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medications_prescribed: Option<String>,
    /// X-rays, photos and documents attached on completion
    pub files: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,

    // Cancellation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Loose shape of a stored appointment.
///
/// Older writers stored form state verbatim: empty strings for unset fields,
/// costs as strings, and the completion form's own key names
/// (`treatmentProvided`, `followUpDate`) next to the scheduling form's.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAppointment {
    id: String,
    patient_id: String,
    title: String,
    description: String,
    comments: String,
    appointment_date: NaiveDate,
    status: AppointmentStatus,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    treatment: Option<String>,
    #[serde(default)]
    treatment_provided: Option<String>,
    #[serde(default, deserialize_with = "lenient_cost")]
    cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_date")]
    next_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    post_visit_notes: Option<String>,
    #[serde(default)]
    medications_prescribed: Option<String>,
    #[serde(default)]
    files: Vec<Attachment>,
    #[serde(default)]
    completed_at: Option<String>,
    #[serde(default)]
    cancelled_at: Option<String>,
    #[serde(default)]
    cancellation_reason: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl From<StoredAppointment> for Appointment {
    fn from(raw: StoredAppointment) -> Self {
        Appointment {
            id: raw.id,
            patient_id: raw.patient_id,
            title: raw.title,
            description: raw.description,
            comments: raw.comments,
            appointment_date: raw.appointment_date,
            status: raw.status,
            created_at: raw.created_at,
            treatment: non_empty(raw.treatment).or_else(|| non_empty(raw.treatment_provided)),
            cost: raw.cost,
            next_date: raw.next_date.or(raw.follow_up_date),
            post_visit_notes: non_empty(raw.post_visit_notes),
            medications_prescribed: non_empty(raw.medications_prescribed),
            files: raw.files,
            completed_at: non_empty(raw.completed_at),
            cancelled_at: non_empty(raw.cancelled_at),
            cancellation_reason: non_empty(raw.cancellation_reason),
            updated_at: non_empty(raw.updated_at),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl Appointment {
    /// Create a scheduled appointment with a fresh ID.
    pub fn new(
        patient_id: String,
        title: String,
        description: String,
        comments: String,
        appointment_date: NaiveDate,
    ) -> Self {
        Self {
            id: new_appointment_id(),
            patient_id,
            title,
            description,
            comments,
            appointment_date,
            status: AppointmentStatus::Scheduled,
            created_at: chrono::Utc::now().to_rfc3339(),
            treatment: None,
            cost: None,
            next_date: None,
            post_visit_notes: None,
            medications_prescribed: None,
            files: Vec::new(),
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            updated_at: None,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }

    pub fn is_completed(&self) -> bool {
        self.status == AppointmentStatus::Completed
    }

    /// Cost for aggregation; absent counts as zero.
    pub fn cost_or_zero(&self) -> f64 {
        self.cost.unwrap_or(0.0)
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
    }
}

/// Generate an appointment ID.
pub fn new_appointment_id() -> String {
    format!("app_{}", uuid::Uuid::now_v7().simple())
}

/// Accept a number, a numeric string (form inputs were stored verbatim) or
/// null. Anything else loads as no cost rather than failing the collection.
fn lenient_cost<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|c| c.is_finite()))
}

/// Empty strings were stored for "no follow-up"; treat them, and anything
/// unparseable, as absent.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_appointment() -> Appointment {
        Appointment::new(
            "p1".into(),
            "Cleaning".into(),
            "Routine cleaning".into(),
            "Sensitive gums".into(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        )
    }

    #[test]
    fn test_new_appointment_is_scheduled() {
        let apt = make_appointment();
        assert!(apt.is_scheduled());
        assert!(apt.id.starts_with("app_"));
        assert!(apt.files.is_empty());
        assert!(apt.completed_at.is_none());
        assert_eq!(apt.cost_or_zero(), 0.0);
    }

    #[test]
    fn test_status_round_trips_as_lowercase() {
        let json = serde_json::to_string(&AppointmentStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        assert_eq!(
            "Cancelled".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::Cancelled
        );
        assert!("pending".parse::<AppointmentStatus>().is_err());
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(!AppointmentStatus::Scheduled.is_terminal());
    }

    #[test]
    fn test_scheduled_record_omits_completion_fields() {
        let json = serde_json::to_value(make_appointment()).unwrap();
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["patientId"], "p1");
        assert_eq!(json["appointmentDate"], "2025-01-10");
        assert!(json.get("treatment").is_none());
        assert!(json.get("cost").is_none());
        assert_eq!(json["files"], serde_json::json!([]));
    }

    #[test]
    fn test_loads_legacy_completed_record() {
        let json = r#"{
            "id": "app_1751443258737",
            "patientId": "p1751285870453",
            "title": "Root canal",
            "description": "Molar",
            "comments": "Anxious patient",
            "appointmentDate": "2025-07-02",
            "status": "completed",
            "createdAt": "2025-07-01T08:00:00.000Z",
            "treatmentProvided": "Root canal, temporary filling",
            "cost": "120",
            "treatment": "",
            "nextDate": "",
            "followUpDate": "2025-08-01",
            "completedAt": "2025-07-02T10:00:00.000Z"
        }"#;
        let apt: Appointment = serde_json::from_str(json).unwrap();
        assert!(apt.is_completed());
        assert_eq!(apt.treatment.as_deref(), Some("Root canal, temporary filling"));
        assert_eq!(apt.cost, Some(120.0));
        assert_eq!(apt.next_date, NaiveDate::from_ymd_opt(2025, 8, 1));
        assert!(apt.files.is_empty());
    }

    #[test]
    fn test_non_numeric_cost_loads_as_absent() {
        let json = r#"{"id":"a","patientId":"p","title":"t","description":"d",
            "comments":"c","appointmentDate":"2025-01-10","status":"completed",
            "cost":"eighty"}"#;
        let apt: Appointment = serde_json::from_str(json).unwrap();
        assert_eq!(apt.cost, None);
        assert_eq!(apt.cost_or_zero(), 0.0);
    }
}
