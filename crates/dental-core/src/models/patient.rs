//! Patient models.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A patient record as stored in the `patients` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Timestamp-derived ID, immutable once assigned
    pub id: String,
    /// Full name
    pub name: String,
    /// Date of birth
    pub dob: NaiveDate,
    /// Phone number or other contact detail
    pub contact: String,
    /// Allergies, conditions, medication notes
    pub health_info: String,
    /// Account that owns this profile, if it was self-registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with a fresh ID.
    pub fn new(name: String, dob: NaiveDate, contact: String, health_info: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: new_patient_id(),
            name,
            dob,
            contact,
            health_info,
            user_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Age in whole years as of `today`.
    ///
    /// A birthday later in the year than `today` has not been reached yet, so
    /// it does not count. Dates of birth in the future yield zero.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        let mut age = today.year() - self.dob.year();
        if (today.month(), today.day()) < (self.dob.month(), self.dob.day()) {
            age -= 1;
        }
        age.max(0) as u32
    }

    /// Whether this profile belongs to the given account.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Generate a patient ID. UUIDv7 keeps the creation millisecond in its
/// leading bits, so IDs sort by creation time.
pub fn new_patient_id() -> String {
    format!("p{}", uuid::Uuid::now_v7().simple())
}
