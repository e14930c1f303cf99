//! Errors raised by registry and lifecycle operations.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field-level validation failures, collected before any write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Record `"<label> is required"` when `value` is blank.
    pub fn require(&mut self, field: &'static str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, format!("{} is required", label));
        }
    }

    /// Parse a required `YYYY-MM-DD` date, recording why it was rejected.
    pub fn require_date(
        &mut self,
        field: &'static str,
        label: &str,
        value: &str,
    ) -> Option<NaiveDate> {
        let value = value.trim();
        if value.is_empty() {
            self.push(field, format!("{} is required", label));
            return None;
        }
        match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.push(field, format!("{} must be a date (YYYY-MM-DD)", label));
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.errors.iter().map(|e| e.field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ClinicError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ClinicError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

/// Errors from clinic operations. None of them leave partial state behind.
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("File '{name}' is {size} bytes, limit is {limit}")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ClinicError {
    pub(crate) fn patient_not_found(id: &str) -> Self {
        ClinicError::NotFound {
            entity: "Patient",
            id: id.to_string(),
        }
    }

    pub(crate) fn appointment_not_found(id: &str) -> Self {
        ClinicError::NotFound {
            entity: "Scheduled appointment",
            id: id.to_string(),
        }
    }
}

pub type ClinicResult<T> = Result<T, ClinicError>;
