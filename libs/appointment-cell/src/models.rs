use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::{DayOfWeek, DoctorError};
use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::ClockTime;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: ClockTime,
    pub status: AppointmentStatus,
    pub consultation_fee: f64,
    pub reason: Option<String>,
    pub doctor_name: Option<String>,
    pub specialty: Option<String>,
    #[serde(default)]
    pub doctor_notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Whether an appointment in this status holds its slot.
    pub fn occupies_slot(self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insert payload handed to the store. Status is always `scheduled` on
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAppointment {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: ClockTime,
    pub consultation_fee: f64,
    pub reason: Option<String>,
    pub doctor_name: Option<String>,
    pub specialty: Option<String>,
}

/// Fields written by a conditional update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_notes: Option<String>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    /// `YYYY-MM-DD`
    pub appointment_date: String,
    /// `HH:MM`
    pub appointment_time: String,
    pub reason: Option<String>,
    pub consultation_fee: Option<f64>,
    pub doctor_name: Option<String>,
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorUpdateRequest {
    pub doctor_notes: Option<String>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub day: DayOfWeek,
    pub working_day: bool,
    pub interval_minutes: u16,
    pub available_slots: Vec<ClockTime>,
}

#[derive(Debug, Clone, Copy)]
pub struct AppointmentValidationRules {
    pub max_reason_length: usize,
    pub max_label_length: usize,
    pub max_notes_length: usize,
}

impl Default for AppointmentValidationRules {
    fn default() -> Self {
        Self {
            max_reason_length: 1000,
            max_label_length: 200,
            max_notes_length: 5000,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("The doctor does not offer a {time} appointment on {date}")]
    SlotNotOffered { date: NaiveDate, time: ClockTime },

    #[error("This time slot is already booked. Please select a different time.")]
    SlotConflict,

    #[error("Appointment not found")]
    NotFound,

    #[error("Not authorized to access this appointment")]
    Forbidden,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::InvalidSchedule(e) => AppointmentError::Validation(e.to_string()),
            DoctorError::Storage(e) => AppointmentError::Storage(e),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            e @ AppointmentError::SlotNotOffered { .. } => AppError::Unprocessable(e.to_string()),
            e @ AppointmentError::SlotConflict => AppError::Conflict(e.to_string()),
            e @ AppointmentError::InvalidStatusTransition { .. } => {
                AppError::Conflict(e.to_string())
            }
            e @ AppointmentError::NotFound => AppError::NotFound(e.to_string()),
            e @ AppointmentError::Forbidden => AppError::Forbidden(e.to_string()),
            AppointmentError::Storage(e) => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn only_live_statuses_occupy_a_slot() {
        assert!(AppointmentStatus::Scheduled.occupies_slot());
        assert!(AppointmentStatus::Completed.occupies_slot());
        assert!(!AppointmentStatus::Cancelled.occupies_slot());
    }

    #[test]
    fn status_uses_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&AppointmentStatus::Cancelled).unwrap(), "\"cancelled\"");
        let parsed: AppointmentStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, AppointmentStatus::Completed);
    }

    #[test]
    fn changes_skip_untouched_columns() {
        let changes = AppointmentChanges {
            status: Some(AppointmentStatus::Cancelled),
            doctor_notes: None,
        };
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            serde_json::json!({ "status": "cancelled" })
        );
    }

    #[test]
    fn errors_map_to_http_statuses() {
        let cases = [
            (AppointmentError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                AppointmentError::SlotNotOffered {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    time: "09:10".parse().unwrap(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppointmentError::SlotConflict, StatusCode::CONFLICT),
            (
                AppointmentError::InvalidStatusTransition {
                    from: AppointmentStatus::Cancelled,
                    to: AppointmentStatus::Completed,
                },
                StatusCode::CONFLICT,
            ),
            (AppointmentError::NotFound, StatusCode::NOT_FOUND),
            (AppointmentError::Forbidden, StatusCode::FORBIDDEN),
            (
                AppointmentError::Storage(DatabaseError::Auth("nope".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn conflict_message_is_user_facing() {
        let app_error = AppError::from(AppointmentError::SlotConflict);
        assert_eq!(
            app_error.to_string(),
            "Conflict: This time slot is already booked. Please select a different time."
        );
    }
}
