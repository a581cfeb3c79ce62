use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{User, ROLE_DOCTOR};
use shared_models::error::AppError;

use crate::models::{DoctorError, UpdateScheduleRequest};
use crate::router::DoctorState;
use crate::services::ScheduleService;

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::InvalidSchedule(e) => AppError::ValidationError(e.to_string()),
            DoctorError::Storage(e) => AppError::Database(e.to_string()),
        }
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<DoctorState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(state.schedules.clone());

    let schedule = service.get_schedule(doctor_id).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "schedule": schedule,
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<DoctorState>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    payload: Result<Json<UpdateScheduleRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    // Only the doctor can change their own availability
    if !user.has_role(ROLE_DOCTOR) || user.uuid() != Some(doctor_id) {
        return Err(AppError::Forbidden(
            "Only the doctor can update this schedule".to_string(),
        ));
    }

    let Json(request) = payload?;

    let service = ScheduleService::new(state.schedules.clone());
    let schedule = service.replace_schedule(doctor_id, request.schedule).await?;

    Ok(Json(json!({
        "message": "Schedule updated successfully",
        "doctor_id": doctor_id,
        "schedule": schedule,
    })))
}
