use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{User, ROLE_DOCTOR};
use shared_models::error::AppError;

use crate::models::{BookAppointmentRequest, DoctorUpdateRequest, SlotQuery};
use crate::router::AppointmentState;
use crate::services::booking::AppointmentBookingService;

fn booking_service(state: &AppointmentState) -> AppointmentBookingService {
    AppointmentBookingService::new(
        state.appointments.clone(),
        state.schedules.clone(),
        state.locks.clone(),
        state.slot_interval(),
    )
}

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    user.uuid()
        .ok_or_else(|| AppError::Auth("Token subject is not a valid user id".to_string()))
}

fn require_doctor(user: &User) -> Result<Uuid, AppError> {
    if !user.has_role(ROLE_DOCTOR) {
        return Err(AppError::Forbidden("Doctor access required".to_string()));
    }
    caller_id(user)
}

// ==============================================================================
// PUBLIC SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_booked_slots(
    State(state): State<AppointmentState>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let booked = booking_service(&state)
        .booked_times(query.doctor_id, query.date)
        .await?;

    Ok(Json(json!({
        "doctor_id": query.doctor_id,
        "date": query.date,
        "booked_slots": booked,
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<AppointmentState>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let availability = booking_service(&state)
        .available_slots(query.doctor_id, query.date)
        .await?;

    Ok(Json(json!(availability)))
}

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient_id = caller_id(&user)?;
    let Json(request) = payload?;

    let appointment = booking_service(&state).book_slot(patient_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment booked successfully",
            "appointment": appointment,
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = caller_id(&user)?;

    let appointments = booking_service(&state).patient_appointments(patient_id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = caller_id(&user)?;

    let appointment = booking_service(&state)
        .cancel_as_patient(patient_id, appointment_id)
        .await?;

    Ok(Json(json!({
        "message": "Appointment cancelled successfully",
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = caller_id(&user)?;

    booking_service(&state)
        .delete_as_patient(patient_id, appointment_id)
        .await?;

    Ok(Json(json!({
        "message": "Appointment deleted successfully",
    })))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let appointments = booking_service(&state).doctor_appointments(doctor_id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

#[axum::debug_handler]
pub async fn update_doctor_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    payload: Result<Json<DoctorUpdateRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;
    let Json(request) = payload?;

    let appointment = booking_service(&state)
        .update_as_doctor(doctor_id, appointment_id, request)
        .await?;

    Ok(Json(json!({
        "message": "Appointment updated successfully",
        "appointment": appointment,
    })))
}
