use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
    middleware,
};

use doctor_cell::store::ScheduleStore;
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::allocator::SlotInterval;
use crate::services::locks::SlotLocks;
use crate::store::AppointmentStore;

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub schedules: Arc<dyn ScheduleStore>,
    pub locks: Arc<SlotLocks>,
}

impl AppointmentState {
    pub fn new(
        config: Arc<AppConfig>,
        appointments: Arc<dyn AppointmentStore>,
        schedules: Arc<dyn ScheduleStore>,
    ) -> Self {
        Self {
            config,
            appointments,
            schedules,
            locks: Arc::new(SlotLocks::new()),
        }
    }

    pub fn slot_interval(&self) -> SlotInterval {
        SlotInterval::new(self.config.slot_interval_minutes).unwrap_or_default()
    }
}

pub fn appointment_routes(state: AppointmentState) -> Router {
    // Slot lookups are public so the booking form can render before login
    let public_routes = Router::new()
        .route("/booked-slots", get(handlers::get_booked_slots))
        .route("/available-slots", get(handlers::get_available_slots));

    let protected_routes = Router::new()
        // Patient
        .route("/", post(handlers::book_appointment).get(handlers::get_my_appointments))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))

        // Doctor
        .route("/doctor", get(handlers::get_doctor_appointments))
        .route("/doctor/{appointment_id}", patch(handlers::update_doctor_appointment))

        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
