use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::store::ScheduleStore;

#[derive(Clone)]
pub struct DoctorState {
    pub config: Arc<AppConfig>,
    pub schedules: Arc<dyn ScheduleStore>,
}

impl DoctorState {
    pub fn new(config: Arc<AppConfig>, schedules: Arc<dyn ScheduleStore>) -> Self {
        Self { config, schedules }
    }
}

pub fn doctor_routes(state: DoctorState) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/{doctor_id}/schedule", get(handlers::get_schedule));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/{doctor_id}/schedule", put(handlers::update_schedule))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
