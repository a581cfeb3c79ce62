use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::{appointment_routes, AppointmentState};
use appointment_cell::store::AppointmentStore;
use doctor_cell::router::{doctor_routes, DoctorState};
use doctor_cell::store::ScheduleStore;
use shared_config::AppConfig;

pub fn create_router(
    config: Arc<AppConfig>,
    schedules: Arc<dyn ScheduleStore>,
    appointments: Arc<dyn AppointmentStore>,
) -> Router {
    let doctor_state = DoctorState::new(config.clone(), schedules.clone());
    let appointment_state = AppointmentState::new(config, appointments, schedules);

    Router::new()
        .route("/", get(|| async { "Slot allocator API is running!" }))
        .nest("/doctors", doctor_routes(doctor_state))
        .nest("/appointments", appointment_routes(appointment_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use appointment_cell::store::InMemoryAppointmentStore;
    use doctor_cell::store::InMemoryScheduleStore;
    use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

    fn app(config: &TestConfig) -> Router {
        create_router(
            config.to_arc(),
            Arc::new(InMemoryScheduleStore::new()),
            Arc::new(InMemoryAppointmentStore::new()),
        )
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let response = app(&TestConfig::default())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn schedule_set_through_doctors_drives_appointment_slots() {
        let config = TestConfig::default();
        let app = app(&config);
        let doctor = TestUser::doctor("doctor@example.com");

        let schedule = json!({
            "schedule": [{ "day": "Monday", "start_time": "09:00", "end_time": "10:00" }]
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/doctors/{}/schedule", doctor.uuid()))
                    .header("authorization", JwtTestUtils::bearer(&doctor, &config))
                    .header("content-type", "application/json")
                    .body(Body::from(schedule.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!(
                        "/appointments/available-slots?doctor_id={}&date=2024-01-01",
                        doctor.uuid()
                    ))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["available_slots"],
            json!(["09:00", "09:20", "09:40"])
        );
    }
}
