use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{AppointmentChanges, AppointmentStatus, NewAppointment};
use appointment_cell::store::{AppointmentStore, SupabaseAppointmentStore};
use shared_database::supabase::SupabaseClient;
use shared_database::DatabaseError;
use shared_utils::test_utils::TestConfig;

fn store_for(server: &MockServer) -> SupabaseAppointmentStore {
    let config = TestConfig::with_supabase_url(server.uri()).to_app_config();
    SupabaseAppointmentStore::new(Arc::new(SupabaseClient::new(&config)))
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn appointment_row(id: Uuid, doctor_id: Uuid, time: &str, status: &str) -> Value {
    json!({
        "id": id,
        "doctor_id": doctor_id,
        "patient_id": Uuid::new_v4(),
        "appointment_date": "2024-01-01",
        "appointment_time": time,
        "status": status,
        "consultation_fee": 45.5,
        "reason": "Sore throat",
        "doctor_name": null,
        "specialty": null,
        "doctor_notes": "",
        "created_at": "2024-01-01T08:00:00Z",
        "updated_at": "2024-01-01T08:00:00Z"
    })
}

fn new_appointment(doctor_id: Uuid) -> NewAppointment {
    NewAppointment {
        doctor_id,
        patient_id: Uuid::new_v4(),
        appointment_date: monday(),
        appointment_time: "09:20".parse().unwrap(),
        consultation_fee: 45.5,
        reason: Some("Sore throat".to_string()),
        doctor_name: None,
        specialty: None,
    }
}

#[tokio::test]
async fn test_find_conflict_filters_on_live_statuses() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let existing = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("appointment_date", "eq.2024-01-01"))
        .and(query_param("appointment_time", "eq.09:20"))
        .and(query_param("status", "in.(scheduled,completed)"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row(existing, doctor_id, "09:20", "scheduled")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let conflict = store_for(&mock_server)
        .find_conflict(doctor_id, monday(), "09:20".parse().unwrap())
        .await
        .unwrap();

    assert_eq!(conflict.map(|a| a.id), Some(existing));
}

#[tokio::test]
async fn test_list_booked_times_selects_only_times() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "appointment_time"))
        .and(query_param("status", "in.(scheduled,completed)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "appointment_time": "10:40" },
            { "appointment_time": "09:00" }
        ])))
        .mount(&mock_server)
        .await;

    let booked = store_for(&mock_server)
        .list_booked_times(doctor_id, monday())
        .await
        .unwrap();

    let times: Vec<String> = booked.iter().map(|t| t.to_string()).collect();
    assert_eq!(times, vec!["09:00", "10:40"]);
}

#[tokio::test]
async fn test_create_inserts_scheduled_row() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "doctor_id": doctor_id,
            "appointment_date": "2024-01-01",
            "appointment_time": "09:20",
            "status": "scheduled"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([appointment_row(id, doctor_id, "09:20", "scheduled")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let created = store_for(&mock_server).create(new_appointment(doctor_id)).await.unwrap();

    assert_eq!(created.id, id);
    assert_eq!(created.status, AppointmentStatus::Scheduled);
    assert_eq!(created.consultation_fee, 45.5);
}

#[tokio::test]
async fn test_create_reports_unique_violation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"appointments_live_slot_key\""
        })))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server).create(new_appointment(Uuid::new_v4())).await;

    assert_matches!(result, Err(DatabaseError::UniqueViolation(_)));
}

#[tokio::test]
async fn test_transition_is_conditional_on_expected_status() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("status", "eq.scheduled"))
        .and(body_partial_json(json!({ "status": "cancelled" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let changes = AppointmentChanges {
        status: Some(AppointmentStatus::Cancelled),
        doctor_notes: None,
    };
    let result = store_for(&mock_server)
        .transition(id, AppointmentStatus::Scheduled, changes)
        .await
        .unwrap();

    // No row matched, so the status had already moved on
    assert!(result.is_none());
}

#[tokio::test]
async fn test_list_for_doctor_orders_newest_first() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("order", "appointment_date.desc,appointment_time.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(Uuid::new_v4(), doctor_id, "11:00", "completed"),
            appointment_row(Uuid::new_v4(), doctor_id, "09:00", "cancelled")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let listed = store_for(&mock_server).list_for_doctor(doctor_id).await.unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1].status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn test_delete_reports_missing_rows() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let deleted = store_for(&mock_server).delete(Uuid::new_v4()).await.unwrap();
    assert!(!deleted);
}
