use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::{supabase::SupabaseClient, DatabaseError};
use shared_models::ClockTime;

use crate::models::{Appointment, AppointmentChanges, AppointmentStatus, NewAppointment};

const LIVE_STATUS_FILTER: &str = "status=in.(scheduled,completed)";

/// Persistence seam for appointments.
///
/// `create` must refuse a second live appointment for the same doctor, date
/// and time with [`DatabaseError::UniqueViolation`], even under concurrent
/// callers. `transition` writes only when the stored status still equals
/// `expected` and returns `None` otherwise.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: ClockTime,
    ) -> Result<Option<Appointment>, DatabaseError>;

    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, DatabaseError>;

    async fn list_booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<BTreeSet<ClockTime>, DatabaseError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError>;

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, DatabaseError>;

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, DatabaseError>;

    async fn transition(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        changes: AppointmentChanges,
    ) -> Result<Option<Appointment>, DatabaseError>;

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

// ==============================================================================
// SUPABASE
// ==============================================================================

#[derive(Debug, Deserialize)]
struct BookedTimeRow {
    appointment_time: ClockTime,
}

pub struct SupabaseAppointmentStore {
    client: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }

    async fn select(&self, query: String) -> Result<Vec<Appointment>, DatabaseError> {
        let path = format!("/rest/v1/appointments?{}", query);
        self.client.request(Method::GET, &path, None, None).await
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: ClockTime,
    ) -> Result<Option<Appointment>, DatabaseError> {
        debug!("Checking slot {} {} for doctor {}", date, time, doctor_id);

        let rows = self
            .select(format!(
                "doctor_id=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}&{}&limit=1",
                doctor_id, date, time, LIVE_STATUS_FILTER
            ))
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, DatabaseError> {
        let mut body = serde_json::to_value(&appointment)?;
        body["status"] = json!(AppointmentStatus::Scheduled);

        // The partial unique index turns a lost race into 409 / 23505
        let rows: Vec<Appointment> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                None,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| DatabaseError::NotFound("insert returned no appointment".to_string()))
    }

    async fn list_booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<BTreeSet<ClockTime>, DatabaseError> {
        let path = format!(
            "/rest/v1/appointments?select=appointment_time&doctor_id=eq.{}&appointment_date=eq.{}&{}",
            doctor_id, date, LIVE_STATUS_FILTER
        );

        let rows: Vec<BookedTimeRow> = self.client.request(Method::GET, &path, None, None).await?;

        Ok(rows.into_iter().map(|row| row.appointment_time).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError> {
        let rows = self.select(format!("id=eq.{}", id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, DatabaseError> {
        self.select(format!(
            "patient_id=eq.{}&order=appointment_date.desc,appointment_time.desc",
            patient_id
        ))
        .await
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, DatabaseError> {
        self.select(format!(
            "doctor_id=eq.{}&order=appointment_date.desc,appointment_time.desc",
            doctor_id
        ))
        .await
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        changes: AppointmentChanges,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let mut body = serde_json::to_value(&changes)?;
        body["updated_at"] = json!(Utc::now().to_rfc3339());

        // Filtering on the current status makes the write a compare-and-set
        let path = format!("/rest/v1/appointments?id=eq.{}&status=eq.{}", id, expected);
        let rows: Vec<Appointment> = self
            .client
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Value> = self
            .client
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                None,
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        Ok(!rows.is_empty())
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_live_at(
    appointment: &Appointment,
    doctor_id: Uuid,
    date: NaiveDate,
    time: ClockTime,
) -> bool {
    appointment.doctor_id == doctor_id
        && appointment.appointment_date == date
        && appointment.appointment_time == time
        && appointment.status.occupies_slot()
}

fn newest_first(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| {
        b.appointment_date
            .cmp(&a.appointment_date)
            .then(b.appointment_time.cmp(&a.appointment_time))
    });
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: ClockTime,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let appointments = self.appointments.read().await;
        Ok(appointments
            .values()
            .find(|a| is_live_at(a, doctor_id, date, time))
            .cloned())
    }

    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, DatabaseError> {
        // Check and insert under one write guard
        let mut appointments = self.appointments.write().await;

        let taken = appointments.values().any(|a| {
            is_live_at(
                a,
                appointment.doctor_id,
                appointment.appointment_date,
                appointment.appointment_time,
            )
        });
        if taken {
            return Err(DatabaseError::UniqueViolation(format!(
                "slot {} {} for doctor {} is taken",
                appointment.appointment_date, appointment.appointment_time, appointment.doctor_id
            )));
        }

        let now = Utc::now();
        let created = Appointment {
            id: Uuid::new_v4(),
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            appointment_date: appointment.appointment_date,
            appointment_time: appointment.appointment_time,
            status: AppointmentStatus::Scheduled,
            consultation_fee: appointment.consultation_fee,
            reason: appointment.reason,
            doctor_name: appointment.doctor_name,
            specialty: appointment.specialty,
            doctor_notes: String::new(),
            created_at: now,
            updated_at: now,
        };
        appointments.insert(created.id, created.clone());

        Ok(created)
    }

    async fn list_booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<BTreeSet<ClockTime>, DatabaseError> {
        let appointments = self.appointments.read().await;
        Ok(appointments
            .values()
            .filter(|a| {
                a.doctor_id == doctor_id && a.appointment_date == date && a.status.occupies_slot()
            })
            .map(|a| a.appointment_time)
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, DatabaseError> {
        let mut found: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, DatabaseError> {
        let mut found: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        changes: AppointmentChanges,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let mut appointments = self.appointments.write().await;

        let Some(appointment) = appointments.get_mut(&id).filter(|a| a.status == expected) else {
            return Ok(None);
        };

        if let Some(status) = changes.status {
            appointment.status = status;
        }
        if let Some(notes) = changes.doctor_notes {
            appointment.doctor_notes = notes;
        }
        appointment.updated_at = Utc::now();

        Ok(Some(appointment.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.appointments.write().await.remove(&id).is_some())
    }
}
