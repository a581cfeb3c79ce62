use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::{supabase::SupabaseClient, DatabaseError};

use crate::models::DoctorSchedule;

/// Persistence seam for weekly schedules. A doctor with no stored row simply
/// has no schedule yet.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get_schedule(&self, doctor_id: Uuid) -> Result<Option<DoctorSchedule>, DatabaseError>;

    async fn set_schedule(
        &self,
        doctor_id: Uuid,
        schedule: DoctorSchedule,
    ) -> Result<DoctorSchedule, DatabaseError>;
}

// ==============================================================================
// SUPABASE
// ==============================================================================

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    entries: DoctorSchedule,
}

pub struct SupabaseScheduleStore {
    client: Arc<SupabaseClient>,
}

impl SupabaseScheduleStore {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScheduleStore for SupabaseScheduleStore {
    async fn get_schedule(&self, doctor_id: Uuid) -> Result<Option<DoctorSchedule>, DatabaseError> {
        let path = format!(
            "/rest/v1/doctor_schedules?doctor_id=eq.{}&select=entries",
            doctor_id
        );

        let rows: Vec<ScheduleRow> = self.client.request(Method::GET, &path, None, None).await?;

        Ok(rows.into_iter().next().map(|row| row.entries))
    }

    async fn set_schedule(
        &self,
        doctor_id: Uuid,
        schedule: DoctorSchedule,
    ) -> Result<DoctorSchedule, DatabaseError> {
        debug!("Upserting schedule for doctor {}", doctor_id);

        let body = json!({
            "doctor_id": doctor_id,
            "entries": schedule,
            "updated_at": Utc::now().to_rfc3339(),
        });

        // Upsert on the primary key so the whole schedule is replaced in one write
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );

        let rows: Vec<ScheduleRow> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_schedules?on_conflict=doctor_id",
                None,
                Some(body),
                Some(headers),
            )
            .await?;

        rows.into_iter()
            .next()
            .map(|row| row.entries)
            .ok_or_else(|| {
                let message = format!("schedule upsert for {} returned no row", doctor_id);
                DatabaseError::NotFound(message)
            })
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Default)]
pub struct InMemoryScheduleStore {
    schedules: RwLock<HashMap<Uuid, DoctorSchedule>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn get_schedule(&self, doctor_id: Uuid) -> Result<Option<DoctorSchedule>, DatabaseError> {
        Ok(self.schedules.read().await.get(&doctor_id).cloned())
    }

    async fn set_schedule(
        &self,
        doctor_id: Uuid,
        schedule: DoctorSchedule,
    ) -> Result<DoctorSchedule, DatabaseError> {
        self.schedules.write().await.insert(doctor_id, schedule.clone());
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayOfWeek, ScheduleEntry};

    #[tokio::test]
    async fn in_memory_store_replaces_wholesale() {
        let store = InMemoryScheduleStore::new();
        let doctor_id = Uuid::new_v4();

        assert!(store.get_schedule(doctor_id).await.unwrap().is_none());

        let first = DoctorSchedule::new(vec![
            ScheduleEntry {
                day: DayOfWeek::Monday,
                start_time: "09:00".parse().unwrap(),
                end_time: "12:00".parse().unwrap(),
            },
            ScheduleEntry {
                day: DayOfWeek::Tuesday,
                start_time: "09:00".parse().unwrap(),
                end_time: "12:00".parse().unwrap(),
            },
        ])
        .unwrap();
        store.set_schedule(doctor_id, first).await.unwrap();

        let second = DoctorSchedule::new(vec![ScheduleEntry {
            day: DayOfWeek::Friday,
            start_time: "10:00".parse().unwrap(),
            end_time: "11:00".parse().unwrap(),
        }])
        .unwrap();
        store.set_schedule(doctor_id, second.clone()).await.unwrap();

        assert_eq!(store.get_schedule(doctor_id).await.unwrap(), Some(second));
    }
}
