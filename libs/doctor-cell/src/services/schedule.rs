use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{DoctorError, DoctorSchedule, ScheduleEntry};
use crate::store::ScheduleStore;

pub struct ScheduleService {
    store: Arc<dyn ScheduleStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    /// The doctor's current schedule, empty when none was ever set.
    pub async fn get_schedule(&self, doctor_id: Uuid) -> Result<DoctorSchedule, DoctorError> {
        debug!("Fetching schedule for doctor {}", doctor_id);

        let schedule = self.store.get_schedule(doctor_id).await?;
        Ok(schedule.unwrap_or_default())
    }

    /// Validate and store a new schedule, replacing the previous one entirely.
    pub async fn replace_schedule(
        &self,
        doctor_id: Uuid,
        entries: Vec<ScheduleEntry>,
    ) -> Result<DoctorSchedule, DoctorError> {
        let schedule = DoctorSchedule::new(entries)?;

        let stored = self.store.set_schedule(doctor_id, schedule).await?;
        info!(
            "Schedule replaced for doctor {} ({} working days)",
            doctor_id,
            stored.entries().len()
        );

        Ok(stored)
    }
}
