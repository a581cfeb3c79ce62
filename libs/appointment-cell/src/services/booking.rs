use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::DayOfWeek;
use doctor_cell::services::ScheduleService;
use doctor_cell::store::ScheduleStore;
use shared_models::ClockTime;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentError, AppointmentStatus,
    AppointmentValidationRules, BookAppointmentRequest, DoctorUpdateRequest, NewAppointment,
    SlotAvailability,
};
use crate::services::allocator::{self, SlotInterval};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::locks::SlotLocks;
use crate::store::AppointmentStore;

pub struct AppointmentBookingService {
    appointments: Arc<dyn AppointmentStore>,
    schedule_service: ScheduleService,
    locks: Arc<SlotLocks>,
    lifecycle_service: AppointmentLifecycleService,
    validation_rules: AppointmentValidationRules,
    interval: SlotInterval,
}

impl AppointmentBookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        schedules: Arc<dyn ScheduleStore>,
        locks: Arc<SlotLocks>,
        interval: SlotInterval,
    ) -> Self {
        Self {
            appointments,
            schedule_service: ScheduleService::new(schedules),
            locks,
            lifecycle_service: AppointmentLifecycleService::new(),
            validation_rules: AppointmentValidationRules::default(),
            interval,
        }
    }

    // ==========================================================================
    // SLOT QUERIES
    // ==========================================================================

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<SlotAvailability, AppointmentError> {
        let schedule = self.schedule_service.get_schedule(doctor_id).await?;
        let working_day = schedule.entry_for_date(date).is_some();

        let available_slots = if working_day {
            let booked = self.appointments.list_booked_times(doctor_id, date).await?;
            allocator::compute_available_slots(&schedule, date, &booked, self.interval)
        } else {
            Vec::new()
        };

        debug!(
            "Doctor {} has {} free slots on {}",
            doctor_id,
            available_slots.len(),
            date
        );

        Ok(SlotAvailability {
            doctor_id,
            date,
            day: DayOfWeek::from_date(date),
            working_day,
            interval_minutes: self.interval.minutes(),
            available_slots,
        })
    }

    pub async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<ClockTime>, AppointmentError> {
        let booked = self.appointments.list_booked_times(doctor_id, date).await?;
        Ok(booked.into_iter().collect())
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    /// Reserve a slot for `patient_id`. Exactly one of any number of
    /// concurrent requests for the same slot succeeds; the rest get
    /// [`AppointmentError::SlotConflict`].
    pub async fn book_slot(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let (date, time) = self.validate_booking_request(&request)?;
        let doctor_id = request.doctor_id;

        let schedule = self.schedule_service.get_schedule(doctor_id).await?;
        if !allocator::is_offered(&schedule, date, time, self.interval) {
            warn!("Doctor {} does not offer {} on {}", doctor_id, time, date);
            return Err(AppointmentError::SlotNotOffered { date, time });
        }

        let _guard = self.locks.acquire(doctor_id, date).await;

        if let Some(existing) = self.appointments.find_conflict(doctor_id, date, time).await? {
            warn!(
                "Slot {} {} for doctor {} already held by appointment {}",
                date, time, doctor_id, existing.id
            );
            return Err(AppointmentError::SlotConflict);
        }

        let new_appointment = NewAppointment {
            doctor_id,
            patient_id,
            appointment_date: date,
            appointment_time: time,
            consultation_fee: request.consultation_fee.unwrap_or(0.0),
            reason: request.reason,
            doctor_name: request.doctor_name,
            specialty: request.specialty,
        };

        match self.appointments.create(new_appointment).await {
            Ok(appointment) => {
                info!(
                    "Appointment {} booked: doctor {} at {} {}",
                    appointment.id, doctor_id, date, time
                );
                Ok(appointment)
            }
            Err(e) if e.is_unique_violation() => {
                warn!("Lost booking race for doctor {} at {} {}", doctor_id, date, time);
                Err(AppointmentError::SlotConflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn validate_booking_request(
        &self,
        request: &BookAppointmentRequest,
    ) -> Result<(NaiveDate, ClockTime), AppointmentError> {
        let date = NaiveDate::parse_from_str(&request.appointment_date, "%Y-%m-%d").map_err(|_| {
            AppointmentError::Validation(format!(
                "appointment_date must be formatted as YYYY-MM-DD, got '{}'",
                request.appointment_date
            ))
        })?;

        let time: ClockTime = request
            .appointment_time
            .parse()
            .map_err(|e| AppointmentError::Validation(format!("appointment_time: {}", e)))?;
        if time.is_end_of_day() {
            return Err(AppointmentError::Validation(
                "appointment_time 24:00 is only valid as a schedule end time".to_string(),
            ));
        }

        if let Some(fee) = request.consultation_fee {
            if !fee.is_finite() || fee < 0.0 {
                return Err(AppointmentError::Validation(
                    "consultation_fee must be a non-negative amount".to_string(),
                ));
            }
        }

        let rules = &self.validation_rules;
        check_length("reason", request.reason.as_deref(), rules.max_reason_length)?;
        check_length("doctor_name", request.doctor_name.as_deref(), rules.max_label_length)?;
        check_length("specialty", request.specialty.as_deref(), rules.max_label_length)?;

        Ok((date, time))
    }

    // ==========================================================================
    // LISTINGS
    // ==========================================================================

    pub async fn patient_appointments(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.appointments.list_for_patient(patient_id).await?)
    }

    pub async fn doctor_appointments(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.appointments.list_for_doctor(doctor_id).await?)
    }

    // ==========================================================================
    // LIFECYCLE
    // ==========================================================================

    pub async fn cancel_as_patient(
        &self,
        patient_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        if appointment.patient_id != patient_id {
            return Err(AppointmentError::Forbidden);
        }

        self.lifecycle_service
            .validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        let changes = AppointmentChanges {
            status: Some(AppointmentStatus::Cancelled),
            doctor_notes: None,
        };
        let cancelled = self.apply(&appointment, changes).await?;

        info!("Appointment {} cancelled by patient {}", appointment_id, patient_id);
        Ok(cancelled)
    }

    pub async fn delete_as_patient(
        &self,
        patient_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<(), AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        if appointment.patient_id != patient_id {
            return Err(AppointmentError::Forbidden);
        }

        if !self.appointments.delete(appointment_id).await? {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} deleted by patient {}", appointment_id, patient_id);
        Ok(())
    }

    /// Doctor-side edit: notes are always editable, status follows the
    /// lifecycle rules. Re-sending the current status is not a transition.
    pub async fn update_as_doctor(
        &self,
        doctor_id: Uuid,
        appointment_id: Uuid,
        request: DoctorUpdateRequest,
    ) -> Result<Appointment, AppointmentError> {
        if request.doctor_notes.is_none() && request.status.is_none() {
            return Err(AppointmentError::Validation(
                "Provide doctor_notes and/or status".to_string(),
            ));
        }
        check_length(
            "doctor_notes",
            request.doctor_notes.as_deref(),
            self.validation_rules.max_notes_length,
        )?;

        let appointment = self.load(appointment_id).await?;
        if appointment.doctor_id != doctor_id {
            return Err(AppointmentError::Forbidden);
        }

        let target = request.status.filter(|status| *status != appointment.status);
        if let Some(target) = target {
            self.lifecycle_service
                .validate_status_transition(appointment.status, target)?;
        }

        let changes = AppointmentChanges {
            status: target,
            doctor_notes: request.doctor_notes,
        };
        let updated = self.apply(&appointment, changes).await?;

        info!(
            "Appointment {} updated by doctor {} (status {})",
            appointment_id, doctor_id, updated.status
        );
        Ok(updated)
    }

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Compare-and-set against the status we validated. Losing means someone
    /// else moved the appointment first.
    async fn apply(
        &self,
        appointment: &Appointment,
        changes: AppointmentChanges,
    ) -> Result<Appointment, AppointmentError> {
        let target = changes.status;

        if let Some(updated) = self
            .appointments
            .transition(appointment.id, appointment.status, changes)
            .await?
        {
            return Ok(updated);
        }

        let current = self.load(appointment.id).await?;
        warn!(
            "Appointment {} changed concurrently: expected {}, found {}",
            appointment.id, appointment.status, current.status
        );
        Err(AppointmentError::InvalidStatusTransition {
            from: current.status,
            to: target.unwrap_or(appointment.status),
        })
    }
}

fn check_length(field: &str, value: Option<&str>, max: usize) -> Result<(), AppointmentError> {
    match value {
        Some(text) if text.chars().count() > max => Err(AppointmentError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}
