use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use doctor_cell::models::{DoctorSchedule, ScheduleEntry};
use shared_models::clock::{ClockTime, MINUTES_PER_DAY};

/// Width of one bookable slot. Zero and whole-day intervals are not
/// representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotInterval(u16);

impl SlotInterval {
    pub const DEFAULT: SlotInterval = SlotInterval(20);

    pub fn new(minutes: u16) -> Option<Self> {
        (minutes > 0 && minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl Default for SlotInterval {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Every slot label of one working window, ascending.
///
/// A slot is only offered when it fits entirely inside the window, so the
/// last label is the latest start with `label + interval <= end_time` and
/// `end_time` itself is never produced.
pub fn generate_slots(entry: &ScheduleEntry, interval: SlotInterval) -> Vec<ClockTime> {
    let step = interval.minutes();
    let end = entry.end_time.minute_of_day();

    std::iter::successors(Some(entry.start_time.minute_of_day()), |minute| Some(minute + step))
        .take_while(|minute| minute + step <= end)
        .filter_map(ClockTime::from_minute_of_day)
        .collect()
}

/// Free slot labels for `date`: the doctor's window for that weekday minus
/// the times already taken. A day without a schedule entry yields nothing.
pub fn compute_available_slots(
    schedule: &DoctorSchedule,
    date: NaiveDate,
    booked_times: &BTreeSet<ClockTime>,
    interval: SlotInterval,
) -> Vec<ClockTime> {
    match schedule.entry_for_date(date) {
        Some(entry) => generate_slots(entry, interval)
            .into_iter()
            .filter(|slot| !booked_times.contains(slot))
            .collect(),
        None => Vec::new(),
    }
}

/// Whether `time` is one of the labels the schedule produces on `date`,
/// ignoring bookings.
pub fn is_offered(
    schedule: &DoctorSchedule,
    date: NaiveDate,
    time: ClockTime,
    interval: SlotInterval,
) -> bool {
    schedule
        .entry_for_date(date)
        .is_some_and(|entry| generate_slots(entry, interval).binary_search(&time).is_ok())
}
