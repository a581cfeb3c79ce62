pub mod handlers;
pub mod router;
pub mod models;
pub mod services;
pub mod store;

pub use models::{DayOfWeek, DoctorError, DoctorSchedule, ScheduleEntry, ScheduleError};
pub use router::{doctor_routes, DoctorState};
pub use services::ScheduleService;
pub use store::{InMemoryScheduleStore, ScheduleStore, SupabaseScheduleStore};
