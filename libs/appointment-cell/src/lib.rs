pub mod handlers;
pub mod router;
pub mod models;
pub mod services;
pub mod store;

pub use models::{Appointment, AppointmentError, AppointmentStatus};
pub use router::{appointment_routes, AppointmentState};
pub use services::allocator::{compute_available_slots, SlotInterval};
pub use services::booking::AppointmentBookingService;
pub use services::locks::SlotLocks;
pub use store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
