pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::BookingError;
pub use models::{BookSlotRequest, BookedAppointment, Booking, Slot, SlotQuery};
pub use router::booking_routes;
pub use services::slots::{generate_slots, slots_for_day};
