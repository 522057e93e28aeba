use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum BookingError {
    /// The requested slot is no longer free. Transient; the caller should
    /// re-query and pick another slot.
    #[error("Slot is no longer available: {0}")]
    SlotConflict(String),

    #[error("Invalid booking request: {0}")]
    InvalidRequest(String),

    /// A template, exception or booking lookup failed. Slots are never
    /// synthesized from partial data, so the whole query fails.
    #[error("Upstream data unavailable: {0}")]
    Upstream(String),
}

impl From<schedule_cell::ScheduleError> for BookingError {
    fn from(err: schedule_cell::ScheduleError) -> Self {
        BookingError::Upstream(err.to_string())
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::SlotConflict(msg) => AppError::Conflict(msg),
            BookingError::InvalidRequest(msg) => AppError::BadRequest(msg),
            BookingError::Upstream(msg) => AppError::UpstreamUnavailable(msg),
        }
    }
}
