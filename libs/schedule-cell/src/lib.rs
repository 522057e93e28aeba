pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::ScheduleError;
pub use models::{
    ExceptionEvent, ExceptionKind, RecurrenceFrequency, RecurrencePattern, TimeBlock,
    TimeOfDay, UpsertExceptionRequest, ValidationIssue, ValidationResult,
    WeeklyScheduleEntry,
};
pub use services::exceptions::{effective_blocks, expand_occurrences};
pub use services::validator::{validate_exception, validate_weekly_schedule};
