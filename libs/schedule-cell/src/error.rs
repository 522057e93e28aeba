use thiserror::Error;

use shared_models::error::AppError;

use crate::models::ValidationResult;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Schedule validation failed with {} error(s)", .0.errors.len())]
    Validation(ValidationResult),

    #[error("Exception not found: {0}")]
    ExceptionNotFound(String),

    #[error("Schedule store error: {0}")]
    Store(String),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Validation(result) => {
                // Handlers that want the itemized list return it themselves;
                // this fallback keeps the summary readable.
                let detail = result
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.subject, e.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                AppError::ValidationError(detail)
            }
            ScheduleError::ExceptionNotFound(msg) => AppError::NotFound(msg),
            ScheduleError::Store(msg) => AppError::UpstreamUnavailable(msg),
        }
    }
}
