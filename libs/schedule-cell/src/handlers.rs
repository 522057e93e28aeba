use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::error::ScheduleError;
use crate::models::{UpsertExceptionRequest, WeeklyScheduleEntry};
use crate::services::{exceptions::ExceptionService, template::TemplateService};

#[derive(Debug, Deserialize)]
pub struct ExceptionRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[axum::debug_handler]
pub async fn get_weekly_template(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let template_service = TemplateService::new(&state);

    let template = template_service
        .get_weekly_template(&doctor_id, &state.supabase_anon_key)
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "doctorId": doctor_id,
        "weeklySchedule": template,
    })))
}

#[axum::debug_handler]
pub async fn save_weekly_template(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(entries): Json<Vec<WeeklyScheduleEntry>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let template_service = TemplateService::new(&state);

    let validation = template_service
        .save_weekly_template(&doctor_id, &entries, auth.token())
        .await
        .map_err(AppError::from)?;

    if !validation.is_valid() {
        // The write was rejected wholesale; hand back the itemized list.
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "saved": false,
                "errors": validation.errors,
                "warnings": validation.warnings,
            })),
        ));
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "saved": true,
            "errors": [],
            "warnings": validation.warnings,
        })),
    ))
}

#[axum::debug_handler]
pub async fn clear_weekly_template(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let template_service = TemplateService::new(&state);

    template_service
        .clear_weekly_template(&doctor_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({ "message": "Weekly schedule cleared" })))
}

#[axum::debug_handler]
pub async fn list_exceptions(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(range): Query<ExceptionRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let exception_service = ExceptionService::new(&state);

    let exceptions = exception_service
        .list_exceptions(&doctor_id, range.start, range.end, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({ "exceptions": exceptions })))
}

#[axum::debug_handler]
pub async fn upsert_exception(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpsertExceptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let exception_service = ExceptionService::new(&state);

    match exception_service
        .upsert_exception(&doctor_id, request, auth.token())
        .await
    {
        Ok((event, validation)) => Ok((
            StatusCode::OK,
            Json(json!({
                "event": event,
                "warnings": validation.warnings,
            })),
        )),
        Err(ScheduleError::Validation(result)) => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "saved": false,
                "errors": result.errors,
                "warnings": result.warnings,
            })),
        )),
        Err(e) => Err(AppError::from(e)),
    }
}

#[axum::debug_handler]
pub async fn delete_exception(
    State(state): State<Arc<AppConfig>>,
    Path((doctor_id, exception_id)): Path<(String, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let exception_service = ExceptionService::new(&state);

    exception_service
        .delete_exception(&doctor_id, exception_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({ "message": "Exception deleted" })))
}
