use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{BookSlotRequest, SlotQuery};
use crate::services::{availability::AvailabilityService, conflict::ConflictGuardService};

#[axum::debug_handler]
pub async fn find_available_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let slots = availability_service
        .find_available_slots(&doctor_id, &query)
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "doctorId": doctor_id,
        "startDate": query.start_date,
        "endDate": query.end_date,
        "slots": slots,
    })))
}

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<BookSlotRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let conflict_guard = ConflictGuardService::new(&state);

    let booking = conflict_guard
        .reserve(&doctor_id, &request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok((StatusCode::CREATED, Json(json!(booking))))
}
