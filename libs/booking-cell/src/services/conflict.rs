use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use schedule_cell::services::{exceptions::ExceptionService, template::TemplateService};

use crate::error::BookingError;
use crate::models::{BookSlotRequest, Booking};
use crate::services::slots::slots_for_day;

/// Admits a booking only if the requested window is still a freshly
/// generated slot. Stale slot lists on the client side are the norm, so
/// the guard recomputes the requested day from scratch at booking time.
pub struct ConflictGuardService {
    supabase: SupabaseClient,
    template_service: TemplateService,
    exception_service: ExceptionService,
    anon_key: String,
}

impl ConflictGuardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            template_service: TemplateService::new(config),
            exception_service: ExceptionService::new(config),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    pub async fn reserve(
        &self,
        doctor_id: &str,
        request: &BookSlotRequest,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        if request.end_time <= request.start_time {
            return Err(BookingError::InvalidRequest(
                "endTime must follow startTime".to_string(),
            ));
        }

        let date = request.start_time.date_naive();
        debug!(
            "Checking slot {} - {} for doctor {}",
            request.start_time, request.end_time, doctor_id
        );

        // Recompute the day. The template's configured duration governs
        // here; query-time overrides never widen what can be booked.
        let template = self
            .template_service
            .get_weekly_template(doctor_id, &self.anon_key)
            .await?;
        let exceptions = self
            .exception_service
            .list_exceptions(doctor_id, date, date, &self.anon_key)
            .await?;
        let booked = self
            .booked_for_day(doctor_id, request)
            .await?;

        let still_open = slots_for_day(date, &template, &exceptions, &booked, None)
            .iter()
            .any(|s| s.start_time == request.start_time && s.end_time == request.end_time);

        if !still_open {
            warn!(
                "Rejected booking for doctor {}: {} - {} is not an open slot",
                doctor_id, request.start_time, request.end_time
            );
            return Err(BookingError::SlotConflict(format!(
                "{} - {} is not available",
                request.start_time, request.end_time
            )));
        }

        self.insert_booking(doctor_id, request, auth_token).await
    }

    async fn booked_for_day(
        &self,
        doctor_id: &str,
        request: &BookSlotRequest,
    ) -> Result<Vec<crate::models::BookedAppointment>, BookingError> {
        let path = format!(
            "/rest/v1/appointments?doctorId=eq.{}&startTime=lt.{}&endTime=gt.{}",
            doctor_id,
            request.end_time.to_rfc3339(),
            request.start_time.to_rfc3339(),
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(&self.anon_key), None)
            .await
            .map_err(|e| BookingError::Upstream(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| BookingError::Upstream(e.to_string()))
            })
            .collect()
    }

    async fn insert_booking(
        &self,
        doctor_id: &str,
        request: &BookSlotRequest,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let booking_data = json!({
            "doctorId": doctor_id,
            "patientId": request.patient_id,
            "startTime": request.start_time.to_rfc3339(),
            "endTime": request.end_time.to_rfc3339(),
            "status": "pending",
            "notes": request.notes,
            "createdAt": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        // A concurrent booking can still slip in between the check and the
        // insert; the store's exclusion constraint is the last line, and a
        // rejected insert reads as a conflict rather than a server fault.
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(booking_data),
                Some(headers),
            )
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    BookingError::SlotConflict(
                        "slot was taken by a concurrent booking".to_string(),
                    )
                } else {
                    BookingError::Upstream(e.to_string())
                }
            })?;

        let row = result.into_iter().next().ok_or_else(|| {
            BookingError::Upstream("booking insert returned no row".to_string())
        })?;

        let booking: Booking = serde_json::from_value(row)
            .map_err(|e| BookingError::Upstream(e.to_string()))?;

        info!(
            "Booked slot {} - {} for doctor {} (booking {})",
            booking.start_time, booking.end_time, doctor_id, booking.id
        );
        Ok(booking)
    }
}
