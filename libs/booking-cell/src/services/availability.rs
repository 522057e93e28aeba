use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use schedule_cell::services::{exceptions::ExceptionService, template::TemplateService};

use crate::error::BookingError;
use crate::models::{BookedAppointment, Slot, SlotQuery};
use crate::services::slots::generate_slots;

/// Gathers the three inputs of slot generation (weekly template, exception
/// calendar, booked appointments) and runs the generator over them. Any
/// failed lookup fails the whole query; an empty slot list only ever means
/// "nothing available", never "could not check".
pub struct AvailabilityService {
    supabase: SupabaseClient,
    template_service: TemplateService,
    exception_service: ExceptionService,
    anon_key: String,
    max_slots: usize,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            template_service: TemplateService::new(config),
            exception_service: ExceptionService::new(config),
            anon_key: config.supabase_anon_key.clone(),
            max_slots: config.max_slots_per_query,
        }
    }

    pub async fn find_available_slots(
        &self,
        doctor_id: &str,
        query: &SlotQuery,
    ) -> Result<Vec<Slot>, BookingError> {
        if query.end_date < query.start_date {
            return Err(BookingError::InvalidRequest(
                "endDate must not precede startDate".to_string(),
            ));
        }
        if let Some(duration) = query.duration_minutes {
            if duration <= 0 {
                return Err(BookingError::InvalidRequest(
                    "durationMinutes must be positive".to_string(),
                ));
            }
        }

        debug!(
            "Finding slots for doctor {} in {}..={}",
            doctor_id, query.start_date, query.end_date
        );

        let template = self
            .template_service
            .get_weekly_template(doctor_id, &self.anon_key)
            .await?;

        let exceptions = self
            .exception_service
            .list_exceptions(doctor_id, query.start_date, query.end_date, &self.anon_key)
            .await?;

        let booked = self
            .booked_appointments(doctor_id, query.start_date, query.end_date)
            .await?;

        let limit = query
            .limit
            .map_or(self.max_slots, |l| l.min(self.max_slots));

        let slots = generate_slots(
            query.start_date,
            query.end_date,
            &template,
            &exceptions,
            &booked,
            query.duration_minutes,
            limit,
        );

        info!(
            "Doctor {} has {} available slot(s) in {}..={}",
            doctor_id,
            slots.len(),
            query.start_date,
            query.end_date
        );
        Ok(slots)
    }

    /// Appointments intersecting `[from, to]` (dates inclusive), all
    /// statuses. The generator decides which statuses actually block.
    pub async fn booked_appointments(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BookedAppointment>, BookingError> {
        let range_start = day_start(from)?;
        let range_end = day_start(to + Duration::days(1))?;

        let path = format!(
            "/rest/v1/appointments?doctorId=eq.{}&startTime=lt.{}&endTime=gt.{}&order=startTime.asc",
            doctor_id,
            range_end.to_rfc3339(),
            range_start.to_rfc3339(),
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
}

fn day_start(date: NaiveDate) -> Result<DateTime<Utc>, BookingError> {
    date.and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| BookingError::InvalidRequest("invalid date".to_string()))
}
