use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::ScheduleError;
use crate::models::{
    ExceptionEvent, RecurrenceFrequency, TimeBlock, TimeOfDay, UpsertExceptionRequest,
    ValidationResult, WeeklyScheduleEntry,
};
use crate::services::template::TemplateService;
use crate::services::validator::validate_exception;

/// Safety cap on series expansion steps, one year of daily occurrences.
const MAX_EXPANSION_STEPS: usize = 365;

/// Resolves one date of a weekly template against the exception calendar.
/// Pure interval arithmetic: blocking exceptions are subtracted from the
/// day's working blocks, splitting blocks where an exception lands in the
/// middle. Exceptions always win over the template.
pub fn effective_blocks(
    date: NaiveDate,
    entry: &WeeklyScheduleEntry,
    exceptions: &[ExceptionEvent],
) -> Vec<TimeBlock> {
    if !entry.enabled {
        return Vec::new();
    }

    let mut blocks = entry.sorted_blocks();
    blocks.retain(|b| b.is_well_formed());

    for exception in exceptions.iter().filter(|e| e.is_blocking()) {
        let Some(window) = exception.window_on(date) else {
            continue;
        };
        blocks = blocks.iter().flat_map(|b| b.subtract(&window)).collect();
        if blocks.is_empty() {
            break;
        }
    }

    blocks
}

/// Concrete occurrences of an exception intersecting `[from, to]` (dates
/// inclusive). A non-recurring event passes through unchanged when it
/// touches the range; a recurring one is unrolled into dated copies with
/// the series marker stripped, so downstream resolution treats every
/// occurrence as an ordinary event.
pub fn expand_occurrences(
    event: &ExceptionEvent,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<ExceptionEvent> {
    let range_start = TimeOfDay::MIDNIGHT.on_date(from);
    let range_end = TimeOfDay::END_OF_DAY.on_date(to);

    let Some(recurrence) = event.recurrence.clone() else {
        if event.start_time < range_end && event.end_time > range_start {
            return vec![event.clone()];
        }
        return Vec::new();
    };

    // The series stops at its own end date (inclusive) or the queried
    // range, whichever comes first.
    let series_end = recurrence
        .end_date
        .map(|d| TimeOfDay::END_OF_DAY.on_date(d))
        .map_or(range_end, |e| e.min(range_end));

    let base_date = event.start_time.date_naive();
    let start_offset = event.start_time - TimeOfDay::MIDNIGHT.on_date(base_date);
    let duration = event.end_time - event.start_time;

    let weekdays: Vec<Weekday> = if !recurrence.days_of_week.is_empty() {
        recurrence.days_of_week.clone()
    } else {
        vec![base_date.weekday()]
    };

    let mut occurrences = Vec::new();
    let mut date = base_date;

    for _ in 0..MAX_EXPANSION_STEPS {
        let start = TimeOfDay::MIDNIGHT.on_date(date) + start_offset;
        if start >= series_end {
            break;
        }

        let on_pattern = match recurrence.pattern {
            RecurrenceFrequency::Daily | RecurrenceFrequency::Monthly => true,
            RecurrenceFrequency::Weekly => weekdays.contains(&date.weekday()),
        };
        let end = start + duration;
        if on_pattern && end > range_start {
            occurrences.push(ExceptionEvent {
                id: Uuid::new_v4(),
                start_time: start,
                end_time: end,
                recurrence: None,
                ..event.clone()
            });
        }

        let next = match recurrence.pattern {
            RecurrenceFrequency::Daily | RecurrenceFrequency::Weekly => date.succ_opt(),
            RecurrenceFrequency::Monthly => next_month_with_day(date, base_date.day()),
        };
        let Some(next) = next else {
            break;
        };
        date = next;
    }

    occurrences
}

/// The next month (after `date`'s) that contains `day`, keeping the
/// series on its day-of-month; months without that day are skipped.
fn next_month_with_day(date: NaiveDate, day: u32) -> Option<NaiveDate> {
    let (mut year, mut month) = (date.year(), date.month());
    for _ in 0..12 {
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
        if let Some(next) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(next);
        }
    }
    None
}

pub struct ExceptionService {
    supabase: SupabaseClient,
    template_service: TemplateService,
}

impl ExceptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            template_service: TemplateService::new(config),
        }
    }

    /// Exceptions whose occurrences intersect `[from, to]` (dates
    /// inclusive), recurring series unrolled, in chronological order.
    pub async fn list_exceptions(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<ExceptionEvent>, ScheduleError> {
        debug!("Listing exceptions for doctor {} in {}..={}", doctor_id, from, to);

        let range_start = from.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
        let range_end = (to + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc());
        let (Some(range_start), Some(range_end)) = (range_start, range_end) else {
            return Err(ScheduleError::Store("invalid date range".to_string()));
        };

        // Plain events can be range-filtered in the store; recurring rows
        // must come back regardless of their base date since occurrences
        // may land far from it.
        let plain_path = format!(
            "/rest/v1/schedule_exceptions?doctorId=eq.{}&recurrence=is.null&startTime=lt.{}&endTime=gt.{}&order=startTime.asc",
            doctor_id,
            range_end.to_rfc3339(),
            range_start.to_rfc3339(),
        );
        let recurring_path = format!(
            "/rest/v1/schedule_exceptions?doctorId=eq.{}&recurrence=not.is.null",
            doctor_id,
        );

        let plain = self.fetch_events(&plain_path, auth_token).await?;
        let recurring = self.fetch_events(&recurring_path, auth_token).await?;

        let mut events: Vec<ExceptionEvent> = plain
            .into_iter()
            .filter(|e| e.recurrence.is_none())
            .flat_map(|e| expand_occurrences(&e, from, to))
            .chain(
                recurring
                    .into_iter()
                    .filter(|e| e.recurrence.is_some())
                    .flat_map(|e| expand_occurrences(&e, from, to)),
            )
            .collect();

        events.sort_by_key(|e| e.start_time);
        Ok(events)
    }

    async fn fetch_events(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<ExceptionEvent>, ScheduleError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::Store(e.to_string()))?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| ScheduleError::Store(e.to_string())))
            .collect()
    }

    /// Creates or updates an exception. Validation errors reject the write
    /// wholesale; advisory warnings are returned alongside the stored
    /// event. Editing an exception never touches existing bookings.
    pub async fn upsert_exception(
        &self,
        doctor_id: &str,
        request: UpsertExceptionRequest,
        auth_token: &str,
    ) -> Result<(ExceptionEvent, ValidationResult), ScheduleError> {
        // The template only feeds the advisory check; an unreadable
        // template must not block the write.
        let template = match self
            .template_service
            .get_weekly_template(doctor_id, auth_token)
            .await
        {
            Ok(template) => template,
            Err(e) => {
                warn!("Skipping template advisory for doctor {}: {}", doctor_id, e);
                Vec::new()
            }
        };

        let validation = validate_exception(&request, &template);
        if !validation.is_valid() {
            return Err(ScheduleError::Validation(validation));
        }

        let event_id = request.id.unwrap_or_else(Uuid::new_v4);
        let is_update = request.id.is_some();
        debug!(
            "{} exception {} for doctor {}",
            if is_update { "Updating" } else { "Creating" },
            event_id,
            doctor_id
        );

        let event_data = json!({
            "id": event_id,
            "doctorId": doctor_id,
            "title": request.title,
            "eventType": request.event_type,
            "startTime": request.start_time.to_rfc3339(),
            "endTime": request.end_time.to_rfc3339(),
            "allDay": request.all_day,
            "blocksAppointments": request.blocks_appointments,
            "recurrence": request.recurrence,
            "updatedAt": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation,resolution=merge-duplicates"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/schedule_exceptions",
                Some(auth_token),
                Some(event_data),
                Some(headers),
            )
            .await
            .map_err(|e| ScheduleError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::Store("exception write returned no row".to_string()))?;

        let event = serde_json::from_value(row).map_err(|e| ScheduleError::Store(e.to_string()))?;
        Ok((event, validation))
    }

    /// Removes an exception. Only future slot generation is affected;
    /// already-booked appointments stay untouched.
    pub async fn delete_exception(
        &self,
        doctor_id: &str,
        exception_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ScheduleError> {
        debug!("Deleting exception {} for doctor {}", exception_id, doctor_id);

        let path = format!(
            "/rest/v1/schedule_exceptions?id=eq.{}&doctorId=eq.{}",
            exception_id, doctor_id
        );
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::Store(e.to_string()))?;

        Ok(())
    }
}
