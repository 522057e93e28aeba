use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::ScheduleError;
use crate::models::{
    weekday_from_name, weekday_name, ValidationResult, WeeklyScheduleEntry, WEEK,
};
use crate::services::validator::validate_weekly_schedule;

pub struct TemplateService {
    supabase: SupabaseClient,
}

impl TemplateService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// The doctor's weekly template, always a full Monday..Sunday set.
    /// Weekdays without a stored row come back disabled, so a cleared or
    /// never-saved schedule offers no slots.
    pub async fn get_weekly_template(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<WeeklyScheduleEntry>, ScheduleError> {
        debug!("Fetching weekly template for doctor {}", doctor_id);

        let path = format!(
            "/rest/v1/weekly_schedules?doctorId=eq.{}&select=weekday,enabled,blocks,slotDuration",
            doctor_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::Store(e.to_string()))?;

        if rows.is_empty() {
            debug!("Doctor {} has no saved template", doctor_id);
            return Ok(crate::models::disabled_week());
        }

        let mut stored: Vec<WeeklyScheduleEntry> = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<WeeklyScheduleEntry>(row) {
                Ok(entry) => stored.push(entry),
                Err(e) => {
                    warn!("Skipping malformed weekly schedule row for {}: {}", doctor_id, e);
                }
            }
        }

        // Assemble in fixed Monday..Sunday order regardless of row order.
        let template = WEEK
            .iter()
            .map(|&weekday| {
                stored
                    .iter()
                    .find(|e| e.weekday == weekday)
                    .cloned()
                    .unwrap_or_else(|| WeeklyScheduleEntry::disabled(weekday))
            })
            .collect();

        Ok(template)
    }

    /// Validates and persists a full weekly template. Any validation error
    /// rejects the whole write; the returned result carries the itemized
    /// errors/warnings either way. Submitted weekdays are upserted in one
    /// request keyed on (doctorId, weekday), then rows for weekdays no
    /// longer present are pruned. Write-before-prune: a failure between
    /// the two leaves the previous schedule readable, never destroyed.
    /// Bulk edits like "copy to all days" and "clear all" are just
    /// ordinary saves.
    pub async fn save_weekly_template(
        &self,
        doctor_id: &str,
        entries: &[WeeklyScheduleEntry],
        auth_token: &str,
    ) -> Result<ValidationResult, ScheduleError> {
        let validation = validate_weekly_schedule(entries);
        if !validation.is_valid() {
            debug!(
                "Rejecting weekly template for doctor {}: {} validation error(s)",
                doctor_id,
                validation.errors.len()
            );
            return Ok(validation);
        }

        let rows: Vec<Value> = entries
            .iter()
            .map(|entry| {
                json!({
                    "doctorId": doctor_id,
                    "weekday": weekday_name(entry.weekday),
                    "enabled": entry.enabled,
                    "blocks": entry.blocks,
                    "slotDuration": entry.slot_duration,
                    "updatedAt": Utc::now().to_rfc3339(),
                })
            })
            .collect();

        if !rows.is_empty() {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                "Prefer",
                reqwest::header::HeaderValue::from_static(
                    "return=representation,resolution=merge-duplicates",
                ),
            );

            let written: Vec<Value> = self
                .supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/weekly_schedules?on_conflict=doctorId,weekday",
                    Some(auth_token),
                    Some(Value::Array(rows)),
                    Some(headers),
                )
                .await
                .map_err(|e| ScheduleError::Store(e.to_string()))?;

            if written.is_empty() {
                return Err(ScheduleError::Store(
                    "weekly template write returned no rows".to_string(),
                ));
            }
        }

        let prune_path = if entries.is_empty() {
            format!("/rest/v1/weekly_schedules?doctorId=eq.{}", doctor_id)
        } else {
            let kept: Vec<&str> = entries.iter().map(|e| weekday_name(e.weekday)).collect();
            format!(
                "/rest/v1/weekly_schedules?doctorId=eq.{}&weekday=not.in.({})",
                doctor_id,
                kept.join(",")
            )
        };
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &prune_path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::Store(e.to_string()))?;

        debug!("Saved weekly template for doctor {}", doctor_id);
        Ok(validation)
    }

    /// Clears every stored weekday for the doctor. Equivalent to saving an
    /// all-disabled template; future queries fall back to disabled days.
    pub async fn clear_weekly_template(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<(), ScheduleError> {
        debug!("Clearing weekly template for doctor {}", doctor_id);

        let path = format!("/rest/v1/weekly_schedules?doctorId=eq.{}", doctor_id);
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| ScheduleError::Store(e.to_string()))?;

        Ok(())
    }
}

/// Looks up the template entry for a given weekday name, used by handlers
/// that accept the payload's string form.
pub fn entry_for_weekday<'a>(
    entries: &'a [WeeklyScheduleEntry],
    weekday: &str,
) -> Option<&'a WeeklyScheduleEntry> {
    let weekday = weekday_from_name(weekday)?;
    entries.iter().find(|e| e.weekday == weekday)
}
