use chrono::Datelike;
use tracing::debug;

use crate::models::{
    weekday_name, RecurrenceFrequency, UpsertExceptionRequest, ValidationResult,
    WeeklyScheduleEntry, WEEK,
};

/// Blocks shorter than this are flagged as probably unintended.
const SHORT_BLOCK_WARNING_MINUTES: i32 = 30;
const MIN_SANE_SLOT_DURATION: i32 = 5;
const MAX_SANE_SLOT_DURATION: i32 = 240;

/// Structural validation of a full weekly template. Pure; the caller
/// decides what to do with the result. Errors must block persistence,
/// warnings must not.
pub fn validate_weekly_schedule(entries: &[WeeklyScheduleEntry]) -> ValidationResult {
    let mut result = ValidationResult::default();

    for entry in entries {
        validate_day(entry, &mut result);
    }

    // One entry per weekday. Duplicates are ambiguous (reads pick one row
    // arbitrarily) so they block the save; a missing weekday merely falls
    // back to disabled on read.
    for &weekday in &WEEK {
        let count = entries.iter().filter(|e| e.weekday == weekday).count();
        if count > 1 {
            result.error(
                weekday_name(weekday),
                format!("weekday appears {} times; each weekday may appear only once", count),
            );
        } else if count == 0 {
            result.warning(
                weekday_name(weekday),
                "weekday is missing and will be treated as disabled",
            );
        }
    }

    if !entries.iter().any(|e| e.enabled) {
        result.warning("schedule", "no days are enabled; no slots will be offered");
    }

    debug!(
        "Validated weekly schedule: {} errors, {} warnings",
        result.errors.len(),
        result.warnings.len()
    );
    result
}

fn validate_day(entry: &WeeklyScheduleEntry, result: &mut ValidationResult) {
    let day = weekday_name(entry.weekday);

    if !entry.enabled {
        // Disabled days contribute nothing; stale blocks are tolerated.
        return;
    }

    if entry.blocks.is_empty() {
        result.error(day, "day is enabled but has no time blocks defined");
        return;
    }

    let blocks = entry.sorted_blocks();

    for block in &blocks {
        if !block.is_well_formed() {
            result.error(
                day,
                format!("invalid block {}-{}: end must be after start", block.start, block.end),
            );
        } else if block.duration_minutes() < SHORT_BLOCK_WARNING_MINUTES {
            result.warning(
                day,
                format!(
                    "block {}-{} is unusually short ({} minutes)",
                    block.start,
                    block.end,
                    block.duration_minutes()
                ),
            );
        }
    }

    for pair in blocks.windows(2) {
        if pair[1].start < pair[0].end {
            result.error(
                day,
                format!(
                    "blocks {}-{} and {}-{} overlap",
                    pair[0].start, pair[0].end, pair[1].start, pair[1].end
                ),
            );
        }
    }

    if entry.slot_duration <= 0 {
        result.error(day, "slot duration must be a positive number of minutes");
    } else if entry.slot_duration < MIN_SANE_SLOT_DURATION
        || entry.slot_duration > MAX_SANE_SLOT_DURATION
    {
        result.warning(
            day,
            format!(
                "slot duration of {} minutes is outside the usual {}-{} range",
                entry.slot_duration, MIN_SANE_SLOT_DURATION, MAX_SANE_SLOT_DURATION
            ),
        );
    }
}

/// Validation of a single exception event before it is saved. The
/// doctor's template (when available) drives the advisory check for
/// blocked time that never intersects a working day.
pub fn validate_exception(
    request: &UpsertExceptionRequest,
    template: &[WeeklyScheduleEntry],
) -> ValidationResult {
    let mut result = ValidationResult::default();
    let subject = if request.title.trim().is_empty() {
        "exception"
    } else {
        request.title.as_str()
    };

    if request.title.trim().is_empty() {
        result.error(subject, "exception title is required");
    }

    if request.end_time <= request.start_time {
        result.error(subject, "exception end time must be after its start time");
    }

    if result.is_valid()
        && request.blocks_appointments
        && !template.is_empty()
        && !touches_enabled_day(request, template)
    {
        result.warning(
            subject,
            "exception falls entirely outside the weekly schedule; it blocks no slots",
        );
    }

    result
}

/// Whether any date the exception touches lands on an enabled weekday.
fn touches_enabled_day(request: &UpsertExceptionRequest, template: &[WeeklyScheduleEntry]) -> bool {
    let enabled = |weekday| {
        template
            .iter()
            .any(|e| e.weekday == weekday && e.enabled)
    };

    if let Some(recurrence) = &request.recurrence {
        match recurrence.pattern {
            // Weekly series with explicit days hit exactly those weekdays.
            RecurrenceFrequency::Weekly if !recurrence.days_of_week.is_empty() => {
                return recurrence.days_of_week.iter().any(|&w| enabled(w));
            }
            // Daily series sweep the whole week; monthly drift across
            // weekdays. Neither can be pinned down, so no advisory.
            RecurrenceFrequency::Daily | RecurrenceFrequency::Monthly => return true,
            RecurrenceFrequency::Weekly => {}
        }
    }

    let mut date = request.start_time.date_naive();
    let last = request.end_time.date_naive();
    for _ in 0..7 {
        if date > last {
            return false;
        }
        if enabled(date.weekday()) {
            return true;
        }
        let Some(next) = date.succ_opt() else {
            return false;
        };
        date = next;
    }
    // A span of a week or more touches every weekday.
    true
}
