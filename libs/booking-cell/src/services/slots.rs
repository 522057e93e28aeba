use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use schedule_cell::models::{ExceptionEvent, WeeklyScheduleEntry};
use schedule_cell::services::exceptions::effective_blocks;

use crate::models::{BookedAppointment, Slot};

/// Derives every bookable slot in `[range_start, range_end]` (dates
/// inclusive) from the weekly template, minus exceptions, minus slots
/// overlapping an active booking. Pure and deterministic: identical
/// inputs yield identical, identically-ordered output.
///
/// Slots are emitted chronologically and generation stops at `limit`
/// without disturbing the order.
pub fn generate_slots(
    range_start: NaiveDate,
    range_end: NaiveDate,
    template: &[WeeklyScheduleEntry],
    exceptions: &[ExceptionEvent],
    booked: &[BookedAppointment],
    duration_override: Option<i32>,
    limit: usize,
) -> Vec<Slot> {
    let mut slots = Vec::new();
    if limit == 0 {
        return slots;
    }

    let mut date = range_start;
    while date <= range_end {
        for slot in slots_for_day(date, template, exceptions, booked, duration_override) {
            slots.push(slot);
            if slots.len() >= limit {
                debug!("Slot generation capped at {} slots", limit);
                return slots;
            }
        }
        let Some(next) = date.succ_opt() else {
            break;
        };
        date = next;
    }

    slots
}

/// Slots for a single date. Step 1-4 of the generation algorithm: weekday
/// lookup, exception resolution, duration-aligned walk per block, booked
/// overlap filter. Trailing partials that would spill past a block's end
/// are dropped; a slot is never shorter than the configured duration.
pub fn slots_for_day(
    date: NaiveDate,
    template: &[WeeklyScheduleEntry],
    exceptions: &[ExceptionEvent],
    booked: &[BookedAppointment],
    duration_override: Option<i32>,
) -> Vec<Slot> {
    let Some(entry) = template.iter().find(|e| e.weekday == date.weekday()) else {
        return Vec::new();
    };
    if !entry.enabled {
        // Stale blocks on a disabled day never produce slots.
        return Vec::new();
    }

    let duration_minutes = duration_override.unwrap_or(entry.slot_duration);
    if duration_minutes <= 0 {
        return Vec::new();
    }
    // Durations longer than a day can never fit a block.
    let Ok(stride) = u16::try_from(duration_minutes) else {
        return Vec::new();
    };
    let duration = Duration::minutes(duration_minutes as i64);

    let mut slots = Vec::new();
    for block in effective_blocks(date, entry, exceptions) {
        let mut cursor = block.start;
        loop {
            let Some(slot_end) = cursor.checked_add(stride) else {
                break;
            };
            if slot_end > block.end {
                break;
            }

            let start_time = cursor.on_date(date);
            let end_time = start_time + duration;

            let taken = booked
                .iter()
                .any(|b| b.status.blocks_slots() && b.overlaps(start_time, end_time));
            if !taken {
                slots.push(Slot {
                    start_time,
                    end_time,
                    duration_minutes,
                });
            }

            cursor = slot_end;
        }
    }

    slots
}
