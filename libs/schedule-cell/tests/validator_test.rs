use chrono::{NaiveDate, Utc, Weekday};

use schedule_cell::models::{
    default_week, disabled_week, ExceptionKind, RecurrenceFrequency, RecurrencePattern,
    TimeBlock, TimeOfDay, UpsertExceptionRequest, WeeklyScheduleEntry,
};
use schedule_cell::{validate_exception, validate_weekly_schedule};

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn block(start: &str, end: &str) -> TimeBlock {
    TimeBlock::new(t(start), t(end))
}

fn day(weekday: Weekday, blocks: Vec<TimeBlock>, slot_duration: i32) -> WeeklyScheduleEntry {
    WeeklyScheduleEntry {
        weekday,
        enabled: true,
        blocks,
        slot_duration,
    }
}

#[test]
fn default_week_is_valid() {
    let result = validate_weekly_schedule(&default_week());

    assert!(result.is_valid());
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
}

#[test]
fn enabled_day_without_blocks_is_an_error() {
    let mut entries = disabled_week();
    entries[0].enabled = true;

    let result = validate_weekly_schedule(&entries);

    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.subject == "Monday"));
}

#[test]
fn inverted_block_is_an_error() {
    let entries = vec![day(Weekday::Mon, vec![block("17:00", "09:00")], 30)];

    let result = validate_weekly_schedule(&entries);

    assert!(!result.is_valid());
    assert!(result.errors[0].message.contains("end must be after start"));
}

#[test]
fn zero_length_block_is_an_error() {
    let entries = vec![day(Weekday::Mon, vec![block("09:00", "09:00")], 30)];

    assert!(!validate_weekly_schedule(&entries).is_valid());
}

#[test]
fn overlapping_blocks_are_an_error() {
    let entries = vec![day(
        Weekday::Tue,
        vec![block("09:00", "12:00"), block("11:30", "17:00")],
        30,
    )];

    let result = validate_weekly_schedule(&entries);

    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.message.contains("overlap")));
}

#[test]
fn touching_blocks_do_not_overlap() {
    // Half-open intervals: [09:00,12:00) and [12:00,17:00) are disjoint.
    let entries = vec![day(
        Weekday::Wed,
        vec![block("09:00", "12:00"), block("12:00", "17:00")],
        30,
    )];

    assert!(validate_weekly_schedule(&entries).is_valid());
}

#[test]
fn overlap_detected_regardless_of_block_order() {
    let entries = vec![day(
        Weekday::Thu,
        vec![block("11:30", "17:00"), block("09:00", "12:00")],
        30,
    )];

    assert!(!validate_weekly_schedule(&entries).is_valid());
}

#[test]
fn short_block_is_a_warning_not_an_error() {
    let entries = vec![day(Weekday::Fri, vec![block("09:00", "09:20")], 15)];

    let result = validate_weekly_schedule(&entries);

    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.message.contains("short")));
}

#[test]
fn non_positive_slot_duration_is_an_error() {
    let entries = vec![day(Weekday::Mon, vec![block("09:00", "17:00")], 0)];

    assert!(!validate_weekly_schedule(&entries).is_valid());
}

#[test]
fn unusual_slot_duration_is_a_warning() {
    let entries = vec![day(Weekday::Mon, vec![block("09:00", "17:00")], 300)];

    let result = validate_weekly_schedule(&entries);

    assert!(result.is_valid());
    assert!(!result.warnings.is_empty());
}

#[test]
fn all_disabled_week_is_valid_with_warning() {
    let result = validate_weekly_schedule(&disabled_week());

    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.subject == "schedule"));
}

#[test]
fn disabled_day_tolerates_stale_blocks() {
    let mut entries = disabled_week();
    entries[5].blocks = vec![block("17:00", "09:00")];

    assert!(validate_weekly_schedule(&entries).is_valid());
}

#[test]
fn duplicate_weekday_entries_are_an_error() {
    // Two Monday rows whose blocks overlap 11:00-12:00. Each row is fine
    // on its own; the duplication itself must block the save.
    let entries = vec![
        day(Weekday::Mon, vec![block("09:00", "12:00")], 30),
        day(Weekday::Mon, vec![block("11:00", "17:00")], 30),
    ];

    let result = validate_weekly_schedule(&entries);

    assert!(!result.is_valid());
    assert!(result
        .errors
        .iter()
        .any(|e| e.subject == "Monday" && e.message.contains("only once")));
}

#[test]
fn duplicate_disabled_weekday_is_still_an_error() {
    let mut entries = default_week();
    entries.push(WeeklyScheduleEntry::disabled(Weekday::Fri));

    assert!(!validate_weekly_schedule(&entries).is_valid());
}

#[test]
fn missing_weekday_is_a_warning_not_an_error() {
    let mut entries = default_week();
    entries.remove(6); // drop Sunday

    let result = validate_weekly_schedule(&entries);

    assert!(result.is_valid());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.subject == "Sunday" && w.message.contains("missing")));
}

#[test]
fn full_week_has_no_missing_weekday_warnings() {
    let result = validate_weekly_schedule(&default_week());

    assert!(result.warnings.is_empty());
}

#[test]
fn exception_with_empty_title_is_rejected() {
    let request = UpsertExceptionRequest {
        id: None,
        title: "   ".to_string(),
        event_type: ExceptionKind::Blocked,
        start_time: Utc::now(),
        end_time: Utc::now() + chrono::Duration::hours(1),
        all_day: false,
        blocks_appointments: true,
        recurrence: None,
    };

    assert!(!validate_exception(&request, &default_week()).is_valid());
}

#[test]
fn exception_with_inverted_range_is_rejected() {
    let now = Utc::now();
    let request = UpsertExceptionRequest {
        id: None,
        title: "Vacation".to_string(),
        event_type: ExceptionKind::Blocked,
        start_time: now,
        end_time: now - chrono::Duration::hours(1),
        all_day: false,
        blocks_appointments: true,
        recurrence: None,
    };

    let result = validate_exception(&request, &default_week());

    assert!(!result.is_valid());
    assert!(result.errors[0].message.contains("after its start"));
}

#[test]
fn well_formed_exception_passes() {
    let now = Utc::now();
    let request = UpsertExceptionRequest {
        id: None,
        title: "Conference".to_string(),
        event_type: ExceptionKind::Blocked,
        start_time: now,
        end_time: now + chrono::Duration::hours(2),
        all_day: false,
        blocks_appointments: true,
        recurrence: None,
    };

    assert!(validate_exception(&request, &default_week()).is_valid());
}

fn blocking_exception_on(date: NaiveDate) -> UpsertExceptionRequest {
    UpsertExceptionRequest {
        id: None,
        title: "Vacation day".to_string(),
        event_type: ExceptionKind::Blocked,
        start_time: TimeOfDay::from_hm(9, 0).unwrap().on_date(date),
        end_time: TimeOfDay::from_hm(17, 0).unwrap().on_date(date),
        all_day: false,
        blocks_appointments: true,
        recurrence: None,
    }
}

#[test]
fn exception_outside_working_days_is_an_advisory_warning() {
    // 2025-06-07 is a Saturday; the default week works Monday-Friday.
    let request = blocking_exception_on(NaiveDate::from_ymd_opt(2025, 6, 7).unwrap());

    let result = validate_exception(&request, &default_week());

    assert!(result.is_valid());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.message.contains("outside the weekly schedule")));
}

#[test]
fn exception_on_a_working_day_gets_no_advisory() {
    // 2025-06-02 is a Monday.
    let request = blocking_exception_on(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());

    let result = validate_exception(&request, &default_week());

    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn weekend_spanning_exception_reaching_monday_gets_no_advisory() {
    // Saturday through Monday touches a working day.
    let saturday = NaiveDate::from_ymd_opt(2025, 6, 7).unwrap();
    let monday = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
    let mut request = blocking_exception_on(saturday);
    request.end_time = TimeOfDay::from_hm(12, 0).unwrap().on_date(monday);

    assert!(validate_exception(&request, &default_week()).warnings.is_empty());
}

#[test]
fn weekly_recurrence_on_disabled_days_is_an_advisory_warning() {
    let mut request = blocking_exception_on(NaiveDate::from_ymd_opt(2025, 6, 7).unwrap());
    request.recurrence = Some(RecurrencePattern {
        pattern: RecurrenceFrequency::Weekly,
        days_of_week: vec![Weekday::Sat, Weekday::Sun],
        end_date: None,
    });

    let result = validate_exception(&request, &default_week());

    assert!(result.is_valid());
    assert!(!result.warnings.is_empty());
}
