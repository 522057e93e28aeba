use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Time-of-day as minutes since midnight. This is the single time
/// representation used for schedule arithmetic; "HH:MM" strings exist
/// only at the serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(MINUTES_PER_DAY);

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour > 24 || minute > 59 {
            return None;
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }

    /// Returns `None` past end of day instead of wrapping.
    pub fn checked_add(self, minutes: u16) -> Option<Self> {
        Self::from_minutes(self.0.checked_add(minutes)?)
    }

    pub fn minutes_until(&self, later: TimeOfDay) -> i32 {
        later.0 as i32 - self.0 as i32
    }

    /// Absolute timestamp for this time of day on the given date, in the
    /// doctor's clock. Going through date + minute offset (rather than
    /// `NaiveTime`) keeps 24:00 representable as next-day midnight.
    pub fn on_date(&self, date: NaiveDate) -> DateTime<Utc> {
        (date.and_time(NaiveTime::MIN) + Duration::minutes(self.0 as i64)).and_utc()
    }

    /// Projects an absolute timestamp onto a single day's clock, clamping
    /// instants before/after the day to its bounds. Partial minutes round
    /// down; use for interval starts.
    pub fn clamped_from(instant: DateTime<Utc>, date: NaiveDate) -> Self {
        let day_start = TimeOfDay::MIDNIGHT.on_date(date);
        let day_end = TimeOfDay::END_OF_DAY.on_date(date);
        if instant <= day_start {
            TimeOfDay::MIDNIGHT
        } else if instant >= day_end {
            TimeOfDay::END_OF_DAY
        } else {
            TimeOfDay((instant - day_start).num_minutes() as u16)
        }
    }

    /// Like `clamped_from` but partial minutes round up; use for interval
    /// ends. Rounding starts down and ends up means a blocking window can
    /// only grow, never shrink, under sub-minute truncation.
    pub fn clamped_up_from(instant: DateTime<Utc>, date: NaiveDate) -> Self {
        let day_start = TimeOfDay::MIDNIGHT.on_date(date);
        let day_end = TimeOfDay::END_OF_DAY.on_date(date);
        if instant <= day_start {
            TimeOfDay::MIDNIGHT
        } else if instant >= day_end {
            TimeOfDay::END_OF_DAY
        } else {
            let elapsed = instant - day_start;
            let mut minutes = elapsed.num_minutes();
            if elapsed > Duration::minutes(minutes) {
                minutes += 1;
            }
            TimeOfDay(minutes as u16)
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid time of day: {}", s))?;
        let hour: u16 = h.parse().map_err(|_| format!("invalid hour: {}", s))?;
        let minute: u16 = m.parse().map_err(|_| format!("invalid minute: {}", s))?;
        Self::from_hm(hour, minute).ok_or_else(|| format!("time of day out of range: {}", s))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Half-open working interval `[start, end)` within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeBlock {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    pub fn is_well_formed(&self) -> bool {
        self.end > self.start
    }

    pub fn duration_minutes(&self) -> i32 {
        self.start.minutes_until(self.end)
    }

    pub fn overlaps(&self, other: &TimeBlock) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Interval difference: the parts of `self` not covered by `cut`.
    /// Yields zero, one or two pieces (a cut in the middle splits the block).
    pub fn subtract(&self, cut: &TimeBlock) -> Vec<TimeBlock> {
        if !self.overlaps(cut) {
            return vec![*self];
        }
        let mut pieces = Vec::new();
        if cut.start > self.start {
            pieces.push(TimeBlock::new(self.start, cut.start));
        }
        if cut.end < self.end {
            pieces.push(TimeBlock::new(cut.end, self.end));
        }
        pieces
    }
}

pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn weekday_from_name(name: &str) -> Option<Weekday> {
    WEEK.iter()
        .copied()
        .find(|w| weekday_name(*w).eq_ignore_ascii_case(name))
}

/// Serde adapter: weekdays travel as their full English name ("Monday").
pub mod weekday_string {
    use super::*;

    pub fn serialize<S: Serializer>(weekday: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(weekday_name(*weekday))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let s = String::deserialize(deserializer)?;
        weekday_from_name(&s)
            .ok_or_else(|| de::Error::custom(format!("unknown weekday: {}", s)))
    }
}

/// One weekday of a doctor's recurring template. `blocks` is authoritative;
/// a day's overall start/end is derived, never stored separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyScheduleEntry {
    #[serde(with = "weekday_string")]
    pub weekday: Weekday,
    pub enabled: bool,
    #[serde(default)]
    pub blocks: Vec<TimeBlock>,
    pub slot_duration: i32,
}

pub const DEFAULT_SLOT_DURATION: i32 = 30;

impl WeeklyScheduleEntry {
    pub fn disabled(weekday: Weekday) -> Self {
        Self {
            weekday,
            enabled: false,
            blocks: Vec::new(),
            slot_duration: DEFAULT_SLOT_DURATION,
        }
    }

    pub fn working_day(weekday: Weekday) -> Self {
        Self {
            weekday,
            enabled: true,
            blocks: vec![TimeBlock::new(TimeOfDay(9 * 60), TimeOfDay(17 * 60))],
            slot_duration: DEFAULT_SLOT_DURATION,
        }
    }

    /// Derived convenience: earliest block start, if any.
    pub fn day_start(&self) -> Option<TimeOfDay> {
        self.blocks.iter().map(|b| b.start).min()
    }

    /// Derived convenience: latest block end, if any.
    pub fn day_end(&self) -> Option<TimeOfDay> {
        self.blocks.iter().map(|b| b.end).max()
    }

    pub fn sorted_blocks(&self) -> Vec<TimeBlock> {
        let mut blocks = self.blocks.clone();
        blocks.sort_by_key(|b| (b.start, b.end));
        blocks
    }
}

/// The default template for a doctor with no saved schedule:
/// Monday-Friday 09:00-17:00 with 30-minute slots, weekends disabled.
pub fn default_week() -> Vec<WeeklyScheduleEntry> {
    WEEK.iter()
        .map(|&w| match w {
            Weekday::Sat | Weekday::Sun => WeeklyScheduleEntry::disabled(w),
            _ => WeeklyScheduleEntry::working_day(w),
        })
        .collect()
}

pub fn disabled_week() -> Vec<WeeklyScheduleEntry> {
    WEEK.iter().map(|&w| WeeklyScheduleEntry::disabled(w)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionKind {
    /// Removes availability for the covered range.
    Blocked,
    /// Visible on the doctor's calendar but never affects slots.
    Informational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
}

/// How a recurring exception repeats. `end_date` is inclusive; absent
/// means the series runs until the queried range ends. Weekly patterns
/// may name explicit weekdays, defaulting to the first occurrence's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePattern {
    pub pattern: RecurrenceFrequency,
    #[serde(default, with = "weekday_name_list")]
    pub days_of_week: Vec<Weekday>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Serde adapter for weekday lists, same full-name form as `weekday_string`.
pub mod weekday_name_list {
    use super::*;

    pub fn serialize<S: Serializer>(days: &[Weekday], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(days.iter().map(|w| weekday_name(*w)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Weekday>, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names
            .iter()
            .map(|name| {
                weekday_from_name(name)
                    .ok_or_else(|| de::Error::custom(format!("unknown weekday: {}", name)))
            })
            .collect()
    }
}

/// A dated override (vacation, conference, blocked period). Always wins
/// over the weekly template where the two intersect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionEvent {
    pub id: Uuid,
    pub title: String,
    pub event_type: ExceptionKind,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub all_day: bool,
    pub blocks_appointments: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrencePattern>,
}

impl ExceptionEvent {
    pub fn is_blocking(&self) -> bool {
        self.blocks_appointments && self.event_type == ExceptionKind::Blocked
    }

    /// The portion of this event that falls on `date`, as a day-local
    /// block. `None` when the event does not touch the date. An all-day
    /// event covers every date it touches in full.
    pub fn window_on(&self, date: NaiveDate) -> Option<TimeBlock> {
        if self.all_day {
            // All-day events cover every calendar date they touch, even
            // when the stored timestamps are both midnight.
            let covers = self.start_time.date_naive() <= date
                && date <= self.end_time.date_naive();
            return covers
                .then(|| TimeBlock::new(TimeOfDay::MIDNIGHT, TimeOfDay::END_OF_DAY));
        }
        let day_start = TimeOfDay::MIDNIGHT.on_date(date);
        let day_end = TimeOfDay::END_OF_DAY.on_date(date);
        if self.start_time >= day_end || self.end_time <= day_start {
            return None;
        }
        Some(TimeBlock::new(
            TimeOfDay::clamped_from(self.start_time, date),
            TimeOfDay::clamped_up_from(self.end_time, date),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertExceptionRequest {
    pub id: Option<Uuid>,
    pub title: String,
    pub event_type: ExceptionKind,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub blocks_appointments: bool,
    #[serde(default)]
    pub recurrence: Option<RecurrencePattern>,
}

/// A single itemized finding from the validator, tied to the weekday or
/// exception it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub subject: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating a template or exception. Errors block
/// persistence; warnings are advisory and never do.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(subject, message));
    }

    pub fn warning(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(subject, message));
    }
}
