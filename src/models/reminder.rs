use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use super::NoteId;

const REMINDER_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Largest timezone offset a browser reports, in minutes (UTC-14 / UTC+14).
pub const MAX_TIMEZONE_OFFSET_MINUTES: i32 = 14 * 60;

/// Wall-clock time, in the note owner's local zone, at which a reminder is due.
///
/// Stored and serialized as `YYYY-MM-DD HH:MM:SS`. Values in that format sort
/// chronologically as plain strings, which the due-reminder query relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReminderTime(PrimitiveDateTime);

/// Error returned when a reminder time cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid reminder time '{0}', expected YYYY-MM-DD HH:MM[:SS]")]
pub struct InvalidReminderTime(pub String);

impl ReminderTime {
    pub fn new(datetime: PrimitiveDateTime) -> Self {
        Self(datetime.replace_nanosecond(0).unwrap_or(datetime))
    }

    /// Parses a reminder as submitted by a `datetime-local` form field.
    ///
    /// The `T` separator becomes a space and a value without seconds gets
    /// `:00`. Empty or whitespace-only input means "no reminder".
    pub fn parse_input(input: &str) -> Result<Option<Self>, InvalidReminderTime> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let mut normalized = trimmed.replacen('T', " ", 1);
        if normalized.len() == 16 {
            normalized.push_str(":00");
        }

        Self::parse(&normalized).map(Some)
    }

    /// Parses the canonical `YYYY-MM-DD HH:MM:SS` form.
    pub fn parse(value: &str) -> Result<Self, InvalidReminderTime> {
        PrimitiveDateTime::parse(value, REMINDER_FORMAT)
            .map(Self)
            .map_err(|_| InvalidReminderTime(value.to_string()))
    }

    /// Current wall-clock time for a user at the given offset.
    pub fn now_at(offset: TimezoneOffset) -> Self {
        Self::at(OffsetDateTime::now_utc(), offset)
    }

    /// Wall-clock time at `offset` for the given instant.
    pub fn at(instant: OffsetDateTime, offset: TimezoneOffset) -> Self {
        let local = instant.to_offset(offset.utc_offset());
        Self::new(PrimitiveDateTime::new(local.date(), local.time()))
    }

    pub fn datetime(&self) -> PrimitiveDateTime {
        self.0
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(REMINDER_FORMAT).map_err(|_| fmt::Error)?;
        f.write_str(&formatted)
    }
}

impl Serialize for ReminderTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReminderTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl rusqlite::ToSql for ReminderTime {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::from(self.to_string()))
    }
}

impl rusqlite::types::FromSql for ReminderTime {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::parse(text).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
    }
}

/// Browser timezone offset in minutes, as returned by JavaScript's
/// `Date.prototype.getTimezoneOffset()`: positive west of UTC, so local time
/// is `UTC - offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimezoneOffset(i32);

impl TimezoneOffset {
    /// Validates an offset; anything beyond ±14 hours is rejected.
    pub fn new(minutes: i64) -> Option<Self> {
        let minutes = i32::try_from(minutes).ok()?;
        (minutes.abs() <= MAX_TIMEZONE_OFFSET_MINUTES).then_some(Self(minutes))
    }

    pub fn minutes(self) -> i32 {
        self.0
    }

    /// The equivalent `UtcOffset` (sign flipped).
    pub fn utc_offset(self) -> UtcOffset {
        // Bounded by MAX_TIMEZONE_OFFSET_MINUTES, well inside UtcOffset's range
        UtcOffset::from_whole_seconds(-self.0 * 60).unwrap_or(UtcOffset::UTC)
    }
}

/// A note whose reminder has come due, as pushed to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueReminder {
    pub id: NoteId,
    pub title: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parse_input_accepts_datetime_local_without_seconds() {
        let parsed = ReminderTime::parse_input("2025-03-10T14:30").unwrap().unwrap();
        assert_eq!(parsed.to_string(), "2025-03-10 14:30:00");
    }

    #[test]
    fn parse_input_accepts_datetime_local_with_seconds() {
        let parsed = ReminderTime::parse_input("2025-03-10T14:30:45").unwrap().unwrap();
        assert_eq!(parsed.to_string(), "2025-03-10 14:30:45");
    }

    #[test]
    fn parse_input_accepts_canonical_form() {
        let parsed = ReminderTime::parse_input("2025-03-10 08:00:00").unwrap().unwrap();
        assert_eq!(parsed.datetime(), datetime!(2025-03-10 08:00:00));
    }

    #[test]
    fn parse_input_empty_means_no_reminder() {
        assert_eq!(ReminderTime::parse_input("").unwrap(), None);
        assert_eq!(ReminderTime::parse_input("   ").unwrap(), None);
    }

    #[test]
    fn parse_input_rejects_garbage() {
        assert!(ReminderTime::parse_input("tomorrow").is_err());
        assert!(ReminderTime::parse_input("2025-13-01T10:00").is_err());
    }

    #[test]
    fn canonical_strings_sort_chronologically() {
        let earlier = ReminderTime::parse("2025-03-09 23:59:59").unwrap();
        let later = ReminderTime::parse("2025-03-10 00:00:00").unwrap();
        assert!(earlier < later);
        assert!(earlier.to_string() < later.to_string());
    }

    #[test]
    fn local_time_subtracts_browser_offset() {
        // getTimezoneOffset() is 180 for UTC-3
        let offset = TimezoneOffset::new(180).unwrap();
        let local = ReminderTime::at(datetime!(2025-03-10 12:00:00 UTC), offset);
        assert_eq!(local.to_string(), "2025-03-10 09:00:00");

        // and -60 for UTC+1
        let offset = TimezoneOffset::new(-60).unwrap();
        let local = ReminderTime::at(datetime!(2025-03-10 23:30:00 UTC), offset);
        assert_eq!(local.to_string(), "2025-03-11 00:30:00");
    }

    #[test]
    fn timezone_offset_rejects_out_of_range() {
        assert!(TimezoneOffset::new(840).is_some());
        assert!(TimezoneOffset::new(-840).is_some());
        assert!(TimezoneOffset::new(841).is_none());
        assert!(TimezoneOffset::new(i64::MAX).is_none());
    }

    #[test]
    fn reminder_time_serializes_as_canonical_string() {
        let time = ReminderTime::parse("2025-01-02 03:04:05").unwrap();
        let json = serde_json::to_string(&time).unwrap();
        assert_eq!(json, r#""2025-01-02 03:04:05""#);

        let back: ReminderTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, time);
    }
}
