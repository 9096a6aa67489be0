//! Time-of-day intervals and committed bookings.
//!
//! Every interval is half-open, `[start, end)`, and always has `start < end`.
//! Times fall on whole minutes and serialize as `HH:MM` strings.

use std::fmt;

use chrono::{NaiveDate, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::schedule::{BookingId, BusinessId, ServiceId, StaffId};

const TIME_FORMAT: &str = "%H:%M";

/// A candidate bookable slot of exactly the requested service duration.
pub type AvailabilityWindow = TimeInterval;

/// A half-open time-of-day range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct TimeInterval {
    #[serde(with = "hhmm")]
    start: NaiveTime,
    #[serde(with = "hhmm")]
    end: NaiveTime,
}

#[derive(Deserialize)]
struct RawInterval {
    #[serde(with = "hhmm")]
    start: NaiveTime,
    #[serde(with = "hhmm")]
    end: NaiveTime,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = EngineError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        TimeInterval::new(raw.start, raw.end)
    }
}

impl TimeInterval {
    /// # Errors
    /// Returns `EngineError::InvalidInput` unless `start < end` and both fall
    /// on a whole minute.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        whole_minute(start)?;
        whole_minute(end)?;
        if start >= end {
            return Err(EngineError::InvalidInput(format!(
                "interval start {} must be before end {}",
                start.format(TIME_FORMAT),
                end.format(TIME_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    /// Build the interval `[start, start + duration_minutes)`.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidInput` for a non-positive duration or when
    /// the end would fall past midnight.
    pub fn starting_at(start: NaiveTime, duration_minutes: i64) -> Result<Self> {
        let duration = minutes(duration_minutes)?;
        let (end, wrapped_secs) = start.overflowing_add_signed(duration);
        if wrapped_secs != 0 {
            return Err(EngineError::InvalidInput(format!(
                "{} minutes from {} runs past midnight",
                duration_minutes,
                start.format(TIME_FORMAT)
            )));
        }
        Self::new(start, end)
    }

    /// Only for callers that already guarantee `start < end`.
    pub(crate) fn from_ordered(start: NaiveTime, end: NaiveTime) -> Self {
        debug_assert!(start < end);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Two intervals overlap iff `self.start < other.end && other.start < self.end`.
    ///
    /// Touching endpoints do not overlap, so back-to-back bookings are legal.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when `self` lies entirely inside `[outer.start, outer.end]`.
    pub fn within(&self, outer: &TimeInterval) -> bool {
        outer.start <= self.start && self.end <= outer.end
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}

/// Convert a minute count into a strictly positive `TimeDelta`.
pub(crate) fn minutes(duration_minutes: i64) -> Result<TimeDelta> {
    if duration_minutes <= 0 {
        return Err(EngineError::InvalidInput(format!(
            "duration must be positive, got {} minutes",
            duration_minutes
        )));
    }
    TimeDelta::try_minutes(duration_minutes).ok_or_else(|| {
        EngineError::InvalidInput(format!("duration of {} minutes is out of range", duration_minutes))
    })
}

/// Reject times that `HH:MM` cannot represent.
pub(crate) fn whole_minute(time: NaiveTime) -> Result<()> {
    if time.second() != 0 || time.nanosecond() != 0 {
        return Err(EngineError::InvalidInput(format!(
            "time {} does not fall on a whole minute",
            time
        )));
    }
    Ok(())
}

/// Parse a time of day in `HH:MM` form.
///
/// # Errors
/// Returns `EngineError::InvalidInput` if the string is not a valid time.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .map_err(|_| EngineError::InvalidInput(format!("invalid time of day: '{}'", raw)))
}

/// Lifecycle status carried on a booking. The engine only ever creates `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

/// A committed appointment occupying one staff member's calendar on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedInterval {
    pub id: BookingId,
    pub business_id: BusinessId,
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub interval: TimeInterval,
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub status: BookingStatus,
}

impl BookedInterval {
    pub fn interval(&self) -> &TimeInterval {
        &self.interval
    }
}

pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(super::TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn new_rejects_empty_and_inverted_ranges() {
        assert!(TimeInterval::new(t(9, 0), t(9, 0)).is_err());
        assert!(TimeInterval::new(t(10, 0), t(9, 0)).is_err());
        assert!(TimeInterval::new(t(9, 0), t(9, 1)).is_ok());
    }

    #[test]
    fn starting_at_refuses_to_wrap_midnight() {
        let err = TimeInterval::starting_at(t(23, 30), 45).unwrap_err();
        assert!(err.to_string().contains("past midnight"));

        let interval = TimeInterval::starting_at(t(22, 0), 90).unwrap();
        assert_eq!(interval.end(), t(23, 30));
    }

    #[test]
    fn starting_at_rejects_non_positive_duration() {
        assert!(TimeInterval::starting_at(t(9, 0), 0).is_err());
        assert!(TimeInterval::starting_at(t(9, 0), -15).is_err());
        assert!(TimeInterval::starting_at(t(9, 0), i64::MAX).is_err());
    }

    #[test]
    fn display_uses_hours_and_minutes() {
        let interval = TimeInterval::new(t(9, 5), t(9, 25)).unwrap();
        assert_eq!(interval.to_string(), "09:05-09:25");
        assert_eq!(interval.duration_minutes(), 20);
    }

    #[test]
    fn deserialize_validates_ordering() {
        let ok: TimeInterval = serde_json::from_str(r#"{"start":"09:00","end":"09:30"}"#).unwrap();
        assert_eq!(ok, TimeInterval::new(t(9, 0), t(9, 30)).unwrap());

        let inverted = serde_json::from_str::<TimeInterval>(r#"{"start":"10:00","end":"09:30"}"#);
        assert!(inverted.is_err());

        let garbage = serde_json::from_str::<TimeInterval>(r#"{"start":"nine","end":"09:30"}"#);
        assert!(garbage.is_err());
    }

    #[test]
    fn serialize_emits_hh_mm() {
        let interval = TimeInterval::new(t(9, 30), t(10, 0)).unwrap();
        let json = serde_json::to_string(&interval).unwrap();
        assert_eq!(json, r#"{"start":"09:30","end":"10:00"}"#);
    }

    #[test]
    fn parse_time_accepts_hours_and_minutes_only() {
        assert_eq!(parse_time("09:30").unwrap(), t(9, 30));
        assert!(parse_time("09:30:00").is_err());
        assert!(parse_time("09:00:30").is_err());
        assert!(parse_time("25:00").is_err());
    }

    #[test]
    fn sub_minute_times_are_rejected() {
        let half_past = NaiveTime::from_hms_opt(9, 0, 30).unwrap();
        let err = TimeInterval::new(half_past, t(9, 30)).unwrap_err();
        assert!(err.to_string().contains("whole minute"));
        assert!(TimeInterval::starting_at(half_past, 30).is_err());

        let fraction = NaiveTime::from_hms_milli_opt(9, 30, 0, 500).unwrap();
        assert!(TimeInterval::new(t(9, 0), fraction).is_err());
    }

    #[test]
    fn serialized_interval_reloads_unchanged() {
        let interval = TimeInterval::starting_at(t(9, 5), 25).unwrap();
        let json = serde_json::to_string(&interval).unwrap();
        let reloaded: TimeInterval = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, interval);
    }
}
