use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum IntervalError {
    #[error("interval end ({end}) precedes start ({start})")]
    EndBeforeStart { start: DateTime<Utc>, end: DateTime<Utc> },
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum DurationParseError {
    #[error("not a valid ISO-8601 duration: {0:?}")]
    Malformed(String),
    #[error("negative durations are not supported: {0:?}")]
    Negative(String),
    #[error("duration has no components: {0:?}")]
    Empty(String),
}

/// A half-open temporal interval `[start, end)`.
///
/// `start == end` is permitted and denotes an instantaneous interval; `end <
/// start` is rejected by [`Interval::new`].
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use temporal::Interval;
///
/// let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();
/// let iv = Interval::new(start, end).unwrap();
/// assert!(iv.contains(start));
/// assert!(!iv.contains(end));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        if end < start {
            return Err(IntervalError::EndBeforeStart { start, end });
        }
        Ok(Interval { start, end })
    }

    pub fn instant(at: DateTime<Utc>) -> Self {
        Interval { start: at, end: at }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// `[start, end)` membership: the start is included, the end is not,
    /// except for an instantaneous interval which contains exactly its point.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        if self.start == self.end {
            time == self.start
        } else {
            time >= self.start && time < self.end
        }
    }

    /// Whether `self` and `other` share any instant.
    pub fn overlaps(&self, other: &Interval) -> bool {
        let starts_before_other_ends = if other.start == other.end {
            self.contains(other.start)
        } else {
            self.start < other.end
        };
        let other_starts_before_self_ends = if self.start == self.end {
            other.contains(self.start)
        } else {
            other.start < self.end
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

/// Adds a duration to a datetime. Kept as a free function (rather than
/// `DateTime::add`) so callers that only hold an ISO-8601 string can go
/// straight from parse to result.
pub fn add_duration(start: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    start + duration
}

static ISO8601_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<sign>-)?P(?:(?P<years>\d+)Y)?(?:(?P<months>\d+)M)?(?:(?P<weeks>\d+)W)?(?:(?P<days>\d+)D)?(?:T(?:(?P<hours>\d+)H)?(?:(?P<minutes>\d+)M)?(?:(?P<seconds>\d+)(?:\.(?P<frac>\d{1,6}))?S)?)?$",
    )
    .expect("static ISO-8601 duration regex is valid")
});

/// Parses an ISO-8601 duration string (`PnYnMnDTnHnMnS`, week form `PnW`).
///
/// Negative durations (a leading `-`, which ISO-8601 permits) are rejected
/// rather than silently negated, since nothing in this system has a use for
/// them. Sub-second components are preserved to microsecond precision; a
/// fractional-seconds field with more than six digits is truncated to six.
///
/// ```
/// use temporal::parse_iso8601_duration;
///
/// let d = parse_iso8601_duration("PT30M").unwrap();
/// assert_eq!(d.num_seconds(), 30 * 60);
///
/// let d = parse_iso8601_duration("P1DT2H").unwrap();
/// assert_eq!(d.num_hours(), 26);
///
/// assert!(parse_iso8601_duration("-PT5S").is_err());
/// assert!(parse_iso8601_duration("not a duration").is_err());
/// ```
pub fn parse_iso8601_duration(input: &str) -> Result<Duration, DurationParseError> {
    let caps = ISO8601_DURATION
        .captures(input)
        .ok_or_else(|| DurationParseError::Malformed(input.to_string()))?;

    if caps.name("sign").is_some() {
        return Err(DurationParseError::Negative(input.to_string()));
    }

    let field = |name: &str| -> i64 {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0)
    };

    let years = field("years");
    let months = field("months");
    let weeks = field("weeks");
    let days = field("days");
    let hours = field("hours");
    let minutes = field("minutes");
    let seconds = field("seconds");

    let micros = match caps.name("frac") {
        Some(m) => {
            let mut digits = m.as_str().to_string();
            while digits.len() < 6 {
                digits.push('0');
            }
            digits.truncate(6);
            digits.parse::<i64>().unwrap_or(0)
        }
        None => 0,
    };

    if years == 0
        && months == 0
        && weeks == 0
        && days == 0
        && hours == 0
        && minutes == 0
        && seconds == 0
        && micros == 0
    {
        return Err(DurationParseError::Empty(input.to_string()));
    }

    // Calendar components (years/months) are approximated to fixed-length
    // periods; this system only ever compares durations as tick counts, so a
    // fixed approximation is consistent rather than a loss of information.
    let total_days = years * 365 + months * 30 + weeks * 7 + days;

    let duration = Duration::days(total_days)
        + Duration::hours(hours)
        + Duration::minutes(minutes)
        + Duration::seconds(seconds)
        + Duration::microseconds(micros);

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, h, m, s).unwrap()
    }

    #[test]
    fn rejects_end_before_start() {
        let err = Interval::new(at(1, 0, 0), at(0, 0, 0)).unwrap_err();
        assert!(matches!(err, IntervalError::EndBeforeStart { .. }));
    }

    #[test]
    fn instantaneous_interval_contains_only_its_point() {
        let iv = Interval::instant(at(1, 0, 0));
        assert!(iv.contains(at(1, 0, 0)));
        assert!(!iv.contains(at(1, 0, 1)));
    }

    #[test]
    fn overlap_is_symmetric_and_half_open() {
        let a = Interval::new(at(0, 0, 0), at(1, 0, 0)).unwrap();
        let b = Interval::new(at(0, 30, 0), at(1, 30, 0)).unwrap();
        let c = Interval::new(at(1, 0, 0), at(2, 0, 0)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c), "half-open interval must not overlap its immediate successor");
    }

    #[test]
    fn parses_compound_duration_and_preserves_microseconds() {
        let d = parse_iso8601_duration("P1DT2H3M4.500001S").unwrap();
        assert_eq!(d.num_microseconds(), Some(((26 * 3600 + 3 * 60 + 4) * 1_000_000 + 500_001) as i64));
    }

    #[test]
    fn rejects_empty_duration() {
        assert_eq!(parse_iso8601_duration("P"), Err(DurationParseError::Empty("P".to_string())));
    }

    #[test]
    fn rejects_negative_duration() {
        assert!(matches!(parse_iso8601_duration("-P1D"), Err(DurationParseError::Negative(_))));
    }

    #[test]
    fn add_duration_round_trips_through_parse() {
        let start = at(0, 0, 0);
        let d = parse_iso8601_duration("PT15M").unwrap();
        assert_eq!(add_duration(start, d), at(0, 15, 0));
    }
}
