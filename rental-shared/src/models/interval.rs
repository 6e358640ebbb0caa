use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    #[error("Invalid interval: start {start} is not before end {end}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A half-open time range `[start, end)`.
///
/// The constructor rejects `start >= end`, so every `Interval` in circulation
/// is non-empty. Deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawInterval> for Interval {
    type Error = IntervalError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Interval::new(raw.start, raw.end)
    }
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        if start >= end {
            return Err(IntervalError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap test. Touching endpoints (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// The part of `self` that falls inside `window`, if any.
    pub fn clip_to(&self, window: &Interval) -> Option<Interval> {
        let start = self.start.max(window.start);
        let end = self.end.min(window.end);
        Interval::new(start, end).ok()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_empty_and_inverted() {
        assert!(Interval::new(at(10), at(10)).is_err());
        assert!(Interval::new(at(12), at(10)).is_err());
        assert!(Interval::new(at(10), at(11)).is_ok());
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        let a = Interval::new(at(10), at(12)).unwrap();
        let b = Interval::new(at(12), at(14)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.contains(at(10)));
        assert!(!a.contains(at(12)));
    }

    #[test]
    fn test_clip_to_window() {
        let booking = Interval::new(at(8), at(14)).unwrap();
        let window = Interval::new(at(10), at(20)).unwrap();
        assert_eq!(booking.clip_to(&window), Some(Interval::new(at(10), at(14)).unwrap()));

        let outside = Interval::new(at(20), at(22)).unwrap();
        assert_eq!(outside.clip_to(&window), None);
    }

    #[test]
    fn test_deserialize_validates_bounds() {
        let ok = r#"{"start":"2025-03-01T10:00:00Z","end":"2025-03-02T10:00:00Z"}"#;
        let interval: Interval = serde_json::from_str(ok).unwrap();
        assert_eq!(interval.duration(), Duration::days(1));

        let inverted = r#"{"start":"2025-03-02T10:00:00Z","end":"2025-03-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<Interval>(inverted).is_err());
    }
}
