use chrono::{DateTime, Utc};
use rental_shared::{AvailabilityPeriod, Interval, IntervalError};

/// Committed reservation windows of a single resource.
///
/// Built from an authority snapshot and never mutated to anticipate a booking
/// the server has not confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    booked: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only `booked` periods; `available` ones are display data.
    pub fn from_periods(periods: &[AvailabilityPeriod]) -> Self {
        Self::from_intervals(
            periods
                .iter()
                .filter(|p| p.is_booked())
                .map(|p| p.interval),
        )
    }

    pub fn from_intervals(intervals: impl IntoIterator<Item = Interval>) -> Self {
        let mut booked: Vec<Interval> = intervals.into_iter().collect();
        booked.sort_by_key(|i| i.start());
        Self { booked }
    }

    pub fn len(&self) -> usize {
        self.booked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.booked.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.booked.iter()
    }

    pub fn conflicts(&self, candidate: &Interval) -> bool {
        self.first_conflict(candidate).is_some()
    }

    pub fn first_conflict(&self, candidate: &Interval) -> Option<&Interval> {
        self.booked.iter().find(|b| b.overlaps(candidate))
    }

    /// Split `window` into booked and free periods, ordered by start.
    pub fn periods_within(&self, window: &Interval) -> Vec<AvailabilityPeriod> {
        let mut periods = Vec::new();
        let mut cursor = window.start();

        for booked in self.booked.iter().filter_map(|b| b.clip_to(window)) {
            if let Ok(gap) = Interval::new(cursor, booked.start()) {
                periods.push(AvailabilityPeriod::available(gap));
            }
            // booked windows may overlap each other in a foreign snapshot
            let start = booked.start().max(cursor);
            if let Ok(taken) = Interval::new(start, booked.end()) {
                periods.push(AvailabilityPeriod::booked(taken));
            }
            cursor = cursor.max(booked.end());
        }

        if let Ok(tail) = Interval::new(cursor, window.end()) {
            periods.push(AvailabilityPeriod::available(tail));
        }
        periods
    }
}

/// Whether `candidate` overlaps any `booked` entry of `periods`.
pub fn conflicts(candidate: &Interval, periods: &[AvailabilityPeriod]) -> bool {
    periods
        .iter()
        .filter(|p| p.is_booked())
        .any(|p| p.interval.overlaps(candidate))
}

/// Same as [`conflicts`] for raw bounds; `start >= end` is a caller error.
pub fn conflicts_between(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    periods: &[AvailabilityPeriod],
) -> Result<bool, IntervalError> {
    let candidate = Interval::new(start, end)?;
    Ok(conflicts(&candidate, periods))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn iv(from: i64, to: i64) -> Interval {
        Interval::new(base() + Duration::hours(from), base() + Duration::hours(to)).unwrap()
    }

    fn booked(from: i64, to: i64) -> AvailabilityPeriod {
        AvailabilityPeriod::booked(iv(from, to))
    }

    #[test]
    fn test_adjacent_windows_do_not_conflict() {
        assert!(!conflicts(&iv(10, 20), &[booked(20, 30)]));
        assert!(!conflicts(&iv(20, 30), &[booked(10, 20)]));
    }

    #[test]
    fn test_partial_overlap_conflicts() {
        assert!(conflicts(&iv(10, 20), &[booked(15, 25)]));
        assert!(conflicts(&iv(15, 25), &[booked(10, 20)]));
    }

    #[test]
    fn test_containment_conflicts() {
        assert!(conflicts(&iv(10, 30), &[booked(15, 20)]));
        assert!(conflicts(&iv(15, 20), &[booked(10, 30)]));
    }

    #[test]
    fn test_self_overlap() {
        for (a, b) in [(0, 1), (10, 20), (5, 500)] {
            assert!(conflicts(&iv(a, b), &[booked(a, b)]));
        }
    }

    #[test]
    fn test_conflict_is_symmetric() {
        let samples = [(0, 5), (5, 10), (3, 7), (0, 10), (10, 12), (9, 11), (12, 20)];
        for &(a0, a1) in &samples {
            for &(b0, b1) in &samples {
                assert_eq!(
                    conflicts(&iv(a0, a1), &[booked(b0, b1)]),
                    conflicts(&iv(b0, b1), &[booked(a0, a1)]),
                    "asymmetry between [{a0},{a1}) and [{b0},{b1})"
                );
            }
        }
    }

    #[test]
    fn test_available_periods_are_ignored() {
        let periods = vec![AvailabilityPeriod::available(iv(0, 100)), booked(50, 60)];
        assert!(!conflicts(&iv(10, 20), &periods));
        assert!(conflicts(&iv(55, 70), &periods));

        let set = IntervalSet::from_periods(&periods);
        assert_eq!(set.len(), 1);
        assert_eq!(set.first_conflict(&iv(55, 70)), Some(&iv(50, 60)));
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let result = conflicts_between(base() + Duration::hours(5), base(), &[]);
        assert!(matches!(result, Err(IntervalError::InvalidInterval { .. })));
        assert_eq!(conflicts_between(base(), base() + Duration::hours(5), &[booked(4, 6)]), Ok(true));
    }

    #[test]
    fn test_periods_within_window() {
        let set = IntervalSet::from_intervals(vec![iv(30, 40), iv(5, 12)]);
        let periods = set.periods_within(&iv(10, 50));

        assert_eq!(
            periods,
            vec![
                booked(10, 12),
                AvailabilityPeriod::available(iv(12, 30)),
                booked(30, 40),
                AvailabilityPeriod::available(iv(40, 50)),
            ]
        );
    }

    #[test]
    fn test_periods_within_empty_set() {
        let periods = IntervalSet::new().periods_within(&iv(0, 24));
        assert_eq!(periods, vec![AvailabilityPeriod::available(iv(0, 24))]);
    }
}
