use rental_shared::Interval;
use rust_decimal::Decimal;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Daily-rate pricing.
///
/// Billable days are `ceil(duration / 1 day)` with a floor of one day. Every
/// total in the system (draft preview, creation payload, history display) goes
/// through [`PriceCalculator::total`] so preview and charge cannot diverge.
pub struct PriceCalculator;

impl PriceCalculator {
    pub fn rental_days(interval: &Interval) -> i64 {
        let millis = interval.duration().num_milliseconds();
        let days = (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
        days.max(1)
    }

    pub fn total(daily_rate: Decimal, interval: &Interval) -> Decimal {
        daily_rate * Decimal::from(Self::rental_days(interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn day0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn span(length: Duration) -> Interval {
        Interval::new(day0(), day0() + length).unwrap()
    }

    #[test]
    fn test_sub_day_charges_one_day() {
        assert_eq!(PriceCalculator::total(dec!(50), &span(Duration::minutes(90))), dec!(50));
        assert_eq!(PriceCalculator::rental_days(&span(Duration::seconds(1))), 1);
    }

    #[test]
    fn test_whole_days() {
        assert_eq!(PriceCalculator::total(dec!(50), &span(Duration::days(2))), dec!(100));
        assert_eq!(PriceCalculator::rental_days(&span(Duration::days(7))), 7);
    }

    #[test]
    fn test_partial_day_rounds_up() {
        let length = Duration::days(2) + Duration::hours(1);
        assert_eq!(PriceCalculator::rental_days(&span(length)), 3);
        assert_eq!(PriceCalculator::total(dec!(45.50), &span(length)), dec!(136.50));
    }
}
