use crate::schema::Period;
use chrono::{Days, NaiveDate};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

/// Nominal length in days used when matching adjacent periods.
/// Months (28-31 days) collapse to 31 and years (365-366 days) to 365.
pub const NOMINAL_MONTH_DAYS: i64 = 31;
pub const NOMINAL_YEAR_DAYS: i64 = 365;

pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

/// The day after `date`, saturating at the calendar maximum.
pub fn add_one_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// Start and end of a period as datetimes at midnight.
///
/// End dates and instants are moved to the following midnight, so an instant
/// of 2020-12-31 and a duration ending 2020-12-31 share the end 2021-01-01,
/// and the instant preceding a duration starting 2020-01-01 is 2019-12-31.
/// Instants have no start; forever has neither.
pub fn period_bounds(period: &Period) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match period {
        Period::Instant { date } => (None, Some(add_one_day(*date))),
        Period::Duration { start, end } => (Some(*start), Some(add_one_day(*end))),
        Period::Forever => (None, None),
    }
}

pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

pub fn nominal_period(days: i64) -> i64 {
    if days > 364 && days <= 366 {
        return NOMINAL_YEAR_DAYS;
    }
    if (28..=31).contains(&days) {
        return NOMINAL_MONTH_DAYS;
    }
    days
}

pub fn nominal_period_between(start: NaiveDate, end: NaiveDate) -> i64 {
    nominal_period(days_between(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_bounds_end_of_day() {
        let (start, end) = period_bounds(&Period::Instant {
            date: date(2020, 12, 31),
        });
        assert_eq!(start, None);
        assert_eq!(end, Some(date(2021, 1, 1)));

        let (start, end) = period_bounds(&Period::Duration {
            start: date(2020, 1, 1),
            end: date(2020, 12, 31),
        });
        assert_eq!(start, Some(date(2020, 1, 1)));
        assert_eq!(end, Some(date(2021, 1, 1)));

        assert_eq!(period_bounds(&Period::Forever), (None, None));
    }

    #[test]
    fn test_nominal_period_bands() {
        assert_eq!(nominal_period(28), NOMINAL_MONTH_DAYS);
        assert_eq!(nominal_period(31), NOMINAL_MONTH_DAYS);
        assert_eq!(nominal_period(32), 32);
        assert_eq!(nominal_period(364), 364);
        assert_eq!(nominal_period(365), NOMINAL_YEAR_DAYS);
        assert_eq!(nominal_period(366), NOMINAL_YEAR_DAYS);
        assert_eq!(nominal_period(90), 90);
    }

    #[test]
    fn test_nominal_period_between_leap_year() {
        // 2020 is a leap year: 366 days between 2020-01-01 and 2021-01-01
        assert_eq!(
            nominal_period_between(date(2020, 1, 1), date(2021, 1, 1)),
            NOMINAL_YEAR_DAYS
        );
        assert_eq!(
            nominal_period_between(date(2023, 2, 1), date(2023, 3, 1)),
            NOMINAL_MONTH_DAYS
        );
    }
}
