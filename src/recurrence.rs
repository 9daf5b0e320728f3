use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::{Frequency, RecurrenceRule};

/// Hard ceiling on generated occurrences, bounds expansion cost.
pub const MAX_OCCURRENCES: u32 = 52;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("occurrence count must be between 1 and {MAX_OCCURRENCES}")]
    OccurrenceCountOutOfRange,
    #[error("weekly rules require at least one day of week")]
    EmptyDaysOfWeek,
    #[error("days of week must be between 0 (Monday) and 6 (Sunday)")]
    InvalidDayOfWeek,
    #[error("start time must be before end time")]
    StartNotBeforeEnd,
    #[error("date arithmetic overflowed while expanding the rule")]
    DateOverflow,
}

/// Expands a rule into `(start, end)` datetimes, one pair per occurrence,
/// strictly increasing. Pure and stateless; the same rule always yields the
/// same schedule.
pub fn expand(rule: &RecurrenceRule) -> Result<Vec<(NaiveDateTime, NaiveDateTime)>, RecurrenceError> {
    validate(rule)?;

    let dates = match rule.frequency {
        Frequency::Daily => expand_daily(rule)?,
        Frequency::Weekly => expand_weekly(rule)?,
        Frequency::Monthly => expand_monthly(rule)?,
    };

    Ok(dates
        .into_iter()
        .map(|date| (date.and_time(rule.start_time), date.and_time(rule.end_time)))
        .collect())
}

pub fn validate(rule: &RecurrenceRule) -> Result<(), RecurrenceError> {
    if rule.occurrence_count < 1 || rule.occurrence_count > MAX_OCCURRENCES {
        return Err(RecurrenceError::OccurrenceCountOutOfRange);
    }
    if rule.start_time >= rule.end_time {
        return Err(RecurrenceError::StartNotBeforeEnd);
    }
    if rule.frequency == Frequency::Weekly {
        if rule.days_of_week.is_empty() {
            return Err(RecurrenceError::EmptyDaysOfWeek);
        }
        if rule.days_of_week.iter().any(|&day| day > 6) {
            return Err(RecurrenceError::InvalidDayOfWeek);
        }
    }
    Ok(())
}

fn expand_daily(rule: &RecurrenceRule) -> Result<Vec<NaiveDate>, RecurrenceError> {
    (0..rule.occurrence_count)
        .map(|i| {
            rule.anchor_date
                .checked_add_signed(Duration::days(i.into()))
                .ok_or(RecurrenceError::DateOverflow)
        })
        .collect()
}

/// The anchor date is always the first occurrence, whether or not its
/// weekday is in the set; subsequent days are filtered by weekday.
fn expand_weekly(rule: &RecurrenceRule) -> Result<Vec<NaiveDate>, RecurrenceError> {
    let mut dates = Vec::with_capacity(rule.occurrence_count as usize);
    dates.push(rule.anchor_date);

    let mut cursor = rule.anchor_date;
    while dates.len() < rule.occurrence_count as usize {
        cursor = cursor
            .checked_add_signed(Duration::days(1))
            .ok_or(RecurrenceError::DateOverflow)?;
        let weekday = cursor.weekday().num_days_from_monday() as u8;
        if rule.days_of_week.contains(&weekday) {
            dates.push(cursor);
        }
    }
    Ok(dates)
}

/// Day-of-month is preserved; months too short for it clamp to their last
/// day (Jan 31 -> Feb 28/29 -> Mar 31), never skipping a month.
fn expand_monthly(rule: &RecurrenceRule) -> Result<Vec<NaiveDate>, RecurrenceError> {
    (0..rule.occurrence_count)
        .map(|i| {
            rule.anchor_date
                .checked_add_months(Months::new(i))
                .ok_or(RecurrenceError::DateOverflow)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    fn rule(frequency: Frequency, days_of_week: Vec<u8>, count: u32, anchor: NaiveDate) -> RecurrenceRule {
        RecurrenceRule {
            frequency,
            days_of_week,
            occurrence_count: count,
            anchor_date: anchor,
            start_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_daily_consecutive_dates() {
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let pairs = expand(&rule(Frequency::Daily, vec![], 3, anchor)).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].0.date(), anchor);
        assert_eq!(pairs[1].0.date(), NaiveDate::from_ymd_opt(2026, 1, 6).unwrap());
        assert_eq!(pairs[2].0.date(), NaiveDate::from_ymd_opt(2026, 1, 7).unwrap());
    }

    #[test]
    fn test_weekly_monday_wednesday() {
        // 2026-01-05 is a Monday
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let pairs = expand(&rule(Frequency::Weekly, vec![0, 2], 5, anchor)).unwrap();
        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[0].0.date(), anchor);
        for (start, _) in &pairs[1..] {
            let weekday = start.date().weekday().num_days_from_monday();
            assert!(weekday == 0 || weekday == 2);
        }
        for window in pairs.windows(2) {
            assert!(window[0].0 < window[1].0);
        }
    }

    #[test]
    fn test_weekly_anchor_seeded_even_when_weekday_not_in_set() {
        // 2026-01-06 is a Tuesday; the set only holds Friday
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        let pairs = expand(&rule(Frequency::Weekly, vec![4], 3, anchor)).unwrap();
        assert_eq!(pairs[0].0.date(), anchor);
        assert_eq!(pairs[1].0.date(), NaiveDate::from_ymd_opt(2026, 1, 9).unwrap());
        assert_eq!(pairs[2].0.date(), NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
    }

    #[test]
    fn test_monthly_clamps_short_months() {
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let pairs = expand(&rule(Frequency::Monthly, vec![], 3, anchor)).unwrap();
        let dates: Vec<NaiveDate> = pairs.iter().map(|(s, _)| s.date()).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            ]
        );
    }

    #[test]
    fn test_monthly_leap_february() {
        let anchor = NaiveDate::from_ymd_opt(2028, 1, 31).unwrap();
        let pairs = expand(&rule(Frequency::Monthly, vec![], 2, anchor)).unwrap();
        assert_eq!(pairs[1].0.date(), NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
    }

    #[test]
    fn test_times_attached_to_every_occurrence() {
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let pairs = expand(&rule(Frequency::Daily, vec![], 2, anchor)).unwrap();
        for (start, end) in pairs {
            assert_eq!(start.time(), NaiveTime::from_hms_opt(6, 0, 0).unwrap());
            assert_eq!(end.time(), NaiveTime::from_hms_opt(7, 0, 0).unwrap());
            assert!(start < end);
        }
    }

    #[test]
    fn test_weekly_empty_days_rejected() {
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let err = expand(&rule(Frequency::Weekly, vec![], 3, anchor)).unwrap_err();
        assert_eq!(err, RecurrenceError::EmptyDaysOfWeek);
    }

    #[test]
    fn test_occurrence_count_bounds() {
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(
            expand(&rule(Frequency::Daily, vec![], 0, anchor)).unwrap_err(),
            RecurrenceError::OccurrenceCountOutOfRange
        );
        assert_eq!(
            expand(&rule(Frequency::Daily, vec![], MAX_OCCURRENCES + 1, anchor)).unwrap_err(),
            RecurrenceError::OccurrenceCountOutOfRange
        );
        assert!(expand(&rule(Frequency::Daily, vec![], MAX_OCCURRENCES, anchor)).is_ok());
    }

    #[test]
    fn test_inverted_times_rejected() {
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mut bad = rule(Frequency::Daily, vec![], 3, anchor);
        bad.start_time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert_eq!(expand(&bad).unwrap_err(), RecurrenceError::StartNotBeforeEnd);
    }

    #[test]
    fn test_invalid_day_of_week_rejected() {
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let err = expand(&rule(Frequency::Weekly, vec![0, 7], 3, anchor)).unwrap_err();
        assert_eq!(err, RecurrenceError::InvalidDayOfWeek);
    }
}
