//! Julian day and calendar arithmetic used for SAC reference times.
//!
//! SAC headers store the reference date as a year and a day of the year (`nzjday`), so converting
//! between time zones means rolling hours into days and days into years by hand.

use chrono::{Duration, NaiveDate};

use crate::errors::SeisDataErr;

// Days before the first of each month in a common year.
const DAYS_BEFORE_MONTH: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Gregorian leap year rule.
pub fn is_leap_year(year: i32) -> bool {
    year % 400 == 0 || (year % 4 == 0 && year % 100 != 0)
}

/// Number of days in `year`.
pub fn days_in_year(year: i32) -> i32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Convert a calendar date to a day of the year, January 1st is day 1.
pub fn day_of_year(year: i32, month: u32, day: u32) -> Result<u32, SeisDataErr> {
    if month == 0 || month > 12 {
        return Err(SeisDataErr::InvalidDate(format!("month error: {}", month)));
    }

    let mut jday = DAYS_BEFORE_MONTH[(month - 1) as usize] + day;
    if is_leap_year(year) && month > 2 {
        jday += 1;
    }

    Ok(jday)
}

/// Convert a day of the year back to a calendar date.
pub fn date_from_day_of_year(year: i32, jday: u32) -> Result<NaiveDate, SeisDataErr> {
    if jday == 0 || jday as i32 > days_in_year(year) {
        return Err(SeisDataErr::InvalidDate(format!(
            "day {} of year {}",
            jday, year
        )));
    }

    let first_day = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| SeisDataErr::InvalidDate(format!("year {}", year)))?;

    Ok(first_day + Duration::days(i64::from(jday) - 1))
}

/// Roll a day of the year that ran past either end of `year` into the neighboring year.
///
/// Only a single year of overflow is handled, which is all a time zone shift can produce.
pub fn normalize_day(year: i32, jday: i32) -> (i32, i32) {
    if jday > days_in_year(year) {
        (year + 1, jday - days_in_year(year))
    } else if jday <= 0 {
        (year - 1, jday + days_in_year(year - 1))
    } else {
        (year, jday)
    }
}

/// Shift a (year, day of year, hour) triple by a whole number of hours, carrying into the day
/// and year as needed. Returns the new (year, day of year, hour).
///
/// The hour must be in `0..=23`, the day must exist in `year` and the shift is at most a day.
pub fn shift_reference_hours(
    year: i32,
    jday: i32,
    hour: i32,
    offset_hours: i32,
) -> Result<(i32, i32, i32), SeisDataErr> {
    if !(0..=23).contains(&hour) {
        return Err(SeisDataErr::InvalidDate(format!("hour {}", hour)));
    }
    if jday < 1 || jday > days_in_year(year) {
        return Err(SeisDataErr::InvalidDate(format!(
            "day {} of year {}",
            jday, year
        )));
    }
    if !(-24..=24).contains(&offset_hours) {
        return Err(SeisDataErr::InvalidDate(format!(
            "time zone offset of {} hours",
            offset_hours
        )));
    }

    let total = hour + offset_hours;
    let day_carry = total.div_euclid(24);
    let hour = total.rem_euclid(24);

    let (year, jday) = normalize_day(year, jday + day_carry);

    Ok((year, jday, hour))
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
