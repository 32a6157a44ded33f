use chrono::{Datelike, Duration, NaiveDate};

/// First day of the Gregorian month after `month` of `year`.
pub(crate) fn first_of_next_month(year: i32, month: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_month_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_month_year, next_month, 1)
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let last_day_of_current_month = first_of_next_month(year, month)? - Duration::days(1);
    Some(last_day_of_current_month.day())
}
