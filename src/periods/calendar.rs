//! Calendar systems used to cut and label periods.

use crate::types::period_type::PeriodType;
use crate::types::traits::utils::first_of_next_month;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Julian day number of 0001-01-01 minus one, so `jdn = days_from_ce + offset`.
const JDN_CE_OFFSET: i64 = 1_721_425;
/// Julian day number offset of the Amete Mihret era.
const ETHIOPIAN_EPOCH: i64 = 1_723_856;

/// The calendar system period boundaries and labels are expressed in.
///
/// Weeks are ISO weeks in every calendar. Months, and therefore monthly
/// buckets, follow the calendar: Ethiopian years have twelve 30-day months
/// followed by Pagume, a 13th month of five or six days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Calendar {
    #[default]
    Gregorian,
    Ethiopian,
}

impl Calendar {
    /// The start of the `period_type` period that follows the one containing `at`.
    pub(crate) fn next_boundary(
        &self,
        period_type: PeriodType,
        at: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        let date = at.date();
        let next = match period_type {
            PeriodType::Hourly => {
                let hour_start = at.date().and_hms_opt(at.hour(), 0, 0)?;
                return hour_start.checked_add_signed(Duration::hours(1));
            }
            PeriodType::Daily => date.succ_opt()?,
            PeriodType::Weekly => {
                let days_left = 7 - i64::from(date.weekday().num_days_from_monday());
                date.checked_add_signed(Duration::days(days_left))?
            }
            PeriodType::Monthly => match self {
                Calendar::Gregorian => first_of_next_month(date.year(), date.month())?,
                Calendar::Ethiopian => EthiopianDate::from_gregorian(date)
                    .first_of_next_month()
                    .to_gregorian()?,
            },
        };
        Some(next.and_time(NaiveTime::MIN))
    }

    /// The period identifier of the `period_type` period containing `at`.
    ///
    /// Daily periods are `YYYYMMDD`, monthly `YYYYMM`, hourly `YYYYMMDDHH` and
    /// weekly the ISO week `YYYYWn`.
    ///
    /// # Examples
    ///
    /// ```
    /// use climate_data::{Calendar, PeriodType};
    /// use chrono::NaiveDate;
    ///
    /// let at = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// assert_eq!(Calendar::Gregorian.label(PeriodType::Monthly, at), "202401");
    /// assert_eq!(Calendar::Ethiopian.label(PeriodType::Daily, at), "20160422");
    /// assert_eq!(Calendar::Gregorian.label(PeriodType::Weekly, at), "2024W1");
    /// ```
    pub fn label(&self, period_type: PeriodType, at: NaiveDateTime) -> String {
        let date = at.date();
        let (year, month, day) = match self {
            Calendar::Gregorian => (date.year(), date.month(), date.day()),
            Calendar::Ethiopian => {
                let ethiopian = EthiopianDate::from_gregorian(date);
                (ethiopian.year, ethiopian.month, ethiopian.day)
            }
        };
        match period_type {
            PeriodType::Hourly => format!("{:04}{:02}{:02}{:02}", year, month, day, at.hour()),
            PeriodType::Daily => format!("{:04}{:02}{:02}", year, month, day),
            PeriodType::Weekly => {
                let week = date.iso_week();
                format!("{}W{}", week.year(), week.week())
            }
            PeriodType::Monthly => format!("{:04}{:02}", year, month),
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Calendar::Gregorian => write!(f, "gregorian"),
            Calendar::Ethiopian => write!(f, "ethiopian"),
        }
    }
}

/// A date in the Ethiopian calendar. Month 13 is Pagume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthiopianDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl EthiopianDate {
    pub fn from_gregorian(date: NaiveDate) -> Self {
        let jdn = i64::from(date.num_days_from_ce()) + JDN_CE_OFFSET;
        let days = jdn - ETHIOPIAN_EPOCH;
        let r = days.rem_euclid(1461);
        let n = r % 365 + 365 * (r / 1460);
        let year = 4 * days.div_euclid(1461) + r / 365 - r / 1460;
        Self {
            year: year as i32,
            month: (n / 30 + 1) as u32,
            day: (n % 30 + 1) as u32,
        }
    }

    pub fn to_gregorian(self) -> Option<NaiveDate> {
        let year = i64::from(self.year);
        let jdn = ETHIOPIAN_EPOCH + 365 + 365 * (year - 1) + year.div_euclid(4)
            + 30 * i64::from(self.month)
            + i64::from(self.day)
            - 31;
        NaiveDate::from_num_days_from_ce_opt(i32::try_from(jdn - JDN_CE_OFFSET).ok()?)
    }

    fn first_of_next_month(self) -> Self {
        if self.month >= 13 {
            Self {
                year: self.year + 1,
                month: 1,
                day: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
                day: 1,
            }
        }
    }
}
