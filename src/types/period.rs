//! The period a caller requests values for.

use crate::periods::calendar::Calendar;
use crate::periods::error::PeriodError;
use crate::types::period_type::PeriodType;
use crate::types::traits::any_date::AnyDate;
use bon::Builder;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::ops::RangeInclusive;

/// The requested period: an inclusive range of calendar dates interpreted in
/// a time zone, the output granularity, and the calendar used for labels.
///
/// # Examples
///
/// ```
/// use climate_data::{Calendar, PeriodSpec, PeriodType};
/// use chrono::NaiveDate;
///
/// let period = PeriodSpec::builder()
///     .start(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
///     .end(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())
///     .period_type(PeriodType::Monthly)
///     .build();
/// assert_eq!(period.calendar, Calendar::Gregorian);
/// assert_eq!(period.tz(), chrono_tz::UTC);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct PeriodSpec {
    /// First day of the period (inclusive).
    pub start: NaiveDate,
    /// Last day of the period (inclusive).
    pub end: NaiveDate,
    /// Time zone days are cut in. `None` means UTC and also keeps the dataset's
    /// own images instead of its time-zone sub-dataset.
    pub time_zone: Option<Tz>,
    /// Requested output granularity.
    #[builder(default = PeriodType::Daily)]
    pub period_type: PeriodType,
    #[builder(default)]
    pub calendar: Calendar,
}

impl PeriodSpec {
    /// Creates a daily, UTC, Gregorian period from anything implementing
    /// [`AnyDate`]. The period starts at the start of `start` and ends at the
    /// end of `end`, so `for_range(Year(2020), Year(2021))` spans two years.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::DateParsing`] if an input cannot be resolved and
    /// [`PeriodError::InvertedRange`] if the range ends before it starts.
    pub fn for_range(start: impl AnyDate, end: impl AnyDate) -> Result<Self, PeriodError> {
        let start = start.get_date_range().ok_or(PeriodError::DateParsing)?.start;
        let end = end.get_date_range().ok_or(PeriodError::DateParsing)?.end;
        let period = PeriodSpec::builder().start(start).end(end).build();
        period.validate()?;
        Ok(period)
    }

    /// Returns a copy of this period cut in the named IANA time zone.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::UnknownTimeZone`] for names chrono-tz does not know.
    pub fn in_time_zone(&self, name: &str) -> Result<Self, PeriodError> {
        let tz: Tz = name
            .parse()
            .map_err(|_| PeriodError::UnknownTimeZone(name.to_string()))?;
        Ok(Self {
            time_zone: Some(tz),
            ..self.clone()
        })
    }

    pub fn tz(&self) -> Tz {
        self.time_zone.unwrap_or(Tz::UTC)
    }

    /// Calendar years touched by the period, used by climate normals and projections.
    pub fn years(&self) -> RangeInclusive<i32> {
        self.start.year()..=self.end.year()
    }

    pub(crate) fn validate(&self) -> Result<(), PeriodError> {
        if self.start > self.end {
            return Err(PeriodError::InvertedRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Local start and exclusive local end. The end is advanced by one day so
    /// the last requested day is included.
    pub(crate) fn local_range(&self) -> Result<(NaiveDateTime, NaiveDateTime), PeriodError> {
        self.validate()?;
        let end = self
            .end
            .checked_add_signed(Duration::days(1))
            .ok_or(PeriodError::OutOfRange(self.end))?;
        Ok((
            self.start.and_time(NaiveTime::MIN),
            end.and_time(NaiveTime::MIN),
        ))
    }

    /// The requested range as UTC instants, `[start, end)`.
    pub(crate) fn utc_window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), PeriodError> {
        let (start, end) = self.local_range()?;
        let tz = self.tz();
        Ok((local_to_utc(tz, start)?, local_to_utc(tz, end)?))
    }
}

/// Converts a local wall-clock time to UTC. Ambiguous times resolve to the
/// earlier instant; times inside a DST gap move forward by one hour.
pub(crate) fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, PeriodError> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(local + Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| PeriodError::NonexistentLocalTime {
            local,
            time_zone: tz.name().to_string(),
        })
}
