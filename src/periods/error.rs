use crate::types::period_type::PeriodType;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeriodError {
    #[error("Cannot produce {requested} periods from a dataset with {native} images")]
    UnsupportedGranularity {
        requested: PeriodType,
        native: PeriodType,
    },

    #[error("Period start {start} is after period end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("Could not resolve a date range from the given input")]
    DateParsing,

    #[error("Unknown period type '{0}'")]
    UnknownPeriodType(String),

    #[error("Unknown time zone '{0}'")]
    UnknownTimeZone(String),

    #[error("Local time {local} does not exist in time zone {time_zone}")]
    NonexistentLocalTime {
        local: NaiveDateTime,
        time_zone: String,
    },

    #[error("Date {0} is outside the range supported by the calendar")]
    OutOfRange(NaiveDate),
}
