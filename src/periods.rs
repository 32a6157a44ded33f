pub mod bucketer;
pub mod calendar;
pub mod error;
