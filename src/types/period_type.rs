//! Defines the granularity of raster datasets and of requested output periods.

use crate::periods::error::PeriodError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The time granularity of a dataset's native images, or of the periods a
/// caller wants values for.
///
/// Variants are ordered from finest to coarsest, so `PeriodType::Hourly <
/// PeriodType::Monthly`.
///
/// # Examples
///
/// ```
/// use climate_data::PeriodType;
///
/// assert_eq!(format!("{}", PeriodType::Hourly), "hourly");
/// assert_eq!("monthly".parse::<PeriodType>().unwrap(), PeriodType::Monthly);
/// assert!(PeriodType::Daily < PeriodType::Weekly);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// One image per hour, e.g. ERA5-Land hourly.
    Hourly,
    /// One image per calendar day.
    Daily,
    /// One image per ISO week (Monday to Sunday).
    Weekly,
    /// One image per calendar month.
    Monthly,
}

impl PeriodType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Hourly => "hourly",
            PeriodType::Daily => "daily",
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
        }
    }

    /// Format used by the engine to stamp a reduced record with the start of
    /// its image. Hourly images need the hour to stay unique.
    pub(crate) fn native_id_format(&self) -> &'static str {
        match self {
            PeriodType::Hourly => "%Y%m%d%H",
            _ => "%Y%m%d",
        }
    }

    /// The intermediate granularities to aggregate through when turning
    /// `self` images into `target` periods.
    ///
    /// An empty plan means identity bucketing. Hourly data is always collapsed
    /// to local days first, and only then to weeks or months.
    pub(crate) fn downsample_plan(
        self,
        target: PeriodType,
    ) -> Result<Vec<PeriodType>, PeriodError> {
        if target < self {
            return Err(PeriodError::UnsupportedGranularity {
                requested: target,
                native: self,
            });
        }
        Ok(match (self, target) {
            (native, target) if native == target => vec![],
            (PeriodType::Hourly, PeriodType::Daily) => vec![PeriodType::Daily],
            (PeriodType::Hourly, coarser) => vec![PeriodType::Daily, coarser],
            (_, coarser) => vec![coarser],
        })
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(PeriodType::Hourly),
            "daily" => Ok(PeriodType::Daily),
            "weekly" => Ok(PeriodType::Weekly),
            "monthly" => Ok(PeriodType::Monthly),
            other => Err(PeriodError::UnknownPeriodType(other.to_string())),
        }
    }
}
