//! Cuts a requested period into contiguous buckets and plans how native
//! images are aggregated into them.

use crate::engine::expression::Window;
use crate::periods::calendar::Calendar;
use crate::periods::error::PeriodError;
use crate::types::period::{local_to_utc, PeriodSpec};
use crate::types::period_type::PeriodType;
use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

/// A contiguous slice of the requested period, in local wall-clock time.
///
/// Buckets are half-open: `start` is included, `end` is not. The first and
/// last bucket of a request are clipped to the requested range, so a monthly
/// bucket may cover less than a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodBucket {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Identifier of the calendar period containing `start`.
    pub label: String,
}

impl PeriodBucket {
    /// The Gregorian identifier the engine stamps on this bucket's image.
    pub fn native_id(&self, period_type: PeriodType) -> String {
        self.start
            .format(period_type.native_id_format())
            .to_string()
    }

    pub(crate) fn window(&self, tz: Tz, period_type: PeriodType) -> Result<Window, PeriodError> {
        Ok(Window {
            index: self.native_id(period_type),
            start: local_to_utc(tz, self.start)?,
            end: local_to_utc(tz, self.end)?,
        })
    }
}

/// Computes the buckets of `period` at its requested granularity.
///
/// # Errors
///
/// Returns [`PeriodError::UnsupportedGranularity`] when the requested period
/// type is finer than `native`, and [`PeriodError::InvertedRange`] for an
/// inverted period.
///
/// # Examples
///
/// ```
/// use climate_data::{bucket, PeriodSpec, PeriodType};
///
/// let period = PeriodSpec::for_range("2023-01-30", "2023-02-02").unwrap();
/// let monthly = PeriodSpec { period_type: PeriodType::Monthly, ..period };
/// let buckets = bucket(&monthly, PeriodType::Daily).unwrap();
/// let labels: Vec<_> = buckets.iter().map(|b| b.label.as_str()).collect();
/// assert_eq!(labels, ["202301", "202302"]);
/// ```
pub fn bucket(period: &PeriodSpec, native: PeriodType) -> Result<Vec<PeriodBucket>, PeriodError> {
    native.downsample_plan(period.period_type)?;
    split(period, period.period_type)
}

fn split(period: &PeriodSpec, period_type: PeriodType) -> Result<Vec<PeriodBucket>, PeriodError> {
    let (start, end) = period.local_range()?;
    let mut buckets = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = period
            .calendar
            .next_boundary(period_type, cursor)
            .ok_or(PeriodError::OutOfRange(cursor.date()))?
            .min(end);
        buckets.push(PeriodBucket {
            start: cursor,
            end: next,
            label: period.calendar.label(period_type, cursor),
        });
        cursor = next;
    }
    Ok(buckets)
}

/// One aggregation step: native or intermediate images are reduced into the
/// windows of `period_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketStage {
    pub period_type: PeriodType,
    pub buckets: Vec<PeriodBucket>,
}

/// How a dataset's native images become the requested output periods.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketPlan {
    /// Aggregation stages in order. Empty for identity bucketing.
    pub stages: Vec<BucketStage>,
    /// Granularity of the images records are read from.
    pub output: PeriodType,
    /// Buckets of the output granularity, used for labelling.
    pub buckets: Vec<PeriodBucket>,
}

impl BucketPlan {
    pub fn is_identity(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn labels(&self, calendar: Calendar) -> PeriodLabels {
        PeriodLabels::new(&self.buckets, self.output, calendar)
    }
}

/// Plans the aggregation of `native` images into `target` periods of `period`.
///
/// Hourly images are first collapsed into local days, then into weeks or
/// months. `period.period_type` is ignored in favour of `target` so callers
/// can apply a dataset's aggregation override.
pub fn plan(
    period: &PeriodSpec,
    native: PeriodType,
    target: PeriodType,
) -> Result<BucketPlan, PeriodError> {
    let steps = native.downsample_plan(target)?;
    let stages = steps
        .into_iter()
        .map(|period_type| {
            Ok(BucketStage {
                period_type,
                buckets: split(period, period_type)?,
            })
        })
        .collect::<Result<Vec<_>, PeriodError>>()?;
    let buckets = match stages.last() {
        Some(stage) => stage.buckets.clone(),
        None => split(period, native)?,
    };
    debug!(
        "Bucketing {} images into {} {} buckets over {} stage(s)",
        native,
        buckets.len(),
        target,
        stages.len()
    );
    Ok(BucketPlan {
        stages,
        output: target,
        buckets,
    })
}

/// Mapping table from native (Gregorian) period identifiers, as stamped on
/// reduced records, to labels in the requested calendar.
#[derive(Debug, Clone)]
pub struct PeriodLabels {
    period_type: PeriodType,
    calendar: Calendar,
    table: HashMap<String, String>,
}

impl PeriodLabels {
    pub fn new(buckets: &[PeriodBucket], period_type: PeriodType, calendar: Calendar) -> Self {
        let table = buckets
            .iter()
            .map(|b| (b.native_id(period_type), b.label.clone()))
            .collect();
        Self {
            period_type,
            calendar,
            table,
        }
    }

    /// Looks up the label for a native identifier (`YYYYMMDD` or
    /// `YYYYMMDDHH`). Identifiers that are not bucket starts are labelled with
    /// the calendar period containing them.
    pub fn label(&self, native_id: &str) -> Option<String> {
        if let Some(label) = self.table.get(native_id) {
            return Some(label.clone());
        }
        let at = parse_native_id(native_id)?;
        Some(self.calendar.label(self.period_type, at))
    }
}

fn parse_native_id(native_id: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(native_id.get(..8)?, "%Y%m%d").ok()?;
    let hour = match native_id.get(8..10) {
        Some(hour) => hour.parse().ok()?,
        None => 0,
    };
    date.and_hms_opt(hour, 0, 0)
}
