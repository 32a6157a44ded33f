//! The reduction pipelines behind the public client operations.

pub(crate) mod normals;
pub mod projections;
pub(crate) mod time_series;
pub(crate) mod values;

use crate::engine::expression::{Expression, PeriodStamp};
use crate::engine::fetcher::ChunkedFetcher;
use crate::engine::{evaluate_number, Engine};
use crate::error::ClimateDataError;
use crate::periods::bucketer::BucketPlan;
use crate::periods::error::PeriodError;
use crate::reducers::composer::CompositeReducer;
use crate::reducers::reducer::Reducer;
use crate::scale::{self, ScaleTarget};
use crate::types::period::PeriodSpec;
use log::{debug, info};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

/// Engine, page size and cancellation token of one outer call.
pub(crate) struct Context<'a, E: ?Sized> {
    engine: &'a E,
    page_size: usize,
    cancel: CancellationToken,
}

impl<'a, E: Engine + ?Sized> Context<'a, E> {
    pub(crate) fn new(engine: &'a E, page_size: usize, cancel: CancellationToken) -> Self {
        Self {
            engine,
            page_size,
            cancel,
        }
    }

    /// Counts the images of `collection` and fails with
    /// [`ClimateDataError::NoData`] when there are none, before anything
    /// else is evaluated.
    pub(crate) async fn require_images(
        &self,
        dataset_id: &str,
        period: &PeriodSpec,
        collection: &Expression,
    ) -> Result<usize, ClimateDataError> {
        let count = evaluate_number(self.engine, &collection.clone().size(), &self.cancel)
            .await
            .map_err(|e| ClimateDataError::remote(dataset_id, e))?;
        let count = count.max(0.0) as usize;
        if count == 0 {
            info!(
                "No images in {} between {} and {}",
                dataset_id, period.start, period.end
            );
            return Err(ClimateDataError::NoData {
                dataset_id: dataset_id.to_string(),
                start: period.start,
                end: period.end,
            });
        }
        debug!("{} images in {}", count, dataset_id);
        Ok(count)
    }

    pub(crate) async fn scale(
        &self,
        dataset_id: &str,
        collection: &Expression,
        reducer: Reducer,
        target: ScaleTarget<'_>,
    ) -> Result<f64, ClimateDataError> {
        scale::resolve_scale(self.engine, &self.cancel, collection, reducer, target)
            .await
            .map_err(|e| ClimateDataError::remote(dataset_id, e))
    }

    pub(crate) async fn nominal_scale(
        &self,
        dataset_id: &str,
        collection: &Expression,
    ) -> Result<f64, ClimateDataError> {
        scale::nominal_scale(self.engine, &self.cancel, collection)
            .await
            .map_err(|e| ClimateDataError::remote(dataset_id, e))
    }

    pub(crate) async fn fetch_all(
        &self,
        dataset_id: &str,
        collection: &Expression,
    ) -> Result<Vec<Value>, ClimateDataError> {
        ChunkedFetcher::new(self.engine, self.page_size, &self.cancel)
            .fetch_all(collection)
            .await
            .map_err(|e| ClimateDataError::remote(dataset_id, e))
    }
}

/// Loads `dataset_id`, keeps `bands` and the images starting inside the
/// period.
pub(crate) fn source_collection(
    dataset_id: &str,
    bands: &[String],
    period: &PeriodSpec,
) -> Result<Expression, PeriodError> {
    let (start, end) = period.utc_window()?;
    Ok(Expression::image_collection(dataset_id)
        .select(bands)
        .filter_date(start, end))
}

/// Applies the aggregation stages of `plan` to `collection`.
pub(crate) fn aggregate_periods(
    collection: Expression,
    plan: &BucketPlan,
    period: &PeriodSpec,
    reducer: &CompositeReducer,
) -> Result<Expression, PeriodError> {
    let tz = period.tz();
    plan.stages.iter().try_fold(collection, |images, stage| {
        let windows = stage
            .buckets
            .iter()
            .map(|bucket| bucket.window(tz, stage.period_type))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(images.composite(windows, reducer.clone()))
    })
}

/// How reduced records identify the image they come from.
pub(crate) fn period_stamp(plan: &BucketPlan, period: &PeriodSpec) -> PeriodStamp {
    PeriodStamp {
        format: plan.output.native_id_format().to_string(),
        time_zone: period.tz().name().to_string(),
    }
}

pub(crate) fn properties<'r>(
    dataset_id: &str,
    row: &'r Value,
) -> Result<&'r Map<String, Value>, ClimateDataError> {
    row.get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(dataset_id, format!("record without properties: {}", row)))
}

/// A numeric property. Missing and `null` values are `None`.
pub(crate) fn number(properties: &Map<String, Value>, key: &str) -> Option<f64> {
    match properties.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub(crate) fn text(properties: &Map<String, Value>, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn malformed(dataset_id: &str, reason: impl Into<String>) -> ClimateDataError {
    ClimateDataError::MalformedRecord {
        dataset_id: dataset_id.to_string(),
        reason: reason.into(),
    }
}
