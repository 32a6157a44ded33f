use crate::engine::Engine;
use crate::error::ClimateDataError;
use crate::periods::bucketer;
use crate::pipeline::{
    aggregate_periods, malformed, number, period_stamp, properties, source_collection, text,
    Context,
};
use crate::reducers::composer::{CompositeReducer, Weighting};
use crate::scale::ScaleTarget;
use crate::types::dataset::{BandsParser, DatasetDescriptor};
use crate::types::feature::Feature;
use crate::types::period::PeriodSpec;
use crate::types::record::ReducedRecord;
use futures_util::future::try_join_all;
use log::info;
use std::collections::HashMap;

/// Reduces `dataset` over every feature and every period bucket.
///
/// Multi-band datasets are reduced one band at a time, concurrently, and
/// joined per feature and period with the dataset's bands parser.
pub(crate) async fn earth_engine_data<E: Engine + ?Sized>(
    ctx: &Context<'_, E>,
    dataset: &DatasetDescriptor,
    period: &PeriodSpec,
    features: &[Feature],
) -> Result<Vec<ReducedRecord>, ClimateDataError> {
    if !dataset.band.is_multiple() {
        return band_values(ctx, dataset, period, features).await;
    }
    let parser = dataset
        .bands_parser
        .ok_or_else(|| ClimateDataError::InvalidDataset {
            dataset_id: dataset.dataset_id.clone(),
            reason: "several bands but no bands parser".to_string(),
        })?;
    let bands = dataset.bands();
    info!(
        "Reducing {} bands of {} for {} features",
        bands.len(),
        dataset.dataset_id,
        features.len()
    );
    let band_datasets: Vec<DatasetDescriptor> =
        bands.iter().map(|band| dataset.for_band(band)).collect();
    let per_band = try_join_all(
        band_datasets
            .iter()
            .map(|band_dataset| band_values(ctx, band_dataset, period, features)),
    )
    .await?;
    Ok(join_bands(per_band, parser))
}

async fn band_values<E: Engine + ?Sized>(
    ctx: &Context<'_, E>,
    dataset: &DatasetDescriptor,
    period: &PeriodSpec,
    features: &[Feature],
) -> Result<Vec<ReducedRecord>, ClimateDataError> {
    let dataset = match period.time_zone {
        Some(_) => dataset.in_time_zone(),
        None => dataset.clone(),
    };
    let id = dataset.dataset_id.as_str();
    let bands = dataset.bands();
    let reducer = dataset.reducer.primary()?;
    let period_reducer =
        CompositeReducer::single(dataset.period_reducer()?, Weighting::Weighted, &bands);
    let target = dataset.aggregation_period.unwrap_or(period.period_type);
    let plan = bucketer::plan(period, dataset.period_type, target)?;

    let collection = source_collection(id, &bands, period)?;
    ctx.require_images(id, period, &collection).await?;
    let scale = ctx
        .scale(id, &collection, reducer, ScaleTarget::Features(features))
        .await?;

    let images = aggregate_periods(collection, &plan, period, &period_reducer)?;
    let reduced = images.reduce_regions(features, reducer, scale, period_stamp(&plan, period));
    let rows = ctx.fetch_all(id, &reduced).await?;

    let labels = plan.labels(period.calendar);
    rows.iter()
        .map(|row| {
            let props = properties(id, row)?;
            let feature_id =
                text(props, "ou").ok_or_else(|| malformed(id, "record without ou"))?;
            let native = text(props, "period").ok_or_else(|| {
                malformed(id, format!("record for {} without period", feature_id))
            })?;
            let period = labels
                .label(&native)
                .ok_or_else(|| malformed(id, format!("unknown period '{}'", native)))?;
            Ok(ReducedRecord {
                feature_id,
                period,
                value: number(props, "value").map(|v| dataset.parse_value(v)),
            })
        })
        .collect()
}

/// Joins per-band records in the order of the first band. A record without a
/// value in any band has no joined value.
fn join_bands(mut per_band: Vec<Vec<ReducedRecord>>, parser: BandsParser) -> Vec<ReducedRecord> {
    if per_band.is_empty() {
        return Vec::new();
    }
    let first = per_band.remove(0);
    let others: Vec<HashMap<(String, String), Option<f64>>> = per_band
        .into_iter()
        .map(|records| {
            records
                .into_iter()
                .map(|r| ((r.feature_id, r.period), r.value))
                .collect()
        })
        .collect();
    first
        .into_iter()
        .map(|record| {
            let key = (record.feature_id.clone(), record.period.clone());
            let values: Option<Vec<f64>> = std::iter::once(record.value)
                .chain(others.iter().map(|band| band.get(&key).copied().flatten()))
                .collect();
            ReducedRecord {
                value: values.map(|v| parser(&v)).filter(|v| v.is_finite()),
                ..record
            }
        })
        .collect()
}
