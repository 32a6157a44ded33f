use crate::engine::Engine;
use crate::error::ClimateDataError;
use crate::periods::bucketer;
use crate::pipeline::{
    aggregate_periods, malformed, number, period_stamp, properties, source_collection, text,
    Context,
};
use crate::reducers::composer::{compose, CompositeReducer, ReducerSpec, Weighting};
use crate::reducers::error::ReducerError;
use crate::scale::ScaleTarget;
use crate::types::dataset::DatasetDescriptor;
use crate::types::feature::Geometry;
use crate::types::filter::FilterClause;
use crate::types::period::PeriodSpec;
use crate::types::record::TimeSeriesRecord;

/// Reduces `dataset` over one geometry for every period bucket, optionally
/// restricted by ad-hoc filters.
pub(crate) async fn time_series<E: Engine + ?Sized>(
    ctx: &Context<'_, E>,
    dataset: &DatasetDescriptor,
    period: &PeriodSpec,
    geometry: &Geometry,
    filter: &[FilterClause],
) -> Result<Vec<TimeSeriesRecord>, ClimateDataError> {
    let dataset = match period.time_zone {
        Some(_) => dataset.in_time_zone(),
        None => dataset.clone(),
    };
    let id = dataset.dataset_id.as_str();
    let bands = dataset.bands();
    let spatial = compose(&dataset.reducer, &bands, Weighting::Weighted)?;
    let temporal = rollup_reducer(&dataset, &spatial, &bands)?;
    let target = dataset.aggregation_period.unwrap_or(period.period_type);
    let plan = bucketer::plan(period, dataset.period_type, target)?;

    let collection = filter
        .iter()
        .cloned()
        .fold(source_collection(id, &bands, period)?, |images, clause| {
            images.filter(clause)
        });
    ctx.require_images(id, period, &collection).await?;
    let scale = ctx
        .scale(
            id,
            &collection,
            dataset.reducer.primary()?,
            ScaleTarget::Geometry(geometry),
        )
        .await?;

    let images = aggregate_periods(collection, &plan, period, &temporal)?;
    let series = images.reduce_region(
        geometry,
        spatial.clone(),
        scale,
        false,
        Some(period_stamp(&plan, period)),
        &[],
    );
    let rows = ctx.fetch_all(id, &series).await?;

    let labels = plan.labels(period.calendar);
    rows.iter()
        .map(|row| {
            let props = properties(id, row)?;
            let native =
                text(props, "period").ok_or_else(|| malformed(id, "record without period"))?;
            let period = labels
                .label(&native)
                .ok_or_else(|| malformed(id, format!("unknown period '{}'", native)))?;
            let values = spatial
                .outputs
                .iter()
                .map(|output| {
                    let value = number(props, output).map(|v| dataset.parse_value(v));
                    (output.clone(), value)
                })
                .collect();
            Ok(TimeSeriesRecord { period, values })
        })
        .collect()
}

/// The reducer aggregating images over time. Per-band reducer lists
/// aggregate each band with its own reducer, everything else uses the period
/// reducer. Band names are kept either way.
fn rollup_reducer(
    dataset: &DatasetDescriptor,
    spatial: &CompositeReducer,
    bands: &[String],
) -> Result<CompositeReducer, ReducerError> {
    match &dataset.reducer {
        ReducerSpec::Combined {
            shared_inputs: false,
            ..
        } if dataset.period_reducer.is_none() => Ok(spatial.clone()),
        _ => Ok(CompositeReducer::single(
            dataset.period_reducer()?,
            Weighting::Weighted,
            bands,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets;
    use crate::engine::mock::{MockEngine, MockImage};
    use crate::types::filter::CalendarField;
    use chrono::{Duration, NaiveDate};
    use std::error::Error;
    use tokio_util::sync::CancellationToken;

    fn district() -> Geometry {
        Geometry::Polygon(vec![vec![
            [-12.0, 8.0],
            [-11.0, 8.0],
            [-11.0, 9.0],
            [-12.0, 9.0],
            [-12.0, 8.0],
        ]])
    }

    fn daily_images(from: NaiveDate, days: i64, bands: &[&str]) -> Vec<MockImage> {
        (0..days)
            .map(|d| {
                let values: Vec<(&str, f64)> = bands.iter().map(|b| (*b, d as f64)).collect();
                MockImage::daily(&(from + Duration::days(d)).to_string(), &values)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_heat_stress_monthly_rollup() -> Result<(), Box<dyn Error>> {
        let engine = MockEngine::default().with_collection(
            "projects/climate-engine-pro/assets/ce-era5-heat",
            daily_images(
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                59,
                &["utci_mean", "utci_min", "utci_max"],
            ),
        );
        let ctx = Context::new(&engine, 5000, CancellationToken::new());
        let period = PeriodSpec::for_range("2023-01-01", "2023-02-28")?;

        let series = time_series(
            &ctx,
            &datasets::era5_heat_monthly(),
            &period,
            &district(),
            &[],
        )
        .await?;
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].period, "202301");
        assert_eq!(series[0].get("utci_mean"), Some(15.0));
        assert_eq!(series[0].get("utci_min"), Some(0.0));
        assert_eq!(series[0].get("utci_max"), Some(30.0));
        assert_eq!(series[1].period, "202302");
        assert_eq!(series[1].value(), Some(44.5));
        assert_eq!(series[1].get("utci_max"), Some(58.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_filters_restrict_images() -> Result<(), Box<dyn Error>> {
        let engine = MockEngine::default().with_collection(
            "UCSB-CHG/CHIRPS/DAILY",
            daily_images(
                NaiveDate::from_ymd_opt(2023, 1, 30).unwrap(),
                4,
                &["precipitation"],
            ),
        );
        let ctx = Context::new(&engine, 5000, CancellationToken::new());
        let dataset = datasets::find("UCSB-CHG/CHIRPS/DAILY").unwrap().dataset;
        let period = PeriodSpec::for_range("2023-01-30", "2023-02-02")?;
        let january = [FilterClause::calendar_range(1, 1, CalendarField::Month)];

        let series = time_series(&ctx, &dataset, &period, &district(), &january).await?;
        let periods: Vec<&str> = series.iter().map(|r| r.period.as_str()).collect();
        assert_eq!(periods, ["20230130", "20230131"]);
        assert_eq!(series[1].value(), Some(1.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_filtered_out_period_is_no_data() -> Result<(), Box<dyn Error>> {
        let engine = MockEngine::default().with_collection(
            "UCSB-CHG/CHIRPS/DAILY",
            daily_images(
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                10,
                &["precipitation"],
            ),
        );
        let ctx = Context::new(&engine, 5000, CancellationToken::new());
        let dataset = datasets::find("UCSB-CHG/CHIRPS/DAILY").unwrap().dataset;
        let period = PeriodSpec::for_range("2023-01-01", "2023-01-10")?;
        let july = [FilterClause::calendar_range(7, 7, CalendarField::Month)];

        let result = time_series(&ctx, &dataset, &period, &district(), &july).await;
        assert!(matches!(result, Err(ClimateDataError::NoData { .. })));
        assert_eq!(engine.evaluated(), ["size"]);
        Ok(())
    }
}
