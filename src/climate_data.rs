//! The main entry point: reduces climate datasets over features and periods
//! on a remote raster engine.

use crate::cache_key::build_key;
use crate::engine::fetcher::VALUE_LIMIT;
use crate::engine::Engine;
use crate::error::ClimateDataError;
use crate::pipeline::{normals, projections, time_series, values, Context};
use crate::types::dataset::DatasetDescriptor;
use crate::types::feature::{Feature, Geometry};
use crate::types::filter::FilterClause;
use crate::types::period::PeriodSpec;
use crate::types::record::{ClimateNormal, ProjectionRecord, ReducedRecord, TimeSeriesRecord};
use bon::bon;
use log::info;
use tokio_util::sync::CancellationToken;

/// The client for extracting climate data.
///
/// Every operation builds a server-side expression, evaluates it on the
/// [`Engine`] and maps the reduced records back to period labels in the
/// requested calendar. Nothing is cached by the client; use
/// [`ClimateData::cache_key`] to key an external cache.
///
/// # Examples
///
/// ```no_run
/// # use climate_data::{datasets, ClimateData, ClimateDataError, Feature, Geometry, PeriodSpec};
/// # use climate_data::engine::http::HttpEngine;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = HttpEngine::builder()
///     .base_url("https://engine.example.org/v1")
///     .bearer_token("token")
///     .build();
/// let client = ClimateData::builder().engine(engine).build();
///
/// let dataset = datasets::find("UCSB-CHG/CHIRPS/DAILY").unwrap().dataset;
/// let period = PeriodSpec::for_range("2023-01-01", "2023-01-31")?;
/// let features = vec![Feature::new("O6uvpzGd5pu", Geometry::Point([-11.8, 8.4]))];
///
/// let records = client
///     .earth_engine_data()
///     .dataset(&dataset)
///     .period(&period)
///     .features(&features)
///     .call()
///     .await?;
/// println!("{} daily values", records.len());
/// # Ok(())
/// # }
/// ```
pub struct ClimateData<E> {
    engine: E,
    page_size: usize,
    cancellation: CancellationToken,
}

#[bon]
impl<E: Engine> ClimateData<E> {
    /// Creates a client.
    ///
    /// # Arguments
    ///
    /// * `.engine(E)`: **Required.** The engine expressions are evaluated on.
    /// * `.page_size(usize)`: Optional. Maximum number of records per list request. Defaults to [`VALUE_LIMIT`].
    /// * `.cancellation(CancellationToken)`: Optional. Cancelling it aborts every request of this client.
    #[builder]
    pub fn new(
        engine: E,
        page_size: Option<usize>,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        Self {
            engine,
            page_size: page_size.unwrap_or(VALUE_LIMIT).max(1),
            cancellation: cancellation.unwrap_or_default(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Aborts all running requests. Later requests fail with
    /// [`ClimateDataError::Cancelled`].
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    fn context(&self, cancellation: Option<CancellationToken>) -> Context<'_, E> {
        let cancel = cancellation.unwrap_or_else(|| self.cancellation.child_token());
        Context::new(&self.engine, self.page_size, cancel)
    }

    /// Reduces a dataset over many features, one value per feature and
    /// period.
    ///
    /// Native images are aggregated into the requested periods with the
    /// dataset's period reducer, then reduced over every feature with its
    /// spatial reducer. When the period has a time zone and the dataset an
    /// hourly sub-dataset, days are cut from hourly images in that zone.
    /// Multi-band datasets are reduced band by band and joined with their
    /// bands parser.
    ///
    /// # Arguments
    ///
    /// * `.dataset(&DatasetDescriptor)`: **Required.**
    /// * `.period(&PeriodSpec)`: **Required.** Range, granularity, time zone and calendar.
    /// * `.features(&[Feature])`: **Required.** Regions to reduce over.
    /// * `.cancellation(CancellationToken)`: Optional. Aborts this request only.
    ///
    /// # Errors
    ///
    /// * [`ClimateDataError::NoData`] if the dataset has no images in the period.
    /// * [`ClimateDataError::Period`] if the requested granularity is finer than the dataset's.
    /// * [`ClimateDataError::RemoteEvaluation`] if the engine fails, with its message.
    /// * [`ClimateDataError::InvalidDataset`] for a multi-band dataset without bands parser.
    #[builder]
    pub async fn earth_engine_data(
        &self,
        dataset: &DatasetDescriptor,
        period: &PeriodSpec,
        features: &[Feature],
        cancellation: Option<CancellationToken>,
    ) -> Result<Vec<ReducedRecord>, ClimateDataError> {
        info!(
            "Reducing {} over {} features from {} to {} ({})",
            dataset.dataset_id,
            features.len(),
            period.start,
            period.end,
            period.period_type
        );
        values::earth_engine_data(&self.context(cancellation), dataset, period, features).await
    }

    /// Reduces a dataset over one geometry, one record per period.
    ///
    /// Datasets with an aggregation period (e.g. a monthly preset over daily
    /// images) are rolled up to it regardless of the requested period type.
    /// Every output of the dataset's reducer is returned, named by band.
    ///
    /// # Arguments
    ///
    /// * `.dataset(&DatasetDescriptor)`: **Required.**
    /// * `.period(&PeriodSpec)`: **Required.**
    /// * `.geometry(&Geometry)`: **Required.**
    /// * `.filter(&[FilterClause])`: Optional. Extra date, calendar or equality filters.
    /// * `.cancellation(CancellationToken)`: Optional.
    ///
    /// # Errors
    ///
    /// Same as [`ClimateData::earth_engine_data`].
    #[builder]
    pub async fn time_series(
        &self,
        dataset: &DatasetDescriptor,
        period: &PeriodSpec,
        geometry: &Geometry,
        filter: Option<&[FilterClause]>,
        cancellation: Option<CancellationToken>,
    ) -> Result<Vec<TimeSeriesRecord>, ClimateDataError> {
        info!(
            "Time series of {} from {} to {}",
            dataset.dataset_id, period.start, period.end
        );
        time_series::time_series(
            &self.context(cancellation),
            dataset,
            period,
            geometry,
            filter.unwrap_or_default(),
        )
        .await
    }

    /// Monthly climate normals over the years of `period`, always twelve
    /// records from January to December.
    ///
    /// # Arguments
    ///
    /// * `.dataset(&DatasetDescriptor)`: **Required.** Usually a monthly dataset.
    /// * `.period(&PeriodSpec)`: **Required.** Only the years are used, e.g. 1991 to 2020.
    /// * `.geometry(&Geometry)`: **Required.** Points are sampled at 1 m.
    /// * `.cancellation(CancellationToken)`: Optional.
    #[builder]
    pub async fn climate_normals(
        &self,
        dataset: &DatasetDescriptor,
        period: &PeriodSpec,
        geometry: &Geometry,
        cancellation: Option<CancellationToken>,
    ) -> Result<Vec<ClimateNormal>, ClimateDataError> {
        info!(
            "Climate normals of {} for {:?}",
            dataset.dataset_id,
            period.years()
        );
        normals::climate_normals(&self.context(cancellation), dataset, period, geometry).await
    }

    /// Yearly means of every model in [`CMIP6_MODELS`](crate::CMIP6_MODELS)
    /// under one emission scenario.
    ///
    /// # Arguments
    ///
    /// * `.dataset(&DatasetDescriptor)`: **Required.** A single-band projection dataset.
    /// * `.period(&PeriodSpec)`: **Required.** The projected years.
    /// * `.geometry(&Geometry)`: **Required.**
    /// * `.scenario(&str)`: **Required.** E.g. `ssp245`.
    /// * `.cancellation(CancellationToken)`: Optional.
    #[builder]
    pub async fn climate_projections(
        &self,
        dataset: &DatasetDescriptor,
        period: &PeriodSpec,
        geometry: &Geometry,
        scenario: &str,
        cancellation: Option<CancellationToken>,
    ) -> Result<Vec<ProjectionRecord>, ClimateDataError> {
        info!(
            "Projections of {} under {} for {:?}",
            dataset.dataset_id,
            scenario,
            period.years()
        );
        projections::climate_projections(
            &self.context(cancellation),
            dataset,
            period,
            geometry,
            scenario,
        )
        .await
    }

    /// The key imported values of `feature` are cached under. See
    /// [`build_key`].
    #[builder]
    pub fn cache_key(
        &self,
        dataset: &DatasetDescriptor,
        period: &PeriodSpec,
        feature: &Feature,
        filter: Option<&[FilterClause]>,
    ) -> String {
        build_key(feature, dataset, period, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets;
    use crate::engine::mock::{MockEngine, MockImage};
    use std::error::Error;

    fn client() -> ClimateData<MockEngine> {
        let images = (1..=31)
            .map(|day| {
                MockImage::daily(&format!("2023-01-{:02}", day), &[("precipitation", day as f64)])
            })
            .collect();
        ClimateData::builder()
            .engine(MockEngine::default().with_collection("UCSB-CHG/CHIRPS/DAILY", images))
            .page_size(10)
            .build()
    }

    #[tokio::test]
    async fn test_earth_engine_data_pages_results() -> Result<(), Box<dyn Error>> {
        let client = client();
        let dataset = datasets::find("UCSB-CHG/CHIRPS/DAILY").unwrap().dataset;
        let period = PeriodSpec::for_range("2023-01-01", "2023-01-31")?;
        let features = vec![
            Feature::new("a", Geometry::Point([0.0, 0.0])),
            Feature::new("b", Geometry::Point([1.0, 1.0])),
        ];

        let records = client
            .earth_engine_data()
            .dataset(&dataset)
            .period(&period)
            .features(&features)
            .call()
            .await?;
        assert_eq!(records.len(), 62);
        assert_eq!(client.engine().to_list_calls(), 7);
        assert_eq!(records[0].period, "20230101");
        assert_eq!(records[61].value, Some(31.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_client_fails_requests() -> Result<(), Box<dyn Error>> {
        let client = client();
        client.cancel();
        let dataset = datasets::find("UCSB-CHG/CHIRPS/DAILY").unwrap().dataset;
        let period = PeriodSpec::for_range("2023-01-01", "2023-01-31")?;
        let result = client
            .time_series()
            .dataset(&dataset)
            .period(&period)
            .geometry(&Geometry::Point([0.0, 0.0]))
            .call()
            .await;
        assert!(matches!(result, Err(ClimateDataError::Cancelled(id)) if id == "UCSB-CHG/CHIRPS/DAILY"));
        assert!(client.engine().evaluated().is_empty());
        Ok(())
    }

    #[test]
    fn test_cache_key_matches_builder() -> Result<(), Box<dyn Error>> {
        let client = client();
        let dataset = datasets::relative_humidity();
        let period = PeriodSpec::for_range("2023-01-01", "2023-12-31")?;
        let feature = Feature::new("ou", Geometry::Point([0.0, 0.0]));
        let key = client
            .cache_key()
            .dataset(&dataset)
            .period(&period)
            .feature(&feature)
            .call();
        assert_eq!(key, build_key(&feature, &dataset, &period, None));
        Ok(())
    }
}
