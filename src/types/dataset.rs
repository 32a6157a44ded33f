//! Describes a raster dataset and how its values are reduced.

use crate::reducers::composer::ReducerSpec;
use crate::reducers::error::ReducerError;
use crate::reducers::reducer::Reducer;
use crate::types::period_type::PeriodType;
use bon::Builder;
use serde::{Deserialize, Serialize};

/// Converts one raw band value, e.g. kelvin to degrees Celsius.
pub type ValueParser = fn(f64) -> f64;

/// Joins the values of several bands, given in band order, into one value.
pub type BandsParser = fn(&[f64]) -> f64;

/// One band or an ordered list of bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bands {
    Single(String),
    Multiple(Vec<String>),
}

impl Bands {
    pub fn names(&self) -> Vec<String> {
        match self {
            Bands::Single(band) => vec![band.clone()],
            Bands::Multiple(bands) => bands.clone(),
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, Bands::Multiple(bands) if bands.len() > 1)
    }
}

impl From<&str> for Bands {
    fn from(band: &str) -> Self {
        Bands::Single(band.to_string())
    }
}

impl From<String> for Bands {
    fn from(band: String) -> Self {
        Bands::Single(band)
    }
}

impl From<&[&str]> for Bands {
    fn from(bands: &[&str]) -> Self {
        Bands::Multiple(bands.iter().map(|b| b.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Bands {
    fn from(bands: [&str; N]) -> Self {
        Bands::from(bands.as_slice())
    }
}

/// The hourly dataset used in place of a daily one when values are cut in a
/// specific time zone.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct TimeZoneDataset {
    #[builder(into)]
    pub dataset_id: String,
    /// Band of the hourly dataset. `None` keeps the outer band.
    #[builder(into)]
    pub band: Option<String>,
    #[builder(default = PeriodType::Hourly)]
    pub period_type: PeriodType,
    /// Reducer turning hours into days, e.g. `sum` for precipitation.
    pub period_reducer: Option<Reducer>,
}

/// A raster dataset and how to reduce it.
///
/// A descriptor with several bands needs a `bands_parser` to be used with
/// [`ClimateData::earth_engine_data`](crate::ClimateData::earth_engine_data),
/// which combines the bands into one value and fails with
/// [`ClimateDataError::InvalidDataset`](crate::ClimateDataError::InvalidDataset)
/// without it. Time series, normals and projections report every band by
/// name instead and never read the parser, so multi-band presets such as
/// [`datasets::era5_daily`](crate::datasets::era5_daily) carry none.
///
/// # Examples
///
/// ```
/// use climate_data::{DatasetDescriptor, PeriodType, Reducer};
///
/// let precipitation = DatasetDescriptor::builder()
///     .dataset_id("UCSB-CHG/CHIRPS/DAILY")
///     .band("precipitation")
///     .period_reducer(Reducer::Sum)
///     .build();
/// assert_eq!(precipitation.period_type, PeriodType::Daily);
/// assert_eq!(precipitation.period_reducer().unwrap(), Reducer::Sum);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct DatasetDescriptor {
    /// Collection asset id, e.g. `ECMWF/ERA5_LAND/DAILY_AGGR`.
    #[builder(into)]
    pub dataset_id: String,
    #[builder(into)]
    pub band: Bands,
    /// Spatial reducer(s).
    #[builder(default)]
    pub reducer: ReducerSpec,
    /// Granularity of the dataset's native images.
    #[builder(default = PeriodType::Daily)]
    pub period_type: PeriodType,
    /// Reducer aggregating images over time. Defaults to the first spatial
    /// reducer.
    pub period_reducer: Option<Reducer>,
    pub value_parser: Option<ValueParser>,
    /// Joins per-band values into one. Required for multi-band datasets in
    /// `earth_engine_data`, unused elsewhere.
    pub bands_parser: Option<BandsParser>,
    pub time_zone: Option<TimeZoneDataset>,
    /// Output granularity overriding the requested one, e.g. a monthly
    /// preset over a daily collection.
    pub aggregation_period: Option<PeriodType>,
}

impl DatasetDescriptor {
    pub fn bands(&self) -> Vec<String> {
        self.band.names()
    }

    /// The reducer aggregating images over time.
    pub fn period_reducer(&self) -> Result<Reducer, ReducerError> {
        match self.period_reducer {
            Some(reducer) => Ok(reducer),
            None => self.reducer.primary(),
        }
    }

    pub(crate) fn parse_value(&self, value: f64) -> f64 {
        match self.value_parser {
            Some(parser) => parser(value),
            None => value,
        }
    }

    /// The descriptor to use when values are cut in a caller time zone: the
    /// hourly sub-dataset if there is one, else `self` unchanged.
    pub(crate) fn in_time_zone(&self) -> DatasetDescriptor {
        let Some(tz) = &self.time_zone else {
            return self.clone();
        };
        DatasetDescriptor {
            dataset_id: tz.dataset_id.clone(),
            band: tz.band.clone().map_or_else(|| self.band.clone(), Bands::Single),
            period_type: tz.period_type,
            period_reducer: tz.period_reducer.or(self.period_reducer),
            time_zone: None,
            ..self.clone()
        }
    }

    /// A single-band copy, used when a multi-band dataset is reduced one band
    /// at a time.
    pub(crate) fn for_band(&self, band: &str) -> DatasetDescriptor {
        DatasetDescriptor {
            band: Bands::from(band),
            bands_parser: None,
            ..self.clone()
        }
    }
}
