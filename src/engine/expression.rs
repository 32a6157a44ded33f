//! Server-side expressions evaluated by the remote raster engine.
//!
//! Expressions are plain values: building one never talks to the engine.
//! They serialize to JSON objects tagged with `op`, with their input nested
//! under `input`.

use crate::reducers::composer::CompositeReducer;
use crate::reducers::reducer::Reducer;
use crate::types::feature::{Feature, Geometry};
use crate::types::filter::FilterClause;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A time window a [`Expression::Composite`] aggregates images into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    /// `system:index` of the synthetic image.
    pub index: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// How reduced records are stamped with the start of their image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStamp {
    /// strftime pattern, e.g. `%Y%m%d`.
    pub format: String,
    /// IANA zone the image start is formatted in.
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Expression {
    /// Loads an image collection by asset id.
    ImageCollection { id: String },
    /// Keeps only the named bands.
    Select {
        input: Box<Expression>,
        bands: Vec<String>,
    },
    /// Keeps images starting in `[start, end)`.
    FilterDate {
        input: Box<Expression>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Filter {
        input: Box<Expression>,
        filter: FilterClause,
    },
    First { input: Box<Expression> },
    /// Nominal scale in metres of the first band of an image.
    NominalScale { input: Box<Expression> },
    /// Number of elements in a collection.
    Size { input: Box<Expression> },
    /// Reduces a whole image collection into one image.
    Reduce {
        input: Box<Expression>,
        reducer: CompositeReducer,
    },
    /// Sets properties on an image. `system:time_start` and
    /// `system:time_end` are epoch milliseconds.
    Set {
        input: Box<Expression>,
        properties: BTreeMap<String, Value>,
    },
    FromImages { images: Vec<Expression> },
    /// One image per window, reducing the images starting inside it. Windows
    /// without images produce no image.
    Composite {
        input: Box<Expression>,
        windows: Vec<Window>,
        reducer: CompositeReducer,
    },
    /// Reduces every image over every feature. Yields a flat feature
    /// collection with `ou`, `period` and `value` properties.
    ReduceRegions {
        input: Box<Expression>,
        features: Vec<Feature>,
        reducer: Reducer,
        scale: f64,
        period: PeriodStamp,
    },
    /// Reduces every image over one geometry. Yields one feature per image
    /// carrying the reducer outputs, the optional `period` stamp and the
    /// copied image `properties`.
    ReduceRegion {
        input: Box<Expression>,
        geometry: Geometry,
        reducer: CompositeReducer,
        scale: f64,
        best_effort: bool,
        period: Option<PeriodStamp>,
        properties: Vec<String>,
    },
    /// `count` elements starting at `offset`.
    ToList {
        input: Box<Expression>,
        count: usize,
        offset: usize,
    },
}

impl Expression {
    pub fn image_collection(id: impl Into<String>) -> Self {
        Expression::ImageCollection { id: id.into() }
    }

    pub fn from_images(images: Vec<Expression>) -> Self {
        Expression::FromImages { images }
    }

    pub fn select(self, bands: &[String]) -> Self {
        Expression::Select {
            input: Box::new(self),
            bands: bands.to_vec(),
        }
    }

    pub fn filter_date(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Expression::FilterDate {
            input: Box::new(self),
            start,
            end,
        }
    }

    pub fn filter(self, filter: FilterClause) -> Self {
        Expression::Filter {
            input: Box::new(self),
            filter,
        }
    }

    pub fn first(self) -> Self {
        Expression::First {
            input: Box::new(self),
        }
    }

    pub fn nominal_scale(self) -> Self {
        Expression::NominalScale {
            input: Box::new(self),
        }
    }

    pub fn size(self) -> Self {
        Expression::Size {
            input: Box::new(self),
        }
    }

    pub fn reduce(self, reducer: CompositeReducer) -> Self {
        Expression::Reduce {
            input: Box::new(self),
            reducer,
        }
    }

    pub fn set(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        match self {
            Expression::Set {
                input,
                mut properties,
            } => {
                properties.insert(key.into(), value.into());
                Expression::Set { input, properties }
            }
            other => Expression::Set {
                input: Box::new(other),
                properties: BTreeMap::from([(key.into(), value.into())]),
            },
        }
    }

    pub fn composite(self, windows: Vec<Window>, reducer: CompositeReducer) -> Self {
        Expression::Composite {
            input: Box::new(self),
            windows,
            reducer,
        }
    }

    pub fn reduce_regions(
        self,
        features: &[Feature],
        reducer: Reducer,
        scale: f64,
        period: PeriodStamp,
    ) -> Self {
        Expression::ReduceRegions {
            input: Box::new(self),
            features: features.to_vec(),
            reducer,
            scale,
            period,
        }
    }

    pub fn reduce_region(
        self,
        geometry: &Geometry,
        reducer: CompositeReducer,
        scale: f64,
        best_effort: bool,
        period: Option<PeriodStamp>,
        properties: &[&str],
    ) -> Self {
        Expression::ReduceRegion {
            input: Box::new(self),
            geometry: geometry.clone(),
            reducer,
            scale,
            best_effort,
            period,
            properties: properties.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn to_list(self, count: usize, offset: usize) -> Self {
        Expression::ToList {
            input: Box::new(self),
            count,
            offset,
        }
    }

    /// Name of the outermost operation, for logging.
    pub fn op_name(&self) -> &'static str {
        match self {
            Expression::ImageCollection { .. } => "imageCollection",
            Expression::Select { .. } => "select",
            Expression::FilterDate { .. } => "filterDate",
            Expression::Filter { .. } => "filter",
            Expression::First { .. } => "first",
            Expression::NominalScale { .. } => "nominalScale",
            Expression::Size { .. } => "size",
            Expression::Reduce { .. } => "reduce",
            Expression::Set { .. } => "set",
            Expression::FromImages { .. } => "fromImages",
            Expression::Composite { .. } => "composite",
            Expression::ReduceRegions { .. } => "reduceRegions",
            Expression::ReduceRegion { .. } => "reduceRegion",
            Expression::ToList { .. } => "toList",
        }
    }
}
