mod cache_key;
mod climate_data;
pub mod datasets;
pub mod engine;
mod error;
mod periods;
mod pipeline;
mod reducers;
pub mod scale;
mod types;
pub mod utils;

pub use cache_key::build_key;
pub use climate_data::*;
pub use error::ClimateDataError;
pub use pipeline::projections::CMIP6_MODELS;

pub use engine::error::EngineError;
pub use engine::expression::Expression;
pub use engine::http::HttpEngine;
pub use engine::Engine;

pub use types::dataset::{Bands, BandsParser, DatasetDescriptor, TimeZoneDataset, ValueParser};
pub use types::feature::{features_from_geojson, Feature, Geometry, Position};
pub use types::filter::{CalendarField, FilterClause, FilterValue};
pub use types::period::PeriodSpec;
pub use types::period_type::PeriodType;
pub use types::record::{
    ClimateNormal, NamedValues, ProjectionRecord, ReducedRecord, TimeSeriesRecord,
};

pub use types::traits::any_date::AnyDate;
pub use types::traits::types::Month;
pub use types::traits::types::StartEndDate;
pub use types::traits::types::Year;

pub use periods::bucketer::{bucket, plan, BucketPlan, BucketStage, PeriodBucket, PeriodLabels};
pub use periods::calendar::{Calendar, EthiopianDate};
pub use periods::error::PeriodError;

pub use reducers::composer::{
    compose, Assignment, CompositeReducer, ReducerPart, ReducerSpec, Weighting,
};
pub use reducers::error::ReducerError;
pub use reducers::reducer::Reducer;
