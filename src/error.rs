use crate::engine::error::EngineError;
use crate::periods::error::PeriodError;
use crate::reducers::error::ReducerError;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimateDataError {
    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error(transparent)]
    Reducer(#[from] ReducerError),

    #[error("No data found for the selected period ({dataset_id}, {start} to {end})")]
    NoData {
        dataset_id: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Remote evaluation failed for dataset '{dataset_id}'")]
    RemoteEvaluation {
        dataset_id: String,
        #[source]
        source: EngineError,
    },

    #[error("Malformed record from dataset '{dataset_id}': {reason}")]
    MalformedRecord { dataset_id: String, reason: String },

    #[error("Invalid dataset '{dataset_id}': {reason}")]
    InvalidDataset { dataset_id: String, reason: String },

    #[error("Request for dataset '{0}' was cancelled")]
    Cancelled(String),
}

impl ClimateDataError {
    pub(crate) fn remote(dataset_id: &str, source: EngineError) -> Self {
        match source {
            EngineError::Cancelled => ClimateDataError::Cancelled(dataset_id.to_string()),
            source => ClimateDataError::RemoteEvaluation {
                dataset_id: dataset_id.to_string(),
                source,
            },
        }
    }
}
