use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReducerError {
    #[error("Unknown reducer '{0}'")]
    UnknownReducer(String),

    #[error("A combined reducer needs at least one reducer name")]
    EmptyReducerList,

    #[error("{reducers} reducers cannot be paired one-to-one with {bands} bands")]
    BandCountMismatch { reducers: usize, bands: usize },
}
