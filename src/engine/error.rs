use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    // Message reported by the engine, kept verbatim
    #[error("{0}")]
    Evaluation(String),

    #[error("Failed to decode engine response")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected engine response: {0}")]
    UnexpectedResponse(String),

    #[error("Evaluation was cancelled")]
    Cancelled,
}
