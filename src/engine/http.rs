use crate::engine::error::EngineError;
use crate::engine::expression::Expression;
use crate::engine::Engine;
use async_trait::async_trait;
use bon::bon;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize)]
struct ComputeRequest<'a> {
    expression: &'a Expression,
}

#[derive(Deserialize)]
struct ComputeResponse {
    result: Option<Value>,
    error: Option<RemoteError>,
}

#[derive(Deserialize)]
struct RemoteError {
    message: String,
}

/// Evaluates expressions on a remote engine over HTTP.
///
/// Every evaluation is a `POST {base_url}/value:compute` with the serialized
/// expression as body. The engine answers `{"result": ...}` on success and
/// `{"error": {"message": ...}}` on failure.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    endpoint: String,
    bearer_token: Option<String>,
}

#[bon]
impl HttpEngine {
    #[builder]
    pub fn new(
        #[builder(into)] base_url: String,
        #[builder(into)] bearer_token: Option<String>,
        client: Option<Client>,
    ) -> Self {
        Self {
            client: client.unwrap_or_default(),
            endpoint: format!("{}/value:compute", base_url.trim_end_matches('/')),
            bearer_token,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn parse_response(url: &str, status: StatusCode, body: &[u8]) -> Result<Value, EngineError> {
    let parsed: Result<ComputeResponse, _> = serde_json::from_slice(body);
    match parsed {
        Ok(ComputeResponse {
            error: Some(error), ..
        }) => Err(EngineError::Evaluation(error.message)),
        _ if !status.is_success() => Err(EngineError::HttpStatus {
            url: url.to_string(),
            status,
        }),
        Ok(ComputeResponse {
            result: Some(result),
            ..
        }) => Ok(result),
        Ok(_) => Err(EngineError::UnexpectedResponse(
            "response carries neither result nor error".to_string(),
        )),
        Err(e) => Err(EngineError::Decode(e)),
    }
}

#[async_trait]
impl Engine for HttpEngine {
    async fn evaluate(&self, expression: &Expression) -> Result<Value, EngineError> {
        debug!("POST {} ({})", self.endpoint, expression.op_name());
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&ComputeRequest { expression });
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::NetworkRequest(self.endpoint.clone(), e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| EngineError::NetworkRequest(self.endpoint.clone(), e))?;

        let result = parse_response(&self.endpoint, status, &body);
        if let Err(e) = &result {
            warn!("Evaluation of {} failed: {}", expression.op_name(), e);
        }
        result
    }
}
