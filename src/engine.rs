pub mod error;
pub mod expression;
pub mod fetcher;
pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use crate::engine::error::EngineError;
use crate::engine::expression::Expression;
use async_trait::async_trait;
use log::trace;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A remote raster-analysis engine.
///
/// Implementations evaluate an [`Expression`] server-side and return the
/// resulting JSON value. Evaluations may run concurrently.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn evaluate(&self, expression: &Expression) -> Result<Value, EngineError>;
}

#[async_trait]
impl<T: Engine + ?Sized> Engine for Arc<T> {
    async fn evaluate(&self, expression: &Expression) -> Result<Value, EngineError> {
        (**self).evaluate(expression).await
    }
}

/// Evaluates `expression`, giving up as soon as `cancel` fires.
pub async fn evaluate_cancellable<E: Engine + ?Sized>(
    engine: &E,
    expression: &Expression,
    cancel: &CancellationToken,
) -> Result<Value, EngineError> {
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    trace!("Evaluating {}", expression.op_name());
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        result = engine.evaluate(expression) => result,
    }
}

/// Evaluates an expression that yields a single number, such as
/// [`Expression::Size`] or [`Expression::NominalScale`].
pub async fn evaluate_number<E: Engine + ?Sized>(
    engine: &E,
    expression: &Expression,
    cancel: &CancellationToken,
) -> Result<f64, EngineError> {
    let value = evaluate_cancellable(engine, expression, cancel).await?;
    value.as_f64().ok_or_else(|| {
        EngineError::UnexpectedResponse(format!(
            "expected a number from {}, got {}",
            expression.op_name(),
            value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{MockEngine, MockImage};
    use std::error::Error;

    #[tokio::test]
    async fn test_cancelled_token_stops_evaluation() -> Result<(), Box<dyn Error>> {
        let engine = MockEngine::default()
            .with_collection("c", vec![MockImage::daily("2023-01-01", &[("b", 1.0)])]);
        let cancel = CancellationToken::new();
        let size = Expression::image_collection("c").size();
        assert_eq!(evaluate_number(&engine, &size, &cancel).await?, 1.0);

        cancel.cancel();
        let result = evaluate_number(&engine, &size, &cancel).await;
        assert!(matches!(result, Err(EngineError::Cancelled)));
        Ok(())
    }

    #[tokio::test]
    async fn test_shared_engine() -> Result<(), Box<dyn Error>> {
        let engine: Arc<dyn Engine> = Arc::new(MockEngine::default());
        let result = evaluate_cancellable(
            &engine,
            &Expression::image_collection("missing").size(),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(EngineError::Evaluation(_))));
        Ok(())
    }
}
