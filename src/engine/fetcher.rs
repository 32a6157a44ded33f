use crate::engine::error::EngineError;
use crate::engine::expression::Expression;
use crate::engine::{evaluate_cancellable, evaluate_number, Engine};
use futures_util::future::try_join_all;
use log::info;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Maximum number of elements the engine returns from one list evaluation.
pub const VALUE_LIMIT: usize = 5000;

/// Retrieves every element of a server-side collection, splitting it into
/// pages of at most `page_size` elements when needed.
///
/// Pages are requested concurrently and concatenated in page order, so the
/// result is identical to a single unpaginated fetch. The first failing page
/// fails the whole fetch and drops the pages still in flight.
pub struct ChunkedFetcher<'a, E: ?Sized> {
    engine: &'a E,
    page_size: usize,
    cancel: &'a CancellationToken,
}

impl<'a, E: Engine + ?Sized> ChunkedFetcher<'a, E> {
    pub fn new(engine: &'a E, page_size: usize, cancel: &'a CancellationToken) -> Self {
        Self {
            engine,
            page_size: page_size.max(1),
            cancel,
        }
    }

    pub async fn fetch_all(&self, collection: &Expression) -> Result<Vec<Value>, EngineError> {
        let count = evaluate_number(self.engine, &collection.clone().size(), self.cancel).await?;
        let count = count.max(0.0) as usize;
        if count <= self.page_size {
            return self.page(collection, 0).await;
        }

        let chunks = count.div_ceil(self.page_size);
        info!(
            "Fetching {} elements in {} chunks of {}",
            count, chunks, self.page_size
        );
        let pages = try_join_all(
            (0..chunks).map(|chunk| self.page(collection, chunk * self.page_size)),
        )
        .await?;
        Ok(pages.into_iter().flatten().collect())
    }

    async fn page(&self, collection: &Expression, offset: usize) -> Result<Vec<Value>, EngineError> {
        let list = collection.clone().to_list(self.page_size, offset);
        match evaluate_cancellable(self.engine, &list, self.cancel).await? {
            Value::Array(items) => Ok(items),
            other => Err(EngineError::UnexpectedResponse(format!(
                "expected a list at offset {}, got {}",
                offset, other
            ))),
        }
    }
}
