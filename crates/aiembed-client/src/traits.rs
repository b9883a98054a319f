use async_trait::async_trait;

use crate::cancel::CancelSignal;
use crate::error::ProviderError;
use crate::types::{EmbeddingRequest, EmbeddingResponse};

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.embed_until(request, &CancelSignal::never()).await
    }

    /// Like [`EmbeddingProvider::embed`], but rate-limit and backoff waits
    /// end with [`ProviderError::Cancelled`] once `cancel` fires.
    async fn embed_until(
        &self,
        request: EmbeddingRequest,
        cancel: &CancelSignal,
    ) -> Result<EmbeddingResponse, ProviderError>;
}
