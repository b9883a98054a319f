use crate::cancel::CancelSignal;
use crate::client::EmbeddingClient;
use crate::config::ClientConfig;
use crate::error::ProviderError;
use crate::traits::EmbeddingProvider;
use crate::types::{EmbeddingRequest, EmbeddingResponse};

/// Any HTTP embedding API, shaped entirely by the configured endpoint,
/// request template and response path.
#[derive(Debug)]
pub struct GenericHttpProvider {
    client: EmbeddingClient,
}

impl GenericHttpProvider {
    pub fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: EmbeddingClient::new(config)?,
        })
    }

    pub const fn client(&self) -> &EmbeddingClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for GenericHttpProvider {
    fn name(&self) -> &'static str {
        "generic"
    }

    async fn embed_until(
        &self,
        request: EmbeddingRequest,
        cancel: &CancelSignal,
    ) -> Result<EmbeddingResponse, ProviderError> {
        let mut res = self.client.get_embeddings(&request.inputs, cancel).await?;
        res.provider = self.name().to_string();
        Ok(res)
    }
}
