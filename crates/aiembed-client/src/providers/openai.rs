use crate::cancel::CancelSignal;
use crate::config::{
    ClientConfig, DEFAULT_API_URL, DEFAULT_RESPONSE_PATH, OPENAI_REQUEST_TEMPLATE,
};
use crate::error::ProviderError;
use crate::providers::generic::GenericHttpProvider;
use crate::traits::EmbeddingProvider;
use crate::types::{EmbeddingRequest, EmbeddingResponse};

/// OpenAI's `/v1/embeddings` shape. Same pipeline as
/// [`GenericHttpProvider`]; blank endpoint, template or path fall back to
/// OpenAI's values.
#[derive(Debug)]
pub struct OpenAiProvider {
    inner: GenericHttpProvider,
}

impl OpenAiProvider {
    pub fn new(mut config: ClientConfig) -> Result<Self, ProviderError> {
        if config.endpoint.trim().is_empty() {
            config.endpoint = DEFAULT_API_URL.to_string();
        }
        if config.request_template.trim().is_empty() {
            config.request_template = OPENAI_REQUEST_TEMPLATE.to_string();
        }
        if config.response_path.trim().is_empty() {
            config.response_path = DEFAULT_RESPONSE_PATH.to_string();
        }
        Ok(Self {
            inner: GenericHttpProvider::new(config)?,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn embed_until(
        &self,
        request: EmbeddingRequest,
        cancel: &CancelSignal,
    ) -> Result<EmbeddingResponse, ProviderError> {
        let mut res = self.inner.embed_until(request, cancel).await?;
        res.provider = self.name().to_string();
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_take_openai_defaults() {
        let mut cfg = ClientConfig::new("", "text-embedding-3-small");
        cfg.request_template = String::new();
        cfg.response_path = " ".to_string();
        let provider = OpenAiProvider::new(cfg).expect("provider");
        assert_eq!(provider.name(), "openai");
        assert_eq!(
            provider.inner.client().response_path().as_str(),
            DEFAULT_RESPONSE_PATH
        );
    }
}
