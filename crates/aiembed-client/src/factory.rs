use std::sync::Arc;

use crate::config::{EmbedSettings, EmbeddingProviderConfig};
use crate::error::ProviderError;
use crate::providers::{GenericHttpProvider, OpenAiProvider};
use crate::traits::EmbeddingProvider;

pub fn build_embedding_provider(
    cfg: EmbeddingProviderConfig,
) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
    match cfg {
        EmbeddingProviderConfig::Generic(c) => Ok(Arc::new(GenericHttpProvider::new(c)?)),
        EmbeddingProviderConfig::OpenAi(c) => Ok(Arc::new(OpenAiProvider::new(c)?)),
    }
}

pub fn build_embedding_provider_from_settings(
    settings: &EmbedSettings,
) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
    build_embedding_provider(EmbeddingProviderConfig::from_settings(settings)?)
}
