use aiembed_client::ProviderError;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("required property [source_fields] is missing for processor [ai_embed]")]
    SourceFieldsMissing,

    #[error("property [source_fields] must be a list of strings or a string for processor [ai_embed]")]
    SourceFieldsInvalid,

    #[error("invalid processor settings: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Failure of the single-query embedding path, mapped onto an HTTP status.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Error generating query embedding: {0}")]
    Provider(#[from] ProviderError),

    #[error("Error generating query embedding: provider returned no vectors")]
    EmptyEmbedding,
}

impl QueryError {
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Provider(_) | Self::EmptyEmbedding => 500,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": self.to_string(),
            "status": self.status(),
        })
    }
}
