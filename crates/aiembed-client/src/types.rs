use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingRequest {
    pub inputs: Vec<String>,
}

impl EmbeddingRequest {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn single(input: impl Into<String>) -> Self {
        Self {
            inputs: vec![input.into()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub provider: String,
    pub model: String,
    /// In the order the provider listed them; not checked against the
    /// request count.
    pub vectors: Vec<Vec<f32>>,
    pub usage: Option<Map<String, Value>>,
}

impl EmbeddingResponse {
    pub fn usage_tokens(&self) -> Option<u64> {
        self.usage.as_ref()?.get("total_tokens")?.as_u64()
    }
}
