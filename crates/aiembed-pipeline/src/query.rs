//! Single-query embedding used by similarity search: pull the query text
//! out of a search request body and turn it into one vector.

use std::sync::Arc;

use aiembed_client::{
    EmbedSettings, EmbeddingProvider, EmbeddingRequest, ProviderKind,
    build_embedding_provider_from_settings,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::QueryError;
use crate::redact::Redactor;

pub const DEFAULT_VECTOR_FIELD: &str = "full_case_text_vector";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticQuery {
    pub text: String,
    pub vector_field: String,
    pub boost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryEmbedding {
    #[serde(flatten)]
    pub query: SemanticQuery,
    pub vector: Vec<f32>,
}

pub fn parse_semantic_request(body: &str) -> Result<SemanticQuery, QueryError> {
    if body.trim().is_empty() {
        return Err(bad_request("Request body is required for semantic search"));
    }
    let root: Value = serde_json::from_str(body)
        .map_err(|e| QueryError::BadRequest(format!("Invalid request body: {e}")))?;

    let Some(semantic) = root.get("semantic_search").filter(|v| v.is_object()) else {
        return Err(bad_request("semantic_search section is required"));
    };
    if semantic.get("enabled").and_then(Value::as_bool) != Some(true) {
        return Err(bad_request("semantic_search.enabled must be true"));
    }

    let vector_field = semantic
        .get("field")
        .and_then(Value::as_str)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_VECTOR_FIELD)
        .to_string();
    let boost = semantic.get("boost").and_then(Value::as_f64).unwrap_or(1.0);

    let text = root
        .get("query")
        .and_then(extract_query_text)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| bad_request("Could not extract query text from query section"))?;

    Ok(SemanticQuery {
        text,
        vector_field,
        boost,
    })
}

/// Finds the user's text in the first recognised clause of a query DSL
/// object: `match`, `multi_match`, `term`, then `query_string`.
pub fn extract_query_text(query: &Value) -> Option<String> {
    if let Some(clause) = query.get("match").and_then(Value::as_object) {
        // {"match": {"field": "text"}} or {"match": {"field": {"query": "text"}}}
        let (_, value) = clause.iter().next()?;
        return match value {
            Value::String(text) => Some(text.clone()),
            other => other.get("query")?.as_str().map(str::to_string),
        };
    }
    if let Some(clause) = query.get("multi_match") {
        return clause.get("query")?.as_str().map(str::to_string);
    }
    if let Some(clause) = query.get("term").and_then(Value::as_object) {
        let (_, value) = clause.iter().next()?;
        return match value {
            Value::String(text) => Some(text.clone()),
            other => other.get("value")?.as_str().map(str::to_string),
        };
    }
    if let Some(clause) = query.get("query_string") {
        return clause.get("query")?.as_str().map(str::to_string);
    }
    None
}

/// Prefers a `Bearer` token from the request's Authorization header.
pub fn resolve_api_key(authorization: Option<&str>, fallback: Option<String>) -> Option<String> {
    authorization
        .and_then(|h| h.trim().strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| fallback.filter(|k| !k.trim().is_empty()))
}

pub struct QueryEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    redactor: Redactor,
}

impl QueryEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            redactor: Redactor::default(),
        }
    }

    /// Builds an embedder for one incoming search request. Without an
    /// explicit `provider`, queries go to OpenAI.
    pub fn for_request(
        settings: &EmbedSettings,
        authorization: Option<&str>,
    ) -> Result<Self, QueryError> {
        Self::for_request_with_fallback(settings, authorization, std::env::var(API_KEY_ENV).ok())
    }

    pub fn for_request_with_fallback(
        settings: &EmbedSettings,
        authorization: Option<&str>,
        fallback_key: Option<String>,
    ) -> Result<Self, QueryError> {
        let Some(api_key) = resolve_api_key(authorization, fallback_key) else {
            return Err(bad_request(
                "API key is required: send an Authorization: Bearer header or set OPENAI_API_KEY",
            ));
        };

        let mut settings = settings.clone();
        if settings.provider.is_none() {
            settings.provider = Some(ProviderKind::OpenAi.as_str().to_string());
        }
        settings.api_key = Some(api_key.clone());
        let provider = build_embedding_provider_from_settings(&settings)?;
        Ok(Self {
            provider,
            redactor: Redactor::new(vec![api_key]),
        })
    }

    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, QueryError> {
        let response = self.provider.embed(EmbeddingRequest::single(text)).await?;
        tracing::debug!(
            provider = self.provider.name(),
            tokens = ?response.usage_tokens(),
            "query embedded"
        );
        response
            .vectors
            .into_iter()
            .next()
            .ok_or(QueryError::EmptyEmbedding)
    }

    pub async fn embed_request(&self, body: &str) -> Result<QueryEmbedding, QueryError> {
        let query = parse_semantic_request(body)?;
        let vector = self.embed_text(&query.text).await?;
        Ok(QueryEmbedding { query, vector })
    }

    /// Error body for a failed request, with credentials masked.
    pub fn error_body(&self, err: &QueryError) -> Value {
        json!({
            "error": self.redactor.apply(&err.to_string()),
            "status": err.status(),
        })
    }
}

fn bad_request(message: &str) -> QueryError {
    QueryError::BadRequest(message.to_string())
}
