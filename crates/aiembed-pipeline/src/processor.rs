use std::sync::Arc;

use aiembed_client::{
    CancelSignal, EmbeddingProvider, EmbeddingRequest, build_embedding_provider,
};
use serde_json::Value;

use crate::document::{Document, get_field, set_field};
use crate::error::SettingsError;
use crate::redact::Redactor;
use crate::settings::{PROCESSOR_TYPE, ProcessorSettings};

pub const VECTOR_SUFFIX: &str = "_vector";
pub const ERROR_FIELD: &str = "embedding_error";

/// What [`EmbedProcessor::execute`] did to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// No configured field held non-empty text; the provider was not called.
    Skipped,
    Embedded { fields: Vec<String> },
    Failed { message: String },
}

/// Adds `<field>_vector` for every non-empty configured text field of a
/// document, using one batched provider call per document. Failures never
/// escape: they land in the document's `embedding_error` field instead.
pub struct EmbedProcessor {
    source_fields: Vec<String>,
    provider: Arc<dyn EmbeddingProvider>,
    redactor: Redactor,
}

impl EmbedProcessor {
    pub fn new(source_fields: Vec<String>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            source_fields,
            provider,
            redactor: Redactor::default(),
        }
    }

    #[must_use]
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn from_settings(settings: &ProcessorSettings) -> Result<Self, SettingsError> {
        let provider = build_embedding_provider(settings.provider_config()?)?;
        tracing::info!(
            provider = provider.name(),
            fields = ?settings.source_fields,
            "ai_embed processor created"
        );
        Ok(Self::new(settings.source_fields.clone(), provider)
            .with_redactor(Redactor::new(settings.secrets())))
    }

    pub fn from_config(config: &Value) -> Result<Self, SettingsError> {
        Self::from_settings(&ProcessorSettings::from_value(config)?)
    }

    pub const fn processor_type(&self) -> &'static str {
        PROCESSOR_TYPE
    }

    pub fn source_fields(&self) -> &[String] {
        &self.source_fields
    }

    pub async fn execute(&self, doc: &mut Document) -> EnrichOutcome {
        self.execute_until(doc, &CancelSignal::never()).await
    }

    pub async fn execute_until(&self, doc: &mut Document, cancel: &CancelSignal) -> EnrichOutcome {
        let (fields, texts) = self.collect_texts(doc);
        if fields.is_empty() {
            tracing::debug!("no fields to embed, skipping");
            return EnrichOutcome::Skipped;
        }

        let written = match self.embed_fields(&fields, texts, cancel).await {
            Ok(vectors) => self.write_vectors(doc, &fields, vectors),
            Err(reason) => Err(reason),
        };
        match written {
            Ok(()) => EnrichOutcome::Embedded { fields },
            Err(reason) => {
                let message = format!("Failed to embed fields: {}", self.redactor.apply(&reason));
                tracing::warn!(error = %message, "document embedding failed");
                doc.insert(ERROR_FIELD.to_string(), Value::String(message.clone()));
                EnrichOutcome::Failed { message }
            }
        }
    }

    /// Writes every `<field>_vector` or none of them. Writes are staged on a
    /// copy so a conflict halfway through leaves `doc` untouched.
    fn write_vectors(
        &self,
        doc: &mut Document,
        fields: &[String],
        vectors: Vec<Value>,
    ) -> Result<(), String> {
        let mut staged = doc.clone();
        for (field, vector) in fields.iter().zip(vectors) {
            let target = format!("{field}{VECTOR_SUFFIX}");
            if let Some(source) = self
                .source_fields
                .iter()
                .find(|s| **s == target || s.starts_with(&format!("{target}.")))
            {
                return Err(format!(
                    "Vector field [{target}] would overwrite source field [{source}]"
                ));
            }
            if !set_field(&mut staged, &target, vector) {
                return Err(format!(
                    "Cannot set vector field [{target}]: a parent value is not an object"
                ));
            }
        }
        *doc = staged;
        Ok(())
    }

    fn collect_texts(&self, doc: &Document) -> (Vec<String>, Vec<String>) {
        let mut fields = Vec::new();
        let mut texts = Vec::new();
        for field in &self.source_fields {
            match get_field(doc, field) {
                Some(Value::String(text)) if !text.is_empty() => {
                    fields.push(field.clone());
                    texts.push(text.clone());
                }
                Some(Value::String(_) | Value::Null) => {
                    tracing::debug!(field = %field, "field is empty or null, skipping");
                }
                Some(_) => {
                    tracing::warn!(field = %field, "field is not a string, skipping");
                }
                None => {
                    tracing::debug!(field = %field, "field not found in document");
                }
            }
        }
        (fields, texts)
    }

    /// Returns one JSON vector per field, or a message describing why the
    /// document cannot be enriched.
    async fn embed_fields(
        &self,
        fields: &[String],
        texts: Vec<String>,
        cancel: &CancelSignal,
    ) -> Result<Vec<Value>, String> {
        let response = self
            .provider
            .embed_until(EmbeddingRequest { inputs: texts }, cancel)
            .await
            .map_err(|e| e.to_string())?;

        if response.vectors.len() != fields.len() {
            return Err(format!(
                "Number of returned embeddings ({}) does not match number of requested fields ({})",
                response.vectors.len(),
                fields.len()
            ));
        }
        Ok(response.vectors.iter().map(|v| vector_value(v)).collect())
    }
}

/// Widens through the shortest decimal form so `0.1_f32` is written as
/// `0.1`, not `0.10000000149011612`.
pub fn vector_value(vector: &[f32]) -> Value {
    Value::Array(
        vector
            .iter()
            .map(|x| {
                x.to_string()
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            })
            .collect(),
    )
}
