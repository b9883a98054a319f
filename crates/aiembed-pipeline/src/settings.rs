use aiembed_client::{EmbedSettings, EmbeddingProviderConfig};
use serde_json::Value;

use crate::error::SettingsError;

pub const PROCESSOR_TYPE: &str = "ai_embed";
pub const SOURCE_FIELDS: &str = "source_fields";

/// A parsed `ai_embed` processor definition.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub source_fields: Vec<String>,
    pub embed: EmbedSettings,
}

impl ProcessorSettings {
    /// `config` is the processor's JSON object: `source_fields` plus the
    /// client options understood by [`EmbedSettings`].
    pub fn from_value(config: &Value) -> Result<Self, SettingsError> {
        let source_fields = match config.get(SOURCE_FIELDS) {
            None | Some(Value::Null) => return Err(SettingsError::SourceFieldsMissing),
            Some(Value::String(field)) => vec![field.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or(SettingsError::SourceFieldsInvalid)?,
            Some(_) => return Err(SettingsError::SourceFieldsInvalid),
        };
        let embed: EmbedSettings = serde_json::from_value(config.clone())?;
        Ok(Self {
            source_fields,
            embed,
        })
    }

    pub fn provider_config(&self) -> Result<EmbeddingProviderConfig, SettingsError> {
        Ok(EmbeddingProviderConfig::from_settings(&self.embed)?)
    }

    /// Values that must not leak into error messages.
    pub fn secrets(&self) -> Vec<String> {
        let mut out: Vec<String> = self.embed.api_key.iter().cloned().collect();
        if let Some(headers) = &self.embed.headers {
            out.extend(headers.values().cloned());
        }
        out.retain(|s| !s.trim().is_empty());
        out
    }
}
