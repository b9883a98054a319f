use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Deserialize;

use crate::backoff::BackoffPolicy;
use crate::duration::parse_duration;
use crate::error::ProviderError;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_REQUEST_TEMPLATE: &str = r#"{"input": "{{text}}", "model": "{{model}}"}"#;
pub const OPENAI_REQUEST_TEMPLATE: &str = r#"{"input": {{text}}, "model": "{{model}}"}"#;
pub const DEFAULT_RESPONSE_PATH: &str = "data.0.embedding";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_REQUESTS_PER_SECOND: i64 = 10;
pub const DEFAULT_BACKOFF_INITIAL_DELAY_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_MAX_DELAY_MS: u64 = 30_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Fully resolved settings for one [`crate::EmbeddingClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub model: String,
    pub headers: BTreeMap<String, String>,
    pub request_template: String,
    pub response_path: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Zero or negative disables rate limiting.
    pub max_requests_per_second: i64,
    pub backoff: BackoffPolicy,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            headers: BTreeMap::new(),
            request_template: DEFAULT_REQUEST_TEMPLATE.to_string(),
            response_path: DEFAULT_RESPONSE_PATH.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_requests_per_second: DEFAULT_MAX_REQUESTS_PER_SECOND,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Generic,
    OpenAi,
}

impl ProviderKind {
    /// Unknown names fall back to [`ProviderKind::Generic`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Self::OpenAi,
            _ => Self::Generic,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::OpenAi => "openai",
        }
    }
}

/// A duration option: a bare number of seconds or a duration string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationSetting {
    Seconds(u64),
    Text(String),
}

impl DurationSetting {
    pub fn to_duration(&self) -> Result<Duration, ProviderError> {
        match self {
            Self::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            Self::Text(raw) => parse_duration(raw),
        }
    }
}

/// Raw client options as they appear in a processor definition. Every field
/// is optional; [`resolve_generic`] and [`resolve_openai`] fill the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbedSettings {
    pub provider: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub request_template: Option<String>,
    pub response_path: Option<String>,
    pub connect_timeout: Option<DurationSetting>,
    pub read_timeout: Option<DurationSetting>,
    pub max_requests_per_second: Option<i64>,
    pub backoff_initial_delay_ms: Option<u64>,
    pub backoff_max_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
}

impl EmbedSettings {
    pub fn provider_kind(&self) -> ProviderKind {
        self.provider
            .as_deref()
            .map(ProviderKind::parse)
            .unwrap_or_default()
    }

    fn resolve_with(&self, defaults: &ProviderDefaults) -> Result<ClientConfig, ProviderError> {
        let endpoint = non_blank(self.api_url.as_deref()).unwrap_or(defaults.api_url);
        let model = non_blank(self.model.as_deref()).unwrap_or(DEFAULT_MODEL);
        let request_template = self
            .request_template
            .as_deref()
            .unwrap_or(defaults.request_template);
        let response_path = non_blank(self.response_path.as_deref()).unwrap_or(defaults.response_path);

        let connect_timeout = self
            .connect_timeout
            .as_ref()
            .map(DurationSetting::to_duration)
            .transpose()?
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let read_timeout = self
            .read_timeout
            .as_ref()
            .map(DurationSetting::to_duration)
            .transpose()?
            .unwrap_or(DEFAULT_READ_TIMEOUT);

        let multiplier = self.backoff_multiplier.unwrap_or(DEFAULT_BACKOFF_MULTIPLIER);
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ProviderError::Config(format!(
                "backoff_multiplier must be a positive number, got {multiplier}"
            )));
        }
        let backoff = BackoffPolicy {
            initial_delay: Duration::from_millis(
                self.backoff_initial_delay_ms
                    .unwrap_or(DEFAULT_BACKOFF_INITIAL_DELAY_MS),
            ),
            max_delay: Duration::from_millis(
                self.backoff_max_delay_ms
                    .unwrap_or(DEFAULT_BACKOFF_MAX_DELAY_MS),
            ),
            multiplier,
        };

        let mut headers: BTreeMap<String, String> = self
            .headers
            .clone()
            .unwrap_or_default()
            .into_iter()
            .collect();
        if let Some(api_key) = non_blank(self.api_key.as_deref()) {
            let has_auth = headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case("authorization"));
            if !has_auth {
                headers.insert("Authorization".to_string(), format!("Bearer {api_key}"));
            }
        }

        Ok(ClientConfig {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            headers,
            request_template: request_template.to_string(),
            response_path: response_path.to_string(),
            connect_timeout,
            read_timeout,
            max_requests_per_second: self
                .max_requests_per_second
                .unwrap_or(DEFAULT_MAX_REQUESTS_PER_SECOND),
            backoff,
        })
    }
}

struct ProviderDefaults {
    api_url: &'static str,
    request_template: &'static str,
    response_path: &'static str,
}

const GENERIC_DEFAULTS: ProviderDefaults = ProviderDefaults {
    api_url: DEFAULT_API_URL,
    request_template: DEFAULT_REQUEST_TEMPLATE,
    response_path: DEFAULT_RESPONSE_PATH,
};

const OPENAI_DEFAULTS: ProviderDefaults = ProviderDefaults {
    api_url: DEFAULT_API_URL,
    request_template: OPENAI_REQUEST_TEMPLATE,
    response_path: DEFAULT_RESPONSE_PATH,
};

pub fn resolve_generic(settings: &EmbedSettings) -> Result<ClientConfig, ProviderError> {
    settings.resolve_with(&GENERIC_DEFAULTS)
}

pub fn resolve_openai(settings: &EmbedSettings) -> Result<ClientConfig, ProviderError> {
    settings.resolve_with(&OPENAI_DEFAULTS)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub enum EmbeddingProviderConfig {
    Generic(ClientConfig),
    OpenAi(ClientConfig),
}

impl EmbeddingProviderConfig {
    pub fn from_settings(settings: &EmbedSettings) -> Result<Self, ProviderError> {
        match settings.provider_kind() {
            ProviderKind::Generic => resolve_generic(settings).map(Self::Generic),
            ProviderKind::OpenAi => resolve_openai(settings).map(Self::OpenAi),
        }
    }

    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::Generic(_) => ProviderKind::Generic,
            Self::OpenAi(_) => ProviderKind::OpenAi,
        }
    }

    pub const fn client_config(&self) -> &ClientConfig {
        match self {
            Self::Generic(c) | Self::OpenAi(c) => c,
        }
    }
}
