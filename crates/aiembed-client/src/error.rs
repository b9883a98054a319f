use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid embedding response format or path: {path} ({reason})")]
    Extraction { path: String, reason: &'static str },

    #[error("API request failed with code {status}: {body}")]
    Api { status: u16, body: String },

    #[error("{stage} interrupted")]
    Cancelled { stage: &'static str },

    #[error("Max retries exceeded")]
    MaxRetriesExceeded,
}

impl ProviderError {
    /// Whether another attempt could succeed. Only throttling and server
    /// errors qualify; everything else ends the call.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

pub(crate) const fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_throttling_and_server_errors_are_retryable() {
        let api = |status| ProviderError::Api {
            status,
            body: String::new(),
        };
        assert!(api(429).is_retryable());
        assert!(api(500).is_retryable());
        assert!(api(503).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!api(404).is_retryable());
        assert!(
            !ProviderError::Extraction {
                path: "data.0.embedding".to_string(),
                reason: "missing",
            }
            .is_retryable()
        );
        assert!(!ProviderError::Cancelled { stage: "Backoff" }.is_retryable());
    }

    #[test]
    fn extraction_error_names_the_path() {
        let err = ProviderError::Extraction {
            path: "data.0.embedding".to_string(),
            reason: "item did not resolve to a numeric array",
        };
        assert!(err.to_string().contains("data.0.embedding"));
    }
}
