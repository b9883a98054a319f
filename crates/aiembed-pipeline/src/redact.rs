const MASK: &str = "[REDACTED]";

/// Masks configured secrets and credential-like query parameters in
/// messages that end up in documents or responses.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    pub fn new(secrets: Vec<String>) -> Self {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        // Longest first so a secret containing another is masked whole.
        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        Self { secrets }
    }

    pub fn apply(&self, input: &str) -> String {
        let mut out = input.to_string();
        for secret in &self.secrets {
            out = out.replace(secret.as_str(), MASK);
            if let Some(token) = secret.strip_prefix("Bearer ") {
                if !token.is_empty() {
                    out = out.replace(token, MASK);
                }
            }
        }
        for marker in ["key=", "api_key=", "apikey=", "token="] {
            out = redact_query_param(&out, marker);
        }
        out
    }
}

fn redact_query_param(input: &str, marker: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(marker) {
        let (before, after_marker) = rest.split_at(pos + marker.len());
        out.push_str(before);
        let end = after_marker
            .find(['&', ' ', '"', '\'', ')', '\n'])
            .unwrap_or(after_marker.len());
        let (value, tail) = after_marker.split_at(end);
        out.push_str(if value.is_empty() { "" } else { MASK });
        rest = tail;
    }
    out.push_str(rest);
    out
}
