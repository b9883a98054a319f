//! Request body rendering.
//!
//! A template is plain text with two placeholders: `{{text}}` becomes a JSON
//! array literal of the escaped inputs and `{{model}}` becomes the escaped
//! model name. A placeholder written inside quotes (`"{{text}}"`) is replaced
//! together with its quotes, so both spellings render the same array.
//! Nothing else in the template is touched.

pub const TEXT_PLACEHOLDER: &str = "{{text}}";
pub const MODEL_PLACEHOLDER: &str = "{{model}}";

const QUOTED_TEXT_PLACEHOLDER: &str = "\"{{text}}\"";

#[derive(Debug, Clone)]
pub struct RequestTemplate {
    source: String,
}

impl RequestTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render<S: AsRef<str>>(&self, texts: &[S], model: &str) -> String {
        let inputs = json_string_array(texts);
        self.source
            .replace(QUOTED_TEXT_PLACEHOLDER, &inputs)
            .replace(TEXT_PLACEHOLDER, &inputs)
            .replace(MODEL_PLACEHOLDER, &escape_json(model))
    }
}

fn json_string_array<S: AsRef<str>>(texts: &[S]) -> String {
    let quoted: Vec<String> = texts
        .iter()
        .map(|text| format!("\"{}\"", escape_json(text.as_ref())))
        .collect();
    format!("[{}]", quoted.join(","))
}

/// Escapes backslash, double quote, newline, carriage return and tab.
pub fn escape_json(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
