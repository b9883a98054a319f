//! NDJSON bulk enrichment used by the `aiembed-ingest` binary.

use std::io;
use std::path::PathBuf;

use aiembed_client::CancelSignal;
use futures_util::future::join_all;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::processor::{ERROR_FIELD, EmbedProcessor, EnrichOutcome};

pub const PIPELINE_PATH_ENV: &str = "AIEMBED_PIPELINE";
pub const PIPELINE_JSON_ENV: &str = "AIEMBED_PIPELINE_JSON";
pub const CONCURRENCY_ENV: &str = "AIEMBED_CONCURRENCY";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const MAX_CONCURRENCY: usize = 256;

#[derive(Debug, Clone)]
pub enum PipelineSource {
    Inline(String),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub pipeline: PipelineSource,
    pub concurrency: usize,
}

impl IngestConfig {
    pub fn from_env() -> io::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Inline JSON wins over a file path when both are set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> io::Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let pipeline = if let Some(json) = non_empty(PIPELINE_JSON_ENV) {
            PipelineSource::Inline(json)
        } else if let Some(path) = non_empty(PIPELINE_PATH_ENV) {
            PipelineSource::File(PathBuf::from(path))
        } else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("set {PIPELINE_JSON_ENV} or {PIPELINE_PATH_ENV} to an ai_embed processor config"),
            ));
        };
        let concurrency = non_empty(CONCURRENCY_ENV)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_CONCURRENCY)
            .clamp(1, MAX_CONCURRENCY);
        Ok(Self {
            pipeline,
            concurrency,
        })
    }

    pub fn load_pipeline(&self) -> io::Result<Value> {
        let raw = match &self.pipeline {
            PipelineSource::Inline(json) => json.clone(),
            PipelineSource::File(path) => std::fs::read_to_string(path)?,
        };
        serde_json::from_str(&raw).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("invalid pipeline config: {e}"))
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub documents: usize,
    pub embedded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub invalid: usize,
}

impl IngestStats {
    fn record(&mut self, outcome: Option<&EnrichOutcome>) {
        self.documents += 1;
        match outcome {
            Some(EnrichOutcome::Embedded { .. }) => self.embedded += 1,
            Some(EnrichOutcome::Skipped) => self.skipped += 1,
            Some(EnrichOutcome::Failed { .. }) => self.failed += 1,
            None => self.invalid += 1,
        }
    }
}

/// Enriches one NDJSON line. `None` means the line was not a JSON object
/// and the returned line only carries an error.
pub async fn enrich_line(
    processor: &EmbedProcessor,
    line: &str,
    cancel: &CancelSignal,
) -> (String, Option<EnrichOutcome>) {
    let mut doc = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(doc)) => doc,
        Ok(other) => {
            return (invalid_line(&format!("expected a JSON object, got {}", kind(&other))), None);
        }
        Err(e) => return (invalid_line(&e.to_string()), None),
    };
    let outcome = processor.execute_until(&mut doc, cancel).await;
    (to_line(doc), Some(outcome))
}

/// Streams `input` to `output` in chunks of `concurrency` documents,
/// keeping input order. Stops after the current chunk once `cancel` fires.
pub async fn run<R, W>(
    processor: &EmbedProcessor,
    input: R,
    output: &mut W,
    concurrency: usize,
    cancel: &CancelSignal,
) -> io::Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut stats = IngestStats::default();
    loop {
        let chunk = read_chunk(&mut lines, concurrency.max(1)).await?;
        if chunk.is_empty() {
            break;
        }
        let results = join_all(
            chunk
                .iter()
                .map(|line| enrich_line(processor, line, cancel)),
        )
        .await;
        for (line, outcome) in results {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
            stats.record(outcome.as_ref());
        }
        output.flush().await?;
        if cancel.is_cancelled() {
            tracing::warn!("ingest cancelled, remaining input not processed");
            break;
        }
    }
    Ok(stats)
}

async fn read_chunk<R>(lines: &mut Lines<R>, size: usize) -> io::Result<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut chunk = Vec::with_capacity(size);
    while chunk.len() < size {
        match lines.next_line().await? {
            Some(line) if line.trim().is_empty() => {}
            Some(line) => chunk.push(line),
            None => break,
        }
    }
    Ok(chunk)
}

fn invalid_line(reason: &str) -> String {
    tracing::warn!(error = %reason, "skipping unparseable input line");
    let mut doc = Map::new();
    doc.insert(
        ERROR_FIELD.to_string(),
        Value::String(format!("Invalid document: {reason}")),
    );
    to_line(doc)
}

fn to_line(doc: Map<String, Value>) -> String {
    Value::Object(doc).to_string()
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aiembed_client::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, ProviderError};
    use serde_json::json;

    use super::*;

    /// Returns `[len]` for every input so outputs can be matched to inputs.
    struct LengthProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for LengthProvider {
        fn name(&self) -> &'static str {
            "length"
        }

        async fn embed_until(
            &self,
            request: EmbeddingRequest,
            _cancel: &CancelSignal,
        ) -> Result<EmbeddingResponse, ProviderError> {
            #[allow(clippy::cast_precision_loss)]
            let vectors = request.inputs.iter().map(|t| vec![t.len() as f32]).collect();
            Ok(EmbeddingResponse {
                provider: "length".to_string(),
                model: "m".to_string(),
                vectors,
                usage: None,
            })
        }
    }

    fn processor() -> EmbedProcessor {
        EmbedProcessor::new(vec!["title".to_string()], Arc::new(LengthProvider))
    }

    #[test]
    fn config_prefers_inline_json_and_clamps_concurrency() {
        let cfg = IngestConfig::from_lookup(|name| match name {
            PIPELINE_JSON_ENV => Some(r#"{"source_fields": "title"}"#.to_string()),
            PIPELINE_PATH_ENV => Some("/nope.json".to_string()),
            CONCURRENCY_ENV => Some("100000".to_string()),
            _ => None,
        })
        .expect("config");
        assert!(matches!(cfg.pipeline, PipelineSource::Inline(_)));
        assert_eq!(cfg.concurrency, MAX_CONCURRENCY);
        assert_eq!(
            cfg.load_pipeline().expect("pipeline"),
            json!({"source_fields": "title"})
        );

        let zero = IngestConfig::from_lookup(|name| match name {
            PIPELINE_PATH_ENV => Some("/etc/aiembed.json".to_string()),
            CONCURRENCY_ENV => Some("0".to_string()),
            _ => None,
        })
        .expect("config");
        assert!(matches!(zero.pipeline, PipelineSource::File(_)));
        assert_eq!(zero.concurrency, 1);

        assert!(IngestConfig::from_lookup(|_| None).is_err());
    }

    #[tokio::test]
    async fn bad_lines_become_error_documents() {
        let p = processor();
        let (line, outcome) = enrich_line(&p, "[1, 2]", &CancelSignal::never()).await;
        assert!(outcome.is_none());
        let doc: Value = serde_json::from_str(&line).expect("json");
        assert_eq!(
            doc[ERROR_FIELD],
            json!("Invalid document: expected a JSON object, got an array")
        );

        let (line, _) = enrich_line(&p, "{oops", &CancelSignal::never()).await;
        assert!(line.contains("Invalid document"));
    }

    #[tokio::test]
    async fn run_keeps_order_and_counts_outcomes() {
        let input = concat!(
            "{\"id\": 1, \"title\": \"a\"}\n",
            "\n",
            "{\"id\": 2, \"title\": \"\"}\n",
            "not json\n",
            "{\"id\": 3, \"title\": \"abc\"}\n",
        );
        let mut out = Vec::new();
        let stats = run(
            &processor(),
            input.as_bytes(),
            &mut out,
            2,
            &CancelSignal::never(),
        )
        .await
        .expect("run");

        let docs: Vec<Value> = String::from_utf8(out)
            .expect("utf8")
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[0], json!({"id": 1, "title": "a", "title_vector": [1.0]}));
        assert_eq!(docs[1], json!({"id": 2, "title": ""}));
        assert!(docs[2].get(ERROR_FIELD).is_some());
        assert_eq!(docs[3]["title_vector"], json!([3.0]));
        assert_eq!(
            stats,
            IngestStats {
                documents: 4,
                embedded: 2,
                skipped: 1,
                failed: 0,
                invalid: 1,
            }
        );
    }
}
