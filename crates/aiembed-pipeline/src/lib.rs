pub mod document;
pub mod error;
pub mod ingest;
pub mod processor;
pub mod query;
pub mod redact;
pub mod settings;

pub use document::{Document, get_field, set_field};
pub use error::{QueryError, SettingsError};
pub use ingest::{IngestConfig, IngestStats, PipelineSource};
pub use processor::{ERROR_FIELD, EmbedProcessor, EnrichOutcome, VECTOR_SUFFIX};
pub use query::{
    DEFAULT_VECTOR_FIELD, QueryEmbedder, QueryEmbedding, SemanticQuery, extract_query_text,
    parse_semantic_request, resolve_api_key,
};
pub use redact::Redactor;
pub use settings::{PROCESSOR_TYPE, ProcessorSettings};
