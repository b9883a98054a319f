pub mod backoff;
pub mod cancel;
pub mod client;
pub mod config;
pub mod duration;
pub mod error;
pub mod extract;
pub mod factory;
pub mod providers;
pub mod rate_limit;
pub mod template;
pub mod traits;
pub mod types;

pub use backoff::{Backoff, BackoffPolicy};
pub use cancel::{CancelSignal, Canceller, cancel_pair};
pub use client::{EmbeddingClient, MAX_ATTEMPTS};
pub use config::*;
pub use duration::parse_duration;
pub use error::ProviderError;
pub use extract::ResponsePath;
pub use factory::*;
pub use providers::{GenericHttpProvider, OpenAiProvider};
pub use rate_limit::RateLimiter;
pub use template::RequestTemplate;
pub use traits::*;
pub use types::*;
