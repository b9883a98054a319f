pub mod generic;
pub mod openai;

pub use generic::GenericHttpProvider;
pub use openai::OpenAiProvider;
