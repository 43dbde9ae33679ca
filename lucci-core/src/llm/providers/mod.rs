//! Completion engine implementations

pub mod keyword;

pub use keyword::KeywordProvider;

#[cfg(feature = "llm-openai")]
pub mod openai;

#[cfg(feature = "llm-openai")]
pub use openai::OpenAIProvider;
