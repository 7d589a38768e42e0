//! # redgreen-llm
//!
//! Generation backend abstraction for redgreen.
//!
//! The backend is a black-box text-completion service: it takes a structured
//! prompt (system instructions plus contextual payload) and returns
//! unstructured text. No output schema is enforced here; turning that text
//! into files is the extractor's job.
//!
//! One concrete client covers every OpenAI-compatible chat-completions API;
//! [`Provider`] maps well-known provider names to their endpoints.

mod client;
mod openai;
mod provider;

pub use client::{CompletionRequest, LlmClient, LlmError};
pub use openai::OpenAiClient;
pub use provider::Provider;
