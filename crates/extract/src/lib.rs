//! Receipt extraction against a remote multimodal model.
//!
//! [`ReceiptPipeline`] wraps any [`GenerativeModel`] with the retry policy and
//! the `addReceipt` response validation. [`GeminiModel`] is the production
//! backend; [`ScriptedModel`] replays canned answers for tests.

pub mod config;
pub mod gemini;
pub mod hash;
pub mod model;
pub mod pipeline;
pub mod retry;

pub use config::{ConfigError, ModelConfig};
pub use gemini::GeminiModel;
pub use model::{GenerativeModel, ModelError, ScriptedModel};
pub use pipeline::{PipelineError, ReceiptPipeline, PROMPT};
pub use retry::{RetryError, RetryPolicy};
