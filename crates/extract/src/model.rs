use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use expensa_core::GenerateResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// The API answered with a non-success HTTP status.
    #[error("API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },
    /// The API answered 2xx but the body could not be understood.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ModelError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Abstraction over a multimodal model that has been preconfigured with the
/// `addReceipt` function (or, for the free-text variant, with no tools).
/// Implementations take raw JPEG bytes plus an instruction and return the
/// model's candidates.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(
        &self,
        image_jpeg: &[u8],
        instruction: &str,
    ) -> Result<GenerateResponse, ModelError>;
}

// ── Scripted backend (always available, used for tests) ──────────────────────

/// Replays a fixed sequence of outcomes, one per call. Once the script is
/// exhausted every further call fails with `InvalidResponse`.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<GenerateResponse, ModelError>>>,
    calls: AtomicU32,
}

impl ScriptedModel {
    pub fn new(script: impl IntoIterator<Item = Result<GenerateResponse, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicU32::new(0),
        }
    }

    /// Answers the first 1024 calls with `response`.
    pub fn always(response: GenerateResponse) -> Self {
        Self::new(std::iter::repeat(response).take(1024).map(Ok))
    }

    pub fn api_error(status: u16) -> Result<GenerateResponse, ModelError> {
        Err(ModelError::Api {
            status,
            message: format!("scripted status {status}"),
        })
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(
        &self,
        _image_jpeg: &[u8],
        _instruction: &str,
    ) -> Result<GenerateResponse, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or_else(|| Err(ModelError::InvalidResponse("script exhausted".into())))
    }
}
