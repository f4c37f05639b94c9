use std::path::Path;

use expensa_core::{legacy, Expense, GenerateResponse, LegacyExpense, ValidationError, FUNCTION_NAME};
use thiserror::Error;

use crate::hash;
use crate::model::GenerativeModel;
use crate::retry::{RetryError, RetryPolicy};

/// Instruction sent with every receipt in function-calling mode.
pub const PROMPT: &str = "Parse this receipt and pass the data to the addReceipt function.";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("readFile: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Upstream(#[from] RetryError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Orchestrates: read → call model (with retry) → validate shape → validate
/// arguments → map to [`Expense`].
///
/// Holds no per-receipt state; one pipeline can serve concurrent callers.
pub struct ReceiptPipeline<M: GenerativeModel> {
    model: M,
    retry: RetryPolicy,
}

impl<M: GenerativeModel> ReceiptPipeline<M> {
    pub fn new(model: M) -> Self {
        Self { model, retry: RetryPolicy::default() }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Process a receipt image on disk. The file name is recorded as the
    /// expense's provenance.
    pub async fn process_file(&self, path: &Path) -> Result<Expense, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        let expense = self.process_bytes(&bytes).await?;
        Ok(match file_name(path) {
            Some(name) => expense.with_filename(name),
            None => expense,
        })
    }

    /// Process raw JPEG bytes (file read or HTTP upload).
    pub async fn process_bytes(&self, image_jpeg: &[u8]) -> Result<Expense, PipelineError> {
        let response = self.generate(image_jpeg, PROMPT).await?;
        let call = response.expect_call(FUNCTION_NAME)?;
        Ok(Expense::from_call(call)?)
    }

    /// Free-text variant of [`Self::process_file`]. The model behind this
    /// pipeline should be configured without the function declaration.
    pub async fn process_file_textual(&self, path: &Path) -> Result<LegacyExpense, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        let expense = self.process_bytes_textual(&bytes).await?;
        Ok(match file_name(path) {
            Some(name) => expense.with_filename(name),
            None => expense,
        })
    }

    pub async fn process_bytes_textual(
        &self,
        image_jpeg: &[u8],
    ) -> Result<LegacyExpense, PipelineError> {
        let response = self.generate(image_jpeg, legacy::TEXT_PROMPT).await?;
        let text = response.expect_text()?;
        Ok(LegacyExpense::from_text(text)?)
    }

    async fn generate(
        &self,
        image_jpeg: &[u8],
        instruction: &str,
    ) -> Result<GenerateResponse, RetryError> {
        let fingerprint = hash::fingerprint(image_jpeg);
        tracing::debug!(image = %fingerprint, bytes = image_jpeg.len(), "sending receipt to model");

        let response = self
            .retry
            .run(|_| self.model.generate(image_jpeg, instruction))
            .await?;

        tracing::debug!(image = %fingerprint, candidates = response.candidates.len(), "model answered");
        Ok(response)
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
