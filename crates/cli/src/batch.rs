use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use expensa_extract::{GenerativeModel, PipelineError, ReceiptPipeline};

/// Which response contract to ask the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Structured `addReceipt` function call.
    FunctionCall,
    /// Free-text JSON answer with a Markdown fence.
    Textual,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub failed: usize,
    /// Files left untouched because cancellation was requested.
    pub skipped: usize,
}

/// Regular files of `dir`, sorted by name.
pub async fn list_receipts(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("readdir: {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            continue;
        }
        files.push(entry.path());
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Process every receipt in `dir` in order, writing one JSON line per file to
/// `out`. A failed file is logged and written as `null`; it never stops the
/// batch. `cancel` is checked before each file.
pub async fn run<M, W>(
    pipeline: &ReceiptPipeline<M>,
    mode: Mode,
    dir: &Path,
    cancel: &AtomicBool,
    out: &mut W,
) -> anyhow::Result<Summary>
where
    M: GenerativeModel,
    W: Write,
{
    let files = list_receipts(dir).await?;
    let mut summary = Summary::default();

    for (index, path) in files.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            summary.skipped = files.len() - index;
            tracing::warn!(remaining = summary.skipped, "cancelled, skipping remaining receipts");
            break;
        }

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        tracing::info!(file = %name, "processing receipt");

        let line = match extract_json(pipeline, mode, path).await {
            Ok(json) => {
                summary.processed += 1;
                json
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!(file = %name, error = %e, "receipt failed");
                "null".to_string()
            }
        };
        writeln!(out, "{line}")?;
        out.flush()?;
    }

    Ok(summary)
}

async fn extract_json<M: GenerativeModel>(
    pipeline: &ReceiptPipeline<M>,
    mode: Mode,
    path: &Path,
) -> Result<String, PipelineError> {
    let json = match mode {
        Mode::FunctionCall => serde_json::to_string(&pipeline.process_file(path).await?),
        Mode::Textual => serde_json::to_string(&pipeline.process_file_textual(path).await?),
    };
    // Expense and LegacyExpense only hold strings and finite numbers.
    Ok(json.unwrap_or_else(|_| "null".to_string()))
}
