use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use expensa_extract::{GeminiModel, ModelConfig, ReceiptPipeline};
use tracing_subscriber::EnvFilter;

mod batch;

use batch::Mode;

/// Extract expenses from a directory of receipt photos, one JSON line per file.
#[derive(Debug, Parser)]
#[command(name = "expensa", version)]
struct Args {
    /// Directory containing JPEG receipt images.
    dir: PathBuf,

    /// Ask for a free-text JSON answer instead of an addReceipt function call.
    #[arg(long)]
    textual: bool,

    /// Gemini model name (overrides GEMINI_MODEL).
    #[arg(long)]
    model: Option<String>,

    /// Attempts per receipt, including the first call.
    #[arg(long)]
    max_attempts: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the JSON lines, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = ModelConfig::from_env().context("model configuration")?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(n) = args.max_attempts {
        config.max_attempts = n;
    }
    let retry = config.retry_policy();

    let mode = if args.textual { Mode::Textual } else { Mode::FunctionCall };
    let model = match mode {
        Mode::FunctionCall => GeminiModel::new(config),
        Mode::Textual => GeminiModel::new(config).without_tools(),
    };
    tracing::info!(model = model.model_name(), ?mode, dir = %args.dir.display(), "starting batch");
    let pipeline = ReceiptPipeline::new(model).with_retry(retry);

    // ── Interrupt handling ────────────────────────────────────────────────────
    // Checked between receipts; an in-flight call is allowed to finish.
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current receipt");
            cancel_on_signal.store(true, Ordering::Relaxed);
        }
    });

    let mut stdout = std::io::stdout();
    let summary = batch::run(&pipeline, mode, &args.dir, &cancel, &mut stdout).await?;

    tracing::info!(
        processed = summary.processed,
        failed = summary.failed,
        skipped = summary.skipped,
        "batch finished"
    );
    Ok(())
}
