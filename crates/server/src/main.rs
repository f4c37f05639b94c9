use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use expensa_extract::{GeminiModel, ModelConfig, ReceiptPipeline};
use tokio::net::TcpListener;
use tracing::info;

mod config;
mod routes;
mod telemetry;

use config::ServerConfig;

/// Receipt extraction over HTTP: POST a JPEG to /receipt.
#[derive(Debug, Parser)]
#[command(name = "expensa-server", version)]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address, e.g. 0.0.0.0:8443.
    #[arg(long)]
    addr: Option<SocketAddr>,
    /// PEM certificate chain (enables TLS together with --key).
    #[arg(long)]
    cert: Option<PathBuf>,
    /// PEM private key.
    #[arg(long)]
    key: Option<PathBuf>,
    /// Directory served for every path other than /receipt.
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(addr) = self.addr {
            config.addr = addr;
        }
        if let Some(cert) = self.cert {
            config.cert = Some(cert);
        }
        if let Some(key) = self.key {
            config.key = Some(key);
        }
        if let Some(dir) = self.static_dir {
            config.static_dir = dir;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("expensa-server");

    let config = Args::parse().into_config().context("server configuration")?;
    let model_config = ModelConfig::from_env().context("model configuration")?;
    let retry = model_config.retry_policy();
    let pipeline = Arc::new(ReceiptPipeline::new(GeminiModel::new(model_config)).with_retry(retry));

    let app = routes::router(pipeline, &config.static_dir, config.body_limit);

    match config.tls() {
        Some((cert, key)) => {
            // Both reqwest and axum-server link rustls; pin the provider once.
            let _ = rustls::crypto::ring::default_provider().install_default();
            let tls = RustlsConfig::from_pem_file(cert, key)
                .await
                .with_context(|| format!("loading TLS material {} / {}", cert.display(), key.display()))?;

            let handle = axum_server::Handle::new();
            let shutdown = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            info!(addr = %config.addr, "listening (https)");
            axum_server::bind_rustls(config.addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(addr = %config.addr, "listening (http)");
            let listener = TcpListener::bind(config.addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received, draining connections"),
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for interrupts");
            std::future::pending::<()>().await;
        }
    }
}
