//! Video transcode worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidflow_media::{check_ffmpeg, check_ffprobe, FfmpegTranscoder};
use vidflow_models::ResolutionTable;
use vidflow_queue::QueueConfig;
use vidflow_registry::RegistryClient;
use vidflow_storage::StorageClient;
use vidflow_worker::{JobIntake, ProcessingContext, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting vidflow transcode worker");

    // External tool preflight
    if let Err(e) = check_ffmpeg() {
        error!("{}", e);
        std::process::exit(1);
    }
    if let Err(e) = check_ffprobe() {
        error!("{}", e);
        std::process::exit(1);
    }

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Construct collaborators once and inject them into every pipeline.
    let storage = match StorageClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = storage.ensure_bucket().await {
        error!("Failed to ensure storage bucket: {}", e);
        std::process::exit(1);
    }

    let registry = match RegistryClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create registry client: {}", e);
            std::process::exit(1);
        }
    };

    let transcoder = FfmpegTranscoder::new(config.process_timeout.as_secs());

    let ctx = Arc::new(ProcessingContext::new(
        config,
        ResolutionTable::standard(),
        Arc::new(storage),
        Arc::new(transcoder),
        Arc::new(registry),
    ));

    let intake = Arc::new(JobIntake::new(ctx, QueueConfig::from_env()));

    // Graceful shutdown on SIGINT/SIGTERM
    let signal_intake = Arc::clone(&intake);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal");
        signal_intake.shutdown();
    });

    if let Err(e) = intake.run().await {
        error!("Intake error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
