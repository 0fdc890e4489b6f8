use anyhow::{Context, Result};
use obj_worker::buffer_writer::BufferWriter;
use obj_worker::config::Config;
use obj_worker::generator_client::GeneratorClient;
use obj_worker::rotator::Rotator;
use obj_worker::units;
use obj_worker::worker::CycleController;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config_path =
        std::env::var("OBJ_WORKER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    info!(
        host = %config.api.host,
        port = config.api.port,
        threading_number = config.threading_number(),
        "obj-worker starting"
    );

    let buffer_path = config.buffer_path();
    if let Some(parent) = buffer_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create buffer directory {}", parent.display()))?;
    }
    let output_dir = config.output_dir();
    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    let buffer = BufferWriter::new(buffer_path);
    let resume_bytes = buffer.len().await?;
    if resume_bytes > 0 {
        info!(
            buffer_mb = units::bytes_to_megabytes(resume_bytes),
            "resuming with existing accumulation buffer"
        );
    }

    let source = Arc::new(GeneratorClient::new(
        config.objects_url(),
        config.worker.threshold_for_objects,
    ));
    let rotator = Rotator::new(output_dir, config.threading_number())?;
    let controller = CycleController::new(
        source,
        buffer,
        rotator,
        config.worker.file_gb_size_threshold,
        config.poll_interval(),
    );

    let cancel_token = CancellationToken::new();
    let mut worker_handle = tokio::spawn({
        let cancel_token = cancel_token.clone();
        async move { controller.run(cancel_token).await }
    });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                error!(error = %err, "failed while waiting for shutdown signal");
            }
            info!("shutdown signal received");
        }
        result = &mut worker_handle => {
            if let Err(err) = result {
                error!(error = %err, "worker loop exited unexpectedly");
            } else {
                warn!("worker loop exited unexpectedly");
            }
            return Ok(());
        }
    }

    cancel_token.cancel();

    let shutdown_timeout = sleep(Duration::from_secs(5));
    tokio::pin!(shutdown_timeout);
    let result = tokio::select! {
        res = &mut worker_handle => Some(res),
        _ = &mut shutdown_timeout => None,
    };

    match result {
        Some(Ok(())) => info!("worker stopped"),
        Some(Err(err)) => warn!(error = %err, "worker exited with error during shutdown"),
        None => {
            warn!("worker did not stop within timeout; aborting");
            worker_handle.abort();
        }
    }

    Ok(())
}

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
