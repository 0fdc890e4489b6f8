//! Cycle controller: the fetch → append → threshold-check → rotate loop.
//!
//! Every fetch, append, or sort failure is logged and recovered here; the
//! loop only exits on cancellation. Data already appended to the buffer is
//! never lost to a failed iteration.

use crate::buffer_writer::BufferWriter;
use crate::errors::FetchError;
use crate::generator_client::{GeneratedObject, ObjectSource};
use crate::metrics;
use crate::rotator::Rotator;
use crate::units;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Returns true when the token fired before the delay elapsed.
async fn sleep_or_cancel(duration: Duration, cancel_token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel_token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

pub struct CycleController {
    source: Arc<dyn ObjectSource>,
    buffer: BufferWriter,
    rotator: Rotator,
    threshold_gb: u64,
    poll_interval: Duration,
}

impl CycleController {
    pub fn new(
        source: Arc<dyn ObjectSource>,
        buffer: BufferWriter,
        rotator: Rotator,
        threshold_gb: u64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            buffer,
            rotator,
            threshold_gb,
            poll_interval,
        }
    }

    /// Run the accumulation loop until the token is cancelled. Cancellation
    /// is cooperative: it is checked at the top of each iteration and raced
    /// against every blocking wait, while in-flight file writes are allowed
    /// to complete so the buffer never ends on a partial line.
    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!(
            buffer = %self.buffer.path().display(),
            threshold_gb = self.threshold_gb,
            "worker loop started"
        );

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            match self.source.fetch_batch(&cancel_token).await {
                Ok(objects) if objects.is_empty() => {
                    debug!("fetch returned no objects");
                }
                Ok(objects) => self.append_and_maybe_rotate(&objects).await,
                Err(FetchError::Cancelled) => break,
                Err(err) => {
                    warn!(error = %err, "fetch failed; retrying on next iteration");
                    metrics::FETCH_ERRORS_TOTAL.inc();
                }
            }

            if sleep_or_cancel(self.poll_interval, &cancel_token).await {
                break;
            }
        }

        info!("worker loop stopped");
    }

    async fn append_and_maybe_rotate(&mut self, objects: &[GeneratedObject]) {
        let buffer_bytes = match self.buffer.append(objects).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    error = %err,
                    batch = objects.len(),
                    "append failed; this iteration contributes no records"
                );
                metrics::WRITE_ERRORS_TOTAL.inc();
                return;
            }
        };

        metrics::BUFFER_SIZE_BYTES.set(buffer_bytes as i64);
        debug!(
            appended = objects.len(),
            buffer_mb = units::bytes_to_megabytes(buffer_bytes),
            "batch appended"
        );

        if !units::gigabyte_threshold_reached(buffer_bytes, self.threshold_gb) {
            return;
        }

        info!(
            buffer_gb = units::bytes_to_gigabytes(buffer_bytes),
            threshold_gb = self.threshold_gb,
            "size threshold reached; starting rotation"
        );

        let started = Instant::now();
        match self.rotator.rotate(self.buffer.path()).await {
            Ok(output) => {
                metrics::ROTATIONS_TOTAL.inc();
                metrics::ROTATION_DURATION.observe(started.elapsed().as_secs_f64());

                if let Err(err) = self.buffer.reset().await {
                    warn!(
                        error = %err,
                        "failed to reset buffer after rotation; next output may repeat records"
                    );
                    return;
                }
                metrics::BUFFER_SIZE_BYTES.set(0);
                info!(
                    output = %output.display(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "rotation complete; buffer reset"
                );
            }
            Err(err) => {
                // The buffer is untouched on failure, so the accumulated
                // records get another chance on the next threshold check.
                warn!(error = %err, "rotation failed; buffer preserved");
                metrics::SORT_ERRORS_TOTAL.inc();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct EmptySource;

    #[async_trait]
    impl ObjectSource for EmptySource {
        async fn fetch_batch(
            &self,
            _cancel_token: &CancellationToken,
        ) -> Result<Vec<GeneratedObject>, FetchError> {
            Ok(Vec::new())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ObjectSource for FailingSource {
        async fn fetch_batch(
            &self,
            _cancel_token: &CancellationToken,
        ) -> Result<Vec<GeneratedObject>, FetchError> {
            Err(FetchError::Cancelled)
        }
    }

    fn controller(source: Arc<dyn ObjectSource>, dir: &std::path::Path) -> CycleController {
        CycleController::new(
            source,
            BufferWriter::new(dir.join("buffer.txt")),
            Rotator::new(dir.to_path_buf(), 1).unwrap(),
            1,
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn run_exits_promptly_on_pre_cancelled_token() {
        let dir = tempdir().unwrap();
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();

        let controller = controller(Arc::new(EmptySource), dir.path());
        tokio::time::timeout(Duration::from_secs(1), controller.run(cancel_token))
            .await
            .expect("run should observe cancellation immediately");
    }

    #[tokio::test]
    async fn run_exits_when_fetch_observes_cancellation() {
        let dir = tempdir().unwrap();
        let controller = controller(Arc::new(FailingSource), dir.path());
        tokio::time::timeout(
            Duration::from_secs(1),
            controller.run(CancellationToken::new()),
        )
        .await
        .expect("cancelled fetch should stop the loop");
    }
}
