use crate::errors::FetchError;
use crate::metrics;
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One generated entry as returned by the `/objects` endpoint, shaped
/// `<unix-epoch-seconds>.<word>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedObject {
    #[serde(rename = "Text", alias = "text", alias = "TEXT")]
    pub text: String,
}

/// Source of generated object batches.
///
/// The cycle controller only depends on this seam, so tests can drive the
/// loop with a scripted source instead of a live generator endpoint.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    async fn fetch_batch(
        &self,
        cancel_token: &CancellationToken,
    ) -> Result<Vec<GeneratedObject>, FetchError>;
}

pub struct GeneratorClient {
    client: reqwest::Client,
    objects_url: String,
    threshold_for_objects: u64,
}

impl GeneratorClient {
    pub fn new(objects_url: String, threshold_for_objects: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            objects_url,
            threshold_for_objects,
        }
    }

    /// Randomized batch bounds for one request: `min` below the object
    /// threshold, `max` above it, so batch sizes vary but trend upward.
    /// The endpoint rejects any pair violating `0 < min <= max`.
    fn batch_range(&self) -> (u64, u64) {
        let mut rng = rand::thread_rng();
        let min = rng.gen_range(1..self.threshold_for_objects);
        let max = rng.gen_range(self.threshold_for_objects + 1..self.threshold_for_objects * 2);
        (min, max)
    }
}

#[async_trait]
impl ObjectSource for GeneratorClient {
    async fn fetch_batch(
        &self,
        cancel_token: &CancellationToken,
    ) -> Result<Vec<GeneratedObject>, FetchError> {
        let (min, max) = self.batch_range();
        debug!(min, max, url = %self.objects_url, "requesting generated objects");

        let request = self
            .client
            .get(&self.objects_url)
            .query(&[("min", min), ("max", max)]);

        let response = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Err(FetchError::Cancelled),
            result = request.send() => result?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let objects: Vec<GeneratedObject> = serde_json::from_str(&body)?;
        metrics::OBJECTS_FETCHED_TOTAL.inc_by(objects.len() as u64);

        debug!(count = objects.len(), "fetched generated objects");
        Ok(objects)
    }
}
