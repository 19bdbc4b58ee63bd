//! Preloader
//!
//! Warms a batch of image URLs concurrently. Every item settles on its own:
//! a failed or timed-out probe reports `None` and never affects the others.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::{MediaError, Result};

use super::size::SizeToken;
use super::url::UrlBuilder;

// == Resource Probe ==
/// Loads a single resource so later requests for it are warm.
#[async_trait]
pub trait ResourceProbe: Send + Sync {
    /// Succeeds once the resource at `url` has been fetched.
    async fn probe(&self, url: &str) -> Result<()>;
}

/// Probe that issues a GET and accepts any success status.
#[derive(Debug, Clone, Default)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceProbe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::Internal(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MediaError::NotFound(format!("HTTP {} for {url}", response.status())));
        }

        // Drain the body so the transfer actually completes
        response
            .bytes()
            .await
            .map_err(|e| MediaError::Internal(format!("Failed to read body: {e}")))?;
        Ok(())
    }
}

// == Preloader ==
pub struct Preloader {
    builder: Arc<UrlBuilder>,
    probe: Arc<dyn ResourceProbe>,
    timeout: Option<Duration>,
}

impl Preloader {
    /// Creates a preloader. `timeout` bounds each probe individually;
    /// `None` lets a stalled probe hold the batch open indefinitely.
    pub fn new(
        builder: Arc<UrlBuilder>,
        probe: Arc<dyn ResourceProbe>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            builder,
            probe,
            timeout,
        }
    }

    /// Preloads every non-blank path at `size`.
    ///
    /// Returns one entry per non-blank path, in input order: the warmed URL,
    /// or `None` when that probe failed or timed out.
    pub async fn preload<S: AsRef<str>>(&self, paths: &[S], size: &SizeToken) -> Vec<Option<String>> {
        let urls: Vec<String> = paths
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.trim().is_empty())
            .map(|p| self.builder.resolve(Some(p), size, None))
            .collect();

        debug!(count = urls.len(), size = %size, "Preloading images");

        let results = join_all(urls.into_iter().map(|url| self.settle(url))).await;

        let failed = results.iter().filter(|r| r.is_none()).count();
        if failed > 0 {
            debug!(failed, total = results.len(), "Some preloads did not settle successfully");
        }
        results
    }

    async fn settle(&self, url: String) -> Option<String> {
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.probe.probe(&url)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(url = %url, timeout_ms = limit.as_millis() as u64, "Preload timed out");
                    return None;
                }
            },
            None => self.probe.probe(&url).await,
        };

        match outcome {
            Ok(()) => Some(url),
            Err(e) => {
                debug!(url = %url, error = %e, "Preload failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for Preloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preloader")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
