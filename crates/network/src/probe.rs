// crates/network/src/probe.rs
//! Reachability probes

use crate::error::{NetworkError, NetworkResult};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Lightweight reachability check
///
/// Used to confirm online transitions before the sync engine is triggered,
/// so a flapping link does not thrash the engine.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns true if the network appears usable
    async fn is_reachable(&self) -> bool;

    /// Estimates round-trip time to a probe target
    async fn estimate_rtt(&self) -> NetworkResult<Duration>;
}

/// HTTP-backed probe issuing HEAD requests against a list of check URLs
#[derive(Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    check_urls: Vec<String>,
    timeout: Duration,
}

impl HttpProbe {
    /// Creates a probe with default check URLs
    pub fn new() -> NetworkResult<Self> {
        Self::with_urls(vec![
            "https://www.google.com".to_string(),
            "https://www.cloudflare.com".to_string(),
        ])
    }

    /// Creates a probe with custom check URLs
    pub fn with_urls(urls: Vec<String>) -> NetworkResult<Self> {
        let timeout = Duration::from_secs(5);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            check_urls: urls,
            timeout,
        })
    }

    async fn head_ok(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success() || response.status().is_redirection(),
            Err(e) => {
                log::debug!("probe HEAD {url} failed: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        for url in &self.check_urls {
            if self.head_ok(url).await {
                return true;
            }
        }
        false
    }

    async fn estimate_rtt(&self) -> NetworkResult<Duration> {
        let url = self
            .check_urls
            .first()
            .ok_or(NetworkError::NetworkUnavailable)?;
        let start = Instant::now();
        self.client.head(url).send().await?;
        let elapsed = start.elapsed();
        if elapsed > self.timeout {
            return Err(NetworkError::Timeout {
                seconds: self.timeout.as_secs(),
            });
        }
        Ok(elapsed)
    }
}
