//! Gateway health probing.

use crate::cache::TtlCache;
use crate::fetch::Fetcher;
use crate::gateway::GatewayNode;
use crate::transform::transform;

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeResult {
    pub healthy: bool,
    pub speed: Option<u64>,
}

impl ProbeResult {
    pub fn healthy(speed: u64) -> Self {
        Self {
            healthy: true,
            speed: Some(speed),
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            speed: None,
        }
    }

    /// Returns `node` with both probe fields replaced.
    pub fn apply(self, node: &GatewayNode) -> GatewayNode {
        GatewayNode {
            healthy: self.healthy,
            speed: self.speed,
            ..node.clone()
        }
    }
}

type ProbeKey = (bool, String);

/// Probes gateways by fetching a known-good object, memoizing results per
/// `(remote, host)` for one check interval.
pub struct HealthChecker<F> {
    fetcher: Arc<F>,
    probe_cid: String,
    cache: TtlCache<ProbeKey, ProbeResult>,
}

impl<F: Fetcher> HealthChecker<F> {
    pub fn new(
        fetcher: Arc<F>,
        probe_cid: impl Into<String>,
        ttl: Duration,
        capacity: usize,
    ) -> Self {
        Self {
            fetcher,
            probe_cid: probe_cid.into(),
            cache: TtlCache::new(ttl, capacity),
        }
    }

    /// Probe `node`, or return the memoized result if it has not expired.
    /// Failures of any kind come back as [`ProbeResult::unhealthy`].
    pub async fn check(&self, node: &GatewayNode) -> ProbeResult {
        let key = (node.remote, node.host.clone());
        if let Some(cached) = self.cache.get(&key) {
            debug!("Using cached probe result for {}: {:?}", node.host, cached);
            return cached;
        }

        let result = self.probe(node).await;
        self.cache.insert(key, result);
        result
    }

    async fn probe(&self, node: &GatewayNode) -> ProbeResult {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let address = format!("ipfs://{}?now={}", self.probe_cid, now_ms);

        let url = match transform(&address, node) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot build probe URL for {}: {}", node.host, e);
                return ProbeResult::unhealthy();
            }
        };

        let start = Instant::now();
        match self.fetcher.fetch_response(&url).await {
            Ok(response) if response.status == 200 => {
                let speed = start.elapsed().as_millis() as u64;
                debug!("Gateway {} healthy, latency {}ms", node.host, speed);
                ProbeResult::healthy(speed)
            }
            Ok(response) => {
                warn!(
                    "Gateway {} probe returned status {}",
                    node.host, response.status
                );
                ProbeResult::unhealthy()
            }
            Err(e) => {
                warn!("Gateway {} probe failed: {}", node.host, e);
                ProbeResult::unhealthy()
            }
        }
    }

    /// Probe every node with at most `concurrency` probes in flight. Output
    /// order matches input order.
    pub async fn probe_all(
        &self,
        nodes: &[GatewayNode],
        concurrency: usize,
    ) -> Vec<GatewayNode> {
        info!("Running health check on {} gateways", nodes.len());

        let probed: Vec<GatewayNode> = stream::iter(nodes.to_vec())
            .map(|node| async move { self.check(&node).await.apply(&node) })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let healthy = probed.iter().filter(|n| n.healthy).count();
        info!("{} of {} gateways healthy", healthy, probed.len());
        probed
    }

    pub fn cached_results(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
