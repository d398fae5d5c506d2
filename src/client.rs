//! Client facade over the ranked gateway set.
//!
//! A [`GatewayClient`] starts out [`ClientStatus::Uninitialized`]. [`GatewayClient::init`]
//! probes the candidate gateways, ranks them and picks the fastest; from then on every
//! fetch is rewritten against that gateway and handed to the [`Fetcher`].

use crate::config::ClientConfig;
use crate::error::Result;
use crate::fetch::{FetchResponse, Fetcher, HttpFetcher};
use crate::gateway::{default_gateway, GatewayNode};
use crate::health::{HealthChecker, ProbeResult};
use crate::rank::Ranker;
use crate::transform::transform;

use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Uninitialized,
    Ready,
}

#[derive(Debug, Default)]
struct ClientState {
    chosen_gateway: Option<GatewayNode>,
    gateways: Option<Vec<GatewayNode>>,
}

struct ClientInner<F> {
    config: ClientConfig,
    fetcher: Arc<F>,
    checker: HealthChecker<F>,
    ranker: Ranker,
    state: RwLock<ClientState>,
    seeded_gateways: bool,
    seeded_chosen: bool,
    shutdown: Notify,
    refresh_running: AtomicBool,
    // Bumped by `shutdown`; a refresh task exits once it no longer matches.
    refresh_generation: AtomicU64,
}

/// Puts `chosen` at the head of `gateways`, dropping any other entry for its host.
fn lead_with(chosen: &GatewayNode, gateways: Vec<GatewayNode>) -> Vec<GatewayNode> {
    let mut ordered = Vec::with_capacity(gateways.len() + 1);
    ordered.push(chosen.clone());
    ordered.extend(gateways.into_iter().filter(|node| node.host != chosen.host));
    ordered
}

/// Resolves IPFS and IPNS addresses through the fastest healthy gateway.
///
/// Probe and ranking caches belong to the client, so separate clients never
/// share results. Clones share the same state.
///
/// # Example
///
/// ```rust,no_run
/// use ipfs_gateway_client::{ClientConfig, GatewayClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GatewayClient::new(ClientConfig::default())?;
/// client.init().await;
///
/// let bytes = client
///     .read("ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi")
///     .await?;
/// println!("{} bytes", bytes.len());
/// # Ok(())
/// # }
/// ```
pub struct GatewayClient<F = HttpFetcher> {
    inner: Arc<ClientInner<F>>,
}

impl<F> Clone for GatewayClient<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl GatewayClient<HttpFetcher> {
    /// Client backed by `reqwest`, using the configured request timeout.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.request_timeout)?;
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: Fetcher> GatewayClient<F> {
    pub fn with_fetcher(config: ClientConfig, fetcher: F) -> Result<Self> {
        Self::with_shared_fetcher(config, Arc::new(fetcher))
    }

    pub fn with_shared_fetcher(config: ClientConfig, fetcher: Arc<F>) -> Result<Self> {
        config.validate()?;

        let ttl = config.gateway_check_interval;
        let checker = HealthChecker::new(
            Arc::clone(&fetcher),
            config.probe_cid.clone(),
            ttl,
            config.cache_capacity,
        );
        let ranker = Ranker::new(ttl, config.cache_capacity);
        let gateways = match (&config.chosen_gateway, &config.gateways) {
            (Some(chosen), Some(gateways)) => Some(lead_with(chosen, gateways.clone())),
            (_, gateways) => gateways.clone(),
        };
        let state = ClientState {
            chosen_gateway: config.chosen_gateway.clone(),
            gateways,
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                seeded_gateways: config.gateways.is_some(),
                seeded_chosen: config.chosen_gateway.is_some(),
                config,
                fetcher,
                checker,
                ranker,
                state: RwLock::new(state),
                shutdown: Notify::new(),
                refresh_running: AtomicBool::new(false),
                refresh_generation: AtomicU64::new(0),
            }),
        })
    }

    /// Populate whatever the caller did not seed: the ranked gateway list by
    /// probing the candidates, and the chosen gateway as the head of that list.
    /// A seeded chosen gateway is moved to the head of the list instead.
    ///
    /// Must complete before any fetch that relies on the chosen gateway.
    pub async fn init(&self) {
        let needs_discovery = self.inner.state.read().gateways.is_none();
        if needs_discovery {
            let ranked = self.discover().await;
            let mut guard = self.inner.state.write();
            let state = &mut *guard;
            if state.gateways.is_none() {
                state.gateways = Some(match &state.chosen_gateway {
                    Some(chosen) => lead_with(chosen, ranked),
                    None => ranked,
                });
            }
        }

        {
            let mut guard = self.inner.state.write();
            let state = &mut *guard;
            if state.chosen_gateway.is_none() {
                state.chosen_gateway = state.gateways.as_ref().and_then(|g| g.first()).cloned();
            }
            if let Some(chosen) = &state.chosen_gateway {
                info!("Using gateway {}", chosen);
            }
        }

        if self.inner.config.start_refresh_on_init {
            self.start_refresh_task();
        }
    }

    /// Re-probe the candidates and re-rank them. Does nothing for a caller-seeded
    /// gateway list; a caller-seeded chosen gateway is kept.
    pub async fn refresh(&self) {
        if self.inner.seeded_gateways {
            debug!("Gateway list supplied by caller, skipping refresh");
            return;
        }

        let ranked = self.discover().await;
        let mut guard = self.inner.state.write();
        let state = &mut *guard;
        match (&state.chosen_gateway, self.inner.seeded_chosen) {
            (Some(chosen), true) => state.gateways = Some(lead_with(chosen, ranked)),
            _ => {
                state.chosen_gateway = ranked.first().cloned();
                state.gateways = Some(ranked);
            }
        }
    }

    async fn discover(&self) -> Vec<GatewayNode> {
        let probed = self
            .inner
            .checker
            .probe_all(&self.inner.config.candidates, self.inner.config.probe_concurrency)
            .await;
        self.inner.ranker.rank(&probed)
    }

    /// Spawn a task that calls [`refresh`](Self::refresh) every check interval
    /// until [`shutdown`](Self::shutdown). At most one task runs per client;
    /// the task can be started again after a shutdown.
    pub fn start_refresh_task(&self) {
        if self.inner.seeded_gateways {
            return;
        }
        if self.inner.refresh_running.swap(true, Ordering::AcqRel) {
            debug!("Gateway refresh task already running");
            return;
        }

        let client = self.clone();
        let generation = self.inner.refresh_generation.load(Ordering::Acquire);
        let period = self.inner.config.gateway_check_interval;

        tokio::spawn(async move {
            let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
            let mut ticker = interval_at(start, period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if client.inner.refresh_generation.load(Ordering::Acquire) != generation {
                            break;
                        }
                        client.refresh().await;
                    }
                    _ = client.inner.shutdown.notified() => {
                        break;
                    }
                }
            }
            info!("Gateway refresh task shutting down");
        });
    }

    pub fn is_refresh_running(&self) -> bool {
        self.inner.refresh_running.load(Ordering::Acquire)
    }

    pub fn shutdown(&self) {
        self.inner.refresh_generation.fetch_add(1, Ordering::AcqRel);
        self.inner.refresh_running.store(false, Ordering::Release);
        self.inner.shutdown.notify_waiters();
    }

    /// Fetch the whole resource behind `address`.
    pub async fn read(&self, address: &str) -> Result<Bytes> {
        let url = self.transform_address(address)?;
        self.inner.fetcher.fetch_bytes(&url).await
    }

    /// Fetch `address` and return the gateway response as is, whatever its status.
    pub async fn open(&self, address: &str) -> Result<FetchResponse> {
        let url = self.transform_address(address)?;
        self.inner.fetcher.fetch_response(&url).await
    }

    /// Same as [`read`](Self::read); ranged reads are not supported.
    pub async fn seek(&self, address: &str) -> Result<Bytes> {
        self.read(address).await
    }

    /// The URL `address` resolves to on the active gateway.
    pub fn transform_address(&self, address: &str) -> Result<String> {
        transform(address, &self.active_gateway())
    }

    pub fn status(&self) -> ClientStatus {
        let state = self.inner.state.read();
        if state.chosen_gateway.is_some() && state.gateways.is_some() {
            ClientStatus::Ready
        } else {
            ClientStatus::Uninitialized
        }
    }

    pub fn chosen_gateway(&self) -> Option<GatewayNode> {
        self.inner.state.read().chosen_gateway.clone()
    }

    /// The chosen gateway, or the default gateway before [`init`](Self::init).
    pub fn active_gateway(&self) -> GatewayNode {
        self.chosen_gateway().unwrap_or_else(default_gateway)
    }

    pub fn gateways(&self) -> Option<Vec<GatewayNode>> {
        self.inner.state.read().gateways.clone()
    }

    pub fn gateway_health(&self) -> Vec<(String, ProbeResult)> {
        self.inner
            .state
            .read()
            .gateways
            .iter()
            .flatten()
            .map(|node| {
                let result = ProbeResult {
                    healthy: node.healthy,
                    speed: node.speed,
                };
                (node.host.clone(), result)
            })
            .collect()
    }

    pub fn healthy_gateway_count(&self) -> usize {
        self.inner
            .state
            .read()
            .gateways
            .iter()
            .flatten()
            .filter(|node| node.healthy)
            .count()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}
