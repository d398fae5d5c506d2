use crate::error::{GatewayError, Result};
use crate::gateway::{default_gateways, GatewayNode, PROBE_CID};
use crate::transform::is_cid;

use std::time::Duration;

/// Upper bound for the check interval, which also serves as cache TTL and refresh period.
pub const MAX_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Caller-supplied ranked list; when set, discovery never runs.
    pub gateways: Option<Vec<GatewayNode>>,
    /// Caller-supplied gateway; when set, it is never replaced.
    pub chosen_gateway: Option<GatewayNode>,
    /// Gateways probed by discovery.
    pub candidates: Vec<GatewayNode>,
    pub gateway_check_interval: Duration,
    pub probe_concurrency: usize,
    pub cache_capacity: usize,
    pub request_timeout: Duration,
    pub probe_cid: String,
    pub start_refresh_on_init: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateways: None,
            chosen_gateway: None,
            candidates: default_gateways(),
            gateway_check_interval: Duration::from_millis(10_000),
            probe_concurrency: 6,
            cache_capacity: 100,
            request_timeout: Duration::from_secs(30),
            probe_cid: PROBE_CID.to_string(),
            start_refresh_on_init: false,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gateways(mut self, gateways: Vec<GatewayNode>) -> Self {
        self.gateways = Some(gateways);
        self
    }

    pub fn with_chosen_gateway(mut self, gateway: GatewayNode) -> Self {
        self.chosen_gateway = Some(gateway);
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<GatewayNode>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_gateway_check_interval(mut self, interval: Duration) -> Self {
        self.gateway_check_interval = interval;
        self
    }

    pub fn with_probe_concurrency(mut self, concurrency: usize) -> Self {
        self.probe_concurrency = concurrency;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_probe_cid(mut self, cid: impl Into<String>) -> Self {
        self.probe_cid = cid.into();
        self
    }

    pub fn with_start_refresh_on_init(mut self, start: bool) -> Self {
        self.start_refresh_on_init = start;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe_concurrency == 0 {
            return Err(GatewayError::InvalidConfig(
                "probe concurrency must be at least 1".into(),
            ));
        }

        if self.cache_capacity == 0 {
            return Err(GatewayError::InvalidConfig(
                "cache capacity must be at least 1".into(),
            ));
        }

        if self.gateway_check_interval.is_zero() {
            return Err(GatewayError::InvalidConfig(
                "gateway check interval must be non-zero".into(),
            ));
        }

        if self.gateway_check_interval > MAX_CHECK_INTERVAL {
            return Err(GatewayError::InvalidConfig(format!(
                "gateway check interval must not exceed {:?}",
                MAX_CHECK_INTERVAL
            )));
        }

        if !is_cid(&self.probe_cid) {
            return Err(GatewayError::InvalidConfig(format!(
                "probe CID is not a valid CID: {}",
                self.probe_cid
            )));
        }

        match &self.gateways {
            Some(gateways) if gateways.is_empty() => {
                return Err(GatewayError::InvalidConfig(
                    "supplied gateway list is empty".into(),
                ));
            }
            None if self.candidates.is_empty() => {
                return Err(GatewayError::InvalidConfig(
                    "at least one candidate gateway is required".into(),
                ));
            }
            _ => {}
        }

        let seeded = self.gateways.iter().flatten();
        if let Some(node) = self
            .candidates
            .iter()
            .chain(seeded)
            .chain(self.chosen_gateway.iter())
            .find(|node| node.host.is_empty())
        {
            return Err(GatewayError::InvalidConfig(format!(
                "gateway host must not be empty: {node:?}"
            )));
        }

        Ok(())
    }
}
