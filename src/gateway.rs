//! Gateway descriptors and the static seed configuration.

use std::fmt;

/// Known-good object used only for health probes.
pub const PROBE_CID: &str = "bafybeiczsscdsbs7ffqz55asqdf3smv6klcw3gofszvwlyarci47bgf354";

/// Publicly hosted gateways probed when the caller supplies none.
pub const DEFAULT_GATEWAY_HOSTS: [&str; 2] = ["dweb.link", "cf-ipfs.com"];

/// One candidate HTTP gateway.
///
/// `host` is the identity of a node: two nodes with the same host are the same
/// gateway as far as deduplication and ranking are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GatewayNode {
    pub host: String,
    /// Publicly hosted (HTTPS, subdomain addressing) vs locally run (HTTP, path addressing).
    pub remote: bool,
    pub healthy: bool,
    /// Round-trip milliseconds measured by the last successful probe.
    pub speed: Option<u64>,
}

impl GatewayNode {
    pub fn remote(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            remote: true,
            healthy: true,
            speed: None,
        }
    }

    /// A locally run gateway. `host` may carry a port, e.g. `127.0.0.1:8080`.
    pub fn local(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            remote: false,
            healthy: true,
            speed: None,
        }
    }

    pub fn with_speed(mut self, speed: u64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_healthy(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// URL scheme used to reach this gateway.
    pub fn scheme(&self) -> &'static str {
        if self.remote {
            "https"
        } else {
            "http"
        }
    }
}

impl fmt::Display for GatewayNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme(), self.host)
    }
}

/// A fresh copy of the default seed list.
pub fn default_gateways() -> Vec<GatewayNode> {
    DEFAULT_GATEWAY_HOSTS
        .iter()
        .map(|host| GatewayNode::remote(*host))
        .collect()
}

/// Fallback used whenever no probed gateway is healthy.
pub fn default_gateway() -> GatewayNode {
    GatewayNode::remote(DEFAULT_GATEWAY_HOSTS[0])
}
