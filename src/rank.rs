//! Ordering of probed gateways.

use crate::cache::TtlCache;
use crate::gateway::{default_gateway, GatewayNode};

use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// First occurrence of every host, unhealthy nodes removed.
fn healthy_unique(nodes: &[GatewayNode]) -> Vec<GatewayNode> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter(|node| seen.insert(node.host.as_str()))
        .filter(|node| node.healthy)
        .cloned()
        .collect()
}

fn order_by_speed(mut nodes: Vec<GatewayNode>) -> Vec<GatewayNode> {
    // Unmeasured nodes go last; the sort is stable so ties keep input order.
    nodes.sort_by_key(|node| node.speed.unwrap_or(u64::MAX));
    if nodes.is_empty() {
        warn!("No healthy gateway, falling back to {}", default_gateway().host);
        return vec![default_gateway()];
    }
    nodes
}

/// Deduplicate by host, keep healthy nodes and sort them by ascending speed.
/// Never returns an empty list.
pub fn rank_gateways(nodes: &[GatewayNode]) -> Vec<GatewayNode> {
    order_by_speed(healthy_unique(nodes))
}

/// [`rank_gateways`] memoized on its filtered input.
pub struct Ranker {
    cache: TtlCache<Vec<GatewayNode>, Vec<GatewayNode>>,
}

impl Ranker {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            cache: TtlCache::new(ttl, capacity),
        }
    }

    pub fn rank(&self, nodes: &[GatewayNode]) -> Vec<GatewayNode> {
        let key = healthy_unique(nodes);
        if let Some(ranked) = self.cache.get(&key) {
            debug!("Using cached ranking for {} gateways", key.len());
            return ranked;
        }

        let ranked = order_by_speed(key.clone());
        debug!(
            "Ranked gateways: {:?}",
            ranked
                .iter()
                .map(|n| (&n.host, n.speed))
                .collect::<Vec<_>>()
        );
        self.cache.insert(key, ranked.clone());
        ranked
    }
}
