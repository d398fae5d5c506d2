//! # ipfs-gateway-client
//!
//! A lightweight IPFS client that resolves content and naming addresses through
//! public HTTP gateways, always preferring the fastest reachable one.
//!
//! ## Features
//!
//! - **Address Rewriting**: Bare CIDs, `ipfs://` and `ipns://` URIs and DNSLink names
//!   become gateway URLs; absolute HTTP(S) URLs pass through untouched
//! - **Subdomain Addressing**: Base32 CIDs on remote gateways are served from
//!   `<cid>.ipfs.<gateway>`, everything else from `/ipfs/` or `/ipns/` paths
//! - **Health Ranking**: Gateways are probed with a known-good object (at most 6 at a
//!   time) and ranked by round-trip latency
//! - **Memoized Probes**: Probe results and rankings are cached per client for one check
//!   interval, with LRU eviction
//! - **Safe Fallback**: If every probe fails, the default gateway is used
//! - **Local Gateways**: Nodes flagged as local are reached over plain HTTP
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ipfs_gateway_client::{ClientConfig, GatewayClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new()
//!         .with_gateway_check_interval(Duration::from_secs(10))
//!         .with_request_timeout(Duration::from_secs(20));
//!
//!     let client = GatewayClient::new(config)?;
//!     client.init().await;
//!
//!     println!("Chosen gateway: {}", client.active_gateway());
//!
//!     let data = client.read("ipns://docs.ipfs.tech").await?;
//!     println!("{}", String::from_utf8_lossy(&data));
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod health;
pub mod rank;
pub mod transform;

pub use cache::TtlCache;
pub use client::{ClientStatus, GatewayClient};
pub use config::ClientConfig;
pub use error::{GatewayError, Result};
pub use fetch::{FetchResponse, Fetcher, HttpFetcher};
pub use gateway::{
    default_gateway, default_gateways, GatewayNode, DEFAULT_GATEWAY_HOSTS, PROBE_CID,
};
pub use health::{HealthChecker, ProbeResult};
pub use rank::{rank_gateways, Ranker};
pub use transform::{classify, is_base32_cid, is_cid, transform, AddressKind, ResolvedAddress};
