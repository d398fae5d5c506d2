//! Client behaviour against a scripted fetcher.

use async_trait::async_trait;
use ipfs_gateway_client::{
    default_gateway, ClientConfig, ClientStatus, FetchResponse, Fetcher, GatewayClient,
    GatewayError, GatewayNode, Result,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const CID: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

#[derive(Clone, Copy)]
enum Behaviour {
    Ok { latency_ms: u64 },
    Status(u16),
    Refused,
}

/// Answers according to the gateway host found in the URL; unknown hosts refuse.
#[derive(Default)]
struct MockGateways {
    behaviours: Mutex<HashMap<String, Behaviour>>,
    requests: Mutex<Vec<String>>,
}

impl MockGateways {
    fn with(entries: &[(&str, Behaviour)]) -> Arc<Self> {
        let mock = Self::default();
        for (host, behaviour) in entries {
            mock.set(host, *behaviour);
        }
        Arc::new(mock)
    }

    fn set(&self, host: &str, behaviour: Behaviour) {
        self.behaviours.lock().insert(host.to_string(), behaviour);
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn behaviour_for(&self, url: &str) -> Behaviour {
        let authority = url
            .split("://")
            .nth(1)
            .and_then(|rest| rest.split(['/', '?']).next())
            .unwrap_or_default()
            .to_string();

        self.behaviours
            .lock()
            .iter()
            .filter(|(host, _)| authority == **host || authority.ends_with(&format!(".{host}")))
            .map(|(_, b)| *b)
            .next()
            .unwrap_or(Behaviour::Refused)
    }
}

#[async_trait]
impl Fetcher for MockGateways {
    async fn fetch_response(&self, url: &str) -> Result<FetchResponse> {
        self.requests.lock().push(url.to_string());

        match self.behaviour_for(url) {
            Behaviour::Ok { latency_ms } => {
                tokio::time::sleep(Duration::from_millis(latency_ms)).await;
                Ok(FetchResponse::new(200, format!("content from {url}")))
            }
            Behaviour::Status(status) => Ok(FetchResponse::new(status, "")),
            Behaviour::Refused => Err(GatewayError::Transport {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

fn client(config: ClientConfig, mock: &Arc<MockGateways>) -> GatewayClient<MockGateways> {
    GatewayClient::with_shared_fetcher(config, Arc::clone(mock)).unwrap()
}

fn default_mock() -> Arc<MockGateways> {
    MockGateways::with(&[
        ("dweb.link", Behaviour::Ok { latency_ms: 50 }),
        ("cf-ipfs.com", Behaviour::Ok { latency_ms: 200 }),
    ])
}

#[tokio::test(start_paused = true)]
async fn init_chooses_fastest_gateway() {
    let mock = default_mock();
    let client = client(ClientConfig::default(), &mock);
    assert_eq!(client.status(), ClientStatus::Uninitialized);

    client.init().await;

    assert_eq!(client.status(), ClientStatus::Ready);
    assert_eq!(client.chosen_gateway().unwrap().host, "dweb.link");

    let ranked = client.gateways().unwrap();
    let hosts: Vec<&str> = ranked.iter().map(|n| n.host.as_str()).collect();
    assert_eq!(hosts, ["dweb.link", "cf-ipfs.com"]);
    assert!(ranked[0].speed < ranked[1].speed);
    assert_eq!(client.healthy_gateway_count(), 2);
    assert_eq!(client.chosen_gateway().as_ref(), ranked.first());
}

#[tokio::test(start_paused = true)]
async fn slower_default_gateway_loses() {
    let mock = MockGateways::with(&[
        ("dweb.link", Behaviour::Ok { latency_ms: 400 }),
        ("cf-ipfs.com", Behaviour::Ok { latency_ms: 30 }),
    ]);
    let client = client(ClientConfig::default(), &mock);
    client.init().await;

    assert_eq!(client.chosen_gateway().unwrap().host, "cf-ipfs.com");
    assert_eq!(
        client.transform_address(CID).unwrap(),
        format!("https://{CID}.ipfs.cf-ipfs.com")
    );
}

#[tokio::test(start_paused = true)]
async fn all_probes_failing_falls_back_to_default() {
    let mock = MockGateways::with(&[("cf-ipfs.com", Behaviour::Status(503))]);
    let client = client(ClientConfig::default(), &mock);
    client.init().await;

    assert_eq!(client.chosen_gateway(), Some(default_gateway()));
    assert_eq!(client.gateways(), Some(vec![default_gateway()]));

    let err = client.read(CID).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport { .. }));
    assert_eq!(
        mock.requests().last().unwrap(),
        &format!("https://{CID}.ipfs.dweb.link")
    );
}

#[tokio::test(start_paused = true)]
async fn read_and_open_use_chosen_gateway() {
    let mock = default_mock();
    let client = client(ClientConfig::default(), &mock);
    client.init().await;

    let url = "https://dweb.link/ipns/docs.ipfs.tech/install";
    let bytes = client.read("ipns://docs.ipfs.tech/install/").await.unwrap();
    assert_eq!(bytes, format!("content from {url}").as_bytes());

    let response = client.open("docs.ipfs.tech/install").await.unwrap();
    assert_eq!(response.status, 200);

    let sought = client.seek("ipns://docs.ipfs.tech/install").await.unwrap();
    assert_eq!(sought, bytes);

    let requests = mock.requests();
    assert_eq!(&requests[requests.len() - 3..], [url, url, url]);
}

#[tokio::test(start_paused = true)]
async fn absolute_urls_bypass_gateway() {
    let mock = MockGateways::with(&[("example.com", Behaviour::Ok { latency_ms: 1 })]);
    let client = client(
        ClientConfig::new().with_gateways(vec![GatewayNode::remote("dweb.link")]),
        &mock,
    );
    client.init().await;

    client.read("https://example.com/file.txt").await.unwrap();
    assert_eq!(mock.requests(), ["https://example.com/file.txt"]);
}

#[tokio::test(start_paused = true)]
async fn error_status_surfaces_on_read_but_not_open() {
    let mock = MockGateways::with(&[("dweb.link", Behaviour::Status(404))]);
    let client = client(
        ClientConfig::new().with_gateways(vec![GatewayNode::remote("dweb.link")]),
        &mock,
    );
    client.init().await;

    let err = client.read(CID).await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Status {
            url: format!("https://{CID}.ipfs.dweb.link"),
            status: 404,
        }
    );

    let response = client.open(CID).await.unwrap();
    assert_eq!(response.status, 404);
    // no failover, no retry
    assert_eq!(mock.requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn invalid_address_is_not_fetched() {
    let mock = default_mock();
    let client = client(ClientConfig::default(), &mock);
    client.init().await;
    let before = mock.requests().len();

    let err = client.read("ipfs://").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::InvalidAddress {
            input: "ipfs://".to_string()
        }
    );
    assert_eq!(mock.requests().len(), before);
}

#[tokio::test(start_paused = true)]
async fn seeded_gateways_skip_discovery() {
    let mock = MockGateways::with(&[("127.0.0.1:8080", Behaviour::Ok { latency_ms: 1 })]);
    let local = GatewayNode::local("127.0.0.1:8080");
    let client = client(ClientConfig::new().with_gateways(vec![local.clone()]), &mock);

    client.init().await;
    assert!(mock.requests().is_empty());
    assert_eq!(client.chosen_gateway(), Some(local));

    client.read(CID).await.unwrap();
    assert_eq!(mock.requests(), [format!("http://127.0.0.1:8080/ipfs/{CID}")]);
}

#[tokio::test(start_paused = true)]
async fn seeded_chosen_gateway_wins() {
    let mock = default_mock();
    let pinned = GatewayNode::remote("cf-ipfs.com");
    let client = client(ClientConfig::new().with_chosen_gateway(pinned.clone()), &mock);

    client.init().await;
    assert_eq!(client.chosen_gateway(), Some(pinned.clone()));
    let hosts: Vec<String> = client.gateways().unwrap().into_iter().map(|n| n.host).collect();
    assert_eq!(hosts, ["cf-ipfs.com", "dweb.link"]);

    tokio::time::advance(Duration::from_secs(11)).await;
    client.refresh().await;
    assert_eq!(client.chosen_gateway(), Some(pinned.clone()));
    assert_eq!(client.gateways().unwrap()[0], pinned);
    assert_eq!(client.gateways().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn seeded_chosen_gateway_leads_seeded_list() {
    let mock = default_mock();
    let pinned = GatewayNode::local("127.0.0.1:8080");
    let client = client(
        ClientConfig::new()
            .with_gateways(vec![
                GatewayNode::remote("dweb.link"),
                GatewayNode::local("127.0.0.1:8080").with_speed(5),
            ])
            .with_chosen_gateway(pinned.clone()),
        &mock,
    );

    client.init().await;
    assert!(mock.requests().is_empty());
    assert_eq!(
        client.gateways(),
        Some(vec![pinned.clone(), GatewayNode::remote("dweb.link")])
    );
    assert_eq!(client.chosen_gateway(), Some(pinned));
}

#[tokio::test(start_paused = true)]
async fn read_before_init_uses_default_gateway() {
    let mock = default_mock();
    let client = client(ClientConfig::default(), &mock);

    client.read(CID).await.unwrap();
    assert_eq!(mock.requests(), [format!("https://{CID}.ipfs.dweb.link")]);
    assert_eq!(client.status(), ClientStatus::Uninitialized);
}

#[tokio::test(start_paused = true)]
async fn second_init_is_a_no_op() {
    let mock = default_mock();
    let client = client(ClientConfig::default(), &mock);

    client.init().await;
    let probes = mock.requests().len();
    client.init().await;
    assert_eq!(mock.requests().len(), probes);
}

#[tokio::test(start_paused = true)]
async fn refresh_reuses_probes_within_interval() {
    let mock = default_mock();
    let client = client(ClientConfig::default(), &mock);
    client.init().await;
    assert_eq!(mock.requests().len(), 2);

    mock.set("dweb.link", Behaviour::Ok { latency_ms: 300 });
    mock.set("cf-ipfs.com", Behaviour::Ok { latency_ms: 20 });

    client.refresh().await;
    assert_eq!(mock.requests().len(), 2);
    assert_eq!(client.chosen_gateway().unwrap().host, "dweb.link");

    tokio::time::advance(Duration::from_secs(11)).await;
    client.refresh().await;
    assert_eq!(mock.requests().len(), 4);
    assert_eq!(client.chosen_gateway().unwrap().host, "cf-ipfs.com");
}

#[tokio::test(start_paused = true)]
async fn clients_do_not_share_caches() {
    let mock = default_mock();
    let first = client(ClientConfig::default(), &mock);
    let second = client(ClientConfig::default(), &mock);

    first.init().await;
    second.init().await;
    assert_eq!(mock.requests().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn refresh_task_follows_latency_changes() {
    let mock = default_mock();
    let client = client(
        ClientConfig::new().with_gateway_check_interval(Duration::from_secs(10)),
        &mock,
    );
    client.init().await;
    client.start_refresh_task();

    mock.set("dweb.link", Behaviour::Ok { latency_ms: 300 });
    mock.set("cf-ipfs.com", Behaviour::Ok { latency_ms: 20 });

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(client.chosen_gateway().unwrap().host, "cf-ipfs.com");

    client.shutdown();
    let probes = mock.requests().len();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(mock.requests().len(), probes);
}

#[tokio::test(start_paused = true)]
async fn refresh_task_starts_once_and_restarts_after_shutdown() {
    let mock = default_mock();
    let client = client(
        ClientConfig::new()
            .with_gateway_check_interval(Duration::from_secs(10))
            .with_start_refresh_on_init(true),
        &mock,
    );

    client.init().await;
    client.init().await;
    client.start_refresh_task();
    assert!(client.is_refresh_running());

    // one task: a single round of probes per expired interval
    let before = mock.requests().len();
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(mock.requests().len(), before + 2);

    client.shutdown();
    assert!(!client.is_refresh_running());
    tokio::time::sleep(Duration::from_secs(30)).await;
    let stopped = mock.requests().len();

    client.start_refresh_task();
    assert!(client.is_refresh_running());
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(mock.requests().len(), stopped + 2);
    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn oversized_interval_is_rejected() {
    let mock = default_mock();
    let result = GatewayClient::with_shared_fetcher(
        ClientConfig::new().with_gateway_check_interval(Duration::MAX),
        mock,
    );
    assert!(matches!(result, Err(GatewayError::InvalidConfig(_))));
}

#[test]
fn invalid_config_is_rejected() {
    let mock = default_mock();
    let result =
        GatewayClient::with_shared_fetcher(ClientConfig::new().with_probe_concurrency(0), mock);
    assert!(matches!(result, Err(GatewayError::InvalidConfig(_))));
}
