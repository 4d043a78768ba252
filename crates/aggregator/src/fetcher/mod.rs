use crate::store::ClusterStore;
use crate::utils::loop_heartbeats::FetcherHeartbeats;
use chrono::Utc;
use log::{debug, error, info};
use reqwest::Client;
use shared::models::node::{NodeStatus, StatusRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("failed to initialize HTTP client: {0}")]
    Init(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected response status: {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid response payload: {0}")]
    Parse(String),
}

/// Polls one node's status endpoint and keeps that host's slot in the store
/// fresh. Each fetcher is fully independent; a slow or dead host only ever
/// stalls its own loop.
pub struct NodeFetcher {
    host: String,
    url: String,
    password: String,
    client: Client,
    fetch_interval: Duration,
    store: Arc<ClusterStore>,
    heartbeats: Arc<FetcherHeartbeats>,
}

impl NodeFetcher {
    pub fn new(
        host: String,
        node_port: u16,
        password: String,
        fetch_interval: Duration,
        store: Arc<ClusterStore>,
        heartbeats: Arc<FetcherHeartbeats>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Init(e.to_string()))?;
        let url = format!("http://{host}:{node_port}/get-status");

        Ok(Self {
            host,
            url,
            password,
            client,
            fetch_interval,
            store,
            heartbeats,
        })
    }

    async fn fetch(&self) -> Result<(), FetchError> {
        let request = StatusRequest {
            passwd: self.password.clone(),
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        let mut node = response
            .json::<NodeStatus>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        // Liveness is judged against the aggregator clock, so the receipt
        // time replaces whatever timestamp the node reported.
        node.last_update = Some(Utc::now());
        self.store.write_host(&self.host, node).await;
        Ok(())
    }

    /// Polls forever at `fetch_interval`. A failed poll leaves the host's
    /// previous entry untouched; the next successful one overwrites it.
    pub async fn run(&self, cancellation_token: CancellationToken) {
        let mut interval = interval(self.fetch_interval);
        let mut had_error = false;
        let mut first_start = true;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.fetch().await {
                        Ok(()) => {
                            if had_error {
                                info!("Connection to {} restored", self.host);
                                had_error = false;
                            } else if first_start {
                                info!("Connected to {}", self.host);
                                first_start = false;
                            } else {
                                debug!("Refreshed {}", self.host);
                            }
                        }
                        Err(e) => {
                            error!("Failed to fetch status from {}: {e}", self.host);
                            had_error = true;
                        }
                    }
                    self.heartbeats.update(&self.host);
                }
                _ = cancellation_token.cancelled() => {
                    info!("Fetcher for {} received cancellation signal", self.host);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use shared::models::cluster::ClusterStatus;
    use shared::models::node::GpuStatus;

    fn node_body() -> serde_json::Value {
        serde_json::json!({
            "hostname": "node1",
            "last_update": "2020-01-01T00:00:00Z",
            "ips": [["eth0", "10.0.0.1"]],
            "gpus": [{
                "index": 0,
                "name": "NVIDIA A100",
                "use_mem": 100,
                "tot_mem": 1000,
                "utilize": 5,
                "temp": 40,
                "users": []
            }]
        })
    }

    fn server_host_port(server: &mockito::ServerGuard) -> (String, u16) {
        let host_with_port = server.host_with_port();
        let (host, port) = host_with_port.split_once(':').unwrap();
        (host.to_string(), port.parse().unwrap())
    }

    fn fetcher_against(
        server: &mockito::ServerGuard,
        store: Arc<ClusterStore>,
        heartbeats: Arc<FetcherHeartbeats>,
    ) -> NodeFetcher {
        let (host, port) = server_host_port(server);
        NodeFetcher::new(
            host,
            port,
            "8888".to_string(),
            Duration::from_millis(50),
            store,
            heartbeats,
        )
        .unwrap()
    }

    async fn snapshot(store: &ClusterStore) -> ClusterStatus {
        store.snapshot(Utc::now(), ChronoDuration::seconds(60)).await
    }

    #[tokio::test]
    async fn test_successful_fetch_updates_store() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/get-status")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(node_body().to_string())
            .create_async()
            .await;

        let (host, _) = server_host_port(&server);
        let store = Arc::new(ClusterStore::new(vec![host.clone()]));
        let heartbeats = Arc::new(FetcherHeartbeats::new(&[host]));
        let fetcher = fetcher_against(&server, store.clone(), heartbeats);

        fetcher.fetch().await.unwrap();
        mock.assert_async().await;

        let snapshot = snapshot(&store).await;
        let report = &snapshot.nodes[0];
        assert!(report.status);
        assert_eq!(report.node.hostname, "node1");
        assert_eq!(report.node.gpus.len(), 1);
        assert_eq!(report.node.gpus[0].use_mem, 100);
        assert_eq!(report.version, ["NVIDIA A100"]);
    }

    #[tokio::test]
    async fn test_fetch_stamps_receipt_time_over_reported_timestamp() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/get-status")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(node_body().to_string())
            .create_async()
            .await;

        let (host, _) = server_host_port(&server);
        let store = Arc::new(ClusterStore::new(vec![host.clone()]));
        let heartbeats = Arc::new(FetcherHeartbeats::new(&[host]));
        let fetcher = fetcher_against(&server, store.clone(), heartbeats);

        fetcher.fetch().await.unwrap();

        // The wire payload says 2020; the stored entry must carry the time
        // the aggregator received it.
        let snapshot = snapshot(&store).await;
        let last_update = snapshot.nodes[0].node.last_update.unwrap();
        assert!(Utc::now() - last_update < ChronoDuration::seconds(5));
        assert!(snapshot.nodes[0].status);
    }

    #[tokio::test]
    async fn test_error_response_keeps_previous_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/get-status")
            .with_status(404)
            .with_body(r#"{"success": false, "error": "Resource not found"}"#)
            .create_async()
            .await;

        let (host, _) = server_host_port(&server);
        let store = Arc::new(ClusterStore::new(vec![host.clone()]));
        let seeded = NodeStatus {
            hostname: "node1".to_string(),
            last_update: Some(Utc::now()),
            ips: vec![],
            gpus: vec![GpuStatus {
                index: 0,
                name: "NVIDIA A100".to_string(),
                use_mem: 100,
                tot_mem: 1000,
                utilize: 5,
                temp: 40,
                users: vec![],
            }],
        };
        store.write_host(&host, seeded).await;
        let heartbeats = Arc::new(FetcherHeartbeats::new(&[host]));
        let fetcher = fetcher_against(&server, store.clone(), heartbeats);

        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Status(status) if status == 404));
        mock.assert_async().await;

        let snapshot = snapshot(&store).await;
        let report = &snapshot.nodes[0];
        assert_eq!(report.node.gpus.len(), 1);
        assert!(report.status);
    }

    #[tokio::test]
    async fn test_garbage_payload_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/get-status")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let (host, _) = server_host_port(&server);
        let store = Arc::new(ClusterStore::new(vec![host.clone()]));
        let heartbeats = Arc::new(FetcherHeartbeats::new(&[host]));
        let fetcher = fetcher_against(&server, store.clone(), heartbeats);

        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));

        let snapshot = snapshot(&store).await;
        assert!(snapshot.nodes[0].node.last_update.is_none());
        assert!(!snapshot.nodes[0].status);
    }

    #[tokio::test]
    async fn test_run_loop_polls_until_cancelled() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/get-status")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(node_body().to_string())
            .expect_at_least(2)
            .create_async()
            .await;

        let (host, _) = server_host_port(&server);
        let store = Arc::new(ClusterStore::new(vec![host.clone()]));
        let heartbeats = Arc::new(FetcherHeartbeats::new(&[host]));
        let fetcher = Arc::new(fetcher_against(&server, store.clone(), heartbeats.clone()));

        let token = CancellationToken::new();
        let run_token = token.clone();
        let run_fetcher = fetcher.clone();
        let handle = tokio::spawn(async move {
            run_fetcher.run(run_token).await;
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
        handle.await.unwrap();

        mock.assert_async().await;
        let snapshot = snapshot(&store).await;
        assert!(snapshot.nodes[0].status);
        assert!(heartbeats.health_status().healthy);
    }
}
