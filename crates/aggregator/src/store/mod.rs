use chrono::{DateTime, Duration, Utc};
use shared::models::cluster::{ClusterStatus, HostReport};
use shared::models::node::NodeStatus;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Owns the per-host state map. Fetchers write whole entries through
/// [`ClusterStore::write_host`]; readers get detached point-in-time copies
/// through [`ClusterStore::snapshot`]. The map itself is never handed out.
pub struct ClusterStore {
    hosts: Vec<String>,
    nodes: RwLock<HashMap<String, NodeStatus>>,
}

impl ClusterStore {
    /// Seeds one placeholder entry per configured host so the snapshot
    /// covers the full fleet before any fetch has succeeded.
    pub fn new(hosts: Vec<String>) -> Self {
        let nodes = hosts
            .iter()
            .map(|host| {
                let placeholder = NodeStatus {
                    hostname: host.clone(),
                    ..Default::default()
                };
                (host.clone(), placeholder)
            })
            .collect();
        Self {
            hosts,
            nodes: RwLock::new(nodes),
        }
    }

    /// Replaces a host's entry in one write. Partial updates are not
    /// supported; a reader either sees the previous entry or the new one.
    pub async fn write_host(&self, hostname: &str, status: NodeStatus) {
        let mut nodes = self.nodes.write().await;
        nodes.insert(hostname.to_string(), status);
    }

    /// Assembles the cluster view in configuration order. A host is reported
    /// alive iff its last successful fetch is younger than `expire_timeout`;
    /// entries past the window keep their last-known data with
    /// `status: false`.
    pub async fn snapshot(&self, now: DateTime<Utc>, expire_timeout: Duration) -> ClusterStatus {
        let nodes = self.nodes.read().await;
        let reports = self
            .hosts
            .iter()
            .map(|host| {
                let node = nodes.get(host).cloned().unwrap_or_else(|| NodeStatus {
                    hostname: host.clone(),
                    ..Default::default()
                });
                let status = node
                    .last_update
                    .is_some_and(|last| now - last < expire_timeout);
                let version = distinct_device_names(&node);
                HostReport {
                    node,
                    status,
                    version,
                }
            })
            .collect();
        ClusterStatus { nodes: reports }
    }
}

fn distinct_device_names(node: &NodeStatus) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for gpu in &node.gpus {
        if !names.contains(&gpu.name) {
            names.push(gpu.name.clone());
        }
    }
    names
}
