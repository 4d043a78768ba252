use serde::{Deserialize, Serialize};

use crate::models::node::NodeStatus;

/// One aggregator snapshot entry: a host's last known record plus the
/// liveness flag derived from it and the distinct GPU models for display.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HostReport {
    #[serde(flatten)]
    pub node: NodeStatus,
    pub status: bool,
    pub version: Vec<String>,
}

/// The cluster-wide snapshot served to the dashboard. Hosts appear in
/// configuration order, one entry per configured host, reachable or not.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ClusterStatus {
    #[serde(rename = "Nodes")]
    pub nodes: Vec<HostReport>,
}
