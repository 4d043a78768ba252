use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One process holding memory on a GPU, as published by a node agent.
///
/// Entries are only published once the owning username has been resolved;
/// a pid that exits between enumeration and lookup is dropped, not reported.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GpuProcess {
    pub pid: u32,
    pub username: String,
    #[serde(rename = "mem(MiB)")]
    pub mem_mib: u64,
    pub command: String,
}

/// Status of one GPU. `index` is the device's enumeration index and is
/// stable within a node; memory figures are MiB.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GpuStatus {
    pub index: u32,
    pub name: String,
    pub use_mem: u64,
    pub tot_mem: u64,
    pub utilize: u32,
    pub temp: u32,
    pub users: Vec<GpuProcess>,
}

/// The merged per-node record served by an agent's status endpoint and
/// stored per host by the aggregator.
///
/// `last_update` is the time of the most recent successful refresh on the
/// agent side, and the time of the most recent successful fetch once the
/// record sits in the aggregator. `None` means never populated.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct NodeStatus {
    pub hostname: String,
    pub last_update: Option<DateTime<Utc>>,
    pub ips: Vec<(String, String)>,
    pub gpus: Vec<GpuStatus>,
}

/// Body of the agent status request. The secret is checked before any
/// status data is returned.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusRequest {
    pub passwd: String,
}
