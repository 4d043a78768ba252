use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

// A fetcher that has not completed an iteration this recently is considered
// wedged and the aggregator reports unhealthy.
const STALE_AFTER_SECS: i64 = 120;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub fetchers_last_run_seconds_ago: BTreeMap<String, i64>,
}

/// Unix timestamps of the last completed iteration of each per-host fetcher,
/// -1 until a fetcher has run once. Serves `/health`.
pub struct FetcherHeartbeats {
    last_iterations: HashMap<String, AtomicI64>,
}

impl FetcherHeartbeats {
    pub fn new(hosts: &[String]) -> Self {
        let last_iterations = hosts
            .iter()
            .map(|host| (host.clone(), AtomicI64::new(-1)))
            .collect();
        Self { last_iterations }
    }

    pub fn update(&self, host: &str) {
        if let Some(last) = self.last_iterations.get(host) {
            last.store(Utc::now().timestamp(), Ordering::SeqCst);
        }
    }

    pub fn health_status(&self) -> HealthStatus {
        let now = Utc::now().timestamp();

        let mut healthy = true;
        let mut ages = BTreeMap::new();
        for (host, last) in &self.last_iterations {
            let last = last.load(Ordering::SeqCst);
            let seconds_ago = if last > 0 { now - last } else { -1 };
            if seconds_ago == -1 || seconds_ago >= STALE_AFTER_SECS {
                healthy = false;
            }
            ages.insert(host.clone(), seconds_ago);
        }

        HealthStatus {
            healthy,
            fetchers_last_run_seconds_ago: ages,
        }
    }
}
