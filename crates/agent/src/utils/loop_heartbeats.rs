use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};

// A loop that has not completed an iteration this recently is considered
// wedged and the agent reports unhealthy.
const STALE_AFTER_SECS: i64 = 120;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub device_last_run_seconds_ago: i64,
    pub attribution_last_run_seconds_ago: i64,
}

/// Unix timestamps of the last completed iteration of each refresh loop,
/// -1 until a loop has run once. Serves `/health`.
pub struct LoopHeartbeats {
    last_device_iteration: AtomicI64,
    last_attribution_iteration: AtomicI64,
}

impl LoopHeartbeats {
    pub fn new() -> Self {
        Self {
            last_device_iteration: AtomicI64::new(-1),
            last_attribution_iteration: AtomicI64::new(-1),
        }
    }

    pub fn update_device(&self) {
        self.last_device_iteration
            .store(Utc::now().timestamp(), Ordering::SeqCst);
    }

    pub fn update_attribution(&self) {
        self.last_attribution_iteration
            .store(Utc::now().timestamp(), Ordering::SeqCst);
    }

    pub fn health_status(&self) -> HealthStatus {
        let now = Utc::now().timestamp();

        let device_last = self.last_device_iteration.load(Ordering::SeqCst);
        let attribution_last = self.last_attribution_iteration.load(Ordering::SeqCst);

        let device_seconds_ago = if device_last > 0 { now - device_last } else { -1 };
        let attribution_seconds_ago = if attribution_last > 0 {
            now - attribution_last
        } else {
            -1
        };

        let healthy = device_seconds_ago != -1
            && device_seconds_ago < STALE_AFTER_SECS
            && attribution_seconds_ago != -1
            && attribution_seconds_ago < STALE_AFTER_SECS;

        HealthStatus {
            healthy,
            device_last_run_seconds_ago: device_seconds_ago,
            attribution_last_run_seconds_ago: attribution_seconds_ago,
        }
    }
}

impl Default for LoopHeartbeats {
    fn default() -> Self {
        Self::new()
    }
}
