use chrono::Utc;
use log::{debug, error, info};
use shared::models::node::{GpuProcess, GpuStatus, NodeStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::processes::ProcessResolver;
use crate::telemetry::{TelemetryError, TelemetryProvider, BYTES_TO_MB};
use crate::utils::loop_heartbeats::LoopHeartbeats;

mod host_info;

#[derive(Default)]
struct DeviceState {
    status: NodeStatus,
    serial_to_index: HashMap<String, u32>,
}

/// Continuously refreshed status record for the local node.
///
/// Two loops own the two halves of the state: the device loop rewrites the
/// whole `NodeStatus` (plus the serial map the attribution join needs), the
/// attribution loop rewrites the whole device-to-users map. `status()` joins
/// them at read time so the published record never mixes a device list with
/// attribution baked in at a different moment.
pub struct NodeCollector {
    provider: Arc<dyn TelemetryProvider>,
    resolver: Arc<dyn ProcessResolver>,
    device_interval: Duration,
    attribution_interval: Duration,
    heartbeats: Arc<LoopHeartbeats>,
    devices: RwLock<DeviceState>,
    attribution: RwLock<HashMap<u32, Vec<GpuProcess>>>,
}

impl NodeCollector {
    pub fn new(
        provider: Arc<dyn TelemetryProvider>,
        resolver: Arc<dyn ProcessResolver>,
        device_interval: Duration,
        attribution_interval: Duration,
        heartbeats: Arc<LoopHeartbeats>,
    ) -> Self {
        Self {
            provider,
            resolver,
            device_interval,
            attribution_interval,
            heartbeats,
            devices: RwLock::new(DeviceState::default()),
            attribution: RwLock::new(HashMap::new()),
        }
    }

    /// Deep copy of the merged record: the latest device list with each
    /// device's users looked up in the latest attribution map. Devices
    /// without a current attribution entry report no users.
    pub async fn status(&self) -> NodeStatus {
        let mut status = self.devices.read().await.status.clone();
        let attribution = self.attribution.read().await;
        for gpu in &mut status.gpus {
            gpu.users = attribution.get(&gpu.index).cloned().unwrap_or_default();
        }
        status
    }

    /// One device pass then one attribution pass, bypassing the loops.
    pub async fn sample_once(&self) -> Result<NodeStatus, TelemetryError> {
        self.refresh_devices().await?;
        self.refresh_attribution().await?;
        Ok(self.status().await)
    }

    async fn refresh_devices(&self) -> Result<(), TelemetryError> {
        let samples = self.provider.sample_devices()?;
        let ips = host_info::interface_addresses()
            .map_err(|e| TelemetryError::DeviceQuery(e.to_string()))?;

        let mut serial_to_index = HashMap::with_capacity(samples.len());
        let mut gpus = Vec::with_capacity(samples.len());
        for sample in samples {
            serial_to_index.insert(sample.serial, sample.index);
            gpus.push(GpuStatus {
                index: sample.index,
                name: sample.name,
                use_mem: sample.memory_used / BYTES_TO_MB,
                tot_mem: sample.memory_total / BYTES_TO_MB,
                utilize: sample.utilization,
                temp: sample.temperature,
                users: vec![],
            });
        }

        let status = NodeStatus {
            hostname: host_info::hostname(),
            last_update: Some(Utc::now()),
            ips,
            gpus,
        };

        let mut devices = self.devices.write().await;
        *devices = DeviceState {
            status,
            serial_to_index,
        };
        Ok(())
    }

    async fn refresh_attribution(&self) -> Result<(), TelemetryError> {
        let rows = self.provider.sample_processes()?;
        let serial_to_index = self.devices.read().await.serial_to_index.clone();

        let mut by_device: HashMap<u32, Vec<GpuProcess>> = HashMap::new();
        for row in rows {
            let Some(&index) = serial_to_index.get(&row.serial) else {
                continue;
            };
            // the pid exited before we could look it up; skip the entry
            let Some(resolved) = self.resolver.resolve(row.pid) else {
                continue;
            };
            by_device.entry(index).or_default().push(GpuProcess {
                pid: row.pid,
                username: resolved.username,
                mem_mib: row.memory_bytes / BYTES_TO_MB,
                command: resolved.command,
            });
        }

        *self.attribution.write().await = by_device;
        Ok(())
    }

    pub async fn run_device_loop(&self, cancellation_token: CancellationToken) {
        let mut interval = interval(self.device_interval);
        let mut had_error = false;
        let mut first_start = true;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.refresh_devices().await {
                        Ok(()) => {
                            if had_error {
                                info!("Device telemetry restored");
                                had_error = false;
                            } else if first_start {
                                info!("Device telemetry online");
                                first_start = false;
                            } else {
                                debug!("Refreshed device telemetry");
                            }
                        }
                        Err(e) => {
                            error!("Failed to refresh device telemetry: {e}");
                            had_error = true;
                        }
                    }
                    self.heartbeats.update_device();
                }
                _ = cancellation_token.cancelled() => {
                    info!("Device refresh loop received cancellation signal");
                    break;
                }
            }
        }
    }

    pub async fn run_attribution_loop(&self, cancellation_token: CancellationToken) {
        let mut interval = interval(self.attribution_interval);
        let mut had_error = false;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.refresh_attribution().await {
                        Ok(()) => {
                            if had_error {
                                info!("Process attribution restored");
                                had_error = false;
                            } else {
                                debug!("Refreshed process attribution");
                            }
                        }
                        Err(e) => {
                            error!("Failed to refresh process attribution: {e}");
                            had_error = true;
                        }
                    }
                    self.heartbeats.update_attribution();
                }
                _ = cancellation_token.cancelled() => {
                    info!("Attribution refresh loop received cancellation signal");
                    break;
                }
            }
        }
    }
}
