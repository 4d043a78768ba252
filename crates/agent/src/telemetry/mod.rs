pub(crate) mod nvml;

pub(crate) const BYTES_TO_MB: u64 = 1024 * 1024;

/// Raw reading for one GPU. Memory figures are bytes; the collector
/// converts to MiB when it builds the published record.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSample {
    pub index: u32,
    pub serial: String,
    pub name: String,
    pub memory_used: u64,
    pub memory_total: u64,
    pub utilization: u32,
    pub temperature: u32,
}

/// One device-to-process memory row, keyed by device serial so it can be
/// joined against whatever device list is current at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub serial: String,
    pub pid: u32,
    pub memory_bytes: u64,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry initialization failed: {0}")]
    Init(String),
    #[error("device query failed: {0}")]
    DeviceQuery(String),
    #[error("process query failed: {0}")]
    ProcessQuery(String),
}

/// Source of device counters and device-to-process usage rows for the
/// local node. Calls are blocking and may fail; the refresh loops treat a
/// failure as "keep the previous value".
pub trait TelemetryProvider: Send + Sync {
    fn sample_devices(&self) -> Result<Vec<DeviceSample>, TelemetryError>;

    fn sample_processes(&self) -> Result<Vec<ProcessSample>, TelemetryError>;
}
