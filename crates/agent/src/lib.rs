mod api;
mod collector;
mod processes;
mod telemetry;
mod utils;

pub use api::server::start_server;
pub use collector::NodeCollector;
pub use processes::{ProcessResolver, ResolvedProcess, SystemProcessResolver};
pub use telemetry::nvml::NvmlProvider;
pub use telemetry::{DeviceSample, ProcessSample, TelemetryError, TelemetryProvider};
pub use utils::loop_heartbeats::{HealthStatus, LoopHeartbeats};
