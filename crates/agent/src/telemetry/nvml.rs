use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::enums::device::UsedGpuMemory;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::Nvml;

use super::{DeviceSample, ProcessSample, TelemetryError, TelemetryProvider};

/// NVML-backed telemetry source. The library handle is initialized once
/// and reused for every sample.
pub struct NvmlProvider {
    nvml: Nvml,
}

impl NvmlProvider {
    pub fn new() -> Result<Self, TelemetryError> {
        // The plain loader misses the versioned library on some distros
        let nvml = Nvml::init()
            .or_else(|_| {
                Nvml::builder()
                    .lib_path(std::ffi::OsStr::new(
                        "/usr/lib/x86_64-linux-gnu/libnvidia-ml.so.1",
                    ))
                    .init()
            })
            .map_err(|e| TelemetryError::Init(e.to_string()))?;
        Ok(Self { nvml })
    }
}

fn device_error(e: NvmlError) -> TelemetryError {
    TelemetryError::DeviceQuery(e.to_string())
}

fn process_error(e: NvmlError) -> TelemetryError {
    TelemetryError::ProcessQuery(e.to_string())
}

impl TelemetryProvider for NvmlProvider {
    fn sample_devices(&self) -> Result<Vec<DeviceSample>, TelemetryError> {
        let count = self.nvml.device_count().map_err(device_error)?;
        let mut samples = Vec::with_capacity(count as usize);

        for index in 0..count {
            let device = self.nvml.device_by_index(index).map_err(device_error)?;
            let memory = device.memory_info().map_err(device_error)?;
            let utilization = device.utilization_rates().map_err(device_error)?;
            let temperature = device
                .temperature(TemperatureSensor::Gpu)
                .map_err(device_error)?;

            samples.push(DeviceSample {
                index,
                serial: device.serial().map_err(device_error)?,
                name: device.name().map_err(device_error)?,
                memory_used: memory.used,
                memory_total: memory.total,
                utilization: utilization.gpu,
                temperature,
            });
        }

        Ok(samples)
    }

    fn sample_processes(&self) -> Result<Vec<ProcessSample>, TelemetryError> {
        let count = self.nvml.device_count().map_err(process_error)?;
        let mut rows = Vec::new();

        for index in 0..count {
            let device = self.nvml.device_by_index(index).map_err(process_error)?;
            let serial = device.serial().map_err(process_error)?;

            for process in device.running_compute_processes().map_err(process_error)? {
                let memory_bytes = match process.used_gpu_memory {
                    UsedGpuMemory::Used(bytes) => bytes,
                    UsedGpuMemory::Unavailable => 0,
                };
                rows.push(ProcessSample {
                    serial: serial.clone(),
                    pid: process.pid,
                    memory_bytes,
                });
            }
        }

        Ok(rows)
    }
}
