// Luna Miner - Free and Open Source Software Statement
//
// File: src/miner/gpu/opencl/device.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// OpenCL device discovery for the GPU search path

use anyhow::{Error, Result};
use log::{debug, error, info, warn};
use opencl3::{
    device::{CL_DEVICE_TYPE_GPU, Device},
    platform::get_platforms,
};

const LOG_TARGET: &str = "luna::miner::gpu::device";

/// Minimum global memory for a usable device
const MIN_GLOBAL_MEM: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuDeviceType {
    Integrated,
    Dedicated,
}

#[derive(Debug, Clone)]
pub struct OpenClDevice {
    pub name: String,
    pub platform_name: String,
    pub max_work_group_size: usize,
    pub max_compute_units: u32,
    pub global_mem_size: u64,
    pub device_type: GpuDeviceType,
    pub device: Device,
}

impl OpenClDevice {
    fn new(device: Device, platform_name: String) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());
        let max_work_group_size = device.max_work_group_size().unwrap_or(256);
        let max_compute_units = device.max_compute_units().unwrap_or(1);
        let global_mem_size = device.global_mem_size().unwrap_or(0);

        // Unified host memory is the reliable signal for an iGPU
        let device_type = match device.host_unified_memory() {
            Ok(true) => GpuDeviceType::Integrated,
            _ => GpuDeviceType::Dedicated,
        };

        debug!(target: LOG_TARGET,
            "Created OpenCL device: {} (CU: {}, WG: {}, {:?})",
            name, max_compute_units, max_work_group_size, device_type
        );

        Self {
            name,
            platform_name,
            max_work_group_size,
            max_compute_units,
            global_mem_size,
            device_type,
            device,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Detect all OpenCL GPU devices across platforms
    pub fn detect_devices() -> Result<Vec<OpenClDevice>> {
        let platforms = get_platforms().map_err(|e| {
            error!(target: LOG_TARGET, "Failed to get OpenCL platforms: {}", e);
            Error::msg(format!("OpenCL platform detection failed: {}", e))
        })?;

        if platforms.is_empty() {
            warn!(target: LOG_TARGET, "No OpenCL platforms found");
            return Ok(Vec::new());
        }

        let mut all_devices = Vec::new();
        for platform in platforms {
            let platform_name = platform.name().unwrap_or_else(|_| "Unknown Platform".to_string());
            match platform.get_devices(CL_DEVICE_TYPE_GPU) {
                Ok(devices) => {
                    for device_id in devices {
                        let device = OpenClDevice::new(Device::new(device_id), platform_name.clone());
                        info!(target: LOG_TARGET, "Detected OpenCL device: {}", device.info_string());
                        all_devices.push(device);
                    }
                }
                Err(e) => {
                    debug!(target: LOG_TARGET, "No GPU devices on platform {}: {}", platform_name, e);
                }
            }
        }

        Ok(all_devices)
    }

    pub fn info_string(&self) -> String {
        format!(
            "{} on {} (CU: {}, WG: {}, MEM: {:.1} GB, {:?})",
            self.name,
            self.platform_name,
            self.max_compute_units,
            self.max_work_group_size,
            self.global_mem_size as f64 / (1024.0 * 1024.0 * 1024.0),
            self.device_type
        )
    }

    pub fn is_suitable_for_mining(&self) -> bool {
        self.max_compute_units >= 1 && self.max_work_group_size >= 64 && self.global_mem_size >= MIN_GLOBAL_MEM
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Trimmed to discovery for the SHA-256 search path.
//   - Device type now comes from host unified memory only.
//   - Lowered the memory floor; the search kernel keeps no large buffers.
// - v1.0.1: Added integrated/dedicated classification.
