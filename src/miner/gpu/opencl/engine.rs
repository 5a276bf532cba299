// Luna Miner - Free and Open Source Software Statement
//
// File: src/miner/gpu/opencl/engine.rs
// Version: 3.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// OpenCL engine running the Luna SHA-256 nonce search kernel

use super::device::OpenClDevice;
use crate::core::difficulty::U256;
use anyhow::{Error, Result};
use log::{debug, error, info};
use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    kernel::{ExecuteKernel, Kernel},
    memory::{Buffer, CL_MEM_COPY_HOST_PTR, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE},
    program::Program,
    types::{CL_TRUE, cl_uchar, cl_uint},
};
use std::time::Instant;

const LOG_TARGET: &str = "luna::miner::gpu::engine";

const KERNEL_SOURCE: &str = include_str!("../../../../kernels/opencl/luna_sha256.cl");
const KERNEL_NAME: &str = "luna_search";

/// Work groups queued per compute unit
const WORK_GROUPS_PER_CU: usize = 8;

pub struct OpenClEngine {
    device: OpenClDevice,
    context: Context,
    program: Option<Program>,
    kernel: Option<Kernel>,
    queue: Option<CommandQueue>,
}

impl OpenClEngine {
    pub fn new(device: OpenClDevice) -> Result<Self> {
        debug!(target: LOG_TARGET, "Creating OpenCL engine for device: {}", device.name());
        let context = Context::from_device(&device.device)
            .map_err(|e| Error::msg(format!("Failed to create context: {}", e)))?;
        Ok(Self {
            device,
            context,
            program: None,
            kernel: None,
            queue: None,
        })
    }

    /// Compile the kernel and create the command queue
    pub fn initialize(&mut self) -> Result<()> {
        let mut program = Program::create_from_source(&self.context, KERNEL_SOURCE)
            .map_err(|e| Error::msg(format!("Failed to create program: {}", e)))?;

        if let Err(e) = program.build(self.context.devices(), "") {
            error!(target: LOG_TARGET, "Failed to build OpenCL program: {}", e);
            for device_id in self.context.devices() {
                if let Ok(log) = program.get_build_log(*device_id) {
                    error!(target: LOG_TARGET, "Build log for device {:?}: {}", device_id, log);
                }
            }
            return Err(Error::msg(format!("Program build failed: {}", e)));
        }

        let kernel = Kernel::create(&program, KERNEL_NAME)
            .map_err(|e| Error::msg(format!("Failed to create kernel: {}", e)))?;
        let queue = CommandQueue::create_default(&self.context, 0)
            .map_err(|e| Error::msg(format!("Failed to create command queue: {}", e)))?;

        self.program = Some(program);
        self.kernel = Some(kernel);
        self.queue = Some(queue);

        info!(target: LOG_TARGET,
            "✅ OpenCL engine initialized for {} (CU: {}, WG: {})",
            self.device.name(),
            self.device.max_compute_units,
            self.device.max_work_group_size
        );
        Ok(())
    }

    pub fn device(&self) -> &OpenClDevice {
        &self.device
    }

    fn global_work_size(&self) -> usize {
        let local_size = (self.device.max_work_group_size / 4).clamp(64, 256);
        self.device.max_compute_units as usize * WORK_GROUPS_PER_CU * local_size
    }

    /// Search `count` nonces from `nonce_start`; returns the first winning nonce
    pub fn search(&self, prefix: &[u8], nonce_start: u64, count: u32, target: &U256) -> Result<Option<u64>> {
        let (Some(kernel), Some(queue)) = (self.kernel.as_ref(), self.queue.as_ref()) else {
            return Err(Error::msg("Engine not initialized"));
        };
        if count == 0 {
            return Ok(None);
        }

        let mut target_bytes = [0u8; 32];
        target.to_big_endian(&mut target_bytes);
        let mut target_words: Vec<cl_uint> = target_bytes
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let mut prefix_bytes: Vec<cl_uchar> = prefix.to_vec();
        let mut output: Vec<cl_uint> = vec![0; 3];

        let global_size = self.global_work_size().min(count as usize).max(1);
        let per_item = count.div_ceil(global_size as u32);
        let prefix_len = prefix_bytes.len() as cl_uint;
        let start_time = Instant::now();

        let prefix_buffer = unsafe {
            Buffer::<cl_uchar>::create(
                &self.context,
                CL_MEM_READ_ONLY | CL_MEM_COPY_HOST_PTR,
                prefix_bytes.len(),
                prefix_bytes.as_mut_ptr() as *mut std::ffi::c_void,
            )
            .map_err(|e| Error::msg(format!("Failed to create prefix buffer: {}", e)))?
        };
        let target_buffer = unsafe {
            Buffer::<cl_uint>::create(
                &self.context,
                CL_MEM_READ_ONLY | CL_MEM_COPY_HOST_PTR,
                target_words.len(),
                target_words.as_mut_ptr() as *mut std::ffi::c_void,
            )
            .map_err(|e| Error::msg(format!("Failed to create target buffer: {}", e)))?
        };
        let output_buffer = unsafe {
            Buffer::<cl_uint>::create(
                &self.context,
                CL_MEM_READ_WRITE | CL_MEM_COPY_HOST_PTR,
                output.len(),
                output.as_mut_ptr() as *mut std::ffi::c_void,
            )
            .map_err(|e| Error::msg(format!("Failed to create output buffer: {}", e)))?
        };

        unsafe {
            ExecuteKernel::new(kernel)
                .set_arg(&prefix_buffer)
                .set_arg(&prefix_len)
                .set_arg(&nonce_start)
                .set_arg(&count)
                .set_arg(&per_item)
                .set_arg(&target_buffer)
                .set_arg(&output_buffer)
                .set_global_work_size(global_size)
                .enqueue_nd_range(queue)
                .map_err(|e| Error::msg(format!("Failed to execute kernel: {}", e)))?;
        }

        queue
            .finish()
            .map_err(|e| Error::msg(format!("Failed to finish queue: {}", e)))?;

        unsafe {
            queue
                .enqueue_read_buffer(&output_buffer, CL_TRUE, 0, &mut output, &[])
                .map_err(|e| Error::msg(format!("Failed to read output buffer: {}", e)))?;
        }

        let elapsed = start_time.elapsed();
        debug!(target: LOG_TARGET,
            "GPU batch of {} nonces in {:.2}ms ({:.2} MH/s)",
            count,
            elapsed.as_secs_f64() * 1000.0,
            count as f64 / elapsed.as_secs_f64().max(1e-9) / 1_000_000.0
        );

        if output[0] == 0 {
            return Ok(None);
        }
        Ok(Some(output[1] as u64 | ((output[2] as u64) << 32)))
    }
}

// Changelog:
// - v3.0.0 (2025-07-02): Replaced the SHA3x kernel and autotuner with the Luna SHA-256 search.
//   - The kernel takes the raw preimage prefix and a 256-bit target instead of a u64 difficulty.
//   - Context creation errors propagate instead of panicking.
//   - Batch sizing comes from the engine configuration; autotuning was removed.
// - v2.2.0: Sequential parameter autotuning.
