//! GPU device initialization for offscreen rendering.
//!
//! Provides [`GpuContext`] which owns the wgpu instance, adapter, device and
//! queue, and [`GpuContextError`] for clear diagnostics when initialization
//! fails.

/// Error type for GPU context initialization failures.
#[derive(Debug, thiserror::Error)]
pub enum GpuContextError {
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device.
    #[error("failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// Owns the wgpu instance, adapter, device and queue.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Initialize the GPU asynchronously without a presentation surface.
    pub async fn new_headless() -> Result<Self, GpuContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Ok(adapter) => adapter,
            Err(_) => return Err(GpuContextError::NoAdapter),
        };

        let info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("orrery-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}

/// Initialize the GPU synchronously using `pollster`.
pub fn init_gpu_context_blocking() -> Result<GpuContext, GpuContextError> {
    pollster::block_on(GpuContext::new_headless())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_requests_default_limits() {
        let Ok(ctx) = init_gpu_context_blocking() else {
            return;
        };
        let defaults = wgpu::Limits::default();
        let limits = ctx.device.limits();

        assert!(limits.max_buffer_size >= defaults.max_buffer_size);
        assert!(limits.max_vertex_buffers >= defaults.max_vertex_buffers);
        assert!(ctx.adapter.features().contains(ctx.device.features()));
    }

    #[test]
    fn test_no_adapter_message() {
        assert_eq!(
            GpuContextError::NoAdapter.to_string(),
            "no compatible GPU adapter found"
        );
    }
}
