//! Explicit GPU context shared by all engine components.
//!
//! The context is an owned object passed into every component
//! operation; no process-wide graphics state exists, and all transient
//! binds live inside scoped render passes.

use crate::error::{RenderError, RenderResult};

/// Optional capabilities probed from the adapter at device creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpuCaps {
    /// 16-bit normalized texture formats were granted
    /// (`TEXTURE_FORMAT_16BIT_NORM`).
    pub unorm16_storage: bool,
    /// 32-bit float textures are filterable (`FLOAT32_FILTERABLE`);
    /// lets float volumes keep extended-range precision.
    pub float32_filterable: bool,
}

/// The GPU context: instance, adapter, device, queue, and the granted
/// optional capabilities.
pub struct GpuContext {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The wgpu adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
    /// Granted optional capabilities.
    pub caps: GpuCaps,
}

impl GpuContext {
    /// Creates a headless GPU context.
    ///
    /// Requests the 16-bit-norm and float32-filterable features only
    /// when the adapter advertises them; the upload format mapping
    /// consults [`GpuCaps`] for the fallbacks.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let optional = wgpu::Features::TEXTURE_FORMAT_16BIT_NORM | wgpu::Features::FLOAT32_FILTERABLE;
        let required_features = adapter.features() & optional;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("volcast device (headless)"),
                required_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let caps = GpuCaps {
            unorm16_storage: required_features.contains(wgpu::Features::TEXTURE_FORMAT_16BIT_NORM),
            float32_filterable: required_features.contains(wgpu::Features::FLOAT32_FILTERABLE),
        };
        log::debug!(
            "volcast GPU context: {:?}, unorm16={}, float32_filterable={}",
            adapter.get_info().backend,
            caps.unorm16_storage,
            caps.float32_filterable
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            caps,
        })
    }

    /// Runs `f` inside a validation error scope in debug builds and
    /// asserts that no GPU error surfaced. Release builds run `f`
    /// directly — driver errors are treated as programming-invariant
    /// violations, not runtime conditions.
    pub fn debug_scope<R>(&self, label: &str, f: impl FnOnce() -> R) -> R {
        if cfg!(debug_assertions) {
            self.device.push_error_scope(wgpu::ErrorFilter::Validation);
            let out = f();
            if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
                log::error!("GPU validation error in {label}: {err}");
                debug_assert!(false, "GPU validation error in {label}");
            }
            out
        } else {
            f()
        }
    }
}
