//! Rendering backend probing
//!
//! Phase 0: tier presets and wgpu adapter probing
//! Phase 1: live GL extension queries for the D3D9/GL2.1 backends

use crate::{BackendTier, BackendType, DeviceCapabilities};

/// Probe rendering capabilities for a known backend tier
pub fn probe_capabilities(tier: BackendTier) -> DeviceCapabilities {
    let caps = tier.capabilities();
    tracing::debug!(?tier, ?caps, "probed backend tier");
    caps
}

/// Probe an initialized wgpu adapter
pub fn probe_adapter(adapter: &wgpu::Adapter) -> DeviceCapabilities {
    let info = adapter.get_info();
    let caps = capabilities_from_wgpu(info.backend, adapter.features(), &adapter.limits());
    tracing::debug!(adapter = %info.name, ?caps, "probed wgpu adapter");
    caps
}

/// Maps wgpu adapter properties onto the engine's capability set.
///
/// Batched multi-draw resolves each draw's uniform slot from the instance
/// index base, so it needs both indirect multi-draw and a non-zero
/// `first_instance` in indirect commands.
pub fn capabilities_from_wgpu(
    backend: wgpu::Backend,
    features: wgpu::Features,
    limits: &wgpu::Limits,
) -> DeviceCapabilities {
    let backend = match backend {
        wgpu::Backend::Vulkan => BackendType::Vulkan,
        wgpu::Backend::Metal => BackendType::Metal,
        wgpu::Backend::Dx12 => BackendType::DirectX12,
        wgpu::Backend::Gl if cfg!(target_arch = "wasm32") => BackendType::WebGL,
        wgpu::Backend::Gl => BackendType::OpenGLES,
        wgpu::Backend::BrowserWebGpu => BackendType::WebGpu,
        _ => BackendType::Software,
    };

    let multi_draw = features
        .contains(wgpu::Features::MULTI_DRAW_INDIRECT | wgpu::Features::INDIRECT_FIRST_INSTANCE);

    DeviceCapabilities {
        backend,
        uniform_buffers: limits.max_uniform_buffers_per_shader_stage > 0,
        multi_draw,
        // Every wgpu backend supports instance-rate vertex buffers and
        // R32Uint render targets.
        instancing: true,
        integer_framebuffer: true,
        min_uniform_offset_alignment: limits.min_uniform_buffer_offset_alignment,
        max_uniform_block_size: limits.max_uniform_buffer_binding_size,
        max_texture_size: limits.max_texture_dimension_2d,
    }
}
