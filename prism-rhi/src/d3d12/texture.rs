//! D3D12 textures, texture views and samplers.

use std::sync::{Arc, Mutex};

use gpu_allocator::d3d12::{Allocation, Allocator};
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::{
    Sampler, SamplerDescriptor, Texture, TextureDescriptor, TextureFormat, TextureView,
    TextureViewKind,
};

use super::descriptor::CpuDescriptor;

pub struct D3D12Texture {
    pub(crate) resource: ID3D12Resource,
    pub(crate) allocation: Mutex<Option<Allocation>>,
    pub(crate) allocator: Arc<Mutex<Allocator>>,
    pub(crate) desc: TextureDescriptor,
    pub(crate) raw_format: DXGI_FORMAT,
}

impl Drop for D3D12Texture {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.lock().ok().and_then(|mut a| a.take()) {
            if let Ok(mut allocator) = self.allocator.lock() {
                let _ = allocator.free(allocation);
            }
        }
    }
}

impl std::fmt::Debug for D3D12Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12Texture")
            .field("extent", &(self.desc.width, self.desc.height))
            .field("format", &self.desc.format)
            .finish_non_exhaustive()
    }
}

impl Texture for D3D12Texture {
    fn descriptor(&self) -> &TextureDescriptor {
        &self.desc
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A texture view owns one slot in the matching host-visible heap
/// category; the native descriptor was written into it at creation.
pub struct D3D12TextureView {
    pub(crate) kind: TextureViewKind,
    pub(crate) format: TextureFormat,
    pub(crate) raw_format: DXGI_FORMAT,
    pub(crate) slot: CpuDescriptor,
    pub(crate) extent: (u32, u32),
    /// Parent resource handle; the caller keeps the parent alive.
    #[allow(dead_code)]
    pub(crate) resource: ID3D12Resource,
}

impl std::fmt::Debug for D3D12TextureView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12TextureView")
            .field("kind", &self.kind)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl TextureView for D3D12TextureView {
    fn kind(&self) -> TextureViewKind {
        self.kind
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct D3D12Sampler {
    pub(crate) slot: CpuDescriptor,
    #[allow(dead_code)]
    pub(crate) desc: SamplerDescriptor,
}

impl std::fmt::Debug for D3D12Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12Sampler").finish_non_exhaustive()
    }
}

impl Sampler for D3D12Sampler {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
