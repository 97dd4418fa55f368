//! D3D12 buffers and buffer views.

use std::sync::{Arc, Mutex};

use gpu_allocator::d3d12::{Allocation, Allocator};
use windows::Win32::Graphics::Direct3D12::*;

use crate::{Buffer, BufferUse, BufferView, Error, MemoryKind, ResourceKind, Result};

pub struct D3D12Buffer {
    pub(crate) resource: ID3D12Resource,
    pub(crate) allocation: Mutex<Option<Allocation>>,
    pub(crate) allocator: Arc<Mutex<Allocator>>,
    pub(crate) size: u64,
    pub(crate) usage: BufferUse,
    pub(crate) memory: MemoryKind,
    pub(crate) gpu_address: u64,
}

impl Drop for D3D12Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.lock().ok().and_then(|mut a| a.take()) {
            if let Ok(mut allocator) = self.allocator.lock() {
                let _ = allocator.free(allocation);
            }
        }
    }
}

impl std::fmt::Debug for D3D12Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12Buffer")
            .field("size", &self.size)
            .field("usage", &self.usage)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

impl Buffer for D3D12Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUse {
        self.usage
    }

    fn memory_kind(&self) -> MemoryKind {
        self.memory
    }

    fn map(&self, offset: u64, size: u64) -> Result<*mut u8> {
        if self.memory == MemoryKind::Device {
            return Err(Error::invalid("cannot map device-local buffer"));
        }
        if !self
            .usage
            .intersects(BufferUse::MAP_READ | BufferUse::MAP_WRITE)
        {
            return Err(Error::invalid(
                "buffer was created without MapRead/MapWrite usage",
            ));
        }
        if offset + size > self.size {
            return Err(Error::invalid(format!(
                "map range {}..{} exceeds buffer size {}",
                offset,
                offset + size,
                self.size
            )));
        }
        let mut ptr = std::ptr::null_mut();
        unsafe {
            self.resource
                .Map(0, None, Some(&mut ptr))
                .map_err(|e| Error::backend("ID3D12Resource::Map", e))?;
        }
        Ok(unsafe { ptr.cast::<u8>().add(offset as usize) })
    }

    fn unmap(&self) {
        unsafe {
            self.resource.Unmap(0, None);
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A buffer view owns one host-visible descriptor slot (except plain root
/// bindings, which only need the GPU virtual address).
pub struct D3D12BufferView {
    pub(crate) kind: ResourceKind,
    pub(crate) gpu_address: u64,
    pub(crate) offset: u64,
    pub(crate) size: u64,
    /// Element stride the view was derived with; structured views only.
    #[allow(dead_code)]
    pub(crate) stride: u32,
    pub(crate) slot: super::descriptor::CpuDescriptor,
}

impl std::fmt::Debug for D3D12BufferView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12BufferView")
            .field("kind", &self.kind)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl BufferView for D3D12BufferView {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
