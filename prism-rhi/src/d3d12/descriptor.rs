//! Descriptor heaps and their suballocators.
//!
//! Host-visible descriptors live in per-category heap sequences grown on
//! demand (block + buddy); shader-visible descriptors live in one bounded
//! heap per category managed by a free list. Descriptors only reach the
//! shader-visible heaps through `CopyDescriptorsSimple`.

use std::sync::{Arc, Mutex};

use windows::Win32::Graphics::Direct3D12::*;

use crate::suballoc::{BlockSuballocator, FreeListAllocator, HeapSlice};
use crate::{Error, Result};

pub(crate) struct DescriptorHeap {
    pub(crate) heap: ID3D12DescriptorHeap,
    pub(crate) len: u32,
    pub(crate) increment: u32,
    cpu_start: D3D12_CPU_DESCRIPTOR_HANDLE,
    gpu_start: D3D12_GPU_DESCRIPTOR_HANDLE,
}

impl DescriptorHeap {
    pub(crate) fn new(
        device: &ID3D12Device,
        ty: D3D12_DESCRIPTOR_HEAP_TYPE,
        len: u32,
        shader_visible: bool,
    ) -> Result<Self> {
        let desc = D3D12_DESCRIPTOR_HEAP_DESC {
            Type: ty,
            NumDescriptors: len,
            Flags: if shader_visible {
                D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE
            } else {
                D3D12_DESCRIPTOR_HEAP_FLAG_NONE
            },
            NodeMask: 0,
        };
        let heap: ID3D12DescriptorHeap = unsafe {
            device
                .CreateDescriptorHeap(&desc)
                .map_err(|e| Error::backend("ID3D12Device::CreateDescriptorHeap", e))?
        };
        let increment = unsafe { device.GetDescriptorHandleIncrementSize(ty) };
        let cpu_start = unsafe { heap.GetCPUDescriptorHandleForHeapStart() };
        let gpu_start = if shader_visible {
            unsafe { heap.GetGPUDescriptorHandleForHeapStart() }
        } else {
            D3D12_GPU_DESCRIPTOR_HANDLE::default()
        };
        log::debug!(
            "created descriptor heap type={ty:?} visible={shader_visible} increment={increment} length={len}"
        );
        Ok(Self {
            heap,
            len,
            increment,
            cpu_start,
            gpu_start,
        })
    }

    pub(crate) fn cpu_handle(&self, index: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        debug_assert!(index < self.len);
        D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: self.cpu_start.ptr + (index as usize) * (self.increment as usize),
        }
    }

    pub(crate) fn gpu_handle(&self, index: u32) -> D3D12_GPU_DESCRIPTOR_HANDLE {
        debug_assert!(index < self.len);
        D3D12_GPU_DESCRIPTOR_HANDLE {
            ptr: self.gpu_start.ptr + (index as u64) * (self.increment as u64),
        }
    }
}

/// Host-visible allocator for one descriptor category. Heaps are created
/// through the block suballocator's factory callback as demand grows.
pub(crate) struct CpuDescriptorAllocator {
    device: ID3D12Device,
    ty: D3D12_DESCRIPTOR_HEAP_TYPE,
    inner: Mutex<BlockSuballocator<DescriptorHeap>>,
}

impl CpuDescriptorAllocator {
    pub(crate) fn new(device: ID3D12Device, ty: D3D12_DESCRIPTOR_HEAP_TYPE, initial_len: u32) -> Self {
        Self {
            device,
            ty,
            inner: Mutex::new(BlockSuballocator::new(initial_len)),
        }
    }

    pub(crate) fn allocate(self: &Arc<Self>, count: u32) -> Result<CpuDescriptor> {
        let mut inner = self.inner.lock().expect("allocator poisoned");
        let device = self.device.clone();
        let ty = self.ty;
        let slice = inner
            .allocate(count, |len| DescriptorHeap::new(&device, ty, len, false))?
            .ok_or_else(|| Error::out_of_memory("CPU descriptor allocator"))?;
        let handle = inner.heap(slice.heap_index).cpu_handle(slice.start);
        Ok(CpuDescriptor {
            allocator: Arc::clone(self),
            slice,
            handle,
        })
    }

    fn free(&self, slice: HeapSlice) {
        self.inner.lock().expect("allocator poisoned").free(slice);
    }
}

/// RAII slot(s) in a host-visible heap; freeing returns the range to the
/// same buddy it came from.
pub(crate) struct CpuDescriptor {
    allocator: Arc<CpuDescriptorAllocator>,
    slice: HeapSlice,
    handle: D3D12_CPU_DESCRIPTOR_HANDLE,
}

impl CpuDescriptor {
    pub(crate) fn handle(&self) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        self.handle
    }
}

impl Drop for CpuDescriptor {
    fn drop(&mut self) {
        self.allocator.free(self.slice);
    }
}

impl std::fmt::Debug for CpuDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuDescriptor")
            .field("start", &self.slice.start)
            .field("count", &self.slice.count)
            .finish_non_exhaustive()
    }
}

/// One bounded shader-visible heap. Bounded on purpose: command lists bind
/// the same two heaps once per `begin`, so the heap can never be swapped.
pub(crate) struct GpuDescriptorAllocator {
    heap: DescriptorHeap,
    free: Mutex<FreeListAllocator>,
}

impl GpuDescriptorAllocator {
    pub(crate) fn new(
        device: &ID3D12Device,
        ty: D3D12_DESCRIPTOR_HEAP_TYPE,
        len: u32,
    ) -> Result<Self> {
        Ok(Self {
            heap: DescriptorHeap::new(device, ty, len, true)?,
            free: Mutex::new(FreeListAllocator::new(len)),
        })
    }

    pub(crate) fn allocate(self: &Arc<Self>, count: u32) -> Result<GpuDescriptorRange> {
        let start = self
            .free
            .lock()
            .expect("allocator poisoned")
            .allocate(count)
            .ok_or_else(|| Error::out_of_memory("shader-visible descriptor heap"))?;
        Ok(GpuDescriptorRange {
            allocator: Arc::clone(self),
            start,
            count,
        })
    }

    pub(crate) fn raw_heap(&self) -> &ID3D12DescriptorHeap {
        &self.heap.heap
    }

    pub(crate) fn cpu_handle(&self, index: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        self.heap.cpu_handle(index)
    }

    pub(crate) fn gpu_handle(&self, index: u32) -> D3D12_GPU_DESCRIPTOR_HANDLE {
        self.heap.gpu_handle(index)
    }

    fn free(&self, start: u32, count: u32) {
        self.free
            .lock()
            .expect("allocator poisoned")
            .free(start, count);
    }
}

/// RAII range inside the shader-visible heap.
pub(crate) struct GpuDescriptorRange {
    allocator: Arc<GpuDescriptorAllocator>,
    pub(crate) start: u32,
    pub(crate) count: u32,
}

impl GpuDescriptorRange {
    pub(crate) fn gpu_handle_at(&self, offset: u32) -> D3D12_GPU_DESCRIPTOR_HANDLE {
        debug_assert!(offset < self.count);
        self.allocator.gpu_handle(self.start + offset)
    }

    pub(crate) fn cpu_handle(&self, offset: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        debug_assert!(offset < self.count);
        self.allocator.cpu_handle(self.start + offset)
    }
}

impl Drop for GpuDescriptorRange {
    fn drop(&mut self) {
        self.allocator.free(self.start, self.count);
    }
}

impl std::fmt::Debug for GpuDescriptorRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuDescriptorRange")
            .field("start", &self.start)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

/// The one sanctioned path from host-visible slots into the shader-visible
/// heap.
pub(crate) fn copy_descriptor(
    device: &ID3D12Device,
    ty: D3D12_DESCRIPTOR_HEAP_TYPE,
    dst: D3D12_CPU_DESCRIPTOR_HANDLE,
    src: D3D12_CPU_DESCRIPTOR_HANDLE,
) {
    unsafe {
        device.CopyDescriptorsSimple(1, dst, src, ty);
    }
}
