//! Device-memory façade over the `gpu-allocator` D3D12 block allocator.

use std::sync::{Arc, Mutex};

use gpu_allocator::d3d12::{Allocation, AllocationCreateDesc, Allocator};
use windows::Win32::Graphics::Direct3D12::*;

use crate::{Error, MemoryKind, ResourceHint, Result};

use super::conv;

pub(crate) struct DeviceAllocator {
    device: ID3D12Device,
    inner: Arc<Mutex<Allocator>>,
}

fn set_debug_name(resource: &ID3D12Resource, name: &str) {
    if name.is_empty() {
        return;
    }
    let wide = windows::core::HSTRING::from(name);
    if let Err(e) = unsafe { resource.SetName(&wide) } {
        log::debug!("ID3D12Object::SetName failed: {e}");
    }
}

impl DeviceAllocator {
    pub(crate) fn new(device: ID3D12Device, inner: Arc<Mutex<Allocator>>) -> Self {
        Self { device, inner }
    }

    /// Places the resource inside an allocator-managed heap. `Dedicated`
    /// resources and CPU-writable UAV buffers take the committed path
    /// instead, because a placed resource cannot use a custom heap.
    pub(crate) fn create_resource(
        &self,
        desc: &D3D12_RESOURCE_DESC,
        memory: MemoryKind,
        hints: ResourceHint,
        initial_state: D3D12_RESOURCE_STATES,
        name: &str,
    ) -> Result<(ID3D12Resource, Option<Allocation>)> {
        let cpu_writable_uav = memory != MemoryKind::Device
            && (desc.Flags & D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS)
                != D3D12_RESOURCE_FLAG_NONE;
        if cpu_writable_uav {
            let resource = self.create_committed_custom(desc, initial_state)?;
            set_debug_name(&resource, name);
            return Ok((resource, None));
        }
        if hints.contains(ResourceHint::DEDICATED) {
            let resource = self.create_committed(desc, memory, initial_state)?;
            set_debug_name(&resource, name);
            return Ok((resource, None));
        }
        let location = match memory {
            MemoryKind::Device => gpu_allocator::MemoryLocation::GpuOnly,
            MemoryKind::Upload => gpu_allocator::MemoryLocation::CpuToGpu,
            MemoryKind::Readback => gpu_allocator::MemoryLocation::GpuToCpu,
        };
        let allocation = {
            let mut inner = self.inner.lock().expect("allocator poisoned");
            let create_desc = AllocationCreateDesc::from_d3d12_resource_desc(
                &self.device,
                desc,
                name,
                location,
            );
            inner
                .allocate(&create_desc)
                .map_err(|e| Error::out_of_memory(format!("resource allocation: {e}")))?
        };
        let mut resource: Option<ID3D12Resource> = None;
        let result = unsafe {
            self.device.CreatePlacedResource(
                allocation.heap(),
                allocation.offset(),
                desc,
                initial_state,
                None,
                &mut resource,
            )
        };
        match (result, resource) {
            (Ok(()), Some(resource)) => {
                set_debug_name(&resource, name);
                Ok((resource, Some(allocation)))
            }
            (r, _) => {
                self.destroy(allocation);
                Err(Error::backend(
                    "ID3D12Device::CreatePlacedResource",
                    r.err().map(|e| e.to_string()).unwrap_or_default(),
                ))
            }
        }
    }

    fn create_committed(
        &self,
        desc: &D3D12_RESOURCE_DESC,
        memory: MemoryKind,
        initial_state: D3D12_RESOURCE_STATES,
    ) -> Result<ID3D12Resource> {
        let heap_props = D3D12_HEAP_PROPERTIES {
            Type: conv::heap_type(memory),
            ..Default::default()
        };
        let mut resource: Option<ID3D12Resource> = None;
        unsafe {
            self.device
                .CreateCommittedResource(
                    &heap_props,
                    D3D12_HEAP_FLAG_NONE,
                    desc,
                    initial_state,
                    None,
                    &mut resource,
                )
                .map_err(|e| Error::backend("ID3D12Device::CreateCommittedResource", e))?;
        }
        resource.ok_or_else(|| {
            Error::backend("ID3D12Device::CreateCommittedResource", "null resource")
        })
    }

    /// CPU-writable UAV buffers need the Custom/WRITE_COMBINE heap; the
    /// block allocator cannot satisfy that request.
    fn create_committed_custom(
        &self,
        desc: &D3D12_RESOURCE_DESC,
        initial_state: D3D12_RESOURCE_STATES,
    ) -> Result<ID3D12Resource> {
        let heap_props = D3D12_HEAP_PROPERTIES {
            Type: D3D12_HEAP_TYPE_CUSTOM,
            CPUPageProperty: D3D12_CPU_PAGE_PROPERTY_WRITE_COMBINE,
            MemoryPoolPreference: D3D12_MEMORY_POOL_L0,
            CreationNodeMask: 0,
            VisibleNodeMask: 0,
        };
        // GENERIC_READ is an upload-heap state; custom heaps start common.
        let initial_state = if initial_state == D3D12_RESOURCE_STATE_GENERIC_READ {
            D3D12_RESOURCE_STATE_COMMON
        } else {
            initial_state
        };
        let mut resource: Option<ID3D12Resource> = None;
        unsafe {
            self.device
                .CreateCommittedResource(
                    &heap_props,
                    D3D12_HEAP_FLAG_NONE,
                    desc,
                    initial_state,
                    None,
                    &mut resource,
                )
                .map_err(|e| Error::backend("ID3D12Device::CreateCommittedResource", e))?;
        }
        resource.ok_or_else(|| {
            Error::backend("ID3D12Device::CreateCommittedResource", "null resource")
        })
    }

    pub(crate) fn destroy(&self, allocation: Allocation) {
        let mut inner = self.inner.lock().expect("allocator poisoned");
        if let Err(e) = inner.free(allocation) {
            log::warn!("gpu-allocator free failed: {e}");
        }
    }
}

impl std::fmt::Debug for DeviceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAllocator").finish_non_exhaustive()
    }
}
