//! Device-memory façade over the `gpu-allocator` block allocator.
//!
//! Resource modules never talk to the allocator directly; they go through
//! [`DeviceAllocator`] and get back `(native handle, allocation)` pairs.
//! The allocation is the opaque token handed back on destruction.

use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator,
};

use crate::{Error, MemoryKind, ResourceHint, Result};

use super::conv;

pub struct DeviceAllocator {
    device: Arc<ash::Device>,
    inner: Arc<Mutex<Allocator>>,
}

impl DeviceAllocator {
    pub fn new(device: Arc<ash::Device>, allocator: Arc<Mutex<Allocator>>) -> Self {
        Self {
            device,
            inner: allocator,
        }
    }

    /// Creates the native buffer and binds freshly allocated memory to it.
    /// On failure nothing is left behind.
    pub fn create_buffer(
        &self,
        info: &vk::BufferCreateInfo<'_>,
        memory: MemoryKind,
        hints: ResourceHint,
        name: &str,
    ) -> Result<(vk::Buffer, Allocation)> {
        let buffer = unsafe {
            self.device
                .create_buffer(info, None)
                .map_err(|e| Error::backend("vkCreateBuffer", e))?
        };
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };
        let scheme = if hints.contains(ResourceHint::DEDICATED) {
            AllocationScheme::DedicatedBuffer(buffer)
        } else {
            AllocationScheme::GpuAllocatorManaged
        };
        let allocation = {
            let mut inner = self.inner.lock().expect("allocator poisoned");
            match inner.allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: conv::memory_location(memory),
                linear: true,
                allocation_scheme: scheme,
            }) {
                Ok(a) => a,
                Err(e) => {
                    unsafe { self.device.destroy_buffer(buffer, None) };
                    return Err(Error::out_of_memory(format!("buffer allocation: {e}")));
                }
            }
        };
        if let Err(e) = unsafe {
            self.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        } {
            self.destroy(allocation);
            unsafe { self.device.destroy_buffer(buffer, None) };
            return Err(Error::backend("vkBindBufferMemory", e));
        }
        Ok((buffer, allocation))
    }

    pub fn create_image(
        &self,
        info: &vk::ImageCreateInfo<'_>,
        hints: ResourceHint,
        name: &str,
    ) -> Result<(vk::Image, Allocation)> {
        let image = unsafe {
            self.device
                .create_image(info, None)
                .map_err(|e| Error::backend("vkCreateImage", e))?
        };
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let scheme = if hints.contains(ResourceHint::DEDICATED) {
            AllocationScheme::DedicatedImage(image)
        } else {
            AllocationScheme::GpuAllocatorManaged
        };
        let allocation = {
            let mut inner = self.inner.lock().expect("allocator poisoned");
            match inner.allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: gpu_allocator::MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: scheme,
            }) {
                Ok(a) => a,
                Err(e) => {
                    unsafe { self.device.destroy_image(image, None) };
                    return Err(Error::out_of_memory(format!("image allocation: {e}")));
                }
            }
        };
        if let Err(e) = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        } {
            self.destroy(allocation);
            unsafe { self.device.destroy_image(image, None) };
            return Err(Error::backend("vkBindImageMemory", e));
        }
        Ok((image, allocation))
    }

    pub fn destroy(&self, allocation: Allocation) {
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
