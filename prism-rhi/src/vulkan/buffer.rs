//! Vulkan buffers and buffer views.

use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocation, Allocator};

use crate::{Buffer, BufferUse, BufferView, Error, MemoryKind, ResourceKind, Result};

pub struct VulkanBuffer {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) allocator: Arc<Mutex<Allocator>>,
    pub(crate) buffer: vk::Buffer,
    pub(crate) allocation: Option<Allocation>,
    pub(crate) size: u64,
    pub(crate) usage: BufferUse,
    pub(crate) memory: MemoryKind,
    pub(crate) device_address: Option<vk::DeviceAddress>,
}

impl VulkanBuffer {
    /// Device address for shaders, present when the device advertises
    /// buffer-device-address support.
    pub fn device_address(&self) -> Option<vk::DeviceAddress> {
        self.device_address
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
        }
        if let Some(allocation) = self.allocation.take() {
            if let Ok(mut a) = self.allocator.lock() {
                let _ = a.free(allocation);
            }
        }
    }
}

impl std::fmt::Debug for VulkanBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBuffer")
            .field("size", &self.size)
            .field("usage", &self.usage)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

impl Buffer for VulkanBuffer {
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
        // gpu-allocator keeps host-visible allocations persistently mapped.
        let base = self
            .allocation
            .as_ref()
            .and_then(|a| a.mapped_ptr())
            .ok_or_else(|| Error::invalid("allocation is not host mapped"))?;
        Ok(unsafe { base.as_ptr().cast::<u8>().add(offset as usize) })
    }

    fn unmap(&self) {
        // Persistent mapping; nothing to do.
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Buffer views carry the binding metadata the descriptor writes need; the
/// parent buffer stays alive through the caller's lifetime guarantee.
pub struct VulkanBufferView {
    pub(crate) buffer: vk::Buffer,
    pub(crate) kind: ResourceKind,
    pub(crate) offset: u64,
    pub(crate) size: u64,
    /// Element stride the view was derived with; structured views only.
    #[allow(dead_code)]
    pub(crate) stride: u32,
}

impl std::fmt::Debug for VulkanBufferView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBufferView")
            .field("kind", &self.kind)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl BufferView for VulkanBufferView {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
