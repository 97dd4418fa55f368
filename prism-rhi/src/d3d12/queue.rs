//! Queue submission and sync primitives for the D3D12 backend.
//!
//! D3D12 fences are timeline values, so every sync primitive here wraps an
//! `ID3D12Fence`; legacy semaphores keep a pending-signal flag to mirror
//! the binary semantics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use windows::core::Interface;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::System::Threading::{CreateEventA, WaitForSingleObject, INFINITE};

use crate::{
    CommandQueueSubmitDescriptor, Error, Fence, FenceStatus, Queue, QueueType, Result, Semaphore,
    TimelineSemaphore,
};

use super::command::D3D12CommandBuffer;

pub(crate) struct Win32Event(pub HANDLE);

impl Win32Event {
    pub(crate) fn new() -> Result<Self> {
        let event = unsafe {
            CreateEventA(None, false, false, None)
                .map_err(|e| Error::backend("CreateEventA", e))?
        };
        Ok(Self(event))
    }
}

impl Drop for Win32Event {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

// HANDLE is thread-affine only by convention; event handles are safe to
// signal and wait from any thread.
unsafe impl Send for Win32Event {}
unsafe impl Sync for Win32Event {}

fn wait_fence_value(fence: &ID3D12Fence, value: u64, event: &Win32Event) -> Result<()> {
    if unsafe { fence.GetCompletedValue() } >= value {
        return Ok(());
    }
    unsafe {
        fence
            .SetEventOnCompletion(value, event.0)
            .map_err(|e| Error::backend("ID3D12Fence::SetEventOnCompletion", e))?;
        WaitForSingleObject(event.0, INFINITE);
    }
    Ok(())
}

pub struct D3D12Queue {
    pub(crate) queue: ID3D12CommandQueue,
    pub(crate) ty: QueueType,
    /// Monotonic fence advanced and signalled on every submit.
    track_fence: ID3D12Fence,
    track_value: AtomicU64,
    wait_event: Win32Event,
}

impl D3D12Queue {
    pub(crate) fn new(device: &ID3D12Device, ty: QueueType) -> Result<Self> {
        let desc = D3D12_COMMAND_QUEUE_DESC {
            Type: super::conv::command_list_type(ty),
            Priority: D3D12_COMMAND_QUEUE_PRIORITY_NORMAL.0,
            Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
            NodeMask: 0,
        };
        let queue: ID3D12CommandQueue = unsafe {
            device
                .CreateCommandQueue(&desc)
                .map_err(|e| Error::backend("ID3D12Device::CreateCommandQueue", e))?
        };
        let track_fence: ID3D12Fence = unsafe {
            device
                .CreateFence(0, D3D12_FENCE_FLAG_NONE)
                .map_err(|e| Error::backend("ID3D12Device::CreateFence", e))?
        };
        Ok(Self {
            queue,
            ty,
            track_fence,
            track_value: AtomicU64::new(0),
            wait_event: Win32Event::new()?,
        })
    }
}

// D3D12 queues and fences are free-threaded.
unsafe impl Send for D3D12Queue {}
unsafe impl Sync for D3D12Queue {}

impl std::fmt::Debug for D3D12Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12Queue")
            .field("type", &self.ty)
            .finish_non_exhaustive()
    }
}

impl Queue for D3D12Queue {
    fn queue_type(&self) -> QueueType {
        self.ty
    }

    fn submit(&self, desc: &CommandQueueSubmitDescriptor<'_>) -> Result<()> {
        // Waits must be queued before the lists execute.
        for s in desc.wait_semaphores {
            let Some(sem) = s.as_any().downcast_ref::<D3D12Semaphore>() else {
                return Err(Error::invalid("wait semaphore is not a D3D12 semaphore"));
            };
            if sem.signaled.swap(false, Ordering::AcqRel) {
                unsafe {
                    self.queue
                        .Wait(&sem.fence, sem.value.load(Ordering::Acquire))
                        .map_err(|e| Error::backend("ID3D12CommandQueue::Wait", e))?;
                }
            }
        }

        let mut lists = Vec::with_capacity(desc.command_buffers.len());
        for cb in desc.command_buffers {
            let concrete = cb
                .as_any()
                .downcast_ref::<D3D12CommandBuffer>()
                .ok_or_else(|| Error::invalid("command buffer is not a D3D12 buffer"))?;
            let list: ID3D12CommandList = concrete
                .list
                .cast()
                .map_err(|e| Error::backend("IUnknown::QueryInterface", e))?;
            lists.push(Some(list));
        }
        if !lists.is_empty() {
            unsafe {
                self.queue.ExecuteCommandLists(&lists);
            }
        }

        for s in desc.signal_semaphores {
            let Some(sem) = s.as_any().downcast_ref::<D3D12Semaphore>() else {
                return Err(Error::invalid("signal semaphore is not a D3D12 semaphore"));
            };
            if !sem.signaled.swap(true, Ordering::AcqRel) {
                let value = sem.value.fetch_add(1, Ordering::AcqRel) + 1;
                unsafe {
                    self.queue
                        .Signal(&sem.fence, value)
                        .map_err(|e| Error::backend("ID3D12CommandQueue::Signal", e))?;
                }
            }
        }
        if let Some(f) = desc.signal_fence {
            let Some(fence) = f.as_any().downcast_ref::<D3D12Fence>() else {
                return Err(Error::invalid("signal fence is not a D3D12 fence"));
            };
            let value = fence.value.fetch_add(1, Ordering::AcqRel) + 1;
            unsafe {
                self.queue
                    .Signal(&fence.fence, value)
                    .map_err(|e| Error::backend("ID3D12CommandQueue::Signal", e))?;
            }
            fence.submitted.store(true, Ordering::Release);
        }

        // The internal fence advances on every submit.
        let value = self.track_value.fetch_add(1, Ordering::AcqRel) + 1;
        unsafe {
            self.queue
                .Signal(&self.track_fence, value)
                .map_err(|e| Error::backend("ID3D12CommandQueue::Signal", e))?;
        }
        Ok(())
    }

    fn wait(&self) -> Result<()> {
        let value = self.track_value.fetch_add(1, Ordering::AcqRel) + 1;
        unsafe {
            self.queue
                .Signal(&self.track_fence, value)
                .map_err(|e| Error::backend("ID3D12CommandQueue::Signal", e))?;
        }
        wait_fence_value(&self.track_fence, value, &self.wait_event)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct D3D12Fence {
    pub(crate) fence: ID3D12Fence,
    pub(crate) value: AtomicU64,
    pub(crate) submitted: AtomicBool,
    event: Win32Event,
}

impl D3D12Fence {
    pub(crate) fn new(device: &ID3D12Device) -> Result<Self> {
        let fence: ID3D12Fence = unsafe {
            device
                .CreateFence(0, D3D12_FENCE_FLAG_NONE)
                .map_err(|e| Error::backend("ID3D12Device::CreateFence", e))?
        };
        Ok(Self {
            fence,
            value: AtomicU64::new(0),
            submitted: AtomicBool::new(false),
            event: Win32Event::new()?,
        })
    }
}

unsafe impl Send for D3D12Fence {}
unsafe impl Sync for D3D12Fence {}

impl std::fmt::Debug for D3D12Fence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12Fence")
            .field("submitted", &self.submitted.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Fence for D3D12Fence {
    fn wait(&self) -> Result<()> {
        if !self.submitted.load(Ordering::Acquire) {
            return Ok(());
        }
        wait_fence_value(&self.fence, self.value.load(Ordering::Acquire), &self.event)?;
        self.submitted.store(false, Ordering::Release);
        Ok(())
    }

    fn status(&self) -> FenceStatus {
        if !self.submitted.load(Ordering::Acquire) {
            return FenceStatus::NotSubmitted;
        }
        let completed = unsafe { self.fence.GetCompletedValue() };
        if completed >= self.value.load(Ordering::Acquire) {
            FenceStatus::Complete
        } else {
            FenceStatus::Incomplete
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct D3D12Semaphore {
    pub(crate) fence: ID3D12Fence,
    pub(crate) value: AtomicU64,
    pub(crate) signaled: AtomicBool,
}

impl D3D12Semaphore {
    pub(crate) fn new(device: &ID3D12Device) -> Result<Self> {
        let fence: ID3D12Fence = unsafe {
            device
                .CreateFence(0, D3D12_FENCE_FLAG_NONE)
                .map_err(|e| Error::backend("ID3D12Device::CreateFence", e))?
        };
        Ok(Self {
            fence,
            value: AtomicU64::new(0),
            signaled: AtomicBool::new(false),
        })
    }
}

unsafe impl Send for D3D12Semaphore {}
unsafe impl Sync for D3D12Semaphore {}

impl std::fmt::Debug for D3D12Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12Semaphore")
            .field("signaled", &self.signaled.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Semaphore for D3D12Semaphore {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct D3D12TimelineSemaphore {
    pub(crate) fence: ID3D12Fence,
    event: Win32Event,
}

impl D3D12TimelineSemaphore {
    pub(crate) fn new(device: &ID3D12Device, initial_value: u64) -> Result<Self> {
        let fence: ID3D12Fence = unsafe {
            device
                .CreateFence(initial_value, D3D12_FENCE_FLAG_NONE)
                .map_err(|e| Error::backend("ID3D12Device::CreateFence", e))?
        };
        Ok(Self {
            fence,
            event: Win32Event::new()?,
        })
    }
}

unsafe impl Send for D3D12TimelineSemaphore {}
unsafe impl Sync for D3D12TimelineSemaphore {}

impl std::fmt::Debug for D3D12TimelineSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12TimelineSemaphore").finish_non_exhaustive()
    }
}

impl TimelineSemaphore for D3D12TimelineSemaphore {
    fn completed_value(&self) -> Result<u64> {
        Ok(unsafe { self.fence.GetCompletedValue() })
    }

    fn wait(&self, value: u64) -> Result<()> {
        wait_fence_value(&self.fence, value, &self.event)
    }

    fn signal(&self, value: u64) -> Result<()> {
        unsafe {
            self.fence
                .Signal(value)
                .map_err(|e| Error::backend("ID3D12Fence::Signal", e))
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
