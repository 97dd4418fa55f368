//! Queue submission and sync primitives.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ash::vk;

use crate::{
    CommandQueueSubmitDescriptor, Error, Fence, FenceStatus, Queue, QueueType, Result, Semaphore,
    TimelineSemaphore,
};

use super::command::VulkanCommandBuffer;

pub struct VulkanQueue {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) queue: vk::Queue,
    pub(crate) ty: QueueType,
    pub(crate) family: u32,
    /// Internal timeline signalled once per submit; serializes submissions
    /// for anyone observing the counter. None when the device lacks
    /// timeline semaphores.
    pub(crate) track_semaphore: Option<vk::Semaphore>,
    pub(crate) track_value: AtomicU64,
    /// vkQueueSubmit requires external synchronization on the queue.
    submit_lock: Mutex<()>,
}

impl VulkanQueue {
    pub(crate) fn new(
        device: Arc<ash::Device>,
        queue: vk::Queue,
        ty: QueueType,
        family: u32,
        track_semaphore: Option<vk::Semaphore>,
    ) -> Self {
        Self {
            device,
            queue,
            ty,
            family,
            track_semaphore,
            track_value: AtomicU64::new(0),
            submit_lock: Mutex::new(()),
        }
    }

    pub(crate) fn destroy(&self) {
        if let Some(s) = self.track_semaphore {
            unsafe {
                self.device.destroy_semaphore(s, None);
            }
        }
    }
}

impl std::fmt::Debug for VulkanQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanQueue")
            .field("type", &self.ty)
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

impl Queue for VulkanQueue {
    fn queue_type(&self) -> QueueType {
        self.ty
    }

    fn submit(&self, desc: &CommandQueueSubmitDescriptor<'_>) -> Result<()> {
        let mut cmd_buffers = Vec::with_capacity(desc.command_buffers.len());
        for cb in desc.command_buffers {
            let concrete = cb
                .as_any()
                .downcast_ref::<VulkanCommandBuffer>()
                .ok_or_else(|| Error::invalid("command buffer is not a Vulkan buffer"))?;
            cmd_buffers.push(concrete.cmd);
        }

        // Legacy binary semaphores carry a signaled flag so a wait is only
        // recorded against a pending signal, and double signals are dropped.
        let mut wait_semaphores = Vec::with_capacity(desc.wait_semaphores.len());
        for s in desc.wait_semaphores {
            let Some(sem) = s.as_any().downcast_ref::<VulkanSemaphore>() else {
                return Err(Error::invalid("wait semaphore is not a Vulkan semaphore"));
            };
            if sem.signaled.swap(false, Ordering::AcqRel) {
                wait_semaphores.push(sem.semaphore);
            }
        }
        let mut signal_semaphores = Vec::with_capacity(desc.signal_semaphores.len() + 1);
        let mut signal_values = Vec::with_capacity(desc.signal_semaphores.len() + 1);
        for s in desc.signal_semaphores {
            let Some(sem) = s.as_any().downcast_ref::<VulkanSemaphore>() else {
                return Err(Error::invalid("signal semaphore is not a Vulkan semaphore"));
            };
            if !sem.signaled.swap(true, Ordering::AcqRel) {
                signal_semaphores.push(sem.semaphore);
                signal_values.push(0);
            }
        }

        let wait_stages = vec![vk::PipelineStageFlags::ALL_COMMANDS; wait_semaphores.len()];
        let wait_values = vec![0u64; wait_semaphores.len()];

        // Advance the internal fence on every submit.
        if let Some(track) = self.track_semaphore {
            let value = self.track_value.fetch_add(1, Ordering::AcqRel) + 1;
            signal_semaphores.push(track);
            signal_values.push(value);
        }

        let fence = match desc.signal_fence {
            Some(f) => {
                let Some(fence) = f.as_any().downcast_ref::<VulkanFence>() else {
                    return Err(Error::invalid("signal fence is not a Vulkan fence"));
                };
                fence.submitted.store(true, Ordering::Release);
                fence.fence
            }
            None => vk::Fence::null(),
        };

        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default()
            .wait_semaphore_values(&wait_values)
            .signal_semaphore_values(&signal_values);
        let mut submit_info = vk::SubmitInfo::default()
            .command_buffers(&cmd_buffers)
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .signal_semaphores(&signal_semaphores);
        if self.track_semaphore.is_some() {
            submit_info = submit_info.push_next(&mut timeline_info);
        }

        let _guard = self.submit_lock.lock().expect("queue lock poisoned");
        unsafe {
            self.device
                .queue_submit(self.queue, &[submit_info], fence)
                .map_err(|e| Error::backend("vkQueueSubmit", e))?;
        }
        Ok(())
    }

    fn wait(&self) -> Result<()> {
        let _guard = self.submit_lock.lock().expect("queue lock poisoned");
        unsafe {
            self.device
                .queue_wait_idle(self.queue)
                .map_err(|e| Error::backend("vkQueueWaitIdle", e))
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct VulkanFence {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) fence: vk::Fence,
    /// Set on submit, cleared when waited upon; avoids waiting on a fence
    /// that was never handed to the GPU.
    pub(crate) submitted: AtomicBool,
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

impl std::fmt::Debug for VulkanFence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanFence")
            .field("submitted", &self.submitted.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Fence for VulkanFence {
    fn wait(&self) -> Result<()> {
        if !self.submitted.load(Ordering::Acquire) {
            return Ok(());
        }
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, u64::MAX)
                .map_err(|e| Error::backend("vkWaitForFences", e))?;
            self.device
                .reset_fences(&[self.fence])
                .map_err(|e| Error::backend("vkResetFences", e))?;
        }
        self.submitted.store(false, Ordering::Release);
        Ok(())
    }

    fn status(&self) -> FenceStatus {
        if !self.submitted.load(Ordering::Acquire) {
            return FenceStatus::NotSubmitted;
        }
        match unsafe { self.device.get_fence_status(self.fence) } {
            Ok(true) => FenceStatus::Complete,
            Ok(false) => FenceStatus::Incomplete,
            Err(e) => {
                log::error!("vkGetFenceStatus failed: {e}");
                FenceStatus::Incomplete
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct VulkanSemaphore {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) semaphore: vk::Semaphore,
    /// Pending-signal flag used to filter waits and double signals.
    pub(crate) signaled: AtomicBool,
}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

impl std::fmt::Debug for VulkanSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanSemaphore")
            .field("signaled", &self.signaled.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Semaphore for VulkanSemaphore {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct VulkanTimelineSemaphore {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) semaphore: vk::Semaphore,
}

impl Drop for VulkanTimelineSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

impl std::fmt::Debug for VulkanTimelineSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanTimelineSemaphore").finish_non_exhaustive()
    }
}

impl TimelineSemaphore for VulkanTimelineSemaphore {
    fn completed_value(&self) -> Result<u64> {
        unsafe {
            self.device
                .get_semaphore_counter_value(self.semaphore)
                .map_err(|e| Error::backend("vkGetSemaphoreCounterValue", e))
        }
    }

    fn wait(&self, value: u64) -> Result<()> {
        let semaphores = [self.semaphore];
        let values = [value];
        let info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        unsafe {
            self.device
                .wait_semaphores(&info, u64::MAX)
                .map_err(|e| Error::backend("vkWaitSemaphores", e))
        }
    }

    fn signal(&self, value: u64) -> Result<()> {
        let info = vk::SemaphoreSignalInfo::default()
            .semaphore(self.semaphore)
            .value(value);
        unsafe {
            self.device
                .signal_semaphore(&info)
                .map_err(|e| Error::backend("vkSignalSemaphore", e))
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
