//! Vulkan surface and swapchain support (feature "window").

use std::sync::atomic::Ordering;
use std::sync::Arc;

use ash::khr::surface::Instance as SurfaceInstance;
use ash::khr::swapchain::Device as SwapchainDevice;
use ash::vk;

use crate::{
    Error, Fence, Result, Semaphore, SwapChain, SwapChainDescriptor, Texture, TextureDescriptor,
    TextureDimension, TextureFormat, TextureUse,
};

use super::conv;
use super::queue::{VulkanFence, VulkanSemaphore};
use super::texture::VulkanTexture;
use super::VulkanDevice;

pub struct VulkanSwapChain {
    surface_loader: SurfaceInstance,
    surface: vk::SurfaceKHR,
    swapchain_loader: SwapchainDevice,
    swapchain: vk::SwapchainKHR,
    /// Back buffers; the swapchain owns the images, the textures do not.
    images: Vec<VulkanTexture>,
    present_queue: vk::Queue,
    format: TextureFormat,
    extent: (u32, u32),
}

pub(crate) fn create_swap_chain(
    device: &VulkanDevice,
    desc: &SwapChainDescriptor,
    window: &dyn raw_window_handle::HasWindowHandle,
) -> Result<Box<dyn SwapChain>> {
    if !(2..=16).contains(&desc.back_buffer_count) {
        return Err(Error::invalid(format!(
            "back buffer count must be in 2..=16, got {}",
            desc.back_buffer_count
        )));
    }
    let handles = device.handles();
    let handle = window
        .window_handle()
        .map_err(|e| Error::invalid(format!("window handle unavailable: {e:?}")))?;
    let surface = match handle.as_raw() {
        #[cfg(windows)]
        raw_window_handle::RawWindowHandle::Win32(win) => {
            let info = vk::Win32SurfaceCreateInfoKHR::default()
                .hinstance(win.hinstance.map(|h| h.get()).unwrap_or(0))
                .hwnd(win.hwnd.get());
            let loader =
                ash::khr::win32_surface::Instance::new(handles.entry, handles.instance);
            unsafe {
                loader
                    .create_win32_surface(&info, None)
                    .map_err(|e| Error::backend("vkCreateWin32SurfaceKHR", e))?
            }
        }
        other => {
            return Err(Error::unsupported(format!(
                "window system {other:?} is not supported"
            )))
        }
    };
    let surface_loader = SurfaceInstance::new(handles.entry, handles.instance);
    let caps = unsafe {
        surface_loader
            .get_physical_device_surface_capabilities(handles.physical_device, surface)
            .map_err(|e| Error::backend("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?
    };
    let formats = unsafe {
        surface_loader
            .get_physical_device_surface_formats(handles.physical_device, surface)
            .map_err(|e| Error::backend("vkGetPhysicalDeviceSurfaceFormatsKHR", e))?
    };
    let wanted = conv::texture_format(desc.format);
    let surface_format = formats
        .iter()
        .copied()
        .find(|f| f.format == wanted)
        .or_else(|| formats.first().copied())
        .ok_or_else(|| Error::unsupported("surface reports no formats"))?;
    let present_modes = unsafe {
        surface_loader
            .get_physical_device_surface_present_modes(handles.physical_device, surface)
            .map_err(|e| Error::backend("vkGetPhysicalDeviceSurfacePresentModesKHR", e))?
    };
    let present_mode = if desc.enable_sync {
        vk::PresentModeKHR::FIFO
    } else {
        present_modes
            .iter()
            .copied()
            .find(|m| *m == vk::PresentModeKHR::MAILBOX)
            .or_else(|| {
                present_modes
                    .iter()
                    .copied()
                    .find(|m| *m == vk::PresentModeKHR::IMMEDIATE)
            })
            .unwrap_or(vk::PresentModeKHR::FIFO)
    };
    let extent = vk::Extent2D {
        width: desc
            .width
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: desc
            .height
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    };
    let mut image_count = desc.back_buffer_count.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        image_count = image_count.min(caps.max_image_count);
    }
    let info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(caps.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true);
    let swapchain_loader = SwapchainDevice::new(handles.instance, handles.device);
    let swapchain = unsafe {
        swapchain_loader
            .create_swapchain(&info, None)
            .map_err(|e| Error::backend("vkCreateSwapchainKHR", e))?
    };
    let vk_images = unsafe {
        swapchain_loader
            .get_swapchain_images(swapchain)
            .map_err(|e| Error::backend("vkGetSwapchainImagesKHR", e))?
    };
    let images = vk_images
        .into_iter()
        .map(|image| VulkanTexture {
            device: Arc::clone(handles.device),
            allocator: Arc::clone(handles.allocator),
            image,
            allocation: None,
            desc: TextureDescriptor {
                dim: TextureDimension::D2,
                width: extent.width,
                height: extent.height,
                depth_or_array: 1,
                mip_levels: 1,
                sample_count: 1,
                format: desc.format,
                usage: TextureUse::RENDER_TARGET | TextureUse::PRESENT,
                name: None,
            },
            raw_format: surface_format.format,
            owns_image: false,
        })
        .collect();
    let present_queue =
        unsafe { handles.device.get_device_queue(handles.families.graphics, 0) };
    Ok(Box::new(VulkanSwapChain {
        surface_loader,
        surface,
        swapchain_loader,
        swapchain,
        images,
        present_queue,
        format: desc.format,
        extent: (extent.width, extent.height),
    }))
}

impl Drop for VulkanSwapChain {
    fn drop(&mut self) {
        self.images.clear();
        unsafe {
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

impl std::fmt::Debug for VulkanSwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanSwapChain")
            .field("extent", &self.extent)
            .field("images", &self.images.len())
            .finish_non_exhaustive()
    }
}

impl SwapChain for VulkanSwapChain {
    fn acquire_next(
        &mut self,
        signal_semaphore: Option<&dyn Semaphore>,
        signal_fence: Option<&dyn Fence>,
    ) -> Result<u32> {
        let semaphore = match signal_semaphore {
            Some(s) => {
                let s = s
                    .as_any()
                    .downcast_ref::<VulkanSemaphore>()
                    .ok_or_else(|| Error::invalid("semaphore is not a Vulkan semaphore"))?;
                s.signaled.store(true, Ordering::Release);
                s.semaphore
            }
            None => vk::Semaphore::null(),
        };
        let fence = match signal_fence {
            Some(f) => {
                let f = f
                    .as_any()
                    .downcast_ref::<VulkanFence>()
                    .ok_or_else(|| Error::invalid("fence is not a Vulkan fence"))?;
                f.submitted.store(true, Ordering::Release);
                f.fence
            }
            None => vk::Fence::null(),
        };
        let (index, suboptimal) = unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, fence)
                .map_err(|e| Error::backend("vkAcquireNextImageKHR", e))?
        };
        if suboptimal {
            log::warn!("swapchain is suboptimal for the surface");
        }
        Ok(index)
    }

    fn back_buffer(&self, index: u32) -> &dyn Texture {
        &self.images[index as usize]
    }

    fn back_buffer_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn present(&mut self, index: u32, wait_semaphores: &[&dyn Semaphore]) -> Result<()> {
        let mut waits = Vec::with_capacity(wait_semaphores.len());
        for s in wait_semaphores {
            let Some(sem) = s.as_any().downcast_ref::<VulkanSemaphore>() else {
                return Err(Error::invalid("wait semaphore is not a Vulkan semaphore"));
            };
            if sem.signaled.swap(false, Ordering::AcqRel) {
                waits.push(sem.semaphore);
            }
        }
        let indices = [index];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&waits)
            .swapchains(std::slice::from_ref(&self.swapchain))
            .image_indices(&indices);
        unsafe {
            self.swapchain_loader
                .queue_present(self.present_queue, &info)
                .map_err(|e| Error::backend("vkQueuePresentKHR", e))?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
