//! DXGI swapchain support (feature "window").

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use windows::core::Interface;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D12::ID3D12Resource;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

use crate::{
    Device, Error, Fence, Result, Semaphore, SwapChain, SwapChainDescriptor, Texture,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUse,
};

use super::conv;
use super::queue::{D3D12Fence, D3D12Queue, D3D12Semaphore};
use super::texture::D3D12Texture;
use super::D3D12Device;

pub struct D3D12SwapChain {
    swapchain: IDXGISwapChain3,
    queue: Arc<D3D12Queue>,
    back_buffers: Vec<D3D12Texture>,
    format: TextureFormat,
    sync_interval: u32,
    present_flags: DXGI_PRESENT,
}

// The swapchain is externally synchronized by the caller.
unsafe impl Send for D3D12SwapChain {}
unsafe impl Sync for D3D12SwapChain {}

pub(crate) fn create_swap_chain(
    device: &D3D12Device,
    desc: &SwapChainDescriptor,
    window: &dyn raw_window_handle::HasWindowHandle,
) -> Result<Box<dyn SwapChain>> {
    let format = conv::texture_format(desc.format);
    // DXGI back buffers accept a small format whitelist.
    if format != DXGI_FORMAT_R16G16B16A16_FLOAT
        && format != DXGI_FORMAT_B8G8R8A8_UNORM
        && format != DXGI_FORMAT_R8G8B8A8_UNORM
        && format != DXGI_FORMAT_R10G10B10A2_UNORM
    {
        return Err(Error::invalid(format!(
            "swapchain format {:?} is not presentable",
            desc.format
        )));
    }
    if !(2..=16).contains(&desc.back_buffer_count) {
        return Err(Error::invalid(format!(
            "back buffer count must be in 2..=16, got {}",
            desc.back_buffer_count
        )));
    }
    let hwnd = match window
        .window_handle()
        .map_err(|e| Error::invalid(format!("window handle unavailable: {e:?}")))?
        .as_raw()
    {
        raw_window_handle::RawWindowHandle::Win32(win) => HWND(win.hwnd.get() as _),
        other => {
            return Err(Error::unsupported(format!(
                "window system {other:?} is not supported"
            )))
        }
    };
    let queue_arc = device.queue(crate::QueueType::Graphics)?;
    let queue = queue_arc
        .as_any()
        .downcast_ref::<D3D12Queue>()
        .expect("graphics queue is a D3D12 queue");

    let allow_tearing = device.allow_tearing && !desc.enable_sync;
    let mut flags = DXGI_SWAP_CHAIN_FLAG(0);
    if allow_tearing {
        flags = DXGI_SWAP_CHAIN_FLAG(flags.0 | DXGI_SWAP_CHAIN_FLAG_ALLOW_TEARING.0);
    }
    let sc_desc = DXGI_SWAP_CHAIN_DESC1 {
        Width: desc.width,
        Height: desc.height,
        Format: format,
        Stereo: false.into(),
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
        BufferCount: desc.back_buffer_count,
        Scaling: DXGI_SCALING_STRETCH,
        SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
        AlphaMode: DXGI_ALPHA_MODE_UNSPECIFIED,
        Flags: flags.0 as u32,
    };
    let swapchain1: IDXGISwapChain1 = unsafe {
        device
            .dxgi_factory
            .CreateSwapChainForHwnd(&queue.queue, hwnd, &sc_desc, None, None)
            .map_err(|e| Error::backend("IDXGIFactory::CreateSwapChainForHwnd", e))?
    };
    // Alt+Enter fullscreen toggling bypasses the renderer; keep it off.
    unsafe {
        if let Err(e) = device
            .dxgi_factory
            .MakeWindowAssociation(hwnd, DXGI_MWA_NO_ALT_ENTER)
        {
            log::warn!("IDXGIFactory::MakeWindowAssociation failed: {e}");
        }
    }
    let swapchain: IDXGISwapChain3 = swapchain1
        .cast()
        .map_err(|e| Error::backend("IUnknown::QueryInterface", e))?;

    let mut back_buffers = Vec::with_capacity(desc.back_buffer_count as usize);
    for i in 0..desc.back_buffer_count {
        let resource: ID3D12Resource = unsafe {
            swapchain
                .GetBuffer(i)
                .map_err(|e| Error::backend("IDXGISwapChain::GetBuffer", e))?
        };
        back_buffers.push(D3D12Texture {
            resource,
            allocation: Mutex::new(None),
            allocator: Arc::clone(&device.allocator),
            desc: TextureDescriptor {
                dim: TextureDimension::D2,
                width: desc.width,
                height: desc.height,
                depth_or_array: 1,
                mip_levels: 1,
                sample_count: 1,
                format: desc.format,
                usage: TextureUse::RENDER_TARGET | TextureUse::PRESENT,
                name: None,
            },
            raw_format: format,
        });
    }

    let queue = Arc::clone(
        device
            .queues
            .lock()
            .expect("queue cache poisoned")
            .get(&crate::QueueType::Graphics)
            .expect("graphics queue was created above"),
    );
    Ok(Box::new(D3D12SwapChain {
        swapchain,
        queue,
        back_buffers,
        format: desc.format,
        sync_interval: if desc.enable_sync { 1 } else { 0 },
        present_flags: if allow_tearing {
            DXGI_PRESENT_ALLOW_TEARING
        } else {
            DXGI_PRESENT(0)
        },
    }))
}

impl std::fmt::Debug for D3D12SwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12SwapChain")
            .field("back_buffers", &self.back_buffers.len())
            .finish_non_exhaustive()
    }
}

impl SwapChain for D3D12SwapChain {
    fn acquire_next(
        &mut self,
        signal_semaphore: Option<&dyn Semaphore>,
        signal_fence: Option<&dyn Fence>,
    ) -> Result<u32> {
        let index = unsafe { self.swapchain.GetCurrentBackBufferIndex() };
        // DXGI acquisition is implicit; the sync primitives are signalled
        // through the present queue so waits line up with Vulkan.
        if let Some(s) = signal_semaphore {
            let Some(sem) = s.as_any().downcast_ref::<D3D12Semaphore>() else {
                return Err(Error::invalid("semaphore is not a D3D12 semaphore"));
            };
            if !sem.signaled.swap(true, Ordering::AcqRel) {
                let value = sem.value.fetch_add(1, Ordering::AcqRel) + 1;
                unsafe {
                    self.queue
                        .queue
                        .Signal(&sem.fence, value)
                        .map_err(|e| Error::backend("ID3D12CommandQueue::Signal", e))?;
                }
            }
        }
        if let Some(f) = signal_fence {
            let Some(fence) = f.as_any().downcast_ref::<D3D12Fence>() else {
                return Err(Error::invalid("fence is not a D3D12 fence"));
            };
            let value = fence.value.fetch_add(1, Ordering::AcqRel) + 1;
            unsafe {
                self.queue
                    .queue
                    .Signal(&fence.fence, value)
                    .map_err(|e| Error::backend("ID3D12CommandQueue::Signal", e))?;
            }
            fence.submitted.store(true, Ordering::Release);
        }
        Ok(index)
    }

    fn back_buffer(&self, index: u32) -> &dyn Texture {
        &self.back_buffers[index as usize]
    }

    fn back_buffer_count(&self) -> u32 {
        self.back_buffers.len() as u32
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn present(&mut self, _index: u32, wait_semaphores: &[&dyn Semaphore]) -> Result<()> {
        for s in wait_semaphores {
            let Some(sem) = s.as_any().downcast_ref::<D3D12Semaphore>() else {
                return Err(Error::invalid("wait semaphore is not a D3D12 semaphore"));
            };
            if sem.signaled.swap(false, Ordering::AcqRel) {
                unsafe {
                    self.queue
                        .queue
                        .Wait(&sem.fence, sem.value.load(Ordering::Acquire))
                        .map_err(|e| Error::backend("ID3D12CommandQueue::Wait", e))?;
                }
            }
        }
        unsafe {
            self.swapchain
                .Present(self.sync_interval, self.present_flags)
                .ok()
                .map_err(|e| Error::backend("IDXGISwapChain::Present", e))?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
