//! Vulkan backend.

mod buffer;
mod command;
mod conv;
mod descriptor;
mod memory;
mod pipeline;
mod queue;
mod render_pass;
mod sampler;
mod shader;
mod texture;

#[cfg(feature = "window")]
mod swapchain;

use std::collections::HashMap;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};

use crate::{
    Backend, Buffer, BufferDescriptor, BufferUse, BufferView, BufferViewDescriptor, CommandBuffer,
    ComputePipelineState, ComputePipelineStateDescriptor, DescriptorSet, DescriptorSetLayout,
    DescriptorSetLayoutDescriptor, Device, DeviceFeatures, Error, Fence, GraphicsPipelineState,
    GraphicsPipelineStateDescriptor, MemoryKind, Queue, QueueType, ResourceKind, Result,
    RootSignature, RootSignatureDescriptor, Sampler, SamplerDescriptor, Semaphore, Shader,
    ShaderDescriptor, Texture, TextureDescriptor, TextureView, TextureViewDescriptor,
    TimelineSemaphore,
};

pub use buffer::{VulkanBuffer, VulkanBufferView};
pub use command::VulkanCommandBuffer;
pub use descriptor::{VulkanDescriptorSet, VulkanDescriptorSetLayout};
pub use pipeline::{VulkanComputePipelineState, VulkanGraphicsPipelineState, VulkanRootSignature};
pub use queue::{VulkanFence, VulkanQueue, VulkanSemaphore, VulkanTimelineSemaphore};
pub use sampler::VulkanSampler;
pub use shader::VulkanShader;
pub use texture::{VulkanTexture, VulkanTextureView};

#[cfg(feature = "window")]
pub use swapchain::VulkanSwapChain;

use command::QueueFamilyTable;
use descriptor::DescriptorPoolPager;
use memory::DeviceAllocator;

/// Returns validation layer names to enable if validation is requested
/// (feature or PRISM_VALIDATION=1).
#[cfg(feature = "validation")]
fn validation_layer_names(entry: &ash::Entry) -> Vec<CString> {
    let disable = std::env::var("PRISM_VALIDATION")
        .is_ok_and(|v| v == "0" || v.eq_ignore_ascii_case("false"));
    if disable {
        return vec![];
    }
    let layers = match unsafe { entry.enumerate_instance_layer_properties() } {
        Ok(l) => l,
        Err(_) => return vec![],
    };
    const KHRONOS: &str = "VK_LAYER_KHRONOS_validation";
    for prop in &layers {
        let name = unsafe { std::ffi::CStr::from_ptr(prop.layer_name.as_ptr()).to_string_lossy() };
        if name == KHRONOS {
            return vec![CString::new(KHRONOS).unwrap()];
        }
    }
    vec![]
}

#[cfg(not(feature = "validation"))]
fn validation_layer_names(_entry: &ash::Entry) -> Vec<CString> {
    if std::env::var("PRISM_VALIDATION").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
        log::warn!("PRISM_VALIDATION=1 set but prism-rhi built without the 'validation' feature");
    }
    vec![]
}

struct QueueFamilies {
    table: QueueFamilyTable,
}

fn pick_queue_families(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<QueueFamilies> {
    let props =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
    let graphics = props
        .iter()
        .position(|p| p.queue_flags.contains(conv::queue_flags(QueueType::Graphics)))
        .ok_or_else(|| Error::unsupported("no graphics queue family"))? as u32;
    // Prefer dedicated families; unified GPUs fall back to graphics.
    let compute = props
        .iter()
        .position(|p| {
            p.queue_flags.contains(conv::queue_flags(QueueType::Compute))
                && !p.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .map(|i| i as u32)
        .unwrap_or(graphics);
    let copy = props
        .iter()
        .position(|p| {
            p.queue_flags.contains(conv::queue_flags(QueueType::Copy))
                && !p.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                && !p.queue_flags.contains(vk::QueueFlags::COMPUTE)
        })
        .map(|i| i as u32)
        .unwrap_or(compute);
    Ok(QueueFamilies {
        table: QueueFamilyTable {
            graphics,
            compute,
            copy,
        },
    })
}

pub struct VulkanDevice {
    #[allow(dead_code)]
    entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: Arc<ash::Device>,
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,
    pager: Arc<Mutex<DescriptorPoolPager>>,
    families: QueueFamilyTable,
    queues: Mutex<HashMap<QueueType, Arc<VulkanQueue>>>,
    features: DeviceFeatures,
}

impl VulkanDevice {
    /// Creates a device on the first suitable physical device, preferring a
    /// discrete GPU. The entry and instance are owned by the returned
    /// device; there is no process-wide Vulkan state.
    pub fn new() -> Result<Arc<Self>> {
        let entry = unsafe {
            ash::Entry::load().map_err(|e| Error::backend("vkGetInstanceProcAddr", e))?
        };
        let app_name = CString::new("Prism").unwrap();
        let app_info = vk::ApplicationInfo::default()
            .api_version(vk::API_VERSION_1_2)
            .application_name(&app_name)
            .engine_name(&app_name);
        let layer_names = validation_layer_names(&entry);
        let layer_ptrs: Vec<*const i8> = layer_names.iter().map(|c| c.as_ptr()).collect();
        let mut ext_ptrs: Vec<*const i8> = Vec::new();
        #[cfg(all(feature = "window", windows))]
        {
            ext_ptrs.push(ash::khr::surface::NAME.as_ptr());
            ext_ptrs.push(ash::khr::win32_surface::NAME.as_ptr());
        }
        let instance_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&ext_ptrs);
        let instance = unsafe {
            entry
                .create_instance(&instance_info, None)
                .map_err(|e| Error::backend("vkCreateInstance", e))?
        };

        let physical_devices = unsafe {
            instance
                .enumerate_physical_devices()
                .map_err(|e| Error::backend("vkEnumeratePhysicalDevices", e))?
        };
        let physical_device = physical_devices
            .iter()
            .copied()
            .find(|&pd| {
                let props = unsafe { instance.get_physical_device_properties(pd) };
                props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
            })
            .or_else(|| physical_devices.first().copied())
            .ok_or_else(|| Error::unsupported("no Vulkan physical device"))?;
        let device_props = unsafe { instance.get_physical_device_properties(physical_device) };
        let supports_13 = device_props.api_version >= vk::API_VERSION_1_3;

        let mut f12 = vk::PhysicalDeviceVulkan12Features::default();
        let mut f13 = vk::PhysicalDeviceVulkan13Features::default();
        let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut f12);
        if supports_13 {
            features2 = features2.push_next(&mut f13);
        }
        unsafe { instance.get_physical_device_features2(physical_device, &mut features2) };
        let base = features2.features;
        let features = DeviceFeatures {
            timeline_semaphore: f12.timeline_semaphore == vk::TRUE,
            inline_uniform_block: supports_13 && f13.inline_uniform_block == vk::TRUE,
            buffer_device_address: f12.buffer_device_address == vk::TRUE,
            sampler_anisotropy: base.sampler_anisotropy == vk::TRUE,
        };

        let families = pick_queue_families(&instance, physical_device)?;
        let mut unique_families = vec![families.table.graphics];
        for f in [families.table.compute, families.table.copy] {
            if !unique_families.contains(&f) {
                unique_families.push(f);
            }
        }
        let priorities = [1.0f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo<'_>> = unique_families
            .iter()
            .map(|&f| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(f)
                    .queue_priorities(&priorities)
            })
            .collect();

        let enabled_base = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(features.sampler_anisotropy);
        let mut enable12 = vk::PhysicalDeviceVulkan12Features::default()
            .timeline_semaphore(features.timeline_semaphore)
            .buffer_device_address(features.buffer_device_address);
        let mut enable13 = vk::PhysicalDeviceVulkan13Features::default()
            .inline_uniform_block(features.inline_uniform_block);
        let mut device_ext_ptrs: Vec<*const i8> = Vec::new();
        #[cfg(all(feature = "window", windows))]
        {
            device_ext_ptrs.push(ash::khr::swapchain::NAME.as_ptr());
        }
        let mut device_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&device_ext_ptrs)
            .enabled_features(&enabled_base)
            .push_next(&mut enable12);
        if supports_13 {
            device_info = device_info.push_next(&mut enable13);
        }
        let device_raw = unsafe {
            instance
                .create_device(physical_device, &device_info, None)
                .map_err(|e| Error::backend("vkCreateDevice", e))?
        };
        let device = Arc::new(device_raw);

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: (*device).clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: features.buffer_device_address,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| Error::backend("gpu_allocator::vulkan::Allocator::new", e))?;

        let pager = DescriptorPoolPager::new(Arc::clone(&device), 1, features.inline_uniform_block);

        Ok(Arc::new(Self {
            entry,
            instance,
            physical_device,
            device,
            allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
            pager: Arc::new(Mutex::new(pager)),
            families: families.table,
            queues: Mutex::new(HashMap::new()),
            features,
        }))
    }

    fn device_allocator(&self) -> DeviceAllocator {
        DeviceAllocator::new(Arc::clone(&self.device), Arc::clone(&self.allocator))
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
        }
        for (_, q) in self.queues.lock().expect("queue cache poisoned").drain() {
            q.destroy();
        }
        if let Ok(mut pager) = self.pager.lock() {
            pager.destroy();
        }
        // Allocator memory blocks must be released while the device lives.
        unsafe {
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

impl std::fmt::Debug for VulkanDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDevice")
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

impl Device for VulkanDevice {
    fn backend(&self) -> Backend {
        Backend::Vulkan
    }

    fn features(&self) -> DeviceFeatures {
        self.features
    }

    fn queue(&self, ty: QueueType) -> Result<Arc<dyn Queue>> {
        let mut queues = self.queues.lock().expect("queue cache poisoned");
        if let Some(q) = queues.get(&ty) {
            return Ok(Arc::clone(q) as Arc<dyn Queue>);
        }
        let family = self.families.family(ty);
        let raw = unsafe { self.device.get_device_queue(family, 0) };
        let track = if self.features.timeline_semaphore {
            let mut type_info = vk::SemaphoreTypeCreateInfo::default()
                .semaphore_type(vk::SemaphoreType::TIMELINE)
                .initial_value(0);
            let info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
            Some(unsafe {
                self.device
                    .create_semaphore(&info, None)
                    .map_err(|e| Error::backend("vkCreateSemaphore", e))?
            })
        } else {
            None
        };
        let queue = Arc::new(VulkanQueue::new(
            Arc::clone(&self.device),
            raw,
            ty,
            family,
            track,
        ));
        queues.insert(ty, Arc::clone(&queue));
        Ok(queue as Arc<dyn Queue>)
    }

    fn create_command_buffer(&self, ty: QueueType) -> Result<Box<dyn CommandBuffer>> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(self.families.family(ty));
        let pool = unsafe {
            self.device
                .create_command_pool(&pool_info, None)
                .map_err(|e| Error::backend("vkCreateCommandPool", e))?
        };
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let cmd = match unsafe { self.device.allocate_command_buffers(&alloc_info) } {
            Ok(buffers) => buffers[0],
            Err(e) => {
                unsafe { self.device.destroy_command_pool(pool, None) };
                return Err(Error::backend("vkAllocateCommandBuffers", e));
            }
        };
        Ok(Box::new(VulkanCommandBuffer {
            device: Arc::clone(&self.device),
            pool,
            cmd,
            queue_type: ty,
            families: self.families,
            recording: false,
            pass_active: false,
            ended_passes: Vec::new(),
        }))
    }

    fn create_fence(&self) -> Result<Box<dyn Fence>> {
        let info = vk::FenceCreateInfo::default();
        let fence = unsafe {
            self.device
                .create_fence(&info, None)
                .map_err(|e| Error::backend("vkCreateFence", e))?
        };
        Ok(Box::new(VulkanFence {
            device: Arc::clone(&self.device),
            fence,
            submitted: AtomicBool::new(false),
        }))
    }

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>> {
        let info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe {
            self.device
                .create_semaphore(&info, None)
                .map_err(|e| Error::backend("vkCreateSemaphore", e))?
        };
        Ok(Box::new(VulkanSemaphore {
            device: Arc::clone(&self.device),
            semaphore,
            signaled: AtomicBool::new(false),
        }))
    }

    fn create_timeline_semaphore(&self, initial_value: u64) -> Result<Box<dyn TimelineSemaphore>> {
        if !self.features.timeline_semaphore {
            return Err(Error::unsupported(
                "timeline semaphores are not advertised by this device",
            ));
        }
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
        let semaphore = unsafe {
            self.device
                .create_semaphore(&info, None)
                .map_err(|e| Error::backend("vkCreateSemaphore", e))?
        };
        Ok(Box::new(VulkanTimelineSemaphore {
            device: Arc::clone(&self.device),
            semaphore,
        }))
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<Box<dyn Buffer>> {
        if desc.memory == MemoryKind::Device
            && desc
                .usage
                .intersects(BufferUse::MAP_READ | BufferUse::MAP_WRITE)
        {
            return Err(Error::invalid(
                "device-local buffers cannot request map usage",
            ));
        }
        let size = desc.size.max(1);
        let mut usage = conv::buffer_usage(desc.usage);
        if self.features.buffer_device_address {
            usage |= vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
        }
        let info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let name = desc.name.as_deref().unwrap_or("buffer");
        let (buffer, allocation) =
            self.device_allocator()
                .create_buffer(&info, desc.memory, desc.hints, name)?;
        let device_address = if self.features.buffer_device_address {
            let info = vk::BufferDeviceAddressInfo::default().buffer(buffer);
            Some(unsafe { self.device.get_buffer_device_address(&info) })
        } else {
            None
        };
        Ok(Box::new(VulkanBuffer {
            device: Arc::clone(&self.device),
            allocator: Arc::clone(&self.allocator),
            buffer,
            allocation: Some(allocation),
            size,
            usage: desc.usage,
            memory: desc.memory,
            device_address,
        }))
    }

    fn create_buffer_view(&self, desc: &BufferViewDescriptor<'_>) -> Result<Box<dyn BufferView>> {
        let buffer = desc
            .buffer
            .as_any()
            .downcast_ref::<VulkanBuffer>()
            .ok_or_else(|| Error::invalid("buffer is not a Vulkan buffer"))?;
        let required = match desc.kind {
            ResourceKind::CBuffer => BufferUse::CBUFFER,
            ResourceKind::Buffer => BufferUse::RESOURCE,
            ResourceKind::RwBuffer => BufferUse::UNORDERED_ACCESS,
            other => {
                return Err(Error::invalid(format!(
                    "buffer view cannot have kind {other:?}"
                )))
            }
        };
        if !buffer.usage.contains(required) {
            return Err(Error::invalid(format!(
                "buffer usage {:?} does not allow a {:?} view",
                buffer.usage, desc.kind
            )));
        }
        if desc.kind != ResourceKind::CBuffer && desc.stride == 0 {
            return Err(Error::invalid("structured views require a non-zero stride"));
        }
        let size = if desc.size == 0 {
            buffer.size - desc.offset
        } else {
            desc.size
        };
        if desc.offset + size > buffer.size {
            return Err(Error::invalid("buffer view range exceeds buffer size"));
        }
        Ok(Box::new(VulkanBufferView {
            buffer: buffer.buffer,
            kind: desc.kind,
            offset: desc.offset,
            size,
            stride: desc.stride,
        }))
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> Result<Box<dyn Texture>> {
        if desc.sample_count > 1 && desc.mip_levels > 1 {
            return Err(Error::invalid("multisampled textures cannot have mips"));
        }
        let info = texture::build_image_create_info(desc);
        let name = desc.name.as_deref().unwrap_or("texture");
        let hints = if desc.sample_count > 1 {
            crate::ResourceHint::DEDICATED
        } else {
            crate::ResourceHint::empty()
        };
        let (image, allocation) = self.device_allocator().create_image(&info, hints, name)?;
        Ok(Box::new(VulkanTexture {
            device: Arc::clone(&self.device),
            allocator: Arc::clone(&self.allocator),
            image,
            allocation: Some(allocation),
            desc: desc.clone(),
            raw_format: info.format,
            owns_image: true,
        }))
    }

    fn create_texture_view(&self, desc: &TextureViewDescriptor<'_>) -> Result<Box<dyn TextureView>> {
        Ok(Box::new(VulkanTextureView::create(
            Arc::clone(&self.device),
            desc,
        )?))
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> Result<Box<dyn Sampler>> {
        let sampler = sampler::create_raw_sampler(
            &self.device,
            desc,
            self.features.sampler_anisotropy,
        )?;
        Ok(Box::new(VulkanSampler {
            device: Arc::clone(&self.device),
            sampler,
        }))
    }

    fn create_shader(&self, desc: &ShaderDescriptor<'_>) -> Result<Box<dyn Shader>> {
        Ok(Box::new(VulkanShader::create(
            Arc::clone(&self.device),
            desc,
        )?))
    }

    fn create_descriptor_set_layout(
        &self,
        desc: &DescriptorSetLayoutDescriptor,
    ) -> Result<Box<dyn DescriptorSetLayout>> {
        Ok(Box::new(VulkanDescriptorSetLayout::create(
            Arc::clone(&self.device),
            desc,
            self.features.sampler_anisotropy,
        )?))
    }

    fn create_root_signature(
        &self,
        desc: &RootSignatureDescriptor<'_>,
    ) -> Result<Box<dyn RootSignature>> {
        Ok(Box::new(VulkanRootSignature::create(
            Arc::clone(&self.device),
            desc,
        )?))
    }

    fn create_descriptor_set(
        &self,
        layout: &dyn DescriptorSetLayout,
    ) -> Result<Box<dyn DescriptorSet>> {
        let concrete = layout
            .as_any()
            .downcast_ref::<VulkanDescriptorSetLayout>()
            .ok_or_else(|| Error::invalid("layout is not a Vulkan layout"))?;
        let (pool, set) = self
            .pager
            .lock()
            .expect("pager poisoned")
            .allocate(concrete.inner.layout)?;
        Ok(Box::new(VulkanDescriptorSet {
            device: Arc::clone(&self.device),
            pager: Arc::clone(&self.pager),
            pool,
            set,
            layout: Arc::clone(&concrete.inner),
        }))
    }

    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineStateDescriptor<'_>,
    ) -> Result<Box<dyn GraphicsPipelineState>> {
        Ok(Box::new(VulkanGraphicsPipelineState::create(
            Arc::clone(&self.device),
            desc,
        )?))
    }

    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineStateDescriptor<'_>,
    ) -> Result<Box<dyn ComputePipelineState>> {
        Ok(Box::new(VulkanComputePipelineState::create(
            Arc::clone(&self.device),
            desc,
        )?))
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| Error::backend("vkDeviceWaitIdle", e))
        }
    }

    #[cfg(feature = "window")]
    fn create_swap_chain(
        &self,
        desc: &crate::SwapChainDescriptor,
        window: &dyn raw_window_handle::HasWindowHandle,
    ) -> Result<Box<dyn crate::SwapChain>> {
        swapchain::create_swap_chain(self, desc, window)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[allow(dead_code)]
pub(crate) struct DeviceHandles<'a> {
    pub entry: &'a ash::Entry,
    pub instance: &'a ash::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: &'a Arc<ash::Device>,
    pub allocator: &'a Arc<Mutex<Allocator>>,
    pub families: QueueFamilyTable,
}

impl VulkanDevice {
    #[allow(dead_code)]
    pub(crate) fn handles(&self) -> DeviceHandles<'_> {
        DeviceHandles {
            entry: &self.entry,
            instance: &self.instance,
            physical_device: self.physical_device,
            device: &self.device,
            allocator: &self.allocator,
            families: self.families,
        }
    }
}
