//! Direct3D 12 backend.

mod buffer;
mod command;
mod conv;
mod descriptor;
mod memory;
mod pipeline;
mod queue;
mod render_pass;
mod root_signature;
mod shader;
mod texture;

#[cfg(feature = "window")]
mod swapchain;

use std::collections::HashMap;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use gpu_allocator::d3d12::{Allocator, AllocatorCreateDesc, ID3D12DeviceVersion};
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D::D3D_FEATURE_LEVEL_12_0;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

use crate::{
    Backend, Buffer, BufferDescriptor, BufferUse, BufferView, BufferViewDescriptor, CommandBuffer,
    ComputePipelineState, ComputePipelineStateDescriptor, DescriptorSet, DescriptorSetLayout,
    DescriptorSetLayoutDescriptor, Device, DeviceFeatures, Error, Fence, GraphicsPipelineState,
    GraphicsPipelineStateDescriptor, MemoryKind, Queue, QueueType, ResourceKind, Result,
    RootSignature, RootSignatureDescriptor, Sampler, SamplerDescriptor, Semaphore, Shader,
    ShaderDescriptor, Texture, TextureDescriptor, TextureView, TextureViewDescriptor,
    TextureViewDimension, TextureViewKind, TimelineSemaphore, ALL_LAYERS, ALL_MIPS,
};

pub use buffer::{D3D12Buffer, D3D12BufferView};
pub use command::D3D12CommandBuffer;
pub use pipeline::{D3D12ComputePipelineState, D3D12GraphicsPipelineState};
pub use queue::{D3D12Fence, D3D12Queue, D3D12Semaphore, D3D12TimelineSemaphore};
pub use root_signature::{D3D12DescriptorSet, D3D12DescriptorSetLayout, D3D12RootSignature};
pub use shader::D3D12Shader;
pub use texture::{D3D12Sampler, D3D12Texture, D3D12TextureView};

#[cfg(feature = "window")]
pub use swapchain::D3D12SwapChain;

use descriptor::{CpuDescriptorAllocator, GpuDescriptorAllocator};
use memory::DeviceAllocator;

// Host-visible pool starting lengths per category.
const CPU_RES_HEAP_LEN: u32 = 512;
const CPU_RTV_HEAP_LEN: u32 = 128;
const CPU_DSV_HEAP_LEN: u32 = 128;
const CPU_SAMPLER_HEAP_LEN: u32 = 64;
// Shader-visible heaps are bounded; one heap per category stays bound for
// the lifetime of the device.
const GPU_RES_HEAP_LEN: u32 = 1 << 16;
const GPU_SAMPLER_HEAP_LEN: u32 = 1 << 8;

/// D3D12_ENCODE_SHADER_4_COMPONENT_MAPPING(0, 1, 2, 3): identity swizzle.
const DEFAULT_4_COMPONENT_MAPPING: u32 = 0x1688;

fn align_to(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

pub struct D3D12Device {
    device: ID3D12Device,
    dxgi_factory: IDXGIFactory4,
    #[allow(dead_code)]
    adapter: IDXGIAdapter1,
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,
    cpu_res: Arc<CpuDescriptorAllocator>,
    cpu_rtv: Arc<CpuDescriptorAllocator>,
    cpu_dsv: Arc<CpuDescriptorAllocator>,
    cpu_sampler: Arc<CpuDescriptorAllocator>,
    gpu_res: Arc<GpuDescriptorAllocator>,
    gpu_sampler: Arc<GpuDescriptorAllocator>,
    queues: Mutex<HashMap<QueueType, Arc<D3D12Queue>>>,
    features: DeviceFeatures,
    allow_tearing: bool,
}

// ID3D12Device and everything reached through it is free-threaded.
unsafe impl Send for D3D12Device {}
unsafe impl Sync for D3D12Device {}

impl D3D12Device {
    /// Creates a device on the first hardware adapter that supports
    /// feature level 12.0.
    pub fn new() -> Result<Arc<Self>> {
        #[cfg(feature = "validation")]
        {
            let mut debug: Option<ID3D12Debug> = None;
            if unsafe { D3D12GetDebugInterface(&mut debug) }.is_ok() {
                if let Some(debug) = debug {
                    unsafe { debug.EnableDebugLayer() };
                }
            }
        }
        let dxgi_factory: IDXGIFactory4 = unsafe {
            CreateDXGIFactory2(DXGI_CREATE_FACTORY_FLAGS(0))
                .map_err(|e| Error::backend("CreateDXGIFactory2", e))?
        };
        let mut picked: Option<(IDXGIAdapter1, ID3D12Device)> = None;
        for index in 0.. {
            let adapter: IDXGIAdapter1 = match unsafe { dxgi_factory.EnumAdapters1(index) } {
                Ok(a) => a,
                Err(_) => break,
            };
            let desc = unsafe { adapter.GetDesc1() }
                .map_err(|e| Error::backend("IDXGIAdapter1::GetDesc1", e))?;
            if (desc.Flags & DXGI_ADAPTER_FLAG_SOFTWARE.0 as u32) != 0 {
                continue;
            }
            let mut device: Option<ID3D12Device> = None;
            if unsafe { D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_12_0, &mut device) }.is_ok()
            {
                if let Some(device) = device {
                    picked = Some((adapter, device));
                    break;
                }
            }
        }
        let (adapter, device) = picked
            .ok_or_else(|| Error::unsupported("no hardware adapter with feature level 12.0"))?;

        let allow_tearing = dxgi_factory
            .cast::<IDXGIFactory5>()
            .ok()
            .map(|f5| {
                let mut allow = windows::Win32::Foundation::BOOL::default();
                unsafe {
                    f5.CheckFeatureSupport(
                        DXGI_FEATURE_PRESENT_ALLOW_TEARING,
                        &mut allow as *mut _ as *mut _,
                        std::mem::size_of_val(&allow) as u32,
                    )
                }
                .is_ok()
                    && allow.as_bool()
            })
            .unwrap_or(false);

        let allocator = Allocator::new(&AllocatorCreateDesc {
            device: ID3D12DeviceVersion::Device(device.clone()),
            debug_settings: Default::default(),
            allocation_sizes: Default::default(),
        })
        .map_err(|e| Error::backend("gpu_allocator::d3d12::Allocator::new", e))?;

        let cpu_res = Arc::new(CpuDescriptorAllocator::new(
            device.clone(),
            D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
            CPU_RES_HEAP_LEN,
        ));
        let cpu_rtv = Arc::new(CpuDescriptorAllocator::new(
            device.clone(),
            D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
            CPU_RTV_HEAP_LEN,
        ));
        let cpu_dsv = Arc::new(CpuDescriptorAllocator::new(
            device.clone(),
            D3D12_DESCRIPTOR_HEAP_TYPE_DSV,
            CPU_DSV_HEAP_LEN,
        ));
        let cpu_sampler = Arc::new(CpuDescriptorAllocator::new(
            device.clone(),
            D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER,
            CPU_SAMPLER_HEAP_LEN,
        ));
        let gpu_res = Arc::new(GpuDescriptorAllocator::new(
            &device,
            D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
            GPU_RES_HEAP_LEN,
        )?);
        let gpu_sampler = Arc::new(GpuDescriptorAllocator::new(
            &device,
            D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER,
            GPU_SAMPLER_HEAP_LEN,
        )?);

        Ok(Arc::new(Self {
            device,
            dxgi_factory,
            adapter,
            allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
            cpu_res,
            cpu_rtv,
            cpu_dsv,
            cpu_sampler,
            gpu_res,
            gpu_sampler,
            queues: Mutex::new(HashMap::new()),
            features: DeviceFeatures {
                timeline_semaphore: true,
                inline_uniform_block: false,
                buffer_device_address: true,
                sampler_anisotropy: true,
            },
            allow_tearing,
        }))
    }

    fn device_allocator(&self) -> DeviceAllocator {
        DeviceAllocator::new(self.device.clone(), Arc::clone(&self.allocator))
    }

    fn sampler_desc(&self, desc: &SamplerDescriptor) -> D3D12_SAMPLER_DESC {
        D3D12_SAMPLER_DESC {
            Filter: conv::filter(
                desc.min_filter,
                desc.mag_filter,
                desc.mip_filter,
                desc.compare.is_some(),
                desc.anisotropy_clamp,
            ),
            AddressU: conv::address_mode(desc.address_s),
            AddressV: conv::address_mode(desc.address_t),
            AddressW: conv::address_mode(desc.address_r),
            MipLODBias: 0.0,
            MaxAnisotropy: desc.anisotropy_clamp,
            ComparisonFunc: desc
                .compare
                .map(conv::compare_op)
                .unwrap_or(D3D12_COMPARISON_FUNC_NEVER),
            BorderColor: [0.0, 0.0, 0.0, 0.0],
            MinLOD: desc.lod_min,
            MaxLOD: desc.lod_max,
        }
    }
}

impl Drop for D3D12Device {
    fn drop(&mut self) {
        for (_, q) in self.queues.lock().expect("queue cache poisoned").drain() {
            if let Err(e) = q.wait() {
                log::warn!("queue drain on device drop failed: {e}");
            }
        }
        // The allocator's heaps must be released before the device.
        unsafe {
            ManuallyDrop::drop(&mut self.allocator);
        }
    }
}

impl std::fmt::Debug for D3D12Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12Device")
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

impl Device for D3D12Device {
    fn backend(&self) -> Backend {
        Backend::D3D12
    }

    fn features(&self) -> DeviceFeatures {
        self.features
    }

    fn queue(&self, ty: QueueType) -> Result<Arc<dyn Queue>> {
        let mut queues = self.queues.lock().expect("queue cache poisoned");
        if let Some(q) = queues.get(&ty) {
            return Ok(Arc::clone(q) as Arc<dyn Queue>);
        }
        let queue = Arc::new(D3D12Queue::new(&self.device, ty)?);
        queues.insert(ty, Arc::clone(&queue));
        Ok(queue as Arc<dyn Queue>)
    }

    fn create_command_buffer(&self, ty: QueueType) -> Result<Box<dyn CommandBuffer>> {
        let list_type = conv::command_list_type(ty);
        let allocator: ID3D12CommandAllocator = unsafe {
            self.device
                .CreateCommandAllocator(list_type)
                .map_err(|e| Error::backend("ID3D12Device::CreateCommandAllocator", e))?
        };
        let list: ID3D12GraphicsCommandList = unsafe {
            self.device
                .CreateCommandList(0, list_type, &allocator, None)
                .map_err(|e| Error::backend("ID3D12Device::CreateCommandList", e))?
        };
        // Lists are created open; close so every recording starts with
        // begin's reset.
        unsafe {
            list.Close()
                .map_err(|e| Error::backend("ID3D12GraphicsCommandList::Close", e))?;
        }
        let list4: ID3D12GraphicsCommandList4 = list
            .cast()
            .map_err(|e| Error::backend("IUnknown::QueryInterface", e))?;
        // Copy queues cannot bind descriptor heaps.
        let gpu_heaps = (ty != QueueType::Copy).then(|| {
            [
                self.gpu_res.raw_heap().clone(),
                self.gpu_sampler.raw_heap().clone(),
            ]
        });
        Ok(Box::new(D3D12CommandBuffer {
            list,
            list4,
            allocator,
            queue_type: ty,
            gpu_heaps,
            recording: false,
            pass_active: false,
        }))
    }

    fn create_fence(&self) -> Result<Box<dyn Fence>> {
        Ok(Box::new(D3D12Fence::new(&self.device)?))
    }

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>> {
        Ok(Box::new(D3D12Semaphore::new(&self.device)?))
    }

    fn create_timeline_semaphore(&self, initial_value: u64) -> Result<Box<dyn TimelineSemaphore>> {
        Ok(Box::new(D3D12TimelineSemaphore::new(
            &self.device,
            initial_value,
        )?))
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
        // Constant buffers bind in 256-byte granules.
        let size = if desc.usage.contains(BufferUse::CBUFFER) {
            align_to(
                desc.size.max(1),
                D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT as u64,
            )
        } else {
            desc.size.max(1)
        };
        let mut flags = D3D12_RESOURCE_FLAG_NONE;
        if desc.usage.contains(BufferUse::UNORDERED_ACCESS) {
            flags |= D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS;
        }
        let resource_desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
            Alignment: 0,
            Width: size,
            Height: 1,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: DXGI_FORMAT_UNKNOWN,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
            Flags: flags,
        };
        let initial_state = conv::initial_buffer_state(desc.memory);
        let name = desc.name.as_deref().unwrap_or("buffer");
        let (resource, allocation) = self.device_allocator().create_resource(
            &resource_desc,
            desc.memory,
            desc.hints,
            initial_state,
            name,
        )?;
        let gpu_address = unsafe { resource.GetGPUVirtualAddress() };
        Ok(Box::new(D3D12Buffer {
            resource,
            allocation: Mutex::new(allocation),
            allocator: Arc::clone(&self.allocator),
            size,
            usage: desc.usage,
            memory: desc.memory,
            gpu_address,
        }))
    }

    fn create_buffer_view(&self, desc: &BufferViewDescriptor<'_>) -> Result<Box<dyn BufferView>> {
        let buffer = desc
            .buffer
            .as_any()
            .downcast_ref::<D3D12Buffer>()
            .ok_or_else(|| Error::invalid("buffer is not a D3D12 buffer"))?;
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
        let slot = self.cpu_res.allocate(1)?;
        match desc.kind {
            ResourceKind::CBuffer => {
                let view_desc = D3D12_CONSTANT_BUFFER_VIEW_DESC {
                    BufferLocation: buffer.gpu_address + desc.offset,
                    SizeInBytes: align_to(size, D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT as u64)
                        as u32,
                };
                unsafe {
                    self.device
                        .CreateConstantBufferView(Some(&view_desc), slot.handle());
                }
            }
            ResourceKind::Buffer => {
                let view_desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
                    Format: DXGI_FORMAT_UNKNOWN,
                    ViewDimension: D3D12_SRV_DIMENSION_BUFFER,
                    Shader4ComponentMapping: DEFAULT_4_COMPONENT_MAPPING,
                    Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                        Buffer: D3D12_BUFFER_SRV {
                            FirstElement: desc.offset / desc.stride as u64,
                            NumElements: (size / desc.stride as u64) as u32,
                            StructureByteStride: desc.stride,
                            Flags: D3D12_BUFFER_SRV_FLAG_NONE,
                        },
                    },
                };
                unsafe {
                    self.device.CreateShaderResourceView(
                        &buffer.resource,
                        Some(&view_desc),
                        slot.handle(),
                    );
                }
            }
            ResourceKind::RwBuffer => {
                let view_desc = D3D12_UNORDERED_ACCESS_VIEW_DESC {
                    Format: DXGI_FORMAT_UNKNOWN,
                    ViewDimension: D3D12_UAV_DIMENSION_BUFFER,
                    Anonymous: D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                        Buffer: D3D12_BUFFER_UAV {
                            FirstElement: desc.offset / desc.stride as u64,
                            NumElements: (size / desc.stride as u64) as u32,
                            StructureByteStride: desc.stride,
                            CounterOffsetInBytes: 0,
                            Flags: D3D12_BUFFER_UAV_FLAG_NONE,
                        },
                    },
                };
                unsafe {
                    self.device.CreateUnorderedAccessView(
                        &buffer.resource,
                        None,
                        Some(&view_desc),
                        slot.handle(),
                    );
                }
            }
            _ => unreachable!("validated above"),
        }
        Ok(Box::new(D3D12BufferView {
            kind: desc.kind,
            gpu_address: buffer.gpu_address,
            offset: desc.offset,
            size,
            stride: desc.stride,
            slot,
        }))
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> Result<Box<dyn Texture>> {
        if desc.sample_count > 1 && desc.mip_levels > 1 {
            return Err(Error::invalid("multisampled textures cannot have mips"));
        }
        let mut flags = D3D12_RESOURCE_FLAG_NONE;
        if desc.usage.contains(crate::TextureUse::RENDER_TARGET)
            || desc.usage.contains(crate::TextureUse::PRESENT)
        {
            flags |= D3D12_RESOURCE_FLAG_ALLOW_RENDER_TARGET;
        }
        if desc.usage.intersects(
            crate::TextureUse::DEPTH_STENCIL_READ | crate::TextureUse::DEPTH_STENCIL_WRITE,
        ) {
            flags |= D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL;
            if !desc.usage.contains(crate::TextureUse::RESOURCE) {
                flags |= D3D12_RESOURCE_FLAG_DENY_SHADER_RESOURCE;
            }
        }
        if desc.usage.contains(crate::TextureUse::UNORDERED_ACCESS) {
            flags |= D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS;
        }
        // Depth textures that are also sampled must be created typeless so
        // DSVs and SRVs can alias.
        let raw_format = if desc.format.is_depth() && desc.usage.contains(crate::TextureUse::RESOURCE)
        {
            conv::typeless_parent(desc.format)
        } else {
            conv::texture_format(desc.format)
        };
        let resource_desc = D3D12_RESOURCE_DESC {
            Dimension: conv::resource_dimension(desc.dim),
            Alignment: if desc.sample_count > 1 {
                D3D12_DEFAULT_MSAA_RESOURCE_PLACEMENT_ALIGNMENT as u64
            } else {
                0
            },
            Width: desc.width.max(1) as u64,
            Height: desc.height.max(1),
            DepthOrArraySize: desc.depth_or_array.max(1) as u16,
            MipLevels: desc.mip_levels.max(1) as u16,
            Format: raw_format,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: desc.sample_count.max(1),
                Quality: 0,
            },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: flags,
        };
        let name = desc.name.as_deref().unwrap_or("texture");
        let hints = if desc.sample_count > 1 {
            crate::ResourceHint::DEDICATED
        } else {
            crate::ResourceHint::empty()
        };
        let (resource, allocation) = self.device_allocator().create_resource(
            &resource_desc,
            MemoryKind::Device,
            hints,
            D3D12_RESOURCE_STATE_COMMON,
            name,
        )?;
        Ok(Box::new(D3D12Texture {
            resource,
            allocation: Mutex::new(allocation),
            allocator: Arc::clone(&self.allocator),
            desc: desc.clone(),
            raw_format,
        }))
    }

    fn create_texture_view(&self, desc: &TextureViewDescriptor<'_>) -> Result<Box<dyn TextureView>> {
        let texture = desc
            .texture
            .as_any()
            .downcast_ref::<D3D12Texture>()
            .ok_or_else(|| Error::invalid("texture is not a D3D12 texture"))?;
        let mip_count = if desc.range.mip_count == ALL_MIPS {
            texture.desc.mip_levels - desc.range.base_mip
        } else {
            desc.range.mip_count
        };
        let layer_count = if desc.range.layer_count == ALL_LAYERS {
            match texture.desc.dim {
                crate::TextureDimension::D3 => 1,
                _ => texture.desc.depth_or_array - desc.range.base_layer,
            }
        } else {
            desc.range.layer_count
        };
        let mip_extent = |dim: u32| (dim >> desc.range.base_mip.min(31)).max(1);
        let extent = (
            mip_extent(texture.desc.width),
            mip_extent(texture.desc.height),
        );
        let slot = match desc.kind {
            TextureViewKind::ShaderResource => {
                let slot = self.cpu_res.allocate(1)?;
                let format = if desc.format.is_depth() {
                    conv::depth_srv_format(desc.format)
                } else {
                    conv::texture_format(desc.format)
                };
                let mut view_desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
                    Format: format,
                    ViewDimension: D3D12_SRV_DIMENSION_TEXTURE2D,
                    Shader4ComponentMapping: DEFAULT_4_COMPONENT_MAPPING,
                    Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                        Texture2D: D3D12_TEX2D_SRV {
                            MostDetailedMip: desc.range.base_mip,
                            MipLevels: mip_count,
                            PlaneSlice: 0,
                            ResourceMinLODClamp: 0.0,
                        },
                    },
                };
                match desc.dim {
                    TextureViewDimension::D1 => {
                        view_desc.ViewDimension = D3D12_SRV_DIMENSION_TEXTURE1D;
                        view_desc.Anonymous = D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                            Texture1D: D3D12_TEX1D_SRV {
                                MostDetailedMip: desc.range.base_mip,
                                MipLevels: mip_count,
                                ResourceMinLODClamp: 0.0,
                            },
                        };
                    }
                    TextureViewDimension::D2 => {}
                    TextureViewDimension::D2Array => {
                        view_desc.ViewDimension = D3D12_SRV_DIMENSION_TEXTURE2DARRAY;
                        view_desc.Anonymous = D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                            Texture2DArray: D3D12_TEX2D_ARRAY_SRV {
                                MostDetailedMip: desc.range.base_mip,
                                MipLevels: mip_count,
                                FirstArraySlice: desc.range.base_layer,
                                ArraySize: layer_count,
                                PlaneSlice: 0,
                                ResourceMinLODClamp: 0.0,
                            },
                        };
                    }
                    TextureViewDimension::Cube => {
                        view_desc.ViewDimension = D3D12_SRV_DIMENSION_TEXTURECUBE;
                        view_desc.Anonymous = D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                            TextureCube: D3D12_TEXCUBE_SRV {
                                MostDetailedMip: desc.range.base_mip,
                                MipLevels: mip_count,
                                ResourceMinLODClamp: 0.0,
                            },
                        };
                    }
                    TextureViewDimension::CubeArray => {
                        view_desc.ViewDimension = D3D12_SRV_DIMENSION_TEXTURECUBEARRAY;
                        view_desc.Anonymous = D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                            TextureCubeArray: D3D12_TEXCUBE_ARRAY_SRV {
                                MostDetailedMip: desc.range.base_mip,
                                MipLevels: mip_count,
                                First2DArrayFace: desc.range.base_layer,
                                NumCubes: layer_count / 6,
                                ResourceMinLODClamp: 0.0,
                            },
                        };
                    }
                    TextureViewDimension::D3 => {
                        view_desc.ViewDimension = D3D12_SRV_DIMENSION_TEXTURE3D;
                        view_desc.Anonymous = D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                            Texture3D: D3D12_TEX3D_SRV {
                                MostDetailedMip: desc.range.base_mip,
                                MipLevels: mip_count,
                                ResourceMinLODClamp: 0.0,
                            },
                        };
                    }
                }
                unsafe {
                    self.device.CreateShaderResourceView(
                        &texture.resource,
                        Some(&view_desc),
                        slot.handle(),
                    );
                }
                slot
            }
            TextureViewKind::UnorderedAccess => {
                let slot = self.cpu_res.allocate(1)?;
                let view_desc = match desc.dim {
                    TextureViewDimension::D3 => D3D12_UNORDERED_ACCESS_VIEW_DESC {
                        Format: conv::texture_format(desc.format),
                        ViewDimension: D3D12_UAV_DIMENSION_TEXTURE3D,
                        Anonymous: D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                            Texture3D: D3D12_TEX3D_UAV {
                                MipSlice: desc.range.base_mip,
                                FirstWSlice: 0,
                                WSize: u32::MAX,
                            },
                        },
                    },
                    TextureViewDimension::D2Array | TextureViewDimension::Cube
                    | TextureViewDimension::CubeArray => D3D12_UNORDERED_ACCESS_VIEW_DESC {
                        Format: conv::texture_format(desc.format),
                        ViewDimension: D3D12_UAV_DIMENSION_TEXTURE2DARRAY,
                        Anonymous: D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                            Texture2DArray: D3D12_TEX2D_ARRAY_UAV {
                                MipSlice: desc.range.base_mip,
                                FirstArraySlice: desc.range.base_layer,
                                ArraySize: layer_count,
                                PlaneSlice: 0,
                            },
                        },
                    },
                    _ => D3D12_UNORDERED_ACCESS_VIEW_DESC {
                        Format: conv::texture_format(desc.format),
                        ViewDimension: D3D12_UAV_DIMENSION_TEXTURE2D,
                        Anonymous: D3D12_UNORDERED_ACCESS_VIEW_DESC_0 {
                            Texture2D: D3D12_TEX2D_UAV {
                                MipSlice: desc.range.base_mip,
                                PlaneSlice: 0,
                            },
                        },
                    },
                };
                unsafe {
                    self.device.CreateUnorderedAccessView(
                        &texture.resource,
                        None,
                        Some(&view_desc),
                        slot.handle(),
                    );
                }
                slot
            }
            TextureViewKind::RenderTarget => {
                let slot = self.cpu_rtv.allocate(1)?;
                let view_desc = match desc.dim {
                    TextureViewDimension::D2Array | TextureViewDimension::Cube
                    | TextureViewDimension::CubeArray => D3D12_RENDER_TARGET_VIEW_DESC {
                        Format: conv::texture_format(desc.format),
                        ViewDimension: D3D12_RTV_DIMENSION_TEXTURE2DARRAY,
                        Anonymous: D3D12_RENDER_TARGET_VIEW_DESC_0 {
                            Texture2DArray: D3D12_TEX2D_ARRAY_RTV {
                                MipSlice: desc.range.base_mip,
                                FirstArraySlice: desc.range.base_layer,
                                ArraySize: layer_count,
                                PlaneSlice: 0,
                            },
                        },
                    },
                    _ => D3D12_RENDER_TARGET_VIEW_DESC {
                        Format: conv::texture_format(desc.format),
                        ViewDimension: D3D12_RTV_DIMENSION_TEXTURE2D,
                        Anonymous: D3D12_RENDER_TARGET_VIEW_DESC_0 {
                            Texture2D: D3D12_TEX2D_RTV {
                                MipSlice: desc.range.base_mip,
                                PlaneSlice: 0,
                            },
                        },
                    },
                };
                unsafe {
                    self.device.CreateRenderTargetView(
                        &texture.resource,
                        Some(&view_desc),
                        slot.handle(),
                    );
                }
                slot
            }
            TextureViewKind::DepthStencil => {
                let slot = self.cpu_dsv.allocate(1)?;
                let view_desc = D3D12_DEPTH_STENCIL_VIEW_DESC {
                    Format: conv::texture_format(desc.format),
                    ViewDimension: D3D12_DSV_DIMENSION_TEXTURE2D,
                    Flags: D3D12_DSV_FLAG_NONE,
                    Anonymous: D3D12_DEPTH_STENCIL_VIEW_DESC_0 {
                        Texture2D: D3D12_TEX2D_DSV {
                            MipSlice: desc.range.base_mip,
                        },
                    },
                };
                unsafe {
                    self.device.CreateDepthStencilView(
                        &texture.resource,
                        Some(&view_desc),
                        slot.handle(),
                    );
                }
                slot
            }
        };
        Ok(Box::new(D3D12TextureView {
            kind: desc.kind,
            format: desc.format,
            raw_format: conv::texture_format(desc.format),
            slot,
            extent,
            resource: texture.resource.clone(),
        }))
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> Result<Box<dyn Sampler>> {
        let slot = self.cpu_sampler.allocate(1)?;
        let raw = self.sampler_desc(desc);
        unsafe {
            self.device.CreateSampler(&raw, slot.handle());
        }
        Ok(Box::new(D3D12Sampler {
            slot,
            desc: desc.clone(),
        }))
    }

    fn create_shader(&self, desc: &ShaderDescriptor<'_>) -> Result<Box<dyn Shader>> {
        Ok(Box::new(D3D12Shader::create(desc)?))
    }

    fn create_descriptor_set_layout(
        &self,
        desc: &DescriptorSetLayoutDescriptor,
    ) -> Result<Box<dyn DescriptorSetLayout>> {
        Ok(Box::new(D3D12DescriptorSetLayout::create(desc)?))
    }

    fn create_root_signature(
        &self,
        desc: &RootSignatureDescriptor<'_>,
    ) -> Result<Box<dyn RootSignature>> {
        Ok(Box::new(D3D12RootSignature::create(&self.device, desc)?))
    }

    fn create_descriptor_set(
        &self,
        layout: &dyn DescriptorSetLayout,
    ) -> Result<Box<dyn DescriptorSet>> {
        let concrete = layout
            .as_any()
            .downcast_ref::<D3D12DescriptorSetLayout>()
            .ok_or_else(|| Error::invalid("layout is not a D3D12 layout"))?;
        let inner = Arc::clone(&concrete.inner);
        // RAII ranges: a failed sampler reservation releases the resource
        // range on the way out.
        let resource_range = if inner.resource_count > 0 {
            Some(self.gpu_res.allocate(inner.resource_count)?)
        } else {
            None
        };
        let sampler_range = if inner.sampler_count > 0 {
            Some(self.gpu_sampler.allocate(inner.sampler_count)?)
        } else {
            None
        };
        Ok(Box::new(D3D12DescriptorSet {
            device: self.device.clone(),
            layout: inner,
            resource_range,
            sampler_range,
        }))
    }

    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineStateDescriptor<'_>,
    ) -> Result<Box<dyn GraphicsPipelineState>> {
        Ok(Box::new(D3D12GraphicsPipelineState::create(
            &self.device,
            desc,
        )?))
    }

    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineStateDescriptor<'_>,
    ) -> Result<Box<dyn ComputePipelineState>> {
        Ok(Box::new(D3D12ComputePipelineState::create(
            &self.device,
            desc,
        )?))
    }

    fn wait_idle(&self) -> Result<()> {
        let queues: Vec<Arc<D3D12Queue>> = self
            .queues
            .lock()
            .expect("queue cache poisoned")
            .values()
            .cloned()
            .collect();
        for q in queues {
            q.wait()?;
        }
        Ok(())
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
