//! Prism RHI: a backend-agnostic rendering hardware interface.
//!
//! One neutral surface over two explicit graphics APIs. Client code describes
//! devices, queues, command buffers, pipelines, resources and descriptor
//! bindings in neutral terms; the enabled backend (Vulkan via `ash`,
//! Direct3D 12 via `windows`) translates them into its own object model.
//!
//! All handles are trait objects created from [`Device`] factory methods.
//! Backends recover their concrete types with `as_any()` downcasts; a handle
//! can only be produced by the matching factory, so a failed downcast means
//! the caller mixed handles from two devices.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

mod error;
pub mod suballoc;

pub use error::{Error, Result};

#[cfg(feature = "vulkan")]
pub mod vulkan;

#[cfg(feature = "vulkan")]
pub use vulkan::VulkanDevice;

#[cfg(all(windows, feature = "d3d12"))]
pub mod d3d12;

#[cfg(all(windows, feature = "d3d12"))]
pub use d3d12::D3D12Device;

/// Identifies which native API a device talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Vulkan,
    D3D12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
    Compute,
    Copy,
}

/// Where a buffer's memory lives. `Device` memory cannot be mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    Device,
    Upload,
    Readback,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUse: u32 {
        const MAP_READ = 1 << 0;
        const MAP_WRITE = 1 << 1;
        const COPY_SOURCE = 1 << 2;
        const COPY_DESTINATION = 1 << 3;
        const INDEX = 1 << 4;
        const VERTEX = 1 << 5;
        const CBUFFER = 1 << 6;
        const RESOURCE = 1 << 7;
        const UNORDERED_ACCESS = 1 << 8;
        const INDIRECT = 1 << 9;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUse: u32 {
        const UNINITIALIZED = 1 << 0;
        const COPY_SOURCE = 1 << 1;
        const COPY_DESTINATION = 1 << 2;
        const RESOURCE = 1 << 3;
        const RENDER_TARGET = 1 << 4;
        const DEPTH_STENCIL_READ = 1 << 5;
        const DEPTH_STENCIL_WRITE = 1 << 6;
        const UNORDERED_ACCESS = 1 << 7;
        const PRESENT = 1 << 8;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const PIXEL = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceHint: u32 {
        /// The allocation gets its own native memory block.
        const DEDICATED = 1 << 0;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u32 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8Sint,
    R8Uint,
    R8Snorm,
    R8Unorm,
    R16Sint,
    R16Uint,
    R16Snorm,
    R16Unorm,
    R16Float,
    Rg8Sint,
    Rg8Uint,
    Rg8Snorm,
    Rg8Unorm,
    R32Sint,
    R32Uint,
    R32Float,
    Rg16Sint,
    Rg16Uint,
    Rg16Snorm,
    Rg16Unorm,
    Rg16Float,
    Rgba8Sint,
    Rgba8Uint,
    Rgba8Snorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgb10a2Unorm,
    Rg11b10Float,
    Rg32Sint,
    Rg32Uint,
    Rg32Float,
    Rgba16Sint,
    Rgba16Uint,
    Rgba16Snorm,
    Rgba16Unorm,
    Rgba16Float,
    Rgba32Sint,
    Rgba32Uint,
    Rgba32Float,
    D16Unorm,
    D32Float,
    D24UnormS8Uint,
    D32FloatS8Uint,
}

impl TextureFormat {
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D16Unorm
                | TextureFormat::D32Float
                | TextureFormat::D24UnormS8Uint
                | TextureFormat::D32FloatS8Uint
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            TextureFormat::D24UnormS8Uint | TextureFormat::D32FloatS8Uint
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    D1,
    #[default]
    D2,
    D3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureViewDimension {
    D1,
    D2,
    D2Array,
    Cube,
    CubeArray,
    D3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Uint8x4,
    Unorm8x4,
    Float16x2,
    Float16x4,
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Uint32x2,
    Uint32x3,
    Uint32x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrementClamp,
    DecrementClamp,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
    Constant,
    OneMinusConstant,
}

impl BlendFactor {
    /// D3D12 has no separate alpha factor enum; color factors are promoted
    /// to their alpha counterparts when used in the alpha channel.
    pub fn promote_to_alpha(self) -> Self {
        match self {
            BlendFactor::SrcColor => BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcColor => BlendFactor::OneMinusSrcAlpha,
            BlendFactor::DstColor => BlendFactor::DstAlpha,
            BlendFactor::OneMinusDstColor => BlendFactor::OneMinusDstAlpha,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    Repeat,
    MirrorRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadAction {
    Load,
    Clear,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreAction {
    Store,
    DontCare,
}

/// How a resource is bound to the pipeline. Drives descriptor-range type
/// selection on D3D12 and `VkDescriptorType` selection on Vulkan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    CBuffer,
    Buffer,
    RwBuffer,
    Texture,
    RwTexture,
    Sampler,
}

/// Which descriptor category a texture view occupies. Decides the CPU
/// descriptor pool it is written into on D3D12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureViewKind {
    ShaderResource,
    UnorderedAccess,
    RenderTarget,
    DepthStencil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderBlobCategory {
    Dxil,
    Spirv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexStepMode {
    #[default]
    Vertex,
    Instance,
}

/// Sentinel for "all remaining mips" in a subresource range.
pub const ALL_MIPS: u32 = u32::MAX;
/// Sentinel for "all remaining layers" in a subresource range.
pub const ALL_LAYERS: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

impl Default for SubresourceRange {
    fn default() -> Self {
        Self {
            base_mip: 0,
            mip_count: ALL_MIPS,
            base_layer: 0,
            layer_count: ALL_LAYERS,
        }
    }
}

/// Flat index of one (mip, layer, plane) slice, in D3D12 subresource order.
pub fn subresource_index(mip: u32, layer: u32, plane: u32, mip_count: u32, array_size: u32) -> u32 {
    mip + layer * mip_count + plane * mip_count * array_size
}

/// Shader stages that must be denied root access because nothing binds to
/// them. Hull/domain/geometry/amplification/mesh are never used by this
/// surface, so only vertex and pixel can earn access back.
pub fn denied_stages(used: ShaderStages) -> ShaderStages {
    ShaderStages::all() - (used & (ShaderStages::VERTEX | ShaderStages::PIXEL))
}

/// What a state transition turns into once translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierAction {
    /// No native barrier is emitted.
    Skip,
    /// Same-state unordered access requires a UAV barrier, not a transition.
    UnorderedAccess,
    Transition,
}

pub fn buffer_barrier_action(before: BufferUse, after: BufferUse) -> BarrierAction {
    if before == BufferUse::UNORDERED_ACCESS && after == BufferUse::UNORDERED_ACCESS {
        BarrierAction::UnorderedAccess
    } else if before == after {
        BarrierAction::Skip
    } else {
        BarrierAction::Transition
    }
}

pub fn texture_barrier_action(before: TextureUse, after: TextureUse) -> BarrierAction {
    if before == TextureUse::UNORDERED_ACCESS && after == TextureUse::UNORDERED_ACCESS {
        BarrierAction::UnorderedAccess
    } else if before == after {
        BarrierAction::Skip
    } else {
        BarrierAction::Transition
    }
}

#[derive(Debug, Clone, Default)]
pub struct BufferDescriptor {
    pub size: u64,
    pub memory: MemoryKind,
    pub usage: BufferUse,
    pub hints: ResourceHint,
    pub name: Option<String>,
}

impl Default for MemoryKind {
    fn default() -> Self {
        MemoryKind::Device
    }
}

impl Default for BufferUse {
    fn default() -> Self {
        BufferUse::empty()
    }
}

impl Default for TextureUse {
    fn default() -> Self {
        TextureUse::empty()
    }
}

impl Default for ResourceHint {
    fn default() -> Self {
        ResourceHint::empty()
    }
}

#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub dim: TextureDimension,
    pub width: u32,
    pub height: u32,
    /// Depth for 3D textures, array size otherwise.
    pub depth_or_array: u32,
    pub mip_levels: u32,
    pub sample_count: u32,
    pub format: TextureFormat,
    pub usage: TextureUse,
    pub name: Option<String>,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            dim: TextureDimension::D2,
            width: 1,
            height: 1,
            depth_or_array: 1,
            mip_levels: 1,
            sample_count: 1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUse::empty(),
            name: None,
        }
    }
}

impl TextureDescriptor {
    /// Cube compatibility is inferred, never requested explicitly.
    pub fn is_cube_compatible(&self) -> bool {
        self.dim == TextureDimension::D2
            && self.depth_or_array % 6 == 0
            && self.sample_count == 1
            && self.width == self.height
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BufferViewDescriptor<'a> {
    pub buffer: &'a dyn Buffer,
    pub kind: ResourceKind,
    pub offset: u64,
    pub size: u64,
    /// Element stride for shader-resource and unordered-access views.
    /// Constant-buffer views ignore it.
    pub stride: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct TextureViewDescriptor<'a> {
    pub texture: &'a dyn Texture,
    pub kind: TextureViewKind,
    pub format: TextureFormat,
    pub dim: TextureViewDimension,
    pub range: SubresourceRange,
}

#[derive(Debug, Clone)]
pub struct SamplerDescriptor {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub mip_filter: FilterMode,
    pub address_s: AddressMode,
    pub address_t: AddressMode,
    pub address_r: AddressMode,
    pub lod_min: f32,
    pub lod_max: f32,
    pub anisotropy_clamp: u32,
    pub compare: Option<CompareOp>,
    pub name: Option<String>,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            mip_filter: FilterMode::Linear,
            address_s: AddressMode::Repeat,
            address_t: AddressMode::Repeat,
            address_r: AddressMode::Repeat,
            lod_min: 0.0,
            lod_max: f32::MAX,
            anisotropy_clamp: 1,
            compare: None,
            name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShaderDescriptor<'a> {
    pub category: ShaderBlobCategory,
    pub bytes: &'a [u8],
    pub entry_point: &'a str,
    pub stage: ShaderStages,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DescriptorSetElement {
    pub slot: u32,
    pub space: u32,
    pub kind: ResourceKind,
    pub count: u32,
    pub stages: ShaderStages,
    /// Non-empty turns a sampler element into interned static samplers,
    /// owned by the layout. Length must equal `count`.
    pub static_samplers: Vec<SamplerDescriptor>,
}

impl DescriptorSetElement {
    pub fn new(slot: u32, kind: ResourceKind, count: u32, stages: ShaderStages) -> Self {
        Self {
            slot,
            space: 0,
            kind,
            count,
            stages,
            static_samplers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorSetLayoutDescriptor {
    pub elements: Vec<DescriptorSetElement>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct RootConstant {
    /// Byte size; must be a multiple of 4.
    pub size: u32,
    pub slot: u32,
    pub space: u32,
    pub stages: ShaderStages,
}

/// Direct root CBV/SRV/UAV with no intermediary heap slot. D3D12 only.
#[derive(Debug, Clone, Copy)]
pub struct RootDescriptor {
    pub kind: ResourceKind,
    pub slot: u32,
    pub space: u32,
    pub stages: ShaderStages,
}

pub struct RootSignatureDescriptor<'a> {
    pub constant: Option<RootConstant>,
    pub root_descriptors: &'a [RootDescriptor],
    pub sets: &'a [&'a dyn DescriptorSetLayout],
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VertexElement {
    pub semantic: String,
    pub semantic_index: u32,
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct VertexBufferLayout {
    pub stride: u32,
    pub step_mode: VertexStepMode,
    pub elements: Vec<VertexElement>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveState {
    pub topology: PrimitiveTopology,
    pub polygon_mode: PolygonMode,
    pub cull: CullMode,
    pub front_face: FrontFace,
}

#[derive(Debug, Clone, Copy)]
pub struct StencilFaceState {
    pub compare: CompareOp,
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            compare: CompareOp::Always,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub stencil_test: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front: StencilFaceState,
    pub back: StencilFaceState,
}

#[derive(Debug, Clone, Copy)]
pub struct BlendComponent {
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub op: BlendOp,
}

#[derive(Debug, Clone)]
pub struct ColorTargetState {
    pub format: TextureFormat,
    pub blend: Option<(BlendComponent, BlendComponent)>,
    pub write_mask: ColorWriteMask,
}

pub struct GraphicsPipelineStateDescriptor<'a> {
    pub vs: &'a dyn Shader,
    pub ps: Option<&'a dyn Shader>,
    pub root_signature: &'a dyn RootSignature,
    pub vertex_layouts: Vec<VertexBufferLayout>,
    pub primitive: PrimitiveState,
    pub depth_stencil: Option<DepthStencilState>,
    pub color_targets: Vec<ColorTargetState>,
    pub sample_count: u32,
    pub name: Option<String>,
}

pub struct ComputePipelineStateDescriptor<'a> {
    pub cs: &'a dyn Shader,
    pub root_signature: &'a dyn RootSignature,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ColorClear {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

pub struct ColorAttachment<'a> {
    pub view: &'a dyn TextureView,
    pub load: LoadAction,
    pub store: StoreAction,
    pub clear: ColorClear,
}

pub struct DepthStencilAttachment<'a> {
    pub view: &'a dyn TextureView,
    pub depth_load: LoadAction,
    pub depth_store: StoreAction,
    pub stencil_load: LoadAction,
    pub stencil_store: StoreAction,
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

pub struct RenderPassDescriptor<'a> {
    pub colors: Vec<ColorAttachment<'a>>,
    pub depth_stencil: Option<DepthStencilAttachment<'a>>,
    pub name: Option<String>,
}

/// Ownership-transfer direction for a cross-queue barrier.
#[derive(Debug, Clone, Copy)]
pub struct QueueTransfer {
    pub other: QueueType,
    /// True when the resource arrives from the other queue, false when it
    /// leaves for it.
    pub incoming: bool,
}

pub struct BufferBarrier<'a> {
    pub buffer: &'a dyn Buffer,
    pub before: BufferUse,
    pub after: BufferUse,
    pub queue_transfer: Option<QueueTransfer>,
}

pub struct TextureBarrier<'a> {
    pub texture: &'a dyn Texture,
    pub before: TextureUse,
    pub after: TextureUse,
    /// None transitions every subresource.
    pub subresource: Option<SubresourceRange>,
    pub queue_transfer: Option<QueueTransfer>,
}

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

pub struct VertexBufferView<'a> {
    pub buffer: &'a dyn Buffer,
    pub offset: u64,
}

pub struct IndexBufferView<'a> {
    pub buffer: &'a dyn Buffer,
    pub offset: u64,
    /// Index width in bytes: 1 (D3D12 only), 2 or 4.
    pub stride: u32,
}

/// One resource bound into a descriptor set slot.
pub enum ResourceViewRef<'a> {
    Buffer(&'a dyn BufferView),
    Texture(&'a dyn TextureView),
    Sampler(&'a dyn Sampler),
}

pub struct CommandQueueSubmitDescriptor<'a> {
    pub command_buffers: &'a [&'a dyn CommandBuffer],
    pub wait_semaphores: &'a [&'a dyn Semaphore],
    pub signal_semaphores: &'a [&'a dyn Semaphore],
    pub signal_fence: Option<&'a dyn Fence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    Complete,
    Incomplete,
    NotSubmitted,
}

/// Feature/limits record resolved at device creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceFeatures {
    pub timeline_semaphore: bool,
    pub inline_uniform_block: bool,
    pub buffer_device_address: bool,
    pub sampler_anisotropy: bool,
}

#[cfg(feature = "window")]
#[derive(Debug, Clone)]
pub struct SwapChainDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub back_buffer_count: u32,
    pub enable_sync: bool,
}

/// The top-level handle. Owns the native device, the device-memory
/// allocator, all descriptor pools/heaps and the per-type queue slots.
/// Must outlive every object it creates.
pub trait Device: Send + Sync + Debug {
    fn backend(&self) -> Backend;

    fn features(&self) -> DeviceFeatures;

    /// Queues are created lazily and cached; repeated calls for the same
    /// type return the same queue.
    fn queue(&self, ty: QueueType) -> Result<Arc<dyn Queue>>;

    fn create_command_buffer(&self, ty: QueueType) -> Result<Box<dyn CommandBuffer>>;

    fn create_fence(&self) -> Result<Box<dyn Fence>>;

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>>;

    fn create_timeline_semaphore(&self, initial_value: u64) -> Result<Box<dyn TimelineSemaphore>>;

    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<Box<dyn Buffer>>;

    fn create_buffer_view(&self, desc: &BufferViewDescriptor<'_>) -> Result<Box<dyn BufferView>>;

    fn create_texture(&self, desc: &TextureDescriptor) -> Result<Box<dyn Texture>>;

    fn create_texture_view(&self, desc: &TextureViewDescriptor<'_>) -> Result<Box<dyn TextureView>>;

    fn create_sampler(&self, desc: &SamplerDescriptor) -> Result<Box<dyn Sampler>>;

    fn create_shader(&self, desc: &ShaderDescriptor<'_>) -> Result<Box<dyn Shader>>;

    fn create_descriptor_set_layout(
        &self,
        desc: &DescriptorSetLayoutDescriptor,
    ) -> Result<Box<dyn DescriptorSetLayout>>;

    fn create_root_signature(
        &self,
        desc: &RootSignatureDescriptor<'_>,
    ) -> Result<Box<dyn RootSignature>>;

    /// The set cannot outlive its layout; backends hold a shared reference
    /// to the layout internals to enforce it.
    fn create_descriptor_set(&self, layout: &dyn DescriptorSetLayout)
        -> Result<Box<dyn DescriptorSet>>;

    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineStateDescriptor<'_>,
    ) -> Result<Box<dyn GraphicsPipelineState>>;

    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineStateDescriptor<'_>,
    ) -> Result<Box<dyn ComputePipelineState>>;

    fn wait_idle(&self) -> Result<()>;

    #[cfg(feature = "window")]
    fn create_swap_chain(
        &self,
        desc: &SwapChainDescriptor,
        window: &dyn raw_window_handle::HasWindowHandle,
    ) -> Result<Box<dyn SwapChain>>;

    fn as_any(&self) -> &dyn Any;
}

pub trait Queue: Send + Sync + Debug {
    fn queue_type(&self) -> QueueType;

    /// Packs waits, command buffers and signals into one native submission
    /// and advances the queue's internal fence.
    fn submit(&self, desc: &CommandQueueSubmitDescriptor<'_>) -> Result<()>;

    /// Blocks until every prior submission on this queue has completed.
    fn wait(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// A recordable unit bound to one queue type. `begin` resets the owned
/// allocator/pool, so recording the same buffer twice is a fresh start.
pub trait CommandBuffer: Debug {
    fn begin(&mut self) -> Result<()>;

    fn end(&mut self) -> Result<()>;

    /// Translates and batches both slices into one native barrier call.
    /// Entries with equal before/after states are dropped.
    fn resource_barrier(&mut self, buffers: &[BufferBarrier<'_>], textures: &[TextureBarrier<'_>]);

    /// Enhanced-barrier surface. No backend implements it yet; logs and
    /// no-ops.
    fn transition_resource(&mut self, buffers: &[BufferBarrier<'_>], textures: &[TextureBarrier<'_>]);

    fn begin_render_pass(
        &mut self,
        desc: &RenderPassDescriptor<'_>,
    ) -> Result<Box<dyn RenderPassEncoder>>;

    /// The encoder must come from this command buffer's `begin_render_pass`.
    fn end_render_pass(&mut self, encoder: Box<dyn RenderPassEncoder>);

    fn begin_compute_pass(&mut self) -> Result<Box<dyn ComputePassEncoder>>;

    fn end_compute_pass(&mut self, encoder: Box<dyn ComputePassEncoder>);

    fn copy_buffer_to_buffer(
        &mut self,
        dst: &dyn Buffer,
        dst_offset: u64,
        src: &dyn Buffer,
        src_offset: u64,
        size: u64,
    );

    fn copy_buffer_to_texture(
        &mut self,
        dst: &dyn Texture,
        dst_range: SubresourceRange,
        src: &dyn Buffer,
        src_offset: u64,
    );

    fn as_any(&self) -> &dyn Any;
}

/// Ephemeral recording scope between `begin_render_pass` and
/// `end_render_pass`. At most one is active per command buffer.
pub trait RenderPassEncoder: Debug {
    fn set_viewport(&mut self, viewport: Viewport);

    fn set_scissor(&mut self, rect: ScissorRect);

    fn bind_root_signature(&mut self, root_signature: &dyn RootSignature);

    fn bind_graphics_pipeline(&mut self, pipeline: &dyn GraphicsPipelineState);

    /// May be called before the pipeline is bound; strides come from the
    /// pipeline, so the views are stashed and replayed at pipeline bind.
    fn bind_vertex_buffers(&mut self, views: &[VertexBufferView<'_>]);

    fn bind_index_buffer(&mut self, view: IndexBufferView<'_>);

    /// `data.len()` must be a multiple of 4 and at most the declared
    /// root-constant size.
    fn push_constants(&mut self, data: &[u8]);

    /// D3D12 only; binds a buffer view directly as a root parameter.
    fn bind_root_descriptor(&mut self, slot: u32, view: &dyn BufferView);

    fn bind_descriptor_set(&mut self, slot: u32, set: &dyn DescriptorSet);

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub trait ComputePassEncoder: Debug {
    fn bind_root_signature(&mut self, root_signature: &dyn RootSignature);

    fn bind_compute_pipeline(&mut self, pipeline: &dyn ComputePipelineState);

    fn bind_descriptor_set(&mut self, slot: u32, set: &dyn DescriptorSet);

    fn push_constants(&mut self, data: &[u8]);

    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub trait Buffer: Debug {
    fn size(&self) -> u64;

    fn usage(&self) -> BufferUse;

    fn memory_kind(&self) -> MemoryKind;

    /// Maps `[offset, offset + size)`. Requires non-device memory and a
    /// MapRead/MapWrite usage bit.
    fn map(&self, offset: u64, size: u64) -> Result<*mut u8>;

    fn unmap(&self);

    fn as_any(&self) -> &dyn Any;
}

pub trait Texture: Debug {
    fn descriptor(&self) -> &TextureDescriptor;

    fn as_any(&self) -> &dyn Any;
}

/// Views reference their parent resource without owning it; the caller
/// keeps the parent alive for as long as the view exists.
pub trait BufferView: Debug {
    fn kind(&self) -> ResourceKind;

    fn as_any(&self) -> &dyn Any;
}

pub trait TextureView: Debug {
    fn kind(&self) -> TextureViewKind;

    fn format(&self) -> TextureFormat;

    fn as_any(&self) -> &dyn Any;
}

pub trait Sampler: Debug {
    fn as_any(&self) -> &dyn Any;
}

pub trait Shader: Debug {
    fn stage(&self) -> ShaderStages;

    fn entry_point(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

pub trait DescriptorSetLayout: Debug {
    fn elements(&self) -> &[DescriptorSetElement];

    fn as_any(&self) -> &dyn Any;
}

pub trait DescriptorSet: Debug {
    /// Writes `views` into consecutive slots starting at element `start`.
    fn set_resources(&mut self, start: u32, views: &[ResourceViewRef<'_>]) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

pub trait RootSignature: Debug {
    fn root_constant(&self) -> Option<RootConstant>;

    fn root_descriptors(&self) -> &[RootDescriptor];

    /// Union of every element's stage mask, computed at creation.
    fn used_stages(&self) -> ShaderStages;

    fn as_any(&self) -> &dyn Any;
}

pub trait GraphicsPipelineState: Debug {
    fn as_any(&self) -> &dyn Any;
}

pub trait ComputePipelineState: Debug {
    fn as_any(&self) -> &dyn Any;
}

pub trait Fence: Send + Sync + Debug {
    /// Blocks until the last submission that signalled this fence
    /// completes. Returns immediately if the fence was never submitted.
    fn wait(&self) -> Result<()>;

    fn status(&self) -> FenceStatus;

    fn as_any(&self) -> &dyn Any;
}

pub trait Semaphore: Send + Sync + Debug {
    fn as_any(&self) -> &dyn Any;
}

pub trait TimelineSemaphore: Send + Sync + Debug {
    fn completed_value(&self) -> Result<u64>;

    fn wait(&self, value: u64) -> Result<()>;

    fn signal(&self, value: u64) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

#[cfg(feature = "window")]
pub trait SwapChain: Debug {
    /// Acquires the next back buffer, signalling the given primitives when
    /// it is ready. Returns the back-buffer index.
    fn acquire_next(
        &mut self,
        signal_semaphore: Option<&dyn Semaphore>,
        signal_fence: Option<&dyn Fence>,
    ) -> Result<u32>;

    fn back_buffer(&self, index: u32) -> &dyn Texture;

    fn back_buffer_count(&self) -> u32;

    fn format(&self) -> TextureFormat;

    fn present(&mut self, index: u32, wait_semaphores: &[&dyn Semaphore]) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subresource_index_formula() {
        // mip + layer*mips + plane*mips*layers over a 4-mip, 3-layer image
        assert_eq!(subresource_index(0, 0, 0, 4, 3), 0);
        assert_eq!(subresource_index(2, 0, 0, 4, 3), 2);
        assert_eq!(subresource_index(0, 1, 0, 4, 3), 4);
        assert_eq!(subresource_index(3, 2, 0, 4, 3), 11);
        assert_eq!(subresource_index(1, 1, 1, 4, 3), 17);
    }

    #[test]
    fn denied_stages_complements_used() {
        let used = ShaderStages::PIXEL;
        let denied = denied_stages(used);
        assert!(!denied.contains(ShaderStages::PIXEL));
        assert!(denied.contains(ShaderStages::VERTEX));
        // compute has no root-access flag to earn back
        assert!(denied.contains(ShaderStages::COMPUTE));

        let both = ShaderStages::VERTEX | ShaderStages::PIXEL;
        assert_eq!(denied_stages(both), ShaderStages::COMPUTE);
    }

    #[test]
    fn same_state_barrier_is_dropped() {
        assert_eq!(
            texture_barrier_action(TextureUse::PRESENT, TextureUse::PRESENT),
            BarrierAction::Skip
        );
        assert_eq!(
            buffer_barrier_action(BufferUse::VERTEX, BufferUse::VERTEX),
            BarrierAction::Skip
        );
    }

    #[test]
    fn uav_to_uav_is_a_uav_barrier() {
        assert_eq!(
            texture_barrier_action(TextureUse::UNORDERED_ACCESS, TextureUse::UNORDERED_ACCESS),
            BarrierAction::UnorderedAccess
        );
        assert_eq!(
            buffer_barrier_action(BufferUse::UNORDERED_ACCESS, BufferUse::UNORDERED_ACCESS),
            BarrierAction::UnorderedAccess
        );
    }

    #[test]
    fn distinct_states_transition() {
        assert_eq!(
            texture_barrier_action(TextureUse::PRESENT, TextureUse::RENDER_TARGET),
            BarrierAction::Transition
        );
    }

    #[test]
    fn depth_format_classification() {
        assert!(TextureFormat::D32Float.is_depth());
        assert!(!TextureFormat::D32Float.has_stencil());
        assert!(TextureFormat::D24UnormS8Uint.has_stencil());
        assert!(!TextureFormat::Bgra8Unorm.is_depth());
    }

    #[test]
    fn cube_compatibility_inference() {
        let mut desc = TextureDescriptor {
            width: 64,
            height: 64,
            depth_or_array: 6,
            ..Default::default()
        };
        assert!(desc.is_cube_compatible());
        desc.depth_or_array = 5;
        assert!(!desc.is_cube_compatible());
        desc.depth_or_array = 12;
        assert!(desc.is_cube_compatible());
        desc.sample_count = 4;
        assert!(!desc.is_cube_compatible());
    }

    #[test]
    fn alpha_promotion() {
        assert_eq!(
            BlendFactor::SrcColor.promote_to_alpha(),
            BlendFactor::SrcAlpha
        );
        assert_eq!(BlendFactor::One.promote_to_alpha(), BlendFactor::One);
    }
}
