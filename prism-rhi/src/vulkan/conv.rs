//! Neutral enum and flag translation for the Vulkan backend. Everything in
//! here is a pure function over plain values.

use ash::vk;

use crate::{
    AddressMode, BlendFactor, BlendOp, BufferUse, ColorWriteMask, CompareOp, CullMode, FilterMode,
    FrontFace, LoadAction, MemoryKind, PolygonMode, PrimitiveTopology, QueueType, ResourceKind,
    ShaderStages, StencilOp, StoreAction, TextureDimension, TextureFormat, TextureUse,
    TextureViewDimension, VertexFormat, VertexStepMode, ALL_LAYERS, ALL_MIPS,
};

pub fn queue_flags(ty: QueueType) -> vk::QueueFlags {
    match ty {
        QueueType::Graphics => vk::QueueFlags::GRAPHICS,
        QueueType::Compute => vk::QueueFlags::COMPUTE,
        QueueType::Copy => vk::QueueFlags::TRANSFER,
    }
}

pub fn shader_stages(s: ShaderStages) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if s.contains(ShaderStages::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if s.contains(ShaderStages::PIXEL) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    if s.contains(ShaderStages::COMPUTE) {
        flags |= vk::ShaderStageFlags::COMPUTE;
    }
    flags
}

pub fn texture_format(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8Sint => vk::Format::R8_SINT,
        TextureFormat::R8Uint => vk::Format::R8_UINT,
        TextureFormat::R8Snorm => vk::Format::R8_SNORM,
        TextureFormat::R8Unorm => vk::Format::R8_UNORM,
        TextureFormat::R16Sint => vk::Format::R16_SINT,
        TextureFormat::R16Uint => vk::Format::R16_UINT,
        TextureFormat::R16Snorm => vk::Format::R16_SNORM,
        TextureFormat::R16Unorm => vk::Format::R16_UNORM,
        TextureFormat::R16Float => vk::Format::R16_SFLOAT,
        TextureFormat::Rg8Sint => vk::Format::R8G8_SINT,
        TextureFormat::Rg8Uint => vk::Format::R8G8_UINT,
        TextureFormat::Rg8Snorm => vk::Format::R8G8_SNORM,
        TextureFormat::Rg8Unorm => vk::Format::R8G8_UNORM,
        TextureFormat::R32Sint => vk::Format::R32_SINT,
        TextureFormat::R32Uint => vk::Format::R32_UINT,
        TextureFormat::R32Float => vk::Format::R32_SFLOAT,
        TextureFormat::Rg16Sint => vk::Format::R16G16_SINT,
        TextureFormat::Rg16Uint => vk::Format::R16G16_UINT,
        TextureFormat::Rg16Snorm => vk::Format::R16G16_SNORM,
        TextureFormat::Rg16Unorm => vk::Format::R16G16_UNORM,
        TextureFormat::Rg16Float => vk::Format::R16G16_SFLOAT,
        TextureFormat::Rgba8Sint => vk::Format::R8G8B8A8_SINT,
        TextureFormat::Rgba8Uint => vk::Format::R8G8B8A8_UINT,
        TextureFormat::Rgba8Snorm => vk::Format::R8G8B8A8_SNORM,
        TextureFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::Rgba8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::Bgra8UnormSrgb => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::Rgb10a2Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        TextureFormat::Rg11b10Float => vk::Format::B10G11R11_UFLOAT_PACK32,
        TextureFormat::Rg32Sint => vk::Format::R32G32_SINT,
        TextureFormat::Rg32Uint => vk::Format::R32G32_UINT,
        TextureFormat::Rg32Float => vk::Format::R32G32_SFLOAT,
        TextureFormat::Rgba16Sint => vk::Format::R16G16B16A16_SINT,
        TextureFormat::Rgba16Uint => vk::Format::R16G16B16A16_UINT,
        TextureFormat::Rgba16Snorm => vk::Format::R16G16B16A16_SNORM,
        TextureFormat::Rgba16Unorm => vk::Format::R16G16B16A16_UNORM,
        TextureFormat::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::Rgba32Sint => vk::Format::R32G32B32A32_SINT,
        TextureFormat::Rgba32Uint => vk::Format::R32G32B32A32_UINT,
        TextureFormat::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::D16Unorm => vk::Format::D16_UNORM,
        TextureFormat::D32Float => vk::Format::D32_SFLOAT,
        TextureFormat::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        TextureFormat::D32FloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

pub fn format_aspect(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.is_depth() {
        if format.has_stencil() {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        } else {
            vk::ImageAspectFlags::DEPTH
        }
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

pub fn vertex_format(format: VertexFormat) -> vk::Format {
    match format {
        VertexFormat::Uint8x4 => vk::Format::R8G8B8A8_UINT,
        VertexFormat::Unorm8x4 => vk::Format::R8G8B8A8_UNORM,
        VertexFormat::Float16x2 => vk::Format::R16G16_SFLOAT,
        VertexFormat::Float16x4 => vk::Format::R16G16B16A16_SFLOAT,
        VertexFormat::Float32 => vk::Format::R32_SFLOAT,
        VertexFormat::Float32x2 => vk::Format::R32G32_SFLOAT,
        VertexFormat::Float32x3 => vk::Format::R32G32B32_SFLOAT,
        VertexFormat::Float32x4 => vk::Format::R32G32B32A32_SFLOAT,
        VertexFormat::Uint32 => vk::Format::R32_UINT,
        VertexFormat::Uint32x2 => vk::Format::R32G32_UINT,
        VertexFormat::Uint32x3 => vk::Format::R32G32B32_UINT,
        VertexFormat::Uint32x4 => vk::Format::R32G32B32A32_UINT,
        VertexFormat::Sint32 => vk::Format::R32_SINT,
        VertexFormat::Sint32x2 => vk::Format::R32G32_SINT,
        VertexFormat::Sint32x3 => vk::Format::R32G32B32_SINT,
        VertexFormat::Sint32x4 => vk::Format::R32G32B32A32_SINT,
    }
}

pub fn primitive_topology(t: PrimitiveTopology) -> vk::PrimitiveTopology {
    match t {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
    }
}

pub fn polygon_mode(p: PolygonMode) -> vk::PolygonMode {
    match p {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub fn cull_mode(c: CullMode) -> vk::CullModeFlags {
    match c {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub fn front_face(f: FrontFace) -> vk::FrontFace {
    match f {
        FrontFace::Ccw => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Cw => vk::FrontFace::CLOCKWISE,
    }
}

pub fn compare_op(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub fn stencil_op(op: StencilOp) -> vk::StencilOp {
    match op {
        StencilOp::Keep => vk::StencilOp::KEEP,
        StencilOp::Zero => vk::StencilOp::ZERO,
        StencilOp::Replace => vk::StencilOp::REPLACE,
        StencilOp::IncrementClamp => vk::StencilOp::INCREMENT_AND_CLAMP,
        StencilOp::DecrementClamp => vk::StencilOp::DECREMENT_AND_CLAMP,
        StencilOp::Invert => vk::StencilOp::INVERT,
        StencilOp::IncrementWrap => vk::StencilOp::INCREMENT_AND_WRAP,
        StencilOp::DecrementWrap => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

pub fn blend_factor(f: BlendFactor) -> vk::BlendFactor {
    match f {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcColor => vk::BlendFactor::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstColor => vk::BlendFactor::DST_COLOR,
        BlendFactor::OneMinusDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        BlendFactor::Constant => vk::BlendFactor::CONSTANT_COLOR,
        BlendFactor::OneMinusConstant => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
    }
}

pub fn blend_op(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
        BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        BlendOp::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendOp::Min => vk::BlendOp::MIN,
        BlendOp::Max => vk::BlendOp::MAX,
    }
}

pub fn color_write_mask(mask: ColorWriteMask) -> vk::ColorComponentFlags {
    let mut flags = vk::ColorComponentFlags::empty();
    if mask.contains(ColorWriteMask::RED) {
        flags |= vk::ColorComponentFlags::R;
    }
    if mask.contains(ColorWriteMask::GREEN) {
        flags |= vk::ColorComponentFlags::G;
    }
    if mask.contains(ColorWriteMask::BLUE) {
        flags |= vk::ColorComponentFlags::B;
    }
    if mask.contains(ColorWriteMask::ALPHA) {
        flags |= vk::ColorComponentFlags::A;
    }
    flags
}

pub fn filter(f: FilterMode) -> vk::Filter {
    match f {
        FilterMode::Nearest => vk::Filter::NEAREST,
        FilterMode::Linear => vk::Filter::LINEAR,
    }
}

pub fn mipmap_mode(f: FilterMode) -> vk::SamplerMipmapMode {
    match f {
        FilterMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        FilterMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn address_mode(a: AddressMode) -> vk::SamplerAddressMode {
    match a {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirrorRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

pub fn load_action(a: LoadAction) -> vk::AttachmentLoadOp {
    match a {
        LoadAction::Load => vk::AttachmentLoadOp::LOAD,
        LoadAction::Clear => vk::AttachmentLoadOp::CLEAR,
        LoadAction::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub fn store_action(a: StoreAction) -> vk::AttachmentStoreOp {
    match a {
        StoreAction::Store => vk::AttachmentStoreOp::STORE,
        StoreAction::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

pub fn descriptor_type(kind: ResourceKind) -> vk::DescriptorType {
    match kind {
        ResourceKind::CBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        ResourceKind::Buffer | ResourceKind::RwBuffer => vk::DescriptorType::STORAGE_BUFFER,
        ResourceKind::Texture => vk::DescriptorType::SAMPLED_IMAGE,
        ResourceKind::RwTexture => vk::DescriptorType::STORAGE_IMAGE,
        ResourceKind::Sampler => vk::DescriptorType::SAMPLER,
    }
}

pub fn image_type(dim: TextureDimension) -> vk::ImageType {
    match dim {
        TextureDimension::D1 => vk::ImageType::TYPE_1D,
        TextureDimension::D2 => vk::ImageType::TYPE_2D,
        TextureDimension::D3 => vk::ImageType::TYPE_3D,
    }
}

pub fn image_view_type(dim: TextureViewDimension) -> vk::ImageViewType {
    match dim {
        TextureViewDimension::D1 => vk::ImageViewType::TYPE_1D,
        TextureViewDimension::D2 => vk::ImageViewType::TYPE_2D,
        TextureViewDimension::D2Array => vk::ImageViewType::TYPE_2D_ARRAY,
        TextureViewDimension::Cube => vk::ImageViewType::CUBE,
        TextureViewDimension::CubeArray => vk::ImageViewType::CUBE_ARRAY,
        TextureViewDimension::D3 => vk::ImageViewType::TYPE_3D,
    }
}

pub fn sample_count(samples: u32) -> vk::SampleCountFlags {
    match samples {
        1 => vk::SampleCountFlags::TYPE_1,
        2 => vk::SampleCountFlags::TYPE_2,
        4 => vk::SampleCountFlags::TYPE_4,
        8 => vk::SampleCountFlags::TYPE_8,
        16 => vk::SampleCountFlags::TYPE_16,
        _ => vk::SampleCountFlags::TYPE_1,
    }
}

pub fn vertex_step_mode(mode: VertexStepMode) -> vk::VertexInputRate {
    match mode {
        VertexStepMode::Vertex => vk::VertexInputRate::VERTEX,
        VertexStepMode::Instance => vk::VertexInputRate::INSTANCE,
    }
}

pub fn buffer_usage(usage: BufferUse) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUse::COPY_SOURCE) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUse::COPY_DESTINATION) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(BufferUse::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUse::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUse::CBUFFER) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUse::RESOURCE) || usage.contains(BufferUse::UNORDERED_ACCESS) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUse::INDIRECT) {
        flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    flags
}

pub fn image_usage(usage: TextureUse, format: TextureFormat) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(TextureUse::COPY_SOURCE) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(TextureUse::COPY_DESTINATION) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(TextureUse::RESOURCE) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(TextureUse::RENDER_TARGET) || usage.contains(TextureUse::PRESENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(TextureUse::DEPTH_STENCIL_READ)
        || usage.contains(TextureUse::DEPTH_STENCIL_WRITE)
    {
        debug_assert!(format.is_depth());
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(TextureUse::UNORDERED_ACCESS) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    flags
}

pub fn memory_location(kind: MemoryKind) -> gpu_allocator::MemoryLocation {
    match kind {
        MemoryKind::Device => gpu_allocator::MemoryLocation::GpuOnly,
        MemoryKind::Upload => gpu_allocator::MemoryLocation::CpuToGpu,
        MemoryKind::Readback => gpu_allocator::MemoryLocation::GpuToCpu,
    }
}

pub fn buffer_use_access(usage: BufferUse) -> vk::AccessFlags {
    let mut access = vk::AccessFlags::empty();
    if usage.contains(BufferUse::MAP_READ) {
        access |= vk::AccessFlags::HOST_READ;
    }
    if usage.contains(BufferUse::MAP_WRITE) {
        access |= vk::AccessFlags::HOST_WRITE;
    }
    if usage.contains(BufferUse::COPY_SOURCE) {
        access |= vk::AccessFlags::TRANSFER_READ;
    }
    if usage.contains(BufferUse::COPY_DESTINATION) {
        access |= vk::AccessFlags::TRANSFER_WRITE;
    }
    if usage.contains(BufferUse::INDEX) {
        access |= vk::AccessFlags::INDEX_READ;
    }
    if usage.contains(BufferUse::VERTEX) {
        access |= vk::AccessFlags::VERTEX_ATTRIBUTE_READ;
    }
    if usage.contains(BufferUse::CBUFFER) {
        access |= vk::AccessFlags::UNIFORM_READ;
    }
    if usage.contains(BufferUse::RESOURCE) {
        access |= vk::AccessFlags::SHADER_READ;
    }
    if usage.contains(BufferUse::UNORDERED_ACCESS) {
        access |= vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE;
    }
    if usage.contains(BufferUse::INDIRECT) {
        access |= vk::AccessFlags::INDIRECT_COMMAND_READ;
    }
    access
}

pub fn buffer_use_stages(usage: BufferUse) -> vk::PipelineStageFlags {
    let mut stage = vk::PipelineStageFlags::empty();
    if usage.intersects(BufferUse::MAP_READ | BufferUse::MAP_WRITE) {
        stage |= vk::PipelineStageFlags::HOST;
    }
    if usage.intersects(BufferUse::COPY_SOURCE | BufferUse::COPY_DESTINATION) {
        stage |= vk::PipelineStageFlags::TRANSFER;
    }
    if usage.intersects(BufferUse::INDEX | BufferUse::VERTEX) {
        stage |= vk::PipelineStageFlags::VERTEX_INPUT;
    }
    if usage.intersects(BufferUse::CBUFFER | BufferUse::RESOURCE | BufferUse::UNORDERED_ACCESS) {
        stage |= vk::PipelineStageFlags::VERTEX_SHADER
            | vk::PipelineStageFlags::FRAGMENT_SHADER
            | vk::PipelineStageFlags::COMPUTE_SHADER;
    }
    if usage.contains(BufferUse::INDIRECT) {
        stage |= vk::PipelineStageFlags::DRAW_INDIRECT;
    }
    stage
}

pub fn texture_use_access(usage: TextureUse) -> vk::AccessFlags {
    let mut access = vk::AccessFlags::empty();
    if usage.contains(TextureUse::COPY_SOURCE) {
        access |= vk::AccessFlags::TRANSFER_READ;
    }
    if usage.contains(TextureUse::COPY_DESTINATION) {
        access |= vk::AccessFlags::TRANSFER_WRITE;
    }
    if usage.contains(TextureUse::RESOURCE) {
        access |= vk::AccessFlags::SHADER_READ;
    }
    if usage.contains(TextureUse::RENDER_TARGET) {
        access |= vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE;
    }
    if usage.contains(TextureUse::DEPTH_STENCIL_READ) {
        access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ;
    }
    if usage.contains(TextureUse::DEPTH_STENCIL_WRITE) {
        access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    }
    if usage.contains(TextureUse::UNORDERED_ACCESS) {
        access |= vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE;
    }
    access
}

/// Pipeline stages reached by a texture state. Present and Uninitialized
/// differ between the source and destination side of a barrier.
pub fn texture_use_stages(usage: TextureUse, is_src: bool) -> vk::PipelineStageFlags {
    let mut stage = vk::PipelineStageFlags::empty();
    if usage.intersects(TextureUse::COPY_SOURCE | TextureUse::COPY_DESTINATION) {
        stage |= vk::PipelineStageFlags::TRANSFER;
    }
    if usage.contains(TextureUse::RESOURCE) {
        stage |= vk::PipelineStageFlags::VERTEX_SHADER
            | vk::PipelineStageFlags::FRAGMENT_SHADER
            | vk::PipelineStageFlags::COMPUTE_SHADER;
    }
    if usage.contains(TextureUse::RENDER_TARGET) {
        stage |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    }
    if usage.intersects(TextureUse::DEPTH_STENCIL_READ | TextureUse::DEPTH_STENCIL_WRITE) {
        stage |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    }
    if usage.contains(TextureUse::UNORDERED_ACCESS) {
        stage |= vk::PipelineStageFlags::VERTEX_SHADER
            | vk::PipelineStageFlags::FRAGMENT_SHADER
            | vk::PipelineStageFlags::COMPUTE_SHADER;
    }
    if usage.contains(TextureUse::PRESENT) {
        stage |= if is_src {
            vk::PipelineStageFlags::ALL_COMMANDS
        } else {
            vk::PipelineStageFlags::BOTTOM_OF_PIPE
        };
    }
    if (usage.contains(TextureUse::UNINITIALIZED) || usage.is_empty()) && is_src {
        stage |= vk::PipelineStageFlags::TOP_OF_PIPE;
    }
    stage
}

pub fn texture_use_layout(usage: TextureUse) -> vk::ImageLayout {
    match usage {
        TextureUse::PRESENT => vk::ImageLayout::PRESENT_SRC_KHR,
        TextureUse::COPY_SOURCE => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        TextureUse::COPY_DESTINATION => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        TextureUse::RENDER_TARGET => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        TextureUse::DEPTH_STENCIL_READ => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        TextureUse::DEPTH_STENCIL_WRITE => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        TextureUse::RESOURCE => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        TextureUse::UNORDERED_ACCESS => vk::ImageLayout::GENERAL,
        _ => vk::ImageLayout::UNDEFINED,
    }
}

pub fn subresource_range(
    range: &crate::SubresourceRange,
    aspect: vk::ImageAspectFlags,
) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange::default()
        .aspect_mask(aspect)
        .base_mip_level(range.base_mip)
        .level_count(if range.mip_count == ALL_MIPS {
            vk::REMAINING_MIP_LEVELS
        } else {
            range.mip_count
        })
        .base_array_layer(range.base_layer)
        .layer_count(if range.layer_count == ALL_LAYERS {
            vk::REMAINING_ARRAY_LAYERS
        } else {
            range.layer_count
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_mapping_is_total() {
        // Every neutral format must map to a defined Vulkan format.
        let all = [
            TextureFormat::R8Unorm,
            TextureFormat::Bgra8Unorm,
            TextureFormat::Rgba16Float,
            TextureFormat::Rgb10a2Unorm,
            TextureFormat::Rg11b10Float,
            TextureFormat::D24UnormS8Uint,
            TextureFormat::D32FloatS8Uint,
        ];
        for f in all {
            assert_ne!(texture_format(f), vk::Format::UNDEFINED);
        }
    }

    #[test]
    fn depth_formats_get_depth_aspect() {
        assert_eq!(
            format_aspect(TextureFormat::D32Float),
            vk::ImageAspectFlags::DEPTH
        );
        assert_eq!(
            format_aspect(TextureFormat::D24UnormS8Uint),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
        assert_eq!(
            format_aspect(TextureFormat::Rgba8Unorm),
            vk::ImageAspectFlags::COLOR
        );
    }

    #[test]
    fn texture_layouts() {
        assert_eq!(
            texture_use_layout(TextureUse::PRESENT),
            vk::ImageLayout::PRESENT_SRC_KHR
        );
        assert_eq!(
            texture_use_layout(TextureUse::UNORDERED_ACCESS),
            vk::ImageLayout::GENERAL
        );
        assert_eq!(
            texture_use_layout(TextureUse::UNINITIALIZED),
            vk::ImageLayout::UNDEFINED
        );
    }

    #[test]
    fn present_stage_depends_on_side() {
        assert_eq!(
            texture_use_stages(TextureUse::PRESENT, true),
            vk::PipelineStageFlags::ALL_COMMANDS
        );
        assert_eq!(
            texture_use_stages(TextureUse::PRESENT, false),
            vk::PipelineStageFlags::BOTTOM_OF_PIPE
        );
    }

    #[test]
    fn uav_state_reads_and_writes() {
        let access = texture_use_access(TextureUse::UNORDERED_ACCESS);
        assert!(access.contains(vk::AccessFlags::SHADER_READ));
        assert!(access.contains(vk::AccessFlags::SHADER_WRITE));
    }

    #[test]
    fn subresource_all_sentinels() {
        let r = subresource_range(
            &crate::SubresourceRange::default(),
            vk::ImageAspectFlags::COLOR,
        );
        assert_eq!(r.level_count, vk::REMAINING_MIP_LEVELS);
        assert_eq!(r.layer_count, vk::REMAINING_ARRAY_LAYERS);
    }

    #[test]
    fn cbuffer_is_uniform_storage_is_storage() {
        assert_eq!(
            descriptor_type(ResourceKind::CBuffer),
            vk::DescriptorType::UNIFORM_BUFFER
        );
        assert_eq!(
            descriptor_type(ResourceKind::RwBuffer),
            vk::DescriptorType::STORAGE_BUFFER
        );
        assert_eq!(
            descriptor_type(ResourceKind::Sampler),
            vk::DescriptorType::SAMPLER
        );
    }
}
