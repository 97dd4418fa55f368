//! Neutral enum and flag translation for the D3D12 backend.

use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::{
    AddressMode, BlendFactor, BlendOp, BufferUse, ColorWriteMask, CompareOp, CullMode, FilterMode,
    FrontFace, LoadAction, MemoryKind, PolygonMode, PrimitiveTopology, ShaderStages, StencilOp,
    StoreAction, TextureDimension, TextureFormat, TextureUse, VertexFormat, VertexStepMode,
};

pub fn command_list_type(ty: crate::QueueType) -> D3D12_COMMAND_LIST_TYPE {
    match ty {
        crate::QueueType::Graphics => D3D12_COMMAND_LIST_TYPE_DIRECT,
        crate::QueueType::Compute => D3D12_COMMAND_LIST_TYPE_COMPUTE,
        crate::QueueType::Copy => D3D12_COMMAND_LIST_TYPE_COPY,
    }
}

pub fn shader_visibility(stages: ShaderStages) -> D3D12_SHADER_VISIBILITY {
    // Compute has no visibility selector; a multi-stage mask falls back to
    // ALL as the root-signature rules require.
    if stages == ShaderStages::VERTEX {
        D3D12_SHADER_VISIBILITY_VERTEX
    } else if stages == ShaderStages::PIXEL {
        D3D12_SHADER_VISIBILITY_PIXEL
    } else {
        D3D12_SHADER_VISIBILITY_ALL
    }
}

pub fn texture_format(format: TextureFormat) -> DXGI_FORMAT {
    match format {
        TextureFormat::R8Sint => DXGI_FORMAT_R8_SINT,
        TextureFormat::R8Uint => DXGI_FORMAT_R8_UINT,
        TextureFormat::R8Snorm => DXGI_FORMAT_R8_SNORM,
        TextureFormat::R8Unorm => DXGI_FORMAT_R8_UNORM,
        TextureFormat::R16Sint => DXGI_FORMAT_R16_SINT,
        TextureFormat::R16Uint => DXGI_FORMAT_R16_UINT,
        TextureFormat::R16Snorm => DXGI_FORMAT_R16_SNORM,
        TextureFormat::R16Unorm => DXGI_FORMAT_R16_UNORM,
        TextureFormat::R16Float => DXGI_FORMAT_R16_FLOAT,
        TextureFormat::Rg8Sint => DXGI_FORMAT_R8G8_SINT,
        TextureFormat::Rg8Uint => DXGI_FORMAT_R8G8_UINT,
        TextureFormat::Rg8Snorm => DXGI_FORMAT_R8G8_SNORM,
        TextureFormat::Rg8Unorm => DXGI_FORMAT_R8G8_UNORM,
        TextureFormat::R32Sint => DXGI_FORMAT_R32_SINT,
        TextureFormat::R32Uint => DXGI_FORMAT_R32_UINT,
        TextureFormat::R32Float => DXGI_FORMAT_R32_FLOAT,
        TextureFormat::Rg16Sint => DXGI_FORMAT_R16G16_SINT,
        TextureFormat::Rg16Uint => DXGI_FORMAT_R16G16_UINT,
        TextureFormat::Rg16Snorm => DXGI_FORMAT_R16G16_SNORM,
        TextureFormat::Rg16Unorm => DXGI_FORMAT_R16G16_UNORM,
        TextureFormat::Rg16Float => DXGI_FORMAT_R16G16_FLOAT,
        TextureFormat::Rgba8Sint => DXGI_FORMAT_R8G8B8A8_SINT,
        TextureFormat::Rgba8Uint => DXGI_FORMAT_R8G8B8A8_UINT,
        TextureFormat::Rgba8Snorm => DXGI_FORMAT_R8G8B8A8_SNORM,
        TextureFormat::Rgba8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        TextureFormat::Rgba8UnormSrgb => DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
        TextureFormat::Bgra8Unorm => DXGI_FORMAT_B8G8R8A8_UNORM,
        TextureFormat::Bgra8UnormSrgb => DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
        TextureFormat::Rgb10a2Unorm => DXGI_FORMAT_R10G10B10A2_UNORM,
        TextureFormat::Rg11b10Float => DXGI_FORMAT_R11G11B10_FLOAT,
        TextureFormat::Rg32Sint => DXGI_FORMAT_R32G32_SINT,
        TextureFormat::Rg32Uint => DXGI_FORMAT_R32G32_UINT,
        TextureFormat::Rg32Float => DXGI_FORMAT_R32G32_FLOAT,
        TextureFormat::Rgba16Sint => DXGI_FORMAT_R16G16B16A16_SINT,
        TextureFormat::Rgba16Uint => DXGI_FORMAT_R16G16B16A16_UINT,
        TextureFormat::Rgba16Snorm => DXGI_FORMAT_R16G16B16A16_SNORM,
        TextureFormat::Rgba16Unorm => DXGI_FORMAT_R16G16B16A16_UNORM,
        TextureFormat::Rgba16Float => DXGI_FORMAT_R16G16B16A16_FLOAT,
        TextureFormat::Rgba32Sint => DXGI_FORMAT_R32G32B32A32_SINT,
        TextureFormat::Rgba32Uint => DXGI_FORMAT_R32G32B32A32_UINT,
        TextureFormat::Rgba32Float => DXGI_FORMAT_R32G32B32A32_FLOAT,
        TextureFormat::D16Unorm => DXGI_FORMAT_D16_UNORM,
        TextureFormat::D32Float => DXGI_FORMAT_D32_FLOAT,
        TextureFormat::D24UnormS8Uint => DXGI_FORMAT_D24_UNORM_S8_UINT,
        TextureFormat::D32FloatS8Uint => DXGI_FORMAT_D32_FLOAT_S8X24_UINT,
    }
}

/// Typeless parent used when a resource is both sampled and used as an
/// attachment, so SRVs and RTVs/DSVs can alias the same memory.
pub fn typeless_parent(format: TextureFormat) -> DXGI_FORMAT {
    match format {
        TextureFormat::R8Sint
        | TextureFormat::R8Uint
        | TextureFormat::R8Snorm
        | TextureFormat::R8Unorm => DXGI_FORMAT_R8_TYPELESS,
        TextureFormat::R16Sint
        | TextureFormat::R16Uint
        | TextureFormat::R16Snorm
        | TextureFormat::R16Unorm
        | TextureFormat::R16Float
        | TextureFormat::D16Unorm => DXGI_FORMAT_R16_TYPELESS,
        TextureFormat::Rg8Sint
        | TextureFormat::Rg8Uint
        | TextureFormat::Rg8Snorm
        | TextureFormat::Rg8Unorm => DXGI_FORMAT_R8G8_TYPELESS,
        TextureFormat::R32Sint | TextureFormat::R32Uint | TextureFormat::R32Float
        | TextureFormat::D32Float => DXGI_FORMAT_R32_TYPELESS,
        TextureFormat::Rg16Sint
        | TextureFormat::Rg16Uint
        | TextureFormat::Rg16Snorm
        | TextureFormat::Rg16Unorm
        | TextureFormat::Rg16Float => DXGI_FORMAT_R16G16_TYPELESS,
        TextureFormat::Rgba8Sint
        | TextureFormat::Rgba8Uint
        | TextureFormat::Rgba8Snorm
        | TextureFormat::Rgba8Unorm
        | TextureFormat::Rgba8UnormSrgb => DXGI_FORMAT_R8G8B8A8_TYPELESS,
        TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb => DXGI_FORMAT_B8G8R8A8_TYPELESS,
        TextureFormat::Rgb10a2Unorm => DXGI_FORMAT_R10G10B10A2_TYPELESS,
        TextureFormat::Rg11b10Float => DXGI_FORMAT_R11G11B10_FLOAT,
        TextureFormat::Rg32Sint | TextureFormat::Rg32Uint | TextureFormat::Rg32Float => {
            DXGI_FORMAT_R32G32_TYPELESS
        }
        TextureFormat::Rgba16Sint
        | TextureFormat::Rgba16Uint
        | TextureFormat::Rgba16Snorm
        | TextureFormat::Rgba16Unorm
        | TextureFormat::Rgba16Float => DXGI_FORMAT_R16G16B16A16_TYPELESS,
        TextureFormat::Rgba32Sint | TextureFormat::Rgba32Uint | TextureFormat::Rgba32Float => {
            DXGI_FORMAT_R32G32B32A32_TYPELESS
        }
        TextureFormat::D24UnormS8Uint => DXGI_FORMAT_R24G8_TYPELESS,
        TextureFormat::D32FloatS8Uint => DXGI_FORMAT_R32G8X24_TYPELESS,
    }
}

/// Shader-resource format for sampling a depth texture.
pub fn depth_srv_format(format: TextureFormat) -> DXGI_FORMAT {
    match format {
        TextureFormat::D16Unorm => DXGI_FORMAT_R16_UNORM,
        TextureFormat::D32Float => DXGI_FORMAT_R32_FLOAT,
        TextureFormat::D24UnormS8Uint => DXGI_FORMAT_R24_UNORM_X8_TYPELESS,
        TextureFormat::D32FloatS8Uint => DXGI_FORMAT_R32_FLOAT_X8X24_TYPELESS,
        other => texture_format(other),
    }
}

pub fn vertex_format(format: VertexFormat) -> DXGI_FORMAT {
    match format {
        VertexFormat::Uint8x4 => DXGI_FORMAT_R8G8B8A8_UINT,
        VertexFormat::Unorm8x4 => DXGI_FORMAT_R8G8B8A8_UNORM,
        VertexFormat::Float16x2 => DXGI_FORMAT_R16G16_FLOAT,
        VertexFormat::Float16x4 => DXGI_FORMAT_R16G16B16A16_FLOAT,
        VertexFormat::Float32 => DXGI_FORMAT_R32_FLOAT,
        VertexFormat::Float32x2 => DXGI_FORMAT_R32G32_FLOAT,
        VertexFormat::Float32x3 => DXGI_FORMAT_R32G32B32_FLOAT,
        VertexFormat::Float32x4 => DXGI_FORMAT_R32G32B32A32_FLOAT,
        VertexFormat::Uint32 => DXGI_FORMAT_R32_UINT,
        VertexFormat::Uint32x2 => DXGI_FORMAT_R32G32_UINT,
        VertexFormat::Uint32x3 => DXGI_FORMAT_R32G32B32_UINT,
        VertexFormat::Uint32x4 => DXGI_FORMAT_R32G32B32A32_UINT,
        VertexFormat::Sint32 => DXGI_FORMAT_R32_SINT,
        VertexFormat::Sint32x2 => DXGI_FORMAT_R32G32_SINT,
        VertexFormat::Sint32x3 => DXGI_FORMAT_R32G32B32_SINT,
        VertexFormat::Sint32x4 => DXGI_FORMAT_R32G32B32A32_SINT,
    }
}

/// D3D12 wants the topology class on the PSO and the exact topology on the
/// command list.
pub fn primitive_topology(
    t: PrimitiveTopology,
) -> (D3D12_PRIMITIVE_TOPOLOGY_TYPE, D3D_PRIMITIVE_TOPOLOGY) {
    match t {
        PrimitiveTopology::PointList => (
            D3D12_PRIMITIVE_TOPOLOGY_TYPE_POINT,
            D3D_PRIMITIVE_TOPOLOGY_POINTLIST,
        ),
        PrimitiveTopology::LineList => (
            D3D12_PRIMITIVE_TOPOLOGY_TYPE_LINE,
            D3D_PRIMITIVE_TOPOLOGY_LINELIST,
        ),
        PrimitiveTopology::LineStrip => (
            D3D12_PRIMITIVE_TOPOLOGY_TYPE_LINE,
            D3D_PRIMITIVE_TOPOLOGY_LINESTRIP,
        ),
        PrimitiveTopology::TriangleList => (
            D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
            D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        ),
        PrimitiveTopology::TriangleStrip => (
            D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
            D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP,
        ),
    }
}

pub fn fill_mode(p: PolygonMode) -> D3D12_FILL_MODE {
    match p {
        // D3D12 has no point fill; wireframe is the closest rendering.
        PolygonMode::Fill => D3D12_FILL_MODE_SOLID,
        PolygonMode::Line | PolygonMode::Point => D3D12_FILL_MODE_WIREFRAME,
    }
}

pub fn cull_mode(c: CullMode) -> D3D12_CULL_MODE {
    match c {
        CullMode::None => D3D12_CULL_MODE_NONE,
        CullMode::Front => D3D12_CULL_MODE_FRONT,
        CullMode::Back => D3D12_CULL_MODE_BACK,
    }
}

pub fn front_counter_clockwise(f: FrontFace) -> bool {
    matches!(f, FrontFace::Ccw)
}

pub fn compare_op(op: CompareOp) -> D3D12_COMPARISON_FUNC {
    match op {
        CompareOp::Never => D3D12_COMPARISON_FUNC_NEVER,
        CompareOp::Less => D3D12_COMPARISON_FUNC_LESS,
        CompareOp::Equal => D3D12_COMPARISON_FUNC_EQUAL,
        CompareOp::LessEqual => D3D12_COMPARISON_FUNC_LESS_EQUAL,
        CompareOp::Greater => D3D12_COMPARISON_FUNC_GREATER,
        CompareOp::NotEqual => D3D12_COMPARISON_FUNC_NOT_EQUAL,
        CompareOp::GreaterEqual => D3D12_COMPARISON_FUNC_GREATER_EQUAL,
        CompareOp::Always => D3D12_COMPARISON_FUNC_ALWAYS,
    }
}

pub fn stencil_op(op: StencilOp) -> D3D12_STENCIL_OP {
    match op {
        StencilOp::Keep => D3D12_STENCIL_OP_KEEP,
        StencilOp::Zero => D3D12_STENCIL_OP_ZERO,
        StencilOp::Replace => D3D12_STENCIL_OP_REPLACE,
        StencilOp::IncrementClamp => D3D12_STENCIL_OP_INCR_SAT,
        StencilOp::DecrementClamp => D3D12_STENCIL_OP_DECR_SAT,
        StencilOp::Invert => D3D12_STENCIL_OP_INVERT,
        StencilOp::IncrementWrap => D3D12_STENCIL_OP_INCR,
        StencilOp::DecrementWrap => D3D12_STENCIL_OP_DECR,
    }
}

pub fn blend_factor(f: BlendFactor, is_alpha: bool) -> D3D12_BLEND {
    // The alpha channel cannot reference color factors; promote first.
    let f = if is_alpha { f.promote_to_alpha() } else { f };
    match f {
        BlendFactor::Zero => D3D12_BLEND_ZERO,
        BlendFactor::One => D3D12_BLEND_ONE,
        BlendFactor::SrcColor => D3D12_BLEND_SRC_COLOR,
        BlendFactor::OneMinusSrcColor => D3D12_BLEND_INV_SRC_COLOR,
        BlendFactor::SrcAlpha => D3D12_BLEND_SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => D3D12_BLEND_INV_SRC_ALPHA,
        BlendFactor::DstColor => D3D12_BLEND_DEST_COLOR,
        BlendFactor::OneMinusDstColor => D3D12_BLEND_INV_DEST_COLOR,
        BlendFactor::DstAlpha => D3D12_BLEND_DEST_ALPHA,
        BlendFactor::OneMinusDstAlpha => D3D12_BLEND_INV_DEST_ALPHA,
        BlendFactor::Constant => D3D12_BLEND_BLEND_FACTOR,
        BlendFactor::OneMinusConstant => D3D12_BLEND_INV_BLEND_FACTOR,
    }
}

pub fn blend_op(op: BlendOp) -> D3D12_BLEND_OP {
    match op {
        BlendOp::Add => D3D12_BLEND_OP_ADD,
        BlendOp::Subtract => D3D12_BLEND_OP_SUBTRACT,
        BlendOp::ReverseSubtract => D3D12_BLEND_OP_REV_SUBTRACT,
        BlendOp::Min => D3D12_BLEND_OP_MIN,
        BlendOp::Max => D3D12_BLEND_OP_MAX,
    }
}

pub fn render_target_write_mask(mask: ColorWriteMask) -> u8 {
    let mut bits = 0u8;
    if mask.contains(ColorWriteMask::RED) {
        bits |= D3D12_COLOR_WRITE_ENABLE_RED.0 as u8;
    }
    if mask.contains(ColorWriteMask::GREEN) {
        bits |= D3D12_COLOR_WRITE_ENABLE_GREEN.0 as u8;
    }
    if mask.contains(ColorWriteMask::BLUE) {
        bits |= D3D12_COLOR_WRITE_ENABLE_BLUE.0 as u8;
    }
    if mask.contains(ColorWriteMask::ALPHA) {
        bits |= D3D12_COLOR_WRITE_ENABLE_ALPHA.0 as u8;
    }
    bits
}

/// Combines min/mag/mip filtering, comparison and anisotropy into the
/// packed D3D12 filter encoding.
pub fn filter(
    min: FilterMode,
    mag: FilterMode,
    mip: FilterMode,
    compare: bool,
    anisotropy_clamp: u32,
) -> D3D12_FILTER {
    if anisotropy_clamp > 1 {
        return if compare {
            D3D12_FILTER_COMPARISON_ANISOTROPIC
        } else {
            D3D12_FILTER_ANISOTROPIC
        };
    }
    let mut bits = 0;
    if mip == FilterMode::Linear {
        bits |= 0x1;
    }
    if mag == FilterMode::Linear {
        bits |= 0x4;
    }
    if min == FilterMode::Linear {
        bits |= 0x10;
    }
    if compare {
        bits |= 0x80;
    }
    D3D12_FILTER(bits)
}

pub fn address_mode(a: AddressMode) -> D3D12_TEXTURE_ADDRESS_MODE {
    match a {
        AddressMode::Repeat => D3D12_TEXTURE_ADDRESS_MODE_WRAP,
        AddressMode::MirrorRepeat => D3D12_TEXTURE_ADDRESS_MODE_MIRROR,
        AddressMode::ClampToEdge => D3D12_TEXTURE_ADDRESS_MODE_CLAMP,
        AddressMode::ClampToBorder => D3D12_TEXTURE_ADDRESS_MODE_BORDER,
    }
}

pub fn beginning_access(a: LoadAction) -> D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE {
    match a {
        LoadAction::Load => D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_PRESERVE,
        LoadAction::Clear => D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_CLEAR,
        LoadAction::DontCare => D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_DISCARD,
    }
}

pub fn ending_access(a: StoreAction) -> D3D12_RENDER_PASS_ENDING_ACCESS_TYPE {
    match a {
        StoreAction::Store => D3D12_RENDER_PASS_ENDING_ACCESS_TYPE_PRESERVE,
        StoreAction::DontCare => D3D12_RENDER_PASS_ENDING_ACCESS_TYPE_DISCARD,
    }
}

pub fn heap_type(kind: MemoryKind) -> D3D12_HEAP_TYPE {
    match kind {
        MemoryKind::Device => D3D12_HEAP_TYPE_DEFAULT,
        MemoryKind::Upload => D3D12_HEAP_TYPE_UPLOAD,
        MemoryKind::Readback => D3D12_HEAP_TYPE_READBACK,
    }
}

/// Initial buffer state implied by the heap kind.
pub fn initial_buffer_state(kind: MemoryKind) -> D3D12_RESOURCE_STATES {
    match kind {
        MemoryKind::Device => D3D12_RESOURCE_STATE_COMMON,
        MemoryKind::Upload => D3D12_RESOURCE_STATE_GENERIC_READ,
        MemoryKind::Readback => D3D12_RESOURCE_STATE_COPY_DEST,
    }
}

pub fn buffer_use_states(usage: BufferUse) -> D3D12_RESOURCE_STATES {
    let mut states = D3D12_RESOURCE_STATE_COMMON;
    if usage.contains(BufferUse::MAP_READ) || usage.contains(BufferUse::MAP_WRITE) {
        states |= D3D12_RESOURCE_STATE_GENERIC_READ;
    }
    if usage.contains(BufferUse::COPY_SOURCE) {
        states |= D3D12_RESOURCE_STATE_COPY_SOURCE;
    }
    if usage.contains(BufferUse::COPY_DESTINATION) {
        states |= D3D12_RESOURCE_STATE_COPY_DEST;
    }
    if usage.contains(BufferUse::INDEX) {
        states |= D3D12_RESOURCE_STATE_INDEX_BUFFER;
    }
    if usage.contains(BufferUse::VERTEX) || usage.contains(BufferUse::CBUFFER) {
        states |= D3D12_RESOURCE_STATE_VERTEX_AND_CONSTANT_BUFFER;
    }
    if usage.contains(BufferUse::RESOURCE) {
        states |= D3D12_RESOURCE_STATE_NON_PIXEL_SHADER_RESOURCE
            | D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE;
    }
    if usage.contains(BufferUse::UNORDERED_ACCESS) {
        states |= D3D12_RESOURCE_STATE_UNORDERED_ACCESS;
    }
    if usage.contains(BufferUse::INDIRECT) {
        states |= D3D12_RESOURCE_STATE_INDIRECT_ARGUMENT;
    }
    states
}

pub fn texture_use_states(usage: TextureUse) -> D3D12_RESOURCE_STATES {
    let mut states = D3D12_RESOURCE_STATE_COMMON;
    if usage.contains(TextureUse::COPY_SOURCE) {
        states |= D3D12_RESOURCE_STATE_COPY_SOURCE;
    }
    if usage.contains(TextureUse::COPY_DESTINATION) {
        states |= D3D12_RESOURCE_STATE_COPY_DEST;
    }
    if usage.contains(TextureUse::RESOURCE) {
        states |= D3D12_RESOURCE_STATE_NON_PIXEL_SHADER_RESOURCE
            | D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE;
    }
    if usage.contains(TextureUse::RENDER_TARGET) {
        states |= D3D12_RESOURCE_STATE_RENDER_TARGET;
    }
    if usage.contains(TextureUse::DEPTH_STENCIL_READ) {
        states |= D3D12_RESOURCE_STATE_DEPTH_READ;
    }
    if usage.contains(TextureUse::DEPTH_STENCIL_WRITE) {
        states |= D3D12_RESOURCE_STATE_DEPTH_WRITE;
    }
    if usage.contains(TextureUse::UNORDERED_ACCESS) {
        states |= D3D12_RESOURCE_STATE_UNORDERED_ACCESS;
    }
    // PRESENT aliases COMMON, UNINITIALIZED is COMMON; nothing to add.
    states
}

pub fn resource_dimension(dim: TextureDimension) -> D3D12_RESOURCE_DIMENSION {
    match dim {
        TextureDimension::D1 => D3D12_RESOURCE_DIMENSION_TEXTURE1D,
        TextureDimension::D2 => D3D12_RESOURCE_DIMENSION_TEXTURE2D,
        TextureDimension::D3 => D3D12_RESOURCE_DIMENSION_TEXTURE3D,
    }
}

pub fn input_classification(mode: VertexStepMode) -> D3D12_INPUT_CLASSIFICATION {
    match mode {
        VertexStepMode::Vertex => D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
        VertexStepMode::Instance => D3D12_INPUT_CLASSIFICATION_PER_INSTANCE_DATA,
    }
}

pub fn descriptor_range_type(kind: crate::ResourceKind) -> D3D12_DESCRIPTOR_RANGE_TYPE {
    match kind {
        crate::ResourceKind::CBuffer => D3D12_DESCRIPTOR_RANGE_TYPE_CBV,
        crate::ResourceKind::Buffer | crate::ResourceKind::Texture => {
            D3D12_DESCRIPTOR_RANGE_TYPE_SRV
        }
        crate::ResourceKind::RwBuffer | crate::ResourceKind::RwTexture => {
            D3D12_DESCRIPTOR_RANGE_TYPE_UAV
        }
        crate::ResourceKind::Sampler => D3D12_DESCRIPTOR_RANGE_TYPE_SAMPLER,
    }
}

pub fn index_format(stride: u32) -> DXGI_FORMAT {
    match stride {
        1 => DXGI_FORMAT_R8_UINT,
        2 => DXGI_FORMAT_R16_UINT,
        _ => DXGI_FORMAT_R32_UINT,
    }
}
