//! Root signature construction and the descriptor-set model built on the
//! shader-visible heaps.

use std::sync::Arc;

use windows::Win32::Graphics::Direct3D::ID3DBlob;
use windows::Win32::Graphics::Direct3D12::*;

use crate::{
    denied_stages, DescriptorSet, DescriptorSetElement, DescriptorSetLayout,
    DescriptorSetLayoutDescriptor, Error, ResourceKind, ResourceViewRef, Result, RootConstant,
    RootDescriptor, RootSignature, RootSignatureDescriptor, ShaderStages, TextureViewKind,
};

use super::buffer::D3D12BufferView;
use super::conv;
use super::descriptor::{copy_descriptor, GpuDescriptorRange};
use super::texture::{D3D12Sampler, D3D12TextureView};

/// Which shader-visible heap an element's descriptors land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeapCategory {
    Resource,
    Sampler,
}

/// Per-element placement computed once at layout creation: the category
/// and the offset of the element's first descriptor inside the set's
/// range of that category. Static-sampler elements occupy nothing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ElementPlacement {
    pub category: HeapCategory,
    pub offset: u32,
    pub occupies_heap: bool,
}

pub(crate) struct SetLayoutInner {
    pub(crate) elements: Vec<DescriptorSetElement>,
    pub(crate) placements: Vec<ElementPlacement>,
    pub(crate) resource_count: u32,
    pub(crate) sampler_count: u32,
}

pub struct D3D12DescriptorSetLayout {
    pub(crate) inner: Arc<SetLayoutInner>,
}

impl D3D12DescriptorSetLayout {
    pub(crate) fn create(desc: &DescriptorSetLayoutDescriptor) -> Result<Self> {
        let mut placements = Vec::with_capacity(desc.elements.len());
        let mut resource_count = 0;
        let mut sampler_count = 0;
        for e in &desc.elements {
            match e.kind {
                ResourceKind::Sampler => {
                    if !e.static_samplers.is_empty() {
                        if e.static_samplers.len() != e.count as usize {
                            return Err(Error::invalid(format!(
                                "static sampler count {} does not match element count {}",
                                e.static_samplers.len(),
                                e.count
                            )));
                        }
                        placements.push(ElementPlacement {
                            category: HeapCategory::Sampler,
                            offset: 0,
                            occupies_heap: false,
                        });
                    } else {
                        placements.push(ElementPlacement {
                            category: HeapCategory::Sampler,
                            offset: sampler_count,
                            occupies_heap: true,
                        });
                        sampler_count += e.count;
                    }
                }
                _ => {
                    if !e.static_samplers.is_empty() {
                        return Err(Error::invalid(
                            "static samplers are only valid on sampler elements",
                        ));
                    }
                    placements.push(ElementPlacement {
                        category: HeapCategory::Resource,
                        offset: resource_count,
                        occupies_heap: true,
                    });
                    resource_count += e.count;
                }
            }
        }
        Ok(Self {
            inner: Arc::new(SetLayoutInner {
                elements: desc.elements.clone(),
                placements,
                resource_count,
                sampler_count,
            }),
        })
    }
}

impl std::fmt::Debug for D3D12DescriptorSetLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12DescriptorSetLayout")
            .field("elements", &self.inner.elements.len())
            .finish_non_exhaustive()
    }
}

impl DescriptorSetLayout for D3D12DescriptorSetLayout {
    fn elements(&self) -> &[DescriptorSetElement] {
        &self.inner.elements
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// One descriptor-table root parameter produced for a set element.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableParam {
    pub root_param_index: u32,
    pub category: HeapCategory,
    pub descriptor_offset: u32,
}

/// Root parameters a bound set expands into at record time.
#[derive(Debug, Clone)]
pub(crate) struct SetBinding {
    pub params: Vec<TableParam>,
}

pub struct D3D12RootSignature {
    pub(crate) raw: ID3D12RootSignature,
    pub(crate) constant: Option<RootConstant>,
    pub(crate) root_descriptors: Vec<RootDescriptor>,
    pub(crate) set_bindings: Vec<SetBinding>,
    pub(crate) root_const_start: u32,
    pub(crate) root_desc_start: u32,
    #[allow(dead_code)]
    pub(crate) bind_desc_start: u32,
    pub(crate) used_stages: ShaderStages,
}

fn build_static_sampler(
    element: &DescriptorSetElement,
    index: usize,
    sampler: &crate::SamplerDescriptor,
) -> D3D12_STATIC_SAMPLER_DESC {
    D3D12_STATIC_SAMPLER_DESC {
        Filter: conv::filter(
            sampler.min_filter,
            sampler.mag_filter,
            sampler.mip_filter,
            sampler.compare.is_some(),
            sampler.anisotropy_clamp,
        ),
        AddressU: conv::address_mode(sampler.address_s),
        AddressV: conv::address_mode(sampler.address_t),
        AddressW: conv::address_mode(sampler.address_r),
        MipLODBias: 0.0,
        MaxAnisotropy: sampler.anisotropy_clamp,
        ComparisonFunc: sampler
            .compare
            .map(conv::compare_op)
            .unwrap_or(D3D12_COMPARISON_FUNC_NEVER),
        BorderColor: D3D12_STATIC_BORDER_COLOR_TRANSPARENT_BLACK,
        MinLOD: sampler.lod_min,
        MaxLOD: sampler.lod_max,
        ShaderRegister: element.slot + index as u32,
        RegisterSpace: element.space,
        ShaderVisibility: conv::shader_visibility(element.stages),
    }
}

impl D3D12RootSignature {
    pub(crate) fn create(
        device: &ID3D12Device,
        desc: &RootSignatureDescriptor<'_>,
    ) -> Result<Self> {
        let mut used_stages = ShaderStages::empty();
        let mut layouts: Vec<Arc<SetLayoutInner>> = Vec::with_capacity(desc.sets.len());
        for set in desc.sets {
            let concrete = set
                .as_any()
                .downcast_ref::<D3D12DescriptorSetLayout>()
                .ok_or_else(|| Error::invalid("set layout is not a D3D12 layout"))?;
            layouts.push(Arc::clone(&concrete.inner));
        }

        // Ranges must not move once root parameters point at them, so the
        // exact count is reserved up front: one range per element that is
        // not folded into static samplers.
        let range_count: usize = layouts
            .iter()
            .flat_map(|l| &l.elements)
            .filter(|e| e.static_samplers.is_empty())
            .count();
        let mut ranges: Vec<D3D12_DESCRIPTOR_RANGE1> = Vec::with_capacity(range_count);
        let mut params: Vec<D3D12_ROOT_PARAMETER1> = Vec::new();
        let mut static_samplers: Vec<D3D12_STATIC_SAMPLER_DESC> = Vec::new();

        let root_const_start = params.len() as u32;
        if let Some(c) = desc.constant {
            if c.size % 4 != 0 {
                return Err(Error::invalid("root constant size must be a multiple of 4"));
            }
            used_stages |= c.stages;
            params.push(D3D12_ROOT_PARAMETER1 {
                ParameterType: D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS,
                Anonymous: D3D12_ROOT_PARAMETER1_0 {
                    Constants: D3D12_ROOT_CONSTANTS {
                        ShaderRegister: c.slot,
                        RegisterSpace: c.space,
                        Num32BitValues: c.size / 4,
                    },
                },
                ShaderVisibility: conv::shader_visibility(c.stages),
            });
        }

        let root_desc_start = params.len() as u32;
        for rd in desc.root_descriptors {
            let parameter_type = match rd.kind {
                ResourceKind::CBuffer => D3D12_ROOT_PARAMETER_TYPE_CBV,
                ResourceKind::Buffer | ResourceKind::Texture => D3D12_ROOT_PARAMETER_TYPE_SRV,
                ResourceKind::RwBuffer | ResourceKind::RwTexture => D3D12_ROOT_PARAMETER_TYPE_UAV,
                ResourceKind::Sampler => {
                    return Err(Error::invalid("a sampler cannot be a root descriptor"));
                }
            };
            used_stages |= rd.stages;
            params.push(D3D12_ROOT_PARAMETER1 {
                ParameterType: parameter_type,
                Anonymous: D3D12_ROOT_PARAMETER1_0 {
                    Descriptor: D3D12_ROOT_DESCRIPTOR1 {
                        ShaderRegister: rd.slot,
                        RegisterSpace: rd.space,
                        Flags: D3D12_ROOT_DESCRIPTOR_FLAG_NONE,
                    },
                },
                ShaderVisibility: conv::shader_visibility(rd.stages),
            });
        }

        // One descriptor table per element; an element is exactly one
        // range. Static-sampler elements go on the signature instead.
        let bind_desc_start = params.len() as u32;
        let mut set_bindings = Vec::with_capacity(layouts.len());
        for layout in &layouts {
            let mut binding = SetBinding { params: Vec::new() };
            for (e, placement) in layout.elements.iter().zip(&layout.placements) {
                if !e.static_samplers.is_empty() {
                    for (t, s) in e.static_samplers.iter().enumerate() {
                        static_samplers.push(build_static_sampler(e, t, s));
                    }
                    continue;
                }
                used_stages |= e.stages;
                let range_index = ranges.len();
                ranges.push(D3D12_DESCRIPTOR_RANGE1 {
                    RangeType: conv::descriptor_range_type(e.kind),
                    NumDescriptors: e.count,
                    BaseShaderRegister: e.slot,
                    RegisterSpace: e.space,
                    Flags: D3D12_DESCRIPTOR_RANGE_FLAG_NONE,
                    OffsetInDescriptorsFromTableStart: D3D12_DESCRIPTOR_RANGE_OFFSET_APPEND,
                });
                binding.params.push(TableParam {
                    root_param_index: params.len() as u32,
                    category: placement.category,
                    descriptor_offset: placement.offset,
                });
                params.push(D3D12_ROOT_PARAMETER1 {
                    ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
                    Anonymous: D3D12_ROOT_PARAMETER1_0 {
                        DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE1 {
                            NumDescriptorRanges: 1,
                            pDescriptorRanges: &ranges[range_index],
                        },
                    },
                    ShaderVisibility: conv::shader_visibility(e.stages),
                });
            }
            set_bindings.push(binding);
        }
        debug_assert_eq!(ranges.len(), range_count);

        let denied = denied_stages(used_stages);
        let mut flags = D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT
            | D3D12_ROOT_SIGNATURE_FLAG_DENY_HULL_SHADER_ROOT_ACCESS
            | D3D12_ROOT_SIGNATURE_FLAG_DENY_DOMAIN_SHADER_ROOT_ACCESS
            | D3D12_ROOT_SIGNATURE_FLAG_DENY_GEOMETRY_SHADER_ROOT_ACCESS
            | D3D12_ROOT_SIGNATURE_FLAG_DENY_AMPLIFICATION_SHADER_ROOT_ACCESS
            | D3D12_ROOT_SIGNATURE_FLAG_DENY_MESH_SHADER_ROOT_ACCESS;
        if denied.contains(ShaderStages::VERTEX) {
            flags |= D3D12_ROOT_SIGNATURE_FLAG_DENY_VERTEX_SHADER_ROOT_ACCESS;
        }
        if denied.contains(ShaderStages::PIXEL) {
            flags |= D3D12_ROOT_SIGNATURE_FLAG_DENY_PIXEL_SHADER_ROOT_ACCESS;
        }

        let versioned = D3D12_VERSIONED_ROOT_SIGNATURE_DESC {
            Version: D3D_ROOT_SIGNATURE_VERSION_1_1,
            Anonymous: D3D12_VERSIONED_ROOT_SIGNATURE_DESC_0 {
                Desc_1_1: D3D12_ROOT_SIGNATURE_DESC1 {
                    NumParameters: params.len() as u32,
                    pParameters: if params.is_empty() {
                        std::ptr::null()
                    } else {
                        params.as_ptr()
                    },
                    NumStaticSamplers: static_samplers.len() as u32,
                    pStaticSamplers: if static_samplers.is_empty() {
                        std::ptr::null()
                    } else {
                        static_samplers.as_ptr()
                    },
                    Flags: flags,
                },
            },
        };

        let mut blob: Option<ID3DBlob> = None;
        let mut error_blob: Option<ID3DBlob> = None;
        let serialize = unsafe {
            D3D12SerializeVersionedRootSignature(&versioned, &mut blob, Some(&mut error_blob))
        };
        if let Err(e) = serialize {
            let reason = error_blob
                .map(|b| unsafe {
                    let ptr = b.GetBufferPointer().cast::<u8>();
                    let len = b.GetBufferSize();
                    String::from_utf8_lossy(std::slice::from_raw_parts(ptr, len)).into_owned()
                })
                .unwrap_or_else(|| e.to_string());
            return Err(Error::backend(
                "D3D12SerializeVersionedRootSignature",
                reason,
            ));
        }
        let blob = blob.ok_or_else(|| {
            Error::backend("D3D12SerializeVersionedRootSignature", "null blob")
        })?;
        let raw: ID3D12RootSignature = unsafe {
            let bytes =
                std::slice::from_raw_parts(blob.GetBufferPointer().cast::<u8>(), blob.GetBufferSize());
            device
                .CreateRootSignature(0, bytes)
                .map_err(|e| Error::backend("ID3D12Device::CreateRootSignature", e))?
        };

        Ok(Self {
            raw,
            constant: desc.constant,
            root_descriptors: desc.root_descriptors.to_vec(),
            set_bindings,
            root_const_start,
            root_desc_start,
            bind_desc_start,
            used_stages,
        })
    }
}

impl std::fmt::Debug for D3D12RootSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12RootSignature")
            .field("sets", &self.set_bindings.len())
            .field("used_stages", &self.used_stages)
            .finish_non_exhaustive()
    }
}

impl RootSignature for D3D12RootSignature {
    fn root_constant(&self) -> Option<RootConstant> {
        self.constant
    }

    fn root_descriptors(&self) -> &[RootDescriptor] {
        &self.root_descriptors
    }

    fn used_stages(&self) -> ShaderStages {
        self.used_stages
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A descriptor set is a pair of reserved ranges inside the shader-visible
/// heaps; either range may be absent.
pub struct D3D12DescriptorSet {
    pub(crate) device: ID3D12Device,
    pub(crate) layout: Arc<SetLayoutInner>,
    pub(crate) resource_range: Option<GpuDescriptorRange>,
    pub(crate) sampler_range: Option<GpuDescriptorRange>,
}

impl D3D12DescriptorSet {
    fn locate(&self, index: u32) -> Option<(usize, u32)> {
        let mut base = 0;
        for (i, e) in self.layout.elements.iter().enumerate() {
            if index < base + e.count {
                return Some((i, index - base));
            }
            base += e.count;
        }
        None
    }
}

impl std::fmt::Debug for D3D12DescriptorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12DescriptorSet")
            .field("resources", &self.layout.resource_count)
            .field("samplers", &self.layout.sampler_count)
            .finish_non_exhaustive()
    }
}

impl DescriptorSet for D3D12DescriptorSet {
    fn set_resources(&mut self, start: u32, views: &[ResourceViewRef<'_>]) -> Result<()> {
        for (i, view) in views.iter().enumerate() {
            let index = start + i as u32;
            let (element_index, array_offset) = self.locate(index).ok_or_else(|| {
                Error::invalid(format!("descriptor index {index} out of range"))
            })?;
            let element = &self.layout.elements[element_index];
            let placement = self.layout.placements[element_index];
            if !placement.occupies_heap {
                return Err(Error::invalid(
                    "element uses static samplers; it cannot be rewritten",
                ));
            }
            let (src, heap_ty, dst) = match (element.kind, view) {
                (
                    ResourceKind::CBuffer | ResourceKind::Buffer | ResourceKind::RwBuffer,
                    ResourceViewRef::Buffer(bv),
                ) => {
                    let bv = bv
                        .as_any()
                        .downcast_ref::<D3D12BufferView>()
                        .ok_or_else(|| Error::invalid("buffer view is not a D3D12 view"))?;
                    if bv.kind != element.kind {
                        return Err(Error::invalid(format!(
                            "view kind {:?} does not match element kind {:?}",
                            bv.kind, element.kind
                        )));
                    }
                    let range = self
                        .resource_range
                        .as_ref()
                        .ok_or_else(|| Error::invalid("set reserves no resource range"))?;
                    (
                        bv.slot.handle(),
                        D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
                        range.cpu_handle(placement.offset + array_offset),
                    )
                }
                (ResourceKind::Texture | ResourceKind::RwTexture, ResourceViewRef::Texture(tv)) => {
                    let tv = tv
                        .as_any()
                        .downcast_ref::<D3D12TextureView>()
                        .ok_or_else(|| Error::invalid("texture view is not a D3D12 view"))?;
                    let expected = if element.kind == ResourceKind::Texture {
                        TextureViewKind::ShaderResource
                    } else {
                        TextureViewKind::UnorderedAccess
                    };
                    if tv.kind != expected {
                        return Err(Error::invalid(format!(
                            "view kind {:?} does not match element kind {:?}",
                            tv.kind, element.kind
                        )));
                    }
                    let range = self
                        .resource_range
                        .as_ref()
                        .ok_or_else(|| Error::invalid("set reserves no resource range"))?;
                    (
                        tv.slot.handle(),
                        D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
                        range.cpu_handle(placement.offset + array_offset),
                    )
                }
                (ResourceKind::Sampler, ResourceViewRef::Sampler(s)) => {
                    let s = s
                        .as_any()
                        .downcast_ref::<D3D12Sampler>()
                        .ok_or_else(|| Error::invalid("sampler is not a D3D12 sampler"))?;
                    let range = self
                        .sampler_range
                        .as_ref()
                        .ok_or_else(|| Error::invalid("set reserves no sampler range"))?;
                    (
                        s.slot.handle(),
                        D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER,
                        range.cpu_handle(placement.offset + array_offset),
                    )
                }
                (kind, _) => {
                    return Err(Error::invalid(format!(
                        "resource view does not match element kind {kind:?}"
                    )));
                }
            };
            copy_descriptor(&self.device, heap_ty, dst, src);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
