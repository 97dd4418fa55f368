//! Pipeline state objects for the D3D12 backend.

use std::ffi::CString;
use std::mem::ManuallyDrop;

use windows::core::PCSTR;
use windows::Win32::Graphics::Direct3D::D3D_PRIMITIVE_TOPOLOGY;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use crate::{
    ComputePipelineState, ComputePipelineStateDescriptor, Error, GraphicsPipelineState,
    GraphicsPipelineStateDescriptor, Result, ShaderStages,
};

use super::conv;
use super::root_signature::D3D12RootSignature;
use super::shader::D3D12Shader;

pub struct D3D12GraphicsPipelineState {
    pub(crate) pso: ID3D12PipelineState,
    pub(crate) topology: D3D_PRIMITIVE_TOPOLOGY,
    /// Per-slot vertex strides; vertex-buffer views are completed with
    /// these at bind time.
    pub(crate) vertex_strides: Vec<u32>,
}

impl D3D12GraphicsPipelineState {
    pub(crate) fn create(
        device: &ID3D12Device,
        desc: &GraphicsPipelineStateDescriptor<'_>,
    ) -> Result<Self> {
        let root_sig = desc
            .root_signature
            .as_any()
            .downcast_ref::<D3D12RootSignature>()
            .ok_or_else(|| Error::invalid("root signature is not a D3D12 root signature"))?;
        let vs = desc
            .vs
            .as_any()
            .downcast_ref::<D3D12Shader>()
            .ok_or_else(|| Error::invalid("vertex shader is not a D3D12 shader"))?;
        if !vs.stage.contains(ShaderStages::VERTEX) {
            return Err(Error::invalid("vs blob was not created for the vertex stage"));
        }
        let ps = desc
            .ps
            .map(|s| {
                s.as_any()
                    .downcast_ref::<D3D12Shader>()
                    .ok_or_else(|| Error::invalid("pixel shader is not a D3D12 shader"))
            })
            .transpose()?;
        if desc.color_targets.len() > 8 {
            return Err(Error::invalid("at most 8 color targets are supported"));
        }

        // Semantic name strings must stay alive until PSO creation returns.
        let mut semantic_names = Vec::new();
        let mut input_elements = Vec::new();
        let mut vertex_strides = Vec::with_capacity(desc.vertex_layouts.len());
        for (slot, layout) in desc.vertex_layouts.iter().enumerate() {
            vertex_strides.push(layout.stride);
            for element in &layout.elements {
                let name = CString::new(element.semantic.as_str())
                    .map_err(|_| Error::invalid("vertex semantic contains a NUL byte"))?;
                semantic_names.push(name);
                let classification = conv::input_classification(layout.step_mode);
                input_elements.push(D3D12_INPUT_ELEMENT_DESC {
                    SemanticName: PCSTR(semantic_names.last().unwrap().as_ptr().cast()),
                    SemanticIndex: element.semantic_index,
                    Format: conv::vertex_format(element.format),
                    InputSlot: slot as u32,
                    AlignedByteOffset: element.offset,
                    InputSlotClass: classification,
                    InstanceDataStepRate: match layout.step_mode {
                        crate::VertexStepMode::Vertex => 0,
                        crate::VertexStepMode::Instance => 1,
                    },
                });
            }
        }

        let mut blend = D3D12_BLEND_DESC {
            AlphaToCoverageEnable: false.into(),
            IndependentBlendEnable: true.into(),
            RenderTarget: Default::default(),
        };
        let mut rtv_formats = [DXGI_FORMAT_UNKNOWN; 8];
        for (i, target) in desc.color_targets.iter().enumerate() {
            rtv_formats[i] = conv::texture_format(target.format);
            let rt = &mut blend.RenderTarget[i];
            rt.RenderTargetWriteMask = conv::render_target_write_mask(target.write_mask);
            rt.LogicOp = D3D12_LOGIC_OP_NOOP;
            match &target.blend {
                None => {
                    rt.BlendEnable = false.into();
                    rt.SrcBlend = D3D12_BLEND_ONE;
                    rt.DestBlend = D3D12_BLEND_ZERO;
                    rt.BlendOp = D3D12_BLEND_OP_ADD;
                    rt.SrcBlendAlpha = D3D12_BLEND_ONE;
                    rt.DestBlendAlpha = D3D12_BLEND_ZERO;
                    rt.BlendOpAlpha = D3D12_BLEND_OP_ADD;
                }
                Some((color, alpha)) => {
                    rt.BlendEnable = true.into();
                    rt.SrcBlend = conv::blend_factor(color.src, false);
                    rt.DestBlend = conv::blend_factor(color.dst, false);
                    rt.BlendOp = conv::blend_op(color.op);
                    rt.SrcBlendAlpha = conv::blend_factor(alpha.src, true);
                    rt.DestBlendAlpha = conv::blend_factor(alpha.dst, true);
                    rt.BlendOpAlpha = conv::blend_op(alpha.op);
                }
            }
        }

        let rasterizer = D3D12_RASTERIZER_DESC {
            FillMode: conv::fill_mode(desc.primitive.polygon_mode),
            CullMode: conv::cull_mode(desc.primitive.cull),
            FrontCounterClockwise: conv::front_counter_clockwise(desc.primitive.front_face).into(),
            DepthBias: 0,
            DepthBiasClamp: 0.0,
            SlopeScaledDepthBias: 0.0,
            DepthClipEnable: true.into(),
            MultisampleEnable: (desc.sample_count > 1).into(),
            AntialiasedLineEnable: false.into(),
            ForcedSampleCount: 0,
            ConservativeRaster: D3D12_CONSERVATIVE_RASTERIZATION_MODE_OFF,
        };

        let (depth_stencil, dsv_format) = match &desc.depth_stencil {
            None => (
                D3D12_DEPTH_STENCIL_DESC {
                    DepthEnable: false.into(),
                    ..Default::default()
                },
                DXGI_FORMAT_UNKNOWN,
            ),
            Some(ds) => {
                let face = |f: &crate::StencilFaceState| D3D12_DEPTH_STENCILOP_DESC {
                    StencilFailOp: conv::stencil_op(f.fail),
                    StencilDepthFailOp: conv::stencil_op(f.depth_fail),
                    StencilPassOp: conv::stencil_op(f.pass),
                    StencilFunc: conv::compare_op(f.compare),
                };
                (
                    D3D12_DEPTH_STENCIL_DESC {
                        DepthEnable: ds.depth_test.into(),
                        DepthWriteMask: if ds.depth_write {
                            D3D12_DEPTH_WRITE_MASK_ALL
                        } else {
                            D3D12_DEPTH_WRITE_MASK_ZERO
                        },
                        DepthFunc: conv::compare_op(ds.depth_compare),
                        StencilEnable: ds.stencil_test.into(),
                        StencilReadMask: ds.stencil_read_mask,
                        StencilWriteMask: ds.stencil_write_mask,
                        FrontFace: face(&ds.front),
                        BackFace: face(&ds.back),
                    },
                    conv::texture_format(ds.format),
                )
            }
        };

        let (topology_class, topology) = conv::primitive_topology(desc.primitive.topology);

        let mut pso_desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC {
            pRootSignature: unsafe { std::mem::transmute_copy(&root_sig.raw) },
            VS: D3D12_SHADER_BYTECODE {
                pShaderBytecode: vs.bytes.as_ptr().cast(),
                BytecodeLength: vs.bytes.len(),
            },
            PS: match ps {
                Some(ps) => D3D12_SHADER_BYTECODE {
                    pShaderBytecode: ps.bytes.as_ptr().cast(),
                    BytecodeLength: ps.bytes.len(),
                },
                None => D3D12_SHADER_BYTECODE::default(),
            },
            BlendState: blend,
            SampleMask: u32::MAX,
            RasterizerState: rasterizer,
            DepthStencilState: depth_stencil,
            InputLayout: D3D12_INPUT_LAYOUT_DESC {
                pInputElementDescs: if input_elements.is_empty() {
                    std::ptr::null()
                } else {
                    input_elements.as_ptr()
                },
                NumElements: input_elements.len() as u32,
            },
            IBStripCutValue: D3D12_INDEX_BUFFER_STRIP_CUT_VALUE_DISABLED,
            PrimitiveTopologyType: topology_class,
            NumRenderTargets: desc.color_targets.len() as u32,
            RTVFormats: rtv_formats,
            DSVFormat: dsv_format,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: desc.sample_count.max(1),
                Quality: 0,
            },
            ..Default::default()
        };
        let result = unsafe { device.CreateGraphicsPipelineState(&pso_desc) };
        // The root signature pointer was borrowed, not owned; forget it.
        pso_desc.pRootSignature = ManuallyDrop::new(None);
        let pso: ID3D12PipelineState =
            result.map_err(|e| Error::backend("ID3D12Device::CreateGraphicsPipelineState", e))?;

        Ok(Self {
            pso,
            topology,
            vertex_strides,
        })
    }
}

impl std::fmt::Debug for D3D12GraphicsPipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12GraphicsPipelineState")
            .field("topology", &self.topology)
            .finish_non_exhaustive()
    }
}

impl GraphicsPipelineState for D3D12GraphicsPipelineState {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct D3D12ComputePipelineState {
    pub(crate) pso: ID3D12PipelineState,
}

impl D3D12ComputePipelineState {
    pub(crate) fn create(
        device: &ID3D12Device,
        desc: &ComputePipelineStateDescriptor<'_>,
    ) -> Result<Self> {
        let root_sig = desc
            .root_signature
            .as_any()
            .downcast_ref::<D3D12RootSignature>()
            .ok_or_else(|| Error::invalid("root signature is not a D3D12 root signature"))?;
        let cs = desc
            .cs
            .as_any()
            .downcast_ref::<D3D12Shader>()
            .ok_or_else(|| Error::invalid("compute shader is not a D3D12 shader"))?;
        if !cs.stage.contains(ShaderStages::COMPUTE) {
            return Err(Error::invalid(
                "cs blob was not created for the compute stage",
            ));
        }
        let mut pso_desc = D3D12_COMPUTE_PIPELINE_STATE_DESC {
            pRootSignature: unsafe { std::mem::transmute_copy(&root_sig.raw) },
            CS: D3D12_SHADER_BYTECODE {
                pShaderBytecode: cs.bytes.as_ptr().cast(),
                BytecodeLength: cs.bytes.len(),
            },
            ..Default::default()
        };
        let result = unsafe { device.CreateComputePipelineState(&pso_desc) };
        pso_desc.pRootSignature = ManuallyDrop::new(None);
        let pso: ID3D12PipelineState =
            result.map_err(|e| Error::backend("ID3D12Device::CreateComputePipelineState", e))?;
        Ok(Self { pso })
    }
}

impl std::fmt::Debug for D3D12ComputePipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12ComputePipelineState").finish()
    }
}

impl ComputePipelineState for D3D12ComputePipelineState {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
