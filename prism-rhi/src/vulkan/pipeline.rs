//! Pipeline layouts and pipeline state objects for the Vulkan backend.

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;

use crate::{
    ComputePipelineState, ComputePipelineStateDescriptor, Error, GraphicsPipelineState,
    GraphicsPipelineStateDescriptor, PrimitiveTopology, Result, RootConstant, RootDescriptor,
    RootSignature, RootSignatureDescriptor, ShaderStages,
};

use super::conv;
use super::descriptor::{SetLayoutInner, VulkanDescriptorSetLayout};
use super::render_pass::{create_compatible_render_pass, AttachmentFormats};
use super::shader::VulkanShader;

/// Everything an encoder needs from a bound root signature, cheap to copy
/// into the recording state cache.
#[derive(Clone)]
pub(crate) struct BoundLayoutInfo {
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) push: Option<(u32, vk::ShaderStageFlags)>,
    pub(crate) set_count: u32,
}

pub struct VulkanRootSignature {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) set_layouts: Vec<Arc<SetLayoutInner>>,
    pub(crate) constant: Option<RootConstant>,
    pub(crate) used_stages: ShaderStages,
}

impl VulkanRootSignature {
    pub(crate) fn create(
        device: Arc<ash::Device>,
        desc: &RootSignatureDescriptor<'_>,
    ) -> Result<Self> {
        if !desc.root_descriptors.is_empty() {
            // No Vulkan equivalent of a root CBV/SRV/UAV parameter.
            return Err(Error::unsupported(
                "root descriptors are not available on the Vulkan backend",
            ));
        }
        let mut used_stages = ShaderStages::empty();
        let mut set_layouts = Vec::with_capacity(desc.sets.len());
        for set in desc.sets {
            let concrete = set
                .as_any()
                .downcast_ref::<VulkanDescriptorSetLayout>()
                .ok_or_else(|| Error::invalid("set layout is not a Vulkan layout"))?;
            for e in &concrete.inner.elements {
                used_stages |= e.stages;
            }
            set_layouts.push(Arc::clone(&concrete.inner));
        }
        let raw_layouts: Vec<vk::DescriptorSetLayout> =
            set_layouts.iter().map(|l| l.layout).collect();
        let mut info = vk::PipelineLayoutCreateInfo::default().set_layouts(&raw_layouts);
        let mut push_range = vk::PushConstantRange::default();
        if let Some(c) = desc.constant {
            if c.size % 4 != 0 {
                return Err(Error::invalid("root constant size must be a multiple of 4"));
            }
            used_stages |= c.stages;
            push_range = push_range
                .stage_flags(conv::shader_stages(c.stages))
                .offset(0)
                .size(c.size);
            info = info.push_constant_ranges(std::slice::from_ref(&push_range));
        }
        let layout = unsafe {
            device
                .create_pipeline_layout(&info, None)
                .map_err(|e| Error::backend("vkCreatePipelineLayout", e))?
        };
        Ok(Self {
            device,
            layout,
            set_layouts,
            constant: desc.constant,
            used_stages,
        })
    }

    pub(crate) fn bound_info(&self) -> BoundLayoutInfo {
        BoundLayoutInfo {
            layout: self.layout,
            push: self
                .constant
                .map(|c| (c.size, conv::shader_stages(c.stages))),
            set_count: self.set_layouts.len() as u32,
        }
    }
}

impl Drop for VulkanRootSignature {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

impl std::fmt::Debug for VulkanRootSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanRootSignature")
            .field("sets", &self.set_layouts.len())
            .field("used_stages", &self.used_stages)
            .finish_non_exhaustive()
    }
}

impl RootSignature for VulkanRootSignature {
    fn root_constant(&self) -> Option<RootConstant> {
        self.constant
    }

    fn root_descriptors(&self) -> &[RootDescriptor] {
        &[]
    }

    fn used_stages(&self) -> ShaderStages {
        self.used_stages
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct VulkanGraphicsPipelineState {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) pipeline: vk::Pipeline,
    /// Owned render pass compatible with any transient pass over the same
    /// attachment formats.
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) topology: PrimitiveTopology,
    pub(crate) vertex_strides: Vec<u32>,
}

impl VulkanGraphicsPipelineState {
    pub(crate) fn create(
        device: Arc<ash::Device>,
        desc: &GraphicsPipelineStateDescriptor<'_>,
    ) -> Result<Self> {
        let root_sig = desc
            .root_signature
            .as_any()
            .downcast_ref::<VulkanRootSignature>()
            .ok_or_else(|| Error::invalid("root signature is not a Vulkan root signature"))?;
        let vs = desc
            .vs
            .as_any()
            .downcast_ref::<VulkanShader>()
            .ok_or_else(|| Error::invalid("vertex shader is not a Vulkan shader"))?;
        if !vs.stage.contains(ShaderStages::VERTEX) {
            return Err(Error::invalid("vs blob was not created for the vertex stage"));
        }
        let ps = desc
            .ps
            .map(|s| {
                s.as_any()
                    .downcast_ref::<VulkanShader>()
                    .ok_or_else(|| Error::invalid("pixel shader is not a Vulkan shader"))
            })
            .transpose()?;

        let formats = AttachmentFormats {
            colors: desc.color_targets.iter().map(|t| t.format).collect(),
            depth_stencil: desc.depth_stencil.as_ref().map(|d| d.format),
            sample_count: desc.sample_count,
        };
        let render_pass = create_compatible_render_pass(&device, &formats)?;

        // Entry-point strings outlive every stage info referencing them.
        let vs_entry = CString::new(vs.entry_point.as_str())
            .map_err(|_| Error::invalid("entry point contains a NUL byte"))?;
        let ps_entry = ps
            .map(|ps| {
                CString::new(ps.entry_point.as_str())
                    .map_err(|_| Error::invalid("entry point contains a NUL byte"))
            })
            .transpose()?;
        let mut stages = vec![vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vs.module)
            .name(&vs_entry)];
        if let (Some(ps), Some(ps_entry)) = (ps, ps_entry.as_ref()) {
            stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(ps.module)
                    .name(ps_entry),
            );
        }

        let mut bindings = Vec::with_capacity(desc.vertex_layouts.len());
        let mut attributes = Vec::new();
        let mut vertex_strides = Vec::with_capacity(desc.vertex_layouts.len());
        for (index, layout) in desc.vertex_layouts.iter().enumerate() {
            vertex_strides.push(layout.stride);
            bindings.push(
                vk::VertexInputBindingDescription::default()
                    .binding(index as u32)
                    .stride(layout.stride)
                    .input_rate(conv::vertex_step_mode(layout.step_mode)),
            );
            for element in &layout.elements {
                attributes.push(
                    vk::VertexInputAttributeDescription::default()
                        .location(element.location)
                        .binding(index as u32)
                        .format(conv::vertex_format(element.format))
                        .offset(element.offset),
                );
            }
        }
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(conv::primitive_topology(desc.primitive.topology))
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(conv::polygon_mode(desc.primitive.polygon_mode))
            .line_width(1.0)
            .cull_mode(conv::cull_mode(desc.primitive.cull))
            .front_face(conv::front_face(desc.primitive.front_face))
            .depth_bias_enable(false);

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(conv::sample_count(desc.sample_count));

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc
            .color_targets
            .iter()
            .map(|target| {
                let write_mask = conv::color_write_mask(target.write_mask);
                match &target.blend {
                    None => vk::PipelineColorBlendAttachmentState::default()
                        .blend_enable(false)
                        .color_write_mask(write_mask),
                    Some((color, alpha)) => vk::PipelineColorBlendAttachmentState::default()
                        .blend_enable(true)
                        .src_color_blend_factor(conv::blend_factor(color.src))
                        .dst_color_blend_factor(conv::blend_factor(color.dst))
                        .color_blend_op(conv::blend_op(color.op))
                        .src_alpha_blend_factor(conv::blend_factor(alpha.src))
                        .dst_alpha_blend_factor(conv::blend_factor(alpha.dst))
                        .alpha_blend_op(conv::blend_op(alpha.op))
                        .color_write_mask(write_mask),
                }
            })
            .collect();
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let depth_stencil = match &desc.depth_stencil {
            None => vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(false)
                .depth_write_enable(false)
                .stencil_test_enable(false),
            Some(ds) => {
                let face = |f: &crate::StencilFaceState| {
                    vk::StencilOpState {
                        fail_op: conv::stencil_op(f.fail),
                        pass_op: conv::stencil_op(f.pass),
                        depth_fail_op: conv::stencil_op(f.depth_fail),
                        compare_op: conv::compare_op(f.compare),
                        compare_mask: ds.stencil_read_mask as u32,
                        write_mask: ds.stencil_write_mask as u32,
                        reference: 0,
                    }
                };
                vk::PipelineDepthStencilStateCreateInfo::default()
                    .depth_test_enable(ds.depth_test)
                    .depth_write_enable(ds.depth_write)
                    .depth_compare_op(conv::compare_op(ds.depth_compare))
                    .depth_bounds_test_enable(false)
                    .stencil_test_enable(ds.stencil_test)
                    .front(face(&ds.front))
                    .back(face(&ds.back))
            }
        };

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(root_sig.layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = match unsafe { create_graphics_pipelines(&device, &info) } {
            Ok(p) => p,
            Err(e) => {
                unsafe { device.destroy_render_pass(render_pass, None) };
                return Err(Error::backend("vkCreateGraphicsPipelines", e));
            }
        };

        Ok(Self {
            device,
            pipeline: pipelines[0],
            render_pass,
            topology: desc.primitive.topology,
            vertex_strides,
        })
    }
}

unsafe fn create_graphics_pipelines(
    device: &ash::Device,
    info: &vk::GraphicsPipelineCreateInfo<'_>,
) -> std::result::Result<Vec<vk::Pipeline>, vk::Result> {
    device
        .create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(info), None)
        .map_err(|(_, e)| e)
}

impl Drop for VulkanGraphicsPipelineState {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

impl std::fmt::Debug for VulkanGraphicsPipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanGraphicsPipelineState")
            .field("topology", &self.topology)
            .finish_non_exhaustive()
    }
}

impl GraphicsPipelineState for VulkanGraphicsPipelineState {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct VulkanComputePipelineState {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) pipeline: vk::Pipeline,
}

impl VulkanComputePipelineState {
    pub(crate) fn create(
        device: Arc<ash::Device>,
        desc: &ComputePipelineStateDescriptor<'_>,
    ) -> Result<Self> {
        let root_sig = desc
            .root_signature
            .as_any()
            .downcast_ref::<VulkanRootSignature>()
            .ok_or_else(|| Error::invalid("root signature is not a Vulkan root signature"))?;
        let cs = desc
            .cs
            .as_any()
            .downcast_ref::<VulkanShader>()
            .ok_or_else(|| Error::invalid("compute shader is not a Vulkan shader"))?;
        if !cs.stage.contains(ShaderStages::COMPUTE) {
            return Err(Error::invalid(
                "cs blob was not created for the compute stage",
            ));
        }
        let entry = CString::new(cs.entry_point.as_str())
            .map_err(|_| Error::invalid("entry point contains a NUL byte"))?;
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(cs.module)
            .name(&entry);
        let info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(root_sig.layout);
        let pipelines = unsafe {
            device
                .create_compute_pipelines(vk::PipelineCache::null(), &[info], None)
                .map_err(|(_, e)| Error::backend("vkCreateComputePipelines", e))?
        };
        Ok(Self {
            device,
            pipeline: pipelines[0],
        })
    }
}

impl Drop for VulkanComputePipelineState {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
        }
    }
}

impl std::fmt::Debug for VulkanComputePipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanComputePipelineState").finish()
    }
}

impl ComputePipelineState for VulkanComputePipelineState {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
