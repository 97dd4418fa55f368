//! Command-buffer recording: lifecycle, barrier translation, render-pass
//! and compute-pass encoders.

use std::sync::Arc;

use ash::vk;

use crate::{
    buffer_barrier_action, texture_barrier_action, BarrierAction, BufferBarrier, CommandBuffer,
    ComputePassEncoder, ComputePipelineState, DescriptorSet, Error, GraphicsPipelineState,
    IndexBufferView, QueueType, RenderPassDescriptor, RenderPassEncoder, Result, RootSignature,
    ScissorRect, SubresourceRange, TextureBarrier, VertexBufferView, Viewport,
};

use super::buffer::VulkanBuffer;
use super::conv;
use super::descriptor::VulkanDescriptorSet;
use super::pipeline::{
    BoundLayoutInfo, VulkanComputePipelineState, VulkanGraphicsPipelineState, VulkanRootSignature,
};
use super::render_pass::{build_transient_pass, TransientPass};
use super::texture::VulkanTexture;

/// Queue-family indices resolved at device creation, used for ownership
/// transfer barriers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueueFamilyTable {
    pub graphics: u32,
    pub compute: u32,
    pub copy: u32,
}

impl QueueFamilyTable {
    pub(crate) fn family(&self, ty: QueueType) -> u32 {
        match ty {
            QueueType::Graphics => self.graphics,
            QueueType::Compute => self.compute,
            QueueType::Copy => self.copy,
        }
    }
}

pub struct VulkanCommandBuffer {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) pool: vk::CommandPool,
    pub(crate) cmd: vk::CommandBuffer,
    pub(crate) queue_type: QueueType,
    pub(crate) families: QueueFamilyTable,
    pub(crate) recording: bool,
    pub(crate) pass_active: bool,
    /// Transient render passes from ended encoders; safe to destroy only
    /// once the buffer is reset for a new recording.
    pub(crate) ended_passes: Vec<TransientPass>,
}

impl VulkanCommandBuffer {
    fn release_ended_passes(&mut self) {
        for pass in self.ended_passes.drain(..) {
            pass.destroy(&self.device);
        }
    }

    fn own_family(&self) -> u32 {
        self.families.family(self.queue_type)
    }
}

impl Drop for VulkanCommandBuffer {
    fn drop(&mut self) {
        self.release_ended_passes();
        unsafe {
            self.device.free_command_buffers(self.pool, &[self.cmd]);
            self.device.destroy_command_pool(self.pool, None);
        }
    }
}

impl std::fmt::Debug for VulkanCommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanCommandBuffer")
            .field("queue_type", &self.queue_type)
            .field("recording", &self.recording)
            .finish_non_exhaustive()
    }
}

impl CommandBuffer for VulkanCommandBuffer {
    fn begin(&mut self) -> Result<()> {
        self.release_ended_passes();
        // Reset-on-begin: a double begin is the same as one reset + begin.
        if let Err(e) = unsafe {
            self.device
                .reset_command_pool(self.pool, vk::CommandPoolResetFlags::empty())
        } {
            panic!("vkResetCommandPool failed: {e}");
        }
        let info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.device
                .begin_command_buffer(self.cmd, &info)
                .map_err(|e| Error::backend("vkBeginCommandBuffer", e))?;
        }
        self.recording = true;
        self.pass_active = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            return Err(Error::invalid("end called outside begin/end"));
        }
        unsafe {
            self.device
                .end_command_buffer(self.cmd)
                .map_err(|e| Error::backend("vkEndCommandBuffer", e))?;
        }
        self.recording = false;
        Ok(())
    }

    fn resource_barrier(
        &mut self,
        buffers: &[BufferBarrier<'_>],
        textures: &[TextureBarrier<'_>],
    ) {
        let mut src_stages = vk::PipelineStageFlags::empty();
        let mut dst_stages = vk::PipelineStageFlags::empty();
        let mut buffer_barriers = Vec::with_capacity(buffers.len());
        let mut image_barriers = Vec::with_capacity(textures.len());

        for b in buffers {
            if buffer_barrier_action(b.before, b.after) == BarrierAction::Skip {
                continue;
            }
            let Some(buf) = b.buffer.as_any().downcast_ref::<VulkanBuffer>() else {
                log::error!("buffer barrier target is not a Vulkan buffer");
                continue;
            };
            let (src_family, dst_family) = match b.queue_transfer {
                Some(t) => {
                    let other = self.families.family(t.other);
                    if t.incoming {
                        (other, self.own_family())
                    } else {
                        (self.own_family(), other)
                    }
                }
                None => (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED),
            };
            buffer_barriers.push(
                vk::BufferMemoryBarrier::default()
                    .src_access_mask(conv::buffer_use_access(b.before))
                    .dst_access_mask(conv::buffer_use_access(b.after))
                    .src_queue_family_index(src_family)
                    .dst_queue_family_index(dst_family)
                    .buffer(buf.buffer)
                    .offset(0)
                    .size(vk::WHOLE_SIZE),
            );
            src_stages |= conv::buffer_use_stages(b.before);
            dst_stages |= conv::buffer_use_stages(b.after);
        }

        for t in textures {
            if texture_barrier_action(t.before, t.after) == BarrierAction::Skip {
                continue;
            }
            let Some(tex) = t.texture.as_any().downcast_ref::<VulkanTexture>() else {
                log::error!("texture barrier target is not a Vulkan texture");
                continue;
            };
            let (src_family, dst_family) = match t.queue_transfer {
                Some(qt) => {
                    let other = self.families.family(qt.other);
                    if qt.incoming {
                        (other, self.own_family())
                    } else {
                        (self.own_family(), other)
                    }
                }
                None => (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED),
            };
            let range = t.subresource.unwrap_or_default();
            image_barriers.push(
                vk::ImageMemoryBarrier::default()
                    .src_access_mask(conv::texture_use_access(t.before))
                    .dst_access_mask(conv::texture_use_access(t.after))
                    .old_layout(conv::texture_use_layout(t.before))
                    .new_layout(conv::texture_use_layout(t.after))
                    .src_queue_family_index(src_family)
                    .dst_queue_family_index(dst_family)
                    .image(tex.image)
                    .subresource_range(conv::subresource_range(
                        &range,
                        conv::format_aspect(tex.desc.format),
                    )),
            );
            src_stages |= conv::texture_use_stages(t.before, true);
            dst_stages |= conv::texture_use_stages(t.after, false);
        }

        if buffer_barriers.is_empty() && image_barriers.is_empty() {
            return;
        }
        if src_stages.is_empty() {
            src_stages = vk::PipelineStageFlags::TOP_OF_PIPE;
        }
        if dst_stages.is_empty() {
            dst_stages = vk::PipelineStageFlags::BOTTOM_OF_PIPE;
        }
        unsafe {
            self.device.cmd_pipeline_barrier(
                self.cmd,
                src_stages,
                dst_stages,
                vk::DependencyFlags::empty(),
                &[],
                &buffer_barriers,
                &image_barriers,
            );
        }
    }

    fn transition_resource(
        &mut self,
        _buffers: &[BufferBarrier<'_>],
        _textures: &[TextureBarrier<'_>],
    ) {
        log::error!("{}", Error::Unimplemented("CommandBuffer::transition_resource"));
    }

    fn begin_render_pass(
        &mut self,
        desc: &RenderPassDescriptor<'_>,
    ) -> Result<Box<dyn RenderPassEncoder>> {
        if self.pass_active {
            return Err(Error::invalid(
                "render pass already active on this command buffer",
            ));
        }
        let built = build_transient_pass(&self.device, desc)?;
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(built.pass.render_pass)
            .framebuffer(built.pass.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: built.extent,
            })
            .clear_values(&built.clear_values);
        unsafe {
            self.device
                .cmd_begin_render_pass(self.cmd, &begin_info, vk::SubpassContents::INLINE);
        }
        self.pass_active = true;
        Ok(Box::new(VulkanRenderPassEncoder {
            device: Arc::clone(&self.device),
            owner: self.cmd,
            cmd: self.cmd,
            transient: Some(built.pass),
            bound_layout: None,
            pipeline_bound: false,
            pending_vertex_buffers: Vec::new(),
        }))
    }

    fn end_render_pass(&mut self, mut encoder: Box<dyn RenderPassEncoder>) {
        let Some(enc) = encoder
            .as_any_mut()
            .downcast_mut::<VulkanRenderPassEncoder>()
        else {
            panic!("render pass encoder does not belong to this backend");
        };
        if enc.owner != self.cmd {
            panic!("render pass encoder does not belong to this command buffer");
        }
        unsafe {
            self.device.cmd_end_render_pass(self.cmd);
        }
        if let Some(pass) = enc.transient.take() {
            self.ended_passes.push(pass);
        }
        self.pass_active = false;
    }

    fn begin_compute_pass(&mut self) -> Result<Box<dyn ComputePassEncoder>> {
        Ok(Box::new(VulkanComputePassEncoder {
            device: Arc::clone(&self.device),
            owner: self.cmd,
            cmd: self.cmd,
            bound_layout: None,
        }))
    }

    fn end_compute_pass(&mut self, mut encoder: Box<dyn ComputePassEncoder>) {
        let Some(enc) = encoder
            .as_any_mut()
            .downcast_mut::<VulkanComputePassEncoder>()
        else {
            panic!("compute pass encoder does not belong to this backend");
        };
        if enc.owner != self.cmd {
            panic!("compute pass encoder does not belong to this command buffer");
        }
    }

    fn copy_buffer_to_buffer(
        &mut self,
        dst: &dyn crate::Buffer,
        dst_offset: u64,
        src: &dyn crate::Buffer,
        src_offset: u64,
        size: u64,
    ) {
        let (Some(dst), Some(src)) = (
            dst.as_any().downcast_ref::<VulkanBuffer>(),
            src.as_any().downcast_ref::<VulkanBuffer>(),
        ) else {
            log::error!("copy_buffer_to_buffer targets are not Vulkan buffers");
            return;
        };
        let region = vk::BufferCopy::default()
            .src_offset(src_offset)
            .dst_offset(dst_offset)
            .size(size);
        unsafe {
            self.device
                .cmd_copy_buffer(self.cmd, src.buffer, dst.buffer, &[region]);
        }
    }

    fn copy_buffer_to_texture(
        &mut self,
        dst: &dyn crate::Texture,
        dst_range: SubresourceRange,
        src: &dyn crate::Buffer,
        src_offset: u64,
    ) {
        let (Some(dst), Some(src)) = (
            dst.as_any().downcast_ref::<VulkanTexture>(),
            src.as_any().downcast_ref::<VulkanBuffer>(),
        ) else {
            log::error!("copy_buffer_to_texture targets are not Vulkan resources");
            return;
        };
        let mip = dst_range.base_mip;
        let width = (dst.desc.width >> mip).max(1);
        let height = (dst.desc.height >> mip).max(1);
        let depth = match dst.desc.dim {
            crate::TextureDimension::D3 => (dst.desc.depth_or_array >> mip).max(1),
            _ => 1,
        };
        let layer_count = if dst_range.layer_count == crate::ALL_LAYERS {
            match dst.desc.dim {
                crate::TextureDimension::D3 => 1,
                _ => dst.desc.depth_or_array - dst_range.base_layer,
            }
        } else {
            dst_range.layer_count
        };
        let region = vk::BufferImageCopy::default()
            .buffer_offset(src_offset)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(
                vk::ImageSubresourceLayers::default()
                    .aspect_mask(conv::format_aspect(dst.desc.format))
                    .mip_level(mip)
                    .base_array_layer(dst_range.base_layer)
                    .layer_count(layer_count),
            )
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width,
                height,
                depth,
            });
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                self.cmd,
                src.buffer,
                dst.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct VulkanRenderPassEncoder {
    device: Arc<ash::Device>,
    /// Identity of the command buffer that opened this pass.
    owner: vk::CommandBuffer,
    cmd: vk::CommandBuffer,
    transient: Option<TransientPass>,
    bound_layout: Option<BoundLayoutInfo>,
    pipeline_bound: bool,
    /// Vertex buffers stashed until a pipeline provides the strides.
    pending_vertex_buffers: Vec<(vk::Buffer, u64)>,
}

impl Drop for VulkanRenderPassEncoder {
    fn drop(&mut self) {
        // Dropped without end_render_pass: nothing recorded references the
        // transients anymore once the owner resets, but we cannot know, so
        // destroy immediately and let validation flag misuse.
        if let Some(pass) = self.transient.take() {
            pass.destroy(&self.device);
        }
    }
}

impl VulkanRenderPassEncoder {
    fn flush_vertex_buffers(&mut self) {
        if self.pending_vertex_buffers.is_empty() {
            return;
        }
        let buffers: Vec<vk::Buffer> = self.pending_vertex_buffers.iter().map(|v| v.0).collect();
        let offsets: Vec<u64> = self.pending_vertex_buffers.iter().map(|v| v.1).collect();
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.cmd, 0, &buffers, &offsets);
        }
        self.pending_vertex_buffers.clear();
    }
}

impl std::fmt::Debug for VulkanRenderPassEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanRenderPassEncoder").finish_non_exhaustive()
    }
}

impl RenderPassEncoder for VulkanRenderPassEncoder {
    fn set_viewport(&mut self, viewport: Viewport) {
        let v = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.device.cmd_set_viewport(self.cmd, 0, &[v]);
        }
    }

    fn set_scissor(&mut self, rect: ScissorRect) {
        let s = vk::Rect2D {
            offset: vk::Offset2D {
                x: rect.x,
                y: rect.y,
            },
            extent: vk::Extent2D {
                width: rect.width,
                height: rect.height,
            },
        };
        unsafe {
            self.device.cmd_set_scissor(self.cmd, 0, &[s]);
        }
    }

    fn bind_root_signature(&mut self, root_signature: &dyn RootSignature) {
        let Some(sig) = root_signature
            .as_any()
            .downcast_ref::<VulkanRootSignature>()
        else {
            log::error!("root signature is not a Vulkan root signature");
            return;
        };
        self.bound_layout = Some(sig.bound_info());
    }

    fn bind_graphics_pipeline(&mut self, pipeline: &dyn GraphicsPipelineState) {
        let Some(p) = pipeline
            .as_any()
            .downcast_ref::<VulkanGraphicsPipelineState>()
        else {
            log::error!("pipeline is not a Vulkan graphics pipeline");
            return;
        };
        unsafe {
            self.device
                .cmd_bind_pipeline(self.cmd, vk::PipelineBindPoint::GRAPHICS, p.pipeline);
        }
        self.pipeline_bound = true;
        self.flush_vertex_buffers();
    }

    fn bind_vertex_buffers(&mut self, views: &[VertexBufferView<'_>]) {
        let mut raw = Vec::with_capacity(views.len());
        for view in views {
            let Some(buf) = view.buffer.as_any().downcast_ref::<VulkanBuffer>() else {
                log::error!("vertex buffer is not a Vulkan buffer");
                return;
            };
            raw.push((buf.buffer, view.offset));
        }
        self.pending_vertex_buffers = raw;
        if self.pipeline_bound {
            self.flush_vertex_buffers();
        }
    }

    fn bind_index_buffer(&mut self, view: IndexBufferView<'_>) {
        let Some(buf) = view.buffer.as_any().downcast_ref::<VulkanBuffer>() else {
            log::error!("index buffer is not a Vulkan buffer");
            return;
        };
        let index_type = match view.stride {
            2 => vk::IndexType::UINT16,
            4 => vk::IndexType::UINT32,
            other => {
                log::error!("unsupported index stride {other} on the Vulkan backend");
                return;
            }
        };
        unsafe {
            self.device
                .cmd_bind_index_buffer(self.cmd, buf.buffer, view.offset, index_type);
        }
    }

    fn push_constants(&mut self, data: &[u8]) {
        let Some(layout) = &self.bound_layout else {
            log::error!("bind a root signature before push_constants");
            return;
        };
        let Some((size, stages)) = layout.push else {
            log::error!("bound root signature declares no root constant");
            return;
        };
        if data.len() % 4 != 0 || data.len() as u32 > size {
            log::error!(
                "push constant length {} invalid for declared size {size}",
                data.len()
            );
            return;
        }
        unsafe {
            self.device
                .cmd_push_constants(self.cmd, layout.layout, stages, 0, data);
        }
    }

    fn bind_root_descriptor(&mut self, _slot: u32, _view: &dyn crate::BufferView) {
        log::error!("root descriptors are not available on the Vulkan backend");
    }

    fn bind_descriptor_set(&mut self, slot: u32, set: &dyn DescriptorSet) {
        let Some(layout) = &self.bound_layout else {
            log::error!("bind a root signature before bind_descriptor_set");
            return;
        };
        if slot >= layout.set_count {
            log::error!(
                "descriptor set slot {slot} out of range ({} sets)",
                layout.set_count
            );
            return;
        }
        let Some(set) = set.as_any().downcast_ref::<VulkanDescriptorSet>() else {
            log::error!("descriptor set is not a Vulkan set");
            return;
        };
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.cmd,
                vk::PipelineBindPoint::GRAPHICS,
                layout.layout,
                slot,
                &[set.set],
                &[],
            );
        }
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw(
                self.cmd,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw_indexed(
                self.cmd,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

pub struct VulkanComputePassEncoder {
    device: Arc<ash::Device>,
    owner: vk::CommandBuffer,
    cmd: vk::CommandBuffer,
    bound_layout: Option<BoundLayoutInfo>,
}

impl std::fmt::Debug for VulkanComputePassEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanComputePassEncoder").finish_non_exhaustive()
    }
}

impl ComputePassEncoder for VulkanComputePassEncoder {
    fn bind_root_signature(&mut self, root_signature: &dyn RootSignature) {
        let Some(sig) = root_signature
            .as_any()
            .downcast_ref::<VulkanRootSignature>()
        else {
            log::error!("root signature is not a Vulkan root signature");
            return;
        };
        self.bound_layout = Some(sig.bound_info());
    }

    fn bind_compute_pipeline(&mut self, pipeline: &dyn ComputePipelineState) {
        let Some(p) = pipeline
            .as_any()
            .downcast_ref::<VulkanComputePipelineState>()
        else {
            log::error!("pipeline is not a Vulkan compute pipeline");
            return;
        };
        unsafe {
            self.device
                .cmd_bind_pipeline(self.cmd, vk::PipelineBindPoint::COMPUTE, p.pipeline);
        }
    }

    fn bind_descriptor_set(&mut self, slot: u32, set: &dyn DescriptorSet) {
        let Some(layout) = &self.bound_layout else {
            log::error!("bind a root signature before bind_descriptor_set");
            return;
        };
        if slot >= layout.set_count {
            log::error!(
                "descriptor set slot {slot} out of range ({} sets)",
                layout.set_count
            );
            return;
        }
        let Some(set) = set.as_any().downcast_ref::<VulkanDescriptorSet>() else {
            log::error!("descriptor set is not a Vulkan set");
            return;
        };
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.cmd,
                vk::PipelineBindPoint::COMPUTE,
                layout.layout,
                slot,
                &[set.set],
                &[],
            );
        }
    }

    fn push_constants(&mut self, data: &[u8]) {
        let Some(layout) = &self.bound_layout else {
            log::error!("bind a root signature before push_constants");
            return;
        };
        let Some((size, stages)) = layout.push else {
            log::error!("bound root signature declares no root constant");
            return;
        };
        if data.len() % 4 != 0 || data.len() as u32 > size {
            log::error!(
                "push constant length {} invalid for declared size {size}",
                data.len()
            );
            return;
        }
        unsafe {
            self.device
                .cmd_push_constants(self.cmd, layout.layout, stages, 0, data);
        }
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        unsafe {
            self.device.cmd_dispatch(self.cmd, x, y, z);
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
