//! Command-list recording for the D3D12 backend.

use std::mem::ManuallyDrop;

use windows::core::Interface;
use windows::Win32::Graphics::Direct3D12::*;

use crate::{
    buffer_barrier_action, subresource_index, texture_barrier_action, BarrierAction, BufferBarrier,
    CommandBuffer, ComputePassEncoder, ComputePipelineState, DescriptorSet, Error,
    GraphicsPipelineState, IndexBufferView, QueueType, RenderPassDescriptor, RenderPassEncoder,
    ResourceKind, Result, RootConstant, RootDescriptor, RootSignature, ScissorRect,
    SubresourceRange, TextureBarrier, VertexBufferView, Viewport,
};

use super::buffer::{D3D12Buffer, D3D12BufferView};
use super::conv;
use super::render_pass::build_render_pass_descs;
use super::root_signature::{D3D12RootSignature, HeapCategory, SetBinding};
use super::texture::D3D12Texture;

/// Borrow an interface pointer into a ManuallyDrop<Option<…>> barrier
/// field without touching its refcount.
fn borrow_resource(resource: &ID3D12Resource) -> ManuallyDrop<Option<ID3D12Resource>> {
    ManuallyDrop::new(Some(unsafe { std::mem::transmute_copy(resource) }))
}

pub struct D3D12CommandBuffer {
    pub(crate) list: ID3D12GraphicsCommandList,
    pub(crate) list4: ID3D12GraphicsCommandList4,
    pub(crate) allocator: ID3D12CommandAllocator,
    pub(crate) queue_type: QueueType,
    /// Shader-visible heaps rebound at every `begin` on graphics/compute
    /// lists; copy queues never bind heaps.
    pub(crate) gpu_heaps: Option<[ID3D12DescriptorHeap; 2]>,
    pub(crate) recording: bool,
    pub(crate) pass_active: bool,
}

impl std::fmt::Debug for D3D12CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12CommandBuffer")
            .field("queue_type", &self.queue_type)
            .field("recording", &self.recording)
            .finish_non_exhaustive()
    }
}

impl CommandBuffer for D3D12CommandBuffer {
    fn begin(&mut self) -> Result<()> {
        // Reset-on-begin; a failed allocator reset means the recording
        // state is unrecoverable.
        if let Err(e) = unsafe { self.allocator.Reset() } {
            panic!("ID3D12CommandAllocator::Reset failed: {e}");
        }
        if let Err(e) = unsafe { self.list.Reset(&self.allocator, None) } {
            panic!("ID3D12GraphicsCommandList::Reset failed: {e}");
        }
        if let Some(heaps) = &self.gpu_heaps {
            let bound: [Option<ID3D12DescriptorHeap>; 2] =
                [Some(heaps[0].clone()), Some(heaps[1].clone())];
            unsafe {
                self.list.SetDescriptorHeaps(&bound);
            }
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
            self.list
                .Close()
                .map_err(|e| Error::backend("ID3D12GraphicsCommandList::Close", e))?;
        }
        self.recording = false;
        Ok(())
    }

    fn resource_barrier(
        &mut self,
        buffers: &[BufferBarrier<'_>],
        textures: &[TextureBarrier<'_>],
    ) {
        let mut raw = Vec::with_capacity(buffers.len() + textures.len());
        for b in buffers {
            let Some(buf) = b.buffer.as_any().downcast_ref::<D3D12Buffer>() else {
                log::error!("buffer barrier target is not a D3D12 buffer");
                continue;
            };
            match buffer_barrier_action(b.before, b.after) {
                BarrierAction::Skip => continue,
                BarrierAction::UnorderedAccess => raw.push(D3D12_RESOURCE_BARRIER {
                    Type: D3D12_RESOURCE_BARRIER_TYPE_UAV,
                    Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
                    Anonymous: D3D12_RESOURCE_BARRIER_0 {
                        UAV: ManuallyDrop::new(D3D12_RESOURCE_UAV_BARRIER {
                            pResource: borrow_resource(&buf.resource),
                        }),
                    },
                }),
                BarrierAction::Transition => {
                    let before = conv::buffer_use_states(b.before);
                    let after = conv::buffer_use_states(b.after);
                    if before == after {
                        continue;
                    }
                    raw.push(D3D12_RESOURCE_BARRIER {
                        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
                        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
                        Anonymous: D3D12_RESOURCE_BARRIER_0 {
                            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                                pResource: borrow_resource(&buf.resource),
                                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                                StateBefore: before,
                                StateAfter: after,
                            }),
                        },
                    });
                }
            }
        }
        for t in textures {
            let Some(tex) = t.texture.as_any().downcast_ref::<D3D12Texture>() else {
                log::error!("texture barrier target is not a D3D12 texture");
                continue;
            };
            match texture_barrier_action(t.before, t.after) {
                BarrierAction::Skip => continue,
                BarrierAction::UnorderedAccess => raw.push(D3D12_RESOURCE_BARRIER {
                    Type: D3D12_RESOURCE_BARRIER_TYPE_UAV,
                    Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
                    Anonymous: D3D12_RESOURCE_BARRIER_0 {
                        UAV: ManuallyDrop::new(D3D12_RESOURCE_UAV_BARRIER {
                            pResource: borrow_resource(&tex.resource),
                        }),
                    },
                }),
                BarrierAction::Transition => {
                    let before = conv::texture_use_states(t.before);
                    let after = conv::texture_use_states(t.after);
                    // Present and Common map to the same state; a
                    // Present<->Common pair is a no-op in this API.
                    if before == after {
                        continue;
                    }
                    let subresource = match t.subresource {
                        Some(range) => subresource_index(
                            range.base_mip,
                            range.base_layer,
                            0,
                            tex.desc.mip_levels,
                            match tex.desc.dim {
                                crate::TextureDimension::D3 => 1,
                                _ => tex.desc.depth_or_array,
                            },
                        ),
                        None => D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                    };
                    raw.push(D3D12_RESOURCE_BARRIER {
                        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
                        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
                        Anonymous: D3D12_RESOURCE_BARRIER_0 {
                            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                                pResource: borrow_resource(&tex.resource),
                                Subresource: subresource,
                                StateBefore: before,
                                StateAfter: after,
                            }),
                        },
                    });
                }
            }
        }
        if !raw.is_empty() {
            unsafe {
                self.list.ResourceBarrier(&raw);
            }
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
        let (rt_descs, ds_desc) = build_render_pass_descs(desc)?;
        unsafe {
            self.list4.BeginRenderPass(
                Some(&rt_descs),
                ds_desc.as_ref().map(|d| d as *const _),
                D3D12_RENDER_PASS_FLAG_NONE,
            );
        }
        self.pass_active = true;
        Ok(Box::new(D3D12RenderPassEncoder {
            list: self.list.clone(),
            owner: self.list.as_raw() as usize,
            bound: None,
            pipeline_strides: None,
            pending_vertex_buffers: Vec::new(),
        }))
    }

    fn end_render_pass(&mut self, mut encoder: Box<dyn RenderPassEncoder>) {
        let Some(enc) = encoder.as_any_mut().downcast_mut::<D3D12RenderPassEncoder>() else {
            panic!("render pass encoder does not belong to this backend");
        };
        if enc.owner != self.list.as_raw() as usize {
            panic!("render pass encoder does not belong to this command buffer");
        }
        unsafe {
            self.list4.EndRenderPass();
        }
        self.pass_active = false;
    }

    fn begin_compute_pass(&mut self) -> Result<Box<dyn ComputePassEncoder>> {
        Ok(Box::new(D3D12ComputePassEncoder {
            list: self.list.clone(),
            owner: self.list.as_raw() as usize,
            bound: None,
        }))
    }

    fn end_compute_pass(&mut self, mut encoder: Box<dyn ComputePassEncoder>) {
        let Some(enc) = encoder.as_any_mut().downcast_mut::<D3D12ComputePassEncoder>() else {
            panic!("compute pass encoder does not belong to this backend");
        };
        if enc.owner != self.list.as_raw() as usize {
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
            dst.as_any().downcast_ref::<D3D12Buffer>(),
            src.as_any().downcast_ref::<D3D12Buffer>(),
        ) else {
            log::error!("copy_buffer_to_buffer targets are not D3D12 buffers");
            return;
        };
        unsafe {
            self.list
                .CopyBufferRegion(&dst.resource, dst_offset, &src.resource, src_offset, size);
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
            dst.as_any().downcast_ref::<D3D12Texture>(),
            src.as_any().downcast_ref::<D3D12Buffer>(),
        ) else {
            log::error!("copy_buffer_to_texture targets are not D3D12 resources");
            return;
        };
        let array_size = match dst.desc.dim {
            crate::TextureDimension::D3 => 1,
            _ => dst.desc.depth_or_array,
        };
        let subresource = subresource_index(
            dst_range.base_mip,
            dst_range.base_layer,
            0,
            dst.desc.mip_levels,
            array_size,
        );
        let resource_desc = unsafe { dst.resource.GetDesc() };
        let device: ID3D12Device = match unsafe { self.list.GetDevice() } {
            Ok(d) => d,
            Err(e) => {
                log::error!("ID3D12GraphicsCommandList::GetDevice failed: {e}");
                return;
            }
        };
        let mut footprint = D3D12_PLACED_SUBRESOURCE_FOOTPRINT::default();
        let mut rows = 0u32;
        let mut row_size = 0u64;
        let mut total = 0u64;
        unsafe {
            device.GetCopyableFootprints(
                &resource_desc,
                subresource,
                1,
                src_offset,
                Some(&mut footprint),
                Some(&mut rows),
                Some(&mut row_size),
                Some(&mut total),
            );
        }
        log::debug!("copy_buffer_to_texture rows={rows} row_size={row_size} total={total}");
        let src_loc = D3D12_TEXTURE_COPY_LOCATION {
            pResource: borrow_resource(&src.resource),
            Type: D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                PlacedFootprint: footprint,
            },
        };
        let dst_loc = D3D12_TEXTURE_COPY_LOCATION {
            pResource: borrow_resource(&dst.resource),
            Type: D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                SubresourceIndex: subresource,
            },
        };
        unsafe {
            self.list.CopyTextureRegion(&dst_loc, 0, 0, 0, &src_loc, None);
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Root-signature state copied into the encoder at bind time so slot
/// lookups never chase the original object.
struct BoundRootSig {
    raw: ID3D12RootSignature,
    constant: Option<RootConstant>,
    root_descriptors: Vec<RootDescriptor>,
    set_bindings: Vec<SetBinding>,
    root_const_start: u32,
    root_desc_start: u32,
}

pub struct D3D12RenderPassEncoder {
    list: ID3D12GraphicsCommandList,
    owner: usize,
    bound: Option<BoundRootSig>,
    /// Strides of the bound pipeline, indexed by vertex-buffer slot.
    pipeline_strides: Option<Vec<u32>>,
    /// (gpu address, remaining size) stashed until the pipeline supplies
    /// strides.
    pending_vertex_buffers: Vec<(u64, u64)>,
}

impl D3D12RenderPassEncoder {
    fn flush_vertex_buffers(&mut self) {
        let Some(strides) = &self.pipeline_strides else {
            return;
        };
        if self.pending_vertex_buffers.is_empty() {
            return;
        }
        let views: Vec<D3D12_VERTEX_BUFFER_VIEW> = self
            .pending_vertex_buffers
            .iter()
            .enumerate()
            .map(|(i, &(address, size))| D3D12_VERTEX_BUFFER_VIEW {
                BufferLocation: address,
                SizeInBytes: size as u32,
                StrideInBytes: strides.get(i).copied().unwrap_or(0),
            })
            .collect();
        unsafe {
            self.list.IASetVertexBuffers(0, Some(&views));
        }
        self.pending_vertex_buffers.clear();
    }
}

impl std::fmt::Debug for D3D12RenderPassEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12RenderPassEncoder").finish_non_exhaustive()
    }
}

impl RenderPassEncoder for D3D12RenderPassEncoder {
    fn set_viewport(&mut self, viewport: Viewport) {
        let vp = D3D12_VIEWPORT {
            TopLeftX: viewport.x,
            TopLeftY: viewport.y,
            Width: viewport.width,
            Height: viewport.height,
            MinDepth: viewport.min_depth,
            MaxDepth: viewport.max_depth,
        };
        unsafe {
            self.list.RSSetViewports(&[vp]);
        }
    }

    fn set_scissor(&mut self, rect: ScissorRect) {
        let r = windows::Win32::Foundation::RECT {
            left: rect.x,
            top: rect.y,
            right: rect.x + rect.width as i32,
            bottom: rect.y + rect.height as i32,
        };
        unsafe {
            self.list.RSSetScissorRects(&[r]);
        }
    }

    fn bind_root_signature(&mut self, root_signature: &dyn RootSignature) {
        let Some(sig) = root_signature.as_any().downcast_ref::<D3D12RootSignature>() else {
            log::error!("root signature is not a D3D12 root signature");
            return;
        };
        let rebind = self
            .bound
            .as_ref()
            .map_or(true, |b| b.raw.as_raw() != sig.raw.as_raw());
        if rebind {
            unsafe {
                self.list.SetGraphicsRootSignature(&sig.raw);
            }
            self.bound = Some(BoundRootSig {
                raw: sig.raw.clone(),
                constant: sig.constant,
                root_descriptors: sig.root_descriptors.clone(),
                set_bindings: sig.set_bindings.clone(),
                root_const_start: sig.root_const_start,
                root_desc_start: sig.root_desc_start,
            });
        }
    }

    fn bind_graphics_pipeline(&mut self, pipeline: &dyn GraphicsPipelineState) {
        let Some(p) = pipeline
            .as_any()
            .downcast_ref::<super::pipeline::D3D12GraphicsPipelineState>()
        else {
            log::error!("pipeline is not a D3D12 graphics pipeline");
            return;
        };
        unsafe {
            self.list.IASetPrimitiveTopology(p.topology);
            self.list.SetPipelineState(&p.pso);
        }
        self.pipeline_strides = Some(p.vertex_strides.clone());
        self.flush_vertex_buffers();
    }

    fn bind_vertex_buffers(&mut self, views: &[VertexBufferView<'_>]) {
        let mut raw = Vec::with_capacity(views.len());
        for view in views {
            let Some(buf) = view.buffer.as_any().downcast_ref::<D3D12Buffer>() else {
                log::error!("vertex buffer is not a D3D12 buffer");
                return;
            };
            raw.push((buf.gpu_address + view.offset, buf.size - view.offset));
        }
        self.pending_vertex_buffers = raw;
        // Strides live on the pipeline; replay once it is bound.
        self.flush_vertex_buffers();
    }

    fn bind_index_buffer(&mut self, view: IndexBufferView<'_>) {
        let Some(buf) = view.buffer.as_any().downcast_ref::<D3D12Buffer>() else {
            log::error!("index buffer is not a D3D12 buffer");
            return;
        };
        let ib = D3D12_INDEX_BUFFER_VIEW {
            BufferLocation: buf.gpu_address + view.offset,
            SizeInBytes: (buf.size - view.offset) as u32,
            Format: conv::index_format(view.stride),
        };
        unsafe {
            self.list.IASetIndexBuffer(Some(&ib));
        }
    }

    fn push_constants(&mut self, data: &[u8]) {
        let Some(bound) = &self.bound else {
            log::error!("bind a root signature before push_constants");
            return;
        };
        let Some(constant) = bound.constant else {
            log::error!("bound root signature declares no root constant");
            return;
        };
        if data.len() % 4 != 0 || data.len() as u32 > constant.size {
            log::error!(
                "push constant length {} invalid for declared size {}",
                data.len(),
                constant.size
            );
            return;
        }
        unsafe {
            self.list.SetGraphicsRoot32BitConstants(
                bound.root_const_start,
                data.len() as u32 / 4,
                data.as_ptr().cast(),
                0,
            );
        }
    }

    fn bind_root_descriptor(&mut self, slot: u32, view: &dyn crate::BufferView) {
        let Some(bound) = &self.bound else {
            log::error!("bind a root signature before bind_root_descriptor");
            return;
        };
        let Some(declared) = bound.root_descriptors.get(slot as usize) else {
            log::error!(
                "root descriptor slot {slot} out of range ({} declared)",
                bound.root_descriptors.len()
            );
            return;
        };
        let Some(bv) = view.as_any().downcast_ref::<D3D12BufferView>() else {
            log::error!("root descriptor view is not a D3D12 buffer view");
            return;
        };
        let address = bv.gpu_address + bv.offset;
        let index = bound.root_desc_start + slot;
        match (declared.kind, bv.kind) {
            (ResourceKind::CBuffer, ResourceKind::CBuffer) => unsafe {
                self.list.SetGraphicsRootConstantBufferView(index, address);
            },
            (ResourceKind::Buffer, ResourceKind::Buffer) => unsafe {
                self.list.SetGraphicsRootShaderResourceView(index, address);
            },
            (ResourceKind::RwBuffer, ResourceKind::RwBuffer) => unsafe {
                self.list.SetGraphicsRootUnorderedAccessView(index, address);
            },
            (declared, got) => {
                log::error!(
                    "root descriptor kind mismatch: declared {declared:?}, view is {got:?}"
                );
            }
        }
    }

    fn bind_descriptor_set(&mut self, slot: u32, set: &dyn DescriptorSet) {
        let Some(bound) = &self.bound else {
            log::error!("bind a root signature before bind_descriptor_set");
            return;
        };
        let Some(binding) = bound.set_bindings.get(slot as usize) else {
            log::error!(
                "descriptor set slot {slot} out of range ({} sets)",
                bound.set_bindings.len()
            );
            return;
        };
        let Some(set) = set
            .as_any()
            .downcast_ref::<super::root_signature::D3D12DescriptorSet>()
        else {
            log::error!("descriptor set is not a D3D12 set");
            return;
        };
        for param in &binding.params {
            let handle = match param.category {
                HeapCategory::Resource => set
                    .resource_range
                    .as_ref()
                    .map(|r| r.gpu_handle_at(param.descriptor_offset)),
                HeapCategory::Sampler => set
                    .sampler_range
                    .as_ref()
                    .map(|r| r.gpu_handle_at(param.descriptor_offset)),
            };
            let Some(handle) = handle else {
                log::error!("descriptor set does not cover the bound range category");
                continue;
            };
            unsafe {
                self.list
                    .SetGraphicsRootDescriptorTable(param.root_param_index, handle);
            }
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
            self.list
                .DrawInstanced(vertex_count, instance_count, first_vertex, first_instance);
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
            self.list.DrawIndexedInstanced(
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

pub struct D3D12ComputePassEncoder {
    list: ID3D12GraphicsCommandList,
    owner: usize,
    bound: Option<BoundRootSig>,
}

impl std::fmt::Debug for D3D12ComputePassEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12ComputePassEncoder").finish_non_exhaustive()
    }
}

impl ComputePassEncoder for D3D12ComputePassEncoder {
    fn bind_root_signature(&mut self, root_signature: &dyn RootSignature) {
        let Some(sig) = root_signature.as_any().downcast_ref::<D3D12RootSignature>() else {
            log::error!("root signature is not a D3D12 root signature");
            return;
        };
        unsafe {
            self.list.SetComputeRootSignature(&sig.raw);
        }
        self.bound = Some(BoundRootSig {
            raw: sig.raw.clone(),
            constant: sig.constant,
            root_descriptors: sig.root_descriptors.clone(),
            set_bindings: sig.set_bindings.clone(),
            root_const_start: sig.root_const_start,
            root_desc_start: sig.root_desc_start,
        });
    }

    fn bind_compute_pipeline(&mut self, pipeline: &dyn ComputePipelineState) {
        let Some(p) = pipeline
            .as_any()
            .downcast_ref::<super::pipeline::D3D12ComputePipelineState>()
        else {
            log::error!("pipeline is not a D3D12 compute pipeline");
            return;
        };
        unsafe {
            self.list.SetPipelineState(&p.pso);
        }
    }

    fn bind_descriptor_set(&mut self, slot: u32, set: &dyn DescriptorSet) {
        let Some(bound) = &self.bound else {
            log::error!("bind a root signature before bind_descriptor_set");
            return;
        };
        let Some(binding) = bound.set_bindings.get(slot as usize) else {
            log::error!(
                "descriptor set slot {slot} out of range ({} sets)",
                bound.set_bindings.len()
            );
            return;
        };
        let Some(set) = set
            .as_any()
            .downcast_ref::<super::root_signature::D3D12DescriptorSet>()
        else {
            log::error!("descriptor set is not a D3D12 set");
            return;
        };
        for param in &binding.params {
            let handle = match param.category {
                HeapCategory::Resource => set
                    .resource_range
                    .as_ref()
                    .map(|r| r.gpu_handle_at(param.descriptor_offset)),
                HeapCategory::Sampler => set
                    .sampler_range
                    .as_ref()
                    .map(|r| r.gpu_handle_at(param.descriptor_offset)),
            };
            let Some(handle) = handle else {
                log::error!("descriptor set does not cover the bound range category");
                continue;
            };
            unsafe {
                self.list
                    .SetComputeRootDescriptorTable(param.root_param_index, handle);
            }
        }
    }

    fn push_constants(&mut self, data: &[u8]) {
        let Some(bound) = &self.bound else {
            log::error!("bind a root signature before push_constants");
            return;
        };
        let Some(constant) = bound.constant else {
            log::error!("bound root signature declares no root constant");
            return;
        };
        if data.len() % 4 != 0 || data.len() as u32 > constant.size {
            log::error!(
                "push constant length {} invalid for declared size {}",
                data.len(),
                constant.size
            );
            return;
        }
        unsafe {
            self.list.SetComputeRoot32BitConstants(
                bound.root_const_start,
                data.len() as u32 / 4,
                data.as_ptr().cast(),
                0,
            );
        }
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        unsafe {
            self.list.Dispatch(x, y, z);
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
