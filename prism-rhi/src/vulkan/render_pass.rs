//! Native render pass and framebuffer construction.
//!
//! Render passes exist in two flavors: a format-only pass owned by each
//! graphics pipeline (compatibility object), and a transient pass +
//! framebuffer pair built at `begin_render_pass` and destroyed once the
//! command buffer is recycled.

use ash::vk;

use crate::{
    Error, LoadAction, RenderPassDescriptor, Result, StoreAction, TextureFormat,
};

use super::conv;
use super::texture::VulkanTextureView;

pub(crate) struct AttachmentFormats {
    pub colors: Vec<TextureFormat>,
    pub depth_stencil: Option<TextureFormat>,
    pub sample_count: u32,
}

/// Render-pass compatibility only cares about attachment formats and sample
/// counts, so pipelines get a minimal pass over the declared formats.
pub(crate) fn create_compatible_render_pass(
    device: &ash::Device,
    formats: &AttachmentFormats,
) -> Result<vk::RenderPass> {
    let samples = conv::sample_count(formats.sample_count);
    let mut attachments = Vec::new();
    let mut color_refs = Vec::new();
    for format in &formats.colors {
        attachments.push(
            vk::AttachmentDescription::default()
                .format(conv::texture_format(*format))
                .samples(samples)
                .load_op(vk::AttachmentLoadOp::DONT_CARE)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        );
        color_refs.push(
            vk::AttachmentReference::default()
                .attachment(color_refs.len() as u32)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        );
    }
    let mut depth_ref = vk::AttachmentReference::default();
    let has_depth = formats.depth_stencil.is_some();
    if let Some(format) = formats.depth_stencil {
        depth_ref = vk::AttachmentReference::default()
            .attachment(attachments.len() as u32)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        attachments.push(
            vk::AttachmentDescription::default()
                .format(conv::texture_format(format))
                .samples(samples)
                .load_op(vk::AttachmentLoadOp::DONT_CARE)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );
    }
    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if has_depth {
        subpass = subpass.depth_stencil_attachment(&depth_ref);
    }
    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass));
    unsafe {
        device
            .create_render_pass(&info, None)
            .map_err(|e| Error::backend("vkCreateRenderPass", e))
    }
}

/// Formats without a stencil aspect get their stencil accesses coerced so
/// the driver never sees a stencil op on a depth-only attachment.
pub(crate) fn effective_stencil_ops(
    format: TextureFormat,
    load: LoadAction,
    store: StoreAction,
) -> (LoadAction, StoreAction) {
    if format.has_stencil() {
        (load, store)
    } else {
        (LoadAction::DontCare, StoreAction::DontCare)
    }
}

pub(crate) struct TransientPass {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
}

impl TransientPass {
    pub(crate) fn destroy(self, device: &ash::Device) {
        unsafe {
            device.destroy_framebuffer(self.framebuffer, None);
            device.destroy_render_pass(self.render_pass, None);
        }
    }
}

pub(crate) struct BuiltPass {
    pub pass: TransientPass,
    pub extent: vk::Extent2D,
    pub clear_values: Vec<vk::ClearValue>,
}

pub(crate) fn build_transient_pass(
    device: &ash::Device,
    desc: &RenderPassDescriptor<'_>,
) -> Result<BuiltPass> {
    let mut attachments = Vec::new();
    let mut color_refs = Vec::new();
    let mut image_views = Vec::new();
    let mut clear_values = Vec::new();
    let mut extent: Option<(u32, u32)> = None;

    let mut check_extent = |e: (u32, u32)| -> Result<()> {
        match extent {
            None => {
                extent = Some(e);
                Ok(())
            }
            Some(prev) if prev == e => Ok(()),
            Some(prev) => Err(Error::invalid(format!(
                "attachment extent {e:?} does not match {prev:?}"
            ))),
        }
    };

    for color in &desc.colors {
        let view = color
            .view
            .as_any()
            .downcast_ref::<VulkanTextureView>()
            .ok_or_else(|| Error::invalid("color attachment is not a Vulkan view"))?;
        check_extent(view.extent)?;
        attachments.push(
            vk::AttachmentDescription::default()
                .format(view.raw_format)
                .samples(conv::sample_count(view.sample_count))
                .load_op(conv::load_action(color.load))
                .store_op(conv::store_action(color.store))
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        );
        color_refs.push(
            vk::AttachmentReference::default()
                .attachment(color_refs.len() as u32)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        );
        image_views.push(view.view);
        clear_values.push(vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [color.clear.r, color.clear.g, color.clear.b, color.clear.a],
            },
        });
    }

    let mut depth_ref = vk::AttachmentReference::default();
    let has_depth = desc.depth_stencil.is_some();
    if let Some(ds) = &desc.depth_stencil {
        let view = ds
            .view
            .as_any()
            .downcast_ref::<VulkanTextureView>()
            .ok_or_else(|| Error::invalid("depth attachment is not a Vulkan view"))?;
        check_extent(view.extent)?;
        let (stencil_load, stencil_store) =
            effective_stencil_ops(view.format, ds.stencil_load, ds.stencil_store);
        depth_ref = vk::AttachmentReference::default()
            .attachment(attachments.len() as u32)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        attachments.push(
            vk::AttachmentDescription::default()
                .format(view.raw_format)
                .samples(conv::sample_count(view.sample_count))
                .load_op(conv::load_action(ds.depth_load))
                .store_op(conv::store_action(ds.depth_store))
                .stencil_load_op(conv::load_action(stencil_load))
                .stencil_store_op(conv::store_action(stencil_store))
                .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );
        image_views.push(view.view);
        clear_values.push(vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: ds.clear_depth,
                stencil: ds.clear_stencil,
            },
        });
    }

    let (width, height) =
        extent.ok_or_else(|| Error::invalid("render pass needs at least one attachment"))?;

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if has_depth {
        subpass = subpass.depth_stencil_attachment(&depth_ref);
    }
    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass));
    let render_pass = unsafe {
        device
            .create_render_pass(&info, None)
            .map_err(|e| Error::backend("vkCreateRenderPass", e))?
    };

    let fb_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(&image_views)
        .width(width)
        .height(height)
        .layers(1);
    let framebuffer = match unsafe { device.create_framebuffer(&fb_info, None) } {
        Ok(fb) => fb,
        Err(e) => {
            unsafe { device.destroy_render_pass(render_pass, None) };
            return Err(Error::backend("vkCreateFramebuffer", e));
        }
    };

    Ok(BuiltPass {
        pass: TransientPass {
            render_pass,
            framebuffer,
        },
        extent: vk::Extent2D { width, height },
        clear_values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stencil_ops_coerced_on_depth_only_formats() {
        let (load, store) =
            effective_stencil_ops(TextureFormat::D32Float, LoadAction::Clear, StoreAction::Store);
        assert_eq!(load, LoadAction::DontCare);
        assert_eq!(store, StoreAction::DontCare);

        let (load, store) = effective_stencil_ops(
            TextureFormat::D24UnormS8Uint,
            LoadAction::Clear,
            StoreAction::Store,
        );
        assert_eq!(load, LoadAction::Clear);
        assert_eq!(store, StoreAction::Store);
    }
}
