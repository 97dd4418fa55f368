//! Vulkan textures and texture views.

use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocation, Allocator};

use crate::{
    Error, Result, Texture, TextureDescriptor, TextureFormat, TextureUse, TextureView,
    TextureViewDescriptor, TextureViewKind,
};

use super::conv;

pub struct VulkanTexture {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) allocator: Arc<Mutex<Allocator>>,
    pub(crate) image: vk::Image,
    /// None for swapchain images, which the swapchain owns.
    pub(crate) allocation: Option<Allocation>,
    pub(crate) desc: TextureDescriptor,
    pub(crate) raw_format: vk::Format,
    pub(crate) owns_image: bool,
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        if self.owns_image {
            unsafe {
                self.device.destroy_image(self.image, None);
            }
        }
        if let Some(allocation) = self.allocation.take() {
            if let Ok(mut a) = self.allocator.lock() {
                let _ = a.free(allocation);
            }
        }
    }
}

impl std::fmt::Debug for VulkanTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanTexture")
            .field("extent", &(self.desc.width, self.desc.height))
            .field("format", &self.desc.format)
            .finish_non_exhaustive()
    }
}

impl Texture for VulkanTexture {
    fn descriptor(&self) -> &TextureDescriptor {
        &self.desc
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub fn build_image_create_info(desc: &TextureDescriptor) -> vk::ImageCreateInfo<'static> {
    let mut flags = vk::ImageCreateFlags::empty();
    if desc.is_cube_compatible() {
        flags |= vk::ImageCreateFlags::CUBE_COMPATIBLE;
    }
    let (depth, array_layers) = match desc.dim {
        crate::TextureDimension::D3 => (desc.depth_or_array.max(1), 1),
        _ => (1, desc.depth_or_array.max(1)),
    };
    vk::ImageCreateInfo::default()
        .flags(flags)
        .image_type(conv::image_type(desc.dim))
        .format(conv::texture_format(desc.format))
        .extent(vk::Extent3D {
            width: desc.width.max(1),
            height: desc.height.max(1),
            depth,
        })
        .mip_levels(desc.mip_levels.max(1))
        .array_layers(array_layers)
        .samples(conv::sample_count(desc.sample_count))
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(conv::image_usage(desc.usage, desc.format))
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
}

fn required_usage(kind: TextureViewKind) -> TextureUse {
    match kind {
        TextureViewKind::ShaderResource => TextureUse::RESOURCE,
        TextureViewKind::UnorderedAccess => TextureUse::UNORDERED_ACCESS,
        TextureViewKind::RenderTarget => TextureUse::RENDER_TARGET | TextureUse::PRESENT,
        TextureViewKind::DepthStencil => {
            TextureUse::DEPTH_STENCIL_READ | TextureUse::DEPTH_STENCIL_WRITE
        }
    }
}

pub struct VulkanTextureView {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) view: vk::ImageView,
    /// Non-owning copy of the parent image handle.
    #[allow(dead_code)]
    pub(crate) image: vk::Image,
    pub(crate) kind: TextureViewKind,
    pub(crate) format: TextureFormat,
    pub(crate) raw_format: vk::Format,
    pub(crate) extent: (u32, u32),
    pub(crate) sample_count: u32,
}

impl VulkanTextureView {
    pub(crate) fn create(
        device: Arc<ash::Device>,
        desc: &TextureViewDescriptor<'_>,
    ) -> Result<Self> {
        let texture = desc
            .texture
            .as_any()
            .downcast_ref::<VulkanTexture>()
            .ok_or_else(|| Error::invalid("texture is not a Vulkan texture"))?;
        if !texture.desc.usage.intersects(required_usage(desc.kind)) {
            return Err(Error::invalid(format!(
                "texture usage {:?} does not allow a {:?} view",
                texture.desc.usage, desc.kind
            )));
        }
        // Depth views sample only the depth aspect; full aspect is for
        // attachment use.
        let aspect = match desc.kind {
            TextureViewKind::ShaderResource if desc.format.is_depth() => {
                vk::ImageAspectFlags::DEPTH
            }
            _ => conv::format_aspect(desc.format),
        };
        let raw_format = conv::texture_format(desc.format);
        let info = vk::ImageViewCreateInfo::default()
            .image(texture.image)
            .view_type(conv::image_view_type(desc.dim))
            .format(raw_format)
            .subresource_range(conv::subresource_range(&desc.range, aspect));
        let view = unsafe {
            device
                .create_image_view(&info, None)
                .map_err(|e| Error::backend("vkCreateImageView", e))?
        };
        let mip_extent = |dim: u32| (dim >> desc.range.base_mip.min(31)).max(1);
        Ok(Self {
            device,
            view,
            image: texture.image,
            kind: desc.kind,
            format: desc.format,
            raw_format,
            extent: (
                mip_extent(texture.desc.width),
                mip_extent(texture.desc.height),
            ),
            sample_count: texture.desc.sample_count,
        })
    }
}

impl Drop for VulkanTextureView {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.view, None);
        }
    }
}

impl std::fmt::Debug for VulkanTextureView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanTextureView")
            .field("kind", &self.kind)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl TextureView for VulkanTextureView {
    fn kind(&self) -> TextureViewKind {
        self.kind
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
