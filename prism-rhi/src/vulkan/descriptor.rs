//! Descriptor set layouts, the grow-on-demand pool pager, and descriptor
//! sets for the Vulkan backend.

use std::sync::{Arc, Mutex};

use ash::vk;

use crate::{
    DescriptorSet, DescriptorSetElement, DescriptorSetLayout, DescriptorSetLayoutDescriptor,
    Error, ResourceKind, Result, ResourceViewRef, TextureViewKind,
};

use super::buffer::VulkanBufferView;
use super::conv;
use super::sampler::{create_raw_sampler, VulkanSampler};
use super::texture::VulkanTextureView;

/// Shared layout internals. Descriptor sets and pipeline layouts clone this
/// Arc, so the native layout (and its interned static samplers) cannot die
/// before they do.
pub(crate) struct SetLayoutInner {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) layout: vk::DescriptorSetLayout,
    pub(crate) elements: Vec<DescriptorSetElement>,
    /// Persistent samplers owned by the layout; referenced as
    /// pImmutableSamplers by the native layout.
    immutable_samplers: Vec<vk::Sampler>,
}

impl Drop for SetLayoutInner {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
            for s in self.immutable_samplers.drain(..) {
                self.device.destroy_sampler(s, None);
            }
        }
    }
}

impl SetLayoutInner {
    /// Maps a flat descriptor index to (element, array offset) in
    /// declaration order.
    pub(crate) fn locate(&self, index: u32) -> Option<(&DescriptorSetElement, u32)> {
        let mut base = 0;
        for e in &self.elements {
            if index < base + e.count {
                return Some((e, index - base));
            }
            base += e.count;
        }
        None
    }

    pub(crate) fn descriptor_count(&self) -> u32 {
        self.elements.iter().map(|e| e.count).sum()
    }
}

pub struct VulkanDescriptorSetLayout {
    pub(crate) inner: Arc<SetLayoutInner>,
}

impl VulkanDescriptorSetLayout {
    pub(crate) fn create(
        device: Arc<ash::Device>,
        desc: &DescriptorSetLayoutDescriptor,
        anisotropy_supported: bool,
    ) -> Result<Self> {
        let mut immutable_samplers = Vec::new();
        // Per-element sampler slices survive until the native call below.
        let mut element_samplers: Vec<Vec<vk::Sampler>> = Vec::with_capacity(desc.elements.len());
        for e in &desc.elements {
            if e.static_samplers.is_empty() {
                element_samplers.push(Vec::new());
                continue;
            }
            if e.kind != ResourceKind::Sampler {
                return Err(Error::invalid(
                    "static samplers are only valid on sampler elements",
                ));
            }
            if e.static_samplers.len() != e.count as usize {
                return Err(Error::invalid(format!(
                    "static sampler count {} does not match element count {}",
                    e.static_samplers.len(),
                    e.count
                )));
            }
            let mut samplers = Vec::with_capacity(e.static_samplers.len());
            for sd in &e.static_samplers {
                match create_raw_sampler(&device, sd, anisotropy_supported) {
                    Ok(s) => {
                        samplers.push(s);
                        immutable_samplers.push(s);
                    }
                    Err(err) => {
                        unsafe {
                            for s in immutable_samplers {
                                device.destroy_sampler(s, None);
                            }
                        }
                        return Err(err);
                    }
                }
            }
            element_samplers.push(samplers);
        }
        let bindings: Vec<vk::DescriptorSetLayoutBinding<'_>> = desc
            .elements
            .iter()
            .zip(&element_samplers)
            .map(|(e, samplers)| {
                let mut binding = vk::DescriptorSetLayoutBinding::default()
                    .binding(e.slot)
                    .descriptor_type(conv::descriptor_type(e.kind))
                    .descriptor_count(e.count)
                    .stage_flags(conv::shader_stages(e.stages));
                if !samplers.is_empty() {
                    binding = binding.immutable_samplers(samplers);
                }
                binding
            })
            .collect();
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = match unsafe { device.create_descriptor_set_layout(&info, None) } {
            Ok(l) => l,
            Err(e) => {
                unsafe {
                    for s in immutable_samplers {
                        device.destroy_sampler(s, None);
                    }
                }
                return Err(Error::backend("vkCreateDescriptorSetLayout", e));
            }
        };
        Ok(Self {
            inner: Arc::new(SetLayoutInner {
                device,
                layout,
                elements: desc.elements.clone(),
                immutable_samplers,
            }),
        })
    }
}

impl std::fmt::Debug for VulkanDescriptorSetLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDescriptorSetLayout")
            .field("elements", &self.inner.elements.len())
            .finish_non_exhaustive()
    }
}

impl DescriptorSetLayout for VulkanDescriptorSetLayout {
    fn elements(&self) -> &[DescriptorSetElement] {
        &self.inner.elements
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

const MAX_SETS_PER_PAGE: u32 = 1024;

struct PoolPage {
    pool: vk::DescriptorPool,
    live: u32,
}

/// `VkDescriptorSet` cannot spill across pools, so sets come from a vector
/// of fixed-capacity pages. Allocation tries the hint page first, rotates
/// through the rest, and only then creates a new page. Fully idle pages
/// beyond `keep_free_pages` are destroyed on free.
pub(crate) struct DescriptorPoolPager {
    device: Arc<ash::Device>,
    pages: Vec<PoolPage>,
    hint: usize,
    keep_free_pages: usize,
    inline_uniform_block: bool,
}

impl DescriptorPoolPager {
    pub(crate) fn new(
        device: Arc<ash::Device>,
        keep_free_pages: usize,
        inline_uniform_block: bool,
    ) -> Self {
        Self {
            device,
            pages: Vec::new(),
            hint: 0,
            keep_free_pages,
            inline_uniform_block,
        }
    }

    fn new_page(&mut self) -> Result<usize> {
        let mut pool_sizes = vec![
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::SAMPLER)
                .descriptor_count(1024),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1024),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::SAMPLED_IMAGE)
                .descriptor_count(8192),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::STORAGE_IMAGE)
                .descriptor_count(1024),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_TEXEL_BUFFER)
                .descriptor_count(2048),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::STORAGE_TEXEL_BUFFER)
                .descriptor_count(1024),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(8192),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(1024),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
                .descriptor_count(8192),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::STORAGE_BUFFER_DYNAMIC)
                .descriptor_count(1024),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::INPUT_ATTACHMENT)
                .descriptor_count(1024),
        ];
        let mut inline_info = vk::DescriptorPoolInlineUniformBlockCreateInfo::default()
            .max_inline_uniform_block_bindings(1024);
        let mut info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(MAX_SETS_PER_PAGE);
        if self.inline_uniform_block {
            pool_sizes.push(
                vk::DescriptorPoolSize::default()
                    .ty(vk::DescriptorType::INLINE_UNIFORM_BLOCK)
                    .descriptor_count(1024),
            );
            info = info.push_next(&mut inline_info);
        }
        let info = info.pool_sizes(&pool_sizes);
        let pool = unsafe {
            self.device
                .create_descriptor_pool(&info, None)
                .map_err(|e| Error::backend("vkCreateDescriptorPool", e))?
        };
        self.pages.push(PoolPage { pool, live: 0 });
        Ok(self.pages.len() - 1)
    }

    fn try_alloc_from(
        &mut self,
        page_index: usize,
        layout: vk::DescriptorSetLayout,
    ) -> Result<Option<vk::DescriptorSet>> {
        let layouts = [layout];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pages[page_index].pool)
            .set_layouts(&layouts);
        match unsafe { self.device.allocate_descriptor_sets(&info) } {
            Ok(sets) => {
                self.pages[page_index].live += 1;
                self.hint = page_index;
                Ok(Some(sets[0]))
            }
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                Ok(None)
            }
            Err(e) => Err(Error::backend("vkAllocateDescriptorSets", e)),
        }
    }

    pub(crate) fn allocate(
        &mut self,
        layout: vk::DescriptorSetLayout,
    ) -> Result<(vk::DescriptorPool, vk::DescriptorSet)> {
        if self.pages.is_empty() {
            self.new_page()?;
        }
        let start = if self.hint < self.pages.len() {
            self.hint
        } else {
            0
        };
        for i in 0..self.pages.len() {
            let idx = (start + i) % self.pages.len();
            if let Some(set) = self.try_alloc_from(idx, layout)? {
                return Ok((self.pages[idx].pool, set));
            }
        }
        let idx = self.new_page()?;
        match self.try_alloc_from(idx, layout)? {
            Some(set) => Ok((self.pages[idx].pool, set)),
            None => Err(Error::out_of_memory(
                "descriptor set does not fit in a fresh pool page",
            )),
        }
    }

    pub(crate) fn free(&mut self, pool: vk::DescriptorPool, set: vk::DescriptorSet) {
        let Some(index) = self.pages.iter().position(|p| p.pool == pool) else {
            log::warn!("descriptor set freed against an unknown pool page");
            return;
        };
        if let Err(e) = unsafe { self.device.free_descriptor_sets(pool, &[set]) } {
            panic!("vkFreeDescriptorSets failed: {e}");
        }
        self.pages[index].live -= 1;
        if self.pages[index].live == 0 {
            self.try_release_free_pages();
        }
    }

    fn try_release_free_pages(&mut self) {
        if self.pages.len() <= 1 {
            return;
        }
        let mut idle = self.pages.iter().filter(|p| p.live == 0).count();
        if idle <= self.keep_free_pages {
            return;
        }
        let mut i = self.pages.len();
        while i > 0 && idle > self.keep_free_pages {
            i -= 1;
            if self.pages[i].live != 0 {
                continue;
            }
            if self.pages.len() <= 1 {
                break;
            }
            let page = self.pages.swap_remove(i);
            unsafe {
                self.device.destroy_descriptor_pool(page.pool, None);
            }
            idle -= 1;
            if self.hint >= self.pages.len() {
                self.hint = 0;
            }
        }
    }

    /// Device teardown; every set must already be gone.
    pub(crate) fn destroy(&mut self) {
        for page in self.pages.drain(..) {
            if page.live != 0 {
                log::warn!("descriptor pool page destroyed with {} live sets", page.live);
            }
            unsafe {
                self.device.destroy_descriptor_pool(page.pool, None);
            }
        }
    }
}

pub struct VulkanDescriptorSet {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) pager: Arc<Mutex<DescriptorPoolPager>>,
    pub(crate) pool: vk::DescriptorPool,
    pub(crate) set: vk::DescriptorSet,
    pub(crate) layout: Arc<SetLayoutInner>,
}

impl Drop for VulkanDescriptorSet {
    fn drop(&mut self) {
        if let Ok(mut pager) = self.pager.lock() {
            pager.free(self.pool, self.set);
        }
    }
}

impl std::fmt::Debug for VulkanDescriptorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDescriptorSet").finish_non_exhaustive()
    }
}

impl DescriptorSet for VulkanDescriptorSet {
    fn set_resources(&mut self, start: u32, views: &[ResourceViewRef<'_>]) -> Result<()> {
        for (i, view) in views.iter().enumerate() {
            let index = start + i as u32;
            let (element, array_element) = self
                .layout
                .locate(index)
                .ok_or_else(|| {
                    Error::invalid(format!(
                        "descriptor index {index} out of range ({} descriptors)",
                        self.layout.descriptor_count()
                    ))
                })?;
            let ty = conv::descriptor_type(element.kind);
            let write = vk::WriteDescriptorSet::default()
                .dst_set(self.set)
                .dst_binding(element.slot)
                .dst_array_element(array_element)
                .descriptor_type(ty);
            match (element.kind, view) {
                (
                    ResourceKind::CBuffer | ResourceKind::Buffer | ResourceKind::RwBuffer,
                    ResourceViewRef::Buffer(bv),
                ) => {
                    let bv = bv
                        .as_any()
                        .downcast_ref::<VulkanBufferView>()
                        .ok_or_else(|| Error::invalid("buffer view is not a Vulkan view"))?;
                    if matches!(element.kind, ResourceKind::CBuffer)
                        != matches!(bv.kind, ResourceKind::CBuffer)
                    {
                        return Err(Error::invalid(format!(
                            "view kind {:?} does not match element kind {:?}",
                            bv.kind, element.kind
                        )));
                    }
                    let info = vk::DescriptorBufferInfo::default()
                        .buffer(bv.buffer)
                        .offset(bv.offset)
                        .range(bv.size);
                    let write = write.buffer_info(std::slice::from_ref(&info));
                    unsafe { self.device.update_descriptor_sets(&[write], &[]) };
                }
                (ResourceKind::Texture, ResourceViewRef::Texture(tv)) => {
                    let tv = tv
                        .as_any()
                        .downcast_ref::<VulkanTextureView>()
                        .ok_or_else(|| Error::invalid("texture view is not a Vulkan view"))?;
                    if tv.kind != TextureViewKind::ShaderResource {
                        return Err(Error::invalid(
                            "texture element requires a shader-resource view",
                        ));
                    }
                    let info = vk::DescriptorImageInfo::default()
                        .image_view(tv.view)
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
                    let write = write.image_info(std::slice::from_ref(&info));
                    unsafe { self.device.update_descriptor_sets(&[write], &[]) };
                }
                (ResourceKind::RwTexture, ResourceViewRef::Texture(tv)) => {
                    let tv = tv
                        .as_any()
                        .downcast_ref::<VulkanTextureView>()
                        .ok_or_else(|| Error::invalid("texture view is not a Vulkan view"))?;
                    if tv.kind != TextureViewKind::UnorderedAccess {
                        return Err(Error::invalid(
                            "rw-texture element requires an unordered-access view",
                        ));
                    }
                    let info = vk::DescriptorImageInfo::default()
                        .image_view(tv.view)
                        .image_layout(vk::ImageLayout::GENERAL);
                    let write = write.image_info(std::slice::from_ref(&info));
                    unsafe { self.device.update_descriptor_sets(&[write], &[]) };
                }
                (ResourceKind::Sampler, ResourceViewRef::Sampler(s)) => {
                    if !element.static_samplers.is_empty() {
                        return Err(Error::invalid(
                            "element uses static samplers; it cannot be rewritten",
                        ));
                    }
                    let s = s
                        .as_any()
                        .downcast_ref::<VulkanSampler>()
                        .ok_or_else(|| Error::invalid("sampler is not a Vulkan sampler"))?;
                    let info = vk::DescriptorImageInfo::default().sampler(s.sampler);
                    let write = write.image_info(std::slice::from_ref(&info));
                    unsafe { self.device.update_descriptor_sets(&[write], &[]) };
                }
                (kind, _) => {
                    return Err(Error::invalid(format!(
                        "resource view does not match element kind {kind:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
