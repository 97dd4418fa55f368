//! Vulkan sampler objects.

use std::sync::Arc;

use ash::vk;

use crate::{Error, Result, Sampler, SamplerDescriptor};

use super::conv;

pub(crate) fn build_sampler_create_info(
    desc: &SamplerDescriptor,
    anisotropy_supported: bool,
) -> vk::SamplerCreateInfo<'static> {
    let anisotropy = anisotropy_supported && desc.anisotropy_clamp > 1;
    let mut info = vk::SamplerCreateInfo::default()
        .mag_filter(conv::filter(desc.mag_filter))
        .min_filter(conv::filter(desc.min_filter))
        .mipmap_mode(conv::mipmap_mode(desc.mip_filter))
        .address_mode_u(conv::address_mode(desc.address_s))
        .address_mode_v(conv::address_mode(desc.address_t))
        .address_mode_w(conv::address_mode(desc.address_r))
        .min_lod(desc.lod_min)
        .max_lod(desc.lod_max)
        .anisotropy_enable(anisotropy)
        .max_anisotropy(desc.anisotropy_clamp.clamp(1, 16) as f32)
        .border_color(vk::BorderColor::FLOAT_TRANSPARENT_BLACK)
        .unnormalized_coordinates(false);
    if let Some(compare) = desc.compare {
        info = info
            .compare_enable(true)
            .compare_op(conv::compare_op(compare));
    }
    info
}

pub(crate) fn create_raw_sampler(
    device: &ash::Device,
    desc: &SamplerDescriptor,
    anisotropy_supported: bool,
) -> Result<vk::Sampler> {
    let info = build_sampler_create_info(desc, anisotropy_supported);
    unsafe {
        device
            .create_sampler(&info, None)
            .map_err(|e| Error::backend("vkCreateSampler", e))
    }
}

pub struct VulkanSampler {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) sampler: vk::Sampler,
}

impl Drop for VulkanSampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

impl std::fmt::Debug for VulkanSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanSampler").finish()
    }
}

impl Sampler for VulkanSampler {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
