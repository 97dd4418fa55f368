//! SPIR-V shader modules.

use std::sync::Arc;

use ash::vk;

use crate::{Error, Result, Shader, ShaderBlobCategory, ShaderDescriptor, ShaderStages};

pub struct VulkanShader {
    pub(crate) device: Arc<ash::Device>,
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: ShaderStages,
    pub(crate) entry_point: String,
}

impl VulkanShader {
    pub(crate) fn create(device: Arc<ash::Device>, desc: &ShaderDescriptor<'_>) -> Result<Self> {
        if desc.category != ShaderBlobCategory::Spirv {
            return Err(Error::unsupported(
                "the Vulkan backend only accepts SPIR-V blobs",
            ));
        }
        if desc.bytes.len() % 4 != 0 {
            return Err(Error::invalid("SPIR-V length must be a multiple of 4"));
        }
        let code: Vec<u32> = desc
            .bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe {
            device
                .create_shader_module(&info, None)
                .map_err(|e| Error::backend("vkCreateShaderModule", e))?
        };
        Ok(Self {
            device,
            module,
            stage: desc.stage,
            entry_point: desc.entry_point.to_owned(),
        })
    }
}

impl Drop for VulkanShader {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

impl std::fmt::Debug for VulkanShader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanShader")
            .field("stage", &self.stage)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

impl Shader for VulkanShader {
    fn stage(&self) -> ShaderStages {
        self.stage
    }

    fn entry_point(&self) -> &str {
        &self.entry_point
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
