//! DXIL shader blobs. The backend keeps the bytes; D3D12 consumes them at
//! pipeline creation.

use crate::{Error, Result, Shader, ShaderBlobCategory, ShaderDescriptor, ShaderStages};

pub struct D3D12Shader {
    pub(crate) bytes: Vec<u8>,
    pub(crate) stage: ShaderStages,
    pub(crate) entry_point: String,
}

impl D3D12Shader {
    pub(crate) fn create(desc: &ShaderDescriptor<'_>) -> Result<Self> {
        if desc.category != ShaderBlobCategory::Dxil {
            return Err(Error::unsupported(
                "the D3D12 backend only accepts DXIL blobs",
            ));
        }
        if desc.bytes.is_empty() {
            return Err(Error::invalid("shader blob is empty"));
        }
        Ok(Self {
            bytes: desc.bytes.to_vec(),
            stage: desc.stage,
            entry_point: desc.entry_point.to_owned(),
        })
    }
}

impl std::fmt::Debug for D3D12Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3D12Shader")
            .field("stage", &self.stage)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

impl Shader for D3D12Shader {
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
