//! Render-pass descriptor construction for the D3D12 render-pass API.

use windows::Win32::Graphics::Direct3D12::*;

use crate::{Error, RenderPassDescriptor, Result};

use super::conv;
use super::texture::D3D12TextureView;

fn clear_value(format: windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT, color: [f32; 4]) -> D3D12_CLEAR_VALUE {
    D3D12_CLEAR_VALUE {
        Format: format,
        Anonymous: D3D12_CLEAR_VALUE_0 { Color: color },
    }
}

fn depth_clear_value(
    format: windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT,
    depth: f32,
    stencil: u8,
) -> D3D12_CLEAR_VALUE {
    D3D12_CLEAR_VALUE {
        Format: format,
        Anonymous: D3D12_CLEAR_VALUE_0 {
            DepthStencil: D3D12_DEPTH_STENCIL_VALUE {
                Depth: depth,
                Stencil: stencil,
            },
        },
    }
}

pub(crate) fn build_render_pass_descs(
    desc: &RenderPassDescriptor<'_>,
) -> Result<(
    Vec<D3D12_RENDER_PASS_RENDER_TARGET_DESC>,
    Option<D3D12_RENDER_PASS_DEPTH_STENCIL_DESC>,
)> {
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

    let mut rt_descs = Vec::with_capacity(desc.colors.len());
    for color in &desc.colors {
        let view = color
            .view
            .as_any()
            .downcast_ref::<D3D12TextureView>()
            .ok_or_else(|| Error::invalid("color attachment is not a D3D12 view"))?;
        check_extent(view.extent)?;
        let clear = clear_value(
            view.raw_format,
            [color.clear.r, color.clear.g, color.clear.b, color.clear.a],
        );
        rt_descs.push(D3D12_RENDER_PASS_RENDER_TARGET_DESC {
            cpuDescriptor: view.slot.handle(),
            BeginningAccess: D3D12_RENDER_PASS_BEGINNING_ACCESS {
                Type: conv::beginning_access(color.load),
                Anonymous: D3D12_RENDER_PASS_BEGINNING_ACCESS_0 {
                    Clear: D3D12_RENDER_PASS_BEGINNING_ACCESS_CLEAR_PARAMETERS {
                        ClearValue: clear,
                    },
                },
            },
            EndingAccess: D3D12_RENDER_PASS_ENDING_ACCESS {
                Type: conv::ending_access(color.store),
                Anonymous: Default::default(),
            },
        });
    }

    let ds_desc = match &desc.depth_stencil {
        None => None,
        Some(ds) => {
            let view = ds
                .view
                .as_any()
                .downcast_ref::<D3D12TextureView>()
                .ok_or_else(|| Error::invalid("depth attachment is not a D3D12 view"))?;
            check_extent(view.extent)?;
            // Stencil accesses are meaningless without a stencil aspect.
            let (stencil_load, stencil_store) = if view.format.has_stencil() {
                (
                    conv::beginning_access(ds.stencil_load),
                    conv::ending_access(ds.stencil_store),
                )
            } else {
                (
                    D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_NO_ACCESS,
                    D3D12_RENDER_PASS_ENDING_ACCESS_TYPE_NO_ACCESS,
                )
            };
            let clear = depth_clear_value(view.raw_format, ds.clear_depth, ds.clear_stencil as u8);
            Some(D3D12_RENDER_PASS_DEPTH_STENCIL_DESC {
                cpuDescriptor: view.slot.handle(),
                DepthBeginningAccess: D3D12_RENDER_PASS_BEGINNING_ACCESS {
                    Type: conv::beginning_access(ds.depth_load),
                    Anonymous: D3D12_RENDER_PASS_BEGINNING_ACCESS_0 {
                        Clear: D3D12_RENDER_PASS_BEGINNING_ACCESS_CLEAR_PARAMETERS {
                            ClearValue: clear,
                        },
                    },
                },
                StencilBeginningAccess: D3D12_RENDER_PASS_BEGINNING_ACCESS {
                    Type: stencil_load,
                    Anonymous: D3D12_RENDER_PASS_BEGINNING_ACCESS_0 {
                        Clear: D3D12_RENDER_PASS_BEGINNING_ACCESS_CLEAR_PARAMETERS {
                            ClearValue: clear,
                        },
                    },
                },
                DepthEndingAccess: D3D12_RENDER_PASS_ENDING_ACCESS {
                    Type: conv::ending_access(ds.depth_store),
                    Anonymous: Default::default(),
                },
                StencilEndingAccess: D3D12_RENDER_PASS_ENDING_ACCESS {
                    Type: stencil_store,
                    Anonymous: Default::default(),
                },
            })
        }
    };

    if extent.is_none() {
        return Err(Error::invalid("render pass needs at least one attachment"));
    }
    Ok((rt_descs, ds_desc))
}
