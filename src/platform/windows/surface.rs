use windows::Win32::Graphics::Direct3D11::{D3D11_TEXTURE2D_DESC, ID3D11Texture2D};
use windows::core::Interface;

use crate::backend::{SharedTexture, TextureDesc};

pub(crate) fn texture_desc(texture: &ID3D11Texture2D) -> TextureDesc {
    let mut desc = D3D11_TEXTURE2D_DESC::default();
    unsafe { texture.GetDesc(&mut desc) };
    TextureDesc {
        width: desc.Width,
        height: desc.Height,
        format: desc.Format.0 as u32,
    }
}

/// Wrap a texture for the host. The returned handle holds its own COM
/// reference, so the texture outlives the frame or surface it came from for
/// as long as the host keeps a clone.
pub(crate) fn share_texture(texture: ID3D11Texture2D) -> SharedTexture {
    let desc = texture_desc(&texture);
    SharedTexture::new(texture.as_raw(), desc, texture)
}
