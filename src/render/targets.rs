use std::path::Path;

use log::info;
use wgpu::util::DeviceExt;

use crate::error::SetupError;
use crate::render::frame_graph::Extent;

/// Texture plus the default view the passes bind.
pub struct RenderTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTexture {
    pub fn create(
        device: &wgpu::Device,
        label: &str,
        extent: Extent,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: extent.width.max(1),
                height: extent.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Surface attributes written by the geometry pass.
pub struct GBuffer {
    /// Diffuse albedo in rgb, specular intensity in alpha.
    pub color: RenderTexture,
    /// World normal in xyz, specular power in w.
    pub normal: RenderTexture,
    pub depth: RenderTexture,
}

impl GBuffer {
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn create(device: &wgpu::Device, extent: Extent) -> Self {
        Self {
            color: RenderTexture::create(device, "gbuffer-color", extent, Self::COLOR_FORMAT),
            normal: RenderTexture::create(device, "gbuffer-normal", extent, Self::NORMAL_FORMAT),
            depth: RenderTexture::create(device, "gbuffer-depth", extent, Self::DEPTH_FORMAT),
        }
    }
}

/// Depth seen from the shadow caster. The pass has no color attachment.
pub struct ShadowMap {
    pub depth: RenderTexture,
}

impl ShadowMap {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn create(device: &wgpu::Device, extent: Extent) -> Self {
        Self {
            depth: RenderTexture::create(device, "shadow-map", extent, Self::FORMAT),
        }
    }
}

/// Diffuse and specular maps sampled by the geometry pass.
pub struct MaterialTextures {
    pub diffuse: RenderTexture,
    pub specular: RenderTexture,
}

impl MaterialTextures {
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        diffuse: &Path,
        specular: &Path,
    ) -> Result<Self, SetupError> {
        Ok(Self {
            diffuse: load_texture(
                device,
                queue,
                diffuse,
                wgpu::TextureFormat::Rgba8UnormSrgb,
            )?,
            specular: load_texture(device, queue, specular, wgpu::TextureFormat::Rgba8Unorm)?,
        })
    }
}

/// Decodes an image file into RGBA8 pixels.
pub fn decode_rgba(path: &Path) -> Result<image::RgbaImage, SetupError> {
    let bytes = std::fs::read(path).map_err(|source| SetupError::MissingAsset {
        path: path.to_path_buf(),
        source,
    })?;
    let image = image::load_from_memory(&bytes).map_err(|source| SetupError::Texture {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

fn load_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
    format: wgpu::TextureFormat,
) -> Result<RenderTexture, SetupError> {
    let pixels = decode_rgba(path)?;
    let (width, height) = pixels.dimensions();
    let label = path.display().to_string();
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        pixels.as_raw(),
    );
    info!("loaded texture {label} ({width}x{height})");
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok(RenderTexture {
        _texture: texture,
        view,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_textures_decode() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("textures");
        for name in ["bricks_diffuse.png", "bricks_specular.png"] {
            let image = decode_rgba(&root.join(name)).unwrap();
            assert!(image.width() > 0 && image.height() > 0);
        }
    }

    #[test]
    fn garbage_is_a_texture_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(
            decode_rgba(&path),
            Err(SetupError::Texture { .. })
        ));
        assert!(matches!(
            decode_rgba(&dir.path().join("absent.png")),
            Err(SetupError::MissingAsset { .. })
        ));
    }
}
