use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SetupError;
use crate::lights::LightKind;

/// Shared lighting prelude prepended to every light kernel.
const LIGHTING_COMMON: &str = "lighting_common.wgsl";

/// WGSL programs loaded from `<assets>/shaders` at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderId {
    GBuffer,
    ShadowMap,
    Light(LightKind),
    Blit,
}

impl ShaderId {
    pub const ALL: [ShaderId; 6] = [
        ShaderId::GBuffer,
        ShaderId::ShadowMap,
        ShaderId::Light(LightKind::Point),
        ShaderId::Light(LightKind::Directional),
        ShaderId::Light(LightKind::Spot),
        ShaderId::Blit,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ShaderId::GBuffer => "gbuffer.wgsl",
            ShaderId::ShadowMap => "shadow_map.wgsl",
            ShaderId::Light(LightKind::Point) => "point_light.wgsl",
            ShaderId::Light(LightKind::Directional) => "directional_light.wgsl",
            ShaderId::Light(LightKind::Spot) => "spot_light.wgsl",
            ShaderId::Blit => "blit.wgsl",
        }
    }

    pub fn path(self, assets: &Path) -> PathBuf {
        shader_dir(assets).join(self.file_name())
    }
}

fn shader_dir(assets: &Path) -> PathBuf {
    assets.join("shaders")
}

/// Every shader file the renderer reads, in load order.
pub fn required_files(assets: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = ShaderId::ALL.iter().map(|id| id.path(assets)).collect();
    files.insert(2, shader_dir(assets).join(LIGHTING_COMMON));
    files
}

/// Assembled WGSL source of one program.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub id: ShaderId,
    pub path: PathBuf,
    pub code: String,
}

fn read(path: &Path) -> Result<String, SetupError> {
    fs::read_to_string(path).map_err(|source| SetupError::MissingAsset {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a program from disk. Light kernels get the lighting prelude first.
pub fn load(assets: &Path, id: ShaderId) -> Result<ShaderSource, SetupError> {
    let path = id.path(assets);
    let body = read(&path)?;
    let code = match id {
        ShaderId::Light(_) => {
            let common = read(&shader_dir(assets).join(LIGHTING_COMMON))?;
            format!("{common}\n{body}")
        }
        _ => body,
    };
    Ok(ShaderSource { id, path, code })
}

/// Source text with a right-aligned line number in front of every line.
pub fn numbered_listing(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(index, line)| format!("{:3} : {line}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compiles `source`, turning a validation failure into a
/// [`SetupError::ShaderCompile`] that carries the numbered listing.
pub fn compile(device: &wgpu::Device, source: &ShaderSource) -> Result<wgpu::ShaderModule, SetupError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(source.id.file_name()),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source.code.as_str())),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(SetupError::ShaderCompile {
            path: source.path.clone(),
            message: error.to_string(),
            listing: numbered_listing(&source.code),
        }),
        None => Ok(module),
    }
}
