use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures raised while building the renderer.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("missing asset {}", .path.display())]
    MissingAsset {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to compile shader {}:\n{listing}\n{message}", .path.display())]
    ShaderCompile {
        path: PathBuf,
        message: String,
        listing: String,
    },
    #[error("failed to build {label}: {message}")]
    Pipeline { label: String, message: String },
    #[error("failed to decode texture {}", .path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no compatible GPU adapter: {0}")]
    NoAdapter(String),
}

/// Category of a GPU error reported while a frame is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuErrorKind {
    Validation,
    OutOfMemory,
    Internal,
}

impl GpuErrorKind {
    /// Every kind, in the order the per-frame error scopes are pushed.
    pub const ALL: [GpuErrorKind; 3] = [
        GpuErrorKind::Validation,
        GpuErrorKind::OutOfMemory,
        GpuErrorKind::Internal,
    ];

    /// Error scope filter that captures this kind.
    pub fn filter(self) -> wgpu::ErrorFilter {
        match self {
            GpuErrorKind::Validation => wgpu::ErrorFilter::Validation,
            GpuErrorKind::OutOfMemory => wgpu::ErrorFilter::OutOfMemory,
            GpuErrorKind::Internal => wgpu::ErrorFilter::Internal,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GpuErrorKind::Validation => "VALIDATION",
            GpuErrorKind::OutOfMemory => "OUT_OF_MEMORY",
            GpuErrorKind::Internal => "INTERNAL",
        }
    }
}

impl From<&wgpu::Error> for GpuErrorKind {
    fn from(error: &wgpu::Error) -> Self {
        match error {
            wgpu::Error::Validation { .. } => GpuErrorKind::Validation,
            wgpu::Error::OutOfMemory { .. } => GpuErrorKind::OutOfMemory,
            wgpu::Error::Internal { .. } => GpuErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_error_names_are_stable() {
        assert_eq!(GpuErrorKind::Validation.name(), "VALIDATION");
        assert_eq!(GpuErrorKind::OutOfMemory.name(), "OUT_OF_MEMORY");
        assert_eq!(GpuErrorKind::Internal.name(), "INTERNAL");
    }

    #[test]
    fn frame_scopes_capture_every_kind() {
        let filters = GpuErrorKind::ALL.map(GpuErrorKind::filter);
        assert_eq!(
            filters,
            [
                wgpu::ErrorFilter::Validation,
                wgpu::ErrorFilter::OutOfMemory,
                wgpu::ErrorFilter::Internal,
            ]
        );
        let names: Vec<&str> = GpuErrorKind::ALL.iter().map(|kind| kind.name()).collect();
        assert_eq!(names, vec!["VALIDATION", "OUT_OF_MEMORY", "INTERNAL"]);
    }

    #[test]
    fn shader_errors_carry_the_listing() {
        let err = SetupError::ShaderCompile {
            path: PathBuf::from("shaders/blit.wgsl"),
            message: "expected ';'".to_string(),
            listing: "  1 : fn main() {}".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("shaders/blit.wgsl"));
        assert!(text.contains("  1 : fn main() {}"));
        assert!(text.ends_with("expected ';'"));
    }
}
