//! Deferred shading demo built on wgpu.
//!
//! The frame is planned as data ([`render::FrameGraph`]) and executed by
//! [`render::Renderer`]: a shadow map, a geometry buffer, one additive
//! lighting pass per light kind, a debug strip and an egui overlay. The
//! camera, light packing, frame plan and shading math are plain Rust and are
//! tested without a GPU.

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod lights;
pub mod render;
pub mod scene;
pub mod shading;

pub use camera::{CameraParams, OrbitCamera};
pub use config::{CliOptions, RenderConfig};
pub use error::{GpuErrorKind, SetupError};
pub use input::{InputState, OrbitController};
pub use lights::{LightBuffer, LightCounts, LightKind, LightSet, MAX_LIGHTS};
pub use render::{FrameGraph, Renderer};
pub use scene::{Material, Mesh, MeshKind, Scene, SceneObject, ShadowCaster};
