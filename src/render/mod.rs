pub mod frame_graph;
pub mod light_buffers;
pub mod mesh;
pub mod overlay;
pub mod renderer;
pub mod shaders;
pub mod shared;
pub mod targets;

pub use frame_graph::{
    BlendMode, Clear, DebugTarget, Extent, FrameGraph, PassDesc, PassKind, RenderTarget, Viewport,
    MAIN_EXTENT, SHADOW_EXTENT,
};
pub use overlay::{FrameClock, Overlay, OverlayFrame};
pub use renderer::Renderer;
pub use shaders::ShaderId;
