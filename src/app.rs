use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::camera::OrbitCamera;
use crate::config::RenderConfig;
use crate::input::{InputState, OrbitController};
use crate::lights::{LightCounts, LightKind, LightSet};
use crate::render::{FrameClock, FrameGraph, Overlay, Renderer, MAIN_EXTENT, SHADOW_EXTENT};
use crate::scene::Scene;

/// Opens the window and runs the render loop until Escape or close.
pub fn run_interactive(config: RenderConfig, scene: Scene) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(config, scene);
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;
    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Text printed by `--describe`: scene contents, frame plan and light buffers.
pub fn describe(scene: &Scene, counts: &LightCounts) -> String {
    let mut lines = vec![format!(
        "Scene with {} objects (diffuse {}, specular {}, specular power {})",
        scene.objects.len(),
        scene.material.diffuse.display(),
        scene.material.specular.display(),
        scene.material.specular_power
    )];
    for object in &scene.objects {
        lines.push(format!(
            " - {} ({}) pos=({:.2}, {:.2}, {:.2}) scale=({:.2}, {:.2}, {:.2})",
            object.name,
            object.mesh.label(),
            object.position.x,
            object.position.y,
            object.position.z,
            object.scale.x,
            object.scale.y,
            object.scale.z
        ));
    }

    lines.push("Frame plan:".to_string());
    let graph = FrameGraph::deferred(MAIN_EXTENT, SHADOW_EXTENT, &LightKind::ALL);
    lines.extend(graph.describe());

    lines.push("Light buffers:".to_string());
    let lights = LightSet::demo(counts);
    for kind in LightKind::ALL {
        lines.push(format!(
            " - {}: {} lights, {} bytes (binding {})",
            kind.label(),
            lights.count(kind),
            lights.pack(kind).len(),
            kind.binding()
        ));
    }
    lines.join("\n")
}

struct Gpu {
    renderer: Renderer,
    overlay: Overlay,
}

/// Owns every piece of per-process state: window, renderer, camera, input,
/// overlay and the slider counts.
pub struct App {
    config: RenderConfig,
    scene: Scene,
    camera: OrbitCamera,
    input: InputState,
    controller: OrbitController,
    counts: LightCounts,
    announced: Option<LightCounts>,
    clock: FrameClock,
    gpu: Option<Gpu>,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: RenderConfig, scene: Scene) -> Self {
        let counts = config.counts;
        Self {
            config,
            scene,
            camera: OrbitCamera::new(),
            input: InputState::new(),
            controller: OrbitController::new(),
            counts,
            announced: None,
            clock: FrameClock::new(Instant::now()),
            gpu: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.error = Some(err);
        event_loop.exit();
    }

    fn create_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attributes = Window::default_attributes()
            .with_title("Deferred Lights")
            .with_inner_size(PhysicalSize::new(MAIN_EXTENT.width, MAIN_EXTENT.height))
            .with_resizable(false);
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("failed to create window")?,
        );
        let renderer = pollster::block_on(Renderer::new(
            Arc::clone(&window),
            &self.config.assets,
            &self.scene,
            &LightKind::ALL,
        ))?;
        let overlay = Overlay::new(&window, renderer.device(), renderer.surface_format());
        Ok(Gpu { renderer, overlay })
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        self.controller.update(&self.input, &mut self.camera);
        self.clock.tick(Instant::now());

        let ui = gpu
            .overlay
            .run(gpu.renderer.window(), self.clock.fps(), &mut self.counts);
        if self.announced != Some(self.counts) {
            debug!(
                "lights: {} point, {} directional, {} spot",
                self.counts.get(LightKind::Point),
                self.counts.get(LightKind::Directional),
                self.counts.get(LightKind::Spot)
            );
            self.announced = Some(self.counts);
        }

        let lights = LightSet::demo(&self.counts);
        let camera = self.camera.params(gpu.renderer.extent().aspect());
        match gpu.renderer.render(&camera, &lights, &mut gpu.overlay, &ui) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.renderer.reconfigure();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow!("GPU is out of memory"));
                return;
            }
            Err(err) => {
                warn!("skipping frame: {err}");
            }
        }

        if self.input.exit_requested() {
            info!("escape pressed, exiting");
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.create_gpu(event_loop) {
            Ok(gpu) => {
                info!("renderer ready");
                self.gpu = Some(gpu);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        if window_id != gpu.renderer.window_id() {
            return;
        }
        let consumed = gpu.overlay.on_window_event(gpu.renderer.window(), &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Focused(false) => self.input.clear(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.input.set_key(code, event.state);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if !consumed || !state.is_pressed() {
                    self.input.set_mouse_button(button, state);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .set_mouse_position(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = self.gpu.as_ref() {
            gpu.renderer.window().request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lists_scene_plan_and_buffers() {
        let text = describe(&Scene::default(), &LightCounts::new(3, 1, 2));
        assert!(text.starts_with("Scene with 2 objects"));
        assert!(text.contains(" - Cube (cube)"));
        assert!(text.contains(" - Ground (plane) pos=(0.00, -2.00, 0.00)"));
        assert!(text.contains("0: shadow -> ShadowMap"));
        assert!(text.contains("9: overlay -> Surface"));
        assert!(text.contains(" - point: 3 lights, 112 bytes (binding 0)"));
        assert!(text.contains(" - directional: 1 lights, 48 bytes (binding 1)"));
        assert!(text.contains(" - spot: 2 lights, 112 bytes (binding 2)"));
    }
}
