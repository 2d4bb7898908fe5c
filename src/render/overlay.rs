//! egui panel drawn on top of the lit frame.

use std::time::{Duration, Instant};

use winit::event::WindowEvent;
use winit::window::Window;

use crate::lights::{LightCounts, LightKind, MAX_LIGHTS};

/// Measures frames per second from the time between two ticks.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    fps: f32,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self { last: now, fps: 0.0 }
    }

    /// Ends the current frame and returns its duration.
    pub fn tick(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        self.fps = fps_for(elapsed);
        elapsed
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

pub fn fps_for(frame: Duration) -> f32 {
    let seconds = frame.as_secs_f32();
    if seconds > 0.0 {
        1.0 / seconds
    } else {
        0.0
    }
}

/// Slider order in the panel.
const SLIDERS: [(LightKind, &str); 3] = [
    (LightKind::Point, "Point lights"),
    (LightKind::Spot, "Spot lights"),
    (LightKind::Directional, "Directional lights"),
];

/// Builds the panel. Slider edits go straight into `counts`.
pub fn panel(ctx: &egui::Context, fps: f32, counts: &mut LightCounts) {
    egui::Window::new("Lights")
        .resizable(false)
        .default_pos([10.0, 10.0])
        .show(ctx, |ui| {
            ui.label(format!("FPS: {fps:.1}"));
            for (kind, text) in SLIDERS {
                let mut value = counts.get(kind);
                let slider = egui::Slider::new(&mut value, 0..=MAX_LIGHTS)
                    .step_by(1.0)
                    .text(text);
                if ui.add(slider).changed() {
                    counts.set(kind, i64::from(value));
                }
            }
        });
}

/// Tessellated output of one panel frame.
pub struct OverlayFrame {
    pub jobs: Vec<egui::ClippedPrimitive>,
    pub textures: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

pub struct Overlay {
    context: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl Overlay {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let context = egui::Context::default();
        let state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(
            device,
            format,
            egui_wgpu::RendererOptions {
                msaa_samples: 1,
                ..Default::default()
            },
        );
        Self {
            context,
            state,
            renderer,
        }
    }

    /// Returns true when egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Runs the panel for this frame and tessellates it.
    pub fn run(&mut self, window: &Window, fps: f32, counts: &mut LightCounts) -> OverlayFrame {
        let input = self.state.take_egui_input(window);
        let output = self.context.run(input, |ctx| panel(ctx, fps, counts));
        self.state
            .handle_platform_output(window, output.platform_output);
        let jobs = self
            .context
            .tessellate(output.shapes, output.pixels_per_point);
        OverlayFrame {
            jobs,
            textures: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        }
    }

    /// Uploads textures and vertex data. Must run before the overlay pass.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        frame: &OverlayFrame,
        size: [u32; 2],
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, delta) in &frame.textures.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &frame.jobs, &screen(frame, size))
    }

    pub fn paint(&self, pass: &mut wgpu::RenderPass<'static>, frame: &OverlayFrame, size: [u32; 2]) {
        self.renderer.render(pass, &frame.jobs, &screen(frame, size));
    }

    /// Releases textures egui no longer needs. Runs after submission.
    pub fn finish(&mut self, frame: &OverlayFrame) {
        for id in &frame.textures.free {
            self.renderer.free_texture(id);
        }
    }
}

fn screen(frame: &OverlayFrame, size: [u32; 2]) -> egui_wgpu::ScreenDescriptor {
    egui_wgpu::ScreenDescriptor {
        size_in_pixels: size,
        pixels_per_point: frame.pixels_per_point,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fps_is_the_inverse_of_frame_time() {
        assert_relative_eq!(fps_for(Duration::from_millis(16)), 62.5, epsilon = 1e-3);
        assert_relative_eq!(fps_for(Duration::from_millis(100)), 10.0, epsilon = 1e-4);
        assert_eq!(fps_for(Duration::ZERO), 0.0);
    }

    #[test]
    fn clock_tracks_the_last_frame() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start);
        assert_eq!(clock.fps(), 0.0);
        let elapsed = clock.tick(start + Duration::from_millis(50));
        assert_eq!(elapsed, Duration::from_millis(50));
        assert_relative_eq!(clock.fps(), 20.0, epsilon = 1e-3);
        clock.tick(start + Duration::from_millis(75));
        assert_relative_eq!(clock.fps(), 40.0, epsilon = 1e-2);
    }

    #[test]
    fn panel_runs_headless_without_touching_counts() {
        let ctx = egui::Context::default();
        let mut counts = LightCounts::new(4, 5, 6);
        let output = ctx.run(egui::RawInput::default(), |ctx| panel(ctx, 60.0, &mut counts));
        assert_eq!(counts, LightCounts::new(4, 5, 6));
        assert!(!output.shapes.is_empty());
    }
}
