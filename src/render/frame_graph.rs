//! The fixed per-frame pass sequence, described as data.
//!
//! [`FrameGraph::deferred`] lays out every pass of a frame together with the
//! fixed-function state it runs with. The renderer walks this list to record
//! the frame; tests walk it to check ordering and state without a GPU.

use std::fmt;

use crate::lights::LightKind;

/// Width and height of a render target in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn full_viewport(self) -> Viewport {
        Viewport {
            x: 0.0,
            y: 0.0,
            width: self.width as f32,
            height: self.height as f32,
        }
    }
}

/// Main render target size.
pub const MAIN_EXTENT: Extent = Extent::new(1024, 768);
/// Shadow map resolution.
pub const SHADOW_EXTENT: Extent = Extent::new(512, 512);

/// Viewport rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Where a pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    ShadowMap,
    GBuffer,
    Surface,
}

/// Intermediate targets shown in the debug strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugTarget {
    Color,
    Normal,
    Depth,
    Shadow,
}

impl DebugTarget {
    pub const ALL: [DebugTarget; 4] = [
        DebugTarget::Color,
        DebugTarget::Normal,
        DebugTarget::Depth,
        DebugTarget::Shadow,
    ];

    /// Depth targets are shown as linearized grayscale instead of raw color.
    pub fn is_depth(self) -> bool {
        matches!(self, DebugTarget::Depth | DebugTarget::Shadow)
    }

    fn quadrant(self) -> u32 {
        match self {
            DebugTarget::Color => 0,
            DebugTarget::Normal => 1,
            DebugTarget::Depth => 2,
            DebugTarget::Shadow => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Shadow,
    Geometry,
    Lighting(LightKind),
    DebugBlit(DebugTarget),
    Overlay,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::Shadow => f.write_str("shadow"),
            PassKind::Geometry => f.write_str("geometry"),
            PassKind::Lighting(kind) => write!(f, "lighting/{}", kind.label()),
            PassKind::DebugBlit(target) => write!(f, "blit/{target:?}"),
            PassKind::Overlay => f.write_str("overlay"),
        }
    }
}

/// Clear operations performed when the pass begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clear {
    pub color: Option<[f64; 4]>,
    pub depth: Option<f32>,
}

impl Clear {
    pub const NONE: Clear = Clear {
        color: None,
        depth: None,
    };
}

/// Color blending applied by a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Replace,
    /// `src * 1 + dst * 1`.
    Additive,
    /// `src * src.a + dst * (1 - src.a)`.
    Alpha,
}

impl BlendMode {
    pub fn to_wgpu(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Replace => None,
            BlendMode::Additive => {
                let component = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                };
                Some(wgpu::BlendState {
                    color: component,
                    alpha: component,
                })
            }
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        }
    }

    /// CPU model of the blend equation configured by [`BlendMode::to_wgpu`].
    pub fn apply(self, dst: [f32; 4], src: [f32; 4]) -> [f32; 4] {
        match self {
            BlendMode::Replace => src,
            BlendMode::Additive => [
                dst[0] + src[0],
                dst[1] + src[1],
                dst[2] + src[2],
                dst[3] + src[3],
            ],
            BlendMode::Alpha => {
                let a = src[3];
                [
                    src[0] * a + dst[0] * (1.0 - a),
                    src[1] * a + dst[1] * (1.0 - a),
                    src[2] * a + dst[2] * (1.0 - a),
                    src[3] * a + dst[3] * (1.0 - a),
                ]
            }
        }
    }
}

/// One pass of the frame with its fixed-function state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassDesc {
    pub kind: PassKind,
    pub target: RenderTarget,
    pub clear: Clear,
    pub depth_test: bool,
    pub blend: BlendMode,
    pub viewport: Viewport,
}

/// Clear color of the presented frame before light accumulation.
pub const BLACK: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, PartialEq)]
pub struct FrameGraph {
    passes: Vec<PassDesc>,
}

impl FrameGraph {
    /// Shadow, geometry, lighting (in `lighting_order`), debug strip, overlay.
    ///
    /// Panics unless `lighting_order` names every light kind exactly once.
    pub fn deferred(
        extent: Extent,
        shadow_extent: Extent,
        lighting_order: &[LightKind; 3],
    ) -> Self {
        assert!(
            LightKind::ALL
                .iter()
                .all(|kind| lighting_order.contains(kind)),
            "lighting order {lighting_order:?} must contain each light kind once"
        );
        let mut passes = vec![
            PassDesc {
                kind: PassKind::Shadow,
                target: RenderTarget::ShadowMap,
                clear: Clear {
                    color: None,
                    depth: Some(1.0),
                },
                depth_test: true,
                blend: BlendMode::Replace,
                viewport: shadow_extent.full_viewport(),
            },
            PassDesc {
                kind: PassKind::Geometry,
                target: RenderTarget::GBuffer,
                clear: Clear {
                    color: Some([0.0, 0.0, 0.0, 0.0]),
                    depth: Some(1.0),
                },
                depth_test: true,
                blend: BlendMode::Replace,
                viewport: extent.full_viewport(),
            },
        ];

        for (index, kind) in lighting_order.iter().enumerate() {
            let clear = if index == 0 {
                Clear {
                    color: Some(BLACK),
                    depth: None,
                }
            } else {
                Clear::NONE
            };
            passes.push(PassDesc {
                kind: PassKind::Lighting(*kind),
                target: RenderTarget::Surface,
                clear,
                depth_test: false,
                blend: BlendMode::Additive,
                viewport: extent.full_viewport(),
            });
        }

        for target in DebugTarget::ALL {
            passes.push(PassDesc {
                kind: PassKind::DebugBlit(target),
                target: RenderTarget::Surface,
                clear: Clear::NONE,
                depth_test: false,
                blend: BlendMode::Replace,
                viewport: debug_viewport(extent, target),
            });
        }

        passes.push(PassDesc {
            kind: PassKind::Overlay,
            target: RenderTarget::Surface,
            clear: Clear::NONE,
            depth_test: false,
            blend: BlendMode::Alpha,
            viewport: extent.full_viewport(),
        });

        Self { passes }
    }

    pub fn passes(&self) -> &[PassDesc] {
        &self.passes
    }

    pub fn lighting_passes(&self) -> impl Iterator<Item = &PassDesc> {
        self.passes
            .iter()
            .filter(|pass| matches!(pass.kind, PassKind::Lighting(_)))
    }

    /// Human readable listing, one pass per line.
    pub fn describe(&self) -> Vec<String> {
        self.passes
            .iter()
            .enumerate()
            .map(|(index, pass)| {
                format!(
                    "{index}: {} -> {:?} clear={} depth_test={} blend={:?} viewport={}x{}+{}+{}",
                    pass.kind,
                    pass.target,
                    pass.clear.color.is_some() || pass.clear.depth.is_some(),
                    pass.depth_test,
                    pass.blend,
                    pass.viewport.width,
                    pass.viewport.height,
                    pass.viewport.x,
                    pass.viewport.y,
                )
            })
            .collect()
    }
}

/// One quarter of the strip along the bottom edge of the main target.
fn debug_viewport(extent: Extent, target: DebugTarget) -> Viewport {
    let width = (extent.width / 4) as f32;
    let height = (extent.height / 4) as f32;
    Viewport {
        x: target.quadrant() as f32 * width,
        y: extent.height as f32 - height,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_graph() -> FrameGraph {
        FrameGraph::deferred(MAIN_EXTENT, SHADOW_EXTENT, &LightKind::ALL)
    }

    #[test]
    fn passes_run_in_fixed_order() {
        let kinds: Vec<PassKind> = default_graph().passes().iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PassKind::Shadow,
                PassKind::Geometry,
                PassKind::Lighting(LightKind::Point),
                PassKind::Lighting(LightKind::Directional),
                PassKind::Lighting(LightKind::Spot),
                PassKind::DebugBlit(DebugTarget::Color),
                PassKind::DebugBlit(DebugTarget::Normal),
                PassKind::DebugBlit(DebugTarget::Depth),
                PassKind::DebugBlit(DebugTarget::Shadow),
                PassKind::Overlay,
            ]
        );
    }

    #[test]
    fn shadow_pass_is_depth_only_at_shadow_resolution() {
        let graph = default_graph();
        let shadow = graph.passes()[0];
        assert_eq!(shadow.target, RenderTarget::ShadowMap);
        assert_eq!(shadow.clear.color, None);
        assert_eq!(shadow.clear.depth, Some(1.0));
        assert_eq!(shadow.viewport.width, 512.0);
        assert_eq!(shadow.viewport.height, 512.0);
    }

    #[test]
    fn only_first_lighting_pass_clears() {
        let graph = default_graph();
        let lighting: Vec<&PassDesc> = graph.lighting_passes().collect();
        assert_eq!(lighting.len(), 3);
        assert_eq!(lighting[0].clear.color, Some(BLACK));
        for pass in &lighting[1..] {
            assert_eq!(pass.clear, Clear::NONE);
        }
        for pass in lighting {
            assert!(!pass.depth_test);
            assert_eq!(pass.blend, BlendMode::Additive);
            assert_eq!(pass.target, RenderTarget::Surface);
        }
    }

    #[test]
    fn debug_strip_tiles_bottom_edge() {
        let graph = default_graph();
        let blits: Vec<&PassDesc> = graph
            .passes()
            .iter()
            .filter(|pass| matches!(pass.kind, PassKind::DebugBlit(_)))
            .collect();
        assert_eq!(blits.len(), 4);
        for (index, pass) in blits.iter().enumerate() {
            assert_eq!(pass.viewport.x, index as f32 * 256.0);
            assert_eq!(pass.viewport.y, 768.0 - 192.0);
            assert_eq!(pass.viewport.width, 256.0);
            assert_eq!(pass.viewport.height, 192.0);
            assert_eq!(pass.blend, BlendMode::Replace);
        }
        let depth_flags: Vec<bool> = DebugTarget::ALL.iter().map(|t| t.is_depth()).collect();
        assert_eq!(depth_flags, vec![false, false, true, true]);
    }

    #[test]
    fn overlay_uses_alpha_blending_without_depth() {
        let graph = default_graph();
        let overlay = graph.passes().last().copied().unwrap();
        assert_eq!(overlay.kind, PassKind::Overlay);
        assert_eq!(overlay.blend, BlendMode::Alpha);
        assert!(!overlay.depth_test);
        assert_eq!(
            BlendMode::Alpha.to_wgpu(),
            Some(wgpu::BlendState::ALPHA_BLENDING)
        );
    }

    #[test]
    fn additive_blend_is_one_one() {
        let state = BlendMode::Additive.to_wgpu().unwrap();
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.operation, wgpu::BlendOperation::Add);
        assert_eq!(BlendMode::Replace.to_wgpu(), None);
    }

    #[test]
    fn lighting_order_does_not_change_accumulation() {
        let contributions = |kind: LightKind| match kind {
            LightKind::Point => [0.125, 0.5, 0.25, 0.0],
            LightKind::Directional => [0.375, 0.0625, 0.5, 0.0],
            LightKind::Spot => [0.25, 0.25, 0.125, 0.0],
        };
        let orders = [
            [LightKind::Point, LightKind::Directional, LightKind::Spot],
            [LightKind::Point, LightKind::Spot, LightKind::Directional],
            [LightKind::Directional, LightKind::Point, LightKind::Spot],
            [LightKind::Directional, LightKind::Spot, LightKind::Point],
            [LightKind::Spot, LightKind::Point, LightKind::Directional],
            [LightKind::Spot, LightKind::Directional, LightKind::Point],
        ];
        let mut results = Vec::new();
        for order in orders {
            let graph = FrameGraph::deferred(MAIN_EXTENT, SHADOW_EXTENT, &order);
            let mut pixel = [0.0_f32; 4];
            for pass in graph.lighting_passes() {
                if let Some(color) = pass.clear.color {
                    pixel = color.map(|channel| channel as f32);
                }
                let PassKind::Lighting(kind) = pass.kind else {
                    unreachable!()
                };
                pixel = pass.blend.apply(pixel, contributions(kind));
            }
            results.push(pixel);
        }
        for result in &results[1..] {
            assert_eq!(*result, results[0]);
        }
        assert_eq!(results[0], [0.75, 0.8125, 0.875, 1.0]);
    }

    #[test]
    #[should_panic(expected = "must contain each light kind once")]
    fn repeated_light_kind_is_rejected() {
        FrameGraph::deferred(
            MAIN_EXTENT,
            SHADOW_EXTENT,
            &[LightKind::Point, LightKind::Point, LightKind::Spot],
        );
    }

    #[test]
    fn describe_lists_every_pass() {
        let lines = default_graph().describe();
        assert_eq!(lines.len(), 10);
        assert!(lines[0].starts_with("0: shadow -> ShadowMap"));
        assert!(lines[2].contains("lighting/point"));
        assert!(lines[9].contains("overlay"));
    }
}
