use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use crate::camera::CameraParams;
use crate::render::frame_graph::Extent;
use crate::scene::SceneObject;

/// Group 0 of the geometry pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GeometryGlobals {
    pub view_proj: [[f32; 4]; 4],
    /// x holds the specular power.
    pub material: [f32; 4],
}

impl GeometryGlobals {
    pub fn new(camera: &CameraParams, specular_power: f32) -> Self {
        Self {
            view_proj: camera.view_proj.to_cols_array_2d(),
            material: [specular_power, 0.0, 0.0, 0.0],
        }
    }
}

/// Group 0 of the shadow pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadowGlobals {
    pub light_view_proj: [[f32; 4]; 4],
}

/// Per-object constants shared by the shadow and geometry passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObjectConstants {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub tint: [f32; 4],
}

impl ObjectConstants {
    pub fn from_object(object: &SceneObject) -> Self {
        Self {
            model: object.model_matrix().to_cols_array_2d(),
            normal: mat3_to_3x4(object.normal_matrix()),
            tint: object.color.extend(1.0).into(),
        }
    }
}

/// Group 0 of every lighting pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightingFrame {
    pub inverse_view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub viewport: [f32; 4],
}

impl LightingFrame {
    pub fn new(camera: &CameraParams, light_view_proj: Mat4, extent: Extent) -> Self {
        Self {
            inverse_view_proj: camera.inverse_view_proj.to_cols_array_2d(),
            light_view_proj: light_view_proj.to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
            viewport: [extent.width as f32, extent.height as f32, 0.0, 0.0],
        }
    }
}

/// Uniform of one debug quadrant.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlitParams {
    pub near: f32,
    pub far: f32,
    pub is_depth: u32,
    pub padding: u32,
}

impl BlitParams {
    pub fn color() -> Self {
        Self {
            near: 0.0,
            far: 1.0,
            is_depth: 0,
            padding: 0,
        }
    }

    pub fn depth(near: f32, far: f32) -> Self {
        Self {
            near,
            far,
            is_depth: 1,
            padding: 0,
        }
    }
}

/// WGSL `mat3x3` columns are padded to 16 bytes.
pub fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::mem::size_of;

    #[test]
    fn uniform_sizes_match_wgsl_layouts() {
        assert_eq!(size_of::<GeometryGlobals>(), 80);
        assert_eq!(size_of::<ShadowGlobals>(), 64);
        assert_eq!(size_of::<ObjectConstants>(), 128);
        assert_eq!(size_of::<LightingFrame>(), 160);
        assert_eq!(size_of::<BlitParams>(), 16);
    }

    #[test]
    fn normal_matrix_columns_are_padded() {
        let matrix = Mat3::from_cols(Vec3::X, Vec3::Y * 2.0, Vec3::Z * 3.0);
        assert_eq!(
            mat3_to_3x4(matrix),
            [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 2.0, 0.0, 0.0],
                [0.0, 0.0, 3.0, 0.0]
            ]
        );
    }

    #[test]
    fn object_tint_is_opaque() {
        let object = SceneObject {
            color: Vec3::new(0.2, 0.4, 0.6),
            ..SceneObject::default()
        };
        assert_eq!(ObjectConstants::from_object(&object).tint, [0.2, 0.4, 0.6, 1.0]);
    }
}
