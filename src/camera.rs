use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Radius the camera snaps back to when zooming collapses it onto the pivot.
pub const DEFAULT_RADIUS: f32 = 10.0;
/// Smallest radius accepted before the zoom safety clamp kicks in.
pub const MIN_RADIUS: f32 = 0.1;

const PHI_UPPER_MARGIN: f32 = 0.1;
const PHI_LOWER_SNAP: f32 = 0.00001;

const FOV_Y_DEGREES: f32 = 45.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;

/// Camera parameters consumed by the renderer's uniform buffers.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub inverse_view_proj: Mat4,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

/// Camera orbiting a pivot, parameterized in spherical coordinates.
///
/// `eye` and `up` are caches derived from `radius`, `theta`, `phi` and
/// `pivot`; every mutating operation recomputes them before returning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitCamera {
    radius: f32,
    theta: f32,
    phi: f32,
    pivot: Vec3,
    eye: Vec3,
    up: Vec3,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitCamera {
    /// Creates a camera in its default orbit around the origin.
    pub fn new() -> Self {
        let mut camera = Self {
            radius: DEFAULT_RADIUS,
            theta: FRAC_PI_2,
            phi: FRAC_PI_2,
            pivot: Vec3::ZERO,
            eye: Vec3::ZERO,
            up: Vec3::Y,
        };
        camera.reset();
        camera
    }

    /// Restores the default angles and radius. The pivot is left untouched.
    pub fn reset(&mut self) {
        self.theta = FRAC_PI_2;
        self.phi = FRAC_PI_2;
        self.radius = DEFAULT_RADIUS;
        self.compute();
    }

    /// Scales the orbit radius by `1 + factor`.
    ///
    /// When the radius collapses below [`MIN_RADIUS`] the camera keeps its
    /// eye position and pushes the pivot forward instead, so the view never
    /// inverts through the pivot.
    pub fn zoom(&mut self, factor: f32) {
        self.radius *= 1.0 + factor;
        if self.radius < MIN_RADIUS {
            self.radius = DEFAULT_RADIUS;
            let forward = (self.pivot - self.eye).normalize_or_zero();
            self.pivot = self.eye + forward * self.radius;
        }
        self.compute();
    }

    /// Rotates around the pivot. `d_theta` is added to the azimuth, which
    /// wraps into `[0, 2π)`, and `d_phi` subtracted from the polar angle.
    pub fn turn(&mut self, d_phi: f32, d_theta: f32) {
        self.theta = (self.theta + d_theta).rem_euclid(TAU);
        // rem_euclid can round up to exactly TAU for tiny negative inputs.
        if self.theta >= TAU {
            self.theta = 0.0;
        }
        self.phi -= d_phi;
        if self.phi >= TAU - PHI_UPPER_MARGIN {
            self.phi = PHI_LOWER_SNAP;
        } else if self.phi <= 0.0 {
            self.phi = TAU - PHI_UPPER_MARGIN;
        }
        self.compute();
    }

    /// Slides the pivot in the view plane, scaled by the orbit radius.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let up = self.vertical();
        let forward = (self.pivot - self.eye).normalize_or_zero();
        let side = forward.cross(up).normalize_or_zero();
        self.pivot += up * dy * self.radius * 2.0;
        self.pivot -= side * dx * self.radius * 2.0;
        self.compute();
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn pivot(&self) -> Vec3 {
        self.pivot
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// World-to-view transform looking from the eye at the pivot.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.pivot, self.up)
    }

    /// Perspective projection with a 0..1 depth range.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            FOV_Y_DEGREES.to_radians(),
            aspect.max(0.01),
            NEAR_PLANE,
            FAR_PLANE,
        )
    }

    /// Matrices and position uploaded to the geometry and lighting passes.
    pub fn params(&self, aspect: f32) -> CameraParams {
        let view_proj = self.projection(aspect) * self.view_matrix();
        CameraParams {
            view_proj,
            inverse_view_proj: view_proj.inverse(),
            position: self.eye,
            near: NEAR_PLANE,
            far: FAR_PLANE,
        }
    }

    fn vertical(&self) -> Vec3 {
        if self.phi < PI {
            Vec3::Y
        } else {
            Vec3::NEG_Y
        }
    }

    fn compute(&mut self) {
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        self.eye = self.pivot
            + Vec3::new(cos_theta * sin_phi, cos_phi, sin_theta * sin_phi) * self.radius;
        self.up = self.vertical();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_look_down_the_z_axis() {
        let camera = OrbitCamera::new();
        assert_eq!(camera.radius(), DEFAULT_RADIUS);
        assert_relative_eq!(camera.eye().x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(camera.eye().y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(camera.eye().z, 10.0, epsilon = 1e-5);
        assert_eq!(camera.up(), Vec3::Y);
    }

    #[test]
    fn phi_stays_inside_open_interval() {
        let mut camera = OrbitCamera::new();
        let deltas = [0.3, -2.0, 7.5, -0.01, 3.2, -9.0, 0.0, 1.0e-6, -1.0e-6];
        for _ in 0..50 {
            for delta in deltas {
                camera.turn(delta, 0.1);
                assert!(camera.phi() > 0.0, "phi {} not positive", camera.phi());
                assert!(camera.phi() < TAU, "phi {} not below 2pi", camera.phi());
            }
        }
    }

    #[test]
    fn theta_wraps_into_one_turn() {
        let mut camera = OrbitCamera::new();
        for delta in [4.0, 5.5, -20.0, -1.0e-9, 13.0] {
            camera.turn(0.0, delta);
            assert!((0.0..TAU).contains(&camera.theta()), "theta {}", camera.theta());
        }

        let mut camera = OrbitCamera::new();
        let eye = camera.eye();
        camera.turn(0.0, TAU + 0.25);
        assert_relative_eq!(camera.theta(), FRAC_PI_2 + 0.25, epsilon = 1e-5);
        camera.turn(0.0, -0.25);
        assert_relative_eq!(camera.eye().x, eye.x, epsilon = 1e-4);
        assert_relative_eq!(camera.eye().z, eye.z, epsilon = 1e-4);
    }

    #[test]
    fn wrapping_past_the_top_snaps_near_zero() {
        let mut camera = OrbitCamera::new();
        camera.turn(-(TAU - FRAC_PI_2), 0.0);
        assert_relative_eq!(camera.phi(), PHI_LOWER_SNAP);

        let mut camera = OrbitCamera::new();
        camera.turn(FRAC_PI_2 + 0.5, 0.0);
        assert_relative_eq!(camera.phi(), TAU - PHI_UPPER_MARGIN);
    }

    #[test]
    fn up_flips_exactly_when_phi_crosses_pi() {
        let mut camera = OrbitCamera::new();
        let step = 0.01;
        let mut previous = camera.phi();
        for _ in 0..2000 {
            camera.turn(-step, 0.0);
            let expected = if camera.phi() < PI { 1.0 } else { -1.0 };
            assert_eq!(camera.up().y, expected, "phi {previous} -> {}", camera.phi());
            previous = camera.phi();
        }
    }

    #[test]
    fn zoom_scales_radius() {
        let mut camera = OrbitCamera::new();
        camera.zoom(0.5);
        assert_relative_eq!(camera.radius(), 15.0);
        camera.zoom(-0.5);
        assert_relative_eq!(camera.radius(), 7.5);
    }

    #[test]
    fn zoom_collapse_resets_radius_and_moves_pivot() {
        let mut camera = OrbitCamera::new();
        camera.turn(0.4, 0.7);
        let factors = [-0.5, -0.5, -0.9, -0.9, -0.99];
        let mut collapsed = false;
        for factor in factors {
            let eye_before = camera.eye();
            let forward = (camera.pivot() - eye_before).normalize();
            camera.zoom(factor);
            if camera.radius() == DEFAULT_RADIUS {
                collapsed = true;
                let expected_pivot = eye_before + forward * DEFAULT_RADIUS;
                assert_relative_eq!(camera.pivot().x, expected_pivot.x, epsilon = 1e-4);
                assert_relative_eq!(camera.pivot().y, expected_pivot.y, epsilon = 1e-4);
                assert_relative_eq!(camera.pivot().z, expected_pivot.z, epsilon = 1e-4);
            }
            let offset = camera.eye() - camera.pivot();
            assert_relative_eq!(offset.length(), camera.radius(), epsilon = 1e-3);
        }
        assert!(collapsed);
        assert!(camera.radius() >= MIN_RADIUS);
    }

    #[test]
    fn pan_moves_pivot_in_view_plane() {
        let mut camera = OrbitCamera::new();
        camera.pan(0.0, 0.1);
        assert_relative_eq!(camera.pivot().y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(camera.pivot().x, 0.0, epsilon = 1e-5);

        let mut camera = OrbitCamera::new();
        camera.pan(0.1, 0.0);
        // Eye on +z looking at -z: side = forward x up = +x, so the pivot moves to -x.
        assert_relative_eq!(camera.pivot().x, -2.0, epsilon = 1e-5);
        assert_relative_eq!(camera.eye().x, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn params_invert_cleanly() {
        let camera = OrbitCamera::new();
        let params = camera.params(1024.0 / 768.0);
        let identity = params.view_proj * params.inverse_view_proj;
        assert!(identity.abs_diff_eq(Mat4::IDENTITY, 1e-4));
        assert_eq!(params.position, camera.eye());
    }
}
