//! CPU reference of the lighting shaders.
//!
//! Mirrors `shaders/lighting_common.wgsl` and the three light kernels so the
//! accumulation rules can be checked without a GPU.

use glam::Vec3;

use crate::lights::{DirectionalLight, LightKind, LightSet, PointLight, SpotLight};
use crate::render::BlendMode;

const ATTENUATION_LINEAR: f32 = 0.09;
const ATTENUATION_QUADRATIC: f32 = 0.032;

/// Surface attributes as decoded from the geometry buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub specular: f32,
    pub specular_power: f32,
}

fn attenuation(distance: f32) -> f32 {
    1.0 / (1.0 + ATTENUATION_LINEAR * distance + ATTENUATION_QUADRATIC * distance * distance)
}

fn blinn_phong(surface: &Surface, eye: Vec3, to_light: Vec3, radiance: Vec3) -> Vec3 {
    let n = surface.normal.normalize_or_zero();
    let l = to_light.normalize_or_zero();
    let v = (eye - surface.position).normalize_or_zero();
    let h = (l + v).normalize_or_zero();
    let diffuse = n.dot(l).max(0.0);
    let specular = n.dot(h).max(0.0).powf(surface.specular_power) * surface.specular;
    (surface.albedo * diffuse + Vec3::splat(specular)) * radiance
}

pub fn point(surface: &Surface, light: &PointLight, eye: Vec3) -> Vec3 {
    let to_light = Vec3::from(light.position) - surface.position;
    let radiance = Vec3::from(light.color) * light.intensity * attenuation(to_light.length());
    blinn_phong(surface, eye, to_light, radiance)
}

pub fn directional(surface: &Surface, light: &DirectionalLight, eye: Vec3) -> Vec3 {
    let radiance = Vec3::from(light.color) * light.intensity;
    blinn_phong(surface, eye, Vec3::from(light.direction), radiance)
}

/// `lit` is the shadow-map visibility in `[0, 1]`.
pub fn spot(surface: &Surface, light: &SpotLight, eye: Vec3, lit: f32) -> Vec3 {
    let to_light = Vec3::from(light.position) - surface.position;
    let cos_theta = (-to_light.normalize_or_zero()).dot(Vec3::from(light.direction).normalize_or_zero());
    let outer = light.angle.to_radians().cos();
    let inner = (light.angle - light.penumbra_angle).max(0.0).to_radians().cos();
    let cone = ((cos_theta - outer) / (inner - outer).max(1.0e-4)).clamp(0.0, 1.0);
    let radiance =
        Vec3::from(light.color) * light.intensity * attenuation(to_light.length()) * cone * lit;
    blinn_phong(surface, eye, to_light, radiance)
}

/// Radiance written by one lighting pass: the sum over every light of `kind`.
pub fn pass_radiance(surface: &Surface, lights: &LightSet, kind: LightKind, eye: Vec3) -> Vec3 {
    match kind {
        LightKind::Point => lights
            .points
            .records()
            .iter()
            .map(|light| point(surface, light, eye))
            .sum(),
        LightKind::Directional => lights
            .directionals
            .records()
            .iter()
            .map(|light| directional(surface, light, eye))
            .sum(),
        LightKind::Spot => lights
            .spots
            .records()
            .iter()
            .map(|light| spot(surface, light, eye, 1.0))
            .sum(),
    }
}

/// Blends every pass in `order` onto a cleared pixel.
pub fn accumulate(surface: &Surface, lights: &LightSet, eye: Vec3, order: &[LightKind]) -> Vec3 {
    let pixel = order.iter().fold([0.0, 0.0, 0.0, 1.0], |dst, kind| {
        let radiance = pass_radiance(surface, lights, *kind, eye);
        BlendMode::Additive.apply(dst, radiance.extend(0.0).into())
    });
    Vec3::new(pixel[0], pixel[1], pixel[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lights::LightCounts;
    use approx::assert_relative_eq;

    fn floor() -> Surface {
        Surface {
            position: Vec3::new(0.0, -2.0, 1.0),
            normal: Vec3::Y,
            albedo: Vec3::splat(0.8),
            specular: 0.5,
            specular_power: 20.0,
        }
    }

    #[test]
    fn lights_behind_the_surface_contribute_nothing() {
        let surface = Surface {
            normal: Vec3::NEG_Y,
            specular: 0.0,
            ..floor()
        };
        let lights = LightSet::demo(&LightCounts::new(3, 1, 1));
        let eye = Vec3::new(0.0, -5.0, 0.0);
        for kind in LightKind::ALL {
            assert_eq!(pass_radiance(&surface, &lights, kind, eye), Vec3::ZERO);
        }
    }

    #[test]
    fn spot_cone_cuts_off_outside_angle() {
        let light = LightSet::demo(&LightCounts::new(0, 0, 1)).spots.records()[0];
        let eye = Vec3::new(0.0, 5.0, 5.0);
        let under = Surface {
            position: Vec3::new(0.8, -2.0, 0.0),
            ..floor()
        };
        let far_away = Surface {
            position: Vec3::new(15.0, -2.0, 0.0),
            ..floor()
        };
        assert!(spot(&under, &light, eye, 1.0).length() > 0.0);
        assert_eq!(spot(&far_away, &light, eye, 1.0), Vec3::ZERO);
        assert_eq!(spot(&under, &light, eye, 0.0), Vec3::ZERO);
    }

    #[test]
    fn accumulation_is_order_independent() {
        let lights = LightSet::demo(&LightCounts::new(12, 2, 3));
        let eye = Vec3::new(0.0, 0.0, 10.0);
        let reference = accumulate(&floor(), &lights, eye, &LightKind::ALL);
        let orders = [
            [LightKind::Spot, LightKind::Point, LightKind::Directional],
            [LightKind::Directional, LightKind::Spot, LightKind::Point],
            [LightKind::Point, LightKind::Spot, LightKind::Directional],
        ];
        for order in orders {
            let result = accumulate(&floor(), &lights, eye, &order);
            assert_relative_eq!(result.x, reference.x, epsilon = 1e-5);
            assert_relative_eq!(result.y, reference.y, epsilon = 1e-5);
            assert_relative_eq!(result.z, reference.z, epsilon = 1e-5);
        }
        assert!(reference.length() > 0.0);
    }

    #[test]
    fn more_point_lights_add_more_light() {
        let eye = Vec3::new(0.0, 0.0, 10.0);
        let one = LightSet::demo(&LightCounts::new(1, 0, 0));
        let many = LightSet::demo(&LightCounts::new(10, 0, 0));
        let dim = pass_radiance(&floor(), &one, LightKind::Point, eye);
        let bright = pass_radiance(&floor(), &many, LightKind::Point, eye);
        assert!(bright.length() > dim.length());
    }
}
