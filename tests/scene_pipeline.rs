use approx::assert_relative_eq;
use glam::{Mat4, Vec3};

use deferred_lights::lights::{LightCounts, LightKind, LightSet};
use deferred_lights::render::{FrameGraph, PassKind, MAIN_EXTENT, SHADOW_EXTENT};
use deferred_lights::shading::{self, Surface};
use deferred_lights::{MeshKind, OrbitCamera, Scene};

fn project(view_proj: Mat4, point: Vec3) -> Vec3 {
    view_proj.project_point3(point)
}

fn cube_corners(scene: &Scene) -> Vec<Vec3> {
    let cube = scene
        .objects
        .iter()
        .find(|object| object.mesh == MeshKind::Cube)
        .expect("default scene has a cube");
    let model = cube.model_matrix();
    cube.mesh
        .build()
        .vertices
        .iter()
        .map(|vertex| model.transform_point3(Vec3::from(vertex.position)))
        .collect()
}

fn inside_clip_volume(ndc: Vec3) -> bool {
    ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && ndc.z > 0.0 && ndc.z < 1.0
}

#[test]
fn cube_lies_inside_the_shadow_frustum() {
    let scene = Scene::default();
    let light = scene.shadow.view_proj();
    for corner in cube_corners(&scene) {
        let ndc = project(light, corner);
        assert!(inside_clip_volume(ndc), "{corner} projects to {ndc}");
    }
}

#[test]
fn ground_under_the_cube_is_occluded() {
    let scene = Scene::default();
    let light = scene.shadow.view_proj();
    let cube_top = project(light, Vec3::new(0.0, 0.5, 0.0));
    let ground = project(light, Vec3::new(0.0, -2.0, 0.0));
    assert_relative_eq!(cube_top.x, ground.x, epsilon = 1e-5);
    assert_relative_eq!(cube_top.y, ground.y, epsilon = 1e-5);
    // Depth compare with the same bias the spot shader applies.
    assert!(ground.z - 0.005 > cube_top.z);

    let open_ground = project(light, Vec3::new(3.0, -2.0, 0.0));
    assert!(inside_clip_volume(open_ground));
}

#[test]
fn default_camera_sees_the_whole_scene() {
    let scene = Scene::default();
    let camera = OrbitCamera::new().params(MAIN_EXTENT.aspect());
    for corner in cube_corners(&scene) {
        assert!(inside_clip_volume(project(camera.view_proj, corner)));
    }
    assert!(inside_clip_volume(project(
        camera.view_proj,
        Vec3::new(0.0, -2.0, 0.0)
    )));
}

#[test]
fn surfaces_are_distinguishably_shaded() {
    let lights = LightSet::demo(&LightCounts::default());
    let eye = OrbitCamera::new().eye();
    let surface = |position: Vec3, normal: Vec3| Surface {
        position,
        normal,
        albedo: Vec3::new(0.6, 0.25, 0.2),
        specular: 0.4,
        specular_power: 20.0,
    };
    let samples = [
        surface(Vec3::new(0.0, 0.5, 0.0), Vec3::Y),
        surface(Vec3::new(0.0, 0.0, 0.5), Vec3::Z),
        surface(Vec3::new(3.0, -2.0, 3.0), Vec3::Y),
    ];
    let colors: Vec<Vec3> = samples
        .iter()
        .map(|sample| shading::accumulate(sample, &lights, eye, &LightKind::ALL))
        .collect();
    for (index, color) in colors.iter().enumerate() {
        assert!(color.length() > 0.0, "sample {index} is black");
        for other in &colors[index + 1..] {
            assert!((*color - *other).length() > 1e-3);
        }
    }
}

#[test]
fn frame_plan_accumulates_every_light_kind_once() {
    let graph = FrameGraph::deferred(MAIN_EXTENT, SHADOW_EXTENT, &LightKind::ALL);
    let kinds: Vec<LightKind> = graph
        .lighting_passes()
        .filter_map(|pass| match pass.kind {
            PassKind::Lighting(kind) => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, LightKind::ALL.to_vec());

    let lights = LightSet::demo(&LightCounts::new(5, 2, 3));
    let floor = Surface {
        position: Vec3::new(1.0, -2.0, 0.5),
        normal: Vec3::Y,
        albedo: Vec3::splat(0.7),
        specular: 0.3,
        specular_power: 20.0,
    };
    let eye = Vec3::new(0.0, 4.0, 10.0);
    let summed: Vec3 = LightKind::ALL
        .iter()
        .map(|kind| shading::pass_radiance(&floor, &lights, *kind, eye))
        .sum();
    let blended = shading::accumulate(&floor, &lights, eye, &kinds);
    assert_relative_eq!(blended.x, summed.x, epsilon = 1e-5);
    assert_relative_eq!(blended.y, summed.y, epsilon = 1e-5);
    assert_relative_eq!(blended.z, summed.z, epsilon = 1e-5);
}
