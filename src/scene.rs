use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

/// Runtime representation of the rendered scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub material: Material,
    pub shadow: ShadowCaster,
}

impl Default for Scene {
    /// One cube at the origin over a large ground plane.
    fn default() -> Self {
        Self {
            objects: vec![
                SceneObject {
                    name: "Cube".to_string(),
                    mesh: MeshKind::Cube,
                    ..SceneObject::default()
                },
                SceneObject {
                    name: "Ground".to_string(),
                    mesh: MeshKind::Plane,
                    position: Vec3::new(0.0, -2.0, 0.0),
                    scale: Vec3::new(40.0, 1.0, 40.0),
                    ..SceneObject::default()
                },
            ],
            material: Material::default(),
            shadow: ShadowCaster::default(),
        }
    }
}

impl Scene {
    /// Parses a scene description.
    ///
    /// Objects without a `<mesh>` default to a cube. A missing `<material>`
    /// keeps the default brick textures.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let mut objects = Vec::new();

        for node in document.descendants().filter(|n| n.has_tag_name("object")) {
            let mut object = SceneObject::default();
            object.name = required_text(&node, "name")?;
            if let Some(mesh) = optional_text(&node, "mesh") {
                object.mesh = MeshKind::from_name(&mesh)
                    .ok_or_else(|| anyhow!("unknown mesh '{mesh}' on {}", object.name))?;
            }
            object.color = parse_color(optional_text(&node, "color"), object.color)?;
            object.position = parse_vec3(optional_text(&node, "position"), object.position)?;
            object.scale = parse_vec3(optional_text(&node, "scale"), object.scale)?;
            objects.push(object);
        }

        if objects.is_empty() {
            return Err(anyhow!("scene does not contain any <object>"));
        }

        let mut material = Material::default();
        if let Some(node) = document
            .descendants()
            .find(|n| n.has_tag_name("material"))
        {
            if let Some(path) = optional_text(&node, "diffuse") {
                material.diffuse = PathBuf::from(path);
            }
            if let Some(path) = optional_text(&node, "specular") {
                material.specular = PathBuf::from(path);
            }
            material.specular_power =
                parse_f32(optional_text(&node, "specular_power"), material.specular_power)?;
        }

        Ok(Self {
            objects,
            material,
            shadow: ShadowCaster::default(),
        })
    }

    /// Meshes referenced by at least one object, in first-use order.
    pub fn mesh_kinds(&self) -> Vec<MeshKind> {
        let mut kinds = Vec::new();
        for object in &self.objects {
            if !kinds.contains(&object.mesh) {
                kinds.push(object.mesh);
            }
        }
        kinds
    }
}

/// Built-in meshes a scene object can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshKind {
    Cube,
    Plane,
}

impl MeshKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "cube" => Some(Self::Cube),
            "plane" => Some(Self::Plane),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Plane => "plane",
        }
    }

    pub fn build(self) -> Mesh {
        match self {
            Self::Cube => Mesh::cube(),
            Self::Plane => Mesh::plane(),
        }
    }
}

/// Scene object as described by the scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub mesh: MeshKind,
    /// Multiplied with the diffuse texture in the geometry pass.
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            mesh: MeshKind::Cube,
            color: default_color(),
            position: Vec3::ZERO,
            scale: default_scale(),
        }
    }
}

impl SceneObject {
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_scale(self.scale)
    }

    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(self.model_matrix()).inverse().transpose()
    }
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

/// Textures and specular exponent shared by every object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub diffuse: PathBuf,
    pub specular: PathBuf,
    pub specular_power: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: PathBuf::from("textures/bricks_diffuse.png"),
            specular: PathBuf::from("textures/bricks_specular.png"),
            specular_power: 20.0,
        }
    }
}

/// The light the shadow map is rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowCaster {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowCaster {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 3.0, 0.0),
            target: Vec3::new(0.0, 2.0, 0.0),
            up: Vec3::new(0.0, 0.0, -1.0),
            fov_degrees: 90.0,
            near: 1.0,
            far: 100.0,
        }
    }
}

impl ShadowCaster {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), 1.0, self.near, self.far)
    }

    /// World to shadow-map clip space.
    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Interleaved vertex layout shared by every scene mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// CPU side mesh data ready for upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Unit cube centered on the origin, four vertices per face.
    pub fn cube() -> Self {
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // normal, u axis, v axis
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];
        let mut mesh = Mesh::default();
        for (normal, u_axis, v_axis) in FACES {
            let n = Vec3::from(normal);
            let u = Vec3::from(u_axis);
            let v = Vec3::from(v_axis);
            let base = mesh.vertices.len() as u32;
            for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                let position = n * 0.5 + u * su + v * sv;
                mesh.vertices.push(Vertex {
                    position: position.into(),
                    normal,
                    uv: [su + 0.5, 0.5 - sv],
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// Unit square in the XZ plane facing +Y.
    pub fn plane() -> Self {
        let corners = [(-0.5, 0.5), (0.5, 0.5), (0.5, -0.5), (-0.5, -0.5)];
        let vertices = corners
            .iter()
            .map(|&(x, z)| Vertex {
                position: [x, 0.0, z],
                normal: [0.0, 1.0, 0.0],
                uv: [x + 0.5, z + 0.5],
            })
            .collect();
        Self {
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vertex; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let components = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .with_context(|| format!("invalid vector component '{component}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    match components.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!("expected 3 vector components, found {}", components.len())),
    }
}

fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let rgb = parse_vec3(Some(value), default).context("invalid color")?;
    Ok(rgb / 255.0)
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}
