use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for every per-kind light count.
pub const MAX_LIGHTS: u32 = 100;

/// Size of the header that precedes each light array, in bytes.
pub const HEADER_SIZE: usize = 4 * size_of::<u32>();

/// The three kinds of light the lighting pass accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightKind {
    Point,
    Directional,
    Spot,
}

impl LightKind {
    pub const ALL: [LightKind; 3] = [LightKind::Point, LightKind::Directional, LightKind::Spot];

    /// Storage buffer binding slot read by the lighting shaders.
    pub const fn binding(self) -> u32 {
        match self {
            LightKind::Point => 0,
            LightKind::Directional => 1,
            LightKind::Spot => 2,
        }
    }

    /// Size of one packed record of this kind.
    pub const fn record_size(self) -> usize {
        match self {
            LightKind::Point => size_of::<PointLight>(),
            LightKind::Directional => size_of::<DirectionalLight>(),
            LightKind::Spot => size_of::<SpotLight>(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LightKind::Point => "point",
            LightKind::Directional => "directional",
            LightKind::Spot => "spot",
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLight {
    pub position: [f32; 3],
    pub padding: i32,
    pub color: [f32; 3],
    pub intensity: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLight {
    /// Direction pointing from the surface towards the light.
    pub direction: [f32; 3],
    pub padding: i32,
    pub color: [f32; 3],
    pub intensity: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpotLight {
    pub position: [f32; 3],
    /// Outer cone half-angle, degrees.
    pub angle: f32,
    pub direction: [f32; 3],
    /// Width of the soft edge inside the cone, degrees.
    pub penumbra_angle: f32,
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Per-kind light counts driven by the overlay sliders.
///
/// Every setter clamps to `[0, MAX_LIGHTS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightCounts {
    point: u32,
    directional: u32,
    spot: u32,
}

impl Default for LightCounts {
    fn default() -> Self {
        Self {
            point: 1,
            directional: 1,
            spot: 1,
        }
    }
}

impl LightCounts {
    pub fn new(point: i64, directional: i64, spot: i64) -> Self {
        Self {
            point: clamp_count(point),
            directional: clamp_count(directional),
            spot: clamp_count(spot),
        }
    }

    pub fn get(&self, kind: LightKind) -> u32 {
        match kind {
            LightKind::Point => self.point,
            LightKind::Directional => self.directional,
            LightKind::Spot => self.spot,
        }
    }

    pub fn set(&mut self, kind: LightKind, value: i64) {
        let value = clamp_count(value);
        match kind {
            LightKind::Point => self.point = value,
            LightKind::Directional => self.directional = value,
            LightKind::Spot => self.spot = value,
        }
    }
}

fn clamp_count(value: i64) -> u32 {
    value.clamp(0, i64::from(MAX_LIGHTS)) as u32
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackError {
    #[error("light buffer is {0} bytes, shorter than its header")]
    MissingHeader(usize),
    #[error("light buffer header announces {count} records but {available} bytes follow")]
    LengthMismatch { count: usize, available: usize },
}

/// Typed schema for a light storage buffer: a four-word header whose first
/// word is the element count, followed by the tightly packed records.
#[derive(Debug, Clone, PartialEq)]
pub struct LightBuffer<T> {
    records: Vec<T>,
}

impl<T: Pod> LightBuffer<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Byte length of the packed buffer.
    pub fn byte_len(&self) -> usize {
        Self::byte_len_for(self.records.len())
    }

    pub fn byte_len_for(count: usize) -> usize {
        HEADER_SIZE + count * size_of::<T>()
    }

    /// Serializes the header and the records into one contiguous buffer.
    pub fn pack(&self) -> Vec<u8> {
        self.pack_first(self.records.len())
    }

    /// Like [`LightBuffer::pack`], keeping at most `limit` records. The
    /// header count matches the records actually written.
    pub fn pack_first(&self, limit: usize) -> Vec<u8> {
        let records = &self.records[..self.records.len().min(limit)];
        let mut bytes = Vec::with_capacity(Self::byte_len_for(records.len()));
        let header = [records.len() as u32, 0, 0, 0];
        bytes.extend_from_slice(bytemuck::cast_slice(&header));
        bytes.extend_from_slice(bytemuck::cast_slice(records));
        bytes
    }

    /// Parses a buffer produced by [`LightBuffer::pack`].
    pub fn unpack(bytes: &[u8]) -> Result<Self, PackError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PackError::MissingHeader(bytes.len()));
        }
        let (header, body) = bytes.split_at(HEADER_SIZE);
        let count = u32::from_ne_bytes([header[0], header[1], header[2], header[3]]) as usize;
        if body.len() != count * size_of::<T>() {
            return Err(PackError::LengthMismatch {
                count,
                available: body.len(),
            });
        }
        let records = body
            .chunks_exact(size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect();
        Ok(Self::new(records))
    }
}

/// All lights for one frame, rebuilt from the counts every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSet {
    pub points: LightBuffer<PointLight>,
    pub directionals: LightBuffer<DirectionalLight>,
    pub spots: LightBuffer<SpotLight>,
}

impl LightSet {
    /// Builds the demo lighting rig for the given counts.
    pub fn demo(counts: &LightCounts) -> Self {
        let points = (0..counts.get(LightKind::Point))
            .map(|index| PointLight {
                position: [1.0, 2.0, 0.0],
                padding: 0,
                color: point_light_color(index),
                intensity: 1.0,
            })
            .collect();
        let directionals = (0..counts.get(LightKind::Directional))
            .map(|_| DirectionalLight {
                direction: [3.0, 3.0, 0.0],
                padding: 0,
                color: [0.9, 0.9, 0.9],
                intensity: 0.5,
            })
            .collect();
        let spots = (0..counts.get(LightKind::Spot))
            .map(|_| SpotLight {
                position: [0.8, 3.0, 0.0],
                angle: 45.0,
                direction: [0.0, -1.0, 0.0],
                penumbra_angle: 0.5,
                color: [0.9, 0.9, 0.9],
                intensity: 1.0,
            })
            .collect();
        Self {
            points: LightBuffer::new(points),
            directionals: LightBuffer::new(directionals),
            spots: LightBuffer::new(spots),
        }
    }

    pub fn count(&self, kind: LightKind) -> usize {
        match kind {
            LightKind::Point => self.points.len(),
            LightKind::Directional => self.directionals.len(),
            LightKind::Spot => self.spots.len(),
        }
    }

    /// Packed bytes for one kind, ready for upload.
    pub fn pack(&self, kind: LightKind) -> Vec<u8> {
        self.pack_first(kind, self.count(kind))
    }

    /// Packed bytes for one kind with at most `limit` records.
    pub fn pack_first(&self, kind: LightKind, limit: usize) -> Vec<u8> {
        match kind {
            LightKind::Point => self.points.pack_first(limit),
            LightKind::Directional => self.directionals.pack_first(limit),
            LightKind::Spot => self.spots.pack_first(limit),
        }
    }
}

/// Deterministic per-index color cycling for point lights.
pub fn point_light_color(index: u32) -> [f32; 3] {
    let i = index as f32;
    [
        (i * 2.0).cos().abs(),
        1.0 - i.sin().abs(),
        1.0 - i.cos().abs(),
    ]
}
