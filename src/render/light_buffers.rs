use log::warn;

use crate::lights::{
    DirectionalLight, LightBuffer, LightKind, LightSet, PointLight, SpotLight, MAX_LIGHTS,
};

/// Capacity of the storage buffer for one light kind.
pub fn capacity(kind: LightKind) -> u64 {
    let records = MAX_LIGHTS as usize;
    let bytes = match kind {
        LightKind::Point => LightBuffer::<PointLight>::byte_len_for(records),
        LightKind::Directional => LightBuffer::<DirectionalLight>::byte_len_for(records),
        LightKind::Spot => LightBuffer::<SpotLight>::byte_len_for(records),
    };
    bytes as u64
}

/// The three light storage buffers and the bind group exposing them at
/// bindings 0, 1 and 2.
pub struct LightBuffers {
    buffers: [wgpu::Buffer; 3],
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

impl LightBuffers {
    pub fn create(device: &wgpu::Device) -> Self {
        let buffers = LightKind::ALL.map(|kind| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{}-lights", kind.label())),
                size: capacity(kind),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let entries = LightKind::ALL.map(|kind| wgpu::BindGroupLayoutEntry {
            binding: kind.binding(),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lights-bind-layout"),
            entries: &entries,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lights-bind-group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: LightKind::Point.binding(),
                    resource: buffers[0].as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: LightKind::Directional.binding(),
                    resource: buffers[1].as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: LightKind::Spot.binding(),
                    resource: buffers[2].as_entire_binding(),
                },
            ],
        });

        Self {
            buffers,
            layout,
            bind_group,
        }
    }

    /// Rewrites every storage buffer with the packed arrays of `lights`.
    pub fn upload(&self, queue: &wgpu::Queue, lights: &LightSet) {
        for kind in LightKind::ALL {
            let bytes = upload_bytes(lights, kind);
            queue.write_buffer(&self.buffers[kind.binding() as usize], 0, &bytes);
        }
    }
}

/// Packed bytes for one kind, cut down to the preallocated capacity.
fn upload_bytes(lights: &LightSet, kind: LightKind) -> Vec<u8> {
    let count = lights.count(kind);
    if count > MAX_LIGHTS as usize {
        warn!(
            "{} {} lights exceed the limit of {MAX_LIGHTS}; extra lights are dropped",
            count,
            kind.label()
        );
    }
    lights.pack_first(kind, MAX_LIGHTS as usize)
}
