use std::iter;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::bytes_of;
use glam::Mat4;
use log::{error, info, warn};
use wgpu::util::DeviceExt;
use winit::window::{Window, WindowId};

use crate::camera::CameraParams;
use crate::error::{GpuErrorKind, SetupError};
use crate::lights::{LightKind, LightSet};
use crate::render::frame_graph::{
    BlendMode, Clear, DebugTarget, Extent, FrameGraph, PassDesc, PassKind, Viewport, MAIN_EXTENT,
    SHADOW_EXTENT,
};
use crate::render::light_buffers::LightBuffers;
use crate::render::mesh::{quad_layout, vertex_layout, MeshBuffers, QuadBuffer};
use crate::render::overlay::{Overlay, OverlayFrame};
use crate::render::shaders::{self, ShaderId};
use crate::render::shared::{
    BlitParams, GeometryGlobals, LightingFrame, ObjectConstants, ShadowGlobals,
};
use crate::render::targets::{GBuffer, MaterialTextures, RenderTexture, ShadowMap};
use crate::scene::{Scene, ShadowCaster};

/// Executes the deferred frame graph with wgpu.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    extent: Extent,
    graph: FrameGraph,
    gbuffer: GBuffer,
    shadow_map: ShadowMap,
    _materials: MaterialTextures,
    meshes: Vec<MeshBuffers>,
    objects: Vec<ObjectDraw>,
    quad: QuadBuffer,
    shadow: ShadowPass,
    geometry: GeometryPass,
    lighting: LightingPasses,
    lights: LightBuffers,
    blit: BlitPass,
    specular_power: f32,
    light_view_proj: Mat4,
}

struct ObjectDraw {
    mesh: usize,
    _buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl Renderer {
    /// Creates every GPU resource the frame graph needs. Missing assets and
    /// shader or pipeline errors are fatal.
    pub async fn new(
        window: Arc<Window>,
        assets: &Path,
        scene: &Scene,
        lighting_order: &[LightKind; 3],
    ) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }
        let extent = Extent::new(size.width, size.height);
        if extent != MAIN_EXTENT {
            warn!(
                "window is {}x{}, rendering at that size instead of {}x{}",
                extent.width, extent.height, MAIN_EXTENT.width, MAIN_EXTENT.height
            );
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| SetupError::NoAdapter(err.to_string()))?;
        let adapter_info = adapter.get_info();
        info!(
            "using adapter {} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("deferred-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .context("failed to create GPU device")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no texture formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: extent.width,
            height: extent.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        info!("surface format {format:?}");

        let gbuffer_module = load_module(&device, assets, ShaderId::GBuffer)?;
        let shadow_module = load_module(&device, assets, ShaderId::ShadowMap)?;
        let blit_module = load_module(&device, assets, ShaderId::Blit)?;
        let light_modules = LightKind::ALL
            .iter()
            .map(|kind| load_module(&device, assets, ShaderId::Light(*kind)))
            .collect::<Result<Vec<_>, _>>()?;

        let gbuffer = GBuffer::create(&device, extent);
        let shadow_map = ShadowMap::create(&device, SHADOW_EXTENT);
        let materials = MaterialTextures::load(
            &device,
            &queue,
            &assets.join(&scene.material.diffuse),
            &assets.join(&scene.material.specular),
        )?;

        let object_layout = uniform_layout(
            &device,
            "object-bind-layout",
            wgpu::ShaderStages::VERTEX_FRAGMENT,
        );
        let (meshes, objects) = upload_scene(&device, scene, &object_layout);

        let shadow = ShadowPass::create(&device, &shadow_module, &object_layout, &scene.shadow)?;
        let geometry = GeometryPass::create(&device, &gbuffer_module, &object_layout, &materials)?;
        let lights = LightBuffers::create(&device);
        let lighting = LightingPasses::create(
            &device,
            &light_modules,
            &lights.layout,
            &gbuffer,
            &shadow_map,
            format,
        )?;
        let blit = BlitPass::create(
            &device,
            &blit_module,
            &gbuffer,
            &shadow_map,
            &scene.shadow,
            format,
        )?;
        let quad = QuadBuffer::create(&device);

        let graph = FrameGraph::deferred(extent, SHADOW_EXTENT, lighting_order);
        info!(
            "frame graph ready: {} passes, {} objects",
            graph.passes().len(),
            objects.len()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            extent,
            graph,
            gbuffer,
            shadow_map,
            _materials: materials,
            meshes,
            objects,
            quad,
            shadow,
            geometry,
            lighting,
            lights,
            blit,
            specular_power: scene.material.specular_power,
            light_view_proj: scene.shadow.view_proj(),
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Reconfigures the surface at its current size after it was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Records and presents one frame. GPU errors of every kind raised while
    /// recording are logged and do not fail the frame.
    pub fn render(
        &mut self,
        camera: &CameraParams,
        lights: &LightSet,
        overlay: &mut Overlay,
        ui: &OverlayFrame,
    ) -> Result<(), wgpu::SurfaceError> {
        for kind in GpuErrorKind::ALL {
            self.device.push_error_scope(kind.filter());
        }
        let result = self.draw_frame(camera, lights, overlay, ui);
        // Scopes pop innermost first.
        for _ in GpuErrorKind::ALL {
            if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
                error!("GPU {} error: {err}", GpuErrorKind::from(&err).name());
            }
        }
        result
    }

    fn draw_frame(
        &mut self,
        camera: &CameraParams,
        lights: &LightSet,
        overlay: &mut Overlay,
        ui: &OverlayFrame,
    ) -> Result<(), wgpu::SurfaceError> {
        self.queue.write_buffer(
            &self.geometry.globals,
            0,
            bytes_of(&GeometryGlobals::new(camera, self.specular_power)),
        );
        self.queue.write_buffer(
            &self.lighting.frame,
            0,
            bytes_of(&LightingFrame::new(
                camera,
                self.light_view_proj,
                self.extent,
            )),
        );
        self.blit.update_depth_range(&self.queue, camera.near, camera.far);
        self.lights.upload(&self.queue, lights);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        let size = [self.extent.width, self.extent.height];
        let ui_commands = overlay.prepare(&self.device, &self.queue, &mut encoder, ui, size);

        for pass in self.graph.passes() {
            match pass.kind {
                PassKind::Shadow => self.record_shadow(&mut encoder, pass),
                PassKind::Geometry => self.record_geometry(&mut encoder, pass),
                PassKind::Lighting(kind) => self.record_lighting(&mut encoder, pass, kind, &view),
                PassKind::DebugBlit(target) => self.record_blit(&mut encoder, pass, target, &view),
                PassKind::Overlay => {
                    let mut render_pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("overlay-pass"),
                            color_attachments: &[Some(color_attachment(&view, &pass.clear))],
                            depth_stencil_attachment: None,
                            timestamp_writes: None,
                            occlusion_query_set: None,
                        })
                        .forget_lifetime();
                    overlay.paint(&mut render_pass, ui, size);
                }
            }
        }

        self.queue
            .submit(ui_commands.into_iter().chain(iter::once(encoder.finish())));
        output.present();
        overlay.finish(ui);
        Ok(())
    }

    fn record_shadow(&self, encoder: &mut wgpu::CommandEncoder, pass: &PassDesc) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadow-pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(depth_attachment(
                &self.shadow_map.depth.view,
                &pass.clear,
            )),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        set_viewport(&mut render_pass, pass.viewport);
        render_pass.set_pipeline(&self.shadow.pipeline);
        render_pass.set_bind_group(0, &self.shadow.bind_group, &[]);
        self.draw_objects(&mut render_pass);
    }

    fn record_geometry(&self, encoder: &mut wgpu::CommandEncoder, pass: &PassDesc) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("geometry-pass"),
            color_attachments: &[
                Some(color_attachment(&self.gbuffer.color.view, &pass.clear)),
                Some(color_attachment(&self.gbuffer.normal.view, &pass.clear)),
            ],
            depth_stencil_attachment: Some(depth_attachment(
                &self.gbuffer.depth.view,
                &pass.clear,
            )),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        set_viewport(&mut render_pass, pass.viewport);
        render_pass.set_pipeline(&self.geometry.pipeline);
        render_pass.set_bind_group(0, &self.geometry.bind_group, &[]);
        self.draw_objects(&mut render_pass);
    }

    fn draw_objects(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        for object in &self.objects {
            let mesh = &self.meshes[object.mesh];
            render_pass.set_bind_group(1, &object.bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex.slice(..));
            render_pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }

    fn record_lighting(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pass: &PassDesc,
        kind: LightKind,
        view: &wgpu::TextureView,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&format!("{}-light-pass", kind.label())),
            color_attachments: &[Some(color_attachment(view, &pass.clear))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        set_viewport(&mut render_pass, pass.viewport);
        render_pass.set_pipeline(&self.lighting.pipelines[kind.binding() as usize]);
        render_pass.set_bind_group(0, &self.lighting.bind_group, &[]);
        render_pass.set_bind_group(1, &self.lights.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.quad.vertex.slice(..));
        render_pass.draw(0..QuadBuffer::VERTEX_COUNT, 0..1);
    }

    fn record_blit(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pass: &PassDesc,
        target: DebugTarget,
        view: &wgpu::TextureView,
    ) {
        let Some(quadrant) = self.blit.quadrant(target) else {
            return;
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("debug-blit-pass"),
            color_attachments: &[Some(color_attachment(view, &pass.clear))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        set_viewport(&mut render_pass, pass.viewport);
        render_pass.set_pipeline(&self.blit.pipeline);
        render_pass.set_bind_group(0, &quadrant.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.quad.vertex.slice(..));
        render_pass.draw(0..QuadBuffer::VERTEX_COUNT, 0..1);
    }
}

fn load_module(
    device: &wgpu::Device,
    assets: &Path,
    id: ShaderId,
) -> Result<wgpu::ShaderModule, SetupError> {
    let source = shaders::load(assets, id)?;
    let module = shaders::compile(device, &source)?;
    info!("compiled {}", source.path.display());
    Ok(module)
}

fn upload_scene(
    device: &wgpu::Device,
    scene: &Scene,
    object_layout: &wgpu::BindGroupLayout,
) -> (Vec<MeshBuffers>, Vec<ObjectDraw>) {
    let meshes: Vec<MeshBuffers> = scene
        .mesh_kinds()
        .into_iter()
        .map(|kind| MeshBuffers::from_mesh(device, kind, &kind.build()))
        .collect();
    let objects = scene
        .objects
        .iter()
        .filter_map(|object| {
            let mesh = meshes.iter().position(|buffers| buffers.kind == object.mesh)?;
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}-constants", object.name)),
                contents: bytes_of(&ObjectConstants::from_object(object)),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{}-bind-group", object.name)),
                layout: object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            Some(ObjectDraw {
                mesh,
                _buffer: buffer,
                bind_group,
            })
        })
        .collect();
    (meshes, objects)
}

/// Runs `build` inside a validation scope so pipeline errors surface as
/// [`SetupError::Pipeline`] instead of reaching the uncaptured handler.
fn checked<T>(
    device: &wgpu::Device,
    label: &str,
    build: impl FnOnce() -> T,
) -> Result<T, SetupError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(SetupError::Pipeline {
            label: label.to_string(),
            message: err.to_string(),
        }),
        None => Ok(value),
    }
}

fn color_attachment<'a>(
    view: &'a wgpu::TextureView,
    clear: &Clear,
) -> wgpu::RenderPassColorAttachment<'a> {
    let load = match clear.color {
        Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
        None => wgpu::LoadOp::Load,
    };
    wgpu::RenderPassColorAttachment {
        view,
        depth_slice: None,
        resolve_target: None,
        ops: wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        },
    }
}

fn depth_attachment<'a>(
    view: &'a wgpu::TextureView,
    clear: &Clear,
) -> wgpu::RenderPassDepthStencilAttachment<'a> {
    let load = match clear.depth {
        Some(depth) => wgpu::LoadOp::Clear(depth),
        None => wgpu::LoadOp::Load,
    };
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

fn set_viewport(render_pass: &mut wgpu::RenderPass<'_>, viewport: Viewport) {
    render_pass.set_viewport(
        viewport.x,
        viewport.y,
        viewport.width,
        viewport.height,
        0.0,
        1.0,
    );
}

fn uniform_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[uniform_entry(0, visibility)],
    })
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, kind: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(kind),
        count: None,
    }
}

const UNFILTERED: wgpu::TextureSampleType = wgpu::TextureSampleType::Float { filterable: false };

fn uniform_buffer<T: bytemuck::Pod>(device: &wgpu::Device, label: &str, value: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Fixed-function state shared by the pipelines built below.
struct PipelineSpec<'a> {
    label: &'a str,
    module: &'a wgpu::ShaderModule,
    layouts: &'a [&'a wgpu::BindGroupLayout],
    vertex: wgpu::VertexBufferLayout<'static>,
    targets: &'a [Option<wgpu::ColorTargetState>],
    depth: Option<wgpu::DepthStencilState>,
}

fn build_pipeline(
    device: &wgpu::Device,
    spec: PipelineSpec<'_>,
) -> Result<wgpu::RenderPipeline, SetupError> {
    checked(device, spec.label, || {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(spec.label),
            bind_group_layouts: spec.layouts,
            push_constant_ranges: &[],
        });
        let fragment = (!spec.targets.is_empty()).then(|| wgpu::FragmentState {
            module: spec.module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: spec.targets,
        });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(spec.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: spec.module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[spec.vertex.clone()],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: spec.depth,
            multisample: wgpu::MultisampleState::default(),
            fragment,
            multiview: None,
            cache: None,
        })
    })
}

fn depth_state(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: Default::default(),
        bias: Default::default(),
    }
}

fn surface_target(format: wgpu::TextureFormat, blend: BlendMode) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend: blend.to_wgpu(),
        write_mask: wgpu::ColorWrites::ALL,
    })
}

struct ShadowPass {
    pipeline: wgpu::RenderPipeline,
    _globals: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl ShadowPass {
    fn create(
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        object_layout: &wgpu::BindGroupLayout,
        caster: &ShadowCaster,
    ) -> Result<Self, SetupError> {
        let layout = uniform_layout(device, "shadow-bind-layout", wgpu::ShaderStages::VERTEX);
        let globals = uniform_buffer(
            device,
            "shadow-globals",
            &ShadowGlobals {
                light_view_proj: caster.view_proj().to_cols_array_2d(),
            },
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow-bind-group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.as_entire_binding(),
            }],
        });
        let pipeline = build_pipeline(
            device,
            PipelineSpec {
                label: "shadow-pipeline",
                module,
                layouts: &[&layout, object_layout],
                vertex: vertex_layout(),
                targets: &[],
                depth: Some(depth_state(ShadowMap::FORMAT)),
            },
        )?;
        Ok(Self {
            pipeline,
            _globals: globals,
            bind_group,
        })
    }
}

struct GeometryPass {
    pipeline: wgpu::RenderPipeline,
    globals: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GeometryPass {
    fn create(
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        object_layout: &wgpu::BindGroupLayout,
        materials: &MaterialTextures,
    ) -> Result<Self, SetupError> {
        let filterable = wgpu::TextureSampleType::Float { filterable: true };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("geometry-bind-layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                texture_entry(1, filterable),
                texture_entry(2, filterable),
                sampler_entry(3, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let globals = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("geometry-globals"),
            size: std::mem::size_of::<GeometryGlobals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("geometry-bind-group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&materials.diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&materials.specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        let targets = [
            Some(wgpu::ColorTargetState {
                format: GBuffer::COLOR_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
            Some(wgpu::ColorTargetState {
                format: GBuffer::NORMAL_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
        ];
        let pipeline = build_pipeline(
            device,
            PipelineSpec {
                label: "geometry-pipeline",
                module,
                layouts: &[&layout, object_layout],
                vertex: vertex_layout(),
                targets: &targets,
                depth: Some(depth_state(GBuffer::DEPTH_FORMAT)),
            },
        )?;
        Ok(Self {
            pipeline,
            globals,
            bind_group,
        })
    }
}

struct LightingPasses {
    /// Indexed by [`LightKind::binding`].
    pipelines: Vec<wgpu::RenderPipeline>,
    frame: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl LightingPasses {
    fn create(
        device: &wgpu::Device,
        modules: &[wgpu::ShaderModule],
        lights_layout: &wgpu::BindGroupLayout,
        gbuffer: &GBuffer,
        shadow_map: &ShadowMap,
        format: wgpu::TextureFormat,
    ) -> Result<Self, SetupError> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lighting-bind-layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, UNFILTERED),
                texture_entry(2, UNFILTERED),
                texture_entry(3, wgpu::TextureSampleType::Depth),
                texture_entry(4, wgpu::TextureSampleType::Depth),
                sampler_entry(5, wgpu::SamplerBindingType::Comparison),
            ],
        });
        let frame = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lighting-frame"),
            size: std::mem::size_of::<LightingFrame>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lighting-bind-group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.color.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.depth.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.depth.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        let targets = [surface_target(format, BlendMode::Additive)];
        let pipelines = LightKind::ALL
            .iter()
            .zip(modules)
            .map(|(kind, module)| {
                build_pipeline(
                    device,
                    PipelineSpec {
                        label: &format!("{}-light-pipeline", kind.label()),
                        module,
                        layouts: &[&layout, lights_layout],
                        vertex: quad_layout(),
                        targets: &targets,
                        depth: None,
                    },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            pipelines,
            frame,
            bind_group,
        })
    }
}

struct Quadrant {
    target: DebugTarget,
    params: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct BlitPass {
    pipeline: wgpu::RenderPipeline,
    quadrants: Vec<Quadrant>,
    _placeholders: [RenderTexture; 2],
}

impl BlitPass {
    fn create(
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        gbuffer: &GBuffer,
        shadow_map: &ShadowMap,
        caster: &ShadowCaster,
        format: wgpu::TextureFormat,
    ) -> Result<Self, SetupError> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit-bind-layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, UNFILTERED),
                texture_entry(2, wgpu::TextureSampleType::Depth),
            ],
        });
        // The unused slot of every quadrant still needs a view of the right kind.
        let one_pixel = Extent::new(1, 1);
        let color_placeholder = RenderTexture::create(
            device,
            "blit-color-placeholder",
            one_pixel,
            GBuffer::COLOR_FORMAT,
        );
        let depth_placeholder = RenderTexture::create(
            device,
            "blit-depth-placeholder",
            one_pixel,
            GBuffer::DEPTH_FORMAT,
        );

        let quadrants = DebugTarget::ALL
            .iter()
            .map(|&target| {
                let (params, color, depth) = match target {
                    DebugTarget::Color => {
                        (BlitParams::color(), &gbuffer.color.view, &depth_placeholder.view)
                    }
                    DebugTarget::Normal => {
                        (BlitParams::color(), &gbuffer.normal.view, &depth_placeholder.view)
                    }
                    DebugTarget::Depth => (
                        BlitParams::depth(0.1, 100.0),
                        &color_placeholder.view,
                        &gbuffer.depth.view,
                    ),
                    DebugTarget::Shadow => (
                        BlitParams::depth(caster.near, caster.far),
                        &color_placeholder.view,
                        &shadow_map.depth.view,
                    ),
                };
                let params = uniform_buffer(device, &format!("blit-{target:?}"), &params);
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("blit-{target:?}-bind-group")),
                    layout: &layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: params.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(color),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(depth),
                        },
                    ],
                });
                Quadrant {
                    target,
                    params,
                    bind_group,
                }
            })
            .collect();

        let targets = [surface_target(format, BlendMode::Replace)];
        let pipeline = build_pipeline(
            device,
            PipelineSpec {
                label: "blit-pipeline",
                module,
                layouts: &[&layout],
                vertex: quad_layout(),
                targets: &targets,
                depth: None,
            },
        )?;

        Ok(Self {
            pipeline,
            quadrants,
            _placeholders: [color_placeholder, depth_placeholder],
        })
    }

    fn quadrant(&self, target: DebugTarget) -> Option<&Quadrant> {
        self.quadrants
            .iter()
            .find(|quadrant| quadrant.target == target)
    }

    /// The camera depth quadrant follows the camera's clip planes.
    fn update_depth_range(&self, queue: &wgpu::Queue, near: f32, far: f32) {
        if let Some(quadrant) = self.quadrant(DebugTarget::Depth) {
            queue.write_buffer(&quadrant.params, 0, bytes_of(&BlitParams::depth(near, far)));
        }
    }
}
