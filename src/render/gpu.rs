use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat3;
use log::{debug, warn};
use wgpu::util::DeviceExt;

use super::Renderer;
use crate::camera::PerspectiveCamera;
use crate::config::RendererOptions;
use crate::error::RenderError;
use crate::geometry::{MeshData, VERTEX_STRIDE};
use crate::scene::{Geometry, GeometryId, Material, MaterialId, MaterialKind, SceneGraph};

/// Platform object the renderer presents into (a window or a canvas).
pub trait OutputSurface {
    /// Called after the swap chain has been reconfigured to the new size.
    fn resize_output(&self, _width: u32, _height: u32) {}
}

/// wgpu renderer for the hero scene.
pub struct GpuRenderer<S> {
    output: S,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    options: RendererOptions,
    sample_count: u32,
    targets: FrameTargets,
    object_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    shader: wgpu::ShaderModule,
    pipelines: HashMap<MaterialId, wgpu::RenderPipeline>,
    mesh_cache: HashMap<GeometryId, MeshBuffers>,
    disposed: bool,
}

impl<S: OutputSurface> GpuRenderer<S> {
    /// Creates a renderer presenting into `target`, which must refer to the
    /// same platform object as `output`.
    pub async fn new(
        output: S,
        target: wgpu::SurfaceTarget<'static>,
        width: u32,
        height: u32,
        options: RendererOptions,
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::CreateSurface("output has zero area".into()));
        }

        let backends = if cfg!(target_arch = "wasm32") {
            wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL
        } else {
            wgpu::Backends::PRIMARY
        };
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface = instance
            .create_surface(target)
            .map_err(|err| RenderError::CreateSurface(err.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| RenderError::Adapter(err.to_string()))?;

        let required_limits = if cfg!(target_arch = "wasm32") {
            wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
        } else {
            wgpu::Limits::default()
        };
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("hero-device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                experimental_features: Default::default(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: Default::default(),
            })
            .await
            .map_err(|err| RenderError::Device(err.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::CreateSurface("surface reports no formats".into()))?;
        let alpha_mode = pick_alpha_mode(&caps.alpha_modes, options.alpha);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let wanted_samples = options.sample_count();
        let sample_count = if adapter
            .get_texture_format_features(format)
            .flags
            .sample_count_supported(wanted_samples)
        {
            wanted_samples
        } else {
            warn!("{wanted_samples}x multisampling unsupported for {format:?}; rendering aliased");
            1
        };
        let targets = FrameTargets::create(&device, &config, sample_count);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("normal-material-shader"),
            source: wgpu::ShaderSource::Wgsl(NORMAL_SHADER.into()),
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bind-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ObjectUniform>() as u64
                    ),
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("hero-pipeline-layout"),
            bind_group_layouts: &[&object_layout],
            push_constant_ranges: &[],
        });

        debug!("gpu renderer ready: {width}x{height}, {format:?}, {sample_count}x msaa, {alpha_mode:?}");

        Ok(Self {
            output,
            surface,
            device,
            queue,
            config,
            options,
            sample_count,
            targets,
            object_layout,
            pipeline_layout,
            shader,
            pipelines: HashMap::new(),
            mesh_cache: HashMap::new(),
            disposed: false,
        })
    }

    fn ensure_geometry(&mut self, geometry: &Arc<Geometry>) {
        self.mesh_cache
            .entry(geometry.id())
            .or_insert_with(|| MeshBuffers::upload(&self.device, geometry.data()));
    }

    fn ensure_pipeline(&mut self, material: &Material) {
        if self.pipelines.contains_key(&material.id()) {
            return;
        }
        let pipeline = match material.kind {
            MaterialKind::Normal => self.build_normal_pipeline(),
        };
        self.pipelines.insert(material.id(), pipeline);
    }

    fn build_normal_pipeline(&self) -> wgpu::RenderPipeline {
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("normal-material-pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: (VERTEX_STRIDE * std::mem::size_of::<f32>()) as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[
                            wgpu::VertexAttribute {
                                format: wgpu::VertexFormat::Float32x3,
                                offset: 0,
                                shader_location: 0,
                            },
                            wgpu::VertexAttribute {
                                format: wgpu::VertexFormat::Float32x3,
                                offset: (3 * std::mem::size_of::<f32>()) as u64,
                                shader_location: 1,
                            },
                        ],
                    }],
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: FrameTargets::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: self.sample_count,
                    ..Default::default()
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            })
    }

    fn clear_color(&self) -> wgpu::Color {
        if self.options.alpha {
            wgpu::Color::TRANSPARENT
        } else {
            wgpu::Color::BLACK
        }
    }
}

impl<S: OutputSurface> Renderer for GpuRenderer<S> {
    type Surface = S;

    fn output_surface(&self) -> &S {
        &self.output
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.disposed {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.targets.destroy();
        self.targets = FrameTargets::create(&self.device, &self.config, self.sample_count);
        self.output.resize_output(width, height);
    }

    fn render(
        &mut self,
        scene: &SceneGraph,
        camera: &PerspectiveCamera,
    ) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        for mesh in scene.meshes() {
            self.ensure_geometry(&mesh.geometry);
            self.ensure_pipeline(&mesh.material);
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(err) => return Err(RenderError::Surface(err.to_string())),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let view_matrix = camera.view();
        let projection = camera.projection();
        let bind_groups: Vec<wgpu::BindGroup> = scene
            .meshes()
            .iter()
            .map(|mesh| {
                let model_view = view_matrix * mesh.model_matrix();
                let normal = Mat3::from_mat4(model_view).inverse().transpose();
                let uniform = ObjectUniform {
                    model_view: model_view.to_cols_array_2d(),
                    projection: projection.to_cols_array_2d(),
                    normal: mat3_to_3x4(normal),
                };
                let buffer = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("object-uniform"),
                        contents: bytemuck::bytes_of(&uniform),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("object-bind-group"),
                    layout: &self.object_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            })
            .collect();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("hero-encoder"),
            });
        {
            let (color_view, resolve_target) = match self.targets.msaa.as_ref() {
                Some(msaa) => (&msaa.view, Some(&view)),
                None => (&view, None),
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hero-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (mesh, bind_group) in scene.meshes().iter().zip(bind_groups.iter()) {
                let (Some(pipeline), Some(buffers)) = (
                    self.pipelines.get(&mesh.material.id()),
                    self.mesh_cache.get(&mesh.geometry.id()),
                ) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.set_vertex_buffer(0, buffers.vertex.slice(..));
                pass.set_index_buffer(buffers.index.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..buffers.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn release_geometry(&mut self, geometry: GeometryId) {
        if let Some(buffers) = self.mesh_cache.remove(&geometry) {
            buffers.destroy();
        }
    }

    fn release_material(&mut self, material: MaterialId) {
        self.pipelines.remove(&material);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for (_, buffers) in self.mesh_cache.drain() {
            buffers.destroy();
        }
        self.pipelines.clear();
        self.targets.destroy();
        self.disposed = true;
        debug!("gpu renderer disposed");
    }
}

fn pick_alpha_mode(
    supported: &[wgpu::CompositeAlphaMode],
    transparent: bool,
) -> wgpu::CompositeAlphaMode {
    let preferred: &[wgpu::CompositeAlphaMode] = if transparent {
        &[
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
    } else {
        &[wgpu::CompositeAlphaMode::Opaque]
    };
    preferred
        .iter()
        .copied()
        .find(|mode| supported.contains(mode))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn upload(device: &wgpu::Device, mesh: &MeshData) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("hero-vertices"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("hero-indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }

    fn destroy(self) {
        self.vertex.destroy();
        self.index.destroy();
    }
}

struct RenderTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl RenderTexture {
    fn create(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Depth buffer plus the multisampled colour target when antialiasing.
struct FrameTargets {
    depth: RenderTexture,
    msaa: Option<RenderTexture>,
}

impl FrameTargets {
    const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration, samples: u32) -> Self {
        let depth = RenderTexture::create(
            device,
            "hero-depth",
            config.width,
            config.height,
            Self::DEPTH_FORMAT,
            samples,
        );
        let msaa = (samples > 1).then(|| {
            RenderTexture::create(
                device,
                "hero-msaa-color",
                config.width,
                config.height,
                config.format,
                samples,
            )
        });
        Self { depth, msaa }
    }

    fn destroy(&self) {
        self.depth.texture.destroy();
        if let Some(msaa) = &self.msaa {
            msaa.texture.destroy();
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ObjectUniform {
    model_view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
}

const NORMAL_SHADER: &str = r#"
struct ObjectUniform {
    model_view: mat4x4<f32>,
    projection: mat4x4<f32>,
    normal: mat3x4<f32>,
}

@group(0) @binding(0)
var<uniform> object: ObjectUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) view_normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = object.projection * object.model_view * vec4<f32>(input.position, 1.0);
    let normal_matrix = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    );
    out.view_normal = normalize(normal_matrix * input.normal);
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(input.view_normal);
    return vec4<f32>(normal * 0.5 + vec3<f32>(0.5), 1.0);
}
"#;
