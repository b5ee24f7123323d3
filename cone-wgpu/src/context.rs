/// wgpu implementation of `GpuContext`
///
/// Draws are recorded between `begin_frame` and `end_frame` and replayed in a
/// single render pass on `end_frame`. The per-vertex color attribute is
/// "disabled" for constant-color draws by switching to a pipeline whose slot 0
/// layout only carries positions and whose color comes from a one-element
/// instance-stepped buffer in slot 1.

use bytemuck::{Pod, Zeroable};
use cone_core::gpu::{FRAGMENT_ENTRY_POINT, VERTEX_ENTRY_POINT};
use cone_core::{
    ColorSource, ConeMesh, GpuContext, GpuError, ProgramHandle, ShaderBuildError, ShaderSource,
    ShaderStage, Vertex,
};
use log::{info, warn};
use nalgebra::Matrix4;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Size of one constant color in the per-frame color buffer
const COLOR_SIZE: wgpu::BufferAddress = std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress;

/// Remaps GL clip depth [-1, 1] to wgpu's [0, 1]
#[rustfmt::skip]
pub fn gl_to_wgpu_depth() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Failures while acquiring the device and surface
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("Surface is not supported by the adapter")]
    UnsupportedSurface,
}

/// Uniform block shared by both shader stages
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub projection: [[f32; 4]; 4],
    pub model_view: [[f32; 4]; 4],
}

impl Default for Uniforms {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        Self {
            projection: identity,
            model_view: identity,
        }
    }
}

const INTERLEAVED_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

const CONSTANT_COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![1 => Float32x4];

/// Position and color read from the interleaved vertex buffer
pub fn interleaved_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &INTERLEAVED_ATTRIBUTES,
    }
}

/// Same buffer as `interleaved_layout`, color attribute left out
pub fn position_only_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &POSITION_ATTRIBUTES,
    }
}

/// One color for the whole draw, stepped per instance
pub fn constant_color_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: COLOR_SIZE,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &CONSTANT_COLOR_ATTRIBUTES,
    }
}

struct Program {
    per_vertex: wgpu::RenderPipeline,
    constant: wgpu::RenderPipeline,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

#[derive(Debug, Clone)]
struct DrawCommand {
    program: ProgramHandle,
    indices: Range<u32>,
    color: ColorSource,
}

pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    depth_view: Option<wgpu::TextureView>,
    uniform_buffer: wgpu::Buffer,
    uniform_layout: wgpu::BindGroupLayout,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: Uniforms,
    programs: Vec<Program>,
    mesh: Option<GpuMesh>,
    clear_color: wgpu::Color,
    draws: Vec<DrawCommand>,
}

impl WgpuContext {
    pub async fn new(window: Arc<Window>) -> Result<Self, ContextError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ContextError::NoAdapter)?;
        info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Cone Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                },
                None,
            )
            .await?;

        let surface_config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or(ContextError::UnsupportedSurface)?;
        surface.configure(&device, &surface_config);

        let uniforms = Uniforms::default();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            depth_view: None,
            uniform_buffer,
            uniform_layout,
            uniform_bind_group,
            uniforms,
            programs: Vec::new(),
            mesh: None,
            clear_color: wgpu::Color::BLACK,
            draws: Vec::new(),
        })
    }

    fn compile(
        &self,
        stage: ShaderStage,
        label: &str,
        text: &str,
    ) -> Result<wgpu::ShaderModule, ShaderBuildError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(text.into()),
        });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(ShaderBuildError::new(stage, error.to_string())),
            None => Ok(module),
        }
    }

    fn create_pipeline(
        &self,
        label: &str,
        layout: &wgpu::PipelineLayout,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        buffers: &[wgpu::VertexBufferLayout<'_>],
    ) -> wgpu::RenderPipeline {
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: VERTEX_ENTRY_POINT,
                    buffers,
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: FRAGMENT_ENTRY_POINT,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
            })
    }

    fn create_depth_view(&self) -> wgpu::TextureView {
        let depth_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: self.surface_config.width,
                height: self.surface_config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        depth_texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn acquire_frame(&self) -> Result<wgpu::SurfaceTexture, GpuError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Reconfigure so the next frame can be acquired
                self.surface.configure(&self.device, &self.surface_config);
                Err(GpuError::SurfaceLost)
            }
            Err(e) => Err(GpuError::AcquireFrameFailed(e.to_string())),
        }
    }
}

impl GpuContext for WgpuContext {
    fn build_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramHandle, ShaderBuildError> {
        let vertex = self.compile(ShaderStage::Vertex, source.label, source.vertex)?;
        let fragment = self.compile(ShaderStage::Fragment, source.label, source.fragment)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(source.label),
                bind_group_layouts: &[&self.uniform_layout],
                push_constant_ranges: &[],
            });
        let per_vertex = self.create_pipeline(
            "Per-vertex Color Pipeline",
            &layout,
            &vertex,
            &fragment,
            &[interleaved_layout()],
        );
        let constant = self.create_pipeline(
            "Constant Color Pipeline",
            &layout,
            &vertex,
            &fragment,
            &[position_only_layout(), constant_color_layout()],
        );
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ShaderBuildError::new(ShaderStage::Link, error.to_string()));
        }

        self.programs.push(Program {
            per_vertex,
            constant,
        });
        info!("linked program '{}'", source.label);
        Ok(ProgramHandle(self.programs.len() as u64 - 1))
    }

    fn configure_viewport(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = Some(self.create_depth_view());
        Ok(())
    }

    fn upload_mesh(&mut self, mesh: &ConeMesh) -> Result<(), GpuError> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return Err(GpuError::BufferCreationFailed("empty mesh".to_string()));
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Cone Vertex Buffer"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Cone Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        self.mesh = Some(GpuMesh {
            vertex_buffer,
            index_buffer,
        });
        Ok(())
    }

    fn set_projection(&mut self, _program: ProgramHandle, projection: &Matrix4<f32>) {
        self.uniforms.projection = (gl_to_wgpu_depth() * projection).into();
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        let [r, g, b, a] = clear_color.map(f64::from);
        self.clear_color = wgpu::Color { r, g, b, a };
        self.draws.clear();
    }

    fn set_model_view(&mut self, _program: ProgramHandle, model_view: &Matrix4<f32>) {
        self.uniforms.model_view = (*model_view).into();
    }

    fn draw_indexed(&mut self, program: ProgramHandle, indices: Range<u32>, color: ColorSource) {
        self.draws.push(DrawCommand {
            program,
            indices,
            color,
        });
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        let mesh = self.mesh.as_ref().ok_or(GpuError::MeshNotUploaded)?;
        let depth_view = self
            .depth_view
            .as_ref()
            .ok_or_else(|| GpuError::AcquireFrameFailed("viewport not configured".to_string()))?;

        let frame = self.acquire_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniforms]));

        // One color slot per draw; per-vertex draws leave theirs unused
        let colors: Vec<[f32; 4]> = self
            .draws
            .iter()
            .map(|draw| match draw.color {
                ColorSource::Constant(color) => color,
                ColorSource::PerVertex => [0.0; 4],
            })
            .collect();
        let color_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Constant Color Buffer"),
                contents: bytemuck::cast_slice(&colors),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Cone Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Cone Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            for (slot, draw) in self.draws.iter().enumerate() {
                let Some(program) = self.programs.get(draw.program.0 as usize) else {
                    warn!("draw with unknown program {:?} skipped", draw.program);
                    continue;
                };
                match draw.color {
                    ColorSource::PerVertex => pass.set_pipeline(&program.per_vertex),
                    ColorSource::Constant(_) => {
                        let offset = slot as wgpu::BufferAddress * COLOR_SIZE;
                        pass.set_pipeline(&program.constant);
                        pass.set_vertex_buffer(1, color_buffer.slice(offset..offset + COLOR_SIZE));
                    }
                }
                pass.draw_indexed(draw.indices.clone(), 0, 0..1);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        self.draws.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cone_core::FrustumPlanes;
    use nalgebra::Point3;

    #[test]
    fn test_depth_remap() {
        let projection = gl_to_wgpu_depth() * FrustumPlanes::default().projection_matrix();
        let near = projection.transform_point(&Point3::new(0.0, 0.0, -5.0));
        let far = projection.transform_point(&Point3::new(0.0, 0.0, -10.0));
        assert!(near.z.abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_layouts_share_interleaved_stride() {
        assert_eq!(interleaved_layout().array_stride, 28);
        assert_eq!(position_only_layout().array_stride, 28);
        assert_eq!(interleaved_layout().attributes[1].offset, 12);
        assert_eq!(constant_color_layout().step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(constant_color_layout().attributes[0].shader_location, 1);
    }

    #[test]
    fn test_uniforms_are_column_major() {
        let translation: [[f32; 4]; 4] = cone_core::Transform::translation_matrix(1.0, 2.0, 3.0).into();
        assert_eq!(translation[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(std::mem::size_of::<Uniforms>(), 128);
    }
}
