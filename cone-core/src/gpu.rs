/// Backend abstraction the render pass draws through
///
/// A `GpuContext` owns every GPU object (program, buffers, render targets).
/// The engine only ever talks to it through this trait, so a windowed wgpu
/// device, a software rasterizer and a test recorder are interchangeable.

use nalgebra::Matrix4;
use std::ops::Range;

use crate::error::{GpuError, ShaderBuildError};
use crate::geometry::ConeMesh;

/// WGSL entry point expected in the vertex stage
pub const VERTEX_ENTRY_POINT: &str = "vs_main";
/// WGSL entry point expected in the fragment stage
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// Vertex and fragment stage source text for one program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
}

impl ShaderSource<'static> {
    /// Passes position through projection * modelview and forwards the color
    pub fn simple() -> Self {
        Self {
            label: "simple",
            vertex: include_str!("shaders/simple.vert.wgsl"),
            fragment: include_str!("shaders/simple.frag.wgsl"),
        }
    }
}

/// Opaque identifier of a linked program inside its context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Where a draw takes its vertex color from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorSource {
    /// The interleaved per-vertex color attribute
    PerVertex,
    /// Color attribute disabled; every vertex sees this value
    Constant([f32; 4]),
}

pub trait GpuContext {
    /// Compile both stages and link them. Diagnostics come back in the error.
    fn build_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramHandle, ShaderBuildError>;

    /// Create the render targets for a `width` x `height` viewport
    fn configure_viewport(&mut self, width: u32, height: u32) -> Result<(), GpuError>;

    /// Upload the interleaved vertex buffer and the index buffer
    fn upload_mesh(&mut self, mesh: &ConeMesh) -> Result<(), GpuError>;

    fn set_projection(&mut self, program: ProgramHandle, projection: &Matrix4<f32>);

    fn begin_frame(&mut self, clear_color: [f32; 4]);

    fn set_model_view(&mut self, program: ProgramHandle, model_view: &Matrix4<f32>);

    /// Indexed triangle list over `indices` of the uploaded index buffer
    fn draw_indexed(&mut self, program: ProgramHandle, indices: Range<u32>, color: ColorSource);

    fn end_frame(&mut self) -> Result<(), GpuError>;
}

impl<G: GpuContext + ?Sized> GpuContext for Box<G> {
    fn build_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramHandle, ShaderBuildError> {
        (**self).build_program(source)
    }

    fn configure_viewport(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        (**self).configure_viewport(width, height)
    }

    fn upload_mesh(&mut self, mesh: &ConeMesh) -> Result<(), GpuError> {
        (**self).upload_mesh(mesh)
    }

    fn set_projection(&mut self, program: ProgramHandle, projection: &Matrix4<f32>) {
        (**self).set_projection(program, projection)
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        (**self).begin_frame(clear_color)
    }

    fn set_model_view(&mut self, program: ProgramHandle, model_view: &Matrix4<f32>) {
        (**self).set_model_view(program, model_view)
    }

    fn draw_indexed(&mut self, program: ProgramHandle, indices: Range<u32>, color: ColorSource) {
        (**self).draw_indexed(program, indices, color)
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        (**self).end_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_shader_declares_entry_points() {
        let source = ShaderSource::simple();
        assert!(source.vertex.contains(VERTEX_ENTRY_POINT));
        assert!(source.fragment.contains(FRAGMENT_ENTRY_POINT));
    }
}
