/// Procedural cone geometry
use bytemuck::{Pod, Zeroable};
use log::debug;
use nalgebra::Point3;
use std::f32::consts::TAU;
use std::ops::Range;

use crate::error::MeshError;

/// Index element type of the cone's index buffer
pub type Index = u16;

/// Largest slice count whose indices fit in `Index`
pub const MAX_SLICES: u32 = (Index::MAX as u32 - 1) / 2;

/// Smallest slice count that still closes a solid
pub const MIN_SLICES: u32 = 3;

/// A vertex with position and RGBA color, laid out for interleaved upload
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    pub fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }

    pub fn point(&self) -> Point3<f32> {
        Point3::from(self.position)
    }
}

/// Shape of the generated cone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeParams {
    pub radius: f32,
    pub height: f32,
    /// y coordinate of the base disk; the apex sits `height` above it
    pub base_y: f32,
    pub slices: u32,
}

impl Default for ConeParams {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 1.866,
            base_y: 1.0 - 1.866,
            slices: 40,
        }
    }
}

impl ConeParams {
    pub fn validate(&self) -> Result<(), MeshError> {
        if !(MIN_SLICES..=MAX_SLICES).contains(&self.slices) {
            return Err(MeshError::InvalidMeshParameters(format!(
                "slice count {} outside {}..={}",
                self.slices, MIN_SLICES, MAX_SLICES
            )));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(MeshError::InvalidMeshParameters(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(MeshError::InvalidMeshParameters(format!(
                "height must be positive, got {}",
                self.height
            )));
        }
        if !self.base_y.is_finite() {
            return Err(MeshError::InvalidMeshParameters(format!(
                "base y must be finite, got {}",
                self.base_y
            )));
        }
        Ok(())
    }
}

/// Vertex and index buffers for a cone: a body fan followed by a base disk fan
#[derive(Debug, Clone)]
pub struct ConeMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<Index>,
    pub body_index_count: u32,
    pub disk_index_count: u32,
}

impl ConeMesh {
    pub fn generate(params: &ConeParams) -> Result<Self, MeshError> {
        params.validate()?;

        let slices = params.slices as usize;
        let rim_count = 2 * slices;
        let apex = [0.0, params.base_y + params.height, 0.0];
        let dtheta = TAU / slices as f32;

        let mut vertices = vec![Vertex::zeroed(); rim_count + 1];
        for i in 0..slices {
            let theta = i as f32 * dtheta;
            let (sin, cos) = theta.sin_cos();
            let color = [sin.abs(), cos.abs(), sin.abs(), 1.0];

            vertices[2 * i] = Vertex::new(apex, color);
            vertices[2 * i + 1] = Vertex::new(
                [params.radius * cos, params.base_y, params.radius * sin],
                color,
            );
        }

        let disk_center = rim_count;
        vertices[disk_center] = Vertex::new([0.0, params.base_y, 0.0], [1.0, 1.0, 1.0, 1.0]);

        let mut indices = vec![0 as Index; 6 * slices];

        // Body: apex, its rim vertex, and the next slice's rim vertex
        for (slot, i) in (0..rim_count).step_by(2).enumerate() {
            let base = 3 * slot;
            indices[base] = i as Index;
            indices[base + 1] = ((i + 1) % rim_count) as Index;
            indices[base + 2] = ((i + 3) % rim_count) as Index;
        }

        // Disk: fan around the centre over consecutive rim vertices
        let disk_offset = 3 * slices;
        for (slot, i) in (1..rim_count + 1).step_by(2).enumerate() {
            let base = disk_offset + 3 * slot;
            indices[base] = disk_center as Index;
            indices[base + 1] = i as Index;
            indices[base + 2] = ((i + 2) % rim_count) as Index;
        }

        debug!(
            "generated cone: {} slices, {} vertices, {} indices",
            slices,
            vertices.len(),
            indices.len()
        );

        Ok(Self {
            vertices,
            indices,
            body_index_count: (3 * slices) as u32,
            disk_index_count: (3 * slices) as u32,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Index range covering the lateral surface
    pub fn body_range(&self) -> Range<u32> {
        0..self.body_index_count
    }

    /// Index range covering the base disk
    pub fn disk_range(&self) -> Range<u32> {
        self.body_index_count..self.body_index_count + self.disk_index_count
    }
}
