/// ASCII rasterizer implementing the cone's `GpuContext` in software
use cone_core::gpu::{FRAGMENT_ENTRY_POINT, VERTEX_ENTRY_POINT};
use cone_core::{
    ColorSource, ConeMesh, GpuContext, GpuError, Index, ProgramHandle, ShaderBuildError,
    ShaderSource, ShaderStage, Vertex,
};
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use log::debug;
use nalgebra::{Matrix4, Vector4};
use std::io::Write;
use std::ops::Range;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// One rasterized terminal cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub character: char,
    pub color: [f32; 4],
}

impl Cell {
    const BLANK: Cell = Cell {
        character: ' ',
        color: [0.0, 0.0, 0.0, 1.0],
    };
}

/// A vertex after projection to cell coordinates
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
    color: [f32; 4],
}

/// Software pipeline drawing the cone into a grid of colored characters.
///
/// Programs are not compiled; `build_program` only checks that each stage
/// declares the entry point the fixed software pipeline stands in for.
pub struct AsciiRenderer<W: Write> {
    output: W,
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
    clear_color: [f32; 4],
    vertices: Vec<Vertex>,
    indices: Vec<Index>,
    projection: Matrix4<f32>,
    model_view: Matrix4<f32>,
    programs: u64,
}

impl<W: Write> AsciiRenderer<W> {
    pub fn new(output: W) -> Self {
        Self {
            output,
            width: 0,
            height: 0,
            depth_buffer: Vec::new(),
            cells: Vec::new(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            vertices: Vec::new(),
            indices: Vec::new(),
            projection: Matrix4::identity(),
            model_view: Matrix4::identity(),
            programs: 0,
        }
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.depth_buffer.iter_mut().for_each(|depth| *depth = f32::INFINITY);
        self.cells.iter_mut().for_each(|cell| *cell = Cell::BLANK);
    }

    fn project(&self, vertex: &Vertex, color: ColorSource) -> Option<ScreenVertex> {
        let [x, y, z] = vertex.position;
        let clip = self.projection * self.model_view * Vector4::new(x, y, z, 1.0);

        // Prevent division by near-zero depth values
        if clip.w.abs() < 1e-6 {
            return None;
        }

        let ndc = clip.xyz() / clip.w;
        if ndc.z < -1.0 || ndc.z > 1.0 {
            return None;
        }

        Some(ScreenVertex {
            x: (ndc.x + 1.0) * 0.5 * self.width as f32,
            y: (1.0 - ndc.y) * 0.5 * self.height as f32,
            depth: ndc.z,
            color: match color {
                ColorSource::PerVertex => vertex.color,
                ColorSource::Constant(color) => color,
            },
        })
    }

    fn rasterize_triangle(&mut self, v: [ScreenVertex; 3], source: ColorSource) {
        let [v0, v1, v2] = v;

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                let Some((w0, w1, w2)) = barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), p)
                else {
                    return;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    // Constant colors are flat; interpolating them drifts below 1.0
                    let color = match source {
                        ColorSource::Constant(color) => color,
                        ColorSource::PerVertex => {
                            let mut color = [0.0; 4];
                            for (c, channel) in color.iter_mut().enumerate() {
                                *channel = w0 * v0.color[c] + w1 * v1.color[c] + w2 * v2.color[c];
                            }
                            color
                        }
                    };
                    self.depth_buffer[idx] = depth;
                    self.cells[idx] = Cell {
                        character: shade(&color),
                        color,
                    };
                }
            }
        }
    }

    /// Write the cell grid to the output, one terminal row per grid row
    pub fn present(&mut self) -> std::io::Result<()> {
        let background = to_terminal_color(&self.clear_color);
        for y in 0..self.height {
            self.output.queue(cursor::MoveTo(0, y as u16))?;
            for x in 0..self.width {
                let cell = self.cells[y * self.width + x];
                let (character, color) = if cell == Cell::BLANK {
                    ('.', background)
                } else {
                    (cell.character, to_terminal_color(&cell.color))
                };
                self.output.queue(SetForegroundColor(color))?;
                self.output.queue(Print(character))?;
            }
        }
        self.output.queue(ResetColor)?;
        self.output.flush()
    }
}

impl<W: Write> GpuContext for AsciiRenderer<W> {
    fn build_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramHandle, ShaderBuildError> {
        if !source.vertex.contains(VERTEX_ENTRY_POINT) {
            return Err(ShaderBuildError::new(
                ShaderStage::Vertex,
                format!("entry point `{}` not found", VERTEX_ENTRY_POINT),
            ));
        }
        if !source.fragment.contains(FRAGMENT_ENTRY_POINT) {
            return Err(ShaderBuildError::new(
                ShaderStage::Fragment,
                format!("entry point `{}` not found", FRAGMENT_ENTRY_POINT),
            ));
        }
        self.programs += 1;
        debug!("software program '{}' ready", source.label);
        Ok(ProgramHandle(self.programs))
    }

    fn configure_viewport(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        self.width = width as usize;
        self.height = height as usize;
        let size = self.width * self.height;
        self.depth_buffer = vec![f32::INFINITY; size];
        self.cells = vec![Cell::BLANK; size];
        Ok(())
    }

    fn upload_mesh(&mut self, mesh: &ConeMesh) -> Result<(), GpuError> {
        self.vertices = mesh.vertices.clone();
        self.indices = mesh.indices.clone();
        Ok(())
    }

    fn set_projection(&mut self, _program: ProgramHandle, projection: &Matrix4<f32>) {
        self.projection = *projection;
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        self.clear_color = clear_color;
        self.clear();
    }

    fn set_model_view(&mut self, _program: ProgramHandle, model_view: &Matrix4<f32>) {
        self.model_view = *model_view;
    }

    fn draw_indexed(&mut self, _program: ProgramHandle, indices: Range<u32>, color: ColorSource) {
        let end = (indices.end as usize).min(self.indices.len());
        let start = (indices.start as usize).min(end);

        for t in (start..end).step_by(3) {
            let Some(triangle) = self.indices.get(t..t + 3) else {
                break;
            };

            let mut projected = [None; 3];
            for (slot, &index) in projected.iter_mut().zip(triangle) {
                *slot = self
                    .vertices
                    .get(index as usize)
                    .and_then(|vertex| self.project(vertex, color));
            }

            // Triangle is clipped if any vertex falls outside the depth range
            if let [Some(a), Some(b), Some(c)] = projected {
                self.rasterize_triangle([a, b, c], color);
            }
        }
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        if self.vertices.is_empty() {
            return Err(GpuError::MeshNotUploaded);
        }
        self.present()
            .map_err(|e| GpuError::PresentFailed(e.to_string()))
    }
}

/// Map a color's luminance onto the character ramp
fn shade(color: &[f32; 4]) -> char {
    let luminance = 0.299 * color[0] + 0.587 * color[1] + 0.114 * color[2];
    let char_index = (luminance.clamp(0.0, 1.0) * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
    // Never shade a covered cell as blank
    LUMINOSITY_RAMP[char_index.clamp(1, LUMINOSITY_RAMP.len() - 1)]
}

fn to_terminal_color(color: &[f32; 4]) -> Color {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::Rgb {
        r: channel(color[0]),
        g: channel(color[1]),
        b: channel(color[2]),
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cone_core::{ConeRenderer, EngineConfig, RenderingEngine};

    fn engine() -> ConeRenderer<AsciiRenderer<Vec<u8>>> {
        let mut engine = ConeRenderer::new(AsciiRenderer::new(Vec::new()), EngineConfig::default()).unwrap();
        engine.initialize(64, 48).unwrap();
        engine
    }

    #[test]
    fn test_render_covers_center() {
        let mut engine = engine();
        engine.render().unwrap();

        let renderer = engine.context();
        let center = renderer.cell(32, 24).unwrap();
        assert_ne!(center, Cell::BLANK);
        assert!(renderer.cell(0, 0).map_or(false, |cell| cell == Cell::BLANK));
        assert!(renderer.cell(64, 0).is_none());
    }

    #[test]
    fn test_present_writes_output() {
        let mut engine = engine();
        engine.render().unwrap();
        assert!(!engine.context_mut().output_mut().is_empty());
    }

    #[test]
    fn test_disk_is_white() {
        let mut renderer = AsciiRenderer::new(Vec::new());
        let mesh = ConeMesh::generate(&Default::default()).unwrap();
        renderer.configure_viewport(40, 40).unwrap();
        renderer.upload_mesh(&mesh).unwrap();
        renderer.set_projection(
            ProgramHandle(1),
            &EngineConfig::default().frustum.projection_matrix(),
        );
        renderer.begin_frame([0.5, 0.5, 0.5, 1.0]);

        // Tip the base towards the camera so the disk is not seen edge-on
        let tilt = Matrix4::new_rotation(nalgebra::Vector3::new(std::f32::consts::FRAC_PI_2, 0.0, 0.0));
        let model_view = cone_core::Transform::translation_matrix(0.0, 0.0, -7.0) * tilt;
        renderer.set_model_view(ProgramHandle(1), &model_view);
        renderer.draw_indexed(ProgramHandle(1), mesh.disk_range(), ColorSource::Constant([1.0; 4]));

        let covered: Vec<Cell> = (0..40)
            .flat_map(|y| (0..40).map(move |x| (x, y)))
            .filter_map(|(x, y)| renderer.cell(x, y))
            .filter(|cell| *cell != Cell::BLANK)
            .collect();
        assert!(!covered.is_empty());
        assert!(covered.iter().all(|cell| cell.character == '@'));
        assert!(covered.iter().all(|cell| cell.color == [1.0; 4]));
    }

    #[test]
    fn test_missing_entry_point_is_a_vertex_error() {
        let mut renderer = AsciiRenderer::new(Vec::new());
        let source = ShaderSource {
            label: "broken",
            vertex: "fn main() {}",
            fragment: ShaderSource::simple().fragment,
        };
        let error = renderer.build_program(&source).unwrap_err();
        assert_eq!(error.stage, ShaderStage::Vertex);
    }

    #[test]
    fn test_end_frame_without_mesh_fails() {
        let mut renderer = AsciiRenderer::new(Vec::new());
        renderer.configure_viewport(4, 4).unwrap();
        assert_eq!(renderer.end_frame(), Err(GpuError::MeshNotUploaded));
    }

    #[test]
    fn test_barycentric_degenerate() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
    }
}
