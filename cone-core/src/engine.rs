/// The rendering engine hosts talk to
///
/// Hosts call `initialize` once, then `update_animation` and `render` every
/// frame, forwarding orientation and touch events in between. All calls are
/// expected on the thread that owns the `GpuContext`.

use log::info;
use nalgebra::{Matrix4, Point2, UnitQuaternion};

use crate::animation::{DeviceOrientation, OrientationAnimation};
use crate::error::{EngineError, EngineResult};
use crate::geometry::{ConeMesh, ConeParams};
use crate::gesture::{GestureMapper, InteractionState};
use crate::gpu::{ColorSource, GpuContext, ProgramHandle, ShaderSource};
use crate::projection::FrustumPlanes;
use crate::transform::Transform;

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Tunables for the cone demo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub cone: ConeParams,
    pub frustum: FrustumPlanes,
    /// Distance the object is pushed down -Z in front of the camera
    pub camera_distance: f32,
    /// Seconds an orientation change takes to settle
    pub animation_duration: f32,
    /// Scale applied while a finger is down
    pub pressed_scale: f32,
    pub clear_color: [f32; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cone: ConeParams::default(),
            frustum: FrustumPlanes::default(),
            camera_distance: 7.0,
            animation_duration: 0.25,
            pressed_scale: 1.5,
            clear_color: [0.5, 0.5, 0.5, 1.0],
        }
    }
}

impl EngineConfig {
    /// Reject settings that would poison the transforms or the animation clock
    pub fn validate(&self) -> EngineResult<()> {
        self.cone.validate()?;
        let positive = [
            ("camera distance", self.camera_distance),
            ("animation duration", self.animation_duration),
            ("pressed scale", self.pressed_scale),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.clear_color.iter().any(|c| !c.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "clear color must be finite, got {:?}",
                self.clear_color
            )));
        }
        Ok(())
    }
}

/// Operations a platform layer drives the renderer with
pub trait RenderingEngine {
    fn initialize(&mut self, width: u32, height: u32) -> EngineResult<()>;
    fn render(&mut self) -> EngineResult<()>;
    fn update_animation(&mut self, time_step: f32);
    fn on_rotate(&mut self, orientation: DeviceOrientation);
    fn on_finger_up(&mut self, location: Point2<i32>);
    fn on_finger_down(&mut self, location: Point2<i32>);
    fn on_finger_move(&mut self, old_location: Point2<i32>, new_location: Point2<i32>);

    fn interaction(&self) -> &InteractionState;
    fn orientation(&self) -> UnitQuaternion<f32>;
}

/// Build the programmable-pipeline cone renderer over `context`
pub fn create_renderer<G>(context: G, config: EngineConfig) -> EngineResult<Box<dyn RenderingEngine>>
where
    G: GpuContext + 'static,
{
    Ok(Box::new(ConeRenderer::new(context, config)?))
}

/// State produced by `initialize`
#[derive(Debug, Clone)]
struct Prepared {
    program: ProgramHandle,
    mesh: ConeMesh,
}

pub struct ConeRenderer<G: GpuContext> {
    context: G,
    config: EngineConfig,
    gestures: GestureMapper,
    interaction: InteractionState,
    animation: OrientationAnimation,
    prepared: Option<Prepared>,
}

impl<G: GpuContext> ConeRenderer<G> {
    pub fn new(context: G, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            context,
            gestures: GestureMapper::new(config.pressed_scale),
            interaction: InteractionState::default(),
            animation: OrientationAnimation::new(config.animation_duration),
            prepared: None,
            config,
        })
    }

    pub fn context(&self) -> &G {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut G {
        &mut self.context
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn animation(&self) -> &OrientationAnimation {
        &self.animation
    }

    pub fn mesh(&self) -> Option<&ConeMesh> {
        self.prepared.as_ref().map(|prepared| &prepared.mesh)
    }

    pub fn model_view(&self) -> Matrix4<f32> {
        Transform::model_view(
            self.interaction.scale,
            self.interaction.rotation_angle,
            self.config.camera_distance,
        )
    }
}

impl<G: GpuContext> RenderingEngine for ConeRenderer<G> {
    fn initialize(&mut self, width: u32, height: u32) -> EngineResult<()> {
        let mesh = ConeMesh::generate(&self.config.cone)?;

        self.context.configure_viewport(width, height)?;
        self.context.upload_mesh(&mesh)?;

        // Re-initializing for a new viewport keeps the linked program
        let program = match &self.prepared {
            Some(prepared) => prepared.program,
            None => self.context.build_program(&ShaderSource::simple())?,
        };
        self.context
            .set_projection(program, &self.config.frustum.projection_matrix());

        info!(
            "initialized {}x{} viewport: {} vertices, {} + {} indices",
            width,
            height,
            mesh.vertex_count(),
            mesh.body_index_count,
            mesh.disk_index_count
        );

        // Only the pivot follows the viewport; angle and scale survive a resize
        self.interaction.pivot = Point2::new((width / 2) as i32, (height / 2) as i32);
        self.prepared = Some(Prepared { program, mesh });
        Ok(())
    }

    fn render(&mut self) -> EngineResult<()> {
        let model_view = self.model_view();
        let prepared = self.prepared.as_ref().ok_or(EngineError::NotInitialized)?;
        let program = prepared.program;

        self.context.begin_frame(self.config.clear_color);
        self.context.set_model_view(program, &model_view);
        self.context
            .draw_indexed(program, prepared.mesh.body_range(), ColorSource::PerVertex);
        self.context
            .draw_indexed(program, prepared.mesh.disk_range(), ColorSource::Constant(WHITE));
        self.context.end_frame()?;
        Ok(())
    }

    fn update_animation(&mut self, time_step: f32) {
        self.animation.advance(time_step);
    }

    fn on_rotate(&mut self, orientation: DeviceOrientation) {
        self.animation.begin_transition(&orientation.direction());
    }

    fn on_finger_up(&mut self, location: Point2<i32>) {
        self.gestures.on_finger_up(&mut self.interaction, location);
    }

    fn on_finger_down(&mut self, location: Point2<i32>) {
        self.gestures.on_finger_down(&mut self.interaction, location);
    }

    fn on_finger_move(&mut self, old_location: Point2<i32>, new_location: Point2<i32>) {
        self.gestures
            .on_finger_move(&mut self.interaction, old_location, new_location);
    }

    fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    fn orientation(&self) -> UnitQuaternion<f32> {
        self.animation.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GpuError, ShaderBuildError, ShaderStage};
    use crate::quaternion;
    use nalgebra::Vector3;
    use std::ops::Range;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        BuildProgram,
        Viewport(u32, u32),
        UploadMesh(usize, usize),
        Projection,
        Begin([f32; 4]),
        ModelView(Matrix4<f32>),
        Draw(Range<u32>, ColorSource),
        End,
    }

    #[derive(Default)]
    struct RecordingContext {
        calls: Vec<Call>,
        fail_shader: bool,
    }

    impl GpuContext for RecordingContext {
        fn build_program(&mut self, _source: &ShaderSource<'_>) -> Result<ProgramHandle, ShaderBuildError> {
            self.calls.push(Call::BuildProgram);
            if self.fail_shader {
                return Err(ShaderBuildError::new(ShaderStage::Fragment, "syntax error"));
            }
            Ok(ProgramHandle(1))
        }

        fn configure_viewport(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
            self.calls.push(Call::Viewport(width, height));
            Ok(())
        }

        fn upload_mesh(&mut self, mesh: &ConeMesh) -> Result<(), GpuError> {
            self.calls
                .push(Call::UploadMesh(mesh.vertices.len(), mesh.indices.len()));
            Ok(())
        }

        fn set_projection(&mut self, _program: ProgramHandle, _projection: &Matrix4<f32>) {
            self.calls.push(Call::Projection);
        }

        fn begin_frame(&mut self, clear_color: [f32; 4]) {
            self.calls.push(Call::Begin(clear_color));
        }

        fn set_model_view(&mut self, _program: ProgramHandle, model_view: &Matrix4<f32>) {
            self.calls.push(Call::ModelView(*model_view));
        }

        fn draw_indexed(&mut self, _program: ProgramHandle, indices: Range<u32>, color: ColorSource) {
            self.calls.push(Call::Draw(indices, color));
        }

        fn end_frame(&mut self) -> Result<(), GpuError> {
            self.calls.push(Call::End);
            Ok(())
        }
    }

    fn renderer() -> ConeRenderer<RecordingContext> {
        let mut renderer = ConeRenderer::new(RecordingContext::default(), EngineConfig::default()).unwrap();
        renderer.initialize(320, 480).unwrap();
        renderer
    }

    #[test]
    fn test_initialize_sets_pivot_and_uploads_mesh() {
        let renderer = renderer();
        assert_eq!(renderer.interaction().pivot, Point2::new(160, 240));
        assert_eq!(
            renderer.context().calls,
            vec![
                Call::Viewport(320, 480),
                Call::UploadMesh(81, 240),
                Call::BuildProgram,
                Call::Projection,
            ]
        );
    }

    #[test]
    fn test_render_issues_two_draws() {
        let mut renderer = renderer();
        renderer.context_mut().calls.clear();
        renderer.render().unwrap();

        let calls = &renderer.context().calls;
        assert_eq!(calls.first(), Some(&Call::Begin([0.5, 0.5, 0.5, 1.0])));
        assert_eq!(
            &calls[2..],
            &[
                Call::Draw(0..120, ColorSource::PerVertex),
                Call::Draw(120..240, ColorSource::Constant(WHITE)),
                Call::End,
            ]
        );
    }

    #[test]
    fn test_render_uses_interaction_state() {
        let mut renderer = renderer();
        renderer.on_finger_down(Point2::new(260, 240));
        renderer.context_mut().calls.clear();
        renderer.render().unwrap();

        let expected = Transform::model_view(1.5, -90.0, 7.0);
        match &renderer.context().calls[1] {
            Call::ModelView(model_view) => assert!((model_view - expected).norm() < 1e-5),
            other => panic!("expected model view upload, got {:?}", other),
        }
    }

    #[test]
    fn test_reinitialize_keeps_program() {
        let mut renderer = renderer();
        renderer.context_mut().calls.clear();
        renderer.initialize(640, 960).unwrap();

        assert_eq!(renderer.interaction().pivot, Point2::new(320, 480));
        assert!(!renderer.context().calls.contains(&Call::BuildProgram));
        assert!(renderer.context().calls.contains(&Call::Projection));
    }

    #[test]
    fn test_render_before_initialize_fails() {
        let mut renderer = ConeRenderer::new(RecordingContext::default(), EngineConfig::default()).unwrap();
        assert!(matches!(renderer.render(), Err(EngineError::NotInitialized)));
        assert!(renderer.context().calls.is_empty());
    }

    #[test]
    fn test_shader_failure_is_reported() {
        let context = RecordingContext {
            fail_shader: true,
            ..RecordingContext::default()
        };
        let mut renderer = ConeRenderer::new(context, EngineConfig::default()).unwrap();
        match renderer.initialize(320, 480) {
            Err(EngineError::Shader(error)) => {
                assert_eq!(error.stage, ShaderStage::Fragment);
                assert_eq!(error.log, "syntax error");
            }
            other => panic!("expected shader error, got {:?}", other),
        }
        assert!(renderer.mesh().is_none());
    }

    #[test]
    fn test_invalid_cone_is_rejected() {
        let mut config = EngineConfig::default();
        config.cone.slices = 2;
        assert!(matches!(
            ConeRenderer::new(RecordingContext::default(), config),
            Err(EngineError::Mesh(_))
        ));
    }

    #[test]
    fn test_landscape_left_settles_after_duration() {
        let mut renderer = renderer();
        renderer.on_rotate(DeviceOrientation::LandscapeLeft);

        let expected = quaternion::from_vectors(&Vector3::new(0.0, 1.0, 0.0), &Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(renderer.animation().end(), expected);

        renderer.update_animation(0.25);
        assert_eq!(renderer.orientation(), expected);
        assert!(renderer.animation().is_at_rest());
    }

    #[test]
    fn test_gesture_round_trip() {
        let mut renderer = renderer();
        renderer.on_finger_down(Point2::new(160, 140));
        assert_eq!(renderer.interaction().scale, 1.5);
        assert!(renderer.interaction().rotation_angle.abs() < 1e-6);

        renderer.on_finger_move(Point2::new(160, 140), Point2::new(160, 240));
        assert!(renderer.interaction().rotation_angle.abs() < 1e-6);

        renderer.on_finger_up(Point2::new(160, 240));
        assert_eq!(renderer.interaction().scale, 1.0);
    }

    #[test]
    fn test_factory_returns_working_engine() {
        let mut engine = create_renderer(RecordingContext::default(), EngineConfig::default()).unwrap();
        engine.initialize(100, 100).unwrap();
        engine.render().unwrap();
        assert_eq!(engine.interaction().pivot, Point2::new(50, 50));
    }

    #[test]
    fn test_resize_keeps_angle_and_scale() {
        let mut renderer = renderer();
        renderer.on_finger_down(Point2::new(260, 240));
        let angle = renderer.interaction().rotation_angle;
        assert!((angle + 90.0).abs() < 1e-4);

        renderer.initialize(330, 480).unwrap();
        assert_eq!(renderer.interaction().pivot, Point2::new(165, 240));
        assert_eq!(renderer.interaction().rotation_angle, angle);
        assert_eq!(renderer.interaction().scale, 1.5);
    }

    #[test]
    fn test_non_finite_tunables_are_rejected() {
        let broken = [
            EngineConfig {
                animation_duration: f32::NAN,
                ..EngineConfig::default()
            },
            EngineConfig {
                animation_duration: 0.0,
                ..EngineConfig::default()
            },
            EngineConfig {
                pressed_scale: f32::INFINITY,
                ..EngineConfig::default()
            },
            EngineConfig {
                camera_distance: -7.0,
                ..EngineConfig::default()
            },
        ];
        for config in broken {
            assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
            assert!(matches!(
                ConeRenderer::new(RecordingContext::default(), config),
                Err(EngineError::InvalidConfig(_))
            ));
            assert!(create_renderer(RecordingContext::default(), config).is_err());
        }
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_boxed_context_drives_renderer() {
        let context: Box<RecordingContext> = Box::default();
        let mut renderer = ConeRenderer::new(context, EngineConfig::default()).unwrap();
        renderer.initialize(100, 100).unwrap();
        renderer.render().unwrap();
        assert_eq!(renderer.context().calls.last(), Some(&Call::End));
        assert_eq!(renderer.context().calls.len(), 9);
    }
}
