/// Cone Core Library - Shared geometry, animation and interaction logic
///
/// This library provides the platform-independent core of the cone demo:
/// procedural mesh generation, quaternion orientation animation, touch
/// gesture mapping, and a render pass that draws through a `GpuContext`.

pub mod animation;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod gpu;
pub mod projection;
pub mod quaternion;
pub mod transform;

// Re-export commonly used types
pub use animation::{DeviceOrientation, OrientationAnimation};
pub use engine::{create_renderer, ConeRenderer, EngineConfig, RenderingEngine};
pub use error::{EngineError, EngineResult, GpuError, MeshError, OrientationError, ShaderBuildError, ShaderStage};
pub use geometry::{ConeMesh, ConeParams, Index, Vertex};
pub use gesture::{GestureMapper, InteractionState};
pub use gpu::{ColorSource, GpuContext, ProgramHandle, ShaderSource};
pub use projection::FrustumPlanes;
pub use transform::Transform;
