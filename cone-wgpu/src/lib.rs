/// Cone wgpu - windowed GPU backend for the cone engine
///
/// Provides a `GpuContext` over wgpu and the input plumbing that turns
/// winit mouse, touch and keyboard events into engine calls.

pub mod context;
pub mod input;

pub use context::{ContextError, WgpuContext};
pub use input::{FingerEvent, FingerTracker};
