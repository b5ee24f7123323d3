/// Error types shared by the cone core
use std::fmt;
use thiserror::Error;

/// Rejected cone parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("Invalid mesh parameters: {0}")]
    InvalidMeshParameters(String),
}

/// Platform orientation code outside the known table
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationError {
    #[error("Unrecognized device orientation code {0}")]
    Unrecognized(u32),
}

/// Pipeline stage a shader diagnostic belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Link,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Link => "link",
        };
        f.write_str(name)
    }
}

/// Compile or link failure, carrying the backend's diagnostic text
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to build {stage} shader: {log}")]
pub struct ShaderBuildError {
    pub stage: ShaderStage,
    pub log: String,
}

impl ShaderBuildError {
    pub fn new(stage: ShaderStage, log: impl Into<String>) -> Self {
        Self {
            stage,
            log: log.into(),
        }
    }
}

/// Failures reported by a `GpuContext` outside of shader building
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GpuError {
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to acquire frame: {0}")]
    AcquireFrameFailed(String),
    #[error("Failed to present: {0}")]
    PresentFailed(String),
    #[error("No mesh has been uploaded")]
    MeshNotUploaded,
    #[error("Surface lost")]
    SurfaceLost,
}

/// Umbrella error returned by `RenderingEngine`
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Shader(#[from] ShaderBuildError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
    #[error("Engine used before initialize()")]
    NotInitialized,
}

pub type EngineResult<T> = Result<T, EngineError>;
