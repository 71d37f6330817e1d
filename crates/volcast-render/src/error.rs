//! Rendering error types.

use thiserror::Error;
use volcast_core::ScalarType;

/// Errors that can occur during ray-casting operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation or interface validation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Scalar storage type outside the uploadable set.
    #[error("scalar type {0:?} is not supported for volume upload")]
    UnsupportedScalarType(ScalarType),

    /// More than one scalar component requested for transfer-function
    /// mapping.
    #[error("multi-component scalars ({0} components) are not supported for color/opacity mapping")]
    UnsupportedComponentLayout(u32),

    /// A required frame input was absent.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
