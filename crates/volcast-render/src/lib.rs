//! wgpu-based single-pass volume ray caster for volcast-rs.
//!
//! This crate provides the GPU half of the engine, including:
//! - The headless GPU context and capability probing
//! - Scalar-to-texture upload format mapping
//! - Cached volume texture, transfer tables, and proxy geometry
//! - The ray-cast render pipeline and per-frame orchestration

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod context;
pub mod engine;
pub mod error;
pub mod format;
pub mod geometry;
pub mod shader;
pub mod transfer_table;
pub mod volume_texture;

pub use context::{GpuCaps, GpuContext};
pub use engine::{CameraInputs, FrameInputs, FrameUniforms, RayCastEngine, VolumeInputs};
pub use error::{RenderError, RenderResult};
pub use format::{upload_format, UploadFormat};
pub use geometry::CubeGeometry;
pub use shader::{ShaderBuilder, ShaderInterface, UniformSlot};
pub use transfer_table::{
    correct_opacity, ColorTable, OpacityTable, OpacityTables, TableUpdate, TABLE_WIDTH,
};
pub use volume_texture::VolumeTexture;
