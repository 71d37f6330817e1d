//! Core data model for volcast-rs.
//!
//! This crate provides the GPU-free half of the volume ray caster:
//! - [`ScalarField`] — typed scalar volume data with extents and a value range
//! - [`ColorTransferFunction`] / [`OpacityTransferFunction`] — control-point curves
//! - [`Timestamp`] — the logical modification clock driving dirty tracking
//! - [`Bounds`] — the exact-equality world-space bounding box

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod blend;
pub mod bounds;
pub mod error;
pub mod scalar_field;
pub mod timestamp;
pub mod transfer_function;

pub use blend::BlendMode;
pub use bounds::Bounds;
pub use error::{Result, VolcastError};
pub use scalar_field::{Extents, ScalarData, ScalarField, ScalarType};
pub use timestamp::Timestamp;
pub use transfer_function::{ColorTransferFunction, OpacityTransferFunction};

// Re-export glam types for convenience
pub use glam::{Mat4, Vec3};
