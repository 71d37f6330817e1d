//! Typed scalar volume data.

use crate::error::{Result, VolcastError};
use crate::timestamp::Timestamp;

/// Storage type tag for a scalar array.
///
/// The 64-bit and double tags exist so the unsupported-type rejection
/// path in the upload format mapping is constructible; only the 8/16/32
/// bit integers and `Float32` can be uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ScalarType {
    /// Size of one element in bytes.
    #[must_use]
    pub fn element_size(self) -> usize {
        match self {
            ScalarType::Int8 | ScalarType::UInt8 => 1,
            ScalarType::Int16 | ScalarType::UInt16 => 2,
            ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Float32 => 4,
            ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 => 8,
        }
    }
}

/// An owned scalar buffer, one variant per storage type.
#[derive(Debug, Clone)]
pub enum ScalarData {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl ScalarData {
    /// The storage type tag of this buffer.
    #[must_use]
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarData::Int8(_) => ScalarType::Int8,
            ScalarData::UInt8(_) => ScalarType::UInt8,
            ScalarData::Int16(_) => ScalarType::Int16,
            ScalarData::UInt16(_) => ScalarType::UInt16,
            ScalarData::Int32(_) => ScalarType::Int32,
            ScalarData::UInt32(_) => ScalarType::UInt32,
            ScalarData::Int64(_) => ScalarType::Int64,
            ScalarData::UInt64(_) => ScalarType::UInt64,
            ScalarData::Float32(_) => ScalarType::Float32,
            ScalarData::Float64(_) => ScalarType::Float64,
        }
    }

    /// Number of elements (components counted individually).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ScalarData::Int8(v) => v.len(),
            ScalarData::UInt8(v) => v.len(),
            ScalarData::Int16(v) => v.len(),
            ScalarData::UInt16(v) => v.len(),
            ScalarData::Int32(v) => v.len(),
            ScalarData::UInt32(v) => v.len(),
            ScalarData::Int64(v) => v.len(),
            ScalarData::UInt64(v) => v.len(),
            ScalarData::Float32(v) => v.len(),
            ScalarData::Float64(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The buffer reinterpreted as raw bytes, in native element order.
    ///
    /// Used by the 4-component upload path, which hands the bytes to the
    /// GPU without numeric remapping.
    #[must_use]
    pub fn raw_bytes(&self) -> &[u8] {
        match self {
            ScalarData::Int8(v) => bytemuck::cast_slice(v),
            ScalarData::UInt8(v) => v,
            ScalarData::Int16(v) => bytemuck::cast_slice(v),
            ScalarData::UInt16(v) => bytemuck::cast_slice(v),
            ScalarData::Int32(v) => bytemuck::cast_slice(v),
            ScalarData::UInt32(v) => bytemuck::cast_slice(v),
            ScalarData::Int64(v) => bytemuck::cast_slice(v),
            ScalarData::UInt64(v) => bytemuck::cast_slice(v),
            ScalarData::Float32(v) => bytemuck::cast_slice(v),
            ScalarData::Float64(v) => bytemuck::cast_slice(v),
        }
    }
}

/// Structured extents: `[xmin, xmax, ymin, ymax, zmin, zmax]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extents(pub [i32; 6]);

impl Extents {
    /// Texel count along one axis (`max - min + 1`).
    #[must_use]
    pub fn size(&self, axis: usize) -> u32 {
        debug_assert!(axis < 3);
        (self.0[2 * axis + 1] - self.0[2 * axis] + 1).max(0) as u32
    }

    /// Texture dimensions `[x, y, z]`.
    #[must_use]
    pub fn dimensions(&self) -> [u32; 3] {
        [self.size(0), self.size(1), self.size(2)]
    }

    /// Total number of texels.
    #[must_use]
    pub fn texel_count(&self) -> usize {
        self.dimensions().iter().map(|&d| d as usize).product()
    }
}

/// An immutable-per-frame view of one scalar volume.
///
/// Owned by the host pipeline; the render core only reads it and
/// compares its modification time against cached build times.
#[derive(Debug, Clone)]
pub struct ScalarField {
    data: ScalarData,
    num_components: u32,
    extents: Extents,
    range: [f64; 2],
    mtime: Timestamp,
}

impl ScalarField {
    /// Creates a field, validating buffer length against extents and
    /// component count.
    pub fn new(
        data: ScalarData,
        num_components: u32,
        extents: Extents,
        range: [f64; 2],
    ) -> Result<Self> {
        if num_components != 1 && num_components != 4 {
            return Err(VolcastError::InvalidComponentCount(num_components));
        }
        // NaN must not slip past the ordering comparison.
        if !range[0].is_finite() || !range[1].is_finite() || range[0] >= range[1] {
            return Err(VolcastError::InvalidRange(range[0], range[1]));
        }
        let expected = extents.texel_count() * num_components as usize;
        if data.len() != expected {
            return Err(VolcastError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            num_components,
            extents,
            range,
            mtime: Timestamp::tick(),
        })
    }

    #[must_use]
    pub fn data(&self) -> &ScalarData {
        &self.data
    }

    #[must_use]
    pub fn scalar_type(&self) -> ScalarType {
        self.data.scalar_type()
    }

    #[must_use]
    pub fn num_components(&self) -> u32 {
        self.num_components
    }

    #[must_use]
    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Declared scalar value range `[lo, hi]`.
    #[must_use]
    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    #[must_use]
    pub fn mtime(&self) -> Timestamp {
        self.mtime
    }

    /// Replaces the scalar buffer in place and advances the modification
    /// time. Length must match the existing layout.
    pub fn update_data(&mut self, data: ScalarData, range: [f64; 2]) -> Result<()> {
        let expected = self.extents.texel_count() * self.num_components as usize;
        if data.len() != expected {
            return Err(VolcastError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        if !range[0].is_finite() || !range[1].is_finite() || range[0] >= range[1] {
            return Err(VolcastError::InvalidRange(range[0], range[1]));
        }
        self.data = data;
        self.range = range;
        self.mark_modified();
        Ok(())
    }

    /// Advances the modification time without touching the data.
    pub fn mark_modified(&mut self) {
        self.mtime = Timestamp::tick();
    }
}
