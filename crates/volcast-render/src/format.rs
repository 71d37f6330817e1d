//! Upload format selection and texel conversion for volume data.
//!
//! The mapping from `(component count, scalar storage type)` to a GPU
//! texture format plus a `(shift, scale)` range-normalization pair is a
//! pure function, independently testable without a GPU. The per-type
//! shift/scale formulas are load-bearing for downstream consumers:
//! note the 16- and 32-bit signed branches divide the shift by the
//! unsigned-range maximum while scaling by the signed maximum. Do not
//! "fix" the sign conventions without revalidating every consumer.

use half::f16;

use crate::context::GpuCaps;
use crate::error::{RenderError, RenderResult};
use volcast_core::{ScalarData, ScalarField, ScalarType};

const U8_MAX: f64 = 255.0;
const I8_MAX: f64 = 127.0;
const U16_MAX: f64 = 65535.0;
const I16_MAX: f64 = 32767.0;
const U32_MAX: f64 = 4_294_967_295.0;
const I32_MAX: f64 = 2_147_483_647.0;

/// The resolved upload format for one scalar field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadFormat {
    /// Internal texture format.
    pub internal: wgpu::TextureFormat,
    /// Additive term normalizing the declared `[lo, hi]` range into the
    /// texture's representable range.
    pub shift: f64,
    /// Multiplicative term of the same normalization.
    pub scale: f64,
    /// Bytes per texel after conversion.
    pub bytes_per_texel: u32,
}

/// Picks the 16-bit single-channel format: normalized when the device
/// granted `TEXTURE_FORMAT_16BIT_NORM`, float otherwise.
fn sixteen_bit(caps: GpuCaps) -> (wgpu::TextureFormat, u32) {
    if caps.unorm16_storage {
        (wgpu::TextureFormat::R16Unorm, 2)
    } else {
        (wgpu::TextureFormat::R16Float, 2)
    }
}

/// Total function from `(component count, storage type)` to the upload
/// format. Component count takes precedence: 4-component data is always
/// uploaded as 4-channel 8-bit with no numeric remap, regardless of the
/// declared scalar type.
pub fn upload_format(
    num_components: u32,
    scalar_type: ScalarType,
    range: [f64; 2],
    caps: GpuCaps,
) -> RenderResult<UploadFormat> {
    let [lo, hi] = range;

    if num_components == 4 {
        return Ok(UploadFormat {
            internal: wgpu::TextureFormat::Rgba8Unorm,
            shift: 0.0,
            scale: 1.0,
            bytes_per_texel: 4,
        });
    }

    let fmt = match scalar_type {
        ScalarType::UInt8 => UploadFormat {
            internal: wgpu::TextureFormat::R8Unorm,
            shift: -lo / U8_MAX,
            scale: U8_MAX / (hi - lo),
            bytes_per_texel: 1,
        },
        ScalarType::Int8 => UploadFormat {
            internal: wgpu::TextureFormat::R8Unorm,
            shift: -(2.0 * lo + 1.0) / U8_MAX,
            scale: I8_MAX / (hi - lo),
            bytes_per_texel: 1,
        },
        ScalarType::UInt16 => {
            let (internal, bytes_per_texel) = sixteen_bit(caps);
            UploadFormat {
                internal,
                shift: -lo / U16_MAX,
                scale: U16_MAX / (hi - lo),
                bytes_per_texel,
            }
        }
        ScalarType::Int16 => {
            // Unsigned-range divisor paired with a signed-range scale.
            let (internal, bytes_per_texel) = sixteen_bit(caps);
            UploadFormat {
                internal,
                shift: -(2.0 * lo + 1.0) / U16_MAX,
                scale: I16_MAX / (hi - lo),
                bytes_per_texel,
            }
        }
        ScalarType::UInt32 => {
            let (internal, bytes_per_texel) = sixteen_bit(caps);
            UploadFormat {
                internal,
                shift: -lo / U32_MAX,
                scale: U32_MAX / (hi - lo),
                bytes_per_texel,
            }
        }
        ScalarType::Int32 => {
            let (internal, bytes_per_texel) = sixteen_bit(caps);
            UploadFormat {
                internal,
                shift: -(2.0 * lo + 1.0) / U32_MAX,
                scale: I32_MAX / (hi - lo),
                bytes_per_texel,
            }
        }
        ScalarType::Float32 => {
            let (internal, bytes_per_texel) = if caps.float32_filterable {
                (wgpu::TextureFormat::R32Float, 4)
            } else {
                sixteen_bit(caps)
            };
            UploadFormat {
                internal,
                shift: -lo,
                scale: 1.0 / (hi - lo),
                bytes_per_texel,
            }
        }
        ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 => {
            return Err(RenderError::UnsupportedScalarType(scalar_type));
        }
    };
    Ok(fmt)
}

fn u16_texels_to_bytes(values: impl Iterator<Item = u16>, internal: wgpu::TextureFormat) -> Vec<u8> {
    match internal {
        wgpu::TextureFormat::R16Unorm => {
            values.flat_map(u16::to_ne_bytes).collect()
        }
        // Feature fallback: same 16-bit width, float encoding.
        _ => values
            .flat_map(|v| f16::from_f32(f32::from(v) / U16_MAX as f32).to_ne_bytes())
            .collect(),
    }
}

/// Converts the field's scalar buffer into upload bytes for `fmt`.
///
/// Integer sources are rebased to their full unsigned range;
/// 32-bit integers keep their top 16 bits. 4-component data is a raw
/// byte reinterpretation of the buffer with no numeric remapping.
pub fn convert_texels(field: &ScalarField, fmt: &UploadFormat) -> RenderResult<Vec<u8>> {
    let texels = field.extents().texel_count();

    if field.num_components() == 4 {
        let raw = field.data().raw_bytes();
        let wanted = texels * 4;
        if raw.len() < wanted {
            return Err(RenderError::InvalidInput("4-component buffer too short"));
        }
        return Ok(raw[..wanted].to_vec());
    }

    let bytes = match field.data() {
        ScalarData::UInt8(v) => v.clone(),
        ScalarData::Int8(v) => v.iter().map(|&x| (i16::from(x) + 128) as u8).collect(),
        ScalarData::UInt16(v) => u16_texels_to_bytes(v.iter().copied(), fmt.internal),
        ScalarData::Int16(v) => u16_texels_to_bytes(
            v.iter().map(|&x| (i32::from(x) + 32768) as u16),
            fmt.internal,
        ),
        ScalarData::UInt32(v) => {
            u16_texels_to_bytes(v.iter().map(|&x| (x >> 16) as u16), fmt.internal)
        }
        ScalarData::Int32(v) => u16_texels_to_bytes(
            v.iter().map(|&x| (((i64::from(x) + 2_147_483_648) >> 16) as u16)),
            fmt.internal,
        ),
        ScalarData::Float32(v) => match fmt.internal {
            wgpu::TextureFormat::R32Float => bytemuck::cast_slice(v).to_vec(),
            wgpu::TextureFormat::R16Unorm => v
                .iter()
                .flat_map(|&x| {
                    let n = (f64::from(x) + fmt.shift) * fmt.scale;
                    let q = (n.clamp(0.0, 1.0) * U16_MAX) as u16;
                    q.to_ne_bytes()
                })
                .collect(),
            _ => v
                .iter()
                .flat_map(|&x| f16::from_f32(x).to_ne_bytes())
                .collect(),
        },
        ScalarData::Int64(_) | ScalarData::UInt64(_) | ScalarData::Float64(_) => {
            return Err(RenderError::UnsupportedScalarType(field.scalar_type()));
        }
    };

    debug_assert_eq!(bytes.len(), texels * fmt.bytes_per_texel as usize);
    Ok(bytes)
}
