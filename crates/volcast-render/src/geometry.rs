//! Bounding-cube proxy geometry for the ray caster.
//!
//! The cube is the only geometry ever rasterized: its fragments seed
//! the rays that march the volume. Buffers are rebuilt only when the
//! volume bounds actually change.

use wgpu::util::DeviceExt;

use volcast_core::Bounds;

use crate::context::GpuContext;

/// Index list for the 12 cube triangles, front faces wound
/// counter-clockwise when viewed from outside.
const CUBE_INDICES: [u16; 36] = [
    0, 5, 4, 5, 0, 1, // -z
    3, 7, 6, 3, 6, 2, // +z
    7, 4, 6, 6, 4, 5, // +y
    2, 1, 3, 3, 1, 0, // -y
    3, 0, 7, 7, 0, 4, // -x
    6, 5, 2, 2, 5, 1, // +x
];

/// GPU vertex/index buffers for the bounding cube.
pub struct CubeGeometry {
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    loaded_bounds: Option<Bounds>,
}

impl CubeGeometry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertex_buffer: None,
            index_buffer: None,
            loaded_bounds: None,
        }
    }

    /// Number of indices to draw.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        CUBE_INDICES.len() as u32
    }

    /// Vertex buffer, if bounds have been uploaded.
    #[must_use]
    pub fn vertex_buffer(&self) -> Option<&wgpu::Buffer> {
        self.vertex_buffer.as_ref()
    }

    /// Index buffer, if bounds have been uploaded.
    #[must_use]
    pub fn index_buffer(&self) -> Option<&wgpu::Buffer> {
        self.index_buffer.as_ref()
    }

    /// Rebuilds the buffers when `bounds` differ from the loaded ones.
    ///
    /// Comparison is exact: a volume's bounds come from its metadata,
    /// not from arithmetic, so bitwise equality is the right test.
    /// Returns whether an upload happened.
    pub fn refresh_if_changed(&mut self, ctx: &GpuContext, bounds: &Bounds) -> bool {
        if self.loaded_bounds.as_ref() == Some(bounds) {
            return false;
        }

        let corners = bounds.corners();
        let vertices: Vec<f32> = corners
            .iter()
            .flat_map(|c| [c[0] as f32, c[1] as f32, c[2] as f32])
            .collect();

        self.vertex_buffer = Some(ctx.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("volume cube vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            },
        ));

        // Topology never changes; allocate the index buffer once.
        if self.index_buffer.is_none() {
            self.index_buffer = Some(ctx.device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("volume cube indices"),
                    contents: bytemuck::cast_slice(&CUBE_INDICES),
                    usage: wgpu::BufferUsages::INDEX,
                },
            ));
        }

        self.loaded_bounds = Some(*bounds);
        true
    }
}

impl Default for CubeGeometry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_triangles_cover_every_corner() {
        assert_eq!(CUBE_INDICES.len(), 36);
        for corner in 0u16..8 {
            assert!(
                CUBE_INDICES.contains(&corner),
                "corner {corner} unused by index list"
            );
        }
        assert!(CUBE_INDICES.iter().all(|&i| i < 8));
    }

    #[test]
    fn each_corner_shared_by_at_least_three_triangles() {
        for corner in 0u16..8 {
            let uses = CUBE_INDICES.iter().filter(|&&i| i == corner).count();
            assert!(uses >= 3, "corner {corner} used {uses} times");
        }
    }

    #[test]
    fn no_degenerate_triangles() {
        for tri in CUBE_INDICES.chunks(3) {
            assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
        }
    }
}
