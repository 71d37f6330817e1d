//! World-space axis-aligned bounding box.

use glam::Vec3;

/// An axis-aligned box as `[xmin, xmax, ymin, ymax, zmin, zmax]`.
///
/// Equality is exact floating-point comparison: geometry is only
/// re-uploaded when any of the six values differs at all, so derived
/// `PartialEq` is the intended semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds(pub [f64; 6]);

impl Bounds {
    /// Extent along one axis (`max - min`).
    #[must_use]
    pub fn extent(&self, axis: usize) -> f64 {
        debug_assert!(axis < 3);
        self.0[2 * axis + 1] - self.0[2 * axis]
    }

    #[must_use]
    pub fn min_corner(&self) -> Vec3 {
        Vec3::new(self.0[0] as f32, self.0[2] as f32, self.0[4] as f32)
    }

    #[must_use]
    pub fn max_corner(&self) -> Vec3 {
        Vec3::new(self.0[1] as f32, self.0[3] as f32, self.0[5] as f32)
    }

    /// The 8 cube corners in the fixed order the index winding table
    /// expects: the four z-min corners counter-clockwise, then the four
    /// z-max corners.
    #[must_use]
    pub fn corners(&self) -> [[f32; 3]; 8] {
        let [x0, x1, y0, y1, z0, z1] = self.0.map(|v| v as f32);
        [
            [x0, y0, z0],
            [x1, y0, z0],
            [x1, y1, z0],
            [x0, y1, z0],
            [x0, y0, z1],
            [x1, y0, z1],
            [x1, y1, z1],
            [x0, y1, z1],
        ]
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_exact() {
        let a = Bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        let b = Bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        let c = Bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0001]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn corner_order_matches_winding_table() {
        let b = Bounds([0.0, 2.0, 0.0, 3.0, 0.0, 4.0]);
        let c = b.corners();
        assert_eq!(c[0], [0.0, 0.0, 0.0]);
        assert_eq!(c[1], [2.0, 0.0, 0.0]);
        assert_eq!(c[6], [2.0, 3.0, 4.0]);
        assert_eq!(c[7], [0.0, 3.0, 4.0]);
    }

    #[test]
    fn extent_per_axis() {
        let b = Bounds([-1.0, 1.0, 0.0, 3.0, 2.0, 2.5]);
        assert_eq!(b.extent(0), 2.0);
        assert_eq!(b.extent(1), 3.0);
        assert_eq!(b.extent(2), 0.5);
    }
}
