//! Transfer function curves mapping scalar values to color or opacity.
//!
//! Both curves are ordered control-point lists with piecewise-linear
//! interpolation between points and end clamping outside them. A
//! modification timestamp lets GPU lookup tables decide when their
//! resampled copy is stale.

use crate::timestamp::Timestamp;

/// Inserts `(value, payload)` keeping the list sorted by value.
/// A point at an existing value replaces it.
fn insert_sorted<T>(points: &mut Vec<(f64, T)>, value: f64, payload: T) {
    match points.binary_search_by(|(v, _)| v.partial_cmp(&value).unwrap()) {
        Ok(i) => points[i] = (value, payload),
        Err(i) => points.insert(i, (value, payload)),
    }
}

/// Locates the segment containing `value` and returns the two bracketing
/// indices plus the interpolation parameter. Assumes a non-empty list
/// and `value` inside the covered range.
fn segment_at<T>(points: &[(f64, T)], value: f64) -> (usize, usize, f64) {
    let i = match points.binary_search_by(|(v, _)| v.partial_cmp(&value).unwrap()) {
        Ok(i) => return (i, i, 0.0),
        Err(i) => i,
    };
    let (lo, hi) = (i - 1, i);
    let span = points[hi].0 - points[lo].0;
    let t = if span > 0.0 {
        (value - points[lo].0) / span
    } else {
        0.0
    };
    (lo, hi, t)
}

/// A scalar-to-RGB transfer function.
#[derive(Debug, Clone, Default)]
pub struct ColorTransferFunction {
    points: Vec<(f64, [f64; 3])>,
    mtime: Timestamp,
}

impl ColorTransferFunction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a control point and advances the
    /// modification time.
    pub fn add_point(&mut self, value: f64, rgb: [f64; 3]) {
        insert_sorted(&mut self.points, value, rgb);
        self.mtime = Timestamp::tick();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn mtime(&self) -> Timestamp {
        self.mtime
    }

    /// Inserts the default boundary points (black at `lo`, white at
    /// `hi`) if the function has no control points yet, so that a
    /// usable default gradient always exists.
    pub fn ensure_default_points(&mut self, range: [f64; 2]) {
        if self.points.is_empty() {
            self.add_point(range[0], [0.0, 0.0, 0.0]);
            self.add_point(range[1], [1.0, 1.0, 1.0]);
        }
    }

    /// Evaluates the curve at `value` with end clamping.
    #[must_use]
    pub fn sample(&self, value: f64) -> [f64; 3] {
        let Some(first) = self.points.first() else {
            return [0.0, 0.0, 0.0];
        };
        if value <= first.0 {
            return first.1;
        }
        let last = self.points.last().unwrap();
        if value >= last.0 {
            return last.1;
        }
        let (lo, hi, t) = segment_at(&self.points, value);
        let (a, b) = (self.points[lo].1, self.points[hi].1);
        [
            a[0] + (b[0] - a[0]) * t,
            a[1] + (b[1] - a[1]) * t,
            a[2] + (b[2] - a[2]) * t,
        ]
    }

    /// Resamples the curve uniformly over `[lo, hi]` into `width`
    /// RGB texels. Endpoint texels equal `sample(lo)` / `sample(hi)`.
    #[must_use]
    pub fn resample(&self, range: [f64; 2], width: usize) -> Vec<[f32; 3]> {
        debug_assert!(width >= 2);
        let step = (range[1] - range[0]) / (width - 1) as f64;
        (0..width)
            .map(|i| {
                let rgb = self.sample(range[0] + step * i as f64);
                [rgb[0] as f32, rgb[1] as f32, rgb[2] as f32]
            })
            .collect()
    }
}

/// A scalar-to-opacity transfer function.
#[derive(Debug, Clone, Default)]
pub struct OpacityTransferFunction {
    points: Vec<(f64, f64)>,
    mtime: Timestamp,
}

impl OpacityTransferFunction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a control point and advances the
    /// modification time.
    pub fn add_point(&mut self, value: f64, alpha: f64) {
        insert_sorted(&mut self.points, value, alpha);
        self.mtime = Timestamp::tick();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn mtime(&self) -> Timestamp {
        self.mtime
    }

    /// Inserts the default boundary points (fully transparent at `lo`,
    /// fully opaque at `hi`) if the function is empty.
    pub fn ensure_default_points(&mut self, range: [f64; 2]) {
        if self.points.is_empty() {
            self.add_point(range[0], 0.0);
            self.add_point(range[1], 1.0);
        }
    }

    /// Evaluates the curve at `value` with end clamping.
    #[must_use]
    pub fn sample(&self, value: f64) -> f64 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        if value <= first.0 {
            return first.1;
        }
        let last = self.points.last().unwrap();
        if value >= last.0 {
            return last.1;
        }
        let (lo, hi, t) = segment_at(&self.points, value);
        let (a, b) = (self.points[lo].1, self.points[hi].1);
        a + (b - a) * t
    }

    /// Resamples the curve uniformly over `[lo, hi]` into `width`
    /// opacity texels.
    #[must_use]
    pub fn resample(&self, range: [f64; 2], width: usize) -> Vec<f32> {
        debug_assert!(width >= 2);
        let step = (range[1] - range[0]) / (width - 1) as f64;
        (0..width)
            .map(|i| self.sample(range[0] + step * i as f64) as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_curve_samples_black() {
        let ctf = ColorTransferFunction::new();
        assert_eq!(ctf.sample(0.5), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn default_points_only_inserted_when_empty() {
        let mut ctf = ColorTransferFunction::new();
        ctf.ensure_default_points([0.0, 1.0]);
        assert_eq!(ctf.len(), 2);
        assert_eq!(ctf.sample(0.0), [0.0, 0.0, 0.0]);
        assert_eq!(ctf.sample(1.0), [1.0, 1.0, 1.0]);

        // A populated curve is left alone.
        ctf.ensure_default_points([-5.0, 5.0]);
        assert_eq!(ctf.len(), 2);
    }

    #[test]
    fn add_point_replaces_on_equal_value() {
        let mut otf = OpacityTransferFunction::new();
        otf.add_point(0.5, 0.2);
        otf.add_point(0.5, 0.8);
        assert_eq!(otf.len(), 1);
        assert_eq!(otf.sample(0.5), 0.8);
    }

    #[test]
    fn piecewise_linear_midpoint() {
        let mut ctf = ColorTransferFunction::new();
        ctf.add_point(0.0, [0.0, 0.0, 0.0]);
        ctf.add_point(1.0, [1.0, 0.5, 0.0]);
        let mid = ctf.sample(0.5);
        assert!((mid[0] - 0.5).abs() < 1e-12);
        assert!((mid[1] - 0.25).abs() < 1e-12);
        assert_eq!(mid[2], 0.0);
    }

    #[test]
    fn sampling_clamps_outside_points() {
        let mut otf = OpacityTransferFunction::new();
        otf.add_point(10.0, 0.3);
        otf.add_point(20.0, 0.9);
        assert_eq!(otf.sample(-100.0), 0.3);
        assert_eq!(otf.sample(100.0), 0.9);
    }

    #[test]
    fn add_point_advances_mtime() {
        let mut ctf = ColorTransferFunction::new();
        let before = ctf.mtime();
        ctf.add_point(0.0, [1.0, 0.0, 0.0]);
        assert!(ctf.mtime() > before);
    }

    proptest! {
        #[test]
        fn resample_width_and_endpoints(
            lo in -1000.0f64..0.0,
            span in 0.001f64..1000.0,
            width in 2usize..2048,
            alpha in 0.0f64..1.0,
        ) {
            let hi = lo + span;
            let mut otf = OpacityTransferFunction::new();
            otf.add_point(lo + span * 0.25, alpha);
            otf.add_point(lo + span * 0.75, 1.0 - alpha);

            let table = otf.resample([lo, hi], width);
            prop_assert_eq!(table.len(), width);
            prop_assert_eq!(table[0], otf.sample(lo) as f32);
            prop_assert_eq!(table[width - 1], otf.sample(hi) as f32);
        }

        #[test]
        fn color_resample_endpoints(
            lo in -100.0f64..0.0,
            span in 0.001f64..100.0,
            width in 2usize..1025,
        ) {
            let hi = lo + span;
            let mut ctf = ColorTransferFunction::new();
            ctf.add_point(lo, [0.1, 0.2, 0.3]);
            ctf.add_point(hi, [0.9, 0.8, 0.7]);

            let table = ctf.resample([lo, hi], width);
            prop_assert_eq!(table.len(), width);
            prop_assert_eq!(table[0], [0.1f32, 0.2, 0.3]);
            prop_assert_eq!(table[width - 1], [0.9f32, 0.8, 0.7]);
        }
    }
}
