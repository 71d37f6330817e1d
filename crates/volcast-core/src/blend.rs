//! Compositing blend modes.

/// How samples along a ray are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Front-to-back alpha compositing. Opacity tables are
    /// step-corrected so accumulated opacity is independent of the ray
    /// step size.
    #[default]
    Composite,
    /// Keep the maximum sample along the ray; no opacity correction.
    MaximumIntensity,
}
