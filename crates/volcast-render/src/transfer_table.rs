//! 1D lookup textures derived from transfer functions.
//!
//! Each table owns one fixed-width 1D texture and rebuilds its texels
//! only when stale. Three triggers are evaluated independently: the
//! texture was never allocated, the sampled range changed, or the
//! source function's modification time passed the table's last build.
//! Interpolation mode is sampler state, tracked separately so redundant
//! bind-group rebuilds are skipped.

use half::f16;

use crate::context::GpuContext;
use crate::error::RenderResult;
use volcast_core::{BlendMode, ColorTransferFunction, OpacityTransferFunction, Timestamp};

/// Fixed texel resolution of every lookup table.
pub const TABLE_WIDTH: usize = 1024;

/// What an update changed, for bind-group invalidation by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableUpdate {
    /// Texel data was re-uploaded.
    pub rebuilt: bool,
    /// The interpolation (filter) choice changed.
    pub filter_changed: bool,
}

/// Pure rebuild decision, independently testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RebuildDecision {
    rebuild: bool,
    apply_filter: bool,
}

impl RebuildDecision {
    #[allow(clippy::too_many_arguments)]
    fn evaluate(
        allocated: bool,
        loaded: bool,
        spec_mtime: Timestamp,
        build_time: Timestamp,
        range: [f64; 2],
        last_range: [f64; 2],
        linear: bool,
        last_linear: bool,
    ) -> Self {
        let forced = !allocated || range != last_range;
        let rebuild = forced || !loaded || spec_mtime > build_time;
        // Filter state is re-applied on a forced rebuild (guards a stale
        // filter after a range change) or when the mode itself changed;
        // otherwise the redundant state change is skipped.
        let apply_filter = forced || linear != last_linear;
        Self {
            rebuild,
            apply_filter,
        }
    }
}

/// Shared 1D-texture plumbing for both table variants.
struct TableTexture {
    format: wgpu::TextureFormat,
    bytes_per_texel: u32,
    texture: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
}

impl TableTexture {
    fn new(format: wgpu::TextureFormat, bytes_per_texel: u32) -> Self {
        Self {
            format,
            bytes_per_texel,
            texture: None,
            view: None,
        }
    }

    fn is_allocated(&self) -> bool {
        self.texture.is_some()
    }

    fn allocate(&mut self, ctx: &GpuContext, label: &str) {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: TABLE_WIDTH as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D1,
            format: self.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::D1),
            ..Default::default()
        });
        self.texture = Some(texture);
        self.view = Some(view);
    }

    fn upload(&self, ctx: &GpuContext, bytes: &[u8]) {
        let texture = self.texture.as_ref().expect("table texture allocated");
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(TABLE_WIDTH as u32 * self.bytes_per_texel),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: TABLE_WIDTH as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// The RGB transfer-function lookup table.
///
/// Texels are `Rgba16Float` (wgpu has no filterable 3-channel format;
/// alpha is pinned to 1).
pub struct ColorTable {
    texture: TableTexture,
    loaded: bool,
    last_range: [f64; 2],
    linear: bool,
    build_time: Timestamp,
}

impl ColorTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            texture: TableTexture::new(wgpu::TextureFormat::Rgba16Float, 8),
            loaded: false,
            last_range: [0.0, 0.0],
            linear: true,
            build_time: Timestamp::ZERO,
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Current interpolation choice, for sampler selection.
    #[must_use]
    pub fn linear_interpolation(&self) -> bool {
        self.linear
    }

    #[must_use]
    pub fn build_time(&self) -> Timestamp {
        self.build_time
    }

    /// The table's texture view; `None` until first update.
    #[must_use]
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.texture.view.as_ref()
    }

    /// Brings the table up to date with `spec` resampled over `range`.
    pub fn update(
        &mut self,
        ctx: &GpuContext,
        spec: &ColorTransferFunction,
        range: [f64; 2],
        linear: bool,
    ) -> RenderResult<TableUpdate> {
        let decision = RebuildDecision::evaluate(
            self.texture.is_allocated(),
            self.loaded,
            spec.mtime(),
            self.build_time,
            range,
            self.last_range,
            linear,
            self.linear,
        );

        if !self.texture.is_allocated() {
            self.texture.allocate(ctx, "color transfer table");
        }

        if decision.rebuild {
            self.loaded = false;
            let texels = spec.resample(range, TABLE_WIDTH);
            let mut bytes = Vec::with_capacity(TABLE_WIDTH * 8);
            for rgb in &texels {
                for c in rgb {
                    bytes.extend_from_slice(&f16::from_f32(*c).to_ne_bytes());
                }
                bytes.extend_from_slice(&f16::ONE.to_ne_bytes());
            }
            self.texture.upload(ctx, &bytes);
            self.loaded = true;
            self.build_time = Timestamp::tick();
            self.last_range = range;
        }

        let filter_changed = decision.apply_filter && self.linear != linear;
        self.linear = linear;

        Ok(TableUpdate {
            rebuilt: decision.rebuild,
            filter_changed,
        })
    }
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Step-corrects one opacity sample so accumulated opacity is
/// independent of ray step size under composite blending.
#[must_use]
pub fn correct_opacity(
    alpha: f64,
    blend_mode: BlendMode,
    sample_distance: f64,
    unit_distance: f64,
) -> f64 {
    match blend_mode {
        BlendMode::Composite if sample_distance > 0.0 && unit_distance > 0.0 => {
            1.0 - (1.0 - alpha.clamp(0.0, 1.0)).powf(sample_distance / unit_distance)
        }
        _ => alpha,
    }
}

/// The scalar-opacity lookup table (`R16Float` texels).
pub struct OpacityTable {
    texture: TableTexture,
    loaded: bool,
    last_range: [f64; 2],
    linear: bool,
    build_time: Timestamp,
}

impl OpacityTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            texture: TableTexture::new(wgpu::TextureFormat::R16Float, 2),
            loaded: false,
            last_range: [0.0, 0.0],
            linear: true,
            build_time: Timestamp::ZERO,
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub fn linear_interpolation(&self) -> bool {
        self.linear
    }

    #[must_use]
    pub fn build_time(&self) -> Timestamp {
        self.build_time
    }

    #[must_use]
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.texture.view.as_ref()
    }

    /// Brings the table up to date, folding the blend mode and the ray
    /// step distance into the resampled opacities.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        ctx: &GpuContext,
        spec: &OpacityTransferFunction,
        blend_mode: BlendMode,
        sample_distance: f64,
        unit_distance: f64,
        range: [f64; 2],
        linear: bool,
    ) -> RenderResult<TableUpdate> {
        let decision = RebuildDecision::evaluate(
            self.texture.is_allocated(),
            self.loaded,
            spec.mtime(),
            self.build_time,
            range,
            self.last_range,
            linear,
            self.linear,
        );

        if !self.texture.is_allocated() {
            self.texture.allocate(ctx, "opacity transfer table");
        }

        if decision.rebuild {
            self.loaded = false;
            let texels = spec.resample(range, TABLE_WIDTH);
            let mut bytes = Vec::with_capacity(TABLE_WIDTH * 2);
            for a in &texels {
                let corrected =
                    correct_opacity(f64::from(*a), blend_mode, sample_distance, unit_distance);
                bytes.extend_from_slice(&f16::from_f64(corrected).to_ne_bytes());
            }
            self.texture.upload(ctx, &bytes);
            self.loaded = true;
            self.build_time = Timestamp::tick();
            self.last_range = range;
        }

        let filter_changed = decision.apply_filter && self.linear != linear;
        self.linear = linear;

        Ok(TableUpdate {
            rebuilt: decision.rebuild,
            filter_changed,
        })
    }
}

impl Default for OpacityTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Indexed collection of opacity tables, one per compositing level.
///
/// The current engine exercises a single level, but the collection is
/// kept growable so multi-resolution compositing can slot in without a
/// redesign.
pub struct OpacityTables {
    tables: Vec<OpacityTable>,
}

impl OpacityTables {
    #[must_use]
    pub fn new(levels: usize) -> Self {
        Self {
            tables: (0..levels).map(|_| OpacityTable::new()).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[must_use]
    pub fn get(&self, level: usize) -> Option<&OpacityTable> {
        self.tables.get(level)
    }

    pub fn get_mut(&mut self, level: usize) -> Option<&mut OpacityTable> {
        self.tables.get_mut(level)
    }
}
