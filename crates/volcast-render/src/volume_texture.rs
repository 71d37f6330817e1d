//! The 3D scalar volume texture.

use crate::context::GpuContext;
use crate::error::RenderResult;
use crate::format::{convert_texels, upload_format, UploadFormat};
use volcast_core::{ScalarField, Timestamp};

/// GPU 3D texture caching one scalar field.
///
/// The texture is absent until the first successful build. A rebuild is
/// required exactly when the field's modification time exceeds
/// `build_time`; since `build_time` starts at [`Timestamp::ZERO`], the
/// first build is not special-cased.
pub struct VolumeTexture {
    texture: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    size: [u32; 3],
    loaded_range: [f64; 2],
    loaded_format: Option<UploadFormat>,
    build_time: Timestamp,
}

impl VolumeTexture {
    #[must_use]
    pub fn new() -> Self {
        Self {
            texture: None,
            view: None,
            size: [0; 3],
            loaded_range: [0.0, 1.0],
            loaded_format: None,
            build_time: Timestamp::ZERO,
        }
    }

    /// Whether the texture contents match the field's current data.
    #[must_use]
    pub fn is_fresh(&self, field: &ScalarField) -> bool {
        self.view.is_some() && field.mtime() <= self.build_time
    }

    /// The texture view, once built.
    #[must_use]
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.view.as_ref()
    }

    /// Cached texture dimensions.
    #[must_use]
    pub fn size(&self) -> [u32; 3] {
        self.size
    }

    /// Scalar range the current contents were normalized against.
    #[must_use]
    pub fn loaded_range(&self) -> [f64; 2] {
        self.loaded_range
    }

    /// The `(shift, scale)` pair derived at the last build.
    #[must_use]
    pub fn shift_scale(&self) -> (f64, f64) {
        self.loaded_format
            .map_or((0.0, 1.0), |f| (f.shift, f.scale))
    }

    #[must_use]
    pub fn build_time(&self) -> Timestamp {
        self.build_time
    }

    /// Rebuilds the texture from `field` if its modification time is
    /// newer than the last build. Returns whether an upload happened.
    ///
    /// On an unsupported storage type the previous contents are left
    /// untouched and the error is returned for the caller to report.
    pub fn ensure_fresh(&mut self, ctx: &GpuContext, field: &ScalarField) -> RenderResult<bool> {
        if self.is_fresh(field) {
            return Ok(false);
        }

        let fmt = upload_format(
            field.num_components(),
            field.scalar_type(),
            field.range(),
            ctx.caps,
        )?;
        let bytes = convert_texels(field, &fmt)?;

        let dims = field.extents().dimensions();
        let needs_alloc = self.texture.is_none()
            || self.size != dims
            || self.loaded_format.map(|f| f.internal) != Some(fmt.internal);
        let texture = if needs_alloc {
            let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("volume texture"),
                size: wgpu::Extent3d {
                    width: dims[0],
                    height: dims[1],
                    depth_or_array_layers: dims[2],
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D3,
                format: fmt.internal,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor {
                dimension: Some(wgpu::TextureViewDimension::D3),
                ..Default::default()
            });
            self.view = Some(view);
            self.size = dims;
            &*self.texture.insert(texture)
        } else {
            // Checked by needs_alloc.
            self.texture.as_ref().expect("texture allocated")
        };

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(dims[0] * fmt.bytes_per_texel),
                rows_per_image: Some(dims[1]),
            },
            wgpu::Extent3d {
                width: dims[0],
                height: dims[1],
                depth_or_array_layers: dims[2],
            },
        );

        self.loaded_range = field.range();
        self.loaded_format = Some(fmt);
        self.build_time = Timestamp::tick();
        log::debug!(
            "volume texture rebuilt: {}x{}x{} {:?}",
            dims[0],
            dims[1],
            dims[2],
            fmt.internal
        );
        Ok(true)
    }
}

impl Default for VolumeTexture {
    fn default() -> Self {
        Self::new()
    }
}
