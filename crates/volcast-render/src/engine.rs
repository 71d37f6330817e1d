//! The ray-cast engine: per-frame orchestration of texture caches,
//! transfer tables, proxy geometry, and the render pass.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use volcast_core::{
    BlendMode, Bounds, ColorTransferFunction, OpacityTransferFunction, ScalarField,
};

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::geometry::CubeGeometry;
use crate::shader::{ShaderBuilder, ShaderInterface};
use crate::transfer_table::{ColorTable, OpacityTable, OpacityTables, TableUpdate};
use crate::volume_texture::VolumeTexture;

const RAYCASTER_WGSL: &str = include_str!("shaders/raycaster.wgsl");

/// Per-frame uniform block, laid out to match the WGSL `FrameUniforms`
/// struct field for field.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameUniforms {
    pub modelview_matrix: [[f32; 4]; 4],
    pub projection_matrix: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub enable_shading: u32,
    pub step_size: [f32; 3],
    pub _pad0: f32,
    pub cell_scale: [f32; 3],
    pub _pad1: f32,
    pub vol_extents_min: [f32; 3],
    pub _pad2: f32,
    pub vol_extents_max: [f32; 3],
    pub _pad3: f32,
}

/// Camera state for one frame, in the same space as the volume bounds.
#[derive(Debug, Clone, Copy)]
pub struct CameraInputs {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

/// One volume and its appearance for this frame.
///
/// Transfer functions are taken mutably: an empty function gets its
/// default control points installed before its table is sampled.
pub struct VolumeInputs<'a> {
    pub field: &'a ScalarField,
    pub bounds: Bounds,
    pub color: &'a mut ColorTransferFunction,
    pub opacity: &'a mut OpacityTransferFunction,
    /// Linear (trilinear) sampling of volume and tables; nearest when
    /// false.
    pub interpolation_linear: bool,
    /// World-space distance over which one unit of opacity accumulates.
    pub opacity_unit_distance: f64,
    pub enable_shading: bool,
}

/// Everything the engine needs to draw one frame.
pub struct FrameInputs<'a> {
    pub volume: Option<VolumeInputs<'a>>,
    pub camera: CameraInputs,
}

/// GPU resources, created lazily on the first rendered frame.
struct EngineResources {
    pipeline: wgpu::RenderPipeline,
    interface: ShaderInterface,
    uniform_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    /// Cached volume/table bind group. Dropped whenever a texture is
    /// rebuilt or the filter choice changes.
    texture_bind_group: Option<wgpu::BindGroup>,
    sampler_linear: wgpu::Sampler,
    sampler_nearest: wgpu::Sampler,
    volume: VolumeTexture,
    color_table: ColorTable,
    opacity_tables: OpacityTables,
    geometry: CubeGeometry,
}

/// Single-pass GPU volume ray caster.
///
/// Holds no GPU resources until the first frame with a bound volume,
/// then keeps every cache alive across frames and refreshes each one
/// only when its modification-time or value comparison says so.
pub struct RayCastEngine {
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    blend_mode: BlendMode,
    resources: Option<EngineResources>,
    /// Per-axis ray step, `1 / bounds span`.
    sample_distance: [f64; 3],
    /// Per-axis gradient scale, `bounds span * 0.5`.
    cell_scale: [f64; 3],
}

impl RayCastEngine {
    /// Creates an engine targeting the given color/depth attachment
    /// formats. No GPU work happens until [`Self::render`].
    #[must_use]
    pub fn new(color_format: wgpu::TextureFormat, depth_format: wgpu::TextureFormat) -> Self {
        Self {
            color_format,
            depth_format,
            blend_mode: BlendMode::default(),
            resources: None,
            sample_distance: [1.0; 3],
            cell_scale: [1.0; 3],
        }
    }

    #[must_use]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Sets the compositing mode folded into the opacity table.
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    /// Whether GPU resources have been created yet.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    /// Current per-axis ray step, the reciprocal of each bounds span.
    #[must_use]
    pub fn sample_distance(&self) -> [f64; 3] {
        self.sample_distance
    }

    /// Renders one frame into the provided attachments.
    ///
    /// A frame without a bound volume is reported as
    /// [`RenderError::InvalidInput`] and draws nothing. A volume whose
    /// scalar layout cannot be uploaded logs the failure and leaves the
    /// previous frame's caches untouched.
    pub fn render(
        &mut self,
        ctx: &GpuContext,
        frame: &mut FrameInputs<'_>,
        color_target: &wgpu::TextureView,
        depth_target: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
    ) -> RenderResult<()> {
        let Some(volume) = frame.volume.as_mut() else {
            return Err(RenderError::InvalidInput("no volume bound for this frame"));
        };

        if self.resources.is_none() {
            self.resources = Some(Self::init_resources(
                ctx,
                self.color_format,
                self.depth_format,
            )?);
            log::info!("ray-cast engine initialized");
        }
        // Disjoint borrows: resources mutate independently of the
        // cached step distances.
        let Self {
            resources,
            sample_distance,
            cell_scale,
            blend_mode,
            ..
        } = self;
        // Just initialized above.
        let res = resources.as_mut().expect("resources initialized");

        let range = volume.field.range();

        // Tables first, with the previous frame's step distance: the
        // step only moves when the volume's bounds do, and on that
        // frame the range comparison forces a table rebuild anyway.
        // Scalar-to-color mapping is defined for single-component data
        // only; other layouts keep whatever tables are already built.
        let mean_step = (sample_distance[0] + sample_distance[1] + sample_distance[2]) / 3.0;
        let (color_update, opacity_update) = if volume.field.num_components() == 1 {
            volume.color.ensure_default_points(range);
            volume.opacity.ensure_default_points(range);
            let opacity_table = res
                .opacity_tables
                .get_mut(0)
                .ok_or(RenderError::InvalidInput("no opacity table level"))?;
            let opacity_update = opacity_table.update(
                ctx,
                volume.opacity,
                *blend_mode,
                mean_step,
                volume.opacity_unit_distance,
                range,
                volume.interpolation_linear,
            )?;
            let color_update = res.color_table.update(
                ctx,
                volume.color,
                range,
                volume.interpolation_linear,
            )?;
            (color_update, opacity_update)
        } else {
            log::error!(
                "transfer-table update skipped: {}",
                RenderError::UnsupportedComponentLayout(volume.field.num_components())
            );
            (TableUpdate::default(), TableUpdate::default())
        };

        // Step derives from the world-space bounds spans, not texel
        // counts: voxel spacing need not be uniform.
        for axis in 0..3 {
            let span = volume.bounds.extent(axis);
            sample_distance[axis] = if span > 0.0 { 1.0 / span } else { 1.0 };
            cell_scale[axis] = span * 0.5;
        }

        // An unsupported scalar layout must not tear down a previously
        // loaded volume; report it and keep rendering stale data if any.
        let volume_rebuilt = match res.volume.ensure_fresh(ctx, volume.field) {
            Ok(rebuilt) => rebuilt,
            Err(err @ (RenderError::UnsupportedScalarType(_)
            | RenderError::UnsupportedComponentLayout(_))) => {
                log::error!("volume upload skipped: {err}");
                false
            }
            Err(err) => return Err(err),
        };
        if res.volume.view().is_none()
            || !res.color_table.is_loaded()
            || !res.opacity_tables.get(0).is_some_and(OpacityTable::is_loaded)
        {
            // Some cache was never built; there is nothing to draw yet.
            return Ok(());
        }

        res.geometry.refresh_if_changed(ctx, &volume.bounds);

        let invalidated = volume_rebuilt
            || color_update.rebuilt
            || color_update.filter_changed
            || opacity_update.rebuilt
            || opacity_update.filter_changed;
        if invalidated {
            res.texture_bind_group = None;
        }
        if res.texture_bind_group.is_none() {
            res.texture_bind_group = Some(Self::build_texture_bind_group(
                ctx,
                res,
                volume.interpolation_linear,
            )?);
        }

        let uniforms = Self::frame_uniforms(*sample_distance, *cell_scale, &frame.camera, volume);
        ctx.queue
            .write_buffer(&res.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        ctx.debug_scope("volume ray cast pass", || {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("volume ray cast pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_target,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    // Stencil aspect present in the attachment format;
                    // pass it through untouched.
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&res.pipeline);
            pass.set_bind_group(0, &res.frame_bind_group, &[]);
            if let Some(textures) = res.texture_bind_group.as_ref() {
                pass.set_bind_group(1, textures, &[]);
            }
            if let (Some(vertices), Some(indices)) =
                (res.geometry.vertex_buffer(), res.geometry.index_buffer())
            {
                pass.set_vertex_buffer(0, vertices.slice(..));
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..res.geometry.index_count(), 0, 0..1);
            }
        });

        Ok(())
    }

    fn frame_uniforms(
        sample_distance: [f64; 3],
        cell_scale: [f64; 3],
        camera: &CameraInputs,
        volume: &VolumeInputs<'_>,
    ) -> FrameUniforms {
        let b = &volume.bounds;
        FrameUniforms {
            modelview_matrix: camera.view.to_cols_array_2d(),
            projection_matrix: camera.projection.to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            enable_shading: u32::from(volume.enable_shading),
            step_size: sample_distance.map(|d| d as f32),
            _pad0: 0.0,
            cell_scale: cell_scale.map(|s| s as f32),
            _pad1: 0.0,
            vol_extents_min: b.min_corner().to_array(),
            _pad2: 0.0,
            vol_extents_max: b.max_corner().to_array(),
            _pad3: 0.0,
        }
    }

    fn init_resources(
        ctx: &GpuContext,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> RenderResult<EngineResources> {
        let interface = Self::build_interface();
        interface.validate_against(RAYCASTER_WGSL)?;

        let builder = ShaderBuilder::new()
            .with_label("ray caster shader")
            .with_source(RAYCASTER_WGSL);
        let module = builder.build_module(&ctx.device)?;

        let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("frame uniform layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let frame_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame uniform bind group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = Self::build_texture_layout(ctx, &interface);

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("ray caster pipeline layout"),
                bind_group_layouts: &[&frame_layout, &texture_layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("ray caster pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some(builder.vertex_entry()),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: 12,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: interface.attribute_location("in_vertex_pos"),
                        }],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some(builder.fragment_entry()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    ..wgpu::PrimitiveState::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: depth_format,
                    // The translucent volume tests against opaque
                    // geometry but never occludes it.
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let sampler_linear = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("volume sampler (linear)"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let sampler_nearest = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("volume sampler (nearest)"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(EngineResources {
            pipeline,
            interface,
            uniform_buffer,
            frame_bind_group,
            texture_layout,
            texture_bind_group: None,
            sampler_linear,
            sampler_nearest,
            volume: VolumeTexture::new(),
            color_table: ColorTable::new(),
            opacity_tables: OpacityTables::new(1),
            geometry: CubeGeometry::new(),
        })
    }

    /// Registers the fixed name contract between engine and shader.
    fn build_interface() -> ShaderInterface {
        let mut iface = ShaderInterface::new();
        iface.add_attribute("in_vertex_pos", 0);
        iface.add_uniform(
            "modelview_matrix",
            std::mem::offset_of!(FrameUniforms, modelview_matrix) as u64,
        );
        iface.add_uniform(
            "projection_matrix",
            std::mem::offset_of!(FrameUniforms, projection_matrix) as u64,
        );
        iface.add_uniform(
            "camera_pos",
            std::mem::offset_of!(FrameUniforms, camera_pos) as u64,
        );
        iface.add_uniform(
            "enable_shading",
            std::mem::offset_of!(FrameUniforms, enable_shading) as u64,
        );
        iface.add_uniform(
            "step_size",
            std::mem::offset_of!(FrameUniforms, step_size) as u64,
        );
        iface.add_uniform(
            "cell_scale",
            std::mem::offset_of!(FrameUniforms, cell_scale) as u64,
        );
        iface.add_uniform(
            "vol_extents_min",
            std::mem::offset_of!(FrameUniforms, vol_extents_min) as u64,
        );
        iface.add_uniform(
            "vol_extents_max",
            std::mem::offset_of!(FrameUniforms, vol_extents_max) as u64,
        );
        iface.add_texture("volume", 0);
        iface.add_texture("color_transfer_func", 1);
        iface.add_texture("opacity_transfer_func", 2);
        iface
    }

    fn build_texture_layout(
        ctx: &GpuContext,
        interface: &ShaderInterface,
    ) -> wgpu::BindGroupLayout {
        ctx.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("volume texture layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: interface.texture_binding("volume"),
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D3,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: interface.texture_binding("color_transfer_func"),
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D1,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: interface.texture_binding("opacity_transfer_func"),
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D1,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 4,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            })
    }

    fn build_texture_bind_group(
        ctx: &GpuContext,
        res: &EngineResources,
        linear: bool,
    ) -> RenderResult<wgpu::BindGroup> {
        let volume_view = res
            .volume
            .view()
            .ok_or(RenderError::InvalidInput("volume texture not built"))?;
        let color_view = res
            .color_table
            .view()
            .ok_or(RenderError::InvalidInput("color table not built"))?;
        let opacity_view = res
            .opacity_tables
            .get(0)
            .and_then(|t| t.view())
            .ok_or(RenderError::InvalidInput("opacity table not built"))?;

        let sampler = if linear {
            &res.sampler_linear
        } else {
            &res.sampler_nearest
        };

        Ok(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("volume texture bind group"),
            layout: &res.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: res.interface.texture_binding("volume"),
                    resource: wgpu::BindingResource::TextureView(volume_view),
                },
                wgpu::BindGroupEntry {
                    binding: res.interface.texture_binding("color_transfer_func"),
                    resource: wgpu::BindingResource::TextureView(color_view),
                },
                wgpu::BindGroupEntry {
                    binding: res.interface.texture_binding("opacity_transfer_func"),
                    resource: wgpu::BindingResource::TextureView(opacity_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 208);
        assert_eq!(std::mem::offset_of!(FrameUniforms, modelview_matrix), 0);
        assert_eq!(std::mem::offset_of!(FrameUniforms, projection_matrix), 64);
        assert_eq!(std::mem::offset_of!(FrameUniforms, camera_pos), 128);
        assert_eq!(std::mem::offset_of!(FrameUniforms, enable_shading), 140);
        assert_eq!(std::mem::offset_of!(FrameUniforms, step_size), 144);
        assert_eq!(std::mem::offset_of!(FrameUniforms, cell_scale), 160);
        assert_eq!(std::mem::offset_of!(FrameUniforms, vol_extents_min), 176);
        assert_eq!(std::mem::offset_of!(FrameUniforms, vol_extents_max), 192);
    }

    #[test]
    fn interface_names_all_present_in_shader() {
        let iface = RayCastEngine::build_interface();
        assert!(iface.validate_against(RAYCASTER_WGSL).is_ok());
    }

    #[test]
    fn texture_bindings_are_fixed() {
        let iface = RayCastEngine::build_interface();
        assert_eq!(iface.texture_binding("volume"), 0);
        assert_eq!(iface.texture_binding("color_transfer_func"), 1);
        assert_eq!(iface.texture_binding("opacity_transfer_func"), 2);
    }

    #[test]
    fn engine_starts_uninitialized() {
        let engine = RayCastEngine::new(
            wgpu::TextureFormat::Rgba16Float,
            wgpu::TextureFormat::Depth24PlusStencil8,
        );
        assert!(!engine.is_initialized());
        assert_eq!(engine.blend_mode(), BlendMode::Composite);
    }
}
