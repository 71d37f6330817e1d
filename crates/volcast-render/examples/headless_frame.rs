//! Renders one frame of a synthetic volume without a window.
//!
//! Run with `RUST_LOG=debug cargo run --example headless_frame` to see
//! the cache and upload activity.

use glam::{Mat4, Vec3};
use volcast_core::{
    Bounds, ColorTransferFunction, Extents, OpacityTransferFunction, ScalarData, ScalarField,
};
use volcast_render::{
    CameraInputs, FrameInputs, GpuContext, RayCastEngine, RenderResult, VolumeInputs,
};

const SIZE: usize = 32;

/// A radial falloff field: dense at the center, empty at the corners.
fn synthetic_field() -> ScalarField {
    let mut data = Vec::with_capacity(SIZE * SIZE * SIZE);
    let center = (SIZE as f64 - 1.0) / 2.0;
    for z in 0..SIZE {
        for y in 0..SIZE {
            for x in 0..SIZE {
                let d = ((x as f64 - center).powi(2)
                    + (y as f64 - center).powi(2)
                    + (z as f64 - center).powi(2))
                .sqrt()
                    / center;
                data.push((255.0 * (1.0 - d.min(1.0))) as u8);
            }
        }
    }
    let max = SIZE as i32 - 1;
    ScalarField::new(
        ScalarData::UInt8(data),
        1,
        Extents([0, max, 0, max, 0, max]),
        [0.0, 255.0],
    )
    .expect("synthetic field is well formed")
}

fn main() -> RenderResult<()> {
    env_logger::init();

    let ctx = pollster::block_on(GpuContext::new_headless())?;

    let field = synthetic_field();
    let mut color = ColorTransferFunction::new();
    color.add_point(0.0, [0.0, 0.0, 0.3]);
    color.add_point(128.0, [0.8, 0.4, 0.0]);
    color.add_point(255.0, [1.0, 1.0, 0.9]);
    let mut opacity = OpacityTransferFunction::new();
    opacity.add_point(0.0, 0.0);
    opacity.add_point(255.0, 0.8);

    let color_target = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("color target"),
        size: wgpu::Extent3d {
            width: 512,
            height: 512,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_target = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth target"),
        size: wgpu::Extent3d {
            width: 512,
            height: 512,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth24PlusStencil8,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let color_view = color_target.create_view(&wgpu::TextureViewDescriptor::default());
    let depth_view = depth_target.create_view(&wgpu::TextureViewDescriptor::default());

    let eye = Vec3::new(2.0, 1.5, 2.0);
    let mut engine = RayCastEngine::new(
        wgpu::TextureFormat::Rgba16Float,
        wgpu::TextureFormat::Depth24PlusStencil8,
    );

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame encoder"),
        });
    // Clear both attachments; the engine loads, never clears.
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("clear pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &color_view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(0),
                store: wgpu::StoreOp::Store,
            }),
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    let mut frame = FrameInputs {
        volume: Some(VolumeInputs {
            field: &field,
            bounds: Bounds::default(),
            color: &mut color,
            opacity: &mut opacity,
            interpolation_linear: true,
            opacity_unit_distance: 1.0,
            enable_shading: true,
        }),
        camera: CameraInputs {
            view: Mat4::look_at_rh(eye, Vec3::splat(0.5), Vec3::Y),
            projection: Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 50.0),
            position: eye,
        },
    };

    engine.render(&ctx, &mut frame, &color_view, &depth_view, &mut encoder)?;
    ctx.queue.submit([encoder.finish()]);
    let _ = ctx.device.poll(wgpu::PollType::wait_indefinitely());

    log::info!("frame rendered, sample distance {:?}", engine.sample_distance());
    Ok(())
}
