//! Sample 04: a triangle mesh acceleration structure.
//!
//! Builds a mesh of two boxes (a floor slab and a cube), uploads it, builds
//! a compacted geometry acceleration structure and passes its traversable
//! handle and a look-at camera to the raygen program through the launch
//! parameters. Frames are flipped vertically and written as PNG.
//!
//! ```bash
//! cargo run -p sample04 -- -n 10 -o sample04_{}.png
//! ```

mod camera;
mod mesh;
mod programs;

use glam::Vec3;
use optix_bridge::cuda::DeviceBuffer;
use optix_bridge::{Accel, AccelBuildOptions, BuildFlags, IndicesFormat, TriangleArray, VertexFormat};
use optix_bridge_app::screenshot::{bgra_to_rgba, count_mismatches, flip_vertical};
use optix_bridge_app::{
    run_sample, FrameContext, RadiancePrograms, Sample, SampleConfig, SampleContext,
};
use tracing::{debug, info, warn};

use crate::camera::Camera;
use crate::mesh::TriangleMesh;
use crate::programs::{animated_pixel, render_frame, LaunchParams};

/// The scene: a 10x0.1x10 floor below a 2x2x2 cube at the origin.
fn scene() -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    mesh.add_cube(Vec3::new(0.0, -1.5, 0.0), Vec3::new(10.0, 0.1, 10.0));
    mesh.add_cube(Vec3::ZERO, Vec3::splat(2.0));
    mesh
}

fn scene_camera() -> Camera {
    Camera::new(Vec3::new(-10.0, 2.0, -12.0), Vec3::ZERO, Vec3::Y, 40.0)
}

fn build_accel(ctx: &SampleContext, mesh: &TriangleMesh) -> anyhow::Result<Accel> {
    if let Some((lo, hi)) = mesh.bounds() {
        debug!("Scene bounds {} .. {}", lo, hi);
    }
    let vertices = DeviceBuffer::from_slice(&ctx.cuda, &mesh.vertices)?;
    let indices = DeviceBuffer::from_slice(&ctx.cuda, &mesh.indices)?;
    let input = TriangleArray::new(&vertices, VertexFormat::Float3)
        .indices(&indices, IndicesFormat::UnsignedInt3);

    let accel = Accel::build(
        &ctx.optix,
        &ctx.stream,
        &AccelBuildOptions::new(BuildFlags::ALLOW_COMPACTION),
        &[input.into()],
    )?;
    info!(
        "Scene: {} vertices, {} triangles, {} B acceleration structure",
        mesh.vertices.len(),
        mesh.indices.len(),
        accel.buffer().size_in_bytes()
    );
    Ok(accel)
}

struct MeshScene {
    programs: RadiancePrograms,
    // Backs the traversable handle in `params`.
    _accel: Accel,
    color_buffer: DeviceBuffer<u32>,
    params: LaunchParams,
}

impl Sample for MeshScene {
    fn init(ctx: &mut SampleContext) -> anyhow::Result<Self> {
        let programs = RadiancePrograms::new(ctx, &render_frame())?;
        let accel = build_accel(ctx, &scene())?;
        let color_buffer = DeviceBuffer::zeroed(&ctx.cuda, ctx.pixel_count())?;

        let params = LaunchParams {
            color_buffer: color_buffer.device_ptr(),
            camera: scene_camera().params(ctx.width, ctx.height),
            traversable: accel.handle(),
            ..LaunchParams::default()
        };

        Ok(Self {
            programs,
            _accel: accel,
            color_buffer,
            params,
        })
    }

    fn render(&mut self, ctx: &SampleContext, frame: &FrameContext) -> anyhow::Result<()> {
        self.params.frame_id = frame.frame_id();
        self.programs.launch(ctx, &self.params)?.finish()?;
        Ok(())
    }

    fn read_pixels(&self, ctx: &SampleContext) -> anyhow::Result<Option<Vec<u32>>> {
        let mut pixels = self.color_buffer.to_vec()?;
        let frame_id = self.params.frame_id;
        let mismatches = count_mismatches(&pixels, ctx.width as usize, |x, y| {
            animated_pixel(x, y, frame_id)
        });
        if mismatches > 0 {
            warn!("Frame {}: {} pixels differ from the host pattern", frame_id, mismatches);
        }
        flip_vertical(&mut pixels, ctx.width as usize);
        bgra_to_rgba(&mut pixels);
        Ok(Some(pixels))
    }
}

fn main() -> anyhow::Result<()> {
    run_sample::<MeshScene>(
        SampleConfig::from_args("Sample 04: triangle mesh").with_default_output("sample04_{}.png"),
    )
}
