//! Sample 02: a raygen-only pipeline.
//!
//! Builds raygen, miss and hit group programs, links them into a pipeline,
//! launches one thread per pixel to draw a colour gradient into a
//! 1200x1024 buffer and writes it to `sample02.png`.
//!
//! ```bash
//! cargo run -p sample02 -- -o gradient.png
//! ```

mod programs;

use optix_bridge::cuda::DeviceBuffer;
use optix_bridge_app::screenshot::count_mismatches;
use optix_bridge_app::{
    run_sample, FrameContext, RadiancePrograms, Sample, SampleConfig, SampleContext,
};
use tracing::{info, warn};

use crate::programs::{gradient_pixel, render_frame, LaunchParams};

struct Gradient {
    programs: RadiancePrograms,
    color_buffer: DeviceBuffer<u32>,
}

impl Sample for Gradient {
    fn init(ctx: &mut SampleContext) -> anyhow::Result<Self> {
        let programs = RadiancePrograms::new(ctx, &render_frame())?;
        let color_buffer = DeviceBuffer::zeroed(&ctx.cuda, ctx.pixel_count())?;
        Ok(Self {
            programs,
            color_buffer,
        })
    }

    fn render(&mut self, ctx: &SampleContext, frame: &FrameContext) -> anyhow::Result<()> {
        let params = LaunchParams {
            frame_id: frame.frame_id(),
            color_buffer: self.color_buffer.device_ptr(),
            fb_size_x: frame.width as i32,
            fb_size_y: frame.height as i32,
            ..LaunchParams::default()
        };
        self.programs.launch(ctx, &params)?.finish()?;
        Ok(())
    }

    fn read_pixels(&self, ctx: &SampleContext) -> anyhow::Result<Option<Vec<u32>>> {
        let pixels = self.color_buffer.to_vec()?;
        let mismatches = count_mismatches(&pixels, ctx.width as usize, gradient_pixel);
        if mismatches == 0 {
            info!("Frame buffer matches the host gradient");
        } else {
            warn!("{} of {} pixels differ from the host gradient", mismatches, pixels.len());
        }
        Ok(Some(pixels))
    }
}

fn main() -> anyhow::Result<()> {
    run_sample::<Gradient>(
        SampleConfig::from_args("Sample 02: raygen gradient").with_default_output("sample02.png"),
    )
}
