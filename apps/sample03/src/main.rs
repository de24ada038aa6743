//! Sample 03: an animated frame buffer.
//!
//! Renders a gradient that shifts with the frame id for `-n` frames. Each
//! captured frame is read back, flipped vertically and written as PNG.
//!
//! ```bash
//! cargo run -p sample03 -- -n 60 --capture 0,30-32 -o sample03_{}.png
//! ```

mod programs;

use optix_bridge::cuda::DeviceBuffer;
use optix_bridge_app::screenshot::{bgra_to_rgba, count_mismatches, flip_vertical};
use optix_bridge_app::{
    run_sample, FrameContext, RadiancePrograms, Sample, SampleConfig, SampleContext,
};
use tracing::{debug, warn};

use crate::programs::{animated_pixel, render_frame, LaunchParams};

struct Animated {
    programs: RadiancePrograms,
    color_buffer: DeviceBuffer<u32>,
    params: LaunchParams,
}

impl Sample for Animated {
    fn init(ctx: &mut SampleContext) -> anyhow::Result<Self> {
        let programs = RadiancePrograms::new(ctx, &render_frame())?;
        let color_buffer = DeviceBuffer::zeroed(&ctx.cuda, ctx.pixel_count())?;
        let params = LaunchParams {
            color_buffer: color_buffer.device_ptr(),
            fb_size_x: ctx.width as i32,
            fb_size_y: ctx.height as i32,
            ..LaunchParams::default()
        };
        Ok(Self {
            programs,
            color_buffer,
            params,
        })
    }

    fn render(&mut self, ctx: &SampleContext, frame: &FrameContext) -> anyhow::Result<()> {
        self.params.frame_id = frame.frame_id();
        self.programs.launch(ctx, &self.params)?.finish()?;
        debug!("Rendered frame {}", self.params.frame_id);
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
    run_sample::<Animated>(
        SampleConfig::from_args("Sample 03: animated frame buffer")
            .with_default_output("sample03_{}.png"),
    )
}
