//! Sample 01: bring up CUDA and OptiX.
//!
//! Loads the OptiX library, creates a CUDA context on the selected device
//! and an OptiX device context on top of it, then tears everything down.
//!
//! ```bash
//! cargo run -p sample01 -- --device 0 --validation
//! ```

use optix_bridge_app::{run_sample, FrameContext, Sample, SampleConfig, SampleContext};
use tracing::info;

struct Startup;

impl Sample for Startup {
    fn init(ctx: &mut SampleContext) -> anyhow::Result<Self> {
        info!(
            "OptiX device context ready on {} ({} MiB)",
            ctx.cuda.device_name(),
            ctx.cuda.total_memory() / (1024 * 1024)
        );
        Ok(Self)
    }

    fn render(&mut self, _ctx: &SampleContext, _frame: &FrameContext) -> anyhow::Result<()> {
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    run_sample::<Startup>(SampleConfig::from_args("Sample 01: initialization").with_frames(0))
}
