//! Sample runner and frame loop.

use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::SampleConfig;
use crate::context::SampleContext;
use crate::frame::FrameContext;
use crate::sample::Sample;
use crate::screenshot::save_rgba;

/// Install the `tracing` subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

/// Run a sample with the given configuration.
///
/// Initializes logging, loads OptiX, renders `config.frames` frames and
/// writes the captured ones to `config.output`.
pub fn run_sample<S: Sample>(config: SampleConfig) -> anyhow::Result<()> {
    init_logging();
    info!("Starting {}", config.title);

    let result = run_frames::<S>(&config);
    if let Err(e) = &result {
        error!("{} failed: {:#}", config.title, e);
    }
    optix_bridge::uninit();
    result
}

fn run_frames<S: Sample>(config: &SampleConfig) -> anyhow::Result<()> {
    let mut ctx = SampleContext::new(config)?;
    let mut sample = S::init(&mut ctx)?;

    let capture = config.capture_frames();
    let start = Instant::now();
    let mut outcome = Ok(());

    for frame_number in 0..config.frames {
        let frame = FrameContext::new(frame_number, ctx.width, ctx.height);
        if let Err(e) = sample.render(&ctx, &frame) {
            outcome = Err(e);
            break;
        }

        if !capture.contains(&frame_number) {
            continue;
        }
        let Some(path) = config.output_path(frame_number) else {
            continue;
        };
        match sample.read_pixels(&ctx) {
            Ok(Some(pixels)) => {
                if let Err(e) = save_rgba(&pixels, ctx.width, ctx.height, &path) {
                    outcome = Err(e.into());
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }

    if outcome.is_ok() && config.frames > 0 {
        let elapsed = start.elapsed();
        info!(
            "Rendered {} frames in {:.2?} ({:.2?} per frame)",
            config.frames,
            elapsed,
            elapsed / config.frames as u32
        );
    }

    ctx.stream.synchronize()?;
    sample.cleanup(&mut ctx);
    outcome
}
