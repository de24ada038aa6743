//! Sample framework for the OptiX bridge.
//!
//! This crate handles the boilerplate shared by the console samples:
//! - Command line configuration
//! - OptiX loading and CUDA/OptiX context creation
//! - The frame loop
//! - Writing captured frames to image files
//!
//! # Example
//!
//! ```no_run
//! use optix_bridge_app::{run_sample, FrameContext, Sample, SampleConfig, SampleContext};
//!
//! struct MySample;
//!
//! impl Sample for MySample {
//!     fn init(ctx: &mut SampleContext) -> anyhow::Result<Self> {
//!         Ok(MySample)
//!     }
//!
//!     fn render(&mut self, ctx: &SampleContext, frame: &FrameContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_sample::<MySample>(SampleConfig::from_args("My sample"))
//! }
//! ```

mod config;
mod context;
mod frame;
pub mod presets;
mod runner;
mod sample;
pub mod screenshot;

pub use config::{SampleConfig, DEFAULT_HEIGHT, DEFAULT_WIDTH};
pub use context::SampleContext;
pub use frame::FrameContext;
pub use presets::{ObjectRecord, RadiancePrograms};
pub use runner::{init_logging, run_sample};
pub use sample::Sample;

pub use optix_bridge;
