//! `Sample` trait definition.

use crate::context::SampleContext;
use crate::frame::FrameContext;

/// Trait for console samples.
///
/// The runner creates the GPU contexts, drives the frame loop and writes
/// captured frames to disk.
pub trait Sample: Sized {
    /// Initialize the sample.
    ///
    /// Called once after the CUDA and OptiX contexts have been created.
    fn init(ctx: &mut SampleContext) -> anyhow::Result<Self>;

    /// Render a frame.
    ///
    /// Launches may be left in flight; the runner reads pixels only after
    /// `render` returns.
    fn render(&mut self, ctx: &SampleContext, frame: &FrameContext) -> anyhow::Result<()>;

    /// Copy the last rendered frame to the host as packed RGBA, row 0 on top.
    ///
    /// Samples without an image return `None`.
    fn read_pixels(&self, _ctx: &SampleContext) -> anyhow::Result<Option<Vec<u32>>> {
        Ok(None)
    }

    /// Cleanup before the contexts are destroyed.
    fn cleanup(&mut self, _ctx: &mut SampleContext) {}
}
