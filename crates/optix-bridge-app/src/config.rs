//! Sample configuration parsed from the command line.

use crate::screenshot::{output_path, parse_frame_indices};
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;

/// Frame buffer width used by every sample.
pub const DEFAULT_WIDTH: u32 = 1200;
/// Frame buffer height used by every sample.
pub const DEFAULT_HEIGHT: u32 = 1024;

/// Command line options shared by the samples.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct SampleConfig {
    /// Name logged at startup.
    #[arg(skip)]
    pub title: String,

    /// CUDA device ordinal.
    #[arg(short, long, default_value_t = 0)]
    pub device: i32,

    /// Frame buffer width in pixels.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// Frame buffer height in pixels.
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Number of frames to render.
    #[arg(short = 'n', long, default_value_t = 1)]
    pub frames: u64,

    /// Frames to write out, e.g. "0,5-7". Defaults to the last frame.
    #[arg(short = 'c', long)]
    pub capture: Option<String>,

    /// Output path pattern; `{}` is replaced by the frame number.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Enable OptiX validation mode.
    #[arg(long)]
    pub validation: bool,

    /// Highest OptiX log level forwarded to the logger (0-4).
    #[arg(long, default_value_t = 4)]
    pub log_level: u32,

    /// Load the OptiX library from this path.
    #[arg(long, env = "OPTIX_LIBRARY_PATH")]
    pub optix_library: Option<PathBuf>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            title: "OptiX sample".to_string(),
            device: 0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            frames: 1,
            capture: None,
            output: None,
            validation: false,
            log_level: 4,
            optix_library: None,
        }
    }
}

impl SampleConfig {
    /// Parse the process arguments and set the title.
    pub fn from_args(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::parse()
        }
    }

    /// Set the frame buffer size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the number of frames to render.
    pub fn with_frames(mut self, frames: u64) -> Self {
        self.frames = frames;
        self
    }

    /// Use `pattern` unless an output was given on the command line.
    pub fn with_default_output(mut self, pattern: impl Into<String>) -> Self {
        if self.output.is_none() {
            self.output = Some(pattern.into());
        }
        self
    }

    /// Frames whose output is written.
    pub fn capture_frames(&self) -> HashSet<u64> {
        match &self.capture {
            Some(spec) => parse_frame_indices(spec, self.frames),
            None if self.frames > 0 => HashSet::from([self.frames - 1]),
            None => HashSet::new(),
        }
    }

    /// Output file for `frame`, if any output is configured.
    pub fn output_path(&self, frame: u64) -> Option<PathBuf> {
        self.output.as_deref().map(|pattern| output_path(pattern, frame))
    }

    /// Number of pixels in the frame buffer.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sample_frame_buffer() {
        let config = SampleConfig::try_parse_from(["sample"]).unwrap();
        assert_eq!(config.width, 1200);
        assert_eq!(config.height, 1024);
        assert_eq!(config.frames, 1);
        assert_eq!(config.pixel_count(), 1200 * 1024);
    }

    #[test]
    fn last_frame_is_captured_by_default() {
        let config = SampleConfig::default().with_frames(10);
        assert_eq!(config.capture_frames(), HashSet::from([9]));
        assert!(SampleConfig::default().with_frames(0).capture_frames().is_empty());
    }

    #[test]
    fn capture_list_overrides_default() {
        let config =
            SampleConfig::try_parse_from(["sample", "-n", "8", "--capture", "0,2-3"]).unwrap();
        assert_eq!(config.capture_frames(), HashSet::from([0, 2, 3]));
    }

    #[test]
    fn open_ended_capture_is_clamped_to_frame_count() {
        let config = SampleConfig::try_parse_from([
            "sample",
            "-n",
            "3",
            "--capture",
            "1-18446744073709551615",
        ])
        .unwrap();
        assert_eq!(config.capture_frames(), HashSet::from([1, 2]));
    }

    #[test]
    fn command_line_output_wins() {
        let config = SampleConfig::try_parse_from(["sample", "-o", "out_{}.png"])
            .unwrap()
            .with_default_output("frame_{}.png");
        assert_eq!(config.output_path(3), Some(PathBuf::from("out_3.png")));

        let config = SampleConfig::default().with_default_output("frame_{}.png");
        assert_eq!(config.output_path(7), Some(PathBuf::from("frame_7.png")));
        assert_eq!(SampleConfig::default().output_path(0), None);
    }
}
