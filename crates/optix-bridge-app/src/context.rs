//! Sample context.

use std::sync::Arc;

use optix_bridge::cuda::{CudaContext, CudaStream};
use optix_bridge::{DeviceContext, DeviceContextOptions, LoaderConfig};
use tracing::info;

use crate::config::SampleConfig;

/// GPU state shared across all sample methods.
pub struct SampleContext {
    /// OptiX device context; dropped before the CUDA context.
    pub optix: DeviceContext,
    /// Stream launches and builds are issued on.
    pub stream: CudaStream,
    /// CUDA context of the selected device.
    pub cuda: Arc<CudaContext>,
    /// Frame buffer width.
    pub width: u32,
    /// Frame buffer height.
    pub height: u32,
}

impl SampleContext {
    /// Load OptiX and create the CUDA and OptiX contexts for `config`.
    pub fn new(config: &SampleConfig) -> anyhow::Result<Self> {
        let mut loader = LoaderConfig::new();
        if let Some(path) = &config.optix_library {
            loader = loader.library_path(path);
        }
        optix_bridge::init_with(&loader)?;

        let cuda = Arc::new(CudaContext::new(config.device)?);
        let (major, minor) = cuda.compute_capability();
        info!(
            "Using device {}: {} (sm_{}{})",
            config.device,
            cuda.device_name(),
            major,
            minor
        );

        let options = DeviceContextOptions::new()
            .log_level(config.log_level)
            .validation(config.validation);
        let optix = DeviceContext::new(&cuda, options)?;
        let stream = CudaStream::new(&cuda)?;

        Ok(Self {
            optix,
            stream,
            cuda,
            width: config.width,
            height: config.height,
        })
    }

    /// Number of pixels in the frame buffer.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
