//! CUDA context lifetime.

use crate::error::{CudaError, Result};
use crate::stream::CudaStream;
use cudarc::driver::sys::{self, CUdevice_attribute};
use optix_bridge_sys::CUcontext;
use std::sync::Arc;

/// The primary CUDA context of one device.
///
/// The context is bound to the creating thread. OptiX device contexts are
/// built on top of it and must not outlive it.
pub struct CudaContext {
    inner: Arc<cudarc::driver::CudaContext>,
    ordinal: i32,
    name: String,
    compute_capability: (i32, i32),
    total_memory: usize,
}

impl CudaContext {
    /// Create a context on the device with the given ordinal.
    pub fn new(ordinal: i32) -> Result<Self> {
        let count = cudarc::driver::CudaContext::device_count()?;
        if ordinal < 0 || ordinal >= count {
            return Err(CudaError::NoDevice { ordinal, count });
        }

        let inner = cudarc::driver::CudaContext::new(ordinal as usize)?;
        let name = inner.name()?;
        let device = inner.cu_device();

        let mut major = 0;
        let mut minor = 0;
        let mut total_memory = 0usize;
        // SAFETY: valid out pointers for each query on a live device handle.
        unsafe {
            sys::cuDeviceGetAttribute(
                &mut major,
                CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR,
                device,
            )
            .result()?;
            sys::cuDeviceGetAttribute(
                &mut minor,
                CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR,
                device,
            )
            .result()?;
            sys::cuDeviceTotalMem_v2(&mut total_memory, device).result()?;
        }

        tracing::info!(
            "Created CUDA context on device {} ({}, sm_{}{}, {} MiB)",
            ordinal,
            name,
            major,
            minor,
            total_memory / (1024 * 1024)
        );

        Ok(Self {
            inner,
            ordinal,
            name,
            compute_capability: (major, minor),
            total_memory,
        })
    }

    /// Get the raw `CUcontext`.
    pub fn raw(&self) -> CUcontext {
        self.inner.cu_ctx().cast()
    }

    /// Device ordinal this context was created on.
    pub fn ordinal(&self) -> i32 {
        self.ordinal
    }

    /// Device name reported by the driver.
    pub fn device_name(&self) -> &str {
        &self.name
    }

    /// Compute capability as `(major, minor)`.
    pub fn compute_capability(&self) -> (i32, i32) {
        self.compute_capability
    }

    /// Total device memory in bytes.
    pub fn total_memory(&self) -> usize {
        self.total_memory
    }

    /// Make this context current on the calling thread.
    pub fn make_current(&self) -> Result<()> {
        Ok(self.inner.bind_to_thread()?)
    }

    /// Block until all work in this context has completed.
    pub fn synchronize(&self) -> Result<()> {
        Ok(self.inner.synchronize()?)
    }

    /// The legacy default stream of this context.
    pub fn default_stream(&self) -> CudaStream {
        CudaStream::from_inner(self.inner.default_stream())
    }

    /// Create a new non-blocking stream.
    pub fn create_stream(&self) -> Result<CudaStream> {
        CudaStream::new(self)
    }

    pub(crate) fn inner(&self) -> &Arc<cudarc::driver::CudaContext> {
        &self.inner
    }
}

impl std::fmt::Debug for CudaContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaContext")
            .field("ordinal", &self.ordinal)
            .field("name", &self.name)
            .field("compute_capability", &self.compute_capability)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn create_context_on_first_device() {
        let context = CudaContext::new(0).expect("context");
        assert!(!context.raw().is_null());
        assert!(!context.device_name().is_empty());
        assert!(context.compute_capability().0 >= 5);
        assert!(context.total_memory() > 0);
        context.synchronize().expect("synchronize");
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn out_of_range_ordinal_is_rejected() {
        let err = CudaContext::new(i32::MAX).expect_err("no such device");
        assert!(matches!(err, CudaError::NoDevice { .. }));
        let err = CudaContext::new(-1).expect_err("negative ordinal");
        assert!(matches!(err, CudaError::NoDevice { ordinal: -1, .. }));
    }
}
