//! CUDA streams.

use crate::context::CudaContext;
use crate::error::Result;
use optix_bridge_sys::CUstream;
use std::sync::Arc;

/// A CUDA stream. Clones share the same underlying stream.
#[derive(Clone)]
pub struct CudaStream {
    inner: Arc<cudarc::driver::CudaStream>,
}

impl CudaStream {
    /// Create a non-blocking stream in `context`.
    pub fn new(context: &CudaContext) -> Result<Self> {
        let inner = context.inner().new_stream()?;
        tracing::debug!("Created CUDA stream {:?}", inner.cu_stream());
        Ok(Self { inner })
    }

    pub(crate) fn from_inner(inner: Arc<cudarc::driver::CudaStream>) -> Self {
        Self { inner }
    }

    /// Get the raw `CUstream`. Null for the default stream.
    pub fn raw(&self) -> CUstream {
        self.inner.cu_stream().cast()
    }

    /// Whether this is the legacy default stream.
    pub fn is_default(&self) -> bool {
        self.raw().is_null()
    }

    /// Block until all work queued on this stream has completed.
    pub fn synchronize(&self) -> Result<()> {
        Ok(self.inner.synchronize()?)
    }

    pub(crate) fn inner(&self) -> &Arc<cudarc::driver::CudaStream> {
        &self.inner
    }
}

impl std::fmt::Debug for CudaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaStream").field("raw", &self.raw()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn create_and_synchronize_stream() {
        let context = CudaContext::new(0).expect("context");
        let stream = context.create_stream().expect("stream");
        assert!(!stream.is_default());
        stream.synchronize().expect("synchronize");

        let default = context.default_stream();
        assert!(default.is_default());
        default.synchronize().expect("synchronize default");
    }
}
