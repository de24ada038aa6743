//! CUDA host surface for the OptiX bridge.
//!
//! Thin wrappers over `cudarc`'s driver API:
//! - Device selection and context lifetime
//! - Streams
//! - Typed device buffers whose address can be handed to OptiX

pub mod buffer;
pub mod context;
pub mod error;
pub mod stream;

pub use buffer::DeviceBuffer;
pub use context::CudaContext;
pub use error::{CudaError, Result};
pub use stream::CudaStream;

pub use optix_bridge_sys::{CUcontext, CUdeviceptr, CUstream};
