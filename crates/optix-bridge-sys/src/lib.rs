//! Raw ABI mirror of the OptiX 7 host API.
//!
//! This crate contains no logic. It declares:
//! - ABI constants (function table version, SBT record alignment, header size)
//! - Opaque handle types and CUDA driver handle aliases
//! - `#[repr(C)]` records laid out exactly as the vendor headers
//! - The versioned function table returned by `optixQueryFunctionTable`
//!
//! Everything here is consumed through the safe `optix-bridge` crate.

#![allow(non_camel_case_types)]

mod function_table;
mod records;
mod result;
mod types;

pub use function_table::*;
pub use records::*;
pub use result::OptixResult;
pub use types::*;

use std::ffi::c_void;

/// Function table ABI version this binding was written against.
pub const OPTIX_ABI_VERSION: i32 = 41;

/// Required alignment of every shader binding table record.
pub const OPTIX_SBT_RECORD_ALIGNMENT: usize = 16;

/// Size of the opaque header at the start of every SBT record.
pub const OPTIX_SBT_RECORD_HEADER_SIZE: usize = 32;

/// Size of the build input union payload.
pub const OPTIX_BUILD_INPUT_UNION_SIZE: usize = 1024;

/// Required alignment of acceleration structure output and temp buffers.
pub const OPTIX_ACCEL_BUFFER_BYTE_ALIGNMENT: usize = 128;

/// Required alignment of AABB input buffers.
pub const OPTIX_AABB_BUFFER_BYTE_ALIGNMENT: usize = 8;

/// Required alignment of instance input buffers.
pub const OPTIX_INSTANCE_BYTE_ALIGNMENT: usize = 16;

/// Upper bound of `OptixPipelineLinkOptions::maxTraceDepth`.
pub const OPTIX_MAX_TRACE_DEPTH: u32 = 31;

/// Symbol exported by the driver library that fills in the function table.
pub const OPTIX_QUERY_FUNCTION_TABLE_SYMBOL: &[u8] = b"optixQueryFunctionTable\0";

/// CUDA context handle (`CUcontext`).
pub type CUcontext = *mut c_void;
/// CUDA stream handle (`CUstream`).
pub type CUstream = *mut c_void;
/// CUDA device pointer (`CUdeviceptr`).
pub type CUdeviceptr = u64;

/// Opaque OptiX device context.
pub type OptixDeviceContext = *mut c_void;
/// Opaque OptiX module.
pub type OptixModule = *mut c_void;
/// Opaque OptiX program group.
pub type OptixProgramGroup = *mut c_void;
/// Opaque OptiX pipeline.
pub type OptixPipeline = *mut c_void;
/// Opaque OptiX denoiser.
pub type OptixDenoiser = *mut c_void;
/// Traversable handle produced by acceleration structure builds.
pub type OptixTraversableHandle = u64;
