//! OptiX binding errors.

use optix_bridge_cuda::CudaError;
use optix_bridge_ptx::PtxError;
use optix_bridge_sys::OptixResult;
use std::ffi::NulError;
use thiserror::Error;

/// Errors raised by the OptiX binding.
#[derive(Error, Debug)]
pub enum Error {
    /// A native call returned a non-success code.
    #[error("{}", describe(.result, .log))]
    Optix { result: OptixResult, log: String },

    /// The process-wide API has not been initialized.
    #[error("OptiX API not initialized")]
    NotInitialized,

    /// The driver's function table has no entry for a call.
    #[error("OptiX function table entry {0} is missing")]
    MissingEntry(&'static str),

    /// An explicitly configured library could not be loaded.
    #[error("Failed to load OptiX library: {0}")]
    Load(String),

    /// SBT record type whose size is not a multiple of 16 bytes.
    #[error("SBT record size {size} is not a multiple of OPTIX_SBT_RECORD_ALIGNMENT (16)")]
    MisalignedSbtRecord { size: usize },

    /// Argument rejected before reaching the driver.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Cuda(#[from] CudaError),

    #[error(transparent)]
    Ptx(#[from] PtxError),

    #[error("String contains an interior NUL byte: {0}")]
    Nul(#[from] NulError),
}

fn describe(result: &OptixResult, log: &str) -> String {
    if log.is_empty() {
        format!("OptiX call failed: {result}")
    } else {
        format!("OptiX call failed: {result}\n{log}")
    }
}

impl Error {
    /// Error for a native result code without a log.
    pub fn from_result(result: OptixResult) -> Self {
        Self::Optix {
            result,
            log: String::new(),
        }
    }

    /// The OptiX result code this error corresponds to.
    pub fn result(&self) -> OptixResult {
        match self {
            Self::Optix { result, .. } => *result,
            Self::MisalignedSbtRecord { .. } => OptixResult::ERROR_VALIDATION_FAILURE,
            Self::MissingEntry(_) => OptixResult::ERROR_ENTRY_SYMBOL_NOT_FOUND,
            Self::Load(_) => OptixResult::ERROR_LIBRARY_NOT_FOUND,
            Self::InvalidArgument(_) | Self::Nul(_) => OptixResult::ERROR_INVALID_VALUE,
            Self::Cuda(_) => OptixResult::ERROR_CUDA_ERROR,
            Self::NotInitialized | Self::Ptx(_) => OptixResult::ERROR_UNKNOWN,
        }
    }

    /// Diagnostic log captured from the failing native call, if any.
    pub fn log(&self) -> Option<&str> {
        match self {
            Self::Optix { log, .. } if !log.is_empty() => Some(log),
            _ => None,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Fail on any non-success code.
#[inline]
pub fn check(result: OptixResult) -> Result<()> {
    check_with_log(result, String::new())
}

/// Fail on any non-success code, attaching the native log to the error.
///
/// A log produced by a successful call is forwarded to `tracing` at debug
/// level.
pub fn check_with_log(result: OptixResult, log: String) -> Result<()> {
    if result.is_success() {
        if !log.is_empty() {
            tracing::debug!("[OptiX] {}", log);
        }
        Ok(())
    } else {
        Err(Error::Optix { result, log })
    }
}
