//! CUDA error types.

use cudarc::driver::DriverError;
use thiserror::Error;

/// CUDA driver errors.
#[derive(Error, Debug)]
pub enum CudaError {
    /// A driver call returned a non-success `CUresult`.
    #[error("CUDA driver error {name} ({code})")]
    Driver { code: i32, name: String },

    /// No device with the requested ordinal.
    #[error("CUDA device {ordinal} not found ({count} available)")]
    NoDevice { ordinal: i32, count: i32 },

    /// Invalid argument passed to a host-side helper.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CudaError {
    /// The raw `CUresult`, if this error came from the driver.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Driver { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<DriverError> for CudaError {
    fn from(err: DriverError) -> Self {
        let name = err.error_name().map_or_else(
            |_| format!("{:?}", err.0),
            |name| name.to_string_lossy().into_owned(),
        );
        Self::Driver {
            code: err.0 as i32,
            name,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, CudaError>;
