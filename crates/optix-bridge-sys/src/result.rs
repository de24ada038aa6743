//! Native result codes.

use std::fmt;

/// Result code returned by every OptiX entry point.
///
/// Transparent integer: the driver may return codes not listed here.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptixResult(pub i32);

macro_rules! result_codes {
    ($($name:ident = $value:literal),* $(,)?) => {
        impl OptixResult {
            $(pub const $name: Self = Self($value);)*

            /// Vendor identifier of this code, or `None` if it is not a known code.
            pub fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some(concat!("OPTIX_", stringify!($name))),)*
                    _ => None,
                }
            }
        }
    };
}

result_codes! {
    SUCCESS = 0,
    ERROR_INVALID_VALUE = 7001,
    ERROR_HOST_OUT_OF_MEMORY = 7002,
    ERROR_INVALID_OPERATION = 7003,
    ERROR_FILE_IO_ERROR = 7004,
    ERROR_INVALID_FILE_FORMAT = 7005,
    ERROR_DISK_CACHE_INVALID_PATH = 7010,
    ERROR_DISK_CACHE_PERMISSION_ERROR = 7011,
    ERROR_DISK_CACHE_DATABASE_ERROR = 7012,
    ERROR_DISK_CACHE_INVALID_DATA = 7013,
    ERROR_LAUNCH_FAILURE = 7050,
    ERROR_INVALID_DEVICE_CONTEXT = 7051,
    ERROR_CUDA_NOT_INITIALIZED = 7052,
    ERROR_VALIDATION_FAILURE = 7053,
    ERROR_INVALID_PTX = 7200,
    ERROR_INVALID_LAUNCH_PARAMETER = 7201,
    ERROR_INVALID_PAYLOAD_ACCESS = 7202,
    ERROR_INVALID_ATTRIBUTE_ACCESS = 7203,
    ERROR_INVALID_FUNCTION_USE = 7204,
    ERROR_INVALID_FUNCTION_ARGUMENTS = 7205,
    ERROR_PIPELINE_OUT_OF_CONSTANT_MEMORY = 7250,
    ERROR_PIPELINE_LINK_ERROR = 7251,
    ERROR_INTERNAL_COMPILER_ERROR = 7299,
    ERROR_DENOISER_MODEL_NOT_SET = 7300,
    ERROR_DENOISER_NOT_INITIALIZED = 7301,
    ERROR_ACCEL_NOT_COMPATIBLE = 7400,
    ERROR_NOT_SUPPORTED = 7800,
    ERROR_UNSUPPORTED_ABI_VERSION = 7801,
    ERROR_FUNCTION_TABLE_SIZE_MISMATCH = 7802,
    ERROR_INVALID_ENTRY_FUNCTION_OPTIONS = 7803,
    ERROR_LIBRARY_NOT_FOUND = 7804,
    ERROR_ENTRY_SYMBOL_NOT_FOUND = 7805,
    ERROR_LIBRARY_UNLOAD_FAILURE = 7806,
    ERROR_CUDA_ERROR = 7900,
    ERROR_INTERNAL_ERROR = 7990,
    ERROR_UNKNOWN = 7999,
}

impl OptixResult {
    /// Whether this is `OPTIX_SUCCESS`.
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl fmt::Debug for OptixResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "OptixResult({})", self.0),
        }
    }
}

impl fmt::Display for OptixResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "unknown OptiX result ({})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_vendor_names() {
        assert_eq!(OptixResult::SUCCESS.name(), Some("OPTIX_SUCCESS"));
        assert_eq!(
            OptixResult::ERROR_LIBRARY_NOT_FOUND.name(),
            Some("OPTIX_ERROR_LIBRARY_NOT_FOUND")
        );
        assert_eq!(OptixResult(7804), OptixResult::ERROR_LIBRARY_NOT_FOUND);
    }

    #[test]
    fn unknown_code_is_preserved() {
        let result = OptixResult(1234);
        assert_eq!(result.name(), None);
        assert_eq!(result.to_string(), "unknown OptiX result (1234)");
        assert!(!result.is_success());
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(
            OptixResult::ERROR_VALIDATION_FAILURE.to_string(),
            "OPTIX_ERROR_VALIDATION_FAILURE (7053)"
        );
    }
}
