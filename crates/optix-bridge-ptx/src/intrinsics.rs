//! OptiX device intrinsics as PTX call sites.
//!
//! OptiX resolves calls to `_optix_*` functions when it links a module.
//! Kernels authored as PTX use these helpers to emit the call sequences.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Component of a launch index or dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    const fn suffix(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }
}

/// `reg = optixGetLaunchIndex().<axis>`; `reg` is a 32-bit register such as `%r1`.
pub fn launch_index(axis: Axis, reg: &str) -> String {
    format!("call ({reg}), _optix_get_launch_index_{}, ();", axis.suffix())
}

/// `reg = optixGetLaunchDimensions().<axis>`.
pub fn launch_dimension(axis: Axis, reg: &str) -> String {
    format!("call ({reg}), _optix_get_launch_dimension_{}, ();", axis.suffix())
}

/// `reg = optixGetSbtDataPointer()`; `reg` is a 64-bit register.
pub fn sbt_data_pointer(reg: &str) -> String {
    format!("call ({reg}), _optix_get_sbt_data_ptr_64, ();")
}

/// `reg = optixGetPrimitiveIndex()`.
pub fn primitive_index(reg: &str) -> String {
    format!("call ({reg}), _optix_read_primitive_idx, ();")
}

static INTRINSIC: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"_optix_\w+").ok());

/// Names of the OptiX intrinsics a module calls.
pub fn used_intrinsics(ptx: &str) -> BTreeSet<String> {
    INTRINSIC
        .as_ref()
        .map(|re| re.find_iter(ptx).map(|m| m.as_str().to_string()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_index_call() {
        assert_eq!(
            launch_index(Axis::X, "%r1"),
            "call (%r1), _optix_get_launch_index_x, ();"
        );
        assert_eq!(
            launch_dimension(Axis::Z, "%r7"),
            "call (%r7), _optix_get_launch_dimension_z, ();"
        );
    }

    #[test]
    fn collects_distinct_intrinsics() {
        let ptx = format!(
            "{}\n{}\n{}\n{}\n",
            launch_index(Axis::X, "%r1"),
            launch_index(Axis::Y, "%r2"),
            launch_index(Axis::X, "%r3"),
            sbt_data_pointer("%rd1"),
        );
        let used: Vec<_> = used_intrinsics(&ptx).into_iter().collect();
        assert_eq!(
            used,
            vec![
                "_optix_get_launch_index_x",
                "_optix_get_launch_index_y",
                "_optix_get_sbt_data_ptr_64",
            ]
        );
        assert!(used_intrinsics("ret;").is_empty());
        assert!(primitive_index("%r4").contains("_optix_read_primitive_idx"));
    }
}
