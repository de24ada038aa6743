//! Compiled OptiX modules.

use crate::api::OptixApi;
use crate::error::Result;
use optix_bridge_sys::{
    OptixCompileDebugLevel, OptixCompileOptimizationLevel, OptixModule,
    OptixModuleCompileBoundValueEntry, OptixModuleCompileOptions,
};
use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

/// A launch parameter range whose value is fixed at module compile time.
#[derive(Debug, Clone)]
pub struct BoundValue {
    offset: usize,
    bytes: Vec<u8>,
    annotation: CString,
}

impl BoundValue {
    /// Bind the bytes of `value` at `offset` into the launch parameters.
    pub fn new<T: bytemuck::Pod>(offset: usize, value: &T, annotation: &str) -> Result<Self> {
        Ok(Self {
            offset,
            bytes: bytemuck::bytes_of(value).to_vec(),
            annotation: CString::new(annotation)?,
        })
    }
}

/// Options for compiling PTX into a module.
#[derive(Debug, Clone)]
pub struct ModuleCompileOptions {
    pub max_register_count: i32,
    pub opt_level: OptixCompileOptimizationLevel,
    pub debug_level: OptixCompileDebugLevel,
    pub bound_values: Vec<BoundValue>,
}

impl Default for ModuleCompileOptions {
    fn default() -> Self {
        Self {
            max_register_count: 0,
            opt_level: OptixCompileOptimizationLevel::Default,
            debug_level: OptixCompileDebugLevel::Default,
            bound_values: Vec::new(),
        }
    }
}

/// Native options plus the bound-value array they point into.
pub(crate) struct LoweredModuleOptions {
    _entries: Vec<OptixModuleCompileBoundValueEntry>,
    pub(crate) raw: OptixModuleCompileOptions,
}

impl ModuleCompileOptions {
    pub(crate) fn lower(&self) -> LoweredModuleOptions {
        let entries: Vec<_> = self
            .bound_values
            .iter()
            .map(|value| OptixModuleCompileBoundValueEntry {
                pipeline_param_offset_in_bytes: value.offset,
                size_in_bytes: value.bytes.len(),
                bound_value_ptr: value.bytes.as_ptr().cast(),
                annotation: value.annotation.as_ptr(),
            })
            .collect();
        let raw = OptixModuleCompileOptions {
            max_register_count: self.max_register_count,
            opt_level: self.opt_level,
            debug_level: self.debug_level,
            bound_values: if entries.is_empty() {
                ptr::null()
            } else {
                entries.as_ptr()
            },
            num_bound_values: entries.len() as u32,
        };
        LoweredModuleOptions {
            _entries: entries,
            raw,
        }
    }
}

/// An owned module handle. Null for programs that were not supplied.
pub struct Module {
    raw: OptixModule,
    api: Option<Arc<OptixApi>>,
}

// SAFETY: module handles are not tied to a thread.
unsafe impl Send for Module {}
// SAFETY: see above.
unsafe impl Sync for Module {}

impl Module {
    pub(crate) fn from_raw(raw: OptixModule, api: Arc<OptixApi>) -> Self {
        Self {
            raw,
            api: Some(api),
        }
    }

    /// A module standing in for a missing program.
    pub fn empty() -> Self {
        Self {
            raw: ptr::null_mut(),
            api: None,
        }
    }

    /// Native handle.
    pub fn raw(&self) -> OptixModule {
        self.raw
    }

    /// Whether this module holds no handle.
    pub fn is_empty(&self) -> bool {
        self.raw.is_null()
    }

    /// Move the handle into a new wrapper, leaving this one empty.
    pub fn transfer(&mut self) -> Self {
        Self {
            raw: std::mem::replace(&mut self.raw, ptr::null_mut()),
            api: self.api.take(),
        }
    }

    /// A non-null handle that is never destroyed.
    #[cfg(test)]
    pub(crate) fn dangling() -> Self {
        Self {
            raw: ptr::NonNull::dangling().as_ptr(),
            api: None,
        }
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        if self.raw.is_null() {
            return;
        }
        if let Some(api) = &self.api {
            // SAFETY: the handle came from `module_create_from_ptx` and is destroyed once.
            if let Err(e) = unsafe { api.module_destroy(self.raw) } {
                tracing::warn!("Failed to destroy OptiX module: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Module").field(&self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_without_bound_values_pass_null() {
        let lowered = ModuleCompileOptions {
            max_register_count: 50,
            ..Default::default()
        }
        .lower();
        assert_eq!(lowered.raw.max_register_count, 50);
        assert!(lowered.raw.bound_values.is_null());
        assert_eq!(lowered.raw.num_bound_values, 0);
    }

    #[test]
    fn bound_values_are_lowered_in_order() {
        let options = ModuleCompileOptions {
            bound_values: vec![
                BoundValue::new(0, &7i32, "frame").unwrap(),
                BoundValue::new(16, &[1.0f32, 2.0], "scale").unwrap(),
            ],
            ..Default::default()
        };
        let lowered = options.lower();
        assert_eq!(lowered.raw.num_bound_values, 2);

        // SAFETY: the entries are owned by `lowered`.
        let entries = unsafe { std::slice::from_raw_parts(lowered.raw.bound_values, 2) };
        assert_eq!(entries[0].pipeline_param_offset_in_bytes, 0);
        assert_eq!(entries[0].size_in_bytes, 4);
        assert_eq!(entries[1].pipeline_param_offset_in_bytes, 16);
        assert_eq!(entries[1].size_in_bytes, 8);
    }

    #[test]
    fn annotation_with_nul_is_rejected() {
        assert!(BoundValue::new(0, &1u32, "a\0b").is_err());
    }

    #[test]
    fn transfer_moves_the_handle() {
        let mut original = Module::dangling();
        let moved = original.transfer();
        assert!(original.is_empty());
        assert!(!moved.is_empty());
        assert!(Module::empty().is_empty());
    }
}
