//! Pipelines and their compile and link options.

use crate::api::OptixApi;
use crate::error::{Error, Result};
use bitflags::bitflags;
use optix_bridge_cuda::CudaContext;
use optix_bridge_ptx::LAUNCH_PARAMS_VARIABLE;
use optix_bridge_sys::{
    OptixCompileDebugLevel, OptixPipeline, OptixPipelineCompileOptions, OptixPipelineLinkOptions,
    OPTIX_EXCEPTION_FLAG_DEBUG, OPTIX_EXCEPTION_FLAG_STACK_OVERFLOW,
    OPTIX_EXCEPTION_FLAG_TRACE_DEPTH, OPTIX_EXCEPTION_FLAG_USER, OPTIX_MAX_TRACE_DEPTH,
    OPTIX_PRIMITIVE_TYPE_FLAGS_CUSTOM, OPTIX_PRIMITIVE_TYPE_FLAGS_ROUND_CUBIC_BSPLINE,
    OPTIX_PRIMITIVE_TYPE_FLAGS_ROUND_LINEAR, OPTIX_PRIMITIVE_TYPE_FLAGS_ROUND_QUADRATIC_BSPLINE,
    OPTIX_PRIMITIVE_TYPE_FLAGS_TRIANGLE, OPTIX_TRAVERSABLE_GRAPH_FLAG_ALLOW_SINGLE_GAS,
    OPTIX_TRAVERSABLE_GRAPH_FLAG_ALLOW_SINGLE_LEVEL_INSTANCING,
};
use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

/// Deepest recursion `optixTrace` allows.
pub const MAX_TRACE_DEPTH: u32 = OPTIX_MAX_TRACE_DEPTH;

bitflags! {
    /// Shapes of traversable graph the pipeline supports. Empty allows any.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TraversableGraphFlags: u32 {
        const ALLOW_SINGLE_GAS = OPTIX_TRAVERSABLE_GRAPH_FLAG_ALLOW_SINGLE_GAS;
        const ALLOW_SINGLE_LEVEL_INSTANCING = OPTIX_TRAVERSABLE_GRAPH_FLAG_ALLOW_SINGLE_LEVEL_INSTANCING;
    }

    /// Exceptions the pipeline checks for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExceptionFlags: u32 {
        const STACK_OVERFLOW = OPTIX_EXCEPTION_FLAG_STACK_OVERFLOW;
        const TRACE_DEPTH = OPTIX_EXCEPTION_FLAG_TRACE_DEPTH;
        const USER = OPTIX_EXCEPTION_FLAG_USER;
        const DEBUG = OPTIX_EXCEPTION_FLAG_DEBUG;
    }

    /// Primitive types the pipeline intersects. Empty means triangles and custom.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PrimitiveTypeFlags: u32 {
        const CUSTOM = OPTIX_PRIMITIVE_TYPE_FLAGS_CUSTOM;
        const ROUND_QUADRATIC_BSPLINE = OPTIX_PRIMITIVE_TYPE_FLAGS_ROUND_QUADRATIC_BSPLINE;
        const ROUND_CUBIC_BSPLINE = OPTIX_PRIMITIVE_TYPE_FLAGS_ROUND_CUBIC_BSPLINE;
        const ROUND_LINEAR = OPTIX_PRIMITIVE_TYPE_FLAGS_ROUND_LINEAR;
        const TRIANGLE = OPTIX_PRIMITIVE_TYPE_FLAGS_TRIANGLE;
    }
}

/// Options shared by every module and the pipeline linking them.
#[derive(Debug, Clone)]
pub struct PipelineCompileOptions {
    motion_blur: bool,
    traversable_graph_flags: TraversableGraphFlags,
    payload_values: u32,
    attribute_values: u32,
    exception_flags: ExceptionFlags,
    launch_params_variable_name: CString,
    primitive_type_flags: PrimitiveTypeFlags,
}

impl Default for PipelineCompileOptions {
    fn default() -> Self {
        Self {
            motion_blur: false,
            traversable_graph_flags: TraversableGraphFlags::empty(),
            payload_values: 0,
            attribute_values: 0,
            exception_flags: ExceptionFlags::empty(),
            launch_params_variable_name: default_launch_params_name(),
            primitive_type_flags: PrimitiveTypeFlags::empty(),
        }
    }
}

fn default_launch_params_name() -> CString {
    // The constant has no interior NUL.
    CString::new(LAUNCH_PARAMS_VARIABLE).unwrap_or_default()
}

impl PipelineCompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn motion_blur(mut self, enable: bool) -> Self {
        self.motion_blur = enable;
        self
    }

    pub fn traversable_graph_flags(mut self, flags: TraversableGraphFlags) -> Self {
        self.traversable_graph_flags = flags;
        self
    }

    /// 32-bit payload registers passed through `optixTrace`.
    pub fn payload_values(mut self, count: u32) -> Self {
        self.payload_values = count;
        self
    }

    /// 32-bit attribute registers written by intersection programs.
    pub fn attribute_values(mut self, count: u32) -> Self {
        self.attribute_values = count;
        self
    }

    pub fn exception_flags(mut self, flags: ExceptionFlags) -> Self {
        self.exception_flags = flags;
        self
    }

    /// Name of the `.const` variable receiving launch parameters.
    pub fn launch_params_variable_name(mut self, name: &str) -> Result<Self> {
        self.launch_params_variable_name = CString::new(name)?;
        Ok(self)
    }

    pub fn primitive_type_flags(mut self, flags: PrimitiveTypeFlags) -> Self {
        self.primitive_type_flags = flags;
        self
    }

    /// ABI options pointing into `self`.
    pub fn to_raw(&self) -> OptixPipelineCompileOptions {
        OptixPipelineCompileOptions {
            uses_motion_blur: i32::from(self.motion_blur),
            traversable_graph_flags: self.traversable_graph_flags.bits(),
            num_payload_values: self.payload_values as i32,
            num_attribute_values: self.attribute_values as i32,
            exception_flags: self.exception_flags.bits(),
            pipeline_launch_params_variable_name: self.launch_params_variable_name.as_ptr(),
            uses_primitive_type_flags: self.primitive_type_flags.bits(),
        }
    }
}

/// Options for linking program groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLinkOptions {
    pub max_trace_depth: u32,
    pub debug_level: OptixCompileDebugLevel,
}

impl Default for PipelineLinkOptions {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PipelineLinkOptions {
    pub fn new(max_trace_depth: u32) -> Self {
        Self {
            max_trace_depth,
            debug_level: OptixCompileDebugLevel::Default,
        }
    }

    #[must_use]
    pub fn debug_level(mut self, level: OptixCompileDebugLevel) -> Self {
        self.debug_level = level;
        self
    }

    /// Reject trace depths above [`MAX_TRACE_DEPTH`].
    pub fn validate(&self) -> Result<()> {
        if self.max_trace_depth > MAX_TRACE_DEPTH {
            return Err(Error::InvalidArgument(format!(
                "max_trace_depth {} exceeds {}",
                self.max_trace_depth, MAX_TRACE_DEPTH
            )));
        }
        Ok(())
    }

    pub fn to_raw(&self) -> OptixPipelineLinkOptions {
        OptixPipelineLinkOptions {
            max_trace_depth: self.max_trace_depth,
            debug_level: self.debug_level,
        }
    }
}

/// An owned pipeline handle.
pub struct Pipeline {
    raw: OptixPipeline,
    api: Option<Arc<OptixApi>>,
    cuda: Option<Arc<CudaContext>>,
}

// SAFETY: pipeline handles are not tied to a thread.
unsafe impl Send for Pipeline {}
// SAFETY: see above.
unsafe impl Sync for Pipeline {}

impl Pipeline {
    pub(crate) fn from_raw(raw: OptixPipeline, api: Arc<OptixApi>, cuda: Arc<CudaContext>) -> Self {
        Self {
            raw,
            api: Some(api),
            cuda: Some(cuda),
        }
    }

    /// Native handle.
    pub fn raw(&self) -> OptixPipeline {
        self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_null()
    }

    /// CUDA context launch parameters are allocated in.
    pub fn cuda(&self) -> Result<&Arc<CudaContext>> {
        self.cuda.as_ref().ok_or_else(transferred)
    }

    pub(crate) fn api(&self) -> Result<&Arc<OptixApi>> {
        match &self.api {
            Some(api) if !self.raw.is_null() => Ok(api),
            _ => Err(transferred()),
        }
    }

    /// Set the pipeline's stack sizes.
    ///
    /// Sizes are in bytes; `max_traversable_graph_depth` is 1 for a single GAS.
    pub fn set_stack_size(
        &self,
        direct_callable_from_traversal: u32,
        direct_callable_from_state: u32,
        continuation: u32,
        max_traversable_graph_depth: u32,
    ) -> Result<()> {
        let api = self.api()?;
        // SAFETY: `self.raw` is a live pipeline.
        unsafe {
            api.pipeline_set_stack_size(
                self.raw,
                direct_callable_from_traversal,
                direct_callable_from_state,
                continuation,
                max_traversable_graph_depth,
            )
        }
    }

    /// Move the handle into a new wrapper, leaving this one empty.
    pub fn transfer(&mut self) -> Self {
        Self {
            raw: std::mem::replace(&mut self.raw, ptr::null_mut()),
            api: self.api.take(),
            cuda: self.cuda.take(),
        }
    }
}

fn transferred() -> Error {
    Error::InvalidArgument("pipeline has been transferred".to_string())
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.raw.is_null() {
            return;
        }
        if let Some(api) = &self.api {
            // SAFETY: the handle came from `pipeline_create` and is destroyed once.
            match unsafe { api.pipeline_destroy(self.raw) } {
                Ok(()) => tracing::debug!("OptiX pipeline destroyed"),
                Err(e) => tracing::warn!("Failed to destroy OptiX pipeline: {}", e),
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pipeline").field(&self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optix_bridge_sys::OPTIX_EXCEPTION_FLAG_NONE;
    use std::ffi::CStr;

    #[test]
    fn compile_options_lower_to_abi() {
        let options = PipelineCompileOptions::new()
            .traversable_graph_flags(TraversableGraphFlags::ALLOW_SINGLE_GAS)
            .payload_values(2)
            .attribute_values(2)
            .exception_flags(ExceptionFlags::empty());
        let raw = options.to_raw();
        assert_eq!(raw.uses_motion_blur, 0);
        assert_eq!(raw.traversable_graph_flags, 1);
        assert_eq!(raw.num_payload_values, 2);
        assert_eq!(raw.num_attribute_values, 2);
        assert_eq!(raw.exception_flags, OPTIX_EXCEPTION_FLAG_NONE);
        assert_eq!(raw.uses_primitive_type_flags, 0);

        // SAFETY: points into `options`.
        let name = unsafe { CStr::from_ptr(raw.pipeline_launch_params_variable_name) };
        assert_eq!(name.to_str().unwrap(), "optixLaunchParams");
    }

    #[test]
    fn launch_params_name_can_be_overridden() {
        let options = PipelineCompileOptions::new()
            .motion_blur(true)
            .primitive_type_flags(PrimitiveTypeFlags::TRIANGLE | PrimitiveTypeFlags::ROUND_LINEAR)
            .launch_params_variable_name("params")
            .unwrap();
        let raw = options.to_raw();
        assert_eq!(raw.uses_motion_blur, 1);
        assert_eq!(raw.uses_primitive_type_flags, (1 << 31) | (1 << 3));
        // SAFETY: points into `options`.
        let name = unsafe { CStr::from_ptr(raw.pipeline_launch_params_variable_name) };
        assert_eq!(name.to_str().unwrap(), "params");

        assert!(PipelineCompileOptions::new()
            .launch_params_variable_name("bad\0name")
            .is_err());
    }

    #[test]
    fn trace_depth_is_bounded() {
        assert!(PipelineLinkOptions::new(2).validate().is_ok());
        assert!(PipelineLinkOptions::new(MAX_TRACE_DEPTH).validate().is_ok());

        let err = PipelineLinkOptions::new(32).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(
            err.result(),
            optix_bridge_sys::OptixResult::ERROR_INVALID_VALUE
        );
    }

    #[test]
    fn link_options_lower_to_abi() {
        let raw = PipelineLinkOptions::new(2)
            .debug_level(OptixCompileDebugLevel::Full)
            .to_raw();
        assert_eq!(raw.max_trace_depth, 2);
        assert_eq!(raw.debug_level, OptixCompileDebugLevel::Full);
    }

    #[test]
    fn transferred_pipeline_refuses_calls() {
        let mut pipeline = Pipeline {
            raw: ptr::null_mut(),
            api: None,
            cuda: None,
        };
        let moved = pipeline.transfer();
        assert!(moved.is_empty());
        assert!(pipeline.set_stack_size(2048, 2048, 2048, 1).is_err());
        assert!(pipeline.cuda().is_err());
    }
}
