//! OptiX device context.

use crate::accel::{AccelBufferSizes, AccelBuildOptions, AccelEmitDesc, BuildInput};
use crate::api::{self, OptixApi};
use crate::error::{Error, Result};
use crate::module::{Module, ModuleCompileOptions};
use crate::pipeline::{Pipeline, PipelineCompileOptions, PipelineLinkOptions};
use crate::program_group::{ProgramGroup, ProgramGroupDesc};
use optix_bridge_cuda::{CudaContext, CudaStream, DeviceBuffer};
use optix_bridge_ptx::{KernelBackend, PrecompiledBackend};
use optix_bridge_sys::{
    OptixDeviceContext, OptixDeviceContextOptions, OptixDeviceContextValidationMode,
    OptixProgramGroupOptions, OptixTraversableHandle,
};
use std::ffi::{c_char, c_void, CStr, CString};
use std::path::Path;
use std::sync::Arc;

/// Native log levels: 1 fatal, 2 error, 3 warning, 4 print.
pub const MAX_LOG_LEVEL: u32 = 4;

/// Options for [`DeviceContext::new`].
#[derive(Clone)]
pub struct DeviceContextOptions {
    log_level: u32,
    validation: OptixDeviceContextValidationMode,
    backend: Arc<dyn KernelBackend>,
}

impl Default for DeviceContextOptions {
    fn default() -> Self {
        Self {
            log_level: MAX_LOG_LEVEL,
            validation: OptixDeviceContextValidationMode::Off,
            backend: Arc::new(PrecompiledBackend::default()),
        }
    }
}

impl DeviceContextOptions {
    /// Create default options: full logging, validation off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest native log level forwarded to `tracing`; 0 disables the callback.
    pub fn log_level(mut self, level: u32) -> Self {
        self.log_level = level.min(MAX_LOG_LEVEL);
        self
    }

    /// Enable or disable driver-side validation.
    pub fn validation(mut self, enable: bool) -> Self {
        self.validation = if enable {
            OptixDeviceContextValidationMode::All
        } else {
            OptixDeviceContextValidationMode::Off
        };
        self
    }

    /// Compiler used by the `create_*_kernel` methods.
    pub fn backend(mut self, backend: Arc<dyn KernelBackend>) -> Self {
        self.backend = backend;
        self
    }

    fn to_raw(&self) -> OptixDeviceContextOptions {
        OptixDeviceContextOptions {
            log_callback_function: (self.log_level > 0).then_some(log_callback as _),
            log_callback_data: std::ptr::null_mut(),
            log_callback_level: self.log_level as i32,
            validation_mode: self.validation,
        }
    }
}

impl std::fmt::Debug for DeviceContextOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceContextOptions")
            .field("log_level", &self.log_level)
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

unsafe extern "C" fn log_callback(
    level: u32,
    tag: *const c_char,
    message: *const c_char,
    _cbdata: *mut c_void,
) {
    let text = |ptr: *const c_char| {
        if ptr.is_null() {
            String::new()
        } else {
            // SAFETY: the driver passes NUL-terminated strings valid for the call.
            unsafe { CStr::from_ptr(ptr) }.to_string_lossy().trim_end().to_string()
        }
    };
    let tag = text(tag);
    let message = text(message);

    match level {
        0..=2 => tracing::error!("[OptiX] [{}] {}", tag, message),
        3 => tracing::warn!("[OptiX] [{}] {}", tag, message),
        4 => tracing::info!("[OptiX] [{}] {}", tag, message),
        _ => tracing::debug!("[OptiX] [{}] {}", tag, message),
    }
}

/// An OptiX device context bound to a CUDA context.
///
/// The CUDA context is shared, never destroyed here.
pub struct DeviceContext {
    raw: OptixDeviceContext,
    api: Arc<OptixApi>,
    cuda: Arc<CudaContext>,
    backend: Arc<dyn KernelBackend>,
}

// SAFETY: OptiX device contexts may be used from any thread.
unsafe impl Send for DeviceContext {}
// SAFETY: see above.
unsafe impl Sync for DeviceContext {}

impl DeviceContext {
    /// Create a device context on `cuda`. Requires [`crate::init`].
    pub fn new(cuda: &Arc<CudaContext>, options: DeviceContextOptions) -> Result<Self> {
        let api = api::api()?;
        cuda.make_current()?;

        let raw_options = options.to_raw();
        // SAFETY: `cuda.raw()` is a live CUDA context, options are fully initialized.
        let raw = unsafe { api.device_context_create(cuda.raw(), &raw_options)? };

        tracing::info!(
            "Created OptiX device context on {} (validation: {:?})",
            cuda.device_name(),
            options.validation
        );

        Ok(Self {
            raw,
            api,
            cuda: Arc::clone(cuda),
            backend: options.backend,
        })
    }

    /// Native handle.
    pub fn raw(&self) -> OptixDeviceContext {
        self.raw
    }

    /// The CUDA context this device context runs on.
    pub fn cuda(&self) -> &Arc<CudaContext> {
        &self.cuda
    }

    /// Compiler used for kernel creation.
    pub fn backend(&self) -> &dyn KernelBackend {
        self.backend.as_ref()
    }

    pub(crate) fn api(&self) -> &Arc<OptixApi> {
        &self.api
    }

    /// Enable or disable the on-disk compilation cache.
    pub fn set_cache_enabled(&self, enabled: bool) -> Result<()> {
        // SAFETY: `self.raw` is live for the lifetime of `self`.
        unsafe { self.api.device_context_set_cache_enabled(self.raw, enabled)? };
        tracing::debug!("OptiX cache enabled: {}", enabled);
        Ok(())
    }

    /// Whether the on-disk compilation cache is enabled.
    pub fn cache_enabled(&self) -> Result<bool> {
        // SAFETY: as above.
        unsafe { self.api.device_context_get_cache_enabled(self.raw) }
    }

    /// Directory of the on-disk compilation cache.
    pub fn set_cache_location(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let location = CString::new(path.to_string_lossy().into_owned())?;
        // SAFETY: as above; `location` outlives the call.
        unsafe { self.api.device_context_set_cache_location(self.raw, &location)? };
        tracing::debug!("OptiX cache location set to {}", path.display());
        Ok(())
    }

    /// Compile a PTX module.
    pub fn create_module(
        &self,
        module_options: &ModuleCompileOptions,
        pipeline_options: &PipelineCompileOptions,
        ptx: &str,
    ) -> Result<Module> {
        let lowered = module_options.lower();
        let pipeline_raw = pipeline_options.to_raw();
        // SAFETY: lowered options and their bound values outlive the call.
        let raw = unsafe {
            self.api
                .module_create_from_ptx(self.raw, &lowered.raw, &pipeline_raw, ptx)?
        };
        Ok(Module::from_raw(raw, Arc::clone(&self.api)))
    }

    /// Create one program group per description.
    pub fn create_program_groups(&self, descs: &[ProgramGroupDesc<'_>]) -> Result<Vec<ProgramGroup>> {
        let raw_descs: Vec<_> = descs.iter().map(ProgramGroupDesc::to_raw).collect();
        let options = OptixProgramGroupOptions::default();
        // SAFETY: `raw_descs` points into `descs`, which outlives the call.
        let groups = unsafe {
            self.api
                .program_group_create(self.raw, &raw_descs, &options)?
        };
        Ok(groups
            .into_iter()
            .map(|raw| ProgramGroup::from_raw(raw, Arc::clone(&self.api)))
            .collect())
    }

    /// Create a single program group.
    pub fn create_program_group(&self, desc: &ProgramGroupDesc<'_>) -> Result<ProgramGroup> {
        self.create_program_groups(std::slice::from_ref(desc))?
            .pop()
            .ok_or_else(|| Error::InvalidArgument("driver returned no program group".to_string()))
    }

    /// Link program groups into a pipeline.
    pub fn create_pipeline(
        &self,
        compile_options: &PipelineCompileOptions,
        link_options: PipelineLinkOptions,
        groups: &[&ProgramGroup],
    ) -> Result<Pipeline> {
        link_options.validate()?;
        let compile_raw = compile_options.to_raw();
        let link_raw = link_options.to_raw();
        let raw_groups: Vec<_> = groups.iter().map(|g| g.raw()).collect();
        // SAFETY: all pointers reference locals that outlive the call.
        let raw = unsafe {
            self.api
                .pipeline_create(self.raw, &compile_raw, &link_raw, &raw_groups)?
        };
        tracing::debug!("Created pipeline with {} program groups", groups.len());
        Ok(Pipeline::from_raw(
            raw,
            Arc::clone(&self.api),
            Arc::clone(&self.cuda),
        ))
    }

    /// Buffer sizes needed to build an acceleration structure.
    pub fn accel_compute_memory_usage(
        &self,
        options: &AccelBuildOptions,
        inputs: &[BuildInput<'_>],
    ) -> Result<AccelBufferSizes> {
        let raw_inputs = lower_inputs(inputs)?;
        // SAFETY: `raw_inputs` points into `inputs`, which outlives the call.
        let sizes = unsafe {
            self.api
                .accel_compute_memory_usage(self.raw, &options.to_raw(), &raw_inputs)?
        };
        Ok(sizes.into())
    }

    /// Build an acceleration structure into `output`.
    pub fn accel_build(
        &self,
        stream: &CudaStream,
        options: &AccelBuildOptions,
        inputs: &[BuildInput<'_>],
        temp: &DeviceBuffer<u8>,
        output: &DeviceBuffer<u8>,
        emitted: &[AccelEmitDesc<'_>],
    ) -> Result<OptixTraversableHandle> {
        let raw_inputs = lower_inputs(inputs)?;
        let raw_emitted: Vec<_> = emitted.iter().map(AccelEmitDesc::raw).collect();
        // SAFETY: buffers are live device allocations of the given sizes.
        unsafe {
            self.api.accel_build(
                self.raw,
                stream.raw(),
                &options.to_raw(),
                &raw_inputs,
                (temp.device_ptr(), temp.size_in_bytes()),
                (output.device_ptr(), output.size_in_bytes()),
                &raw_emitted,
            )
        }
    }

    /// Copy a built acceleration structure into a tight `output` buffer.
    pub fn accel_compact(
        &self,
        stream: &CudaStream,
        input: OptixTraversableHandle,
        output: &DeviceBuffer<u8>,
    ) -> Result<OptixTraversableHandle> {
        // SAFETY: `output` is a live device allocation of the given size.
        unsafe {
            self.api.accel_compact(
                self.raw,
                stream.raw(),
                input,
                (output.device_ptr(), output.size_in_bytes()),
            )
        }
    }
}

fn lower_inputs(inputs: &[BuildInput<'_>]) -> Result<Vec<optix_bridge_sys::OptixBuildInput>> {
    if inputs.is_empty() {
        return Err(Error::InvalidArgument(
            "at least one build input is required".to_string(),
        ));
    }
    Ok(inputs.iter().map(BuildInput::to_raw).collect())
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        // SAFETY: `self.raw` was created by `device_context_create` and is destroyed once.
        match unsafe { self.api.device_context_destroy(self.raw) } {
            Ok(()) => tracing::debug!("OptiX device context destroyed"),
            Err(e) => tracing::warn!("Failed to destroy OptiX device context: {}", e),
        }
    }
}

impl std::fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceContext")
            .field("raw", &self.raw)
            .field("device", &self.cuda.device_name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optix_bridge_sys::OptixLogCallback;

    #[test]
    fn default_options_forward_all_levels() {
        let raw = DeviceContextOptions::new().to_raw();
        assert_eq!(raw.log_callback_level, 4);
        assert!(raw.log_callback_function.is_some());
        assert_eq!(raw.validation_mode, OptixDeviceContextValidationMode::Off);
    }

    #[test]
    fn log_level_zero_disables_callback() {
        let raw = DeviceContextOptions::new().log_level(0).to_raw();
        let callback: OptixLogCallback = raw.log_callback_function;
        assert!(callback.is_none());
        assert_eq!(DeviceContextOptions::new().log_level(9).to_raw().log_callback_level, 4);
    }

    #[test]
    fn validation_maps_to_all() {
        let raw = DeviceContextOptions::new().validation(true).to_raw();
        assert_eq!(raw.validation_mode, OptixDeviceContextValidationMode::All);
    }

    #[test]
    fn log_callback_tolerates_null_strings() {
        // SAFETY: null pointers are handled by the callback.
        unsafe {
            log_callback(2, std::ptr::null(), std::ptr::null(), std::ptr::null_mut());
            log_callback(4, c"COMPILER".as_ptr(), c"ok\n".as_ptr(), std::ptr::null_mut());
        }
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn create_and_drop_context() {
        crate::init().unwrap();
        let cuda = Arc::new(CudaContext::new(0).unwrap());
        let context = DeviceContext::new(&cuda, DeviceContextOptions::new()).unwrap();
        context.set_cache_enabled(false).unwrap();
        assert!(!context.cache_enabled().unwrap());
        drop(context);
    }
}
