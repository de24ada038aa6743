//! Function table initialization and dispatch.
//!
//! OptiX exports a single symbol, `optixQueryFunctionTable`, that fills in a
//! table of entry points for a requested ABI version. [`OptixApi`] owns the
//! loaded library together with that table and exposes one thin method per
//! entry the binding calls. Every method converts the native result code
//! into [`Result`].

use crate::error::{check, check_with_log, Error, Result};
use crate::library::{locate_and_load, LoaderConfig};
use libloading::Library;
use optix_bridge_sys::{
    CUcontext, CUdeviceptr, CUstream, OptixAccelBufferSizes, OptixAccelBuildOptions,
    OptixAccelEmitDesc, OptixBuildInput, OptixDeviceContext, OptixDeviceContextOptions,
    OptixFunctionTable, OptixModule, OptixModuleCompileOptions, OptixPipeline,
    OptixPipelineCompileOptions, OptixPipelineLinkOptions, OptixProgramGroup,
    OptixProgramGroupDesc, OptixProgramGroupOptions, OptixQueryFunctionTableFn, OptixResult,
    OptixShaderBindingTable, OptixStackSizes, OptixTraversableHandle, SbtRecordHeader,
    OPTIX_ABI_VERSION, OPTIX_QUERY_FUNCTION_TABLE_SYMBOL,
};
use parking_lot::{const_rwlock, RwLock};
use std::ffi::{c_char, CStr};
use std::mem::size_of;
use std::ptr;
use std::sync::Arc;

/// Bytes reserved for logs returned by module, program group and pipeline
/// creation.
pub const LOG_CAPACITY: usize = 2048;

static CURRENT: RwLock<Option<Arc<OptixApi>>> = const_rwlock(None);

/// Install the process-wide API using the default loader configuration.
///
/// Calling this again while initialized does nothing.
pub fn init() -> Result<()> {
    init_with(&LoaderConfig::default())
}

/// Install the process-wide API.
pub fn init_with(config: &LoaderConfig) -> Result<()> {
    let mut current = CURRENT.write();
    if current.is_some() {
        return Ok(());
    }
    *current = Some(Arc::new(OptixApi::init(config)?));
    Ok(())
}

/// Drop the process-wide API.
///
/// Handles created earlier keep their own reference, so the library stays
/// loaded until the last one is dropped.
pub fn uninit() {
    if CURRENT.write().take().is_some() {
        tracing::info!("OptiX API uninitialized");
    }
}

/// The process-wide API.
pub fn api() -> Result<Arc<OptixApi>> {
    CURRENT.read().clone().ok_or(Error::NotInitialized)
}

/// Whether [`init`] has succeeded and [`uninit`] has not been called since.
pub fn is_initialized() -> bool {
    CURRENT.read().is_some()
}

/// Fetch a function table entry or fail with `MissingEntry`.
macro_rules! entry {
    ($api:expr, $name:ident) => {
        $api.table.$name.ok_or(Error::MissingEntry(stringify!($name)))?
    };
}

/// Fixed-capacity buffer the driver writes a log into.
struct LogBuffer {
    bytes: Vec<u8>,
    len: usize,
}

impl LogBuffer {
    fn new() -> Self {
        Self {
            bytes: vec![0; LOG_CAPACITY],
            len: LOG_CAPACITY,
        }
    }

    fn into_string(self) -> String {
        decode_log(&self.bytes, self.len)
    }
}

/// Decode a native log: at most `len` bytes, trailing NULs trimmed, lossy UTF-8.
pub(crate) fn decode_log(bytes: &[u8], len: usize) -> String {
    let bytes = &bytes[..len.min(bytes.len())];
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Loaded OptiX library and its function table.
pub struct OptixApi {
    table: OptixFunctionTable,
    _library: Library,
}

// SAFETY: the table holds plain function pointers; OptiX entry points are
// thread-safe with respect to distinct handles.
unsafe impl Send for OptixApi {}
// SAFETY: see above.
unsafe impl Sync for OptixApi {}

impl OptixApi {
    /// Load the library and query its function table for ABI version 41.
    pub fn init(config: &LoaderConfig) -> Result<Self> {
        let library = locate_and_load(config)?;

        // SAFETY: the symbol has the documented `optixQueryFunctionTable` signature.
        let query: OptixQueryFunctionTableFn = unsafe {
            *library
                .get::<OptixQueryFunctionTableFn>(OPTIX_QUERY_FUNCTION_TABLE_SYMBOL)
                .map_err(|e| Error::Optix {
                    result: OptixResult::ERROR_ENTRY_SYMBOL_NOT_FOUND,
                    log: e.to_string(),
                })?
        };

        let mut table = OptixFunctionTable::default();
        // SAFETY: `table` is a writable OptixFunctionTable of the size passed.
        let result = unsafe {
            query(
                OPTIX_ABI_VERSION,
                0,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::addr_of_mut!(table).cast(),
                size_of::<OptixFunctionTable>(),
            )
        };
        check(result)?;

        tracing::info!("OptiX function table initialized (ABI {})", OPTIX_ABI_VERSION);
        Ok(Self {
            table,
            _library: library,
        })
    }

    /// The raw function table.
    pub fn table(&self) -> &OptixFunctionTable {
        &self.table
    }

    /// Vendor identifier for a result code, as reported by the driver.
    pub fn error_name(&self, result: OptixResult) -> Result<String> {
        let f = entry!(self, optix_get_error_name);
        // SAFETY: the driver returns a static NUL-terminated string or null.
        Ok(unsafe { owned_c_str(f(result)) })
    }

    /// Human-readable description of a result code.
    pub fn error_string(&self, result: OptixResult) -> Result<String> {
        let f = entry!(self, optix_get_error_string);
        // SAFETY: as above.
        Ok(unsafe { owned_c_str(f(result)) })
    }

    pub unsafe fn device_context_create(
        &self,
        cuda_context: CUcontext,
        options: &OptixDeviceContextOptions,
    ) -> Result<OptixDeviceContext> {
        let f = entry!(self, optix_device_context_create);
        let mut context = ptr::null_mut();
        check(unsafe { f(cuda_context, options, &mut context) })?;
        Ok(context)
    }

    pub unsafe fn device_context_destroy(&self, context: OptixDeviceContext) -> Result<()> {
        let f = entry!(self, optix_device_context_destroy);
        check(unsafe { f(context) })
    }

    pub unsafe fn device_context_set_cache_enabled(
        &self,
        context: OptixDeviceContext,
        enabled: bool,
    ) -> Result<()> {
        let f = entry!(self, optix_device_context_set_cache_enabled);
        check(unsafe { f(context, i32::from(enabled)) })
    }

    pub unsafe fn device_context_set_cache_location(
        &self,
        context: OptixDeviceContext,
        location: &CStr,
    ) -> Result<()> {
        let f = entry!(self, optix_device_context_set_cache_location);
        check(unsafe { f(context, location.as_ptr()) })
    }

    pub unsafe fn device_context_get_cache_enabled(
        &self,
        context: OptixDeviceContext,
    ) -> Result<bool> {
        let f = entry!(self, optix_device_context_get_cache_enabled);
        let mut enabled = 0;
        check(unsafe { f(context, &mut enabled) })?;
        Ok(enabled != 0)
    }

    /// Compile PTX into a module. The driver log is attached to any error.
    pub unsafe fn module_create_from_ptx(
        &self,
        context: OptixDeviceContext,
        module_options: &OptixModuleCompileOptions,
        pipeline_options: &OptixPipelineCompileOptions,
        ptx: &str,
    ) -> Result<OptixModule> {
        let f = entry!(self, optix_module_create_from_ptx);
        let mut log = LogBuffer::new();
        let mut module = ptr::null_mut();
        let result = unsafe {
            f(
                context,
                module_options,
                pipeline_options,
                ptx.as_ptr().cast::<c_char>(),
                ptx.len(),
                log.bytes.as_mut_ptr().cast(),
                &mut log.len,
                &mut module,
            )
        };
        check_with_log(result, log.into_string())?;
        Ok(module)
    }

    pub unsafe fn module_destroy(&self, module: OptixModule) -> Result<()> {
        let f = entry!(self, optix_module_destroy);
        check(unsafe { f(module) })
    }

    /// Create one program group per description.
    pub unsafe fn program_group_create(
        &self,
        context: OptixDeviceContext,
        descs: &[OptixProgramGroupDesc],
        options: &OptixProgramGroupOptions,
    ) -> Result<Vec<OptixProgramGroup>> {
        let f = entry!(self, optix_program_group_create);
        let mut log = LogBuffer::new();
        let mut groups = vec![ptr::null_mut(); descs.len()];
        let result = unsafe {
            f(
                context,
                descs.as_ptr(),
                descs.len() as u32,
                options,
                log.bytes.as_mut_ptr().cast(),
                &mut log.len,
                groups.as_mut_ptr(),
            )
        };
        check_with_log(result, log.into_string())?;
        Ok(groups)
    }

    pub unsafe fn program_group_destroy(&self, group: OptixProgramGroup) -> Result<()> {
        let f = entry!(self, optix_program_group_destroy);
        check(unsafe { f(group) })
    }

    pub unsafe fn program_group_get_stack_size(
        &self,
        group: OptixProgramGroup,
    ) -> Result<OptixStackSizes> {
        let f = entry!(self, optix_program_group_get_stack_size);
        let mut sizes = OptixStackSizes::default();
        check(unsafe { f(group, &mut sizes) })?;
        Ok(sizes)
    }

    pub unsafe fn pipeline_create(
        &self,
        context: OptixDeviceContext,
        compile_options: &OptixPipelineCompileOptions,
        link_options: &OptixPipelineLinkOptions,
        groups: &[OptixProgramGroup],
    ) -> Result<OptixPipeline> {
        let f = entry!(self, optix_pipeline_create);
        let mut log = LogBuffer::new();
        let mut pipeline = ptr::null_mut();
        let result = unsafe {
            f(
                context,
                compile_options,
                link_options,
                groups.as_ptr(),
                groups.len() as u32,
                log.bytes.as_mut_ptr().cast(),
                &mut log.len,
                &mut pipeline,
            )
        };
        check_with_log(result, log.into_string())?;
        Ok(pipeline)
    }

    pub unsafe fn pipeline_destroy(&self, pipeline: OptixPipeline) -> Result<()> {
        let f = entry!(self, optix_pipeline_destroy);
        check(unsafe { f(pipeline) })
    }

    pub unsafe fn pipeline_set_stack_size(
        &self,
        pipeline: OptixPipeline,
        direct_callable_from_traversal: u32,
        direct_callable_from_state: u32,
        continuation: u32,
        max_traversable_graph_depth: u32,
    ) -> Result<()> {
        let f = entry!(self, optix_pipeline_set_stack_size);
        check(unsafe {
            f(
                pipeline,
                direct_callable_from_traversal,
                direct_callable_from_state,
                continuation,
                max_traversable_graph_depth,
            )
        })
    }

    /// Fill `header` with the opaque record header of `group`.
    pub unsafe fn sbt_record_pack_header(
        &self,
        group: OptixProgramGroup,
        header: &mut SbtRecordHeader,
    ) -> Result<()> {
        let f = entry!(self, optix_sbt_record_pack_header);
        check(unsafe { f(group, ptr::from_mut(header).cast()) })
    }

    #[allow(clippy::too_many_arguments)]
    pub unsafe fn launch(
        &self,
        pipeline: OptixPipeline,
        stream: CUstream,
        params: CUdeviceptr,
        params_size: usize,
        sbt: &OptixShaderBindingTable,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Result<()> {
        let f = entry!(self, optix_launch);
        check(unsafe { f(pipeline, stream, params, params_size, sbt, width, height, depth) })
    }

    pub unsafe fn accel_compute_memory_usage(
        &self,
        context: OptixDeviceContext,
        options: &OptixAccelBuildOptions,
        inputs: &[OptixBuildInput],
    ) -> Result<OptixAccelBufferSizes> {
        let f = entry!(self, optix_accel_compute_memory_usage);
        let mut sizes = OptixAccelBufferSizes::default();
        check(unsafe {
            f(
                context,
                options,
                inputs.as_ptr(),
                inputs.len() as u32,
                &mut sizes,
            )
        })?;
        Ok(sizes)
    }

    #[allow(clippy::too_many_arguments)]
    pub unsafe fn accel_build(
        &self,
        context: OptixDeviceContext,
        stream: CUstream,
        options: &OptixAccelBuildOptions,
        inputs: &[OptixBuildInput],
        temp: (CUdeviceptr, usize),
        output: (CUdeviceptr, usize),
        emitted: &[OptixAccelEmitDesc],
    ) -> Result<OptixTraversableHandle> {
        let f = entry!(self, optix_accel_build);
        let mut handle = 0;
        check(unsafe {
            f(
                context,
                stream,
                options,
                inputs.as_ptr(),
                inputs.len() as u32,
                temp.0,
                temp.1,
                output.0,
                output.1,
                &mut handle,
                if emitted.is_empty() {
                    ptr::null()
                } else {
                    emitted.as_ptr()
                },
                emitted.len() as u32,
            )
        })?;
        Ok(handle)
    }

    pub unsafe fn accel_compact(
        &self,
        context: OptixDeviceContext,
        stream: CUstream,
        input: OptixTraversableHandle,
        output: (CUdeviceptr, usize),
    ) -> Result<OptixTraversableHandle> {
        let f = entry!(self, optix_accel_compact);
        let mut handle = 0;
        check(unsafe { f(context, stream, input, output.0, output.1, &mut handle) })?;
        Ok(handle)
    }
}

impl std::fmt::Debug for OptixApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptixApi")
            .field("abi_version", &OPTIX_ABI_VERSION)
            .finish_non_exhaustive()
    }
}

unsafe fn owned_c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        // SAFETY: caller guarantees a valid NUL-terminated string.
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}
