//! The versioned function table filled in by `optixQueryFunctionTable`.

use std::ffi::{c_char, c_void};

use crate::records::{
    OptixAccelBufferSizes, OptixAccelBuildOptions, OptixAccelEmitDesc, OptixBuildInput,
    OptixBuiltinISOptions, OptixDeviceContextOptions, OptixModuleCompileOptions,
    OptixPipelineCompileOptions, OptixPipelineLinkOptions, OptixProgramGroupDesc,
    OptixProgramGroupOptions, OptixShaderBindingTable, OptixStackSizes,
};
use crate::result::OptixResult;
use crate::types::OptixTraversableType;
use crate::{
    CUcontext, CUdeviceptr, CUstream, OptixDeviceContext, OptixModule, OptixPipeline,
    OptixProgramGroup, OptixTraversableHandle,
};

/// Native log callback: `(level, tag, message, user data)`.
pub type OptixLogCallback = Option<
    unsafe extern "C" fn(level: u32, tag: *const c_char, message: *const c_char, cbdata: *mut c_void),
>;

/// Signature of the `optixQueryFunctionTable` export.
pub type OptixQueryFunctionTableFn = unsafe extern "C" fn(
    abi_id: i32,
    num_options: u32,
    option_keys: *mut c_void,
    option_values: *mut *const c_void,
    function_table: *mut c_void,
    size_of_table: usize,
) -> OptixResult;

/// Denoiser entries are never called by this binding and stay untyped.
pub type OptixUntypedFn = Option<unsafe extern "C" fn()>;

/// `OptixFunctionTable` for ABI version 41. Entries are in vendor order.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct OptixFunctionTable {
    // Error handling
    pub optix_get_error_name: Option<unsafe extern "C" fn(result: OptixResult) -> *const c_char>,
    pub optix_get_error_string: Option<unsafe extern "C" fn(result: OptixResult) -> *const c_char>,

    // Device context
    pub optix_device_context_create: Option<
        unsafe extern "C" fn(
            from_context: CUcontext,
            options: *const OptixDeviceContextOptions,
            context: *mut OptixDeviceContext,
        ) -> OptixResult,
    >,
    pub optix_device_context_destroy:
        Option<unsafe extern "C" fn(context: OptixDeviceContext) -> OptixResult>,
    pub optix_device_context_get_property: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            property: u32,
            value: *mut c_void,
            size_in_bytes: usize,
        ) -> OptixResult,
    >,
    pub optix_device_context_set_log_callback: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            callback_function: OptixLogCallback,
            callback_data: *mut c_void,
            callback_level: u32,
        ) -> OptixResult,
    >,
    pub optix_device_context_set_cache_enabled:
        Option<unsafe extern "C" fn(context: OptixDeviceContext, enabled: i32) -> OptixResult>,
    pub optix_device_context_set_cache_location: Option<
        unsafe extern "C" fn(context: OptixDeviceContext, location: *const c_char) -> OptixResult,
    >,
    pub optix_device_context_set_cache_database_sizes: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            low_water_mark: usize,
            high_water_mark: usize,
        ) -> OptixResult,
    >,
    pub optix_device_context_get_cache_enabled:
        Option<unsafe extern "C" fn(context: OptixDeviceContext, enabled: *mut i32) -> OptixResult>,
    pub optix_device_context_get_cache_location: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            location: *mut c_char,
            location_size: usize,
        ) -> OptixResult,
    >,
    pub optix_device_context_get_cache_database_sizes: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            low_water_mark: *mut usize,
            high_water_mark: *mut usize,
        ) -> OptixResult,
    >,

    // Modules
    pub optix_module_create_from_ptx: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            module_compile_options: *const OptixModuleCompileOptions,
            pipeline_compile_options: *const OptixPipelineCompileOptions,
            ptx: *const c_char,
            ptx_size: usize,
            log_string: *mut c_char,
            log_string_size: *mut usize,
            module: *mut OptixModule,
        ) -> OptixResult,
    >,
    pub optix_module_destroy: Option<unsafe extern "C" fn(module: OptixModule) -> OptixResult>,
    pub optix_builtin_is_module_get: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            module_compile_options: *const OptixModuleCompileOptions,
            pipeline_compile_options: *const OptixPipelineCompileOptions,
            builtin_is_options: *const OptixBuiltinISOptions,
            builtin_module: *mut OptixModule,
        ) -> OptixResult,
    >,

    // Program groups
    pub optix_program_group_create: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            program_descriptions: *const OptixProgramGroupDesc,
            num_program_groups: u32,
            options: *const OptixProgramGroupOptions,
            log_string: *mut c_char,
            log_string_size: *mut usize,
            program_groups: *mut OptixProgramGroup,
        ) -> OptixResult,
    >,
    pub optix_program_group_destroy:
        Option<unsafe extern "C" fn(program_group: OptixProgramGroup) -> OptixResult>,
    pub optix_program_group_get_stack_size: Option<
        unsafe extern "C" fn(
            program_group: OptixProgramGroup,
            stack_sizes: *mut OptixStackSizes,
        ) -> OptixResult,
    >,

    // Pipelines
    pub optix_pipeline_create: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            pipeline_compile_options: *const OptixPipelineCompileOptions,
            pipeline_link_options: *const OptixPipelineLinkOptions,
            program_groups: *const OptixProgramGroup,
            num_program_groups: u32,
            log_string: *mut c_char,
            log_string_size: *mut usize,
            pipeline: *mut OptixPipeline,
        ) -> OptixResult,
    >,
    pub optix_pipeline_destroy:
        Option<unsafe extern "C" fn(pipeline: OptixPipeline) -> OptixResult>,
    pub optix_pipeline_set_stack_size: Option<
        unsafe extern "C" fn(
            pipeline: OptixPipeline,
            direct_callable_stack_size_from_traversal: u32,
            direct_callable_stack_size_from_state: u32,
            continuation_stack_size: u32,
            max_traversable_graph_depth: u32,
        ) -> OptixResult,
    >,

    // Acceleration structures
    pub optix_accel_compute_memory_usage: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            accel_options: *const OptixAccelBuildOptions,
            build_inputs: *const OptixBuildInput,
            num_build_inputs: u32,
            buffer_sizes: *mut OptixAccelBufferSizes,
        ) -> OptixResult,
    >,
    pub optix_accel_build: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            stream: CUstream,
            accel_options: *const OptixAccelBuildOptions,
            build_inputs: *const OptixBuildInput,
            num_build_inputs: u32,
            temp_buffer: CUdeviceptr,
            temp_buffer_size_in_bytes: usize,
            output_buffer: CUdeviceptr,
            output_buffer_size_in_bytes: usize,
            output_handle: *mut OptixTraversableHandle,
            emitted_properties: *const OptixAccelEmitDesc,
            num_emitted_properties: u32,
        ) -> OptixResult,
    >,
    pub optix_accel_get_relocation_info: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            handle: OptixTraversableHandle,
            info: *mut c_void,
        ) -> OptixResult,
    >,
    pub optix_accel_check_relocation_compatibility: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            info: *const c_void,
            compatible: *mut i32,
        ) -> OptixResult,
    >,
    pub optix_accel_relocate: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            stream: CUstream,
            info: *const c_void,
            instance_traversable_handles: CUdeviceptr,
            num_instance_traversable_handles: usize,
            target_accel: CUdeviceptr,
            target_accel_size_in_bytes: usize,
            target_handle: *mut OptixTraversableHandle,
        ) -> OptixResult,
    >,
    pub optix_accel_compact: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            stream: CUstream,
            input_handle: OptixTraversableHandle,
            output_buffer: CUdeviceptr,
            output_buffer_size_in_bytes: usize,
            output_handle: *mut OptixTraversableHandle,
        ) -> OptixResult,
    >,
    pub optix_convert_pointer_to_traversable_handle: Option<
        unsafe extern "C" fn(
            context: OptixDeviceContext,
            pointer: CUdeviceptr,
            traversable_type: OptixTraversableType,
            traversable_handle: *mut OptixTraversableHandle,
        ) -> OptixResult,
    >,

    // Launch
    pub optix_sbt_record_pack_header: Option<
        unsafe extern "C" fn(
            program_group: OptixProgramGroup,
            sbt_record_header_host_pointer: *mut c_void,
        ) -> OptixResult,
    >,
    pub optix_launch: Option<
        unsafe extern "C" fn(
            pipeline: OptixPipeline,
            stream: CUstream,
            pipeline_params: CUdeviceptr,
            pipeline_params_size: usize,
            sbt: *const OptixShaderBindingTable,
            width: u32,
            height: u32,
            depth: u32,
        ) -> OptixResult,
    >,

    // Denoiser
    pub optix_denoiser_create: OptixUntypedFn,
    pub optix_denoiser_destroy: OptixUntypedFn,
    pub optix_denoiser_compute_memory_resources: OptixUntypedFn,
    pub optix_denoiser_setup: OptixUntypedFn,
    pub optix_denoiser_invoke: OptixUntypedFn,
    pub optix_denoiser_set_model: OptixUntypedFn,
    pub optix_denoiser_compute_intensity: OptixUntypedFn,
    pub optix_denoiser_compute_average_color: OptixUntypedFn,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn table_holds_38_pointers() {
        assert_eq!(size_of::<OptixFunctionTable>(), 38 * size_of::<usize>());
    }

    #[test]
    fn entries_are_in_vendor_order() {
        let ptr = size_of::<usize>();
        assert_eq!(offset_of!(OptixFunctionTable, optix_device_context_create), 2 * ptr);
        assert_eq!(offset_of!(OptixFunctionTable, optix_module_create_from_ptx), 12 * ptr);
        assert_eq!(offset_of!(OptixFunctionTable, optix_program_group_create), 15 * ptr);
        assert_eq!(offset_of!(OptixFunctionTable, optix_pipeline_create), 18 * ptr);
        assert_eq!(offset_of!(OptixFunctionTable, optix_accel_compute_memory_usage), 21 * ptr);
        assert_eq!(offset_of!(OptixFunctionTable, optix_accel_compact), 26 * ptr);
        assert_eq!(offset_of!(OptixFunctionTable, optix_launch), 29 * ptr);
        assert_eq!(offset_of!(OptixFunctionTable, optix_denoiser_create), 30 * ptr);
    }

    #[test]
    fn default_table_is_empty() {
        let table = OptixFunctionTable::default();
        assert!(table.optix_launch.is_none());
        assert!(table.optix_get_error_name.is_none());
    }
}
