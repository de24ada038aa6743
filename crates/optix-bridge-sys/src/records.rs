//! Fixed-layout records exchanged with the driver.
//!
//! Field order, padding and size follow the ABI 41 headers. Layout tests at
//! the bottom of this file pin every offset the driver reads.

use std::ffi::{c_char, c_void};
use std::ptr;

use crate::function_table::OptixLogCallback;
use crate::types::{
    OptixAccelPropertyType, OptixBuildInputType, OptixBuildOperation,
    OptixCompileDebugLevel, OptixCompileOptimizationLevel, OptixDeviceContextValidationMode,
    OptixIndicesFormat, OptixPrimitiveType, OptixProgramGroupKind, OptixTransformFormat,
    OptixVertexFormat,
};
use crate::{
    CUdeviceptr, OptixModule, OptixTraversableHandle, OPTIX_BUILD_INPUT_UNION_SIZE,
    OPTIX_SBT_RECORD_HEADER_SIZE,
};

/// `OptixDeviceContextOptions`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixDeviceContextOptions {
    pub log_callback_function: OptixLogCallback,
    pub log_callback_data: *mut c_void,
    pub log_callback_level: i32,
    pub validation_mode: OptixDeviceContextValidationMode,
}

impl Default for OptixDeviceContextOptions {
    fn default() -> Self {
        Self {
            log_callback_function: None,
            log_callback_data: ptr::null_mut(),
            log_callback_level: 0,
            validation_mode: OptixDeviceContextValidationMode::Off,
        }
    }
}

/// `OptixModuleCompileBoundValueEntry`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixModuleCompileBoundValueEntry {
    pub pipeline_param_offset_in_bytes: usize,
    pub size_in_bytes: usize,
    pub bound_value_ptr: *const c_void,
    pub annotation: *const c_char,
}

/// `OptixModuleCompileOptions`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixModuleCompileOptions {
    pub max_register_count: i32,
    pub opt_level: OptixCompileOptimizationLevel,
    pub debug_level: OptixCompileDebugLevel,
    pub bound_values: *const OptixModuleCompileBoundValueEntry,
    pub num_bound_values: u32,
}

impl Default for OptixModuleCompileOptions {
    fn default() -> Self {
        Self {
            max_register_count: 0,
            opt_level: OptixCompileOptimizationLevel::Default,
            debug_level: OptixCompileDebugLevel::Default,
            bound_values: ptr::null(),
            num_bound_values: 0,
        }
    }
}

/// `OptixPipelineCompileOptions`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixPipelineCompileOptions {
    pub uses_motion_blur: i32,
    pub traversable_graph_flags: u32,
    pub num_payload_values: i32,
    pub num_attribute_values: i32,
    pub exception_flags: u32,
    pub pipeline_launch_params_variable_name: *const c_char,
    pub uses_primitive_type_flags: u32,
}

impl Default for OptixPipelineCompileOptions {
    fn default() -> Self {
        Self {
            uses_motion_blur: 0,
            traversable_graph_flags: 0,
            num_payload_values: 0,
            num_attribute_values: 0,
            exception_flags: 0,
            pipeline_launch_params_variable_name: ptr::null(),
            uses_primitive_type_flags: 0,
        }
    }
}

/// `OptixPipelineLinkOptions`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct OptixPipelineLinkOptions {
    pub max_trace_depth: u32,
    pub debug_level: OptixCompileDebugLevel,
}

/// `OptixBuiltinISOptions`, selects the built-in curve intersector.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixBuiltinISOptions {
    pub builtin_is_module_type: OptixPrimitiveType,
    pub uses_motion_blur: i32,
}

/// `OptixProgramGroupOptions`. Carries no options in this ABI version.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct OptixProgramGroupOptions {
    pub placeholder: i32,
}

/// Raygen, miss and exception program reference.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixProgramGroupSingleModule {
    pub module: OptixModule,
    pub entry_function_name: *const c_char,
}

impl Default for OptixProgramGroupSingleModule {
    fn default() -> Self {
        Self {
            module: ptr::null_mut(),
            entry_function_name: ptr::null(),
        }
    }
}

/// Closest-hit, any-hit and intersection program references.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixProgramGroupHitgroup {
    pub module_ch: OptixModule,
    pub entry_function_name_ch: *const c_char,
    pub module_ah: OptixModule,
    pub entry_function_name_ah: *const c_char,
    pub module_is: OptixModule,
    pub entry_function_name_is: *const c_char,
}

impl Default for OptixProgramGroupHitgroup {
    fn default() -> Self {
        Self {
            module_ch: ptr::null_mut(),
            entry_function_name_ch: ptr::null(),
            module_ah: ptr::null_mut(),
            entry_function_name_ah: ptr::null(),
            module_is: ptr::null_mut(),
            entry_function_name_is: ptr::null(),
        }
    }
}

/// Direct and continuation callable references.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixProgramGroupCallables {
    pub module_dc: OptixModule,
    pub entry_function_name_dc: *const c_char,
    pub module_cc: OptixModule,
    pub entry_function_name_cc: *const c_char,
}

impl Default for OptixProgramGroupCallables {
    fn default() -> Self {
        Self {
            module_dc: ptr::null_mut(),
            entry_function_name_dc: ptr::null(),
            module_cc: ptr::null_mut(),
            entry_function_name_cc: ptr::null(),
        }
    }
}

/// Program references selected by `OptixProgramGroupDesc::kind`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union OptixProgramGroupDescUnion {
    pub raygen: OptixProgramGroupSingleModule,
    pub miss: OptixProgramGroupSingleModule,
    pub exception: OptixProgramGroupSingleModule,
    pub callables: OptixProgramGroupCallables,
    pub hitgroup: OptixProgramGroupHitgroup,
}

/// `OptixProgramGroupDesc`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct OptixProgramGroupDesc {
    pub kind: OptixProgramGroupKind,
    pub flags: u32,
    pub desc: OptixProgramGroupDescUnion,
}

/// `OptixStackSizes` reported per program group.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptixStackSizes {
    pub css_rg: u32,
    pub css_ms: u32,
    pub css_ch: u32,
    pub css_ah: u32,
    pub css_is: u32,
    pub css_cc: u32,
    pub dss_dc: u32,
}

/// `OptixShaderBindingTable`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct OptixShaderBindingTable {
    pub raygen_record: CUdeviceptr,
    pub exception_record: CUdeviceptr,
    pub miss_record_base: CUdeviceptr,
    pub miss_record_stride_in_bytes: u32,
    pub miss_record_count: u32,
    pub hitgroup_record_base: CUdeviceptr,
    pub hitgroup_record_stride_in_bytes: u32,
    pub hitgroup_record_count: u32,
    pub callables_record_base: CUdeviceptr,
    pub callables_record_stride_in_bytes: u32,
    pub callables_record_count: u32,
}

/// Opaque header at the start of every SBT record, filled by
/// `optixSbtRecordPackHeader`.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbtRecordHeader(pub [u8; OPTIX_SBT_RECORD_HEADER_SIZE]);

impl Default for SbtRecordHeader {
    fn default() -> Self {
        Self([0; OPTIX_SBT_RECORD_HEADER_SIZE])
    }
}

/// `OptixMotionOptions`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptixMotionOptions {
    pub num_keys: u16,
    pub flags: u16,
    pub time_begin: f32,
    pub time_end: f32,
}

/// `OptixAccelBuildOptions`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct OptixAccelBuildOptions {
    pub build_flags: u32,
    pub operation: OptixBuildOperation,
    pub motion_options: OptixMotionOptions,
}

/// `OptixAccelBufferSizes`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptixAccelBufferSizes {
    pub output_size_in_bytes: usize,
    pub temp_size_in_bytes: usize,
    pub temp_update_size_in_bytes: usize,
}

/// `OptixAccelEmitDesc`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixAccelEmitDesc {
    pub result: CUdeviceptr,
    pub type_: OptixAccelPropertyType,
}

/// `OptixBuildInputTriangleArray`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixBuildInputTriangleArray {
    pub vertex_buffers: *const CUdeviceptr,
    pub num_vertices: u32,
    pub vertex_format: OptixVertexFormat,
    pub vertex_stride_in_bytes: u32,
    pub index_buffer: CUdeviceptr,
    pub num_index_triplets: u32,
    pub index_format: OptixIndicesFormat,
    pub index_stride_in_bytes: u32,
    pub pre_transform: CUdeviceptr,
    pub flags: *const u32,
    pub num_sbt_records: u32,
    pub sbt_index_offset_buffer: CUdeviceptr,
    pub sbt_index_offset_size_in_bytes: u32,
    pub sbt_index_offset_stride_in_bytes: u32,
    pub primitive_index_offset: u32,
    pub transform_format: OptixTransformFormat,
}

impl Default for OptixBuildInputTriangleArray {
    fn default() -> Self {
        Self {
            vertex_buffers: ptr::null(),
            num_vertices: 0,
            vertex_format: OptixVertexFormat::None,
            vertex_stride_in_bytes: 0,
            index_buffer: 0,
            num_index_triplets: 0,
            index_format: OptixIndicesFormat::None,
            index_stride_in_bytes: 0,
            pre_transform: 0,
            flags: ptr::null(),
            num_sbt_records: 0,
            sbt_index_offset_buffer: 0,
            sbt_index_offset_size_in_bytes: 0,
            sbt_index_offset_stride_in_bytes: 0,
            primitive_index_offset: 0,
            transform_format: OptixTransformFormat::None,
        }
    }
}

/// `OptixBuildInputCurveArray`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixBuildInputCurveArray {
    pub curve_type: OptixPrimitiveType,
    pub num_primitives: u32,
    pub vertex_buffers: *const CUdeviceptr,
    pub num_vertices: u32,
    pub vertex_stride_in_bytes: u32,
    pub width_buffers: *const CUdeviceptr,
    pub width_stride_in_bytes: u32,
    pub normal_buffers: *const CUdeviceptr,
    pub normal_stride_in_bytes: u32,
    pub index_buffer: CUdeviceptr,
    pub index_stride_in_bytes: u32,
    pub flag: u32,
    pub primitive_index_offset: u32,
}

/// `OptixBuildInputCustomPrimitiveArray`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OptixBuildInputCustomPrimitiveArray {
    pub aabb_buffers: *const CUdeviceptr,
    pub num_primitives: u32,
    pub stride_in_bytes: u32,
    pub flags: *const u32,
    pub num_sbt_records: u32,
    pub sbt_index_offset_buffer: CUdeviceptr,
    pub sbt_index_offset_size_in_bytes: u32,
    pub sbt_index_offset_stride_in_bytes: u32,
    pub primitive_index_offset: u32,
}

/// `OptixBuildInputInstanceArray`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct OptixBuildInputInstanceArray {
    pub instances: CUdeviceptr,
    pub num_instances: u32,
}

/// Payload of `OptixBuildInput`, selected by its type tag.
#[repr(C)]
#[derive(Clone, Copy)]
pub union OptixBuildInputUnion {
    pub triangle_array: OptixBuildInputTriangleArray,
    pub curve_array: OptixBuildInputCurveArray,
    pub custom_primitive_array: OptixBuildInputCustomPrimitiveArray,
    pub instance_array: OptixBuildInputInstanceArray,
    pub pad: [u8; OPTIX_BUILD_INPUT_UNION_SIZE],
}

/// `OptixBuildInput`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct OptixBuildInput {
    pub type_: OptixBuildInputType,
    pub input: OptixBuildInputUnion,
}

impl OptixBuildInput {
    /// A build input of the given type with an all-zero payload.
    pub fn zeroed(type_: OptixBuildInputType) -> Self {
        Self {
            type_,
            input: OptixBuildInputUnion {
                pad: [0; OPTIX_BUILD_INPUT_UNION_SIZE],
            },
        }
    }
}

/// `OptixInstance`, the element type of instance build inputs.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptixInstance {
    pub transform: [f32; 12],
    pub instance_id: u32,
    pub sbt_offset: u32,
    pub visibility_mask: u32,
    pub flags: u32,
    pub traversable_handle: OptixTraversableHandle,
    pub pad: [u32; 2],
}

/// `OptixAabb`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptixAabb {
    pub min_x: f32,
    pub min_y: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub max_z: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of, size_of};

    #[test]
    fn device_context_options_layout() {
        assert_eq!(offset_of!(OptixDeviceContextOptions, log_callback_data), 8);
        assert_eq!(offset_of!(OptixDeviceContextOptions, log_callback_level), 16);
        assert_eq!(offset_of!(OptixDeviceContextOptions, validation_mode), 20);
        assert_eq!(size_of::<OptixDeviceContextOptions>(), 24);
    }

    #[test]
    fn compile_options_layout() {
        assert_eq!(size_of::<OptixModuleCompileBoundValueEntry>(), 32);
        assert_eq!(offset_of!(OptixModuleCompileOptions, debug_level), 8);
        assert_eq!(offset_of!(OptixModuleCompileOptions, bound_values), 16);
        assert_eq!(offset_of!(OptixModuleCompileOptions, num_bound_values), 24);
        assert_eq!(size_of::<OptixModuleCompileOptions>(), 32);

        assert_eq!(offset_of!(OptixPipelineCompileOptions, exception_flags), 16);
        assert_eq!(
            offset_of!(OptixPipelineCompileOptions, pipeline_launch_params_variable_name),
            24
        );
        assert_eq!(
            offset_of!(OptixPipelineCompileOptions, uses_primitive_type_flags),
            32
        );
        assert_eq!(size_of::<OptixPipelineCompileOptions>(), 40);
        assert_eq!(size_of::<OptixPipelineLinkOptions>(), 8);
    }

    #[test]
    fn program_group_desc_layout() {
        assert_eq!(size_of::<OptixProgramGroupSingleModule>(), 16);
        assert_eq!(size_of::<OptixProgramGroupHitgroup>(), 48);
        assert_eq!(size_of::<OptixProgramGroupCallables>(), 32);
        assert_eq!(offset_of!(OptixProgramGroupDesc, kind), 0);
        assert_eq!(offset_of!(OptixProgramGroupDesc, flags), 4);
        assert_eq!(offset_of!(OptixProgramGroupDesc, desc), 8);
        assert_eq!(size_of::<OptixProgramGroupDesc>(), 56);
        assert_eq!(size_of::<OptixStackSizes>(), 28);
    }

    #[test]
    fn shader_binding_table_layout() {
        assert_eq!(offset_of!(OptixShaderBindingTable, miss_record_base), 16);
        assert_eq!(offset_of!(OptixShaderBindingTable, miss_record_count), 28);
        assert_eq!(offset_of!(OptixShaderBindingTable, hitgroup_record_base), 32);
        assert_eq!(offset_of!(OptixShaderBindingTable, callables_record_base), 48);
        assert_eq!(offset_of!(OptixShaderBindingTable, callables_record_count), 60);
        assert_eq!(size_of::<OptixShaderBindingTable>(), 64);
    }

    #[test]
    fn sbt_header_is_32_bytes_16_aligned() {
        assert_eq!(size_of::<SbtRecordHeader>(), 32);
        assert_eq!(align_of::<SbtRecordHeader>(), 16);
    }

    #[test]
    fn accel_records_layout() {
        assert_eq!(size_of::<OptixMotionOptions>(), 12);
        assert_eq!(offset_of!(OptixAccelBuildOptions, motion_options), 8);
        assert_eq!(size_of::<OptixAccelBuildOptions>(), 20);
        assert_eq!(size_of::<OptixAccelBufferSizes>(), 24);
        assert_eq!(offset_of!(OptixAccelEmitDesc, type_), 8);
        assert_eq!(size_of::<OptixAccelEmitDesc>(), 16);
    }

    #[test]
    fn triangle_array_layout() {
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, num_vertices), 8);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, vertex_format), 12);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, vertex_stride_in_bytes), 16);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, index_buffer), 24);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, num_index_triplets), 32);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, index_format), 36);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, index_stride_in_bytes), 40);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, pre_transform), 48);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, flags), 56);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, num_sbt_records), 64);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, sbt_index_offset_buffer), 72);
        assert_eq!(
            offset_of!(OptixBuildInputTriangleArray, sbt_index_offset_size_in_bytes),
            80
        );
        assert_eq!(
            offset_of!(OptixBuildInputTriangleArray, sbt_index_offset_stride_in_bytes),
            84
        );
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, primitive_index_offset), 88);
        assert_eq!(offset_of!(OptixBuildInputTriangleArray, transform_format), 92);
        assert_eq!(size_of::<OptixBuildInputTriangleArray>(), 96);
    }

    #[test]
    fn other_build_inputs_layout() {
        assert_eq!(offset_of!(OptixBuildInputCurveArray, vertex_buffers), 8);
        assert_eq!(offset_of!(OptixBuildInputCurveArray, width_buffers), 24);
        assert_eq!(offset_of!(OptixBuildInputCurveArray, normal_buffers), 40);
        assert_eq!(offset_of!(OptixBuildInputCurveArray, index_buffer), 56);
        assert_eq!(offset_of!(OptixBuildInputCurveArray, flag), 68);
        assert_eq!(size_of::<OptixBuildInputCurveArray>(), 80);

        assert_eq!(offset_of!(OptixBuildInputCustomPrimitiveArray, flags), 16);
        assert_eq!(
            offset_of!(OptixBuildInputCustomPrimitiveArray, sbt_index_offset_buffer),
            32
        );
        assert_eq!(size_of::<OptixBuildInputCustomPrimitiveArray>(), 56);
        assert_eq!(size_of::<OptixBuildInputInstanceArray>(), 16);
    }

    #[test]
    fn build_input_union_starts_at_eight() {
        assert_eq!(offset_of!(OptixBuildInput, type_), 0);
        assert_eq!(offset_of!(OptixBuildInput, input), 8);
        assert_eq!(size_of::<OptixBuildInputUnion>(), OPTIX_BUILD_INPUT_UNION_SIZE);
        assert_eq!(size_of::<OptixBuildInput>(), 8 + OPTIX_BUILD_INPUT_UNION_SIZE);
    }

    #[test]
    fn instance_and_aabb_layout() {
        assert_eq!(offset_of!(OptixInstance, instance_id), 48);
        assert_eq!(offset_of!(OptixInstance, traversable_handle), 64);
        assert_eq!(size_of::<OptixInstance>(), 80);
        assert_eq!(align_of::<OptixInstance>(), 16);
        assert_eq!(size_of::<OptixAabb>(), 24);
    }

    #[test]
    fn zeroed_build_input_keeps_tag() {
        let input = OptixBuildInput::zeroed(OptixBuildInputType::Instances);
        assert_eq!(input.type_, OptixBuildInputType::Instances);
        // SAFETY: every union variant is plain data and the payload is zeroed.
        let instances = unsafe { input.input.instance_array };
        assert_eq!(instances.num_instances, 0);
    }
}
