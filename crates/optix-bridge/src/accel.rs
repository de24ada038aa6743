//! Acceleration structure build inputs and builds.
//!
//! Build inputs borrow the device buffers they reference and own the small
//! host arrays (vertex buffer pointers per motion key, per-record geometry
//! flags) the ABI points at, so lowering with [`BuildInput::to_raw`] yields
//! a record that stays valid while the input lives.

use crate::context::DeviceContext;
use crate::error::Result;
use bitflags::bitflags;
use optix_bridge_cuda::{CudaStream, DeviceBuffer};
use optix_bridge_sys::{
    CUdeviceptr, OptixAabb, OptixAccelBufferSizes, OptixAccelBuildOptions, OptixAccelEmitDesc,
    OptixAccelPropertyType, OptixBuildInput, OptixBuildInputCurveArray,
    OptixBuildInputCustomPrimitiveArray, OptixBuildInputInstanceArray,
    OptixBuildInputTriangleArray, OptixBuildInputType, OptixBuildInputUnion,
    OptixBuildOperation, OptixIndicesFormat, OptixInstance, OptixMotionOptions,
    OptixPrimitiveType, OptixTransformFormat, OptixTraversableHandle, OptixVertexFormat,
    OPTIX_BUILD_FLAG_ALLOW_COMPACTION, OPTIX_BUILD_FLAG_ALLOW_RANDOM_VERTEX_ACCESS,
    OPTIX_BUILD_FLAG_ALLOW_UPDATE, OPTIX_BUILD_FLAG_PREFER_FAST_BUILD,
    OPTIX_BUILD_FLAG_PREFER_FAST_TRACE, OPTIX_GEOMETRY_FLAG_DISABLE_ANYHIT,
    OPTIX_GEOMETRY_FLAG_REQUIRE_SINGLE_ANYHIT_CALL, OPTIX_MOTION_FLAG_END_VANISH,
    OPTIX_MOTION_FLAG_START_VANISH,
};
use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr;

bitflags! {
    /// Acceleration structure build flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BuildFlags: u32 {
        const ALLOW_UPDATE = OPTIX_BUILD_FLAG_ALLOW_UPDATE;
        const ALLOW_COMPACTION = OPTIX_BUILD_FLAG_ALLOW_COMPACTION;
        const PREFER_FAST_TRACE = OPTIX_BUILD_FLAG_PREFER_FAST_TRACE;
        const PREFER_FAST_BUILD = OPTIX_BUILD_FLAG_PREFER_FAST_BUILD;
        const ALLOW_RANDOM_VERTEX_ACCESS = OPTIX_BUILD_FLAG_ALLOW_RANDOM_VERTEX_ACCESS;
    }

    /// Per-SBT-record geometry flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GeometryFlags: u32 {
        const DISABLE_ANYHIT = OPTIX_GEOMETRY_FLAG_DISABLE_ANYHIT;
        const REQUIRE_SINGLE_ANYHIT_CALL = OPTIX_GEOMETRY_FLAG_REQUIRE_SINGLE_ANYHIT_CALL;
    }

    /// Motion boundary behaviour.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MotionFlags: u16 {
        const START_VANISH = OPTIX_MOTION_FLAG_START_VANISH;
        const END_VANISH = OPTIX_MOTION_FLAG_END_VANISH;
    }
}

/// Motion keys of a build. One key means no motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionOptions {
    pub num_keys: u16,
    pub flags: MotionFlags,
    pub time_begin: f32,
    pub time_end: f32,
}

impl Default for MotionOptions {
    fn default() -> Self {
        Self {
            num_keys: 1,
            flags: MotionFlags::empty(),
            time_begin: 0.0,
            time_end: 1.0,
        }
    }
}

impl MotionOptions {
    fn to_raw(self) -> OptixMotionOptions {
        OptixMotionOptions {
            // Zero keys is not a valid count.
            num_keys: self.num_keys.max(1),
            flags: self.flags.bits(),
            time_begin: self.time_begin,
            time_end: self.time_end,
        }
    }
}

/// Options for building or updating an acceleration structure.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccelBuildOptions {
    pub build_flags: BuildFlags,
    pub operation: OptixBuildOperation,
    pub motion: MotionOptions,
}

impl AccelBuildOptions {
    /// A fresh build with `flags`.
    pub fn new(flags: BuildFlags) -> Self {
        Self {
            build_flags: flags,
            ..Self::default()
        }
    }

    pub fn to_raw(&self) -> OptixAccelBuildOptions {
        OptixAccelBuildOptions {
            build_flags: self.build_flags.bits(),
            operation: self.operation,
            motion_options: self.motion.to_raw(),
        }
    }
}

/// Buffer sizes required by a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccelBufferSizes {
    pub output_size_in_bytes: usize,
    pub temp_size_in_bytes: usize,
    pub temp_update_size_in_bytes: usize,
}

impl From<OptixAccelBufferSizes> for AccelBufferSizes {
    fn from(sizes: OptixAccelBufferSizes) -> Self {
        Self {
            output_size_in_bytes: sizes.output_size_in_bytes,
            temp_size_in_bytes: sizes.temp_size_in_bytes,
            temp_update_size_in_bytes: sizes.temp_update_size_in_bytes,
        }
    }
}

/// A property the build writes into a device buffer.
#[derive(Debug, Clone, Copy)]
pub struct AccelEmitDesc<'a> {
    result: CUdeviceptr,
    kind: OptixAccelPropertyType,
    _buffer: PhantomData<&'a ()>,
}

impl<'a> AccelEmitDesc<'a> {
    /// Emit the compacted size as one `u64`.
    pub fn compacted_size(buffer: &'a DeviceBuffer<u64>) -> Self {
        Self {
            result: buffer.device_ptr(),
            kind: OptixAccelPropertyType::CompactedSize,
            _buffer: PhantomData,
        }
    }

    /// Emit the bounding box of the built structure.
    pub fn aabbs(buffer: &'a DeviceBuffer<OptixAabb>) -> Self {
        Self {
            result: buffer.device_ptr(),
            kind: OptixAccelPropertyType::Aabbs,
            _buffer: PhantomData,
        }
    }

    pub fn raw(&self) -> OptixAccelEmitDesc {
        OptixAccelEmitDesc {
            result: self.result,
            type_: self.kind,
        }
    }
}

/// Default per-record flags: one record, no flags.
fn single_record_flags() -> Vec<u32> {
    vec![GeometryFlags::empty().bits()]
}

fn record_flags(flags: &[GeometryFlags]) -> Vec<u32> {
    if flags.is_empty() {
        single_record_flags()
    } else {
        flags.iter().map(|f| f.bits()).collect()
    }
}

/// Whether a compacted copy of size `compacted` is worth keeping over an
/// `output`-byte build. A zero size means nothing was emitted.
fn keep_compacted(compacted: u64, output: usize) -> bool {
    compacted > 0 && compacted < output as u64
}

/// SBT index offsets for inputs with several records.
#[derive(Debug, Clone, Copy, Default)]
struct SbtIndexOffsets {
    buffer: CUdeviceptr,
    size_in_bytes: u32,
    stride_in_bytes: u32,
}

impl SbtIndexOffsets {
    fn from_buffer<I: Copy>(buffer: &DeviceBuffer<I>) -> Self {
        Self {
            buffer: buffer.device_ptr(),
            size_in_bytes: size_of::<I>() as u32,
            stride_in_bytes: size_of::<I>() as u32,
        }
    }
}

/// Triangle mesh input.
#[derive(Debug, Clone)]
pub struct TriangleArray<'a> {
    vertex_buffers: Vec<CUdeviceptr>,
    num_vertices: u32,
    vertex_format: OptixVertexFormat,
    vertex_stride: u32,
    index_buffer: CUdeviceptr,
    num_index_triplets: u32,
    index_format: OptixIndicesFormat,
    index_stride: u32,
    pre_transform: CUdeviceptr,
    flags: Vec<u32>,
    sbt_index_offsets: SbtIndexOffsets,
    primitive_index_offset: u32,
    _buffers: PhantomData<&'a ()>,
}

impl<'a> TriangleArray<'a> {
    /// Vertices with one element of `V` per vertex, e.g. `[f32; 3]` for `Float3`.
    pub fn new<V: Copy>(vertices: &'a DeviceBuffer<V>, format: OptixVertexFormat) -> Self {
        Self {
            vertex_buffers: vec![vertices.device_ptr()],
            num_vertices: vertices.len() as u32,
            vertex_format: format,
            vertex_stride: size_of::<V>() as u32,
            index_buffer: 0,
            num_index_triplets: 0,
            index_format: OptixIndicesFormat::None,
            index_stride: 0,
            pre_transform: 0,
            flags: single_record_flags(),
            sbt_index_offsets: SbtIndexOffsets::default(),
            primitive_index_offset: 0,
            _buffers: PhantomData,
        }
    }

    /// Vertices of the next motion key. Must match the first key's layout.
    pub fn motion_key<V: Copy>(mut self, vertices: &'a DeviceBuffer<V>) -> Self {
        self.vertex_buffers.push(vertices.device_ptr());
        self
    }

    /// Index triplets with one element of `I` per triangle, e.g. `[u32; 3]`.
    pub fn indices<I: Copy>(mut self, indices: &'a DeviceBuffer<I>, format: OptixIndicesFormat) -> Self {
        self.index_buffer = indices.device_ptr();
        self.num_index_triplets = indices.len() as u32;
        self.index_format = format;
        self.index_stride = size_of::<I>() as u32;
        self
    }

    /// 3x4 row-major transform applied to the vertices during the build.
    pub fn pre_transform(mut self, transform: &'a DeviceBuffer<[f32; 12]>) -> Self {
        self.pre_transform = transform.device_ptr();
        self
    }

    /// Flags per SBT record; the number of records is `flags.len()`, or
    /// one unflagged record when `flags` is empty.
    pub fn geometry_flags(mut self, flags: &[GeometryFlags]) -> Self {
        self.flags = record_flags(flags);
        self
    }

    /// Per-primitive SBT record index.
    pub fn sbt_index_offsets<I: Copy>(mut self, offsets: &'a DeviceBuffer<I>) -> Self {
        self.sbt_index_offsets = SbtIndexOffsets::from_buffer(offsets);
        self
    }

    pub fn primitive_index_offset(mut self, offset: u32) -> Self {
        self.primitive_index_offset = offset;
        self
    }

    fn to_raw(&self) -> OptixBuildInputTriangleArray {
        OptixBuildInputTriangleArray {
            vertex_buffers: self.vertex_buffers.as_ptr(),
            num_vertices: self.num_vertices,
            vertex_format: self.vertex_format,
            vertex_stride_in_bytes: self.vertex_stride,
            index_buffer: self.index_buffer,
            num_index_triplets: self.num_index_triplets,
            index_format: self.index_format,
            index_stride_in_bytes: self.index_stride,
            pre_transform: self.pre_transform,
            flags: self.flags.as_ptr(),
            num_sbt_records: self.flags.len() as u32,
            sbt_index_offset_buffer: self.sbt_index_offsets.buffer,
            sbt_index_offset_size_in_bytes: self.sbt_index_offsets.size_in_bytes,
            sbt_index_offset_stride_in_bytes: self.sbt_index_offsets.stride_in_bytes,
            primitive_index_offset: self.primitive_index_offset,
            transform_format: if self.pre_transform == 0 {
                OptixTransformFormat::None
            } else {
                OptixTransformFormat::MatrixFloat12
            },
        }
    }
}

/// Axis-aligned boxes for custom primitives.
#[derive(Debug, Clone)]
pub struct CustomPrimitiveArray<'a> {
    aabb_buffers: Vec<CUdeviceptr>,
    num_primitives: u32,
    flags: Vec<u32>,
    sbt_index_offsets: SbtIndexOffsets,
    primitive_index_offset: u32,
    _buffers: PhantomData<&'a ()>,
}

impl<'a> CustomPrimitiveArray<'a> {
    pub fn new(aabbs: &'a DeviceBuffer<OptixAabb>) -> Self {
        Self {
            aabb_buffers: vec![aabbs.device_ptr()],
            num_primitives: aabbs.len() as u32,
            flags: single_record_flags(),
            sbt_index_offsets: SbtIndexOffsets::default(),
            primitive_index_offset: 0,
            _buffers: PhantomData,
        }
    }

    pub fn motion_key(mut self, aabbs: &'a DeviceBuffer<OptixAabb>) -> Self {
        self.aabb_buffers.push(aabbs.device_ptr());
        self
    }

    pub fn geometry_flags(mut self, flags: &[GeometryFlags]) -> Self {
        self.flags = record_flags(flags);
        self
    }

    pub fn sbt_index_offsets<I: Copy>(mut self, offsets: &'a DeviceBuffer<I>) -> Self {
        self.sbt_index_offsets = SbtIndexOffsets::from_buffer(offsets);
        self
    }

    pub fn primitive_index_offset(mut self, offset: u32) -> Self {
        self.primitive_index_offset = offset;
        self
    }

    fn to_raw(&self) -> OptixBuildInputCustomPrimitiveArray {
        OptixBuildInputCustomPrimitiveArray {
            aabb_buffers: self.aabb_buffers.as_ptr(),
            num_primitives: self.num_primitives,
            stride_in_bytes: 0,
            flags: self.flags.as_ptr(),
            num_sbt_records: self.flags.len() as u32,
            sbt_index_offset_buffer: self.sbt_index_offsets.buffer,
            sbt_index_offset_size_in_bytes: self.sbt_index_offsets.size_in_bytes,
            sbt_index_offset_stride_in_bytes: self.sbt_index_offsets.stride_in_bytes,
            primitive_index_offset: self.primitive_index_offset,
        }
    }
}

/// Instances of other traversables.
#[derive(Debug, Clone, Copy)]
pub struct InstanceArray<'a> {
    instances: CUdeviceptr,
    num_instances: u32,
    _buffer: PhantomData<&'a ()>,
}

impl<'a> InstanceArray<'a> {
    pub fn new(instances: &'a DeviceBuffer<OptixInstance>) -> Self {
        Self {
            instances: instances.device_ptr(),
            num_instances: instances.len() as u32,
            _buffer: PhantomData,
        }
    }

    fn to_raw(self) -> OptixBuildInputInstanceArray {
        OptixBuildInputInstanceArray {
            instances: self.instances,
            num_instances: self.num_instances,
        }
    }
}

/// Curve segments intersected by a built-in intersector.
#[derive(Debug, Clone)]
pub struct CurveArray<'a> {
    curve_type: OptixPrimitiveType,
    vertex_buffers: Vec<CUdeviceptr>,
    num_vertices: u32,
    width_buffers: Vec<CUdeviceptr>,
    normal_buffers: Vec<CUdeviceptr>,
    index_buffer: CUdeviceptr,
    num_primitives: u32,
    flag: GeometryFlags,
    primitive_index_offset: u32,
    _buffers: PhantomData<&'a ()>,
}

impl<'a> CurveArray<'a> {
    /// One control point and width per vertex, one segment start index per primitive.
    pub fn new(
        curve_type: OptixPrimitiveType,
        vertices: &'a DeviceBuffer<[f32; 3]>,
        widths: &'a DeviceBuffer<f32>,
        indices: &'a DeviceBuffer<u32>,
    ) -> Self {
        Self {
            curve_type,
            vertex_buffers: vec![vertices.device_ptr()],
            num_vertices: vertices.len() as u32,
            width_buffers: vec![widths.device_ptr()],
            normal_buffers: Vec::new(),
            index_buffer: indices.device_ptr(),
            num_primitives: indices.len() as u32,
            flag: GeometryFlags::empty(),
            primitive_index_offset: 0,
            _buffers: PhantomData,
        }
    }

    pub fn motion_key(
        mut self,
        vertices: &'a DeviceBuffer<[f32; 3]>,
        widths: &'a DeviceBuffer<f32>,
    ) -> Self {
        self.vertex_buffers.push(vertices.device_ptr());
        self.width_buffers.push(widths.device_ptr());
        self
    }

    pub fn geometry_flag(mut self, flag: GeometryFlags) -> Self {
        self.flag = flag;
        self
    }

    pub fn primitive_index_offset(mut self, offset: u32) -> Self {
        self.primitive_index_offset = offset;
        self
    }

    fn to_raw(&self) -> OptixBuildInputCurveArray {
        OptixBuildInputCurveArray {
            curve_type: self.curve_type,
            num_primitives: self.num_primitives,
            vertex_buffers: self.vertex_buffers.as_ptr(),
            num_vertices: self.num_vertices,
            vertex_stride_in_bytes: 0,
            width_buffers: self.width_buffers.as_ptr(),
            width_stride_in_bytes: 0,
            normal_buffers: if self.normal_buffers.is_empty() {
                ptr::null()
            } else {
                self.normal_buffers.as_ptr()
            },
            normal_stride_in_bytes: 0,
            index_buffer: self.index_buffer,
            index_stride_in_bytes: 0,
            flag: self.flag.bits(),
            primitive_index_offset: self.primitive_index_offset,
        }
    }
}

/// One input of an acceleration structure build.
#[derive(Debug, Clone)]
pub enum BuildInput<'a> {
    Triangles(TriangleArray<'a>),
    CustomPrimitives(CustomPrimitiveArray<'a>),
    Instances(InstanceArray<'a>),
    Curves(CurveArray<'a>),
}

impl BuildInput<'_> {
    /// ABI record pointing into `self`.
    pub fn to_raw(&self) -> OptixBuildInput {
        match self {
            Self::Triangles(input) => {
                let mut raw = OptixBuildInput::zeroed(OptixBuildInputType::Triangles);
                raw.input = with_pad(|u| u.triangle_array = input.to_raw());
                raw
            }
            Self::CustomPrimitives(input) => {
                let mut raw = OptixBuildInput::zeroed(OptixBuildInputType::CustomPrimitives);
                raw.input = with_pad(|u| u.custom_primitive_array = input.to_raw());
                raw
            }
            Self::Instances(input) => {
                let mut raw = OptixBuildInput::zeroed(OptixBuildInputType::Instances);
                raw.input = with_pad(|u| u.instance_array = input.to_raw());
                raw
            }
            Self::Curves(input) => {
                let mut raw = OptixBuildInput::zeroed(OptixBuildInputType::Curves);
                raw.input = with_pad(|u| u.curve_array = input.to_raw());
                raw
            }
        }
    }
}

/// A zero-filled union with one arm written.
fn with_pad(write: impl FnOnce(&mut OptixBuildInputUnion)) -> OptixBuildInputUnion {
    let mut union = OptixBuildInputUnion {
        pad: [0; optix_bridge_sys::OPTIX_BUILD_INPUT_UNION_SIZE],
    };
    write(&mut union);
    union
}

impl<'a> From<TriangleArray<'a>> for BuildInput<'a> {
    fn from(input: TriangleArray<'a>) -> Self {
        Self::Triangles(input)
    }
}

impl<'a> From<CustomPrimitiveArray<'a>> for BuildInput<'a> {
    fn from(input: CustomPrimitiveArray<'a>) -> Self {
        Self::CustomPrimitives(input)
    }
}

impl<'a> From<InstanceArray<'a>> for BuildInput<'a> {
    fn from(input: InstanceArray<'a>) -> Self {
        Self::Instances(input)
    }
}

impl<'a> From<CurveArray<'a>> for BuildInput<'a> {
    fn from(input: CurveArray<'a>) -> Self {
        Self::Curves(input)
    }
}

/// A built acceleration structure and the memory backing it.
pub struct Accel {
    buffer: DeviceBuffer<u8>,
    handle: OptixTraversableHandle,
}

impl Accel {
    /// Build from `inputs`, compacting when `ALLOW_COMPACTION` is set and
    /// the compacted size is smaller.
    ///
    /// Blocks until the build has finished on `stream`.
    pub fn build(
        context: &DeviceContext,
        stream: &CudaStream,
        options: &AccelBuildOptions,
        inputs: &[BuildInput<'_>],
    ) -> Result<Self> {
        let cuda = context.cuda();
        let sizes = context.accel_compute_memory_usage(options, inputs)?;
        tracing::debug!(
            "Acceleration structure sizes: output {} B, temp {} B",
            sizes.output_size_in_bytes,
            sizes.temp_size_in_bytes
        );

        let temp = DeviceBuffer::<u8>::zeroed(cuda, sizes.temp_size_in_bytes)?;
        let output = DeviceBuffer::<u8>::zeroed(cuda, sizes.output_size_in_bytes)?;
        let compacted_size = DeviceBuffer::<u64>::zeroed(cuda, 1)?;

        let compact = options.build_flags.contains(BuildFlags::ALLOW_COMPACTION);
        let emitted = if compact {
            vec![AccelEmitDesc::compacted_size(&compacted_size)]
        } else {
            Vec::new()
        };

        let handle = context.accel_build(stream, options, inputs, &temp, &output, &emitted)?;
        stream.synchronize()?;

        if compact {
            let emitted_size = compacted_size.to_vec()?.first().copied().unwrap_or(0);
            if keep_compacted(emitted_size, output.size_in_bytes()) {
                let size = emitted_size as usize;
                let compacted = DeviceBuffer::<u8>::zeroed(cuda, size)?;
                let handle = context.accel_compact(stream, handle, &compacted)?;
                stream.synchronize()?;
                tracing::info!(
                    "Compacted acceleration structure from {} B to {} B",
                    output.size_in_bytes(),
                    size
                );
                return Ok(Self {
                    buffer: compacted,
                    handle,
                });
            }
        }

        tracing::info!(
            "Built acceleration structure ({} B)",
            output.size_in_bytes()
        );
        Ok(Self {
            buffer: output,
            handle,
        })
    }

    /// Handle passed to `optixTrace` through the launch parameters.
    pub fn handle(&self) -> OptixTraversableHandle {
        self.handle
    }

    /// Device memory holding the structure.
    pub fn buffer(&self) -> &DeviceBuffer<u8> {
        &self.buffer
    }
}

impl std::fmt::Debug for Accel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accel")
            .field("handle", &self.handle)
            .field("size_in_bytes", &self.buffer.size_in_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optix_bridge_sys::OPTIX_BUILD_INPUT_UNION_SIZE;

    #[test]
    fn motion_defaults_to_one_key() {
        let raw = AccelBuildOptions::new(BuildFlags::ALLOW_COMPACTION).to_raw();
        assert_eq!(raw.build_flags, OPTIX_BUILD_FLAG_ALLOW_COMPACTION);
        assert_eq!(raw.operation, OptixBuildOperation::Build);
        assert_eq!(raw.motion_options.num_keys, 1);
    }

    #[test]
    fn zero_motion_keys_are_lowered_to_one() {
        let options = AccelBuildOptions {
            motion: MotionOptions {
                num_keys: 0,
                flags: MotionFlags::END_VANISH,
                ..MotionOptions::default()
            },
            ..AccelBuildOptions::default()
        };
        let raw = options.to_raw();
        assert_eq!(raw.motion_options.num_keys, 1);
        assert_eq!(raw.motion_options.flags, OPTIX_MOTION_FLAG_END_VANISH);
    }

    #[test]
    fn flag_bits_match_abi() {
        assert_eq!(BuildFlags::PREFER_FAST_TRACE.bits(), 1 << 2);
        assert_eq!(GeometryFlags::DISABLE_ANYHIT.bits(), 1);
        assert_eq!(MotionFlags::START_VANISH.bits(), 1);
    }

    #[test]
    fn buffer_sizes_convert() {
        let sizes: AccelBufferSizes = OptixAccelBufferSizes {
            output_size_in_bytes: 1024,
            temp_size_in_bytes: 512,
            temp_update_size_in_bytes: 0,
        }
        .into();
        assert_eq!(sizes.output_size_in_bytes, 1024);
        assert_eq!(sizes.temp_size_in_bytes, 512);
    }

    #[test]
    fn triangle_input_without_buffers_lowers() {
        let input = TriangleArray {
            vertex_buffers: vec![0x1000],
            num_vertices: 8,
            vertex_format: OptixVertexFormat::Float3,
            vertex_stride: 12,
            index_buffer: 0x2000,
            num_index_triplets: 12,
            index_format: OptixIndicesFormat::UnsignedInt3,
            index_stride: 12,
            pre_transform: 0,
            flags: single_record_flags(),
            sbt_index_offsets: SbtIndexOffsets::default(),
            primitive_index_offset: 0,
            _buffers: PhantomData,
        };
        let build_input = BuildInput::from(input);
        let raw = build_input.to_raw();
        assert_eq!(raw.type_, OptixBuildInputType::Triangles);

        // SAFETY: triangle arm for a triangle input.
        let triangles = unsafe { raw.input.triangle_array };
        assert_eq!(triangles.num_vertices, 8);
        assert_eq!(triangles.num_index_triplets, 12);
        assert_eq!(triangles.num_sbt_records, 1);
        assert_eq!(triangles.transform_format, OptixTransformFormat::None);
        // SAFETY: points into `build_input`.
        assert_eq!(unsafe { *triangles.vertex_buffers }, 0x1000);
        assert_eq!(unsafe { *triangles.flags }, 0);
        assert!(size_of::<OptixBuildInputTriangleArray>() <= OPTIX_BUILD_INPUT_UNION_SIZE);
    }

    #[test]
    fn geometry_flags_set_record_count() {
        let mut input = CustomPrimitiveArray {
            aabb_buffers: vec![0x3000],
            num_primitives: 4,
            flags: single_record_flags(),
            sbt_index_offsets: SbtIndexOffsets::default(),
            primitive_index_offset: 0,
            _buffers: PhantomData,
        };
        input = input.geometry_flags(&[GeometryFlags::DISABLE_ANYHIT, GeometryFlags::empty()]);
        let raw = BuildInput::CustomPrimitives(input).to_raw();
        assert_eq!(raw.type_, OptixBuildInputType::CustomPrimitives);
        // SAFETY: custom primitive arm.
        let custom = unsafe { raw.input.custom_primitive_array };
        assert_eq!(custom.num_primitives, 4);
        assert_eq!(custom.num_sbt_records, 2);
    }

    #[test]
    fn empty_geometry_flags_keep_one_record() {
        let input = CustomPrimitiveArray {
            aabb_buffers: vec![0x3000],
            num_primitives: 4,
            flags: single_record_flags(),
            sbt_index_offsets: SbtIndexOffsets::default(),
            primitive_index_offset: 0,
            _buffers: PhantomData,
        }
        .geometry_flags(&[]);
        let build_input = BuildInput::CustomPrimitives(input);
        let raw = build_input.to_raw();
        // SAFETY: custom primitive arm.
        let custom = unsafe { raw.input.custom_primitive_array };
        assert_eq!(custom.num_sbt_records, 1);
        // SAFETY: points into `build_input`.
        assert_eq!(unsafe { *custom.flags }, GeometryFlags::empty().bits());
    }

    #[test]
    fn compaction_kept_only_when_smaller() {
        assert!(keep_compacted(4096, 8192));
        assert!(!keep_compacted(8192, 8192));
        assert!(!keep_compacted(9000, 8192));
        assert!(!keep_compacted(0, 8192));
    }

    #[test]
    fn instance_input_lowers() {
        let input = InstanceArray {
            instances: 0x4000,
            num_instances: 3,
            _buffer: PhantomData,
        };
        let raw = BuildInput::Instances(input).to_raw();
        // SAFETY: instance arm.
        let instances = unsafe { raw.input.instance_array };
        assert_eq!(instances.instances, 0x4000);
        assert_eq!(instances.num_instances, 3);
    }

    #[test]
    fn curve_input_without_normals_passes_null() {
        let input = CurveArray {
            curve_type: OptixPrimitiveType::RoundLinear,
            vertex_buffers: vec![0x5000],
            num_vertices: 4,
            width_buffers: vec![0x6000],
            normal_buffers: Vec::new(),
            index_buffer: 0x7000,
            num_primitives: 3,
            flag: GeometryFlags::empty(),
            primitive_index_offset: 0,
            _buffers: PhantomData,
        };
        let raw = BuildInput::Curves(input).to_raw();
        // SAFETY: curve arm.
        let curves = unsafe { raw.input.curve_array };
        assert_eq!(curves.curve_type, OptixPrimitiveType::RoundLinear);
        assert_eq!(curves.num_primitives, 3);
        assert_eq!(curves.index_buffer, 0x7000);
        assert!(curves.normal_buffers.is_null());
    }
}
