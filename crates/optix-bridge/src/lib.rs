//! Safe OptiX 7 binding for a PTX-producing GPU kernel runtime.
//!
//! This crate provides:
//! - Locating and loading the OptiX driver library and its function table
//! - RAII wrappers for device contexts, modules, program groups and pipelines
//! - Kernel creation from PTX through a pluggable compiler backend
//! - Shader binding table packing
//! - Acceleration structure builds and compaction
//! - Pipeline launches
//!
//! Call [`init`] once before creating a [`DeviceContext`].

pub mod accel;
pub mod api;
pub mod context;
pub mod error;
pub mod kernel;
pub mod launch;
pub mod library;
pub mod module;
pub mod pipeline;
pub mod program_group;
pub mod sbt;

pub use accel::{
    Accel, AccelBufferSizes, AccelBuildOptions, AccelEmitDesc, BuildFlags, BuildInput,
    CurveArray, CustomPrimitiveArray, GeometryFlags, InstanceArray, MotionFlags, MotionOptions,
    TriangleArray,
};
pub use api::{api, init, init_with, is_initialized, uninit, OptixApi};
pub use context::{DeviceContext, DeviceContextOptions};
pub use error::{check, Error, Result};
pub use kernel::Kernel;
pub use launch::{launch, LaunchGuard};
pub use library::LoaderConfig;
pub use module::{BoundValue, Module, ModuleCompileOptions};
pub use pipeline::{
    ExceptionFlags, Pipeline, PipelineCompileOptions, PipelineLinkOptions, PrimitiveTypeFlags,
    TraversableGraphFlags, MAX_TRACE_DEPTH,
};
pub use program_group::{ProgramGroup, ProgramGroupDesc, StackSizes};
pub use sbt::{check_record_size, pack_records, SbtRecord, SbtRecordType, ShaderBindingTable};

pub use optix_bridge_sys::{
    OptixAabb as Aabb, OptixBuildOperation as BuildOperation,
    OptixCompileDebugLevel as CompileDebugLevel,
    OptixCompileOptimizationLevel as CompileOptimizationLevel,
    OptixIndicesFormat as IndicesFormat, OptixInstance as Instance,
    OptixPrimitiveType as PrimitiveType, OptixResult, OptixTraversableHandle as TraversableHandle,
    OptixVertexFormat as VertexFormat, SbtRecordHeader,
};

pub use optix_bridge_cuda as cuda;
pub use optix_bridge_ptx as ptx;
pub use optix_bridge_sys as sys;
