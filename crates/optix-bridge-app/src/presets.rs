//! Compile settings and program sets shared by the samples.

use bytemuck::Pod;
use optix_bridge::cuda::DeviceBuffer;
use optix_bridge::ptx::{KernelSource, ParamLayout, PtxTarget, LAUNCH_PARAMS_VARIABLE};
use optix_bridge::{
    launch, pack_records, CompileDebugLevel, CompileOptimizationLevel, ExceptionFlags, Kernel,
    LaunchGuard, ModuleCompileOptions, Pipeline, PipelineCompileOptions, PipelineLinkOptions,
    Result, SbtRecord, ShaderBindingTable, TraversableGraphFlags,
};
use tracing::debug;

use crate::context::SampleContext;

/// Register limit for sample modules.
pub const MAX_REGISTER_COUNT: i32 = 50;
/// Payload and attribute registers used by the radiance programs.
pub const RADIANCE_VALUES: u32 = 2;
/// `optixTrace` recursion depth the pipelines are linked for.
pub const TRACE_DEPTH: u32 = 2;
/// Continuation and direct-callable stack size in bytes.
pub const STACK_SIZE: u32 = 2 * 1024;

/// Record type for every SBT entry; the data is an unused object id.
pub type ObjectRecord = SbtRecord<i32>;

pub fn module_options() -> ModuleCompileOptions {
    ModuleCompileOptions {
        max_register_count: MAX_REGISTER_COUNT,
        opt_level: CompileOptimizationLevel::Default,
        debug_level: CompileDebugLevel::None,
        bound_values: Vec::new(),
    }
}

pub fn pipeline_options() -> Result<PipelineCompileOptions> {
    PipelineCompileOptions::new()
        .traversable_graph_flags(TraversableGraphFlags::ALLOW_SINGLE_GAS)
        .payload_values(RADIANCE_VALUES)
        .attribute_values(RADIANCE_VALUES)
        .exception_flags(ExceptionFlags::empty())
        .launch_params_variable_name(LAUNCH_PARAMS_VARIABLE)
}

pub fn link_options() -> PipelineLinkOptions {
    PipelineLinkOptions::new(TRACE_DEPTH)
}

/// A program that does nothing, taking launch parameters of `layout`.
pub fn empty_program(name: &str, layout: ParamLayout) -> KernelSource {
    KernelSource::from_body(name, "", layout, &PtxTarget::default())
}

/// Raygen program plus empty radiance miss and hit programs, linked into a
/// pipeline with one record per program group.
pub struct RadiancePrograms {
    // The pipeline goes before the kernels it links.
    pipeline: Pipeline,
    raygen: Kernel,
    miss: Kernel,
    hitgroup: Kernel,
    raygen_records: DeviceBuffer<ObjectRecord>,
    miss_records: DeviceBuffer<ObjectRecord>,
    hitgroup_records: DeviceBuffer<ObjectRecord>,
}

impl RadiancePrograms {
    /// Compile and link the programs around `raygen`.
    pub fn new(ctx: &SampleContext, raygen: &KernelSource) -> Result<Self> {
        let module_options = module_options();
        let pipeline_options = pipeline_options()?;
        let radiance = empty_program("radiance", raygen.layout);

        let optix = &ctx.optix;
        let raygen = optix.create_raygen_kernel(raygen, &module_options, &pipeline_options)?;
        let miss = optix.create_miss_kernel(&radiance, &module_options, &pipeline_options)?;
        let hitgroup = optix.create_hitgroup_kernel(
            Some(&radiance),
            Some(&radiance),
            None,
            &module_options,
            &pipeline_options,
        )?;

        let pipeline = optix.create_pipeline(
            &pipeline_options,
            link_options(),
            &[
                raygen.program_group(),
                miss.program_group(),
                hitgroup.program_group(),
            ],
        )?;
        pipeline.set_stack_size(STACK_SIZE, STACK_SIZE, STACK_SIZE, 1)?;

        let raygen_records =
            DeviceBuffer::from_slice(&ctx.cuda, &pack_records::<ObjectRecord>(&[&raygen])?)?;
        let miss_records =
            DeviceBuffer::from_slice(&ctx.cuda, &pack_records::<ObjectRecord>(&[&miss])?)?;
        let hitgroup_records =
            DeviceBuffer::from_slice(&ctx.cuda, &pack_records::<ObjectRecord>(&[&hitgroup])?)?;
        debug!("Uploaded shader binding table records");

        Ok(Self {
            pipeline,
            raygen,
            miss,
            hitgroup,
            raygen_records,
            miss_records,
            hitgroup_records,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Kernels in link order: raygen, miss, hit group.
    pub fn kernels(&self) -> [&Kernel; 3] {
        [&self.raygen, &self.miss, &self.hitgroup]
    }

    /// Table over the uploaded records.
    pub fn sbt(&self) -> ShaderBindingTable<'_> {
        ShaderBindingTable::new(&self.raygen_records)
            .miss(&self.miss_records)
            .hitgroup(&self.hitgroup_records)
    }

    /// Launch one thread per frame buffer pixel.
    pub fn launch<'a, P: Pod>(
        &self,
        ctx: &'a SampleContext,
        params: &P,
    ) -> Result<LaunchGuard<'a, P>> {
        launch(
            &self.pipeline,
            &ctx.stream,
            params,
            &self.sbt(),
            ctx.width,
            ctx.height,
            1,
        )
    }
}
