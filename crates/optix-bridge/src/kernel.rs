//! Kernels: program groups built from kernel sources.
//!
//! Each `create_*_kernel` compiles sources through the context's
//! [`KernelBackend`](optix_bridge_ptx::KernelBackend), rewrites the PTX into
//! an OptiX program, builds the module and the program group, and hands both
//! to a [`Kernel`] that owns them.

use crate::context::DeviceContext;
use crate::error::{Error, Result};
use crate::module::{Module, ModuleCompileOptions};
use crate::pipeline::PipelineCompileOptions;
use crate::program_group::{ProgramGroup, ProgramGroupDesc};
use optix_bridge_ptx::{generate_optix_ptx, KernelSource, ProgramKind};

/// A program group and the modules its programs live in.
pub struct Kernel {
    // Declared first so the group is destroyed before its modules.
    program_group: ProgramGroup,
    modules: Vec<Module>,
}

impl Kernel {
    /// The program group.
    pub fn program_group(&self) -> &ProgramGroup {
        &self.program_group
    }

    /// Modules referenced by the program group. Missing programs have none.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("program_group", &self.program_group)
            .field("modules", &self.modules.len())
            .finish()
    }
}

/// A compiled program: its module and entry name.
struct CompiledProgram {
    module: Module,
    entry_name: String,
}

impl CompiledProgram {
    fn as_program(&self) -> (&Module, &str) {
        (&self.module, self.entry_name.as_str())
    }
}

/// Group description for kinds that form a group on their own.
fn single_group_desc<'a>(
    kind: ProgramKind,
    module: &'a Module,
    entry: &str,
) -> Result<ProgramGroupDesc<'a>> {
    match kind {
        ProgramKind::Raygen => ProgramGroupDesc::raygen(module, entry),
        ProgramKind::Miss => ProgramGroupDesc::miss(module, entry),
        ProgramKind::Exception => ProgramGroupDesc::exception(module, entry),
        other => Err(Error::InvalidArgument(format!(
            "{other:?} programs are not a standalone program group"
        ))),
    }
}

impl DeviceContext {
    fn compile_program(
        &self,
        source: &KernelSource,
        kind: ProgramKind,
        module_options: &ModuleCompileOptions,
        pipeline_options: &PipelineCompileOptions,
    ) -> Result<CompiledProgram> {
        let generated = generate_optix_ptx(self.backend(), source, kind)?;
        let module = self.create_module(module_options, pipeline_options, &generated.ptx)?;
        tracing::debug!("Compiled {} program {}", kind, generated.entry_name);
        Ok(CompiledProgram {
            module,
            entry_name: generated.entry_name,
        })
    }

    fn compile_optional(
        &self,
        source: Option<&KernelSource>,
        kind: ProgramKind,
        module_options: &ModuleCompileOptions,
        pipeline_options: &PipelineCompileOptions,
    ) -> Result<Option<CompiledProgram>> {
        source
            .map(|s| self.compile_program(s, kind, module_options, pipeline_options))
            .transpose()
    }

    fn create_single_kernel(
        &self,
        source: &KernelSource,
        kind: ProgramKind,
        module_options: &ModuleCompileOptions,
        pipeline_options: &PipelineCompileOptions,
    ) -> Result<Kernel> {
        let program = self.compile_program(source, kind, module_options, pipeline_options)?;
        let (module, entry) = program.as_program();
        let desc = single_group_desc(kind, module, entry)?;
        let mut group = self.create_program_group(&desc)?;
        drop(desc);
        Ok(Kernel {
            program_group: group.transfer(),
            modules: vec![program.module],
        })
    }

    /// Ray generation kernel.
    pub fn create_raygen_kernel(
        &self,
        source: &KernelSource,
        module_options: &ModuleCompileOptions,
        pipeline_options: &PipelineCompileOptions,
    ) -> Result<Kernel> {
        self.create_single_kernel(source, ProgramKind::Raygen, module_options, pipeline_options)
    }

    /// Miss kernel.
    pub fn create_miss_kernel(
        &self,
        source: &KernelSource,
        module_options: &ModuleCompileOptions,
        pipeline_options: &PipelineCompileOptions,
    ) -> Result<Kernel> {
        self.create_single_kernel(source, ProgramKind::Miss, module_options, pipeline_options)
    }

    /// Exception kernel.
    pub fn create_exception_kernel(
        &self,
        source: &KernelSource,
        module_options: &ModuleCompileOptions,
        pipeline_options: &PipelineCompileOptions,
    ) -> Result<Kernel> {
        self.create_single_kernel(source, ProgramKind::Exception, module_options, pipeline_options)
    }

    /// Hit group kernel. Any of the three programs may be absent.
    pub fn create_hitgroup_kernel(
        &self,
        closest_hit: Option<&KernelSource>,
        any_hit: Option<&KernelSource>,
        intersection: Option<&KernelSource>,
        module_options: &ModuleCompileOptions,
        pipeline_options: &PipelineCompileOptions,
    ) -> Result<Kernel> {
        let programs = vec![
            self.compile_optional(closest_hit, ProgramKind::ClosestHit, module_options, pipeline_options)?,
            self.compile_optional(any_hit, ProgramKind::AnyHit, module_options, pipeline_options)?,
            self.compile_optional(intersection, ProgramKind::Intersection, module_options, pipeline_options)?,
        ];
        let desc = ProgramGroupDesc::hitgroup(
            programs[0].as_ref().map(CompiledProgram::as_program),
            programs[1].as_ref().map(CompiledProgram::as_program),
            programs[2].as_ref().map(CompiledProgram::as_program),
        )?;
        let mut group = self.create_program_group(&desc)?;
        drop(desc);
        Ok(Kernel {
            program_group: group.transfer(),
            modules: programs.into_iter().flatten().map(|p| p.module).collect(),
        })
    }

    /// Callables kernel. Either callable may be absent.
    pub fn create_callables_kernel(
        &self,
        direct: Option<&KernelSource>,
        continuation: Option<&KernelSource>,
        module_options: &ModuleCompileOptions,
        pipeline_options: &PipelineCompileOptions,
    ) -> Result<Kernel> {
        let programs = vec![
            self.compile_optional(direct, ProgramKind::DirectCallable, module_options, pipeline_options)?,
            self.compile_optional(
                continuation,
                ProgramKind::ContinuationCallable,
                module_options,
                pipeline_options,
            )?,
        ];
        let desc = ProgramGroupDesc::callables(
            programs[0].as_ref().map(CompiledProgram::as_program),
            programs[1].as_ref().map(CompiledProgram::as_program),
        )?;
        let mut group = self.create_program_group(&desc)?;
        drop(desc);
        Ok(Kernel {
            program_group: group.transfer(),
            modules: programs.into_iter().flatten().map(|p| p.module).collect(),
        })
    }
}
