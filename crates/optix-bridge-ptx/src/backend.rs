//! Kernel compiler seam.
//!
//! The bridge never generates code itself. A [`KernelBackend`] turns kernel
//! sources into PTX and also emits the placeholder entry used to derive the
//! OptiX entry wrapper. [`PrecompiledBackend`] serves PTX produced ahead of
//! time.

use crate::error::{PtxError, Result};
use crate::layout::ParamLayout;
use crate::placeholder;
use crate::COMPILED_ENTRY_NAME;
use std::fmt::Write as _;

/// PTX ISA version and target architecture of emitted modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtxTarget {
    pub isa: (u32, u32),
    pub arch: String,
}

impl Default for PtxTarget {
    fn default() -> Self {
        Self {
            isa: crate::MAX_OPTIX_PTX_ISA,
            arch: "sm_60".to_string(),
        }
    }
}

impl PtxTarget {
    /// Module header: `.version`, `.target` and `.address_size`.
    pub fn header(&self) -> String {
        format!(
            ".version {}.{}\n.target {}\n.address_size 64\n",
            self.isa.0, self.isa.1, self.arch
        )
    }
}

/// A kernel to compile: its name and its source.
#[derive(Debug, Clone)]
pub struct KernelSource {
    /// Name used to build the OptiX entry name, e.g. `renderFrame`.
    pub name: String,
    /// PTX module text defining the compiled entry.
    pub ptx: String,
    /// Layout of the kernel's launch parameter.
    pub layout: ParamLayout,
}

impl KernelSource {
    /// Source from a full PTX module.
    pub fn from_ptx(name: impl Into<String>, ptx: impl Into<String>, layout: ParamLayout) -> Self {
        Self {
            name: name.into(),
            ptx: ptx.into(),
            layout,
        }
    }

    /// Wrap a kernel body into a module with the compiled entry signature.
    ///
    /// `body` is the PTX between the braces, minus the final `ret;`. The
    /// parameter is named `Kernel_param_0`.
    pub fn from_body(
        name: impl Into<String>,
        body: &str,
        layout: ParamLayout,
        target: &PtxTarget,
    ) -> Self {
        let mut ptx = target.header();
        ptx.push('\n');
        let _ = writeln!(ptx, ".visible .entry {COMPILED_ENTRY_NAME}(");
        let _ = writeln!(
            ptx,
            "\t.param .align 8 .b8 {COMPILED_ENTRY_NAME}_param_0[{}]",
            layout.size()
        );
        let _ = writeln!(ptx, ")");
        let _ = writeln!(ptx, "{{");
        ptx.push_str(body);
        if !body.ends_with('\n') {
            ptx.push('\n');
        }
        let _ = writeln!(ptx, "\tret;");
        let _ = writeln!(ptx, "}}");
        Self::from_ptx(name, ptx, layout)
    }
}

/// Output of a backend compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledKernel {
    /// PTX module text.
    pub assembly: String,
    /// Name of the `.entry` inside `assembly`.
    pub entry_name: String,
}

/// A compiler producing PTX for kernels.
pub trait KernelBackend: Send + Sync {
    /// PTX ISA version this backend emits.
    fn isa_version(&self) -> (u32, u32);

    /// Compile a kernel.
    fn compile(&self, source: &KernelSource) -> Result<CompiledKernel>;

    /// Compile an empty kernel taking one parameter of `layout`.
    fn compile_placeholder(&self, layout: ParamLayout) -> Result<CompiledKernel>;
}

/// Backend serving PTX that was produced offline.
#[derive(Debug, Clone, Default)]
pub struct PrecompiledBackend {
    target: PtxTarget,
}

impl PrecompiledBackend {
    /// Backend emitting placeholder modules for `target`.
    pub fn new(target: PtxTarget) -> Self {
        Self { target }
    }

    /// Target of emitted placeholder modules.
    pub fn target(&self) -> &PtxTarget {
        &self.target
    }
}

impl KernelBackend for PrecompiledBackend {
    fn isa_version(&self) -> (u32, u32) {
        self.target.isa
    }

    fn compile(&self, source: &KernelSource) -> Result<CompiledKernel> {
        let entry = format!(" .entry {COMPILED_ENTRY_NAME}");
        if !source.ptx.contains(&entry) {
            return Err(PtxError::MissingEntry(COMPILED_ENTRY_NAME.to_string()));
        }
        tracing::debug!("Serving precompiled kernel {}", source.name);
        Ok(CompiledKernel {
            assembly: source.ptx.clone(),
            entry_name: COMPILED_ENTRY_NAME.to_string(),
        })
    }

    fn compile_placeholder(&self, layout: ParamLayout) -> Result<CompiledKernel> {
        Ok(CompiledKernel {
            assembly: placeholder::synthesize(COMPILED_ENTRY_NAME, layout, &self.target)?,
            entry_name: COMPILED_ENTRY_NAME.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_target_is_optix_compatible() {
        let target = PtxTarget::default();
        assert_eq!(target.isa, (6, 4));
        assert!(target.header().starts_with(".version 6.4\n.target sm_60\n"));
    }

    #[test]
    fn body_is_wrapped_in_compiled_entry() {
        let source = KernelSource::from_body(
            "fill",
            "\t.reg .b32 \t%r<2>;\n",
            ParamLayout::new(16),
            &PtxTarget::default(),
        );
        assert!(source.ptx.contains(".visible .entry Kernel("));
        assert!(source.ptx.contains(".param .align 8 .b8 Kernel_param_0[16]"));
        assert!(source.ptx.trim_end().ends_with("ret;\n}"));
    }

    #[test]
    fn precompiled_backend_requires_compiled_entry() {
        let backend = PrecompiledBackend::default();
        let source = KernelSource::from_ptx("bad", ".visible .entry Other()\n{\n}\n", ParamLayout::new(8));
        assert!(matches!(backend.compile(&source), Err(PtxError::MissingEntry(_))));

        let good = KernelSource::from_body("good", "", ParamLayout::new(8), backend.target());
        let compiled = backend.compile(&good).unwrap();
        assert_eq!(compiled.entry_name, "Kernel");
        assert_eq!(compiled.assembly, good.ptx);
    }

    #[test]
    fn placeholder_comes_from_synthesizer() {
        let backend = PrecompiledBackend::default();
        let compiled = backend.compile_placeholder(ParamLayout::new(8)).unwrap();
        assert!(compiled.assembly.contains("ld.param.u64"));
        assert_eq!(backend.isa_version(), (6, 4));
    }
}
