//! Entry retargeting and launch-parameter routing.

use crate::backend::{KernelBackend, KernelSource};
use crate::error::{PtxError, Result};
use crate::intrinsics;
use crate::program::ProgramKind;
use crate::{CALL_PARAM_NAME, LAUNCH_PARAMS_VARIABLE, MAX_OPTIX_PTX_ISA};
use once_cell::sync::OnceCell;
use regex::Regex;

struct Patterns {
    param_decl: Regex,
    param_load: Regex,
    param_store: Regex,
    version: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        Ok(Self {
            param_decl: Regex::new(r"\.param \.align 8 \.b8 (.+)\[(.+)\]")?,
            param_load: Regex::new(r"ld\.param\.(\S+)\s+(\S+),\s(\S+);")?,
            param_store: Regex::new(r"(st\.param\..+\[)([^\]+]+)")?,
            version: Regex::new(r"(?m)^\s*\.version\s+(\d+)\.(\d+)")?,
        })
    }
}

static PATTERNS: OnceCell<Patterns> = OnceCell::new();

fn patterns() -> Result<&'static Patterns> {
    PATTERNS.get_or_try_init(Patterns::new)
}

/// PTX ready for `optixModuleCreateFromPTX` plus the entry OptiX should bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptixPtx {
    pub ptx: String,
    pub entry_name: String,
}

/// Compile `kernel` and turn it into an OptiX program of the given kind.
///
/// The compiled entry becomes a `.func` named `_<entry>` and a generated
/// `.entry <entry>` is appended that forwards `optixLaunchParams` to it.
pub fn generate_optix_ptx(
    backend: &dyn KernelBackend,
    kernel: &KernelSource,
    kind: ProgramKind,
) -> Result<OptixPtx> {
    let compiled = backend.compile(kernel)?;
    let entry_name = kind.entry_name(&kernel.name);
    let alt_name = format!("_{entry_name}");

    let placeholder = backend.compile_placeholder(kernel.layout)?;
    let wrapper = generate_entry_kernel(
        &placeholder.assembly,
        &placeholder.entry_name,
        &entry_name,
        &alt_name,
    )?;

    let mut ptx = compiled.assembly.replace(
        &format!(" .entry {}", compiled.entry_name),
        &format!(" .func {alt_name}"),
    );
    ptx.push_str(&wrapper);

    if backend.isa_version() > MAX_OPTIX_PTX_ISA {
        ptx = ptx_isa_clamp(&ptx)?;
    }

    tracing::debug!(
        "Generated {} program {} using {:?}",
        kind,
        entry_name,
        intrinsics::used_intrinsics(&ptx)
    );

    Ok(OptixPtx { ptx, entry_name })
}

/// Derive the OptiX entry wrapper from a placeholder kernel.
///
/// `compiled_entry` is the entry name inside `placeholder_ptx`, `entry_name`
/// the OptiX entry to emit and `alt_name` the `.func` it calls.
pub fn generate_entry_kernel(
    placeholder_ptx: &str,
    compiled_entry: &str,
    entry_name: &str,
    alt_name: &str,
) -> Result<String> {
    let patterns = patterns()?;

    let start = placeholder_ptx
        .find(".visible .entry")
        .ok_or(PtxError::EntryNotFound)?;
    let mut ptx = placeholder_ptx[start..].replace(
        &format!(" .entry {compiled_entry}"),
        &format!(" .entry {entry_name}"),
    );

    let (line, variable_name, variable_size) = {
        let captures = patterns
            .param_decl
            .captures(&ptx)
            .ok_or(PtxError::ParameterNotFound)?;
        (
            captures[0].to_string(),
            captures[1].to_string(),
            captures[2].to_string(),
        )
    };

    ptx = ptx.replace(&line, "");

    ptx = patterns
        .param_load
        .replace_all(&ptx, "ld.const.${1} ${2}, ${3};\nst.param.${1} ${3}, ${2};")
        .into_owned();

    ptx = ptx.replace(&variable_name, LAUNCH_PARAMS_VARIABLE);

    let first_load = ptx.find("ld.const").ok_or(PtxError::NoParameterLoads)?;
    ptx.insert_str(
        first_load,
        &format!(".param .align 8 .b8 {CALL_PARAM_NAME}[{variable_size}];\n"),
    );

    ptx = patterns
        .param_store
        .replace_all(&ptx, format!("${{1}}{CALL_PARAM_NAME}").as_str())
        .into_owned();

    ptx = ptx.replace(
        "ret;",
        &format!("call {alt_name}, ({CALL_PARAM_NAME});\n\tret;"),
    );

    ptx.insert_str(
        0,
        &format!("\n.const .align 8 .b8 {LAUNCH_PARAMS_VARIABLE}[{variable_size}];\n"),
    );
    Ok(ptx)
}

/// Lower a `.version` directive newer than 6.4 to 6.4.
pub fn ptx_isa_clamp(ptx: &str) -> Result<String> {
    let patterns = patterns()?;
    let Some(captures) = patterns.version.captures(ptx) else {
        return Ok(ptx.to_string());
    };
    let major: u32 = captures[1].parse().unwrap_or(0);
    let minor: u32 = captures[2].parse().unwrap_or(0);
    if (major, minor) <= MAX_OPTIX_PTX_ISA {
        return Ok(ptx.to_string());
    }

    tracing::debug!(
        "Clamping PTX ISA {}.{} to {}.{}",
        major,
        minor,
        MAX_OPTIX_PTX_ISA.0,
        MAX_OPTIX_PTX_ISA.1
    );
    let replacement = format!(".version {}.{}", MAX_OPTIX_PTX_ISA.0, MAX_OPTIX_PTX_ISA.1);
    Ok(patterns
        .version
        .replace(ptx, replacement.as_str())
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{PrecompiledBackend, PtxTarget};
    use crate::layout::ParamLayout;

    const PLACEHOLDER: &str = "//
// Generated by the kernel compiler
//

.version 6.4
.target sm_52
.address_size 64

\t// .globl\tKernel

.visible .entry Kernel(
\t.param .align 8 .b8 Kernel_param_0[16]
)
{
\t.reg .b64 \t%rd<3>;

\tld.param.u64 \t%rd1, [Kernel_param_0];
\tld.param.u64 \t%rd2, [Kernel_param_0+8];
\tret;
}
";

    #[test]
    fn entry_kernel_routes_constant_params_into_call() {
        let ptx =
            generate_entry_kernel(PLACEHOLDER, "Kernel", "__raygen__fill", "___raygen__fill")
                .unwrap();

        let expected = "
.const .align 8 .b8 optixLaunchParams[16];
.visible .entry __raygen__fill(
\t
)
{
\t.reg .b64 \t%rd<3>;

\t.param .align 8 .b8 callParam0[16];
ld.const.u64 %rd1, [optixLaunchParams];
st.param.u64 [callParam0], %rd1;
\tld.const.u64 %rd2, [optixLaunchParams+8];
st.param.u64 [callParam0+8], %rd2;
\tcall ___raygen__fill, (callParam0);
\tret;
}
";
        assert_eq!(ptx, expected);
    }

    #[test]
    fn header_before_entry_is_stripped() {
        let ptx = generate_entry_kernel(PLACEHOLDER, "Kernel", "__miss__m", "___miss__m").unwrap();
        assert!(!ptx.contains(".version"));
        assert!(!ptx.contains("Kernel_param_0"));
        assert!(!ptx.contains("ld.param"));
    }

    #[test]
    fn missing_parameter_declaration_is_an_error() {
        let ptx = ".visible .entry Kernel()\n{\n\tret;\n}\n";
        let err = generate_entry_kernel(ptx, "Kernel", "__raygen__a", "___raygen__a").unwrap_err();
        assert!(matches!(err, PtxError::ParameterNotFound));
    }

    #[test]
    fn missing_entry_is_an_error() {
        let err = generate_entry_kernel(".version 6.4\n", "Kernel", "a", "_a").unwrap_err();
        assert!(matches!(err, PtxError::EntryNotFound));
    }

    #[test]
    fn placeholder_without_loads_is_an_error() {
        let ptx = ".visible .entry Kernel(\n\t.param .align 8 .b8 Kernel_param_0[8]\n)\n{\n\tret;\n}\n";
        let err = generate_entry_kernel(ptx, "Kernel", "__raygen__a", "___raygen__a").unwrap_err();
        assert!(matches!(err, PtxError::NoParameterLoads));
    }

    #[test]
    fn optix_ptx_retargets_compiled_entry() {
        let backend = PrecompiledBackend::default();
        let body = format!(
            "\t.reg .b32 \t%r<2>;\n\t{}\n",
            intrinsics::launch_index(intrinsics::Axis::X, "%r1")
        );
        let source =
            KernelSource::from_body("renderFrame", &body, ParamLayout::new(24), backend.target());

        let out = generate_optix_ptx(&backend, &source, ProgramKind::Raygen).unwrap();
        assert_eq!(out.entry_name, "__raygen__renderFrame");
        assert!(out.ptx.contains(".visible .func ___raygen__renderFrame("));
        assert!(out.ptx.contains(".visible .entry __raygen__renderFrame("));
        assert!(out.ptx.contains(".const .align 8 .b8 optixLaunchParams[24];"));
        assert!(out.ptx.contains("call ___raygen__renderFrame, (callParam0);"));
        assert!(!out.ptx.contains(" .entry Kernel"));

        let func = out.ptx.find(".func ___raygen__renderFrame").unwrap();
        let entry = out.ptx.find(".entry __raygen__renderFrame").unwrap();
        assert!(func < entry);
    }

    #[test]
    fn newer_isa_is_clamped() {
        let ptx = ".version 7.1\n.target sm_75\n";
        assert_eq!(ptx_isa_clamp(ptx).unwrap(), ".version 6.4\n.target sm_75\n");
    }

    #[test]
    fn older_isa_is_untouched() {
        let ptx = ".version 6.3\n.target sm_60\n";
        assert_eq!(ptx_isa_clamp(ptx).unwrap(), ptx);
        assert_eq!(ptx_isa_clamp("no header").unwrap(), "no header");
    }

    #[test]
    fn new_isa_backend_output_is_clamped() {
        let backend = PrecompiledBackend::new(PtxTarget {
            isa: (7, 0),
            arch: "sm_75".to_string(),
        });
        let source = KernelSource::from_body("m", "", ParamLayout::new(8), backend.target());
        let out = generate_optix_ptx(&backend, &source, ProgramKind::Miss).unwrap();
        assert!(out.ptx.starts_with(".version 6.4\n"));
        assert!(!out.ptx.contains(".version 7.0"));
    }
}
