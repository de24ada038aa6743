//! PTX post-processing for OptiX programs.
//!
//! A kernel compiler emits one `.entry` per kernel that takes its arguments
//! through a single by-value parameter. OptiX instead expects:
//! - entry names carrying a program prefix such as `__raygen__`
//! - launch parameters in a `.const` variable named `optixLaunchParams`
//! - PTX ISA 6.4 or older
//!
//! This crate bridges the two by retargeting the compiled entry to a `.func`
//! and appending a generated entry that copies the constant launch
//! parameters into a call parameter.

pub mod backend;
pub mod error;
pub mod intrinsics;
pub mod layout;
pub mod placeholder;
pub mod program;
pub mod rewrite;

pub use backend::{CompiledKernel, KernelBackend, KernelSource, PrecompiledBackend, PtxTarget};
pub use error::{PtxError, Result};
pub use layout::ParamLayout;
pub use program::ProgramKind;
pub use rewrite::{generate_entry_kernel, generate_optix_ptx, ptx_isa_clamp, OptixPtx};

/// Name of the constant-memory variable OptiX fills with the launch parameters.
pub const LAUNCH_PARAMS_VARIABLE: &str = "optixLaunchParams";

/// Entry name every compiled kernel is emitted under.
pub const COMPILED_ENTRY_NAME: &str = "Kernel";

/// Name of the call parameter the generated entry passes to the kernel.
pub const CALL_PARAM_NAME: &str = "callParam0";

/// Newest PTX ISA version OptiX accepts.
pub const MAX_OPTIX_PTX_ISA: (u32, u32) = (6, 4);
