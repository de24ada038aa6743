//! Program groups.

use crate::api::OptixApi;
use crate::error::Result;
use crate::module::Module;
use optix_bridge_sys::{
    OptixModule, OptixProgramGroup, OptixProgramGroupCallables, OptixProgramGroupDesc,
    OptixProgramGroupDescUnion, OptixProgramGroupHitgroup, OptixProgramGroupKind,
    OptixProgramGroupSingleModule, OptixStackSizes, SbtRecordHeader,
    OPTIX_PROGRAM_GROUP_FLAGS_NONE,
};
use std::ffi::{c_char, CString};
use std::marker::PhantomData;
use std::ptr;
use std::sync::Arc;

/// Per-program stack sizes of a program group.
pub type StackSizes = OptixStackSizes;

/// A module and entry name, or nothing.
#[derive(Debug)]
struct Program {
    module: OptixModule,
    entry: Option<CString>,
}

impl Program {
    fn new(program: Option<(&Module, &str)>) -> Result<Self> {
        match program {
            Some((module, entry)) if !module.is_empty() => Ok(Self {
                module: module.raw(),
                entry: Some(CString::new(entry)?),
            }),
            _ => Ok(Self::none()),
        }
    }

    fn none() -> Self {
        Self {
            module: ptr::null_mut(),
            entry: None,
        }
    }

    fn entry_ptr(&self) -> *const c_char {
        self.entry.as_ref().map_or(ptr::null(), |e| e.as_ptr())
    }

    fn single(&self) -> OptixProgramGroupSingleModule {
        OptixProgramGroupSingleModule {
            module: self.module,
            entry_function_name: self.entry_ptr(),
        }
    }
}

/// Description of one program group.
///
/// Entry names are owned here and stay valid while the description lives.
#[derive(Debug)]
pub struct ProgramGroupDesc<'a> {
    kind: OptixProgramGroupKind,
    programs: [Program; 3],
    _modules: PhantomData<&'a Module>,
}

impl<'a> ProgramGroupDesc<'a> {
    fn single(kind: OptixProgramGroupKind, module: &'a Module, entry: &str) -> Result<Self> {
        Ok(Self {
            kind,
            programs: [
                Program::new(Some((module, entry)))?,
                Program::none(),
                Program::none(),
            ],
            _modules: PhantomData,
        })
    }

    /// Ray generation program.
    pub fn raygen(module: &'a Module, entry: &str) -> Result<Self> {
        Self::single(OptixProgramGroupKind::Raygen, module, entry)
    }

    /// Miss program.
    pub fn miss(module: &'a Module, entry: &str) -> Result<Self> {
        Self::single(OptixProgramGroupKind::Miss, module, entry)
    }

    /// Exception program.
    pub fn exception(module: &'a Module, entry: &str) -> Result<Self> {
        Self::single(OptixProgramGroupKind::Exception, module, entry)
    }

    /// Hit group from optional closest-hit, any-hit and intersection programs.
    pub fn hitgroup(
        closest_hit: Option<(&'a Module, &str)>,
        any_hit: Option<(&'a Module, &str)>,
        intersection: Option<(&'a Module, &str)>,
    ) -> Result<Self> {
        Ok(Self {
            kind: OptixProgramGroupKind::Hitgroup,
            programs: [
                Program::new(closest_hit)?,
                Program::new(any_hit)?,
                Program::new(intersection)?,
            ],
            _modules: PhantomData,
        })
    }

    /// Callables group from optional direct and continuation callables.
    pub fn callables(
        direct: Option<(&'a Module, &str)>,
        continuation: Option<(&'a Module, &str)>,
    ) -> Result<Self> {
        Ok(Self {
            kind: OptixProgramGroupKind::Callables,
            programs: [
                Program::new(direct)?,
                Program::new(continuation)?,
                Program::none(),
            ],
            _modules: PhantomData,
        })
    }

    /// Group kind.
    pub fn kind(&self) -> OptixProgramGroupKind {
        self.kind
    }

    /// ABI description pointing into `self`.
    pub fn to_raw(&self) -> OptixProgramGroupDesc {
        let [first, second, third] = &self.programs;
        let desc = match self.kind {
            OptixProgramGroupKind::Raygen => OptixProgramGroupDescUnion {
                raygen: first.single(),
            },
            OptixProgramGroupKind::Miss => OptixProgramGroupDescUnion {
                miss: first.single(),
            },
            OptixProgramGroupKind::Exception => OptixProgramGroupDescUnion {
                exception: first.single(),
            },
            OptixProgramGroupKind::Hitgroup => OptixProgramGroupDescUnion {
                hitgroup: OptixProgramGroupHitgroup {
                    module_ch: first.module,
                    entry_function_name_ch: first.entry_ptr(),
                    module_ah: second.module,
                    entry_function_name_ah: second.entry_ptr(),
                    module_is: third.module,
                    entry_function_name_is: third.entry_ptr(),
                },
            },
            OptixProgramGroupKind::Callables => OptixProgramGroupDescUnion {
                callables: OptixProgramGroupCallables {
                    module_dc: first.module,
                    entry_function_name_dc: first.entry_ptr(),
                    module_cc: second.module,
                    entry_function_name_cc: second.entry_ptr(),
                },
            },
        };
        OptixProgramGroupDesc {
            kind: self.kind,
            flags: OPTIX_PROGRAM_GROUP_FLAGS_NONE,
            desc,
        }
    }
}

/// An owned program group handle.
pub struct ProgramGroup {
    raw: OptixProgramGroup,
    api: Option<Arc<OptixApi>>,
}

// SAFETY: program group handles are not tied to a thread.
unsafe impl Send for ProgramGroup {}
// SAFETY: see above.
unsafe impl Sync for ProgramGroup {}

impl ProgramGroup {
    pub(crate) fn from_raw(raw: OptixProgramGroup, api: Arc<OptixApi>) -> Self {
        Self {
            raw,
            api: Some(api),
        }
    }

    /// Native handle.
    pub fn raw(&self) -> OptixProgramGroup {
        self.raw
    }

    /// Whether this wrapper holds no handle.
    pub fn is_empty(&self) -> bool {
        self.raw.is_null()
    }

    /// Move the handle into a new wrapper, leaving this one empty.
    pub fn transfer(&mut self) -> Self {
        Self {
            raw: std::mem::replace(&mut self.raw, ptr::null_mut()),
            api: self.api.take(),
        }
    }

    /// A wrapper holding no handle.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            raw: ptr::null_mut(),
            api: None,
        }
    }

    /// Stack sizes the group's programs need.
    pub fn stack_size(&self) -> Result<StackSizes> {
        let api = self.live_api()?;
        // SAFETY: `self.raw` is a live program group.
        unsafe { api.program_group_get_stack_size(self.raw) }
    }

    /// Write the group's opaque record header.
    pub fn pack_header(&self, header: &mut SbtRecordHeader) -> Result<()> {
        let api = self.live_api()?;
        // SAFETY: `self.raw` is a live program group, `header` is 32 writable bytes.
        unsafe { api.sbt_record_pack_header(self.raw, header) }
    }

    fn live_api(&self) -> Result<&Arc<OptixApi>> {
        match &self.api {
            Some(api) if !self.raw.is_null() => Ok(api),
            _ => Err(crate::Error::InvalidArgument(
                "program group has been transferred".to_string(),
            )),
        }
    }
}

impl Drop for ProgramGroup {
    fn drop(&mut self) {
        if self.raw.is_null() {
            return;
        }
        if let Some(api) = &self.api {
            // SAFETY: the handle came from `program_group_create` and is destroyed once.
            if let Err(e) = unsafe { api.program_group_destroy(self.raw) } {
                tracing::warn!("Failed to destroy OptiX program group: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for ProgramGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProgramGroup").field(&self.raw).finish()
    }
}
