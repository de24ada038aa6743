//! OptiX program kinds and their entry-name prefixes.

use std::fmt;

/// Kind of OptiX program an entry implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Raygen,
    Miss,
    ClosestHit,
    AnyHit,
    Intersection,
    Exception,
    DirectCallable,
    ContinuationCallable,
}

impl ProgramKind {
    /// All program kinds.
    pub const ALL: [Self; 8] = [
        Self::Raygen,
        Self::Miss,
        Self::ClosestHit,
        Self::AnyHit,
        Self::Intersection,
        Self::Exception,
        Self::DirectCallable,
        Self::ContinuationCallable,
    ];

    /// Prefix OptiX requires on entry names of this kind.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Raygen => "__raygen__",
            Self::Miss => "__miss__",
            Self::ClosestHit => "__closesthit__",
            Self::AnyHit => "__anyhit__",
            Self::Intersection => "__intersection__",
            Self::Exception => "__exception__",
            Self::DirectCallable => "__direct_callable__",
            Self::ContinuationCallable => "__continuation_callable__",
        }
    }

    /// Full entry name for a kernel named `name`.
    pub fn entry_name(self, name: &str) -> String {
        format!("{}{name}", self.prefix())
    }
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_matches('_'))
    }
}
