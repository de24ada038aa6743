//! ABI enumerations and flag values.
//!
//! Enumerations are sent to the driver only, so they are plain `#[repr(u32)]`
//! Rust enums. Flag sets are raw `u32` values; the safe crate wraps them in
//! `bitflags` types.

/// `OptixDeviceContextValidationMode`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptixDeviceContextValidationMode {
    #[default]
    Off = 0,
    All = 0xFFFF_FFFF,
}

/// `OptixCompileOptimizationLevel`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptixCompileOptimizationLevel {
    #[default]
    Default = 0,
    Level0 = 0x2340,
    Level1 = 0x2341,
    Level2 = 0x2342,
    Level3 = 0x2343,
}

/// `OptixCompileDebugLevel`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptixCompileDebugLevel {
    #[default]
    Default = 0,
    None = 0x2350,
    LineInfo = 0x2351,
    Full = 0x2352,
}

/// `OptixProgramGroupKind`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptixProgramGroupKind {
    Raygen = 0x2421,
    Miss = 0x2422,
    Exception = 0x2423,
    Hitgroup = 0x2424,
    Callables = 0x2425,
}

/// `OptixBuildInputType`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptixBuildInputType {
    Triangles = 0x2141,
    CustomPrimitives = 0x2142,
    Instances = 0x2143,
    InstancePointers = 0x2144,
    Curves = 0x2145,
}

/// `OptixVertexFormat`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptixVertexFormat {
    #[default]
    None = 0,
    Float3 = 0x2121,
    Float2 = 0x2122,
    Half3 = 0x2123,
    Half2 = 0x2124,
    Snorm16_3 = 0x2125,
    Snorm16_2 = 0x2126,
}

/// `OptixIndicesFormat`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptixIndicesFormat {
    #[default]
    None = 0,
    UnsignedShort3 = 0x2102,
    UnsignedInt3 = 0x2103,
}

/// `OptixTransformFormat`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptixTransformFormat {
    #[default]
    None = 0,
    MatrixFloat12 = 0x21E1,
}

/// `OptixPrimitiveType`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptixPrimitiveType {
    Custom = 0x2500,
    RoundQuadraticBspline = 0x2501,
    RoundCubicBspline = 0x2502,
    RoundLinear = 0x2503,
    Triangle = 0x2531,
}

/// `OptixBuildOperation`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptixBuildOperation {
    #[default]
    Build = 0x2161,
    Update = 0x2162,
}

/// `OptixAccelPropertyType`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptixAccelPropertyType {
    CompactedSize = 0x2181,
    Aabbs = 0x2182,
}

/// `OptixTraversableType`, used by pointer-to-handle conversion.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptixTraversableType {
    StaticTransform = 0x21C1,
    MatrixMotionTransform = 0x21C2,
    SrtMotionTransform = 0x21C3,
}

// OptixBuildFlags
pub const OPTIX_BUILD_FLAG_NONE: u32 = 0;
pub const OPTIX_BUILD_FLAG_ALLOW_UPDATE: u32 = 1 << 0;
pub const OPTIX_BUILD_FLAG_ALLOW_COMPACTION: u32 = 1 << 1;
pub const OPTIX_BUILD_FLAG_PREFER_FAST_TRACE: u32 = 1 << 2;
pub const OPTIX_BUILD_FLAG_PREFER_FAST_BUILD: u32 = 1 << 3;
pub const OPTIX_BUILD_FLAG_ALLOW_RANDOM_VERTEX_ACCESS: u32 = 1 << 4;

// OptixMotionFlags
pub const OPTIX_MOTION_FLAG_NONE: u16 = 0;
pub const OPTIX_MOTION_FLAG_START_VANISH: u16 = 1 << 0;
pub const OPTIX_MOTION_FLAG_END_VANISH: u16 = 1 << 1;

// OptixGeometryFlags
pub const OPTIX_GEOMETRY_FLAG_NONE: u32 = 0;
pub const OPTIX_GEOMETRY_FLAG_DISABLE_ANYHIT: u32 = 1 << 0;
pub const OPTIX_GEOMETRY_FLAG_REQUIRE_SINGLE_ANYHIT_CALL: u32 = 1 << 1;

// OptixExceptionFlags
pub const OPTIX_EXCEPTION_FLAG_NONE: u32 = 0;
pub const OPTIX_EXCEPTION_FLAG_STACK_OVERFLOW: u32 = 1 << 0;
pub const OPTIX_EXCEPTION_FLAG_TRACE_DEPTH: u32 = 1 << 1;
pub const OPTIX_EXCEPTION_FLAG_USER: u32 = 1 << 2;
pub const OPTIX_EXCEPTION_FLAG_DEBUG: u32 = 1 << 3;

// OptixTraversableGraphFlags
pub const OPTIX_TRAVERSABLE_GRAPH_FLAG_ALLOW_ANY: u32 = 0;
pub const OPTIX_TRAVERSABLE_GRAPH_FLAG_ALLOW_SINGLE_GAS: u32 = 1 << 0;
pub const OPTIX_TRAVERSABLE_GRAPH_FLAG_ALLOW_SINGLE_LEVEL_INSTANCING: u32 = 1 << 1;

// OptixPrimitiveTypeFlags
pub const OPTIX_PRIMITIVE_TYPE_FLAGS_CUSTOM: u32 = 1 << 0;
pub const OPTIX_PRIMITIVE_TYPE_FLAGS_ROUND_QUADRATIC_BSPLINE: u32 = 1 << 1;
pub const OPTIX_PRIMITIVE_TYPE_FLAGS_ROUND_CUBIC_BSPLINE: u32 = 1 << 2;
pub const OPTIX_PRIMITIVE_TYPE_FLAGS_ROUND_LINEAR: u32 = 1 << 3;
pub const OPTIX_PRIMITIVE_TYPE_FLAGS_TRIANGLE: u32 = 1 << 31;

// OptixRayFlags
pub const OPTIX_RAY_FLAG_NONE: u32 = 0;
pub const OPTIX_RAY_FLAG_DISABLE_ANYHIT: u32 = 1 << 0;
pub const OPTIX_RAY_FLAG_ENFORCE_ANYHIT: u32 = 1 << 1;
pub const OPTIX_RAY_FLAG_TERMINATE_ON_FIRST_HIT: u32 = 1 << 2;
pub const OPTIX_RAY_FLAG_DISABLE_CLOSESTHIT: u32 = 1 << 3;
pub const OPTIX_RAY_FLAG_CULL_BACK_FACING_TRIANGLES: u32 = 1 << 4;
pub const OPTIX_RAY_FLAG_CULL_FRONT_FACING_TRIANGLES: u32 = 1 << 5;
pub const OPTIX_RAY_FLAG_CULL_DISABLED_ANYHIT: u32 = 1 << 6;
pub const OPTIX_RAY_FLAG_CULL_ENFORCED_ANYHIT: u32 = 1 << 7;

// OptixInstanceFlags
pub const OPTIX_INSTANCE_FLAG_NONE: u32 = 0;
pub const OPTIX_INSTANCE_FLAG_DISABLE_TRIANGLE_FACE_CULLING: u32 = 1 << 0;
pub const OPTIX_INSTANCE_FLAG_FLIP_TRIANGLE_FACING: u32 = 1 << 1;
pub const OPTIX_INSTANCE_FLAG_DISABLE_ANYHIT: u32 = 1 << 2;
pub const OPTIX_INSTANCE_FLAG_ENFORCE_ANYHIT: u32 = 1 << 3;
pub const OPTIX_INSTANCE_FLAG_DISABLE_TRANSFORM: u32 = 1 << 6;

// OptixProgramGroupFlags
pub const OPTIX_PROGRAM_GROUP_FLAGS_NONE: u32 = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_match_vendor_values() {
        assert_eq!(OptixProgramGroupKind::Raygen as u32, 0x2421);
        assert_eq!(OptixProgramGroupKind::Callables as u32, 0x2425);
        assert_eq!(OptixBuildInputType::Triangles as u32, 0x2141);
        assert_eq!(OptixCompileDebugLevel::LineInfo as u32, 0x2351);
        assert_eq!(OptixDeviceContextValidationMode::All as u32, u32::MAX);
    }

    #[test]
    fn triangle_primitive_flag_is_top_bit() {
        assert_eq!(OPTIX_PRIMITIVE_TYPE_FLAGS_TRIANGLE, 0x8000_0000);
    }
}
