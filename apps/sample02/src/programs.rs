//! Launch parameters and device programs.

use bytemuck::{Pod, Zeroable};
use optix_bridge::ptx::intrinsics::{launch_index, Axis};
use optix_bridge::ptx::{KernelSource, ParamLayout, PtxTarget};

/// Launch parameters, as laid out in `optixLaunchParams`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct LaunchParams {
    pub frame_id: i32,
    pub _pad: i32,
    /// Device pointer to `fb_size_x * fb_size_y` packed pixels.
    pub color_buffer: u64,
    pub fb_size_x: i32,
    pub fb_size_y: i32,
}

/// Pixel the raygen program writes at `(ix, iy)`: red in the low byte.
pub fn gradient_pixel(ix: u32, iy: u32) -> u32 {
    let r = ix % 256;
    let g = iy % 256;
    let b = (ix + iy) % 256;
    0xff00_0000 | r | (g << 8) | (b << 16)
}

/// `__raygen__renderFrame`: fill the frame buffer with [`gradient_pixel`].
pub fn render_frame() -> KernelSource {
    let body = format!(
        "\t.reg .b32 \t%r<12>;
\t.reg .b64 \t%rd<5>;

\t{ix}
\t{iy}
\tld.param.u64 \t%rd1, [Kernel_param_0+8];
\tld.param.u32 \t%r3, [Kernel_param_0+16];
\tand.b32 \t%r4, %r1, 255;
\tand.b32 \t%r5, %r2, 255;
\tadd.s32 \t%r6, %r1, %r2;
\tand.b32 \t%r7, %r6, 255;
\tshl.b32 \t%r8, %r5, 8;
\tshl.b32 \t%r9, %r7, 16;
\tor.b32 \t%r10, %r4, %r8;
\tor.b32 \t%r10, %r10, %r9;
\tor.b32 \t%r10, %r10, 0xFF000000;
\tmad.lo.s32 \t%r11, %r2, %r3, %r1;
\tcvta.to.global.u64 \t%rd2, %rd1;
\tmul.wide.u32 \t%rd3, %r11, 4;
\tadd.s64 \t%rd4, %rd2, %rd3;
\tst.global.u32 \t[%rd4], %r10;
",
        ix = launch_index(Axis::X, "%r1"),
        iy = launch_index(Axis::Y, "%r2"),
    );
    KernelSource::from_body(
        "renderFrame",
        &body,
        ParamLayout::of::<LaunchParams>(),
        &PtxTarget::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use optix_bridge::ptx::{generate_optix_ptx, PrecompiledBackend, ProgramKind};
    use std::mem::{offset_of, size_of};

    #[test]
    fn launch_params_layout() {
        assert_eq!(size_of::<LaunchParams>(), 24);
        assert_eq!(offset_of!(LaunchParams, color_buffer), 8);
        assert_eq!(offset_of!(LaunchParams, fb_size_x), 16);
        assert_eq!(offset_of!(LaunchParams, fb_size_y), 20);
    }

    #[test]
    fn gradient_wraps_every_256_pixels() {
        assert_eq!(gradient_pixel(0, 0), 0xff00_0000);
        assert_eq!(gradient_pixel(1, 2), 0xff03_0201);
        assert_eq!(gradient_pixel(256, 0), 0xff00_0000);
        assert_eq!(gradient_pixel(1199, 1023), 0xffae_ffaf);
    }

    #[test]
    fn raygen_becomes_optix_entry() {
        let generated = generate_optix_ptx(
            &PrecompiledBackend::default(),
            &render_frame(),
            ProgramKind::Raygen,
        )
        .unwrap();
        assert_eq!(generated.entry_name, "__raygen__renderFrame");
        assert!(generated.ptx.contains(".func ___raygen__renderFrame"));
        assert!(generated.ptx.contains(".visible .entry __raygen__renderFrame"));
        assert!(generated.ptx.contains("optixLaunchParams[24]"));
        assert!(generated.ptx.contains("_optix_get_launch_index_y"));
    }
}
