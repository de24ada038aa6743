//! Launch parameters and device programs.

use bytemuck::{Pod, Zeroable};
use optix_bridge::ptx::intrinsics::{launch_index, Axis};
use optix_bridge::ptx::{KernelSource, ParamLayout, PtxTarget};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct LaunchParams {
    pub frame_id: i32,
    pub _pad: i32,
    pub color_buffer: u64,
    pub fb_size_x: i32,
    pub fb_size_y: i32,
}

/// Pixel written at `(ix, iy)` on frame `frame_id`, packed as BGRA with
/// blue in the low byte.
pub fn animated_pixel(ix: u32, iy: u32, frame_id: i32) -> u32 {
    let frame = frame_id as u32;
    let r = ix.wrapping_add(frame) % 256;
    let g = iy.wrapping_add(frame) % 256;
    let b = ix.wrapping_add(iy).wrapping_add(frame) % 256;
    0xff00_0000 | b | (g << 8) | (r << 16)
}

/// `__raygen__renderFrame`: fill the frame buffer with [`animated_pixel`].
pub fn render_frame() -> KernelSource {
    let body = format!(
        "\t.reg .b32 \t%r<15>;
\t.reg .b64 \t%rd<5>;

\t{ix}
\t{iy}
\tld.param.u32 \t%r3, [Kernel_param_0];
\tld.param.u64 \t%rd1, [Kernel_param_0+8];
\tld.param.u32 \t%r4, [Kernel_param_0+16];
\tadd.s32 \t%r5, %r1, %r3;
\tand.b32 \t%r5, %r5, 255;
\tadd.s32 \t%r6, %r2, %r3;
\tand.b32 \t%r6, %r6, 255;
\tadd.s32 \t%r7, %r1, %r2;
\tadd.s32 \t%r7, %r7, %r3;
\tand.b32 \t%r7, %r7, 255;
\tshl.b32 \t%r8, %r6, 8;
\tshl.b32 \t%r9, %r5, 16;
\tor.b32 \t%r10, %r7, %r8;
\tor.b32 \t%r10, %r10, %r9;
\tor.b32 \t%r10, %r10, 0xFF000000;
\tmad.lo.s32 \t%r11, %r2, %r4, %r1;
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
        assert_eq!(offset_of!(LaunchParams, frame_id), 0);
        assert_eq!(offset_of!(LaunchParams, color_buffer), 8);
        assert_eq!(offset_of!(LaunchParams, fb_size_x), 16);
    }

    #[test]
    fn pattern_moves_with_frame_id() {
        assert_eq!(animated_pixel(0, 0, 1), 0xff01_0101);
        assert_eq!(animated_pixel(1, 2, 1), 0xff02_0304);
        assert_eq!(animated_pixel(10, 20, 0), 0xff0a_141e);
        assert_eq!(animated_pixel(5, 5, 256), animated_pixel(5, 5, 0));
    }

    #[test]
    fn raygen_reads_frame_id_first() {
        let source = render_frame();
        assert!(source.ptx.contains("ld.param.u32 \t%r3, [Kernel_param_0];"));
        let generated =
            generate_optix_ptx(&PrecompiledBackend::default(), &source, ProgramKind::Raygen)
                .unwrap();
        assert_eq!(generated.entry_name, "__raygen__renderFrame");
        assert!(generated.ptx.contains("ld.const.u64"));
        assert!(generated.ptx.contains("optixLaunchParams[24]"));
    }
}
