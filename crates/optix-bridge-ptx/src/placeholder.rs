//! Placeholder entry kernels.
//!
//! The entry wrapper is derived from a kernel that does nothing but load its
//! by-value parameter. Its shape matches what the kernel compiler emits for
//! an empty kernel taking the launch parameter struct: a single
//! `.param .align 8 .b8 NAME[SIZE]` and one `ld.param` per scalar chunk.

use crate::backend::PtxTarget;
use crate::error::{PtxError, Result};
use crate::layout::ParamLayout;
use std::fmt::Write as _;

fn register_for(width: usize) -> &'static str {
    match width {
        8 => "%rd",
        4 => "%r",
        _ => "%rs",
    }
}

/// Emit a placeholder module whose entry `entry_name` loads a parameter of
/// the given layout.
pub fn synthesize(entry_name: &str, layout: ParamLayout, target: &PtxTarget) -> Result<String> {
    if layout.size() == 0 {
        return Err(PtxError::InvalidLayout(
            "launch parameters must be at least one byte".to_string(),
        ));
    }

    let param = format!("{entry_name}_param_0");
    let chunks = layout.chunks();
    let count = |reg: &str| {
        chunks
            .iter()
            .filter(|c| register_for(c.width) == reg)
            .count()
    };

    let mut ptx = String::new();
    let _ = writeln!(ptx, "//");
    let _ = writeln!(ptx, "// Placeholder entry for a {}-byte launch parameter", layout.size());
    let _ = writeln!(ptx, "//");
    ptx.push('\n');
    ptx.push_str(&target.header());
    ptx.push('\n');
    let _ = writeln!(ptx, "\t// .globl\t{entry_name}");
    ptx.push('\n');
    let _ = writeln!(ptx, ".visible .entry {entry_name}(");
    let _ = writeln!(ptx, "\t.param .align 8 .b8 {param}[{}]", layout.size());
    let _ = writeln!(ptx, ")");
    let _ = writeln!(ptx, "{{");
    for (reg, ty) in [("%rs", "b16"), ("%r", "b32"), ("%rd", "b64")] {
        let n = count(reg);
        if n > 0 {
            let _ = writeln!(ptx, "\t.reg .{ty} \t{reg}<{}>;", n + 1);
        }
    }
    ptx.push('\n');

    let mut next = [("%rs", 1usize), ("%r", 1), ("%rd", 1)];
    for chunk in &chunks {
        let reg = register_for(chunk.width);
        let slot = next.iter_mut().find(|(r, _)| *r == reg);
        let index = slot.map_or(1, |(_, n)| {
            let current = *n;
            *n += 1;
            current
        });
        let address = if chunk.offset == 0 {
            format!("[{param}]")
        } else {
            format!("[{param}+{}]", chunk.offset)
        };
        let _ = writeln!(
            ptx,
            "\tld.param.{} \t{reg}{index}, {address};",
            chunk.ptx_type()
        );
    }
    let _ = writeln!(ptx, "\tret;");
    let _ = writeln!(ptx, "}}");
    Ok(ptx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_one_aligned_byte_array() {
        let ptx = synthesize("Kernel", ParamLayout::new(24), &PtxTarget::default()).unwrap();
        assert!(ptx.contains(".visible .entry Kernel("));
        assert!(ptx.contains(".param .align 8 .b8 Kernel_param_0[24]"));
        assert_eq!(ptx.matches(".param .align 8 .b8").count(), 1);
    }

    #[test]
    fn loads_every_chunk() {
        let ptx = synthesize("Kernel", ParamLayout::new(14), &PtxTarget::default()).unwrap();
        assert!(ptx.contains("ld.param.u64 \t%rd1, [Kernel_param_0];"));
        assert!(ptx.contains("ld.param.u32 \t%r1, [Kernel_param_0+8];"));
        assert!(ptx.contains("ld.param.u16 \t%rs1, [Kernel_param_0+12];"));
        assert_eq!(ptx.matches("ld.param").count(), 3);
        assert!(ptx.contains(".reg .b64 \t%rd<2>;"));
    }

    #[test]
    fn zero_sized_layout_is_rejected() {
        let err = synthesize("Kernel", ParamLayout::new(0), &PtxTarget::default()).unwrap_err();
        assert!(matches!(err, PtxError::InvalidLayout(_)));
    }
}
