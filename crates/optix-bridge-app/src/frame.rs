//! Per-frame context for rendering.

/// Context for the current frame being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    /// Current frame number, starting at 0.
    pub frame_number: u64,
    /// Launch width.
    pub width: u32,
    /// Launch height.
    pub height: u32,
}

impl FrameContext {
    pub(crate) fn new(frame_number: u64, width: u32, height: u32) -> Self {
        Self {
            frame_number,
            width,
            height,
        }
    }

    /// Frame id written to the launch parameters; the first frame is 1.
    pub fn frame_id(&self) -> i32 {
        (self.frame_number + 1) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_id_starts_at_one() {
        assert_eq!(FrameContext::new(0, 4, 4).frame_id(), 1);
        assert_eq!(FrameContext::new(9, 4, 4).frame_id(), 10);
    }
}
