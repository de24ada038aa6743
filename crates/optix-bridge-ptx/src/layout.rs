//! Byte layout of a kernel's by-value launch parameter.

use std::mem::size_of;

/// Size of the launch parameter struct passed to a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamLayout {
    size: usize,
}

/// One scalar load covering `width` bytes at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamChunk {
    pub offset: usize,
    pub width: usize,
}

impl ParamChunk {
    /// PTX type suffix used to load this chunk.
    pub const fn ptx_type(self) -> &'static str {
        match self.width {
            8 => "u64",
            4 => "u32",
            2 => "u16",
            _ => "u8",
        }
    }
}

impl ParamLayout {
    /// Layout of a parameter struct of `size` bytes.
    pub const fn new(size: usize) -> Self {
        Self { size }
    }

    /// Layout of `T`.
    pub const fn of<T>() -> Self {
        Self::new(size_of::<T>())
    }

    /// Size in bytes.
    pub const fn size(self) -> usize {
        self.size
    }

    /// Cover the parameter with naturally aligned 8/4/2/1-byte loads.
    pub fn chunks(self) -> Vec<ParamChunk> {
        let mut chunks = Vec::new();
        let mut offset = 0;
        while offset < self.size {
            let width = [8, 4, 2, 1]
                .into_iter()
                .find(|&w| offset % w == 0 && offset + w <= self.size)
                .unwrap_or(1);
            chunks.push(ParamChunk { offset, width });
            offset += width;
        }
        chunks
    }
}
