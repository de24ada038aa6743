//! Typed device memory.

use crate::context::CudaContext;
use crate::error::{CudaError, Result};
use crate::stream::CudaStream;
use bytemuck::{Pod, Zeroable};
use cudarc::driver::{sys, CudaSlice, DevicePtr};
use optix_bridge_sys::CUdeviceptr;
use std::marker::PhantomData;
use std::mem::size_of;

/// A device allocation holding `len` elements of `T`.
///
/// Uploads accept any `Copy` type so that `#[repr(C)]` records with padding
/// (such as SBT records) can be sent as-is. Downloads require `Pod`.
pub struct DeviceBuffer<T: Copy> {
    // `None` for empty buffers.
    storage: Option<CudaSlice<u8>>,
    ptr: CUdeviceptr,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Copy> DeviceBuffer<T> {
    /// Allocate `len` zero-initialized elements.
    pub fn zeroed(context: &CudaContext, len: usize) -> Result<Self> {
        let bytes = len
            .checked_mul(size_of::<T>())
            .ok_or_else(|| CudaError::InvalidArgument(format!("{len} elements overflow")))?;
        if bytes == 0 {
            return Ok(Self {
                storage: None,
                ptr: 0,
                len,
                _marker: PhantomData,
            });
        }

        let stream = context.inner().default_stream();
        let storage = stream.alloc_zeros::<u8>(bytes)?;
        let ptr = {
            let (ptr, _sync) = storage.device_ptr(&stream);
            ptr
        };
        Ok(Self {
            storage: Some(storage),
            ptr,
            len,
            _marker: PhantomData,
        })
    }

    /// Allocate a buffer and upload `data` into it.
    pub fn from_slice(context: &CudaContext, data: &[T]) -> Result<Self> {
        let buffer = Self::zeroed(context, data.len())?;
        buffer.copy_from_host(data)?;
        Ok(buffer)
    }

    fn check_len(&self, host_len: usize) -> Result<()> {
        if host_len == self.len {
            Ok(())
        } else {
            Err(CudaError::InvalidArgument(format!(
                "host slice has {host_len} elements, device buffer has {}",
                self.len
            )))
        }
    }

    /// Synchronously upload `data`, which must match the buffer length.
    pub fn copy_from_host(&self, data: &[T]) -> Result<()> {
        self.check_len(data.len())?;
        if self.storage.is_none() {
            return Ok(());
        }
        // SAFETY: the device range holds exactly `size_in_bytes` bytes and the
        // host slice has the same length.
        unsafe {
            sys::cuMemcpyHtoD_v2(self.ptr, data.as_ptr().cast(), self.size_in_bytes()).result()?;
        }
        Ok(())
    }

    /// Queue an upload of `data` on `stream`.
    ///
    /// The source is pageable host memory, so the driver stages it before
    /// returning and `data` may be dropped afterwards. The buffer itself
    /// must stay alive until `stream` has been synchronized.
    pub fn copy_from_host_async(&self, data: &[T], stream: &CudaStream) -> Result<()> {
        self.check_len(data.len())?;
        if self.storage.is_none() {
            return Ok(());
        }
        // SAFETY: as in `copy_from_host`; the stream is live.
        unsafe {
            sys::cuMemcpyHtoDAsync_v2(
                self.ptr,
                data.as_ptr().cast(),
                self.size_in_bytes(),
                stream.inner().cu_stream(),
            )
            .result()?;
        }
        Ok(())
    }

    /// Fill the whole allocation with zero bytes.
    pub fn memset_zero(&self) -> Result<()> {
        if self.storage.is_none() {
            return Ok(());
        }
        // SAFETY: the range is owned by this buffer.
        unsafe {
            sys::cuMemsetD8_v2(self.ptr, 0, self.size_in_bytes()).result()?;
        }
        Ok(())
    }

    /// Device address of the first element. Zero for empty buffers.
    pub fn device_ptr(&self) -> CUdeviceptr {
        self.ptr
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the allocation in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.len * size_of::<T>()
    }
}

impl<T: Pod> DeviceBuffer<T> {
    /// Synchronously download into `out`, which must match the buffer length.
    pub fn copy_to_host(&self, out: &mut [T]) -> Result<()> {
        self.check_len(out.len())?;
        if self.storage.is_none() {
            return Ok(());
        }
        // SAFETY: `out` spans exactly `size_in_bytes` writable bytes and any
        // bit pattern is a valid `T`.
        unsafe {
            sys::cuMemcpyDtoH_v2(out.as_mut_ptr().cast(), self.ptr, self.size_in_bytes())
                .result()?;
        }
        Ok(())
    }

    /// Download the whole buffer into a new vector.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut out = vec![<T as Zeroable>::zeroed(); self.len];
        self.copy_to_host(&mut out)?;
        Ok(out)
    }
}

impl<T: Copy> std::fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("ptr", &format_args!("{:#x}", self.ptr))
            .field("len", &self.len)
            .finish()
    }
}
