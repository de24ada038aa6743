//! Shader binding table records and layout.

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use optix_bridge_cuda::DeviceBuffer;
use optix_bridge_sys::{OptixShaderBindingTable, SbtRecordHeader, OPTIX_SBT_RECORD_ALIGNMENT};
use std::marker::PhantomData;
use std::mem::size_of;

/// A record: the packed program header followed by user data.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Default)]
pub struct SbtRecord<T: Copy> {
    pub header: SbtRecordHeader,
    pub data: T,
}

impl<T: Copy> SbtRecord<T> {
    /// Record for `kernel` carrying `data`.
    pub fn pack(kernel: &Kernel, data: T) -> Result<Self> {
        check_record_size::<Self>()?;
        let mut record = Self {
            header: SbtRecordHeader::default(),
            data,
        };
        kernel.program_group().pack_header(&mut record.header)?;
        Ok(record)
    }
}

/// Types usable as SBT records.
pub trait SbtRecordType: Copy + Default {
    fn header_mut(&mut self) -> &mut SbtRecordHeader;
}

impl<T: Copy + Default> SbtRecordType for SbtRecord<T> {
    fn header_mut(&mut self) -> &mut SbtRecordHeader {
        &mut self.header
    }
}

impl SbtRecordType for SbtRecordHeader {
    fn header_mut(&mut self) -> &mut SbtRecordHeader {
        self
    }
}

/// Round `value` up to a multiple of `alignment`, which must be a power of two.
#[inline]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// Fail unless the record size is a multiple of `OPTIX_SBT_RECORD_ALIGNMENT`.
pub fn check_record_size<R>() -> Result<()> {
    let size = size_of::<R>();
    if size == 0 || align_up(size, OPTIX_SBT_RECORD_ALIGNMENT) != size {
        return Err(Error::MisalignedSbtRecord { size });
    }
    Ok(())
}

/// One default record per kernel with its program header packed in.
pub fn pack_records<R: SbtRecordType>(kernels: &[&Kernel]) -> Result<Vec<R>> {
    check_record_size::<R>()?;
    kernels
        .iter()
        .map(|kernel| {
            let mut record = R::default();
            kernel.program_group().pack_header(record.header_mut())?;
            Ok(record)
        })
        .collect()
}

/// Region of device memory holding records of one kind.
#[derive(Debug, Clone, Copy, Default)]
struct RecordRegion {
    base: u64,
    stride: u32,
    count: u32,
}

impl RecordRegion {
    fn of<R: Copy>(buffer: &DeviceBuffer<R>) -> Self {
        Self {
            base: buffer.device_ptr(),
            stride: size_of::<R>() as u32,
            count: buffer.len() as u32,
        }
    }
}

/// Shader binding table over uploaded record buffers.
///
/// Strides come from the record type, counts from the buffer length.
#[derive(Debug, Clone, Copy)]
pub struct ShaderBindingTable<'a> {
    raygen: u64,
    exception: u64,
    miss: RecordRegion,
    hitgroup: RecordRegion,
    callables: RecordRegion,
    _buffers: PhantomData<&'a ()>,
}

impl<'a> ShaderBindingTable<'a> {
    /// Table with a raygen record; the first element of `raygen` is used.
    pub fn new<R: Copy>(raygen: &'a DeviceBuffer<R>) -> Self {
        Self {
            raygen: raygen.device_ptr(),
            exception: 0,
            miss: RecordRegion::default(),
            hitgroup: RecordRegion::default(),
            callables: RecordRegion::default(),
            _buffers: PhantomData,
        }
    }

    #[must_use]
    pub fn exception<R: Copy>(mut self, record: &'a DeviceBuffer<R>) -> Self {
        self.exception = record.device_ptr();
        self
    }

    #[must_use]
    pub fn miss<R: Copy>(mut self, records: &'a DeviceBuffer<R>) -> Self {
        self.miss = RecordRegion::of(records);
        self
    }

    #[must_use]
    pub fn hitgroup<R: Copy>(mut self, records: &'a DeviceBuffer<R>) -> Self {
        self.hitgroup = RecordRegion::of(records);
        self
    }

    #[must_use]
    pub fn callables<R: Copy>(mut self, records: &'a DeviceBuffer<R>) -> Self {
        self.callables = RecordRegion::of(records);
        self
    }

    /// The ABI table.
    pub fn raw(&self) -> OptixShaderBindingTable {
        OptixShaderBindingTable {
            raygen_record: self.raygen,
            exception_record: self.exception,
            miss_record_base: self.miss.base,
            miss_record_stride_in_bytes: self.miss.stride,
            miss_record_count: self.miss.count,
            hitgroup_record_base: self.hitgroup.base,
            hitgroup_record_stride_in_bytes: self.hitgroup.stride,
            hitgroup_record_count: self.hitgroup.count,
            callables_record_base: self.callables.base,
            callables_record_stride_in_bytes: self.callables.stride,
            callables_record_count: self.callables.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optix_bridge_sys::OptixResult;
    use std::mem::{align_of, offset_of};

    #[test]
    fn align_up_test() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 16), 32);
        assert_eq!(align_up(40, 16), 48);
    }

    #[test]
    fn record_with_object_id_is_48_bytes() {
        assert_eq!(size_of::<SbtRecord<i32>>(), 48);
        assert_eq!(align_of::<SbtRecord<i32>>(), 16);
        assert_eq!(offset_of!(SbtRecord<i32>, data), 32);
        assert!(check_record_size::<SbtRecord<i32>>().is_ok());
        assert!(check_record_size::<SbtRecordHeader>().is_ok());
    }

    #[test]
    fn unaligned_record_is_rejected() {
        #[repr(C)]
        #[derive(Clone, Copy, Default)]
        struct Packed {
            header: [u8; 32],
            value: [u8; 8],
        }

        let err = check_record_size::<Packed>().unwrap_err();
        assert!(matches!(err, Error::MisalignedSbtRecord { size: 40 }));
        assert_eq!(err.result(), OptixResult::ERROR_VALIDATION_FAILURE);
    }

    #[test]
    fn zero_sized_record_is_rejected() {
        assert!(check_record_size::<()>().is_err());
    }

    #[test]
    fn pack_records_checks_size_before_kernels() {
        #[repr(C)]
        #[derive(Clone, Copy, Default)]
        struct Small([u8; 20]);

        impl SbtRecordType for Small {
            fn header_mut(&mut self) -> &mut SbtRecordHeader {
                unreachable!()
            }
        }

        assert!(matches!(
            pack_records::<Small>(&[]),
            Err(Error::MisalignedSbtRecord { size: 20 })
        ));
        assert!(pack_records::<SbtRecord<i32>>(&[]).unwrap().is_empty());
    }

    #[test]
    fn empty_table_has_null_regions() {
        let table = ShaderBindingTable {
            raygen: 0x100,
            exception: 0,
            miss: RecordRegion {
                base: 0x200,
                stride: 48,
                count: 1,
            },
            hitgroup: RecordRegion::default(),
            callables: RecordRegion::default(),
            _buffers: PhantomData,
        };
        let raw = table.raw();
        assert_eq!(raw.raygen_record, 0x100);
        assert_eq!(raw.miss_record_base, 0x200);
        assert_eq!(raw.miss_record_stride_in_bytes, 48);
        assert_eq!(raw.miss_record_count, 1);
        assert_eq!(raw.hitgroup_record_count, 0);
        assert_eq!(raw.callables_record_base, 0);
    }
}
