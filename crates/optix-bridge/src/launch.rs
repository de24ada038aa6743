//! Pipeline launches.

use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::sbt::ShaderBindingTable;
use bytemuck::Pod;
use optix_bridge_cuda::{CudaStream, DeviceBuffer};
use std::mem::size_of;

/// Launch `pipeline` over a `width` x `height` x `depth` grid.
///
/// `params` is uploaded on `stream` and bound to the launch-params variable.
/// The returned guard keeps the upload alive until the stream is
/// synchronized.
pub fn launch<'a, P: Pod>(
    pipeline: &Pipeline,
    stream: &'a CudaStream,
    params: &P,
    sbt: &ShaderBindingTable<'_>,
    width: u32,
    height: u32,
    depth: u32,
) -> Result<LaunchGuard<'a, P>> {
    check_dimensions(width, height, depth)?;

    let api = pipeline.api()?;
    let params_buffer = DeviceBuffer::<P>::zeroed(pipeline.cuda()?, 1)?;
    params_buffer.copy_from_host_async(std::slice::from_ref(params), stream)?;

    let raw_sbt = sbt.raw();
    // SAFETY: the pipeline is live, the params buffer and the SBT records
    // stay allocated until the guard synchronizes the stream.
    unsafe {
        api.launch(
            pipeline.raw(),
            stream.raw(),
            params_buffer.device_ptr(),
            size_of::<P>(),
            &raw_sbt,
            width,
            height,
            depth,
        )?;
    }
    tracing::trace!("Launched {}x{}x{}", width, height, depth);

    Ok(LaunchGuard {
        stream,
        params: Some(params_buffer),
    })
}

fn check_dimensions(width: u32, height: u32, depth: u32) -> Result<()> {
    if width == 0 || height == 0 || depth == 0 {
        return Err(Error::InvalidArgument(format!(
            "launch dimensions must be non-zero, got {width}x{height}x{depth}"
        )));
    }
    Ok(())
}

/// Run `sync`, then drop `held`. `held` is kept when `sync` fails.
fn release_after<R>(held: &mut Option<R>, sync: impl FnOnce() -> Result<()>) -> Result<()> {
    sync()?;
    held.take();
    Ok(())
}

/// An in-flight launch. Dropping it waits for the stream.
#[must_use = "dropping the guard blocks until the launch completes"]
pub struct LaunchGuard<'a, P: Pod> {
    stream: &'a CudaStream,
    params: Option<DeviceBuffer<P>>,
}

impl<P: Pod> LaunchGuard<'_, P> {
    /// Wait for the launch and release its parameters.
    pub fn finish(mut self) -> Result<()> {
        let stream = self.stream;
        release_after(&mut self.params, || stream.synchronize().map_err(Error::from))
    }
}

impl<P: Pod> Drop for LaunchGuard<'_, P> {
    fn drop(&mut self) {
        if self.params.is_some() {
            let stream = self.stream;
            let released = release_after(&mut self.params, || stream.synchronize().map_err(Error::from));
            if let Err(e) = released {
                tracing::warn!("Failed to synchronize launch stream: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::{Accel, AccelBuildOptions, BuildFlags, TriangleArray};
    use crate::module::ModuleCompileOptions;
    use crate::pipeline::{PipelineCompileOptions, PipelineLinkOptions};
    use crate::sbt::{pack_records, SbtRecord};
    use crate::{DeviceContext, DeviceContextOptions};
    use optix_bridge_cuda::CudaContext;
    use optix_bridge_ptx::{ParamLayout, PtxTarget, KernelSource};
    use optix_bridge_sys::{OptixIndicesFormat, OptixVertexFormat};
    use std::cell::RefCell;
    use std::sync::Arc;

    struct Released<'a>(&'a RefCell<Vec<&'static str>>);

    impl Drop for Released<'_> {
        fn drop(&mut self) {
            self.0.borrow_mut().push("release");
        }
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        for (w, h, d) in [(0, 1, 1), (1, 0, 1), (1, 1, 0), (0, 0, 0)] {
            let err = check_dimensions(w, h, d).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
        check_dimensions(1200, 1024, 1).unwrap();
    }

    #[test]
    fn params_released_after_stream_sync() {
        let events = RefCell::new(Vec::new());
        let mut held = Some(Released(&events));
        release_after(&mut held, || {
            events.borrow_mut().push("sync");
            Ok(())
        })
        .unwrap();
        assert!(held.is_none());
        assert_eq!(*events.borrow(), ["sync", "release"]);
    }

    #[test]
    fn params_kept_when_sync_fails() {
        let events = RefCell::new(Vec::new());
        let mut held = Some(Released(&events));
        let err = release_after(&mut held, || {
            events.borrow_mut().push("sync");
            Err(Error::InvalidArgument("stream lost".into()))
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(held.is_some());
        assert_eq!(*events.borrow(), ["sync"]);
        drop(held);
        assert_eq!(*events.borrow(), ["sync", "release"]);
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn launch_rejects_zero_width_and_runs() {
        crate::init().unwrap();
        let cuda = Arc::new(CudaContext::new(0).unwrap());
        let context = DeviceContext::new(&cuda, DeviceContextOptions::new()).unwrap();
        let compile = PipelineCompileOptions::new();
        let source = KernelSource::from_body("noop", "", ParamLayout::new(8), &PtxTarget::default());
        let raygen = context
            .create_raygen_kernel(&source, &ModuleCompileOptions::default(), &compile)
            .unwrap();
        let pipeline = context
            .create_pipeline(&compile, PipelineLinkOptions::new(1), &[raygen.program_group()])
            .unwrap();

        let records = pack_records::<SbtRecord<i32>>(&[&raygen]).unwrap();
        let buffer = DeviceBuffer::from_slice(&cuda, &records).unwrap();
        let sbt = ShaderBindingTable::new(&buffer);
        let stream = CudaStream::new(&cuda).unwrap();

        let err = launch(&pipeline, &stream, &0u64, &sbt, 0, 1, 1).err().unwrap();
        assert!(matches!(err, Error::InvalidArgument(_)));
        launch(&pipeline, &stream, &0u64, &sbt, 4, 4, 1)
            .unwrap()
            .finish()
            .unwrap();
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn compacted_triangle_build() {
        crate::init().unwrap();
        let cuda = Arc::new(CudaContext::new(0).unwrap());
        let context = DeviceContext::new(&cuda, DeviceContextOptions::new()).unwrap();
        let vertices =
            DeviceBuffer::from_slice(&cuda, &[[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
                .unwrap();
        let indices = DeviceBuffer::from_slice(&cuda, &[[0u32, 1, 2]]).unwrap();
        let input = TriangleArray::new(&vertices, OptixVertexFormat::Float3)
            .indices(&indices, OptixIndicesFormat::UnsignedInt3);
        let stream = CudaStream::new(&cuda).unwrap();
        let accel = Accel::build(
            &context,
            &stream,
            &AccelBuildOptions::new(BuildFlags::ALLOW_COMPACTION),
            &[input.into()],
        )
        .unwrap();
        assert_ne!(accel.handle(), 0);
        assert!(accel.buffer().size_in_bytes() > 0);
    }
}
