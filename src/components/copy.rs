use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info};
use rayon::prelude::*;

use crate::{
    components::{
        handle::{RasterEdit, RasterHandle},
        sample::Sample,
        window::Window,
    },
    errors::{PyramidioError, Result},
    progress::{CancelToken, ProgressSink},
};

/// Transfer every block window of `destination` from `view`.
///
/// Windows come from the destination's partition and are each read and
/// written exactly once, in parallel; windows are disjoint, so workers
/// never contend on pixels. The first failing window aborts the whole
/// transfer with [PyramidioError::CopyFailed] carrying its coordinates —
/// there is no partial-success mode, the caller must discard the
/// destination.
pub fn copy_windows<T, V, D>(
    view: &V,
    destination: &D,
    band_indexes: &[usize],
    observer: Option<&dyn ProgressSink>,
    cancel: Option<&CancelToken>,
) -> Result<()>
where
    T: Sample,
    V: RasterHandle<T>,
    D: RasterEdit<T>,
{
    let windows = destination.meta().block_windows();
    let total = windows.len();
    let completed = AtomicUsize::new(0);
    info!("copying {total} block windows");

    windows.par_iter().try_for_each(|window| {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(PyramidioError::Cancelled);
        }
        transfer_window(view, destination, band_indexes, window)?;
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("window {window:?} done ({done}/{total})");
        if let Some(sink) = observer {
            sink.advance(done, total);
        }
        Ok(())
    })
}

fn transfer_window<T, V, D>(
    view: &V,
    destination: &D,
    band_indexes: &[usize],
    window: &Window,
) -> Result<()>
where
    T: Sample,
    V: RasterHandle<T>,
    D: RasterEdit<T>,
{
    view.read_window(window, band_indexes)
        .and_then(|buffer| destination.write_window(window, band_indexes, &buffer))
        .map_err(|source| PyramidioError::CopyFailed {
            window: *window,
            source: Box::new(source),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::{
        buffer::Buffer,
        components::{
            backends::memory::MemoryRaster,
            handle::RasterMeta,
            sample::SampleType,
        },
    };

    fn patterned_source(width: usize, height: usize) -> MemoryRaster<u16> {
        let meta = RasterMeta::new(width, height, 1, SampleType::U16, (64, 64)).unwrap();
        let raster = MemoryRaster::create(meta).unwrap();
        let values: Vec<u16> = (0..width * height).map(|i| i as u16).collect();
        let buffer = Buffer::from_vec(values, [1, height, width]).unwrap();
        raster
            .write_window(&Window::new(0, 0, width, height), &[0], &buffer)
            .unwrap();
        raster
    }

    /// Source whose reads fail inside one specific window.
    struct FailingSource {
        inner: MemoryRaster<u16>,
        poison: Window,
    }

    impl RasterHandle<u16> for FailingSource {
        fn meta(&self) -> &RasterMeta {
            self.inner.meta()
        }

        fn read_window(&self, window: &Window, band_indexes: &[usize]) -> Result<Buffer<u16>> {
            if window == &self.poison {
                return Err(PyramidioError::Resampling {
                    window: *window,
                    source: Box::new(PyramidioError::NoIntersection),
                });
            }
            self.inner.read_window(window, band_indexes)
        }
    }

    #[test]
    fn copies_every_window_exactly_once() {
        let source = patterned_source(200, 130);
        let destination = MemoryRaster::create(*source.meta()).unwrap();

        let ticks = Mutex::new(Vec::new());
        let sink = |completed: usize, _total: usize| {
            ticks.lock().unwrap().push(completed);
        };
        copy_windows(&source, &destination, &[0], Some(&sink), None).unwrap();

        // Content landed unchanged.
        let full = Window::new(0, 0, 200, 130);
        assert_eq!(
            destination.read_window(&full, &[0]).unwrap(),
            source.read_window(&full, &[0]).unwrap()
        );

        // One notification per window, each window counted once.
        let mut ticks = ticks.into_inner().unwrap();
        ticks.sort_unstable();
        let total = destination.meta().block_windows().len();
        assert_eq!(ticks, (1..=total).collect::<Vec<_>>());
    }

    #[test]
    fn failing_window_aborts_with_its_coordinates() {
        let inner = patterned_source(200, 130);
        let poison = inner.meta().block_windows()[3];
        let source = FailingSource { inner, poison };
        let destination = MemoryRaster::create(*source.meta()).unwrap();

        let result = copy_windows(&source, &destination, &[0], None, None);
        match result {
            Err(PyramidioError::CopyFailed { window, .. }) => assert_eq!(window, poison),
            other => panic!("expected CopyFailed, got {other:?}"),
        }
    }

    #[test]
    fn cancellation_stops_the_transfer() {
        let source = patterned_source(200, 130);
        let destination = MemoryRaster::create(*source.meta()).unwrap();
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            copy_windows(&source, &destination, &[0], None, Some(&token)),
            Err(PyramidioError::Cancelled)
        ));
    }
}
