//! Build overview pyramids for raster datasets.
//!
//! The pipeline copies a source raster into an alpha-augmented in-memory
//! working raster through a resampled view, block window by block window,
//! then attaches downsampled overview levels and finalizes the result
//! under a name the caller can reopen.

mod buffer;
mod components;
mod errors;
mod intersection;
mod progress;

use std::{fmt, sync::Arc};

use log::info;

pub use buffer::Buffer;
pub use components::{
    backends::memory::{self, MemoryRaster},
    copy::copy_windows,
    levels::overview_levels,
    pyramid::build_pyramid,
    warp::{WarpOptions, WarpedView},
    RasterEdit, RasterHandle, RasterMeta, Resampling, Sample, SampleType, Window,
};
pub use errors::{PyramidioError, Result};
pub use progress::{CancelToken, ProgressSink};

#[cfg(feature = "gdal")]
pub use components::backends::gdal_backend::{build_file_overviews, GdalRaster};

/// Configuration of [generate_overviews].
#[derive(Clone, Default)]
pub struct OverviewOptions {
    /// Smallest tile dimension worth building an overview for; 256 when `None`.
    pub tile_size: Option<usize>,
    pub resampling: Resampling,
    /// Notified once per copied block window.
    pub progress: Option<Arc<dyn ProgressSink>>,
    /// Checked between block windows; cancellation discards the run.
    pub cancel: Option<CancelToken>,
}

impl fmt::Debug for OverviewOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverviewOptions")
            .field("tile_size", &self.tile_size())
            .field("resampling", &self.resampling)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

impl OverviewOptions {
    pub const DEFAULT_TILE_SIZE: usize = 256;

    fn tile_size(&self) -> usize {
        self.tile_size.unwrap_or(Self::DEFAULT_TILE_SIZE)
    }
}

/// Materialize an alpha-augmented copy of `source` with a full overview
/// pyramid, returning the name of the finalized in-memory raster.
///
/// The raster is registered in the named layer only once the whole
/// pipeline succeeds; reopen it with [memory::open]. Any failure discards
/// the working raster and surfaces the failing phase.
pub fn generate_overviews<T: Sample, S: RasterHandle<T>>(
    source: &S,
    options: &OverviewOptions,
) -> Result<String> {
    let source_meta = *source.meta();
    let levels = overview_levels(source_meta.width, source_meta.height, options.tile_size())?;
    info!(
        "generating overviews {levels:?} for {}x{} raster, {} resampling",
        source_meta.width, source_meta.height, options.resampling
    );

    let destination = MemoryRaster::create_alpha_augmented(source_meta)?;
    let view = WarpedView::new(
        source,
        WarpOptions {
            resampling: options.resampling,
            ..Default::default()
        },
    )?;
    copy_windows(
        &view,
        &destination,
        &source_meta.band_indexes(),
        options.progress.as_deref(),
        options.cancel.as_ref(),
    )?;
    build_pyramid(&destination, &levels, options.resampling)?;
    Ok(memory::register(destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn patterned_source(width: usize, height: usize, bands: usize) -> MemoryRaster<u8> {
        let meta = RasterMeta::new(width, height, bands, SampleType::U8, (128, 128)).unwrap();
        let raster = MemoryRaster::create(meta).unwrap();
        let mut values = Vec::with_capacity(width * height * bands);
        for band in 0..bands {
            values.extend((0..width * height).map(|i| ((i + band * 31) % 251) as u8));
        }
        let buffer = Buffer::from_vec(values, [bands, height, width]).unwrap();
        raster
            .write_window(&Window::new(0, 0, width, height), &meta.band_indexes(), &buffer)
            .unwrap();
        raster
    }

    #[test_log::test]
    fn pipeline_produces_a_reopenable_pyramid() {
        let source = patterned_source(512, 512, 2);
        let name = generate_overviews(&source, &OverviewOptions::default()).unwrap();

        let finished = memory::open::<u8>(&name).unwrap();
        assert!(finished.is_finalized());
        assert_eq!(finished.meta().band_count, 3);
        assert_eq!(finished.meta().shape(), (512, 512));

        // 512 halves once before hitting the 256 pixel tile floor.
        assert_eq!(finished.overview_factors(), vec![2]);
        assert_eq!(finished.overview_shape(2), Some((256, 256)));

        // Nearest over an identity grid keeps pixel data intact.
        let full = Window::new(0, 0, 512, 512);
        assert_eq!(
            finished.read_window(&full, &[0, 1]).unwrap(),
            source.read_window(&full, &[0, 1]).unwrap()
        );

        // The synthesized alpha band is fully opaque.
        let alpha = finished.read_window(&full, &[2]).unwrap();
        assert!(alpha.as_slice().iter().all(|value| *value == 255));
    }

    #[test_log::test]
    fn small_rasters_get_an_empty_pyramid_but_a_valid_output() {
        let source = patterned_source(300, 100, 1);
        let name = generate_overviews(&source, &OverviewOptions::default()).unwrap();
        let finished = memory::open::<u8>(&name).unwrap();
        assert!(finished.is_finalized());
        assert!(finished.overview_factors().is_empty());
        assert_eq!(finished.meta().band_count, 2);
    }

    #[test]
    fn runs_are_deterministic() {
        let source = patterned_source(512, 384, 1);
        let options = OverviewOptions {
            resampling: "average".parse().unwrap(),
            ..Default::default()
        };
        let first = generate_overviews(&source, &options).unwrap();
        let second = generate_overviews(&source, &options).unwrap();
        assert_ne!(first, second);

        let first = memory::open::<u8>(&first).unwrap();
        let second = memory::open::<u8>(&second).unwrap();
        assert_eq!(first.overview_factors(), second.overview_factors());
        for factor in first.overview_factors() {
            assert_eq!(
                first.read_overview(factor, 0).unwrap(),
                second.read_overview(factor, 0).unwrap()
            );
        }
    }

    #[test]
    fn progress_reports_once_per_window() {
        let source = patterned_source(512, 512, 1);
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let ticks = Arc::clone(&ticks);
            move |completed: usize, total: usize| {
                assert_eq!(total, 16);
                ticks.lock().unwrap().push(completed);
            }
        };
        let options = OverviewOptions {
            progress: Some(Arc::new(sink)),
            ..Default::default()
        };
        generate_overviews(&source, &options).unwrap();

        let mut ticks = ticks.lock().unwrap().clone();
        ticks.sort_unstable();
        assert_eq!(ticks, (1..=16).collect::<Vec<_>>());
    }

    /// Read failures inside one window must abort the whole run.
    struct FailingSource {
        inner: MemoryRaster<u8>,
        poison: Window,
    }

    impl RasterHandle<u8> for FailingSource {
        fn meta(&self) -> &RasterMeta {
            self.inner.meta()
        }

        fn read_window(&self, window: &Window, band_indexes: &[usize]) -> Result<Buffer<u8>> {
            // The warped view reads a slightly larger footprint, so match
            // on containment rather than equality.
            if self.poison.intersection(window).is_ok() {
                return Err(PyramidioError::NoIntersection);
            }
            self.inner.read_window(window, band_indexes)
        }
    }

    #[test]
    fn failing_window_discards_the_destination() {
        let inner = patterned_source(512, 512, 1);
        let poison = inner.meta().block_windows()[5];
        let source = FailingSource { inner, poison };

        let result = generate_overviews(&source, &OverviewOptions::default());
        assert!(matches!(
            result,
            Err(PyramidioError::CopyFailed { .. })
        ));
    }

    #[test]
    fn cancellation_discards_the_run() {
        let source = patterned_source(512, 512, 1);
        let token = CancelToken::new();
        token.cancel();
        let options = OverviewOptions {
            cancel: Some(token),
            ..Default::default()
        };
        assert!(matches!(
            generate_overviews(&source, &options),
            Err(PyramidioError::Cancelled)
        ));
    }

    #[test]
    fn tile_size_zero_is_rejected_up_front() {
        let source = patterned_source(64, 64, 1);
        let options = OverviewOptions {
            tile_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            generate_overviews(&source, &options),
            Err(PyramidioError::InvalidDimension(_))
        ));
    }
}
