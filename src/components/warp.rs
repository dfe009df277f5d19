use std::marker::PhantomData;

use log::debug;

use crate::{
    buffer::Buffer,
    components::{
        handle::{RasterHandle, RasterMeta},
        resample::{self, Resampling},
        sample::Sample,
        window::Window,
    },
    errors::{PyramidioError, Result},
};

/// Configuration of a [WarpedView].
#[derive(Debug, Clone, Copy)]
pub struct WarpOptions {
    /// Target grid width; the source's when `None`.
    pub width: Option<usize>,
    /// Target grid height; the source's when `None`.
    pub height: Option<usize>,
    pub resampling: Resampling,
    pub add_alpha: bool,
}

impl Default for WarpOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            resampling: Resampling::Nearest,
            add_alpha: true,
        }
    }
}

/// A source raster presented as a virtual raster on a target grid, with a
/// synthesized alpha band appended after the source bands.
///
/// Reads resample on the fly; nothing is materialized. The view holds no
/// mutable state, so windows may be read in any order, concurrently.
pub struct WarpedView<'a, T: Sample, S: RasterHandle<T>> {
    source: &'a S,
    meta: RasterMeta,
    source_bands: usize,
    resampling: Resampling,
    add_alpha: bool,
    /// Source pixels per target pixel.
    scale: (f64, f64),
    _samples: PhantomData<T>,
}

impl<'a, T: Sample, S: RasterHandle<T>> WarpedView<'a, T, S> {
    pub fn new(source: &'a S, options: WarpOptions) -> Result<Self> {
        let source_meta = *source.meta();
        let width = options.width.unwrap_or(source_meta.width);
        let height = options.height.unwrap_or(source_meta.height);
        if width == 0 || height == 0 {
            return Err(PyramidioError::InvalidDimension(format!(
                "target grid {width}x{height} must be positive"
            )));
        }

        let meta = RasterMeta {
            width,
            height,
            band_count: source_meta.band_count + options.add_alpha as usize,
            ..source_meta
        };
        let scale = (
            source_meta.width as f64 / width as f64,
            source_meta.height as f64 / height as f64,
        );
        debug!(
            "warped view {}x{} over {}x{} source, {} resampling",
            width, height, source_meta.width, source_meta.height, options.resampling
        );
        Ok(Self {
            source,
            meta,
            source_bands: source_meta.band_count,
            resampling: options.resampling,
            add_alpha: options.add_alpha,
            scale,
            _samples: PhantomData,
        })
    }

    /// Band index of the synthesized alpha band, when present.
    pub fn alpha_band(&self) -> Option<usize> {
        self.add_alpha.then_some(self.source_bands)
    }

    /// Read `window` of the target grid for the given bands.
    ///
    /// The window must lie within the target grid; band indexes cover the
    /// source bands plus [Self::alpha_band].
    pub fn read(&self, window: &Window, band_indexes: &[usize]) -> Result<Buffer<T>> {
        self.read_resampled(window, band_indexes)
            .map_err(|source| PyramidioError::Resampling {
                window: *window,
                source: Box::new(source),
            })
    }

    fn read_resampled(&self, window: &Window, band_indexes: &[usize]) -> Result<Buffer<T>> {
        let extent = Window::new(0, 0, self.meta.width, self.meta.height);
        if window.intersection(&extent)? != *window {
            return Err(PyramidioError::WindowOutOfBounds {
                window: *window,
                bounds: self.meta.shape(),
            });
        }

        let footprint = self.footprint(window);
        let mut buffer = Buffer::zeroed([band_indexes.len(), window.height, window.width]);
        for (slot, band) in band_indexes.iter().enumerate() {
            if Some(*band) == self.alpha_band() {
                buffer.band_mut(slot).fill(T::opaque());
                continue;
            }
            if *band >= self.source_bands {
                return Err(PyramidioError::BandIndexOutOfRange {
                    index: *band,
                    band_count: self.meta.band_count,
                });
            }
            let source = self.source.read_window(&footprint, &[*band])?;
            resample::sample_region(
                self.resampling,
                source.band(0),
                &footprint,
                self.scale,
                window,
                buffer.band_mut(slot),
            );
        }
        Ok(buffer)
    }

    /// Source window needed to resample `window`, kernel support included,
    /// clamped to the source extent.
    fn footprint(&self, window: &Window) -> Window {
        let source_meta = self.source.meta();
        let (col_start, col_end) = footprint_axis(
            window.col_off,
            window.width,
            self.scale.0,
            self.resampling.margin(self.scale.0),
            source_meta.width,
        );
        let (row_start, row_end) = footprint_axis(
            window.row_off,
            window.height,
            self.scale.1,
            self.resampling.margin(self.scale.1),
            source_meta.height,
        );
        Window::new(
            col_start,
            row_start,
            col_end - col_start,
            row_end - row_start,
        )
    }
}

fn footprint_axis(
    offset: usize,
    length: usize,
    scale: f64,
    margin: usize,
    source_extent: usize,
) -> (usize, usize) {
    let first_center = (offset as f64 + 0.5) * scale - 0.5;
    let last_center = ((offset + length) as f64 - 0.5) * scale - 0.5;
    let start = first_center.floor() as isize - margin as isize;
    let end = last_center.ceil() as isize + margin as isize + 1;
    let end = end.clamp(1, source_extent as isize) as usize;
    let start = start.clamp(0, end as isize - 1) as usize;
    (start, end)
}

impl<T: Sample, S: RasterHandle<T>> RasterHandle<T> for WarpedView<'_, T, S> {
    fn meta(&self) -> &RasterMeta {
        &self.meta
    }

    fn read_window(&self, window: &Window, band_indexes: &[usize]) -> Result<Buffer<T>> {
        self.read(window, band_indexes)
    }
}
