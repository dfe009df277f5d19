use crate::{
    buffer::Buffer,
    components::{
        resample::Resampling,
        sample::{Sample, SampleType},
        window::{block_partition, Window},
    },
    errors::{PyramidioError, Result},
};

/// Shape and layout of an open raster.
///
/// Immutable for the lifetime of the raster it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RasterMeta {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub sample_type: SampleType,
    /// (W, H) of the block windows the raster is partitioned into.
    pub block_size: (usize, usize),
}

impl RasterMeta {
    pub fn new(
        width: usize,
        height: usize,
        band_count: usize,
        sample_type: SampleType,
        block_size: (usize, usize),
    ) -> Result<Self> {
        let meta = Self {
            width,
            height,
            band_count,
            sample_type,
            block_size,
        };
        meta.validate()?;
        Ok(meta)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PyramidioError::InvalidDimension(format!(
                "raster shape {}x{} must be positive",
                self.width, self.height
            )));
        }
        if self.band_count == 0 {
            return Err(PyramidioError::InvalidDimension(
                "raster must have at least one band".to_string(),
            ));
        }
        if self.block_size.0 == 0 || self.block_size.1 == 0 {
            return Err(PyramidioError::InvalidDimension(format!(
                "block shape {:?} must be positive",
                self.block_size
            )));
        }
        Ok(())
    }

    /// (W, H)
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn band_indexes(&self) -> Vec<usize> {
        (0..self.band_count).collect()
    }

    /// Same raster shape with one extra band appended.
    pub fn with_alpha_band(mut self) -> Self {
        self.band_count += 1;
        self
    }

    /// Row-major block partition of the full raster extent.
    pub fn block_windows(&self) -> Vec<Window> {
        block_partition(self.shape(), self.block_size)
    }

    pub(crate) fn check_window(&self, window: &Window) -> Result<()> {
        if !window.fits_within(self.shape()) {
            return Err(PyramidioError::WindowOutOfBounds {
                window: *window,
                bounds: self.shape(),
            });
        }
        Ok(())
    }

    pub(crate) fn check_band(&self, index: usize) -> Result<()> {
        if index >= self.band_count {
            return Err(PyramidioError::BandIndexOutOfRange {
                index,
                band_count: self.band_count,
            });
        }
        Ok(())
    }
}

/// Read side of an open raster dataset.
///
/// Window reads must be independent and side effect free so callers may
/// issue them for arbitrary windows in any order, concurrently.
pub trait RasterHandle<T: Sample>: Send + Sync {
    fn meta(&self) -> &RasterMeta;

    /// Read `window` for the given bands into a (bands, H, W) buffer.
    fn read_window(&self, window: &Window, band_indexes: &[usize]) -> Result<Buffer<T>>;
}

/// Write side of a raster being materialized by the pipeline.
///
/// `write_window` must be safe for concurrent callers writing disjoint
/// windows; whatever synchronization that needs lives behind this trait.
pub trait RasterEdit<T: Sample>: RasterHandle<T> {
    fn write_window(&self, window: &Window, band_indexes: &[usize], data: &Buffer<T>)
        -> Result<()>;

    /// Compute and store downsampled representations of the full
    /// resolution data, one per factor, in ascending order.
    fn build_overviews(&self, levels: &[usize], resampling: Resampling) -> Result<()>;

    /// Flush and close for writing. After finalization the raster is
    /// immutable; further writes fail.
    fn finalize(&self) -> Result<()>;
}
