use crate::components::{sample::SampleType, window::Window};

pub type Result<T> = std::result::Result<T, PyramidioError>;

#[derive(thiserror::Error, Debug)]
pub enum PyramidioError {
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("unknown resampling method '{0}'")]
    UnknownResamplingMethod(String),
    #[error("there is no intersection between windows")]
    NoIntersection,
    #[error("window {window:?} out of raster bounds {bounds:?}")]
    WindowOutOfBounds { window: Window, bounds: (usize, usize) },
    #[error("band index {index} out of range for {band_count} bands")]
    BandIndexOutOfRange { index: usize, band_count: usize },
    #[error("buffer sample type {actual:?} does not match raster sample type {expected:?}")]
    SampleTypeMismatch {
        expected: SampleType,
        actual: SampleType,
    },
    #[error("buffer shape {actual:?} does not match expected shape {expected:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: [usize; 3],
    },
    #[error("resampling failed for window {window:?}")]
    Resampling {
        window: Window,
        #[source]
        source: Box<PyramidioError>,
    },
    #[error("copy failed at window {window:?}")]
    CopyFailed {
        window: Window,
        #[source]
        source: Box<PyramidioError>,
    },
    #[error("pyramid build rejected: {0}")]
    PyramidBuild(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("raster '{0}' is finalized")]
    Finalized(String),
    #[cfg(feature = "gdal")]
    #[error(transparent)]
    GdalError(#[from] gdal::errors::GdalError),
}
