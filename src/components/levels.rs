use log::debug;

use crate::errors::{PyramidioError, Result};

/// Downsample factors for the overview pyramid of a raster.
///
/// The largest factor is the last power of two by which the longer raster
/// dimension can be divided while staying at or above `min_tile_size`;
/// halving down to exactly the threshold still counts. A raster already at
/// or below the threshold needs no overviews and yields an empty sequence.
pub fn overview_levels(width: usize, height: usize, min_tile_size: usize) -> Result<Vec<usize>> {
    if width == 0 || height == 0 {
        return Err(PyramidioError::InvalidDimension(format!(
            "raster shape {width}x{height} must be positive"
        )));
    }
    if min_tile_size == 0 {
        return Err(PyramidioError::InvalidDimension(
            "minimum tile size must be positive".to_string(),
        ));
    }

    let max_dimension = width.max(height);
    let mut levels = Vec::new();
    let mut factor: usize = 2;
    while max_dimension / factor >= min_tile_size {
        levels.push(factor);
        match factor.checked_mul(2) {
            Some(next) => factor = next,
            None => break,
        }
    }
    debug!("{width}x{height} raster needs overview levels {levels:?}");
    Ok(levels)
}
