use log::{info, warn};

use crate::{
    components::{handle::RasterEdit, resample::Resampling, sample::Sample},
    errors::{PyramidioError, Result},
};

/// Build the overview pyramid on a populated destination, then finalize it.
///
/// Levels build in ascending order, coarsening progressively; an empty
/// sequence is a no-op that still finalizes. When the backend rejects the
/// sequence the destination is finalized anyway so it cannot stay open,
/// but the failure surfaces and the caller must discard the raster.
pub fn build_pyramid<T: Sample, D: RasterEdit<T>>(
    destination: &D,
    levels: &[usize],
    resampling: Resampling,
) -> Result<()> {
    if levels.is_empty() {
        info!("raster needs no overviews");
    } else if let Err(source) = destination.build_overviews(levels, resampling) {
        if let Err(close) = destination.finalize() {
            warn!("could not finalize rejected destination: {close}");
        }
        return Err(match source {
            rejected @ PyramidioError::PyramidBuild(_) => rejected,
            other => PyramidioError::PyramidBuild(other.to_string()),
        });
    }
    destination.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        backends::memory::MemoryRaster,
        handle::{RasterHandle, RasterMeta},
        sample::SampleType,
    };

    fn destination() -> MemoryRaster<u8> {
        let meta = RasterMeta::new(16, 16, 1, SampleType::U8, (8, 8)).unwrap();
        MemoryRaster::create(meta).unwrap()
    }

    #[test]
    fn empty_level_sequence_still_finalizes() {
        let raster = destination();
        build_pyramid(&raster, &[], Resampling::Nearest).unwrap();
        assert!(raster.is_finalized());
        assert!(raster.overview_factors().is_empty());
    }

    #[test]
    fn builds_levels_in_order_and_finalizes() {
        let raster = destination();
        build_pyramid(&raster, &[2, 4], Resampling::Average).unwrap();
        assert!(raster.is_finalized());
        assert_eq!(raster.overview_factors(), vec![2, 4]);
    }

    #[test]
    fn rejected_levels_fail_but_do_not_leak_an_open_raster() {
        let raster = destination();
        let result = build_pyramid(&raster, &[3], Resampling::Nearest);
        assert!(matches!(result, Err(PyramidioError::PyramidBuild(_))));
        assert!(raster.is_finalized());
        assert_eq!(raster.meta().band_count, 1);
    }
}
