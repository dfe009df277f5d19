use std::path::{Path, PathBuf};

use gdal::{raster::GdalType, Dataset, DatasetOptions, GdalOpenFlags};
use log::debug;

use crate::{
    buffer::Buffer,
    components::{
        handle::{RasterHandle, RasterMeta},
        resample::Resampling,
        sample::{Sample, SampleType},
        window::Window,
    },
    errors::{PyramidioError, Result},
};

fn sample_type_of(band_type: u32) -> Result<SampleType> {
    // GDALDataType ordinals.
    Ok(match band_type {
        1 => SampleType::U8,
        2 => SampleType::U16,
        3 => SampleType::I16,
        4 => SampleType::U32,
        5 => SampleType::I32,
        6 => SampleType::F32,
        7 => SampleType::F64,
        other => Err(gdal::errors::GdalError::BadArgument(format!(
            "unsupported band type ordinal {other}"
        )))?,
    })
}

/// Read side of a GDAL-backed raster.
///
/// GDAL dataset handles are not thread safe, so the raster keeps only the
/// path and reopens per read; windowed reads stay independent and can run
/// from worker threads.
#[derive(Debug)]
pub struct GdalRaster {
    path: PathBuf,
    meta: RasterMeta,
}

impl GdalRaster {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dataset = Dataset::open(&path)?;
        let (width, height) = dataset.raster_size();
        let band = dataset.rasterband(1)?;
        let meta = RasterMeta::new(
            width,
            height,
            dataset.raster_count(),
            sample_type_of(band.band_type() as u32)?,
            band.block_size(),
        )?;
        debug!("opened '{}' {meta:?}", path.as_ref().display());
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            meta,
        })
    }
}

impl<T: Sample + GdalType> RasterHandle<T> for GdalRaster {
    fn meta(&self) -> &RasterMeta {
        &self.meta
    }

    fn read_window(&self, window: &Window, band_indexes: &[usize]) -> Result<Buffer<T>> {
        self.meta.check_window(window)?;
        let dataset = Dataset::open(&self.path)?;
        let mut buffer = Buffer::zeroed([band_indexes.len(), window.height, window.width]);
        for (slot, band_index) in band_indexes.iter().enumerate() {
            self.meta.check_band(*band_index)?;
            let band = dataset.rasterband(band_index + 1)?;
            if T::gdal_ordinal() != band.band_type() as u32 {
                Err(gdal::errors::GdalError::BadArgument(
                    "result buffer type must match band data type".to_string(),
                ))?
            }
            let read = band.read_as::<T>(
                (window.col_off as isize, window.row_off as isize),
                window.shape(),
                window.shape(),
                None,
            )?;
            buffer.band_mut(slot).copy_from_slice(read.data());
        }
        Ok(buffer)
    }
}

/// Build overviews on a GDAL-writable raster file in place.
///
/// The GDAL equivalent of the in-memory pyramid build; levels follow the
/// same ascending power-of-two contract.
pub fn build_file_overviews<P: AsRef<Path>>(
    path: P,
    levels: &[usize],
    resampling: Resampling,
) -> Result<()> {
    let factors: Vec<i32> = levels.iter().map(|factor| *factor as i32).collect();
    let options = DatasetOptions {
        open_flags: GdalOpenFlags::GDAL_OF_RASTER | GdalOpenFlags::GDAL_OF_UPDATE,
        ..Default::default()
    };
    let mut dataset = Dataset::open_ex(&path, options)?;
    dataset
        .build_overviews(resampling.gdal_name(), &factors, &[])
        .map_err(|error| PyramidioError::PyramidBuild(error.to_string()))
}
