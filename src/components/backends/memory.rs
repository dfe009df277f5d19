use std::{
    any::Any,
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, OnceLock, PoisonError, RwLock,
    },
};

use log::{debug, info};

use crate::{
    buffer::Buffer,
    components::{
        handle::{RasterEdit, RasterHandle, RasterMeta},
        resample::{self, Resampling},
        sample::Sample,
        window::Window,
    },
    errors::{PyramidioError, Result},
};

/// One stored overview level of a [MemoryRaster].
struct OverviewLevel<T> {
    factor: usize,
    width: usize,
    height: usize,
    bands: Vec<Box<[T]>>,
}

/// A named raster held in memory, band-sequential.
///
/// Created empty, populated window by window, then finalized; after
/// finalization the pixel data is immutable and the raster can be looked
/// up by name through [open]. Writes to disjoint windows may run
/// concurrently; each band is guarded by its own lock.
pub struct MemoryRaster<T: Sample> {
    name: String,
    meta: RasterMeta,
    bands: Vec<RwLock<Box<[T]>>>,
    overviews: RwLock<Vec<OverviewLevel<T>>>,
    finalized: AtomicBool,
}

impl<T: Sample> MemoryRaster<T> {
    /// Fresh zero-filled raster with the given metadata.
    pub fn create(meta: RasterMeta) -> Result<Self> {
        meta.validate()?;
        if meta.sample_type != T::TYPE {
            return Err(PyramidioError::SampleTypeMismatch {
                expected: meta.sample_type,
                actual: T::TYPE,
            });
        }
        let band_size = meta.width * meta.height;
        let bands = (0..meta.band_count)
            .map(|_| RwLock::new(vec![T::zero(); band_size].into_boxed_slice()))
            .collect();
        let name = next_name();
        debug!("created in-memory raster '{name}' {meta:?}");
        Ok(Self {
            name,
            meta,
            bands,
            overviews: RwLock::new(Vec::new()),
            finalized: AtomicBool::new(false),
        })
    }

    /// Fresh raster with `meta`'s shape plus one fully opaque alpha band.
    pub fn create_alpha_augmented(meta: RasterMeta) -> Result<Self> {
        let raster = Self::create(meta.with_alpha_band())?;
        let alpha = raster.meta.band_count - 1;
        raster.bands[alpha]
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fill(T::opaque());
        Ok(raster)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Downsample factors of the stored overviews, ascending.
    pub fn overview_factors(&self) -> Vec<usize> {
        self.overviews
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|level| level.factor)
            .collect()
    }

    pub fn overview_shape(&self, factor: usize) -> Option<(usize, usize)> {
        self.overviews
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|level| level.factor == factor)
            .map(|level| (level.width, level.height))
    }

    /// Read one whole band of the overview stored for `factor`.
    pub fn read_overview(&self, factor: usize, band_index: usize) -> Result<Buffer<T>> {
        self.meta.check_band(band_index)?;
        let overviews = self.overviews.read().unwrap_or_else(PoisonError::into_inner);
        let level = overviews
            .iter()
            .find(|level| level.factor == factor)
            .ok_or_else(|| {
                PyramidioError::PyramidBuild(format!("no overview stored for factor {factor}"))
            })?;
        Buffer::from_vec(
            level.bands[band_index].to_vec(),
            [1, level.height, level.width],
        )
    }

    fn check_writable(&self) -> Result<()> {
        if self.is_finalized() {
            return Err(PyramidioError::Finalized(self.name.clone()));
        }
        Ok(())
    }
}

impl<T: Sample> RasterHandle<T> for MemoryRaster<T> {
    fn meta(&self) -> &RasterMeta {
        &self.meta
    }

    fn read_window(&self, window: &Window, band_indexes: &[usize]) -> Result<Buffer<T>> {
        self.meta.check_window(window)?;
        let mut buffer = Buffer::zeroed([band_indexes.len(), window.height, window.width]);
        for (slot, band_index) in band_indexes.iter().enumerate() {
            self.meta.check_band(*band_index)?;
            let band = self.bands[*band_index]
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let out = buffer.band_mut(slot);
            for row in 0..window.height {
                let src_start = (window.row_off + row) * self.meta.width + window.col_off;
                out[row * window.width..(row + 1) * window.width]
                    .copy_from_slice(&band[src_start..src_start + window.width]);
            }
        }
        Ok(buffer)
    }
}

impl<T: Sample> RasterEdit<T> for MemoryRaster<T> {
    fn write_window(
        &self,
        window: &Window,
        band_indexes: &[usize],
        data: &Buffer<T>,
    ) -> Result<()> {
        self.check_writable()?;
        self.meta.check_window(window)?;
        let expected = [band_indexes.len(), window.height, window.width];
        if data.shape() != expected {
            return Err(PyramidioError::ShapeMismatch {
                expected,
                actual: data.shape(),
            });
        }
        for (slot, band_index) in band_indexes.iter().enumerate() {
            self.meta.check_band(*band_index)?;
            let mut band = self.bands[*band_index]
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let source = data.band(slot);
            for row in 0..window.height {
                let dst_start = (window.row_off + row) * self.meta.width + window.col_off;
                band[dst_start..dst_start + window.width]
                    .copy_from_slice(&source[row * window.width..(row + 1) * window.width]);
            }
        }
        Ok(())
    }

    fn build_overviews(&self, levels: &[usize], resampling: Resampling) -> Result<()> {
        self.check_writable()?;
        validate_levels(levels)?;
        let mut overviews = self
            .overviews
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !overviews.is_empty() {
            return Err(PyramidioError::PyramidBuild(format!(
                "'{}' already has overviews",
                self.name
            )));
        }

        for factor in levels {
            let width = self.meta.width.div_ceil(*factor);
            let height = self.meta.height.div_ceil(*factor);
            info!("building {resampling} overview {width}x{height} (factor {factor})");

            // Derive from the previous level when there is one; halving a
            // ceil-divided dimension lands on the same grid as dividing
            // the full resolution directly.
            let bands = match overviews.last() {
                Some(previous) => downsample_bands(
                    &previous.bands.iter().map(|band| &**band).collect::<Vec<_>>(),
                    (previous.width, previous.height),
                    (width, height),
                    resampling,
                ),
                None => {
                    let full: Vec<_> = self
                        .bands
                        .iter()
                        .map(|band| band.read().unwrap_or_else(PoisonError::into_inner))
                        .collect();
                    downsample_bands(
                        &full.iter().map(|band| &***band).collect::<Vec<_>>(),
                        self.meta.shape(),
                        (width, height),
                        resampling,
                    )
                }
            };
            overviews.push(OverviewLevel {
                factor: *factor,
                width,
                height,
                bands,
            });
        }
        Ok(())
    }

    fn finalize(&self) -> Result<()> {
        if !self.finalized.swap(true, Ordering::Release) {
            info!("finalized raster '{}'", self.name);
        }
        Ok(())
    }
}

fn downsample_bands<T: Sample>(
    bands: &[&[T]],
    src_shape: (usize, usize),
    dst_shape: (usize, usize),
    resampling: Resampling,
) -> Vec<Box<[T]>> {
    let scale = (
        src_shape.0 as f64 / dst_shape.0 as f64,
        src_shape.1 as f64 / dst_shape.1 as f64,
    );
    bands
        .iter()
        .map(|band| {
            resample::resample_band(resampling, band, src_shape, dst_shape, scale)
                .into_boxed_slice()
        })
        .collect()
}

fn validate_levels(levels: &[usize]) -> Result<()> {
    let mut previous = 1;
    for factor in levels {
        if !factor.is_power_of_two() || *factor < 2 {
            return Err(PyramidioError::PyramidBuild(format!(
                "factor {factor} is not a power of two overview level"
            )));
        }
        if *factor <= previous {
            return Err(PyramidioError::PyramidBuild(format!(
                "factor {factor} does not ascend from {previous}"
            )));
        }
        previous = *factor;
    }
    Ok(())
}

/// The process-wide named raster layer.
///
/// Finalized rasters are registered here by the pipeline and reopened by
/// name, playing the role an in-memory filesystem plays for file-backed
/// rasters.
fn layer() -> &'static Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>> {
    static LAYER: OnceLock<Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>> = OnceLock::new();
    LAYER.get_or_init(Default::default)
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn next_name() -> String {
    format!(
        "/vsimem/pyramidio-{:04}",
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    )
}

/// Register a raster under its name and hand the name back.
pub fn register<T: Sample>(raster: MemoryRaster<T>) -> String {
    let name = raster.name().to_string();
    layer()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.clone(), Arc::new(raster));
    name
}

/// Reopen a registered raster. `None` when the name is unknown or the
/// sample type does not match the registered raster.
pub fn open<T: Sample>(name: &str) -> Option<Arc<MemoryRaster<T>>> {
    let raster = layer()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()?;
    raster.downcast::<MemoryRaster<T>>().ok()
}

/// Drop a registered raster, releasing its memory once open handles go away.
pub fn remove(name: &str) -> bool {
    layer()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(name)
        .is_some()
}

pub fn names() -> Vec<String> {
    layer()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect()
}
