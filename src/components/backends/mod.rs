pub mod memory;

#[cfg(feature = "gdal")]
pub mod gdal_backend;
