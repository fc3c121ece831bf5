//! Raster assembly module

mod output_raster;

pub use output_raster::OutputRaster;
