use std::path::{Path, PathBuf};

use image::GrayImage;

use crate::{
    error::{CanopyError, Result},
    traits::RasterSource,
    types::{Crs, Extent, RasterGrid},
};

/// Raster image on disk, decoded to 8-bit luma on read.
///
/// The image carries no georeferencing of its own; the extent and CRS are
/// declared by the caller.
#[derive(Debug, Clone)]
pub struct ImageRasterSource {
    path: PathBuf,
    extent: Extent,
    crs: Crs,
    dimensions: (u32, u32),
}

impl ImageRasterSource {
    /// Probe the file header for its pixel dimensions.
    pub fn open<P: AsRef<Path>>(path: P, extent: Extent, crs: Crs) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dimensions = image::image_dimensions(&path)
            .map_err(|e| CanopyError::RasterRead(format!("{}: {e}", path.display())))?;
        Ok(Self {
            path,
            extent,
            crs,
            dimensions,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RasterSource for ImageRasterSource {
    fn intensity(&self) -> Result<GrayImage> {
        let image = image::open(&self.path)
            .map_err(|e| CanopyError::RasterRead(format!("{}: {e}", self.path.display())))?;
        Ok(image.to_luma8())
    }

    fn extent(&self) -> Extent {
        self.extent
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn crs(&self) -> &Crs {
        &self.crs
    }
}

impl RasterGrid {
    /// Load and decode a raster file in one go.
    pub fn from_path<P: AsRef<Path>>(path: P, extent: Extent, crs: Crs) -> Result<Self> {
        Self::from_source(&ImageRasterSource::open(path, extent, crs)?)
    }

    /// Decode an encoded image held in memory.
    pub fn from_image_bytes(bytes: &[u8], extent: Extent, crs: Crs) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        Self::new(extent, crs, image.to_luma8())
    }
}
