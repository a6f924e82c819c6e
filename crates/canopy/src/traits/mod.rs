use geo_types::Coord;
use image::GrayImage;

use crate::{
    error::Result,
    types::{BinaryMask, Contour, Crs, Extent},
};

/// Raster pixels plus the grid geometry they are laid out on
pub trait RasterSource {
    /// Single-channel 8-bit intensities, row-major, `width * height` long
    fn intensity(&self) -> Result<GrayImage>;

    fn extent(&self) -> Extent;

    /// Pixel dimensions as `(width, height)`
    fn dimensions(&self) -> (u32, u32);

    fn crs(&self) -> &Crs;
}

/// Polygon rings bounding the area of interest
pub trait AoiSource {
    /// Every ring (exteriors and holes), implicitly closed
    fn rings(&self) -> Result<Vec<Vec<Coord<f64>>>>;

    fn crs(&self) -> &Crs;
}

/// Coordinate transform between two reference systems
pub trait Reprojector: Send + Sync {
    /// Reproject `points` from `from` into `to`, preserving order and count
    fn reproject(&self, points: &[Coord<f64>], from: &Crs, to: &Crs) -> Result<Vec<Coord<f64>>>;
}

/// Trait for global binarization threshold selection
pub trait ThresholdSelector: Send + Sync {
    /// Pixels strictly above the returned level are foreground of the binary image
    fn select(&self, image: &GrayImage) -> Result<u8>;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract outer boundaries of the set regions of `foreground`
    fn extract_contours(&self, foreground: &BinaryMask) -> Result<Vec<Contour>>;
}
