use geo_types::Coord;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{CanopyError, Result},
    traits::Reprojector,
    types::{Crs, RasterGrid},
};

/// Intensity of one raster cell, located by a point in the raster's CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PixelSample {
    pub x: f64,
    pub y: f64,
    pub col: u32,
    pub row: u32,
    pub intensity: u8,
}

impl RasterGrid {
    /// Sample the cell containing `(x, y)` given in the raster's own CRS.
    pub fn sample(&self, x: f64, y: f64) -> Option<PixelSample> {
        let (col, row) = self.georef().cell_at(x, y)?;
        Some(PixelSample {
            x,
            y,
            col,
            row,
            intensity: self.intensity().get_pixel(col, row)[0],
        })
    }
}

/// Samples a raster at points expressed in any CRS the reprojector handles.
pub struct PixelSampler<'a> {
    reprojector: &'a dyn Reprojector,
}

impl<'a> PixelSampler<'a> {
    pub fn new(reprojector: &'a dyn Reprojector) -> Self {
        Self { reprojector }
    }

    /// `Ok(None)` when the point falls outside the raster.
    pub fn sample(&self, grid: &RasterGrid, x: f64, y: f64, crs: &Crs) -> Result<Option<PixelSample>> {
        let point = if crs != grid.crs() {
            let projected = self.reprojector.reproject(&[Coord { x, y }], crs, grid.crs())?;
            projected.first().copied().ok_or_else(|| CanopyError::Reprojection {
                from: crs.to_string(),
                to: grid.crs().to_string(),
                reason: "no point returned".to_string(),
            })?
        } else {
            Coord { x, y }
        };
        Ok(grid.sample(point.x, point.y))
    }
}

/// Samples collected by the caller, in collection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SampleSet {
    samples: Vec<PixelSample>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample; misses outside the raster are ignored.
    pub fn record(&mut self, sample: Option<PixelSample>) -> bool {
        match sample {
            Some(sample) => {
                self.samples.push(sample);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[PixelSample] {
        &self.samples
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn mean_intensity(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().map(|s| f64::from(s.intensity)).sum();
        Some(sum / self.samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{BuiltinReprojector, IdentityReprojector};
    use crate::types::Extent;
    use image::{GrayImage, Luma};

    fn grid() -> RasterGrid {
        let image = GrayImage::from_fn(4, 4, |x, y| Luma([(y * 4 + x) as u8]));
        RasterGrid::new(Extent::new(0.0, 400.0, 0.0, 400.0), Crs::epsg(3857), image).unwrap()
    }

    #[test]
    fn samples_cell_under_point() {
        let sample = grid().sample(150.0, 350.0).unwrap();
        assert_eq!((sample.col, sample.row, sample.intensity), (1, 0, 1));
        assert!(grid().sample(401.0, 10.0).is_none());
    }

    #[test]
    fn points_in_other_crs_are_reprojected() {
        let sampler = PixelSampler::new(&BuiltinReprojector);
        // About 334 m east and 111 m north of the origin.
        let sample = sampler
            .sample(&grid(), 0.003, 0.001, &Crs::epsg(4326))
            .unwrap()
            .unwrap();
        assert_eq!((sample.col, sample.row), (3, 2));
        assert_eq!(sample.intensity, 11);
    }

    #[test]
    fn sample_set_collects_hits_only() {
        let grid = grid();
        let sampler = PixelSampler::new(&IdentityReprojector);
        let mut set = SampleSet::new();
        assert!(set.record(sampler.sample(&grid, 50.0, 350.0, grid.crs()).unwrap()));
        assert!(set.record(sampler.sample(&grid, 350.0, 50.0, grid.crs()).unwrap()));
        assert!(!set.record(sampler.sample(&grid, -5.0, 50.0, grid.crs()).unwrap()));
        assert_eq!(set.len(), 2);
        assert_eq!(set.mean_intensity(), Some(7.5));
    }
}
