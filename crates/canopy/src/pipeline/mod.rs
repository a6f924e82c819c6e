pub mod builder;

use tracing::{debug, info};

use crate::{
    algorithms::{AoiRasterizer, FixedThreshold, PolygonBuilder, binarize, composite},
    error::Result,
    sampling::{PixelSample, PixelSampler},
    traits::{AoiSource, ContourExtractor, RasterSource, Reprojector, ThresholdSelector},
    types::{Crs, RasterGrid, SegmentationResult},
};

/// Canopy segmentation: AOI burn, global threshold, masking, tracing and
/// polygon building, run strictly in sequence.
///
/// Every run owns its intermediate buffers, so one pipeline can serve
/// several threads as long as each works on its own inputs.
pub struct SegmentationPipeline {
    reprojector: Box<dyn Reprojector>,
    threshold_selector: Box<dyn ThresholdSelector>,
    contour_extractor: Box<dyn ContourExtractor>,
}

impl SegmentationPipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        reprojector: Box<dyn Reprojector>,
        threshold_selector: Box<dyn ThresholdSelector>,
        contour_extractor: Box<dyn ContourExtractor>,
    ) -> Self {
        Self {
            reprojector,
            threshold_selector,
            contour_extractor,
        }
    }

    /// Read the raster once, then segment it.
    #[tracing::instrument(skip_all)]
    pub fn run(&self, raster: &dyn RasterSource, aoi: &dyn AoiSource) -> Result<SegmentationResult> {
        let grid = RasterGrid::from_source(raster)?;
        self.segment(&grid, aoi)
    }

    /// Segment an already loaded raster.
    pub fn segment(&self, grid: &RasterGrid, aoi: &dyn AoiSource) -> Result<SegmentationResult> {
        self.segment_with(grid, aoi, self.threshold_selector.as_ref())
    }

    /// Segment with a fixed threshold instead of the configured selector.
    pub fn segment_with_threshold(
        &self,
        grid: &RasterGrid,
        aoi: &dyn AoiSource,
        threshold: u8,
    ) -> Result<SegmentationResult> {
        self.segment_with(grid, aoi, &FixedThreshold { threshold })
    }

    fn segment_with(
        &self,
        grid: &RasterGrid,
        aoi: &dyn AoiSource,
        selector: &dyn ThresholdSelector,
    ) -> Result<SegmentationResult> {
        // Step 1: Burn the AOI onto the raster grid
        let aoi_mask = AoiRasterizer::new(self.reprojector.as_ref()).rasterize(aoi, grid)?;

        // Step 2: Global threshold over the whole raster, not just the AOI
        let threshold = selector.select(grid.intensity())?;
        let thresholded = binarize(grid.intensity(), threshold);
        debug!(threshold, "binarized raster");

        // Step 3: Dark pixels inside the AOI are canopy
        let foreground = composite(&aoi_mask, &thresholded)?;
        debug!(canopy_pixels = foreground.count_set(), "masked foreground");

        // Step 4: Trace outer borders
        let contours = self.contour_extractor.extract_contours(&foreground)?;
        debug!(contours = contours.len(), "traced contours");

        // Step 5: Georeference and number them
        let polygons = PolygonBuilder::new(grid.georef()).build(&contours);
        info!(polygons = polygons.len(), threshold, crs = %grid.crs(), "segmentation finished");

        Ok(SegmentationResult {
            polygons,
            crs: grid.crs().clone(),
            threshold,
            raster_width: grid.width(),
            raster_height: grid.height(),
        })
    }

    /// Intensity under a point given in `crs`.
    pub fn sample(&self, grid: &RasterGrid, x: f64, y: f64, crs: &Crs) -> Result<Option<PixelSample>> {
        PixelSampler::new(self.reprojector.as_ref()).sample(grid, x, y, crs)
    }
}

impl Default for SegmentationPipeline {
    fn default() -> Self {
        builder::PipelineBuilder::new().build()
    }
}
