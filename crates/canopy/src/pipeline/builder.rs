use crate::{
    algorithms::{BuiltinReprojector, ExternalContourTracer, FixedThreshold, OtsuThreshold},
    pipeline::SegmentationPipeline,
    traits::{ContourExtractor, Reprojector, ThresholdSelector},
};

/// Builder for creating segmentation pipelines with a fluent API
pub struct PipelineBuilder {
    reprojector: Option<Box<dyn Reprojector>>,
    threshold_selector: Option<Box<dyn ThresholdSelector>>,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            reprojector: None,
            threshold_selector: None,
            contour_extractor: None,
        }
    }

    /// Set the CRS transform used when the AOI and raster disagree
    pub fn set_reprojector<R>(mut self, reprojector: R) -> Self
    where
        R: Reprojector + 'static,
    {
        self.reprojector = Some(Box::new(reprojector));
        self
    }

    /// Set the threshold selector (replaces any existing one)
    pub fn set_threshold_selector<T>(mut self, selector: T) -> Self
    where
        T: ThresholdSelector + 'static,
    {
        self.threshold_selector = Some(Box::new(selector));
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Skip Otsu and binarize at a fixed level
    pub fn with_fixed_threshold(self, threshold: u8) -> Self {
        self.set_threshold_selector(FixedThreshold { threshold })
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> SegmentationPipeline {
        let reprojector = self.reprojector
            .unwrap_or_else(|| Box::new(BuiltinReprojector));

        let threshold_selector = self.threshold_selector
            .unwrap_or_else(|| Box::new(OtsuThreshold));

        let contour_extractor = self.contour_extractor
            .unwrap_or_else(|| Box::new(ExternalContourTracer));

        SegmentationPipeline::new(reprojector, threshold_selector, contour_extractor)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
