use std::{path::Path, sync::Arc};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    error::{CanopyError, Result},
    pipeline::SegmentationPipeline,
    sampling::PixelSample,
    types::{AoiGeometry, Crs, Extent, RasterGrid, SegmentationResult},
};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum CanopyCommand {
    /// Segment tree canopies with an Otsu threshold
    #[serde(rename = "segment")]
    Segment,

    /// Segment tree canopies with a fixed intensity threshold
    #[serde(rename = "segment_with_threshold")]
    SegmentWithThreshold {
        #[schemars(range(min = 0, max = 255))]
        threshold: u8,
    },

    /// Read the raster intensity under a point
    #[serde(rename = "sample_pixel")]
    SamplePixel {
        x: f64,
        y: f64,
        /// CRS of the point; the raster's own CRS when omitted
        #[serde(default)]
        crs: Option<String>,
    },
}

impl CanopyCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(CanopyCommand)
    }

    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Segment => "Segment tree canopies inside the area of interest using an Otsu threshold",
            Self::SegmentWithThreshold { .. } => "Segment tree canopies using a fixed intensity threshold",
            Self::SamplePixel { .. } => "Sample the raster intensity at a geographic point",
        }
    }
}

/// What a command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    Segmentation(SegmentationResult),
    Sample(Option<PixelSample>),
}

/// Holds the loaded raster and AOI between commands.
#[derive(Clone)]
pub struct CanopySession {
    raster: Option<RasterGrid>,
    aoi: Option<AoiGeometry>,
    pipeline: Arc<SegmentationPipeline>,
}

impl CanopySession {
    pub fn new() -> Self {
        Self::with_pipeline(SegmentationPipeline::default())
    }

    pub fn with_pipeline(pipeline: SegmentationPipeline) -> Self {
        Self {
            raster: None,
            aoi: None,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Load a raster image from file
    pub fn load_raster<P: AsRef<Path>>(&mut self, path: P, extent: Extent, crs: Crs) -> Result<()> {
        self.raster = Some(RasterGrid::from_path(path, extent, crs)?);
        Ok(())
    }

    pub fn set_raster(&mut self, raster: RasterGrid) {
        self.raster = Some(raster);
    }

    /// Load the area of interest from a GeoJSON file
    pub fn load_aoi_geojson<P: AsRef<Path>>(&mut self, path: P, crs: Crs) -> Result<()> {
        self.aoi = Some(AoiGeometry::from_geojson_file(path, crs)?);
        Ok(())
    }

    pub fn set_aoi(&mut self, aoi: AoiGeometry) {
        self.aoi = Some(aoi);
    }

    pub fn raster(&self) -> Option<&RasterGrid> {
        self.raster.as_ref()
    }

    pub fn aoi(&self) -> Option<&AoiGeometry> {
        self.aoi.as_ref()
    }

    pub fn execute(&self, command: CanopyCommand) -> Result<CommandOutput> {
        let raster = self.raster.as_ref().ok_or(CanopyError::NoRasterLoaded)?;

        match command {
            CanopyCommand::Segment => {
                let aoi = self.aoi.as_ref().ok_or(CanopyError::NoAoiLoaded)?;
                self.pipeline.segment(raster, aoi).map(CommandOutput::Segmentation)
            }
            CanopyCommand::SegmentWithThreshold { threshold } => {
                let aoi = self.aoi.as_ref().ok_or(CanopyError::NoAoiLoaded)?;
                self.pipeline
                    .segment_with_threshold(raster, aoi, threshold)
                    .map(CommandOutput::Segmentation)
            }
            CanopyCommand::SamplePixel { x, y, crs } => {
                let crs = crs.map(Crs::new).unwrap_or_else(|| raster.crs().clone());
                self.pipeline.sample(raster, x, y, &crs).map(CommandOutput::Sample)
            }
        }
    }
}

impl Default for CanopySession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::str::FromStr;

    fn session() -> CanopySession {
        let image = GrayImage::from_fn(10, 10, |x, y| {
            if (4..=6).contains(&x) && (4..=6).contains(&y) { Luma([10]) } else { Luma([200]) }
        });
        let extent = Extent::new(0.0, 10.0, 0.0, 10.0);
        let mut session = CanopySession::new();
        session.set_raster(RasterGrid::new(extent, Crs::epsg(25830), image).unwrap());
        session.set_aoi(AoiGeometry::from_extent(&extent, Crs::epsg(25830)));
        session
    }

    #[test]
    fn command_names_are_snake_case() {
        assert_eq!(
            CanopyCommand::command_names(),
            &["segment", "segment_with_threshold", "sample_pixel"]
        );
        assert_eq!(
            CanopyCommand::from_str("segment_with_threshold").unwrap(),
            CanopyCommand::SegmentWithThreshold { threshold: 0 }
        );
    }

    #[test]
    fn commands_deserialize_from_tagged_json() {
        let command: CanopyCommand =
            serde_json::from_str(r#"{"type": "segment_with_threshold", "params": {"threshold": 90}}"#).unwrap();
        assert_eq!(command, CanopyCommand::SegmentWithThreshold { threshold: 90 });

        let command: CanopyCommand =
            serde_json::from_str(r#"{"type": "sample_pixel", "params": {"x": 1.0, "y": 2.0}}"#).unwrap();
        assert_eq!(command, CanopyCommand::SamplePixel { x: 1.0, y: 2.0, crs: None });
    }

    #[test]
    fn schema_lists_every_command() {
        let schema = serde_json::to_string(&CanopyCommand::schema()).unwrap();
        for name in CanopyCommand::command_names() {
            assert!(schema.contains(name), "schema is missing {name}");
        }
    }

    #[test]
    fn segment_requires_loaded_inputs() {
        let empty = CanopySession::new();
        assert!(matches!(empty.execute(CanopyCommand::Segment), Err(CanopyError::NoRasterLoaded)));

        let mut no_aoi = CanopySession::new();
        no_aoi.set_raster(session().raster().unwrap().clone());
        assert!(matches!(no_aoi.execute(CanopyCommand::Segment), Err(CanopyError::NoAoiLoaded)));
        assert!(no_aoi
            .execute(CanopyCommand::SamplePixel { x: 5.5, y: 4.5, crs: None })
            .is_ok());
    }

    #[test]
    fn segment_finds_the_dark_block() {
        match session().execute(CanopyCommand::Segment).unwrap() {
            CommandOutput::Segmentation(result) => {
                assert_eq!(result.len(), 1);
                assert_eq!(result.polygons[0].id, 1);
                assert_eq!(result.polygons[0].area_px, 4);
            }
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn fixed_threshold_below_all_values_finds_nothing() {
        match session().execute(CanopyCommand::SegmentWithThreshold { threshold: 5 }).unwrap() {
            CommandOutput::Segmentation(result) => {
                assert!(result.is_empty());
                assert_eq!(result.threshold, 5);
            }
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn sample_pixel_defaults_to_raster_crs() {
        let output = session()
            .execute(CanopyCommand::SamplePixel { x: 5.5, y: 4.5, crs: None })
            .unwrap();
        let sample = match output {
            CommandOutput::Sample(Some(sample)) => sample,
            other => panic!("unexpected output {other:?}"),
        };
        assert_eq!((sample.col, sample.row, sample.intensity), (5, 5, 10));
    }
}
