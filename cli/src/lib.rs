use canopy::{
    AoiGeometry, CanopyError, Crs, Extent, ImageRasterSource, SegmentationPipeline, SegmentationResult,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Canopy(#[from] CanopyError),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One segmentation run: where the inputs live and where the polygons go
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SegmentationJob {
    /// Single-band raster image
    pub raster: String,
    /// CRS of the raster, e.g. `EPSG:25830`
    pub raster_crs: String,
    /// GeoJSON file holding the area of interest
    pub aoi: String,
    /// CRS of the AOI coordinates; defaults to the raster CRS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aoi_crs: Option<String>,
    /// Destination GeoJSON file
    pub output: String,
    /// Fixed intensity threshold; Otsu is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u8>,
    /// Raster bounds in its own CRS
    pub extent: Extent,
}

impl SegmentationJob {
    /// Template written by `canopy init`
    pub fn skeleton() -> Self {
        Self {
            raster: "ortho.tif".to_string(),
            raster_crs: "EPSG:3857".to_string(),
            aoi: "aoi.geojson".to_string(),
            aoi_crs: Some("EPSG:4326".to_string()),
            output: "canopies.geojson".to_string(),
            threshold: None,
            extent: Extent::new(-413_000.0, -412_000.0, 4_926_000.0, 4_927_000.0),
        }
    }

    pub fn raster_crs(&self) -> Crs {
        Crs::new(self.raster_crs.as_str())
    }

    pub fn aoi_crs(&self) -> Crs {
        self.aoi_crs
            .as_deref()
            .map(Crs::new)
            .unwrap_or_else(|| self.raster_crs())
    }

    pub fn pipeline(&self) -> SegmentationPipeline {
        let builder = SegmentationPipeline::builder();
        match self.threshold {
            Some(threshold) => builder.with_fixed_threshold(threshold).build(),
            None => builder.build(),
        }
    }

    pub fn raster_source(&self) -> Result<ImageRasterSource, CliError> {
        Ok(ImageRasterSource::open(&self.raster, self.extent, self.raster_crs())?)
    }

    pub fn load_aoi(&self) -> Result<AoiGeometry, CliError> {
        Ok(AoiGeometry::from_geojson_file(&self.aoi, self.aoi_crs())?)
    }

    /// Segment the raster and write the polygons to `output`.
    pub fn run(&self) -> Result<SegmentationResult, CliError> {
        let raster = self.raster_source()?;
        let aoi = self.load_aoi()?;
        let result = self.pipeline().run(&raster, &aoi)?;
        result.save_geojson(&self.output)?;
        Ok(result)
    }

    /// Load SegmentationJob configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load SegmentationJob configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Save configuration, choosing the format from the extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => return Err(CliError::UnsupportedFileFormat),
        };
        fs::write(path_ref, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}
