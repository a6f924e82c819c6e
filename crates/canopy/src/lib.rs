//! # Tree Canopy Segmentation Library
//!
//! Extracts individual tree-canopy polygons from a single-band aerial raster,
//! restricted to an area of interest (AOI).
//!
//! ## Pipeline
//!
//! 1. **Georeferencing**: cell-centre affine mapping between pixels and map coordinates
//! 2. **AOI burn**: reproject the AOI into the raster CRS and rasterize it (pixel-centre rule)
//! 3. **Threshold**: global Otsu level over the whole raster
//! 4. **Masking**: pixels inside the AOI on the dark side of the threshold are canopy
//! 5. **Tracing**: outer borders of canopy regions, chain-compressed
//! 6. **Building**: dense 1-based ids, shoelace pixel area, georeferenced rings
//!
//! Reprojection, threshold selection and contour extraction are injected
//! through traits, so each stage can be swapped or stubbed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use canopy::{AoiGeometry, Crs, Extent, ImageRasterSource, SegmentationPipeline};
//!
//! let crs = Crs::epsg(3857);
//! let raster = ImageRasterSource::open(
//!     "ortho.tif",
//!     Extent::new(-413_000.0, -412_000.0, 4_926_000.0, 4_927_000.0),
//!     crs.clone(),
//! )?;
//! let aoi = AoiGeometry::from_geojson_file("parcel.geojson", Crs::epsg(4326))?;
//!
//! let result = SegmentationPipeline::default().run(&raster, &aoi)?;
//! result.save_geojson("canopies.geojson")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use canopy::{IdentityReprojector, SegmentationPipeline};
//!
//! let pipeline = SegmentationPipeline::builder()
//!     .set_reprojector(IdentityReprojector)
//!     .with_fixed_threshold(96)
//!     .build();
//! # let _ = pipeline;
//! ```

pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod sampling;
pub mod io;
pub mod typed_geojson;
pub mod manager;

pub use error::{CanopyError, Result};
pub use types::{AoiGeometry, BinaryMask, CanopyPolygon, Contour, Crs, Extent, RasterGrid, SegmentationResult};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{SegmentationPipeline, builder::PipelineBuilder};
pub use sampling::{PixelSample, PixelSampler, SampleSet};
pub use io::ImageRasterSource;
pub use typed_geojson::{CanopyFeatureCollection, CanopyProperties};
pub use manager::{CanopyCommand, CanopySession, CommandOutput};
