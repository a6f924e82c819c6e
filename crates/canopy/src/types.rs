use std::collections::HashSet;
use std::fmt;

use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use image::{GrayImage, Luma};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::algorithms::georef::GridGeoreferencer;
use crate::error::{CanopyError, Result};
use crate::traits::{AoiSource, RasterSource};

/// Coordinate reference system identifier, e.g. `EPSG:25830`.
///
/// Identifiers compare case-insensitively and ignore surrounding whitespace.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn epsg(code: u32) -> Self {
        Self(format!("EPSG:{code}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric EPSG code, if the identifier has the form `EPSG:<code>`.
    pub fn epsg_code(&self) -> Option<u32> {
        let id = self.0.trim();
        let (authority, code) = id.split_once(':')?;
        if !authority.eq_ignore_ascii_case("epsg") {
            return None;
        }
        code.trim().parse().ok()
    }

    fn normalized(&self) -> String {
        self.0.trim().to_ascii_uppercase()
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Crs {}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounds of a raster in its own coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Extent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Extent {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// A georeferenced single-channel 8-bit raster.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    georef: GridGeoreferencer,
    crs: Crs,
    intensity: GrayImage,
}

impl RasterGrid {
    /// Wrap an intensity image covering `extent`.
    pub fn new(extent: Extent, crs: Crs, intensity: GrayImage) -> Result<Self> {
        let georef = GridGeoreferencer::from_extent(&extent, intensity.width(), intensity.height())?;
        Ok(Self { georef, crs, intensity })
    }

    /// Build a raster from a row-major buffer of `width * height` bytes.
    pub fn from_raw(extent: Extent, crs: Crs, width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let georef = GridGeoreferencer::from_extent(&extent, width, height)?;
        let len = data.len();
        let intensity = GrayImage::from_raw(width, height, data).ok_or_else(|| {
            CanopyError::RasterRead(format!(
                "buffer holds {len} bytes, expected {width}x{height}"
            ))
        })?;
        Ok(Self { georef, crs, intensity })
    }

    /// Perform the one-shot read of a raster source.
    pub fn from_source(source: &dyn RasterSource) -> Result<Self> {
        let (width, height) = source.dimensions();
        let georef = GridGeoreferencer::from_extent(&source.extent(), width, height)?;
        let intensity = source.intensity()?;
        if intensity.dimensions() != (width, height) {
            return Err(CanopyError::RasterRead(format!(
                "intensity buffer is {}x{}, source declares {width}x{height}",
                intensity.width(),
                intensity.height()
            )));
        }
        Ok(Self {
            georef,
            crs: source.crs().clone(),
            intensity,
        })
    }

    pub fn georef(&self) -> &GridGeoreferencer {
        &self.georef
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn intensity(&self) -> &GrayImage {
        &self.intensity
    }

    pub fn width(&self) -> u32 {
        self.intensity.width()
    }

    pub fn height(&self) -> u32 {
        self.intensity.height()
    }

    pub fn extent(&self) -> Extent {
        self.georef.extent()
    }
}

impl RasterSource for RasterGrid {
    fn intensity(&self) -> Result<GrayImage> {
        Ok(self.intensity.clone())
    }

    fn extent(&self) -> Extent {
        self.georef.extent()
    }

    fn dimensions(&self) -> (u32, u32) {
        self.intensity.dimensions()
    }

    fn crs(&self) -> &Crs {
        &self.crs
    }
}

/// Area of interest: polygons (with optional holes) in a declared CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct AoiGeometry {
    pub polygons: MultiPolygon<f64>,
    pub crs: Crs,
}

impl AoiGeometry {
    pub fn new(polygons: MultiPolygon<f64>, crs: Crs) -> Self {
        Self { polygons, crs }
    }

    pub fn from_polygon(polygon: Polygon<f64>, crs: Crs) -> Self {
        Self::new(MultiPolygon::new(vec![polygon]), crs)
    }

    /// Each ring becomes the exterior of its own polygon.
    pub fn from_rings(rings: Vec<Vec<[f64; 2]>>, crs: Crs) -> Self {
        let polygons = rings
            .into_iter()
            .map(|ring| {
                let coords: Vec<Coord<f64>> = ring.into_iter().map(|[x, y]| Coord { x, y }).collect();
                Polygon::new(LineString::new(coords), vec![])
            })
            .collect();
        Self::new(MultiPolygon::new(polygons), crs)
    }

    /// Rectangle covering `extent` exactly.
    pub fn from_extent(extent: &Extent, crs: Crs) -> Self {
        Self::from_rings(
            vec![vec![
                [extent.x_min, extent.y_min],
                [extent.x_max, extent.y_min],
                [extent.x_max, extent.y_max],
                [extent.x_min, extent.y_max],
            ]],
            crs,
        )
    }

    /// Every ring (exteriors and holes) with the closing vertex dropped.
    pub fn open_rings(&self) -> Vec<Vec<Coord<f64>>> {
        self.polygons
            .iter()
            .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
            .map(open_ring)
            .collect()
    }
}

impl AoiSource for AoiGeometry {
    fn rings(&self) -> Result<Vec<Vec<Coord<f64>>>> {
        Ok(self.open_rings())
    }

    fn crs(&self) -> &Crs {
        &self.crs
    }
}

fn open_ring(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut coords = ring.0.clone();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords
}

/// Number of distinct vertices in a ring.
pub fn distinct_vertex_count(ring: &[Coord<f64>]) -> usize {
    ring.iter()
        .map(|c| (c.x.to_bits(), c.y.to_bits()))
        .collect::<HashSet<_>>()
        .len()
}

/// W×H {0,1} buffer aligned with a raster grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    image: GrayImage,
}

impl BinaryMask {
    /// All-zero mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        Self {
            image: GrayImage::from_fn(width, height, |col, row| Luma([u8::from(f(col, row))])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn get(&self, col: u32, row: u32) -> bool {
        self.image.get_pixel(col, row)[0] != 0
    }

    pub fn set(&mut self, col: u32, row: u32, value: bool) {
        self.image.put_pixel(col, row, Luma([u8::from(value)]));
    }

    /// Number of set pixels.
    pub fn count_set(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v != 0).count()
    }

    pub fn none_set(&self) -> bool {
        self.image.as_raw().iter().all(|&v| v == 0)
    }

    /// Underlying image; foreground pixels hold 1.
    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

/// Closed boundary in pixel space, vertices as `[col, row]`.
///
/// The ring is implicitly closed: the first vertex is not repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour {
    pub vertices: Vec<[i32; 2]>,
}

impl Contour {
    pub fn new(vertices: Vec<[i32; 2]>) -> Self {
        Self { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Fewer than three distinct vertices cannot bound an area.
    pub fn is_degenerate(&self) -> bool {
        self.distinct_vertex_count() < 3
    }

    pub fn distinct_vertex_count(&self) -> usize {
        self.vertices.iter().collect::<HashSet<_>>().len()
    }

    /// Shoelace area, absolute value truncated to an integer.
    pub fn pixel_area(&self) -> u64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let [x0, y0] = self.vertices[i];
                let [x1, y1] = self.vertices[(i + 1) % n];
                i64::from(x0) * i64::from(y1) - i64::from(x1) * i64::from(y0)
            })
            .sum();
        twice.unsigned_abs() / 2
    }
}

/// One segmented canopy crown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CanopyPolygon {
    /// Dense sequential identifier starting at 1
    pub id: u32,
    /// Shoelace area of the pixel contour
    pub area_px: u64,
    /// Georeferenced ring, implicitly closed
    pub ring: Vec<[f64; 2]>,
}

impl CanopyPolygon {
    /// Convert to a geo-types polygon (closes the ring).
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self.ring.iter().map(|&[x, y]| Coord { x, y }).collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    /// Area in squared CRS units.
    pub fn map_area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }
}

/// Output of one segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentationResult {
    pub polygons: Vec<CanopyPolygon>,
    /// Always the raster's CRS
    pub crs: Crs,
    /// Intensity threshold that split canopy from background
    pub threshold: u8,
    pub raster_width: u32,
    pub raster_height: u32,
}

impl SegmentationResult {
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&CanopyPolygon> {
        self.polygons.iter().find(|polygon| polygon.id == id)
    }

    pub fn total_area_px(&self) -> u64 {
        self.polygons.iter().map(|polygon| polygon.area_px).sum()
    }
}
