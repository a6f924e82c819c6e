use serde::{Deserialize, Serialize};

use crate::{
    error::{CanopyError, Result},
    types::Extent,
};

/// Affine mapping between pixel space and the raster's coordinate space.
///
/// Pixels are addressed by their centres:
///
/// ```text
/// x = x_min + (col + 0.5) * px_x
/// y = y_max - (row + 0.5) * px_y
/// ```
///
/// "Grid space" used by [`GridGeoreferencer::geo_to_grid`] is the same
/// mapping without the half-pixel shift, so pixel `(c, r)` covers
/// `[c, c + 1) x [r, r + 1)` there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridDefinition", into = "GridDefinition")]
pub struct GridGeoreferencer {
    x_min: f64,
    y_max: f64,
    px_x: f64,
    px_y: f64,
    width: u32,
    height: u32,
}

/// Serialized form of a grid; deserialization re-runs the validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDefinition {
    pub extent: Extent,
    pub width: u32,
    pub height: u32,
}

impl TryFrom<GridDefinition> for GridGeoreferencer {
    type Error = CanopyError;

    fn try_from(definition: GridDefinition) -> Result<Self> {
        Self::from_extent(&definition.extent, definition.width, definition.height)
    }
}

impl From<GridGeoreferencer> for GridDefinition {
    fn from(georef: GridGeoreferencer) -> Self {
        Self {
            extent: georef.extent(),
            width: georef.width,
            height: georef.height,
        }
    }
}

impl GridGeoreferencer {
    pub fn from_extent(extent: &Extent, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CanopyError::InvalidGrid(format!(
                "pixel dimensions must be positive, got {width}x{height}"
            )));
        }
        // Negated comparisons also reject NaN bounds.
        if !(extent.x_max > extent.x_min) || !(extent.y_max > extent.y_min) {
            return Err(CanopyError::InvalidGrid(format!(
                "empty extent x=[{}, {}] y=[{}, {}]",
                extent.x_min, extent.x_max, extent.y_min, extent.y_max
            )));
        }

        let px_x = extent.width() / f64::from(width);
        let px_y = extent.height() / f64::from(height);
        if !px_x.is_finite() || !px_y.is_finite() || px_x <= 0.0 || px_y <= 0.0 {
            return Err(CanopyError::InvalidGrid(format!(
                "pixel size ({px_x}, {px_y}) is not usable"
            )));
        }

        Ok(Self {
            x_min: extent.x_min,
            y_max: extent.y_max,
            px_x,
            px_y,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel size as `(px_x, px_y)`, both positive
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.px_x, self.px_y)
    }

    pub fn extent(&self) -> Extent {
        Extent {
            x_min: self.x_min,
            x_max: self.x_min + self.px_x * f64::from(self.width),
            y_min: self.y_max - self.px_y * f64::from(self.height),
            y_max: self.y_max,
        }
    }

    /// Centre of pixel `(col, row)` in CRS coordinates.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.x_min + (col + 0.5) * self.px_x,
            self.y_max - (row + 0.5) * self.px_y,
        )
    }

    /// Inverse of [`pixel_to_geo`](Self::pixel_to_geo).
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let (gx, gy) = self.geo_to_grid(x, y);
        (gx - 0.5, gy - 0.5)
    }

    /// CRS coordinates to continuous grid space.
    pub fn geo_to_grid(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.x_min) / self.px_x, (self.y_max - y) / self.px_y)
    }

    /// Cell containing `(x, y)`, or `None` outside the raster.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        let (gx, gy) = self.geo_to_grid(x, y);
        if !(gx >= 0.0 && gy >= 0.0) {
            return None;
        }
        let (col, row) = (gx.floor(), gy.floor());
        if col >= f64::from(self.width) || row >= f64::from(self.height) {
            return None;
        }
        Some((col as u32, row as u32))
    }
}
