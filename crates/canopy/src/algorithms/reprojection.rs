use std::f64::consts::PI;

use geo_types::Coord;

use crate::{
    error::{CanopyError, Result},
    traits::Reprojector,
    types::Crs,
};

pub const EPSG_WGS84: u32 = 4326;
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// WGS84 semi-major axis used by spherical Web Mercator
const EARTH_RADIUS: f64 = 6_378_137.0;
/// Latitude at which Web Mercator becomes square
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Returns points unchanged whatever the CRS pair.
#[derive(Debug, Clone, Default)]
pub struct IdentityReprojector;

impl Reprojector for IdentityReprojector {
    fn reproject(&self, points: &[Coord<f64>], _from: &Crs, _to: &Crs) -> Result<Vec<Coord<f64>>> {
        Ok(points.to_vec())
    }
}

/// Closed-form transforms between EPSG:4326 and EPSG:3857.
///
/// Any other pair of distinct systems is rejected.
#[derive(Debug, Clone, Default)]
pub struct BuiltinReprojector;

impl Reprojector for BuiltinReprojector {
    fn reproject(&self, points: &[Coord<f64>], from: &Crs, to: &Crs) -> Result<Vec<Coord<f64>>> {
        if from == to {
            return Ok(points.to_vec());
        }

        let transform: fn(Coord<f64>) -> Coord<f64> = match (from.epsg_code(), to.epsg_code()) {
            (Some(EPSG_WGS84), Some(EPSG_WEB_MERCATOR)) => lonlat_to_mercator,
            (Some(EPSG_WEB_MERCATOR), Some(EPSG_WGS84)) => mercator_to_lonlat,
            _ => {
                return Err(CanopyError::Reprojection {
                    from: from.to_string(),
                    to: to.to_string(),
                    reason: "unsupported CRS pair".to_string(),
                });
            }
        };

        points
            .iter()
            .map(|&point| {
                let projected = transform(point);
                if projected.x.is_finite() && projected.y.is_finite() {
                    Ok(projected)
                } else {
                    Err(CanopyError::Reprojection {
                        from: from.to_string(),
                        to: to.to_string(),
                        reason: format!("({}, {}) has no finite image", point.x, point.y),
                    })
                }
            })
            .collect()
    }
}

fn lonlat_to_mercator(point: Coord<f64>) -> Coord<f64> {
    let lat = point.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Coord {
        x: EARTH_RADIUS * point.x.to_radians(),
        y: EARTH_RADIUS * (PI / 4.0 + lat / 2.0).tan().ln(),
    }
}

fn mercator_to_lonlat(point: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (point.x / EARTH_RADIUS).to_degrees(),
        y: (2.0 * (point.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees(),
    }
}
