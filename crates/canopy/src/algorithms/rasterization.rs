use geo_types::Coord;
use tracing::debug;

use crate::{
    algorithms::georef::GridGeoreferencer,
    error::{CanopyError, Result},
    traits::{AoiSource, Reprojector},
    types::{BinaryMask, RasterGrid, distinct_vertex_count},
};

/// Burns an area of interest onto a raster's pixel grid.
///
/// A pixel is inside when its centre is inside the ring set under the
/// even-odd rule, so holes and overlapping rings cancel out.
pub struct AoiRasterizer<'a> {
    reprojector: &'a dyn Reprojector,
}

impl<'a> AoiRasterizer<'a> {
    pub fn new(reprojector: &'a dyn Reprojector) -> Self {
        Self { reprojector }
    }

    pub fn rasterize(&self, aoi: &dyn AoiSource, grid: &RasterGrid) -> Result<BinaryMask> {
        let rings: Vec<Vec<Coord<f64>>> = aoi
            .rings()?
            .into_iter()
            .filter(|ring| distinct_vertex_count(ring) >= 3)
            .collect();
        if rings.is_empty() {
            return Err(CanopyError::AoiEmpty);
        }

        let rings = if aoi.crs() != grid.crs() {
            debug!(from = %aoi.crs(), to = %grid.crs(), "reprojecting AOI");
            rings
                .iter()
                .map(|ring| self.reproject_ring(ring, aoi, grid))
                .collect::<Result<Vec<_>>>()?
        } else {
            rings
        };

        let mask = burn_rings(&rings, grid.georef())?;
        debug!(
            rings = rings.len(),
            inside = mask.count_set(),
            total = u64::from(grid.width()) * u64::from(grid.height()),
            "AOI rasterized"
        );
        Ok(mask)
    }

    fn reproject_ring(&self, ring: &[Coord<f64>], aoi: &dyn AoiSource, grid: &RasterGrid) -> Result<Vec<Coord<f64>>> {
        let projected = self.reprojector.reproject(ring, aoi.crs(), grid.crs())?;
        if projected.len() != ring.len() {
            return Err(CanopyError::Reprojection {
                from: aoi.crs().to_string(),
                to: grid.crs().to_string(),
                reason: format!("{} points in, {} points out", ring.len(), projected.len()),
            });
        }
        Ok(projected)
    }
}

/// Scanline fill of `rings` (already in the grid's CRS) at pixel centres.
pub fn burn_rings(rings: &[Vec<Coord<f64>>], georef: &GridGeoreferencer) -> Result<BinaryMask> {
    let grid_rings: Vec<Vec<(f64, f64)>> = rings
        .iter()
        .map(|ring| ring.iter().map(|c| georef.geo_to_grid(c.x, c.y)).collect())
        .collect();
    if grid_rings
        .iter()
        .flatten()
        .any(|(x, y)| !x.is_finite() || !y.is_finite())
    {
        return Err(CanopyError::Rasterization(
            "AOI has non-finite vertices in raster space".to_string(),
        ));
    }

    let (width, height) = (georef.width(), georef.height());
    let mut mask = BinaryMask::new(width, height);
    let mut crossings: Vec<f64> = Vec::new();

    for row in 0..height {
        let yc = f64::from(row) + 0.5;
        crossings.clear();

        for ring in &grid_rings {
            let n = ring.len();
            for i in 0..n {
                let (x0, y0) = ring[i];
                let (x1, y1) = ring[(i + 1) % n];
                if (y0 > yc) != (y1 > yc) {
                    crossings.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        // Column c is filled when its centre c + 0.5 lies in [start, end).
        for span in crossings.chunks_exact(2) {
            let first = (span[0] - 0.5).ceil().max(0.0);
            let last = (span[1] - 0.5).ceil().min(f64::from(width));
            if last <= first {
                continue;
            }
            for col in first as u32..last as u32 {
                mask.set(col, row, true);
            }
        }
    }

    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::reprojection::{BuiltinReprojector, IdentityReprojector};
    use crate::types::{AoiGeometry, Crs, Extent};
    use geo_types::{LineString, Polygon};
    use image::GrayImage;

    fn grid(crs: Crs) -> RasterGrid {
        RasterGrid::new(Extent::new(0.0, 10.0, 0.0, 10.0), crs, GrayImage::new(10, 10)).unwrap()
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<[f64; 2]> {
        vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
    }

    #[test]
    fn full_extent_covers_every_pixel() {
        let grid = grid(Crs::epsg(3857));
        let aoi = AoiGeometry::from_extent(&grid.extent(), Crs::epsg(3857));
        let mask = AoiRasterizer::new(&IdentityReprojector).rasterize(&aoi, &grid).unwrap();
        assert_eq!(mask.count_set(), 100);
    }

    #[test]
    fn pixel_centre_rule() {
        let grid = grid(Crs::epsg(3857));
        // Covers centres of columns 2..=4 and rows 6..=7 (y decreases downwards).
        let aoi = AoiGeometry::from_rings(vec![square(2.4, 2.4, 5.2, 4.0)], Crs::epsg(3857));
        let mask = AoiRasterizer::new(&IdentityReprojector).rasterize(&aoi, &grid).unwrap();
        assert_eq!(mask.count_set(), 6);
        for row in 6..=7 {
            for col in 2..=4 {
                assert!(mask.get(col, row), "({col}, {row}) should be inside");
            }
        }
        assert!(!mask.get(5, 6));
        assert!(!mask.get(2, 5));
    }

    #[test]
    fn holes_are_excluded() {
        let grid = grid(Crs::epsg(3857));
        let exterior = LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let hole = LineString::from(vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)]);
        let aoi = AoiGeometry::from_polygon(Polygon::new(exterior, vec![hole]), Crs::epsg(3857));
        let mask = AoiRasterizer::new(&IdentityReprojector).rasterize(&aoi, &grid).unwrap();
        assert_eq!(mask.count_set(), 96);
        assert!(!mask.get(4, 4) && !mask.get(5, 5));
    }

    #[test]
    fn disjoint_aoi_yields_empty_mask() {
        let grid = grid(Crs::epsg(3857));
        let aoi = AoiGeometry::from_rings(vec![square(20.0, 20.0, 30.0, 30.0)], Crs::epsg(3857));
        let mask = AoiRasterizer::new(&IdentityReprojector).rasterize(&aoi, &grid).unwrap();
        assert!(mask.none_set());
    }

    #[test]
    fn degenerate_rings_leave_aoi_empty() {
        let grid = grid(Crs::epsg(3857));
        let aoi = AoiGeometry::from_rings(
            vec![vec![[1.0, 1.0], [2.0, 2.0]], vec![[1.0, 1.0], [1.0, 1.0], [2.0, 2.0], [1.0, 1.0]]],
            Crs::epsg(3857),
        );
        let err = AoiRasterizer::new(&IdentityReprojector).rasterize(&aoi, &grid).unwrap_err();
        assert!(matches!(err, CanopyError::AoiEmpty));
    }

    #[test]
    fn aoi_in_other_crs_is_reprojected() {
        let extent = Extent::new(0.0, 1_000.0, 0.0, 1_000.0);
        let grid = RasterGrid::new(extent, Crs::epsg(3857), GrayImage::new(10, 10)).unwrap();
        // Roughly the left half of the raster expressed in degrees.
        let aoi = AoiGeometry::from_rings(
            vec![square(0.0, 0.0, 0.004_49, 0.008_98)],
            Crs::epsg(4326),
        );
        let mask = AoiRasterizer::new(&BuiltinReprojector).rasterize(&aoi, &grid).unwrap();
        assert_eq!(mask.count_set(), 50);
        assert!(mask.get(4, 0) && !mask.get(5, 0));
    }

    #[test]
    fn failed_reprojection_propagates() {
        let grid = grid(Crs::epsg(25830));
        let aoi = AoiGeometry::from_rings(vec![square(0.0, 0.0, 1.0, 1.0)], Crs::epsg(4326));
        let err = AoiRasterizer::new(&BuiltinReprojector).rasterize(&aoi, &grid).unwrap_err();
        assert!(matches!(err, CanopyError::Reprojection { .. }));
    }

    #[test]
    fn non_finite_vertices_cannot_be_burned() {
        let georef = GridGeoreferencer::from_extent(&Extent::new(0.0, 10.0, 0.0, 10.0), 10, 10).unwrap();
        let ring = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: f64::INFINITY, y: 0.0 },
            Coord { x: 5.0, y: 5.0 },
        ];
        assert!(matches!(burn_rings(&[ring], &georef), Err(CanopyError::Rasterization(_))));
    }
}
