use tracing::debug;

use crate::{
    algorithms::georef::GridGeoreferencer,
    types::{CanopyPolygon, Contour},
};

/// Maps pixel contours to georeferenced, sequentially numbered polygons.
#[derive(Debug, Clone, Copy)]
pub struct PolygonBuilder<'a> {
    georef: &'a GridGeoreferencer,
}

impl<'a> PolygonBuilder<'a> {
    pub fn new(georef: &'a GridGeoreferencer) -> Self {
        Self { georef }
    }

    /// Ids follow discovery order and stay dense: degenerate contours are
    /// skipped without consuming an id.
    pub fn build(&self, contours: &[Contour]) -> Vec<CanopyPolygon> {
        let polygons: Vec<CanopyPolygon> = contours
            .iter()
            .filter(|contour| !contour.is_degenerate())
            .zip(1u32..)
            .map(|(contour, id)| self.build_one(id, contour))
            .collect();

        let skipped = contours.len() - polygons.len();
        if skipped > 0 {
            debug!(skipped, "discarded degenerate contours");
        }
        polygons
    }

    fn build_one(&self, id: u32, contour: &Contour) -> CanopyPolygon {
        let ring = contour
            .vertices
            .iter()
            .map(|&[col, row]| {
                let (x, y) = self.georef.pixel_to_geo(f64::from(col), f64::from(row));
                [x, y]
            })
            .collect();

        CanopyPolygon {
            id,
            area_px: contour.pixel_area(),
            ring,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Extent;

    fn georef() -> GridGeoreferencer {
        GridGeoreferencer::from_extent(&Extent::new(100.0, 110.0, 200.0, 210.0), 10, 10).unwrap()
    }

    #[test]
    fn ids_are_dense_after_discards() {
        let contours = vec![
            Contour::new(vec![[0, 0], [0, 2], [2, 2], [2, 0]]),
            Contour::new(vec![[5, 5], [7, 5]]),
            Contour::new(vec![[4, 4]]),
            Contour::new(vec![[6, 6], [6, 8], [9, 8]]),
        ];
        let polygons = PolygonBuilder::new(&georef()).build(&contours);
        let ids: Vec<u32> = polygons.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(polygons[0].area_px, 4);
        assert_eq!(polygons[1].area_px, 3);
    }

    #[test]
    fn vertices_map_to_cell_centres() {
        let contours = vec![Contour::new(vec![[0, 0], [0, 2], [2, 2], [2, 0]])];
        let polygons = PolygonBuilder::new(&georef()).build(&contours);
        assert_eq!(
            polygons[0].ring,
            vec![[100.5, 209.5], [100.5, 207.5], [102.5, 207.5], [102.5, 209.5]]
        );
        assert!((polygons[0].map_area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn two_vertex_contour_is_never_emitted() {
        let contours = vec![Contour::new(vec![[1, 1], [3, 1]])];
        assert!(PolygonBuilder::new(&georef()).build(&contours).is_empty());
    }

    #[test]
    fn repeated_vertices_do_not_count_as_distinct() {
        let contours = vec![
            Contour::new(vec![[1, 1], [3, 1], [1, 1]]),
            Contour::new(vec![[2, 2], [2, 2], [2, 2], [2, 2]]),
            Contour::new(vec![[0, 0], [0, 2], [2, 2], [0, 0]]),
        ];
        let polygons = PolygonBuilder::new(&georef()).build(&contours);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].id, 1);
        assert_eq!(polygons[0].area_px, 2);
    }
}
