use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};

use crate::{
    error::Result,
    traits::ContourExtractor,
    types::{BinaryMask, Contour},
};

/// Outer borders of 8-connected regions via imageproc's border following.
///
/// Borders nested inside a hole of another region are dropped, as are
/// hole borders themselves. Collinear runs are compressed to their end
/// points and rings left with fewer than three vertices are discarded.
#[derive(Debug, Clone, Default)]
pub struct ExternalContourTracer;

impl ContourExtractor for ExternalContourTracer {
    fn extract_contours(&self, foreground: &BinaryMask) -> Result<Vec<Contour>> {
        // Border following mislabels regions on the image frame, so trace a
        // copy with one pixel of background all round.
        let contours = find_contours::<i32>(&with_background_frame(foreground.as_image()));

        let result = contours
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .map(|contour| {
                let points: Vec<[i32; 2]> = contour.points.iter().map(|p| [p.x - 1, p.y - 1]).collect();
                Contour::new(compress_chain(&points))
            })
            .filter(|contour| !contour.is_degenerate())
            .collect();

        Ok(result)
    }
}

fn with_background_frame(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width + 2, height + 2, |x, y| {
        if x == 0 || y == 0 || x > width || y > height {
            Luma([0])
        } else {
            *image.get_pixel(x - 1, y - 1)
        }
    })
}

/// Drop every vertex whose incoming and outgoing steps share a direction.
///
/// `points` is a closed ring of 8-neighbour steps. Repeated points,
/// including a closing copy of the first one, are dropped first.
pub fn compress_chain(points: &[[i32; 2]]) -> Vec<[i32; 2]> {
    let mut points = points.to_vec();
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let n = points.len();
    if n < 3 {
        return points;
    }

    let step = |a: [i32; 2], b: [i32; 2]| [(b[0] - a[0]).signum(), (b[1] - a[1]).signum()];

    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}
