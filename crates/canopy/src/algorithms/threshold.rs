use image::{GrayImage, Luma};

use crate::{
    error::{CanopyError, Result},
    traits::ThresholdSelector,
};

/// Otsu's method over the whole intensity image
#[derive(Debug, Clone, Default)]
pub struct OtsuThreshold;

impl ThresholdSelector for OtsuThreshold {
    fn select(&self, image: &GrayImage) -> Result<u8> {
        otsu_level(image)
    }
}

/// Caller-chosen level; still refuses empty images
#[derive(Debug, Clone)]
pub struct FixedThreshold {
    pub threshold: u8,
}

impl Default for FixedThreshold {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

impl ThresholdSelector for FixedThreshold {
    fn select(&self, image: &GrayImage) -> Result<u8> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CanopyError::EmptyHistogram);
        }
        Ok(self.threshold)
    }
}

/// 256-bin intensity histogram.
pub fn histogram(image: &GrayImage) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for pixel in image.pixels() {
        bins[usize::from(pixel[0])] += 1;
    }
    bins
}

/// Level in `1..=254` maximizing between-class variance.
///
/// Class 0 holds intensities `<= t`, class 1 those `> t`. Ties keep the
/// smallest level.
pub fn otsu_level(image: &GrayImage) -> Result<u8> {
    let bins = histogram(image);
    let total: u64 = bins.iter().sum();
    if total == 0 {
        return Err(CanopyError::EmptyHistogram);
    }

    let total = total as f64;
    let sum_all: f64 = bins
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut weight_b = 0.0;
    let mut sum_b = 0.0;
    let mut best_level = 1u8;
    let mut best_variance = f64::NEG_INFINITY;

    for (level, &count) in bins.iter().enumerate().take(255) {
        weight_b += count as f64;
        sum_b += level as f64 * count as f64;
        if level == 0 {
            continue;
        }

        let weight_f = total - weight_b;
        let variance = if weight_b == 0.0 || weight_f == 0.0 {
            0.0
        } else {
            let mean_b = sum_b / weight_b;
            let mean_f = (sum_all - sum_b) / weight_f;
            (weight_b / total) * (weight_f / total) * (mean_b - mean_f).powi(2)
        };

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    Ok(best_level)
}

/// 255 where intensity is above `threshold`, 0 elsewhere.
pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_from_histogram(populations: &[(u8, u32)]) -> GrayImage {
        let values: Vec<u8> = populations
            .iter()
            .flat_map(|&(level, count)| std::iter::repeat(level).take(count as usize))
            .collect();
        let width = values.len() as u32;
        GrayImage::from_raw(width, 1, values).unwrap()
    }

    #[test]
    fn bimodal_threshold_falls_between_peaks() {
        let image = image_from_histogram(&[
            (38, 20),
            (39, 60),
            (40, 200),
            (41, 60),
            (42, 20),
            (198, 30),
            (199, 90),
            (200, 300),
            (201, 90),
            (202, 30),
        ]);
        let level = otsu_level(&image).unwrap();
        assert!(level > 40 && level < 200, "threshold {level}");
    }

    #[test]
    fn two_levels_pick_first_maximum() {
        let image = image_from_histogram(&[(10, 9), (200, 91)]);
        assert_eq!(otsu_level(&image).unwrap(), 10);
    }

    #[test]
    fn uniform_image_selects_lowest_level() {
        let image = GrayImage::from_pixel(8, 8, Luma([77]));
        assert_eq!(otsu_level(&image).unwrap(), 1);
    }

    #[test]
    fn empty_image_has_no_histogram() {
        let image = GrayImage::new(0, 0);
        assert!(matches!(otsu_level(&image), Err(CanopyError::EmptyHistogram)));
        assert!(matches!(
            FixedThreshold::default().select(&image),
            Err(CanopyError::EmptyHistogram)
        ));
    }

    #[test]
    fn binarize_uses_strict_greater_than() {
        let image = image_from_histogram(&[(9, 1), (10, 1), (11, 1)]);
        let binary = binarize(&image, 10);
        assert_eq!(binary.as_raw(), &vec![0, 0, 255]);
    }
}
