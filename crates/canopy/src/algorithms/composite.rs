use image::GrayImage;

use crate::{
    error::{CanopyError, Result},
    types::BinaryMask,
};

/// Canopy is darker than the soil around it, so a pixel is canopy when it
/// lies inside the AOI and the thresholded image puts it in the dark
/// (zero) class.
#[inline]
pub fn is_canopy(inside_aoi: bool, thresholded: u8) -> bool {
    inside_aoi && thresholded == 0
}

/// Restrict the dark class of `thresholded` to the AOI mask.
pub fn composite(aoi_mask: &BinaryMask, thresholded: &GrayImage) -> Result<BinaryMask> {
    if aoi_mask.dimensions() != thresholded.dimensions() {
        return Err(CanopyError::InvalidGrid(format!(
            "AOI mask is {:?} but thresholded image is {:?}",
            aoi_mask.dimensions(),
            thresholded.dimensions()
        )));
    }

    Ok(BinaryMask::from_fn(aoi_mask.width(), aoi_mask.height(), |col, row| {
        is_canopy(aoi_mask.get(col, row), thresholded.get_pixel(col, row)[0])
    }))
}
