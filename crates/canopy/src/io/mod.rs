pub mod geojson;
pub mod raster;

pub use self::geojson::{AREA_PROPERTY, ID_PROPERTY};
pub use raster::ImageRasterSource;
