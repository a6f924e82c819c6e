use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanopyError {
    #[error("Invalid raster grid: {0}")]
    InvalidGrid(String),

    #[error("Area of interest has no usable rings")]
    AoiEmpty,

    #[error("Failed to rasterize area of interest: {0}")]
    Rasterization(String),

    #[error("Cannot compute a histogram of an empty image")]
    EmptyHistogram,

    #[error("Reprojection from {from} to {to} failed: {reason}")]
    Reprojection {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Failed to read raster: {0}")]
    RasterRead(String),

    #[error("Failed to decode image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("No raster loaded")]
    NoRasterLoaded,

    #[error("No area of interest loaded")]
    NoAoiLoaded,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, CanopyError>;
