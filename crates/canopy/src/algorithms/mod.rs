pub mod georef;
pub mod reprojection;
pub mod rasterization;
pub mod threshold;
pub mod composite;
pub mod extraction;
pub mod building;

pub use georef::*;
pub use reprojection::*;
pub use rasterization::*;
pub use threshold::*;
pub use composite::*;
pub use extraction::*;
pub use building::*;
