//! # tetrarecon algorithms
//!
//! Spatial queries and normal estimation over unorganized point clouds.
//!
//! The [`PointCloudManager`] owns a point set, indexes it for k-nearest neighbor
//! queries, fits local tangent planes and produces a consistently oriented
//! normal per point. Its signed distance query is what the volumetric sampler
//! in `tetrarecon-reconstruction` evaluates at every lattice corner.

pub mod nearest_neighbor;
pub mod normals;
pub mod parallel;
pub mod plane;
pub mod point_cloud_manager;

// Re-export commonly used items
pub use nearest_neighbor::*;
pub use normals::*;
pub use plane::*;
pub use point_cloud_manager::*;
