//! # TetraRecon Reconstruction
//!
//! Isosurface extraction for point clouds with oriented normals.
//!
//! The signed distance exposed by a
//! [`PointCloudManager`](tetrarecon_algorithms::PointCloudManager) is sampled
//! on a [`VolumetricGrid`] and polygonized by [`MarchingTetrahedra`], which
//! splits every cell into six tetrahedra driven by the tables in
//! [`tetraeder_tables`].

pub mod grid;
pub mod marching_tetrahedra;
pub mod pipeline;
pub mod tetraeder_tables;

// Re-export commonly used items
pub use grid::*;
pub use marching_tetrahedra::*;
pub use pipeline::*;
