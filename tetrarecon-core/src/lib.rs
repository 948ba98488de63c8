//! Core data structures and traits for tetrarecon
//! 
//! This crate provides the fundamental types shared by the point cloud manager,
//! the file readers/writers and the surface extraction: points, normals, oriented
//! point clouds, triangle meshes, the nearest neighbor search capability and the
//! common error type.

pub mod point;
pub mod point_cloud;
pub mod mesh;
pub mod traits;
pub mod vector;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use mesh::*;
pub use traits::*;
pub use vector::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3};
