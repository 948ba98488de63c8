//! Regular scalar grids
//!
//! A [`VolumetricGrid`] stores one scalar per lattice corner. Grids are either
//! built from an analytic function or sampled from a point cloud manager's
//! signed distance, where corners without a usable distance hold `NaN`.

use itertools::iproduct;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tetrarecon_algorithms::parallel::parallel_map_range;
use tetrarecon_algorithms::PointCloudManager;
use tetrarecon_core::{bounding_box_of, Error, Point3f, Result};
use tracing::{info, warn};

/// 3D volumetric grid containing scalar values
#[derive(Debug, Clone)]
pub struct VolumetricGrid {
    /// Scalar values indexed `[x, y, z]`
    pub values: Array3<f32>,
    /// Number of lattice corners along each axis
    pub dimensions: [usize; 3],
    /// Physical size of each voxel
    pub voxel_size: [f32; 3],
    /// Origin position of the grid in world coordinates
    pub origin: Point3f,
}

impl VolumetricGrid {
    /// Create a zero-filled grid
    pub fn new(dimensions: [usize; 3], voxel_size: [f32; 3], origin: Point3f) -> Self {
        Self {
            values: Array3::zeros((dimensions[0], dimensions[1], dimensions[2])),
            dimensions,
            voxel_size,
            origin,
        }
    }

    /// Fill a grid by evaluating `f` at every corner's world position
    pub fn from_fn<F>(dimensions: [usize; 3], voxel_size: [f32; 3], origin: Point3f, f: F) -> Result<Self>
    where
        F: Fn(&Point3f) -> f32 + Sync + Send,
    {
        let mut grid = Self::new(dimensions, voxel_size, origin);
        let [_, ny, nz] = dimensions;
        let total = dimensions.iter().product();
        let samples = parallel_map_range(total, |i| {
            let (x, y, z) = (i / (ny * nz), (i / nz) % ny, i % nz);
            f(&grid.grid_to_world(x, y, z))
        });

        grid.values = Array3::from_shape_vec((dimensions[0], ny, nz), samples)
            .map_err(|e| Error::Algorithm(format!("grid shape mismatch: {}", e)))?;
        Ok(grid)
    }

    /// Sample the manager's signed projected distance at every corner
    ///
    /// The grid covers the point bounding box plus `padding_voxels` voxels on
    /// every side. Failed distance queries, and samples farther than
    /// `max_distance` from their neighborhood anchor, are stored as `NaN`.
    pub fn from_point_cloud_manager(manager: &PointCloudManager, config: &SamplingConfig) -> Result<Self> {
        config.validate()?;
        let (min, max) = bounding_box_of(manager.points());
        let voxel = config.voxel_size;
        let padding = config.padding_voxels as f32 * voxel;

        let origin = min - nalgebra::Vector3::repeat(padding);
        let extent = (max - min).add_scalar(2.0 * padding);
        let dimensions = [0, 1, 2].map(|axis| (extent[axis] / voxel).ceil() as usize + 1);

        let grid = Self::from_fn(dimensions, [voxel; 3], origin, |p| {
            match manager.distance(p) {
                Ok(d) if config.max_distance.map_or(true, |limit| d.euclidean <= limit) => d.projected,
                _ => f32::NAN,
            }
        })?;

        let invalid = grid.invalid_count();
        info!(
            "Sampled {:?} grid ({} corners, voxel size {})",
            grid.dimensions,
            grid.values.len(),
            voxel
        );
        if invalid > 0 {
            warn!("{} of {} grid samples have no distance", invalid, grid.values.len());
        }
        Ok(grid)
    }

    /// Get scalar value at grid coordinates (with bounds checking)
    pub fn get_value(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        self.values.get((x, y, z)).copied()
    }

    /// Set scalar value at grid coordinates
    pub fn set_value(&mut self, x: usize, y: usize, z: usize, value: f32) -> Result<()> {
        match self.values.get_mut((x, y, z)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::Algorithm(format!(
                "Grid coordinates ({}, {}, {}) out of bounds for dimensions {:?}",
                x, y, z, self.dimensions
            ))),
        }
    }

    /// Convert grid coordinates to world coordinates
    pub fn grid_to_world(&self, x: usize, y: usize, z: usize) -> Point3f {
        Point3f::new(
            self.origin.x + x as f32 * self.voxel_size[0],
            self.origin.y + y as f32 * self.voxel_size[1],
            self.origin.z + z as f32 * self.voxel_size[2],
        )
    }

    /// Number of cube cells between the lattice corners
    pub fn cell_count(&self) -> usize {
        self.dimensions.iter().map(|d| d.saturating_sub(1)).product()
    }

    /// Lattice index of every cell, in `x`, then `y`, then `z` order
    pub fn cells(&self) -> Vec<[usize; 3]> {
        let [nx, ny, nz] = self.dimensions.map(|d| d.saturating_sub(1));
        iproduct!(0..nx, 0..ny, 0..nz).map(|(x, y, z)| [x, y, z]).collect()
    }

    /// Number of corners holding `NaN` or an infinite value
    pub fn invalid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_finite()).count()
    }
}

/// How a point cloud is turned into a scalar grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Edge length of a cubic voxel
    pub voxel_size: f32,
    /// Empty voxels added around the point bounding box
    pub padding_voxels: usize,
    /// Samples farther than this from their neighborhood anchor are discarded
    pub max_distance: Option<f32>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.05,
            padding_voxels: 2,
            max_distance: None,
        }
    }
}

impl SamplingConfig {
    pub fn with_voxel_size(mut self, voxel_size: f32) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    pub fn with_padding_voxels(mut self, padding_voxels: usize) -> Self {
        self.padding_voxels = padding_voxels;
        self
    }

    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.voxel_size.is_finite() && self.voxel_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "voxel size must be positive, got {}",
                self.voxel_size
            )));
        }
        if let Some(limit) = self.max_distance {
            if !(limit > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "max distance must be positive, got {}",
                    limit
                )));
            }
        }
        Ok(())
    }
}

/// Create a simple test volume (signed distance to a sphere)
pub fn create_sphere_volume(
    center: Point3f,
    radius: f32,
    grid_resolution: [usize; 3],
    grid_size: [f32; 3],
) -> Result<VolumetricGrid> {
    if grid_resolution.iter().any(|&r| r < 2) {
        return Err(Error::InvalidConfig(format!(
            "grid resolution {:?} needs at least 2 corners per axis",
            grid_resolution
        )));
    }

    let origin = Point3f::new(
        center.x - grid_size[0] / 2.0,
        center.y - grid_size[1] / 2.0,
        center.z - grid_size[2] / 2.0,
    );
    let voxel_size = [0, 1, 2].map(|axis| grid_size[axis] / (grid_resolution[axis] - 1) as f32);

    VolumetricGrid::from_fn(grid_resolution, voxel_size, origin, |p| {
        nalgebra::distance(p, &center) - radius
    })
}
