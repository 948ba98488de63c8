//! Point cloud to mesh reconstruction
//!
//! Chains the three stages: a [`PointCloudManager`] supplies oriented normals
//! and signed distances, [`VolumetricGrid::from_point_cloud_manager`] samples
//! them on a regular lattice, and [`MarchingTetrahedra`] extracts the zero
//! level set.

use crate::grid::{SamplingConfig, VolumetricGrid};
use crate::marching_tetrahedra::{ExtractionConfig, ExtractionReport, MarchingTetrahedra};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tetrarecon_algorithms::{ManagerConfig, NormalEstimationReport, PointCloudManager};
use tetrarecon_core::{Error, Result, TriangleMesh};
use tracing::info;

/// Settings for every stage after normal estimation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    pub sampling: SamplingConfig,
    pub extraction: ExtractionConfig,
}

impl ReconstructionConfig {
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }
}

/// What happened along the way
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionReport {
    /// Present when the manager estimated its own normals
    pub normals: Option<NormalEstimationReport>,
    /// Grid corners without a usable distance sample
    pub failed_samples: usize,
    pub grid_dimensions: [usize; 3],
    pub extraction: ExtractionReport,
}

/// Reconstructed surface and its report
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub mesh: TriangleMesh,
    pub report: ReconstructionReport,
}

/// Reconstruct the surface around a managed point cloud
pub fn reconstruct(manager: &PointCloudManager, config: &ReconstructionConfig) -> Result<Reconstruction> {
    let start = Instant::now();
    let grid = VolumetricGrid::from_point_cloud_manager(manager, &config.sampling)?;
    let (mesh, extraction) = MarchingTetrahedra::new(config.extraction.clone()).extract(&grid)?;

    if mesh.is_empty() {
        return Err(Error::Algorithm(format!(
            "no isosurface at level {} in a {:?} grid",
            config.extraction.iso_level, grid.dimensions
        )));
    }

    let report = ReconstructionReport {
        normals: manager.normal_report().copied(),
        failed_samples: grid.invalid_count(),
        grid_dimensions: grid.dimensions,
        extraction,
    };
    info!(
        "Reconstructed {} vertices and {} triangles from {} points in {:?}",
        mesh.vertex_count(),
        mesh.face_count(),
        manager.len(),
        start.elapsed()
    );
    Ok(Reconstruction { mesh, report })
}

/// Read a point file, reconstruct it and write the mesh as PLY
///
/// Normals stored in the input are used as given; otherwise they are
/// estimated with `manager_config`.
pub fn reconstruct_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    manager_config: ManagerConfig,
    config: &ReconstructionConfig,
) -> Result<ReconstructionReport> {
    let manager = PointCloudManager::from_file(input, manager_config)?;
    let reconstruction = reconstruct(&manager, config)?;
    tetrarecon_io::write_mesh(output, &reconstruction.mesh)?;
    Ok(reconstruction.report)
}
