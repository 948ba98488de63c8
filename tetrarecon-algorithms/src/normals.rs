//! Normal estimation algorithms
//!
//! Normals are computed in two passes. The first fits a tangent plane to each
//! point's `kn` neighborhood and orients its normal against a global
//! reference. The second replaces every normal with the average of the
//! initial normals of its `ki` neighbors. The second pass only starts once
//! every initial normal exists, and writes into a fresh array.

use crate::nearest_neighbor::SearchBackend;
use crate::parallel::parallel_map_range;
use crate::plane::{bounding_box_ok, neighborhood_extent, Plane};
use crate::point_cloud_manager::{ManagerConfig, PointCloudManager};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tetrarecon_core::{NearestNeighborSearch, NormalPointCloud3f, Point3f, PointCloud, Result, Vector3f};
use tracing::{debug, warn};

/// Relative size of `n·(p - reference)` below which orientation is ambiguous
const AMBIGUOUS_ORIENTATION: f32 = 1e-3;

/// What estimated normals are oriented against
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum OrientationReference {
    /// Point away from the centroid of the whole cloud
    #[default]
    AwayFromCentroid,
    /// Point toward a sensor or viewer position
    Viewpoint(Point3f),
}

/// Counters collected while computing normals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalEstimationReport {
    /// Points processed
    pub points: usize,
    /// Points whose neighborhood had to be enlarged to become well shaped
    pub expanded: usize,
    /// Points whose neighborhood stayed ill shaped after every expansion
    pub ill_shaped: usize,
    /// Points whose plane fit failed and got the fallback normal
    pub degenerate: usize,
    /// Points that kept their initial normal because the average vanished
    pub interpolation_fallbacks: usize,
}

impl NormalEstimationReport {
    /// Whether any point needed a fallback
    pub fn has_fallbacks(&self) -> bool {
        self.ill_shaped > 0 || self.degenerate > 0 || self.interpolation_fallbacks > 0
    }
}

struct InitialNormal {
    normal: Vector3f,
    expanded: bool,
    ill_shaped: bool,
    degenerate: bool,
}

/// Make `normal` point consistently with respect to `reference`
///
/// With [`OrientationReference::AwayFromCentroid`] the normal is flipped
/// when it points toward `centroid`. When the point lies (almost) in the
/// plane through the reference spanned by its tangent, the normal is made
/// to agree with the cloud-wide `fallback` axis instead, and only when it is
/// also perpendicular to that axis its dominant-axis component is made
/// positive.
pub fn orient_normal(
    normal: Vector3f,
    point: &Point3f,
    reference: &OrientationReference,
    centroid: &Point3f,
    fallback: &Vector3f,
) -> Vector3f {
    let toward = match reference {
        OrientationReference::AwayFromCentroid => point - centroid,
        OrientationReference::Viewpoint(viewpoint) => viewpoint - point,
    };
    let mut dot = normal.dot(&toward);
    if dot.abs() <= AMBIGUOUS_ORIENTATION * toward.norm() {
        dot = normal.dot(fallback);
        if dot.abs() <= AMBIGUOUS_ORIENTATION {
            return dominant_axis_positive(normal);
        }
    }
    if dot < 0.0 {
        -normal
    } else {
        normal
    }
}

/// Cloud-wide tie-break axis for ambiguous orientations
///
/// The normal of the plane fitted to the whole cloud with its dominant-axis
/// component positive, +Z when the cloud has no plane.
pub fn orientation_fallback(points: &[Point3f]) -> Vector3f {
    match Plane::fit(points) {
        Ok(plane) => dominant_axis_positive(plane.normal),
        Err(_) => Vector3f::z(),
    }
}

fn dominant_axis_positive(normal: Vector3f) -> Vector3f {
    if normal[normal.iamax()] < 0.0 {
        -normal
    } else {
        normal
    }
}

/// Unit vector from the centroid to the point, +Z when they coincide
fn fallback_normal(point: &Point3f, centroid: &Point3f) -> Vector3f {
    (point - centroid)
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3f::z)
}

fn gather(points: &[Point3f], neighbors: &[(usize, f32)]) -> Vec<Point3f> {
    neighbors.iter().map(|&(idx, _)| points[idx]).collect()
}

fn is_well_shaped(neighborhood: &[Point3f], ratio: f32) -> bool {
    let extent = neighborhood_extent(neighborhood);
    bounding_box_ok(extent.x, extent.y, extent.z, ratio)
}

fn estimate_point(
    point: &Point3f,
    points: &[Point3f],
    index: &SearchBackend,
    centroid: &Point3f,
    fallback: &Vector3f,
    config: &ManagerConfig,
) -> InitialNormal {
    let n = points.len();
    let mut k = config.kn.min(n);
    let base = gather(points, &index.find_k_nearest(point, k));

    let mut neighborhood = None;
    let mut expansions = 0;
    if is_well_shaped(&base, config.bounding_box_ratio) {
        neighborhood = Some(base.clone());
    } else {
        while expansions < config.max_neighborhood_expansions && k < n {
            k = (k * 2).min(n);
            expansions += 1;
            let candidate = gather(points, &index.find_k_nearest(point, k));
            if is_well_shaped(&candidate, config.bounding_box_ratio) {
                neighborhood = Some(candidate);
                break;
            }
        }
    }

    let ill_shaped = neighborhood.is_none();
    let expanded = !ill_shaped && expansions > 0;
    let neighborhood = neighborhood.unwrap_or(base);

    match Plane::fit(&neighborhood) {
        Ok(plane) => InitialNormal {
            normal: orient_normal(plane.normal, point, &config.orientation, centroid, fallback),
            expanded,
            ill_shaped,
            degenerate: false,
        },
        Err(_) => InitialNormal {
            normal: orient_normal(
                fallback_normal(point, centroid),
                point,
                &config.orientation,
                centroid,
                fallback,
            ),
            expanded,
            ill_shaped,
            degenerate: true,
        },
    }
}

/// First pass: one oriented plane normal per point
pub(crate) fn estimate_initial_normals(
    points: &[Point3f],
    index: &SearchBackend,
    centroid: &Point3f,
    fallback: &Vector3f,
    config: &ManagerConfig,
    report: &mut NormalEstimationReport,
) -> Vec<Vector3f> {
    let start = Instant::now();
    let estimates = parallel_map_range(points.len(), |i| {
        estimate_point(&points[i], points, index, centroid, fallback, config)
    });

    let mut normals = Vec::with_capacity(estimates.len());
    for estimate in estimates {
        report.expanded += estimate.expanded as usize;
        report.ill_shaped += estimate.ill_shaped as usize;
        report.degenerate += estimate.degenerate as usize;
        normals.push(estimate.normal);
    }
    debug!(
        "Initial normals for {} points in {:?}",
        points.len(),
        start.elapsed()
    );
    normals
}

/// Second pass: average each point's neighborhood of initial normals
pub(crate) fn interpolate_normals(
    points: &[Point3f],
    index: &SearchBackend,
    initial: &[Vector3f],
    ki: usize,
    report: &mut NormalEstimationReport,
) -> Vec<Vector3f> {
    let start = Instant::now();
    let smoothed = parallel_map_range(points.len(), |i| {
        let own = initial[i];
        let sum = index
            .find_k_nearest(&points[i], ki)
            .into_iter()
            .map(|(j, _)| initial[j])
            .fold(Vector3f::zeros(), |acc, n| {
                if n.dot(&own) < 0.0 {
                    acc - n
                } else {
                    acc + n
                }
            });
        sum.try_normalize(f32::EPSILON)
    });

    let normals = smoothed
        .into_iter()
        .zip(initial)
        .map(|(n, own)| {
            n.unwrap_or_else(|| {
                report.interpolation_fallbacks += 1;
                *own
            })
        })
        .collect();
    debug!(
        "Interpolated normals for {} points in {:?}",
        points.len(),
        start.elapsed()
    );
    normals
}

/// Run both passes over every point
pub(crate) fn compute_normals(
    points: &[Point3f],
    index: &SearchBackend,
    centroid: &Point3f,
    fallback: &Vector3f,
    config: &ManagerConfig,
) -> (Vec<Vector3f>, NormalEstimationReport) {
    let mut report = NormalEstimationReport {
        points: points.len(),
        ..Default::default()
    };
    let initial = estimate_initial_normals(points, index, centroid, fallback, config, &mut report);
    let normals = interpolate_normals(points, index, &initial, config.ki, &mut report);

    if report.ill_shaped > 0 || report.degenerate > 0 {
        warn!(
            "{} ill-shaped and {} degenerate neighborhoods out of {} points",
            report.ill_shaped, report.degenerate, report.points
        );
    }
    (normals, report)
}

/// Estimate normals for a point cloud using k-nearest neighbors
///
/// Convenience wrapper building a [`PointCloudManager`] with `k` as every
/// neighborhood size.
pub fn estimate_normals(cloud: &PointCloud<Point3f>, k: usize) -> Result<NormalPointCloud3f> {
    let config = ManagerConfig::default().with_kn(k).with_ki(k).with_kd(k);
    let manager = PointCloudManager::new(cloud.points.clone(), None, config)?;
    Ok(manager.to_oriented_cloud())
}
