//! Point cloud manager
//!
//! Owns a point set and its normals, answers nearest neighbor and signed
//! distance queries and computes normals when the input carries none.

use crate::nearest_neighbor::SearchBackend;
use crate::normals::{
    compute_normals, orient_normal, orientation_fallback, NormalEstimationReport, OrientationReference,
};
use crate::plane::Plane;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tetrarecon_core::{
    centroid_of, Coord3, Error, NearestNeighborSearch, NormalPoint3f, NormalPointCloud3f, Point3f, Result,
    Vector3f,
};
use tracing::info;

/// Neighborhood sizes and estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Neighbors used to fit the initial tangent plane
    pub kn: usize,
    /// Neighbors averaged during normal interpolation
    pub ki: usize,
    /// Neighbors used by signed distance queries
    pub kd: usize,
    /// Largest allowed ratio between the longest and shortest neighborhood box extent
    pub bounding_box_ratio: f32,
    /// How often an ill-shaped neighborhood may be doubled
    pub max_neighborhood_expansions: usize,
    pub orientation: OrientationReference,
    /// Clouds smaller than this use brute force search instead of a KD-tree
    pub brute_force_threshold: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            kn: 10,
            ki: 10,
            kd: 10,
            bounding_box_ratio: 50.0,
            max_neighborhood_expansions: 3,
            orientation: OrientationReference::AwayFromCentroid,
            brute_force_threshold: 64,
        }
    }
}

impl ManagerConfig {
    pub fn with_kn(mut self, kn: usize) -> Self {
        self.kn = kn;
        self
    }

    pub fn with_ki(mut self, ki: usize) -> Self {
        self.ki = ki;
        self
    }

    pub fn with_kd(mut self, kd: usize) -> Self {
        self.kd = kd;
        self
    }

    pub fn with_bounding_box_ratio(mut self, ratio: f32) -> Self {
        self.bounding_box_ratio = ratio;
        self
    }

    pub fn with_max_neighborhood_expansions(mut self, expansions: usize) -> Self {
        self.max_neighborhood_expansions = expansions;
        self
    }

    pub fn with_orientation(mut self, orientation: OrientationReference) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_brute_force_threshold(mut self, threshold: usize) -> Self {
        self.brute_force_threshold = threshold;
        self
    }

    /// Check that every neighborhood size is positive and the box ratio is usable
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("kn", self.kn), ("ki", self.ki), ("kd", self.kd)] {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if !(self.bounding_box_ratio.is_finite() && self.bounding_box_ratio >= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "bounding_box_ratio must be a finite value >= 1, got {}",
                self.bounding_box_ratio
            )));
        }
        Ok(())
    }
}

/// Signed distance of a query point to the locally fitted surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignedDistance {
    /// Distance along the averaged neighbor normal, negative inside
    pub projected: f32,
    /// Distance to the neighborhood anchor
    pub euclidean: f32,
}

/// Owner of a point set, its spatial index and its normals
pub struct PointCloudManager {
    points: Vec<Point3f>,
    normals: Vec<Vector3f>,
    centroid: Point3f,
    /// Tie-break axis for orientations the reference cannot decide
    fallback_axis: Vector3f,
    index: SearchBackend,
    config: ManagerConfig,
    normal_report: Option<NormalEstimationReport>,
}

impl PointCloudManager {
    /// Build a manager, computing normals when none are supplied
    pub fn new(
        points: Vec<Point3f>,
        normals: Option<Vec<Vector3f>>,
        config: ManagerConfig,
    ) -> Result<Self> {
        config.validate()?;
        if points.is_empty() {
            return Err(Error::EmptyPointCloud);
        }
        if let Some(idx) = points.iter().position(|p| !Coord3::is_finite(p)) {
            return Err(Error::MalformedInput(format!(
                "point {} has a non-finite coordinate",
                idx
            )));
        }
        if let Some(normals) = &normals {
            if normals.len() != points.len() {
                return Err(Error::MalformedInput(format!(
                    "{} normals supplied for {} points",
                    normals.len(),
                    points.len()
                )));
            }
        }

        let centroid = centroid_of(&points).ok_or(Error::EmptyPointCloud)?;
        let fallback_axis = orientation_fallback(&points);
        let index = SearchBackend::build(&points, config.brute_force_threshold)?;

        let supplied = normals.is_some();
        let mut manager = Self {
            normals: normals.unwrap_or_default(),
            points,
            centroid,
            fallback_axis,
            index,
            config,
            normal_report: None,
        };
        info!(
            "Point cloud manager: {} points, {} index, normals {}",
            manager.len(),
            manager.index.name(),
            if supplied { "supplied" } else { "computed" }
        );

        if !supplied {
            manager.calc_normals();
        }
        Ok(manager)
    }

    /// Build a manager from any three-component point representation
    pub fn from_coords<C: Coord3>(coords: &[C], config: ManagerConfig) -> Result<Self> {
        let points = coords.iter().map(Coord3::to_point).collect();
        Self::new(points, None, config)
    }

    /// Read points, and normals where the format has them, from a file
    pub fn from_file<P: AsRef<Path>>(path: P, config: ManagerConfig) -> Result<Self> {
        let data = tetrarecon_io::read_points(path)?;
        Self::new(data.points, data.normals, config)
    }

    /// The `min(k, n)` closest points in non-decreasing distance order
    pub fn k_closest_vertices(&self, query: &Point3f, k: usize) -> Vec<Point3f> {
        self.k_closest_indices(query, k)
            .into_iter()
            .map(|(idx, _)| self.points[idx])
            .collect()
    }

    /// `(index, distance)` of the `min(k, n)` closest points
    pub fn k_closest_indices(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        self.index.find_k_nearest(query, k)
    }

    /// Normal-space nearest neighbor queries are not supported
    pub fn k_closest_normals(&self, _query: &Vector3f, _k: usize) -> Result<Vec<Vector3f>> {
        Err(Error::UnsupportedQuery(
            "k-closest normals queries are not supported".to_string(),
        ))
    }

    /// Signed distance from `point` to the surface around its `kd` neighbors
    pub fn distance(&self, point: &Point3f) -> Result<SignedDistance> {
        let kd = self.config.kd;
        let neighbors = self.index.find_k_nearest(point, kd);
        if neighbors.len() < kd {
            return Err(Error::DegenerateNeighborhood(format!(
                "distance query needs {} neighbors, cloud has {}",
                kd,
                neighbors.len()
            )));
        }

        let (position_sum, normal_sum) = neighbors.iter().fold(
            (Vector3f::zeros(), Vector3f::zeros()),
            |(ps, ns), &(idx, _)| (ps + self.points[idx].coords, ns + self.normals[idx]),
        );
        let anchor = Point3f::from(position_sum / neighbors.len() as f32);
        let normal = normal_sum.try_normalize(f32::EPSILON).ok_or_else(|| {
            Error::DegenerateNeighborhood("neighbor normals cancel out".to_string())
        })?;

        let offset = point - anchor;
        Ok(SignedDistance {
            projected: offset.dot(&normal),
            euclidean: offset.norm(),
        })
    }

    /// Point by index
    pub fn from_id(&self, idx: usize) -> Option<Point3f> {
        self.points.get(idx).copied()
    }

    /// Fit a plane to the first `k` of `ids`, oriented for `query`
    pub fn calc_plane(&self, query: &Point3f, k: usize, ids: &[usize]) -> Result<Plane> {
        let neighborhood = ids
            .iter()
            .take(k)
            .map(|&idx| {
                self.from_id(idx).ok_or_else(|| {
                    Error::Algorithm(format!(
                        "point index {} out of range for {} points",
                        idx,
                        self.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut plane = Plane::fit(&neighborhood)?;
        plane.normal = orient_normal(
            plane.normal,
            query,
            &self.config.orientation,
            &self.centroid,
            &self.fallback_axis,
        );
        Ok(plane)
    }

    /// Mean perpendicular distance of the first `k` of `ids` to `plane`
    pub fn mean_distance(&self, plane: &Plane, ids: &[usize], k: usize) -> f32 {
        let distances: Vec<f32> = ids
            .iter()
            .take(k)
            .filter_map(|&idx| self.from_id(idx))
            .map(|p| plane.distance(&p).abs())
            .collect();
        if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f32>() / distances.len() as f32
        }
    }

    /// Estimate and interpolate normals for every point, replacing existing ones
    pub fn calc_normals(&mut self) -> NormalEstimationReport {
        let (normals, report) = compute_normals(
            &self.points,
            &self.index,
            &self.centroid,
            &self.fallback_axis,
            &self.config,
        );
        self.normals = normals;
        self.normal_report = Some(report);
        info!(
            "Normals: {} points, {} expanded, {} ill-shaped, {} degenerate, {} interpolation fallbacks",
            report.points,
            report.expanded,
            report.ill_shaped,
            report.degenerate,
            report.interpolation_fallbacks
        );
        report
    }

    /// Write points and normals, format chosen by extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        tetrarecon_io::write_points(path, &self.points, Some(self.normals.as_slice()))
    }

    pub fn points(&self) -> &[Point3f] {
        &self.points
    }

    pub fn normals(&self) -> &[Vector3f] {
        &self.normals
    }

    pub fn centroid(&self) -> Point3f {
        self.centroid
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Report of the last normal computation, `None` when normals were supplied
    pub fn normal_report(&self) -> Option<&NormalEstimationReport> {
        self.normal_report.as_ref()
    }

    /// Copy points and normals into an oriented point cloud
    pub fn to_oriented_cloud(&self) -> NormalPointCloud3f {
        self.points
            .iter()
            .zip(&self.normals)
            .map(|(p, n)| NormalPoint3f::new(*p, *n))
            .collect()
    }
}
