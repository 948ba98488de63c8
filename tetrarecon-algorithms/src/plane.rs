//! Least squares tangent planes

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use tetrarecon_core::{bounding_box_of, centroid_of, Error, Point3f, Result, Vector3f};

/// Ratio of middle to largest eigenvalue below which a neighborhood is collinear
const COLLINEAR_EPSILON: f32 = 1e-6;

/// Tangent plane fitted to a point neighborhood
///
/// `a <= b <= c` are the eigenvalues of the neighborhood covariance: the
/// spread along the normal, along the minor tangent and along the major
/// tangent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    /// Unit normal
    pub normal: Vector3f,
    /// Neighborhood centroid, a point on the plane
    pub anchor: Point3f,
}

impl Plane {
    /// Fit a plane by principal component analysis
    ///
    /// Fails with [`Error::DegenerateNeighborhood`] for fewer than three points
    /// or when the points are coincident or collinear.
    pub fn fit(points: &[Point3f]) -> Result<Self> {
        if points.len() < 3 {
            return Err(Error::DegenerateNeighborhood(format!(
                "plane fit needs at least 3 points, got {}",
                points.len()
            )));
        }

        let n = points.len() as f32;
        let anchor = centroid_of(points)
            .ok_or_else(|| Error::DegenerateNeighborhood("empty neighborhood".to_string()))?;

        let mut covariance = Matrix3::<f32>::zeros();
        for p in points {
            let d = p - anchor;
            covariance += d * d.transpose();
        }
        covariance /= n;

        let eigen = covariance.symmetric_eigen();
        let mut order = [0usize, 1, 2];
        order.sort_by(|&i, &j| eigen.eigenvalues[i].total_cmp(&eigen.eigenvalues[j]));
        let [smallest, middle, largest] = order.map(|i| eigen.eigenvalues[i].max(0.0));

        if !largest.is_finite() || largest <= 0.0 || middle <= COLLINEAR_EPSILON * largest {
            return Err(Error::DegenerateNeighborhood(format!(
                "coincident or collinear neighborhood of {} points",
                points.len()
            )));
        }

        let normal = eigen.eigenvectors.column(order[0]).normalize();
        Ok(Self {
            a: smallest,
            b: middle,
            c: largest,
            normal,
            anchor,
        })
    }

    /// Signed perpendicular distance, positive on the normal's side
    pub fn distance(&self, point: &Point3f) -> f32 {
        (point - self.anchor).dot(&self.normal)
    }

    /// Point-to-point distance from the anchor
    pub fn anchor_distance(&self, point: &Point3f) -> f32 {
        nalgebra::distance(&self.anchor, point)
    }
}

/// Whether an axis-aligned neighborhood box is well shaped
///
/// The box is ill shaped when its largest extent exceeds `ratio` times its
/// smallest one. A zero extent therefore always fails, as does a box with a
/// non-finite extent.
pub fn bounding_box_ok(dx: f32, dy: f32, dz: f32, ratio: f32) -> bool {
    let extents = [dx.abs(), dy.abs(), dz.abs()];
    if extents.iter().any(|e| !e.is_finite()) {
        return false;
    }
    let max = extents.iter().copied().fold(0.0f32, f32::max);
    let min = extents.iter().copied().fold(f32::INFINITY, f32::min);
    min > 0.0 && max <= ratio * min
}

/// Extent `(dx, dy, dz)` of the axis-aligned box around `points`
pub fn neighborhood_extent(points: &[Point3f]) -> Vector3f {
    let (min, max) = bounding_box_of(points);
    max - min
}
