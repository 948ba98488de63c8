//! Nearest neighbor search implementations

use kdtree::distance::squared_euclidean;
use std::cmp::Ordering;
use tetrarecon_core::{Error, NearestNeighborSearch, Point3f, Result};

/// KD-Tree backed nearest neighbor search
pub struct KdTree {
    tree: kdtree::KdTree<f32, usize, [f32; 3]>,
    len: usize,
}

impl KdTree {
    pub fn new(points: &[Point3f]) -> Result<Self> {
        let mut tree = kdtree::KdTree::with_capacity(3, 16);
        for (idx, point) in points.iter().enumerate() {
            tree.add([point.x, point.y, point.z], idx)
                .map_err(|e| Error::SpatialIndex(format!("point {}: {:?}", idx, e)))?;
        }
        Ok(Self {
            tree,
            len: points.len(),
        })
    }
}

impl NearestNeighborSearch for KdTree {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        if k == 0 || self.len == 0 {
            return Vec::new();
        }
        let query = [query.x, query.y, query.z];
        match self.tree.nearest(&query, k.min(self.len), &squared_euclidean) {
            Ok(found) => found
                .into_iter()
                .map(|(dist_sq, &idx)| (idx, dist_sq.sqrt()))
                .collect(),
            // Non-finite query coordinates
            Err(_) => Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3f>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3f]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        if k == 0 {
            return Vec::new();
        }
        let mut distances: Vec<(usize, f32)> = self
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, nalgebra::distance(point, query)))
            .collect();
        // Stable sort keeps equidistant points in index order
        distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        distances.truncate(k);
        distances
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

/// Spatial index chosen by point count
pub enum SearchBackend {
    KdTree(KdTree),
    BruteForce(BruteForceSearch),
}

impl SearchBackend {
    /// Brute force for fewer than `brute_force_threshold` points, a KD-tree otherwise
    pub fn build(points: &[Point3f], brute_force_threshold: usize) -> Result<Self> {
        if points.len() < brute_force_threshold {
            Ok(SearchBackend::BruteForce(BruteForceSearch::new(points)))
        } else {
            Ok(SearchBackend::KdTree(KdTree::new(points)?))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SearchBackend::KdTree(_) => "kd-tree",
            SearchBackend::BruteForce(_) => "brute-force",
        }
    }

    fn inner(&self) -> &dyn NearestNeighborSearch {
        match self {
            SearchBackend::KdTree(tree) => tree,
            SearchBackend::BruteForce(search) => search,
        }
    }
}

impl NearestNeighborSearch for SearchBackend {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        self.inner().find_k_nearest(query, k)
    }

    fn len(&self) -> usize {
        self.inner().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(n: usize, seed: u64) -> Vec<Point3f> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                Point3f::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_kdtree_matches_brute_force() {
        let points = random_points(500, 7);
        let tree = KdTree::new(&points).unwrap();
        let brute = BruteForceSearch::new(&points);

        for query in random_points(20, 11) {
            let a = tree.find_k_nearest(&query, 8);
            let b = brute.find_k_nearest(&query, 8);
            assert_eq!(a.len(), 8);
            for (x, y) in a.iter().zip(&b) {
                assert_relative_eq!(x.1, y.1, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_k_nearest_sorted_and_clamped() {
        let points = vec![
            Point3f::new(3.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(2.0, 0.0, 0.0),
        ];
        let backends = [
            SearchBackend::build(&points, 0).unwrap(),
            SearchBackend::build(&points, 100).unwrap(),
        ];
        for backend in backends {
            let found = backend.find_k_nearest(&Point3f::origin(), 10);
            assert_eq!(found.len(), 3, "{}", backend.name());
            assert_eq!(found.iter().map(|f| f.0).collect::<Vec<_>>(), vec![1, 2, 0]);
            assert!(found.windows(2).all(|w| w[0].1 <= w[1].1));
        }
    }

    #[test]
    fn test_planar_points_are_indexed() {
        // Every point shares z = 0
        let mut points = Vec::new();
        for i in 0..40 {
            for j in 0..40 {
                points.push(Point3f::new(i as f32, j as f32, 0.0));
            }
        }
        let tree = KdTree::new(&points).unwrap();
        let found = tree.find_k_nearest(&Point3f::new(10.2, 10.1, 0.0), 1);
        assert_eq!(found[0].0, 10 * 40 + 10);
    }

    #[test]
    fn test_ties_keep_index_order() {
        let points = vec![
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(-1.0, 0.0, 0.0),
            Point3f::new(0.0, 0.0, 5.0),
        ];
        let brute = BruteForceSearch::new(&points);
        let found = brute.find_k_nearest(&Point3f::origin(), 3);
        assert_eq!(found.iter().map(|f| f.0).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(brute.find_k_nearest(&Point3f::origin(), 0).is_empty());
    }

    #[test]
    fn test_backend_selection() {
        let points = random_points(10, 1);
        assert!(matches!(SearchBackend::build(&points, 64).unwrap(), SearchBackend::BruteForce(_)));
        assert!(matches!(SearchBackend::build(&points, 5).unwrap(), SearchBackend::KdTree(_)));
    }
}
