//! Core traits for tetrarecon

use crate::point::*;

/// Trait for nearest neighbor search functionality
///
/// Results are `(index, euclidean distance)` pairs sorted by non-decreasing
/// distance.
pub trait NearestNeighborSearch {
    /// Find the k nearest neighbors to a query point
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)>;

    /// Number of indexed points
    fn len(&self) -> usize;

    /// Whether the index holds no points
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Axis-aligned bounding box of a point sequence, origin for an empty sequence
pub fn bounding_box_of<'a, I>(points: I) -> (Point3f, Point3f)
where
    I: IntoIterator<Item = &'a Point3f>,
{
    let mut iter = points.into_iter();
    let first = match iter.next() {
        Some(p) => *p,
        None => return (Point3f::origin(), Point3f::origin()),
    };
    iter.fold((first, first), |(min, max), p| (min.inf(p), max.sup(p)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let points = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(-1.0, -1.0, -1.0),
            Point3f::new(2.0, 0.5, -0.5),
        ];
        let (min, max) = bounding_box_of(&points);
        assert_eq!(min, Point3f::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Point3f::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn test_empty_bounding_box() {
        let empty: [Point3f; 0] = [];
        let (min, max) = bounding_box_of(&empty);
        assert_eq!(min, Point3f::origin());
        assert_eq!(max, Point3f::origin());
    }
}
