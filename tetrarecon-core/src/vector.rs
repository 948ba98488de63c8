//! Generic 3-component vector capability
//!
//! Callers can hand point and normal data to the point cloud manager in any
//! representation that exposes its three components. The algorithms themselves
//! work on nalgebra types, so [`Coord3`] is only the conversion point: values
//! are turned into [`Point3f`] once, at the manager boundary. The provided
//! arithmetic is for callers working in their own representation.

use crate::point::{Point3f, Vector3f};

/// A type with three `f32` components
pub trait Coord3: Copy {
    /// Component access, `i` in `0..3`
    fn coord(&self, i: usize) -> f32;

    /// Build a value from its three components
    fn from_coords(x: f32, y: f32, z: f32) -> Self;

    fn to_array(&self) -> [f32; 3] {
        [self.coord(0), self.coord(1), self.coord(2)]
    }

    fn add(&self, other: &Self) -> Self {
        Self::from_coords(
            self.coord(0) + other.coord(0),
            self.coord(1) + other.coord(1),
            self.coord(2) + other.coord(2),
        )
    }

    fn scale(&self, factor: f32) -> Self {
        Self::from_coords(self.coord(0) * factor, self.coord(1) * factor, self.coord(2) * factor)
    }

    fn dot(&self, other: &Self) -> f32 {
        (0..3).map(|i| self.coord(i) * other.coord(i)).sum()
    }

    fn to_point(&self) -> Point3f {
        Point3f::new(self.coord(0), self.coord(1), self.coord(2))
    }

    fn to_vector(&self) -> Vector3f {
        Vector3f::new(self.coord(0), self.coord(1), self.coord(2))
    }

    fn is_finite(&self) -> bool {
        (0..3).all(|i| self.coord(i).is_finite())
    }
}

impl Coord3 for Point3f {
    fn coord(&self, i: usize) -> f32 {
        self[i]
    }

    fn from_coords(x: f32, y: f32, z: f32) -> Self {
        Point3f::new(x, y, z)
    }
}

impl Coord3 for Vector3f {
    fn coord(&self, i: usize) -> f32 {
        self[i]
    }

    fn from_coords(x: f32, y: f32, z: f32) -> Self {
        Vector3f::new(x, y, z)
    }
}

impl Coord3 for [f32; 3] {
    fn coord(&self, i: usize) -> f32 {
        self[i]
    }

    fn from_coords(x: f32, y: f32, z: f32) -> Self {
        [x, y, z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_arithmetic() {
        let a = [1.0f32, 2.0, 3.0];
        let b = [4.0f32, 5.0, 6.0];
        assert_eq!(a.add(&b), [5.0, 7.0, 9.0]);
        assert_eq!(a.scale(2.0), [2.0, 4.0, 6.0]);
        assert_eq!(a.dot(&b), 32.0);
    }

    #[test]
    fn test_conversions_agree() {
        let p = Point3f::new(1.0, -2.0, 0.5);
        let arr = p.to_array();
        assert_eq!(arr.to_point(), p);
        assert_eq!(arr.to_vector(), p.coords);
        assert_eq!(<[f32; 3]>::from_coords(1.0, -2.0, 0.5), arr);
        assert!(!<[f32; 3]>::from_coords(f32::NAN, 0.0, 0.0).is_finite());
    }
}
