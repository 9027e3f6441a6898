//! Axis-aligned bounding boxes for KD partitioning.

use nalgebra::{Point3, Vector3};

/// Coordinate axis used to order and split a node's polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    /// Returns the component index of this axis (0, 1 or 2).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// An axis-aligned bounding box, stored as its min and max corners.
///
/// A box created with [`Aabb::new`] is a degenerate placeholder sitting at the
/// origin. It has not encased any point yet and must not be merged into
/// another box; start real boxes with [`Aabb::from_point`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new()
    }
}

impl Aabb {
    /// Creates the degenerate placeholder box (min = max = origin).
    pub fn new() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }

    /// Creates a zero-sized box around a single point.
    pub fn from_point(point: Point3<f64>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Builds the smallest box containing every point, or `None` if the
    /// iterator is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f64>>,
    {
        let mut points = points.into_iter();
        let mut aabb = Self::from_point(points.next()?);
        for point in points {
            aabb.encase(point);
        }
        Some(aabb)
    }

    /// Returns the minimum corner.
    #[inline]
    pub fn min(&self) -> Point3<f64> {
        self.min
    }

    /// Returns the maximum corner.
    #[inline]
    pub fn max(&self) -> Point3<f64> {
        self.max
    }

    /// Grows the box so it contains `point`.
    pub fn encase(&mut self, point: Point3<f64>) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Grows the box so it contains `other`.
    pub fn union(&mut self, other: &Aabb) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Returns the box center.
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns the box extents (width, height, depth).
    #[inline]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Product of the three extents.
    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Total surface area of the six faces.
    pub fn area(&self) -> f64 {
        let s = self.size();
        2.0 * (s.x * s.y + s.y * s.z + s.x * s.z)
    }

    /// Largest of the three extents.
    pub fn longest_extent(&self) -> f64 {
        self.size().max()
    }

    /// Chooses the axis with the strictly largest extent.
    ///
    /// X wins only if it beats both Y and Z, Y only if it beats both X and Z.
    /// Every other case, including a three-way tie or a Y/Z tie, picks Z.
    pub fn find_splitting_axis(&self) -> Axis {
        let s = self.size();
        if s.x > s.y && s.x > s.z {
            Axis::X
        } else if s.y > s.x && s.y > s.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Returns this box in the Y-up output frame.
    ///
    /// Points map as `(x, y, z) -> (x, z, -y)`. The negation flips the third
    /// axis, so min and max are re-derived componentwise afterwards.
    pub fn to_y_up(&self) -> Aabb {
        let a = y_up(self.min);
        let b = y_up(self.max);
        Aabb {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }
}

/// Maps a point from the source Z-up frame into the Y-up output frame.
#[inline]
pub fn y_up(p: Point3<f64>) -> Point3<f64> {
    Point3::new(p.x, p.z, -p.y)
}
