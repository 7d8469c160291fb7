use glam::{DAffine3, DVec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    pub min: DVec3,
    pub max: DVec3,
}

impl Bounds3 {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point, or `None` for an empty iterator
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds3::new(first, first);
        for p in iter {
            bounds.expand_point(p);
        }
        Some(bounds)
    }

    pub fn expand_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn expand(&mut self, other: &Bounds3) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn depth(&self) -> f64 {
        self.max.z - self.min.z
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Bounds of this box after an affine transform, via its eight corners
    pub fn transformed(&self, transform: &DAffine3) -> Bounds3 {
        let corners = (0..8).map(|i| {
            DVec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        });
        let mut points = corners.map(|c| transform.transform_point3(c));
        // Eight corners, never empty
        let first = points.next().unwrap_or(DVec3::ZERO);
        let mut bounds = Bounds3::new(first, first);
        for p in points {
            bounds.expand_point(p);
        }
        bounds
    }
}
