use glam::DVec2;

use crate::polygon;

/// Single drawing command in absolute coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(DVec2),
    LineTo(DVec2),
    QuadTo { ctrl: DVec2, end: DVec2 },
    CubicTo { ctrl1: DVec2, ctrl2: DVec2, end: DVec2 },
    Close,
}

impl PathCommand {
    /// Short mnemonic used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            PathCommand::MoveTo(_) => "move",
            PathCommand::LineTo(_) => "line",
            PathCommand::QuadTo { .. } => "quadratic curve",
            PathCommand::CubicTo { .. } => "cubic curve",
            PathCommand::Close => "close",
        }
    }

    /// Whether every coordinate of the command is finite
    pub fn is_finite(&self) -> bool {
        match *self {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => p.is_finite(),
            PathCommand::QuadTo { ctrl, end } => ctrl.is_finite() && end.is_finite(),
            PathCommand::CubicTo { ctrl1, ctrl2, end } => {
                ctrl1.is_finite() && ctrl2.is_finite() && end.is_finite()
            }
            PathCommand::Close => true,
        }
    }
}

/// Fill rule deciding which nested contours are holes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// One path of the source artwork
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPath {
    pub id: String,
    pub fill_rule: FillRule,
    pub commands: Vec<PathCommand>,
}

impl VectorPath {
    pub fn new(id: impl Into<String>, commands: Vec<PathCommand>) -> Self {
        Self {
            id: id.into(),
            fill_rule: FillRule::NonZero,
            commands,
        }
    }

    pub fn with_fill_rule(mut self, fill_rule: FillRule) -> Self {
        self.fill_rule = fill_rule;
        self
    }
}

/// Closed polyline. The closing point is implicit and never stored twice.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contour {
    pub points: Vec<DVec2>,
}

impl Contour {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area, positive for counter-clockwise contours
    pub fn signed_area(&self) -> f64 {
        polygon::signed_area(&self.points)
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Iterate over edges as (start, end) pairs, including the closing edge
    pub fn edges(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }
}

/// Outer boundary with the holes cut out of it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContourSet {
    /// Index of the source path, kept for error reporting
    pub path_index: usize,
    pub outer: Contour,
    pub holes: Vec<Contour>,
}

impl ContourSet {
    pub fn new(outer: Contour) -> Self {
        Self {
            path_index: 0,
            outer,
            holes: Vec::new(),
        }
    }

    pub fn with_hole(mut self, hole: Contour) -> Self {
        self.holes.push(hole);
        self
    }

    pub fn contours(&self) -> impl Iterator<Item = &Contour> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    /// Total number of points across the outer contour and holes
    pub fn point_count(&self) -> usize {
        self.contours().map(Contour::len).sum()
    }
}
