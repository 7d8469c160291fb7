//! Path extraction: vector path commands to closed contour sets.
//!
//! Each path is flattened into sub-path rings, the rings are classified as
//! outer boundaries or holes by how deeply they nest inside each other, and
//! orientation is normalized (outer counter-clockwise, holes clockwise).

use glam::DVec2;
use tracing::debug;

use crate::error::{Error, Result};
use crate::polygon;
use crate::types::{Contour, ContourSet, FillRule, PathCommand, VectorPath};

/// Recursion limit for curve subdivision
const MAX_SUBDIVISION_DEPTH: u32 = 10;

/// Options for curve flattening
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Maximum distance between a curve and its flattened polyline
    pub tolerance: f64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { tolerance: 0.1 }
    }
}

impl ExtractOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(Error::InvalidConfig {
                field: "tolerance",
                reason: format!("must be a positive number, got {}", self.tolerance),
            });
        }
        Ok(())
    }
}

/// Extract contour sets from every path, keeping source order.
pub fn extract_contours(paths: &[VectorPath], options: &ExtractOptions) -> Result<Vec<ContourSet>> {
    options.validate()?;

    let mut sets = Vec::new();
    for (path_index, path) in paths.iter().enumerate() {
        let found = extract_path(path_index, path, options)?;
        if found.is_empty() {
            debug!(path_index, id = %path.id, "path has no drawable segments");
        } else {
            debug!(path_index, id = %path.id, shapes = found.len(), "extracted contour sets");
        }
        sets.extend(found);
    }
    Ok(sets)
}

/// Extract the contour sets of a single path.
pub fn extract_path(
    path_index: usize,
    path: &VectorPath,
    options: &ExtractOptions,
) -> Result<Vec<ContourSet>> {
    let rings = flatten_commands(path_index, &path.commands, options.tolerance)?;
    Ok(group_rings(path_index, rings, path.fill_rule))
}

/// Flatten commands into rings, one per sub-path with at least three points.
fn flatten_commands(
    path_index: usize,
    commands: &[PathCommand],
    tolerance: f64,
) -> Result<Vec<Vec<DVec2>>> {
    let mut rings = Vec::new();
    let mut current: Vec<DVec2> = Vec::new();
    let mut pen: Option<DVec2> = None;
    let mut start = DVec2::ZERO;

    let finish = |ring: &mut Vec<DVec2>, rings: &mut Vec<Vec<DVec2>>| {
        let mut ring = std::mem::take(ring);
        polygon::dedup_ring(&mut ring);
        if ring.len() >= 3 {
            rings.push(ring);
        }
    };

    for (command_index, command) in commands.iter().enumerate() {
        let from = match (command, pen) {
            (PathCommand::MoveTo(_), _) => DVec2::ZERO,
            (_, Some(p)) => p,
            (other, None) => {
                return Err(Error::SvgParse {
                    path_index,
                    command_index,
                    message: format!("{} command before any move", other.name()),
                });
            }
        };

        match *command {
            PathCommand::MoveTo(p) => {
                finish(&mut current, &mut rings);
                current.push(p);
                start = p;
                pen = Some(p);
            }
            PathCommand::LineTo(p) => {
                if current.is_empty() {
                    current.push(from);
                }
                current.push(p);
                pen = Some(p);
            }
            PathCommand::QuadTo { ctrl, end } => {
                if current.is_empty() {
                    current.push(from);
                }
                flatten_quad(from, ctrl, end, tolerance, 0, &mut current);
                pen = Some(end);
            }
            PathCommand::CubicTo { ctrl1, ctrl2, end } => {
                if current.is_empty() {
                    current.push(from);
                }
                flatten_cubic(from, ctrl1, ctrl2, end, tolerance, 0, &mut current);
                pen = Some(end);
            }
            PathCommand::Close => {
                finish(&mut current, &mut rings);
                // Drawing after a close continues from the sub-path start
                pen = Some(start);
            }
        }
    }
    finish(&mut current, &mut rings);

    Ok(rings)
}

fn flatten_quad(p0: DVec2, p1: DVec2, p2: DVec2, tol: f64, depth: u32, out: &mut Vec<DVec2>) {
    if depth >= MAX_SUBDIVISION_DEPTH || polygon::distance_to_segment(p1, p0, p2) <= tol {
        out.push(p2);
        return;
    }
    let p01 = midpoint(p0, p1);
    let p12 = midpoint(p1, p2);
    let p012 = midpoint(p01, p12);
    flatten_quad(p0, p01, p012, tol, depth + 1, out);
    flatten_quad(p012, p12, p2, tol, depth + 1, out);
}

fn flatten_cubic(
    p0: DVec2,
    p1: DVec2,
    p2: DVec2,
    p3: DVec2,
    tol: f64,
    depth: u32,
    out: &mut Vec<DVec2>,
) {
    let deviation = polygon::distance_to_segment(p1, p0, p3)
        .max(polygon::distance_to_segment(p2, p0, p3));
    if depth >= MAX_SUBDIVISION_DEPTH || deviation <= tol {
        out.push(p3);
        return;
    }
    let p01 = midpoint(p0, p1);
    let p12 = midpoint(p1, p2);
    let p23 = midpoint(p2, p3);
    let p012 = midpoint(p01, p12);
    let p123 = midpoint(p12, p23);
    let p0123 = midpoint(p012, p123);
    flatten_cubic(p0, p01, p012, p0123, tol, depth + 1, out);
    flatten_cubic(p0123, p123, p23, p3, tol, depth + 1, out);
}

fn midpoint(a: DVec2, b: DVec2) -> DVec2 {
    (a + b) * 0.5
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Role {
    Outer,
    Hole { parent: usize },
}

/// Classify rings into outer boundaries and holes and build the sets.
fn group_rings(path_index: usize, rings: Vec<Vec<DVec2>>, fill_rule: FillRule) -> Vec<ContourSet> {
    let areas: Vec<f64> = rings.iter().map(|r| polygon::signed_area(r)).collect();

    // Innermost ring strictly containing each ring, plus nesting depth
    let mut parent: Vec<Option<usize>> = vec![None; rings.len()];
    let mut depth: Vec<usize> = vec![0; rings.len()];
    for i in 0..rings.len() {
        for j in 0..rings.len() {
            if i == j || areas[j].abs() <= areas[i].abs() {
                continue;
            }
            if polygon::ring_inside(&rings[i], &rings[j]) {
                depth[i] += 1;
                let closer = parent[i].is_none_or(|p| areas[j].abs() < areas[p].abs());
                if closer {
                    parent[i] = Some(j);
                }
            }
        }
    }

    // Containers are always shallower, so walking by depth sees parents first
    let mut order: Vec<usize> = (0..rings.len()).collect();
    order.sort_by_key(|&i| (depth[i], i));

    let mut roles: Vec<Role> = vec![Role::Outer; rings.len()];
    for &i in &order {
        roles[i] = match parent[i] {
            Some(p) if roles[p] == Role::Outer => {
                let is_hole = match fill_rule {
                    FillRule::EvenOdd => true,
                    FillRule::NonZero => areas[i].signum() != areas[p].signum(),
                };
                if is_hole { Role::Hole { parent: p } } else { Role::Outer }
            }
            _ => Role::Outer,
        };
    }

    let mut sets: Vec<(usize, ContourSet)> = Vec::new();
    for (i, ring) in rings.iter().enumerate() {
        if roles[i] == Role::Outer {
            let mut outer = Contour::new(ring.clone());
            if outer.signed_area() < 0.0 {
                outer.reverse();
            }
            let mut set = ContourSet::new(outer);
            set.path_index = path_index;
            sets.push((i, set));
        }
    }
    for (i, ring) in rings.into_iter().enumerate() {
        if let Role::Hole { parent } = roles[i]
            && let Some((_, set)) = sets.iter_mut().find(|(idx, _)| *idx == parent)
        {
            let mut hole = Contour::new(ring);
            if hole.signed_area() > 0.0 {
                hole.reverse();
            }
            set.holes.push(hole);
        }
    }

    sets.into_iter().map(|(_, set)| set).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_path_data;

    fn path(d: &str) -> VectorPath {
        VectorPath::new("test", parse_path_data(d).unwrap())
    }

    fn extract(d: &str) -> Result<Vec<ContourSet>> {
        extract_path(0, &path(d), &ExtractOptions::default())
    }

    #[test]
    fn test_square_is_one_ccw_set() {
        // Clockwise in y-up terms, gets reversed
        let sets = extract("M0 0 L0 10 L10 10 L10 0 Z").unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].outer.len(), 4);
        assert!(sets[0].outer.is_ccw());
        assert!(sets[0].holes.is_empty());
    }

    #[test]
    fn test_explicit_closing_point_is_dropped() {
        let sets = extract("M0 0 L10 0 L10 10 L0 10 L0 0 Z").unwrap();
        assert_eq!(sets[0].outer.len(), 4);
    }

    #[test]
    fn test_unclosed_subpath_is_auto_closed() {
        let sets = extract("M0 0 L10 0 L10 10").unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].outer.len(), 3);
    }

    #[test]
    fn test_hole_is_detected_and_wound_clockwise() {
        // Same winding for both rings, even-odd makes the inner one a hole
        let vp = path("M0 0 L10 0 L10 10 L0 10 Z M3 3 L7 3 L7 7 L3 7 Z")
            .with_fill_rule(FillRule::EvenOdd);
        let sets = extract_path(0, &vp, &ExtractOptions::default()).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].holes.len(), 1);
        assert!(!sets[0].holes[0].is_ccw());
    }

    #[test]
    fn test_nonzero_opposite_winding_is_hole() {
        let sets = extract("M0 0 L10 0 L10 10 L0 10 Z M3 3 L3 7 L7 7 L7 3 Z").unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].holes.len(), 1);
    }

    #[test]
    fn test_nonzero_same_winding_is_nested_outer() {
        let sets = extract("M0 0 L10 0 L10 10 L0 10 Z M3 3 L7 3 L7 7 L3 7 Z").unwrap();
        assert_eq!(sets.len(), 2);
        assert!(sets.iter().all(|s| s.holes.is_empty()));
    }

    #[test]
    fn test_island_inside_hole_is_outer() {
        let vp = path(
            "M0 0 L20 0 L20 20 L0 20 Z M4 4 L16 4 L16 16 L4 16 Z M8 8 L12 8 L12 12 L8 12 Z",
        )
        .with_fill_rule(FillRule::EvenOdd);
        let sets = extract_path(0, &vp, &ExtractOptions::default()).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].holes.len(), 1);
        assert!(sets[1].holes.is_empty());
        assert_eq!(sets[1].outer.signed_area(), 16.0);
    }

    #[test]
    fn test_subpath_order_is_preserved() {
        let sets = extract("M20 0 L30 0 L30 10 L20 10 Z M0 0 L10 0 L10 10 L0 10 Z").unwrap();
        assert_eq!(sets.len(), 2);
        assert!(sets[0].outer.points.iter().all(|p| p.x >= 20.0));
    }

    #[test]
    fn test_no_drawable_segments_is_empty() {
        assert!(extract("M0 0").unwrap().is_empty());
        assert!(extract("M0 0 L5 5 Z").unwrap().is_empty());
    }

    #[test]
    fn test_curve_before_move_fails_with_index() {
        let vp = VectorPath::new(
            "bad",
            vec![PathCommand::QuadTo {
                ctrl: DVec2::new(1.0, 1.0),
                end: DVec2::new(2.0, 0.0),
            }],
        );
        let err = extract_path(3, &vp, &ExtractOptions::default()).unwrap_err();
        match err {
            Error::SvgParse {
                path_index,
                command_index,
                ..
            } => {
                assert_eq!(path_index, 3);
                assert_eq!(command_index, 0);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_curves_are_flattened_deterministically() {
        let d = "M0 0 C0 10 10 10 10 0 Z";
        let a = extract(d).unwrap();
        let b = extract(d).unwrap();
        assert_eq!(a, b);
        assert!(a[0].outer.len() > 4);
    }

    #[test]
    fn test_finer_tolerance_gives_more_points() {
        let vp = path("M0 0 Q50 100 100 0 Z");
        let coarse = extract_path(0, &vp, &ExtractOptions { tolerance: 5.0 }).unwrap();
        let fine = extract_path(0, &vp, &ExtractOptions { tolerance: 0.01 }).unwrap();
        assert!(fine[0].outer.len() > coarse[0].outer.len());
    }

    #[test]
    fn test_invalid_tolerance_is_rejected() {
        let err = extract_contours(&[path("M0 0 L1 0 L1 1 Z")], &ExtractOptions { tolerance: 0.0 });
        assert!(matches!(err, Err(Error::InvalidConfig { field: "tolerance", .. })));
    }
}
