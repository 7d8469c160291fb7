//! Extrusion engine: contour sets to beveled solid meshes.
//!
//! The solid is built from rings of the contour set stacked along the
//! profile: back cap ring, back bevel rings, wall, front bevel rings, front
//! cap ring. Consecutive rings are joined by strips of quads, and the two cap
//! rings are triangulated with earcut so holes stay open.
//!
//! Ring `k` of an `S`-segment bevel is the contour inset by `size * k / S`
//! and moved `thickness * k / S` from the wall end toward the cap. Ring 0 is
//! the unbeveled wall edge and ring `S` is the cap edge; both are shared
//! vertex for vertex with the neighbouring strip, so there are no seams.

use glam::{DVec2, DVec3};
use tracing::debug;

use crate::bounds::Bounds3;
use crate::error::{Error, Result};
use crate::mesh::{MaterialRef, Mesh};
use crate::polygon;
use crate::types::ContourSet;

/// Fraction of the largest clean inset used when the requested bevel size
/// does not fit the contour.
pub const MAX_BEVEL_SIZE_RATIO: f64 = 0.98;

/// Largest bevel thickness, as a fraction of the extrusion depth.
pub const MAX_BEVEL_THICKNESS_RATIO: f64 = 0.49;

/// Rings with less enclosed area than this are degenerate.
const MIN_RING_AREA: f64 = 1e-10;

/// Extrusion settings
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrusionProfile {
    /// Distance between the two caps
    pub depth: f64,
    pub bevel_enabled: bool,
    /// Depth consumed by each bevel, measured along z
    pub bevel_thickness: f64,
    /// How far the cap contour is inset from the wall contour
    pub bevel_size: f64,
    /// Number of strips in each bevel
    pub bevel_segments: u32,
}

impl Default for ExtrusionProfile {
    fn default() -> Self {
        Self {
            depth: 40.0,
            bevel_enabled: true,
            bevel_thickness: 3.0,
            bevel_size: 2.0,
            bevel_segments: 5,
        }
    }
}

impl ExtrusionProfile {
    /// Flat extrusion without bevels
    pub fn flat(depth: f64) -> Self {
        Self {
            depth,
            bevel_enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.depth.is_finite() || self.depth <= 0.0 {
            return Err(Error::InvalidConfig {
                field: "depth",
                reason: format!("must be a positive number, got {}", self.depth),
            });
        }
        Ok(())
    }
}

/// Bevel dimensions after clamping, or `None` when no bevel is emitted
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bevel {
    size: f64,
    thickness: f64,
    segments: u32,
}

/// One ring of the profile: fraction of the bevel inset and height
#[derive(Debug, Clone, Copy)]
struct Ring {
    inset: f64,
    z: f64,
}

/// Extrude a contour set into a solid mesh.
pub fn extrude(set: &ContourSet, profile: &ExtrusionProfile) -> Result<Mesh> {
    extrude_with_material(set, profile, 0)
}

/// Extrude a contour set, tagging the mesh with `material`.
pub fn extrude_with_material(
    set: &ContourSet,
    profile: &ExtrusionProfile,
    material: MaterialRef,
) -> Result<Mesh> {
    profile.validate()?;
    let contours = prepare_contours(set)?;
    let bevel = effective_bevel(&contours, profile);

    let rings = profile_rings(profile.depth, bevel);
    let per_ring: usize = contours.iter().map(Vec::len).sum();

    // Contour offsets are shared by the front and back bevel
    let inset_distance = |fraction: f64| bevel.map_or(0.0, |b| b.size * fraction);

    let mut positions = Vec::with_capacity(rings.len() * per_ring);
    for ring in &rings {
        for contour in &contours {
            let points = polygon::offset_ring_left(contour, inset_distance(ring.inset));
            positions.extend(points.into_iter().map(|p| p.extend(ring.z)));
        }
    }

    let mut builder = TriangleBuilder::new(&positions);

    // Side strips between consecutive rings, for every contour edge
    for r in 0..rings.len() - 1 {
        let lower = r * per_ring;
        let upper = (r + 1) * per_ring;
        let mut start = 0;
        for contour in &contours {
            let len = contour.len();
            for i in 0..len {
                let a = start + i;
                let b = start + (i + 1) % len;
                builder.push([lower + a, lower + b, upper + b], None);
                builder.push([lower + a, upper + b, upper + a], None);
            }
            start += len;
        }
    }

    // Caps share the cap ring's 2-D outline
    let cap_outline: Vec<DVec2> = contours
        .iter()
        .flat_map(|c| polygon::offset_ring_left(c, inset_distance(1.0)))
        .collect();
    let cap_triangles = triangulate_cap(set, &contours, &cap_outline)?;
    let back = 0;
    let front = (rings.len() - 1) * per_ring;
    for [a, b, c] in cap_triangles {
        builder.push([back + a, back + c, back + b], Some(DVec3::NEG_Z));
        builder.push([front + a, front + b, front + c], Some(DVec3::Z));
    }

    let (indices, normals, dropped) = builder.finish();
    if dropped > 0 {
        debug!(path_index = set.path_index, dropped, "dropped zero-area triangles");
    }

    Ok(Mesh {
        positions,
        normals,
        indices,
        material,
    })
}

/// Copy the contours, checking area and fixing orientation.
fn prepare_contours(set: &ContourSet) -> Result<Vec<Vec<DVec2>>> {
    let degenerate = |reason: String| Error::DegenerateGeometry {
        path_index: set.path_index,
        shape_index: 0,
        reason,
    };

    let mut contours = Vec::with_capacity(1 + set.holes.len());
    for (i, contour) in set.contours().enumerate() {
        let label = if i == 0 {
            "outer contour".to_string()
        } else {
            format!("hole {}", i - 1)
        };
        if !contour.points.iter().all(|p| p.is_finite()) {
            return Err(degenerate(format!("{} has a non-finite coordinate", label)));
        }
        let mut points = contour.points.clone();
        polygon::dedup_ring(&mut points);
        if points.len() < 3 {
            return Err(degenerate(format!(
                "{} has {} distinct points, need at least 3",
                label,
                points.len()
            )));
        }
        let area = polygon::signed_area(&points);
        if !area.is_finite() || area.abs() < MIN_RING_AREA {
            return Err(degenerate(format!("{} encloses no area", label)));
        }
        // Outer counter-clockwise, holes clockwise
        if (i == 0) != (area > 0.0) {
            points.reverse();
        }
        contours.push(points);
    }
    Ok(contours)
}

/// Clamp the requested bevel to what the contours can hold.
fn effective_bevel(contours: &[Vec<DVec2>], profile: &ExtrusionProfile) -> Option<Bevel> {
    if !profile.bevel_enabled || profile.bevel_segments == 0 {
        return None;
    }
    let sanitize = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    let requested_size = sanitize(profile.bevel_size);
    let requested_thickness = sanitize(profile.bevel_thickness);

    let rings: Vec<&[DVec2]> = contours.iter().map(Vec::as_slice).collect();
    let fit = polygon::max_simple_inset(&rings, requested_size);
    let max_thickness = profile.depth * MAX_BEVEL_THICKNESS_RATIO;

    let size = if fit < requested_size {
        fit * MAX_BEVEL_SIZE_RATIO
    } else {
        requested_size
    };
    let thickness = requested_thickness.min(max_thickness);
    if size < requested_size || thickness < requested_thickness {
        debug!(
            requested_size,
            size, requested_thickness, thickness, "clamped bevel to fit contour"
        );
    }

    if size <= 0.0 && thickness <= 0.0 {
        return None;
    }
    Some(Bevel {
        size,
        thickness,
        segments: profile.bevel_segments,
    })
}

/// Rings from the back cap (z = 0) to the front cap (z = depth).
fn profile_rings(depth: f64, bevel: Option<Bevel>) -> Vec<Ring> {
    let Some(bevel) = bevel else {
        return vec![Ring { inset: 0.0, z: 0.0 }, Ring { inset: 0.0, z: depth }];
    };

    let s = bevel.segments;
    let fraction = |k: u32| k as f64 / s as f64;
    let back = (0..=s).rev().map(|k| Ring {
        inset: fraction(k),
        z: bevel.thickness * (1.0 - fraction(k)),
    });
    let front = (0..=s).map(|k| Ring {
        inset: fraction(k),
        z: depth - bevel.thickness * (1.0 - fraction(k)),
    });
    back.chain(front).collect()
}

/// Triangulate the cap outline; indices refer to a single ring.
fn triangulate_cap(
    set: &ContourSet,
    contours: &[Vec<DVec2>],
    outline: &[DVec2],
) -> Result<Vec<[usize; 3]>> {
    let coords: Vec<f64> = outline.iter().flat_map(|p| [p.x, p.y]).collect();
    let mut hole_starts = Vec::with_capacity(contours.len().saturating_sub(1));
    let mut start = 0;
    for (i, contour) in contours.iter().enumerate() {
        if i > 0 {
            hole_starts.push(start);
        }
        start += contour.len();
    }

    let flat = earcutr::earcut(&coords, &hole_starts, 2).map_err(|_| Error::DegenerateGeometry {
        path_index: set.path_index,
        shape_index: 0,
        reason: "cap triangulation failed".to_string(),
    })?;

    // Orient every triangle counter-clockwise; the back cap flips them
    Ok(flat
        .chunks_exact(3)
        .filter_map(|t| {
            let (a, b, c) = (t[0], t[1], t[2]);
            let cross = (outline[b] - outline[a]).perp_dot(outline[c] - outline[a]);
            if cross > 0.0 {
                Some([a, b, c])
            } else if cross < 0.0 {
                Some([a, c, b])
            } else {
                None
            }
        })
        .collect())
}

/// Collects triangles, drops degenerate ones and accumulates normals.
struct TriangleBuilder<'a> {
    positions: &'a [DVec3],
    indices: Vec<[u32; 3]>,
    normal_sums: Vec<DVec3>,
    min_area: f64,
    dropped: usize,
}

impl<'a> TriangleBuilder<'a> {
    fn new(positions: &'a [DVec3]) -> Self {
        let extent = Bounds3::from_points(positions.iter().copied())
            .map_or(1.0, |b| b.width().max(b.height()).max(b.depth()).max(1e-6));
        Self {
            positions,
            indices: Vec::new(),
            normal_sums: vec![DVec3::ZERO; positions.len()],
            min_area: 1e-12 * extent * extent,
            dropped: 0,
        }
    }

    /// Add a triangle. `flat_normal` overrides the computed face normal.
    fn push(&mut self, tri: [usize; 3], flat_normal: Option<DVec3>) {
        let [a, b, c] = tri;
        if a == b || b == c || a == c {
            self.dropped += 1;
            return;
        }
        let (pa, pb, pc) = (self.positions[a], self.positions[b], self.positions[c]);
        let cross = (pb - pa).cross(pc - pa);
        if cross.length() * 0.5 <= self.min_area {
            self.dropped += 1;
            return;
        }
        let normal = flat_normal.unwrap_or_else(|| cross.normalize());
        for i in tri {
            self.normal_sums[i] += normal;
        }
        self.indices.push([a as u32, b as u32, c as u32]);
    }

    fn finish(self) -> (Vec<[u32; 3]>, Vec<DVec3>, usize) {
        let normals = self
            .normal_sums
            .into_iter()
            .map(|n| {
                let unit = n.normalize_or_zero();
                if unit == DVec3::ZERO { DVec3::Z } else { unit }
            })
            .collect();
        (self.indices, normals, self.dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Contour;
    use approx::assert_relative_eq;

    fn square(x: f64, y: f64, size: f64) -> Contour {
        Contour::new(vec![
            DVec2::new(x, y),
            DVec2::new(x + size, y),
            DVec2::new(x + size, y + size),
            DVec2::new(x, y + size),
        ])
    }

    fn assert_valid(mesh: &Mesh) {
        mesh.validate().unwrap();
        for t in 0..mesh.triangle_count() {
            assert!(mesh.triangle_area(t) > 0.0, "triangle {} is degenerate", t);
        }
    }

    #[test]
    fn test_flat_square_counts() {
        let set = ContourSet::new(square(0.0, 0.0, 10.0));
        let mesh = extrude(&set, &ExtrusionProfile::flat(2.0)).unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert_valid(&mesh);
    }

    #[test]
    fn test_flat_square_spans_depth() {
        let set = ContourSet::new(square(0.0, 0.0, 10.0));
        let mesh = extrude(&set, &ExtrusionProfile::flat(2.0)).unwrap();
        let b = mesh.bounds().unwrap();
        assert_eq!(b.min, DVec3::ZERO);
        assert_eq!(b.max, DVec3::new(10.0, 10.0, 2.0));
    }

    #[test]
    fn test_faces_point_outward() {
        let set = ContourSet::new(square(0.0, 0.0, 10.0));
        let mesh = extrude(&set, &ExtrusionProfile::flat(2.0)).unwrap();
        let center = DVec3::new(5.0, 5.0, 1.0);
        for tri in &mesh.indices {
            let [a, b, c] = tri.map(|i| mesh.positions[i as usize]);
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid - center) > 0.0);
        }
    }

    #[test]
    fn test_cap_normals_face_away() {
        let set = ContourSet::new(square(0.0, 0.0, 10.0));
        let profile = ExtrusionProfile {
            depth: 4.0,
            bevel_enabled: true,
            bevel_thickness: 1.0,
            bevel_size: 1.0,
            bevel_segments: 2,
        };
        let mesh = extrude(&set, &profile).unwrap();
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert_relative_eq!(n.length(), 1.0, epsilon = 1e-9);
            if p.z == 0.0 {
                assert!(n.z < 0.0);
            } else if p.z == 4.0 {
                assert!(n.z > 0.0);
            }
        }
    }

    #[test]
    fn test_beveled_square_counts() {
        let set = ContourSet::new(square(0.0, 0.0, 10.0));
        let profile = ExtrusionProfile {
            depth: 4.0,
            bevel_enabled: true,
            bevel_thickness: 1.0,
            bevel_size: 1.0,
            bevel_segments: 3,
        };
        let mesh = extrude(&set, &profile).unwrap();
        // Four rings per side, four points per ring
        assert_eq!(mesh.vertex_count(), 2 * 4 * 4);
        // Seven strips of four quads, plus two caps
        assert_eq!(mesh.triangle_count(), 7 * 4 * 2 + 4);
        assert_valid(&mesh);
    }

    #[test]
    fn test_bevel_rings_are_linear() {
        let set = ContourSet::new(square(0.0, 0.0, 10.0));
        let profile = ExtrusionProfile {
            depth: 10.0,
            bevel_enabled: true,
            bevel_thickness: 2.0,
            bevel_size: 1.0,
            bevel_segments: 2,
        };
        let mesh = extrude(&set, &profile).unwrap();
        let near = |i: usize, expected: DVec3| {
            assert!(
                mesh.positions[i].distance(expected) < 1e-9,
                "vertex {} is {:?}",
                i,
                mesh.positions[i]
            );
        };
        // Back rings: cap (inset 1, z 0), middle (inset 0.5, z 1), wall edge (z 2)
        near(0, DVec3::new(1.0, 1.0, 0.0));
        near(4, DVec3::new(0.5, 0.5, 1.0));
        near(8, DVec3::new(0.0, 0.0, 2.0));
        near(12, DVec3::new(0.0, 0.0, 8.0));
        near(20, DVec3::new(1.0, 1.0, 10.0));
        // The wall edge is exactly the unbeveled contour
        assert_eq!(mesh.positions[9], DVec3::new(10.0, 0.0, 2.0));
    }

    #[test]
    fn test_oversized_bevel_is_clamped() {
        let set = ContourSet::new(square(0.0, 0.0, 10.0));
        let profile = ExtrusionProfile {
            depth: 2.0,
            bevel_enabled: true,
            bevel_thickness: 5.0,
            bevel_size: 50.0,
            bevel_segments: 4,
        };
        let mesh = extrude(&set, &profile).unwrap();
        assert_valid(&mesh);
        let b = mesh.bounds().unwrap();
        assert_eq!(b.min.z, 0.0);
        assert_eq!(b.max.z, 2.0);
        // The cap is inset by the clamped size only
        let cap_min = mesh.positions[0];
        assert_relative_eq!(cap_min.x, 5.0 * MAX_BEVEL_SIZE_RATIO, epsilon = 1e-9);
    }

    fn equilateral(side: f64) -> Contour {
        Contour::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(side, 0.0),
            DVec2::new(side * 0.5, side * 3f64.sqrt() * 0.5),
        ])
    }

    /// The back cap ring must run the same way as the contour it came from.
    fn assert_cap_follows(mesh: &Mesh, contour: &Contour) {
        let n = contour.len();
        let cap: Vec<DVec2> = mesh.positions[..n].iter().map(|p| p.truncate()).collect();
        for i in 0..n {
            let j = (i + 1) % n;
            let inset = cap[j] - cap[i];
            let original = contour.points[j] - contour.points[i];
            assert!(inset.dot(original) > 0.0, "cap edge {} reversed: {:?}", i, cap);
        }
        assert!(polygon::signed_area(&cap) > 0.0);
    }

    #[test]
    fn test_triangle_bevel_stays_inside() {
        let triangle = equilateral(10.0);
        let set = ContourSet::new(triangle.clone());
        let profile = ExtrusionProfile {
            bevel_size: 100.0,
            ..Default::default()
        };
        let mesh = extrude(&set, &profile).unwrap();
        assert_valid(&mesh);
        assert_cap_follows(&mesh, &triangle);

        // Cap vertices stop short of the incenter
        let inradius = 10.0 / (2.0 * 3f64.sqrt());
        let incenter = DVec2::new(5.0, inradius);
        for p in &mesh.positions[..3] {
            let d = p.truncate().distance(incenter);
            assert!(d > 0.0 && d < 0.1 * inradius, "vertex {:?}", p);
        }
    }

    #[test]
    fn test_default_bevel_on_small_triangle() {
        // Inradius 1.15 is below the default bevel size
        let triangle = equilateral(4.0);
        let mesh = extrude(&ContourSet::new(triangle.clone()), &ExtrusionProfile::default()).unwrap();
        assert_valid(&mesh);
        assert_cap_follows(&mesh, &triangle);
    }

    #[test]
    fn test_fitting_bevel_is_untouched() {
        let set = ContourSet::new(square(0.0, 0.0, 10.0));
        let profile = ExtrusionProfile {
            depth: 10.0,
            bevel_enabled: true,
            bevel_thickness: 1.0,
            bevel_size: 1.0,
            bevel_segments: 1,
        };
        let mesh = extrude(&set, &profile).unwrap();
        assert_eq!(mesh.positions[0].truncate(), DVec2::new(1.0, 1.0));
    }

    #[test]
    fn test_non_finite_point_is_degenerate() {
        let set = ContourSet::new(Contour::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(f64::INFINITY, 0.0),
            DVec2::new(0.0, 10.0),
        ]));
        match extrude(&set, &ExtrusionProfile::flat(1.0)).unwrap_err() {
            Error::DegenerateGeometry { reason, .. } => assert!(reason.contains("non-finite")),
            other => panic!("unexpected error: {:?}", other),
        }

        let nan = ContourSet::new(Contour::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(f64::NAN, 0.0),
            DVec2::new(0.0, 10.0),
        ]));
        assert!(matches!(
            extrude(&nan, &ExtrusionProfile::flat(1.0)),
            Err(Error::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_zero_bevel_is_flat() {
        let set = ContourSet::new(square(0.0, 0.0, 10.0));
        let profile = ExtrusionProfile {
            depth: 2.0,
            bevel_enabled: true,
            bevel_thickness: 0.0,
            bevel_size: 0.0,
            bevel_segments: 3,
        };
        let mesh = extrude(&set, &profile).unwrap();
        assert_eq!(mesh.vertex_count(), 8);
    }

    #[test]
    fn test_hole_is_not_capped() {
        // Counter-clockwise hole, reversed during extrusion
        let set = ContourSet::new(square(0.0, 0.0, 10.0)).with_hole(square(3.0, 3.0, 4.0));
        let mesh = extrude(&set, &ExtrusionProfile::flat(1.0)).unwrap();
        assert_valid(&mesh);
        assert_eq!(mesh.vertex_count(), 16);

        let cap_area: f64 = (0..mesh.triangle_count())
            .filter(|&t| {
                mesh.indices[t]
                    .iter()
                    .all(|&i| mesh.positions[i as usize].z == 1.0)
            })
            .map(|t| mesh.triangle_area(t))
            .sum();
        assert_relative_eq!(cap_area, 100.0 - 16.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_contour_is_degenerate() {
        let set = ContourSet::new(Contour::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(5.0, 0.0),
            DVec2::new(10.0, 0.0),
        ]));
        let err = extrude(&set, &ExtrusionProfile::default()).unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_too_few_points_is_degenerate() {
        let set = ContourSet::new(Contour::new(vec![DVec2::ZERO, DVec2::X]));
        assert!(matches!(
            extrude(&set, &ExtrusionProfile::default()),
            Err(Error::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_invalid_depth() {
        let set = ContourSet::new(square(0.0, 0.0, 1.0));
        assert!(matches!(
            extrude(&set, &ExtrusionProfile::flat(0.0)),
            Err(Error::InvalidConfig { field: "depth", .. })
        ));
    }

    #[test]
    fn test_deterministic() {
        let set = ContourSet::new(square(0.0, 0.0, 10.0)).with_hole(square(2.0, 2.0, 3.0));
        let profile = ExtrusionProfile::default();
        assert_eq!(extrude(&set, &profile).unwrap(), extrude(&set, &profile).unwrap());
    }
}
