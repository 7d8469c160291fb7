use glam::DVec3;

use crate::bounds::Bounds3;

/// Index into the scene's material list
pub type MaterialRef = usize;

/// Triangle mesh with per-vertex normals
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub positions: Vec<DVec3>,
    pub normals: Vec<DVec3>,
    pub indices: Vec<[u32; 3]>,
    pub material: MaterialRef,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Area of triangle `t`
    pub fn triangle_area(&self, t: usize) -> f64 {
        let [a, b, c] = self.indices[t].map(|i| self.positions[i as usize]);
        (b - a).cross(c - a).length() * 0.5
    }

    pub fn bounds(&self) -> Option<Bounds3> {
        Bounds3::from_points(self.positions.iter().copied())
    }

    /// Check the structural invariants, returning the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.is_empty() {
            return Err(format!("no triangles over {} positions", self.positions.len()));
        }
        if self.normals.len() != self.positions.len() {
            return Err(format!(
                "{} normals for {} positions",
                self.normals.len(),
                self.positions.len()
            ));
        }
        let n = self.positions.len();
        for (t, tri) in self.indices.iter().enumerate() {
            if let Some(bad) = tri.iter().find(|&&i| i as usize >= n) {
                return Err(format!(
                    "triangle {} references vertex {} of {}",
                    t, bad, n
                ));
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(format!("triangle {} repeats a vertex: {:?}", t, tri));
            }
        }
        Ok(())
    }
}

/// Physically based material applied to extruded meshes
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub double_sided: bool,
}

impl Default for Material {
    /// White, slightly metallic and smooth
    fn default() -> Self {
        Self {
            name: "extruded".to_string(),
            base_color: [1.0, 1.0, 1.0, 1.0],
            metallic: 0.6,
            roughness: 0.2,
            double_sided: true,
        }
    }
}
