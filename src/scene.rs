//! Scene graph: composes extruded meshes under one root and fits them to a
//! target size.

use glam::{DAffine3, DQuat, DVec3};
use tracing::{debug, info};

use crate::bounds::Bounds3;
use crate::error::{Error, Result};
use crate::mesh::{Material, Mesh};

/// Planar extents below this are treated as zero.
const MIN_EXTENT: f64 = 1e-12;

/// Local transform of a node: scale, then rotate, then translate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: DVec3::ONE,
    };

    pub fn to_affine(&self) -> DAffine3 {
        DAffine3::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneNode {
    pub name: String,
    pub mesh: Option<Mesh>,
    pub transform: Transform,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Bounds of this node's subtree in its parent's space.
    fn subtree_bounds(&self) -> Option<Bounds3> {
        let local = self.local_bounds()?;
        Some(local.transformed(&self.transform.to_affine()))
    }

    /// Bounds of this node's subtree in its own space.
    fn local_bounds(&self) -> Option<Bounds3> {
        let own = self.mesh.as_ref().and_then(Mesh::bounds);
        self.children
            .iter()
            .filter_map(SceneNode::subtree_bounds)
            .fold(own, |acc, b| match acc {
                Some(mut acc) => {
                    acc.expand(&b);
                    Some(acc)
                }
                None => Some(b),
            })
    }

    fn visit<'a>(&'a self, out: &mut Vec<&'a SceneNode>) {
        out.push(self);
        for child in &self.children {
            child.visit(out);
        }
    }
}

/// Root node plus the materials its meshes refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraph {
    pub root: SceneNode,
    pub materials: Vec<Material>,
}

impl SceneGraph {
    /// Nodes in depth-first order, root first.
    pub fn nodes(&self) -> Vec<&SceneNode> {
        let mut out = Vec::new();
        self.root.visit(&mut out);
        out
    }

    /// Meshes in depth-first node order.
    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.nodes().into_iter().filter_map(|n| n.mesh.as_ref())
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes().map(Mesh::vertex_count).sum()
    }

    /// Bounds of all geometry in root space, ignoring the root's own transform.
    pub fn content_bounds(&self) -> Option<Bounds3> {
        self.root.local_bounds()
    }

    /// Bounds of all geometry after the root transform.
    pub fn world_bounds(&self) -> Option<Bounds3> {
        self.root.subtree_bounds()
    }

    /// Rotation of the root, used for live preview orientation.
    pub fn set_orientation(&mut self, rotation: DQuat) {
        self.root.transform.rotation = rotation;
    }

    /// Scale and center the content so its larger planar side is `target_size`.
    ///
    /// The root's translation and scale are overwritten, never composed, so
    /// repeating the call with the same size leaves the transform unchanged.
    pub fn normalize(&mut self, target_size: f64) -> Result<()> {
        if !target_size.is_finite() || target_size <= 0.0 {
            return Err(Error::InvalidConfig {
                field: "targetSize",
                reason: format!("must be a positive number, got {}", target_size),
            });
        }
        let Some(bounds) = self.content_bounds() else {
            return Err(Error::DegenerateBounds {
                width: 0.0,
                height: 0.0,
            });
        };
        let (width, height) = (bounds.width(), bounds.height());
        let finite = self
            .meshes()
            .all(|m| m.positions.iter().all(|p| p.is_finite()));
        if !finite || !width.is_finite() || !height.is_finite() {
            return Err(Error::DegenerateBounds { width, height });
        }
        if width <= MIN_EXTENT && height <= MIN_EXTENT {
            return Err(Error::DegenerateBounds { width, height });
        }

        let scale = target_size / width.max(height);
        let center = bounds.center();
        self.root.transform.translation = DVec3::new(-center.x * scale, -center.y * scale, 0.0);
        self.root.transform.scale = DVec3::splat(scale);
        debug!(width, height, scale, "normalized scene");
        Ok(())
    }
}

/// One child node per mesh under a single root, in input order.
pub fn compose(meshes: Vec<Mesh>) -> SceneGraph {
    let children: Vec<SceneNode> = meshes
        .into_iter()
        .enumerate()
        .map(|(i, mesh)| SceneNode::new(format!("shape_{}", i)).with_mesh(mesh))
        .collect();
    info!(meshes = children.len(), "composed scene");
    SceneGraph {
        root: SceneNode {
            name: "root".to_string(),
            children,
            ..Default::default()
        },
        materials: vec![Material::default()],
    }
}

/// Normalize an owned graph; see [`SceneGraph::normalize`].
pub fn normalize(mut graph: SceneGraph, target_size: f64) -> Result<SceneGraph> {
    graph.normalize(target_size)?;
    Ok(graph)
}
