//! Evaluated mesh geometry as provided by a scene source.
//!
//! Per-vertex data is indexed by source vertex, per-loop (face corner) data
//! by loop index. Triangles reference both.

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result, Vec2, Vec3, Vec4};

/// One triangle of the evaluated mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [u32; 3],
    pub loops: [u32; 3],
    /// Material slot index.
    #[serde(default)]
    pub material: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    /// One coordinate per loop, in the authoring tool's convention (v up).
    pub uvs: Vec<Vec2>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorLayer {
    pub name: String,
    /// One RGBA color per loop.
    pub colors: Vec<Vec4>,
}

/// Weight of a vertex in a named vertex group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupWeight {
    /// Index into [`MeshGeometry::vertex_groups`].
    pub group: usize,
    pub weight: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshGeometry {
    pub positions: Vec<Vec3>,
    /// Smooth (per-vertex) normals.
    pub vertex_normals: Vec<Vec3>,
    /// Split (per-loop) normals.
    pub loop_normals: Vec<Vec3>,
    /// Per-loop tangents; `None` when they could not be computed.
    pub loop_tangents: Option<Vec<Vec3>>,
    pub triangles: Vec<Triangle>,
    pub uv_layers: Vec<UvLayer>,
    pub color_layers: Vec<ColorLayer>,
    pub vertex_groups: Vec<String>,
    /// Group memberships per vertex. May be empty when no groups exist.
    pub vertex_weights: Vec<Vec<GroupWeight>>,
    /// Material name per slot. Empty slots are `None`.
    pub materials: Vec<Option<String>>,
}

impl MeshGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn loop_count(&self) -> usize {
        self.loop_normals.len()
    }

    pub fn vertex_group_index(&self, name: &str) -> Option<usize> {
        self.vertex_groups.iter().position(|g| g == name)
    }

    /// Weight of `vertex` in `group`, if it is a member.
    pub fn group_weight(&self, vertex: usize, group: usize) -> Option<f32> {
        self.vertex_weights
            .get(vertex)?
            .iter()
            .find(|w| w.group == group)
            .map(|w| w.weight)
    }

    /// Material slots in order of first use by a triangle.
    pub fn used_material_slots(&self) -> Vec<usize> {
        let mut slots = Vec::new();
        for tri in &self.triangles {
            if !slots.contains(&tri.material) {
                slots.push(tri.material);
            }
        }
        slots
    }

    /// Check that every index refers to existing data.
    pub fn validate(&self) -> Result<()> {
        let vertices = self.vertex_count();
        let loops = self.loop_count();
        if !self.vertex_normals.is_empty() && self.vertex_normals.len() != vertices {
            return Err(Error::invalid(format!(
                "{} vertex normals for {} vertices",
                self.vertex_normals.len(),
                vertices
            )));
        }
        if !self.vertex_weights.is_empty() && self.vertex_weights.len() != vertices {
            return Err(Error::invalid(format!(
                "{} weight lists for {} vertices",
                self.vertex_weights.len(),
                vertices
            )));
        }
        if let Some(tangents) = &self.loop_tangents {
            if tangents.len() != loops {
                return Err(Error::invalid(format!("{} tangents for {} loops", tangents.len(), loops)));
            }
        }
        for layer in &self.uv_layers {
            if layer.uvs.len() != loops {
                return Err(Error::invalid(format!("UV layer \"{}\" does not cover every loop", layer.name)));
            }
        }
        for layer in &self.color_layers {
            if layer.colors.len() != loops {
                return Err(Error::invalid(format!("color layer \"{}\" does not cover every loop", layer.name)));
            }
        }
        for (i, tri) in self.triangles.iter().enumerate() {
            let bad_vertex = tri.vertices.iter().any(|v| *v as usize >= vertices);
            let bad_loop = tri.loops.iter().any(|l| *l as usize >= loops);
            if bad_vertex || bad_loop {
                return Err(Error::invalid(format!("triangle {} references missing data", i)));
            }
        }
        for weights in &self.vertex_weights {
            if weights.iter().any(|w| w.group >= self.vertex_groups.len()) {
                return Err(Error::invalid("vertex weight references a missing group"));
            }
        }
        Ok(())
    }
}
