//! Mesh conversion: vertex deduplication, submesh chunking, buffer packing,
//! skinning and morph targets.
//!
//! [`Mesh::build`] turns evaluated [`MeshGeometry`](crate::scene::MeshGeometry)
//! into submeshes. Morph target states are then layered on with
//! [`Mesh::add_morph_state`], which compares a perturbed state against the
//! vertices each submesh was built from.

mod buffers;
mod morph;
mod skin;
mod submesh;
mod vertex;

pub use buffers::{
    pack_vertices, AttributeLayout, ComponentType, PackedVertices, Semantic, VertexAttribute, WindGroups,
    SMOOTH_NORMAL_NAME, WIND_ATTRIBUTE_NAME, WIND_GROUP_NAMES,
};
pub use morph::MorphTarget;
pub use skin::{bone_influences, normalize_influences, BoneInfluences, MeshSkin, SkinBinding, SkinBone};
pub use submesh::{build_submeshes, Submesh, SubmeshBuilder, MAX_SUBMESH_VERTICES};
pub use vertex::{Vertex, VertexTree};

use tracing::debug;

use crate::document::{Object, Value};
use crate::scene::MeshGeometry;
use crate::util::{point3d_string, BoundingVolume, Error, Result};

/// A converted mesh, ready to be written into the document.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub submeshes: Vec<Submesh>,
    pub skin: Option<MeshSkin>,
    /// Bounds of the base state unioned with every morph state.
    pub bounds: BoundingVolume,
    layout: AttributeLayout,
    vertex_count: usize,
    loop_count: usize,
}

impl Mesh {
    /// Convert `geometry`. With a `skin` binding each submesh gets bone
    /// influences and the mesh a shared skeleton table.
    pub fn build(name: &str, geometry: &MeshGeometry, layout: AttributeLayout, skin: Option<SkinBinding<'_>>) -> Self {
        let mut submeshes = build_submeshes(geometry, &layout);
        let skin = skin.and_then(|binding| {
            for submesh in &mut submeshes {
                submesh.bones = bone_influences(&submesh.vertices, geometry, binding.armature);
            }
            MeshSkin::new(&binding, &submeshes)
        });
        debug!(
            mesh = name,
            submeshes = submeshes.len(),
            vertices = submeshes.iter().map(Submesh::vertex_count).sum::<usize>(),
            skinned = skin.is_some(),
            "built mesh"
        );
        Self {
            name: name.to_string(),
            submeshes,
            skin,
            bounds: BoundingVolume::from_points(&geometry.positions),
            layout,
            vertex_count: geometry.vertex_count(),
            loop_count: geometry.loop_count(),
        }
    }

    pub fn layout(&self) -> &AttributeLayout {
        &self.layout
    }

    pub fn is_empty(&self) -> bool {
        self.submeshes.is_empty()
    }

    /// Add a morph target named `target` to every submesh that differs in
    /// `state`. Returns whether any submesh changed.
    ///
    /// `node` names the owning node in the error raised when `state` does
    /// not have the base vertex count. States with a different loop layout or
    /// dangling indices are rejected as well. The state's bounds are unioned
    /// for every accepted state.
    pub fn add_morph_state(&mut self, node: &str, target: &str, state: &MeshGeometry) -> Result<bool> {
        if state.vertex_count() != self.vertex_count {
            return Err(Error::GeometryInvariant {
                node: node.to_string(),
                expected: self.vertex_count,
                actual: state.vertex_count(),
            });
        }
        if state.loop_count() != self.loop_count {
            return Err(Error::invalid(format!(
                "morph state \"{}\" of \"{}\" has {} loops, base mesh has {}",
                target,
                node,
                state.loop_count(),
                self.loop_count
            )));
        }
        state
            .validate()
            .map_err(|e| Error::invalid(format!("morph state \"{}\" of \"{}\": {}", target, node, e)))?;
        self.bounds.union(&BoundingVolume::from_points(&state.positions));

        let mut changed = false;
        for submesh in &mut self.submeshes {
            if let Some(morph) = MorphTarget::compute(target, &submesh.vertices, state, &self.layout) {
                submesh.morph_targets.push(morph);
                changed = true;
            }
        }
        Ok(changed)
    }

    pub fn to_object(&self) -> Object {
        let submeshes: Vec<Value> = self.submeshes.iter().map(|s| s.to_object().into()).collect();
        let mut obj = Object::new().with("Submeshes", submeshes);
        if let Some(skin) = &self.skin {
            skin.write(&mut obj);
        }
        let center = self.bounds.sphere_center();
        obj.insert("BoundingSphereCenter", point3d_string(center.x, center.y, center.z));
        obj.insert("BoundingSphereRadius", self.bounds.sphere_radius());
        obj
    }
}
