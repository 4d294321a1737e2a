//! Splitting a triangle list into submeshes under the vertex ceiling.

use byteorder::{ByteOrder, LittleEndian};
use smallvec::SmallVec;
use tracing::trace;

use super::buffers::{pack_vertices, AttributeLayout, PackedVertices};
use super::morph::MorphTarget;
use super::skin::BoneInfluences;
use super::vertex::{Vertex, VertexTree};
use crate::document::{Object, Value};
use crate::scene::{MeshGeometry, Triangle};
use crate::util::{Vec2, Vec3};

/// Most vertices a single submesh may hold. Indices are 16-bit.
pub const MAX_SUBMESH_VERTICES: usize = 65535;

/// One drawable chunk of a mesh: a single material and at most
/// [`MAX_SUBMESH_VERTICES`] vertices.
#[derive(Debug, Clone)]
pub struct Submesh {
    pub material: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub packed: PackedVertices,
    pub bones: Vec<BoneInfluences>,
    pub morph_targets: Vec<MorphTarget>,
}

impl Submesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn index_buffer(&self) -> Object {
        let mut data = vec![0u8; self.indices.len() * 2];
        LittleEndian::write_u16_into(&self.indices, &mut data);
        Object::new()
            .with("Data", data)
            .with("PrimitiveType", "Triangle")
            .with("ComponentType", "uint16")
            .with("IndexCount", self.indices.len())
    }

    pub fn to_object(&self) -> Object {
        let mut obj = Object::new()
            .with("Material", self.material.as_str())
            .with("VertexAttributes", self.packed.attributes_value())
            .with("VertexBuffers", self.packed.buffers_value())
            .with("IndexBuffers", vec![Value::from(self.index_buffer())]);
        if !self.bones.is_empty() {
            obj.insert(
                "Bones",
                self.bones.iter().map(|b| b.to_object().into()).collect::<Vec<Value>>(),
            );
        }
        if !self.morph_targets.is_empty() {
            obj.insert(
                "MorphTargets",
                self.morph_targets
                    .iter()
                    .map(|t| t.to_object().into())
                    .collect::<Vec<Value>>(),
            );
        }
        obj
    }
}

/// Accumulates triangles of one material at a time, starting a new submesh
/// whenever the next triangle could push the vertex count past the ceiling.
pub struct SubmeshBuilder<'a> {
    geometry: &'a MeshGeometry,
    layout: &'a AttributeLayout,
    tree: VertexTree,
    indices: Vec<u16>,
    submeshes: Vec<Submesh>,
}

impl<'a> SubmeshBuilder<'a> {
    pub fn new(geometry: &'a MeshGeometry, layout: &'a AttributeLayout) -> Self {
        Self {
            geometry,
            layout,
            tree: VertexTree::new(),
            indices: Vec::new(),
            submeshes: Vec::new(),
        }
    }

    /// Add one triangle of `material`. Triangles of a material must be added
    /// contiguously, followed by [`flush`](Self::flush).
    pub fn add_triangle(&mut self, material: &str, triangle: &Triangle) {
        if self.tree.len() + 3 > MAX_SUBMESH_VERTICES {
            self.flush(material);
        }
        for corner in 0..3 {
            let vertex = self.corner_vertex(triangle.vertices[corner], triangle.loops[corner]);
            let index = self.tree.get_or_insert(vertex);
            // The ceiling check above keeps every index below 65535.
            self.indices.push(index as u16);
        }
    }

    /// Close the active submesh, if it has any triangles.
    pub fn flush(&mut self, material: &str) {
        if self.indices.is_empty() {
            return;
        }
        let vertices = std::mem::take(&mut self.tree).into_vertices();
        let indices = std::mem::take(&mut self.indices);
        trace!(material, vertices = vertices.len(), indices = indices.len(), "submesh");
        let packed = pack_vertices(&vertices, self.layout, self.geometry);
        self.submeshes.push(Submesh {
            material: material.to_string(),
            vertices,
            indices,
            packed,
            bones: Vec::new(),
            morph_targets: Vec::new(),
        });
    }

    pub fn finish(self) -> Vec<Submesh> {
        self.submeshes
    }

    fn corner_vertex(&self, vertex: u32, loop_index: u32) -> Vertex {
        let geo = self.geometry;
        let (v, l) = (vertex as usize, loop_index as usize);
        let tangent = match (&geo.loop_tangents, self.layout.include_tangents) {
            (Some(tangents), true) => tangents[l],
            _ => Vec3::ZERO,
        };
        let normal_smooth = if self.layout.include_smooth_normals {
            geo.vertex_normals.get(v).copied().unwrap_or(Vec3::ZERO)
        } else {
            Vec3::ZERO
        };
        let tex_coords: SmallVec<[Vec2; 2]> = self
            .layout
            .uv_layers
            .iter()
            .map(|layer| {
                let uv = geo.uv_layers[*layer].uvs[l];
                Vec2::new(uv.x, 1.0 - uv.y)
            })
            .collect();
        let colors = self
            .layout
            .color_layers
            .iter()
            .map(|layer| geo.color_layers[*layer].colors[l])
            .collect();

        Vertex {
            position: geo.positions[v],
            normal: geo.loop_normals[l],
            tangent,
            normal_smooth,
            tex_coords,
            colors,
            source_vertex: vertex,
            source_loop: loop_index,
        }
    }
}

/// Build the submeshes of `geometry`, one material at a time in order of
/// first use. Triangles in empty material slots are dropped.
pub fn build_submeshes(geometry: &MeshGeometry, layout: &AttributeLayout) -> Vec<Submesh> {
    let mut builder = SubmeshBuilder::new(geometry, layout);
    for slot in geometry.used_material_slots() {
        let Some(Some(material)) = geometry.materials.get(slot) else {
            continue;
        };
        for triangle in geometry.triangles.iter().filter(|t| t.material == slot) {
            builder.add_triangle(material, triangle);
        }
        builder.flush(material);
    }
    builder.finish()
}
