//! Sparse morph target deltas.

use byteorder::{ByteOrder, LittleEndian};

use super::buffers::AttributeLayout;
use super::vertex::Vertex;
use crate::document::Object;
use crate::scene::MeshGeometry;
use crate::util::Vec3;

/// Per-attribute deltas of one submesh against a perturbed mesh state.
///
/// Each non-empty set is a run of `(u32 vertex index, f32 dx, dy, dz)`
/// records, little-endian, for vertices whose attribute changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTarget {
    pub name: String,
    pub position: Vec<u8>,
    pub normal: Vec<u8>,
    pub normal_smooth: Vec<u8>,
    pub tangent: Vec<u8>,
}

fn push_delta(out: &mut Vec<u8>, index: usize, delta: Vec3) {
    if delta == Vec3::ZERO {
        return;
    }
    let mut record = [0u8; 16];
    LittleEndian::write_u32(&mut record[..4], index as u32);
    LittleEndian::write_f32_into(&delta.to_array(), &mut record[4..]);
    out.extend_from_slice(&record);
}

impl MorphTarget {
    /// Deltas of `vertices` (built from the base state) against `state`.
    /// Returns `None` when nothing changed.
    ///
    /// `state` must have the same vertex and loop layout as the base.
    pub fn compute(name: &str, vertices: &[Vertex], state: &MeshGeometry, layout: &AttributeLayout) -> Option<Self> {
        let tangents = state.loop_tangents.as_ref().filter(|_| layout.include_tangents);
        let mut target = MorphTarget {
            name: name.to_string(),
            ..Default::default()
        };

        for (index, v) in vertices.iter().enumerate() {
            let (src, lp) = (v.source_vertex as usize, v.source_loop as usize);
            push_delta(&mut target.position, index, state.positions[src] - v.position);
            push_delta(&mut target.normal, index, state.loop_normals[lp] - v.normal);
            if layout.include_smooth_normals {
                let smooth = state.vertex_normals.get(src).copied().unwrap_or(Vec3::ZERO);
                push_delta(&mut target.normal_smooth, index, smooth - v.normal_smooth);
            }
            if let Some(tangents) = tangents {
                push_delta(&mut target.tangent, index, tangents[lp] - v.tangent);
            }
        }

        (!target.is_empty()).then_some(target)
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty() && self.normal.is_empty() && self.normal_smooth.is_empty() && self.tangent.is_empty()
    }

    pub fn to_object(&self) -> Object {
        let mut obj = Object::new().with("Name", self.name.as_str());
        for (key, data) in [
            ("Position", &self.position),
            ("Normal", &self.normal),
            ("NormalSmooth", &self.normal_smooth),
            ("Tangent", &self.tangent),
        ] {
            if !data.is_empty() {
                obj.insert(key, data.clone());
            }
        }
        obj
    }
}
