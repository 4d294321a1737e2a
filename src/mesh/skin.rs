//! Bone influences and skeleton binding.

use byteorder::{ByteOrder, LittleEndian};

use super::submesh::Submesh;
use super::vertex::Vertex;
use crate::document::{Object, Value};
use crate::scene::{Armature, MeshGeometry};
use crate::util::{inverse_or_identity, point3f_string, Mat4};

/// Weights one bone applies to the vertices of a submesh.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneInfluences {
    pub bone: String,
    /// `(submesh vertex index, weight)`, ascending by vertex.
    pub influences: Vec<(u32, f32)>,
}

impl BoneInfluences {
    /// `VertexInfluences` payload: `(u32 index, f32 weight)` pairs, LE.
    pub fn packed(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.influences.len() * 8];
        for ((index, weight), record) in self.influences.iter().zip(data.chunks_exact_mut(8)) {
            LittleEndian::write_u32(&mut record[..4], *index);
            LittleEndian::write_f32(&mut record[4..], *weight);
        }
        data
    }

    pub fn to_object(&self) -> Object {
        Object::new()
            .with("Name", self.bone.as_str())
            .with("VertexInfluences", self.packed())
    }
}

/// Influences of every armature bone that has a same-named vertex group.
/// Bones that touch none of `vertices` are left out.
pub fn bone_influences(vertices: &[Vertex], geometry: &MeshGeometry, armature: &Armature) -> Vec<BoneInfluences> {
    let mut bones = Vec::new();
    for bone in &armature.bones {
        let Some(group) = geometry.vertex_group_index(&bone.name) else {
            continue;
        };
        let influences: Vec<(u32, f32)> = vertices
            .iter()
            .enumerate()
            .filter_map(|(i, v)| {
                let weight = geometry.group_weight(v.source_vertex as usize, group)?;
                (weight != 0.0).then_some((i as u32, weight))
            })
            .collect();
        if !influences.is_empty() {
            bones.push(BoneInfluences {
                bone: bone.name.clone(),
                influences,
            });
        }
    }
    normalize_influences(&mut bones, vertices.len());
    bones
}

/// Scale each vertex's weights so they sum to one across `bones`.
pub fn normalize_influences(bones: &mut [BoneInfluences], vertex_count: usize) {
    let mut totals = vec![0.0f64; vertex_count];
    for bone in bones.iter() {
        for (index, weight) in &bone.influences {
            totals[*index as usize] += *weight as f64;
        }
    }
    for bone in bones.iter_mut() {
        for (index, weight) in bone.influences.iter_mut() {
            let total = totals[*index as usize];
            if total != 0.0 {
                *weight = (*weight as f64 / total) as f32;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkinBone {
    pub name: String,
    pub inverse_bind: Mat4,
}

/// Skeleton binding shared by all submeshes of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSkin {
    pub skeleton: String,
    pub bones: Vec<SkinBone>,
}

/// What a skinned mesh is bound to.
#[derive(Debug, Clone, Copy)]
pub struct SkinBinding<'a> {
    pub armature_name: &'a str,
    pub armature: &'a Armature,
    pub mesh_world: Mat4,
    pub armature_world: Mat4,
}

impl MeshSkin {
    /// Collect bones used by any submesh in first-use order, with inverse
    /// bind matrices in mesh space. `None` if no submesh is skinned.
    pub fn new(binding: &SkinBinding<'_>, submeshes: &[Submesh]) -> Option<Self> {
        let armature_to_mesh = inverse_or_identity(&binding.mesh_world) * binding.armature_world;
        let mut bones: Vec<SkinBone> = Vec::new();
        for influences in submeshes.iter().flat_map(|s| &s.bones) {
            if bones.iter().any(|b| b.name == influences.bone) {
                continue;
            }
            let Some(index) = binding.armature.bone_index(&influences.bone) else {
                continue;
            };
            let rest = binding.armature.bones[index].rest;
            bones.push(SkinBone {
                name: influences.bone.clone(),
                inverse_bind: inverse_or_identity(&(armature_to_mesh * rest)),
            });
        }
        (!bones.is_empty()).then(|| Self {
            skeleton: binding.armature_name.to_string(),
            bones,
        })
    }

    /// Add `Skeleton` and `Bones` to a mesh object.
    pub fn write(&self, mesh: &mut Object) {
        mesh.insert("Skeleton", self.skeleton.as_str());
        let bones: Vec<Value> = self
            .bones
            .iter()
            .map(|bone| {
                let columns: Vec<Value> = (0..4)
                    .map(|c| point3f_string(bone.inverse_bind.col(c).truncate()).into())
                    .collect();
                Object::new()
                    .with("Name", bone.name.as_str())
                    .with("InverseBindMatrix", columns)
                    .into()
            })
            .collect();
        mesh.insert("Bones", bones);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Bone, GroupWeight};
    use crate::util::Vec3;

    fn vertex(source: u32) -> Vertex {
        Vertex {
            position: Vec3::splat(source as f32),
            normal: Vec3::Z,
            tangent: Vec3::ZERO,
            normal_smooth: Vec3::ZERO,
            tex_coords: Default::default(),
            colors: Default::default(),
            source_vertex: source,
            source_loop: source,
        }
    }

    fn armature() -> Armature {
        Armature {
            bones: vec![
                Bone { name: "Root".into(), parent: None, rest: Mat4::IDENTITY },
                Bone { name: "Unused".into(), parent: Some(0), rest: Mat4::IDENTITY },
                Bone {
                    name: "Tip".into(),
                    parent: Some(0),
                    rest: Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)),
                },
            ],
        }
    }

    fn geometry() -> MeshGeometry {
        MeshGeometry {
            positions: vec![Vec3::ZERO; 3],
            vertex_groups: vec!["Tip".into(), "Root".into(), "Unused".into()],
            vertex_weights: vec![
                vec![GroupWeight { group: 1, weight: 0.5 }, GroupWeight { group: 0, weight: 1.5 }],
                vec![GroupWeight { group: 1, weight: 0.25 }, GroupWeight { group: 2, weight: 0.0 }],
                vec![],
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_influences_normalized() {
        let vertices = vec![vertex(0), vertex(1), vertex(2)];
        let bones = bone_influences(&vertices, &geometry(), &armature());
        let names: Vec<_> = bones.iter().map(|b| b.bone.as_str()).collect();
        assert_eq!(names, vec!["Root", "Tip"]);
        assert_eq!(bones[0].influences, vec![(0, 0.25), (1, 1.0)]);
        assert_eq!(bones[1].influences, vec![(0, 0.75)]);

        let mut sums = [0.0f32; 3];
        for b in &bones {
            for (i, w) in &b.influences {
                sums[*i as usize] += w;
            }
        }
        assert!((sums[0] - 1.0).abs() < 1e-6);
        assert!((sums[1] - 1.0).abs() < 1e-6);
        assert_eq!(sums[2], 0.0);
    }

    #[test]
    fn test_packed_layout() {
        let b = BoneInfluences { bone: "B".into(), influences: vec![(3, 0.5), (7, 0.25)] };
        let data = b.packed();
        assert_eq!(data.len(), 16);
        assert_eq!(&data[0..4], &3u32.to_le_bytes());
        assert_eq!(&data[4..8], &0.5f32.to_le_bytes());
        assert_eq!(&data[8..12], &7u32.to_le_bytes());
        assert_eq!(&data[12..16], &0.25f32.to_le_bytes());
    }

    #[test]
    fn test_mesh_skin_inverse_bind() {
        let arm = armature();
        let submesh_bones = vec![
            BoneInfluences { bone: "Tip".into(), influences: vec![(0, 1.0)] },
            BoneInfluences { bone: "Root".into(), influences: vec![(0, 1.0)] },
        ];
        let submesh = Submesh {
            material: "M".into(),
            vertices: vec![vertex(0)],
            indices: vec![],
            packed: Default::default(),
            bones: submesh_bones,
            morph_targets: vec![],
        };
        let binding = SkinBinding {
            armature_name: "Rig",
            armature: &arm,
            mesh_world: Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            armature_world: Mat4::IDENTITY,
        };
        let skin = MeshSkin::new(&binding, &[submesh.clone(), submesh]).unwrap();
        assert_eq!(skin.skeleton, "Rig");
        assert_eq!(skin.bones.len(), 2);
        assert_eq!(skin.bones[0].name, "Tip");
        // mesh space bind = T(-1,0,0) * T(0,2,0); inverse = T(1,-2,0)
        let translation = skin.bones[0].inverse_bind.col(3).truncate();
        assert!((translation - Vec3::new(1.0, -2.0, 0.0)).length() < 1e-6);

        let mut mesh = Object::new();
        skin.write(&mut mesh);
        let bones = mesh.get("Bones").and_then(Value::as_array).unwrap();
        let matrix = bones[0].as_object().unwrap().get("InverseBindMatrix").and_then(Value::as_array).unwrap();
        assert_eq!(matrix.len(), 4);
        let parse = |v: &Value| -> Vec<f32> {
            v.as_str().unwrap().split('|').map(|c| c.parse().unwrap()).collect()
        };
        assert_eq!(parse(&matrix[0]), vec![1.0, 0.0, 0.0]);
        assert_eq!(parse(&matrix[3]), vec![1.0, -2.0, 0.0]);
    }

    #[test]
    fn test_no_skin_without_influences() {
        let arm = armature();
        let binding = SkinBinding {
            armature_name: "Rig",
            armature: &arm,
            mesh_world: Mat4::IDENTITY,
            armature_world: Mat4::IDENTITY,
        };
        assert!(MeshSkin::new(&binding, &[]).is_none());
    }
}
