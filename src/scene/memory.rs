//! In-memory scene source.
//!
//! Scenes are plain data, usually deserialized from JSON. Animated values
//! are [`Track`]s holding the last key at or before the current frame.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DisplayState, Material, MeshGeometry, NodeId, NodeKind, SceneNode, SceneSource};
use crate::util::{Error, Mat4, Result, Vec3};

/// Value at a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key<T> {
    pub frame: i32,
    pub value: T,
}

/// A value that is either constant or keyed by frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Track<T> {
    Constant(T),
    Keyed(Vec<Key<T>>),
}

impl<T: Default> Default for Track<T> {
    fn default() -> Self {
        Track::Constant(T::default())
    }
}

impl<T> Track<T> {
    /// Build a keyed track from (frame, value) pairs in any order.
    pub fn keyed(keys: impl IntoIterator<Item = (i32, T)>) -> Self {
        let mut keys: Vec<_> = keys
            .into_iter()
            .map(|(frame, value)| Key { frame, value })
            .collect();
        keys.sort_by_key(|k| k.frame);
        Track::Keyed(keys)
    }

    /// Value of the last key at or before `frame`, or the first key when
    /// `frame` precedes every key. `None` for an empty keyed track.
    pub fn at(&self, frame: i32) -> Option<&T> {
        match self {
            Track::Constant(v) => Some(v),
            Track::Keyed(keys) => {
                let after = keys.partition_point(|k| k.frame <= frame);
                keys.get(after.saturating_sub(1)).map(|k| &k.value)
            }
        }
    }

    fn sort(&mut self) {
        if let Track::Keyed(keys) = self {
            keys.sort_by_key(|k| k.frame);
        }
    }
}

/// Shape key of a mesh: replacement data applied on top of the base mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeKeyData {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub vertex_normals: Option<Vec<Vec3>>,
    pub loop_normals: Option<Vec<Vec3>>,
    pub loop_tangents: Option<Vec<Vec3>>,
}

impl ShapeKeyData {
    fn apply(&self, base: &MeshGeometry) -> MeshGeometry {
        let mut mesh = base.clone();
        mesh.positions = self.positions.clone();
        if let Some(normals) = &self.vertex_normals {
            mesh.vertex_normals = normals.clone();
        }
        if let Some(normals) = &self.loop_normals {
            mesh.loop_normals = normals.clone();
        }
        if let Some(tangents) = &self.loop_tangents {
            mesh.loop_tangents = Some(tangents.clone());
        }
        mesh
    }
}

/// Mesh data shared by the nodes instancing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshData {
    pub base: MeshGeometry,
    pub shape_keys: Vec<ShapeKeyData>,
}

/// A scene node together with its animated state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNode {
    #[serde(flatten)]
    pub node: SceneNode,
    #[serde(default)]
    pub world: Track<Mat4>,
    /// Armature-space pose per bone. Missing bones stay at rest.
    #[serde(default)]
    pub bone_poses: Vec<Track<Mat4>>,
    #[serde(default)]
    pub shape_key_weights: BTreeMap<String, Track<f32>>,
    /// Fully deformed geometry per frame, for meshes baked as morph targets.
    #[serde(default)]
    pub evaluated: Option<Track<MeshGeometry>>,
}

impl MemoryNode {
    pub fn new(node: SceneNode) -> Self {
        Self {
            node,
            world: Track::default(),
            bone_poses: Vec::new(),
            shape_key_weights: BTreeMap::new(),
            evaluated: None,
        }
    }
}

fn default_frame_rate() -> u32 {
    24
}

/// Scene source backed by plain data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryScene {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default)]
    pub current_frame: i32,
    #[serde(default)]
    pub nodes: Vec<MemoryNode>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub meshes: BTreeMap<String, MeshData>,
    #[serde(skip)]
    display: HashMap<NodeId, DisplayState>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            ..Default::default()
        }
    }

    /// Parse and validate a JSON scene description.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut scene: Self = serde_json::from_str(text)?;
        for node in &mut scene.nodes {
            node.world.sort();
            node.bone_poses.iter_mut().for_each(Track::sort);
            node.shape_key_weights.values_mut().for_each(Track::sort);
            if let Some(track) = &mut node.evaluated {
                track.sort();
            }
        }
        scene.validate()?;
        debug!(
            nodes = scene.nodes.len(),
            materials = scene.materials.len(),
            meshes = scene.meshes.len(),
            "loaded scene"
        );
        Ok(scene)
    }

    /// Load a JSON scene description from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_json(&text)
    }

    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        self.nodes.push(MemoryNode::new(node));
        self.nodes.len() - 1
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut MemoryNode {
        &mut self.nodes[id]
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.push(material);
    }

    pub fn add_mesh(&mut self, name: impl Into<String>, base: MeshGeometry) -> &mut MeshData {
        let entry = self.meshes.entry(name.into()).or_default();
        entry.base = base;
        entry
    }

    /// Check parent links for dangling references and cycles.
    pub fn validate(&self) -> Result<()> {
        let count = self.nodes.len();
        for (id, node) in self.nodes.iter().enumerate() {
            let mut parent = node.node.parent;
            let mut steps = 0;
            while let Some(p) = parent {
                if p >= count {
                    return Err(Error::invalid(format!(
                        "node \"{}\" has missing parent {}",
                        node.node.name, p
                    )));
                }
                steps += 1;
                if p == id || steps > count {
                    return Err(Error::invalid(format!(
                        "node \"{}\" is its own ancestor",
                        node.node.name
                    )));
                }
                parent = self.nodes[p].node.parent;
            }
        }
        Ok(())
    }

    fn mesh_data(&self, id: NodeId) -> Result<&MeshData> {
        let node = &self.nodes[id].node;
        match &node.kind {
            NodeKind::Mesh(instance) => self
                .meshes
                .get(&instance.mesh)
                .ok_or_else(|| Error::MissingMesh(node.name.clone())),
            _ => Err(Error::MissingMesh(node.name.clone())),
        }
    }
}

impl SceneSource for MemoryScene {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id].node
    }

    fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    fn current_frame(&self) -> i32 {
        self.current_frame
    }

    fn set_frame(&mut self, frame: i32) {
        self.current_frame = frame;
    }

    fn world_transform(&self, id: NodeId) -> Mat4 {
        self.nodes[id]
            .world
            .at(self.current_frame)
            .copied()
            .unwrap_or(Mat4::IDENTITY)
    }

    fn bone_pose(&self, armature: NodeId, bone: usize) -> Mat4 {
        let node = &self.nodes[armature];
        if let Some(pose) = node.bone_poses.get(bone).and_then(|t| t.at(self.current_frame)) {
            return *pose;
        }
        match &node.node.kind {
            NodeKind::Armature(a) => a.bones.get(bone).map_or(Mat4::IDENTITY, |b| b.rest),
            _ => Mat4::IDENTITY,
        }
    }

    fn shape_key_weight(&self, id: NodeId, key: &str) -> f32 {
        self.nodes[id]
            .shape_key_weights
            .get(key)
            .and_then(|t| t.at(self.current_frame))
            .copied()
            .unwrap_or(0.0)
    }

    fn base_mesh(&self, id: NodeId) -> Result<Cow<'_, MeshGeometry>> {
        Ok(Cow::Borrowed(&self.mesh_data(id)?.base))
    }

    fn evaluate_mesh(&self, id: NodeId) -> Result<Cow<'_, MeshGeometry>> {
        let data = self.mesh_data(id)?;
        let state = self.display_state(id);

        if let (true, Some(key)) = (state.show_only_shape_key, state.active_shape_key) {
            let node = &self.nodes[id].node;
            let name = match &node.kind {
                NodeKind::Mesh(instance) => instance.shape_keys.get(key),
                _ => None,
            };
            let shape = name.and_then(|n| data.shape_keys.iter().find(|s| &s.name == n));
            return match shape {
                Some(shape) => Ok(Cow::Owned(shape.apply(&data.base))),
                None => Err(Error::invalid(format!(
                    "node \"{}\" has no shape key {}",
                    node.name, key
                ))),
            };
        }

        let evaluated = self.nodes[id]
            .evaluated
            .as_ref()
            .and_then(|track| track.at(self.current_frame));
        Ok(Cow::Borrowed(evaluated.unwrap_or(&data.base)))
    }

    fn display_state(&self, id: NodeId) -> DisplayState {
        self.display.get(&id).copied().unwrap_or_default()
    }

    fn set_display_state(&mut self, id: NodeId, state: DisplayState) {
        if state == DisplayState::default() {
            self.display.remove(&id);
        } else {
            self.display.insert(id, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MeshInstance;

    #[test]
    fn test_track_hold_last_key() {
        let track = Track::keyed([(5, 2.0f32), (1, 1.0), (10, 3.0)]);
        assert_eq!(track.at(0), Some(&1.0));
        assert_eq!(track.at(1), Some(&1.0));
        assert_eq!(track.at(7), Some(&2.0));
        assert_eq!(track.at(99), Some(&3.0));
        assert_eq!(Track::<f32>::Keyed(vec![]).at(1), None);
        assert_eq!(Track::Constant(4.0f32).at(-3), Some(&4.0));
    }

    #[test]
    fn test_from_json() {
        let scene = MemoryScene::from_json(
            r#"{
                "frame_rate": 30,
                "nodes": [
                    { "name": "Root" },
                    { "name": "Child", "parent": 0,
                      "world": [ { "frame": 2, "value": [1,0,0,0, 0,1,0,0, 0,0,1,0, 5,0,0,1] } ] }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(scene.frame_rate(), 30);
        assert_eq!(scene.children(None), vec![0]);
        assert_eq!(scene.children(Some(0)), vec![1]);
        assert_eq!(scene.find_node("Child"), Some(1));
        assert_eq!(scene.world_transform(1).w_axis.x, 5.0);
        assert_eq!(scene.world_transform(0), Mat4::IDENTITY);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut scene = MemoryScene::new();
        let a = scene.add_node(SceneNode::new("A", NodeKind::Empty));
        let b = scene.add_node(SceneNode::new("B", NodeKind::Empty).with_parent(a));
        scene.node_mut(a).node.parent = Some(b);
        assert!(scene.validate().is_err());
    }

    #[test]
    fn test_shape_key_evaluation() {
        let mut scene = MemoryScene::new();
        let id = scene.add_node(SceneNode::new(
            "Blob",
            NodeKind::Mesh(MeshInstance {
                mesh: "BlobMesh".into(),
                armature: None,
                shape_keys: vec!["Up".into()],
            }),
        ));
        let base = MeshGeometry {
            positions: vec![Vec3::ZERO],
            ..Default::default()
        };
        scene.add_mesh("BlobMesh", base).shape_keys.push(ShapeKeyData {
            name: "Up".into(),
            positions: vec![Vec3::Z],
            ..Default::default()
        });

        assert_eq!(scene.evaluate_mesh(id).unwrap().positions[0], Vec3::ZERO);
        scene.set_display_state(id, DisplayState::isolated_shape_key(0));
        assert_eq!(scene.evaluate_mesh(id).unwrap().positions[0], Vec3::Z);
        scene.set_display_state(id, DisplayState::isolated_shape_key(3));
        assert!(scene.evaluate_mesh(id).is_err());
    }

    #[test]
    fn test_missing_mesh() {
        let mut scene = MemoryScene::new();
        let id = scene.add_node(SceneNode::new("Empty", NodeKind::Empty));
        assert!(matches!(scene.base_mesh(id), Err(Error::MissingMesh(_))));
    }
}
