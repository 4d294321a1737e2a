//! Scene source abstraction.
//!
//! The exporter reads everything it needs through [`SceneSource`]: the node
//! hierarchy, materials, per-frame transforms and evaluated geometry. The
//! only mutations it performs are moving the current frame and changing a
//! node's [`DisplayState`], both of which are undone by the guards in this
//! module.

mod geometry;
mod guards;
mod material;
mod memory;
mod node;

use std::borrow::Cow;

pub use geometry::{ColorLayer, GroupWeight, MeshGeometry, Triangle, UvLayer};
pub use guards::{DisplayStateGuard, FrameGuard};
pub use material::{AlphaMode, FilterMode, Material, ShadowCastMode, Texture, WrapMode};
pub use memory::{Key, MemoryNode, MemoryScene, MeshData, ShapeKeyData, Track};
pub use node::{
    Armature, BakeType, BillboardMode, Bone, Light, LightBakeType, LightKind, MeshInstance, NodeId,
    NodeKind, NodeProperties, SceneNode,
};

use crate::util::{Mat4, Result};

/// Display settings that affect mesh evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayState {
    /// Index into the node's shape keys.
    pub active_shape_key: Option<usize>,
    /// Evaluate only the active shape key, at full influence.
    pub show_only_shape_key: bool,
    /// Apply armature deformation.
    pub armature_visible: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            active_shape_key: None,
            show_only_shape_key: false,
            armature_visible: true,
        }
    }
}

impl DisplayState {
    /// State isolating a single shape key with deformation disabled.
    pub fn isolated_shape_key(key: usize) -> Self {
        Self {
            active_shape_key: Some(key),
            show_only_shape_key: true,
            armature_visible: false,
        }
    }
}

/// Read access to a scene, plus the frame and display controls needed to
/// sample it.
pub trait SceneSource {
    fn node_count(&self) -> usize;

    fn node(&self, id: NodeId) -> &SceneNode;

    fn material(&self, name: &str) -> Option<&Material>;

    /// Frames per second.
    fn frame_rate(&self) -> u32;

    fn current_frame(&self) -> i32;

    fn set_frame(&mut self, frame: i32);

    /// World transform of a node at the current frame.
    fn world_transform(&self, id: NodeId) -> Mat4;

    /// Pose of a bone in armature space at the current frame.
    fn bone_pose(&self, armature: NodeId, bone: usize) -> Mat4;

    /// Weight of a shape key at the current frame.
    fn shape_key_weight(&self, id: NodeId, key: &str) -> f32;

    /// Undeformed mesh data of a mesh node.
    fn base_mesh(&self, id: NodeId) -> Result<Cow<'_, MeshGeometry>>;

    /// Mesh of a node evaluated at the current frame under its current
    /// display state.
    fn evaluate_mesh(&self, id: NodeId) -> Result<Cow<'_, MeshGeometry>>;

    fn display_state(&self, id: NodeId) -> DisplayState;

    fn set_display_state(&mut self, id: NodeId, state: DisplayState);

    /// First node with the given name.
    fn find_node(&self, name: &str) -> Option<NodeId> {
        (0..self.node_count()).find(|id| self.node(*id).name == name)
    }

    /// Direct children of `parent` (roots for `None`), in source order.
    fn children(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        (0..self.node_count())
            .filter(|id| self.node(*id).parent == parent)
            .collect()
    }
}
