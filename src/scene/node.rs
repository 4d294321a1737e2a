//! Scene node records.

use serde::{Deserialize, Serialize};

use crate::util::{Mat4, Vec3};

/// Index of a node in its scene source.
pub type NodeId = usize;

/// A node of the source scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    /// Parent node, `None` for roots.
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub properties: NodeProperties,
    #[serde(default)]
    pub kind: NodeKind,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            parent: None,
            properties: NodeProperties::default(),
            kind,
        }
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Mesh exported as a series of per-frame morph targets.
    pub fn is_baked(&self) -> bool {
        self.properties.bake_type == BakeType::MorphTargets
    }
}

/// Per-node export flags and runtime hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeProperties {
    /// When false the node and its descendants are skipped.
    pub export: bool,
    pub visible_specific: bool,
    pub collidable_specific: bool,
    pub billboard_mode: BillboardMode,
    pub depth_sort_priority: f32,
    pub bounding_volume_scale: f32,
    /// Children of this node form an LOD group.
    pub lod_group: bool,
    pub lod_group_draw_distance_max: f32,
    pub lod_level_draw_distance_min: f32,
    pub bake_type: BakeType,
}

impl Default for NodeProperties {
    fn default() -> Self {
        Self {
            export: true,
            visible_specific: true,
            collidable_specific: true,
            billboard_mode: BillboardMode::Disabled,
            depth_sort_priority: 0.0,
            bounding_volume_scale: 1.0,
            lod_group: false,
            lod_group_draw_distance_max: 0.0,
            lod_level_draw_distance_min: 0.0,
            bake_type: BakeType::None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillboardMode {
    #[default]
    Disabled,
    Billboard,
    Upright,
}

impl BillboardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillboardMode::Disabled => "Disabled",
            BillboardMode::Billboard => "Billboard",
            BillboardMode::Upright => "Upright",
        }
    }
}

/// How a node's geometry is exported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BakeType {
    #[default]
    None,
    /// Evaluate with all deformation applied and export the shape animation
    /// as one morph target per changed frame.
    MorphTargets,
}

/// Type-specific payload of a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    #[default]
    Empty,
    Camera,
    HelperSphere {
        radius: f32,
    },
    Light(Light),
    Mesh(MeshInstance),
    Armature(Armature),
}

/// Mesh data referenced by a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshInstance {
    /// Name of the mesh data, shared between instancing nodes.
    pub mesh: String,
    /// Name of the armature node deforming this mesh.
    #[serde(default)]
    pub armature: Option<String>,
    /// Non-reference shape keys, in key order.
    #[serde(default)]
    pub shape_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
    /// Not supported by the runtime; exported as a plain scene node.
    Area,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightBakeType {
    #[default]
    Dynamic,
    Indirect,
    DirectAndIndirect,
}

impl LightBakeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightBakeType::Dynamic => "Dynamic",
            LightBakeType::Indirect => "Indirect",
            LightBakeType::DirectAndIndirect => "DirectAndIndirect",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    #[serde(default = "white")]
    pub color: Vec3,
    #[serde(default)]
    pub intensity: f32,
    /// Cutoff distance for point and spot lights.
    #[serde(default)]
    pub range: f32,
    /// Full cone angle in radians.
    #[serde(default)]
    pub spot_size: f32,
    #[serde(default)]
    pub spot_blend: f32,
    #[serde(default)]
    pub bake_type: LightBakeType,
}

fn white() -> Vec3 {
    Vec3::ONE
}

/// Bone hierarchy of an armature node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Armature {
    /// Bones in armature order. Parents precede their children.
    pub bones: Vec<Bone>,
}

impl Armature {
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Indices of bones whose parent is `parent`, in armature order.
    pub fn children(&self, parent: Option<usize>) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.parent == parent)
            .map(|(i, _)| i)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    #[serde(default)]
    pub parent: Option<usize>,
    /// Rest transform in armature space.
    #[serde(default = "identity")]
    pub rest: Mat4,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}
