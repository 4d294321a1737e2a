//! Per-frame samplers.
//!
//! Each sampler records values while the exporter steps through the frame
//! range, then turns them into channels with `export`, which consumes it.

use tracing::trace;

use super::channel::AnimationChannel;
use super::sample::Sample;
use crate::document::Value;
use crate::mesh::Mesh;
use crate::scene::{NodeId, NodeKind, SceneSource};
use crate::util::{relative_transform, Decomposed, Mat4, Quat, Result, Vec3};

/// Something with a transform relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformEntity {
    Node(NodeId),
    /// Bone `bone` of the armature node `armature`.
    Bone { armature: NodeId, bone: usize },
}

impl TransformEntity {
    /// Transform relative to the parent at the current frame. Nodes are
    /// relative to their parent's world transform, bones to their parent
    /// bone's pose in armature space.
    pub fn local_transform<S: SceneSource + ?Sized>(&self, source: &S) -> Mat4 {
        match *self {
            TransformEntity::Node(id) => {
                let parent = source.node(id).parent.map(|p| source.world_transform(p));
                relative_transform(parent.as_ref(), &source.world_transform(id))
            }
            TransformEntity::Bone { armature, bone } => {
                let parent = match &source.node(armature).kind {
                    NodeKind::Armature(a) => a.bones.get(bone).and_then(|b| b.parent),
                    _ => None,
                };
                let parent_pose = parent.map(|p| source.bone_pose(armature, p));
                relative_transform(parent_pose.as_ref(), &source.bone_pose(armature, bone))
            }
        }
    }

    /// `(TargetObject, TargetObjectAncestor)` for this entity's channels.
    pub fn target<S: SceneSource + ?Sized>(&self, source: &S) -> (String, Option<String>) {
        match *self {
            TransformEntity::Node(id) => (source.node(id).name.clone(), None),
            TransformEntity::Bone { armature, bone } => {
                let node = source.node(armature);
                let name = match &node.kind {
                    NodeKind::Armature(a) => a.bones.get(bone).map(|b| b.name.clone()),
                    _ => None,
                };
                (name.unwrap_or_default(), Some(node.name.clone()))
            }
        }
    }
}

/// Samples position, rotation and scale of a node or bone.
#[derive(Debug, Clone)]
pub struct TransformSampler {
    entity: TransformEntity,
    object: String,
    ancestor: Option<String>,
    position: Vec<Sample<Vec3>>,
    rotation: Vec<Sample<Quat>>,
    scale: Vec<Sample<Vec3>>,
}

impl TransformSampler {
    pub fn new<S: SceneSource + ?Sized>(entity: TransformEntity, source: &S) -> Self {
        let (object, ancestor) = entity.target(source);
        Self {
            entity,
            object,
            ancestor,
            position: Vec::new(),
            rotation: Vec::new(),
            scale: Vec::new(),
        }
    }

    pub fn entity(&self) -> TransformEntity {
        self.entity
    }

    pub fn sample<S: SceneSource + ?Sized>(&mut self, source: &S) {
        let frame = source.current_frame();
        let local = Decomposed::from_matrix(&self.entity.local_transform(source));
        self.position.push(Sample::new(frame, local.position));
        self.rotation.push(Sample::new(frame, local.rotation));
        self.scale.push(Sample::new(frame, local.scale));
    }

    /// `PositionOffset`, `Rotation` and `Scale` channels.
    pub fn export(self) -> Vec<AnimationChannel> {
        vec![
            AnimationChannel::from_samples(&self.object, "PositionOffset", self.position)
                .with_ancestor(self.ancestor.clone()),
            AnimationChannel::from_samples(&self.object, "Rotation", self.rotation)
                .with_ancestor(self.ancestor.clone()),
            AnimationChannel::from_samples(&self.object, "Scale", self.scale).with_ancestor(self.ancestor),
        ]
    }
}

/// Samples the weight of one shape key.
#[derive(Debug, Clone)]
pub struct WeightSampler {
    node: NodeId,
    object: String,
    key: String,
    samples: Vec<Sample<f32>>,
}

impl WeightSampler {
    pub fn new(node: NodeId, object: &str, key: &str) -> Self {
        Self {
            node,
            object: object.to_string(),
            key: key.to_string(),
            samples: Vec::new(),
        }
    }

    pub fn sample<S: SceneSource + ?Sized>(&mut self, source: &S) {
        let weight = source.shape_key_weight(self.node, &self.key);
        self.samples.push(Sample::new(source.current_frame(), weight));
    }

    pub fn export(self) -> AnimationChannel {
        AnimationChannel::from_samples(&self.object, "Weight", self.samples).with_morph_target(&self.key)
    }
}

/// Name of the morph target baked for `frame`.
pub fn frame_target_name(frame: i32) -> String {
    format!("Frame{:04}", frame)
}

/// Bakes a node's fully deformed mesh into one morph target per frame.
#[derive(Debug, Clone)]
pub struct BakedMorphSampler {
    node: NodeId,
    object: String,
    mesh: usize,
    frames: Vec<i32>,
}

impl BakedMorphSampler {
    /// `mesh` indexes the exporter's mesh list; it is handed back to
    /// [`sample`](Self::sample) on every frame.
    pub fn new(node: NodeId, object: &str, mesh: usize) -> Self {
        Self {
            node,
            object: object.to_string(),
            mesh,
            frames: Vec::new(),
        }
    }

    pub fn mesh_index(&self) -> usize {
        self.mesh
    }

    /// Frames that produced a target so far.
    pub fn frames(&self) -> &[i32] {
        &self.frames
    }

    /// Evaluate the node at the current frame and add a target to every
    /// submesh of `mesh` that changed.
    pub fn sample<S: SceneSource + ?Sized>(&mut self, source: &S, mesh: &mut Mesh) -> Result<()> {
        let frame = source.current_frame();
        let state = source.evaluate_mesh(self.node)?;
        if mesh.add_morph_state(&self.object, &frame_target_name(frame), &state)? {
            self.frames.push(frame);
        } else {
            trace!(node = %self.object, frame, "no change from base mesh");
        }
        Ok(())
    }

    /// One weight channel per baked frame: 1 at the frame and 0 on the
    /// neighbouring frames inside `[first, last]`.
    pub fn export(self, first: i32, last: i32) -> Vec<AnimationChannel> {
        self.frames
            .iter()
            .map(|&frame| {
                let mut points = Vec::with_capacity(3);
                if frame > first {
                    points.push((frame - 1, Value::Double(0.0)));
                }
                points.push((frame, Value::Double(1.0)));
                if frame < last {
                    points.push((frame + 1, Value::Double(0.0)));
                }
                AnimationChannel {
                    object: self.object.clone(),
                    ancestor: None,
                    morph_target: Some(frame_target_name(frame)),
                    property: "Weight".to_string(),
                    value_type: "FloatSplineLinear",
                    points,
                }
            })
            .collect()
    }
}
