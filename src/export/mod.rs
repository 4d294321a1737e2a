//! Scene to document conversion.
//!
//! [`Exporter::build_document`] walks the node hierarchy depth-first,
//! converting nodes, materials and meshes and creating a sampler for every
//! animated property. When animation export is enabled the frame range is
//! then stepped through once, every sampler recording its value at each
//! frame, and the samplers are turned into channels.
//!
//! Scene state touched during export (current frame, shape key display
//! settings) is changed through guards and restored on return, including
//! when an error aborts the export.

mod materials;
mod nodes;

pub use materials::{material_object, texture_object};
pub use nodes::{bone_nodes, bone_order, write_light, write_properties, write_transform, SCENE_NODE_TYPE};

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, info_span, trace, warn};

use crate::anim::{BakedMorphSampler, TransformEntity, TransformSampler, WeightSampler};
use crate::config::ExportSettings;
use crate::container::ContainerWriter;
use crate::document::{Object, Value};
use crate::mesh::{AttributeLayout, Mesh, SkinBinding};
use crate::scene::{
    DisplayState, DisplayStateGuard, FrameGuard, MeshInstance, NodeId, NodeKind, SceneNode, SceneSource,
};
use crate::util::Result;

/// Counts gathered by one export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub nodes: usize,
    pub meshes: usize,
    pub materials: usize,
    pub channels: usize,
    pub skipped_meshes: usize,
}

/// Everything collected while walking the hierarchy.
#[derive(Default)]
struct Gathered {
    meshes: Vec<Mesh>,
    mesh_index: HashMap<String, usize>,
    materials: Object,
    node_samplers: Vec<TransformSampler>,
    bone_samplers: Vec<TransformSampler>,
    weight_samplers: Vec<WeightSampler>,
    baked_samplers: Vec<BakedMorphSampler>,
    stats: ExportStats,
}

/// Converts a [`SceneSource`] into a document.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    settings: ExportSettings,
}

impl Exporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Build the document for `source`.
    pub fn build_document<S: SceneSource + ?Sized>(&self, source: &mut S) -> Result<Object> {
        self.build_document_with_stats(source).map(|(doc, _)| doc)
    }

    /// Build the document for `source`, also returning what was gathered.
    pub fn build_document_with_stats<S: SceneSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<(Object, ExportStats)> {
        let _span = info_span!("build_document").entered();
        let first = self.settings.first_frame();
        let mut source = FrameGuard::new(source, first);
        let mut gathered = Gathered::default();

        let mut root_children = Vec::new();
        for root in source.children(None) {
            if let Some(node) = self.gather_node(&mut *source, root, &mut gathered)? {
                root_children.push(Value::from(node));
            }
        }

        let animation = if self.settings.export_animation {
            Some(self.sample_animation(&mut *source, &mut gathered)?)
        } else {
            None
        };
        drop(source);

        let mut doc = Object::new();
        doc.object_mut("Scene")
            .object_mut("Root")
            .insert("Children", root_children);
        if !gathered.meshes.is_empty() {
            let meshes = doc.object_mut("Meshes");
            for mesh in &gathered.meshes {
                meshes.insert(mesh.name.as_str(), mesh.to_object());
            }
        }
        if !gathered.materials.is_empty() {
            doc.insert("Materials", gathered.materials);
        }
        if let Some(animation) = animation {
            doc.insert("Animation", animation);
        }

        let mut stats = gathered.stats;
        stats.meshes = gathered.meshes.len();
        info!(
            nodes = stats.nodes,
            meshes = stats.meshes,
            materials = stats.materials,
            channels = stats.channels,
            "built document"
        );
        Ok((doc, stats))
    }

    /// Build the document and write it to `path` as a container. Returns the
    /// number of bytes written.
    pub fn export_file<S: SceneSource + ?Sized>(&self, source: &mut S, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        let _span = info_span!("export", path = %path.display()).entered();
        let doc = self.build_document(source)?;
        let written = ContainerWriter::new(self.settings.compression_level).write_file(path, &doc)?;
        info!(bytes = written, "export complete");
        Ok(written)
    }

    /// Convert `id` and its exported descendants. `None` when the node is
    /// excluded from export.
    fn gather_node<S: SceneSource + ?Sized>(
        &self,
        source: &mut S,
        id: NodeId,
        gathered: &mut Gathered,
    ) -> Result<Option<Object>> {
        let node = source.node(id).clone();
        if !node.properties.export && !self.settings.ignore_export_flags {
            debug!(node = %node.name, "skipping node and descendants");
            return Ok(None);
        }
        trace!(node = %node.name, "gathering node");
        gathered.stats.nodes += 1;

        let mut obj = Object::new().with("Name", node.name.as_str());
        let mut children = Vec::new();

        match &node.kind {
            NodeKind::Empty => {}
            NodeKind::Camera => obj.insert("Type", "Camera"),
            NodeKind::HelperSphere { radius } => {
                obj.insert("Type", "HelperSphere");
                obj.insert("HelperSphereRadius", *radius);
            }
            NodeKind::Light(light) => write_light(&mut obj, light),
            NodeKind::Mesh(instance) => {
                obj.insert("Type", "Mesh");
                obj.insert("Mesh", instance.mesh.as_str());
                self.gather_mesh(source, id, &node, instance, gathered)?;
            }
            NodeKind::Armature(armature) => {
                children.extend(bone_nodes(armature, None));
                for bone in bone_order(armature) {
                    let entity = TransformEntity::Bone { armature: id, bone };
                    gathered.bone_samplers.push(TransformSampler::new(entity, &*source));
                }
            }
        }
        if !obj.contains_key("Type") {
            obj.insert("Type", SCENE_NODE_TYPE);
        }

        write_transform(&mut obj, &TransformEntity::Node(id).local_transform(&*source));
        let parent_is_lod_group = node
            .parent
            .is_some_and(|p| source.node(p).properties.lod_group);
        write_properties(&mut obj, &node.properties, parent_is_lod_group);
        gathered
            .node_samplers
            .push(TransformSampler::new(TransformEntity::Node(id), &*source));

        for child in source.children(Some(id)) {
            if let Some(child) = self.gather_node(source, child, gathered)? {
                children.push(child.into());
            }
        }
        if !children.is_empty() {
            obj.insert("Children", children);
        }
        Ok(Some(obj))
    }

    /// Convert the mesh of node `id` and register its morph samplers.
    ///
    /// Unbaked meshes shared by several nodes are converted once; baked
    /// meshes are converted per node, the last one winning.
    fn gather_mesh<S: SceneSource + ?Sized>(
        &self,
        source: &mut S,
        id: NodeId,
        node: &SceneNode,
        instance: &MeshInstance,
        gathered: &mut Gathered,
    ) -> Result<()> {
        let baked = node.is_baked();
        if !baked && gathered.mesh_index.contains_key(&instance.mesh) {
            trace!(node = %node.name, mesh = %instance.mesh, "mesh already converted");
            self.add_weight_samplers(id, node, instance, gathered);
            return Ok(());
        }

        let geometry = if baked {
            source.evaluate_mesh(id)?.into_owned()
        } else {
            source.base_mesh(id)?.into_owned()
        };
        geometry.validate()?;

        let used: Vec<&str> = geometry
            .used_material_slots()
            .into_iter()
            .filter_map(|slot| geometry.materials.get(slot).and_then(Option::as_deref))
            .collect();
        if used.is_empty() {
            warn!(node = %node.name, mesh = %instance.mesh, "mesh has no materials, skipping");
            gathered.stats.skipped_meshes += 1;
            return Ok(());
        }

        let mut tangents = false;
        let mut smooth_normals = false;
        for name in &used {
            match source.material(name) {
                Some(material) => {
                    tangents |= material.requires_tangents();
                    smooth_normals |= material.requires_smooth_normals();
                    if !gathered.materials.contains_key(name) {
                        gathered.materials.insert(*name, material_object(material));
                        gathered.stats.materials += 1;
                    }
                }
                None => {
                    warn!(material = %name, "unknown material, exporting without parameters");
                    if !gathered.materials.contains_key(name) {
                        gathered.materials.insert(*name, Object::new());
                        gathered.stats.materials += 1;
                    }
                }
            }
        }

        let layout = AttributeLayout::new(&instance.mesh, &geometry, tangents, smooth_normals);
        let mut mesh = {
            let binding = if baked { None } else { self.skin_binding(&*source, id, node, instance) };
            Mesh::build(&instance.mesh, &geometry, layout, binding)
        };

        if !baked && !instance.shape_keys.is_empty() {
            let mut guard = DisplayStateGuard::new(source, id);
            for (index, key) in instance.shape_keys.iter().enumerate() {
                guard.set(DisplayState::isolated_shape_key(index));
                let state = guard.evaluate_mesh(id)?;
                if !mesh.add_morph_state(&node.name, key, &state)? {
                    debug!(node = %node.name, key = %key, "shape key leaves mesh unchanged");
                }
            }
        }

        let index = match gathered.mesh_index.get(&instance.mesh) {
            Some(&existing) => {
                debug!(mesh = %instance.mesh, node = %node.name, "replacing baked mesh");
                gathered.meshes[existing] = mesh;
                existing
            }
            None => {
                gathered.meshes.push(mesh);
                gathered.mesh_index.insert(instance.mesh.clone(), gathered.meshes.len() - 1);
                gathered.meshes.len() - 1
            }
        };

        if baked {
            gathered
                .baked_samplers
                .push(BakedMorphSampler::new(id, &node.name, index));
        } else {
            self.add_weight_samplers(id, node, instance, gathered);
        }
        Ok(())
    }

    fn add_weight_samplers(&self, id: NodeId, node: &SceneNode, instance: &MeshInstance, gathered: &mut Gathered) {
        for key in &instance.shape_keys {
            gathered
                .weight_samplers
                .push(WeightSampler::new(id, &node.name, key));
        }
    }

    /// Skin binding for a mesh deformed by an armature node, if it resolves.
    fn skin_binding<'a, S: SceneSource + ?Sized>(
        &self,
        source: &'a S,
        id: NodeId,
        node: &SceneNode,
        instance: &'a MeshInstance,
    ) -> Option<SkinBinding<'a>> {
        let armature_name = instance.armature.as_deref()?;
        let armature_id = source.find_node(armature_name);
        let armature = armature_id.map(|a| &source.node(a).kind);
        match (armature_id, armature) {
            (Some(armature_id), Some(NodeKind::Armature(armature))) => Some(SkinBinding {
                armature_name,
                armature,
                mesh_world: source.world_transform(id),
                armature_world: source.world_transform(armature_id),
            }),
            _ => {
                warn!(node = %node.name, armature = %armature_name, "armature not found, exporting unskinned");
                None
            }
        }
    }

    /// Step through the frame range and turn every sampler into channels.
    fn sample_animation<S: SceneSource + ?Sized>(&self, source: &mut S, gathered: &mut Gathered) -> Result<Object> {
        let first = self.settings.first_frame();
        let last = self.settings.last_frame();
        let _span = info_span!("sample_animation", first, last).entered();

        for frame in first..=last {
            source.set_frame(frame);
            for sampler in &mut gathered.node_samplers {
                sampler.sample(&*source);
            }
            for sampler in &mut gathered.bone_samplers {
                sampler.sample(&*source);
            }
            for sampler in &mut gathered.weight_samplers {
                sampler.sample(&*source);
            }
            for sampler in &mut gathered.baked_samplers {
                let mesh = &mut gathered.meshes[sampler.mesh_index()];
                sampler.sample(&*source, mesh)?;
            }
        }

        let mut channels: Vec<Value> = Vec::new();
        for sampler in gathered.node_samplers.drain(..) {
            channels.extend(sampler.export().into_iter().map(|c| c.to_object().into()));
        }
        for sampler in gathered.bone_samplers.drain(..) {
            channels.extend(sampler.export().into_iter().map(|c| c.to_object().into()));
        }
        for sampler in gathered.weight_samplers.drain(..) {
            channels.push(sampler.export().to_object().into());
        }
        for sampler in gathered.baked_samplers.drain(..) {
            channels.extend(sampler.export(first, last).into_iter().map(|c| c.to_object().into()));
        }
        gathered.stats.channels = channels.len();
        debug!(channels = channels.len(), "sampled animation");

        Ok(Object::new()
            .with("FrameRate", source.frame_rate())
            .with("FrameBegin", first)
            .with("FrameEnd", last)
            .with("Channels", channels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{
        Armature, Bone, Light, LightBakeType, LightKind, Material, MemoryScene, MeshGeometry, ShapeKeyData, Track,
        Triangle,
    };
    use crate::util::{Mat4, Vec3};

    fn triangle(material: &str) -> MeshGeometry {
        MeshGeometry {
            positions: vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)],
            loop_normals: vec![Vec3::Z; 3],
            triangles: vec![Triangle { vertices: [0, 1, 2], loops: [0, 1, 2], material: 0 }],
            materials: vec![Some(material.into())],
            ..Default::default()
        }
    }

    fn mesh_node(name: &str, mesh: &str) -> SceneNode {
        SceneNode::new(
            name,
            NodeKind::Mesh(MeshInstance {
                mesh: mesh.into(),
                ..Default::default()
            }),
        )
    }

    fn root_children(doc: &Object) -> &[Value] {
        doc.get("Scene")
            .and_then(Value::as_object)
            .and_then(|s| s.get("Root"))
            .and_then(Value::as_object)
            .and_then(|r| r.get("Children"))
            .and_then(Value::as_array)
            .unwrap()
    }

    fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
        value.as_object().and_then(|o| o.get(key))
    }

    #[test]
    fn test_empty_scene() {
        let mut scene = MemoryScene::new();
        let doc = Exporter::default().build_document(&mut scene).unwrap();
        assert!(root_children(&doc).is_empty());
        assert!(!doc.contains_key("Meshes"));
        assert!(!doc.contains_key("Materials"));
        assert!(!doc.contains_key("Animation"));
    }

    #[test]
    fn test_hierarchy_and_types() {
        let mut scene = MemoryScene::new();
        let root = scene.add_node(SceneNode::new("Root", NodeKind::Empty));
        let cam = scene.add_node(SceneNode::new("Cam", NodeKind::Camera).with_parent(root));
        scene.add_node(SceneNode::new("Marker", NodeKind::HelperSphere { radius: 2.5 }).with_parent(root));
        scene.add_node(SceneNode::new(
            "Sun",
            NodeKind::Light(Light {
                kind: LightKind::Directional,
                color: Vec3::ONE,
                intensity: 3.0,
                range: 0.0,
                spot_size: 0.0,
                spot_blend: 0.0,
                bake_type: LightBakeType::Dynamic,
            }),
        ));
        scene.node_mut(root).world = Track::Constant(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        scene.node_mut(cam).world = Track::Constant(Mat4::from_translation(Vec3::new(1.0, 4.0, 0.0)));

        let doc = Exporter::default().build_document(&mut scene).unwrap();
        let roots = root_children(&doc);
        assert_eq!(roots.len(), 2);
        assert_eq!(field(&roots[0], "Type").and_then(Value::as_str), Some("SceneNode"));
        assert_eq!(field(&roots[1], "Type").and_then(Value::as_str), Some("Light"));

        let children = field(&roots[0], "Children").and_then(Value::as_array).unwrap();
        assert_eq!(field(&children[0], "Type").and_then(Value::as_str), Some("Camera"));
        assert_eq!(field(&children[0], "PositionOffset").and_then(Value::as_str), Some("0|4|0"));
        assert_eq!(field(&children[1], "Type").and_then(Value::as_str), Some("HelperSphere"));
        assert_eq!(field(&children[1], "HelperSphereRadius").and_then(Value::as_f64), Some(2.5));
    }

    #[test]
    fn test_export_flag_skips_subtree() {
        let mut scene = MemoryScene::new();
        let hidden = scene.add_node(SceneNode::new("Hidden", NodeKind::Empty));
        scene.add_node(SceneNode::new("Child", NodeKind::Empty).with_parent(hidden));
        scene.node_mut(hidden).node.properties.export = false;

        let doc = Exporter::default().build_document(&mut scene).unwrap();
        assert!(root_children(&doc).is_empty());

        let settings = ExportSettings {
            ignore_export_flags: true,
            ..Default::default()
        };
        let doc = Exporter::new(settings).build_document(&mut scene).unwrap();
        assert_eq!(root_children(&doc).len(), 1);
    }

    #[test]
    fn test_mesh_and_material() {
        let mut scene = MemoryScene::new();
        scene.add_material(Material::new("Red"));
        scene.add_mesh("Tri", triangle("Red"));
        scene.add_node(mesh_node("A", "Tri"));
        scene.add_node(mesh_node("B", "Tri"));

        let (doc, stats) = Exporter::default().build_document_with_stats(&mut scene).unwrap();
        assert_eq!(stats.meshes, 1);
        assert_eq!(stats.nodes, 2);
        let meshes = doc.get("Meshes").and_then(Value::as_object).unwrap();
        assert_eq!(meshes.len(), 1);
        assert!(meshes.contains_key("Tri"));
        let materials = doc.get("Materials").and_then(Value::as_object).unwrap();
        assert_eq!(materials.keys().collect::<Vec<_>>(), vec!["Red"]);
        let roots = root_children(&doc);
        assert_eq!(field(&roots[1], "Mesh").and_then(Value::as_str), Some("Tri"));
    }

    #[test]
    fn test_mesh_without_material_skipped() {
        let mut scene = MemoryScene::new();
        let mut geometry = triangle("Red");
        geometry.materials = vec![None];
        scene.add_mesh("Bare", geometry);
        scene.add_node(mesh_node("Bare", "Bare"));

        let (doc, stats) = Exporter::default().build_document_with_stats(&mut scene).unwrap();
        assert_eq!(stats.skipped_meshes, 1);
        assert!(!doc.contains_key("Meshes"));
        assert_eq!(field(&root_children(&doc)[0], "Type").and_then(Value::as_str), Some("Mesh"));
    }

    #[test]
    fn test_missing_mesh_data_is_error() {
        let mut scene = MemoryScene::new();
        scene.add_node(mesh_node("Ghost", "Nowhere"));
        assert!(Exporter::default().build_document(&mut scene).is_err());
    }

    #[test]
    fn test_armature_bones_precede_children() {
        let mut scene = MemoryScene::new();
        let rig = scene.add_node(SceneNode::new(
            "Rig",
            NodeKind::Armature(Armature {
                bones: vec![Bone { name: "Hip".into(), parent: None, rest: Mat4::IDENTITY }],
            }),
        ));
        scene.add_node(SceneNode::new("Prop", NodeKind::Empty).with_parent(rig));

        let settings = ExportSettings {
            export_animation: true,
            frame_begin: 1,
            frame_end: 2,
            ..Default::default()
        };
        let doc = Exporter::new(settings).build_document(&mut scene).unwrap();
        let children = field(&root_children(&doc)[0], "Children").and_then(Value::as_array).unwrap();
        let names: Vec<_> = children.iter().filter_map(|c| field(c, "Name").and_then(Value::as_str)).collect();
        assert_eq!(names, vec!["Hip", "Prop"]);

        // Rig, Prop: 3 channels each; Hip: 3 channels with an ancestor.
        let channels = doc
            .get("Animation")
            .and_then(Value::as_object)
            .and_then(|a| a.get("Channels"))
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(channels.len(), 9);
        let bone_channel = &channels[6];
        assert_eq!(field(bone_channel, "TargetObject").and_then(Value::as_str), Some("Hip"));
        assert_eq!(field(bone_channel, "TargetObjectAncestor").and_then(Value::as_str), Some("Rig"));
    }

    #[test]
    fn test_shape_key_with_short_loop_data_is_error() {
        let mut scene = MemoryScene::new();
        scene.add_material(Material::new("Red"));
        scene.add_mesh("Tri", triangle("Red")).shape_keys.push(ShapeKeyData {
            name: "K".into(),
            positions: triangle("Red").positions,
            loop_normals: Some(vec![Vec3::Z]),
            ..Default::default()
        });
        let id = scene.add_node(SceneNode::new(
            "Keyed",
            NodeKind::Mesh(MeshInstance {
                mesh: "Tri".into(),
                armature: None,
                shape_keys: vec!["K".into()],
            }),
        ));

        assert!(Exporter::default().build_document(&mut scene).is_err());
        assert_eq!(scene.display_state(id), DisplayState::default());
    }

    #[test]
    fn test_frame_restored() {
        let mut scene = MemoryScene::new();
        scene.current_frame = 42;
        scene.add_node(SceneNode::new("N", NodeKind::Empty));
        let settings = ExportSettings {
            export_animation: true,
            frame_begin: 3,
            frame_end: 5,
            ..Default::default()
        };
        let doc = Exporter::new(settings).build_document(&mut scene).unwrap();
        assert_eq!(scene.current_frame, 42);
        let animation = doc.get("Animation").and_then(Value::as_object).unwrap();
        assert_eq!(animation.get("FrameRate"), Some(&Value::Int32(24)));
        assert_eq!(animation.get("FrameBegin"), Some(&Value::Int32(3)));
        assert_eq!(animation.get("FrameEnd"), Some(&Value::Int32(5)));
    }

    #[test]
    fn test_frame_restored_on_error() {
        let mut scene = MemoryScene::new();
        scene.current_frame = 7;
        scene.add_node(mesh_node("Ghost", "Nowhere"));
        assert!(Exporter::default().build_document(&mut scene).is_err());
        assert_eq!(scene.current_frame, 7);
    }
}
