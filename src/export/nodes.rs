//! Scene node, light and bone records.

use crate::document::{Object, Value};
use crate::scene::{Armature, BillboardMode, Light, LightKind, NodeProperties};
use crate::util::{color_rgb8_string, point3f_string, quaternion_string, relative_transform, Decomposed, Mat4};

/// Default node `Type`.
pub const SCENE_NODE_TYPE: &str = "SceneNode";

/// Write `PositionOffset`, `Rotation` and, when not unit, `Scale`.
pub fn write_transform(obj: &mut Object, local: &Mat4) {
    let d = Decomposed::from_matrix(local);
    obj.insert("PositionOffset", point3f_string(d.position));
    obj.insert("Rotation", quaternion_string(d.rotation));
    if d.has_scale() {
        obj.insert("Scale", point3f_string(d.scale));
    }
}

/// Write the runtime hints that differ from their defaults.
pub fn write_properties(obj: &mut Object, props: &NodeProperties, parent_is_lod_group: bool) {
    if !props.visible_specific {
        obj.insert("VisibleSpecific", false);
    }
    if !props.collidable_specific {
        obj.insert("CollidableSpecific", false);
    }
    if props.billboard_mode != BillboardMode::Disabled {
        obj.insert("BillboardMode", props.billboard_mode.as_str());
    }
    if props.depth_sort_priority != 0.0 {
        obj.insert("DepthSortPriority", props.depth_sort_priority);
    }
    if props.bounding_volume_scale != 1.0 {
        obj.insert("BoundingVolumeScale", props.bounding_volume_scale);
    }
    if props.lod_group {
        obj.insert("LODGroup", true);
        if props.lod_group_draw_distance_max > 0.0 {
            obj.insert("LODGroupDrawDistanceMax", props.lod_group_draw_distance_max);
        }
    }
    if parent_is_lod_group && props.lod_level_draw_distance_min > 0.0 {
        obj.insert("LODLevelDrawDistanceMin", props.lod_level_draw_distance_min);
    }
}

/// Write light keys and set `Type` to `Light`. Area lights have no runtime
/// counterpart and are left untouched.
pub fn write_light(obj: &mut Object, light: &Light) {
    let light_type = match light.kind {
        LightKind::Directional => "Directional",
        LightKind::Point => "Point",
        LightKind::Spot => {
            obj.insert("LightConeAngleOuter", (light.spot_size as f64).to_degrees());
            obj.insert("LightConeAngleBlending", light.spot_blend);
            "Spot"
        }
        LightKind::Area => return,
    };
    if matches!(light.kind, LightKind::Point | LightKind::Spot) {
        obj.insert("LightRange", light.range);
    }
    obj.insert("Type", "Light");
    obj.insert("LightType", light_type);
    obj.insert("LightColor", color_rgb8_string(light.color));
    obj.insert("LightIntensity", light.intensity);
    obj.insert("LightBakeType", light.bake_type.as_str());
}

/// Bone indices in depth-first order, roots in armature order.
pub fn bone_order(armature: &Armature) -> Vec<usize> {
    fn visit(armature: &Armature, parent: Option<usize>, out: &mut Vec<usize>) {
        for bone in armature.children(parent) {
            out.push(bone);
            visit(armature, Some(bone), out);
        }
    }
    let mut order = Vec::with_capacity(armature.bones.len());
    visit(armature, None, &mut order);
    order
}

/// Scene nodes for the bones under `parent`, posed at rest.
pub fn bone_nodes(armature: &Armature, parent: Option<usize>) -> Vec<Value> {
    armature
        .children(parent)
        .map(|index| {
            let bone = &armature.bones[index];
            let parent_rest = bone.parent.and_then(|p| armature.bones.get(p)).map(|p| p.rest);
            let mut obj = Object::new()
                .with("Name", bone.name.as_str())
                .with("Type", SCENE_NODE_TYPE);
            write_transform(&mut obj, &relative_transform(parent_rest.as_ref(), &bone.rest));
            let children = bone_nodes(armature, Some(index));
            if !children.is_empty() {
                obj.insert("Children", children);
            }
            obj.into()
        })
        .collect()
}
