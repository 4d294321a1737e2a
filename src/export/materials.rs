//! Material records.

use crate::document::Object;
use crate::scene::{AlphaMode, Material, ShadowCastMode, Texture};
use crate::util::{color_rgb8_string, color_rgba8_string, Vec3};

/// Fraction of the specular level used as dielectric reflectance.
const DIELECTRIC_SPECULAR_SCALE: f64 = 0.08;

pub fn texture_object(texture: &Texture) -> Object {
    Object::new()
        .with("Filename", texture.file_stem())
        .with("UVMap", texture.uv_map.as_str())
        .with("FilterMode", texture.filter.as_str())
        .with("WrapModeU", texture.wrap.as_str())
        .with("WrapModeV", texture.wrap.as_str())
}

/// Material entry. Non-standard materials export as an empty object.
pub fn material_object(material: &Material) -> Object {
    let mut obj = Object::new();
    if !material.standard {
        return obj;
    }
    obj.insert("Type", "Standard");

    let pbr = obj.object_mut("PBRMetallicRoughness");
    match &material.base_color_texture {
        Some(texture) => pbr.insert("BaseColorTexture", texture_object(texture)),
        None => pbr.insert("BaseColor", color_rgba8_string(material.base_color)),
    }
    match &material.metallic_roughness_occlusion_texture {
        Some(texture) => pbr.insert("MetallicRoughnessOcclusionTexture", texture_object(texture)),
        None => {
            pbr.insert("Metallic", material.metallic);
            pbr.insert("Roughness", material.roughness);
        }
    }
    pbr.insert("DielectricSpecular", material.specular as f64 * DIELECTRIC_SPECULAR_SCALE);

    if material.two_sided {
        obj.insert("TwoSided", true);
    }
    if !material.back_face_normals_flip {
        obj.insert("BackFaceNormalsFlip", false);
    }
    if material.outline_draw {
        obj.insert("OutlineDraw", true);
    }
    if let Some(texture) = &material.lightmap_texture {
        obj.insert("LightmapTexture", texture_object(texture));
    }
    if let Some(texture) = &material.normal_texture {
        obj.insert("NormalTexture", texture_object(texture));
    }
    match &material.emission_texture {
        Some(texture) => obj.insert("EmissionTexture", texture_object(texture)),
        None if material.emission != Vec3::ZERO => {
            obj.insert("EmissionColor", color_rgb8_string(material.emission))
        }
        None => {}
    }

    if material.alpha_mode == AlphaMode::Clip || material.shadow_cast_mode == ShadowCastMode::AlphaClip {
        obj.insert("AlphaCutoff", material.alpha_threshold);
    }
    if material.alpha_mode != AlphaMode::Opaque {
        obj.insert("AlphaMode", material.alpha_mode.as_str());
    }
    if material.shadow_cast_mode != ShadowCastMode::Default {
        obj.insert("ShadowCastMode", material.shadow_cast_mode.as_str());
    }
    if material.additive_blending != 0.0 {
        obj.insert("AdditiveBlending", material.additive_blending);
    }
    if material.unlit {
        obj.insert("Unlit", true);
    }
    if material.distance_scale_down {
        obj.insert("DistanceScaleDown", true);
        obj.insert("DistanceScaleDownNear", material.distance_scale_down_near);
        obj.insert("DistanceScaleDownFar", material.distance_scale_down_far);
    }
    if material.normals_up_local {
        obj.insert("NormalsUpLocal", true);
    }
    if material.wind_apply {
        obj.insert("WindApply", true);
        obj.insert("WindLeanCoefficient", material.wind_lean_coefficient);
        obj.insert("WindShakeCoefficient", material.wind_shake_coefficient);
        obj.insert("WindShakeDetailCoefficient", material.wind_shake_detail_coefficient);
    }
    obj
}
