//! Material records, already reduced to PBR parameters by the scene source.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::{Vec3, Vec4};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMode {
    Point,
    #[default]
    Bilinear,
    Trilinear,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Point => "Point",
            FilterMode::Bilinear => "Bilinear",
            FilterMode::Trilinear => "Trilinear",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapMode {
    Clamp,
    #[default]
    Repeat,
}

impl WrapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WrapMode::Clamp => "Clamp",
            WrapMode::Repeat => "Repeat",
        }
    }
}

/// Image texture sampled through a named UV map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    /// Image path; only the file stem is exported.
    pub path: String,
    pub uv_map: String,
    #[serde(default)]
    pub filter: FilterMode,
    #[serde(default)]
    pub wrap: WrapMode,
}

impl Texture {
    /// Image file name without directory or extension.
    pub fn file_stem(&self) -> String {
        // Accept either separator regardless of platform.
        let name = self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path);
        Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Blend,
    Clip,
    AlphaToCoverage,
}

impl AlphaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlphaMode::Opaque => "Opaque",
            AlphaMode::Blend => "Blend",
            AlphaMode::Clip => "Clip",
            AlphaMode::AlphaToCoverage => "AlphaToCoverage",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowCastMode {
    #[default]
    Default,
    None,
    Opaque,
    AlphaClip,
}

impl ShadowCastMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShadowCastMode::Default => "Default",
            ShadowCastMode::None => "None",
            ShadowCastMode::Opaque => "Opaque",
            ShadowCastMode::AlphaClip => "AlphaClip",
        }
    }
}

/// Surface description of a material.
///
/// `standard` is false when the source material has no supported shading
/// setup; such materials are exported without parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub name: String,
    pub standard: bool,

    pub base_color: Vec4,
    pub base_color_texture: Option<Texture>,
    pub metallic: f32,
    pub roughness: f32,
    /// Metallic, roughness and occlusion packed in the R, G and B channels.
    pub metallic_roughness_occlusion_texture: Option<Texture>,
    /// Specular in the authoring tool's 0-1 range.
    pub specular: f32,
    pub emission: Vec3,
    pub emission_texture: Option<Texture>,
    pub normal_texture: Option<Texture>,
    pub lightmap_texture: Option<Texture>,

    pub two_sided: bool,
    pub back_face_normals_flip: bool,
    pub outline_draw: bool,
    pub alpha_mode: AlphaMode,
    pub alpha_threshold: f32,
    pub shadow_cast_mode: ShadowCastMode,
    pub additive_blending: f32,
    pub unlit: bool,
    pub distance_scale_down: bool,
    pub distance_scale_down_near: f32,
    pub distance_scale_down_far: f32,
    pub normals_up_local: bool,

    pub wind_apply: bool,
    pub wind_lean_coefficient: f32,
    pub wind_shake_coefficient: f32,
    pub wind_shake_detail_coefficient: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            standard: true,
            base_color: Vec4::new(0.8, 0.8, 0.8, 1.0),
            base_color_texture: None,
            metallic: 0.0,
            roughness: 0.5,
            metallic_roughness_occlusion_texture: None,
            specular: 0.5,
            emission: Vec3::ZERO,
            emission_texture: None,
            normal_texture: None,
            lightmap_texture: None,
            two_sided: false,
            back_face_normals_flip: true,
            outline_draw: false,
            alpha_mode: AlphaMode::Opaque,
            alpha_threshold: 0.5,
            shadow_cast_mode: ShadowCastMode::Default,
            additive_blending: 0.0,
            unlit: false,
            distance_scale_down: false,
            distance_scale_down_near: 0.0,
            distance_scale_down_far: 0.0,
            normals_up_local: false,
            wind_apply: false,
            wind_lean_coefficient: 0.1,
            wind_shake_coefficient: 0.1,
            wind_shake_detail_coefficient: 0.05,
        }
    }
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Meshes using this material need a tangent buffer.
    pub fn requires_tangents(&self) -> bool {
        self.standard && self.normal_texture.is_some()
    }

    /// Meshes using this material need a smooth-normal buffer.
    pub fn requires_smooth_normals(&self) -> bool {
        self.standard && (self.outline_draw || self.wind_apply)
    }
}
