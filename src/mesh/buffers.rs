//! Vertex buffer layout and packing.

use byteorder::{ByteOrder, LittleEndian};
use tracing::warn;

use super::vertex::Vertex;
use crate::document::{Object, Value};
use crate::scene::MeshGeometry;
use crate::util::unorm8;

/// Name of the color attribute carrying wind weights.
pub const WIND_ATTRIBUTE_NAME: &str = "Wind";

/// Vertex groups packed into the wind attribute's R, G, B and A channels.
pub const WIND_GROUP_NAMES: [&str; 4] = [
    "DuckWindLean",
    "DuckWindShake",
    "DuckWindShakeDetail",
    "DuckWindShakePhase",
];

/// Name of the smooth-normal attribute.
pub const SMOOTH_NORMAL_NAME: &str = "Smooth";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    TexCoord,
    Color,
}

impl Semantic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semantic::Position => "Position",
            Semantic::Normal => "Normal",
            Semantic::Tangent => "Tangent",
            Semantic::TexCoord => "TexCoord",
            Semantic::Color => "Color",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Float32,
    Uint8,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Float32 => "float32",
            ComponentType::Uint8 => "uint8",
        }
    }
}

/// Describes where one attribute lives in the vertex buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    pub semantic: Semantic,
    pub semantic_index: Option<u32>,
    pub name: Option<String>,
    pub buffer: u32,
    pub offset: u32,
    pub stride: u32,
    pub component_type: ComponentType,
    pub component_count: u32,
    pub normalized: bool,
}

impl VertexAttribute {
    fn float3(semantic: Semantic, buffer: u32, offset: u32, stride: u32) -> Self {
        Self {
            semantic,
            semantic_index: None,
            name: None,
            buffer,
            offset,
            stride,
            component_type: ComponentType::Float32,
            component_count: 3,
            normalized: false,
        }
    }

    fn color(name: &str, semantic_index: Option<u32>, buffer: u32) -> Self {
        Self {
            semantic: Semantic::Color,
            semantic_index,
            name: Some(name.to_string()),
            buffer,
            offset: 0,
            stride: 4,
            component_type: ComponentType::Uint8,
            component_count: 4,
            normalized: true,
        }
    }

    pub fn to_object(&self) -> Object {
        let mut obj = Object::new()
            .with("Semantic", self.semantic.as_str())
            .with("VertexBufferIndex", self.buffer)
            .with("Offset", self.offset)
            .with("Stride", self.stride)
            .with("ComponentType", self.component_type.as_str())
            .with("ComponentCount", self.component_count);
        if let Some(index) = self.semantic_index {
            obj.insert("SemanticIndex", index);
        }
        if let Some(name) = &self.name {
            obj.insert("Name", name.as_str());
        }
        if self.normalized {
            obj.insert("Normalized", true);
        }
        obj
    }
}

/// Vertex groups feeding the wind attribute, by channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindGroups {
    pub groups: [Option<usize>; 4],
}

impl WindGroups {
    /// Wind groups present in `geometry`, or `None` if there are none or
    /// the mesh already carries a wind color layer.
    pub fn find(geometry: &MeshGeometry) -> Option<Self> {
        if geometry.color_layers.iter().any(|l| l.name == WIND_ATTRIBUTE_NAME) {
            return None;
        }
        let groups = WIND_GROUP_NAMES.map(|name| geometry.vertex_group_index(name));
        groups.iter().any(Option::is_some).then_some(Self { groups })
    }
}

/// Which attributes a mesh's vertices carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeLayout {
    pub include_tangents: bool,
    pub include_smooth_normals: bool,
    /// Indices of the geometry's UV layers, sorted by layer name.
    pub uv_layers: Vec<usize>,
    /// Indices of the geometry's color layers, sorted by layer name.
    pub color_layers: Vec<usize>,
    pub wind: Option<WindGroups>,
}

impl AttributeLayout {
    /// Layout for `geometry`. Tangents are dropped with a warning when the
    /// geometry cannot provide them.
    pub fn new(mesh_name: &str, geometry: &MeshGeometry, include_tangents: bool, include_smooth_normals: bool) -> Self {
        let include_tangents = if include_tangents && geometry.loop_tangents.is_none() {
            warn!(mesh = mesh_name, "tangents unavailable, exporting without tangent data");
            false
        } else {
            include_tangents
        };

        let mut uv_layers: Vec<usize> = (0..geometry.uv_layers.len()).collect();
        uv_layers.sort_by(|a, b| geometry.uv_layers[*a].name.cmp(&geometry.uv_layers[*b].name));
        let mut color_layers: Vec<usize> = (0..geometry.color_layers.len()).collect();
        color_layers.sort_by(|a, b| geometry.color_layers[*a].name.cmp(&geometry.color_layers[*b].name));

        Self {
            include_tangents,
            include_smooth_normals,
            uv_layers,
            color_layers,
            wind: WindGroups::find(geometry),
        }
    }
}

/// Packed vertex data of one submesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedVertices {
    pub attributes: Vec<VertexAttribute>,
    pub buffers: Vec<Vec<u8>>,
}

impl PackedVertices {
    fn push_buffer(&mut self, data: Vec<u8>) -> u32 {
        self.buffers.push(data);
        (self.buffers.len() - 1) as u32
    }

    pub fn attributes_value(&self) -> Value {
        Value::Array(self.attributes.iter().map(|a| a.to_object().into()).collect())
    }

    pub fn buffers_value(&self) -> Value {
        Value::Array(
            self.buffers
                .iter()
                .map(|data| Object::new().with("Data", data.clone()).into())
                .collect(),
        )
    }
}

fn float_bytes(floats: &[f32]) -> Vec<u8> {
    let mut bytes = vec![0u8; floats.len() * 4];
    LittleEndian::write_f32_into(floats, &mut bytes);
    bytes
}

fn vec3_buffer(vertices: &[Vertex], field: impl Fn(&Vertex) -> [f32; 3]) -> Vec<u8> {
    let floats: Vec<f32> = vertices.iter().flat_map(field).collect();
    float_bytes(&floats)
}

/// Pack `vertices` into typed buffers following `layout`.
///
/// Buffer 0 interleaves position and normal; every other attribute gets a
/// buffer of its own, in the order tangent, smooth normal, UV layers, color
/// layers, wind.
pub fn pack_vertices(vertices: &[Vertex], layout: &AttributeLayout, geometry: &MeshGeometry) -> PackedVertices {
    let mut packed = PackedVertices::default();

    let interleaved: Vec<f32> = vertices
        .iter()
        .flat_map(|v| v.position.to_array().into_iter().chain(v.normal.to_array()))
        .collect();
    let buffer = packed.push_buffer(float_bytes(&interleaved));
    packed.attributes.push(VertexAttribute::float3(Semantic::Position, buffer, 0, 24));
    packed.attributes.push(VertexAttribute::float3(Semantic::Normal, buffer, 12, 24));

    if layout.include_tangents {
        let buffer = packed.push_buffer(vec3_buffer(vertices, |v| v.tangent.to_array()));
        packed.attributes.push(VertexAttribute::float3(Semantic::Tangent, buffer, 0, 12));
    }

    if layout.include_smooth_normals {
        let buffer = packed.push_buffer(vec3_buffer(vertices, |v| v.normal_smooth.to_array()));
        let mut attribute = VertexAttribute::float3(Semantic::Normal, buffer, 0, 12);
        attribute.name = Some(SMOOTH_NORMAL_NAME.to_string());
        packed.attributes.push(attribute);
    }

    for (slot, layer) in layout.uv_layers.iter().enumerate() {
        let floats: Vec<f32> = vertices
            .iter()
            .flat_map(|v| v.tex_coords[slot].to_array())
            .collect();
        let buffer = packed.push_buffer(float_bytes(&floats));
        packed.attributes.push(VertexAttribute {
            semantic: Semantic::TexCoord,
            semantic_index: Some(slot as u32),
            name: Some(geometry.uv_layers[*layer].name.clone()),
            buffer,
            offset: 0,
            stride: 8,
            component_type: ComponentType::Float32,
            component_count: 2,
            normalized: false,
        });
    }

    for (slot, layer) in layout.color_layers.iter().enumerate() {
        let bytes: Vec<u8> = vertices
            .iter()
            .flat_map(|v| v.colors[slot].to_array().map(unorm8))
            .collect();
        let buffer = packed.push_buffer(bytes);
        packed.attributes.push(VertexAttribute::color(
            &geometry.color_layers[*layer].name,
            Some(slot as u32),
            buffer,
        ));
    }

    if let Some(wind) = &layout.wind {
        let bytes: Vec<u8> = vertices
            .iter()
            .flat_map(|v| {
                wind.groups.map(|group| {
                    let weight = group
                        .and_then(|g| geometry.group_weight(v.source_vertex as usize, g))
                        .unwrap_or(0.0);
                    unorm8(weight)
                })
            })
            .collect();
        let buffer = packed.push_buffer(bytes);
        packed.attributes.push(VertexAttribute::color(WIND_ATTRIBUTE_NAME, None, buffer));
    }

    packed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ColorLayer, GroupWeight, UvLayer};
    use crate::util::{Vec2, Vec3, Vec4};
    use smallvec::smallvec;

    fn geometry() -> MeshGeometry {
        MeshGeometry {
            positions: vec![Vec3::ZERO],
            loop_normals: vec![Vec3::Z],
            uv_layers: vec![
                UvLayer { name: "b".into(), uvs: vec![Vec2::ZERO] },
                UvLayer { name: "a".into(), uvs: vec![Vec2::ONE] },
            ],
            color_layers: vec![
                ColorLayer { name: "Paint".into(), colors: vec![Vec4::ONE] },
                ColorLayer { name: "Dirt".into(), colors: vec![Vec4::ZERO] },
            ],
            vertex_groups: vec!["DuckWindShake".into()],
            vertex_weights: vec![vec![GroupWeight { group: 0, weight: 0.5 }]],
            ..Default::default()
        }
    }

    fn one_vertex() -> Vertex {
        Vertex {
            position: Vec3::new(1.0, 2.0, 3.0),
            normal: Vec3::Z,
            tangent: Vec3::X,
            normal_smooth: Vec3::Y,
            tex_coords: smallvec![Vec2::new(0.5, 0.25), Vec2::new(1.0, 0.0)],
            colors: smallvec![Vec4::new(2.0, -1.0, 0.5, 1.0), Vec4::ONE],
            source_vertex: 0,
            source_loop: 0,
        }
    }

    #[test]
    fn test_layout_sorted_layers_and_wind() {
        let layout = AttributeLayout::new("M", &geometry(), false, false);
        assert_eq!(layout.uv_layers, vec![1, 0]);
        assert_eq!(layout.color_layers, vec![1, 0]);
        assert_eq!(layout.wind.unwrap().groups, [None, Some(0), None, None]);
    }

    #[test]
    fn test_wind_skipped_with_wind_color_layer() {
        let mut geo = geometry();
        geo.color_layers.push(ColorLayer { name: "Wind".into(), colors: vec![Vec4::ZERO] });
        assert!(WindGroups::find(&geo).is_none());
    }

    #[test]
    fn test_tangents_degrade_without_data() {
        let layout = AttributeLayout::new("M", &geometry(), true, true);
        assert!(!layout.include_tangents);
        assert!(layout.include_smooth_normals);
    }

    #[test]
    fn test_pack_all_attributes() {
        let mut geo = geometry();
        geo.loop_tangents = Some(vec![Vec3::X]);
        let layout = AttributeLayout::new("M", &geo, true, true);
        let packed = pack_vertices(&[one_vertex()], &layout, &geo);

        // pos+normal, tangent, smooth, 2 uv, 2 color, wind
        assert_eq!(packed.buffers.len(), 7);
        assert_eq!(packed.buffers[0].len(), 24);
        assert_eq!(&packed.buffers[0][0..4], &1.0f32.to_le_bytes());
        assert_eq!(&packed.buffers[0][12..16], &0.0f32.to_le_bytes());
        assert_eq!(packed.buffers[1].len(), 12);
        assert_eq!(packed.buffers[3].len(), 8);
        // Colors clamp and truncate.
        assert_eq!(packed.buffers[5], vec![255, 0, 127, 255]);
        // Wind: shake channel only.
        assert_eq!(packed.buffers[6], vec![0, 127, 0, 0]);

        let semantics: Vec<_> = packed.attributes.iter().map(|a| a.semantic).collect();
        assert_eq!(
            semantics,
            vec![
                Semantic::Position,
                Semantic::Normal,
                Semantic::Tangent,
                Semantic::Normal,
                Semantic::TexCoord,
                Semantic::TexCoord,
                Semantic::Color,
                Semantic::Color,
                Semantic::Color,
            ]
        );
        let names: Vec<_> = packed.attributes.iter().map(|a| a.name.as_deref()).collect();
        assert_eq!(names[3..], [Some("Smooth"), Some("a"), Some("b"), Some("Dirt"), Some("Paint"), Some("Wind")]);
        assert_eq!(packed.attributes[5].semantic_index, Some(1));
        assert_eq!(packed.attributes[7].semantic_index, Some(1));
        assert_eq!(packed.attributes[8].semantic_index, None);
        assert_eq!(packed.attributes[8].buffer, 6);
    }

    #[test]
    fn test_attribute_object() {
        let attr = VertexAttribute::color("Paint", Some(0), 2);
        let obj = attr.to_object();
        assert_eq!(obj.get("Semantic").and_then(Value::as_str), Some("Color"));
        assert_eq!(obj.get("Normalized").and_then(Value::as_bool), Some(true));
        assert_eq!(obj.get("Stride").and_then(Value::as_i64), Some(4));

        let pos = VertexAttribute::float3(Semantic::Position, 0, 0, 24).to_object();
        assert!(!pos.contains_key("Normalized"));
        assert!(!pos.contains_key("SemanticIndex"));
    }
}
