//! Animation channels as written to the document.

use super::sample::{remove_redundant_samples, Sample, SampleValue};
use crate::document::{Object, Value};

/// `TargetObjectType` / `TargetSubobjectType` values.
pub const TARGET_SCENE_NODE: &str = "SceneNode";
pub const TARGET_MORPH_TARGET: &str = "MorphTarget";

/// One spline-linear curve driving a property of a scene object.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationChannel {
    pub object: String,
    /// Disambiguates bones: the name of the owning armature node.
    pub ancestor: Option<String>,
    /// Morph target name, for weight channels.
    pub morph_target: Option<String>,
    pub property: String,
    pub value_type: &'static str,
    /// `(time, value)`, strictly increasing in time.
    pub points: Vec<(i32, Value)>,
}

impl AnimationChannel {
    /// Channel from raw samples, compressed with
    /// [`remove_redundant_samples`].
    pub fn from_samples<T: SampleValue>(object: &str, property: &str, mut samples: Vec<Sample<T>>) -> Self {
        remove_redundant_samples(&mut samples);
        Self {
            object: object.to_string(),
            ancestor: None,
            morph_target: None,
            property: property.to_string(),
            value_type: T::CHANNEL_TYPE,
            points: samples.iter().map(|s| (s.time, s.value.to_value())).collect(),
        }
    }

    pub fn with_ancestor(mut self, ancestor: Option<String>) -> Self {
        self.ancestor = ancestor;
        self
    }

    pub fn with_morph_target(mut self, name: &str) -> Self {
        self.morph_target = Some(name.to_string());
        self
    }

    pub fn to_object(&self) -> Object {
        let mut obj = Object::new()
            .with("TargetObjectType", TARGET_SCENE_NODE)
            .with("TargetObject", self.object.as_str())
            .with("TargetProperty", self.property.as_str())
            .with("Type", self.value_type);
        if let Some(ancestor) = &self.ancestor {
            obj.insert("TargetObjectAncestor", ancestor.as_str());
        }
        if let Some(target) = &self.morph_target {
            obj.insert("TargetSubobjectType", TARGET_MORPH_TARGET);
            obj.insert("TargetSubobject", target.as_str());
        }
        let points: Vec<Value> = self
            .points
            .iter()
            .map(|(time, value)| Object::new().with("Time", *time).with("Value", value.clone()).into())
            .collect();
        obj.insert("Points", points);
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Vec3;

    #[test]
    fn test_transform_channel_object() {
        let samples = (1..=4).map(|t| Sample::new(t, Vec3::X)).collect();
        let channel = AnimationChannel::from_samples("Cube", "PositionOffset", samples);
        assert_eq!(channel.points.len(), 2);

        let obj = channel.to_object();
        assert_eq!(obj.get("TargetObjectType").and_then(Value::as_str), Some("SceneNode"));
        assert_eq!(obj.get("TargetObject").and_then(Value::as_str), Some("Cube"));
        assert_eq!(obj.get("Type").and_then(Value::as_str), Some("Point3FSplineLinear"));
        assert!(!obj.contains_key("TargetObjectAncestor"));
        assert!(!obj.contains_key("TargetSubobject"));

        let points = obj.get("Points").and_then(Value::as_array).unwrap();
        let last = points[1].as_object().unwrap();
        assert_eq!(last.get("Time").and_then(Value::as_i64), Some(4));
        assert_eq!(last.get("Value").and_then(Value::as_str), Some("1|0|0"));
    }

    #[test]
    fn test_weight_channel_object() {
        let channel = AnimationChannel::from_samples("Face", "Weight", vec![Sample::new(0, 0.25f32)])
            .with_morph_target("Smile")
            .with_ancestor(Some("Rig".into()));
        let obj = channel.to_object();
        assert_eq!(obj.get("TargetSubobjectType").and_then(Value::as_str), Some("MorphTarget"));
        assert_eq!(obj.get("TargetSubobject").and_then(Value::as_str), Some("Smile"));
        assert_eq!(obj.get("TargetObjectAncestor").and_then(Value::as_str), Some("Rig"));
        assert_eq!(obj.get("Type").and_then(Value::as_str), Some("FloatSplineLinear"));
    }
}
