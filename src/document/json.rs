//! JSON rendering of document trees for inspection.

use serde_json::{Map, Number, Value as Json};

use super::value::{Object, Value};

impl Value {
    /// Render as JSON. Binary payloads are summarized by size.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Int32(v) => Json::from(*v),
            Value::Int64(v) => Json::from(*v),
            // NaN and infinities have no JSON form.
            Value::Double(v) => Number::from_f64(*v).map_or_else(|| Json::String(v.to_string()), Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::Binary(data) => Json::String(format!("<binary data ({} bytes)>", data.len())),
            Value::Object(object) => object.to_json(),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl Object {
    /// Render as a JSON object with keys in wire order.
    pub fn to_json(&self) -> Json {
        let mut map = Map::new();
        for (key, value) in self.sorted_entries() {
            map.insert(key.to_string(), value.to_json());
        }
        Json::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binary_summary() {
        let doc = Object::new()
            .with("Data", vec![0u8; 12])
            .with("Count", 3)
            .with("Name", "Cube")
            .with("List", vec![Value::Null, Value::from(1.5)]);
        assert_eq!(
            doc.to_json(),
            json!({
                "Count": 3,
                "Data": "<binary data (12 bytes)>",
                "List": [null, 1.5],
                "Name": "Cube",
            })
        );
    }

    #[test]
    fn test_non_finite_double() {
        assert_eq!(Value::Double(f64::NAN).to_json(), Json::String("NaN".into()));
    }
}
