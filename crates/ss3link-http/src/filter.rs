//! Sparse JSON projection.
//!
//! A [`FieldFilter`] names the parts of a response the caller needs. Decoding
//! runs the filter as a serde `DeserializeSeed`, so subtrees the filter does
//! not select are skipped in the token stream and never allocated.
//!
//! Filter grammar (itself JSON):
//! - `true` keeps the whole value at that position
//! - an object keeps only the listed keys; `"*"` matches any key
//! - an array applies its first element to every element of the input array
//! - anything else drops the value
//!
//! ```
//! use serde_json::json;
//! use ss3link_http::FieldFilter;
//!
//! let filter = FieldFilter::new(json!([{ "serial": true }]));
//! let doc = filter
//!     .decode(br#"[{"serial":"abc","name":"Front door"}]"#, 10)
//!     .unwrap();
//! assert_eq!(doc, json!([{ "serial": "abc" }]));
//! ```

use std::fmt;

use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};

/// Default maximum nesting of arrays/objects in a decoded document.
pub const DEFAULT_NESTING_LIMIT: u8 = 10;

/// A projection applied while decoding a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    spec: Value,
}

impl FieldFilter {
    /// Build a filter from its JSON description.
    pub fn new(spec: Value) -> Self {
        Self { spec }
    }

    /// A filter that keeps everything.
    pub fn keep_all() -> Self {
        Self {
            spec: Value::Bool(true),
        }
    }

    /// The filter description.
    pub fn spec(&self) -> &Value {
        &self.spec
    }

    /// Decode `bytes`, keeping only what the filter selects.
    ///
    /// Fails on malformed or truncated JSON, trailing data, or when a kept
    /// value nests arrays/objects deeper than `nesting_limit`.
    pub fn decode(&self, bytes: &[u8], nesting_limit: u8) -> Result<Value, serde_json::Error> {
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        let value = Projector {
            node: Node::from_spec(&self.spec),
            depth_left: nesting_limit,
        }
        .deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(value)
    }
}

impl Default for FieldFilter {
    fn default() -> Self {
        Self::keep_all()
    }
}

#[derive(Debug, Clone, Copy)]
enum Node<'f> {
    All,
    Object(&'f Map<String, Value>),
    Array(Option<&'f Value>),
    Drop,
}

impl<'f> Node<'f> {
    fn from_spec(spec: &'f Value) -> Self {
        match spec {
            Value::Bool(true) => Node::All,
            Value::Object(map) => Node::Object(map),
            Value::Array(items) => Node::Array(items.first()),
            _ => Node::Drop,
        }
    }

    fn child_for_key(&self, key: &str) -> Node<'f> {
        match self {
            Node::All => Node::All,
            Node::Object(map) => map
                .get(key)
                .or_else(|| map.get("*"))
                .map(Node::from_spec)
                .unwrap_or(Node::Drop),
            _ => Node::Drop,
        }
    }

    fn child_for_element(&self) -> Node<'f> {
        match self {
            Node::All => Node::All,
            Node::Array(Some(spec)) => Node::from_spec(spec),
            _ => Node::Drop,
        }
    }
}

struct Projector<'f> {
    node: Node<'f>,
    depth_left: u8,
}

impl<'de> DeserializeSeed<'de> for Projector<'_> {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl Projector<'_> {
    /// Scalars survive only where the filter keeps the whole value.
    fn scalar(&self, value: Value) -> Value {
        match self.node {
            Node::All => value,
            _ => Value::Null,
        }
    }

    fn descend<E: de::Error>(&self) -> Result<u8, E> {
        self.depth_left
            .checked_sub(1)
            .ok_or_else(|| E::custom("nesting limit exceeded"))
    }
}

impl<'de> Visitor<'de> for Projector<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(self.scalar(Value::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(self.scalar(Value::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(self.scalar(Value::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        let value = Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null);
        Ok(self.scalar(value))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(self.scalar(Value::String(v.to_owned())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(self.scalar(Value::String(v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let keeps_elements = matches!(self.node, Node::All | Node::Array(_));
        if !keeps_elements {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            return Ok(Value::Null);
        }

        let depth_left = self.descend::<A::Error>()?;
        let child = self.node.child_for_element();
        let mut items = Vec::new();

        if matches!(child, Node::Drop) {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
        } else {
            while let Some(item) = seq.next_element_seed(Projector {
                node: child,
                depth_left,
            })? {
                items.push(item);
            }
        }

        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let keeps_fields = matches!(self.node, Node::All | Node::Object(_));
        if !keeps_fields {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            return Ok(Value::Null);
        }

        let depth_left = self.descend::<A::Error>()?;
        let mut object = Map::new();

        while let Some(key) = map.next_key::<String>()? {
            let child = self.node.child_for_key(&key);
            if matches!(child, Node::Drop) {
                map.next_value::<IgnoredAny>()?;
                continue;
            }
            let value = map.next_value_seed(Projector {
                node: child,
                depth_left,
            })?;
            object.insert(key, value);
        }

        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_all(bytes: &[u8], nesting_limit: u8) -> Result<Value, serde_json::Error> {
        FieldFilter::keep_all().decode(bytes, nesting_limit)
    }

    #[test]
    fn test_keep_all_decodes_document() {
        let doc = decode_all(br#"{"a":1,"b":[true,null,"x"],"c":{"d":2.5}}"#, 10).unwrap();
        assert_eq!(doc, json!({"a": 1, "b": [true, null, "x"], "c": {"d": 2.5}}));
    }

    #[test]
    fn test_doorlock_projection() {
        let filter = FieldFilter::new(json!([
            { "serial": true, "status": { "lockState": true, "lockJamState": true } }
        ]));
        let body = br#"[
            {"serial":"abc","name":"Front","status":{"lockState":1,"lockJamState":0,"battery":"ok"},"firmware":{"v":"1.2"}},
            {"serial":"def","status":{"lockState":0,"lockJamState":1}}
        ]"#;

        let doc = filter.decode(body, 10).unwrap();
        assert_eq!(
            doc,
            json!([
                {"serial": "abc", "status": {"lockState": 1, "lockJamState": 0}},
                {"serial": "def", "status": {"lockState": 0, "lockJamState": 1}}
            ])
        );
    }

    #[test]
    fn test_subscription_projection_drops_siblings() {
        let filter = FieldFilter::new(json!({
            "subscriptions": [{
                "sid": true,
                "location": { "system": { "alarmState": true, "isAlarming": true } }
            }]
        }));
        let body = br#"{
            "subscriptions": [{
                "sid": 1234,
                "uid": 99,
                "location": {
                    "street1": "1 Main St",
                    "system": {"alarmState": "HOME", "isAlarming": false, "sensors": [1,2,3]}
                }
            }],
            "total": 1
        }"#;

        let doc = filter.decode(body, 11).unwrap();
        assert_eq!(
            doc,
            json!({
                "subscriptions": [{
                    "sid": 1234,
                    "location": {"system": {"alarmState": "HOME", "isAlarming": false}}
                }]
            })
        );
    }

    #[test]
    fn test_wildcard_key() {
        let filter = FieldFilter::new(json!({ "*": { "id": true } }));
        let doc = filter
            .decode(br#"{"a":{"id":1,"x":2},"b":{"id":3}}"#, 10)
            .unwrap();
        assert_eq!(doc, json!({"a": {"id": 1}, "b": {"id": 3}}));
    }

    #[test]
    fn test_shape_mismatch_yields_null() {
        let filter = FieldFilter::new(json!({ "state": { "inner": true } }));
        let doc = filter.decode(br#"{"state":"OFF"}"#, 10).unwrap();
        assert_eq!(doc, json!({"state": null}));

        let filter = FieldFilter::new(json!([{ "serial": true }]));
        let doc = filter.decode(br#"{"serial":"abc"}"#, 10).unwrap();
        assert_eq!(doc, Value::Null);
    }

    #[test]
    fn test_nesting_limit_applies_to_kept_values() {
        let body = br#"{"a":{"b":{"c":1}}}"#;
        assert!(decode_all(body, 3).is_ok());
        assert!(decode_all(body, 2).is_err());

        // the deep part is filtered out, so the limit is not reached
        let filter = FieldFilter::new(json!({ "x": true }));
        let doc = filter.decode(br#"{"x":1,"a":{"b":{"c":1}}}"#, 1).unwrap();
        assert_eq!(doc, json!({"x": 1}));
    }

    #[test]
    fn test_zero_limit_allows_scalars_only() {
        assert_eq!(decode_all(b"42", 0).unwrap(), json!(42));
        assert!(decode_all(b"[]", 0).is_err());
    }

    #[test]
    fn test_malformed_and_truncated_input() {
        assert!(decode_all(br#"{"a":1"#, 10).is_err());
        assert!(decode_all(br#"{"a":1} trailing"#, 10).is_err());
        assert!(decode_all(b"not json", 10).is_err());
    }

    #[test]
    fn test_dropped_element_filter_yields_empty_array() {
        let filter = FieldFilter::new(json!({ "items": [false] }));
        let doc = filter.decode(br#"{"items":[1,2,3]}"#, 10).unwrap();
        assert_eq!(doc, json!({"items": []}));
    }
}
