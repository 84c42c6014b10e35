//! The session namespace shared by every code block.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::script::Value;

/// Identifier → value map mutated in place by successive code blocks.
///
/// Created empty with its session and never reset; later blocks see every
/// assignment made by earlier ones. Entries iterate in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Namespace {
    values: BTreeMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_namespace_is_empty() {
        let ns = Namespace::new();
        assert!(ns.is_empty());
        assert_eq!(ns.get("a"), None);
    }

    #[test]
    fn test_set_overwrites() {
        let mut ns = Namespace::new();
        ns.set("a", Value::Int(9));
        ns.set("a", Value::Int(10));
        assert_eq!(ns.len(), 1);
        assert_eq!(ns.get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_iter_is_sorted() {
        let mut ns = Namespace::new();
        ns.set("b", Value::Int(2));
        ns.set("a", Value::Int(1));
        let names: Vec<&str> = ns.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut ns = Namespace::new();
        ns.set("a", Value::Float(32.0));
        ns.set("s", Value::from("x"));
        assert_eq!(
            serde_json::to_value(&ns).unwrap(),
            serde_json::json!({ "a": 32.0, "s": "x" })
        );
    }
}
