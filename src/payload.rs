//! Typed access over untyped webhook bodies
//!
//! The body is kept as a `serde_json::Value` tree. Every accessor reports an
//! absent key as `Ok(None)` and a value of the wrong shape as
//! `RelayError::MalformedPayload`, naming the dotted path that was traversed.

use serde_json::{Map, Value};

use crate::error::{RelayError, Result};

/// A webhook body, already deserialized from the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload(Value);

impl EventPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes).map(Self)
    }

    /// The top level of the payload.
    pub fn root(&self) -> Node<'_> {
        Node {
            value: &self.0,
            path: String::new(),
        }
    }
}

impl From<Value> for EventPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A borrowed position inside a payload, remembering how it was reached.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    pub fn as_object(&self) -> Result<&'a Map<String, Value>> {
        self.value
            .as_object()
            .ok_or_else(|| RelayError::malformed(&self.path, "mapping"))
    }

    pub fn as_str(&self) -> Result<&'a str> {
        self.value
            .as_str()
            .ok_or_else(|| RelayError::malformed(&self.path, "string"))
    }

    pub fn as_bool(&self) -> Result<bool> {
        self.value
            .as_bool()
            .ok_or_else(|| RelayError::malformed(&self.path, "boolean"))
    }

    /// Looks up `key` in this node, which must be a mapping.
    pub fn field(&self, key: &str) -> Result<Option<Node<'a>>> {
        let object = self.as_object()?;
        Ok(object.get(key).map(|value| Node {
            value,
            path: self.child_path(key),
        }))
    }

    /// Like [`Node::field`], but an absent key is malformed too.
    pub fn required(&self, key: &str) -> Result<Node<'a>> {
        self.field(key)?
            .ok_or_else(|| RelayError::malformed(&self.child_path(key), "a value"))
    }

    pub fn str_field(&self, key: &str) -> Result<Option<&'a str>> {
        self.field(key)?.map(|node| node.as_str()).transpose()
    }

    pub fn bool_field(&self, key: &str) -> Result<Option<bool>> {
        self.field(key)?.map(|node| node.as_bool()).transpose()
    }

    /// Looks up a nested mapping.
    pub fn object_field(&self, key: &str) -> Result<Option<Node<'a>>> {
        match self.field(key)? {
            Some(node) => {
                node.as_object()?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expect_malformed(err: RelayError, expected_path: &str) {
        match err {
            RelayError::MalformedPayload { path, .. } => assert_eq!(path, expected_path),
            other => panic!("expected malformed payload, got {other:?}"),
        }
    }

    #[test]
    fn absent_key_is_none() {
        let payload = EventPayload::new(json!({ "ref": "refs/heads/main" }));
        assert!(payload.root().field("action").unwrap().is_none());
        assert!(payload.root().str_field("action").unwrap().is_none());
        assert!(payload.root().bool_field("created").unwrap().is_none());
    }

    #[test]
    fn wrong_shape_reports_path() {
        let payload = EventPayload::new(json!({
            "pull_request": { "_links": { "statuses": { "href": 42 } } }
        }));
        let href = payload
            .root()
            .required("pull_request")
            .and_then(|n| n.required("_links"))
            .and_then(|n| n.required("statuses"))
            .and_then(|n| n.str_field("href"));
        expect_malformed(href.unwrap_err(), "pull_request._links.statuses.href");
    }

    #[test]
    fn non_mapping_root_is_malformed() {
        let payload = EventPayload::new(json!(["not", "a", "mapping"]));
        expect_malformed(payload.root().field("ref").unwrap_err(), "<root>");
    }

    #[test]
    fn null_is_not_a_string() {
        let payload = EventPayload::new(json!({ "action": null }));
        expect_malformed(payload.root().str_field("action").unwrap_err(), "action");
    }

    #[test]
    fn required_reports_missing_child() {
        let payload = EventPayload::new(json!({ "pull_request": {} }));
        let err = payload
            .root()
            .required("pull_request")
            .and_then(|n| n.required("_links"))
            .unwrap_err();
        expect_malformed(err, "pull_request._links");
    }

    #[test]
    fn object_field_rejects_scalars() {
        let payload = EventPayload::new(json!({ "repository": "octo/hello-world" }));
        expect_malformed(
            payload.root().object_field("repository").unwrap_err(),
            "repository",
        );
    }

    #[test]
    fn from_slice_parses_json() {
        let payload = EventPayload::from_slice(br#"{"created": true}"#).unwrap();
        assert_eq!(payload.root().bool_field("created").unwrap(), Some(true));
        assert!(EventPayload::from_slice(b"{not json").is_err());
    }
}
