//! Targeted document patches.
//!
//! Array elements are addressed by `_key` so that concurrent writers touching
//! different elements of the same array do not overwrite each other.

use serde_json::{json, Map, Value};
use crate::error::SourceError;

#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Set a top-level field
    Set { field: String, value: Value },
    /// Set a top-level field only if it is absent or null
    SetIfMissing { field: String, value: Value },
    /// Append items to the end of an array field
    Append { array: String, items: Vec<Value> },
    /// Set one field of the array element whose `_key` matches
    SetKeyed { array: String, key: String, field: String, value: Value },
    /// Remove the array element whose `_key` matches
    UnsetKeyed { array: String, key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub id: String,
    /// Reject the patch if the document has moved past this revision
    pub if_revision: Option<String>,
    pub ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            if_revision: None,
            ops: Vec::new(),
        }
    }

    pub fn if_revision(mut self, revision: impl Into<String>) -> Self {
        self.if_revision = Some(revision.into());
        self
    }

    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.ops.push(PatchOp::Set { field: field.into(), value });
        self
    }

    pub fn set_if_missing(mut self, field: impl Into<String>, value: Value) -> Self {
        self.ops.push(PatchOp::SetIfMissing { field: field.into(), value });
        self
    }

    pub fn append(mut self, array: impl Into<String>, items: Vec<Value>) -> Self {
        self.ops.push(PatchOp::Append { array: array.into(), items });
        self
    }

    pub fn set_keyed(
        mut self,
        array: impl Into<String>,
        key: impl Into<String>,
        field: impl Into<String>,
        value: Value,
    ) -> Self {
        self.ops.push(PatchOp::SetKeyed {
            array: array.into(),
            key: key.into(),
            field: field.into(),
            value,
        });
        self
    }

    pub fn unset_keyed(mut self, array: impl Into<String>, key: impl Into<String>) -> Self {
        self.ops.push(PatchOp::UnsetKeyed { array: array.into(), key: key.into() });
        self
    }

    /// Render as content-store mutations.
    ///
    /// The mutate endpoint accepts one `insert` per patch object, so every
    /// append after the first becomes its own patch. Only the first patch
    /// carries `ifRevisionID`; the rest run inside the same transaction.
    pub fn to_mutations(&self) -> Vec<Value> {
        let mut set = Map::new();
        let mut set_if_missing = Map::new();
        let mut unset = Vec::new();
        let mut inserts = Vec::new();

        for op in &self.ops {
            match op {
                PatchOp::Set { field, value } => {
                    set.insert(field.clone(), value.clone());
                }
                PatchOp::SetIfMissing { field, value } => {
                    set_if_missing.insert(field.clone(), value.clone());
                }
                PatchOp::SetKeyed { array, key, field, value } => {
                    set.insert(format!("{}.{}", keyed_path(array, key), field), value.clone());
                }
                PatchOp::UnsetKeyed { array, key } => {
                    unset.push(Value::String(keyed_path(array, key)));
                }
                PatchOp::Append { array, items } => {
                    inserts.push(json!({
                        "after": format!("{}[-1]", array),
                        "items": items,
                    }));
                }
            }
        }

        let mut first = Map::new();
        first.insert("id".to_string(), Value::String(self.id.clone()));
        if let Some(revision) = &self.if_revision {
            first.insert("ifRevisionID".to_string(), Value::String(revision.clone()));
        }
        if !set.is_empty() {
            first.insert("set".to_string(), Value::Object(set));
        }
        if !set_if_missing.is_empty() {
            first.insert("setIfMissing".to_string(), Value::Object(set_if_missing));
        }
        if !unset.is_empty() {
            first.insert("unset".to_string(), Value::Array(unset));
        }

        let mut inserts = inserts.into_iter();
        if let Some(insert) = inserts.next() {
            first.insert("insert".to_string(), insert);
        }

        let mut mutations = vec![json!({ "patch": Value::Object(first) })];
        for insert in inserts {
            mutations.push(json!({ "patch": { "id": self.id, "insert": insert } }));
        }
        mutations
    }

    /// Apply the operations to a raw document in place.
    ///
    /// Ops run in the order the content store applies them: set, setIfMissing,
    /// unset, insert. Revision checks are left to the caller.
    pub fn apply_to(&self, document: &mut Value) -> Result<(), SourceError> {
        let doc = document
            .as_object_mut()
            .ok_or_else(|| SourceError::new(format!("Document {} is not an object", self.id)))?;

        for op in &self.ops {
            match op {
                PatchOp::Set { field, value } => {
                    doc.insert(field.clone(), value.clone());
                }
                PatchOp::SetKeyed { array, key, field, value } => {
                    // No matching element is a no-op, same as the remote store
                    if let Some(element) = keyed_element_mut(doc, array, key) {
                        if let Some(element) = element.as_object_mut() {
                            element.insert(field.clone(), value.clone());
                        }
                    }
                }
                _ => {}
            }
        }

        for op in &self.ops {
            if let PatchOp::SetIfMissing { field, value } = op {
                let missing = doc.get(field).map(Value::is_null).unwrap_or(true);
                if missing {
                    doc.insert(field.clone(), value.clone());
                }
            }
        }

        for op in &self.ops {
            if let PatchOp::UnsetKeyed { array, key } = op {
                if let Some(Value::Array(elements)) = doc.get_mut(array) {
                    elements.retain(|e| e.get("_key").and_then(Value::as_str) != Some(key.as_str()));
                }
            }
        }

        for op in &self.ops {
            if let PatchOp::Append { array, items } = op {
                match doc.get_mut(array) {
                    Some(Value::Array(elements)) => elements.extend(items.iter().cloned()),
                    _ => {
                        return Err(SourceError::new(format!(
                            "Cannot insert into missing array '{}' on {}",
                            array, self.id
                        )))
                    }
                }
            }
        }

        Ok(())
    }
}

fn keyed_path(array: &str, key: &str) -> String {
    format!("{}[_key==\"{}\"]", array, key)
}

fn keyed_element_mut<'a>(doc: &'a mut Map<String, Value>, array: &str, key: &str) -> Option<&'a mut Value> {
    match doc.get_mut(array) {
        Some(Value::Array(elements)) => elements
            .iter_mut()
            .find(|e| e.get("_key").and_then(Value::as_str) == Some(key)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_mutations_rating_append() {
        let patch = Patch::new("movie-1")
            .if_revision("rev-1")
            .set_if_missing("ratings", json!([]))
            .append("ratings", vec![json!({"_key": "k1", "rating": 7.5})]);

        let mutations = patch.to_mutations();
        assert_eq!(mutations.len(), 1);
        let p = &mutations[0]["patch"];
        assert_eq!(p["id"], "movie-1");
        assert_eq!(p["ifRevisionID"], "rev-1");
        assert_eq!(p["setIfMissing"]["ratings"], json!([]));
        assert_eq!(p["insert"]["after"], "ratings[-1]");
        assert_eq!(p["insert"]["items"][0]["_key"], "k1");
    }

    #[test]
    fn test_to_mutations_keyed_paths() {
        let patch = Patch::new("movie-1")
            .set_keyed("ratings", "k1", "rating", json!(9.0))
            .unset_keyed("comments", "c1");

        let p = &patch.to_mutations()[0]["patch"];
        assert_eq!(p["set"]["ratings[_key==\"k1\"].rating"], json!(9.0));
        assert_eq!(p["unset"][0], "comments[_key==\"c1\"]");
        assert!(p.get("ifRevisionID").is_none());
        assert!(p.get("insert").is_none());
    }

    #[test]
    fn test_to_mutations_splits_multiple_appends() {
        let patch = Patch::new("movie-1")
            .append("ratings", vec![json!({"_key": "a"})])
            .append("comments", vec![json!({"_key": "b"})]);

        let mutations = patch.to_mutations();
        assert_eq!(mutations.len(), 2);
        assert_eq!(mutations[1]["patch"]["insert"]["after"], "comments[-1]");
    }

    #[test]
    fn test_apply_to_document() {
        let mut doc = json!({
            "_id": "movie-1",
            "ratings": [{"_key": "k1", "rating": 4.0}, {"_key": "k2", "rating": 6.0}],
        });

        Patch::new("movie-1")
            .set_keyed("ratings", "k1", "rating", json!(8.0))
            .unset_keyed("ratings", "k2")
            .set_if_missing("comments", json!([]))
            .append("comments", vec![json!({"_key": "c1", "comment": "hi"})])
            .apply_to(&mut doc)
            .unwrap();

        assert_eq!(doc["ratings"], json!([{"_key": "k1", "rating": 8.0}]));
        assert_eq!(doc["comments"][0]["_key"], "c1");
    }

    #[test]
    fn test_apply_to_missing_array_fails() {
        let mut doc = json!({"_id": "movie-1"});
        let result = Patch::new("movie-1")
            .append("ratings", vec![json!({"_key": "k1"})])
            .apply_to(&mut doc);
        assert!(result.is_err());
    }

    #[test]
    fn test_set_keyed_without_match_is_noop() {
        let mut doc = json!({"_id": "movie-1", "ratings": []});
        Patch::new("movie-1")
            .set_keyed("ratings", "missing", "rating", json!(1.0))
            .apply_to(&mut doc)
            .unwrap();
        assert_eq!(doc["ratings"], json!([]));
    }
}
