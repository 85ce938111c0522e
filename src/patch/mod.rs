//! Partial updates: patch payloads, identity references and the merger.

use crate::core::{RegistryError, Result, Value};
use crate::schema::{FieldDescriptor, Record};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::debug;

/// External field name to new value, applied to one existing record.
///
/// Keys whose JSON value is an array or object are kept apart in
/// `unsupported` with the JSON type they carried. They only become an error
/// when the key names a field the merge would actually write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    values: BTreeMap<String, Value>,
    unsupported: BTreeMap<String, &'static str>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Decodes a JSON object.
    ///
    /// Only the payload shape is checked here. Nested arrays or objects are
    /// recorded and judged by [`merge`] against the target record.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| RegistryError::invalid_input("patch must be a JSON object"))?;

        let mut patch = Self::default();
        for (key, raw) in object {
            match Value::from_json(raw) {
                Some(value) => {
                    patch.values.insert(key.clone(), value);
                }
                None => {
                    patch.unsupported.insert(key.clone(), json_type_name(raw));
                }
            }
        }
        Ok(patch)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// JSON type of a key that held an array or object.
    pub fn unsupported(&self, field: &str) -> Option<&'static str> {
        self.unsupported.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len() + self.unsupported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.unsupported.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// An identity as supplied by the caller: a JSON number or a numeric string.
///
/// Resolution is deferred so that a bad reference fails at its own position
/// inside a bulk call.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityRef(JsonValue);

impl IdentityRef {
    pub fn from_json(json: JsonValue) -> Self {
        Self(json)
    }

    pub fn resolve(&self) -> Result<i64> {
        let resolved = match &self.0 {
            JsonValue::Number(_) => Value::from_json(&self.0).and_then(|value| value.as_i64()),
            JsonValue::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        resolved.ok_or_else(|| RegistryError::invalid_input(format!("invalid identity: {}", self.0)))
    }

    /// Decodes a JSON array of identities for bulk delete.
    pub fn list_from_json(json: &JsonValue) -> Result<Vec<Self>> {
        let items = json
            .as_array()
            .ok_or_else(|| RegistryError::invalid_input("expected a JSON array of identities"))?;
        Ok(items.iter().cloned().map(Self).collect())
    }
}

impl From<i64> for IdentityRef {
    fn from(identity: i64) -> Self {
        Self(JsonValue::from(identity))
    }
}

impl From<&str> for IdentityRef {
    fn from(identity: &str) -> Self {
        Self(JsonValue::from(identity))
    }
}

/// One entry of a bulk patch.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkEntry {
    pub identity: IdentityRef,
    pub patch: Patch,
}

/// Ordered (identity, patch) pairs applied in one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkPatchSet {
    entries: Vec<BulkEntry>,
}

impl BulkPatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, identity: impl Into<IdentityRef>, patch: Patch) -> Self {
        self.entries.push(BulkEntry {
            identity: identity.into(),
            patch,
        });
        self
    }

    /// Decodes a JSON array of objects; each object's `id` key is the identity.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let items = json
            .as_array()
            .ok_or_else(|| RegistryError::invalid_input("expected a JSON array of patches"))?;

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let mut object = item
                .as_object()
                .cloned()
                .ok_or_else(|| RegistryError::invalid_input("each bulk entry must be a JSON object"))?;
            let identity = IdentityRef(object.remove("id").unwrap_or(JsonValue::Null));
            let patch = Patch::from_json(&JsonValue::Object(object))?;
            entries.push(BulkEntry { identity, patch });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BulkEntry] {
        &self.entries
    }
}

/// Applies `patch` to a copy of `existing`.
///
/// Unknown keys are ignored, as are the identity and sealed fields. The first
/// value that does not coerce, nested JSON included, fails the whole merge
/// and nothing is returned.
pub fn merge<R: Record>(existing: &R, patch: &Patch) -> Result<R> {
    for (key, &found) in &patch.unsupported {
        if let Some((_, field)) = writable_field::<R>(key) {
            return Err(RegistryError::TypeMismatch {
                field: field.external.to_string(),
                expected: field.field_type.name(),
                found,
            });
        }
    }

    let mut updated = existing.clone();
    let mut slots = updated.slots();

    for (key, value) in patch.iter() {
        let Some((index, field)) = writable_field::<R>(key) else {
            continue;
        };
        slots[index].assign(field.external, value)?;
    }

    drop(slots);
    Ok(updated)
}

fn writable_field<R: Record>(key: &str) -> Option<(usize, &'static FieldDescriptor)> {
    let Some((index, field)) = R::field(key) else {
        debug!(model = R::MODEL, field = key, "ignoring unknown patch key");
        return None;
    };
    if !field.is_patchable() {
        debug!(model = R::MODEL, field = key, "ignoring non-patchable field");
        return None;
    }
    Some((index, field))
}

fn json_type_name(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Array(_) => "ARRAY",
        JsonValue::Object(_) => "OBJECT",
        _ => "SCALAR",
    }
}
