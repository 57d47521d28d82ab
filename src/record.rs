use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Pointer to the record of the identity that owns an entity. A plain
/// foreign-key value; deleting the referenced record does not cascade here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference {
    pub record_id: Uuid,
}

impl Reference {
    pub fn new(record_id: Uuid) -> Self {
        Self { record_id }
    }
}

/// One field of a record. Tagged so the bag survives a trip through JSONB
/// without collapsing timestamps and references into bare strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Timestamp(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
    Reference(Reference),
}

/// Opaque typed key-value container the store persists. Models never reach
/// the store directly; they are encoded into a `Record` and decoded back.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub record_type: String,
    pub id: Uuid,
    pub fields: HashMap<String, FieldValue>,
}

impl Record {
    pub fn new(record_type: &str, id: Uuid) -> Self {
        Self {
            record_type: record_type.to_string(),
            id,
            fields: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: FieldValue) {
        self.fields.insert(key.to_string(), value);
    }

    /// Text value under `key`, or `None` if absent or not text.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn timestamp(&self, key: &str) -> Option<OffsetDateTime> {
        match self.fields.get(key) {
            Some(FieldValue::Timestamp(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn reference(&self, key: &str) -> Option<Reference> {
        match self.fields.get(key) {
            Some(FieldValue::Reference(r)) => Some(*r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_return_none_on_wrong_type() {
        let mut record = Record::new("Post", Uuid::new_v4());
        record.set("body", FieldValue::Text("hello".into()));
        record.set(
            "timestamp",
            FieldValue::Timestamp(OffsetDateTime::UNIX_EPOCH),
        );

        assert_eq!(record.text("body"), Some("hello"));
        assert_eq!(record.timestamp("timestamp"), Some(OffsetDateTime::UNIX_EPOCH));

        // present but mistyped
        assert_eq!(record.timestamp("body"), None);
        assert_eq!(record.text("timestamp"), None);
        assert_eq!(record.reference("body"), None);
        // absent
        assert_eq!(record.text("missing"), None);
    }

    #[test]
    fn field_bag_survives_json() {
        let mut record = Record::new("User", Uuid::new_v4());
        record.set("username", FieldValue::Text("harrison".into()));
        record.set(
            "appleUserRef",
            FieldValue::Reference(Reference::new(Uuid::new_v4())),
        );

        let json = serde_json::to_value(&record.fields).expect("serialize fields");
        let back: std::collections::HashMap<String, FieldValue> =
            serde_json::from_value(json).expect("deserialize fields");
        assert_eq!(back, record.fields);
    }
}
