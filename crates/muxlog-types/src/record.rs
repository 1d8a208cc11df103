use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;

/// Object payload handled by stores and journals.
///
/// A record is an ordered map from field name to JSON value. Stores never
/// interpret fields other than the primary key named by the record's
/// [`ClassInfo`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object. Returns `None` for non-objects.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map.into_iter().collect())),
            _ => None,
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the record as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }
}

/// Canonical form of a record's primary-key value.
///
/// The key is the compact JSON encoding of the value, so `1` and `"1"`
/// are distinct keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey(String);

impl RecordKey {
    /// Derive the key for a primary-key value.
    pub fn from_value(value: &Value) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Value> for RecordKey {
    fn from(value: &Value) -> Self {
        Self::from_value(value)
    }
}

impl From<Value> for RecordKey {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordKey({})", self.0)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Schema descriptor for a record class.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Class identifier, e.g. `"billing.Invoice"`.
    pub id: String,
    /// Name of the field holding the primary key.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

impl ClassInfo {
    /// Describe a class whose primary key is the `id` field.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            primary_key: default_primary_key(),
        }
    }

    /// Override the primary-key field.
    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Check that the class id is usable.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.id.trim().is_empty() {
            return Err(TypeError::EmptyClassId);
        }
        Ok(())
    }

    /// Extract the primary key of `record`.
    ///
    /// Fails if the key field is absent or `null`.
    pub fn key_of(&self, record: &Record) -> Result<RecordKey, TypeError> {
        match record.get(&self.primary_key) {
            Some(Value::Null) | None => Err(TypeError::MissingKey {
                class: self.id.clone(),
                field: self.primary_key.clone(),
            }),
            Some(value) => Ok(RecordKey::from_value(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_from_json_object() {
        let record = Record::from_json(json!({"id": 1, "amount": 10})).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("amount"), Some(&json!(10)));
        assert_eq!(record.to_json(), json!({"id": 1, "amount": 10}));
    }

    #[test]
    fn record_from_non_object_is_none() {
        assert!(Record::from_json(json!([1, 2])).is_none());
        assert!(Record::from_json(json!("x")).is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let record = Record::new().with("id", 7).with("name", "seven");
        assert_eq!(record.get("id"), Some(&json!(7)));
        let names: Vec<&str> = record.fields().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn key_of_uses_primary_key_field() {
        let class = ClassInfo::new("billing.Invoice");
        let record = Record::new().with("id", 1).with("amount", 10);
        assert_eq!(class.key_of(&record).unwrap(), RecordKey::from(json!(1)));

        let by_code = ClassInfo::new("fx.Currency").with_primary_key("code");
        let usd = Record::new().with("code", "USD");
        assert_eq!(by_code.key_of(&usd).unwrap().as_str(), "\"USD\"");
    }

    #[test]
    fn key_of_rejects_missing_or_null() {
        let class = ClassInfo::new("billing.Invoice");
        let err = class.key_of(&Record::new().with("amount", 1)).unwrap_err();
        assert_eq!(
            err,
            TypeError::MissingKey {
                class: "billing.Invoice".into(),
                field: "id".into()
            }
        );
        assert!(class.key_of(&Record::new().with("id", Value::Null)).is_err());
    }

    #[test]
    fn numeric_and_string_keys_differ() {
        assert_ne!(RecordKey::from(json!(1)), RecordKey::from(json!("1")));
    }

    #[test]
    fn class_info_defaults_primary_key_in_serde() {
        let class: ClassInfo = serde_json::from_str(r#"{"id":"billing.Invoice"}"#).unwrap();
        assert_eq!(class.primary_key, "id");
        assert!(class.validate().is_ok());
        assert_eq!(ClassInfo::new(" ").validate(), Err(TypeError::EmptyClassId));
    }
}
