//! Record values and the record access capability
//!
//! The encoder never looks at a concrete record representation. Property
//! bags ([`DynamicRecord`]) and strongly-typed structs both implement
//! [`Record`], and every field value is exposed as a [`Value`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metadata::FieldDescriptor;

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Array(Vec<Value>),
    /// Ordered key/value pairs
    Map(Vec<(Value, Value)>),
    Object(DynamicRecord),
}

/// Declared type tag of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Unknown,
    Text,
    Bool,
    Int,
    Float,
    Array,
    Map,
    Object,
}

impl FieldType {
    pub fn is_collection(self) -> bool {
        matches!(self, FieldType::Array)
    }

    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Bool | FieldType::Int | FieldType::Float
        )
    }

    /// Zero value used when a default instance is substituted for a null record
    pub fn zero_value(self) -> Value {
        match self {
            FieldType::Unknown => Value::Null,
            FieldType::Text => Value::Text(String::new()),
            FieldType::Bool => Value::Bool(false),
            FieldType::Int => Value::Int(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Array => Value::Array(Vec::new()),
            FieldType::Map => Value::Map(Vec::new()),
            FieldType::Object => Value::Object(DynamicRecord::default()),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_)
        )
    }

    /// Runtime type tag of this value
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Null => FieldType::Unknown,
            Value::Bool(_) => FieldType::Bool,
            Value::Int(_) => FieldType::Int,
            Value::Float(_) => FieldType::Float,
            Value::Text(_) => FieldType::Text,
            Value::Array(_) => FieldType::Array,
            Value::Map(_) => FieldType::Map,
            Value::Object(_) => FieldType::Object,
        }
    }

    /// Scalar text using `decimal_separator` for floats; `None` for null and complex values
    pub fn scalar_text(&self, decimal_separator: char) -> Option<String> {
        match self {
            Value::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => {
                let text = f.to_string();
                if decimal_separator == '.' {
                    Some(text)
                } else {
                    Some(text.replace('.', &decimal_separator.to_string()))
                }
            }
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Array(items) => write!(f, "[{} items]", items.len()),
            Value::Map(pairs) => write!(f, "{{{} pairs}}", pairs.len()),
            Value::Object(record) => match &record.name {
                Some(name) => write!(f, "<{}>", name),
                None => write!(f, "<object>"),
            },
            scalar => write!(f, "{}", scalar.scalar_text('.').unwrap_or_default()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<DynamicRecord> for Value {
    fn from(record: DynamicRecord) -> Self {
        Value::Object(record)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(DynamicRecord::from_json_map(map)),
        }
    }
}

/// Read access to one record, independent of how it is represented
pub trait Record {
    /// Value of `name`; `None` when the record has no such field
    fn get(&self, name: &str) -> Option<Value>;

    /// Field names in declaration order
    fn field_names(&self) -> Vec<String>;

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Declared schema name, used for node naming
    fn record_name(&self) -> Option<String> {
        None
    }

    /// Property bags report `true`; they never get a pluralized root name
    fn is_dynamic(&self) -> bool {
        false
    }

    fn is_null(&self) -> bool {
        false
    }

    /// Ordered field descriptors for this record's shape.
    ///
    /// Strongly-typed records override this to declare locations, owner
    /// paths or nullability.
    fn describe(&self) -> Vec<FieldDescriptor> {
        self.field_names()
            .into_iter()
            .map(|name| {
                let field_type = self
                    .get(&name)
                    .map(|v| v.field_type())
                    .unwrap_or_default();
                FieldDescriptor::new(name, field_type)
            })
            .collect()
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn get(&self, name: &str) -> Option<Value> {
        (**self).get(name)
    }
    fn field_names(&self) -> Vec<String> {
        (**self).field_names()
    }
    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }
    fn record_name(&self) -> Option<String> {
        (**self).record_name()
    }
    fn is_dynamic(&self) -> bool {
        (**self).is_dynamic()
    }
    fn is_null(&self) -> bool {
        (**self).is_null()
    }
    fn describe(&self) -> Vec<FieldDescriptor> {
        (**self).describe()
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn get(&self, name: &str) -> Option<Value> {
        (**self).get(name)
    }
    fn field_names(&self) -> Vec<String> {
        (**self).field_names()
    }
    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }
    fn record_name(&self) -> Option<String> {
        (**self).record_name()
    }
    fn is_dynamic(&self) -> bool {
        (**self).is_dynamic()
    }
    fn is_null(&self) -> bool {
        (**self).is_null()
    }
    fn describe(&self) -> Vec<FieldDescriptor> {
        (**self).describe()
    }
}

/// `None` is a null record
impl<R: Record> Record for Option<R> {
    fn get(&self, name: &str) -> Option<Value> {
        self.as_ref().and_then(|r| r.get(name))
    }
    fn field_names(&self) -> Vec<String> {
        self.as_ref().map(|r| r.field_names()).unwrap_or_default()
    }
    fn record_name(&self) -> Option<String> {
        self.as_ref().and_then(|r| r.record_name())
    }
    fn is_dynamic(&self) -> bool {
        self.as_ref().map(|r| r.is_dynamic()).unwrap_or(true)
    }
    fn is_null(&self) -> bool {
        self.as_ref().map(|r| r.is_null()).unwrap_or(true)
    }
    fn describe(&self) -> Vec<FieldDescriptor> {
        self.as_ref().map(|r| r.describe()).unwrap_or_default()
    }
}

/// Name of the single field exposed by a bare scalar record
pub const SCALAR_FIELD_NAME: &str = "Value";

/// A bare value as a record: objects delegate, `Null` is a null record and
/// scalars/collections expose a single `Value` field
impl Record for Value {
    fn get(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(record) => record.get(name),
            Value::Null => None,
            other if name == SCALAR_FIELD_NAME => Some(other.clone()),
            _ => None,
        }
    }

    fn field_names(&self) -> Vec<String> {
        match self {
            Value::Object(record) => record.field_names(),
            Value::Null => Vec::new(),
            _ => vec![SCALAR_FIELD_NAME.to_string()],
        }
    }

    fn record_name(&self) -> Option<String> {
        match self {
            Value::Object(record) => record.record_name(),
            _ => None,
        }
    }

    fn is_dynamic(&self) -> bool {
        match self {
            Value::Object(record) => record.is_dynamic(),
            _ => true,
        }
    }

    fn is_null(&self) -> bool {
        self.is_null()
    }
}

/// Ordered property bag
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicRecord {
    /// Optional element name; nested objects use it as a node name hint
    pub name: Option<String>,
    fields: Vec<(String, Value)>,
}

impl DynamicRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            fields: Vec::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, keeping first-insertion order
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn from_json_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let mut record = DynamicRecord::new();
        for (name, value) in map {
            record.insert(name, Value::from(value));
        }
        record
    }
}

impl Record for DynamicRecord {
    fn get(&self, name: &str) -> Option<Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn has(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    fn record_name(&self) -> Option<String> {
        self.name.clone()
    }

    fn is_dynamic(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dynamic_record_preserves_insertion_order() {
        let mut record = DynamicRecord::new().with("b", 1).with("a", "x");
        record.insert("b", 2);

        assert_eq!(record.field_names(), vec!["b", "a"]);
        assert_eq!(record.get("b"), Some(Value::Int(2)));
        assert!(record.has("a"));
        assert!(!record.has("c"));
    }

    #[test]
    fn test_json_conversion() {
        let value = Value::from(json!({
            "Id": 1,
            "Price": 2.5,
            "Tags": ["a", "b"],
            "Owner": {"Name": "Zed"},
            "Note": null
        }));

        let Value::Object(record) = value else {
            panic!("Expected object");
        };
        assert_eq!(record.get("Id"), Some(Value::Int(1)));
        assert_eq!(record.get("Price"), Some(Value::Float(2.5)));
        assert_eq!(
            record.get("Tags"),
            Some(Value::Array(vec!["a".into(), "b".into()]))
        );
        assert_eq!(record.get("Note"), Some(Value::Null));
        assert!(matches!(record.get("Owner"), Some(Value::Object(_))));
    }

    #[test]
    fn test_json_objects_keep_key_order() {
        let Value::Object(record) = Value::from(json!({"Name": "A", "Id": 1, "Code": "z"})) else {
            panic!("Expected object");
        };
        assert_eq!(record.field_names(), vec!["Name", "Id", "Code"]);
    }

    #[test]
    fn test_scalar_text_uses_decimal_separator() {
        assert_eq!(Value::Float(1.5).scalar_text(','), Some("1,5".to_string()));
        assert_eq!(Value::Bool(true).scalar_text('.'), Some("true".to_string()));
        assert_eq!(Value::Null.scalar_text('.'), None);
        assert_eq!(Value::Array(vec![]).scalar_text('.'), None);
    }

    #[test]
    fn test_option_record_is_null_when_none() {
        let none: Option<DynamicRecord> = None;
        assert!(none.is_null());
        assert!(none.field_names().is_empty());

        let some = Some(DynamicRecord::new().with("A", 1));
        assert!(!some.is_null());
        assert_eq!(some.get("A"), Some(Value::Int(1)));
    }

    #[test]
    fn test_scalar_value_as_record() {
        let scalar = Value::Int(42);
        assert_eq!(scalar.field_names(), vec![SCALAR_FIELD_NAME]);
        assert_eq!(scalar.get(SCALAR_FIELD_NAME), Some(Value::Int(42)));
        assert!(Record::is_null(&Value::Null));
    }

    #[test]
    fn test_default_describe_uses_runtime_types() {
        let record = DynamicRecord::new().with("A", 1).with("B", vec!["x"]);
        let descriptors = record.describe();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].field_type, FieldType::Int);
        assert_eq!(descriptors[1].field_type, FieldType::Array);
    }
}
