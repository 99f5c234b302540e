use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Named fields of an entity, keyed by application-side field name.
pub type Fields = BTreeMap<String, FieldValue>;

/// Scalar or list-of-scalar field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	Null,
	Text(String),
	Number(f64),
	Bool(bool),
	/// Ordered list, e.g. image references.
	List(Vec<FieldValue>),
	Timestamp(DateTime<Utc>),
}

impl FieldValue {
	/// Converts a JSON value without any schema knowledge.
	///
	/// Strings stay text even when they look like timestamps; typed decoding
	/// happens at the row-mapping boundary. Objects are not field values and
	/// are kept as their JSON text.
	pub fn from_json(value: Value) -> Self {
		match value {
			Value::Null => Self::Null,
			Value::Bool(b) => Self::Bool(b),
			Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
			Value::String(s) => Self::Text(s),
			Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
			Value::Object(map) => Self::Text(Value::Object(map).to_string()),
		}
	}

	/// Encodes the value as JSON. Timestamps become RFC 3339 strings.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Null => Value::Null,
			Self::Text(s) => Value::String(s.clone()),
			Self::Number(n) => {
				if n.fract() == 0.0 && n.abs() < 9.0e15 {
					Value::from(*n as i64)
				} else {
					serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number)
				}
			}
			Self::Bool(b) => Value::Bool(*b),
			Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
			Self::Timestamp(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Self::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// Returns the textual items of a list, skipping non-text entries.
	pub fn text_items(&self) -> Vec<String> {
		match self {
			Self::List(items) => items.iter().filter_map(|v| v.as_text().map(str::to_string)).collect(),
			_ => Vec::new(),
		}
	}
}

impl From<&str> for FieldValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for FieldValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<f64> for FieldValue {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}

impl From<i64> for FieldValue {
	fn from(value: i64) -> Self {
		Self::Number(value as f64)
	}
}

impl From<i32> for FieldValue {
	fn from(value: i32) -> Self {
		Self::Number(f64::from(value))
	}
}

impl From<bool> for FieldValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<Vec<String>> for FieldValue {
	fn from(value: Vec<String>) -> Self {
		Self::List(value.into_iter().map(Self::Text).collect())
	}
}

impl From<DateTime<Utc>> for FieldValue {
	fn from(value: DateTime<Utc>) -> Self {
		Self::Timestamp(value)
	}
}

impl Serialize for FieldValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for FieldValue {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Value::deserialize(deserializer).map(Self::from_json)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn whole_numbers_encode_as_integers() {
		assert_eq!(FieldValue::Number(1500.0).to_json(), json!(1500));
		assert_eq!(FieldValue::Number(12.5).to_json(), json!(12.5));
	}

	#[test]
	fn lists_keep_order() {
		let v = FieldValue::from_json(json!(["a.jpg", "b.jpg"]));
		assert_eq!(v.text_items(), vec!["a.jpg".to_string(), "b.jpg".to_string()]);
	}

	#[test]
	fn objects_degrade_to_text() {
		let v = FieldValue::from_json(json!({"k": 1}));
		assert_eq!(v.as_text(), Some(r#"{"k":1}"#));
	}
}
