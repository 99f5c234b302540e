use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix carried by identifiers minted locally for optimistic creates.
const TEMPORARY_PREFIX: &str = "local-";

/// Stable identifier of an entity within its collection.
///
/// Remote tables use either serial integers or client-chosen strings (the
/// built-in catalog uses `"P1"`, `"P2"`, ...), so both are first-class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
	/// Serial identifier assigned by the remote table.
	Int(i64),
	/// Textual identifier, either client-chosen or temporary.
	Text(String),
}

impl EntityId {
	/// Mints a fresh temporary identifier for an optimistic create.
	pub fn temporary() -> Self {
		Self::Text(format!("{TEMPORARY_PREFIX}{}", uuid::Uuid::new_v4().simple()))
	}

	/// Returns true for identifiers minted by [`Self::temporary`].
	pub fn is_temporary(&self) -> bool {
		matches!(self, Self::Text(s) if s.starts_with(TEMPORARY_PREFIX))
	}

	/// Compares identifiers by their textual rendering, so `7` matches `"7"`.
	///
	/// Route parameters arrive as strings while remote ids may be integers.
	pub fn loosely_eq(&self, other: &str) -> bool {
		match self {
			Self::Int(n) => other.parse::<i64>().is_ok_and(|o| o == *n),
			Self::Text(s) => s == other,
		}
	}

	/// Decodes an identifier from a JSON value; anything but a string or an
	/// integer is rejected.
	pub fn from_json(value: &serde_json::Value) -> Option<Self> {
		match value {
			serde_json::Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
			serde_json::Value::Number(n) => n.as_i64().map(Self::Int),
			_ => None,
		}
	}

	/// Encodes the identifier as a JSON value.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Self::Int(n) => serde_json::Value::from(*n),
			Self::Text(s) => serde_json::Value::from(s.as_str()),
		}
	}
}

impl fmt::Display for EntityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int(n) => write!(f, "{n}"),
			Self::Text(s) => f.write_str(s),
		}
	}
}

impl From<i64> for EntityId {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<i32> for EntityId {
	fn from(value: i32) -> Self {
		Self::Int(i64::from(value))
	}
}

impl From<&str> for EntityId {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for EntityId {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
