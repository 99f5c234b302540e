use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntityId, FieldValue, Fields};

/// A record of named fields under a stable identifier.
///
/// Serializes in the application shape: `id`, `createdAt`, then the fields
/// flattened alongside them. This is the shape of bulk exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
	pub id: EntityId,
	#[serde(rename = "createdAt", default = "Utc::now")]
	pub created_at: DateTime<Utc>,
	#[serde(flatten)]
	pub fields: Fields,
}

impl Entity {
	pub fn new(id: impl Into<EntityId>, created_at: DateTime<Utc>) -> Self {
		Self {
			id: id.into(),
			created_at,
			fields: Fields::new(),
		}
	}

	/// Builder-style field setter.
	pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
		self.fields.insert(name.to_string(), value.into());
		self
	}

	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.fields.get(name)
	}

	/// Text field, or the empty string when absent or not text.
	pub fn text(&self, name: &str) -> &str {
		self.get(name).and_then(FieldValue::as_text).unwrap_or_default()
	}

	/// Numeric field, or zero when absent or not numeric.
	pub fn number(&self, name: &str) -> f64 {
		self.get(name).and_then(FieldValue::as_number).unwrap_or_default()
	}

	pub fn flag(&self, name: &str) -> bool {
		self.get(name).and_then(FieldValue::as_bool).unwrap_or_default()
	}

	/// Overwrites the named fields, leaving the others untouched.
	pub fn merge(&mut self, patch: &Fields) {
		for (name, value) in patch {
			self.fields.insert(name.clone(), value.clone());
		}
	}
}

/// Input to an optimistic create.
///
/// `id` is optional: when absent the store mints a temporary identifier that
/// the remote replaces on confirmation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
	pub id: Option<EntityId>,
	pub fields: Fields,
}

impl Draft {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
		self.fields.insert(name.to_string(), value.into());
		self
	}
}
