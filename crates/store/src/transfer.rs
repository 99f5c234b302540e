//! Bulk export and import of a collection as a JSON array.

use larder_model::Entity;
use serde_json::Value;

use crate::{ImportError, Result};

/// Pretty-printed JSON array of entities in collection order.
pub fn export(entities: &[Entity]) -> Result<String> {
	Ok(serde_json::to_string_pretty(entities)?)
}

/// Parses an import file. Anything but a JSON array of entity objects is
/// rejected as a whole; nothing is partially applied.
pub fn parse_import(text: &str) -> Result<Vec<Entity>, ImportError> {
	let value: Value = serde_json::from_str(text).map_err(ImportError::Parse)?;
	let Value::Array(items) = value else {
		return Err(ImportError::NotAnArray);
	};
	items
		.into_iter()
		.enumerate()
		.map(|(index, item)| {
			if !item.is_object() {
				return Err(ImportError::InvalidEntity {
					index,
					reason: "not an object".into(),
				});
			}
			serde_json::from_value(item).map_err(|e| ImportError::InvalidEntity {
				index,
				reason: e.to_string(),
			})
		})
		.collect()
}

/// Result of a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
	pub imported: usize,
	/// Whether the local durable copy was written.
	pub stored_locally: bool,
}

impl ImportReport {
	/// Imports replace local data only; the remote is not written.
	pub const WARNING: &'static str =
		"import replaced local data only; it is not persisted remotely and will be overwritten by the next refresh";
}
