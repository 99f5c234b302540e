//! Translation between remote rows and entities.
//!
//! This is the only place where remote-native naming and shape are resolved:
//! snake_case columns, string-typed numbers, absent defaults, renamed columns
//! such as `cover_image`. The store never looks at rows directly.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use larder_model::{ChangeEvent, ChangeKind, Entity, EntityId, FieldValue, Fields};
use larder_remote::{CREATED_AT_COLUMN, ID_COLUMN, Row, RowChange};
use serde_json::Value;

/// Shared handle to a mapping.
pub type SharedMapping = Arc<dyn RowMapping>;

/// Row/entity translation for one remote table.
pub trait RowMapping: Send + Sync + 'static {
	/// Remote table this mapping applies to.
	fn table(&self) -> &str;

	/// Decodes a stored row. `None` when the row has no usable identifier.
	fn decode(&self, row: &Row) -> Option<Entity>;

	/// Row sent with an insert. Temporary identifiers are left out so the
	/// remote assigns one.
	fn encode_insert(&self, entity: &Entity) -> Row;

	/// Columns sent with a partial update.
	fn encode_patch(&self, patch: &Fields) -> Row;

	/// Translates a change notification into an entity-shaped event.
	///
	/// Returns `None` for anything malformed: another table's event, a
	/// missing row, or a row without an identifier.
	fn translate(&self, change: &RowChange) -> Option<ChangeEvent> {
		if change.table != self.table() {
			return None;
		}
		match change.kind {
			ChangeKind::Insert => change.new.as_ref().and_then(|row| self.decode(row)).map(ChangeEvent::Insert),
			ChangeKind::Update => change.new.as_ref().and_then(|row| self.decode(row)).map(ChangeEvent::Update),
			ChangeKind::Delete => change
				.old
				.as_ref()
				.or(change.new.as_ref())
				.and_then(|row| row.get(ID_COLUMN))
				.and_then(EntityId::from_json)
				.map(ChangeEvent::Delete),
		}
	}
}

/// Semantic type of a mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
	Text,
	Number,
	Bool,
	List,
	Timestamp,
}

impl FieldKind {
	fn empty(self) -> FieldValue {
		match self {
			Self::Text => FieldValue::Text(String::new()),
			Self::Number => FieldValue::Number(0.0),
			Self::Bool => FieldValue::Bool(false),
			Self::List => FieldValue::List(Vec::new()),
			Self::Timestamp => FieldValue::Null,
		}
	}

	/// Coerces a remote value, falling back to `None` when it does not fit.
	fn coerce(self, value: &Value) -> Option<FieldValue> {
		match (self, value) {
			(_, Value::Null) => None,
			(Self::Text, Value::String(s)) => Some(FieldValue::Text(s.clone())),
			(Self::Text, Value::Number(n)) => Some(FieldValue::Text(n.to_string())),
			(Self::Text, Value::Bool(b)) => Some(FieldValue::Text(b.to_string())),
			(Self::Number, Value::Number(n)) => n.as_f64().map(FieldValue::Number),
			(Self::Number, Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).map(FieldValue::Number),
			(Self::Number, Value::Bool(b)) => Some(FieldValue::Number(if *b { 1.0 } else { 0.0 })),
			(Self::Bool, Value::Bool(b)) => Some(FieldValue::Bool(*b)),
			(Self::List, Value::Array(items)) => Some(FieldValue::List(items.iter().cloned().map(FieldValue::from_json).collect())),
			(Self::Timestamp, Value::String(s)) => parse_timestamp(s).map(FieldValue::Timestamp),
			_ => None,
		}
	}
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(s).ok().map(|ts| ts.with_timezone(&Utc))
}

fn timestamp_json(ts: DateTime<Utc>) -> Value {
	Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// `cover_image` -> `coverImage`.
fn camel_case(column: &str) -> String {
	let mut out = String::with_capacity(column.len());
	let mut upper = false;
	for ch in column.chars() {
		if ch == '_' {
			upper = true;
		} else if upper {
			out.extend(ch.to_uppercase());
			upper = false;
		} else {
			out.push(ch);
		}
	}
	out
}

/// One mapped column.
#[derive(Debug, Clone)]
pub struct Column {
	pub column: String,
	pub field: String,
	pub kind: FieldKind,
	/// Value used when the column is absent or does not coerce.
	pub default: FieldValue,
}

/// Declarative mapping: a list of columns plus pass-through of unknown ones.
#[derive(Debug, Clone)]
pub struct TableSchema {
	table: String,
	columns: Vec<Column>,
}

impl TableSchema {
	pub fn new(table: impl Into<String>) -> Self {
		Self {
			table: table.into(),
			columns: Vec::new(),
		}
	}

	/// Maps `column` to its camelCase field name.
	pub fn column(self, column: &str, kind: FieldKind) -> Self {
		let field = camel_case(column);
		self.renamed(column, &field, kind)
	}

	/// Maps `column` to an explicitly named field.
	pub fn renamed(mut self, column: &str, field: &str, kind: FieldKind) -> Self {
		self.columns.push(Column {
			column: column.to_string(),
			field: field.to_string(),
			kind,
			default: kind.empty(),
		});
		self
	}

	/// Overrides the default of the most recently added column.
	pub fn or(mut self, default: impl Into<FieldValue>) -> Self {
		if let Some(last) = self.columns.last_mut() {
			last.default = default.into();
		}
		self
	}

	pub fn columns(&self) -> &[Column] {
		&self.columns
	}

	fn column_for_field(&self, field: &str) -> Option<&Column> {
		self.columns.iter().find(|c| c.field == field)
	}

	fn is_mapped_column(&self, column: &str) -> bool {
		column == ID_COLUMN || column == CREATED_AT_COLUMN || self.columns.iter().any(|c| c.column == column)
	}
}

impl RowMapping for TableSchema {
	fn table(&self) -> &str {
		&self.table
	}

	fn decode(&self, row: &Row) -> Option<Entity> {
		let id = row.get(ID_COLUMN).and_then(EntityId::from_json)?;
		let created_at = row
			.get(CREATED_AT_COLUMN)
			.and_then(Value::as_str)
			.and_then(parse_timestamp)
			.unwrap_or_else(Utc::now);

		let mut fields = Fields::new();
		for column in &self.columns {
			let value = row
				.get(&column.column)
				.and_then(|v| column.kind.coerce(v))
				.unwrap_or_else(|| column.default.clone());
			fields.insert(column.field.clone(), value);
		}
		for (name, value) in row {
			if !self.is_mapped_column(name) {
				fields.insert(name.clone(), FieldValue::from_json(value.clone()));
			}
		}
		Some(Entity { id, created_at, fields })
	}

	fn encode_insert(&self, entity: &Entity) -> Row {
		let mut row = self.encode_patch(&entity.fields);
		if !entity.id.is_temporary() {
			row.insert(ID_COLUMN.to_string(), entity.id.to_json());
		}
		row
	}

	fn encode_patch(&self, patch: &Fields) -> Row {
		let mut row = Row::new();
		for (field, value) in patch {
			if let Some(column) = self.column_for_field(field) {
				row.insert(column.column.clone(), value.to_json());
			}
		}
		row
	}
}

/// Mapping of the `products` table.
pub fn products(table: &str) -> TableSchema {
	use larder_model::catalog::IN_STOCK;
	TableSchema::new(table)
		.column("title", FieldKind::Text)
		.column("category", FieldKind::Text)
		.column("price", FieldKind::Number)
		.column("weight", FieldKind::Text)
		.column("stock", FieldKind::Number)
		.column("description", FieldKind::Text)
		.column("ingredients", FieldKind::Text)
		.column("benefits", FieldKind::Text)
		.column("images", FieldKind::List)
		.column("featured", FieldKind::Bool)
		.column("status", FieldKind::Text)
		.or(IN_STOCK)
}

/// Mapping of the `blogs` table.
///
/// The remote stores the image as `cover_image`, derives a URL slug from the
/// title, and tracks publication and edit times.
#[derive(Debug, Clone)]
pub struct BlogMapping {
	schema: TableSchema,
}

impl BlogMapping {
	pub fn new(table: &str) -> Self {
		Self {
			schema: TableSchema::new(table)
				.column("title", FieldKind::Text)
				.column("excerpt", FieldKind::Text)
				.column("content", FieldKind::Text)
				.column("author", FieldKind::Text)
				.column("category", FieldKind::Text)
				.renamed("cover_image", "image", FieldKind::Text)
				.column("published_at", FieldKind::Timestamp),
		}
	}
}

/// URL slug derived from a title: lowercase, runs of other characters
/// collapsed to `-`.
pub fn slugify(title: &str) -> String {
	let mut slug = String::with_capacity(title.len());
	let mut gap = false;
	for ch in title.chars().flat_map(char::to_lowercase) {
		if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
			slug.push(ch);
			gap = false;
		} else if !gap {
			slug.push('-');
			gap = true;
		}
	}
	slug
}

impl RowMapping for BlogMapping {
	fn table(&self) -> &str {
		self.schema.table()
	}

	fn decode(&self, row: &Row) -> Option<Entity> {
		self.schema.decode(row)
	}

	fn encode_insert(&self, entity: &Entity) -> Row {
		let mut row = self.schema.encode_insert(entity);
		row.insert("slug".to_string(), Value::String(slugify(entity.text("title"))));
		row.insert("published".to_string(), Value::Bool(true));
		if !matches!(row.get("published_at"), Some(Value::String(_))) {
			row.insert("published_at".to_string(), timestamp_json(Utc::now()));
		}
		row
	}

	fn encode_patch(&self, patch: &Fields) -> Row {
		let mut row = self.schema.encode_patch(patch);
		row.insert("updated_at".to_string(), timestamp_json(Utc::now()));
		row
	}
}
