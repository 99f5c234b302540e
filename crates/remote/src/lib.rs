//! Remote collection contract.
//!
//! A remote collection is one table-like resource reached over an async API:
//! row-shaped records with a primary identifier, a `created_at` column used
//! for default ordering, and a change-notification channel keyed by table
//! name. Rows travel in the remote-native shape (snake_case columns); mapping
//! them to entities is the caller's concern.
//!
//! [`MemoryTable`] is an in-process implementation with fault injection,
//! used by tests and by the operator demo.

mod client;
mod error;
pub mod memory;
mod subscription;

pub use client::{RemoteCollectionClient, SharedClient};
pub use error::{RemoteError, Result};
pub use larder_model::ChangeKind;
pub use memory::{MemoryDatabase, MemoryTable, Operation};
pub use subscription::Subscription;

/// A remote-native record: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Primary key column of every remote table.
pub const ID_COLUMN: &str = "id";
/// Creation timestamp column of every remote table.
pub const CREATED_AT_COLUMN: &str = "created_at";

/// A change notification as emitted by the remote.
///
/// `new` carries the full row for inserts and updates; `old` carries at least
/// the primary key for updates and deletes.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
	pub table: String,
	pub kind: ChangeKind,
	pub new: Option<Row>,
	pub old: Option<Row>,
}
