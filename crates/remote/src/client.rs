use std::sync::Arc;

use async_trait::async_trait;
use larder_model::EntityId;

use crate::{Result, Row, Subscription};

/// Shared handle to a remote collection.
pub type SharedClient = Arc<dyn RemoteCollectionClient>;

/// CRUD operations and change subscription against one remote table.
#[async_trait]
pub trait RemoteCollectionClient: Send + Sync {
	/// Name of the remote table, also the key of its change channel.
	fn table(&self) -> &str;

	/// Every row, ascending by `created_at`.
	///
	/// A transport failure means "no authoritative data", never "empty".
	async fn fetch_all(&self) -> Result<Vec<Row>>;

	/// Inserts a row and returns it as stored, with the identifier (when the
	/// caller left it out) and `created_at` filled in by the remote.
	async fn insert(&self, row: Row) -> Result<Row>;

	/// Overwrites the given columns of an existing row.
	async fn update(&self, id: &EntityId, patch: Row) -> Result<()>;

	/// Deletes a row. Deleting an absent identifier succeeds.
	async fn delete(&self, id: &EntityId) -> Result<()>;

	/// Opens a change subscription on this table.
	///
	/// The returned [`Subscription`] must be released on teardown; dropping
	/// it does so.
	fn subscribe(&self) -> Result<Subscription>;
}
