use larder_model::EntityId;
use larder_remote::RemoteError;

use crate::storage::StorageError;

/// Result alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors surfaced to store callers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	/// The remote rejected or never received the mutation. The store has
	/// already re-fetched by the time this is returned.
	#[error(transparent)]
	Remote(#[from] RemoteError),
	#[error("an entity with id {0} already exists")]
	DuplicateId(EntityId),
	/// The target only exists locally; its create is still in flight.
	#[error("entity {0} is not yet confirmed by the remote")]
	Unconfirmed(EntityId),
	#[error("remote returned a row for `{table}` that could not be decoded")]
	Malformed { table: String },
	#[error(transparent)]
	Storage(#[from] StorageError),
	#[error(transparent)]
	Import(#[from] ImportError),
	#[error(transparent)]
	Checkout(#[from] CheckoutError),
	#[error("encoding failed: {0}")]
	Encode(#[from] serde_json::Error),
}

/// Bulk import rejections.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
	#[error("import is not valid JSON: {0}")]
	Parse(serde_json::Error),
	#[error("import must be a JSON array of entities")]
	NotAnArray,
	#[error("import item {index} is not a valid entity: {reason}")]
	InvalidEntity { index: usize, reason: String },
}

/// Order submission rejections raised before anything is sent.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
	#[error("cart is empty")]
	EmptyCart,
	#[error("customer {0} is required")]
	MissingContact(&'static str),
}
