use larder_model::EntityId;

/// Result alias for remote operations.
pub type Result<T, E = RemoteError> = std::result::Result<T, E>;

/// Failures reported by a remote collection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
	/// The remote could not be reached, or rejected the credentials.
	#[error("transport error: {0}")]
	Transport(String),
	/// The remote rejected the payload shape.
	#[error("validation failed: {0}")]
	Validation(String),
	/// The mutation target does not exist remotely.
	#[error("{table}: no row with id {id}")]
	NotFound { table: String, id: EntityId },
}

impl RemoteError {
	pub fn transport(reason: impl Into<String>) -> Self {
		Self::Transport(reason.into())
	}

	pub fn validation(reason: impl Into<String>) -> Self {
		Self::Validation(reason.into())
	}

	/// Short stable label for structured logs.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Transport(_) => "transport",
			Self::Validation(_) => "validation",
			Self::NotFound { .. } => "not_found",
		}
	}
}
