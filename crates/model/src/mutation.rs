use crate::{EntityId, Fields};

/// Kind of a local mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
	Create,
	Update,
	Delete,
}

impl MutationKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Create => "create",
			Self::Update => "update",
			Self::Delete => "delete",
		}
	}
}

/// Completion state of a pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
	Pending,
	Confirmed,
	Failed,
}

/// One in-flight local change.
///
/// Lives from the moment a consumer issues the mutation until the remote
/// confirms or rejects it, or an authoritative refresh supersedes it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
	/// Store-local sequence number, unique per store instance.
	pub seq: u64,
	pub kind: MutationKind,
	/// Target identifier; temporary for creates without a client id.
	pub target: EntityId,
	/// Fields sent with the mutation. Empty for deletes.
	pub payload: Fields,
	pub state: MutationState,
}

impl PendingMutation {
	pub fn new(seq: u64, kind: MutationKind, target: EntityId, payload: Fields) -> Self {
		Self {
			seq,
			kind,
			target,
			payload,
			state: MutationState::Pending,
		}
	}

	pub fn is_settled(&self) -> bool {
		self.state != MutationState::Pending
	}
}
