use crate::{Entity, EntityId};

/// Kind of an inbound change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
	Insert,
	Update,
	Delete,
}

impl ChangeKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Insert => "insert",
			Self::Update => "update",
			Self::Delete => "delete",
		}
	}
}

/// An inbound change, already translated into the entity shape.
///
/// Produced by the remote asynchronously and consumed exactly once by the
/// store that owns the affected collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
	Insert(Entity),
	Update(Entity),
	Delete(EntityId),
}

impl ChangeEvent {
	pub const fn kind(&self) -> ChangeKind {
		match self {
			Self::Insert(_) => ChangeKind::Insert,
			Self::Update(_) => ChangeKind::Update,
			Self::Delete(_) => ChangeKind::Delete,
		}
	}

	pub fn id(&self) -> &EntityId {
		match self {
			Self::Insert(entity) | Self::Update(entity) => &entity.id,
			Self::Delete(id) => id,
		}
	}
}
