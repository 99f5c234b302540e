//! Ordered, identifier-unique entity collection.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{Entity, EntityId, Fields};

/// Result of replacing a temporary identifier with a confirmed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
	/// The entry now carries the confirmed identifier.
	Renamed,
	/// The confirmed identifier was already present (its insert event won the
	/// race), so the temporary entry was dropped.
	Collapsed,
	/// Neither identifier was present; nothing changed.
	Missing,
}

/// Entities ordered by ascending creation time, unique by identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
	entries: IndexMap<EntityId, Entity>,
}

impl Collection {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a collection from entities in any order.
	///
	/// Later duplicates of an identifier replace earlier ones.
	pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
		let mut collection = Self::new();
		for entity in entities {
			collection.upsert(entity);
		}
		collection
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn contains(&self, id: &EntityId) -> bool {
		self.entries.contains_key(id)
	}

	pub fn get(&self, id: &EntityId) -> Option<&Entity> {
		self.entries.get(id)
	}

	pub fn position(&self, id: &EntityId) -> Option<usize> {
		self.entries.get_index_of(id)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Entity> {
		self.entries.values()
	}

	pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
		self.entries.keys()
	}

	/// Copies the current entities into an immutable, cheaply clonable slice.
	pub fn to_shared(&self) -> Arc<[Entity]> {
		self.entries.values().cloned().collect()
	}

	/// Inserts at the position dictated by `created_at`.
	///
	/// Returns false and leaves the collection untouched when the identifier
	/// is already present.
	pub fn insert(&mut self, entity: Entity) -> bool {
		if self.entries.contains_key(&entity.id) {
			return false;
		}
		let at = self.entries.partition_point(|_, existing| existing.created_at <= entity.created_at);
		self.entries.shift_insert(at, entity.id.clone(), entity);
		true
	}

	/// Inserts or wholesale-replaces an entity, keeping the ordering invariant.
	pub fn upsert(&mut self, entity: Entity) {
		if !self.replace(entity.clone()) {
			self.insert(entity);
		}
	}

	/// Wholesale replacement of an existing entity. Returns false when absent.
	pub fn replace(&mut self, entity: Entity) -> bool {
		let Some(index) = self.entries.get_index_of(&entity.id) else {
			return false;
		};
		if let Some((_, slot)) = self.entries.get_index_mut(index) {
			*slot = entity;
		}
		self.restore_order(index);
		true
	}

	/// Merges fields into an existing entity. Returns false when absent.
	pub fn merge(&mut self, id: &EntityId, patch: &Fields) -> bool {
		match self.entries.get_mut(id) {
			Some(entity) => {
				entity.merge(patch);
				true
			}
			None => false,
		}
	}

	/// Removes an entity, preserving the order of the rest.
	pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
		self.entries.shift_remove(id)
	}

	/// Replaces the entry under `from` with `confirmed`, keeping its list
	/// position unless the confirmed timestamp forces a move.
	pub fn rename(&mut self, from: &EntityId, confirmed: Entity) -> RenameOutcome {
		if *from != confirmed.id && self.entries.contains_key(&confirmed.id) {
			return match self.entries.shift_remove(from) {
				Some(_) => RenameOutcome::Collapsed,
				None => RenameOutcome::Missing,
			};
		}
		let Some(index) = self.entries.get_index_of(from) else {
			return RenameOutcome::Missing;
		};
		self.entries.shift_remove_index(index);
		self.entries.shift_insert(index, confirmed.id.clone(), confirmed);
		self.restore_order(index);
		RenameOutcome::Renamed
	}

	/// Drops everything and rebuilds from `entities`.
	pub fn replace_all(&mut self, entities: impl IntoIterator<Item = Entity>) {
		*self = Self::from_entities(entities);
	}

	/// Moves the entry at `index` if its timestamp no longer fits between its
	/// neighbours.
	fn restore_order(&mut self, index: usize) {
		let Some((_, entity)) = self.entries.get_index(index) else {
			return;
		};
		let ts = entity.created_at;
		let created_at = |i: usize| self.entries.get_index(i).map(|(_, e)| e.created_at);
		let before_ok = index.checked_sub(1).and_then(created_at).is_none_or(|prev| prev <= ts);
		let after_ok = created_at(index + 1).is_none_or(|next| next >= ts);
		if before_ok && after_ok {
			return;
		}
		if let Some((_, entity)) = self.entries.shift_remove_index(index) {
			self.insert(entity);
		}
	}
}

impl<'a> IntoIterator for &'a Collection {
	type Item = &'a Entity;
	type IntoIter = indexmap::map::Values<'a, EntityId, Entity>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.values()
	}
}

#[cfg(test)]
mod tests;
