//! Optimistic collection store.
//!
//! Holds the collection snapshot presentation code reads, applies local
//! mutations before the remote confirms them, and reconciles remote change
//! events idempotently per identifier. On any remote failure the store
//! re-fetches the authoritative state before reporting the error, so a caller
//! that observes the error also observes the repaired snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use larder_model::{
	ChangeEvent, Collection, Draft, Entity, EntityId, Fields, MutationKind, MutationState, PendingMutation, RenameOutcome,
};
use larder_remote::{RemoteError, SharedClient};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::mapping::SharedMapping;
use crate::storage::{self, SharedStorage};
use crate::transfer::{self, ImportReport};
use crate::{Result, StoreError};

/// Lifecycle phase of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	/// Nothing has been loaded yet.
	Loading,
	/// The snapshot holds authoritative, fallback or optimistic data.
	Ready,
}

/// Immutable view of a store at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
	pub phase: Phase,
	/// Bumped on every published change.
	pub version: u64,
	/// Entities ascending by creation time.
	pub entities: Arc<[Entity]>,
}

impl Snapshot {
	fn loading() -> Self {
		Self {
			phase: Phase::Loading,
			version: 0,
			entities: Collection::new().to_shared(),
		}
	}

	pub fn get(&self, id: &EntityId) -> Option<&Entity> {
		self.entities.iter().find(|e| &e.id == id)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Entity> {
		self.entities.iter()
	}

	pub fn len(&self) -> usize {
		self.entities.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entities.is_empty()
	}

	pub fn is_ready(&self) -> bool {
		self.phase == Phase::Ready
	}
}

/// Where non-authoritative data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackSource {
	LocalStorage,
	Seed,
}

/// Result of [`OptimisticStore::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The remote answered; the snapshot now mirrors it.
	Authoritative { count: usize },
	/// The remote answered with no rows; the built-in dataset is shown
	/// locally and the remote is left empty.
	EmptyRemote { seed: usize },
	/// The remote failed before anything was loaded.
	Fallback(FallbackSource),
	/// The remote failed, or a newer refresh already landed; the snapshot
	/// was left as it was.
	Retained,
}

struct State {
	phase: Phase,
	collection: Collection,
	pending: BTreeMap<u64, PendingMutation>,
	next_seq: u64,
	version: u64,
	/// Ticket of the newest refresh started / applied.
	refresh_started: u64,
	refresh_applied: u64,
	refreshing: usize,
	/// Events reconciled while a fetch was in flight, numbered by
	/// `reconciled`. Replayed over fetched rows, which may predate them.
	reconciled: u64,
	journal: Vec<(u64, ChangeEvent)>,
}

impl State {
	fn begin(&mut self, kind: MutationKind, target: EntityId, payload: Fields) -> u64 {
		self.next_seq += 1;
		let seq = self.next_seq;
		self.pending.insert(seq, PendingMutation::new(seq, kind, target, payload));
		seq
	}

	fn apply(&mut self, event: ChangeEvent) -> bool {
		match event {
			ChangeEvent::Insert(entity) => self.collection.insert(entity),
			ChangeEvent::Update(entity) => self.collection.replace(entity),
			ChangeEvent::Delete(id) => self.collection.remove(&id).is_some(),
		}
	}

	/// Re-applies events reconciled after `mark` on top of fresh rows.
	fn replay_since(&mut self, mark: u64) -> usize {
		let events: Vec<ChangeEvent> = self
			.journal
			.iter()
			.filter(|(n, _)| *n > mark)
			.map(|(_, event)| event.clone())
			.collect();
		let replayed = events.len();
		for event in events {
			self.apply(event);
		}
		replayed
	}

	/// Settled mutations leave the pending set. A refresh may already have
	/// superseded them, in which case this is a no-op.
	fn settle(&mut self, seq: u64, outcome: MutationState) {
		if let Some(mut mutation) = self.pending.remove(&seq) {
			mutation.state = outcome;
			tracing::trace!(
				seq,
				kind = mutation.kind.as_str(),
				target = %mutation.target,
				state = ?mutation.state,
				"mutation settled"
			);
		}
	}
}

struct Inner {
	remote: SharedClient,
	mapping: SharedMapping,
	storage: Option<(SharedStorage, String)>,
	seed: Vec<Entity>,
	seed_when_empty: bool,
	state: Mutex<State>,
	snapshots: watch::Sender<Snapshot>,
}

impl Inner {
	fn table(&self) -> &str {
		self.mapping.table()
	}

	/// Publishes the current state. Called with the state lock held so
	/// snapshots are published in the order changes were applied.
	fn publish(&self, state: &mut State) {
		state.version += 1;
		self.snapshots.send_replace(Snapshot {
			phase: state.phase,
			version: state.version,
			entities: state.collection.to_shared(),
		});
	}

	fn read_local(&self) -> Option<Vec<Entity>> {
		let (storage, key) = self.storage.as_ref()?;
		match storage::read_json::<Vec<Entity>>(storage.as_ref(), key) {
			Ok(Some(entities)) if !entities.is_empty() => Some(entities),
			Ok(_) => None,
			Err(error) => {
				tracing::warn!(table = %self.table(), key = %key, %error, "local fallback unreadable");
				None
			}
		}
	}
}

/// Marks one refresh in flight. The change journal is only kept while some
/// refresh is running, including one whose future was dropped mid-fetch.
struct InFlight<'a>(&'a Inner);

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		let mut state = self.0.state.lock();
		state.refreshing -= 1;
		if state.refreshing == 0 {
			state.journal.clear();
		}
	}
}

/// Configures an [`OptimisticStore`].
pub struct StoreBuilder {
	remote: SharedClient,
	mapping: SharedMapping,
	storage: Option<(SharedStorage, String)>,
	seed: Vec<Entity>,
	seed_when_empty: bool,
}

impl StoreBuilder {
	/// Local durable copy used as fallback and written on bulk replace.
	pub fn storage(mut self, storage: SharedStorage, key: impl Into<String>) -> Self {
		self.storage = Some((storage, key.into()));
		self
	}

	/// Built-in dataset shown when neither the remote nor local storage has
	/// data.
	pub fn seed(mut self, seed: Vec<Entity>) -> Self {
		self.seed = seed;
		self
	}

	/// Writes the seed to the remote when the remote table is empty.
	pub fn seed_when_empty(mut self, enabled: bool) -> Self {
		self.seed_when_empty = enabled;
		self
	}

	pub fn build(self) -> OptimisticStore {
		let (snapshots, _) = watch::channel(Snapshot::loading());
		OptimisticStore {
			inner: Arc::new(Inner {
				remote: self.remote,
				mapping: self.mapping,
				storage: self.storage,
				seed: self.seed,
				seed_when_empty: self.seed_when_empty,
				state: Mutex::new(State {
					phase: Phase::Loading,
					collection: Collection::new(),
					pending: BTreeMap::new(),
					next_seq: 0,
					version: 0,
					refresh_started: 0,
					refresh_applied: 0,
					refreshing: 0,
					reconciled: 0,
					journal: Vec::new(),
				}),
				snapshots,
			}),
		}
	}
}

/// Optimistic store for one remote collection. Clones share state.
#[derive(Clone)]
pub struct OptimisticStore {
	inner: Arc<Inner>,
}

impl OptimisticStore {
	pub fn builder(remote: SharedClient, mapping: SharedMapping) -> StoreBuilder {
		StoreBuilder {
			remote,
			mapping,
			storage: None,
			seed: Vec::new(),
			seed_when_empty: false,
		}
	}

	pub fn table(&self) -> &str {
		self.inner.table()
	}

	pub fn remote(&self) -> &SharedClient {
		&self.inner.remote
	}

	pub fn mapping(&self) -> &SharedMapping {
		&self.inner.mapping
	}

	pub fn snapshot(&self) -> Snapshot {
		self.inner.snapshots.borrow().clone()
	}

	/// Receiver notified on every published snapshot.
	pub fn subscribe_snapshots(&self) -> watch::Receiver<Snapshot> {
		self.inner.snapshots.subscribe()
	}

	/// Mutations issued but not yet confirmed, rejected or superseded.
	pub fn pending(&self) -> Vec<PendingMutation> {
		self.inner.state.lock().pending.values().cloned().collect()
	}

	/// Optimistically inserts `draft` and forwards it to the remote.
	///
	/// Returns the entity as confirmed by the remote. The optimistic entry
	/// carries a temporary identifier until then, unless the draft brought
	/// its own.
	pub async fn create(&self, draft: Draft) -> Result<Entity> {
		let inner = &self.inner;
		let (local_id, seq, entity) = {
			let mut state = inner.state.lock();
			let id = draft.id.unwrap_or_else(EntityId::temporary);
			if state.collection.contains(&id) {
				return Err(StoreError::DuplicateId(id));
			}
			let entity = Entity {
				id: id.clone(),
				created_at: Utc::now(),
				fields: draft.fields,
			};
			state.collection.insert(entity.clone());
			let seq = state.begin(MutationKind::Create, id.clone(), entity.fields.clone());
			inner.publish(&mut state);
			(id, seq, entity)
		};
		tracing::debug!(table = %inner.table(), id = %local_id, seq, "optimistic create");

		let row = inner.mapping.encode_insert(&entity);
		let failure = match inner.remote.insert(row).await {
			Ok(stored) => match inner.mapping.decode(&stored) {
				Some(confirmed) => {
					let mut state = inner.state.lock();
					state.settle(seq, MutationState::Confirmed);
					let outcome = state.collection.rename(&local_id, confirmed.clone());
					if outcome == RenameOutcome::Missing {
						state.collection.insert(confirmed.clone());
					}
					inner.publish(&mut state);
					tracing::debug!(
						table = %inner.table(),
						local = %local_id,
						id = %confirmed.id,
						?outcome,
						"create confirmed"
					);
					return Ok(confirmed);
				}
				None => StoreError::Malformed {
					table: inner.table().to_string(),
				},
			},
			Err(err) => StoreError::Remote(err),
		};

		tracing::warn!(table = %inner.table(), id = %local_id, error = %failure, "create failed, re-fetching");
		{
			let mut state = inner.state.lock();
			state.settle(seq, MutationState::Failed);
			if state.collection.remove(&local_id).is_some() {
				inner.publish(&mut state);
			}
		}
		self.refresh().await;
		Err(failure)
	}

	/// Merges `fields` into the entity and forwards the patch to the remote.
	pub async fn update(&self, id: &EntityId, fields: Fields) -> Result<()> {
		if id.is_temporary() {
			return Err(StoreError::Unconfirmed(id.clone()));
		}
		let inner = &self.inner;
		let seq = {
			let mut state = inner.state.lock();
			let seq = state.begin(MutationKind::Update, id.clone(), fields.clone());
			if state.collection.merge(id, &fields) {
				inner.publish(&mut state);
			}
			seq
		};
		tracing::debug!(table = %inner.table(), %id, seq, "optimistic update");

		let patch = inner.mapping.encode_patch(&fields);
		let result = inner.remote.update(id, patch).await;
		self.settle_remote(seq, id, MutationKind::Update, result).await
	}

	/// Removes the entity and forwards the delete to the remote.
	///
	/// Deleting an identifier the remote no longer has succeeds.
	pub async fn delete(&self, id: &EntityId) -> Result<()> {
		if id.is_temporary() {
			return Err(StoreError::Unconfirmed(id.clone()));
		}
		let inner = &self.inner;
		let seq = {
			let mut state = inner.state.lock();
			let seq = state.begin(MutationKind::Delete, id.clone(), Fields::new());
			if state.collection.remove(id).is_some() {
				inner.publish(&mut state);
			}
			seq
		};
		tracing::debug!(table = %inner.table(), %id, seq, "optimistic delete");

		let result = inner.remote.delete(id).await;
		self.settle_remote(seq, id, MutationKind::Delete, result).await
	}

	async fn settle_remote(
		&self,
		seq: u64,
		id: &EntityId,
		kind: MutationKind,
		result: std::result::Result<(), RemoteError>,
	) -> Result<()> {
		match result {
			Ok(()) => {
				self.inner.state.lock().settle(seq, MutationState::Confirmed);
				Ok(())
			}
			Err(err) => {
				tracing::warn!(
					table = %self.table(),
					%id,
					kind = kind.as_str(),
					error = %err,
					error_kind = err.kind(),
					"mutation failed, re-fetching"
				);
				self.inner.state.lock().settle(seq, MutationState::Failed);
				self.refresh().await;
				Err(err.into())
			}
		}
	}

	/// Applies a remote change event. Returns whether the snapshot changed.
	///
	/// Inserts of a present identifier and updates or deletes of an absent
	/// one are no-ops, so replays and acknowledgement races converge.
	pub fn reconcile(&self, event: ChangeEvent) -> bool {
		let inner = &self.inner;
		let kind = event.kind();
		let mut state = inner.state.lock();
		if state.refreshing > 0 {
			state.reconciled += 1;
			let n = state.reconciled;
			state.journal.push((n, event.clone()));
		}
		let changed = state.apply(event);
		if changed {
			inner.publish(&mut state);
		}
		tracing::trace!(table = %inner.table(), kind = kind.as_str(), changed, "reconciled");
		changed
	}

	/// Re-fetches the whole collection.
	///
	/// An authoritative answer replaces the snapshot and supersedes every
	/// pending mutation. Change events reconciled while the fetch was in
	/// flight are replayed over its rows. An empty answer shows the seed
	/// locally, unless remote seeding is enabled. When the remote fails before
	/// anything was loaded, the local durable copy or the seed is shown
	/// instead.
	pub async fn refresh(&self) -> RefreshOutcome {
		let inner = &self.inner;
		let (ticket, mark) = {
			let mut state = inner.state.lock();
			state.refresh_started += 1;
			state.refreshing += 1;
			(state.refresh_started, state.reconciled)
		};
		let _in_flight = InFlight(inner);

		let fetched = match inner.remote.fetch_all().await {
			Ok(rows) => {
				let total = rows.len();
				let entities: Vec<Entity> = rows.iter().filter_map(|row| inner.mapping.decode(row)).collect();
				if entities.len() < total {
					tracing::warn!(table = %inner.table(), skipped = total - entities.len(), "skipped undecodable rows");
				}
				match (entities.is_empty() && !inner.seed.is_empty(), inner.seed_when_empty) {
					(true, true) => self.seed_remote().await.map(|stored| (stored, false)),
					(true, false) => Ok((inner.seed.clone(), true)),
					(false, _) => Ok((entities, false)),
				}
			}
			Err(err) => Err(err),
		};

		match fetched {
			Ok((entities, seeded_locally)) => {
				let mut state = inner.state.lock();
				if ticket < state.refresh_applied {
					tracing::debug!(table = %inner.table(), ticket, "stale refresh discarded");
					return RefreshOutcome::Retained;
				}
				state.refresh_applied = ticket;
				let count = entities.len();
				state.collection.replace_all(entities);
				let replayed = state.replay_since(mark);
				state.pending.clear();
				state.phase = Phase::Ready;
				inner.publish(&mut state);
				tracing::debug!(table = %inner.table(), count, replayed, seeded_locally, "refreshed");
				if seeded_locally {
					RefreshOutcome::EmptyRemote { seed: count }
				} else {
					RefreshOutcome::Authoritative { count }
				}
			}
			Err(err) => {
				tracing::warn!(table = %inner.table(), error = %err, error_kind = err.kind(), "refresh failed");
				if inner.state.lock().phase == Phase::Ready {
					return RefreshOutcome::Retained;
				}
				let (source, entities) = match inner.read_local() {
					Some(entities) => (FallbackSource::LocalStorage, entities),
					None => (FallbackSource::Seed, inner.seed.clone()),
				};
				let mut state = inner.state.lock();
				if state.phase == Phase::Ready {
					return RefreshOutcome::Retained;
				}
				state.collection.replace_all(entities);
				state.phase = Phase::Ready;
				inner.publish(&mut state);
				tracing::info!(table = %inner.table(), ?source, count = state.collection.len(), "showing fallback data");
				RefreshOutcome::Fallback(source)
			}
		}
	}

	/// Inserts the seed into an empty remote table and returns what the
	/// remote stored.
	async fn seed_remote(&self) -> std::result::Result<Vec<Entity>, RemoteError> {
		let inner = &self.inner;
		tracing::info!(table = %inner.table(), count = inner.seed.len(), "remote table empty, seeding");
		let mut stored = Vec::with_capacity(inner.seed.len());
		for entity in &inner.seed {
			let row = inner.remote.insert(inner.mapping.encode_insert(entity)).await?;
			stored.extend(inner.mapping.decode(&row));
		}
		Ok(stored)
	}

	/// Replaces the whole collection locally and writes the local durable
	/// copy. Pending mutations are dropped; the remote is not written.
	pub fn replace_all(&self, entities: Vec<Entity>) -> Result<bool> {
		let inner = &self.inner;
		let shared = {
			let mut state = inner.state.lock();
			state.collection.replace_all(entities);
			state.pending.clear();
			state.phase = Phase::Ready;
			inner.publish(&mut state);
			state.collection.to_shared()
		};
		match &inner.storage {
			Some((storage, key)) => {
				storage::write_json(storage.as_ref(), key, &shared[..])?;
				Ok(true)
			}
			None => Ok(false),
		}
	}

	/// Bulk import from JSON text. See [`transfer::parse_import`].
	pub fn import(&self, text: &str) -> Result<ImportReport> {
		let entities = transfer::parse_import(text)?;
		let imported = entities.len();
		let stored_locally = self.replace_all(entities)?;
		tracing::warn!(table = %self.table(), imported, stored_locally, "{}", ImportReport::WARNING);
		Ok(ImportReport {
			imported,
			stored_locally,
		})
	}

	/// Pretty JSON array of the current snapshot.
	pub fn export(&self) -> Result<String> {
		transfer::export(&self.snapshot().entities)
	}
}

impl std::fmt::Debug for OptimisticStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("OptimisticStore")
			.field("table", &self.table())
			.field("phase", &state.phase)
			.field("len", &state.collection.len())
			.field("pending", &state.pending.len())
			.finish()
	}
}

#[cfg(test)]
mod tests;
