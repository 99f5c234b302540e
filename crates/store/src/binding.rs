use larder_model::{Draft, Entity, EntityId, Fields};
use tokio::sync::watch;

use crate::transfer::ImportReport;
use crate::{OptimisticStore, RefreshOutcome, Result, Snapshot};

/// Category filter value that matches every entity.
pub const ALL_CATEGORIES: &str = "All";

/// What presentation code holds: read-only snapshots, change notification
/// and the mutation entry points of one store.
///
/// Bindings are cheap to clone; each clone tracks change notification on
/// its own.
#[derive(Debug, Clone)]
pub struct ConsumerBinding {
	store: OptimisticStore,
	rx: watch::Receiver<Snapshot>,
}

impl ConsumerBinding {
	pub fn new(store: OptimisticStore) -> Self {
		let rx = store.subscribe_snapshots();
		Self { store, rx }
	}

	pub fn store(&self) -> &OptimisticStore {
		&self.store
	}

	/// The latest snapshot, by value.
	pub fn snapshot(&self) -> Snapshot {
		self.rx.borrow().clone()
	}

	/// Waits for the next snapshot change and returns it.
	///
	/// Intermediate snapshots may be skipped; the newest one is always
	/// returned. `None` once the store is gone.
	pub async fn changed(&mut self) -> Option<Snapshot> {
		self.rx.changed().await.ok()?;
		Some(self.rx.borrow_and_update().clone())
	}

	/// Looks up an entity by the textual form of its identifier, so route
	/// parameters such as `"7"` find integer ids.
	pub fn get(&self, id: &str) -> Option<Entity> {
		self.rx.borrow().iter().find(|e| e.id.loosely_eq(id)).cloned()
	}

	/// Entities whose title or identifier contains `term`, ignoring case.
	pub fn search(&self, term: &str) -> Vec<Entity> {
		let term = term.trim().to_lowercase();
		self.filtered(|e| {
			term.is_empty() || e.text("title").to_lowercase().contains(&term) || e.id.to_string().to_lowercase().contains(&term)
		})
	}

	/// Entities of one category; [`ALL_CATEGORIES`] matches everything.
	pub fn by_category(&self, category: &str) -> Vec<Entity> {
		if category == ALL_CATEGORIES {
			return self.filtered(|_| true);
		}
		self.filtered(|e| e.text("category").eq_ignore_ascii_case(category))
	}

	fn filtered(&self, keep: impl Fn(&Entity) -> bool) -> Vec<Entity> {
		self.rx.borrow().iter().filter(|&e| keep(e)).cloned().collect()
	}

	pub async fn create(&self, draft: Draft) -> Result<Entity> {
		self.store.create(draft).await
	}

	pub async fn update(&self, id: &EntityId, fields: Fields) -> Result<()> {
		self.store.update(id, fields).await
	}

	pub async fn delete(&self, id: &EntityId) -> Result<()> {
		self.store.delete(id).await
	}

	pub async fn refresh(&self) -> RefreshOutcome {
		self.store.refresh().await
	}

	/// Pretty JSON export of the current snapshot.
	pub fn export_json(&self) -> Result<String> {
		self.store.export()
	}

	/// Replaces the collection locally from an exported JSON array.
	pub fn import_json(&self, text: &str) -> Result<ImportReport> {
		self.store.import(text)
	}
}
