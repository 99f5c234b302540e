use std::time::Duration;

use larder_model::seed;
use larder_remote::{MemoryTable, Operation, RemoteCollectionClient, Row};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};

use super::*;
use crate::mapping;
use crate::storage::{LocalStorage, MemoryStorage};

fn row(value: Value) -> Row {
	match value {
		Value::Object(map) => map,
		other => panic!("expected object, got {other}"),
	}
}

fn store_for(table: &MemoryTable) -> OptimisticStore {
	OptimisticStore::builder(Arc::new(table.clone()), Arc::new(mapping::products("products"))).build()
}

async fn ready_store(rows: &[Value]) -> (MemoryTable, OptimisticStore) {
	let table = MemoryTable::new("products");
	for value in rows {
		table.insert(row(value.clone())).await.unwrap();
	}
	let store = store_for(&table);
	assert!(matches!(store.refresh().await, RefreshOutcome::Authoritative { .. }));
	(table, store)
}

fn ids(store: &OptimisticStore) -> Vec<EntityId> {
	store.snapshot().iter().map(|e| e.id.clone()).collect()
}

fn price_patch(price: i64) -> Fields {
	let mut patch = Fields::new();
	patch.insert("price".into(), price.into());
	patch
}

#[tokio::test]
async fn starts_loading_and_becomes_ready_on_refresh() {
	let table = MemoryTable::new("products");
	table.insert(row(json!({"id": "P1", "title": "Ghee"}))).await.unwrap();
	table.insert(row(json!({"id": "P2", "title": "Honey"}))).await.unwrap();
	let store = store_for(&table);
	assert_eq!(store.snapshot().phase, Phase::Loading);

	assert_eq!(store.refresh().await, RefreshOutcome::Authoritative { count: 2 });
	let snapshot = store.snapshot();
	assert!(snapshot.is_ready());
	assert_eq!(ids(&store), vec![EntityId::from("P1"), EntityId::from("P2")]);
	assert_eq!(snapshot.get(&"P2".into()).unwrap().text("status"), "In Stock");
}

#[tokio::test]
async fn repeated_insert_event_is_applied_once() {
	let (_table, store) = ready_store(&[]).await;
	let entity = Entity::new(7, Utc::now()).with("title", "Jaggery");

	assert!(store.reconcile(ChangeEvent::Insert(entity.clone())));
	let version = store.snapshot().version;
	assert!(!store.reconcile(ChangeEvent::Insert(entity)));
	assert_eq!(store.snapshot().len(), 1);
	assert_eq!(store.snapshot().version, version);
}

#[tokio::test]
async fn confirmation_before_event_converges_to_one_entity() {
	let (table, store) = ready_store(&[]).await;
	let mut sub = table.subscribe().unwrap();
	table.pause_events();

	let confirmed = store.create(Draft::new().with("title", "Ghee")).await.unwrap();
	assert_eq!(confirmed.id, EntityId::Int(1));
	assert_eq!(ids(&store), vec![EntityId::Int(1)]);

	table.resume_events();
	let change = sub.recv().await.unwrap();
	let event = store.mapping().translate(&change).unwrap();
	assert!(!store.reconcile(event));
	assert_eq!(ids(&store), vec![EntityId::Int(1)]);
	assert!(store.pending().is_empty());
}

#[tokio::test]
async fn event_before_confirmation_converges_to_one_entity() {
	let (table, store) = ready_store(&[]).await;
	let mut sub = table.subscribe().unwrap();
	table.set_latency(Some(Duration::from_millis(20)));
	let mapping = store.mapping().clone();

	let (created, applied) = tokio::join!(store.create(Draft::new().with("title", "Ghee")), async {
		let change = sub.recv().await.unwrap();
		store.reconcile(mapping.translate(&change).unwrap())
	});

	assert!(applied);
	assert_eq!(created.unwrap().id, EntityId::Int(1));
	let snapshot = store.snapshot();
	assert_eq!(snapshot.len(), 1);
	assert_eq!(snapshot.entities[0].text("title"), "Ghee");
}

#[tokio::test]
async fn optimistic_create_is_visible_before_confirmation() {
	let (table, store) = ready_store(&[]).await;
	table.set_latency(Some(Duration::from_millis(20)));
	let mut rx = store.subscribe_snapshots();

	let (created, seen) = tokio::join!(store.create(Draft::new().with("title", "Ghee")), async {
		rx.changed().await.unwrap();
		let snapshot = rx.borrow_and_update().clone();
		(snapshot.entities[0].id.clone(), store.pending().len())
	});

	assert!(seen.0.is_temporary());
	assert_eq!(seen.1, 1);
	assert_eq!(created.unwrap().id, EntityId::Int(1));
}

#[tokio::test]
async fn client_supplied_ids_are_kept() {
	let (_table, store) = ready_store(&[]).await;
	let confirmed = store.create(Draft::new().with_id("P7").with("title", "Oil")).await.unwrap();
	assert_eq!(confirmed.id, EntityId::from("P7"));

	let err = store.create(Draft::new().with_id("P7")).await.unwrap_err();
	assert!(matches!(err, StoreError::DuplicateId(id) if id == EntityId::from("P7")));
}

#[tokio::test]
async fn failed_update_rolls_back_after_refetch() {
	let (table, store) = ready_store(&[json!({"id": "P1", "title": "Ghee", "price": 10})]).await;
	let before = store.snapshot().version;
	table.fail_next(Operation::Update, RemoteError::transport("connection reset"));

	let err = store.update(&"P1".into(), price_patch(99)).await.unwrap_err();

	assert!(matches!(err, StoreError::Remote(RemoteError::Transport(_))));
	let snapshot = store.snapshot();
	assert_eq!(snapshot.get(&"P1".into()).unwrap().number("price"), 10.0);
	// optimistic apply, then the re-fetch
	assert!(snapshot.version >= before + 2);
	assert!(store.pending().is_empty());
}

#[tokio::test]
async fn failed_delete_restores_the_entity() {
	let (table, store) = ready_store(&[json!({"id": "P1", "title": "Ghee"})]).await;
	table.fail_next(Operation::Delete, RemoteError::transport("timeout"));
	assert!(store.delete(&"P1".into()).await.is_err());
	assert_eq!(ids(&store), vec![EntityId::from("P1")]);
}

#[tokio::test]
async fn failed_create_leaves_no_local_entry() {
	let (table, store) = ready_store(&[]).await;
	table.fail_next(Operation::Insert, RemoteError::validation("title is required"));
	table.fail_next(Operation::FetchAll, RemoteError::transport("still down"));

	let err = store.create(Draft::new()).await.unwrap_err();
	assert!(matches!(err, StoreError::Remote(RemoteError::Validation(_))));
	assert!(store.snapshot().is_empty());
	assert!(store.pending().is_empty());
}

#[tokio::test]
async fn delete_of_remotely_absent_id_succeeds() {
	let (_table, store) = ready_store(&[json!({"id": "P1"})]).await;
	store.delete(&"ghost".into()).await.unwrap();
	store.delete(&"P1".into()).await.unwrap();
	store.delete(&"P1".into()).await.unwrap();
	assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn successful_update_merges_fields() {
	let (table, store) = ready_store(&[json!({"id": "P1", "title": "Ghee", "price": 10})]).await;
	store.update(&"P1".into(), price_patch(12)).await.unwrap();

	let entity = store.snapshot().get(&"P1".into()).cloned().unwrap();
	assert_eq!(entity.number("price"), 12.0);
	assert_eq!(entity.text("title"), "Ghee");
	assert_eq!(table.row(&"P1".into()).unwrap()["price"], json!(12));
}

#[tokio::test]
async fn mutations_on_unconfirmed_ids_are_refused() {
	let (_table, store) = ready_store(&[]).await;
	let temp = EntityId::temporary();
	assert!(matches!(store.update(&temp, Fields::new()).await, Err(StoreError::Unconfirmed(_))));
	assert!(matches!(store.delete(&temp).await, Err(StoreError::Unconfirmed(_))));
}

#[tokio::test]
async fn update_and_delete_events_only_touch_present_entities() {
	let (_table, store) = ready_store(&[json!({"id": "P1", "title": "Ghee", "price": 10})]).await;

	assert!(!store.reconcile(ChangeEvent::Update(Entity::new("P9", Utc::now()))));
	assert!(!store.reconcile(ChangeEvent::Delete("P9".into())));

	let created = store.snapshot().entities[0].created_at;
	let replacement = Entity::new("P1", created).with("title", "Butter");
	assert!(store.reconcile(ChangeEvent::Update(replacement)));
	let entity = store.snapshot().entities[0].clone();
	assert_eq!(entity.text("title"), "Butter");
	assert_eq!(entity.get("price"), None);

	assert!(store.reconcile(ChangeEvent::Delete("P1".into())));
	assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn fallback_prefers_local_copy_over_seed() {
	let table = MemoryTable::new("products");
	table.set_offline(true);
	let storage = Arc::new(MemoryStorage::new());
	let local = vec![Entity::new("L1", Utc::now()).with("title", "Cached")];
	storage.set("larder.products", &serde_json::to_string(&local).unwrap()).unwrap();

	let store = OptimisticStore::builder(Arc::new(table.clone()), Arc::new(mapping::products("products")))
		.storage(storage, "larder.products")
		.seed(seed::products())
		.build();

	assert_eq!(store.refresh().await, RefreshOutcome::Fallback(FallbackSource::LocalStorage));
	assert_eq!(ids(&store), vec![EntityId::from("L1")]);
}

#[tokio::test]
async fn fallback_seeds_when_nothing_is_stored() {
	let table = MemoryTable::new("products");
	table.set_offline(true);
	let storage = Arc::new(MemoryStorage::new());
	storage.set("larder.products", "[]").unwrap();

	let store = OptimisticStore::builder(Arc::new(table.clone()), Arc::new(mapping::products("products")))
		.storage(storage, "larder.products")
		.seed(seed::products())
		.build();

	assert_eq!(store.refresh().await, RefreshOutcome::Fallback(FallbackSource::Seed));
	let snapshot = store.snapshot();
	assert!(snapshot.is_ready());
	assert!(!snapshot.is_empty());
	assert_eq!(snapshot.entities.to_vec(), seed::products());
}

#[tokio::test]
async fn refresh_failure_after_load_retains_snapshot() {
	let (table, store) = ready_store(&[json!({"id": "P1"})]).await;
	table.set_offline(true);
	assert_eq!(store.refresh().await, RefreshOutcome::Retained);
	assert_eq!(ids(&store), vec![EntityId::from("P1")]);
}

#[tokio::test]
async fn empty_remote_is_seeded_when_enabled() {
	let table = MemoryTable::new("products");
	let store = OptimisticStore::builder(Arc::new(table.clone()), Arc::new(mapping::products("products")))
		.seed(seed::products())
		.seed_when_empty(true)
		.build();

	let expected = seed::products().len();
	assert_eq!(store.refresh().await, RefreshOutcome::Authoritative { count: expected });
	assert_eq!(table.len(), expected);
	assert_eq!(store.snapshot().entities[0].id, EntityId::from("P1"));
}

#[tokio::test]
async fn empty_remote_shows_the_seed_locally() {
	let table = MemoryTable::new("products");
	let store = OptimisticStore::builder(Arc::new(table.clone()), Arc::new(mapping::products("products")))
		.seed(seed::products())
		.build();
	let expected = seed::products().len();
	assert_eq!(store.refresh().await, RefreshOutcome::EmptyRemote { seed: expected });
	let snapshot = store.snapshot();
	assert!(snapshot.is_ready());
	assert_eq!(snapshot.entities.to_vec(), seed::products());
	// nothing is written remotely
	assert!(table.is_empty());

	table.insert(row(json!({"id": "R1", "title": "Remote"}))).await.unwrap();
	assert_eq!(store.refresh().await, RefreshOutcome::Authoritative { count: 1 });
	assert_eq!(ids(&store), vec![EntityId::from("R1")]);
}

#[tokio::test]
async fn empty_remote_without_seed_is_empty() {
	let (table, store) = ready_store(&[]).await;
	assert_eq!(store.refresh().await, RefreshOutcome::Authoritative { count: 0 });
	assert!(store.snapshot().is_empty());
	assert!(table.is_empty());
}

#[tokio::test]
async fn import_replaces_locally_and_writes_storage() {
	let (table, _) = ready_store(&[json!({"id": "P1"})]).await;
	let storage = Arc::new(MemoryStorage::new());
	let store = OptimisticStore::builder(Arc::new(table.clone()), Arc::new(mapping::products("products")))
		.storage(storage.clone(), "larder.products")
		.build();
	store.refresh().await;

	let report = store.import(r#"[{"id": "X1", "title": "Imported"}]"#).unwrap();
	assert_eq!(
		report,
		ImportReport {
			imported: 1,
			stored_locally: true
		}
	);
	assert_eq!(ids(&store), vec![EntityId::from("X1")]);
	assert!(storage.get("larder.products").unwrap().unwrap().contains("Imported"));
	// the remote is untouched
	assert_eq!(table.len(), 1);

	assert!(matches!(store.import(r#"{"id": 1}"#), Err(StoreError::Import(_))));
	assert_eq!(ids(&store), vec![EntityId::from("X1")]);
}

#[tokio::test]
async fn stale_refresh_does_not_override_newer_one() {
	let (table, store) = ready_store(&[json!({"id": "P1"})]).await;
	table.set_latency(Some(Duration::from_millis(30)));
	let slow = store.refresh();
	let fast = async {
		tokio::time::sleep(Duration::from_millis(5)).await;
		table.set_latency(None);
		table.insert(row(json!({"id": "P2"}))).await.unwrap();
		store.refresh().await
	};
	let (slow, fast) = tokio::join!(slow, fast);
	assert_eq!(fast, RefreshOutcome::Authoritative { count: 2 });
	assert_eq!(slow, RefreshOutcome::Retained);
	assert_eq!(ids(&store), vec![EntityId::from("P1"), EntityId::from("P2")]);
}

/// Reconciles the remote's current row for `id`, as the router would.
fn reconcile_remote_update(table: &MemoryTable, store: &OptimisticStore, id: &str) {
	let row = table.row(&id.into()).unwrap();
	let entity = store.mapping().decode(&row).unwrap();
	assert!(store.reconcile(ChangeEvent::Update(entity)));
}

#[tokio::test]
async fn fetch_that_predates_a_reconciled_update_keeps_the_update() {
	let (table, store) = ready_store(&[json!({"id": "P1", "price": 10})]).await;
	table.set_latency(Some(Duration::from_millis(30)));
	let slow = store.refresh();
	let change = async {
		tokio::time::sleep(Duration::from_millis(5)).await;
		table.set_latency(None);
		table.update(&"P1".into(), row(json!({"price": 12}))).await.unwrap();
		reconcile_remote_update(&table, &store, "P1");
		store.snapshot().get(&"P1".into()).unwrap().number("price")
	};
	let (outcome, after_event) = tokio::join!(slow, change);
	assert_eq!(after_event, 12.0);
	assert_eq!(outcome, RefreshOutcome::Authoritative { count: 1 });
	assert_eq!(store.snapshot().get(&"P1".into()).unwrap().number("price"), 12.0);
}

#[tokio::test]
async fn fetch_that_predates_reconciled_inserts_and_deletes_keeps_them() {
	let (table, store) = ready_store(&[json!({"id": "P1"}), json!({"id": "P2"})]).await;
	table.set_latency(Some(Duration::from_millis(30)));
	let slow = store.refresh();
	let change = async {
		tokio::time::sleep(Duration::from_millis(5)).await;
		table.set_latency(None);
		table.delete(&"P1".into()).await.unwrap();
		store.reconcile(ChangeEvent::Delete("P1".into()));
		let stored = table.insert(row(json!({"id": "P3"}))).await.unwrap();
		store.reconcile(ChangeEvent::Insert(store.mapping().decode(&stored).unwrap()));
	};
	let (outcome, ()) = tokio::join!(slow, change);
	assert_eq!(outcome, RefreshOutcome::Authoritative { count: 2 });
	assert_eq!(ids(&store), vec![EntityId::from("P2"), EntityId::from("P3")]);

	// the journal is dropped once no refresh is running
	assert_eq!(store.refresh().await, RefreshOutcome::Authoritative { count: 2 });
	assert_eq!(ids(&store), vec![EntityId::from("P2"), EntityId::from("P3")]);
}

proptest! {
	#[test]
	fn reconciled_inserts_iterate_by_creation_time(offsets in prop::collection::vec(0i64..10_000, 1..40)) {
		let table = MemoryTable::new("products");
		let store = store_for(&table);
		let base = Utc::now();
		for (n, offset) in offsets.iter().enumerate() {
			let entity = Entity::new(n as i64, base + chrono::Duration::seconds(*offset));
			store.reconcile(ChangeEvent::Insert(entity));
		}
		let stamps: Vec<_> = store.snapshot().iter().map(|e| e.created_at).collect();
		prop_assert_eq!(stamps.len(), offsets.len());
		prop_assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
	}
}
