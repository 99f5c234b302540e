//! Live synchronization walkthrough against in-memory tables.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use larder_model::{Draft, Fields, seed};
use larder_remote::{MemoryDatabase, Operation, RemoteCollectionClient, RemoteError};
use larder_store::config::LarderConfig;
use larder_store::{LiveCollection, OptimisticStore, Snapshot, mapping};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Time given to change events to reach the store between steps.
const SETTLE: Duration = Duration::from_millis(50);

fn describe(snapshot: &Snapshot) -> String {
	let titles: Vec<_> = snapshot
		.iter()
		.map(|e| format!("{}:{}@{}", e.id, e.text("title"), e.number("price")))
		.collect();
	format!(
		"v{} {:?} [{}]",
		snapshot.version,
		snapshot.phase,
		titles.join(", ")
	)
}

pub async fn run(config: &LarderConfig) -> Result<()> {
	let db = MemoryDatabase::new();
	let table = db.table(&config.tables.products);
	table.set_latency(Some(Duration::from_millis(20)));

	let store = OptimisticStore::builder(
		Arc::new(table.clone()),
		Arc::new(mapping::products(&config.tables.products)),
	)
	.seed(seed::products().into_iter().take(2).collect())
	.seed_when_empty(true)
	.build();
	let (live, outcome) = LiveCollection::start(store).await;
	println!("loaded: {outcome:?}");
	println!("  {}", describe(&live.store().snapshot()));

	let cancel = CancellationToken::new();
	let mut watcher = live.binding();
	let printer = {
		let cancel = cancel.clone();
		tokio::spawn(async move {
			loop {
				tokio::select! {
					biased;
					_ = cancel.cancelled() => break,
					snapshot = watcher.changed() => match snapshot {
						Some(snapshot) => println!("  {}", describe(&snapshot)),
						None => break,
					},
				}
			}
		})
	};

	let binding = live.binding();

	println!("create (optimistic, then confirmed):");
	let created = binding
		.create(
			Draft::new()
				.with("title", "Palm Jaggery")
				.with("price", 450)
				.with("category", "Sweeteners"),
		)
		.await?;
	tokio::time::sleep(SETTLE).await;

	println!("update price of {}:", created.id);
	let mut patch = Fields::new();
	patch.insert("price".into(), 480.into());
	binding.update(&created.id, patch).await?;
	tokio::time::sleep(SETTLE).await;

	println!("update with an injected remote failure:");
	table.fail_next(Operation::Update, RemoteError::transport("injected outage"));
	let mut patch = Fields::new();
	patch.insert("price".into(), 1.into());
	if let Err(error) = binding.update(&created.id, patch).await {
		println!("  rejected: {error}");
	}
	tokio::time::sleep(SETTLE).await;

	println!("insert by another client:");
	let row = json!({"id": "EXT-1", "title": "Cold Pressed Sesame Oil", "price": 620});
	if let serde_json::Value::Object(row) = row {
		table.insert(row).await?;
	}
	tokio::time::sleep(SETTLE).await;

	println!("delete {}:", created.id);
	binding.delete(&created.id).await?;
	tokio::time::sleep(SETTLE).await;

	cancel.cancel();
	printer.await?;
	live.shutdown().await;
	println!("final: {}", describe(&live.store().snapshot()));
	Ok(())
}
