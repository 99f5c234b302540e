//! Wiring of stores, routers and bindings into running collections.

use std::sync::Arc;

use larder_model::seed;
use larder_remote::{MemoryDatabase, SharedClient};
use parking_lot::Mutex;

use crate::catalog::{BlogFeed, ProductCatalog};
use crate::checkout::{Cart, OrderSubmitter};
use crate::config::{LarderConfig, TableNames};
use crate::content::{PageImagesDocument, SiteContent};
use crate::mapping::{self, BlogMapping};
use crate::storage::{SharedStorage, StorageKeys};
use crate::{ChangeEventRouter, ConsumerBinding, OptimisticStore, RefreshOutcome, Result};

/// A store together with the router feeding it.
///
/// At most one router is bound at a time. Rebinding stops the previous
/// router, and with it its subscription, before the next one subscribes.
/// Every bind gets a higher generation than the one before.
#[derive(Debug)]
pub struct LiveCollection {
	store: OptimisticStore,
	binding: Mutex<Binding>,
}

#[derive(Debug, Default)]
struct Binding {
	/// Generation of the most recent bind attempt.
	generation: u64,
	router: Option<ChangeEventRouter>,
}

impl LiveCollection {
	pub fn new(store: OptimisticStore) -> Self {
		Self {
			store,
			binding: Mutex::new(Binding::default()),
		}
	}

	/// Subscribes to changes, then loads the collection.
	///
	/// Subscribing first means no change between the fetch and the
	/// subscription is missed. A failed subscription is logged and the
	/// collection still loads, without live updates.
	pub async fn start(store: OptimisticStore) -> (Self, RefreshOutcome) {
		let live = Self::new(store);
		if let Err(error) = live.rebind().await {
			tracing::warn!(table = %live.store.table(), %error, "live updates unavailable");
		}
		let outcome = live.store.refresh().await;
		(live, outcome)
	}

	pub fn store(&self) -> &OptimisticStore {
		&self.store
	}

	pub fn binding(&self) -> ConsumerBinding {
		ConsumerBinding::new(self.store.clone())
	}

	/// Generation of the bound router, if any.
	pub fn generation(&self) -> Option<u64> {
		self.binding.lock().router.as_ref().map(ChangeEventRouter::generation)
	}

	pub fn is_bound(&self) -> bool {
		self.binding.lock().router.as_ref().is_some_and(|r| !r.is_finished())
	}

	/// Replaces the bound router with a fresh one. Returns its generation.
	pub async fn rebind(&self) -> Result<u64> {
		self.unbind().await;
		let (generation, displaced) = {
			let mut binding = self.binding.lock();
			binding.generation += 1;
			let generation = binding.generation;
			let router = ChangeEventRouter::bind(self.store.clone(), generation)?;
			(generation, binding.router.replace(router))
		};
		if let Some(displaced) = displaced {
			// a concurrent rebind won; the newest router stays
			displaced.shutdown().await;
		}
		Ok(generation)
	}

	async fn unbind(&self) {
		let previous = self.binding.lock().router.take();
		if let Some(previous) = previous {
			previous.shutdown().await;
		}
	}

	/// Stops live updates. Safe to call more than once.
	pub async fn shutdown(&self) {
		self.unbind().await;
		tracing::debug!(table = %self.store.table(), "live collection stopped");
	}
}

/// Remote tables backing a storefront.
#[derive(Clone)]
pub struct StorefrontRemotes {
	pub products: SharedClient,
	pub blogs: SharedClient,
	pub orders: SharedClient,
}

impl StorefrontRemotes {
	/// In-process tables, named as configured.
	pub fn memory(db: &MemoryDatabase, tables: &TableNames) -> Self {
		Self {
			products: Arc::new(db.table(&tables.products)),
			blogs: Arc::new(db.table(&tables.blogs)),
			orders: Arc::new(db.table(&tables.orders)),
		}
	}
}

/// Everything the storefront pages and the admin work with.
pub struct Storefront {
	products: LiveCollection,
	blogs: LiveCollection,
	orders: OrderSubmitter,
	storage: SharedStorage,
	keys: StorageKeys,
}

impl Storefront {
	/// Builds and starts the product and blog collections.
	pub async fn start(remotes: StorefrontRemotes, storage: SharedStorage, config: &LarderConfig) -> Self {
		let keys = config.keys();
		let seed_when_empty = config.sync.seed_when_empty;

		let products = OptimisticStore::builder(remotes.products, Arc::new(mapping::products(&config.tables.products)))
			.storage(storage.clone(), keys.products())
			.seed(seed::products())
			.seed_when_empty(seed_when_empty)
			.build();
		let blogs = OptimisticStore::builder(remotes.blogs, Arc::new(BlogMapping::new(&config.tables.blogs)))
			.storage(storage.clone(), keys.blogs())
			.seed(seed::blogs())
			.seed_when_empty(seed_when_empty)
			.build();

		let ((products, products_outcome), (blogs, blogs_outcome)) =
			tokio::join!(LiveCollection::start(products), LiveCollection::start(blogs));
		tracing::info!(products = ?products_outcome, blogs = ?blogs_outcome, "storefront started");

		Self {
			products,
			blogs,
			orders: OrderSubmitter::new(remotes.orders),
			storage,
			keys,
		}
	}

	pub fn products(&self) -> &LiveCollection {
		&self.products
	}

	pub fn blogs(&self) -> &LiveCollection {
		&self.blogs
	}

	pub fn catalog(&self) -> ProductCatalog {
		ProductCatalog::new(self.products.binding())
	}

	pub fn blog_feed(&self) -> BlogFeed {
		BlogFeed::new(self.blogs.binding())
	}

	pub fn orders(&self) -> &OrderSubmitter {
		&self.orders
	}

	/// The persisted cart.
	pub fn cart(&self) -> Result<Cart> {
		Cart::open(self.storage.clone(), self.keys.cart())
	}

	pub fn site_content(&self) -> Result<SiteContent> {
		SiteContent::site_content(self.storage.clone(), &self.keys)
	}

	pub fn page_images(&self) -> Result<PageImagesDocument> {
		PageImagesDocument::page_images(self.storage.clone(), &self.keys)
	}

	pub async fn shutdown(&self) {
		tokio::join!(self.products.shutdown(), self.blogs.shutdown());
	}
}
