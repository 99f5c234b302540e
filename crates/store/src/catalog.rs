//! Typed views of the product and blog bindings.

use larder_model::EntityId;
use larder_model::catalog::{BlogPost, Product};

use crate::binding::ALL_CATEGORIES;
use crate::{ConsumerBinding, Result};

/// Product listing, detail and admin editing over a products binding.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
	binding: ConsumerBinding,
}

impl ProductCatalog {
	pub fn new(binding: ConsumerBinding) -> Self {
		Self { binding }
	}

	pub fn binding(&self) -> &ConsumerBinding {
		&self.binding
	}

	pub fn products(&self) -> Vec<Product> {
		self.binding.snapshot().iter().map(Product::from_entity).collect()
	}

	/// Products flagged for the home page.
	pub fn featured(&self) -> Vec<Product> {
		self.products().into_iter().filter(|p| p.featured).collect()
	}

	pub fn product(&self, id: &str) -> Option<Product> {
		self.binding.get(id).as_ref().map(Product::from_entity)
	}

	/// [`ALL_CATEGORIES`] followed by each distinct category in listing order.
	pub fn categories(&self) -> Vec<String> {
		let mut categories = vec![ALL_CATEGORIES.to_string()];
		for product in self.products() {
			if !product.category.is_empty() && !categories.contains(&product.category) {
				categories.push(product.category);
			}
		}
		categories
	}

	pub fn in_category(&self, category: &str) -> Vec<Product> {
		self.binding.by_category(category).iter().map(Product::from_entity).collect()
	}

	pub fn search(&self, term: &str) -> Vec<Product> {
		self.binding.search(term).iter().map(Product::from_entity).collect()
	}

	/// Creates the product when it is not listed yet, otherwise updates every
	/// editable field. Returns the product as now listed.
	pub async fn save(&self, product: &Product) -> Result<Product> {
		let listed = !product.id.is_temporary() && self.binding.snapshot().get(&product.id).is_some();
		if listed {
			self.binding.update(&product.id, product.fields()).await?;
			let current = self.binding.snapshot().get(&product.id).map(Product::from_entity);
			Ok(current.unwrap_or_else(|| product.clone()))
		} else {
			let entity = self.binding.create(product.to_draft()).await?;
			Ok(Product::from_entity(&entity))
		}
	}

	pub async fn delete(&self, id: &EntityId) -> Result<()> {
		self.binding.delete(id).await
	}
}

/// Blog listing and editing over a blogs binding.
#[derive(Debug, Clone)]
pub struct BlogFeed {
	binding: ConsumerBinding,
}

impl BlogFeed {
	pub fn new(binding: ConsumerBinding) -> Self {
		Self { binding }
	}

	pub fn binding(&self) -> &ConsumerBinding {
		&self.binding
	}

	/// Posts, newest first.
	pub fn posts(&self) -> Vec<BlogPost> {
		self.binding.snapshot().entities.iter().rev().map(BlogPost::from_entity).collect()
	}

	pub fn post(&self, id: &str) -> Option<BlogPost> {
		self.binding.get(id).as_ref().map(BlogPost::from_entity)
	}

	pub async fn add(&self, post: &BlogPost) -> Result<BlogPost> {
		let entity = self.binding.create(post.to_draft()).await?;
		Ok(BlogPost::from_entity(&entity))
	}

	pub async fn update(&self, post: &BlogPost) -> Result<()> {
		self.binding.update(&post.id, post.fields()).await
	}

	pub async fn delete(&self, id: &EntityId) -> Result<()> {
		self.binding.delete(id).await
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use chrono::{TimeZone, Utc};
	use larder_model::{Entity, seed};
	use larder_remote::MemoryTable;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::mapping::{self, BlogMapping};
	use crate::{OptimisticStore, RefreshOutcome};

	async fn products_catalog() -> (MemoryTable, ProductCatalog) {
		let table = MemoryTable::new("products");
		let store = OptimisticStore::builder(Arc::new(table.clone()), Arc::new(mapping::products("products")))
			.seed(seed::products())
			.seed_when_empty(true)
			.build();
		assert!(matches!(store.refresh().await, RefreshOutcome::Authoritative { .. }));
		(table, ProductCatalog::new(ConsumerBinding::new(store)))
	}

	#[tokio::test]
	async fn listing_views() {
		let (_table, catalog) = products_catalog().await;
		assert_eq!(catalog.products().len(), 6);
		let featured: Vec<_> = catalog.featured().into_iter().map(|p| p.id.to_string()).collect();
		assert_eq!(featured, vec!["P1", "P2", "P5"]);
		assert_eq!(catalog.categories(), vec!["All", "Ghee", "Honey", "Oil", "Sweeteners", "Spices"]);
		assert_eq!(catalog.in_category("Oil").len(), 2);
		assert_eq!(catalog.product("P4").unwrap().title, "Organic Palm Jaggery");
	}

	#[tokio::test]
	async fn save_creates_then_updates() {
		let (table, catalog) = products_catalog().await;
		let mut product = Product::from_entity(&Entity::new(EntityId::temporary(), Utc::now()).with("title", "Mustard Oil"));
		product.price = 320.0;

		let created = catalog.save(&product).await.unwrap();
		assert!(!created.id.is_temporary());
		assert_eq!(table.len(), 7);

		let mut edited = created.clone();
		edited.price = 340.0;
		let saved = catalog.save(&edited).await.unwrap();
		assert_eq!(saved.price, 340.0);
		assert_eq!(table.row(&created.id).unwrap()["price"], serde_json::json!(340));
	}

	#[tokio::test]
	async fn blog_feed_is_newest_first() {
		let table = MemoryTable::new("blogs");
		let store = OptimisticStore::builder(Arc::new(table), Arc::new(BlogMapping::new("blogs")))
			.seed(seed::blogs())
			.seed_when_empty(true)
			.build();
		store.refresh().await;
		let feed = BlogFeed::new(ConsumerBinding::new(store));

		let posts = feed.posts();
		assert_eq!(posts[0].id, EntityId::Int(2));
		assert_eq!(feed.post("1").unwrap().display_date(), "October 20, 2023");

		let added = feed
			.add(&BlogPost {
				id: EntityId::temporary(),
				title: "Cold Pressed Oils".into(),
				excerpt: String::new(),
				content: String::new(),
				author: "Team".into(),
				category: "Oil".into(),
				image: "oil.jpg".into(),
				published_at: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
				created_at: Utc::now(),
			})
			.await
			.unwrap();
		assert_eq!(added.id, EntityId::Int(3));
		assert_eq!(added.image, "oil.jpg");
		assert_eq!(feed.posts()[0].id, added.id);
	}
}
