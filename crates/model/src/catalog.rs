//! Typed views over the storefront collections.
//!
//! The store itself is schema-agnostic; these types are the thin per-collection
//! adapters that presentation code works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Draft, Entity, EntityId, FieldValue, Fields};

/// Field names of product entities.
pub mod product_fields {
	pub const TITLE: &str = "title";
	pub const CATEGORY: &str = "category";
	pub const PRICE: &str = "price";
	pub const WEIGHT: &str = "weight";
	pub const STOCK: &str = "stock";
	pub const DESCRIPTION: &str = "description";
	pub const INGREDIENTS: &str = "ingredients";
	pub const BENEFITS: &str = "benefits";
	pub const IMAGES: &str = "images";
	pub const FEATURED: &str = "featured";
	pub const STATUS: &str = "status";
}

/// Field names of blog entities.
pub mod blog_fields {
	pub const TITLE: &str = "title";
	pub const EXCERPT: &str = "excerpt";
	pub const CONTENT: &str = "content";
	pub const AUTHOR: &str = "author";
	pub const CATEGORY: &str = "category";
	pub const IMAGE: &str = "image";
	pub const PUBLISHED_AT: &str = "publishedAt";
}

/// Stock status shown for products that can be ordered.
pub const IN_STOCK: &str = "In Stock";

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
	pub id: EntityId,
	pub title: String,
	pub category: String,
	pub price: f64,
	pub weight: String,
	pub stock: i64,
	pub description: String,
	pub ingredients: String,
	pub benefits: String,
	pub images: Vec<String>,
	pub featured: bool,
	pub status: String,
	pub created_at: DateTime<Utc>,
}

impl Product {
	pub fn from_entity(entity: &Entity) -> Self {
		use product_fields::*;
		let status = entity.text(STATUS);
		Self {
			id: entity.id.clone(),
			title: entity.text(TITLE).to_string(),
			category: entity.text(CATEGORY).to_string(),
			price: entity.number(PRICE),
			weight: entity.text(WEIGHT).to_string(),
			stock: entity.number(STOCK) as i64,
			description: entity.text(DESCRIPTION).to_string(),
			ingredients: entity.text(INGREDIENTS).to_string(),
			benefits: entity.text(BENEFITS).to_string(),
			images: entity.get(IMAGES).map(FieldValue::text_items).unwrap_or_default(),
			featured: entity.flag(FEATURED),
			status: if status.is_empty() { IN_STOCK.to_string() } else { status.to_string() },
			created_at: entity.created_at,
		}
	}

	/// All editable fields, as sent with creates and full-record updates.
	pub fn fields(&self) -> Fields {
		use product_fields::*;
		let mut fields = Fields::new();
		fields.insert(TITLE.into(), self.title.clone().into());
		fields.insert(CATEGORY.into(), self.category.clone().into());
		fields.insert(PRICE.into(), self.price.into());
		fields.insert(WEIGHT.into(), self.weight.clone().into());
		fields.insert(STOCK.into(), self.stock.into());
		fields.insert(DESCRIPTION.into(), self.description.clone().into());
		fields.insert(INGREDIENTS.into(), self.ingredients.clone().into());
		fields.insert(BENEFITS.into(), self.benefits.clone().into());
		fields.insert(IMAGES.into(), self.images.clone().into());
		fields.insert(FEATURED.into(), self.featured.into());
		fields.insert(STATUS.into(), self.status.clone().into());
		fields
	}

	/// Draft for an optimistic create. Temporary ids are not carried over.
	pub fn to_draft(&self) -> Draft {
		Draft {
			id: (!self.id.is_temporary()).then(|| self.id.clone()),
			fields: self.fields(),
		}
	}

	pub fn to_entity(&self) -> Entity {
		Entity {
			id: self.id.clone(),
			created_at: self.created_at,
			fields: self.fields(),
		}
	}

	pub fn is_in_stock(&self) -> bool {
		self.status == IN_STOCK
	}

	/// First image, used for cards and cart lines.
	pub fn cover_image(&self) -> Option<&str> {
		self.images.first().map(String::as_str)
	}
}

/// A blog article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
	pub id: EntityId,
	pub title: String,
	pub excerpt: String,
	pub content: String,
	pub author: String,
	pub category: String,
	pub image: String,
	pub published_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
}

impl BlogPost {
	pub fn from_entity(entity: &Entity) -> Self {
		use blog_fields::*;
		let published_at = match entity.get(PUBLISHED_AT) {
			Some(FieldValue::Timestamp(ts)) => Some(*ts),
			Some(FieldValue::Text(s)) => DateTime::parse_from_rfc3339(s).ok().map(|ts| ts.with_timezone(&Utc)),
			_ => None,
		};
		Self {
			id: entity.id.clone(),
			title: entity.text(TITLE).to_string(),
			excerpt: entity.text(EXCERPT).to_string(),
			content: entity.text(CONTENT).to_string(),
			author: entity.text(AUTHOR).to_string(),
			category: entity.text(CATEGORY).to_string(),
			image: entity.text(IMAGE).to_string(),
			published_at,
			created_at: entity.created_at,
		}
	}

	pub fn fields(&self) -> Fields {
		use blog_fields::*;
		let mut fields = Fields::new();
		fields.insert(TITLE.into(), self.title.clone().into());
		fields.insert(EXCERPT.into(), self.excerpt.clone().into());
		fields.insert(CONTENT.into(), self.content.clone().into());
		fields.insert(AUTHOR.into(), self.author.clone().into());
		fields.insert(CATEGORY.into(), self.category.clone().into());
		fields.insert(IMAGE.into(), self.image.clone().into());
		if let Some(ts) = self.published_at {
			fields.insert(PUBLISHED_AT.into(), ts.into());
		}
		fields
	}

	pub fn to_draft(&self) -> Draft {
		Draft {
			id: None,
			fields: self.fields(),
		}
	}

	pub fn to_entity(&self) -> Entity {
		Entity {
			id: self.id.clone(),
			created_at: self.created_at,
			fields: self.fields(),
		}
	}

	/// Human-readable date, e.g. `October 20, 2023`.
	///
	/// Uses the publication date when present, the creation date otherwise.
	pub fn display_date(&self) -> String {
		self.published_at.unwrap_or(self.created_at).format("%B %-d, %Y").to_string()
	}
}

/// Contact details collected at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
	pub name: String,
	pub phone: String,
	pub email: String,
	pub address: String,
	#[serde(default)]
	pub notes: String,
}

/// One cart line, snapshotting the product at the time it was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
	pub product_id: EntityId,
	pub title: String,
	pub price: f64,
	pub quantity: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub weight: String,
}

impl CartLine {
	pub fn from_product(product: &Product, quantity: u32) -> Self {
		Self {
			product_id: product.id.clone(),
			title: product.title.clone(),
			price: product.price,
			quantity,
			image: product.cover_image().map(str::to_string),
			weight: product.weight.clone(),
		}
	}

	pub fn subtotal(&self) -> f64 {
		self.price * f64::from(self.quantity)
	}
}
