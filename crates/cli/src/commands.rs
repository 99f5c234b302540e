//! Offline commands over the local durable copy.

use std::path::Path;

use anyhow::{Context, Result};
use larder_model::{Entity, seed};
use larder_store::content::{PageImagesDocument, SiteContent};
use larder_store::storage::{self, LocalStorage, SharedStorage, StorageKeys};
use larder_store::transfer::{self, ImportReport};

use crate::CollectionName;

impl CollectionName {
	fn key(self, keys: &StorageKeys) -> String {
		match self {
			Self::Products => keys.products(),
			Self::Blogs => keys.blogs(),
		}
	}

	fn seed(self) -> Vec<Entity> {
		match self {
			Self::Products => seed::products(),
			Self::Blogs => seed::blogs(),
		}
	}
}

/// The stored copy, or the built-in dataset when nothing usable is stored.
fn local_copy(storage: &dyn LocalStorage, keys: &StorageKeys, collection: CollectionName) -> Result<Vec<Entity>> {
	let stored = storage::read_json::<Vec<Entity>>(storage, &collection.key(keys))?;
	Ok(stored.filter(|e| !e.is_empty()).unwrap_or_else(|| collection.seed()))
}

pub fn export(storage: &dyn LocalStorage, keys: &StorageKeys, collection: CollectionName, out: Option<&Path>) -> Result<()> {
	let entities = local_copy(storage, keys, collection)?;
	let json = transfer::export(&entities)?;
	match out {
		Some(path) => {
			std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
			eprintln!("exported {} entities to {}", entities.len(), path.display());
		}
		None => println!("{json}"),
	}
	Ok(())
}

pub fn import(storage: &dyn LocalStorage, keys: &StorageKeys, collection: CollectionName, file: &Path) -> Result<()> {
	let text = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
	let entities = transfer::parse_import(&text).with_context(|| format!("importing {}", file.display()))?;
	storage::write_json(storage, &collection.key(keys), &entities)?;
	tracing::info!(?collection, count = entities.len(), "imported local copy");

	eprintln!("warning: {}", ImportReport::WARNING);
	println!("imported {} entities", entities.len());
	Ok(())
}

pub fn seed(storage: &dyn LocalStorage, keys: &StorageKeys, collection: CollectionName) -> Result<()> {
	let entities = collection.seed();
	storage::write_json(storage, &collection.key(keys), &entities)?;
	println!("seeded {} entities", entities.len());
	Ok(())
}

pub fn set_image(storage: SharedStorage, keys: &StorageKeys, section: &str, slot: &str, url: &str) -> Result<()> {
	PageImagesDocument::page_images(storage, keys)?.set_image(section, slot, url)?;
	Ok(())
}

pub fn show_images(storage: SharedStorage, keys: &StorageKeys) -> Result<()> {
	let images = PageImagesDocument::page_images(storage, keys)?;
	println!("{}", serde_json::to_string_pretty(&images.get())?);
	Ok(())
}

pub fn show_content(storage: SharedStorage, keys: &StorageKeys) -> Result<()> {
	let content = SiteContent::site_content(storage, keys)?;
	println!("{}", serde_json::to_string_pretty(&content.get())?);
	Ok(())
}
