//! Editable content documents kept in local storage.
//!
//! Site copy and page images are edited through the admin and read by every
//! page. Each document is one JSON value under one key, with watchers
//! notified on every save.

use std::collections::BTreeMap;

use larder_model::seed;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::Result;
use crate::storage::{self, SharedStorage, StorageKeys};

/// `section -> slot -> url`.
pub type PageImages = BTreeMap<String, BTreeMap<String, String>>;

/// A JSON document with defaults, persisted under one storage key.
pub struct ContentDocument<T> {
	storage: SharedStorage,
	key: String,
	defaults: T,
	tx: watch::Sender<T>,
}

impl<T> ContentDocument<T>
where
	T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
	/// Opens the document, falling back to `defaults` when nothing usable is
	/// stored.
	pub fn open(storage: SharedStorage, key: impl Into<String>, defaults: T) -> Result<Self> {
		let key = key.into();
		let current = storage::read_json(storage.as_ref(), &key)?.unwrap_or_else(|| defaults.clone());
		Ok(Self::with_current(storage, key, defaults, current))
	}

	fn with_current(storage: SharedStorage, key: String, defaults: T, current: T) -> Self {
		let (tx, _) = watch::channel(current);
		Self {
			storage,
			key,
			defaults,
			tx,
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn get(&self) -> T {
		self.tx.borrow().clone()
	}

	/// Receiver notified on every save, reset or reload.
	pub fn watch(&self) -> watch::Receiver<T> {
		self.tx.subscribe()
	}

	pub fn save(&self, value: T) -> Result<()> {
		storage::write_json(self.storage.as_ref(), &self.key, &value)?;
		self.tx.send_replace(value);
		tracing::debug!(key = %self.key, "content saved");
		Ok(())
	}

	/// Edits the current value in place and saves it.
	pub fn update(&self, edit: impl FnOnce(&mut T)) -> Result<()> {
		let mut value = self.get();
		edit(&mut value);
		self.save(value)
	}

	/// Drops the stored value and goes back to the defaults.
	pub fn reset(&self) -> Result<()> {
		self.storage.remove(&self.key)?;
		self.tx.send_replace(self.defaults.clone());
		Ok(())
	}

	/// Re-reads storage, picking up writes from other instances.
	pub fn reload(&self) -> Result<()> {
		let current = storage::read_json(self.storage.as_ref(), &self.key)?.unwrap_or_else(|| self.defaults.clone());
		self.tx.send_replace(current);
		Ok(())
	}
}

impl<T> std::fmt::Debug for ContentDocument<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ContentDocument").field("key", &self.key).finish_non_exhaustive()
	}
}

/// Fills keys missing from `stored` with their defaults, recursively, so
/// copy added in newer releases shows up for documents saved earlier.
fn merge_defaults(defaults: &Value, stored: Value) -> Value {
	match (defaults, stored) {
		(Value::Object(defaults), Value::Object(mut stored)) => {
			for (key, default) in defaults {
				let merged = match stored.remove(key) {
					Some(value) => merge_defaults(default, value),
					None => default.clone(),
				};
				stored.insert(key.clone(), merged);
			}
			Value::Object(stored)
		}
		(_, stored) => stored,
	}
}

/// Editable site copy, grouped by page.
pub type SiteContent = ContentDocument<Value>;

impl ContentDocument<Value> {
	/// Opens the site copy, merged over the built-in defaults.
	pub fn site_content(storage: SharedStorage, keys: &StorageKeys) -> Result<Self> {
		let key = keys.site_content();
		let defaults = seed::site_content();
		let current = match storage::read_json::<Value>(storage.as_ref(), &key)? {
			Some(stored) => merge_defaults(&defaults, stored),
			None => defaults.clone(),
		};
		Ok(Self::with_current(storage, key, defaults, current))
	}

	/// Value at `path`, e.g. `["home", "heroTitle"]`.
	pub fn field(&self, path: &[&str]) -> Option<Value> {
		let current = self.tx.borrow();
		path.iter().try_fold(&*current, |value, segment| value.get(segment)).cloned()
	}

	/// Sets the value at `path`, creating intermediate objects.
	pub fn set_field(&self, path: &[&str], value: Value) -> Result<()> {
		let Some((last, parents)) = path.split_last() else {
			return self.save(value);
		};
		self.update(|root| {
			let mut node = root;
			for segment in parents {
				if !node.is_object() {
					*node = Value::Object(Default::default());
				}
				let Value::Object(map) = node else {
					return;
				};
				node = map.entry(segment.to_string()).or_insert_with(|| Value::Object(Default::default()));
			}
			if !node.is_object() {
				*node = Value::Object(Default::default());
			}
			if let Value::Object(map) = node {
				map.insert(last.to_string(), value);
			}
		})
	}
}

/// Page images document.
pub type PageImagesDocument = ContentDocument<PageImages>;

impl ContentDocument<PageImages> {
	pub fn page_images(storage: SharedStorage, keys: &StorageKeys) -> Result<Self> {
		Self::open(storage, keys.page_images(), seed::page_images())
	}

	/// Image url of one slot. Empty urls count as unset.
	pub fn image(&self, section: &str, slot: &str) -> Option<String> {
		self.tx
			.borrow()
			.get(section)
			.and_then(|slots| slots.get(slot))
			.filter(|url| !url.is_empty())
			.cloned()
	}

	pub fn set_image(&self, section: &str, slot: &str, url: &str) -> Result<()> {
		self.update(|images| {
			images
				.entry(section.to_string())
				.or_default()
				.insert(slot.to_string(), url.to_string());
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;
	use crate::storage::MemoryStorage;

	fn storage() -> SharedStorage {
		Arc::new(MemoryStorage::new())
	}

	#[test]
	fn page_images_persist_and_notify() {
		let storage = storage();
		let keys = StorageKeys::default();
		let images = PageImagesDocument::page_images(storage.clone(), &keys).unwrap();
		let mut rx = images.watch();
		assert_eq!(images.image("home", "heroBackground"), None);

		images.set_image("home", "heroBackground", "hero.jpg").unwrap();
		assert!(rx.has_changed().unwrap());
		assert_eq!(rx.borrow_and_update()["home"]["heroBackground"], "hero.jpg");

		let reopened = PageImagesDocument::page_images(storage, &keys).unwrap();
		assert_eq!(reopened.image("home", "heroBackground").as_deref(), Some("hero.jpg"));
		assert_eq!(reopened.get()["location"].len(), 2);
	}

	#[test]
	fn site_content_merges_new_defaults_into_stored_copy() {
		let storage = storage();
		let keys = StorageKeys::default();
		storage
			.set(&keys.site_content(), r#"{"home": {"heroTitle": "Custom"}, "extra": 1}"#)
			.unwrap();

		let content = SiteContent::site_content(storage, &keys).unwrap();
		assert_eq!(content.field(&["home", "heroTitle"]), Some(json!("Custom")));
		assert_eq!(content.field(&["contact", "title"]), Some(json!("Get in Touch")));
		assert_eq!(content.field(&["extra"]), Some(json!(1)));
		assert_eq!(content.field(&["home", "missing"]), None);
	}

	#[test]
	fn set_field_creates_intermediate_objects() {
		let content = SiteContent::site_content(storage(), &StorageKeys::default()).unwrap();
		content.set_field(&["footer", "links", "instagram"], json!("@larder")).unwrap();
		content.set_field(&["global", "siteName"], json!("Larder")).unwrap();
		assert_eq!(content.field(&["footer", "links", "instagram"]), Some(json!("@larder")));
		assert_eq!(content.field(&["global", "siteName"]), Some(json!("Larder")));
	}

	#[test]
	fn reset_and_reload() {
		let storage = storage();
		let doc = ContentDocument::open(storage.clone(), "doc", json!({"a": 1})).unwrap();
		doc.save(json!({"a": 2})).unwrap();

		let other = ContentDocument::open(storage.clone(), "doc", json!({"a": 1})).unwrap();
		other.save(json!({"a": 3})).unwrap();
		doc.reload().unwrap();
		assert_eq!(doc.get(), json!({"a": 3}));

		doc.reset().unwrap();
		assert_eq!(doc.get(), json!({"a": 1}));
		assert_eq!(storage.get("doc").unwrap(), None);
	}
}
