//! Local durable storage.
//!
//! A small string key-value store standing in for the browser's local
//! storage: the fallback copy of each collection, editable content documents
//! and the cart live here as JSON text.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Shared handle to a storage backend.
pub type SharedStorage = Arc<dyn LocalStorage>;

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	#[error("I/O error on {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },
	#[error("invalid storage key `{0}`")]
	InvalidKey(String),
	#[error("could not replace {path}: {error}")]
	Persist { path: PathBuf, error: std::io::Error },
}

/// String key-value storage.
pub trait LocalStorage: Send + Sync {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
	fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
	fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn shared() -> SharedStorage {
		Arc::new(Self::new())
	}
}

impl LocalStorage for MemoryStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.values.lock().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		self.values.lock().insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.values.lock().remove(key);
		Ok(())
	}
}

/// One `<key>.json` file per key under a directory.
///
/// Writes go to a temporary file in the same directory which then replaces
/// the target, so readers never observe a partial value.
#[derive(Debug, Clone)]
pub struct FileStorage {
	dir: PathBuf,
}

impl FileStorage {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
		let valid = !key.is_empty()
			&& !key.starts_with('.')
			&& key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
		if !valid {
			return Err(StorageError::InvalidKey(key.to_string()));
		}
		Ok(self.dir.join(format!("{key}.json")))
	}
}

impl LocalStorage for FileStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		let path = self.path(key)?;
		match std::fs::read_to_string(&path) {
			Ok(text) => Ok(Some(text)),
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(error) => Err(StorageError::Io { path, error }),
		}
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		let path = self.path(key)?;
		let io = |error| StorageError::Io {
			path: self.dir.clone(),
			error,
		};
		std::fs::create_dir_all(&self.dir).map_err(io)?;
		let mut file = tempfile::NamedTempFile::new_in(&self.dir).map_err(io)?;
		file.write_all(value.as_bytes()).map_err(io)?;
		file.persist(&path).map_err(|e| StorageError::Persist { path, error: e.error })?;
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		let path = self.path(key)?;
		match std::fs::remove_file(&path) {
			Err(error) if error.kind() != std::io::ErrorKind::NotFound => Err(StorageError::Io { path, error }),
			_ => Ok(()),
		}
	}
}

/// Reads and parses a JSON value. Unparseable text is logged and treated as
/// absent.
pub fn read_json<T: DeserializeOwned>(storage: &dyn LocalStorage, key: &str) -> Result<Option<T>, StorageError> {
	let Some(text) = storage.get(key)? else {
		return Ok(None);
	};
	match serde_json::from_str(&text) {
		Ok(value) => Ok(Some(value)),
		Err(error) => {
			tracing::warn!(key, %error, "ignoring unparseable stored value");
			Ok(None)
		}
	}
}

/// Serializes a value as JSON and stores it.
pub fn write_json<T: Serialize + ?Sized>(storage: &dyn LocalStorage, key: &str, value: &T) -> crate::Result<()> {
	let text = serde_json::to_string(value)?;
	storage.set(key, &text)?;
	Ok(())
}

/// Storage keys used by the storefront, under a common namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
	namespace: String,
}

impl StorageKeys {
	pub fn new(namespace: impl Into<String>) -> Self {
		Self {
			namespace: namespace.into(),
		}
	}

	fn key(&self, name: &str) -> String {
		format!("{}.{name}", self.namespace)
	}

	/// Fallback copy of a collection, by table name.
	pub fn collection(&self, table: &str) -> String {
		self.key(table)
	}

	pub fn products(&self) -> String {
		self.key("products")
	}

	pub fn blogs(&self) -> String {
		self.key("blogs")
	}

	pub fn site_content(&self) -> String {
		self.key("site_content")
	}

	pub fn page_images(&self) -> String {
		self.key("page_images")
	}

	pub fn cart(&self) -> String {
		self.key("cart")
	}
}

impl Default for StorageKeys {
	fn default() -> Self {
		Self::new("larder")
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn file_storage_round_trips_and_removes() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path().join("nested"));
		assert_eq!(storage.get("larder.cart").unwrap(), None);

		storage.set("larder.cart", "[1,2]").unwrap();
		storage.set("larder.cart", "[3]").unwrap();
		assert_eq!(storage.get("larder.cart").unwrap().as_deref(), Some("[3]"));
		assert!(dir.path().join("nested/larder.cart.json").exists());

		storage.remove("larder.cart").unwrap();
		storage.remove("larder.cart").unwrap();
		assert_eq!(storage.get("larder.cart").unwrap(), None);
	}

	#[test]
	fn file_storage_rejects_path_like_keys() {
		let storage = FileStorage::new(std::env::temp_dir());
		for key in ["", "../escape", "a/b", ".hidden"] {
			assert!(matches!(storage.get(key), Err(StorageError::InvalidKey(_))), "{key}");
		}
	}

	#[test]
	fn unparseable_json_reads_as_absent() {
		let storage = MemoryStorage::new();
		storage.set("k", "{not json").unwrap();
		assert_eq!(read_json::<Vec<u32>>(&storage, "k").unwrap(), None);

		write_json(&storage, "k", &[1u32, 2]).unwrap();
		assert_eq!(read_json::<Vec<u32>>(&storage, "k").unwrap(), Some(vec![1, 2]));
	}

	#[test]
	fn keys_are_namespaced() {
		let keys = StorageKeys::new("shop");
		assert_eq!(keys.products(), "shop.products");
		assert_eq!(keys.collection("blogs"), keys.blogs());
		assert_eq!(StorageKeys::default().cart(), "larder.cart");
	}
}
