//! `larder.toml` configuration.
//!
//! Every field has a default, so an absent or partial file is valid:
//!
//! ```toml
//! [storage]
//! dir = "/var/lib/larder"
//! namespace = "larder"
//!
//! [sync]
//! seed_when_empty = false
//!
//! [tables]
//! products = "products"
//! blogs = "blogs"
//! orders = "orders"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::StorageKeys;

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("I/O error reading {path}: {error}")]
	Read { path: PathBuf, error: std::io::Error },
	#[error("invalid config {path}: {error}")]
	Parse { path: PathBuf, error: toml::de::Error },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LarderConfig {
	pub storage: StorageConfig,
	pub sync: SyncConfig,
	pub tables: TableNames,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
	/// Directory of the local durable copy. Relative paths resolve against
	/// the working directory.
	pub dir: PathBuf,
	/// Prefix of every storage key.
	pub namespace: String,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			dir: PathBuf::from(".larder"),
			namespace: "larder".into(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	/// Insert the built-in catalog into an empty remote products table.
	pub seed_when_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
	pub products: String,
	pub blogs: String,
	pub orders: String,
}

impl Default for TableNames {
	fn default() -> Self {
		Self {
			products: "products".into(),
			blogs: "blogs".into(),
			orders: "orders".into(),
		}
	}
}

impl LarderConfig {
	/// Loads `path`. A missing file yields the defaults.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = match std::fs::read_to_string(path) {
			Ok(text) => text,
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
				tracing::debug!(path = %path.display(), "no config file, using defaults");
				return Ok(Self::default());
			}
			Err(error) => {
				return Err(ConfigError::Read {
					path: path.to_path_buf(),
					error,
				});
			}
		};
		Self::from_toml_str(&text).map_err(|error| ConfigError::Parse {
			path: path.to_path_buf(),
			error,
		})
	}

	pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(text)
	}

	pub fn keys(&self) -> StorageKeys {
		StorageKeys::new(self.storage.namespace.clone())
	}

	pub fn data_dir(&self) -> &Path {
		&self.storage.dir
	}
}
