//! `larder` operator CLI.
//!
//! Inspects and edits the local durable copy kept by the storefront, and runs
//! a self-contained demo of live synchronization against in-memory tables.

mod commands;
mod demo;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use larder_store::config::LarderConfig;
use larder_store::storage::{FileStorage, SharedStorage};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;

/// Environment variable overriding the configured storage directory.
const DATA_DIR_ENV: &str = "LARDER_DATA_DIR";

#[derive(Parser, Debug)]
#[command(name = "larder")]
#[command(about = "Storefront data sync: local copies, content and a live demo")]
struct Cli {
	/// Path to `larder.toml`. A missing file means defaults.
	#[arg(long, default_value = "larder.toml")]
	config: PathBuf,

	/// Enable verbose logging.
	#[arg(short, long)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print or write the local copy of a collection as JSON.
	Export {
		collection: CollectionName,
		/// Write to this file instead of stdout.
		#[arg(long)]
		out: Option<PathBuf>,
	},
	/// Replace the local copy of a collection with a JSON array.
	Import { collection: CollectionName, file: PathBuf },
	/// Write the built-in dataset to the local copy.
	Seed { collection: CollectionName },
	/// Page images.
	Images {
		#[command(subcommand)]
		action: ImagesAction,
	},
	/// Editable site copy.
	Content {
		#[command(subcommand)]
		action: ContentAction,
	},
	/// Run a live products store against in-memory tables.
	Demo,
}

#[derive(Subcommand, Debug)]
enum ImagesAction {
	/// Set the image url of one slot.
	Set { section: String, key: String, url: String },
	Show,
}

#[derive(Subcommand, Debug)]
enum ContentAction {
	Show,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CollectionName {
	Products,
	Blogs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let mut config = LarderConfig::load(&cli.config).with_context(|| format!("loading {}", cli.config.display()))?;
	if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
		config.storage.dir = PathBuf::from(dir);
	}
	info!(config = %cli.config.display(), data_dir = %config.data_dir().display(), "larder starting");

	let storage: SharedStorage = Arc::new(FileStorage::new(config.data_dir()));
	let keys = config.keys();
	match cli.command {
		Command::Export { collection, out } => commands::export(storage.as_ref(), &keys, collection, out.as_deref()),
		Command::Import { collection, file } => commands::import(storage.as_ref(), &keys, collection, &file),
		Command::Seed { collection } => commands::seed(storage.as_ref(), &keys, collection),
		Command::Images { action } => match action {
			ImagesAction::Set { section, key, url } => commands::set_image(storage, &keys, &section, &key, &url),
			ImagesAction::Show => commands::show_images(storage, &keys),
		},
		Command::Content {
			action: ContentAction::Show,
		} => commands::show_content(storage, &keys),
		Command::Demo => demo::run(&config).await,
	}
}

/// Opens `larder.<pid>.log` under `log_dir`, creating the directory. None
/// when either fails, so logging falls back to stderr.
fn open_log_file(log_dir: &Path) -> Option<std::fs::File> {
	if std::fs::create_dir_all(log_dir).is_err() {
		return None;
	}
	let log_path = log_dir.join(format!("larder.{}.log", std::process::id()));
	std::fs::OpenOptions::new().create(true).append(true).open(log_path).ok()
}

fn setup_tracing(verbose: bool) {
	// With LARDER_LOG_DIR set, logs go to a per-process file so stdout stays
	// clean for exported JSON.
	if let Some(log_dir) = std::env::var("LARDER_LOG_DIR").ok().map(PathBuf::from)
		&& let Some(file) = open_log_file(&log_dir)
	{
		let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("debug")
			} else {
				EnvFilter::new("info")
			}
		});

		let file_layer = tracing_subscriber::fmt::layer()
			.with_writer(file)
			.with_ansi(false)
			.with_span_events(FmtSpan::CLOSE)
			.with_target(true);

		tracing_subscriber::registry().with(filter).with(file_layer).init();
		return;
	}

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("debug")
		} else {
			EnvFilter::new("warn")
		}
	});
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
