//! In-process remote tables.
//!
//! Behaves like a hosted table API: serial identifiers, a server clock for
//! `created_at`, required columns, idempotent deletes and a change channel per
//! table. Faults and event timing are controllable so callers can exercise
//! failure and reordering paths deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use larder_model::{ChangeKind, EntityId};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{CREATED_AT_COLUMN, ID_COLUMN, RemoteCollectionClient, RemoteError, Result, Row, RowChange, Subscription};

/// Remote operation, used to target injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	FetchAll,
	Insert,
	Update,
	Delete,
	Subscribe,
}

#[derive(Default)]
struct TableState {
	/// Rows ascending by `created_at`.
	rows: Vec<(EntityId, Row)>,
	next_serial: i64,
	last_created: Option<DateTime<Utc>>,
	required: Vec<String>,
	offline: bool,
	faults: VecDeque<(Operation, RemoteError)>,
	subscribers: Vec<(u64, mpsc::UnboundedSender<RowChange>)>,
	next_subscriber: u64,
	events_paused: bool,
	held: Vec<RowChange>,
	latency: Option<Duration>,
}

impl TableState {
	fn check(&mut self, op: Operation) -> Result<()> {
		if self.offline {
			return Err(RemoteError::transport("remote unreachable"));
		}
		if let Some(at) = self.faults.iter().position(|(target, _)| *target == op)
			&& let Some((_, err)) = self.faults.remove(at)
		{
			return Err(err);
		}
		Ok(())
	}

	/// Strictly increasing server clock.
	fn tick(&mut self) -> DateTime<Utc> {
		let now = Utc::now();
		let next = match self.last_created {
			Some(last) if now <= last => last + chrono::Duration::microseconds(1),
			_ => now,
		};
		self.last_created = Some(next);
		next
	}

	fn position(&self, id: &EntityId) -> Option<usize> {
		self.rows.iter().position(|(row_id, _)| row_id == id)
	}

	fn emit(&mut self, change: RowChange) {
		if self.events_paused {
			self.held.push(change);
			return;
		}
		self.subscribers.retain(|(_, tx)| tx.send(change.clone()).is_ok());
	}

	fn validate_required(&self, row: &Row) -> Result<()> {
		for column in &self.required {
			let present = match row.get(column) {
				None | Some(Value::Null) => false,
				Some(Value::String(s)) => !s.trim().is_empty(),
				Some(_) => true,
			};
			if !present {
				return Err(RemoteError::validation(format!("missing required column `{column}`")));
			}
		}
		Ok(())
	}
}

fn key_row(id: &EntityId) -> Row {
	let mut row = Row::new();
	row.insert(ID_COLUMN.to_string(), id.to_json());
	row
}

/// One in-process remote table. Clones share the same table.
#[derive(Clone)]
pub struct MemoryTable {
	name: Arc<str>,
	state: Arc<Mutex<TableState>>,
}

impl MemoryTable {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self {
			name: name.into(),
			state: Arc::new(Mutex::new(TableState {
				next_serial: 1,
				..TableState::default()
			})),
		}
	}

	/// Rejects inserts whose listed columns are missing, null or blank.
	pub fn with_required(self, columns: &[&str]) -> Self {
		self.state.lock().required = columns.iter().map(|c| c.to_string()).collect();
		self
	}

	/// Makes every operation fail with a transport error while set.
	pub fn set_offline(&self, offline: bool) {
		self.state.lock().offline = offline;
	}

	/// Fails the next call of `op` with `err`. Faults queue per operation.
	pub fn fail_next(&self, op: Operation, err: RemoteError) {
		self.state.lock().faults.push_back((op, err));
	}

	/// Delays every mutation acknowledgement. Change events are emitted
	/// before the delay, so subscribers see them first.
	pub fn set_latency(&self, latency: Option<Duration>) {
		self.state.lock().latency = latency;
	}

	/// Holds change events until [`Self::resume_events`].
	pub fn pause_events(&self) {
		self.state.lock().events_paused = true;
	}

	/// Delivers held change events in emission order and stops holding.
	pub fn resume_events(&self) {
		let mut state = self.state.lock();
		state.events_paused = false;
		let held = std::mem::take(&mut state.held);
		for change in held {
			state.emit(change);
		}
	}

	/// Number of live subscriptions.
	pub fn subscriber_count(&self) -> usize {
		let mut state = self.state.lock();
		state.subscribers.retain(|(_, tx)| !tx.is_closed());
		state.subscribers.len()
	}

	/// Current rows, ascending by `created_at`.
	pub fn rows(&self) -> Vec<Row> {
		self.state.lock().rows.iter().map(|(_, row)| row.clone()).collect()
	}

	pub fn row(&self, id: &EntityId) -> Option<Row> {
		let state = self.state.lock();
		state.position(id).map(|at| state.rows[at].1.clone())
	}

	pub fn len(&self) -> usize {
		self.state.lock().rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	async fn acknowledge(&self) {
		let latency = self.state.lock().latency;
		if let Some(latency) = latency {
			tokio::time::sleep(latency).await;
		}
	}

	fn insert_now(&self, mut row: Row) -> Result<Row> {
		let mut state = self.state.lock();
		state.check(Operation::Insert)?;
		state.validate_required(&row)?;

		let id = match row.get(ID_COLUMN) {
			None | Some(Value::Null) => {
				let id = EntityId::Int(state.next_serial);
				state.next_serial += 1;
				id
			}
			Some(value) => EntityId::from_json(value).ok_or_else(|| RemoteError::validation(format!("invalid id {value}")))?,
		};
		if state.position(&id).is_some() {
			return Err(RemoteError::validation(format!(
				"duplicate key value violates unique constraint on {}.{ID_COLUMN} ({id})",
				self.name
			)));
		}
		if let EntityId::Int(n) = id
			&& n >= state.next_serial
		{
			state.next_serial = n + 1;
		}

		let created_at = state.tick();
		row.insert(ID_COLUMN.to_string(), id.to_json());
		row.insert(
			CREATED_AT_COLUMN.to_string(),
			Value::String(created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
		);
		state.rows.push((id.clone(), row.clone()));
		tracing::trace!(table = %self.name, %id, "memory insert");
		state.emit(RowChange {
			table: self.name.to_string(),
			kind: ChangeKind::Insert,
			new: Some(row.clone()),
			old: None,
		});
		Ok(row)
	}

	fn update_now(&self, id: &EntityId, patch: Row) -> Result<()> {
		let mut state = self.state.lock();
		state.check(Operation::Update)?;
		let Some(at) = state.position(id) else {
			return Err(RemoteError::NotFound {
				table: self.name.to_string(),
				id: id.clone(),
			});
		};
		let row = &mut state.rows[at].1;
		for (column, value) in patch {
			if column != ID_COLUMN && column != CREATED_AT_COLUMN {
				row.insert(column, value);
			}
		}
		let new = row.clone();
		tracing::trace!(table = %self.name, %id, "memory update");
		state.emit(RowChange {
			table: self.name.to_string(),
			kind: ChangeKind::Update,
			new: Some(new),
			old: Some(key_row(id)),
		});
		Ok(())
	}

	fn delete_now(&self, id: &EntityId) -> Result<()> {
		let mut state = self.state.lock();
		state.check(Operation::Delete)?;
		let Some(at) = state.position(id) else {
			return Ok(());
		};
		state.rows.remove(at);
		tracing::trace!(table = %self.name, %id, "memory delete");
		state.emit(RowChange {
			table: self.name.to_string(),
			kind: ChangeKind::Delete,
			new: None,
			old: Some(key_row(id)),
		});
		Ok(())
	}
}

#[async_trait]
impl RemoteCollectionClient for MemoryTable {
	fn table(&self) -> &str {
		&self.name
	}

	async fn fetch_all(&self) -> Result<Vec<Row>> {
		let rows = {
			let mut state = self.state.lock();
			state.check(Operation::FetchAll)?;
			state.rows.iter().map(|(_, row)| row.clone()).collect()
		};
		self.acknowledge().await;
		Ok(rows)
	}

	async fn insert(&self, row: Row) -> Result<Row> {
		let row = self.insert_now(row)?;
		self.acknowledge().await;
		Ok(row)
	}

	async fn update(&self, id: &EntityId, patch: Row) -> Result<()> {
		self.update_now(id, patch)?;
		self.acknowledge().await;
		Ok(())
	}

	async fn delete(&self, id: &EntityId) -> Result<()> {
		self.delete_now(id)?;
		self.acknowledge().await;
		Ok(())
	}

	fn subscribe(&self) -> Result<Subscription> {
		let mut state = self.state.lock();
		state.check(Operation::Subscribe)?;
		let (tx, rx) = mpsc::unbounded_channel();
		let token = state.next_subscriber;
		state.next_subscriber += 1;
		state.subscribers.push((token, tx));

		let weak: Weak<Mutex<TableState>> = Arc::downgrade(&self.state);
		Ok(Subscription::new(self.name.to_string(), rx, move || {
			if let Some(state) = weak.upgrade() {
				state.lock().subscribers.retain(|(t, _)| *t != token);
			}
		}))
	}
}

impl std::fmt::Debug for MemoryTable {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryTable")
			.field("name", &self.name)
			.field("rows", &self.len())
			.finish()
	}
}

/// A set of named in-process tables.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
	tables: Arc<Mutex<HashMap<String, MemoryTable>>>,
}

impl MemoryDatabase {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the named table, creating it on first use.
	pub fn table(&self, name: &str) -> MemoryTable {
		self.tables
			.lock()
			.entry(name.to_string())
			.or_insert_with(|| MemoryTable::new(name))
			.clone()
	}

	/// Registers a preconfigured table, replacing any previous one.
	pub fn attach(&self, table: MemoryTable) {
		self.tables.lock().insert(table.table().to_string(), table);
	}
}
