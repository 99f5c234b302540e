use larder_remote::Subscription;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{OptimisticStore, Result};

/// Feeds one remote change subscription into one store.
///
/// The subscription is owned by the routing task and released when the task
/// exits, whether by [`Self::shutdown`], by drop of the router, or because
/// the remote closed the channel.
///
/// Each router carries the binding generation it was spawned for, so logs
/// of a collection that rebinds tell old and new routers apart.
#[derive(Debug)]
pub struct ChangeEventRouter {
	table: String,
	generation: u64,
	cancel: CancellationToken,
	task: Option<JoinHandle<()>>,
}

impl ChangeEventRouter {
	/// Subscribes to the store's remote table and starts routing.
	///
	/// Must be called from within a tokio runtime.
	pub fn spawn(store: OptimisticStore) -> Result<Self> {
		Self::bind(store, 1)
	}

	/// Like [`Self::spawn`], tagging the router with `generation`.
	pub(crate) fn bind(store: OptimisticStore, generation: u64) -> Result<Self> {
		let subscription = store.remote().subscribe()?;
		let table = store.table().to_string();
		let cancel = CancellationToken::new();
		tracing::debug!(%table, generation, "router bound");
		let task = tokio::spawn(route(store, subscription, generation, cancel.clone()));
		Ok(Self {
			table,
			generation,
			cancel,
			task: Some(task),
		})
	}

	pub fn table(&self) -> &str {
		&self.table
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// True once the routing task has exited.
	pub fn is_finished(&self) -> bool {
		self.task.as_ref().is_none_or(JoinHandle::is_finished)
	}

	/// Stops routing and waits until the subscription is released.
	pub async fn shutdown(mut self) {
		self.cancel.cancel();
		if let Some(task) = self.task.take()
			&& let Err(error) = task.await
		{
			tracing::error!(table = %self.table, %error, "router task failed");
		}
	}
}

impl Drop for ChangeEventRouter {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

async fn route(store: OptimisticStore, mut subscription: Subscription, generation: u64, cancel: CancellationToken) {
	loop {
		tokio::select! {
			biased;

			_ = cancel.cancelled() => break,

			change = subscription.recv() => {
				let Some(change) = change else {
					tracing::debug!(table = %store.table(), generation, "change channel closed");
					break;
				};
				match store.mapping().translate(&change) {
					Some(event) => {
						store.reconcile(event);
					}
					None => tracing::trace!(
						table = %store.table(),
						kind = change.kind.as_str(),
						"dropped malformed change"
					),
				}
			}
		}
	}
	subscription.unsubscribe();
	tracing::debug!(table = %store.table(), generation, cancelled = cancel.is_cancelled(), "router stopped");
}
