use std::fmt;

use tokio::sync::mpsc;

use crate::RowChange;

type Release = Box<dyn FnOnce() + Send>;

/// Scoped change subscription on one remote table.
///
/// Delivers [`RowChange`]s in the order the remote emitted them. The
/// underlying channel is released exactly once, by [`Self::unsubscribe`] or
/// on drop.
pub struct Subscription {
	table: String,
	rx: mpsc::UnboundedReceiver<RowChange>,
	release: Option<Release>,
}

impl Subscription {
	/// Wraps a receiver together with the hook that detaches it remotely.
	pub fn new(table: impl Into<String>, rx: mpsc::UnboundedReceiver<RowChange>, release: impl FnOnce() + Send + 'static) -> Self {
		Self {
			table: table.into(),
			rx,
			release: Some(Box::new(release)),
		}
	}

	pub fn table(&self) -> &str {
		&self.table
	}

	/// Waits for the next change. `None` once the remote closed the channel.
	pub async fn recv(&mut self) -> Option<RowChange> {
		self.rx.recv().await
	}

	/// Returns an already delivered change without waiting.
	pub fn try_recv(&mut self) -> Option<RowChange> {
		self.rx.try_recv().ok()
	}

	/// Releases the subscription now instead of at drop.
	pub fn unsubscribe(mut self) {
		self.release_once();
	}

	fn release_once(&mut self) {
		if let Some(release) = self.release.take() {
			tracing::debug!(table = %self.table, "subscription released");
			self.rx.close();
			release();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.release_once();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("table", &self.table)
			.field("released", &self.release.is_none())
			.finish()
	}
}
