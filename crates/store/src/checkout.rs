//! Shopping cart and order submission.

use larder_model::EntityId;
use larder_model::catalog::{CartLine, CustomerContact, Product};
use larder_remote::{ID_COLUMN, Row, SharedClient};
use serde_json::Value;

use crate::storage::{self, SharedStorage};
use crate::{CheckoutError, Result};

/// Status given to freshly submitted orders.
pub const ORDER_PENDING: &str = "Pending";

/// Cart lines keyed by product, persisted after every change when backed by
/// storage.
#[derive(Default)]
pub struct Cart {
	lines: Vec<CartLine>,
	storage: Option<(SharedStorage, String)>,
}

impl Cart {
	/// Cart without persistence.
	pub fn new() -> Self {
		Self::default()
	}

	/// Restores the cart stored under `key`. A missing or unreadable value
	/// yields an empty cart.
	pub fn open(storage: SharedStorage, key: impl Into<String>) -> Result<Self> {
		let key = key.into();
		let lines = storage::read_json(storage.as_ref(), &key)?.unwrap_or_default();
		Ok(Self {
			lines,
			storage: Some((storage, key)),
		})
	}

	pub fn lines(&self) -> &[CartLine] {
		&self.lines
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	/// Adds `quantity` of a product, merging with an existing line.
	pub fn add(&mut self, product: &Product, quantity: u32) -> Result<()> {
		if quantity == 0 {
			return Ok(());
		}
		match self.lines.iter_mut().find(|l| l.product_id == product.id) {
			Some(line) => line.quantity = line.quantity.saturating_add(quantity),
			None => self.lines.push(CartLine::from_product(product, quantity)),
		}
		self.persist()
	}

	/// Sets the quantity of a line; zero removes it.
	pub fn set_quantity(&mut self, product_id: &EntityId, quantity: u32) -> Result<()> {
		if quantity == 0 {
			return self.remove(product_id);
		}
		if let Some(line) = self.lines.iter_mut().find(|l| &l.product_id == product_id) {
			line.quantity = quantity;
		}
		self.persist()
	}

	pub fn remove(&mut self, product_id: &EntityId) -> Result<()> {
		self.lines.retain(|l| &l.product_id != product_id);
		self.persist()
	}

	pub fn clear(&mut self) -> Result<()> {
		self.lines.clear();
		self.persist()
	}

	pub fn total(&self) -> f64 {
		self.lines.iter().map(CartLine::subtotal).sum()
	}

	/// Number of units across all lines.
	pub fn item_count(&self) -> u32 {
		self.lines.iter().map(|l| l.quantity).sum()
	}

	fn persist(&self) -> Result<()> {
		match &self.storage {
			Some((storage, key)) => storage::write_json(storage.as_ref(), key, &self.lines),
			None => Ok(()),
		}
	}
}

impl std::fmt::Debug for Cart {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Cart")
			.field("lines", &self.lines)
			.field("persistent", &self.storage.is_some())
			.finish()
	}
}

/// Builds the remote row of an order.
pub fn order_row(cart: &Cart, contact: &CustomerContact) -> Result<Row> {
	if cart.is_empty() {
		return Err(CheckoutError::EmptyCart.into());
	}
	let required = [("name", &contact.name), ("phone", &contact.phone), ("address", &contact.address)];
	if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
		return Err(CheckoutError::MissingContact(*field).into());
	}

	let items = cart
		.lines()
		.iter()
		.map(serde_json::to_value)
		.collect::<serde_json::Result<Vec<_>>>()?;
	let mut row = Row::new();
	row.insert("customer_name".into(), contact.name.trim().into());
	row.insert("customer_phone".into(), contact.phone.trim().into());
	row.insert("customer_email".into(), contact.email.trim().into());
	row.insert("customer_address".into(), contact.address.trim().into());
	row.insert("notes".into(), contact.notes.clone().into());
	row.insert("total_amount".into(), cart.total().into());
	row.insert("items".into(), Value::Array(items));
	row.insert("status".into(), ORDER_PENDING.into());
	Ok(row)
}

/// What the storefront shows after a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
	pub id: Option<EntityId>,
	pub total: f64,
	pub items: u32,
}

/// One-shot order submission into the orders table.
#[derive(Clone)]
pub struct OrderSubmitter {
	orders: SharedClient,
}

impl OrderSubmitter {
	pub fn new(orders: SharedClient) -> Self {
		Self { orders }
	}

	/// Submits the cart as a pending order and clears it on success.
	///
	/// The cart is left untouched when validation or the remote fails.
	pub async fn submit(&self, cart: &mut Cart, contact: &CustomerContact) -> Result<OrderReceipt> {
		let row = order_row(cart, contact)?;
		let total = cart.total();
		let items = cart.item_count();
		let stored = match self.orders.insert(row).await {
			Ok(stored) => stored,
			Err(error) => {
				tracing::warn!(table = %self.orders.table(), %error, error_kind = error.kind(), "order submission failed");
				return Err(error.into());
			}
		};
		let id = stored.get(ID_COLUMN).and_then(EntityId::from_json);
		tracing::info!(table = %self.orders.table(), id = ?id, total, items, "order submitted");
		cart.clear()?;
		Ok(OrderReceipt { id, total, items })
	}
}
