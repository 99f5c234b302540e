//! Client-side synchronization of remote collections.
//!
//! One [`OptimisticStore`] per collection keeps the in-memory snapshot that
//! presentation code renders from. Local mutations apply immediately and are
//! forwarded to the remote; failures trigger a full re-fetch. A
//! [`ChangeEventRouter`] feeds remote change notifications back into the
//! store, where reconciliation is idempotent per identifier, so
//! acknowledgements and notifications may arrive in any order.
//!
//! # Mental Model
//!
//! ```text
//! ConsumerBinding --intent--> OptimisticStore --call--> RemoteCollectionClient
//!        ^                        |     ^                        |
//!        +------ snapshot --------+     +--- ChangeEventRouter <-+ (change events)
//! ```
//!
//! # Invariants
//!
//! - The snapshot is either the last authoritative state or an optimistic
//!   projection of mutations not yet confirmed or rejected.
//! - Store state is only touched under one lock that is never held across an
//!   `.await`.
//! - Each live collection owns at most one change subscription at a time.

mod binding;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod content;
mod error;
mod live;
pub mod mapping;
mod router;
pub mod storage;
mod store;
pub mod transfer;

pub use binding::{ALL_CATEGORIES, ConsumerBinding};
pub use error::{CheckoutError, ImportError, Result, StoreError};
pub use live::{LiveCollection, Storefront, StorefrontRemotes};
pub use mapping::{RowMapping, SharedMapping};
pub use router::ChangeEventRouter;
pub use store::{FallbackSource, OptimisticStore, Phase, RefreshOutcome, Snapshot, StoreBuilder};
