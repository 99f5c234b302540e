//! Data model for the storefront synchronization layer.
//!
//! Everything here is plain data: identifiers, field values, entities, the
//! ordered [`Collection`] that a store renders from, and the events and
//! pending mutations that flow through it. No I/O happens in this crate.
//!
//! # Invariants
//!
//! - A [`Collection`] holds at most one [`Entity`] per [`EntityId`].
//! - Iteration order of a [`Collection`] is ascending `created_at`; entities
//!   with equal timestamps keep arrival order.

pub mod catalog;
mod collection;
mod entity;
mod event;
mod id;
mod mutation;
pub mod seed;
mod value;

pub use collection::{Collection, RenameOutcome};
pub use entity::{Draft, Entity};
pub use event::{ChangeEvent, ChangeKind};
pub use id::EntityId;
pub use mutation::{MutationKind, MutationState, PendingMutation};
pub use value::{FieldValue, Fields};
