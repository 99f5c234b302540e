use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn at(secs: i64) -> DateTime<Utc> {
	Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn ids(collection: &Collection) -> Vec<EntityId> {
	collection.ids().cloned().collect()
}

#[test]
fn insert_places_by_created_at() {
	let mut c = Collection::new();
	assert!(c.insert(Entity::new(1, at(10))));
	assert!(c.insert(Entity::new(2, at(30))));
	assert!(c.insert(Entity::new(3, at(20))));
	assert_eq!(ids(&c), vec![EntityId::Int(1), EntityId::Int(3), EntityId::Int(2)]);
}

#[test]
fn equal_timestamps_keep_arrival_order() {
	let mut c = Collection::new();
	c.insert(Entity::new("a", at(5)));
	c.insert(Entity::new("b", at(5)));
	c.insert(Entity::new("c", at(5)));
	assert_eq!(ids(&c), vec![EntityId::from("a"), EntityId::from("b"), EntityId::from("c")]);
}

#[test]
fn duplicate_insert_is_rejected() {
	let mut c = Collection::new();
	assert!(c.insert(Entity::new(1, at(1)).with("title", "first")));
	assert!(!c.insert(Entity::new(1, at(2)).with("title", "second")));
	assert_eq!(c.len(), 1);
	assert_eq!(c.get(&EntityId::Int(1)).unwrap().text("title"), "first");
}

#[test]
fn rename_keeps_position() {
	let mut c = Collection::new();
	c.insert(Entity::new(1, at(1)));
	let temp = EntityId::temporary();
	c.insert(Entity::new(temp.clone(), at(2)));
	c.insert(Entity::new(3, at(3)));

	let outcome = c.rename(&temp, Entity::new(2, at(2)).with("title", "confirmed"));
	assert_eq!(outcome, RenameOutcome::Renamed);
	assert_eq!(ids(&c), vec![EntityId::Int(1), EntityId::Int(2), EntityId::Int(3)]);
	assert!(!c.contains(&temp));
}

#[test]
fn rename_moves_entry_when_confirmed_timestamp_breaks_order() {
	let mut c = Collection::new();
	let temp = EntityId::temporary();
	c.insert(Entity::new(temp.clone(), at(1)));
	c.insert(Entity::new(5, at(2)));

	c.rename(&temp, Entity::new(6, at(3)));
	assert_eq!(ids(&c), vec![EntityId::Int(5), EntityId::Int(6)]);
}

#[test]
fn rename_collapses_when_confirmed_id_already_present() {
	let mut c = Collection::new();
	let temp = EntityId::temporary();
	c.insert(Entity::new(temp.clone(), at(1)));
	c.insert(Entity::new(9, at(1)));

	assert_eq!(c.rename(&temp, Entity::new(9, at(1))), RenameOutcome::Collapsed);
	assert_eq!(ids(&c), vec![EntityId::Int(9)]);
}

#[test]
fn rename_of_missing_entry_is_reported() {
	let mut c = Collection::new();
	assert_eq!(c.rename(&EntityId::temporary(), Entity::new(1, at(1))), RenameOutcome::Missing);
	assert!(c.is_empty());
}

#[test]
fn replace_repositions_on_timestamp_change() {
	let mut c = Collection::from_entities([Entity::new(1, at(1)), Entity::new(2, at(2))]);
	assert!(c.replace(Entity::new(1, at(1) + Duration::seconds(5))));
	assert_eq!(ids(&c), vec![EntityId::Int(2), EntityId::Int(1)]);
	assert!(!c.replace(Entity::new(3, at(0))));
}

#[test]
fn remove_preserves_order_of_rest() {
	let mut c = Collection::from_entities((1..=4).map(|n| Entity::new(n, at(n))));
	assert!(c.remove(&EntityId::Int(2)).is_some());
	assert!(c.remove(&EntityId::Int(2)).is_none());
	assert_eq!(ids(&c), vec![EntityId::Int(1), EntityId::Int(3), EntityId::Int(4)]);
}

proptest! {
	#[test]
	fn iteration_order_is_ascending_created_at(stamps in proptest::collection::vec(0i64..50, 0..40)) {
		let mut c = Collection::new();
		for (n, secs) in stamps.iter().enumerate() {
			c.insert(Entity::new(n as i64, at(*secs)));
		}
		let order: Vec<_> = c.iter().map(|e| e.created_at).collect();
		let mut sorted = order.clone();
		sorted.sort();
		prop_assert_eq!(order, sorted);
		prop_assert_eq!(c.len(), stamps.len());
	}

	#[test]
	fn repeated_insert_is_idempotent(stamps in proptest::collection::vec(0i64..10, 1..20)) {
		let mut once = Collection::new();
		let mut twice = Collection::new();
		for (n, secs) in stamps.iter().enumerate() {
			let entity = Entity::new(n as i64, at(*secs));
			once.insert(entity.clone());
			twice.insert(entity.clone());
			twice.insert(entity);
		}
		prop_assert_eq!(once, twice);
	}
}
