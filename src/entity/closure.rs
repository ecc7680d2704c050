//! Dependency closures of a record
//!
//! Three views of what a record-level template may see:
//! - [`dependencies_all`]: the full flattened closure
//! - [`dependencies_up_to_closest_dependent`]: stops before each 1-N child
//! - [`dependencies_to_closest_dependent`]: stops at each 1-N child, including it
//!
//! A 1-N child is an array-of-record element of the record currently being
//! walked. Bounded walks descend through plain record dependencies without
//! returning them; only enums and, for the inclusive variant, the 1-N
//! children themselves are collected. Each record is walked at most once.

use indexmap::IndexSet;
use std::collections::HashSet;

use super::{Entity, EntityId, EntityStore};
use crate::graph::flatten;

/// Transitive dependencies of `record`, dependencies first
pub fn dependencies_all(store: &EntityStore, record: EntityId) -> Vec<EntityId> {
    flatten(store, &[record])
}

/// Dependencies strictly above the next ownership boundary
pub fn dependencies_up_to_closest_dependent(store: &EntityStore, record: EntityId) -> Vec<EntityId> {
    bounded(store, record, false)
}

/// Dependencies up to and including the next ownership boundary
pub fn dependencies_to_closest_dependent(store: &EntityStore, record: EntityId) -> Vec<EntityId> {
    bounded(store, record, true)
}

fn bounded(store: &EntityStore, record: EntityId, include_boundary: bool) -> Vec<EntityId> {
    let mut walked = HashSet::new();
    let mut collected = IndexSet::new();
    walked.insert(record);
    visit(store, record, include_boundary, &mut walked, &mut collected);
    collected.into_iter().collect()
}

fn visit(
    store: &EntityStore,
    owner: EntityId,
    include_boundary: bool,
    walked: &mut HashSet<EntityId>,
    collected: &mut IndexSet<EntityId>,
) {
    let Some(record) = store.record(owner) else {
        return;
    };

    for &dependency in record.dependencies() {
        match store.get(dependency) {
            Entity::Record(_) if record.owns(dependency) => {
                if include_boundary {
                    collected.insert(dependency);
                }
            }
            Entity::Record(_) => {
                if walked.insert(dependency) {
                    visit(store, dependency, include_boundary, walked, collected);
                }
            }
            Entity::Enum(_) => {
                collected.insert(dependency);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tests::{id, store_for, ORDER};

    fn names(store: &EntityStore, ids: &[EntityId]) -> Vec<String> {
        ids.iter().map(|&i| store.get(i).fullname().to_string()).collect()
    }

    #[test]
    fn test_all_is_full_closure() {
        let store = store_for(ORDER).unwrap();
        let all = dependencies_all(&store, id(&store, "shop.Order"));
        assert_eq!(
            names(&store, &all),
            vec!["shop.Status", "shop.Address", "shop.Customer", "shop.Part", "shop.OrderItem"]
        );
    }

    #[test]
    fn test_up_to_excludes_boundary() {
        let store = store_for(ORDER).unwrap();
        let up_to = dependencies_up_to_closest_dependent(&store, id(&store, "shop.Order"));
        assert_eq!(names(&store, &up_to), vec!["shop.Status"]);
    }

    #[test]
    fn test_to_includes_boundary() {
        let store = store_for(ORDER).unwrap();
        let to = dependencies_to_closest_dependent(&store, id(&store, "shop.Order"));
        assert_eq!(names(&store, &to), vec!["shop.Status", "shop.OrderItem"]);
    }

    #[test]
    fn test_boundaries_match_between_variants() {
        let store = store_for(ORDER).unwrap();
        for (record, _) in store.iter().filter(|(_, e)| e.as_record().is_some()) {
            let up_to: HashSet<_> = dependencies_up_to_closest_dependent(&store, record)
                .into_iter()
                .collect();
            let to: HashSet<_> = dependencies_to_closest_dependent(&store, record)
                .into_iter()
                .collect();
            let boundaries: HashSet<_> = to.difference(&up_to).copied().collect();
            let owned: HashSet<_> = store
                .record(record)
                .unwrap()
                .dependencies()
                .iter()
                .copied()
                .filter(|&d| store.record(record).unwrap().owns(d))
                .collect();
            assert!(up_to.is_subset(&to));
            assert_eq!(boundaries, owned);
        }
    }

    #[test]
    fn test_bounded_walk_from_dependent() {
        let store = store_for(ORDER).unwrap();
        let item = id(&store, "shop.OrderItem");
        assert!(dependencies_up_to_closest_dependent(&store, item).is_empty());
        assert_eq!(
            names(&store, &dependencies_to_closest_dependent(&store, item)),
            vec!["shop.Part"]
        );
    }

    #[test]
    fn test_cycles_terminate() {
        let store = store_for(
            r#"[
                {"type": "record", "name": "c.Tree", "fields": [
                    {"name": "meta", "type": {"type": "record", "name": "Meta", "fields": [
                        {"name": "tree", "type": "c.Tree"}
                    ]}}
                ]},
                {"type": "record", "name": "c.Forest", "fields": [{"name": "tree", "type": "c.Tree"}]}
            ]"#,
        )
        .unwrap();
        let forest = id(&store, "c.Forest");
        assert_eq!(names(&store, &dependencies_all(&store, forest)), vec!["c.Tree", "c.Meta"]);
        assert!(dependencies_up_to_closest_dependent(&store, forest).is_empty());
    }

    #[test]
    fn test_enums_behind_plain_records_are_collected() {
        let store = store_for(
            r#"{"type": "record", "name": "p.Invoice", "fields": [
                {"name": "payer", "type": {"type": "record", "name": "Payer", "fields": [
                    {"name": "tier", "type": {"type": "enum", "name": "Tier", "symbols": ["GOLD"]}}
                ]}}
            ]}"#,
        )
        .unwrap();
        let invoice = id(&store, "p.Invoice");
        assert_eq!(
            names(&store, &dependencies_up_to_closest_dependent(&store, invoice)),
            vec!["p.Tier"]
        );
        assert_eq!(
            names(&store, &dependencies_to_closest_dependent(&store, invoice)),
            vec!["p.Tier"]
        );
    }

    const PLAIN_FIRST: &str = r#"{"type": "record", "name": "w.Basket", "fields": [
        {"name": "featured", "type": {"type": "record", "name": "Promo", "fields": [
            {"name": "line", "type": {"type": "record", "name": "Line", "fields": [
                {"name": "sku", "type": "string", "primary": true},
                {"name": "kind", "type": {"type": "enum", "name": "Kind", "symbols": ["A"]}}
            ]}}
        ]}},
        {"name": "lines", "type": {"type": "array", "items": "w.Line"}}
    ]}"#;

    const OWNED_FIRST: &str = r#"{"type": "record", "name": "w.Basket", "fields": [
        {"name": "lines", "type": {"type": "array", "items": {"type": "record", "name": "Line", "fields": [
            {"name": "sku", "type": "string", "primary": true},
            {"name": "kind", "type": {"type": "enum", "name": "Kind", "symbols": ["A"]}}
        ]}}},
        {"name": "featured", "type": {"type": "record", "name": "Promo", "fields": [
            {"name": "line", "type": "w.Line"}
        ]}}
    ]}"#;

    #[test]
    fn test_boundary_reached_by_two_paths() {
        for json in [PLAIN_FIRST, OWNED_FIRST] {
            let store = store_for(json).unwrap();
            let basket = id(&store, "w.Basket");

            let to: HashSet<String> = names(&store, &dependencies_to_closest_dependent(&store, basket))
                .into_iter()
                .collect();
            let up_to = names(&store, &dependencies_up_to_closest_dependent(&store, basket));

            assert_eq!(to, HashSet::from(["w.Line".to_string(), "w.Kind".to_string()]));
            assert_eq!(up_to, vec!["w.Kind"]);
        }
    }
}
