//! Cross-generator registry
//!
//! Each generator publishes its frozen [`EntityStore`] once, under its name.
//! Later generators read it through `from(...)` and `overrides`.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::entity::{EntityId, EntityStore};
use crate::error::{GenError, Result};

/// Published entity stores, in publication order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    generators: IndexMap<String, Arc<EntityStore>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `store` under `name`; a name can only be published once
    pub fn publish(&mut self, name: impl Into<String>, store: Arc<EntityStore>) -> Result<()> {
        let name = name.into();
        if self.generators.contains_key(&name) {
            return Err(GenError::Config(format!(
                "generator `{}` has already been published",
                name
            )));
        }
        self.generators.insert(name, store);
        Ok(())
    }

    pub fn store(&self, name: &str) -> Result<&Arc<EntityStore>> {
        self.generators
            .get(name)
            .ok_or_else(|| GenError::UnknownGenerator {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Entity built by `generator` for the schema `fullname`
    pub fn lookup(&self, generator: &str, fullname: &str) -> Result<(Arc<EntityStore>, EntityId)> {
        let store = self.store(generator)?;
        let id = store.by_schema(fullname).ok_or_else(|| {
            GenError::Config(format!(
                "generator `{}` has no entity for `{}`",
                generator, fullname
            ))
        })?;
        Ok((Arc::clone(store), id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.generators.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tests::{store_for, ORDER};
    use crate::error::ErrorCategory;

    #[test]
    fn test_publish_once() {
        let mut registry = Registry::new();
        let store = Arc::new(store_for(ORDER).unwrap());
        registry.publish("base", Arc::clone(&store)).unwrap();
        let err = registry.publish("base", store).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ConfigReference);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_generator_lists_available() {
        let mut registry = Registry::new();
        let store = Arc::new(store_for(ORDER).unwrap());
        registry.publish("base", Arc::clone(&store)).unwrap();
        registry.publish("detail", store).unwrap();

        let err = registry.lookup("pojo", "shop.Order").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to find generator `pojo`, available generators: base, detail"
        );
    }

    #[test]
    fn test_lookup_by_schema_fullname() {
        let mut registry = Registry::new();
        registry.publish("base", Arc::new(store_for(ORDER).unwrap())).unwrap();

        let (store, id) = registry.lookup("base", "shop.OrderItem").unwrap();
        assert_eq!(store.get(id).name(), "OrderItem");
        assert!(registry.lookup("base", "shop.Nope").is_err());
    }
}
