//! Definition registry
//!
//! Mutable during the build phase, read-only once finalized. Definitions are
//! stored behind `Arc` so resolution clones a pointer, never a definition.

use crate::{Definition, DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::any::TypeId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "logging")]
use tracing::debug;

#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe registry of component definitions
pub struct DefinitionRegistry {
    /// Map from component key to definition
    definitions: DashMap<Arc<str>, Arc<Definition>, RandomState>,
    /// Keys per produced type, in registration order
    by_type: DashMap<TypeId, Vec<Arc<str>>, RandomState>,
    /// Registration order; also serializes registration against finalization
    order: Mutex<Vec<Arc<str>>>,
    finalized: AtomicBool,
}

impl DefinitionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            definitions: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
            by_type: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
            order: Mutex::new(Vec::new()),
            finalized: AtomicBool::new(false),
        }
    }

    /// Register a definition.
    ///
    /// Fails with [`DiError::DuplicateKey`] if the key is taken and with
    /// [`DiError::AlreadyFinalized`] once the registry is read-only.
    pub fn register(&self, definition: Definition) -> Result<()> {
        let mut order = lock(&self.order);
        if self.is_finalized() {
            return Err(DiError::AlreadyFinalized);
        }

        let key = Arc::clone(definition.key_arc());
        let type_id = definition.produced_type().id();

        match self.definitions.entry(Arc::clone(&key)) {
            Entry::Occupied(_) => Err(DiError::DuplicateKey {
                key: key.to_string(),
            }),
            Entry::Vacant(slot) => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "component_factory",
                    component = &*key,
                    produced = definition.produced_type().name(),
                    scope = definition.scope().as_str(),
                    definition_count = order.len() + 1,
                    "Registering definition"
                );

                slot.insert(Arc::new(definition));
                self.by_type
                    .entry(type_id)
                    .or_insert_with(Vec::new)
                    .push(Arc::clone(&key));
                order.push(key);
                Ok(())
            }
        }
    }

    /// Definition registered under `key`
    #[inline]
    pub fn lookup(&self, key: &str) -> Result<Arc<Definition>> {
        self.definitions
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| DiError::unknown(key))
    }

    /// Every definition producing `type_id`, in registration order
    pub fn lookup_by_type(&self, type_id: TypeId) -> Vec<Arc<Definition>> {
        let Some(keys) = self.by_type.get(&type_id).map(|keys| keys.value().clone()) else {
            return Vec::new();
        };
        keys.iter().filter_map(|key| self.lookup(key).ok()).collect()
    }

    /// Check if `key` is registered
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.definitions.contains_key(key)
    }

    /// Registered keys in registration order
    pub fn keys(&self) -> Vec<Arc<str>> {
        lock(&self.order).clone()
    }

    /// Number of definitions
    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Whether the registry is read-only
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Run `process` over every definition in registration order, then make
    /// the registry read-only.
    ///
    /// Changes are committed only if `process` succeeds for every definition.
    pub(crate) fn finalize<F>(&self, mut process: F) -> Result<()>
    where
        F: FnMut(&mut Definition) -> Result<()>,
    {
        let order = lock(&self.order);
        if self.is_finalized() {
            return Ok(());
        }

        let mut processed = Vec::with_capacity(order.len());
        for key in order.iter() {
            let mut definition = Definition::clone(&*self.lookup(key)?);
            process(&mut definition)?;
            processed.push(definition);
        }

        for definition in processed {
            let key = Arc::clone(definition.key_arc());
            self.definitions.insert(key, Arc::new(definition));
        }

        self.finalized.store(true, Ordering::Release);
        Ok(())
    }
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DefinitionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionRegistry")
            .field("count", &self.len())
            .field("finalized", &self.is_finalized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scope;

    struct Mailer;

    fn mailer(key: &str) -> Definition {
        Definition::builder::<Mailer>(key).construct(|_| Ok(Mailer)).build()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = DefinitionRegistry::new();
        registry.register(mailer("smtp")).unwrap();

        assert!(registry.contains("smtp"));
        assert_eq!(registry.lookup("smtp").unwrap().key(), "smtp");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_key() {
        let registry = DefinitionRegistry::new();
        registry.register(mailer("smtp")).unwrap();

        let err = registry.register(mailer("smtp")).unwrap_err();
        assert_eq!(err, DiError::DuplicateKey { key: "smtp".into() });
    }

    #[test]
    fn test_unknown_key() {
        let registry = DefinitionRegistry::new();
        assert_eq!(registry.lookup("missing").unwrap_err(), DiError::unknown("missing"));
    }

    #[test]
    fn test_lookup_by_type_keeps_registration_order() {
        let registry = DefinitionRegistry::new();
        registry.register(mailer("b")).unwrap();
        registry.register(mailer("a")).unwrap();

        let keys: Vec<_> = registry
            .lookup_by_type(TypeId::of::<Mailer>())
            .iter()
            .map(|d| d.key().to_string())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert!(registry.lookup_by_type(TypeId::of::<String>()).is_empty());
    }

    #[test]
    fn test_finalize_applies_and_locks() {
        let registry = DefinitionRegistry::new();
        registry.register(mailer("smtp")).unwrap();

        registry
            .finalize(|definition| {
                definition.set_scope(Scope::Singleton);
                Ok(())
            })
            .unwrap();

        assert!(registry.is_finalized());
        assert_eq!(registry.lookup("smtp").unwrap().scope(), Scope::Singleton);
        assert_eq!(
            registry.register(mailer("late")).unwrap_err(),
            DiError::AlreadyFinalized
        );
    }

    #[test]
    fn test_failed_finalize_commits_nothing() {
        let registry = DefinitionRegistry::new();
        registry.register(mailer("smtp")).unwrap();

        let err = registry
            .finalize(|definition| {
                definition.set_scope(Scope::Prototype);
                Err(DiError::creation_failed("smtp", "rejected"))
            })
            .unwrap_err();

        assert!(matches!(err, DiError::CreationFailed { .. }));
        assert!(!registry.is_finalized());
        assert_eq!(registry.lookup("smtp").unwrap().scope(), Scope::ObjectGraph);
    }
}
