//! Component scopes and per-request resolution state
//!
//! [`Scope`] decides how long a finished instance is cached. The
//! [`ResolutionContext`] carries everything that belongs to a single top-level
//! request: the in-progress map used for cycle handling, the current
//! resolution path and the object-graph cache.

use crate::AnyValue;
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Lifecycle policy for the instances a definition produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One instance for the factory's lifetime, created lazily
    Singleton,

    /// New instance for every request, never cached
    Prototype,

    /// One instance per top-level resolution, shared by everything built
    /// while satisfying that request
    #[default]
    ObjectGraph,
}

impl Scope {
    /// Short lowercase name, used in log fields
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Singleton => "singleton",
            Scope::Prototype => "prototype",
            Scope::ObjectGraph => "object_graph",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction state of a component inside one resolution
#[derive(Clone)]
pub(crate) enum Frame {
    /// Initializer arguments are being resolved; no instance exists yet
    Allocating,
    /// Instance allocated, properties still being injected
    PropertiesPending(AnyValue),
}

/// State of one top-level resolution request.
///
/// [`ComponentFactory::get_instance`](crate::ComponentFactory::get_instance)
/// creates a fresh context per call. Pass a context explicitly to
/// [`ComponentFactory::get_instance_in`](crate::ComponentFactory::get_instance_in)
/// to make several requests share one object graph.
///
/// # Examples
///
/// ```rust
/// use component_factory::{ComponentFactory, Definition, ResolutionContext, Scope};
/// use std::sync::Arc;
///
/// struct Session;
///
/// let factory = ComponentFactory::new();
/// factory
///     .register(Definition::builder::<Session>("session").construct(|_| Ok(Session)).build())
///     .unwrap();
///
/// let mut ctx = ResolutionContext::new();
/// let a = factory.get_instance_in("session", &mut ctx).unwrap();
/// let b = factory.get_instance_in("session", &mut ctx).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(ctx.object_graph_len(), 1);
/// ```
#[derive(Default)]
pub struct ResolutionContext {
    in_progress: HashMap<Arc<str>, Frame, RandomState>,
    path: Vec<Arc<str>>,
    object_graph: HashMap<Arc<str>, AnyValue, RandomState>,
    constructed: usize,
}

impl ResolutionContext {
    /// Create an empty context
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of components currently under construction
    #[inline]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Number of instances built so far with this context
    #[inline]
    pub fn constructed(&self) -> usize {
        self.constructed
    }

    /// Number of object-graph instances cached in this context
    #[inline]
    pub fn object_graph_len(&self) -> usize {
        self.object_graph.len()
    }

    /// Drop every cached object-graph instance
    pub fn clear(&mut self) {
        self.object_graph.clear();
    }

    #[inline]
    pub(crate) fn frame(&self, key: &str) -> Option<&Frame> {
        self.in_progress.get(key)
    }

    /// Mark `key` as allocating and push it onto the resolution path
    pub(crate) fn enter(&mut self, key: &Arc<str>) {
        self.in_progress.insert(Arc::clone(key), Frame::Allocating);
        self.path.push(Arc::clone(key));
    }

    /// Publish the raw instance so re-entrant references receive it
    pub(crate) fn allocated(&mut self, key: &Arc<str>, instance: AnyValue) {
        self.constructed += 1;

        #[cfg(feature = "logging")]
        trace!(
            target: "component_factory",
            component = &**key,
            depth = self.path.len(),
            "Instance allocated, injecting properties"
        );

        self.in_progress
            .insert(Arc::clone(key), Frame::PropertiesPending(instance));
    }

    /// Remove `key` from the in-progress map, whether construction succeeded or not
    pub(crate) fn leave(&mut self, key: &str) {
        self.in_progress.remove(key);
        if let Some(pos) = self.path.iter().rposition(|k| &**k == key) {
            self.path.truncate(pos);
        }
    }

    /// Resolution path from the first occurrence of `key` back to `key`
    pub(crate) fn cycle_path(&self, key: &str) -> Vec<String> {
        let start = self.path.iter().position(|k| &**k == key).unwrap_or(0);
        self.path[start..]
            .iter()
            .map(|k| k.to_string())
            .chain(std::iter::once(key.to_string()))
            .collect()
    }

    #[inline]
    pub(crate) fn object_graph_get(&self, key: &str) -> Option<AnyValue> {
        self.object_graph.get(key).cloned()
    }

    #[inline]
    pub(crate) fn object_graph_insert(&mut self, key: &Arc<str>, instance: AnyValue) {
        self.object_graph.insert(Arc::clone(key), instance);
    }
}

impl std::fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("path", &self.path)
            .field("object_graph", &self.object_graph.len())
            .field("constructed", &self.constructed)
            .finish()
    }
}
