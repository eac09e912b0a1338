//! Component traits
//!
//! These traits define what types can be produced by a definition and which
//! lifecycle callbacks they opt into.

/// Marker trait for types a definition can produce.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Component: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is a Component
impl<T: Send + Sync + 'static> Component for T {}

/// Callback invoked after allocation, before any property is injected.
///
/// Opt in with [`DefinitionBuilder::before_properties_set`](crate::DefinitionBuilder::before_properties_set).
///
/// # Examples
///
/// ```rust
/// use component_factory::{BeforePropertiesSet, ComponentFactory, Definition};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Cache { primed: AtomicBool }
///
/// impl BeforePropertiesSet for Cache {
///     fn before_properties_set(&self) {
///         self.primed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let factory = ComponentFactory::new();
/// factory
///     .register(
///         Definition::builder::<Cache>("cache")
///             .construct_default()
///             .before_properties_set()
///             .build(),
///     )
///     .unwrap();
///
/// let cache = factory.get::<Cache>("cache").unwrap();
/// assert!(cache.primed.load(Ordering::SeqCst));
/// ```
pub trait BeforePropertiesSet: Component {
    /// Called once per instance, before property injection
    fn before_properties_set(&self);
}

/// Callback invoked once every property has been injected.
pub trait AfterPropertiesSet: Component {
    /// Called once per instance, after property injection
    fn after_properties_set(&self);
}
