//! Component factory
//!
//! The `ComponentFactory` turns registered definitions into live, wired,
//! correctly-scoped instances.
//!
//! ## Resolution
//!
//! Each component moves through `Allocating -> PropertiesPending -> Ready`
//! inside a [`ResolutionContext`]:
//!
//! 1. Initializer arguments are resolved while the key is `Allocating`. A
//!    reference back to an `Allocating` key is a constructor cycle and fails
//!    with [`DiError::UnresolvableCycle`].
//! 2. The raw instance is allocated and published to the context as
//!    `PropertiesPending`. References to the key from here on receive this
//!    instance, which is how property cycles close.
//! 3. Properties are injected in declaration order between the
//!    before/after-properties-set callbacks.
//!
//! A failure after step 2 never publishes the instance to the singleton store
//! or the object graph, but components that already received it through a
//! property cycle keep their reference. This is a best-effort guarantee, not
//! a rollback.
//!
//! ## Concurrency
//!
//! Singletons are created behind a per-key `OnceCell`: concurrent first
//! requests block until one thread has built the instance, and every later
//! read is lock-free. Two threads that each start building a singleton the
//! other one needs (in opposite order) deadlock on those cells; the factory
//! does not detect this.

use crate::configurer::DefinitionPostProcessor;
use crate::convert::{AnyValue, TargetType, TypeConverter, TypeConverterRegistry};
use crate::definition::downcast;
use crate::registry::{lock, DefinitionRegistry};
use crate::resolver::{InjectionResolver, ReferenceResolver};
use crate::scope::Frame;
use crate::store::SingletonStore;
use crate::{Arguments, Component, Definition, DiError, ResolutionContext, Result, Scope};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Definition-driven component factory.
///
/// Register definitions, optionally converters and post-processors, then
/// resolve. The first resolution (or an explicit [`finalize`](Self::finalize))
/// makes the factory read-only.
///
/// # Examples
///
/// ```rust
/// use component_factory::{ComponentFactory, Definition};
/// use std::sync::{Arc, Mutex, Weak};
///
/// #[derive(Default)]
/// struct Husband { wife: Mutex<Option<Arc<Wife>>> }
///
/// #[derive(Default)]
/// struct Wife { husband: Mutex<Weak<Husband>> }
///
/// let factory = ComponentFactory::new();
/// factory.register(
///     Definition::builder::<Husband>("husband")
///         .construct_default()
///         .property_ref::<Wife, _>("wife", "wife", |h, w| *h.wife.lock().unwrap() = Some(w))
///         .build(),
/// ).unwrap();
/// factory.register(
///     Definition::builder::<Wife>("wife")
///         .construct_default()
///         .property_ref::<Husband, _>("husband", "husband", |w, h| *w.husband.lock().unwrap() = Arc::downgrade(&h))
///         .build(),
/// ).unwrap();
///
/// let husband = factory.get::<Husband>("husband").unwrap();
/// let wife = husband.wife.lock().unwrap().clone().unwrap();
/// let back = wife.husband.lock().unwrap().upgrade().unwrap();
/// assert!(Arc::ptr_eq(&husband, &back));
/// ```
pub struct ComponentFactory {
    /// Component definitions
    registry: DefinitionRegistry,
    /// Converters accepted during the build phase
    converters: RwLock<TypeConverterRegistry>,
    /// Definition mutators applied once at finalization
    post_processors: Mutex<Vec<Arc<dyn DefinitionPostProcessor>>>,
    /// Finished singleton instances
    singletons: SingletonStore,
    /// Converter snapshot taken at finalization; set once the factory is read-only
    frozen: OnceCell<TypeConverterRegistry>,
}

impl ComponentFactory {
    /// Create a factory with the default converters.
    #[inline]
    pub fn new() -> Self {
        Self::with_converters(TypeConverterRegistry::new())
    }

    /// Create a factory using `converters` for by-value injections.
    pub fn with_converters(converters: TypeConverterRegistry) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "component_factory",
            converters = converters.len(),
            "Creating new component factory"
        );

        Self {
            registry: DefinitionRegistry::new(),
            converters: RwLock::new(converters),
            post_processors: Mutex::new(Vec::new()),
            singletons: SingletonStore::new(),
            frozen: OnceCell::new(),
        }
    }

    // =========================================================================
    // Build phase
    // =========================================================================

    /// Register a definition.
    ///
    /// # Errors
    ///
    /// [`DiError::DuplicateKey`] if the key is taken,
    /// [`DiError::AlreadyFinalized`] after finalization.
    #[inline]
    pub fn register(&self, definition: Definition) -> Result<()> {
        self.registry.register(definition)
    }

    /// Register several definitions, stopping at the first failure.
    pub fn register_all(&self, definitions: impl IntoIterator<Item = Definition>) -> Result<()> {
        definitions
            .into_iter()
            .try_for_each(|definition| self.register(definition))
    }

    /// Add a type converter; it is consulted before the built-in ones.
    pub fn register_converter<C: TypeConverter + 'static>(&self, converter: C) -> Result<()> {
        let mut converters = self
            .converters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_finalized() {
            return Err(DiError::AlreadyFinalized);
        }

        converters.register(converter);

        #[cfg(feature = "logging")]
        debug!(
            target: "component_factory",
            converters = converters.len(),
            "Registered type converter"
        );

        Ok(())
    }

    /// Add a post-processor, run over every definition at finalization.
    pub fn add_post_processor<P: DefinitionPostProcessor + 'static>(&self, processor: P) -> Result<()> {
        let mut processors = lock(&self.post_processors);
        if self.is_finalized() {
            return Err(DiError::AlreadyFinalized);
        }
        processors.push(Arc::new(processor));
        Ok(())
    }

    /// Apply post-processors and make the factory read-only.
    ///
    /// Idempotent. Called implicitly by the first resolution.
    #[inline]
    pub fn finalize(&self) -> Result<()> {
        self.converters().map(|_| ())
    }

    /// Check if the factory is read-only.
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.registry.is_finalized()
    }

    fn converters(&self) -> Result<&TypeConverterRegistry> {
        self.frozen.get_or_try_init(|| self.freeze())
    }

    fn freeze(&self) -> Result<TypeConverterRegistry> {
        // Both guards stay held until the registry is read-only, so a late
        // converter or post-processor is either included or rejected
        let processors = lock(&self.post_processors);
        let converters = self
            .converters
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        self.registry.finalize(|definition| {
            processors
                .iter()
                .try_for_each(|processor| processor.post_process(definition))
        })?;

        let singleton_keys: Vec<Arc<str>> = self
            .registry
            .keys()
            .into_iter()
            .filter(|key| {
                self.registry
                    .lookup(key)
                    .is_ok_and(|d| d.scope() == Scope::Singleton)
            })
            .collect();
        self.singletons.prepare(singleton_keys.iter());

        #[cfg(feature = "logging")]
        debug!(
            target: "component_factory",
            definitions = self.registry.len(),
            singletons = singleton_keys.len(),
            post_processors = processors.len(),
            converters = converters.len(),
            "Component factory finalized - no further registrations allowed"
        );

        Ok(TypeConverterRegistry::clone(&converters))
    }

    // =========================================================================
    // Query methods
    // =========================================================================

    /// Check if a definition is registered under `key`.
    #[inline]
    pub fn contains_definition(&self, key: &str) -> bool {
        self.registry.contains(key)
    }

    /// Definition registered under `key`.
    #[inline]
    pub fn definition(&self, key: &str) -> Result<Arc<Definition>> {
        self.registry.lookup(key)
    }

    /// Every definition producing `T`, abstract ones included.
    pub fn definitions_of_type<T: Component>(&self) -> Vec<Arc<Definition>> {
        self.registry.lookup_by_type(TargetType::of::<T>().id())
    }

    /// Registered keys in registration order.
    pub fn definition_keys(&self) -> Vec<Arc<str>> {
        self.registry.keys()
    }

    /// Number of registered definitions.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Check if no definitions are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Number of singletons created so far.
    #[inline]
    pub fn singleton_count(&self) -> usize {
        self.singletons.len()
    }

    /// Check if the singleton under `key` has been created.
    #[inline]
    pub fn has_singleton(&self, key: &str) -> bool {
        self.singletons.contains(key)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the component registered under `key` in a fresh resolution.
    ///
    /// # Errors
    ///
    /// [`DiError::UnknownComponent`], [`DiError::AbstractComponent`],
    /// [`DiError::UnresolvableCycle`], [`DiError::Conversion`],
    /// [`DiError::CreationFailed`] or [`DiError::TypeMismatch`].
    pub fn get_instance(&self, key: &str) -> Result<AnyValue> {
        if let Some(instance) = self.singletons.get(key) {
            #[cfg(feature = "logging")]
            trace!(
                target: "component_factory",
                component = key,
                location = "singleton_store",
                "Component resolved from singleton store"
            );
            return Ok(instance);
        }

        let mut ctx = ResolutionContext::new();
        let result = self.get_instance_in(key, &mut ctx);

        #[cfg(feature = "logging")]
        match &result {
            Ok(_) => trace!(
                target: "component_factory",
                component = key,
                constructed = ctx.constructed(),
                "Top-level resolution completed"
            ),
            Err(err) => debug!(
                target: "component_factory",
                component = key,
                error = %err,
                "Top-level resolution failed"
            ),
        }

        result
    }

    /// Resolve `key` within an existing resolution.
    ///
    /// Object-graph instances cached in `ctx` are reused, so several calls
    /// with the same context share one object graph.
    pub fn get_instance_in(&self, key: &str, ctx: &mut ResolutionContext) -> Result<AnyValue> {
        self.converters()?;
        self.resolve_in(key, ctx)
    }

    /// Resolve the single (or primary) definition producing `target`.
    pub fn get_instance_by_type(&self, target: TargetType) -> Result<AnyValue> {
        self.converters()?;
        let definition = self.select_by_type(target)?;
        self.get_instance(definition.key())
    }

    /// Resolve `key` and downcast to `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use component_factory::{ComponentFactory, Definition};
    ///
    /// struct Clock { offset: i64 }
    ///
    /// let factory = ComponentFactory::new();
    /// factory.register(
    ///     Definition::builder::<Clock>("clock")
    ///         .arg_value::<i64>("-3600")
    ///         .construct(|args| Ok(Clock { offset: args.value(0)? }))
    ///         .singleton()
    ///         .build(),
    /// ).unwrap();
    ///
    /// assert_eq!(factory.get::<Clock>("clock").unwrap().offset, -3600);
    /// ```
    pub fn get<T: Component>(&self, key: &str) -> Result<Arc<T>> {
        downcast::<T>(self.get_instance(key)?, key)
    }

    /// Resolve `key`, returning `None` on any error.
    #[inline]
    pub fn try_get<T: Component>(&self, key: &str) -> Option<Arc<T>> {
        self.get::<T>(key).ok()
    }

    /// Resolve the single (or primary) definition producing `T`.
    pub fn get_by_type<T: Component>(&self) -> Result<Arc<T>> {
        let instance = self.get_instance_by_type(TargetType::of::<T>())?;
        downcast::<T>(instance, std::any::type_name::<T>())
    }

    fn select_by_type(&self, target: TargetType) -> Result<Arc<Definition>> {
        let all = self.registry.lookup_by_type(target.id());
        let (concrete, placeholders): (Vec<_>, Vec<_>) =
            all.into_iter().partition(|d| !d.is_abstract());

        match concrete.as_slice() {
            [] => Err(match placeholders.first() {
                Some(placeholder) => DiError::AbstractComponent {
                    key: placeholder.key().to_string(),
                },
                None => DiError::UnknownComponent {
                    key: target.name().to_string(),
                },
            }),
            [only] => Ok(Arc::clone(only)),
            many => {
                let mut primaries = many.iter().filter(|d| d.is_primary());
                match (primaries.next(), primaries.next()) {
                    (Some(primary), None) => Ok(Arc::clone(primary)),
                    _ => Err(DiError::AmbiguousComponent {
                        type_name: target.name(),
                        candidates: many.iter().map(|d| d.key().to_string()).collect(),
                    }),
                }
            }
        }
    }

    fn resolve_in(&self, key: &str, ctx: &mut ResolutionContext) -> Result<AnyValue> {
        match ctx.frame(key) {
            Some(Frame::PropertiesPending(instance)) => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "component_factory",
                    component = key,
                    depth = ctx.depth(),
                    "Reference to component under construction, handing out partial instance"
                );
                return Ok(Arc::clone(instance));
            }
            Some(Frame::Allocating) => {
                let path = ctx.cycle_path(key);

                #[cfg(feature = "logging")]
                debug!(
                    target: "component_factory",
                    component = key,
                    path = ?path,
                    "Constructor cycle detected"
                );

                return Err(DiError::UnresolvableCycle {
                    key: key.to_string(),
                    path,
                });
            }
            None => {}
        }

        let definition = self.registry.lookup(key)?;
        if definition.is_abstract() {
            return Err(DiError::AbstractComponent {
                key: key.to_string(),
            });
        }

        match definition.scope() {
            Scope::Singleton => {
                if let Some(instance) = self.singletons.get(key) {
                    return Ok(instance);
                }
                self.singletons
                    .get_or_try_create(definition.key_arc(), || self.build(&definition, ctx))
            }
            Scope::Prototype => self.build(&definition, ctx),
            Scope::ObjectGraph => {
                if let Some(instance) = ctx.object_graph_get(key) {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "component_factory",
                        component = key,
                        location = "object_graph",
                        "Component resolved from current object graph"
                    );
                    return Ok(instance);
                }
                let instance = self.build(&definition, ctx)?;
                ctx.object_graph_insert(definition.key_arc(), Arc::clone(&instance));
                Ok(instance)
            }
        }
    }

    /// Run the construction state machine for one definition.
    fn build(&self, definition: &Definition, ctx: &mut ResolutionContext) -> Result<AnyValue> {
        ctx.enter(definition.key_arc());
        let result = self.construct_and_wire(definition, ctx);
        ctx.leave(definition.key());
        result
    }

    fn construct_and_wire(&self, definition: &Definition, ctx: &mut ResolutionContext) -> Result<AnyValue> {
        let key = definition.key_arc();
        let initializer = definition
            .initializer()
            .ok_or_else(|| DiError::AbstractComponent { key: key.to_string() })?;
        let resolver = InjectionResolver::new(self.converters()?, self);

        #[cfg(feature = "logging")]
        debug!(
            target: "component_factory",
            component = &**key,
            scope = definition.scope().as_str(),
            depth = ctx.depth(),
            arguments = initializer.arguments().len(),
            properties = definition.properties().len(),
            "Constructing component"
        );

        let declared = initializer.arguments();
        let mut names = Vec::with_capacity(declared.len());
        let mut values = Vec::with_capacity(declared.len());
        for argument in declared {
            names.push(argument.name().map(Arc::<str>::from));
            values.push(resolver.resolve(argument.injection(), ctx)?);
        }

        let instance = initializer.construct(&Arguments::new(Arc::clone(key), names, values))?;
        ctx.allocated(key, Arc::clone(&instance));

        definition.run_before_hook(&instance);
        for property in definition.properties() {
            let value = resolver.resolve(property.injection(), ctx)?;
            property.apply(&instance, value)?;
        }
        definition.run_after_hook(&instance);

        Ok(instance)
    }
}

impl ReferenceResolver for ComponentFactory {
    #[inline]
    fn resolve_reference(&self, key: &Arc<str>, ctx: &mut ResolutionContext) -> Result<AnyValue> {
        self.resolve_in(key, ctx)
    }

    fn resolve_type(&self, target: &TargetType, ctx: &mut ResolutionContext) -> Result<AnyValue> {
        let definition = self.select_by_type(*target)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "component_factory",
            produced = target.name(),
            component = definition.key(),
            "Autowired by type"
        );

        self.resolve_in(definition.key(), ctx)
    }
}

impl Default for ComponentFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("definitions", &self.len())
            .field("singletons", &self.singletons.len())
            .field("finalized", &self.is_finalized())
            .finish()
    }
}
