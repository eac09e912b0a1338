//! Component definitions
//!
//! A [`Definition`] is the immutable blueprint for one component: its key,
//! the type it produces, how to construct it, which properties to inject and
//! which [`Scope`] governs the finished instance.
//!
//! Definitions are plain data. Constructors and property setters are typed
//! closures captured by [`DefinitionBuilder`] at registration time, so the
//! factory never looks anything up by name when it wires an instance.

use crate::convert::{AnyValue, TargetType};
use crate::provider::{AfterPropertiesSet, BeforePropertiesSet, Component};
use crate::{DiError, Result, Scope};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased constructor
pub(crate) type ConstructFn = Arc<dyn Fn(&Arguments) -> Result<AnyValue> + Send + Sync>;

/// Type-erased property setter: (instance, resolved value)
pub(crate) type SetterFn = Arc<dyn Fn(&AnyValue, AnyValue) -> Result<()> + Send + Sync>;

/// Type-erased lifecycle callback
pub(crate) type HookFn = Arc<dyn Fn(&AnyValue) + Send + Sync>;

// =============================================================================
// Injection
// =============================================================================

/// A single declared dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// Another component, requested from the factory by key
    ByReference { key: Arc<str> },

    /// A literal converted to `target` by the type converter registry
    ByValue { literal: String, target: TargetType },

    /// The single (or primary) component producing `target`, no key given
    ByType { target: TargetType },

    /// Ordered list of injections, resolved element by element
    Collection(Vec<Injection>),
}

impl Injection {
    /// Reference to the component registered under `key`
    #[inline]
    pub fn reference(key: impl Into<Arc<str>>) -> Self {
        Self::ByReference { key: key.into() }
    }

    /// Literal to be converted into a `T`
    #[inline]
    pub fn value<T: Component>(literal: impl Into<String>) -> Self {
        Self::ByValue {
            literal: literal.into(),
            target: TargetType::of::<T>(),
        }
    }

    /// Autowired component of type `T`
    #[inline]
    pub fn by_type<T: Component>() -> Self {
        Self::ByType {
            target: TargetType::of::<T>(),
        }
    }

    /// List of references and/or values
    #[inline]
    pub fn collection(items: impl IntoIterator<Item = Injection>) -> Self {
        Self::Collection(items.into_iter().collect())
    }

    /// Visit every literal in this injection, including collection items
    pub fn for_each_literal_mut(&mut self, f: &mut dyn FnMut(&mut String)) {
        match self {
            Self::ByReference { .. } | Self::ByType { .. } => {}
            Self::ByValue { literal, .. } => f(literal),
            Self::Collection(items) => {
                for item in items {
                    item.for_each_literal_mut(f);
                }
            }
        }
    }
}

// =============================================================================
// Downcasting helpers
// =============================================================================

pub(crate) fn downcast<V: Component>(value: AnyValue, context: &str) -> Result<Arc<V>> {
    value
        .downcast::<V>()
        .map_err(|_| DiError::type_mismatch::<V>(context))
}

pub(crate) fn downcast_list<V: Component>(value: AnyValue, context: &str) -> Result<Vec<Arc<V>>> {
    let items = downcast::<Vec<AnyValue>>(value, context)?;
    items
        .iter()
        .map(|item| downcast::<V>(Arc::clone(item), context))
        .collect()
}

// =============================================================================
// Initializer
// =============================================================================

/// One initializer argument
#[derive(Debug, Clone)]
pub struct Argument {
    name: Option<Arc<str>>,
    injection: Injection,
}

impl Argument {
    /// Optional argument name
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// What to inject
    #[inline]
    pub fn injection(&self) -> &Injection {
        &self.injection
    }
}

/// Resolved initializer arguments handed to a constructor closure.
///
/// Accessors are positional; named arguments can also be looked up by name.
pub struct Arguments {
    component: Arc<str>,
    names: Vec<Option<Arc<str>>>,
    values: Vec<AnyValue>,
}

impl Arguments {
    pub(crate) fn new(component: Arc<str>, names: Vec<Option<Arc<str>>>, values: Vec<AnyValue>) -> Self {
        Self {
            component,
            names,
            values,
        }
    }

    /// Number of arguments
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no arguments
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw type-erased value at `index`
    #[inline]
    pub fn raw(&self, index: usize) -> Option<&AnyValue> {
        self.values.get(index)
    }

    /// Shared value at `index` (a component or a converted literal)
    pub fn component<V: Component>(&self, index: usize) -> Result<Arc<V>> {
        let value = self.raw(index).ok_or_else(|| self.missing(index))?;
        downcast::<V>(Arc::clone(value), &self.context(index))
    }

    /// Owned copy of the value at `index`
    pub fn value<V: Component + Clone>(&self, index: usize) -> Result<V> {
        self.component::<V>(index).map(|v| (*v).clone())
    }

    /// Collection at `index` with every element downcast to `V`
    pub fn list<V: Component>(&self, index: usize) -> Result<Vec<Arc<V>>> {
        let value = self.raw(index).ok_or_else(|| self.missing(index))?;
        downcast_list::<V>(Arc::clone(value), &self.context(index))
    }

    /// Shared value of the argument called `name`
    pub fn named<V: Component>(&self, name: &str) -> Result<Arc<V>> {
        let index = self
            .names
            .iter()
            .position(|n| n.as_deref() == Some(name))
            .ok_or_else(|| {
                DiError::creation_failed(&*self.component, format!("no argument named {name:?}"))
            })?;
        self.component::<V>(index)
    }

    fn missing(&self, index: usize) -> DiError {
        DiError::creation_failed(
            &*self.component,
            format!("argument {index} requested but only {} declared", self.values.len()),
        )
    }

    fn context(&self, index: usize) -> String {
        format!("{}[{index}]", self.component)
    }
}

/// Which constructor to call and the arguments it needs
#[derive(Clone)]
pub struct Initializer {
    arguments: Vec<Argument>,
    construct: ConstructFn,
}

impl Initializer {
    /// Declared arguments, in call order
    #[inline]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub(crate) fn construct(&self, args: &Arguments) -> Result<AnyValue> {
        (self.construct)(args)
    }
}

impl fmt::Debug for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Initializer")
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Property injection
// =============================================================================

/// A named property applied after construction
#[derive(Clone)]
pub struct PropertyInjection {
    name: Arc<str>,
    injection: Injection,
    setter: SetterFn,
}

impl PropertyInjection {
    /// Property name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What to inject
    #[inline]
    pub fn injection(&self) -> &Injection {
        &self.injection
    }

    pub(crate) fn apply(&self, instance: &AnyValue, value: AnyValue) -> Result<()> {
        (self.setter)(instance, value)
    }
}

impl fmt::Debug for PropertyInjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInjection")
            .field("name", &self.name)
            .field("injection", &self.injection)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Definition
// =============================================================================

/// Immutable blueprint for one component.
///
/// # Examples
///
/// ```rust
/// use component_factory::{ComponentFactory, Definition, Scope};
/// use once_cell::sync::OnceCell;
/// use std::sync::Arc;
///
/// struct Database { url: String }
///
/// struct UserRepository {
///     db: Arc<Database>,
///     page_size: OnceCell<u32>,
/// }
///
/// let factory = ComponentFactory::new();
/// factory.register(
///     Definition::builder::<Database>("database")
///         .arg_value::<String>("postgres://localhost")
///         .construct(|args| Ok(Database { url: args.value(0)? }))
///         .scope(Scope::Singleton)
///         .build(),
/// ).unwrap();
/// factory.register(
///     Definition::builder::<UserRepository>("users")
///         .arg_ref("database")
///         .construct(|args| Ok(UserRepository { db: args.component(0)?, page_size: OnceCell::new() }))
///         .property_value::<u32, _>("page_size", "50", |repo, size| { let _ = repo.page_size.set(size); })
///         .build(),
/// ).unwrap();
///
/// let users = factory.get::<UserRepository>("users").unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// assert_eq!(users.page_size.get(), Some(&50));
/// ```
#[derive(Clone)]
pub struct Definition {
    key: Arc<str>,
    produced: TargetType,
    initializer: Option<Initializer>,
    properties: Vec<PropertyInjection>,
    scope: Scope,
    primary: bool,
    before_hook: Option<HookFn>,
    after_hook: Option<HookFn>,
}

impl Definition {
    /// Start a definition for `T` registered under `key`
    #[inline]
    pub fn builder<T: Component>(key: impl Into<Arc<str>>) -> DefinitionBuilder<T> {
        DefinitionBuilder::new(key.into())
    }

    /// Start a definition for `T` keyed by its type name
    #[inline]
    pub fn for_type<T: Component>() -> DefinitionBuilder<T> {
        DefinitionBuilder::new(Arc::from(std::any::type_name::<T>()))
    }

    /// A definition that reserves `key` for `T` but can never be instantiated
    pub fn abstract_placeholder<T: Component>(key: impl Into<Arc<str>>) -> Self {
        Self {
            key: key.into(),
            produced: TargetType::of::<T>(),
            initializer: None,
            properties: Vec::new(),
            scope: Scope::default(),
            primary: false,
            before_hook: None,
            after_hook: None,
        }
    }

    /// Unique component key
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub(crate) fn key_arc(&self) -> &Arc<str> {
        &self.key
    }

    /// Type the definition produces
    #[inline]
    pub fn produced_type(&self) -> TargetType {
        self.produced
    }

    /// Lifecycle scope
    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Replace the scope (only meaningful before finalization)
    #[inline]
    pub fn set_scope(&mut self, scope: Scope) {
        self.scope = scope;
    }

    /// Whether this definition wins ambiguous by-type lookups
    #[inline]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Mark or unmark as primary (only meaningful before finalization)
    #[inline]
    pub fn set_primary(&mut self, primary: bool) {
        self.primary = primary;
    }

    /// Whether the definition is a placeholder without an initializer
    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.initializer.is_none()
    }

    /// Initializer, absent for abstract definitions
    #[inline]
    pub fn initializer(&self) -> Option<&Initializer> {
        self.initializer.as_ref()
    }

    /// Property injections, in declaration order
    #[inline]
    pub fn properties(&self) -> &[PropertyInjection] {
        &self.properties
    }

    /// Every injection of the definition, arguments first
    pub fn injections_mut(&mut self) -> impl Iterator<Item = &mut Injection> {
        let arguments = self
            .initializer
            .iter_mut()
            .flat_map(|init| init.arguments.iter_mut().map(|a| &mut a.injection));
        let properties = self.properties.iter_mut().map(|p| &mut p.injection);
        arguments.chain(properties)
    }

    pub(crate) fn run_before_hook(&self, instance: &AnyValue) {
        if let Some(hook) = &self.before_hook {
            hook(instance);
        }
    }

    pub(crate) fn run_after_hook(&self, instance: &AnyValue) {
        if let Some(hook) = &self.after_hook {
            hook(instance);
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("key", &self.key)
            .field("produced", &self.produced)
            .field("scope", &self.scope)
            .field("primary", &self.primary)
            .field("initializer", &self.initializer)
            .field("properties", &self.properties)
            .field("before_properties_set", &self.before_hook.is_some())
            .field("after_properties_set", &self.after_hook.is_some())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Typed builder for a [`Definition`] producing `T`.
///
/// A builder without a constructor yields an abstract definition.
pub struct DefinitionBuilder<T> {
    key: Arc<str>,
    arguments: Vec<Argument>,
    construct: Option<ConstructFn>,
    properties: Vec<PropertyInjection>,
    scope: Scope,
    primary: bool,
    before_hook: Option<HookFn>,
    after_hook: Option<HookFn>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> DefinitionBuilder<T> {
    fn new(key: Arc<str>) -> Self {
        Self {
            key,
            arguments: Vec::new(),
            construct: None,
            properties: Vec::new(),
            scope: Scope::default(),
            primary: false,
            before_hook: None,
            after_hook: None,
            _marker: PhantomData,
        }
    }

    /// Set the lifecycle scope
    #[inline]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Shorthand for `scope(Scope::Singleton)`
    #[inline]
    pub fn singleton(self) -> Self {
        self.scope(Scope::Singleton)
    }

    /// Shorthand for `scope(Scope::Prototype)`
    #[inline]
    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    /// Prefer this definition when a by-type lookup matches several
    #[inline]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Append a positional initializer argument
    #[inline]
    pub fn arg(mut self, injection: Injection) -> Self {
        self.arguments.push(Argument {
            name: None,
            injection,
        });
        self
    }

    /// Append a named initializer argument
    #[inline]
    pub fn named_arg(mut self, name: impl Into<Arc<str>>, injection: Injection) -> Self {
        self.arguments.push(Argument {
            name: Some(name.into()),
            injection,
        });
        self
    }

    /// Append an argument referring to another component
    #[inline]
    pub fn arg_ref(self, key: impl Into<Arc<str>>) -> Self {
        self.arg(Injection::reference(key))
    }

    /// Append an argument converted from a literal
    #[inline]
    pub fn arg_value<V: Component>(self, literal: impl Into<String>) -> Self {
        self.arg(Injection::value::<V>(literal))
    }

    /// Append an argument autowired by type
    #[inline]
    pub fn arg_auto<V: Component>(self) -> Self {
        self.arg(Injection::by_type::<V>())
    }

    /// Constructor called with the resolved arguments
    pub fn construct<F>(mut self, construct: F) -> Self
    where
        F: Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    {
        self.construct = Some(Arc::new(move |args: &Arguments| {
            construct(args).map(|instance| Arc::new(instance) as AnyValue)
        }));
        self
    }

    /// Construct with `T::default()`
    pub fn construct_default(self) -> Self
    where
        T: Default,
    {
        self.construct(|_| Ok(T::default()))
    }

    /// Inject `injection` into a property; the setter receives the shared value.
    ///
    /// Re-declaring a property with the same name replaces the earlier
    /// declaration in place.
    pub fn property<V, F>(self, name: impl Into<Arc<str>>, injection: Injection, setter: F) -> Self
    where
        V: Component,
        F: Fn(&T, Arc<V>) + Send + Sync + 'static,
    {
        let name = name.into();
        let context: Arc<str> = Arc::from(format!("{}.{}", self.key, name));
        let apply: SetterFn = Arc::new(move |instance: &AnyValue, value: AnyValue| {
            let target = instance
                .downcast_ref::<T>()
                .ok_or_else(|| DiError::type_mismatch::<T>(&*context))?;
            setter(target, downcast::<V>(value, &context)?);
            Ok(())
        });
        self.push_property(name, injection, apply)
    }

    /// Inject the component registered under `key`
    pub fn property_ref<V, F>(self, name: impl Into<Arc<str>>, key: impl Into<Arc<str>>, setter: F) -> Self
    where
        V: Component,
        F: Fn(&T, Arc<V>) + Send + Sync + 'static,
    {
        self.property::<V, F>(name, Injection::reference(key), setter)
    }

    /// Inject the single (or primary) component producing `V`
    pub fn property_auto<V, F>(self, name: impl Into<Arc<str>>, setter: F) -> Self
    where
        V: Component,
        F: Fn(&T, Arc<V>) + Send + Sync + 'static,
    {
        self.property::<V, F>(name, Injection::by_type::<V>(), setter)
    }

    /// Inject a literal converted to `V`; the setter receives an owned copy
    pub fn property_value<V, F>(self, name: impl Into<Arc<str>>, literal: impl Into<String>, setter: F) -> Self
    where
        V: Component + Clone,
        F: Fn(&T, V) + Send + Sync + 'static,
    {
        self.property::<V, _>(name, Injection::value::<V>(literal), move |target, value: Arc<V>| {
            setter(target, (*value).clone())
        })
    }

    /// Inject a collection whose elements all resolve to `V`
    pub fn property_list<V, F>(self, name: impl Into<Arc<str>>, items: Vec<Injection>, setter: F) -> Self
    where
        V: Component,
        F: Fn(&T, Vec<Arc<V>>) + Send + Sync + 'static,
    {
        let name = name.into();
        let context: Arc<str> = Arc::from(format!("{}.{}", self.key, name));
        let apply: SetterFn = Arc::new(move |instance: &AnyValue, value: AnyValue| {
            let target = instance
                .downcast_ref::<T>()
                .ok_or_else(|| DiError::type_mismatch::<T>(&*context))?;
            setter(target, downcast_list::<V>(value, &context)?);
            Ok(())
        });
        self.push_property(name, Injection::Collection(items), apply)
    }

    /// Call [`BeforePropertiesSet::before_properties_set`] on every new instance
    pub fn before_properties_set(mut self) -> Self
    where
        T: BeforePropertiesSet,
    {
        self.before_hook = Some(Arc::new(|instance: &AnyValue| {
            if let Some(target) = instance.downcast_ref::<T>() {
                target.before_properties_set();
            }
        }));
        self
    }

    /// Call [`AfterPropertiesSet::after_properties_set`] on every new instance
    pub fn after_properties_set(mut self) -> Self
    where
        T: AfterPropertiesSet,
    {
        self.after_hook = Some(Arc::new(|instance: &AnyValue| {
            if let Some(target) = instance.downcast_ref::<T>() {
                target.after_properties_set();
            }
        }));
        self
    }

    /// Finish the definition
    pub fn build(self) -> Definition {
        let initializer = self.construct.map(|construct| Initializer {
            arguments: self.arguments,
            construct,
        });

        Definition {
            key: self.key,
            produced: TargetType::of::<T>(),
            initializer,
            properties: self.properties,
            scope: self.scope,
            primary: self.primary,
            before_hook: self.before_hook,
            after_hook: self.after_hook,
        }
    }

    fn push_property(mut self, name: Arc<str>, injection: Injection, setter: SetterFn) -> Self {
        let property = PropertyInjection {
            name,
            injection,
            setter,
        };
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Widget {
        label: Mutex<String>,
    }

    #[test]
    fn test_builder_records_shape() {
        let definition = Definition::builder::<Widget>("widget")
            .singleton()
            .primary()
            .arg_ref("other")
            .named_arg("size", Injection::value::<u32>("3"))
            .construct_default()
            .property_value::<String, _>("label", "hello", |w, v| *w.label.lock().unwrap() = v)
            .build();

        assert_eq!(definition.key(), "widget");
        assert_eq!(definition.scope(), Scope::Singleton);
        assert!(definition.is_primary());
        assert!(!definition.is_abstract());
        assert!(definition.produced_type().is::<Widget>());

        let init = definition.initializer().unwrap();
        assert_eq!(init.arguments().len(), 2);
        assert_eq!(init.arguments()[1].name(), Some("size"));
        assert!(format!("{definition:?}").contains("before_properties_set: false"));
        assert_eq!(definition.properties()[0].name(), "label");
    }

    #[test]
    fn test_redeclared_property_replaces_in_place() {
        let definition = Definition::builder::<Widget>("widget")
            .construct_default()
            .property_value::<String, _>("label", "first", |_, _| {})
            .property_value::<u8, _>("other", "1", |_, _| {})
            .property_value::<String, _>("label", "second", |_, _| {})
            .build();

        let names: Vec<_> = definition.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["label", "other"]);
        assert_eq!(
            definition.properties()[0].injection(),
            &Injection::value::<String>("second")
        );
    }

    #[test]
    fn test_autowired_injections() {
        let definition = Definition::builder::<Widget>("widget")
            .arg_auto::<String>()
            .construct_default()
            .property_auto::<u32, _>("size", |_, _| {})
            .build();

        assert_eq!(
            definition.initializer().unwrap().arguments()[0].injection(),
            &Injection::by_type::<String>()
        );
        assert_eq!(
            definition.properties()[0].injection(),
            &Injection::ByType {
                target: TargetType::of::<u32>()
            }
        );
    }

    #[test]
    fn test_builder_without_constructor_is_abstract() {
        let definition = Definition::builder::<Widget>("base").build();
        assert!(definition.is_abstract());
        assert!(Definition::abstract_placeholder::<Widget>("base").is_abstract());
    }

    #[test]
    fn test_for_type_uses_type_name() {
        let definition = Definition::for_type::<Widget>().construct_default().build();
        assert_eq!(definition.key(), std::any::type_name::<Widget>());
    }

    #[test]
    fn test_setter_applies_converted_value() {
        let definition = Definition::builder::<Widget>("widget")
            .construct_default()
            .property_value::<String, _>("label", "x", |w, v| *w.label.lock().unwrap() = v)
            .build();

        let instance: AnyValue = Arc::new(Widget::default());
        definition.properties()[0]
            .apply(&instance, Arc::new(String::from("applied")))
            .unwrap();

        let widget = instance.downcast::<Widget>().unwrap();
        assert_eq!(*widget.label.lock().unwrap(), "applied");
    }

    #[test]
    fn test_setter_rejects_wrong_value_type() {
        let definition = Definition::builder::<Widget>("widget")
            .construct_default()
            .property_value::<String, _>("label", "x", |_, _| {})
            .build();

        let instance: AnyValue = Arc::new(Widget::default());
        let err = definition.properties()[0]
            .apply(&instance, Arc::new(7u8))
            .unwrap_err();
        assert_eq!(err, DiError::type_mismatch::<String>("widget.label"));
    }

    #[test]
    fn test_arguments_accessors() {
        let args = Arguments::new(
            Arc::from("svc"),
            vec![None, Some(Arc::from("limit"))],
            vec![
                Arc::new(String::from("name")) as AnyValue,
                Arc::new(10u32) as AnyValue,
            ],
        );

        assert_eq!(args.len(), 2);
        assert_eq!(args.value::<String>(0).unwrap(), "name");
        assert_eq!(*args.named::<u32>("limit").unwrap(), 10);
        assert!(matches!(args.value::<u32>(0), Err(DiError::TypeMismatch { .. })));
        assert!(matches!(args.value::<u32>(5), Err(DiError::CreationFailed { .. })));
    }

    #[test]
    fn test_only_literals_are_visited() {
        let mut injection = Injection::collection([
            Injection::reference("a"),
            Injection::value::<String>("${host}"),
            Injection::collection([Injection::value::<u16>("${port}"), Injection::by_type::<Widget>()]),
        ]);

        let mut seen = Vec::new();
        injection.for_each_literal_mut(&mut |literal: &mut String| {
            seen.push(literal.clone());
            literal.push('!');
        });
        assert_eq!(seen, vec!["${host}", "${port}"]);
    }
}
