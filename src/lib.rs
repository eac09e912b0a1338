//! # Component Factory - Definition-Driven Inversion of Control
//!
//! Register declarative [`Definition`]s describing how each component is
//! constructed, which dependencies it receives and how long its instances
//! live. The [`ComponentFactory`] turns those definitions into live, wired
//! instances on demand.
//!
//! ## Features
//!
//! - **Keyed definitions** - every component has a unique string key, lookups by type pick the single or primary candidate
//! - **Two-phase construction** - property cycles resolve to the instance under construction, constructor cycles fail with the full path
//! - **Three scopes** - `Singleton`, `Prototype` and per-request `ObjectGraph`
//! - **Literal conversion** - `"42"` becomes an `i32` through a pluggable converter registry
//! - **Placeholders** - `${name}` tokens filled from properties text at finalization
//! - **Concurrent** - singletons are created once under contention, read lock-free afterwards
//! - **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use component_factory::{ComponentFactory, Definition};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let factory = ComponentFactory::new();
//!
//! factory.register(
//!     Definition::builder::<Database>("database")
//!         .arg_value::<String>("postgres://localhost")
//!         .construct(|args| Ok(Database { url: args.value(0)? }))
//!         .singleton()
//!         .build(),
//! ).unwrap();
//!
//! factory.register(
//!     Definition::builder::<UserService>("users")
//!         .arg_ref("database")
//!         .construct(|args| Ok(UserService { db: args.component(0)? }))
//!         .build(),
//! ).unwrap();
//!
//! let users = factory.get::<UserService>("users").unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Scopes
//!
//! ```rust
//! use component_factory::{ComponentFactory, Definition, Scope};
//! use std::sync::Arc;
//!
//! struct Config;
//! struct RequestId;
//!
//! let factory = ComponentFactory::new();
//!
//! // Singleton - one instance for the factory's lifetime
//! factory.register(Definition::builder::<Config>("config").construct(|_| Ok(Config)).singleton().build()).unwrap();
//!
//! // Prototype - new instance on every request
//! factory.register(Definition::builder::<RequestId>("request_id").construct(|_| Ok(RequestId)).prototype().build()).unwrap();
//!
//! assert!(Arc::ptr_eq(&factory.get::<Config>("config").unwrap(), &factory.get::<Config>("config").unwrap()));
//! assert!(!Arc::ptr_eq(&factory.get::<RequestId>("request_id").unwrap(), &factory.get::<RequestId>("request_id").unwrap()));
//! ```
//!
//! `Scope::ObjectGraph` (the default) shares one instance per key within a
//! single top-level request; see [`ResolutionContext`].

mod configurer;
mod convert;
mod definition;
mod error;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod registry;
mod resolver;
mod scope;
mod store;

pub use configurer::*;
pub use convert::*;
pub use definition::{
    Argument, Arguments, Definition, DefinitionBuilder, Initializer, Injection, PropertyInjection,
};
pub use error::*;
pub use factory::*;
pub use provider::*;
pub use registry::DefinitionRegistry;
pub use scope::{ResolutionContext, Scope};

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AfterPropertiesSet, BeforePropertiesSet, ComponentFactory, Definition,
        DefinitionPostProcessor, DiError, Injection, PropertyPlaceholderConfigurer, Result, Scope,
        TypeConverter,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    struct Database {
        url: String,
    }

    struct UserService {
        db: Arc<Database>,
        page_size: Mutex<u32>,
    }

    fn factory() -> ComponentFactory {
        let factory = ComponentFactory::new();
        factory
            .register(
                Definition::builder::<Database>("database")
                    .arg_value::<String>("postgres://localhost")
                    .construct(|args| Ok(Database { url: args.value(0)? }))
                    .singleton()
                    .build(),
            )
            .unwrap();
        factory
            .register(
                Definition::builder::<UserService>("users")
                    .arg_ref("database")
                    .construct(|args| {
                        Ok(UserService {
                            db: args.component(0)?,
                            page_size: Mutex::new(0),
                        })
                    })
                    .property_value::<u32, _>("page_size", "25", |s, v| *s.page_size.lock().unwrap() = v)
                    .prototype()
                    .build(),
            )
            .unwrap();
        factory
    }

    #[test]
    fn test_wiring() {
        let factory = factory();
        let users = factory.get::<UserService>("users").unwrap();

        assert_eq!(users.db.url, "postgres://localhost");
        assert_eq!(*users.page_size.lock().unwrap(), 25);
    }

    #[test]
    fn test_prototypes_share_singleton_dependency() {
        let factory = factory();
        let a = factory.get::<UserService>("users").unwrap();
        let b = factory.get::<UserService>("users").unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a.db, &b.db));
    }

    #[test]
    fn test_introspection() {
        let factory = factory();
        let keys: Vec<String> = factory.definition_keys().iter().map(|k| k.to_string()).collect();

        assert_eq!(keys, vec!["database", "users"]);
        assert_eq!(factory.len(), 2);
        assert!(factory.contains_definition("users"));
        assert_eq!(factory.definitions_of_type::<Database>().len(), 1);
        assert_eq!(factory.definition("users").unwrap().scope(), Scope::Prototype);
    }

    #[test]
    fn test_construction_counts() {
        static BUILT: AtomicU32 = AtomicU32::new(0);

        struct Service;

        let factory = ComponentFactory::new();
        factory
            .register(
                Definition::builder::<Service>("service")
                    .construct(|_| {
                        BUILT.fetch_add(1, Ordering::SeqCst);
                        Ok(Service)
                    })
                    .singleton()
                    .build(),
            )
            .unwrap();

        assert_eq!(BUILT.load(Ordering::SeqCst), 0);
        factory.get::<Service>("service").unwrap();
        factory.get::<Service>("service").unwrap();
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_display() {
        let factory = factory();
        let err = factory.get_instance("missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
