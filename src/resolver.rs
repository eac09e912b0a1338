//! Injection resolution
//!
//! Turns one declared [`Injection`] into a value: literals go through the
//! type converter registry, references (by key or by type) go back to whoever
//! owns the component graph, collections resolve element by element.

use crate::convert::{AnyValue, TargetType, TypeConverterRegistry};
use crate::{Injection, ResolutionContext, Result};
use std::sync::Arc;

/// Source of referenced components.
///
/// Implemented by the factory; references re-enter it with the same
/// [`ResolutionContext`] so cycles and object-graph sharing stay visible.
pub(crate) trait ReferenceResolver {
    /// Resolve the component registered under `key`
    fn resolve_reference(&self, key: &Arc<str>, ctx: &mut ResolutionContext) -> Result<AnyValue>;

    /// Resolve the single (or primary) component producing `target`
    fn resolve_type(&self, target: &TargetType, ctx: &mut ResolutionContext) -> Result<AnyValue>;
}

/// Resolves injections against a converter registry and a reference source
pub(crate) struct InjectionResolver<'a, R: ?Sized> {
    converters: &'a TypeConverterRegistry,
    references: &'a R,
}

impl<'a, R: ReferenceResolver + ?Sized> InjectionResolver<'a, R> {
    #[inline]
    pub fn new(converters: &'a TypeConverterRegistry, references: &'a R) -> Self {
        Self {
            converters,
            references,
        }
    }

    /// Resolve `injection` within `ctx`
    pub fn resolve(&self, injection: &Injection, ctx: &mut ResolutionContext) -> Result<AnyValue> {
        match injection {
            Injection::ByValue { literal, target } => self.converters.convert(literal, target),
            Injection::ByReference { key } => self.references.resolve_reference(key, ctx),
            Injection::ByType { target } => self.references.resolve_type(target, ctx),
            Injection::Collection(items) => {
                let values = items
                    .iter()
                    .map(|item| self.resolve(item, ctx))
                    .collect::<Result<Vec<AnyValue>>>()?;
                Ok(Arc::new(values))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiError;
    use std::cell::RefCell;

    /// Hands out a fixed value per key and records every request
    struct Fixed {
        requests: RefCell<Vec<String>>,
    }

    impl ReferenceResolver for Fixed {
        fn resolve_reference(&self, key: &Arc<str>, _ctx: &mut ResolutionContext) -> Result<AnyValue> {
            self.requests.borrow_mut().push(key.to_string());
            match &**key {
                "port" => Ok(Arc::new(8080u16)),
                _ => Err(DiError::unknown(&**key)),
            }
        }

        fn resolve_type(&self, target: &TargetType, ctx: &mut ResolutionContext) -> Result<AnyValue> {
            if target.is::<u16>() {
                self.resolve_reference(&Arc::from("port"), ctx)
            } else {
                Err(DiError::UnknownComponent {
                    key: target.name().to_string(),
                })
            }
        }
    }

    fn fixed() -> Fixed {
        Fixed {
            requests: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_by_value_uses_converters() {
        let converters = TypeConverterRegistry::new();
        let source = fixed();
        let resolver = InjectionResolver::new(&converters, &source);
        let mut ctx = ResolutionContext::new();

        let value = resolver
            .resolve(&Injection::value::<i64>("42"), &mut ctx)
            .unwrap();
        assert_eq!(*value.downcast::<i64>().unwrap(), 42);
        assert!(source.requests.borrow().is_empty());
    }

    #[test]
    fn test_by_value_conversion_error() {
        let converters = TypeConverterRegistry::new();
        let source = fixed();
        let resolver = InjectionResolver::new(&converters, &source);

        let err = resolver
            .resolve(&Injection::value::<i32>("abc"), &mut ResolutionContext::new())
            .unwrap_err();
        assert!(matches!(err, DiError::Conversion { .. }));
    }

    #[test]
    fn test_by_reference_delegates() {
        let converters = TypeConverterRegistry::new();
        let source = fixed();
        let resolver = InjectionResolver::new(&converters, &source);
        let mut ctx = ResolutionContext::new();

        let value = resolver
            .resolve(&Injection::reference("port"), &mut ctx)
            .unwrap();
        assert_eq!(*value.downcast::<u16>().unwrap(), 8080);

        let err = resolver
            .resolve(&Injection::reference("nope"), &mut ctx)
            .unwrap_err();
        assert_eq!(err, DiError::unknown("nope"));
        assert_eq!(*source.requests.borrow(), vec!["port", "nope"]);
    }

    #[test]
    fn test_by_type_delegates() {
        let converters = TypeConverterRegistry::new();
        let source = fixed();
        let resolver = InjectionResolver::new(&converters, &source);
        let mut ctx = ResolutionContext::new();

        let value = resolver
            .resolve(&Injection::by_type::<u16>(), &mut ctx)
            .unwrap();
        assert_eq!(*value.downcast::<u16>().unwrap(), 8080);

        let err = resolver
            .resolve(&Injection::by_type::<u8>(), &mut ctx)
            .unwrap_err();
        assert_eq!(err, DiError::unknown_type::<u8>());
    }

    #[test]
    fn test_collection_mixes_values_and_references() {
        let converters = TypeConverterRegistry::new();
        let source = fixed();
        let resolver = InjectionResolver::new(&converters, &source);

        let value = resolver
            .resolve(
                &Injection::collection([Injection::value::<u16>("80"), Injection::reference("port")]),
                &mut ResolutionContext::new(),
            )
            .unwrap();

        let items = value.downcast::<Vec<AnyValue>>().unwrap();
        let ports: Vec<u16> = items
            .iter()
            .map(|v| *Arc::clone(v).downcast::<u16>().unwrap())
            .collect();
        assert_eq!(ports, vec![80, 8080]);
    }

    #[test]
    fn test_collection_fails_on_first_bad_item() {
        let converters = TypeConverterRegistry::new();
        let source = fixed();
        let resolver = InjectionResolver::new(&converters, &source);

        let err = resolver
            .resolve(
                &Injection::collection([Injection::reference("nope"), Injection::reference("port")]),
                &mut ResolutionContext::new(),
            )
            .unwrap_err();
        assert_eq!(err, DiError::unknown("nope"));
        assert_eq!(*source.requests.borrow(), vec!["nope"]);
    }
}
