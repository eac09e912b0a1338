//! Error types for component resolution

use thiserror::Error;

/// Errors that can occur while registering or resolving components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// A definition with the same key is already registered
    #[error("Component already registered: {key}")]
    DuplicateKey { key: String },

    /// No definition is registered under the requested key or type
    #[error("Component not found: {key}")]
    UnknownComponent { key: String },

    /// A by-type lookup matched several definitions and none is primary
    #[error("Ambiguous component type {type_name}: candidates {candidates:?}")]
    AmbiguousComponent {
        type_name: &'static str,
        candidates: Vec<String>,
    },

    /// The definition only exists as a placeholder and cannot be instantiated
    #[error("Component is abstract and cannot be instantiated: {key}")]
    AbstractComponent { key: String },

    /// A constructor-argument cycle was detected
    #[error("Unresolvable circular dependency while constructing {key}: {}", path.join(" -> "))]
    UnresolvableCycle { key: String, path: Vec<String> },

    /// A literal could not be converted to the target type
    #[error("Cannot convert {literal:?} to {target}: {reason}")]
    Conversion {
        literal: String,
        target: &'static str,
        reason: String,
    },

    /// The factory is finalized and cannot be modified
    #[error("Factory is finalized - cannot register definitions, converters or post-processors")]
    AlreadyFinalized,

    /// An initializer returned an error
    #[error("Failed to create component {key}: {reason}")]
    CreationFailed { key: String, reason: String },

    /// A resolved value was not of the type its consumer expected
    #[error("Type mismatch for {key}: expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// A properties file could not be read
    #[error("Cannot load properties from {location}: {reason}")]
    PropertiesSource { location: String, reason: String },
}

impl DiError {
    /// Create an UnknownComponent error
    #[inline]
    pub fn unknown(key: impl Into<String>) -> Self {
        Self::UnknownComponent { key: key.into() }
    }

    /// Create an UnknownComponent error for a by-type lookup
    #[inline]
    pub fn unknown_type<T: ?Sized + 'static>() -> Self {
        Self::UnknownComponent {
            key: std::any::type_name::<T>().to_string(),
        }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a TypeMismatch error
    #[inline]
    pub fn type_mismatch<T: ?Sized + 'static>(key: impl Into<String>) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Create a PropertiesSource error
    #[inline]
    pub fn properties_source(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PropertiesSource {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create a Conversion error
    #[inline]
    pub fn conversion(
        literal: impl Into<String>,
        target: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            literal: literal.into(),
            target,
            reason: reason.into(),
        }
    }
}

/// Result type alias for factory operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_shows_path() {
        let err = DiError::UnresolvableCycle {
            key: "a".into(),
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unresolvable circular dependency while constructing a: a -> b -> a"
        );
    }

    #[test]
    fn test_helpers() {
        assert_eq!(DiError::unknown("x"), DiError::UnknownComponent { key: "x".into() });
        assert_eq!(
            DiError::type_mismatch::<u32>("k"),
            DiError::TypeMismatch {
                key: "k".into(),
                expected: "u32"
            }
        );
        assert_eq!(
            DiError::properties_source("app.properties", "not found").to_string(),
            "Cannot load properties from app.properties: not found"
        );
    }
}
