//! Type conversion for by-value injections
//!
//! A by-value injection carries a literal and the semantic type its consumer
//! expects. The [`TypeConverterRegistry`] walks its converters in order and
//! lets the first one that accepts the target type perform the conversion.

use crate::{DiError, Result};
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Type-erased value produced by the factory (component instance or converted literal)
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// The semantic type an injection must produce.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetType {
    id: TypeId,
    name: &'static str,
}

impl TargetType {
    /// Target type for `T`
    #[inline]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the target
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check whether this target is `T`
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Whether literals can be handed over unchanged for this target
    #[inline]
    pub fn is_pass_through(&self) -> bool {
        self.is::<String>() || self.is::<Arc<str>>()
    }
}

impl fmt::Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Converts a literal into a strongly-typed value.
pub trait TypeConverter: Send + Sync {
    /// Whether this converter produces values of `target`
    fn can_convert(&self, target: &TargetType) -> bool;

    /// Convert `literal` into a value of `target`
    fn convert(&self, literal: &str, target: &TargetType) -> std::result::Result<AnyValue, String>;
}

// =============================================================================
// Built-in converters
// =============================================================================

/// Identity converter for string targets.
///
/// The mutable flavour produces an owned `String` copy, the immutable one an
/// `Arc<str>`.
#[derive(Debug, Clone, Copy)]
pub struct PassThroughConverter {
    mutable: bool,
}

impl PassThroughConverter {
    /// Converter producing `String`
    pub const fn mutable() -> Self {
        Self { mutable: true }
    }

    /// Converter producing `Arc<str>`
    pub const fn immutable() -> Self {
        Self { mutable: false }
    }
}

impl TypeConverter for PassThroughConverter {
    #[inline]
    fn can_convert(&self, target: &TargetType) -> bool {
        if self.mutable {
            target.is::<String>()
        } else {
            target.is::<Arc<str>>()
        }
    }

    fn convert(&self, literal: &str, _target: &TargetType) -> std::result::Result<AnyValue, String> {
        if self.mutable {
            Ok(Arc::new(literal.to_owned()))
        } else {
            Ok(Arc::new(Arc::<str>::from(literal)))
        }
    }
}

/// Converter for any `T: FromStr`.
pub struct FromStrConverter<T> {
    trim: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromStrConverter<T>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: fmt::Display,
{
    /// Converter that trims surrounding whitespace before parsing
    pub fn new() -> Self {
        Self {
            trim: true,
            _marker: PhantomData,
        }
    }

    /// Converter that parses the literal exactly as given
    pub fn exact() -> Self {
        Self {
            trim: false,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for FromStrConverter<T>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TypeConverter for FromStrConverter<T>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: fmt::Display,
{
    #[inline]
    fn can_convert(&self, target: &TargetType) -> bool {
        target.is::<T>()
    }

    fn convert(&self, literal: &str, _target: &TargetType) -> std::result::Result<AnyValue, String> {
        let text = if self.trim { literal.trim() } else { literal };
        text.parse::<T>()
            .map(|value| Arc::new(value) as AnyValue)
            .map_err(|e| e.to_string())
    }
}

macro_rules! from_str_converters {
    ($($T:ty),+ $(,)?) => {
        vec![$(Arc::new(FromStrConverter::<$T>::new()) as Arc<dyn TypeConverter>),+]
    };
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered set of converters; first match wins.
///
/// User converters are consulted before the built-in defaults, so a custom
/// converter for `u16` shadows the stock one.
#[derive(Clone)]
pub struct TypeConverterRegistry {
    custom: Vec<Arc<dyn TypeConverter>>,
    defaults: Vec<Arc<dyn TypeConverter>>,
}

impl TypeConverterRegistry {
    /// Registry preloaded with string pass-through, primitive and path converters
    pub fn new() -> Self {
        let mut defaults: Vec<Arc<dyn TypeConverter>> = vec![
            Arc::new(PassThroughConverter::mutable()),
            Arc::new(PassThroughConverter::immutable()),
            Arc::new(FromStrConverter::<char>::exact()),
            Arc::new(FromStrConverter::<PathBuf>::exact()),
        ];
        defaults.extend(from_str_converters!(
            bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
        ));

        Self {
            custom: Vec::new(),
            defaults,
        }
    }

    /// Registry without any converters; only string targets still pass through
    pub fn empty() -> Self {
        Self {
            custom: Vec::new(),
            defaults: Vec::new(),
        }
    }

    /// Append a converter after the previously registered custom ones
    pub fn register<C: TypeConverter + 'static>(&mut self, converter: C) {
        self.custom.push(Arc::new(converter));
    }

    /// First converter able to produce `target`
    pub fn converter_for(&self, target: &TargetType) -> Option<&Arc<dyn TypeConverter>> {
        self.custom
            .iter()
            .chain(self.defaults.iter())
            .find(|c| c.can_convert(target))
    }

    /// Convert `literal` into a value of `target`
    pub fn convert(&self, literal: &str, target: &TargetType) -> Result<AnyValue> {
        if let Some(converter) = self.converter_for(target) {
            return converter
                .convert(literal, target)
                .map_err(|reason| DiError::conversion(literal, target.name(), reason));
        }

        if target.is_pass_through() {
            let fallback = PassThroughConverter {
                mutable: target.is::<String>(),
            };
            return fallback
                .convert(literal, target)
                .map_err(|reason| DiError::conversion(literal, target.name(), reason));
        }

        Err(DiError::conversion(
            literal,
            target.name(),
            "no converter registered for target type",
        ))
    }

    /// Number of converters (custom and default)
    pub fn len(&self) -> usize {
        self.custom.len() + self.defaults.len()
    }

    /// Check if no converters are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TypeConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeConverterRegistry")
            .field("custom", &self.custom.len())
            .field("defaults", &self.defaults.len())
            .finish()
    }
}
