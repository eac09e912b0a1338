#![no_main]

//! Fuzz target for literal conversion
//!
//! Feeds arbitrary literals through the default converters and checks that
//! every success agrees with `FromStr` and every failure is a conversion error.

use arbitrary::Arbitrary;
use component_factory::{DiError, TargetType, TypeConverterRegistry};
use libfuzzer_sys::fuzz_target;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Arbitrary)]
enum Target {
    Bool,
    Char,
    I8,
    U16,
    I32,
    U64,
    I128,
    F64,
    String,
    ArcStr,
    Path,
    Unregistered,
}

struct Unregistered;

#[derive(Debug, Arbitrary)]
struct Input {
    target: Target,
    literal: String,
}

fn check<T>(registry: &TypeConverterRegistry, literal: &str, trimmed: bool)
where
    T: std::str::FromStr + PartialEq + std::fmt::Debug + Send + Sync + 'static,
{
    let source = if trimmed { literal.trim() } else { literal };
    match registry.convert(literal, &TargetType::of::<T>()) {
        Ok(value) => {
            let value = value.downcast::<T>().expect("converter produced wrong type");
            let expected = source.parse::<T>().ok().expect("converter accepted what FromStr rejects");
            // NaN never equals itself
            if format!("{expected:?}") != "NaN" {
                assert_eq!(*value, expected);
            }
        }
        Err(DiError::Conversion { .. }) => assert!(source.parse::<T>().is_err()),
        Err(other) => panic!("unexpected error: {other:?}"),
    }
}

fuzz_target!(|input: Input| {
    let registry = TypeConverterRegistry::new();
    let literal = input.literal.as_str();

    match input.target {
        Target::Bool => check::<bool>(&registry, literal, true),
        Target::Char => check::<char>(&registry, literal, false),
        Target::I8 => check::<i8>(&registry, literal, true),
        Target::U16 => check::<u16>(&registry, literal, true),
        Target::I32 => check::<i32>(&registry, literal, true),
        Target::U64 => check::<u64>(&registry, literal, true),
        Target::I128 => check::<i128>(&registry, literal, true),
        Target::F64 => check::<f64>(&registry, literal, true),
        Target::Path => check::<PathBuf>(&registry, literal, false),
        Target::String => {
            let value = registry.convert(literal, &TargetType::of::<String>()).unwrap();
            assert_eq!(*value.downcast::<String>().unwrap(), literal);
        }
        Target::ArcStr => {
            let value = registry.convert(literal, &TargetType::of::<Arc<str>>()).unwrap();
            assert_eq!(&**value.downcast::<Arc<str>>().unwrap(), literal);
        }
        Target::Unregistered => {
            let err = registry
                .convert(literal, &TargetType::of::<Unregistered>())
                .unwrap_err();
            assert!(matches!(err, DiError::Conversion { .. }));
        }
    }
});
