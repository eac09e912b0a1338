#![no_main]

//! Fuzz target for the property placeholder configurer
//!
//! Parses arbitrary properties text and substitutes arbitrary literals.
//! Neither step may panic, and literals without the placeholder prefix must
//! come back unchanged.

use arbitrary::Arbitrary;
use component_factory::PropertyPlaceholderConfigurer;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    properties: String,
    literal: String,
    delimiters: Option<(String, String)>,
}

fuzz_target!(|input: Input| {
    let mut configurer = PropertyPlaceholderConfigurer::new().with_properties_text(&input.properties);
    let mut prefix = String::from("${");
    if let Some((p, s)) = input.delimiters {
        prefix = p.clone();
        configurer = configurer.with_delimiters(p, s);
    }

    let substituted = configurer.substitute(&input.literal);
    if prefix.is_empty() || !input.literal.contains(prefix.as_str()) {
        assert_eq!(substituted, input.literal);
    }
});
