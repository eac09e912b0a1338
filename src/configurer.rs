//! Definition post-processing
//!
//! Post-processors get one chance to rewrite every definition, in
//! registration order, when the factory is finalized. The property
//! placeholder configurer is the stock example: it swaps `${name}` tokens in
//! literal injections for values loaded from a properties source.

use crate::{Definition, DiError, Result};
use ahash::RandomState;
use std::collections::HashMap;
use std::path::Path;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Rewrites definitions before the factory becomes read-only.
///
/// Processors run in the order they were added. An error aborts
/// finalization and leaves every definition untouched.
pub trait DefinitionPostProcessor: Send + Sync {
    /// Inspect or modify one definition
    fn post_process(&self, definition: &mut Definition) -> Result<()>;
}

impl<F> DefinitionPostProcessor for F
where
    F: Fn(&mut Definition) -> Result<()> + Send + Sync,
{
    fn post_process(&self, definition: &mut Definition) -> Result<()> {
        self(definition)
    }
}

/// Substitutes `${name}` placeholders in literal injections.
///
/// Unknown placeholders are left exactly as written. Substitution is a single
/// pass; a replacement value is never scanned for further placeholders.
///
/// # Examples
///
/// ```rust
/// use component_factory::{ComponentFactory, Definition, PropertyPlaceholderConfigurer};
///
/// struct Server { port: u16 }
///
/// let configurer = PropertyPlaceholderConfigurer::new()
///     .with_properties_text("# server settings\nserver.port = 8080\n");
///
/// let factory = ComponentFactory::new();
/// factory.add_post_processor(configurer).unwrap();
/// factory.register(
///     Definition::builder::<Server>("server")
///         .arg_value::<u16>("${server.port}")
///         .construct(|args| Ok(Server { port: args.value(0)? }))
///         .build(),
/// ).unwrap();
///
/// assert_eq!(factory.get::<Server>("server").unwrap().port, 8080);
/// ```
#[derive(Debug, Clone)]
pub struct PropertyPlaceholderConfigurer {
    properties: HashMap<String, String, RandomState>,
    prefix: String,
    suffix: String,
}

impl PropertyPlaceholderConfigurer {
    /// Create a configurer with no properties and `${`/`}` delimiters
    pub fn new() -> Self {
        Self {
            properties: HashMap::default(),
            prefix: String::from("${"),
            suffix: String::from("}"),
        }
    }

    /// Add or replace one property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(name, value);
        self
    }

    /// Load properties from `key=value` text
    pub fn with_properties_text(mut self, text: &str) -> Self {
        self.load_properties(text);
        self
    }

    /// Load properties from a file
    pub fn with_properties_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.load_properties_file(path)?;
        Ok(self)
    }

    /// Use different placeholder delimiters.
    ///
    /// Empty delimiters disable substitution.
    pub fn with_delimiters(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.suffix = suffix.into();
        self
    }

    /// Add or replace one property
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Parse properties text and merge it in; later keys win.
    ///
    /// One entry per line, separated by the first `=` or `:`. Keys and
    /// values are trimmed. Blank lines and lines starting with `#` or `!`
    /// are skipped. A line without a separator defines an empty value.
    pub fn load_properties(&mut self, text: &str) {
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = match line.find(['=', ':']) {
                Some(pos) => (&line[..pos], &line[pos + 1..]),
                None => (line, ""),
            };
            self.set_property(key.trim(), value.trim());
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "component_factory",
            properties = self.properties.len(),
            "Loaded placeholder properties"
        );
    }

    /// Read a properties file and merge it in.
    ///
    /// Fails with `PropertiesSource` if the file cannot be read; nothing is
    /// merged in that case.
    pub fn load_properties_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            #[cfg(feature = "logging")]
            warn!(
                target: "component_factory",
                path = %path.display(),
                error = %e,
                "Cannot read properties file"
            );
            DiError::properties_source(path.display().to_string(), e.to_string())
        })?;
        self.load_properties(&text);
        Ok(())
    }

    /// Value of property `name`
    #[inline]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Number of known properties
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if no properties are known
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Replace every known placeholder in `literal`
    pub fn substitute(&self, literal: &str) -> String {
        if self.prefix.is_empty() || self.suffix.is_empty() {
            return literal.to_owned();
        }

        let mut out = String::with_capacity(literal.len());
        let mut rest = literal;
        while let Some(start) = rest.find(&self.prefix) {
            let after = &rest[start + self.prefix.len()..];
            let Some(end) = after.find(&self.suffix) else {
                break;
            };
            let name = &after[..end];
            let token_end = start + self.prefix.len() + end + self.suffix.len();

            out.push_str(&rest[..start]);
            match self.property(name.trim()) {
                Some(value) => out.push_str(value),
                None => {
                    #[cfg(feature = "logging")]
                    warn!(
                        target: "component_factory",
                        placeholder = name,
                        "Unresolved property placeholder left in place"
                    );
                    out.push_str(&rest[start..token_end]);
                }
            }
            rest = &rest[token_end..];
        }
        out.push_str(rest);
        out
    }
}

impl Default for PropertyPlaceholderConfigurer {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionPostProcessor for PropertyPlaceholderConfigurer {
    fn post_process(&self, definition: &mut Definition) -> Result<()> {
        for injection in definition.injections_mut() {
            injection.for_each_literal_mut(&mut |literal: &mut String| {
                if literal.contains(self.prefix.as_str()) {
                    *literal = self.substitute(literal);
                }
            });
        }
        Ok(())
    }
}
