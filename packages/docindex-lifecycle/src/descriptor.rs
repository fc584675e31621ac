//! Index naming
//!
//! An [`IndexDescriptor`] yields two names:
//!
//! - `full_name`: `prefix-lang-name-vN`, changes with every version bump
//! - `alias_name`: `prefix-lang-name`, stable across versions
//!
//! Empty components are left out of the join, so a descriptor without a
//! prefix produces `lang-name-vN`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{LifecycleError, Result};

pub const DEFAULT_SEPARATOR: &str = "-";
pub const MAX_BASE_NAME_LEN: usize = 255;

static BASE_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_-]+$").expect("base name pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexDescriptor {
    prefix: String,
    language_tag: String,
    base_name: String,
    version: u32,
    separator: String,
}

impl IndexDescriptor {
    /// Create a descriptor with the default `-` separator
    ///
    /// # Errors
    ///
    /// `InvalidDescriptor` when `base_name` is longer than 255 characters,
    /// does not match `^[a-z][a-z0-9_-]+$`, or contains the separator.
    pub fn new(
        prefix: impl Into<String>,
        language_tag: impl Into<String>,
        base_name: impl Into<String>,
        version: u32,
    ) -> Result<Self> {
        Self::with_separator(prefix, language_tag, base_name, version, DEFAULT_SEPARATOR)
    }

    pub fn with_separator(
        prefix: impl Into<String>,
        language_tag: impl Into<String>,
        base_name: impl Into<String>,
        version: u32,
        separator: impl Into<String>,
    ) -> Result<Self> {
        let descriptor = Self {
            prefix: prefix.into(),
            language_tag: language_tag.into(),
            base_name: base_name.into(),
            version,
            separator: separator.into(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(LifecycleError::invalid_descriptor(
                "separator",
                "must not be empty",
            ));
        }
        let name = &self.base_name;
        if name.is_empty() || name.len() > MAX_BASE_NAME_LEN {
            return Err(LifecycleError::invalid_descriptor(
                "base_name",
                format!("must be 1..={} characters, got {}", MAX_BASE_NAME_LEN, name.len()),
            ));
        }
        if !BASE_NAME_PATTERN.is_match(name) {
            return Err(LifecycleError::invalid_descriptor(
                "base_name",
                format!("'{}' does not match {}", name, BASE_NAME_PATTERN.as_str()),
            ));
        }
        if name.contains(self.separator.as_str()) {
            return Err(LifecycleError::invalid_descriptor(
                "base_name",
                format!("'{}' contains the separator '{}'", name, self.separator),
            ));
        }
        Ok(())
    }

    /// Same descriptor at another version
    pub fn with_version(&self, version: u32) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }

    pub fn full_name(&self) -> String {
        let version = format!("v{}", self.version);
        self.join(&[
            self.prefix.as_str(),
            self.language_tag.as_str(),
            self.base_name.as_str(),
            version.as_str(),
        ])
    }

    pub fn alias_name(&self) -> String {
        self.join(&[
            self.prefix.as_str(),
            self.language_tag.as_str(),
            self.base_name.as_str(),
        ])
    }

    fn join(&self, parts: &[&str]) -> String {
        parts
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(self.separator.as_str())
    }
}

impl fmt::Display for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}
