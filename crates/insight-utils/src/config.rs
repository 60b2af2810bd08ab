//! Environment-backed configuration helpers
//!
//! Configuration in this workspace comes from process environment variables.
//! [`EnvSource`] wraps the lookup so that configuration builders can be
//! exercised in tests without mutating the real environment.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was present but could not be parsed
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Source of configuration key/value pairs
pub struct EnvSource {
    lookup: Lookup,
}

impl EnvSource {
    /// Read from the process environment
    pub fn process() -> Self {
        Self {
            lookup: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Read from a fixed set of pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            lookup: Box::new(move |key| map.get(key).cloned()),
        }
    }

    /// Get a raw value
    pub fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    /// Get the first key that is set, in order
    pub fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.get(key))
    }

    /// Get a value or fall back to `default`
    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a value, falling back to `default` when the key is unset
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::process()
    }
}

impl std::fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSource").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_or_default() {
        let env = EnvSource::from_pairs([("A", "1")]);
        assert_eq!(env.string_or("A", "x"), "1");
        assert_eq!(env.string_or("B", "x"), "x");
    }

    #[test]
    fn test_first_of_order() {
        let env = EnvSource::from_pairs([("SECOND", "b"), ("THIRD", "c")]);
        assert_eq!(env.first_of(&["FIRST", "SECOND", "THIRD"]), Some("b".to_string()));
        assert_eq!(env.first_of(&["NONE"]), None);
    }

    #[test]
    fn test_parse_or() {
        let env = EnvSource::from_pairs([("PORT", " 9090 "), ("BAD", "nine")]);
        assert_eq!(env.parse_or::<u16>("PORT", 8080).unwrap(), 9090);
        assert_eq!(env.parse_or::<u16>("MISSING", 8080).unwrap(), 8080);

        let err = env.parse_or::<u16>("BAD", 8080).unwrap_err();
        assert!(err.to_string().contains("BAD"));
    }
}
