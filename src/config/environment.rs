use super::defaults::ACTIVE_PROFILES_PROPERTY;
use super::types::{PropertyBag, PropertySource, PropertySources};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// A property is set to a value its consumer cannot interpret.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("property '{key}' has invalid value '{value}', expected {expected}")]
pub struct InvalidPropertyValue {
    pub key: String,
    pub value: String,
    pub expected: &'static str,
}

/// Parse a boolean the way Spring's converter does: `true/on/yes/1` and
/// `false/off/no/0`, ignoring case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Snapshot of process environment variables.
///
/// Captured once at startup; lookups never touch the live process
/// environment afterwards.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    /// Capture the current process environment. Non-UTF-8 entries are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Whether the variable is set at all (possibly empty).
    pub fn is_set(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Raw value of a variable, including empty values.
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Value of a variable, treating empty values as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_raw(name).filter(|v| !v.is_empty())
    }

    /// First non-empty value among `names`, with the name that produced it.
    pub fn first_of<'a>(&'a self, names: &[&'a str]) -> Option<(&'a str, &'a str)> {
        names
            .iter()
            .find_map(|name| self.get(name).map(|value| (*name, value)))
    }

    pub fn to_bag(&self, origin: &str) -> PropertyBag {
        let mut bag: PropertyBag = self.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        bag.set_origin(origin);
        bag
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// The process configuration namespace.
///
/// An ordered stack of read-only property sources, the explicitly active
/// profiles, and the environment variable snapshot.
#[derive(Debug, Clone, Default)]
pub struct ConfigEnvironment {
    sources: PropertySources,
    active_profiles: Vec<String>,
    env: EnvVars,
}

impl ConfigEnvironment {
    pub fn new(env: EnvVars) -> Self {
        Self {
            sources: PropertySources::new(),
            active_profiles: Vec::new(),
            env,
        }
    }

    pub fn env(&self) -> &EnvVars {
        &self.env
    }

    pub fn property_sources(&self) -> &PropertySources {
        &self.sources
    }

    pub fn property_sources_mut(&mut self) -> &mut PropertySources {
        &mut self.sources
    }

    /// Explicitly activated profiles, in activation order.
    pub fn active_profiles(&self) -> &[String] {
        &self.active_profiles
    }

    pub fn set_active_profiles<I, S>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_profiles = profiles
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .collect();
    }

    /// Profiles requested through `spring.profiles.active`, trimmed.
    pub fn requested_profiles(&self) -> Vec<String> {
        self.get_property(ACTIVE_PROFILES_PROPERTY)
            .map(split_profiles)
            .unwrap_or_default()
    }

    pub fn get_property(&self, key: &str) -> Option<&str> {
        self.sources.lookup(key).map(|(value, _)| value)
    }

    /// Property value, treating empty values as unset.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get_property(key).filter(|v| !v.trim().is_empty())
    }

    /// Boolean property; missing or blank gives `default`. Unrecognised
    /// values are an error, never silently `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, InvalidPropertyValue> {
        match self.get_non_empty(key) {
            None => Ok(default),
            Some(v) => parse_bool(v).ok_or_else(|| InvalidPropertyValue {
                key: key.to_string(),
                value: v.to_string(),
                expected: "one of true/false, on/off, yes/no, 1/0",
            }),
        }
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        match self.get_non_empty(key).map(str::trim) {
            None => default,
            Some(v) => v.parse().unwrap_or_else(|_| {
                warn!("Property '{key}' has non-numeric value '{v}', using {default}");
                default
            }),
        }
    }

    /// Add a layer below all existing ones.
    pub fn add_last(&mut self, source: PropertySource) {
        self.sources.add_last(source);
    }
}

/// Split a comma-separated profile list, dropping blanks.
pub fn split_profiles(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
