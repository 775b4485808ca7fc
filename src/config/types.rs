use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Property Bag
// ============================================================================

/// A resolved set of configuration properties.
///
/// Keys are unique and iterate in sorted order. Inserting an existing key
/// replaces its value. The `origin` tag records which source produced the
/// bag and is only used for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    origin: String,
    entries: BTreeMap<String, String>,
}

impl PropertyBag {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn set_origin(&mut self, origin: impl Into<String>) {
        self.origin = origin.into();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a property, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Merge `other` into this bag. Keys from `other` win.
    pub fn merge(&mut self, other: PropertyBag) {
        self.entries.extend(other.entries);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = PropertyBag::default();
        for (k, v) in iter {
            bag.insert(k, v);
        }
        bag
    }
}

impl IntoIterator for PropertyBag {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ============================================================================
// Property Sources
// ============================================================================

/// How a property source answers lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Key must match exactly.
    Exact,
    /// Environment-variable style: `spring.data-x` also matches `SPRING_DATA_X`.
    Relaxed,
}

/// A named, read-only layer of the configuration namespace.
#[derive(Debug, Clone)]
pub struct PropertySource {
    name: String,
    mode: LookupMode,
    properties: Arc<PropertyBag>,
}

impl PropertySource {
    pub fn new(name: impl Into<String>, properties: PropertyBag) -> Self {
        Self {
            name: name.into(),
            mode: LookupMode::Exact,
            properties: Arc::new(properties),
        }
    }

    pub fn relaxed(name: impl Into<String>, properties: PropertyBag) -> Self {
        Self {
            mode: LookupMode::Relaxed,
            ..Self::new(name, properties)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.properties.get(key) {
            return Some(value);
        }
        match self.mode {
            LookupMode::Exact => None,
            LookupMode::Relaxed => self.properties.get(&relaxed_env_name(key)),
        }
    }
}

/// Map a dotted property key to its environment variable form.
pub fn relaxed_env_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Ordered stack of property sources. The first source that has a key wins.
#[derive(Debug, Clone, Default)]
pub struct PropertySources {
    sources: Vec<PropertySource>,
}

impl PropertySources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&PropertySource> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.name == name)
    }

    pub fn add_first(&mut self, source: PropertySource) {
        self.remove(&source.name);
        self.sources.insert(0, source);
    }

    pub fn add_last(&mut self, source: PropertySource) {
        self.remove(&source.name);
        self.sources.push(source);
    }

    /// Insert directly below `relative`, or first when `relative` is absent.
    pub fn add_after(&mut self, relative: &str, source: PropertySource) {
        self.remove(&source.name);
        match self.position(relative) {
            Some(idx) => self.sources.insert(idx + 1, source),
            None => self.sources.insert(0, source),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertySource> {
        self.position(name).map(|idx| self.sources.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertySource> {
        self.sources.iter()
    }

    /// Look a key up through all layers, returning the value and the layer name.
    pub fn lookup(&self, key: &str) -> Option<(&str, &str)> {
        self.sources
            .iter()
            .find_map(|s| s.get(key).map(|v| (v, s.name())))
    }
}

// ============================================================================
// Tests
// ============================================================================
