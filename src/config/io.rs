use super::properties::parse_properties;
use super::types::{PropertyBag, PropertySource};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maximum size for a config file (10 MB).
pub const MAX_CONFIG_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Base name of static configuration files.
pub const CONFIG_FILE_STEM: &str = "application";

/// Supported extensions, highest precedence first.
pub const CONFIG_FILE_EXTENSIONS: &[&str] = &["properties", "yaml", "yml", "json", "toml"];

/// Directories searched below the config root, highest precedence first.
fn search_dirs(root: &Path) -> [PathBuf; 2] {
    [root.join("config"), root.to_path_buf()]
}

/// Read one configuration file into a flat property bag.
pub fn read_config_file(path: &Path) -> Result<PropertyBag> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Cannot stat config file '{}'", path.display()))?;

    if metadata.len() > MAX_CONFIG_FILE_BYTES {
        bail!(
            "Config file '{}' is {} bytes, exceeds limit of {} bytes",
            path.display(),
            metadata.len(),
            MAX_CONFIG_FILE_BYTES,
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

    let origin = source_name(path);
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("properties");

    let value: serde_json::Value = match ext {
        "properties" => {
            return parse_properties(&content, &origin)
                .with_context(|| format!("Invalid properties file '{}'", path.display()));
        }
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in '{}'", path.display()))?,
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in '{}'", path.display()))?,
        _ => json5::from_str(&content)
            .or_else(|_| serde_json::from_str(&content))
            .with_context(|| format!("Invalid JSON in '{}'", path.display()))?,
    };

    let mut bag = PropertyBag::new(origin);
    flatten_value(&value, "", &mut bag);
    Ok(bag)
}

/// Flatten a nested document into dotted keys. Arrays use `key[i]`.
pub fn flatten_value(value: &serde_json::Value, prefix: &str, bag: &mut PropertyBag) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let child = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_value(val, &child, bag);
            }
        }
        serde_json::Value::Array(arr) => {
            for (idx, val) in arr.iter().enumerate() {
                flatten_value(val, &format!("{prefix}[{idx}]"), bag);
            }
        }
        serde_json::Value::Null => {
            if !prefix.is_empty() {
                bag.insert(prefix, "");
            }
        }
        serde_json::Value::String(s) => {
            bag.insert(prefix, s.as_str());
        }
        other => {
            bag.insert(prefix, other.to_string());
        }
    }
}

fn source_name(path: &Path) -> String {
    format!("file [{}]", path.display())
}

/// Load every existing `{stem}.{ext}` file under `root`, highest precedence first.
pub fn load_config_files(root: &Path, stem: &str) -> Result<Vec<PropertySource>> {
    let mut sources = Vec::new();
    for dir in search_dirs(root) {
        for ext in CONFIG_FILE_EXTENSIONS {
            let path = dir.join(format!("{stem}.{ext}"));
            if !path.is_file() {
                continue;
            }
            let bag = read_config_file(&path)?;
            debug!("Loaded {} properties from {}", bag.len(), path.display());
            sources.push(PropertySource::new(source_name(&path), bag));
        }
    }
    Ok(sources)
}

/// Load `application.*` files.
pub fn load_base_sources(root: &Path) -> Result<Vec<PropertySource>> {
    load_config_files(root, CONFIG_FILE_STEM)
}

/// Load `application-{profile}.*` files. Later profiles take precedence.
pub fn load_profile_sources(root: &Path, profiles: &[String]) -> Result<Vec<PropertySource>> {
    let mut sources = Vec::new();
    for profile in profiles.iter().rev() {
        sources.extend(load_config_files(root, &format!("{CONFIG_FILE_STEM}-{profile}"))?);
    }
    Ok(sources)
}

// ============================================================================
// Tests
// ============================================================================
