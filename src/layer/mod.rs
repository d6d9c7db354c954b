//! Layer loading
//!
//! A layer is one named source of raw setting values: a TOML file, an
//! in-memory mapping, or prefixed environment variables. Layers are
//! immutable once loaded and carry provenance (origin, path, digest)
//! for the resolved configuration's source record. No type coercion
//! happens here; values pass through raw and are checked at the
//! resolve/validate boundary.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Key whose value names a header file to inline at load time
const HEADER_INCLUDE_KEY: &str = "header_include";

/// Key that receives the inlined header content
const EXTRA_HEADER_KEY: &str = "extra_header";

/// Upper bound on header-include file size
const MAX_INCLUDE_BYTES: u64 = 64 * 1024;

/// Errors from loading a layer source
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read layer source: {0}")]
    Io(#[from] io::Error),

    #[error("layer source is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("layer root must be a mapping of settings, got {0}")]
    NotAMapping(&'static str),

    #[error("header include '{path}': {reason}")]
    HeaderInclude { path: String, reason: String },
}

/// Origin of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerOrigin {
    File,
    Memory,
    Env,
}

/// Provenance of a contributing layer, recorded in precedence order
/// on the resolved configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerProvenance {
    /// Layer name
    pub name: String,

    /// Origin of this layer
    pub origin: LayerOrigin,

    /// File path (None for memory/env)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for memory/env)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// One named source of configuration key/value pairs
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    origin: LayerOrigin,
    path: Option<String>,
    digest: Option<String>,
    values: Map<String, Value>,
}

impl Layer {
    /// Load a layer from a TOML file.
    ///
    /// Records the SHA-256 digest of the raw bytes, then performs the
    /// header-include acquisition: if the file sets `header_include`,
    /// the referenced file is read (bounded, relative to the layer
    /// file's directory) and stored under `extra_header` as an
    /// ordinary string value.
    pub fn from_toml_file(name: &str, path: &Path) -> Result<Self, LoadError> {
        let bytes = fs::read(path)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)?;
        let toml_value: toml::Value = toml::from_str(&contents)?;
        let mut values = match toml_to_json(toml_value) {
            Value::Object(map) => map,
            other => return Err(LoadError::NotAMapping(json_type_name(&other))),
        };

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        inline_header_include(&mut values, base_dir)?;

        Ok(Self {
            name: name.to_string(),
            origin: LayerOrigin::File,
            path: Some(path.to_string_lossy().to_string()),
            digest: Some(digest),
            values,
        })
    }

    /// Build a layer from an in-memory JSON object
    pub fn from_value(name: &str, value: Value) -> Result<Self, LoadError> {
        let values = match value {
            Value::Object(map) => map,
            other => return Err(LoadError::NotAMapping(json_type_name(&other))),
        };

        Ok(Self {
            name: name.to_string(),
            origin: LayerOrigin::Memory,
            path: None,
            digest: None,
            values,
        })
    }

    /// Build a layer from environment variables with the given prefix.
    ///
    /// `SITECONF_SITE_URL=https://example.org` becomes `site_url`.
    /// Values parse as booleans or integers where they look like one,
    /// and fall back to plain strings.
    pub fn from_env(name: &str, prefix: &str) -> Self {
        let marker = format!("{}_", prefix);
        let mut values = Map::new();

        let mut vars: Vec<(String, String)> = std::env::vars()
            .filter(|(k, _)| k.starts_with(&marker))
            .collect();
        vars.sort();

        for (key, raw) in vars {
            let setting = key[marker.len()..].to_lowercase();
            if setting.is_empty() {
                continue;
            }
            values.insert(setting, env_value(&raw));
        }

        Self {
            name: name.to_string(),
            origin: LayerOrigin::Env,
            path: None,
            digest: None,
            values,
        }
    }

    /// Layer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw key/value pairs in this layer
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Provenance record for this layer
    pub fn provenance(&self) -> LayerProvenance {
        LayerProvenance {
            name: self.name.clone(),
            origin: self.origin,
            path: self.path.clone(),
            digest: self.digest.clone(),
        }
    }
}

/// Interpret an environment variable value as a scalar setting value
fn env_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                Value::Number(n.into())
            } else {
                Value::String(raw.to_string())
            }
        }
    }
}

/// Replace the `header_include` path reference with the file content
/// under `extra_header`, as an explicit bounded read
fn inline_header_include(values: &mut Map<String, Value>, base_dir: &Path) -> Result<(), LoadError> {
    let include = match values.get(HEADER_INCLUDE_KEY) {
        Some(Value::String(p)) if !p.is_empty() => p.clone(),
        _ => return Ok(()),
    };

    let path = base_dir.join(&include);

    let meta = fs::metadata(&path).map_err(|e| LoadError::HeaderInclude {
        path: include.clone(),
        reason: e.to_string(),
    })?;
    if meta.len() > MAX_INCLUDE_BYTES {
        return Err(LoadError::HeaderInclude {
            path: include,
            reason: format!("{} bytes exceeds {} byte limit", meta.len(), MAX_INCLUDE_BYTES),
        });
    }

    let content = fs::read_to_string(&path).map_err(|e| LoadError::HeaderInclude {
        path: include.clone(),
        reason: e.to_string(),
    })?;

    values.insert(EXTRA_HEADER_KEY.to_string(), Value::String(content));
    Ok(())
}

/// Convert a TOML value to a JSON value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let map: Map<String, Value> =
                table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect();
            Value::Object(map)
        }
    }
}

/// Short name for a JSON value's type, used in error messages
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}
