//! Layer resolution
//!
//! Folds a base layer plus any number of override layers, in order,
//! into one immutable [`ResolvedConfig`]: for every key touched by a
//! layer the latest layer's value wins, and keys never touched take
//! the schema default. Validation runs atomically over the merged
//! result before a config is handed out, so no partially-valid
//! configuration is ever observable.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::layer::{Layer, LayerProvenance, LoadError};
use crate::schema::{Schema, UnknownSetting};
use crate::validate::{self, ValidationError};

/// Schema version for the serialized resolved configuration
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "siteconf/resolved_config@1";

/// Errors from a resolution pass. All are fatal; there is no partial
/// success.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("layer '{layer}': {source}")]
    UnknownSetting {
        layer: String,
        #[source]
        source: UnknownSetting,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// The final, immutable, validated configuration consumed by the
/// external generator
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Schema version
    schema_version: u32,

    /// Schema identifier
    schema_id: String,

    /// When this configuration was resolved
    created_at: DateTime<Utc>,

    /// Final value per recognized setting
    settings: BTreeMap<String, Value>,

    /// Contributing layers in precedence order
    sources: Vec<LayerProvenance>,
}

impl ResolvedConfig {
    /// Resolve a base layer plus override layers, in order.
    ///
    /// Later layers override earlier ones per key; untouched keys take
    /// the schema default. Any unknown key in any layer aborts the
    /// whole pass.
    pub fn resolve(
        schema: &Schema,
        base: &Layer,
        overrides: &[Layer],
    ) -> Result<Self, ResolveError> {
        let mut settings = schema.defaults();
        let mut sources = Vec::with_capacity(1 + overrides.len());

        for layer in std::iter::once(base).chain(overrides.iter()) {
            for (key, value) in layer.values() {
                schema
                    .describe(key)
                    .map_err(|source| ResolveError::UnknownSetting {
                        layer: layer.name().to_string(),
                        source,
                    })?;
                settings.insert(key.clone(), value.clone());
            }
            sources.push(layer.provenance());
        }

        validate::validate(schema, &settings)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            settings,
            sources,
        })
    }

    /// Get a setting value by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Get a setting as a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Get a setting as a bool
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Get a setting as a u64
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    /// Get a list setting as string slices
    pub fn get_str_list(&self, key: &str) -> Option<Vec<&str>> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
    }

    /// All resolved settings, in name order
    pub fn settings(&self) -> &BTreeMap<String, Value> {
        &self.settings
    }

    /// Contributing layers in precedence order
    pub fn sources(&self) -> &[LayerProvenance] {
        &self.sources
    }

    /// Resolution timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Repackage the resolved settings as a single in-memory layer.
    ///
    /// Resolving that layer on its own yields the same settings back.
    pub fn to_layer(&self, name: &str) -> Layer {
        let map: Map<String, Value> = self
            .settings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Layer::from_value(name, Value::Object(map))
            .unwrap_or_else(|_| unreachable!("settings map is always an object"))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the serialized configuration to a file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }
}
