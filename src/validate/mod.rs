//! Resolved-configuration validation
//!
//! Runs atomically over the whole merged result, never per layer, and
//! fails fast on the first violation, naming the offending key. Path
//! checks are syntactic only; existence on disk is the external
//! generator's concern.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::layer::json_type_name;
use crate::schema::{Schema, Setting, SettingKind};

/// A validation failure, always naming the offending key
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("setting '{key}': expected {expected}, got {found}")]
    TypeMismatch {
        key: String,
        expected: SettingKind,
        found: &'static str,
    },

    #[error("required setting '{key}' is missing or empty")]
    MissingRequired { key: String },

    #[error("setting '{key}': duplicate entry '{value}'")]
    DuplicateEntry { key: String, value: String },

    #[error("setting '{key}': invalid path '{path}': {reason}")]
    InvalidPath {
        key: String,
        path: String,
        reason: &'static str,
    },
}

impl ValidationError {
    /// The key this violation is about
    pub fn key(&self) -> &str {
        match self {
            ValidationError::TypeMismatch { key, .. }
            | ValidationError::MissingRequired { key }
            | ValidationError::DuplicateEntry { key, .. }
            | ValidationError::InvalidPath { key, .. } => key,
        }
    }
}

/// Validate a fully merged setting map against the schema
pub fn validate(schema: &Schema, settings: &BTreeMap<String, Value>) -> Result<(), ValidationError> {
    for setting in schema.iter() {
        let value = match settings.get(setting.name) {
            Some(v) => v,
            None => {
                // Resolution seeds every key from the schema default,
                // so a hole can only mean a required key was erased.
                if setting.required {
                    return Err(ValidationError::MissingRequired {
                        key: setting.name.to_string(),
                    });
                }
                continue;
            }
        };

        check_type(setting, value)?;
        check_required(setting, value)?;
        check_duplicates(setting, value)?;
        check_paths(setting, value)?;
    }

    Ok(())
}

fn type_mismatch(setting: &Setting, value: &Value) -> ValidationError {
    ValidationError::TypeMismatch {
        key: setting.name.to_string(),
        expected: setting.kind,
        found: json_type_name(value),
    }
}

fn check_type(setting: &Setting, value: &Value) -> Result<(), ValidationError> {
    if value.is_null() {
        if setting.nullable {
            return Ok(());
        }
        return Err(type_mismatch(setting, value));
    }

    let ok = match setting.kind {
        SettingKind::Str => value.is_string(),
        SettingKind::Bool => value.is_boolean(),
        SettingKind::Int => value.as_i64().is_some(),
        SettingKind::StrList => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        SettingKind::Map => value.is_object(),
    };

    if ok {
        Ok(())
    } else {
        Err(type_mismatch(setting, value))
    }
}

fn check_required(setting: &Setting, value: &Value) -> Result<(), ValidationError> {
    if !setting.required {
        return Ok(());
    }

    let empty = match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };

    if empty {
        return Err(ValidationError::MissingRequired {
            key: setting.name.to_string(),
        });
    }
    Ok(())
}

fn check_duplicates(setting: &Setting, value: &Value) -> Result<(), ValidationError> {
    if setting.kind != SettingKind::StrList {
        return Ok(());
    }
    let Some(items) = value.as_array() else {
        return Ok(());
    };

    let mut seen = HashSet::new();
    for item in items {
        if let Some(s) = item.as_str() {
            if !seen.insert(s) {
                return Err(ValidationError::DuplicateEntry {
                    key: setting.name.to_string(),
                    value: s.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_paths(setting: &Setting, value: &Value) -> Result<(), ValidationError> {
    if !setting.path {
        return Ok(());
    }

    let invalid = |path: &str, reason| ValidationError::InvalidPath {
        key: setting.name.to_string(),
        path: path.to_string(),
        reason,
    };

    match value {
        Value::Null => Ok(()),
        Value::String(s) => path_syntax(s).map_err(|reason| invalid(s, reason)),
        Value::Array(items) => {
            for item in items {
                if let Some(s) = item.as_str() {
                    path_syntax(s).map_err(|reason| invalid(s, reason))?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Syntactic path check: relative or absolute, non-empty, no NUL
/// bytes, no empty intermediate components
fn path_syntax(path: &str) -> Result<(), &'static str> {
    if path.is_empty() {
        return Err("path is empty");
    }
    if path.contains('\0') {
        return Err("path contains a NUL byte");
    }

    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if !trimmed.is_empty() && trimmed.split('/').any(str::is_empty) {
        return Err("path contains an empty component");
    }

    Ok(())
}
