//! File format dispatch and merging decode.
//!
//! Responsibilities:
//! - Map file extensions to a `Format` (YAML, TOML, JSON).
//! - Decode file contents onto an existing record, overwriting only the keys present in the file.
//! - Detect keys that match no field of the record (strict mode).
//! - Probe formats in a fixed order when the extension does not name one.
//! - Encode records for `save`.
//!
//! Does NOT handle:
//! - Choosing which files to read (see `sources.rs`).
//! - Environment variables or defaults (see `binder.rs`).
//!
//! Invariants:
//! - A failed decode never mutates the record.
//! - Fields serde skips on deserialize keep their current value across decodes.
//! - An empty or whitespace-only file is a no-op.
//! - Probe order is TOML, then JSON, then YAML; an unmatched-keys failure ends probing immediately.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::loader::ConfigError;

/// A supported structured file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    /// Order in which formats are tried for files without a known extension.
    pub const PROBE_ORDER: [Format; 3] = [Format::Toml, Format::Json, Format::Yaml];

    /// Format implied by the file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }

    fn parse(self, text: &str) -> Result<Value, String> {
        match self {
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }

    /// Serialize `value` in this format.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<String, String> {
        match self {
            Format::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
            Format::Toml => toml::to_string(value).map_err(|e| e.to_string()),
            Format::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decode `bytes` read from `path` onto `record`.
///
/// The format comes from the extension of `path`; without one, formats are
/// probed in [`Format::PROBE_ORDER`]. Returns the format that was applied.
pub fn decode_into<T>(
    record: &mut T,
    bytes: &[u8],
    path: &Path,
    error_on_unmatched_keys: bool,
) -> Result<Format, ConfigError>
where
    T: Serialize + DeserializeOwned + Clone,
{
    if let Some(format) = Format::from_path(path) {
        decode_with(record, bytes, path, format, error_on_unmatched_keys)?;
        return Ok(format);
    }

    for format in Format::PROBE_ORDER {
        match decode_with(record, bytes, path, format, error_on_unmatched_keys) {
            Ok(()) => return Ok(format),
            Err(err) if err.is_unmatched_keys() => return Err(err),
            Err(err) => {
                tracing::debug!(
                    path = %path.display(),
                    format = %format,
                    error = %err,
                    "Format probe failed"
                );
            }
        }
    }

    Err(ConfigError::Decode {
        path: path.to_path_buf(),
        message: "failed to decode config".to_string(),
    })
}

/// Decode `bytes` as `format` onto `record`.
///
/// The file's keys are merged over the record's serialized form and then
/// deserialized in place into a copy of the record, so `#[serde(skip)]` fields
/// survive. A field that is deserialized but never serialized is rebuilt from
/// the file alone on every decode.
pub fn decode_with<T>(
    record: &mut T,
    bytes: &[u8],
    path: &Path,
    format: Format,
    error_on_unmatched_keys: bool,
) -> Result<(), ConfigError>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let decode_error = |message: String| ConfigError::Decode {
        path: path.to_path_buf(),
        message: format!("{format}: {message}"),
    };

    let text = std::str::from_utf8(bytes).map_err(|e| decode_error(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(());
    }

    let incoming = format.parse(text).map_err(decode_error)?;
    if incoming.is_null() {
        return Ok(());
    }

    let mut merged = record_value(record)?;
    merge_values(&mut merged, incoming.clone());
    let mut decoded = record.clone();
    Deserialize::deserialize_in_place(merged, &mut decoded)
        .map_err(|e| decode_error(e.to_string()))?;

    if error_on_unmatched_keys {
        let shape = record_value(&decoded)?;
        let mut keys = Vec::new();
        collect_unmatched(&incoming, &shape, "", &mut keys);
        if !keys.is_empty() {
            return Err(ConfigError::UnmatchedKeys {
                path: PathBuf::from(path),
                keys,
            });
        }
    }

    *record = decoded;
    Ok(())
}

fn record_value<T: Serialize>(record: &T) -> Result<Value, ConfigError> {
    let value = serde_json::to_value(record).map_err(|e| ConfigError::InvalidTarget {
        reason: e.to_string(),
    })?;
    if !value.is_object() {
        return Err(ConfigError::InvalidTarget {
            reason: "config should be a record with named fields".to_string(),
        });
    }
    Ok(value)
}

/// Overlay `overlay` onto `base`: maps merge key by key, everything else is replaced.
pub(crate) fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn collect_unmatched(incoming: &Value, shape: &Value, prefix: &str, keys: &mut Vec<String>) {
    match (incoming, shape) {
        (Value::Object(incoming_map), Value::Object(shape_map)) => {
            for (key, value) in incoming_map {
                let path = join_key(prefix, key);
                match shape_map.get(key) {
                    Some(nested) => collect_unmatched(value, nested, &path, keys),
                    None => keys.push(path),
                }
            }
        }
        (Value::Array(incoming_items), Value::Array(shape_items)) => {
            for (index, (value, nested)) in incoming_items.iter().zip(shape_items).enumerate() {
                collect_unmatched(value, nested, &join_key(prefix, &index.to_string()), keys);
            }
        }
        _ => {}
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
