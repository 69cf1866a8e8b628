//! Environment, default and required-field binding.
//!
//! Responsibilities:
//! - Walk every field of a record (recursively) and overlay environment variable values.
//! - Apply `default` annotations to fields that are still zero after env binding.
//! - Enforce `required` annotations in `BindMode::Full`.
//! - Grow empty sequences of records from indexed environment variables.
//!
//! Does NOT handle:
//! - Reading or decoding files (see `format.rs` and `sources.rs`).
//! - Choosing the path prefix (see `loader/settings.rs`).
//!
//! Invariants:
//! - Without an explicit `env` annotation a field probes `<path>_<Name>` verbatim, then upper-cased.
//! - The first non-empty env value wins; probing stops there.
//! - Env values take precedence over file values; defaults only fill zero fields.
//! - Sequence growth stops at the first index whose element stays zero or reads no env value
//!   under its own indexed path. Explicit `env` names are shared by every index and do not count.

use std::cell::Cell;

use crate::constants::ENV_PATH_SEPARATOR;
use crate::loader::{ConfigError, EnvSource};
use crate::record::{Field, FieldKind, FieldMeta, FieldVisitor, Record, RecordSequence};

/// Whether required fields are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Normal loads: blank required fields fail with `ConfigError::RequiredField`.
    Full,
    /// Defaults bootstrapping: blank required fields are left zero.
    InitOnly,
}

/// Binds environment values and defaults onto a record.
pub struct FieldBinder<'e> {
    env: &'e dyn EnvSource,
    debug: bool,
    verbose: bool,
    enforce_required: Cell<bool>,
    path_hits: Cell<usize>,
}

impl<'e> FieldBinder<'e> {
    pub fn new(env: &'e dyn EnvSource, mode: BindMode) -> Self {
        Self {
            env,
            debug: false,
            verbose: false,
            enforce_required: Cell::new(mode == BindMode::Full),
            path_hits: Cell::new(0),
        }
    }

    /// Enable binding diagnostics.
    pub fn with_diagnostics(mut self, debug: bool, verbose: bool) -> Self {
        self.debug = debug;
        self.verbose = verbose;
        self
    }

    /// Bind every field of `record`, deriving env names from `prefix`.
    pub fn bind(&self, record: &mut dyn Record, prefix: &[String]) -> Result<(), ConfigError> {
        let mut visitor = BindVisitor {
            binder: self,
            record_name: record.record_name(),
            path: prefix,
        };
        record.visit_fields(&mut visitor)
    }

    fn bind_field(
        &self,
        record_name: &str,
        path: &[String],
        meta: &FieldMeta,
        field: &mut dyn Field,
    ) -> Result<(), ConfigError> {
        let candidates = env_names(path, meta);

        if self.verbose {
            tracing::info!(
                record = record_name,
                field = meta.name,
                env = %candidates.join(", "),
                "Trying to load field from env"
            );
        }

        for name in &candidates {
            let Some(value) = self.env.var(name).filter(|value| !value.is_empty()) else {
                continue;
            };
            if self.debug || self.verbose {
                tracing::info!(
                    record = record_name,
                    field = meta.name,
                    env = %name,
                    "Loading field from env"
                );
            }
            field
                .assign_env(&value)
                .map_err(|e| ConfigError::InvalidValue {
                    var: name.clone(),
                    message: e.to_string(),
                })?;
            if !meta.has_explicit_env() {
                self.path_hits.set(self.path_hits.get() + 1);
            }
            break;
        }

        if field.is_zero() {
            if let Some(literal) = meta.default_literal() {
                field
                    .assign_literal(literal)
                    .map_err(|e| ConfigError::InvalidValue {
                        var: format!("default of {}", meta.name),
                        message: e.to_string(),
                    })?;
            } else if meta.required && self.enforce_required.get() {
                return Err(ConfigError::RequiredField {
                    field: meta.name.to_string(),
                });
            }
        }

        let nested = nested_path(path, meta);
        match field.kind() {
            FieldKind::Scalar => Ok(()),
            FieldKind::Record(record) => self.bind(record, &nested),
            FieldKind::Sequence(sequence) => self.bind_sequence(sequence, &nested),
        }
    }

    fn bind_sequence(
        &self,
        sequence: &mut dyn RecordSequence,
        path: &[String],
    ) -> Result<(), ConfigError> {
        if !sequence.is_empty() {
            for index in 0..sequence.len() {
                if let FieldKind::Record(record) = sequence.element(index) {
                    self.bind(record, &indexed_path(path, index))?;
                }
            }
            return Ok(());
        }

        if !sequence.holds_records() {
            return Ok(());
        }

        let mut index = 0;
        loop {
            let element_path = indexed_path(path, index);
            let grown = sequence.grow(&mut |record| self.probe_element(record, &element_path))?;
            if !grown {
                break;
            }
            index += 1;
        }
        Ok(())
    }
}

impl FieldBinder<'_> {
    /// Bind a candidate sequence element. Returns whether any env value was read
    /// through a name derived from `path`.
    ///
    /// Required fields are checked only for candidates that read the environment;
    /// an index with no variables ends the sequence instead of failing the load.
    fn probe_element(&self, record: &mut dyn Record, path: &[String]) -> Result<bool, ConfigError> {
        let hits_before = self.path_hits.get();
        let enforce = self.enforce_required.replace(false);
        let probed = self.bind(record, path);
        self.enforce_required.set(enforce);
        probed?;

        let consumed_env = self.path_hits.get() > hits_before;
        if consumed_env && enforce {
            self.bind(record, path)?;
        }
        Ok(consumed_env)
    }
}

struct BindVisitor<'b, 'e> {
    binder: &'b FieldBinder<'e>,
    record_name: &'static str,
    path: &'b [String],
}

impl FieldVisitor for BindVisitor<'_, '_> {
    fn visit_field(&mut self, meta: &FieldMeta, field: &mut dyn Field) -> Result<(), ConfigError> {
        self.binder
            .bind_field(self.record_name, self.path, meta, field)
    }
}

/// Environment variable names probed for a field, in order.
pub fn env_names(path: &[String], meta: &FieldMeta) -> Vec<String> {
    if let Some(explicit) = meta.explicit_env() {
        return vec![explicit.to_string()];
    }

    let mut segments: Vec<&str> = path.iter().map(String::as_str).collect();
    segments.push(meta.name);
    let joined = segments.join(ENV_PATH_SEPARATOR);
    let upper = joined.to_uppercase();

    if upper == joined {
        vec![joined]
    } else {
        vec![joined, upper]
    }
}

fn nested_path(path: &[String], meta: &FieldMeta) -> Vec<String> {
    let mut nested = path.to_vec();
    if !meta.anonymous {
        nested.push(meta.name.to_string());
    }
    nested
}

fn indexed_path(path: &[String], index: usize) -> Vec<String> {
    let mut indexed = path.to_vec();
    indexed.push(index.to_string());
    indexed
}
