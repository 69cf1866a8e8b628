//! Layered configuration loading.
//!
//! This crate fills caller-defined configuration records from, in increasing
//! precedence: field defaults, configuration files (YAML, TOML or JSON, with
//! environment-specific variants and `.example` fallbacks) and environment
//! variables. Records describe their fields with [`impl_record!`].
//!
//! ```ignore
//! use layered_config::{FieldMeta, impl_record};
//!
//! #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
//! #[serde(default)]
//! struct App {
//!     name: String,
//!     port: u16,
//! }
//!
//! impl_record!(App {
//!     name: FieldMeta::new("Name").required(),
//!     port: FieldMeta::new("Port").default("8080"),
//! });
//!
//! let mut app = App::default();
//! layered_config::load(&mut app, &["config/app.yml"])?;
//! ```

mod binder;
pub mod constants;
mod format;
mod loader;
mod record;
mod sources;
mod watcher;

use std::path::Path;

use serde::Serialize;

pub use binder::{BindMode, FieldBinder, env_names};
pub use format::{Format, decode_into, decode_with};
pub use loader::{
    ConfigError, ConfigLoader, ConfigRecord, EnvSource, MapEnv, ProcessEnv, Settings,
    env_var_or_none,
};
pub use record::{
    Field, FieldKind, FieldMeta, FieldVisitor, LiteralError, Record, RecordSequence,
    parse_env_bool, parse_literal,
};
pub use sources::{ResolveOptions, ResolvedSources, resolve_sources, suffixed_path};
pub use watcher::{CancellationToken, ReloadCallback, ReloadHandle, SharedConfig};

/// Load `record` from `files` and the environment using [`Settings::from_env`].
pub fn load<T, P>(record: &mut T, files: &[P]) -> Result<(), ConfigError>
where
    T: ConfigRecord,
    P: AsRef<Path>,
{
    ConfigLoader::from_env().load(record, files)
}

/// Save `record` to `path` in the format named by its extension.
pub fn save<T: Serialize>(record: &T, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    ConfigLoader::from_env().save(record, path)
}

/// Create `path` from defaults when it is missing or empty. See [`ConfigLoader::setup_config`].
pub fn setup_config<T, F>(record: &mut T, path: impl AsRef<Path>, init_values: F) -> Result<bool, ConfigError>
where
    T: ConfigRecord,
    F: FnOnce(&mut T),
{
    ConfigLoader::from_env().setup_config(record, path, init_values)
}

/// The active environment name as seen by [`Settings::from_env`].
pub fn current_environment() -> String {
    Settings::from_env().environment()
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::{Mutex, OnceLock};

    pub fn global_test_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }
}
