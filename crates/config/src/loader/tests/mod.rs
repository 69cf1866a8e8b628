//! Tests for the configuration loader facade.
//!
//! Responsibilities:
//! - Test loading records from files, environment variables and defaults.
//! - Test file precedence and environment-specific variants.
//! - Test strict decoding, `init`, `save` and `setup_config`.
//! - Test dotenv loading behavior.
//!
//! Does NOT handle:
//! - Env name synthesis or sequence growth details (tested in binder.rs).
//! - Per-format decoding details (tested in format.rs).
//!
//! Invariants:
//! - Tests bind against `MapEnv` unless they exercise the process environment.
//! - Tests use `env_lock()` when they touch process-global state (cwd/env).
//! - Temporary directories are cleaned up automatically via `tempfile`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::impl_record;
use crate::loader::{ConfigLoader, MapEnv, Settings};
use crate::record::FieldMeta;

pub mod load_tests;
pub mod save_tests;

/// Returns the global test lock for environment variable isolation.
pub fn env_lock() -> &'static Mutex<()> {
    crate::test_util::global_test_lock()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub name: String,
    pub user: String,
    pub password: String,
    pub port: u32,
}

impl_record!(Database {
    name: FieldMeta::new("Name"),
    user: FieldMeta::new("User").default("root"),
    password: FieldMeta::new("Password").required(),
    port: FieldMeta::new("Port").default("3306"),
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

impl_record!(Contact {
    name: FieldMeta::new("Name"),
    email: FieldMeta::new("Email").required(),
});

/// Tables come last so the record serializes to TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_name: String,
    pub debug: bool,
    pub contacts: Vec<Contact>,
    pub db: Database,
}

impl_record!(AppConfig {
    app_name: FieldMeta::new("APPName").default("app-name"),
    debug: FieldMeta::new("Debug"),
    contacts: FieldMeta::new("Contacts"),
    db: FieldMeta::new("DB"),
});

/// Loader pinned to the `development` environment with an empty env.
pub fn loader() -> ConfigLoader {
    loader_with_env(MapEnv::new())
}

pub fn loader_with_env(env: MapEnv) -> ConfigLoader {
    ConfigLoader::with_settings(quiet_settings()).with_env_source(env)
}

pub fn quiet_settings() -> Settings {
    Settings::new()
        .with_environment("development")
        .with_silent(true)
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
