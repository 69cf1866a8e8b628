//! Tests for basic `load` behavior.
//!
//! Responsibilities:
//! - Test decoding of each supported format onto a record.
//! - Test that env values and defaults layer over file values.
//! - Test required-field failures and error propagation.

use std::io;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use super::{AppConfig, Contact, loader, loader_with_env, write};
use crate::impl_record;
use crate::loader::{ConfigError, ConfigLoader, MapEnv, Settings};
use crate::record::FieldMeta;

const YAML: &str = "\
app_name: demo
db:
  name: orders
  password: hunter2
contacts:
  - name: ada
    email: ada@example.com
";

#[test]
fn test_load_yaml_applies_file_and_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "app.yml", YAML);

    let mut config = AppConfig::default();
    loader().load(&mut config, &[&path]).unwrap();

    assert_eq!(config.app_name, "demo");
    assert_eq!(config.db.name, "orders");
    assert_eq!(config.db.user, "root");
    assert_eq!(config.db.port, 3306);
    assert_eq!(
        config.contacts,
        vec![Contact {
            name: "ada".to_string(),
            email: "ada@example.com".to_string(),
        }]
    );
}

#[test]
fn test_load_toml() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "app.toml",
        "app_name = \"toml-app\"\n\n[db]\npassword = \"pw\"\nport = 5432\n",
    );

    let mut config = AppConfig::default();
    loader().load(&mut config, &[&path]).unwrap();

    assert_eq!(config.app_name, "toml-app");
    assert_eq!(config.db.port, 5432);
}

#[test]
fn test_load_json() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "app.json",
        r#"{"debug": true, "db": {"password": "pw", "user": "admin"}}"#,
    );

    let mut config = AppConfig::default();
    loader().load(&mut config, &[&path]).unwrap();

    assert!(config.debug);
    assert_eq!(config.db.user, "admin");
    assert_eq!(config.app_name, "app-name");
}

#[test]
fn test_load_without_extension_probes_formats() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "appconfig", "db:\n  password: probed\n");

    let mut config = AppConfig::default();
    loader().load(&mut config, &[&path]).unwrap();

    assert_eq!(config.db.password, "probed");
}

#[test]
fn test_env_overrides_file_value() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "app.yml", "db:\n  password: pw\n  port: 80\n");
    let env = MapEnv::new().with_var("CONFIG_DB_PORT", "9090");

    let mut config = AppConfig::default();
    loader_with_env(env).load(&mut config, &[&path]).unwrap();

    assert_eq!(config.db.port, 9090);
}

#[test]
fn test_custom_env_prefix() {
    let env = MapEnv::new()
        .with_var("SHOP_DB_PASSWORD", "from-env")
        .with_var("CONFIG_DB_PASSWORD", "ignored");
    let loader = ConfigLoader::with_settings(super::quiet_settings().with_env_prefix("SHOP"))
        .with_env_source(env);

    let mut config = AppConfig::default();
    loader.load::<_, &str>(&mut config, &[]).unwrap();

    assert_eq!(config.db.password, "from-env");
}

#[test]
fn test_disabled_env_prefix() {
    let env = MapEnv::new().with_var("DB_PASSWORD", "bare");
    let loader = ConfigLoader::with_settings(super::quiet_settings().with_env_prefix("-"))
        .with_env_source(env);

    let mut config = AppConfig::default();
    loader.load::<_, &str>(&mut config, &[]).unwrap();

    assert_eq!(config.db.password, "bare");
}

#[test]
fn test_sequence_from_env_without_files() {
    let env = MapEnv::new()
        .with_var("CONFIG_DB_PASSWORD", "pw")
        .with_var("CONFIG_CONTACTS_0_NAME", "a")
        .with_var("CONFIG_CONTACTS_0_EMAIL", "a@example.com")
        .with_var("CONFIG_CONTACTS_1_NAME", "b")
        .with_var("CONFIG_CONTACTS_1_EMAIL", "b@example.com");

    let mut config = AppConfig::default();
    loader_with_env(env).load::<_, &str>(&mut config, &[]).unwrap();

    let names: Vec<&str> = config.contacts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_missing_required_field_fails() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "app.yml", "app_name: demo\n");

    let mut config = AppConfig::default();
    let err = loader().load(&mut config, &[&path]).unwrap_err();

    assert!(matches!(err, ConfigError::RequiredField { ref field } if field == "Password"));
    // Values decoded before the failure stay applied.
    assert_eq!(config.app_name, "demo");
}

#[test]
fn test_required_element_field_in_file_sequence() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "app.yml",
        "db:\n  password: pw\ncontacts:\n  - name: no-email\n",
    );

    let mut config = AppConfig::default();
    let err = loader().load(&mut config, &[&path]).unwrap_err();

    assert!(matches!(err, ConfigError::RequiredField { ref field } if field == "Email"));
}

#[test]
fn test_missing_files_are_not_errors() {
    let dir = TempDir::new().unwrap();
    let env = MapEnv::new().with_var("CONFIG_DB_PASSWORD", "pw");

    let mut config = AppConfig::default();
    loader_with_env(env)
        .load(&mut config, &[dir.path().join("absent.yml")])
        .unwrap();

    assert_eq!(config.app_name, "app-name");
}

#[test]
fn test_malformed_file_is_decode_error() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "app.json", "{ \"db\": ");

    let mut config = AppConfig::default();
    let err = loader().load(&mut config, &[&path]).unwrap_err();

    assert!(matches!(err, ConfigError::Decode { ref path, .. } if path.ends_with("app.json")));
}

#[test]
fn test_unknown_extension_is_probed() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "app.conf", "{\"db\": {\"password\": \"json-in-conf\"}}");

    let mut config = AppConfig::default();
    loader().load(&mut config, &[&path]).unwrap();

    assert_eq!(config.db.password, "json-in-conf");
}

#[test]
fn test_diagnostics_do_not_change_results() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "app.yml", YAML);
    let loader = ConfigLoader::with_settings(
        Settings::new()
            .with_environment("development")
            .with_debug(true)
            .with_verbose(true),
    )
    .with_env_source(MapEnv::new());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("layered_config=debug"))
        .with_test_writer()
        .finish();

    let mut config = AppConfig::default();
    tracing::subscriber::with_default(subscriber, || {
        loader.load(&mut config, &[&path]).unwrap();
    });

    assert_eq!(config.db.password, "hunter2");
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Worker {
    name: String,
    #[serde(skip)]
    runtime_id: u64,
}

impl_record!(Worker {
    name: FieldMeta::new("Name"),
});

#[test]
fn test_load_keeps_values_of_skipped_fields() {
    let dir = TempDir::new().unwrap();
    let base = write(dir.path(), "worker.yml", "name: x
");
    let overlay = write(dir.path(), "worker.json", r#"{"name": "y"}"#);

    let mut worker = Worker {
        runtime_id: 42,
        ..Worker::default()
    };
    loader().load(&mut worker, &[&base, &overlay]).unwrap();

    assert_eq!(worker.name, "y");
    assert_eq!(worker.runtime_id, 42);
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn warnings_from_load(auto_reload: bool) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let loader = ConfigLoader::with_settings(super::quiet_settings().with_auto_reload(auto_reload))
        .with_env_source(MapEnv::new().with_var("CONFIG_DB_PASSWORD", "pw"));
    let mut config = AppConfig::default();
    tracing::subscriber::with_default(subscriber, || {
        loader.load::<_, &str>(&mut config, &[]).unwrap();
    });
    logs.text()
}

#[test]
fn test_load_warns_that_auto_reload_needs_load_shared() {
    assert!(warnings_from_load(true).contains("use load_shared()"));
    assert!(!warnings_from_load(false).contains("load_shared"));
}
