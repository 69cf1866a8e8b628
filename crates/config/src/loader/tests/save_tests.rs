//! Tests for `save` and `setup_config`.
//!
//! Invariants:
//! - Saved files are written atomically and readable by `load`.
//! - On Unix, saved files are created with mode 0600.

use std::fs;

use tempfile::TempDir;

use super::{AppConfig, Contact, Database, loader, write};
use crate::loader::ConfigError;

fn sample() -> AppConfig {
    AppConfig {
        app_name: "saved".to_string(),
        debug: true,
        contacts: vec![Contact {
            name: "ada".to_string(),
            email: "ada@example.com".to_string(),
        }],
        db: Database {
            name: "orders".to_string(),
            user: "svc".to_string(),
            password: "pw".to_string(),
            port: 6543,
        },
    }
}

#[test]
fn test_saved_file_loads_back_for_every_format() {
    let dir = TempDir::new().unwrap();
    for name in ["app.yml", "app.yaml", "app.json", "app.toml"] {
        let path = dir.path().join(name);
        loader().save(&sample(), &path).unwrap();

        let mut loaded = AppConfig::default();
        loader().load(&mut loaded, &[&path]).unwrap();
        assert_eq!(loaded, sample(), "round trip through {name}");
    }
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("app.json");

    loader().save(&sample(), &path).unwrap();

    assert!(path.is_file());
}

#[test]
fn test_save_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.yml");

    loader().save(&sample(), &path).unwrap();

    let entries: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("app.yml")]);
}

#[test]
fn test_save_unknown_extension_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.ini");

    let err = loader().save(&sample(), &path).unwrap_err();

    assert!(matches!(err, ConfigError::UnknownFormat { .. }));
    assert!(!path.exists());
}

#[cfg(unix)]
#[test]
fn test_saved_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    loader().save(&sample(), &path).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[test]
fn test_setup_config_creates_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.yml");

    let mut config = AppConfig::default();
    let created = loader()
        .setup_config(&mut config, &path, |c| c.db.password = "generated".to_string())
        .unwrap();

    assert!(created);
    let mut reloaded = AppConfig::default();
    loader().load(&mut reloaded, &[&path]).unwrap();
    assert_eq!(reloaded.app_name, "app-name");
    assert_eq!(reloaded.db.port, 3306);
    assert_eq!(reloaded.db.password, "generated");
}

#[test]
fn test_setup_config_fills_empty_file() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "app.json", "");

    let mut config = AppConfig::default();
    let created = loader().setup_config(&mut config, &path, |_| {}).unwrap();

    assert!(created);
    assert!(fs::read_to_string(&path).unwrap().contains("\"app_name\": \"app-name\""));
}

#[test]
fn test_setup_config_keeps_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "app.yml", "app_name: mine\n");

    let mut config = AppConfig::default();
    let created = loader()
        .setup_config(&mut config, &path, |c| c.app_name = "overwritten".to_string())
        .unwrap();

    assert!(!created);
    assert_eq!(fs::read_to_string(&path).unwrap(), "app_name: mine\n");
    assert_eq!(config, AppConfig::default());
}
