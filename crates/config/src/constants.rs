//! Centralized constants for the layered configuration loader.
//!
//! This module contains default values and well-known variable names used
//! across modules to avoid magic string duplication.

use std::time::Duration;

// =============================================================================
// Binding Defaults
// =============================================================================

/// Prefix used for synthesized environment variable names when none is configured.
pub const DEFAULT_ENV_PREFIX: &str = "Config";

/// Sentinel prefix value that disables prefixing entirely.
pub const DISABLED_ENV_PREFIX: &str = "-";

/// Separator between binding path segments in environment variable names.
pub const ENV_PATH_SEPARATOR: &str = "_";

// =============================================================================
// Source Resolution
// =============================================================================

/// Environment name used when nothing else selects one.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Environment name selected when running inside a test binary.
pub const TEST_ENVIRONMENT: &str = "test";

/// Suffix token of the fallback file used when a configuration file is missing.
pub const EXAMPLE_SUFFIX: &str = "example";

// =============================================================================
// Auto Reload
// =============================================================================

/// Default period between reload checks.
pub const DEFAULT_AUTO_RELOAD_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// Settings Environment Variables
// =============================================================================

/// Selects the active environment name.
pub const ENV_ENVIRONMENT: &str = "LAYERED_CONFIG_ENV";

/// Overrides the environment variable prefix.
pub const ENV_PREFIX: &str = "LAYERED_CONFIG_ENV_PREFIX";

/// Enables debug diagnostics when non-empty.
pub const ENV_DEBUG_MODE: &str = "LAYERED_CONFIG_DEBUG_MODE";

/// Enables verbose diagnostics when non-empty.
pub const ENV_VERBOSE_MODE: &str = "LAYERED_CONFIG_VERBOSE_MODE";

/// Suppresses missing-file diagnostics when non-empty.
pub const ENV_SILENT_MODE: &str = "LAYERED_CONFIG_SILENT_MODE";

/// Disables `.env` loading when set to `1` or `true`.
pub const ENV_DOTENV_DISABLED: &str = "DOTENV_DISABLED";

// =============================================================================
// Persistence
// =============================================================================

/// Unix permission bits for files written by `save`.
#[cfg(unix)]
pub const SAVED_FILE_MODE: u32 = 0o600;
