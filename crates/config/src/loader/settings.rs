//! Loader settings.
//!
//! Responsibilities:
//! - Hold the options that steer a load: environment name, env prefix, verbosity,
//!   silent mode, auto-reload and strict decoding.
//! - Read those options from `LAYERED_CONFIG_*` variables when asked via `Settings::from_env()`.
//! - Detect the active environment name.
//!
//! Does NOT handle:
//! - Reading configuration files or binding fields (see `builder.rs`).
//!
//! Invariants:
//! - Settings never read the process environment implicitly; only `from_env()` does.
//! - An env prefix of `-` disables prefixing; an unset prefix means `Config`.
//! - A zero auto-reload interval means one second.

use std::time::Duration;

use super::env::env_var_or_none;
use crate::constants::{
    DEFAULT_AUTO_RELOAD_INTERVAL, DEFAULT_ENV_PREFIX, DEFAULT_ENVIRONMENT, DISABLED_ENV_PREFIX,
    ENV_DEBUG_MODE, ENV_ENVIRONMENT, ENV_PREFIX, ENV_SILENT_MODE, ENV_VERBOSE_MODE,
    TEST_ENVIRONMENT,
};

/// Options for a [`ConfigLoader`](super::ConfigLoader).
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Active environment name; detected when unset.
    pub environment: Option<String>,
    /// Prefix for synthesized env var names; `-` disables prefixing.
    pub env_prefix: Option<String>,
    pub debug: bool,
    pub verbose: bool,
    /// Suppress "file not found" and "using example" diagnostics.
    pub silent: bool,
    /// Watch sources and reload in the background (see `ConfigLoader::load_shared`).
    pub auto_reload: bool,
    pub auto_reload_interval: Duration,
    /// Fail when a file contains keys that match no field.
    pub error_on_unmatched_keys: bool,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings seeded from the `LAYERED_CONFIG_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            environment: env_var_or_none(ENV_ENVIRONMENT),
            env_prefix: env_var_or_none(ENV_PREFIX),
            debug: env_var_or_none(ENV_DEBUG_MODE).is_some(),
            verbose: env_var_or_none(ENV_VERBOSE_MODE).is_some(),
            silent: env_var_or_none(ENV_SILENT_MODE).is_some(),
            ..Self::default()
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_auto_reload(mut self, auto_reload: bool) -> Self {
        self.auto_reload = auto_reload;
        self
    }

    pub fn with_auto_reload_interval(mut self, interval: Duration) -> Self {
        self.auto_reload_interval = interval;
        self
    }

    pub fn with_error_on_unmatched_keys(mut self, strict: bool) -> Self {
        self.error_on_unmatched_keys = strict;
        self
    }

    /// The active environment name.
    ///
    /// Uses the configured name, else `test` inside a test binary, else `development`.
    pub fn environment(&self) -> String {
        if let Some(environment) = self.environment.as_deref().filter(|e| !e.is_empty()) {
            return environment.to_string();
        }

        let running_tests = std::env::args_os()
            .next()
            .is_some_and(|arg0| is_test_binary(&arg0.to_string_lossy()));
        if running_tests {
            TEST_ENVIRONMENT.to_string()
        } else {
            DEFAULT_ENVIRONMENT.to_string()
        }
    }

    /// Binding path prefix derived from `env_prefix`.
    pub fn env_prefix_path(&self) -> Vec<String> {
        match self.env_prefix.as_deref().filter(|p| !p.is_empty()) {
            Some(DISABLED_ENV_PREFIX) => Vec::new(),
            Some(prefix) => vec![prefix.to_string()],
            None => vec![DEFAULT_ENV_PREFIX.to_string()],
        }
    }

    /// Effective period between reload checks.
    pub fn reload_interval(&self) -> Duration {
        if self.auto_reload_interval.is_zero() {
            DEFAULT_AUTO_RELOAD_INTERVAL
        } else {
            self.auto_reload_interval
        }
    }

    /// True when informational diagnostics should be emitted.
    pub(crate) fn diagnostics(&self) -> bool {
        self.debug || self.verbose
    }
}

/// True when `program` looks like a test executable.
pub(crate) fn is_test_binary(program: &str) -> bool {
    program.contains("_test") || program.ends_with(".test")
}
