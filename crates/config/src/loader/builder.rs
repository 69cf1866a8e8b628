//! Builder-pattern facade over the load pipeline.
//!
//! Responsibilities:
//! - Run one load: resolve sources, decode each file in precedence order, then bind
//!   environment values, defaults and required checks.
//! - Offer `init` (defaults without required checks), `save` and `setup_config`.
//! - Start the background reload watcher for `load_shared` when auto-reload is enabled.
//! - Enforce the `DOTENV_DISABLED` gate before reading `.env` files.
//!
//! Does NOT handle:
//! - Per-format decoding rules (see `format.rs`).
//! - The reload loop itself (see `watcher.rs`).
//!
//! Invariants / Assumptions:
//! - Precedence, lowest to highest: field defaults < files in resolution order < environment.
//! - A failed decode leaves earlier files' values applied; the caller receives the error.
//! - `save` writes through a temporary sibling and renames it into place.
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::env::{EnvSource, ProcessEnv};
use super::error::ConfigError;
use super::settings::Settings;
use crate::binder::{BindMode, FieldBinder};
use crate::constants::ENV_DOTENV_DISABLED;
use crate::format::{Format, decode_into};
use crate::record::Record;
use crate::sources::{ResolveOptions, ResolvedSources, resolve_sources};
use crate::watcher::{ReloadCallback, ReloadWatcher, SharedConfig};

/// A configuration record the loader can fill.
///
/// Implemented for every type that is a [`Record`] and round-trips through serde.
pub trait ConfigRecord: Record + Serialize + DeserializeOwned + Clone + fmt::Debug {}

impl<T> ConfigRecord for T where T: Record + Serialize + DeserializeOwned + Clone + fmt::Debug {}

/// Loads configuration records from files and environment variables.
#[derive(Clone)]
pub struct ConfigLoader {
    settings: Settings,
    env: Arc<dyn EnvSource>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ConfigLoader {
    /// Create a loader with default settings reading the process environment.
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Create a loader whose settings come from `LAYERED_CONFIG_*` variables.
    pub fn from_env() -> Self {
        Self::with_settings(Settings::from_env())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            env: Arc::new(ProcessEnv),
        }
    }

    /// Replace the environment lookup used during binding.
    pub fn with_env_source(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Check if dotenv loading is disabled via environment variable.
    fn dotenv_disabled() -> bool {
        matches!(
            std::env::var(ENV_DOTENV_DISABLED).ok().as_deref(),
            Some("true") | Some("1")
        )
    }

    /// Load environment variables from a `.env` file in the working directory
    /// or one of its parents.
    ///
    /// Variables already present in the process environment are kept. Skipped
    /// entirely when `DOTENV_DISABLED` is "true" or "1".
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The `.env` file exists but has invalid syntax (`ConfigError::DotenvParse`)
    /// - The `.env` file exists but cannot be read due to I/O errors (`ConfigError::DotenvIo`)
    ///
    /// Missing `.env` files are silently ignored (returns `Ok(self)`).
    pub fn load_dotenv(self) -> Result<Self, ConfigError> {
        if Self::dotenv_disabled() {
            return Ok(self);
        }
        Self::dotenv_result(dotenvy::dotenv().map(|_| ()))?;
        Ok(self)
    }

    /// Like [`load_dotenv`](Self::load_dotenv), reading the given file.
    pub fn load_dotenv_from(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if Self::dotenv_disabled() {
            return Ok(self);
        }
        Self::dotenv_result(dotenvy::from_path(path.as_ref()))?;
        Ok(self)
    }

    fn dotenv_result(result: Result<(), dotenvy::Error>) -> Result<(), ConfigError> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if Self::is_not_found(&e) => Ok(()),
            Err(dotenvy::Error::LineParse(_, idx)) => {
                Err(ConfigError::DotenvParse { error_index: idx })
            }
            Err(dotenvy::Error::Io(io_err)) => Err(ConfigError::DotenvIo {
                kind: io_err.kind(),
            }),
            Err(_) => Err(ConfigError::DotenvUnknown),
        }
    }

    /// Check if a dotenv error indicates the file was not found.
    fn is_not_found(err: &dotenvy::Error) -> bool {
        matches!(
            err,
            dotenvy::Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// The files a load of `files` would decode, lowest precedence first.
    pub fn resolve_sources<P: AsRef<Path>>(&self, files: &[P]) -> ResolvedSources {
        let environment = self.settings.environment();
        resolve_sources(files, self.resolve_options(&environment, false))
    }

    /// Fill `record` from `files` and the environment.
    ///
    /// This is a one-shot load: `auto_reload` is ignored here and only takes
    /// effect through [`load_shared`](Self::load_shared).
    ///
    /// # Errors
    ///
    /// Fails on unreadable or undecodable files, unmatched keys in strict mode,
    /// unparsable env values or defaults, and blank required fields.
    pub fn load<T, P>(&self, record: &mut T, files: &[P]) -> Result<(), ConfigError>
    where
        T: ConfigRecord,
        P: AsRef<Path>,
    {
        if self.settings.auto_reload {
            tracing::warn!("Auto-reload is enabled but load() never reloads; use load_shared()");
        }
        self.run(record, files, BindMode::Full, None).map(|_| ())
    }

    /// Like [`load`](Self::load) but blank required fields are left untouched.
    pub fn init<T, P>(&self, record: &mut T, files: &[P]) -> Result<(), ConfigError>
    where
        T: ConfigRecord,
        P: AsRef<Path>,
    {
        self.run(record, files, BindMode::InitOnly, None).map(|_| ())
    }

    /// Load `record` and wrap it for shared, hot-swappable access.
    ///
    /// With auto-reload enabled a background task re-runs the load every
    /// [`Settings::reload_interval`] and publishes each successful result.
    ///
    /// # Errors
    ///
    /// Returns the initial load error, or `ConfigError::NoRuntime` when auto-reload
    /// is enabled outside a Tokio runtime.
    pub fn load_shared<T, P>(&self, record: T, files: &[P]) -> Result<SharedConfig<T>, ConfigError>
    where
        T: ConfigRecord + Clone + Send + Sync + 'static,
        P: AsRef<Path>,
    {
        self.start_shared(record, files, None)
    }

    /// Like [`load_shared`](Self::load_shared), invoking `callback` after every reload.
    pub fn load_shared_with_callback<T, P, F>(
        &self,
        record: T,
        files: &[P],
        callback: F,
    ) -> Result<SharedConfig<T>, ConfigError>
    where
        T: ConfigRecord + Clone + Send + Sync + 'static,
        P: AsRef<Path>,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.start_shared(record, files, Some(Arc::new(callback)))
    }

    fn start_shared<T, P>(
        &self,
        mut record: T,
        files: &[P],
        callback: Option<ReloadCallback<T>>,
    ) -> Result<SharedConfig<T>, ConfigError>
    where
        T: ConfigRecord + Clone + Send + Sync + 'static,
        P: AsRef<Path>,
    {
        let pristine = record.clone();
        let files: Vec<PathBuf> = files.iter().map(|f| f.as_ref().to_path_buf()).collect();
        let sources = self
            .run(&mut record, &files, BindMode::Full, None)?
            .unwrap_or_default();

        let mut shared = SharedConfig::new(record);
        if self.settings.auto_reload {
            let watcher = ReloadWatcher {
                loader: self.clone(),
                files,
                pristine,
                last: sources,
                current: shared.handle(),
                callback,
            };
            shared.attach(watcher.spawn()?);
        }
        Ok(shared)
    }

    /// Run the pipeline once.
    ///
    /// With `previous` set the run is a watch cycle: diagnostics are quieter and
    /// `Ok(None)` is returned when the resolved sources have not changed.
    pub(crate) fn run<T, P>(
        &self,
        record: &mut T,
        files: &[P],
        mode: BindMode,
        previous: Option<&ResolvedSources>,
    ) -> Result<Option<ResolvedSources>, ConfigError>
    where
        T: ConfigRecord,
        P: AsRef<Path>,
    {
        let watch_mode = previous.is_some();
        let environment = self.settings.environment();
        if self.settings.diagnostics() && !watch_mode {
            tracing::info!(environment = %environment, "Current environment");
        }

        let sources = resolve_sources(files, self.resolve_options(&environment, watch_mode));
        if let Some(previous) = previous
            && !sources.changed_since(previous)
        {
            return Ok(None);
        }

        let result = self.decode_and_bind(record, &sources, mode);
        if self.settings.diagnostics() {
            if let Err(e) = &result {
                tracing::warn!(error = %e, "Failed to load configuration");
            }
            tracing::debug!(config = ?record, "Configuration");
        }
        result.map(|()| Some(sources))
    }

    fn decode_and_bind<T: ConfigRecord>(
        &self,
        record: &mut T,
        sources: &ResolvedSources,
        mode: BindMode,
    ) -> Result<(), ConfigError> {
        for path in sources.files() {
            if self.settings.diagnostics() {
                tracing::info!(path = %path.display(), "Loading configuration file");
            }
            let bytes = std::fs::read(path).map_err(|source| ConfigError::FileRead {
                path: path.clone(),
                source,
            })?;
            decode_into(record, &bytes, path, self.settings.error_on_unmatched_keys)?;
        }

        let prefix = self.settings.env_prefix_path();
        FieldBinder::new(self.env.as_ref(), mode)
            .with_diagnostics(self.settings.debug, self.settings.verbose)
            .bind(record, &prefix)
    }

    fn resolve_options<'a>(&self, environment: &'a str, watch_mode: bool) -> ResolveOptions<'a> {
        ResolveOptions {
            environment,
            silent: self.settings.silent,
            watch_mode,
        }
    }

    /// Write `record` to `path` in the format named by its extension.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownFormat` for unsupported extensions, `ConfigError::Encode`
    /// when serialization fails, `ConfigError::Io` for filesystem failures.
    pub fn save<T: Serialize>(&self, record: &T, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let format = Format::from_path(path).ok_or_else(|| ConfigError::UnknownFormat {
            path: path.to_path_buf(),
        })?;
        let content = format.encode(record).map_err(|message| ConfigError::Encode {
            path: path.to_path_buf(),
            message,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = temp_sibling(path);
        if let Err(e) = write_private(&temp_path, content.as_bytes()) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        if let Err(e) = std::fs::rename(&temp_path, path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), format = %format, "Config saved atomically");
        Ok(())
    }

    /// Create `path` from defaults when it is missing or empty.
    ///
    /// Runs [`init`](Self::init) against `path`, lets `init_values` adjust the
    /// record, then saves it. Returns `true` when a file was written.
    pub fn setup_config<T, F>(
        &self,
        record: &mut T,
        path: impl AsRef<Path>,
        init_values: F,
    ) -> Result<bool, ConfigError>
    where
        T: ConfigRecord,
        F: FnOnce(&mut T),
    {
        let path = path.as_ref();
        let has_content = std::fs::metadata(path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if has_content {
            return Ok(false);
        }

        self.init(record, &[path])?;
        init_values(record);
        self.save(record, path)?;
        tracing::info!(path = %path.display(), "Created configuration file");
        Ok(true)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(crate::constants::SAVED_FILE_MODE);
    }
    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.sync_all()
}
