//! Configuration source resolution.
//!
//! Responsibilities:
//! - Expand requested file paths into the files that actually exist: the base file,
//!   its environment-specific variant, or an `.example` fallback.
//! - Order the resolved files from lowest to highest precedence.
//! - Capture modification times so the reload watcher can detect changes.
//!
//! Does NOT handle:
//! - Reading or decoding file contents (see `format.rs`).
//! - Determining the active environment name (see `loader/settings.rs`).
//!
//! Invariants:
//! - Later-listed candidates win; within one candidate the environment variant wins over the base file.
//! - The `.example` fallback is used only when neither the base file nor its environment variant exists.
//! - Missing-file diagnostics are suppressed in silent mode and inside the watch loop.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::constants::EXAMPLE_SUFFIX;

/// Files selected for one load attempt, lowest precedence first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSources {
    files: Vec<PathBuf>,
    modified: HashMap<PathBuf, SystemTime>,
}

impl ResolvedSources {
    /// Files to decode, in decode order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Last-modified time of a resolved file.
    pub fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.modified.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.modified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modified.is_empty()
    }

    /// True when this set differs from `previous`: a different number of files,
    /// a file `previous` did not have, or a newer modification time.
    pub fn changed_since(&self, previous: &ResolvedSources) -> bool {
        if self.modified.len() != previous.modified.len() {
            return true;
        }
        self.modified
            .iter()
            .any(|(path, modified)| match previous.modified.get(path) {
                Some(before) => modified > before,
                None => true,
            })
    }

    fn push(&mut self, path: PathBuf, modified: SystemTime) {
        self.modified.insert(path.clone(), modified);
        self.files.push(path);
    }
}

/// Options controlling resolution diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions<'a> {
    pub environment: &'a str,
    pub silent: bool,
    pub watch_mode: bool,
}

/// Resolve `candidates` into the files to decode.
pub fn resolve_sources<P: AsRef<Path>>(candidates: &[P], options: ResolveOptions<'_>) -> ResolvedSources {
    let report_missing = !options.silent && !options.watch_mode;
    let mut resolved = ResolvedSources::default();

    for candidate in candidates {
        let candidate = candidate.as_ref();
        let mut found = false;

        if let Some(modified) = regular_file_mtime(candidate) {
            found = true;
            resolved.push(candidate.to_path_buf(), modified);
        }

        let env_variant = suffixed_path(candidate, options.environment);
        if let Some(modified) = regular_file_mtime(&env_variant) {
            found = true;
            resolved.push(env_variant, modified);
        }

        if found {
            continue;
        }

        let example = suffixed_path(candidate, EXAMPLE_SUFFIX);
        if let Some(modified) = regular_file_mtime(&example) {
            if report_missing {
                tracing::warn!(
                    path = %candidate.display(),
                    example = %example.display(),
                    "Failed to find configuration, using example file"
                );
            }
            resolved.push(example, modified);
        } else if report_missing {
            tracing::warn!(path = %candidate.display(), "Failed to find configuration");
        }
    }

    resolved
}

/// Insert `.<token>` before the extension of `path`, or append it when there is none.
///
/// `config.yml` becomes `config.<token>.yml`; `config` becomes `config.<token>`.
pub fn suffixed_path(path: &Path, token: &str) -> PathBuf {
    let Some(file_name) = path.file_name() else {
        return path.to_path_buf();
    };

    let file_name = Path::new(file_name);
    let suffixed = match (file_name.file_stem(), file_name.extension()) {
        (Some(stem), Some(extension)) => format!(
            "{}.{}.{}",
            stem.to_string_lossy(),
            token,
            extension.to_string_lossy()
        ),
        _ => format!("{}.{}", file_name.to_string_lossy(), token),
    };
    path.with_file_name(suffixed)
}

fn regular_file_mtime(path: &Path) -> Option<SystemTime> {
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    Some(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH))
}
