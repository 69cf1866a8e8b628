//! Shared configuration handle and background reload.
//!
//! Responsibilities:
//! - Publish the current configuration through an `ArcSwap` so readers never block.
//! - Poll the resolved sources on a fixed interval and reload when they change.
//! - Stop the poll task on request or when the owning `SharedConfig` is dropped.
//!
//! Does NOT handle:
//! - The load pipeline itself (see `loader/builder.rs`).
//!
//! Invariants:
//! - Every reload starts from the record as it was before the first load, so values
//!   removed from a file do not linger.
//! - A failed reload is logged and leaves the published configuration untouched.
//! - The callback runs only after a new configuration has been published.
//! - Once cancelled, a watcher stays cancelled.

use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use arc_swap::ArcSwap;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::binder::BindMode;
use crate::loader::{ConfigError, ConfigLoader, ConfigRecord};
use crate::sources::ResolvedSources;

/// Invoked with the new configuration after each successful reload.
pub type ReloadCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Cancellation token shared between a [`ReloadHandle`] and its task.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Cancel token (idempotent).
    pub fn cancel(&self) {
        let was_cancelled = self.cancelled.swap(true, Ordering::SeqCst);
        if !was_cancelled {
            self.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Await cancellation.
    ///
    /// The `notified()` future is created before the flag is checked so a
    /// concurrent `cancel()` cannot be missed.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Controls a running reload task. Dropping the handle stops the task.
#[derive(Debug)]
pub struct ReloadHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReloadHandle {
    /// Request the task to stop after its current cycle.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Config watcher task ended abnormally");
        }
    }
}

impl Drop for ReloadHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A configuration value readable from many threads and swappable by the watcher.
pub struct SharedConfig<T> {
    current: Arc<ArcSwap<T>>,
    watcher: Option<ReloadHandle>,
}

impl<T> SharedConfig<T> {
    pub(crate) fn new(record: T) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(record)),
            watcher: None,
        }
    }

    pub(crate) fn attach(&mut self, watcher: ReloadHandle) {
        self.watcher = Some(watcher);
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// The underlying swap cell, for readers that outlive this handle's borrow.
    ///
    /// Reloads stop when this `SharedConfig` is dropped even if handles remain.
    pub fn handle(&self) -> Arc<ArcSwap<T>> {
        Arc::clone(&self.current)
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.as_ref().is_some_and(|w| !w.is_stopped())
    }

    /// Stop background reloading; the current value stays readable.
    pub fn stop_watching(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
    }

    /// Stop background reloading and wait for the task to exit.
    pub async fn shutdown(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.shutdown().await;
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SharedConfig<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConfig")
            .field("current", &self.current.load_full())
            .field("watching", &self.is_watching())
            .finish()
    }
}

/// State owned by one reload task.
pub(crate) struct ReloadWatcher<T> {
    pub(crate) loader: ConfigLoader,
    pub(crate) files: Vec<PathBuf>,
    pub(crate) pristine: T,
    pub(crate) last: ResolvedSources,
    pub(crate) current: Arc<ArcSwap<T>>,
    pub(crate) callback: Option<ReloadCallback<T>>,
}

impl<T> ReloadWatcher<T>
where
    T: ConfigRecord + Clone + Send + Sync + 'static,
{
    /// Spawn the poll loop on the current Tokio runtime.
    pub(crate) fn spawn(self) -> Result<ReloadHandle, ConfigError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        let token = CancellationToken::new();
        let task = runtime.spawn(self.run(token.clone()));
        Ok(ReloadHandle {
            token,
            task: Some(task),
        })
    }

    async fn run(mut self, token: CancellationToken) {
        let interval = self.loader.settings().reload_interval();
        tracing::info!(
            files = ?self.files,
            interval_ms = interval.as_millis() as u64,
            "Config watcher started"
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            if token.is_cancelled() {
                break;
            }
            self.cycle().await;
        }

        tracing::debug!("Config watcher stopped");
    }

    async fn cycle(&mut self) {
        let loader = self.loader.clone();
        let files = self.files.clone();
        let previous = self.last.clone();
        let mut scratch = self.pristine.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            loader
                .run(&mut scratch, &files, BindMode::Full, Some(&previous))
                .map(|changed| changed.map(|sources| (scratch, sources)))
        })
        .await;

        match outcome {
            Ok(Ok(Some((record, sources)))) => {
                self.last = sources;
                let record = Arc::new(record);
                self.current.store(Arc::clone(&record));
                tracing::info!(files = ?self.files, "Configuration reloaded");
                if let Some(callback) = &self.callback {
                    callback(&record);
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::error!(files = ?self.files, error = %e, "Failed to reload configuration");
            }
            Err(e) => {
                tracing::error!(error = %e, "Config reload task panicked");
            }
        }
    }
}
