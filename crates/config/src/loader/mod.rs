//! Configuration loader facade.
//!
//! Responsibilities:
//! - Provide a builder-pattern `ConfigLoader` that layers defaults, files and
//!   environment variables onto a record.
//! - Define the loader `Settings`, the `EnvSource` lookup and the crate error type.
//! - Enforce `DOTENV_DISABLED` gate to prevent accidental dotenv loading in tests.
//!
//! Does NOT handle:
//! - Format decoding (see `format.rs`) or field binding (see `binder.rs`).
//!
//! Invariants / Assumptions:
//! - Environment variables take precedence over file values.
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.

mod builder;
mod env;
mod error;
mod settings;

pub use builder::{ConfigLoader, ConfigRecord};
pub use env::{EnvSource, MapEnv, ProcessEnv, env_var_or_none};
pub use error::ConfigError;
pub use settings::Settings;

#[cfg(test)]
mod tests;
