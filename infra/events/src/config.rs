use config::{Config, Environment, File};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment prefix for configuration overrides (`HERALD__DISPATCHER__DEBUG=true`).
pub const ENV_PREFIX: &str = "HERALD";

/// Custom error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error{}: {source}", crate::error::format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Process-wide dispatcher settings.
///
/// Set once when the [`Dispatcher`](crate::Dispatcher) is built and read-only
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Raises dispatch diagnostics (registrations, emissions, listener failures)
    /// from `TRACE` to `DEBUG`.
    pub debug: bool,
    /// Advisory listener count per key. Exceeding it is reported, never rejected.
    pub max_listeners: Option<usize>,
}

/// Reads the application settings `T`, typically a struct nesting a
/// [`DispatcherConfig`] under `dispatcher`.
///
/// `path` names the settings file; `None` means `herald` in the working
/// directory, looked up as `herald.toml`, `herald.json`, `herald.yaml` and so on.
/// Any `HERALD__<SECTION>__<FIELD>` variable then replaces the matching value,
/// so `HERALD__DISPATCHER__DEBUG=true` turns on dispatch diagnostics without
/// touching the file. The `dispatcher` section rejects unknown fields, which
/// turns a misspelt `max_listeners` into an error instead of a silent default.
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file is missing or malformed, or if the
/// merged values do not deserialize into `T` (including unknown `dispatcher` fields).
///
/// # Example
/// ```rust
/// use herald_events::{DispatcherConfig, load_config};
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     #[serde(default)]
///     dispatcher: DispatcherConfig,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// assert!(!cfg.dispatcher.debug);
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let effective_path = path.map_or_else(|| PathBuf::from("herald"), |p| p.as_ref().to_path_buf());

    info!("Loading config from {}", effective_path.display());

    Config::builder()
        .add_source(File::from(effective_path.as_path()).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX).separator("__").convert_case(config::Case::Snake),
        )
        .build()
        .map_err(|source| ConfigError::Config {
            source,
            context: Some("Failed to build config".into()),
        })?
        .try_deserialize::<T>()
        .map_err(|source| ConfigError::Config {
            source,
            context: Some("Failed to deserialize config".into()),
        })
}
