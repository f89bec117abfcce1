//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (optional; built-in defaults apply when it is absent), then applies
//! `EXELOKA_API_URL`, `EXELOKA_WORK_DIR` and `EXELOKA_LOG_LEVEL` overrides.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Legacy static-site API configuration (`[legacy]`).
#[derive(Debug, Clone)]
pub struct LegacyConfig {
    /// Origin + prefix of the `*.php` endpoints.
    pub base_url: String,
    /// Route every call to the fixture router without touching the network.
    pub use_mock: bool,
    /// Route to the fixture router after a transport-level failure.
    pub mock_fallback: bool,
}

/// Fully-resolved client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Dashboard REST API root, no trailing slash.
    pub base_url: String,
    /// Per-request wall-clock timeout.
    pub timeout_seconds: u64,
    /// Directory holding `session.json` (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub legacy: LegacyConfig,
}

impl Config {
    /// Path of the persisted session file.
    pub fn session_path(&self) -> PathBuf {
        self.work_dir.join("session.json")
    }
}

impl Default for Config {
    fn default() -> Self {
        let raw = RawConfig::default();
        resolve(raw, &Overrides::default())
    }
}

/// Env / CLI overrides applied on top of the TOML values.
/// Tests pass these directly instead of mutating env vars.
#[derive(Debug, Default, Clone)]
pub struct Overrides<'a> {
    pub api_url: Option<&'a str>,
    pub work_dir: Option<&'a str>,
    pub log_level: Option<&'a str>,
}

/// Raw TOML shape, before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    client: RawClient,
    #[serde(default)]
    legacy: RawLegacy,
}

#[derive(Deserialize)]
struct RawClient {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_work_dir")]
    work_dir: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawClient {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            work_dir: default_work_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Deserialize)]
struct RawLegacy {
    #[serde(default = "default_legacy_base_url")]
    base_url: String,
    /// Defaults to `false`: the real endpoints are tried first.
    #[serde(default = "default_false")]
    use_mock: bool,
    /// Defaults to `true`: fixtures answer when the PHP host is unreachable.
    #[serde(default = "default_true")]
    mock_fallback: bool,
}

impl Default for RawLegacy {
    fn default() -> Self {
        Self {
            base_url: default_legacy_base_url(),
            use_mock: false,
            mock_fallback: true,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_work_dir() -> String {
    "~/.exeloka".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_legacy_base_url() -> String {
    "http://localhost/exeloka/v1/api".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Load config from `config_path` (or `config/default.toml`), then apply
/// env-var overrides.
///
/// An explicit path must exist; the default path is optional.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let api_url = env::var("EXELOKA_API_URL").ok();
    let work_dir = env::var("EXELOKA_WORK_DIR").ok();
    let log_level = env::var("EXELOKA_LOG_LEVEL").ok();
    let overrides = Overrides {
        api_url: api_url.as_deref(),
        work_dir: work_dir.as_deref(),
        log_level: log_level.as_deref(),
    };

    match config_path {
        Some(path) => load_from(Path::new(path), &overrides),
        None => {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            if path.exists() {
                load_from(path, &overrides)
            } else {
                Ok(resolve(RawConfig::default(), &overrides))
            }
        }
    }
}

/// Load an explicit path with the given overrides.
pub fn load_from(path: &Path, overrides: &Overrides<'_>) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if parsed.client.timeout_seconds == 0 {
        return Err(AppError::Config(format!(
            "{}: [client].timeout_seconds must be greater than zero",
            path.display()
        )));
    }

    Ok(resolve(parsed, overrides))
}

fn resolve(raw: RawConfig, overrides: &Overrides<'_>) -> Config {
    let c = raw.client;
    let base_url = overrides.api_url.unwrap_or(&c.base_url);
    let work_dir = expand_home(overrides.work_dir.unwrap_or(&c.work_dir));
    let log_level = overrides.log_level.unwrap_or(&c.log_level).to_string();

    Config {
        base_url: base_url.trim_end_matches('/').to_string(),
        timeout_seconds: c.timeout_seconds,
        work_dir,
        log_level,
        legacy: LegacyConfig {
            base_url: raw.legacy.base_url.trim_end_matches('/').to_string(),
            use_mock: raw.legacy.use_mock,
            mock_fallback: raw.legacy.mock_fallback,
        },
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests: points at `base_url`, stores under `work_dir`.
#[cfg(test)]
impl Config {
    pub fn test_default(base_url: &str, work_dir: &Path) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds: 2,
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            legacy: LegacyConfig {
                base_url: "http://127.0.0.1:9/v1/api".into(),
                use_mock: true,
                mock_fallback: true,
            },
        }
    }
}
