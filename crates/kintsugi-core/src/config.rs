//! Configuration.
//!
//! Every setting has a working default, so the YAML file is optional. Lookup
//! order: `--config` flag, the `KINTSUGI_CONFIG` env var, `./kintsugi.yaml`,
//! then the user and system config directories. An explicitly passed path
//! that does not exist is an error; finding nothing is not.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{KintsugiError, Result};

/// Upper bound on parallel page workers.
pub const MAX_JOBS: usize = 16;

mod defaults {
    pub(super) fn output_dir() -> String {
        "./comics".to_string()
    }

    pub(super) fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36"
            .to_string()
    }

    pub(super) fn image_host() -> String {
        "https://j1z76bln.user.webaccel.jp".to_string()
    }

    pub(super) fn jobs() -> usize {
        4
    }

    pub(super) fn connect_timeout_secs() -> u64 {
        30
    }

    pub(super) fn read_timeout_secs() -> u64 {
        120
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KintsugiConfig {
    /// Root directory series folders are created under.
    #[serde(default = "defaults::output_dir")]
    pub output_dir: String,
    /// User-Agent header sent with every request.
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
    /// Image CDN host; the comics path layout is appended to it.
    #[serde(default = "defaults::image_host")]
    pub image_host: String,
    /// Parallel page workers per chapter (clamped to 1..=MAX_JOBS).
    #[serde(default = "defaults::jobs")]
    pub jobs: usize,
    #[serde(default = "defaults::connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "defaults::read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl Default for KintsugiConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
            user_agent: defaults::user_agent(),
            image_host: defaults::image_host(),
            jobs: defaults::jobs(),
            connect_timeout_secs: defaults::connect_timeout_secs(),
            read_timeout_secs: defaults::read_timeout_secs(),
        }
    }
}

impl KintsugiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Output root with a leading `~` expanded.
    pub fn output_dir_path(&self) -> PathBuf {
        PathBuf::from(expand_tilde(&self.output_dir))
    }

    /// Clamp out-of-range values with a warning instead of refusing to run.
    pub fn validate(&mut self) {
        if self.jobs == 0 {
            tracing::warn!("jobs must be at least 1, raising");
            self.jobs = 1;
        }
        if self.jobs > MAX_JOBS {
            tracing::warn!(configured = self.jobs, cap = MAX_JOBS, "jobs exceeds cap, clamping");
            self.jobs = MAX_JOBS;
        }
        if self.user_agent.trim().is_empty() {
            tracing::warn!("user_agent is empty, using the default");
            self.user_agent = defaults::user_agent();
        }
    }
}

/// Expand a leading `~` or `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    let Some(home) = dirs::home_dir() else {
        return path.to_string();
    };
    match path.strip_prefix('~') {
        Some("") => home.to_string_lossy().into_owned(),
        Some(rest) if rest.starts_with('/') => {
            home.join(&rest[1..]).to_string_lossy().into_owned()
        }
        _ => path.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Config file resolution
// ---------------------------------------------------------------------------

/// Tracks where the config file was found.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Explicitly passed via `--config`.
    Flag(PathBuf),
    /// Set via the `KINTSUGI_CONFIG` env var.
    Environment(PathBuf),
    /// Found by searching standard locations.
    Search { path: PathBuf, level: &'static str },
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Flag(p) | ConfigSource::Environment(p) => p,
            ConfigSource::Search { path, .. } => path,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSource::Flag(_) => "--config",
            ConfigSource::Environment(_) => "KINTSUGI_CONFIG",
            ConfigSource::Search { level, .. } => level,
        };
        write!(f, "{} ({label})", self.path().display())
    }
}

#[cfg(windows)]
fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir()
}

#[cfg(not(windows))]
fn user_config_dir() -> Option<PathBuf> {
    // A relative XDG_CONFIG_HOME is invalid and gets ignored.
    match std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        Some(p) if p.is_absolute() => Some(p),
        _ => dirs::home_dir().map(|h| h.join(".config")),
    }
}

#[cfg(windows)]
fn system_config_path() -> PathBuf {
    std::env::var_os("PROGRAMDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"))
        .join("kintsugi")
        .join("config.yaml")
}

#[cfg(not(windows))]
fn system_config_path() -> PathBuf {
    PathBuf::from("/etc/kintsugi/config.yaml")
}

/// Returns search locations in priority order: project, user, system.
pub fn default_config_search_paths() -> Vec<(PathBuf, &'static str)> {
    let mut paths = vec![(PathBuf::from("kintsugi.yaml"), "project")];
    if let Some(base) = user_config_dir() {
        paths.push((base.join("kintsugi").join("config.yaml"), "user"));
    }
    paths.push((system_config_path(), "system"));
    paths
}

/// Resolve which config file to use.
///
/// Priority: CLI arg > `KINTSUGI_CONFIG` env var > first existing file from
/// the search paths. Returns `None` if nothing is found.
pub fn resolve_config_path(cli_config: Option<&str>) -> Option<ConfigSource> {
    if let Some(path) = cli_config {
        return Some(ConfigSource::Flag(PathBuf::from(path)));
    }
    match std::env::var("KINTSUGI_CONFIG") {
        Ok(val) if !val.is_empty() => return Some(ConfigSource::Environment(PathBuf::from(val))),
        _ => {}
    }
    default_config_search_paths()
        .into_iter()
        .find(|(path, _)| path.exists())
        .map(|(path, level)| ConfigSource::Search { path, level })
}

/// Load and validate one config file.
pub fn load_config(path: &Path) -> Result<KintsugiConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| KintsugiError::Config(format!("cannot read '{}': {e}", path.display())))?;
    let mut cfg: KintsugiConfig = serde_yaml::from_str(&contents)
        .map_err(|e| KintsugiError::Config(format!("invalid config '{}': {e}", path.display())))?;
    cfg.validate();
    Ok(cfg)
}

/// Resolve and load the configuration, falling back to built-in defaults
/// when no file exists anywhere.
pub fn load_or_default(cli_config: Option<&str>) -> Result<(KintsugiConfig, Option<ConfigSource>)> {
    match resolve_config_path(cli_config) {
        Some(source) => {
            let cfg = load_config(source.path())?;
            tracing::debug!("using config from {source}");
            Ok((cfg, Some(source)))
        }
        None => Ok((KintsugiConfig::default(), None)),
    }
}

/// Returns a starter YAML config with the defaults spelled out.
pub fn minimal_config_template() -> &'static str {
    r#"# kintsugi configuration file
# Every setting has a default; delete anything you do not want to pin.

output_dir: ./comics
jobs: 4

# user_agent: "Mozilla/5.0 (...)"
# image_host: https://j1z76bln.user.webaccel.jp
# connect_timeout_secs: 30
# read_timeout_secs: 120
"#
}
