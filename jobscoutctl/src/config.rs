use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, anyhow};
use jobscout_core::ProjectionLayout;
use jobscout_core::projection::DEFAULT_LOG_CAPACITY;
use jobscout_model::{DEFAULT_REGIONS, FALLBACK_REGION};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "JOBSCOUT_CONFIG_PATH";
pub const CONFIG_JSON_ENV: &str = "JOBSCOUT_CONFIG_JSON";
pub const SERVER_URL_ENV: &str = "JOBSCOUT_SERVER_URL";

/// Loads `.env` from the working directory or its parents.
///
/// Returns whether a file was loaded. Only a missing file is tolerated; a
/// malformed one is reported.
pub fn load_dotenv() -> Result<bool, dotenvy::Error> {
    ignore_missing(dotenvy::dotenv())
}

pub fn load_dotenv_from(path: &Path) -> Result<bool, dotenvy::Error> {
    ignore_missing(dotenvy::from_path(path))
}

fn ignore_missing<T>(result: Result<T, dotenvy::Error>) -> Result<bool, dotenvy::Error> {
    result.map(|_| true).or_else(|err| match err {
        dotenvy::Error::Io(ref source) if source.kind() == io::ErrorKind::NotFound => Ok(false),
        _ => Err(err),
    })
}

/// Source that produced the watch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WatchConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
    /// Given on the command line.
    Cli(PathBuf),
}

impl std::fmt::Display for WatchConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchConfigSource::Default => f.write_str("built-in defaults"),
            WatchConfigSource::EnvPath(path) => {
                write!(f, "${CONFIG_PATH_ENV} ({})", path.display())
            }
            WatchConfigSource::EnvInline => write!(f, "${CONFIG_JSON_ENV}"),
            WatchConfigSource::File(path) | WatchConfigSource::Cli(path) => {
                write!(f, "{}", path.display())
            }
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid server url '{url}'")]
    InvalidServerUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("log_capacity must be greater than zero")]
    ZeroLogCapacity,
    #[error("request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,
    #[error("fallback_region must not be empty")]
    EmptyFallbackRegion,
}

/// Where the run server lives and how a watched run is laid out.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatchConfig {
    /// Root URL of the run server; routes are resolved beneath it.
    pub server_url: String,
    /// Ask the server to deliver passed postings to its mock outbound sink.
    pub use_mock_outbound: bool,
    /// Total timeout of run-control requests. The event stream is exempt.
    pub request_timeout_secs: u64,
    /// Activity log entries kept per run.
    pub log_capacity: usize,
    /// Regions listed up front, in display order.
    pub regions: Vec<String>,
    /// Region for postings without one. Always part of the layout.
    pub fallback_region: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            use_mock_outbound: false,
            request_timeout_secs: 15,
            log_capacity: DEFAULT_LOG_CAPACITY,
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            fallback_region: FALLBACK_REGION.to_string(),
        }
    }
}

impl WatchConfig {
    /// Resolves configuration from `$JOBSCOUT_CONFIG_PATH`, then
    /// `$JOBSCOUT_CONFIG_JSON`, then a default file, then built-in defaults.
    /// `$JOBSCOUT_SERVER_URL` overrides the server URL in every case.
    pub fn load_from_env() -> anyhow::Result<(Self, WatchConfigSource)> {
        let (config, source) = Self::resolve_from_env()?;
        Ok((config.with_server_override(env::var(SERVER_URL_ENV).ok()), source))
    }

    fn resolve_from_env() -> anyhow::Result<(Self, WatchConfigSource)> {
        if let Ok(path_str) = env::var(CONFIG_PATH_ENV)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, WatchConfigSource::EnvPath(path)));
        }

        if let Ok(raw) = env::var(CONFIG_JSON_ENV)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_ENV}"))?;
            return Ok((parsed, WatchConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let config = Self::load_from_file(&path)?;
            return Ok((config, WatchConfigSource::File(path)));
        }

        Ok((Self::default(), WatchConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read watch config from {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents)
                .with_context(|| format!("invalid watch config {}", path.display())),
            Some("toml") => toml::from_str(&contents)
                .map_err(|err| anyhow!("invalid watch config {}: {}", path.display(), err)),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    /// Tries TOML first, then JSON.
    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse watch config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).map_err(|err| anyhow!("invalid watch config json: {err}"))
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &["jobscout.toml", "jobscout.json", "config/jobscout.toml"];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Replaces the server URL when `server_url` holds a non-blank value.
    pub fn with_server_override(mut self, server_url: Option<String>) -> Self {
        if let Some(url) = server_url.filter(|url| !url.trim().is_empty()) {
            self.server_url = url.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.server_url).map_err(|source| ConfigError::InvalidServerUrl {
            url: self.server_url.clone(),
            source,
        })?;
        if self.log_capacity == 0 {
            return Err(ConfigError::ZeroLogCapacity);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        if self.fallback_region.trim().is_empty() {
            return Err(ConfigError::EmptyFallbackRegion);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn layout(&self) -> ProjectionLayout {
        ProjectionLayout {
            regions: self.regions.clone(),
            fallback_region: self.fallback_region.clone(),
            log_capacity: self.log_capacity,
        }
    }
}
