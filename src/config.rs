//! Runtime configuration from `PANTRY_*` environment variables.

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value `{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub listen: SocketAddr,
    pub upstream: String,
    pub cache_dir: PathBuf,
    pub cache_version: String,
    pub static_assets: Vec<String>,
    pub recipes_prefix: String,
    pub chat_prefix: String,
    pub upstream_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let upstream_timeout = lookup("PANTRY_UPSTREAM_TIMEOUT_SECS")
            .map(|raw| parse::<u64>("PANTRY_UPSTREAM_TIMEOUT_SECS", raw))
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            listen: try_load(&lookup, "PANTRY_LISTEN", "127.0.0.1:8080")?,
            upstream: try_load(&lookup, "PANTRY_UPSTREAM", "http://127.0.0.1:3000")?,
            cache_dir: try_load(&lookup, "PANTRY_CACHE_DIR", "./.pantry-cache")?,
            cache_version: try_load(&lookup, "PANTRY_CACHE_VERSION", "pantry-v1")?,
            static_assets: split_list(&try_load::<String, _>(
                &lookup,
                "PANTRY_STATIC_ASSETS",
                "/,/manifest.json,/offline.html",
            )?),
            recipes_prefix: try_load(&lookup, "PANTRY_RECIPES_PREFIX", "/api/recipes")?,
            chat_prefix: try_load(&lookup, "PANTRY_CHAT_PREFIX", "/api/chat")?,
            upstream_timeout,
        })
    }
}

fn try_load<T, L>(lookup: &L, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    L: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse(key, raw)
}

fn parse<T>(key: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw.trim().parse() {
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
