use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;

use crate::auth::{TokenAuthSource, TokenParseError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid HALLS_TOKENS: {0}")]
    Tokens(#[from] TokenParseError),
}

#[derive(Debug)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub metrics_port: Option<u16>,
    pub max_connections: usize,
    /// Journal appends between compactions. 0 disables the compactor.
    pub compact_threshold: u64,
    pub tokens: TokenAuthSource,
    pub seed: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup("HALLS_DATA_DIR").unwrap_or_else(|| "./data".to_string());
        let data_dir = (!data_dir.trim().is_empty()).then(|| PathBuf::from(data_dir.trim()));

        let metrics_port = match lookup("HALLS_METRICS_PORT") {
            Some(v) if !v.trim().is_empty() => Some(parse("HALLS_METRICS_PORT", &v)?),
            _ => None,
        };

        let tokens = TokenAuthSource::parse(&lookup("HALLS_TOKENS").unwrap_or_default())?;
        if tokens.is_empty() {
            info!("HALLS_TOKENS not set, every authenticated route will answer 401");
        }

        Ok(Self {
            bind: lookup("HALLS_BIND").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: try_load(&lookup, "HALLS_PORT", "8080")?,
            data_dir,
            metrics_port,
            max_connections: try_load(&lookup, "HALLS_MAX_CONNECTIONS", "256")?,
            compact_threshold: try_load(&lookup, "HALLS_COMPACT_THRESHOLD", "1000")?,
            tokens,
            seed: try_load(&lookup, "HALLS_SEED", "false")?,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse(key, &value)
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
