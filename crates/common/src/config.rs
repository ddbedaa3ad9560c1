use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[cfg(feature = "logging")]
use tracing_subscriber::filter::LevelFilter;

/// Configuration file used when no explicit path is provided.
pub const DEFAULT_CONFIG_FILE: &str = "Exoport.toml";

/// Implementation of [`serde`]'s deserializer for [`FromStr`] types.
#[cfg(feature = "logging")]
fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error,
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    std::str::FromStr::from_str(&s).map_err(serde::de::Error::custom)
}

/// Logging configuration.
#[cfg(feature = "logging")]
#[derive(Deserialize)]
pub struct Logging {
    /// Log level.
    #[serde(deserialize_with = "deserialize_from_str")]
    pub level: LevelFilter,
}

#[cfg(feature = "logging")]
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
        }
    }
}

/// General configuration.
#[derive(Deserialize)]
pub struct Config {
    /// Build service host, including the scheme.
    #[serde(default = "default_server_path")]
    pub server_path: String,

    /// Logging configuration.
    #[cfg(feature = "logging")]
    #[serde(default)]
    pub logging: Logging,
}

/// Default server path for the hosted build service.
pub fn default_server_path() -> String {
    String::from("https://build.webmr.io")
}

impl Config {
    /// Create new config using the configuration file or environment variables.
    ///
    /// See [`Env`] for more details on how to use environment variables configuration.
    /// Nested keys are separated with a double underscore, e.g. `EXOPORT_LOGGING__LEVEL`.
    ///
    /// [`Env`]: figment::providers::Env
    pub fn new(path: Option<PathBuf>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(
                path.unwrap_or(PathBuf::from(DEFAULT_CONFIG_FILE)),
            ))
            .merge(Env::prefixed("EXOPORT_").split("__"))
            .extract()
    }

    /// Build service host without a trailing slash.
    pub fn host(&self) -> &str {
        self.server_path.trim_end_matches('/')
    }
}
