use crate::error::AppError;
use config::{builder::DefaultState, Config as Cfg, ConfigBuilder, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = layered("configuration", "APP").build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Builder reading an optional file `name.{toml,yaml,json}` and then
/// environment variables `PREFIX_SECTION__KEY`, later sources winning.
///
/// Callers add their own defaults before building.
pub fn layered(name: &str, env_prefix: &str) -> ConfigBuilder<DefaultState> {
    Cfg::builder()
        .add_source(File::with_name(name).required(false))
        .add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
}
