//! TOML configuration for the command-line binary.
//!
//! Loaded once and handed to [`DirectUploadClient::from_config`]; no
//! process-global credential state.
//!
//! [`DirectUploadClient::from_config`]: crate::DirectUploadClient::from_config

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Repository base URL, e.g. `https://demo.dataverse.org`.
    pub server_url: String,
    pub api_token: String,
    /// Target dataset DOI, without the `doi:` prefix.
    pub persistent_id: String,
    pub file_path: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config in {}", path.display()))
    }
}
