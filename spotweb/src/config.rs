use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Deserializer};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tracing::debug;

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ListenConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
}

const DEFAULT_HTTP_PORT: u16 = 4000;
const DEFAULT_HOST: &str = "0.0.0.0";
fn default_listen() -> ListenConfig {
    ListenConfig {
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_HTTP_PORT,
    }
}

// This handles the case where the `listen` block is PRESENT, but a field may be missing.
fn deserialize_listen_with_defaults<'de, D>(deserializer: D) -> Result<ListenConfig, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct PartialListenConfig {
        host: Option<String>,
        port: Option<u16>,
    }

    let partial_config = PartialListenConfig::deserialize(deserializer)?;
    Ok(ListenConfig {
        host: partial_config
            .host
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: partial_config.port.unwrap_or(DEFAULT_HTTP_PORT),
    })
}

/// The configuration for a single deployment environment (e.g. `dev` or `prod`)
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    #[serde(default = "default_listen")]
    #[serde(deserialize_with = "deserialize_listen_with_defaults")]
    pub(crate) listen: ListenConfig,
    pub(crate) database: String,
    /// include the underlying error text in error responses
    #[serde(default)]
    pub(crate) expose_error_details: bool,
    /// a directory of frontend files to serve alongside the api
    #[serde(default)]
    pub(crate) static_dir: Option<PathBuf>,
}

impl EnvConfig {
    /// Parse a yaml document that maps environment names to configurations
    /// and pick out the configuration for `envname`
    pub(crate) fn parse(contents: &str, envname: &str) -> Result<Self> {
        let mut configs: HashMap<String, EnvConfig> =
            serde_yaml::from_str(contents).with_context(|| "Couldn't parse yaml config")?;
        configs
            .remove(envname)
            .ok_or_else(|| anyhow!("No configuration found for environment '{envname}'"))
    }

    pub(crate) async fn load_from_file<P: AsRef<Path>>(path: P, envname: &str) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, envname, "Loading configuration");
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::parse(&contents, envname)
    }
}

/// The config file that is used when none is given on the command line: the
/// file in the user's config directory if there is one, otherwise the file in
/// the current directory.
pub(crate) fn default_config_file() -> PathBuf {
    config_file_in(
        directories::ProjectDirs::from("org", "studyspots", "spotweb")
            .as_ref()
            .map(|dirs| dirs.config_dir()),
    )
}

const CONFIG_FILE: &str = "spotweb.yaml";

fn config_file_in(config_dir: Option<&Path>) -> PathBuf {
    config_dir
        .map(|dir| dir.join(CONFIG_FILE))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}
