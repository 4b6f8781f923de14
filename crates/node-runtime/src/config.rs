//! Configuration loading: JSON file plus environment overrides.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `CX_CONFIG` | path of the JSON config file (`--config` wins) |
//! | `CX_HTTP_PORT` | overrides `http.port` |
//! | `CX_HOST` | overrides `identity.host` |

use clap::Parser;
use cx_03_client_node::NodeConfig;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "CX_CONFIG";
pub const HTTP_PORT_ENV: &str = "CX_HTTP_PORT";
pub const HOST_ENV: &str = "CX_HOST";

/// Consent-Exchange client node
#[derive(Parser, Debug)]
#[command(name = "cx-node", version)]
#[command(about = "Signs operator requests and verifies operator responses for a vendor")]
pub struct NodeArgs {
    /// JSON configuration file
    #[arg(short, long, env = CONFIG_ENV, value_name = "FILE")]
    pub config: PathBuf,
}

/// Errors while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a config file.
pub fn load_file(path: &Path) -> Result<NodeConfig, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply environment overrides. Unparseable values are logged and ignored.
pub fn apply_env_overrides(config: &mut NodeConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(port) = env(HTTP_PORT_ENV) {
        match port.parse() {
            Ok(p) => config.http.port = p,
            Err(_) => warn!(value = %port, "{HTTP_PORT_ENV} is not a port, ignoring"),
        }
    }
    if let Some(host) = env(HOST_ENV) {
        config.identity.host = host;
    }
}

/// Load the config file, then apply environment overrides.
pub fn load_config(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<NodeConfig, LoadError> {
    let mut config = load_file(path)?;
    apply_env_overrides(&mut config, &env);
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}
