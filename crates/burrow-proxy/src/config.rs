use burrow_protocol_v1_20::UnknownRecipePolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Address of the 1.19.4 server. It must run in offline mode.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// JSON ID mapping file; IDs pass through unchanged when unset.
    #[serde(default)]
    pub mappings: Option<PathBuf>,
    #[serde(default)]
    pub unknown_recipes: UnknownRecipePolicy,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    25565
}

fn default_backend() -> String {
    "127.0.0.1:25566".into()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            backend: default_backend(),
            mappings: None,
            unknown_recipes: UnknownRecipePolicy::default(),
        }
    }
}

impl ProxyConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ProxyConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}
