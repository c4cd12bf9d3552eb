use std::path::PathBuf;

use anyhow::{bail, Context};
use serde::Deserialize;

/// Smallest buffer that still holds any response head the server produces.
pub const MIN_BUFFER_SIZE: usize = 256;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Connection table size; also the listen backlog.
    pub max_connections: usize,
    /// Capacity of each connection's inbound and outbound buffer.
    pub buffer_size: usize,
    /// Most requests answered from one read before flushing.
    pub max_pipeline: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    pub root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9999".to_string(),
            max_connections: 1024,
            buffer_size: 4096,
            max_pipeline: 10,
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

/// `static_site` next to the running executable, or under the working
/// directory when the executable path is unknown.
fn default_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("static_site")
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// `LISO_CONFIG` names an optional YAML file; `LISTEN` and `LISO_ROOT`
    /// override the listen address and document root.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with a custom variable lookup.
    pub fn load_with<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup("LISO_CONFIG") {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path))?;
                Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path))?
            }
            None => Self::default(),
        };

        if let Some(addr) = lookup("LISTEN") {
            cfg.server.listen_addr = addr;
        }
        if let Some(root) = lookup("LISO_ROOT") {
            cfg.static_files.root = PathBuf::from(root);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let server = &self.server;
        if server.max_connections == 0 {
            bail!("server.max_connections must be at least 1");
        }
        if server.max_pipeline == 0 {
            bail!("server.max_pipeline must be at least 1");
        }
        if server.buffer_size < MIN_BUFFER_SIZE {
            bail!(
                "server.buffer_size must be at least {} bytes, got {}",
                MIN_BUFFER_SIZE,
                server.buffer_size
            );
        }
        if server.listen_addr.trim().is_empty() {
            bail!("server.listen_addr is empty");
        }
        Ok(())
    }
}
