//! Server configuration
//!
//! Configuration is read from a YAML file (named by `LANTERN_CONFIG`) and
//! then adjusted by environment overrides. Every field has a default, so an
//! empty file or no file at all yields a runnable setup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
}

/// Listener and per-connection limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (IP or hostname)
    pub host: String,

    pub port: u16,

    /// Pending-connection queue length passed to `listen`
    pub backlog: u32,

    /// Ceiling on connections being served at once
    pub max_connections: usize,

    /// Maximum wait for request bytes before answering 408
    pub read_timeout_secs: u64,

    /// Maximum time allowed to push a response to the client
    pub write_timeout_secs: u64,

    /// Cap on the request header section, terminator included
    pub max_header_bytes: usize,
}

/// Document root settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory below which all servable files live
    pub root: PathBuf,

    /// File served for directory-like paths
    pub index: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            backlog: 10,
            max_connections: 256,
            read_timeout_secs: 30,
            write_timeout_secs: 30,
            max_header_bytes: 8192,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./public"),
            index: "index.html".to_string(),
        }
    }
}

impl ServerConfig {
    /// `host:port` as handed to the resolver
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Config {
    /// Load configuration for the binary.
    ///
    /// Reads the file named by `LANTERN_CONFIG` when set, falls back to
    /// defaults otherwise, then applies `LISTEN` and `DOC_ROOT` overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var("LANTERN_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a YAML document. Missing sections and fields take defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("Invalid configuration YAML")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply environment-style overrides.
    ///
    /// `LISTEN` takes `host:port`, `DOC_ROOT` takes a directory. The lookup
    /// is injected so callers can supply something other than the process
    /// environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = lookup("LISTEN") {
            let (host, port) = listen
                .rsplit_once(':')
                .with_context(|| format!("LISTEN must be host:port, got {listen:?}"))?;
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid port in LISTEN: {port:?}"))?;
            self.server.host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        }

        if let Some(root) = lookup("DOC_ROOT") {
            self.static_files.root = PathBuf::from(root);
        }

        Ok(())
    }

    /// Reject values that would leave the server unable to make progress.
    pub fn validate(&self) -> Result<()> {
        let server = &self.server;
        if server.backlog == 0 {
            anyhow::bail!("server.backlog must be non-zero");
        }
        if server.max_connections == 0 {
            anyhow::bail!("server.max_connections must be non-zero");
        }
        if server.max_header_bytes == 0 {
            anyhow::bail!("server.max_header_bytes must be non-zero");
        }
        if server.read_timeout_secs == 0 || server.write_timeout_secs == 0 {
            anyhow::bail!("server timeouts must be non-zero");
        }

        let index = &self.static_files.index;
        if index.is_empty() || index.contains(['/', '\\']) || index == "." || index == ".." {
            anyhow::bail!("static_files.index must be a plain file name, got {index:?}");
        }

        Ok(())
    }
}
