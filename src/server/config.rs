//! Server configuration.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::server::error::Error;

/// Port used when the configuration does not name one.
pub const DEFAULT_PORT: u16 = 2880;

/// The `Server` header value. Not configurable.
pub const SERVER_NAME: &str = "microserve";

/// File extensions recognized as configuration files.
pub const CONFIG_EXTENSIONS: &[&str] = &["json"];

fn default_document() -> String {
    "index.html".to_string()
}

fn default_idle_timeout_secs() -> u64 {
    10
}

fn default_cache_capacity() -> usize {
    1024
}

/// HTTP server configuration.
///
/// Deserialized from a JSON document with camelCase keys:
///
/// ```json
/// {
///     "logFile": "/var/log/microserve.log",
///     "documentRoot": "/srv/www",
///     "defaultDocument": "index.html",
///     "directoryDefaultDocument": "index.html",
///     "port": 8080
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Where log lines go. Standard error when absent.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// No request may resolve outside this directory.
    pub document_root: PathBuf,
    /// Served for a request of exactly `/`.
    #[serde(default = "default_document")]
    pub default_document: String,
    /// Appended to a request path that does not name a readable file.
    #[serde(default)]
    pub directory_default_document: Option<String>,
    /// The port to listen on.
    #[serde(default)]
    pub port: Option<u16>,
    /// Seconds of inactivity after which a connection is pruned.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Maximum number of resolved resources kept in the cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl ServerConfig {
    /// A configuration serving `document_root` with every other option at its default.
    pub fn new(document_root: impl Into<PathBuf>) -> Self {
        Self {
            log_file: None,
            document_root: document_root.into(),
            default_document: default_document(),
            directory_default_document: None,
            port: None,
            idle_timeout_secs: default_idle_timeout_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// The port to listen on, falling back to [`DEFAULT_PORT`].
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Whether `path` carries one of the [`CONFIG_EXTENSIONS`].
pub fn is_config_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CONFIG_EXTENSIONS.contains(&ext))
}

/// The first candidate with a configuration extension that can be opened and read.
pub fn configuration_file(candidates: &[PathBuf]) -> Option<&Path> {
    candidates
        .iter()
        .filter(|path| is_config_file(path))
        .find(|path| {
            let mut byte = [0u8; 1];
            File::open(path).and_then(|mut f| f.read(&mut byte)).is_ok()
        })
        .map(PathBuf::as_path)
}
