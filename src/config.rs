use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::clipboard::CaptureFormat;

#[derive(Parser)]
#[command(
    name = "clipwatch",
    about = "Clipboard watcher that forwards change events to an analysis service"
)]
pub struct Cli {
    /// Path to config file (overrides default location)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Where change events are delivered: "console", "log", or "http".
    #[serde(default)]
    pub kind: SinkKind,
    /// Analysis service endpoint used by the "http" sink.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Upper bound on a single delivery attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// How long pending deliveries may still finish during shutdown,
    /// in milliseconds.
    #[serde(default = "default_grace_ms")]
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Console,
    Log,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Clipboard formats to read per change event, probed in priority order.
    /// An empty list disables payload capture; events are then bare change
    /// markers.
    #[serde(default = "default_formats")]
    pub formats: Vec<CaptureFormat>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sink: SinkConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            shutdown_grace_ms: default_grace_ms(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8000/scan".to_string()
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_grace_ms() -> u64 {
    2000
}

fn default_formats() -> Vec<CaptureFormat> {
    vec![CaptureFormat::Text]
}

impl SinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Config {
    /// Load config from the given path (or the standard path if `None`).
    /// Returns defaults if the file does not exist or cannot be parsed.
    pub fn load(override_path: Option<&Path>) -> Self {
        let path = match override_path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path(),
        };
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        tracing::warn!("failed to parse config at {}: {e}", path.display());
                    }
                },
                Err(e) => {
                    tracing::warn!("failed to read config at {}: {e}", path.display());
                }
            }
        }
        Self::default()
    }

    /// The standard config file path: %APPDATA%/clipwatch/config.toml
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "clipwatch")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Write the default config to disk if it doesn't exist, so users can
    /// discover the knobs.
    pub fn write_default_if_missing(path: &Path) {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let default_toml = toml::to_string_pretty(&Config::default()).unwrap_or_default();
            let _ = std::fs::write(path, default_toml);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_minimal_core() {
        let cfg = Config::default();
        assert_eq!(cfg.sink.kind, SinkKind::Console);
        assert_eq!(cfg.sink.endpoint, "http://127.0.0.1:8000/scan");
        assert_eq!(cfg.sink.timeout(), Duration::from_millis(3000));
        assert_eq!(cfg.sink.shutdown_grace(), Duration::from_millis(2000));
        assert_eq!(cfg.capture.formats, vec![CaptureFormat::Text]);
    }

    #[test]
    fn partial_toml_fills_remaining_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [sink]
            kind = "http"
            timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(cfg.sink.kind, SinkKind::Http);
        assert_eq!(cfg.sink.timeout_ms, 250);
        assert_eq!(cfg.sink.endpoint, "http://127.0.0.1:8000/scan");
        assert_eq!(cfg.capture.formats, vec![CaptureFormat::Text]);
    }

    #[test]
    fn capture_formats_parse_from_toml() {
        let cfg: Config = toml::from_str(
            r#"
            [capture]
            formats = ["files", "text"]
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.capture.formats,
            vec![CaptureFormat::Files, CaptureFormat::Text]
        );

        let cfg: Config = toml::from_str("[capture]\nformats = []\n").unwrap();
        assert!(cfg.capture.formats.is_empty());
    }

    #[test]
    fn load_falls_back_to_defaults_on_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not toml [").unwrap();

        let cfg = Config::load(Some(&path));
        assert_eq!(cfg.sink.kind, SinkKind::Console);
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = Config::load(Some(&dir.path().join("nope.toml")));
        assert_eq!(cfg.sink.endpoint, "http://127.0.0.1:8000/scan");
    }

    #[test]
    fn write_default_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        Config::write_default_if_missing(&path);
        assert!(path.exists());

        let cfg = Config::load(Some(&path));
        assert_eq!(cfg.sink.kind, SinkKind::Console);
        assert_eq!(cfg.capture.formats, vec![CaptureFormat::Text]);

        // A second call must not clobber user edits.
        std::fs::write(&path, "[sink]\nkind = \"log\"\n").unwrap();
        Config::write_default_if_missing(&path);
        assert_eq!(Config::load(Some(&path)).sink.kind, SinkKind::Log);
    }
}
