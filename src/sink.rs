use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::clipboard::{CaptureFormat, ClipboardEvent, ClipboardPayload};
use crate::config::{SinkConfig, SinkKind};
use crate::error::{ConfigError, EmissionError};

/// Body of the `POST` request sent to the analysis service for each change.
///
/// `format` and `content` are absent for marker-only events (payload capture
/// disabled, or none of the configured formats was on the clipboard).
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<CaptureFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub byte_size: usize,
    pub sequence: u32,
    pub captured_at: DateTime<Utc>,
}

impl ScanRequest {
    pub fn from_event(event: &ClipboardEvent) -> Self {
        let (format, content, byte_size) = match &event.payload {
            Some(payload) => {
                let content = match payload {
                    ClipboardPayload::Text(text) => text.clone(),
                    ClipboardPayload::Files(paths) => paths
                        .iter()
                        .map(|p| p.to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("\n"),
                };
                (Some(payload.format()), Some(content), payload.byte_size())
            }
            None => (None, None, 0),
        };

        Self {
            format,
            content,
            byte_size,
            sequence: event.sequence,
            captured_at: event.captured_at,
        }
    }
}

/// Where detected clipboard changes are delivered.
pub enum Sink {
    /// Print the event marker line to stdout (the minimal-core behavior).
    Console,
    /// Structured log line only.
    Log,
    /// Forward the event to the analysis service.
    Http(HttpSink),
}

impl Sink {
    pub fn from_config(cfg: &SinkConfig) -> Result<Self, ConfigError> {
        match cfg.kind {
            SinkKind::Console => Ok(Sink::Console),
            SinkKind::Log => Ok(Sink::Log),
            SinkKind::Http => {
                let endpoint =
                    Url::parse(&cfg.endpoint).map_err(|source| ConfigError::InvalidEndpoint {
                        url: cfg.endpoint.clone(),
                        source,
                    })?;
                Ok(Sink::Http(HttpSink::new(endpoint, cfg.timeout())))
            }
        }
    }

    /// Delivers one event. Failures are recoverable: the emitter logs them
    /// and keeps draining the queue.
    pub async fn emit(&self, event: &ClipboardEvent) -> Result<(), EmissionError> {
        match self {
            Sink::Console => {
                println!("[EVENT] Clipboard Content Changed");
                Ok(())
            }
            Sink::Log => {
                tracing::info!(sequence = event.sequence, "clipboard content changed");
                Ok(())
            }
            Sink::Http(http) => http.send(event).await,
        }
    }
}

/// HTTP client that posts change events to the configured scan endpoint.
pub struct HttpSink {
    client: Client,
    endpoint: Url,
}

impl HttpSink {
    pub fn new(endpoint: Url, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, endpoint }
    }

    async fn send(&self, event: &ClipboardEvent) -> Result<(), EmissionError> {
        let body = ScanRequest::from_event(event);
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        // The service's answer is not consumed beyond its status code.
        let status = response.status();
        if !status.is_success() {
            return Err(EmissionError::Status(status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn scan_request_carries_text_payload() {
        let event = ClipboardEvent::new(7, Some(ClipboardPayload::Text("hello".to_string())));
        let req = ScanRequest::from_event(&event);

        assert_eq!(req.format, Some(CaptureFormat::Text));
        assert_eq!(req.content.as_deref(), Some("hello"));
        assert_eq!(req.byte_size, 5);
        assert_eq!(req.sequence, 7);
    }

    #[test]
    fn scan_request_joins_file_paths() {
        let event = ClipboardEvent::new(
            3,
            Some(ClipboardPayload::Files(vec![
                PathBuf::from("C:\\a.txt"),
                PathBuf::from("C:\\b.txt"),
            ])),
        );
        let req = ScanRequest::from_event(&event);

        assert_eq!(req.format, Some(CaptureFormat::Files));
        assert_eq!(req.content.as_deref(), Some("C:\\a.txt\nC:\\b.txt"));
    }

    #[test]
    fn marker_event_omits_payload_fields() {
        let event = ClipboardEvent::new(1, None);
        let json = serde_json::to_value(ScanRequest::from_event(&event)).unwrap();

        assert!(json.get("format").is_none());
        assert!(json.get("content").is_none());
        assert_eq!(json["byte_size"], 0);
        assert_eq!(json["sequence"], 1);
        assert!(json.get("captured_at").is_some());
    }

    #[test]
    fn scan_request_wire_field_names() {
        let event = ClipboardEvent::new(42, Some(ClipboardPayload::Text("x".to_string())));
        let json = serde_json::to_value(ScanRequest::from_event(&event)).unwrap();

        assert_eq!(json["format"], "text");
        assert_eq!(json["content"], "x");
        assert_eq!(json["byte_size"], 1);
        assert_eq!(json["sequence"], 42);
    }

    #[test]
    fn http_sink_selected_from_config_validates_endpoint() {
        let cfg = SinkConfig {
            kind: SinkKind::Http,
            endpoint: "not a url".to_string(),
            ..SinkConfig::default()
        };
        assert!(matches!(
            Sink::from_config(&cfg),
            Err(ConfigError::InvalidEndpoint { .. })
        ));

        let cfg = SinkConfig {
            kind: SinkKind::Http,
            ..SinkConfig::default()
        };
        assert!(matches!(Sink::from_config(&cfg), Ok(Sink::Http(_))));
    }
}
