pub mod content;
#[cfg(windows)]
pub mod monitor;
#[cfg(windows)]
pub mod reader;

pub use content::{CaptureFormat, ClipboardPayload};
#[cfg(windows)]
pub use monitor::ClipboardListener;

use chrono::{DateTime, Utc};

/// One observed clipboard change.
///
/// Events are never coalesced or deduplicated: every OS notification produces
/// exactly one event, even when the new content equals the old. They carry no
/// history; each is a transient unit handed to the emitter and forgotten.
#[derive(Debug, Clone)]
pub struct ClipboardEvent {
    /// OS clipboard sequence number at capture time. Ordering metadata only.
    pub sequence: u32,
    /// When the change notification was observed.
    pub captured_at: DateTime<Utc>,
    /// Captured content, when payload capture is enabled and one of the
    /// configured formats was available.
    pub payload: Option<ClipboardPayload>,
}

impl ClipboardEvent {
    pub fn new(sequence: u32, payload: Option<ClipboardPayload>) -> Self {
        Self {
            sequence,
            captured_at: Utc::now(),
            payload,
        }
    }
}
