use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A clipboard format the watcher may read alongside a change event.
///
/// At most one format is captured per event: the available formats are probed
/// in priority order (`Files` before `Text`, matching how Windows applications
/// place the most specific representation first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureFormat {
    /// CF_UNICODETEXT.
    Text,
    /// CF_HDROP (file paths copied via Explorer).
    Files,
}

/// Content read from the clipboard for a single change event.
#[derive(Debug, Clone)]
pub enum ClipboardPayload {
    Text(String),
    Files(Vec<PathBuf>),
}

impl ClipboardPayload {
    pub fn format(&self) -> CaptureFormat {
        match self {
            Self::Text(_) => CaptureFormat::Text,
            Self::Files(_) => CaptureFormat::Files,
        }
    }

    /// Byte size estimate reported to the analysis service.
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Text(t) => t.len(),
            Self::Files(paths) => paths.iter().map(|p| p.to_string_lossy().len()).sum(),
        }
    }
}

// Log output shows sizes and counts only; payload contents stay out of it.
impl fmt::Display for ClipboardPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => write!(f, "Text({} bytes)", t.len()),
            Self::Files(paths) => write!(f, "Files({} item(s))", paths.len()),
        }
    }
}
