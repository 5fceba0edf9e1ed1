use thiserror::Error;

/// Fatal startup failures. The process exits without ever entering the
/// message loop; no events are emitted.
#[derive(Debug, Error)]
pub enum StartError {
    #[cfg(windows)]
    #[error("failed to create hidden listener window: {0}")]
    WindowCreation(windows::core::Error),

    #[cfg(windows)]
    #[error("failed to register clipboard format listener: {0}")]
    Registration(windows::core::Error),

    #[error("clipboard watching is not supported on this platform")]
    Unsupported,
}

/// Fatal message-loop failures. The caller deregisters the listener and
/// terminates the process.
#[derive(Debug, Error)]
pub enum RunError {
    #[cfg(windows)]
    #[error("message loop dispatch failed: {0}")]
    Dispatch(windows::core::Error),
}

/// Per-event delivery failures. Always recoverable: logged, and the watcher
/// keeps running.
#[derive(Debug, Error)]
pub enum EmissionError {
    #[error("scan request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("scan endpoint returned {0}")]
    Status(reqwest::StatusCode),

    #[error("delivery timed out after {}ms", .0.as_millis())]
    Timeout(std::time::Duration),
}

/// Clipboard payload read failures. Non-fatal: the change event is still
/// emitted, just without a payload.
#[cfg(windows)]
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open clipboard: {0}")]
    Open(windows::core::Error),

    #[error("clipboard data unavailable for format {0}")]
    DataUnavailable(u32),

    #[error("failed to lock global memory")]
    GlobalLock,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid scan endpoint `{url}`: {source}")]
    InvalidEndpoint {
        url: String,
        source: url::ParseError,
    },
}
