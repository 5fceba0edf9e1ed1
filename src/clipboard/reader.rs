use std::path::PathBuf;

use windows::Win32::Foundation::{HANDLE, HGLOBAL};
use windows::Win32::System::DataExchange::{
    CloseClipboard, GetClipboardData, IsClipboardFormatAvailable, OpenClipboard,
};
use windows::Win32::System::Memory::{GlobalLock, GlobalSize, GlobalUnlock};
use windows::Win32::System::Ole::{CF_HDROP, CF_UNICODETEXT};
use windows::Win32::UI::Shell::{DragQueryFileW, HDROP};

use crate::clipboard::content::{CaptureFormat, ClipboardPayload};
use crate::error::CaptureError;

type Result<T> = std::result::Result<T, CaptureError>;

/// Best-effort read of the clipboard in the first available configured
/// format. All failures are swallowed into `None`: a locked clipboard or an
/// unreadable format must not disturb change detection.
pub fn capture(formats: &[CaptureFormat]) -> Option<ClipboardPayload> {
    if formats.is_empty() {
        return None;
    }
    match ClipboardGuard::open() {
        Ok(guard) => guard.read_first(formats),
        Err(e) => {
            tracing::warn!("clipboard open failed (held by another process?): {e}");
            None
        }
    }
}

/// RAII guard pairing `OpenClipboard` with `CloseClipboard`.
pub struct ClipboardGuard {
    _private: (),
}

impl ClipboardGuard {
    pub fn open() -> Result<Self> {
        unsafe {
            OpenClipboard(None).map_err(CaptureError::Open)?;
        }
        Ok(Self { _private: () })
    }

    /// Probes the configured formats in priority order (files before text)
    /// and reads at most one.
    pub fn read_first(&self, formats: &[CaptureFormat]) -> Option<ClipboardPayload> {
        if formats.contains(&CaptureFormat::Files)
            && unsafe { IsClipboardFormatAvailable(CF_HDROP.0 as u32).is_ok() }
        {
            match self.read_files() {
                Ok(paths) if !paths.is_empty() => return Some(ClipboardPayload::Files(paths)),
                Ok(_) => {}
                Err(e) => tracing::warn!("failed to read CF_HDROP: {e}"),
            }
        }

        if formats.contains(&CaptureFormat::Text)
            && unsafe { IsClipboardFormatAvailable(CF_UNICODETEXT.0 as u32).is_ok() }
        {
            match self.read_text() {
                Ok(text) if !text.is_empty() => return Some(ClipboardPayload::Text(text)),
                Ok(_) => {}
                Err(e) => tracing::warn!("failed to read CF_UNICODETEXT: {e}"),
            }
        }

        None
    }

    fn read_text(&self) -> Result<String> {
        unsafe {
            let handle: HANDLE = GetClipboardData(CF_UNICODETEXT.0 as u32)
                .map_err(|_| CaptureError::DataUnavailable(CF_UNICODETEXT.0 as u32))?;

            let hglobal = HGLOBAL(handle.0);
            let ptr = GlobalLock(hglobal) as *const u16;
            if ptr.is_null() {
                return Err(CaptureError::GlobalLock);
            }

            let units = GlobalSize(hglobal) / 2;
            let slice = std::slice::from_raw_parts(ptr, units);
            // The allocation may extend past the nul terminator.
            let len = slice.iter().position(|&c| c == 0).unwrap_or(slice.len());
            let text = String::from_utf16_lossy(&slice[..len]);

            let _ = GlobalUnlock(hglobal);
            Ok(text)
        }
    }

    fn read_files(&self) -> Result<Vec<PathBuf>> {
        unsafe {
            let handle: HANDLE = GetClipboardData(CF_HDROP.0 as u32)
                .map_err(|_| CaptureError::DataUnavailable(CF_HDROP.0 as u32))?;

            let hdrop = HDROP(handle.0);
            let count = DragQueryFileW(hdrop, 0xFFFFFFFF, None);

            let mut paths = Vec::with_capacity(count as usize);
            for i in 0..count {
                let len = DragQueryFileW(hdrop, i, None);
                let mut buf = vec![0u16; (len + 1) as usize];
                DragQueryFileW(hdrop, i, Some(&mut buf));
                paths.push(PathBuf::from(String::from_utf16_lossy(&buf[..len as usize])));
            }

            Ok(paths)
        }
    }
}

impl Drop for ClipboardGuard {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseClipboard();
        }
    }
}
