use std::ffi::c_void;
use std::sync::atomic::{AtomicIsize, Ordering};

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::DataExchange::{
    AddClipboardFormatListener, GetClipboardSequenceNumber, RemoveClipboardFormatListener,
};
use windows::Win32::UI::WindowsAndMessaging::{
    DestroyWindow, DispatchMessageW, GetMessageW, IsWindow, MSG, PostMessageW, PostQuitMessage,
    TranslateMessage, WM_CLIPBOARDUPDATE, WM_CLOSE, WM_DESTROY,
};

use crate::clipboard::reader;
use crate::clipboard::{ClipboardEvent, ClipboardPayload};
use crate::config::CaptureConfig;
use crate::emitter::EventSender;
use crate::error::{RunError, StartError};
use crate::window;

/// Registration of this process as a clipboard-change observer.
///
/// Owns the hidden message-only window enrolled in the OS clipboard format
/// listener list. At most one listener exists per process; it lives on the
/// thread that created it and must not be moved to another. Deregistration is
/// paired with registration on every exit path via [`ClipboardListener::stop`]
/// and the `Drop` impl.
pub struct ClipboardListener {
    hwnd: HWND,
    registered: bool,
}

impl ClipboardListener {
    /// Creates the hidden receiver window and enrolls it in the clipboard
    /// notification chain.
    ///
    /// Change events are handed to `events`; when `capture` names any formats,
    /// each event carries a best-effort payload read in that format. On
    /// failure the partially created window is destroyed before returning.
    pub fn start(events: EventSender, capture: CaptureConfig) -> Result<Self, StartError> {
        let handler = Box::new(
            move |hwnd: HWND, msg: u32, _wparam: WPARAM, _lparam: LPARAM| -> Option<LRESULT> {
                match msg {
                    WM_CLIPBOARDUPDATE => {
                        let sequence = unsafe { GetClipboardSequenceNumber() };
                        let payload = capture_payload(&capture);
                        tracing::info!(sequence, "clipboard change detected");
                        events.send(ClipboardEvent::new(sequence, payload));
                        Some(LRESULT(0))
                    }
                    WM_DESTROY => {
                        unsafe {
                            let _ = RemoveClipboardFormatListener(hwnd);
                            PostQuitMessage(0);
                        }
                        Some(LRESULT(0))
                    }
                    _ => None,
                }
            },
        );

        let hwnd = window::create_listener_window(handler)?;

        if let Err(e) = unsafe { AddClipboardFormatListener(hwnd) } {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(StartError::Registration(e));
        }

        set_listener_hwnd(hwnd);

        Ok(Self {
            hwnd,
            registered: true,
        })
    }

    /// Blocks in the message loop until the window is destroyed (normally via
    /// [`request_stop`] posting `WM_CLOSE`).
    ///
    /// One `WM_CLIPBOARDUPDATE` message is dispatched per clipboard change,
    /// in OS delivery order; unrelated messages go to the default procedure.
    pub fn run(&mut self) -> Result<(), RunError> {
        tracing::info!("clipboard listener running, waiting for changes");

        let mut msg = MSG::default();
        loop {
            let ret = unsafe { GetMessageW(&mut msg, None, 0, 0) };
            match ret.0 {
                // Unrecoverable message loop error.
                -1 => return Err(RunError::Dispatch(windows::core::Error::from_win32())),
                // WM_QUIT: normal termination.
                0 => return Ok(()),
                _ => unsafe {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                },
            }
        }
    }

    /// Removes the listener from the clipboard notification chain and
    /// destroys the receiver window.
    ///
    /// Idempotent: a second call (or a call after the window was already torn
    /// down by `WM_CLOSE`) is a no-op. Failures are logged as warnings and
    /// never block shutdown.
    pub fn stop(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        clear_listener_hwnd();

        unsafe {
            // On the signaled-shutdown path the window is already gone and the
            // OS dropped the registration with it.
            if IsWindow(Some(self.hwnd)).as_bool() {
                if let Err(e) = RemoveClipboardFormatListener(self.hwnd) {
                    tracing::warn!("failed to deregister clipboard listener: {e}");
                }
                if let Err(e) = DestroyWindow(self.hwnd) {
                    tracing::warn!("failed to destroy listener window: {e}");
                }
            }
        }

        tracing::info!("clipboard listener stopped");
    }
}

impl Drop for ClipboardListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_payload(capture: &CaptureConfig) -> Option<ClipboardPayload> {
    let payload = reader::capture(&capture.formats);
    if let Some(ref p) = payload {
        tracing::debug!("captured payload: {p}");
    }
    payload
}

// The console control handler runs on a system thread and needs a way to
// reach the listener window. Only the raw handle crosses threads; the
// listener itself stays on its owning thread.
static LISTENER_HWND: AtomicIsize = AtomicIsize::new(0);

fn set_listener_hwnd(hwnd: HWND) {
    LISTENER_HWND.store(hwnd.0 as isize, Ordering::Release);
}

fn clear_listener_hwnd() {
    LISTENER_HWND.store(0, Ordering::Release);
}

/// Asks the running listener to shut down by posting `WM_CLOSE` to its
/// window. Safe to call from any thread; a no-op when no listener is active.
pub fn request_stop() {
    let raw = LISTENER_HWND.load(Ordering::Acquire);
    if raw != 0 {
        let hwnd = HWND(raw as *mut c_void);
        unsafe {
            let _ = PostMessageW(Some(hwnd), WM_CLOSE, WPARAM(0), LPARAM(0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;
    use crate::emitter::Emitter;
    use crate::sink::Sink;
    use std::sync::Mutex;
    use std::time::Duration;

    // Tests share the process-wide listener window slot; run them one at a
    // time.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn no_capture() -> CaptureConfig {
        CaptureConfig { formats: vec![] }
    }

    #[test]
    fn stop_is_idempotent() {
        let _guard = TEST_LOCK.lock().unwrap();
        let emitter = Emitter::spawn(
            Sink::Log,
            Duration::from_millis(100),
            Duration::from_millis(100),
        );
        let mut listener = ClipboardListener::start(emitter.sender(), no_capture())
            .expect("listener should start");

        listener.stop();
        // Second call must be a no-op.
        listener.stop();
        drop(listener);

        emitter.shutdown();
    }

    #[test]
    fn request_stop_without_listener_is_noop() {
        let _guard = TEST_LOCK.lock().unwrap();
        // Nothing registered: must not post anywhere or panic.
        request_stop();
    }

    #[test]
    fn terminate_signal_exits_loop_within_bounds() {
        let _guard = TEST_LOCK.lock().unwrap();
        let emitter = Emitter::spawn(
            Sink::Log,
            Duration::from_millis(100),
            Duration::from_millis(500),
        );
        let sender = emitter.sender();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let mut listener =
                ClipboardListener::start(sender, no_capture()).expect("listener should start");
            let result = listener.run();
            listener.stop();
            let _ = done_tx.send(result.is_ok());
        });

        // Let the loop reach GetMessageW before signaling.
        std::thread::sleep(Duration::from_millis(200));
        request_stop();

        let clean_exit = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("loop did not exit after terminate signal");
        assert!(clean_exit);

        emitter.shutdown();
    }
}
