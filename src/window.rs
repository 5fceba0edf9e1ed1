use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CREATESTRUCTW, CreateWindowExW, DefWindowProcW, GWLP_USERDATA, GetWindowLongPtrW, HWND_MESSAGE,
    RegisterClassW, SetWindowLongPtrW, WINDOW_STYLE, WM_NCCREATE, WM_NCDESTROY, WNDCLASSW,
    WS_EX_NOACTIVATE,
};
use windows::core::w;

use crate::error::StartError;

const CLASS_NAME: windows::core::PCWSTR = w!("ClipwatchListenerWindow");

/// Message handler installed on the listener window. Returning `None` routes
/// the message to `DefWindowProcW`.
pub type WndHandler = Box<dyn FnMut(HWND, u32, WPARAM, LPARAM) -> Option<LRESULT>>;

/// Creates an invisible message-only window whose messages are routed to
/// `handler`.
///
/// The handler is carried through `CreateWindowExW`'s creation parameter into
/// the window's user data slot, so no module-level handler state exists; its
/// storage is freed when the window receives `WM_NCDESTROY`.
pub fn create_listener_window(handler: WndHandler) -> Result<HWND, StartError> {
    unsafe {
        let hinstance = GetModuleHandleW(None).map_err(StartError::WindowCreation)?;

        let wc = WNDCLASSW {
            lpfnWndProc: Some(wnd_proc),
            hInstance: hinstance.into(),
            lpszClassName: CLASS_NAME,
            ..Default::default()
        };

        // Registration fails harmlessly once the class already exists; a real
        // failure surfaces from CreateWindowExW below.
        RegisterClassW(&wc);

        let slot: *mut WndHandler = Box::into_raw(Box::new(handler));

        match CreateWindowExW(
            WS_EX_NOACTIVATE,
            CLASS_NAME,
            w!("Clipboard Watcher"),
            WINDOW_STYLE::default(),
            0,
            0,
            0,
            0,
            Some(HWND_MESSAGE),
            None,
            Some(hinstance.into()),
            Some(slot as *const c_void),
        ) {
            Ok(hwnd) => Ok(hwnd),
            Err(e) => {
                // WM_NCDESTROY never fired; reclaim the handler here.
                drop(Box::from_raw(slot));
                Err(StartError::WindowCreation(e))
            }
        }
    }
}

unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_NCCREATE {
        // Move the handler pointer from the create params into the window's
        // user data, where later messages can reach it.
        let create = lparam.0 as *const CREATESTRUCTW;
        let slot = unsafe { (*create).lpCreateParams };
        unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, slot as isize) };
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    let slot = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut WndHandler;

    if msg == WM_NCDESTROY {
        if !slot.is_null() {
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                drop(Box::from_raw(slot));
            }
        }
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    if !slot.is_null() {
        // Panics must not unwind across the FFI boundary.
        // SAFETY: the slot is only touched from the window's own thread.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let handler = unsafe { &mut *slot };
            handler(hwnd, msg, wparam, lparam)
        }));
        match outcome {
            Ok(Some(result)) => return result,
            Ok(None) => {}
            Err(_) => tracing::error!("panic caught in listener window procedure"),
        }
    }

    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}
