//! Native Win32 window shared by the D3D11 and WGL backends.
//!
//! Each sub-window registers its own window class. The window procedure
//! finds its [`WindowContext`] through a boxed [`ProcState`] stored in
//! `GWLP_USERDATA` at `WM_NCCREATE`, so messages never go through globals.

use super::SurfaceInit;
use crate::command::{Rect, Title, WindowStyle};
use crate::context::WindowContext;
use crate::event::NativeEvent;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::cell::Cell;
use std::ffi::c_void;
use std::sync::Arc;
use windows::core::HSTRING;
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Dwm::DwmExtendFrameIntoClientArea;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Controls::MARGINS;
use windows::Win32::UI::Input::KeyboardAndMouse::SetFocus;
use windows::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRect, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
    GetClientRect, GetWindowLongPtrW, LoadCursorW, PeekMessageW, RegisterClassExW,
    SetForegroundWindow, SetWindowLongPtrW, SetWindowPos, SetWindowTextW, ShowWindow,
    TranslateMessage, UnregisterClassW, CREATESTRUCTW, CS_OWNDC, GWLP_USERDATA, GWL_STYLE,
    IDC_ARROW, MSG, PM_REMOVE, SIZE_MAXIMIZED, SIZE_MINIMIZED, SIZE_RESTORED, SWP_FRAMECHANGED,
    SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER, SW_SHOWDEFAULT, WINDOW_EX_STYLE, WINDOW_STYLE,
    WM_CLOSE, WM_KILLFOCUS, WM_MOVE, WM_NCCREATE, WM_SETFOCUS, WM_SIZE, WNDCLASSEXW,
    WS_MAXIMIZEBOX, WS_MINIMIZEBOX, WS_OVERLAPPEDWINDOW, WS_POPUP, WS_THICKFRAME,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShowState {
    Normal,
    Minimized,
    Maximized,
}

/// Data reachable from the window procedure.
struct ProcState {
    ctx: Arc<WindowContext>,
    show: Cell<ShowState>,
}

fn loword(lparam: LPARAM) -> u16 {
    (lparam.0 as usize & 0xFFFF) as u16
}

fn hiword(lparam: LPARAM) -> u16 {
    ((lparam.0 as usize >> 16) & 0xFFFF) as u16
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_NCCREATE {
        let create = &*(lparam.0 as *const CREATESTRUCTW);
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, create.lpCreateParams as isize);
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    }

    let state = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const ProcState;
    let Some(state) = state.as_ref() else {
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    };
    let ctx = &state.ctx;

    match msg {
        WM_CLOSE => {
            // Never let DefWindowProc destroy the window; the render thread does.
            ctx.dispatch(NativeEvent::CloseRequested);
            return LRESULT(0);
        }
        WM_SIZE => {
            let width = i32::from(loword(lparam));
            let height = i32::from(hiword(lparam));
            match wparam.0 as u32 {
                SIZE_MINIMIZED => {
                    if state.show.replace(ShowState::Minimized) != ShowState::Minimized {
                        ctx.dispatch(NativeEvent::Minimized);
                    }
                }
                SIZE_MAXIMIZED => {
                    if state.show.replace(ShowState::Maximized) != ShowState::Maximized {
                        ctx.dispatch(NativeEvent::Maximized);
                    }
                    ctx.dispatch(NativeEvent::Resized { width, height });
                }
                SIZE_RESTORED => {
                    if state.show.replace(ShowState::Normal) != ShowState::Normal {
                        ctx.dispatch(NativeEvent::Restored);
                    }
                    ctx.dispatch(NativeEvent::Resized { width, height });
                }
                _ => {}
            }
        }
        WM_MOVE => {
            let x = i32::from(loword(lparam) as i16);
            let y = i32::from(hiword(lparam) as i16);
            ctx.dispatch(NativeEvent::Moved { x, y });
        }
        WM_SETFOCUS => {
            ctx.dispatch(NativeEvent::FocusGained);
        }
        WM_KILLFOCUS => {
            ctx.dispatch(NativeEvent::FocusLost);
        }
        _ => {}
    }

    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn style_bits(current: WINDOW_STYLE, style: WindowStyle) -> WINDOW_STYLE {
    let mut bits = current;
    if style.borderless {
        bits &= !WS_OVERLAPPEDWINDOW;
        bits |= WS_POPUP;
        return bits;
    }

    bits |= WS_OVERLAPPEDWINDOW;
    bits &= !WS_POPUP;
    for (enabled, flag) in [
        (style.has_min_button, WS_MINIMIZEBOX),
        (style.has_max_button, WS_MAXIMIZEBOX),
        (style.resizable, WS_THICKFRAME),
    ] {
        if enabled {
            bits |= flag;
        } else {
            bits &= !flag;
        }
    }
    bits
}

/// Outer window size whose client area is `width`×`height` under `style`.
fn outer_size(width: i32, height: i32, style: WINDOW_STYLE) -> (i32, i32) {
    let mut rect = RECT {
        left: 0,
        top: 0,
        right: width,
        bottom: height,
    };
    match unsafe { AdjustWindowRect(&mut rect, style, false) } {
        Ok(()) => (rect.right - rect.left, rect.bottom - rect.top),
        Err(err) => {
            warn!("⚠️ AdjustWindowRect failed: {}", err);
            (width, height)
        }
    }
}

/// A top-level window owned by the current render thread.
pub(crate) struct Win32Window {
    hwnd: HWND,
    hinstance: HINSTANCE,
    class_name: HSTRING,
    state: *mut ProcState,
}

impl Win32Window {
    pub fn create(ctx: &Arc<WindowContext>, init: &SurfaceInit) -> Result<Self> {
        let hinstance: HINSTANCE = unsafe { GetModuleHandleW(None) }
            .context("GetModuleHandleW failed")?
            .into();
        let class_name = HSTRING::from(format!(
            "{}_{:x}",
            init.class_prefix,
            ctx.handle().to_raw()
        ));

        let class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_OWNDC,
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance,
            hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
            lpszClassName: windows::core::PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        if unsafe { RegisterClassExW(&class) } == 0 {
            anyhow::bail!(
                "RegisterClassExW failed for {}: {}",
                class_name,
                std::io::Error::last_os_error()
            );
        }

        let state = Box::into_raw(Box::new(ProcState {
            ctx: Arc::clone(ctx),
            show: Cell::new(ShowState::Normal),
        }));

        let (width, height) = outer_size(init.rect.width, init.rect.height, WS_OVERLAPPEDWINDOW);
        let created = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                &class_name,
                &HSTRING::from(init.title.as_str()),
                WS_OVERLAPPEDWINDOW,
                init.rect.x,
                init.rect.y,
                width,
                height,
                None,
                None,
                Some(hinstance),
                Some(state as *const c_void),
            )
        };

        let hwnd = match created {
            Ok(hwnd) => hwnd,
            Err(err) => {
                unsafe {
                    drop(Box::from_raw(state));
                    let _ = UnregisterClassW(&class_name, Some(hinstance));
                }
                return Err(err).context("CreateWindowExW failed");
            }
        };

        debug!("🪟 Win32 window {:?} created with class {}", hwnd.0, class_name);
        Ok(Self {
            hwnd,
            hinstance,
            class_name,
            state,
        })
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    pub fn show(&self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_SHOWDEFAULT);
        }
    }

    /// Drains this thread's message queue through the window procedure.
    pub fn pump(&self) {
        let mut msg = MSG::default();
        unsafe {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    fn current_style(&self) -> WINDOW_STYLE {
        WINDOW_STYLE(unsafe { GetWindowLongPtrW(self.hwnd, GWL_STYLE) } as u32)
    }

    /// Frame flags and DWM transparency, committed with a single frame change.
    pub fn apply_style(&self, style: WindowStyle) {
        let bits = style_bits(self.current_style(), style);
        let margin = if style.transparent { -1 } else { 0 };
        let margins = MARGINS {
            cxLeftWidth: margin,
            cxRightWidth: margin,
            cyTopHeight: margin,
            cyBottomHeight: margin,
        };
        unsafe {
            SetWindowLongPtrW(self.hwnd, GWL_STYLE, bits.0 as isize);
            if let Err(err) = DwmExtendFrameIntoClientArea(self.hwnd, &margins) {
                warn!("⚠️ DwmExtendFrameIntoClientArea failed: {}", err);
            }
            if let Err(err) = SetWindowPos(
                self.hwnd,
                None,
                0,
                0,
                0,
                0,
                SWP_FRAMECHANGED | SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER,
            ) {
                warn!("⚠️ SetWindowPos(frame change) failed: {}", err);
            }
        }
    }

    /// Moves the window and sizes its client area.
    pub fn apply_rect(&self, rect: Rect) {
        let (width, height) = outer_size(rect.width, rect.height, self.current_style());
        if let Err(err) =
            unsafe { SetWindowPos(self.hwnd, None, rect.x, rect.y, width, height, SWP_NOZORDER) }
        {
            warn!("⚠️ SetWindowPos failed: {}", err);
        }
    }

    pub fn apply_title(&self, title: &Title) {
        if let Err(err) = unsafe { SetWindowTextW(self.hwnd, &HSTRING::from(title.as_str())) } {
            warn!("⚠️ SetWindowTextW failed: {}", err);
        }
    }

    pub fn focus(&self) {
        unsafe {
            let _ = SetForegroundWindow(self.hwnd);
            let _ = SetFocus(Some(self.hwnd));
        }
    }

    /// Current client area size.
    pub fn client_size(&self) -> (i32, i32) {
        let mut rect = RECT::default();
        match unsafe { GetClientRect(self.hwnd, &mut rect) } {
            Ok(()) => (rect.right - rect.left, rect.bottom - rect.top),
            Err(_) => (0, 0),
        }
    }
}

impl Drop for Win32Window {
    fn drop(&mut self) {
        unsafe {
            // Messages sent while the window dies go straight to DefWindowProc.
            SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
            if let Err(err) = DestroyWindow(self.hwnd) {
                warn!("⚠️ DestroyWindow failed: {}", err);
            }
            if let Err(err) = UnregisterClassW(&self.class_name, Some(self.hinstance)) {
                warn!("⚠️ UnregisterClassW({}) failed: {}", self.class_name, err);
            }
            drop(Box::from_raw(self.state));
        }
        debug!("🪟 Win32 window {} released", self.class_name);
    }
}
