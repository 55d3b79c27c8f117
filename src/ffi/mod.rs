//! C ABI surface of the plugin.
//!
//! [`PluginHost`] turns raw pointers and C callbacks into manager calls and
//! is generic over the backend. The exported `extern` symbols in
//! [`exports`] only own the process-wide instance and the host capture.
//!
//! Handles cross the boundary as pointer-sized integers, so a null pointer
//! is always an invalid handle.

pub mod unity;

#[cfg(any(windows, target_os = "linux"))]
pub mod exports;

use crate::backend::Backend;
use crate::command::{Rect, TextureRef, Title, WindowSettings, WindowStyle};
use crate::config::MultiWindowConfig;
use crate::error::{SubWindowError, SubWindowResult};
use crate::event::{CloseArbiter, EventSink, HostEvent};
use crate::handle::WindowHandle;
use crate::manager::SubWindowManager;
use log::{info, warn};
use std::ffi::{c_char, c_int, c_void, CStr};
use std::sync::Arc;

/// `void (*)(void* handle, int type, int data1, int data2)`
pub type EventCallbackFn =
    unsafe extern "C" fn(handle: *mut c_void, kind: c_int, data1: c_int, data2: c_int);

/// `bool (*)(void* handle)`; returning false vetoes the close.
pub type CloseCallbackFn = unsafe extern "C" fn(handle: *mut c_void) -> bool;

/// Null when the handle has no pointer-sized encoding.
pub fn handle_to_ptr(handle: WindowHandle) -> *mut c_void {
    match handle.to_bits() {
        Some(bits) => bits as *mut c_void,
        None => {
            warn!("⚠️ Handle {} does not fit in a pointer", handle);
            std::ptr::null_mut()
        }
    }
}

pub fn handle_from_ptr(ptr: *mut c_void) -> SubWindowResult<WindowHandle> {
    let bits = ptr as usize;
    WindowHandle::from_bits(bits).ok_or(SubWindowError::InvalidHandle(bits as u64))
}

struct HostEventCallback(EventCallbackFn);

impl EventSink for HostEventCallback {
    fn on_event(&self, handle: WindowHandle, event: HostEvent) {
        unsafe { (self.0)(handle_to_ptr(handle), event.kind.code(), event.data1, event.data2) }
    }
}

struct HostCloseCallback(CloseCallbackFn);

impl CloseArbiter for HostCloseCallback {
    fn allow_close(&self, handle: WindowHandle) -> bool {
        unsafe { (self.0)(handle_to_ptr(handle)) }
    }
}

/// Copies a host C string, treating null as empty.
///
/// # Safety
/// `text` must be null or point to a NUL-terminated string.
unsafe fn title_from_c(text: *const c_char) -> Title {
    if text.is_null() {
        return Title::default();
    }
    Title::new(&CStr::from_ptr(text).to_string_lossy())
}

/// Plugin state between `UnityPluginLoad` and `UnityPluginUnload`.
pub struct PluginHost<B: Backend> {
    manager: SubWindowManager<B>,
}

impl<B: Backend> PluginHost<B> {
    pub fn new(backend: B, config: MultiWindowConfig) -> Self {
        info!("🔌 {}", crate::build_info());
        Self {
            manager: SubWindowManager::with_config(backend, config),
        }
    }

    pub fn manager(&self) -> &SubWindowManager<B> {
        &self.manager
    }

    pub fn backend(&self) -> &B {
        self.manager.backend()
    }

    /// `StartSubWindow`: null when the window could not be created.
    pub fn start(&self, texture: *mut c_void, width: c_int, height: c_int) -> *mut c_void {
        match self
            .manager
            .create(TextureRef::from_raw(texture as usize), width, height)
        {
            Ok(handle) => {
                let ptr = handle_to_ptr(handle);
                if ptr.is_null() {
                    if let Err(err) = self.manager.destroy(handle) {
                        warn!("⚠️ Destroying unaddressable sub-window {} failed: {}", handle, err);
                    }
                }
                ptr
            }
            Err(err) => {
                warn!("⚠️ StartSubWindow failed: {}", err);
                std::ptr::null_mut()
            }
        }
    }

    pub fn stop(&self, handle: *mut c_void) -> SubWindowResult<()> {
        self.manager.destroy(handle_from_ptr(handle)?)
    }

    pub fn signal_frame_ready(&self, handle: *mut c_void) -> SubWindowResult<()> {
        self.manager.signal_frame_ready(handle_from_ptr(handle)?)
    }

    /// A null callback unregisters.
    pub fn set_event_callback(
        &self,
        handle: *mut c_void,
        callback: Option<EventCallbackFn>,
    ) -> SubWindowResult<()> {
        let sink = callback.map(|f| Arc::new(HostEventCallback(f)) as Arc<dyn EventSink>);
        self.manager.set_event_callback(handle_from_ptr(handle)?, sink)
    }

    /// A null callback unregisters; closes are then always allowed.
    pub fn set_close_callback(
        &self,
        handle: *mut c_void,
        callback: Option<CloseCallbackFn>,
    ) -> SubWindowResult<()> {
        let arbiter = callback.map(|f| Arc::new(HostCloseCallback(f)) as Arc<dyn CloseArbiter>);
        self.manager.set_close_callback(handle_from_ptr(handle)?, arbiter)
    }

    pub fn update_texture(&self, handle: *mut c_void, texture: *mut c_void) -> SubWindowResult<()> {
        self.manager
            .update_texture(handle_from_ptr(handle)?, TextureRef::from_raw(texture as usize))
    }

    pub fn focus(&self, handle: *mut c_void) -> SubWindowResult<()> {
        self.manager.focus_window(handle_from_ptr(handle)?)
    }

    /// `SetConfig`.
    ///
    /// # Safety
    /// `title` must be null or a NUL-terminated string.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn set_config(
        &self,
        handle: *mut c_void,
        x: c_int,
        y: c_int,
        width: c_int,
        height: c_int,
        title: *const c_char,
        style: WindowStyle,
    ) -> SubWindowResult<()> {
        let handle = handle_from_ptr(handle)?;
        let settings = WindowSettings {
            rect: Rect::new(x, y, width, height),
            title: title_from_c(title),
            style,
        };
        self.manager.set_config(handle, settings)
    }

    pub fn is_running(&self, handle: *mut c_void) -> bool {
        handle_from_ptr(handle)
            .map(|handle| self.manager.is_running(handle))
            .unwrap_or(false)
    }

    /// Joins every render thread; returns how many windows were live.
    pub fn unload(&self) -> usize {
        let closed = self.manager.shutdown_all();
        info!("🔌 Plugin unloaded ({} sub-window(s) closed)", closed);
        closed
    }
}
