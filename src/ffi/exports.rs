//! Exported symbols loaded by the host engine.
//!
//! One [`PluginHost`] per process lives between `UnityPluginLoad` and
//! `UnityPluginUnload`. Every entry point catches panics; failures are
//! logged and reported through the C return value (null or false).
//!
//! Entry points take the plugin lock with `read_recursive`, so a host
//! callback running on a render thread may call back into the plugin while
//! the host thread is blocked in `StopSubWindow` on that same thread.

use super::unity::IUnityInterfaces;
use super::{CloseCallbackFn, EventCallbackFn, PluginHost};
use crate::backend::PlatformBackend;
use crate::command::WindowStyle;
use crate::config::{LoggingConfig, MultiWindowConfig};
use crate::error::{SubWindowError, SubWindowResult};
use crate::logging;
use log::{debug, error, warn};
use parking_lot::RwLock;
use std::ffi::{c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};

static PLUGIN: RwLock<Option<PluginHost<PlatformBackend>>> = parking_lot::const_rwlock(None);

fn guarded<R>(entry: &str, fallback: R, f: impl FnOnce() -> R) -> R {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        error!("❌ Panic in {}", entry);
        fallback
    })
}

fn with_host<R>(
    entry: &str,
    f: impl FnOnce(&PluginHost<PlatformBackend>) -> SubWindowResult<R>,
) -> Option<R> {
    guarded(entry, None, || {
        let plugin = PLUGIN.read_recursive();
        let result = match plugin.as_ref() {
            Some(host) => f(host),
            None => Err(SubWindowError::NotLoaded),
        };
        result
            .map_err(|err| warn!("⚠️ {} failed: {}", entry, err))
            .ok()
    })
}

#[cfg(all(windows, not(feature = "opengl")))]
unsafe fn capture_host(backend: &PlatformBackend, interfaces: *mut IUnityInterfaces) -> bool {
    use super::unity::IUnityGraphicsD3D11;

    let Some(interfaces) = interfaces.as_ref() else {
        warn!("⚠️ UnityPluginLoad received no interface registry");
        return false;
    };
    match interfaces.get::<IUnityGraphicsD3D11>() {
        Some(graphics) => backend.attach_host_device(graphics.device()),
        None => {
            warn!("⚠️ Host is not running on Direct3D 11");
            false
        }
    }
}

#[cfg(all(windows, not(feature = "opengl")))]
fn release_host(backend: &PlatformBackend) {
    backend.detach_host_device();
}

#[cfg(any(target_os = "linux", all(windows, feature = "opengl")))]
unsafe fn capture_host(backend: &PlatformBackend, _interfaces: *mut IUnityInterfaces) -> bool {
    backend.capture_current_context()
}

#[cfg(any(target_os = "linux", all(windows, feature = "opengl")))]
fn release_host(backend: &PlatformBackend) {
    backend.release_host_context();
}

fn init_logging(config: &MultiWindowConfig) {
    match logging::init(&config.logging) {
        Ok(true) => {}
        Ok(false) => debug!("Logger already installed by the host process"),
        Err(err) => {
            let _ = logging::init(&LoggingConfig::default());
            warn!("⚠️ Logging config rejected, using stderr: {:#}", err);
        }
    }
}

fn unload_host(host: PluginHost<PlatformBackend>) {
    host.unload();
    release_host(host.backend());
}

/// # Safety
/// `interfaces` must be null or the registry passed by the engine.
#[no_mangle]
pub unsafe extern "system" fn UnityPluginLoad(interfaces: *mut IUnityInterfaces) {
    guarded("UnityPluginLoad", (), || {
        let config = MultiWindowConfig::from_env();
        init_logging(&config);

        let backend = PlatformBackend::new();
        if !capture_host(&backend, interfaces) {
            warn!("⚠️ Host graphics not captured; StartSubWindow will return null");
        }
        let previous = PLUGIN.write().replace(PluginHost::new(backend, config));
        if let Some(previous) = previous {
            warn!("⚠️ UnityPluginLoad called twice, discarding the previous instance");
            unload_host(previous);
        }
    })
}

#[no_mangle]
pub extern "system" fn UnityPluginUnload() {
    guarded("UnityPluginUnload", (), || {
        // Taken out first so callbacks fired during shutdown see NotLoaded
        // instead of waiting on the write lock.
        let host = PLUGIN.write().take();
        if let Some(host) = host {
            unload_host(host);
        }
    })
}

#[no_mangle]
pub extern "C" fn StartSubWindow(texture: *mut c_void, width: c_int, height: c_int) -> *mut c_void {
    with_host("StartSubWindow", |host| Ok(host.start(texture, width, height)))
        .unwrap_or(std::ptr::null_mut())
}

#[no_mangle]
pub extern "C" fn StopSubWindow(handle: *mut c_void) {
    with_host("StopSubWindow", |host| host.stop(handle));
}

#[no_mangle]
pub extern "C" fn SignalFrameReady(handle: *mut c_void) {
    with_host("SignalFrameReady", |host| host.signal_frame_ready(handle));
}

#[no_mangle]
pub extern "C" fn SetEventCallback(handle: *mut c_void, callback: Option<EventCallbackFn>) {
    with_host("SetEventCallback", |host| host.set_event_callback(handle, callback));
}

#[no_mangle]
pub extern "C" fn SetCloseCallback(handle: *mut c_void, callback: Option<CloseCallbackFn>) {
    with_host("SetCloseCallback", |host| host.set_close_callback(handle, callback));
}

#[no_mangle]
pub extern "C" fn UpdateTexture(handle: *mut c_void, texture: *mut c_void) {
    with_host("UpdateTexture", |host| host.update_texture(handle, texture));
}

#[no_mangle]
pub extern "C" fn FocusWindow(handle: *mut c_void) {
    with_host("FocusWindow", |host| host.focus(handle));
}

/// # Safety
/// `title` must be null or a NUL-terminated string.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn SetConfig(
    handle: *mut c_void,
    x: c_int,
    y: c_int,
    width: c_int,
    height: c_int,
    title: *const c_char,
    borderless: bool,
    transparent: bool,
    resizable: bool,
    has_min_button: bool,
    has_max_button: bool,
) {
    let style = WindowStyle {
        borderless,
        transparent,
        resizable,
        has_min_button,
        has_max_button,
    };
    with_host("SetConfig", |host| {
        host.set_config(handle, x, y, width, height, title, style)
    });
}

#[no_mangle]
pub extern "C" fn IsSubWindowRunning(handle: *mut c_void) -> bool {
    with_host("IsSubWindowRunning", |host| Ok(host.is_running(handle))).unwrap_or(false)
}
