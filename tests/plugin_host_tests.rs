//! The C-facing plugin surface driven through the headless backend.

mod common;

use common::{eventually, fast_config, window, WAIT};
use multiwindow::backend::headless::HeadlessBackend;
use multiwindow::event::{EventKind, NativeEvent};
use multiwindow::ffi::{handle_from_ptr, PluginHost};
use multiwindow::{Rect, SubWindowError, WindowStyle};
use parking_lot::Mutex;
use std::ffi::{c_int, c_void};
use std::sync::atomic::{AtomicUsize, Ordering};

fn host() -> (PluginHost<HeadlessBackend>, HeadlessBackend) {
    let backend = HeadlessBackend::new();
    (PluginHost::new(backend.clone(), fast_config()), backend)
}

#[test]
fn test_start_returns_null_without_host_device() {
    let (host, backend) = host();
    backend.set_host_ready(false);
    assert!(host.start(1 as *mut c_void, 64, 64).is_null());
    assert!(!host.is_running(std::ptr::null_mut()));
}

#[test]
fn test_start_configure_stop() {
    let (host, backend) = host();
    let ptr = host.start(0x40 as *mut c_void, 128, 96);
    assert!(!ptr.is_null());
    assert!(host.is_running(ptr));

    let handle = handle_from_ptr(ptr).expect("valid handle");
    let win = window(&backend, handle);
    let style = WindowStyle {
        borderless: true,
        ..WindowStyle::default()
    };
    unsafe { host.set_config(ptr, 5, 6, 300, 200, c"Inspector".as_ptr(), style) }
        .expect("set_config");
    let frame = win
        .wait_for_frame(0, WAIT, |f| f.title.as_str() == "Inspector")
        .expect("config applied");
    assert_eq!(frame.rect, Rect::new(5, 6, 300, 200));
    assert!(frame.style.borderless);

    unsafe { host.set_config(ptr, 5, 6, 300, 200, std::ptr::null(), style) }
        .expect("null title");
    assert!(eventually(|| win.title().is_empty()));

    host.focus(ptr).expect("focus");
    host.update_texture(ptr, std::ptr::null_mut()).expect("update");
    host.signal_frame_ready(ptr).expect("signal");

    host.stop(ptr).expect("stop");
    assert!(win.is_destroyed());
    assert!(!host.is_running(ptr));
    assert!(matches!(host.stop(ptr), Err(SubWindowError::InvalidHandle(_))));
}

#[test]
fn test_null_handle_is_rejected_everywhere() {
    let (host, _backend) = host();
    let null = std::ptr::null_mut();
    assert!(matches!(host.stop(null), Err(SubWindowError::InvalidHandle(0))));
    assert!(host.signal_frame_ready(null).is_err());
    assert!(host.focus(null).is_err());
    assert!(host.update_texture(null, null).is_err());
    assert!(host.set_event_callback(null, None).is_err());
    assert!(host.set_close_callback(null, None).is_err());
    assert!(unsafe { host.set_config(null, 0, 0, 1, 1, std::ptr::null(), WindowStyle::default()) }
        .is_err());
}

static EVENTS: Mutex<Vec<(usize, c_int, c_int, c_int)>> = parking_lot::const_mutex(Vec::new());
static CLOSE_ASKED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn record_event(handle: *mut c_void, kind: c_int, data1: c_int, data2: c_int) {
    EVENTS.lock().push((handle as usize, kind, data1, data2));
}

unsafe extern "C" fn refuse_close(_handle: *mut c_void) -> bool {
    CLOSE_ASKED.fetch_add(1, Ordering::SeqCst);
    false
}

#[test]
fn test_c_callbacks_receive_handle_and_payload() {
    let (host, backend) = host();
    let ptr = host.start(1 as *mut c_void, 64, 64);
    let handle = handle_from_ptr(ptr).expect("valid handle");
    host.set_event_callback(ptr, Some(record_event)).expect("callback");
    host.set_close_callback(ptr, Some(refuse_close)).expect("callback");

    let win = window(&backend, handle);
    win.push_event(NativeEvent::Resized {
        width: 640,
        height: 360,
    });
    win.push_event(NativeEvent::CloseRequested);

    assert!(eventually(|| CLOSE_ASKED.load(Ordering::SeqCst) == 1));
    assert!(eventually(|| !EVENTS.lock().is_empty()));
    assert_eq!(
        EVENTS.lock().first().copied(),
        Some((ptr as usize, EventKind::Resized.code(), 640, 360))
    );
    assert!(host.is_running(ptr));

    // Unregistering the close callback lets the next request through.
    host.set_close_callback(ptr, None).expect("unregister");
    win.push_event(NativeEvent::CloseRequested);
    assert!(win.wait_for_destroy(WAIT));
    assert!(eventually(|| EVENTS
        .lock()
        .iter()
        .any(|(_, kind, _, _)| *kind == EventKind::Closed.code())));
    assert_eq!(CLOSE_ASKED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unload_joins_every_window() {
    let (host, backend) = host();
    let windows: Vec<_> = (1..=3usize)
        .map(|i| host.start(i as *mut c_void, 32, 32))
        .collect();
    let handles: Vec<_> = windows
        .iter()
        .map(|ptr| handle_from_ptr(*ptr).expect("valid handle"))
        .collect();
    for handle in &handles {
        window(&backend, *handle);
    }

    assert_eq!(host.unload(), 3);
    for handle in handles {
        assert!(backend.window(handle).expect("created").is_destroyed());
    }
    assert!(windows.iter().all(|ptr| !host.is_running(*ptr)));
}
