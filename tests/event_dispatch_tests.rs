//! Native events, the close veto and host callbacks.

mod common;

use common::{eventually, manager, settle, window, EventLog, WAIT};
use multiwindow::event::{EventKind, HostEvent, NativeEvent};
use multiwindow::{LoopState, SubWindowError, TextureRef, WindowHandle};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_move_and_resize_payloads() {
    let (manager, backend) = manager();
    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    let log = EventLog::default();
    manager
        .set_event_callback(handle, Some(log.sink()))
        .expect("callback");

    let win = window(&backend, handle);
    win.push_event(NativeEvent::Moved { x: -20, y: 40 });
    win.push_event(NativeEvent::Resized {
        width: 800,
        height: 600,
    });
    win.push_event(NativeEvent::Minimized);

    assert!(log.wait_for(EventKind::Minimized));
    assert_eq!(
        log.events(),
        vec![
            HostEvent::new(EventKind::Moved, -20, 40),
            HostEvent::new(EventKind::Resized, 800, 600),
            HostEvent::new(EventKind::Minimized, 0, 0),
        ]
    );
    assert!(log.handles().iter().all(|h| *h == handle));
}

#[test]
fn test_vetoed_close_keeps_window_open() {
    let (manager, backend) = manager();
    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    let log = EventLog::default();
    let asked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&asked);
    manager
        .set_event_callback(handle, Some(log.sink()))
        .expect("callback");
    manager
        .set_close_callback(
            handle,
            Some(Arc::new(move |_: WindowHandle| {
                counter.fetch_add(1, Ordering::SeqCst);
                false
            })),
        )
        .expect("close callback");

    let win = window(&backend, handle);
    win.push_event(NativeEvent::CloseRequested);
    assert!(eventually(|| asked.load(Ordering::SeqCst) == 1));
    settle(&win);

    assert!(manager.is_running(handle));
    assert!(!win.is_destroyed());
    assert_eq!(log.count(EventKind::Closed), 0);
}

#[test]
fn test_accepted_close_emits_closed_once() {
    let (manager, backend) = manager();
    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    let log = EventLog::default();
    manager
        .set_event_callback(handle, Some(log.sink()))
        .expect("callback");
    manager
        .set_close_callback(handle, Some(Arc::new(|_: WindowHandle| true)))
        .expect("close callback");

    let win = window(&backend, handle);
    win.push_event(NativeEvent::CloseRequested);
    win.push_event(NativeEvent::CloseRequested);

    assert!(win.wait_for_destroy(WAIT));
    let ctx = manager.context(handle).expect("handle stays valid until destroy");
    assert!(ctx.wait_for_state(WAIT, |s| s == LoopState::Terminated));
    assert!(!manager.is_running(handle));
    assert_eq!(log.count(EventKind::Closed), 1);

    manager.destroy(handle).expect("destroy");
    assert_eq!(log.count(EventKind::Closed), 1);
}

#[test]
fn test_close_without_callback_is_allowed() {
    let (manager, backend) = manager();
    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    let win = window(&backend, handle);

    win.push_event(NativeEvent::CloseRequested);
    assert!(win.wait_for_destroy(WAIT));
    assert!(!manager.is_running(handle));
}

#[test]
fn test_device_loss_closes_window() {
    let (manager, backend) = manager();
    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    let log = EventLog::default();
    manager
        .set_event_callback(handle, Some(log.sink()))
        .expect("callback");

    let win = window(&backend, handle);
    win.lose_device();

    assert!(win.wait_for_destroy(WAIT));
    assert!(log.wait_for(EventKind::Closed));
    assert_eq!(log.count(EventKind::Closed), 1);
    assert!(!manager.is_running(handle));
}

#[test]
fn test_host_destroy_emits_no_closed() {
    let (manager, backend) = manager();
    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    let log = EventLog::default();
    manager
        .set_event_callback(handle, Some(log.sink()))
        .expect("callback");
    window(&backend, handle);

    manager.destroy(handle).expect("destroy");
    assert_eq!(log.count(EventKind::Closed), 0);
}

#[test]
fn test_callback_may_call_setters_on_its_own_window() {
    let (manager, backend) = manager();
    let manager = Arc::new(manager);
    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    let replacement = TextureRef::from_raw(0x99);

    let weak = Arc::downgrade(&manager);
    let sink = move |handle: WindowHandle, event: HostEvent| {
        if event.kind == EventKind::FocusGained {
            if let Some(manager) = weak.upgrade() {
                let _ = manager.update_texture(handle, replacement);
                let _ = manager.focus_window(handle);
                let _ = manager.signal_frame_ready(handle);
            }
        }
    };
    manager
        .set_event_callback(handle, Some(Arc::new(sink)))
        .expect("callback");

    let win = window(&backend, handle);
    win.push_event(NativeEvent::FocusGained);
    win.wait_for_frame(0, WAIT, |f| f.texture == Some(replacement))
        .expect("texture set from inside the callback");
    assert!(eventually(|| win.focus_requests() >= 1));

    manager.shutdown_all();
}

#[test]
fn test_destroy_from_callback_is_rejected() {
    let (manager, backend) = manager();
    let manager = Arc::new(manager);
    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    let outcome: Arc<Mutex<Option<Result<(), SubWindowError>>>> = Arc::new(Mutex::new(None));

    let weak = Arc::downgrade(&manager);
    let slot = Arc::clone(&outcome);
    let sink = move |handle: WindowHandle, event: HostEvent| {
        if event.kind == EventKind::Moved {
            if let Some(manager) = weak.upgrade() {
                *slot.lock() = Some(manager.destroy(handle));
            }
        }
    };
    manager
        .set_event_callback(handle, Some(Arc::new(sink)))
        .expect("callback");

    let win = window(&backend, handle);
    win.push_event(NativeEvent::Moved { x: 1, y: 2 });
    assert!(eventually(|| outcome.lock().is_some()));

    assert!(matches!(
        outcome.lock().take(),
        Some(Err(SubWindowError::DestroyFromRenderThread))
    ));
    assert!(manager.is_running(handle));

    manager.destroy(handle).expect("destroy from the host thread");
    assert!(win.is_destroyed());
}
