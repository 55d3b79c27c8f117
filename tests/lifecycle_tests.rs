//! Sub-window lifecycle through the manager and the headless backend.

mod common;

use common::{fast_config, manager, window, WAIT};
use multiwindow::backend::headless::HeadlessBackend;
use multiwindow::backend::InstancePolicy;
use multiwindow::{LoopState, SubWindowError, SubWindowManager, TextureRef};
use std::collections::HashSet;
use std::time::{Duration, Instant};

#[test]
fn test_create_present_destroy() {
    let (manager, backend) = manager();
    let texture = TextureRef::from_raw(0x1000);

    let handle = manager.create(texture, 320, 240).expect("create");
    assert!(manager.is_running(handle));

    let win = window(&backend, handle);
    let frame = win
        .wait_for_frame(0, WAIT, |f| f.texture == Some(texture))
        .expect("initial texture presented");
    assert_eq!((frame.rect.width, frame.rect.height), (320, 240));
    assert_eq!(frame.title.as_str(), "Init");

    let ctx = manager.context(handle).expect("live handle");
    assert!(ctx.wait_for_state(WAIT, |s| s == LoopState::Running));

    manager.destroy(handle).expect("destroy");
    assert!(win.is_destroyed());
    assert_eq!(ctx.state(), LoopState::Terminated);
    assert!(!manager.is_running(handle));
    assert!(matches!(
        manager.signal_frame_ready(handle),
        Err(SubWindowError::InvalidHandle(_))
    ));
}

#[test]
fn test_destroy_does_not_wait_for_the_wake_timeout() {
    let backend = HeadlessBackend::new();
    let mut config = fast_config();
    config.render.wake_timeout_ms = 10_000;
    let manager = SubWindowManager::with_config(backend.clone(), config);

    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    window(&backend, handle);

    let started = Instant::now();
    manager.destroy(handle).expect("destroy");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_signal_frame_ready_wakes_the_loop() {
    let backend = HeadlessBackend::new();
    let mut config = fast_config();
    config.render.wake_timeout_ms = 10_000;
    let manager = SubWindowManager::with_config(backend.clone(), config);

    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    let win = window(&backend, handle);
    let seen = win.frames().len();

    manager.signal_frame_ready(handle).expect("signal");
    assert!(win
        .wait_for_frame(seen, Duration::from_secs(2), |_| true)
        .is_some());
}

#[test]
fn test_setup_failure_terminates_without_surface() {
    let (manager, backend) = manager();
    backend.fail_next_setups(1);

    let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    let ctx = manager.context(handle).expect("live handle");
    assert!(ctx.wait_for_state(WAIT, |s| s == LoopState::Terminated));
    assert!(!manager.is_running(handle));
    assert!(backend.window(handle).is_none());

    manager.destroy(handle).expect("destroy after failed setup");
}

#[test]
fn test_windows_are_independent() {
    let (manager, backend) = manager();
    let handles: Vec<_> = (1..=4)
        .map(|i| manager.create(TextureRef::from_raw(i), 100, 100).expect("create"))
        .collect();
    assert_eq!(handles.iter().collect::<HashSet<_>>().len(), 4);

    for handle in &handles {
        window(&backend, *handle);
    }
    manager.destroy(handles[1]).expect("destroy one");
    assert!(!manager.is_running(handles[1]));
    for handle in [handles[0], handles[2], handles[3]] {
        assert!(manager.is_running(handle));
    }

    assert_eq!(manager.shutdown_all(), 3);
    assert!(manager.live_windows().is_empty());
    for handle in handles {
        assert!(backend.window(handle).map_or(true, |w| w.is_destroyed()));
    }
}

#[test]
fn test_stale_handle_never_reaches_slot_reuse() {
    let (manager, _backend) = manager();
    let first = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    manager.destroy(first).expect("destroy");

    let second = manager.create(TextureRef::from_raw(2), 64, 64).expect("create");
    assert_eq!(first.index(), second.index());
    assert_ne!(first, second);
    assert!(matches!(
        manager.update_texture(first, TextureRef::from_raw(3)),
        Err(SubWindowError::InvalidHandle(_))
    ));
    assert!(manager.is_running(second));
}

#[test]
fn test_single_instance_backend() {
    let backend = HeadlessBackend::with_policy(InstancePolicy::Single);
    let manager = SubWindowManager::with_config(backend.clone(), fast_config());

    let first = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
    window(&backend, first);
    assert!(matches!(
        manager.create(TextureRef::from_raw(2), 64, 64),
        Err(SubWindowError::AlreadyActive)
    ));

    manager.destroy(first).expect("destroy");
    let second = manager.create(TextureRef::from_raw(2), 64, 64).expect("create again");
    assert!(manager.is_running(second));
}

#[test]
fn test_manager_drop_joins_render_threads() {
    let backend = HeadlessBackend::new();
    let win = {
        let manager = SubWindowManager::with_config(backend.clone(), fast_config());
        let handle = manager.create(TextureRef::from_raw(1), 64, 64).expect("create");
        window(&backend, handle)
    };
    assert!(win.is_destroyed());
}
