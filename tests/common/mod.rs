//! Helpers shared by the integration suites.

#![allow(dead_code)]

use multiwindow::backend::headless::{HeadlessBackend, HeadlessWindow};
use multiwindow::event::{EventKind, EventSink, HostEvent};
use multiwindow::{MultiWindowConfig, SubWindowManager, WindowHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const WAIT: Duration = Duration::from_secs(5);

/// Defaults with a short wake timeout so the loop spins quickly.
pub fn fast_config() -> MultiWindowConfig {
    let mut config = MultiWindowConfig::default();
    config.render.wake_timeout_ms = 5;
    config
}

pub fn manager() -> (SubWindowManager<HeadlessBackend>, HeadlessBackend) {
    let backend = HeadlessBackend::new();
    let manager = SubWindowManager::with_config(backend.clone(), fast_config());
    (manager, backend)
}

pub fn window(backend: &HeadlessBackend, handle: WindowHandle) -> Arc<HeadlessWindow> {
    backend
        .wait_for_window(handle, WAIT)
        .expect("render thread never created its surface")
}

/// Waits until at least two frames newer than the current ones exist, which
/// guarantees one full pump has run since the call.
pub fn settle(window: &HeadlessWindow) {
    let seen = window.frames().len();
    window
        .wait_for_frame(seen + 1, WAIT, |_| true)
        .expect("render loop stalled");
}

/// Polls `cond` until it holds or [`WAIT`] elapses.
pub fn eventually(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Records every event delivered to the host.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<(WindowHandle, HostEvent)>>>);

impl EventLog {
    pub fn sink(&self) -> Arc<dyn EventSink> {
        let log = self.clone();
        Arc::new(move |handle: WindowHandle, event: HostEvent| {
            log.0.lock().push((handle, event));
        })
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.0.lock().iter().map(|(_, event)| *event).collect()
    }

    pub fn handles(&self) -> Vec<WindowHandle> {
        self.0.lock().iter().map(|(handle, _)| *handle).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.0.lock().iter().filter(|(_, e)| e.kind == kind).count()
    }

    pub fn wait_for(&self, kind: EventKind) -> bool {
        eventually(|| self.count(kind) > 0)
    }
}
