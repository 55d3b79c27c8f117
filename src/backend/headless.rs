//! In-process backend with no native window.
//!
//! Records everything the render loop asks of it and lets tests script the
//! windowing system: queue native events, fail setup, lose the device.

use super::{Backend, InstancePolicy, PresentStatus, Surface, SurfaceInit};
use crate::command::{PendingCommands, Rect, TextureRef, Title, WindowStyle};
use crate::context::WindowContext;
use crate::event::NativeEvent;
use crate::handle::WindowHandle;
use anyhow::bail;
use log::debug;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What one presented frame looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub texture: Option<TextureRef>,
    pub rect: Rect,
    pub title: Title,
    pub style: WindowStyle,
}

#[derive(Debug)]
struct WindowState {
    rect: Rect,
    title: Title,
    style: WindowStyle,
    focus_requests: usize,
    applied: Vec<PendingCommands>,
    frames: Vec<Frame>,
    destroyed: bool,
}

/// Observation and scripting point for one headless window.
#[derive(Debug)]
pub struct HeadlessWindow {
    handle: WindowHandle,
    inbox: Mutex<VecDeque<NativeEvent>>,
    device_lost: AtomicBool,
    state: Mutex<WindowState>,
    changed: Condvar,
}

impl HeadlessWindow {
    fn new(handle: WindowHandle, init: &SurfaceInit) -> Self {
        Self {
            handle,
            inbox: Mutex::new(VecDeque::new()),
            device_lost: AtomicBool::new(false),
            state: Mutex::new(WindowState {
                rect: init.rect,
                title: init.title.clone(),
                style: WindowStyle::default(),
                focus_requests: 0,
                applied: Vec::new(),
                frames: Vec::new(),
                destroyed: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    /// Queues a native event for the next pump.
    pub fn push_event(&self, event: NativeEvent) {
        self.inbox.lock().push_back(event);
    }

    /// Makes the next present report device loss.
    pub fn lose_device(&self) {
        self.device_lost.store(true, Ordering::Release);
    }

    pub fn rect(&self) -> Rect {
        self.state.lock().rect
    }

    pub fn title(&self) -> Title {
        self.state.lock().title.clone()
    }

    pub fn style(&self) -> WindowStyle {
        self.state.lock().style
    }

    pub fn focus_requests(&self) -> usize {
        self.state.lock().focus_requests
    }

    /// Every non-empty command batch applied so far, oldest first.
    pub fn applied(&self) -> Vec<PendingCommands> {
        self.state.lock().applied.clone()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.state.lock().frames.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Waits for a presented frame, newer than the first `skip` frames, that
    /// satisfies `pred`.
    pub fn wait_for_frame(
        &self,
        skip: usize,
        timeout: Duration,
        pred: impl Fn(&Frame) -> bool,
    ) -> Option<Frame> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(frame) = state.frames.iter().skip(skip).find(|f| pred(f)) {
                return Some(frame.clone());
            }
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return state.frames.iter().skip(skip).find(|f| pred(f)).cloned();
            }
        }
    }

    pub fn wait_for_destroy(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.destroyed {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return state.destroyed;
            }
        }
        true
    }
}

#[derive(Debug)]
struct Shared {
    host_ready: AtomicBool,
    failing_setups: AtomicUsize,
    windows: Mutex<HashMap<WindowHandle, Arc<HeadlessWindow>>>,
    created: AtomicUsize,
}

/// Backend used by the shared test suite. Cloning shares the recorded state.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    policy: InstancePolicy,
    shared: Arc<Shared>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_policy(InstancePolicy::Multiple)
    }

    pub fn with_policy(policy: InstancePolicy) -> Self {
        Self {
            policy,
            shared: Arc::new(Shared {
                host_ready: AtomicBool::new(true),
                failing_setups: AtomicUsize::new(0),
                windows: Mutex::new(HashMap::new()),
                created: AtomicUsize::new(0),
            }),
        }
    }

    pub fn set_host_ready(&self, ready: bool) {
        self.shared.host_ready.store(ready, Ordering::Release);
    }

    /// Makes the next `count` surface creations fail.
    pub fn fail_next_setups(&self, count: usize) {
        self.shared.failing_setups.store(count, Ordering::Release);
    }

    pub fn window(&self, handle: WindowHandle) -> Option<Arc<HeadlessWindow>> {
        self.shared.windows.lock().get(&handle).cloned()
    }

    /// Waits until the render thread of `handle` has created its surface.
    pub fn wait_for_window(
        &self,
        handle: WindowHandle,
        timeout: Duration,
    ) -> Option<Arc<HeadlessWindow>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(window) = self.window(handle) {
                return Some(window);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Surfaces successfully created so far.
    pub fn created_count(&self) -> usize {
        self.shared.created.load(Ordering::Acquire)
    }

    fn take_failure(&self) -> bool {
        self.shared
            .failing_setups
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Backend for HeadlessBackend {
    type Surface = HeadlessSurface;

    fn name(&self) -> &'static str {
        "headless"
    }

    fn host_ready(&self) -> bool {
        self.shared.host_ready.load(Ordering::Acquire)
    }

    fn instance_policy(&self) -> InstancePolicy {
        self.policy
    }

    fn create_surface(
        &self,
        ctx: &Arc<WindowContext>,
        init: &SurfaceInit,
    ) -> anyhow::Result<HeadlessSurface> {
        if self.take_failure() {
            bail!("scripted surface failure for window {}", ctx.handle());
        }

        let window = Arc::new(HeadlessWindow::new(ctx.handle(), init));
        self.shared
            .windows
            .lock()
            .insert(ctx.handle(), Arc::clone(&window));
        self.shared.created.fetch_add(1, Ordering::AcqRel);
        debug!("🧪 Headless surface for window {} created", ctx.handle());
        Ok(HeadlessSurface { window })
    }
}

pub struct HeadlessSurface {
    window: Arc<HeadlessWindow>,
}

impl Surface for HeadlessSurface {
    fn pump_events(&mut self, ctx: &WindowContext) {
        let events: Vec<NativeEvent> = self.window.inbox.lock().drain(..).collect();
        for event in events {
            ctx.dispatch(event);
        }
    }

    fn apply_commands(&mut self, commands: &PendingCommands) {
        let mut state = self.window.state.lock();
        if let Some(style) = commands.style {
            state.style = style;
        }
        if let Some(rect) = commands.rect {
            state.rect = rect;
        }
        if let Some(title) = &commands.title {
            state.title = title.clone();
        }
        if commands.focus {
            state.focus_requests += 1;
        }
        state.applied.push(commands.clone());
        self.window.changed.notify_all();
    }

    fn present(&mut self, texture: Option<TextureRef>) -> PresentStatus {
        if self.window.device_lost.load(Ordering::Acquire) {
            return PresentStatus::DeviceLost;
        }

        let mut state = self.window.state.lock();
        let frame = Frame {
            texture,
            rect: state.rect,
            title: state.title.clone(),
            style: state.style,
        };
        state.frames.push(frame);
        self.window.changed.notify_all();
        PresentStatus::Presented
    }

    fn destroy(self) {
        self.window.state.lock().destroyed = true;
        self.window.changed.notify_all();
        debug!("🧪 Headless surface for window {} destroyed", self.window.handle);
    }
}
