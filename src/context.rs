//! Per-window state shared between the host threads and the render thread.
//!
//! The host only touches the command buffer, the callbacks and the wake
//! signal. Everything native (window, swap chain, GL context) lives in the
//! backend surface owned by the render thread.

use crate::command::{CommandBuffer, PendingCommands, TextureRef};
use crate::error::{SubWindowError, SubWindowResult};
use crate::event::{CloseArbiter, DispatchOutcome, EventSink, HostEvent, NativeEvent};
use crate::handle::WindowHandle;
use crate::signal::WakeSignal;
use log::{debug, error, info, trace};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Render thread lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Creating the native window and graphics surface.
    Starting,
    Running,
    /// Releasing native resources.
    Draining,
    /// Thread function returned (or never got a surface).
    Terminated,
}

/// Counters updated by the render thread.
#[derive(Debug, Default)]
pub struct FrameCounters {
    frames_presented: AtomicU64,
    commands_applied: AtomicU64,
    events_dispatched: AtomicU64,
}

/// Point-in-time copy of [`FrameCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_presented: u64,
    pub commands_applied: u64,
    pub events_dispatched: u64,
}

impl FrameCounters {
    pub fn record_frame(&self) {
        self.frames_presented.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commands(&self, fields: usize) {
        self.commands_applied
            .fetch_add(fields as u64, Ordering::Relaxed);
    }

    fn record_event(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FrameStats {
        FrameStats {
            frames_presented: self.frames_presented.load(Ordering::Relaxed),
            commands_applied: self.commands_applied.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
struct Callbacks {
    events: Option<Arc<dyn EventSink>>,
    close: Option<Arc<dyn CloseArbiter>>,
}

/// Shared state of one live sub-window.
pub struct WindowContext {
    handle: WindowHandle,
    running: AtomicBool,
    wake: WakeSignal,
    commands: Mutex<CommandBuffer>,
    callbacks: Mutex<Callbacks>,
    texture: AtomicUsize,
    state: Mutex<LoopState>,
    state_changed: Condvar,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: Mutex<Option<ThreadId>>,
    counters: FrameCounters,
}

impl WindowContext {
    /// New context in `Starting` with `running` already raised, so a destroy
    /// racing the thread start is still observed.
    pub fn new(handle: WindowHandle, texture: TextureRef) -> Self {
        Self {
            handle,
            running: AtomicBool::new(true),
            wake: WakeSignal::new(),
            commands: Mutex::new(CommandBuffer::new()),
            callbacks: Mutex::new(Callbacks::default()),
            texture: AtomicUsize::new(texture.as_raw()),
            state: Mutex::new(LoopState::Starting),
            state_changed: Condvar::new(),
            thread: Mutex::new(None),
            thread_id: Mutex::new(None),
            counters: FrameCounters::default(),
        }
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Host-initiated stop: lowers `running` and wakes the render thread.
    /// Emits no event.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
        self.wake.signal();
    }

    /// Render-thread-initiated stop (accepted close, device loss, failed
    /// setup). Emits exactly one Closed event across all such calls.
    pub fn terminate(&self, reason: &str) -> bool {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("🚪 Sub-window {} closing: {}", self.handle, reason);
            self.emit(HostEvent::closed());
            true
        } else {
            false
        }
    }

    pub fn wake(&self) {
        self.wake.signal();
    }

    pub fn wait_for_wake(&self, timeout: Duration) -> bool {
        self.wake.wait_timeout(timeout)
    }

    /// Runs `f` with the command buffer locked. Host-side setters go through here.
    pub fn with_commands<R>(&self, f: impl FnOnce(&mut CommandBuffer) -> R) -> R {
        f(&mut self.commands.lock())
    }

    /// Takes every dirty field in one critical section.
    pub fn drain_commands(&self) -> PendingCommands {
        self.commands.lock().drain()
    }

    pub fn set_event_sink(&self, sink: Option<Arc<dyn EventSink>>) {
        self.callbacks.lock().events = sink;
    }

    pub fn set_close_arbiter(&self, arbiter: Option<Arc<dyn CloseArbiter>>) {
        self.callbacks.lock().close = arbiter;
    }

    /// Routes one native event. Called only from the render thread, from
    /// inside the backend's event pump.
    pub fn dispatch(&self, event: NativeEvent) -> DispatchOutcome {
        self.counters.record_event();
        trace!("📨 Sub-window {} native event {:?}", self.handle, event);

        match event.to_host() {
            Some(host_event) => {
                self.emit(host_event);
                DispatchOutcome::Forwarded
            }
            None => {
                let arbiter = self.callbacks.lock().close.clone();
                if let Some(arbiter) = arbiter {
                    if !arbiter.allow_close(self.handle) {
                        debug!("✋ Host vetoed close of sub-window {}", self.handle);
                        return DispatchOutcome::CloseVetoed;
                    }
                }
                self.terminate("close requested");
                DispatchOutcome::CloseAccepted
            }
        }
    }

    fn emit(&self, event: HostEvent) {
        // Clone out of the lock so the callback may call setters on this handle.
        let sink = self.callbacks.lock().events.clone();
        if let Some(sink) = sink {
            sink.on_event(self.handle, event);
        }
    }

    /// Texture shown by the next presented frame.
    pub fn current_texture(&self) -> Option<TextureRef> {
        TextureRef::from_raw(self.texture.load(Ordering::Acquire)).non_null()
    }

    pub fn set_current_texture(&self, texture: TextureRef) {
        self.texture.store(texture.as_raw(), Ordering::Release);
    }

    pub fn state(&self) -> LoopState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: LoopState) {
        let mut current = self.state.lock();
        debug!("🔁 Sub-window {} {:?} -> {:?}", self.handle, *current, state);
        *current = state;
        self.state_changed.notify_all();
    }

    /// Blocks until `pred` holds for the loop state or `timeout` elapses.
    pub fn wait_for_state(&self, timeout: Duration, pred: impl Fn(LoopState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !pred(*state) {
            if self.state_changed.wait_until(&mut state, deadline).timed_out() {
                return pred(*state);
            }
        }
        true
    }

    pub fn counters(&self) -> &FrameCounters {
        &self.counters
    }

    pub fn stats(&self) -> FrameStats {
        self.counters.snapshot()
    }

    pub(crate) fn attach_thread(&self, thread: JoinHandle<()>) {
        *self.thread.lock() = Some(thread);
    }

    /// Called first thing on the render thread, before any callback can run.
    pub(crate) fn enter_render_thread(&self) {
        *self.thread_id.lock() = Some(thread::current().id());
    }

    pub fn is_render_thread(&self) -> bool {
        *self.thread_id.lock() == Some(thread::current().id())
    }

    /// Stops the render thread and waits until it has released every native
    /// resource.
    pub fn shutdown(&self) -> SubWindowResult<()> {
        if self.is_render_thread() {
            return Err(SubWindowError::DestroyFromRenderThread);
        }

        self.request_stop();
        let thread = self.thread.lock().take();
        let Some(thread) = thread else {
            return Ok(());
        };

        match thread.join() {
            Ok(()) => {
                debug!("🧵 Render thread of sub-window {} joined", self.handle);
                Ok(())
            }
            Err(_) => {
                error!("❌ Render thread of sub-window {} panicked", self.handle);
                self.set_state(LoopState::Terminated);
                Err(SubWindowError::RenderThreadPanicked)
            }
        }
    }
}

impl std::fmt::Debug for WindowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowContext")
            .field("handle", &self.handle)
            .field("running", &self.is_running())
            .field("state", &self.state())
            .field("texture", &self.current_texture())
            .finish()
    }
}
