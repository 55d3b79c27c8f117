//! Host-facing sub-window operations.
//!
//! The manager owns the handle arena and spawns one render thread per window.
//! Setters never block on rendering: they take the window's command lock,
//! mark fields dirty and return. Destroy is the only operation that waits,
//! and it waits until the render thread has released every native resource.

use crate::backend::{Backend, InstancePolicy, SurfaceInit};
use crate::command::{Rect, TextureRef, WindowSettings};
use crate::config::MultiWindowConfig;
use crate::context::{FrameStats, LoopState, WindowContext};
use crate::error::{SubWindowError, SubWindowResult};
use crate::event::{CloseArbiter, EventSink};
use crate::handle::{HandleArena, WindowHandle};
use crate::render_loop;
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

pub struct SubWindowManager<B: Backend> {
    backend: Arc<B>,
    config: MultiWindowConfig,
    windows: RwLock<HandleArena<Arc<WindowContext>>>,
}

impl<B: Backend> SubWindowManager<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, MultiWindowConfig::default())
    }

    pub fn with_config(backend: B, config: MultiWindowConfig) -> Self {
        info!(
            "🧩 Sub-window manager on {} backend ({:?})",
            backend.name(),
            backend.instance_policy()
        );
        Self {
            backend: Arc::new(backend),
            config,
            windows: RwLock::new(HandleArena::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &MultiWindowConfig {
        &self.config
    }

    fn lookup(&self, handle: WindowHandle) -> SubWindowResult<Arc<WindowContext>> {
        self.windows
            .read()
            .get(handle)
            .cloned()
            .ok_or(SubWindowError::InvalidHandle(handle.to_raw()))
    }

    /// Spawns a sub-window showing `texture` with a `width`×`height` client area.
    pub fn create(
        &self,
        texture: TextureRef,
        width: i32,
        height: i32,
    ) -> SubWindowResult<WindowHandle> {
        if !self.backend.host_ready() {
            warn!("⚠️ Host graphics device not available, refusing to create a sub-window");
            return Err(SubWindowError::DeviceUnavailable);
        }

        let (handle, reaped) = {
            let mut windows = self.windows.write();
            let mut reaped = Vec::new();
            if self.backend.instance_policy() == InstancePolicy::Single {
                if windows.iter().any(|(_, ctx)| ctx.is_running()) {
                    return Err(SubWindowError::AlreadyActive);
                }
                reaped = windows.drain();
            }
            let handle =
                windows.insert_with(|handle| Arc::new(WindowContext::new(handle, texture)));
            (handle, reaped)
        };

        for (stale, ctx) in reaped {
            debug!("🧹 Reaping terminated sub-window {}", stale);
            if let Err(err) = ctx.shutdown() {
                warn!("⚠️ Reaping sub-window {} failed: {}", stale, err);
            }
        }
        let ctx = self.lookup(handle)?;

        let init = SurfaceInit {
            rect: Rect::new(self.config.window.x, self.config.window.y, width, height),
            title: self.config.window.initial_title(),
            vsync: self.config.render.vsync,
            class_prefix: self.config.window.class_prefix.clone(),
        };
        let timing = self.config.render.timing();
        let backend = Arc::clone(&self.backend);
        let thread_ctx = Arc::clone(&ctx);

        let spawned = thread::Builder::new()
            .name(format!("subwindow-{}", handle))
            .spawn(move || {
                thread_ctx.enter_render_thread();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    render_loop::run(&*backend, &thread_ctx, &init, timing)
                }));
                if outcome.is_err() {
                    error!("❌ Render thread of sub-window {} panicked", thread_ctx.handle());
                    thread_ctx.terminate("render thread panicked");
                    thread_ctx.set_state(LoopState::Terminated);
                }
            });

        match spawned {
            Ok(join) => {
                ctx.attach_thread(join);
                info!("✨ Created sub-window {} ({}x{})", handle, width, height);
                Ok(handle)
            }
            Err(err) => {
                error!("❌ Failed to spawn render thread: {}", err);
                self.windows.write().remove(handle);
                Err(SubWindowError::ThreadSpawn(err))
            }
        }
    }

    /// Stops the window and joins its render thread. The handle is invalid
    /// afterwards.
    pub fn destroy(&self, handle: WindowHandle) -> SubWindowResult<()> {
        let ctx = self.lookup(handle)?;
        if ctx.is_render_thread() {
            return Err(SubWindowError::DestroyFromRenderThread);
        }

        let ctx = self
            .windows
            .write()
            .remove(handle)
            .ok_or(SubWindowError::InvalidHandle(handle.to_raw()))?;
        let result = ctx.shutdown();
        info!("🗑️ Destroyed sub-window {}", handle);
        result
    }

    pub fn signal_frame_ready(&self, handle: WindowHandle) -> SubWindowResult<()> {
        self.lookup(handle)?.wake();
        Ok(())
    }

    pub fn set_event_callback(
        &self,
        handle: WindowHandle,
        sink: Option<Arc<dyn EventSink>>,
    ) -> SubWindowResult<()> {
        self.lookup(handle)?.set_event_sink(sink);
        Ok(())
    }

    pub fn set_close_callback(
        &self,
        handle: WindowHandle,
        arbiter: Option<Arc<dyn CloseArbiter>>,
    ) -> SubWindowResult<()> {
        self.lookup(handle)?.set_close_arbiter(arbiter);
        Ok(())
    }

    pub fn update_texture(&self, handle: WindowHandle, texture: TextureRef) -> SubWindowResult<()> {
        self.lookup(handle)?
            .with_commands(|commands| commands.set_texture(texture));
        Ok(())
    }

    pub fn focus_window(&self, handle: WindowHandle) -> SubWindowResult<()> {
        self.lookup(handle)?
            .with_commands(|commands| commands.request_focus());
        Ok(())
    }

    pub fn set_config(&self, handle: WindowHandle, settings: WindowSettings) -> SubWindowResult<()> {
        self.lookup(handle)?
            .with_commands(|commands| commands.apply_settings(settings));
        Ok(())
    }

    /// `false` for unknown handles as well as for closed windows.
    pub fn is_running(&self, handle: WindowHandle) -> bool {
        self.lookup(handle)
            .map(|ctx| ctx.is_running())
            .unwrap_or(false)
    }

    pub fn state(&self, handle: WindowHandle) -> SubWindowResult<LoopState> {
        Ok(self.lookup(handle)?.state())
    }

    pub fn frame_stats(&self, handle: WindowHandle) -> SubWindowResult<FrameStats> {
        Ok(self.lookup(handle)?.stats())
    }

    pub fn context(&self, handle: WindowHandle) -> SubWindowResult<Arc<WindowContext>> {
        self.lookup(handle)
    }

    pub fn live_windows(&self) -> Vec<WindowHandle> {
        self.windows.read().iter().map(|(handle, _)| handle).collect()
    }

    /// Destroys every window. Returns how many were shut down.
    pub fn shutdown_all(&self) -> usize {
        let drained = self.windows.write().drain();
        let count = drained.len();
        for (handle, ctx) in drained {
            if let Err(err) = ctx.shutdown() {
                warn!("⚠️ Shutting down sub-window {} failed: {}", handle, err);
            }
        }
        if count > 0 {
            info!("🧹 Shut down {} sub-window(s)", count);
        }
        count
    }
}

impl<B: Backend> Drop for SubWindowManager<B> {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessBackend;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn fast_config() -> MultiWindowConfig {
        let mut config = MultiWindowConfig::default();
        config.render.wake_timeout_ms = 5;
        config
    }

    #[test]
    fn test_create_refused_without_host_device() {
        let backend = HeadlessBackend::new();
        backend.set_host_ready(false);
        let manager = SubWindowManager::with_config(backend, fast_config());

        assert!(matches!(
            manager.create(TextureRef::from_raw(1), 64, 64),
            Err(SubWindowError::DeviceUnavailable)
        ));
        assert!(manager.live_windows().is_empty());
    }

    #[test]
    fn test_initial_rect_comes_from_config() {
        let backend = HeadlessBackend::new();
        let manager = SubWindowManager::with_config(backend.clone(), fast_config());
        let handle = manager.create(TextureRef::from_raw(1), 800, 600).unwrap();
        let window = backend.wait_for_window(handle, WAIT).unwrap();

        assert_eq!(window.rect(), Rect::new(100, 100, 800, 600));
        assert_eq!(window.title().as_str(), "Init");
        manager.destroy(handle).unwrap();
    }

    #[test]
    fn test_operations_on_destroyed_handle_fail() {
        let manager = SubWindowManager::with_config(HeadlessBackend::new(), fast_config());
        let handle = manager.create(TextureRef::from_raw(1), 64, 64).unwrap();
        manager.destroy(handle).unwrap();

        assert!(matches!(
            manager.destroy(handle),
            Err(SubWindowError::InvalidHandle(_))
        ));
        assert!(manager.focus_window(handle).is_err());
        assert!(manager.signal_frame_ready(handle).is_err());
        assert!(!manager.is_running(handle));
    }

    #[test]
    fn test_single_instance_rejects_second_window() {
        let backend = HeadlessBackend::with_policy(InstancePolicy::Single);
        let manager = SubWindowManager::with_config(backend, fast_config());
        let first = manager.create(TextureRef::from_raw(1), 64, 64).unwrap();

        assert!(matches!(
            manager.create(TextureRef::from_raw(2), 64, 64),
            Err(SubWindowError::AlreadyActive)
        ));

        manager.destroy(first).unwrap();
        let second = manager.create(TextureRef::from_raw(2), 64, 64).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_single_instance_reaps_closed_window() {
        let backend = HeadlessBackend::with_policy(InstancePolicy::Single);
        let manager = SubWindowManager::with_config(backend.clone(), fast_config());
        let first = manager.create(TextureRef::from_raw(1), 64, 64).unwrap();
        let window = backend.wait_for_window(first, WAIT).unwrap();

        window.push_event(crate::event::NativeEvent::CloseRequested);
        let ctx = manager.context(first).unwrap();
        assert!(ctx.wait_for_state(WAIT, |s| s == LoopState::Terminated));

        let second = manager.create(TextureRef::from_raw(2), 64, 64).unwrap();
        assert_eq!(manager.live_windows(), vec![second]);
        assert!(matches!(
            manager.state(first),
            Err(SubWindowError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_shutdown_all_joins_everything() {
        let backend = HeadlessBackend::new();
        let manager = SubWindowManager::with_config(backend.clone(), fast_config());
        let handles: Vec<_> = (1..=3)
            .map(|i| manager.create(TextureRef::from_raw(i), 64, 64).unwrap())
            .collect();
        let windows: Vec<_> = handles
            .iter()
            .map(|h| backend.wait_for_window(*h, WAIT).unwrap())
            .collect();

        assert_eq!(manager.shutdown_all(), 3);
        assert!(manager.live_windows().is_empty());
        assert!(windows.iter().all(|w| w.is_destroyed()));
    }
}
