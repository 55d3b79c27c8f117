//! The per-window render thread.
//!
//! `Starting → Running → Draining → Terminated`. Each iteration waits for the
//! wake signal (bounded by the wake timeout), pumps native events, applies the
//! drained command snapshot and presents the current texture. An accepted
//! close or a lost device ends the loop; the surface is always torn down on
//! the way out.

use crate::backend::{Backend, PresentStatus, Surface, SurfaceInit};
use crate::context::{LoopState, WindowContext};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Loop parameters taken from the `[render]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    pub wake_timeout: Duration,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            wake_timeout: Duration::from_millis(200),
        }
    }
}

/// Body of the render thread. Returns once every native resource of the
/// window has been released.
pub fn run<B: Backend>(
    backend: &B,
    ctx: &Arc<WindowContext>,
    init: &SurfaceInit,
    timing: LoopTiming,
) {
    let handle = ctx.handle();
    debug!("🧵 Render thread for sub-window {} starting on {}", handle, backend.name());

    let mut surface = match backend.create_surface(ctx, init) {
        Ok(surface) => surface,
        Err(err) => {
            error!("❌ Failed to set up sub-window {}: {:#}", handle, err);
            ctx.terminate("setup failed");
            ctx.set_state(LoopState::Terminated);
            return;
        }
    };

    ctx.set_state(LoopState::Running);
    info!("🪟 Sub-window {} running ({}x{})", handle, init.rect.width, init.rect.height);

    while ctx.is_running() {
        ctx.wait_for_wake(timing.wake_timeout);

        surface.pump_events(ctx);
        if !ctx.is_running() {
            break;
        }

        let pending = ctx.drain_commands();
        if !pending.is_empty() {
            if let Some(texture) = pending.texture {
                ctx.set_current_texture(texture);
            }
            surface.apply_commands(&pending);
            ctx.counters().record_commands(pending.field_count());
        }

        match surface.present(ctx.current_texture()) {
            PresentStatus::Presented => ctx.counters().record_frame(),
            PresentStatus::Skipped => {}
            PresentStatus::DeviceLost => {
                warn!("⚠️ Graphics device lost, closing sub-window {}", handle);
                ctx.terminate("device lost");
            }
        }
    }

    ctx.set_state(LoopState::Draining);
    surface.destroy();
    ctx.set_state(LoopState::Terminated);

    let stats = ctx.stats();
    info!(
        "🏁 Sub-window {} stopped after {} frames",
        handle, stats.frames_presented
    );
}
