//! Platform backends.
//!
//! A [`Backend`] lives as long as the plugin and knows how to reach the host's
//! graphics device. Each sub-window gets its own [`Surface`], created and
//! dropped on that window's render thread, so surfaces never need to be
//! `Send`.

use crate::command::{PendingCommands, Rect, TextureRef, Title};
use crate::context::WindowContext;
use std::sync::Arc;

pub mod headless;

#[cfg(any(target_os = "linux", all(windows, feature = "opengl")))]
mod gl_quad;

#[cfg(windows)]
mod win32;

#[cfg(all(windows, not(feature = "opengl")))]
pub mod d3d11;

#[cfg(all(windows, feature = "opengl"))]
pub mod wgl;

#[cfg(target_os = "linux")]
pub mod glx;

/// Backend compiled for this target and exported through the plugin ABI.
#[cfg(all(windows, not(feature = "opengl")))]
pub type PlatformBackend = d3d11::D3D11Backend;

#[cfg(all(windows, feature = "opengl"))]
pub type PlatformBackend = wgl::WglBackend;

#[cfg(target_os = "linux")]
pub type PlatformBackend = glx::GlxBackend;

/// How many sub-windows a backend can drive at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstancePolicy {
    Multiple,
    /// Exactly one live window per process.
    Single,
}

/// Result of presenting one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Presented,
    /// Nothing was shown (no texture and nothing to clear).
    Skipped,
    /// The device was removed or reset; the window must close.
    DeviceLost,
}

/// Parameters for the one-time window and surface setup.
#[derive(Debug, Clone)]
pub struct SurfaceInit {
    /// Initial position and client size.
    pub rect: Rect,
    pub title: Title,
    pub vsync: bool,
    /// Prefix of the per-window class name (Win32).
    pub class_prefix: String,
}

pub trait Backend: Send + Sync + 'static {
    type Surface: Surface;

    fn name(&self) -> &'static str;

    /// Whether the host graphics device or context has been captured.
    fn host_ready(&self) -> bool;

    fn instance_policy(&self) -> InstancePolicy {
        InstancePolicy::Multiple
    }

    /// Creates the native window and its presentation surface. Runs on the
    /// window's render thread.
    fn create_surface(
        &self,
        ctx: &Arc<WindowContext>,
        init: &SurfaceInit,
    ) -> anyhow::Result<Self::Surface>;
}

/// One native window plus whatever it presents through.
pub trait Surface {
    /// Drains the native event queue, routing each event through
    /// [`WindowContext::dispatch`].
    fn pump_events(&mut self, ctx: &WindowContext);

    /// Applies drained commands in the order texture, style, rect, title, focus.
    fn apply_commands(&mut self, commands: &PendingCommands);

    fn present(&mut self, texture: Option<TextureRef>) -> PresentStatus;

    /// Releases everything in reverse acquisition order. The host texture is
    /// never released.
    fn destroy(self)
    where
        Self: Sized,
    {
    }
}
