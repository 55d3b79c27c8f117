//! Errors reported to the host side of the plugin.
//!
//! Platform setup failures on the render thread are not part of this type:
//! they are `anyhow` errors that get logged and move the window to
//! [`LoopState::Terminated`](crate::context::LoopState::Terminated).

use thiserror::Error;

/// Failure of a host-facing operation.
#[derive(Debug, Error)]
pub enum SubWindowError {
    /// Null, unknown or already destroyed handle.
    #[error("invalid sub-window handle {0:#x}")]
    InvalidHandle(u64),

    /// The host graphics device/context has not been captured yet.
    #[error("host graphics device is not available yet")]
    DeviceUnavailable,

    /// The backend supports a single window and one is still running.
    #[error("a sub-window is already active and this backend supports only one")]
    AlreadyActive,

    /// Operation issued before `UnityPluginLoad` or after `UnityPluginUnload`.
    #[error("plugin is not loaded")]
    NotLoaded,

    /// Destroy was called from inside a callback on the window's own render thread.
    #[error("cannot destroy a sub-window from its own render thread")]
    DestroyFromRenderThread,

    #[error("failed to spawn render thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// The render thread panicked; its resources were released by unwinding.
    #[error("render thread panicked")]
    RenderThreadPanicked,
}

pub type SubWindowResult<T> = Result<T, SubWindowError>;
