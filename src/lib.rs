//! # MultiWindow
//!
//! Native sub-windows for a host game engine. Each sub-window runs its own
//! render thread and presents a texture the engine renders into, so extra
//! views can live outside the engine's main window.
//!
//! ## Architecture
//!
//! - `manager`: host-facing operations and the handle arena
//! - `context`: per-window shared state (command buffer, callbacks, state)
//! - `render_loop`: the render thread's wait/apply/present cycle
//! - `backend`: D3D11 and WGL on Windows, GLX on X11, plus a headless backend
//! - `ffi`: the C ABI the engine loads
//! - `config`, `logging`: TOML configuration and `env_logger` setup
//!
//! ## Usage
//!
//! ```rust
//! use multiwindow::backend::headless::HeadlessBackend;
//! use multiwindow::{SubWindowManager, TextureRef};
//!
//! let manager = SubWindowManager::new(HeadlessBackend::new());
//! let handle = manager.create(TextureRef::from_raw(1), 640, 480)?;
//! manager.signal_frame_ready(handle)?;
//! manager.destroy(handle)?;
//! # Ok::<(), multiwindow::SubWindowError>(())
//! ```

pub mod backend;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod ffi;
pub mod handle;
pub mod logging;
pub mod manager;
pub mod render_loop;
pub mod signal;

pub use command::{Rect, TextureRef, Title, WindowSettings, WindowStyle};
pub use config::MultiWindowConfig;
pub use context::{FrameStats, LoopState, WindowContext};
pub use error::{SubWindowError, SubWindowResult};
pub use event::{CloseArbiter, EventKind, EventSink, HostEvent};
pub use handle::WindowHandle;
pub use manager::SubWindowManager;

/// Version information for MultiWindow
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// One-line build summary logged at plugin load.
pub fn build_info() -> String {
    format!(
        "multiwindow {} ({}, {}, built {})",
        VERSION,
        env!("TARGET_TRIPLE"),
        env!("GIT_COMMIT"),
        env!("BUILD_DATE"),
    )
}
