//! OpenGL on Windows through WGL.
//!
//! Single instance: one sub-window per process. Its context shares object
//! namespaces with the host context captured at plugin load, so the host
//! texture is bound by name and drawn with [`GlQuad`].

use super::gl_quad::{self, GlQuad};
use super::win32::Win32Window;
use super::{Backend, InstancePolicy, PresentStatus, Surface, SurfaceInit};
use crate::command::{PendingCommands, TextureRef, WindowStyle};
use crate::context::WindowContext;
use anyhow::{bail, Context, Result};
use libloading::Library;
use log::{debug, info, warn};
use std::ffi::{c_void, CString};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use windows::core::PCSTR;
use windows::Win32::Graphics::Gdi::{GetDC, ReleaseDC, HDC};
use windows::Win32::Graphics::OpenGL::{
    wglCreateContext, wglDeleteContext, wglGetCurrentContext, wglGetProcAddress, wglMakeCurrent,
    wglShareLists, ChoosePixelFormat, SetPixelFormat, SwapBuffers, HGLRC, PFD_DOUBLEBUFFER,
    PFD_DRAW_TO_WINDOW, PFD_MAIN_PLANE, PFD_SUPPORT_OPENGL, PFD_TYPE_RGBA,
    PIXELFORMATDESCRIPTOR,
};

type SwapIntervalExt = unsafe extern "system" fn(i32) -> i32;

/// Backend bound to the host's current WGL context.
#[derive(Debug, Default)]
pub struct WglBackend {
    host_context: AtomicUsize,
}

impl WglBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the context current on the calling thread (the host calls
    /// the plugin load hook with its context current).
    pub fn capture_current_context(&self) -> bool {
        let context = unsafe { wglGetCurrentContext() };
        self.host_context
            .store(context.0 as usize, Ordering::Release);
        if context.is_invalid() {
            warn!("⚠️ No WGL context current at load; sub-windows are unavailable");
            false
        } else {
            info!("🎮 Captured host WGL context");
            true
        }
    }

    pub fn release_host_context(&self) {
        self.host_context.store(0, Ordering::Release);
    }

    fn host_context(&self) -> Option<HGLRC> {
        match self.host_context.load(Ordering::Acquire) {
            0 => None,
            raw => Some(HGLRC(raw as *mut c_void)),
        }
    }
}

fn pixel_format() -> PIXELFORMATDESCRIPTOR {
    PIXELFORMATDESCRIPTOR {
        nSize: std::mem::size_of::<PIXELFORMATDESCRIPTOR>() as u16,
        nVersion: 1,
        dwFlags: PFD_DRAW_TO_WINDOW | PFD_SUPPORT_OPENGL | PFD_DOUBLEBUFFER,
        iPixelType: PFD_TYPE_RGBA,
        cColorBits: 32,
        cAlphaBits: 8,
        cDepthBits: 24,
        cStencilBits: 8,
        iLayerType: PFD_MAIN_PLANE.0 as u8,
        ..Default::default()
    }
}

fn proc_address(opengl32: Option<&Library>, name: &str) -> *const c_void {
    let Ok(symbol) = CString::new(name) else {
        return std::ptr::null();
    };
    let address = unsafe { wglGetProcAddress(PCSTR(symbol.as_ptr() as *const u8)) }
        .map(|f| f as usize)
        .unwrap_or(0);
    // Some drivers return small sentinels instead of null for core 1.1 entry points.
    if !matches!(address, 0 | 1 | 2 | 3 | usize::MAX) {
        return address as *const c_void;
    }
    opengl32
        .and_then(|lib| unsafe { lib.get::<*const c_void>(symbol.as_bytes_with_nul()) }.ok())
        .map(|f| *f)
        .unwrap_or(std::ptr::null())
}

impl Backend for WglBackend {
    type Surface = WglSurface;

    fn name(&self) -> &'static str {
        "wgl"
    }

    fn host_ready(&self) -> bool {
        self.host_context().is_some()
    }

    fn instance_policy(&self) -> InstancePolicy {
        InstancePolicy::Single
    }

    fn create_surface(&self, ctx: &Arc<WindowContext>, init: &SurfaceInit) -> Result<WglSurface> {
        let host = self.host_context().context("Host WGL context not captured")?;
        let window = Win32Window::create(ctx, init)?;

        let dc = unsafe { GetDC(Some(window.hwnd())) };
        if dc.is_invalid() {
            bail!("GetDC failed");
        }
        // From here on the surface owns `dc`, so failures release it on drop.
        let mut surface = WglSurface {
            quad: None,
            opengl32: None,
            context: None,
            dc,
            window,
            style: WindowStyle::default(),
        };

        let pfd = pixel_format();
        let format = unsafe { ChoosePixelFormat(surface.dc, &pfd) };
        if format == 0 {
            bail!("ChoosePixelFormat found no RGBA8 double-buffered format");
        }
        unsafe { SetPixelFormat(surface.dc, format, &pfd) }.context("SetPixelFormat failed")?;

        let context = unsafe { wglCreateContext(surface.dc) }.context("wglCreateContext failed")?;
        surface.context = Some(context);
        unsafe { wglShareLists(host, context) }.context("wglShareLists with host context failed")?;
        unsafe { wglMakeCurrent(surface.dc, context) }.context("wglMakeCurrent failed")?;

        surface.opengl32 = unsafe { Library::new("opengl32.dll") }
            .map_err(|err| warn!("⚠️ opengl32.dll not loadable: {}", err))
            .ok();
        let opengl32 = surface.opengl32.as_ref();
        gl_quad::load_functions(|name| proc_address(opengl32, name))?;
        surface.quad = Some(GlQuad::new()?);

        let interval = proc_address(opengl32, "wglSwapIntervalEXT");
        if !interval.is_null() {
            let swap_interval: SwapIntervalExt = unsafe { std::mem::transmute(interval) };
            unsafe { swap_interval(i32::from(init.vsync)) };
        } else if init.vsync {
            debug!("WGL_EXT_swap_control missing, vsync left to the driver");
        }

        surface.window.show();
        info!("🖥️ WGL context ready for sub-window {}", ctx.handle());
        Ok(surface)
    }
}

/// Fields in reverse acquisition order: GL objects, context, DC, window.
pub struct WglSurface {
    quad: Option<GlQuad>,
    opengl32: Option<Library>,
    context: Option<HGLRC>,
    dc: HDC,
    window: Win32Window,
    style: WindowStyle,
}

impl Surface for WglSurface {
    fn pump_events(&mut self, _ctx: &WindowContext) {
        self.window.pump();
    }

    fn apply_commands(&mut self, commands: &PendingCommands) {
        if let Some(style) = commands.style {
            self.window.apply_style(style);
            self.style = style;
        }
        if let Some(rect) = commands.rect {
            self.window.apply_rect(rect);
        }
        if let Some(title) = &commands.title {
            self.window.apply_title(title);
        }
        if commands.focus {
            self.window.focus();
        }
    }

    fn present(&mut self, texture: Option<TextureRef>) -> PresentStatus {
        let Some(quad) = &self.quad else {
            return PresentStatus::Skipped;
        };
        let (width, height) = self.window.client_size();
        quad.draw(
            texture.and_then(gl_quad::texture_name),
            width,
            height,
            !self.style.transparent,
        );
        if let Err(err) = unsafe { SwapBuffers(self.dc) } {
            warn!("⚠️ SwapBuffers failed: {}", err);
            return PresentStatus::Skipped;
        }
        PresentStatus::Presented
    }
}

impl Drop for WglSurface {
    fn drop(&mut self) {
        unsafe {
            if let Some(mut quad) = self.quad.take() {
                quad.release();
            }
            if let Some(context) = self.context.take() {
                let _ = wglMakeCurrent(HDC::default(), HGLRC::default());
                if let Err(err) = wglDeleteContext(context) {
                    warn!("⚠️ wglDeleteContext failed: {}", err);
                }
            }
            ReleaseDC(Some(self.window.hwnd()), self.dc);
        }
        debug!("🧹 WGL surface released");
    }
}
