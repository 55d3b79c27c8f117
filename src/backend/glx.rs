//! OpenGL on X11 through GLX.
//!
//! Each sub-window opens its own display connection, so its render thread
//! never shares Xlib state with the host or with other sub-windows. The GL
//! context shares objects with the host context captured at plugin load.
//! libX11 and libGL are loaded at runtime through `x11-dl`.

use super::gl_quad::{self, GlQuad};
use super::{Backend, PresentStatus, Surface, SurfaceInit};
use crate::command::{PendingCommands, Rect, TextureRef, Title, WindowStyle};
use crate::context::WindowContext;
use crate::event::NativeEvent;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use std::ffi::{c_char, c_int, c_long, c_uchar, c_uint, c_ulong, c_void, CString};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use x11_dl::glx::{self, Glx, GLXContext};
use x11_dl::xlib::{self, Atom, Display, Window, XEvent, XVisualInfo, Xlib};

/// Xlib error handler type as taken and returned by `XSetErrorHandler`.
type XErrorHandler = Option<unsafe extern "C" fn(*mut Display, *mut xlib::XErrorEvent) -> c_int>;

const MWM_HINTS_FUNCTIONS: c_ulong = 1;
const MWM_HINTS_DECORATIONS: c_ulong = 2;
const MWM_FUNC_RESIZE: c_ulong = 2;
const MWM_FUNC_MOVE: c_ulong = 4;
const MWM_FUNC_MINIMIZE: c_ulong = 8;
const MWM_FUNC_MAXIMIZE: c_ulong = 16;
const MWM_FUNC_CLOSE: c_ulong = 32;

/// `_MOTIF_WM_HINTS` payload: flags, functions, decorations, input mode, status.
fn motif_hints(style: WindowStyle) -> [c_ulong; 5] {
    let mut functions = MWM_FUNC_MOVE | MWM_FUNC_CLOSE;
    if style.resizable {
        functions |= MWM_FUNC_RESIZE;
    }
    if style.has_min_button {
        functions |= MWM_FUNC_MINIMIZE;
    }
    if style.has_max_button {
        functions |= MWM_FUNC_MAXIMIZE;
    }
    let decorations = c_ulong::from(!style.borderless);
    [
        MWM_HINTS_FUNCTIONS | MWM_HINTS_DECORATIONS,
        functions,
        decorations,
        0,
        0,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShowState {
    Normal,
    Minimized,
    Maximized,
}

/// Show state implied by the atoms listed in `_NET_WM_STATE`.
fn show_state(state: &[Atom], atoms: &Atoms) -> ShowState {
    if state.contains(&atoms.net_wm_state_hidden) {
        ShowState::Minimized
    } else if state.contains(&atoms.net_wm_state_maximized_vert)
        && state.contains(&atoms.net_wm_state_maximized_horz)
    {
        ShowState::Maximized
    } else {
        ShowState::Normal
    }
}

fn show_transition(from: ShowState, to: ShowState) -> Option<NativeEvent> {
    match (from, to) {
        (a, b) if a == b => None,
        (_, ShowState::Minimized) => Some(NativeEvent::Minimized),
        (_, ShowState::Maximized) => Some(NativeEvent::Maximized),
        (_, ShowState::Normal) => Some(NativeEvent::Restored),
    }
}

/// Dynamically loaded libX11 and libGL.
struct GlxLibs {
    xlib: Xlib,
    glx: Glx,
}

// Only function pointers and the library handles that keep them alive.
unsafe impl Send for GlxLibs {}
unsafe impl Sync for GlxLibs {}

impl GlxLibs {
    fn open() -> Result<Self> {
        let xlib = Xlib::open().map_err(|err| anyhow!("libX11 unavailable: {}", err))?;
        let glx = Glx::open().map_err(|err| anyhow!("libGL unavailable: {}", err))?;
        Ok(Self { xlib, glx })
    }
}

unsafe extern "C" fn log_x_error(_display: *mut Display, event: *mut xlib::XErrorEvent) -> c_int {
    if let Some(event) = event.as_ref() {
        warn!(
            "⚠️ X error {} (request {}.{}) on resource {:#x}",
            event.error_code, event.request_code, event.minor_code, event.resourceid
        );
    }
    0
}

/// Window geometry: what the host last asked for (size hints) and what the
/// X server last reported (events and viewport). Host requests never touch
/// `reported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    requested: Rect,
    reported: Rect,
}

impl Geometry {
    fn new(rect: Rect) -> Self {
        Self {
            requested: rect,
            reported: rect,
        }
    }

    fn request(&mut self, rect: Rect) {
        self.requested = rect;
    }

    /// Records a ConfigureNotify and returns the events it implies.
    fn configure(&mut self, x: i32, y: i32, width: i32, height: i32) -> Vec<NativeEvent> {
        let mut out = Vec::new();
        let previous = self.reported;
        if (width, height) != (previous.width, previous.height) {
            out.push(NativeEvent::Resized { width, height });
        }
        if (x, y) != (previous.x, previous.y) {
            out.push(NativeEvent::Moved { x, y });
        }
        self.reported = Rect::new(x, y, width, height);
        out
    }
}

/// Handler that was installed before `log_x_error`, kept until unload.
static SAVED_ERROR_HANDLER: Mutex<Option<XErrorHandler>> = parking_lot::const_mutex(None);

/// Installs `log_x_error` through `set` unless it is already in place.
fn install_error_handler(
    saved: &Mutex<Option<XErrorHandler>>,
    set: impl FnOnce(XErrorHandler) -> XErrorHandler,
) {
    let mut saved = saved.lock();
    if saved.is_none() {
        *saved = Some(set(Some(log_x_error)));
    }
}

/// Puts the saved handler back. Returns whether one was saved.
fn restore_error_handler(
    saved: &Mutex<Option<XErrorHandler>>,
    set: impl FnOnce(XErrorHandler) -> XErrorHandler,
) -> bool {
    match saved.lock().take() {
        Some(previous) => {
            set(previous);
            true
        }
        None => false,
    }
}

/// Backend bound to the host's current GLX context.
pub struct GlxBackend {
    libs: Option<Arc<GlxLibs>>,
    host_context: AtomicUsize,
}

impl Default for GlxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GlxBackend {
    pub fn new() -> Self {
        let libs = match GlxLibs::open() {
            Ok(libs) => Some(Arc::new(libs)),
            Err(err) => {
                warn!("⚠️ {:#}", err);
                None
            }
        };
        Self {
            libs,
            host_context: AtomicUsize::new(0),
        }
    }

    /// Captures the GLX context current on the calling thread.
    pub fn capture_current_context(&self) -> bool {
        let Some(libs) = &self.libs else {
            return false;
        };
        let context = unsafe { (libs.glx.glXGetCurrentContext)() };
        self.host_context.store(context as usize, Ordering::Release);
        if context.is_null() {
            warn!("⚠️ No GLX context current at load; sub-windows are unavailable");
            false
        } else {
            info!("🎮 Captured host GLX context");
            true
        }
    }

    /// Forgets the host context and hands Xlib error handling back to the host.
    pub fn release_host_context(&self) {
        self.host_context.store(0, Ordering::Release);
        if let Some(libs) = &self.libs {
            let xlib = &libs.xlib;
            if restore_error_handler(&SAVED_ERROR_HANDLER, |handler| unsafe {
                (xlib.XSetErrorHandler)(handler)
            }) {
                debug!("Restored the host's X error handler");
            }
        }
    }

    fn host_context(&self) -> Option<GLXContext> {
        match self.host_context.load(Ordering::Acquire) {
            0 => None,
            raw => Some(raw as GLXContext),
        }
    }
}

impl Backend for GlxBackend {
    type Surface = GlxSurface;

    fn name(&self) -> &'static str {
        "glx"
    }

    fn host_ready(&self) -> bool {
        self.libs.is_some() && self.host_context().is_some()
    }

    fn create_surface(&self, ctx: &Arc<WindowContext>, init: &SurfaceInit) -> Result<GlxSurface> {
        let libs = self.libs.clone().context("libX11/libGL not loaded")?;
        let host = self.host_context().context("Host GLX context not captured")?;
        GlxSurface::create(libs, host, ctx, init)
    }
}

struct Atoms {
    wm_delete_window: Atom,
    motif_wm_hints: Atom,
    net_wm_state: Atom,
    net_wm_state_hidden: Atom,
    net_wm_state_maximized_vert: Atom,
    net_wm_state_maximized_horz: Atom,
    net_wm_name: Atom,
    net_active_window: Atom,
    utf8_string: Atom,
}

impl Atoms {
    unsafe fn intern(xlib: &Xlib, display: *mut Display) -> Self {
        let atom = |name: &std::ffi::CStr| (xlib.XInternAtom)(display, name.as_ptr(), xlib::False);
        Self {
            wm_delete_window: atom(c"WM_DELETE_WINDOW"),
            motif_wm_hints: atom(c"_MOTIF_WM_HINTS"),
            net_wm_state: atom(c"_NET_WM_STATE"),
            net_wm_state_hidden: atom(c"_NET_WM_STATE_HIDDEN"),
            net_wm_state_maximized_vert: atom(c"_NET_WM_STATE_MAXIMIZED_VERT"),
            net_wm_state_maximized_horz: atom(c"_NET_WM_STATE_MAXIMIZED_HORZ"),
            net_wm_name: atom(c"_NET_WM_NAME"),
            net_active_window: atom(c"_NET_ACTIVE_WINDOW"),
            utf8_string: atom(c"UTF8_STRING"),
        }
    }
}

/// Fields released in reverse acquisition order by `Drop`.
pub struct GlxSurface {
    libs: Arc<GlxLibs>,
    display: *mut Display,
    colormap: xlib::Colormap,
    window: Window,
    context: GLXContext,
    quad: Option<GlQuad>,
    atoms: Atoms,
    style: WindowStyle,
    geometry: Geometry,
    show: ShowState,
}

impl GlxSurface {
    fn create(
        libs: Arc<GlxLibs>,
        host: GLXContext,
        ctx: &WindowContext,
        init: &SurfaceInit,
    ) -> Result<Self> {
        let xlib = &libs.xlib;
        unsafe {
            install_error_handler(&SAVED_ERROR_HANDLER, |handler| {
                (xlib.XSetErrorHandler)(handler)
            });

            let display = (xlib.XOpenDisplay)(ptr::null());
            if display.is_null() {
                bail!("XOpenDisplay failed (is DISPLAY set?)");
            }

            let width = init.rect.width.max(1);
            let height = init.rect.height.max(1);
            // From here on the surface owns every X resource it holds.
            let mut surface = GlxSurface {
                atoms: Atoms::intern(xlib, display),
                libs: Arc::clone(&libs),
                display,
                colormap: 0,
                window: 0,
                context: ptr::null_mut(),
                quad: None,
                style: WindowStyle::default(),
                geometry: Geometry::new(Rect::new(init.rect.x, init.rect.y, width, height)),
                show: ShowState::Normal,
            };

            let mut visual = surface.choose_visual()?;
            let root = (xlib.XDefaultRootWindow)(display);
            surface.colormap =
                (xlib.XCreateColormap)(display, root, visual.visual, xlib::AllocNone);

            let mut attributes: xlib::XSetWindowAttributes = std::mem::zeroed();
            attributes.colormap = surface.colormap;
            attributes.border_pixel = 0;
            attributes.background_pixel = 0;
            attributes.event_mask =
                xlib::StructureNotifyMask | xlib::FocusChangeMask | xlib::PropertyChangeMask;

            surface.window = (xlib.XCreateWindow)(
                display,
                root,
                init.rect.x,
                init.rect.y,
                width as c_uint,
                height as c_uint,
                0,
                visual.depth,
                xlib::InputOutput as c_uint,
                visual.visual,
                xlib::CWColormap | xlib::CWBorderPixel | xlib::CWBackPixel | xlib::CWEventMask,
                &mut attributes,
            );
            if surface.window == 0 {
                bail!("XCreateWindow failed");
            }

            let mut protocols = [surface.atoms.wm_delete_window];
            (xlib.XSetWMProtocols)(display, surface.window, protocols.as_mut_ptr(), 1);
            surface.set_size_hints(true);
            surface.apply_title(&init.title);

            surface.context =
                (libs.glx.glXCreateContext)(display, &mut visual, host, xlib::True);
            if surface.context.is_null() {
                bail!("glXCreateContext sharing the host context failed");
            }

            (xlib.XMapWindow)(display, surface.window);
            if (libs.glx.glXMakeCurrent)(display, surface.window, surface.context) == 0 {
                bail!("glXMakeCurrent failed");
            }

            let glx = &libs.glx;
            gl_quad::load_functions(|name| match CString::new(name) {
                Ok(symbol) => (glx.glXGetProcAddress)(symbol.as_ptr() as *const c_uchar)
                    .map_or(ptr::null(), |f| f as *const c_void),
                Err(_) => ptr::null(),
            })?;
            surface.quad = Some(GlQuad::new()?);
            surface.set_swap_interval(init.vsync);
            (xlib.XFlush)(display);

            info!(
                "🖥️ GLX window {:#x} ready for sub-window {} ({}x{})",
                surface.window,
                ctx.handle(),
                width,
                height
            );
            Ok(surface)
        }
    }

    /// 32-bit ARGB visual when one supports double-buffered GL, so the
    /// compositor can blend transparent windows; any GL visual otherwise.
    unsafe fn choose_visual(&self) -> Result<XVisualInfo> {
        let xlib = &self.libs.xlib;
        let glx = &self.libs.glx;
        let screen = (xlib.XDefaultScreen)(self.display);

        let mut template: XVisualInfo = std::mem::zeroed();
        template.screen = screen;
        template.depth = 32;
        template.class = xlib::TrueColor;
        let mut count = 0;
        let list = (xlib.XGetVisualInfo)(
            self.display,
            xlib::VisualScreenMask | xlib::VisualDepthMask | xlib::VisualClassMask,
            &mut template,
            &mut count,
        );
        if !list.is_null() {
            let candidates = std::slice::from_raw_parts_mut(list, count.max(0) as usize);
            let found = candidates.iter_mut().find_map(|info| {
                let mut use_gl = 0;
                let mut double_buffer = 0;
                (glx.glXGetConfig)(self.display, info, glx::GLX_USE_GL, &mut use_gl);
                (glx.glXGetConfig)(self.display, info, glx::GLX_DOUBLEBUFFER, &mut double_buffer);
                (use_gl != 0 && double_buffer != 0).then_some(*info)
            });
            (xlib.XFree)(list as *mut c_void);
            if let Some(info) = found {
                debug!("🎨 Using ARGB visual {:#x}", info.visualid);
                return Ok(info);
            }
        }

        let mut attributes = [glx::GLX_RGBA, glx::GLX_DOUBLEBUFFER, 0];
        let info = (glx.glXChooseVisual)(self.display, screen, attributes.as_mut_ptr());
        if info.is_null() {
            bail!("no double-buffered RGBA GLX visual");
        }
        let chosen = *info;
        (xlib.XFree)(info as *mut c_void);
        debug!("🎨 No ARGB visual, falling back to {:#x}", chosen.visualid);
        Ok(chosen)
    }

    unsafe fn set_swap_interval(&self, vsync: bool) {
        let glx = &self.libs.glx;
        let interval = c_int::from(vsync);
        let lookup = |name: &std::ffi::CStr| (glx.glXGetProcAddress)(name.as_ptr() as *const c_uchar);

        if let Some(f) = lookup(c"glXSwapIntervalEXT") {
            let f: unsafe extern "C" fn(*mut Display, Window, c_int) = std::mem::transmute(f);
            f(self.display, self.window, interval);
        } else if let Some(f) = lookup(c"glXSwapIntervalMESA") {
            let f: unsafe extern "C" fn(c_uint) -> c_int = std::mem::transmute(f);
            f(interval as c_uint);
        } else if let Some(f) = lookup(c"glXSwapIntervalSGI") {
            let f: unsafe extern "C" fn(c_int) -> c_int = std::mem::transmute(f);
            f(interval);
        } else {
            debug!("No GLX swap control extension, vsync left to the driver");
        }
    }

    /// WM size hints; a non-resizable window gets min = max = current size.
    unsafe fn set_size_hints(&self, with_position: bool) {
        let xlib = &self.libs.xlib;
        let hints = (xlib.XAllocSizeHints)();
        let Some(hints_ref) = hints.as_mut() else {
            return;
        };
        let rect = self.geometry.requested;
        hints_ref.flags = xlib::USSize;
        hints_ref.width = rect.width;
        hints_ref.height = rect.height;
        if with_position {
            hints_ref.flags |= xlib::USPosition;
            hints_ref.x = rect.x;
            hints_ref.y = rect.y;
        }
        if !self.style.resizable {
            hints_ref.flags |= xlib::PMinSize | xlib::PMaxSize;
            hints_ref.min_width = rect.width;
            hints_ref.max_width = rect.width;
            hints_ref.min_height = rect.height;
            hints_ref.max_height = rect.height;
        }
        (xlib.XSetWMNormalHints)(self.display, self.window, hints);
        (xlib.XFree)(hints as *mut c_void);
    }

    fn apply_style(&mut self, style: WindowStyle) {
        self.style = style;
        let hints = motif_hints(style);
        let xlib = &self.libs.xlib;
        unsafe {
            (xlib.XChangeProperty)(
                self.display,
                self.window,
                self.atoms.motif_wm_hints,
                self.atoms.motif_wm_hints,
                32,
                xlib::PropModeReplace,
                hints.as_ptr() as *const c_uchar,
                hints.len() as c_int,
            );
            self.set_size_hints(false);
        }
    }

    fn apply_rect(&mut self, rect: Rect) {
        let width = rect.width.max(1);
        let height = rect.height.max(1);
        self.geometry.request(Rect::new(rect.x, rect.y, width, height));
        unsafe {
            self.set_size_hints(true);
            (self.libs.xlib.XMoveResizeWindow)(
                self.display,
                self.window,
                rect.x,
                rect.y,
                width as c_uint,
                height as c_uint,
            );
        }
    }

    fn apply_title(&self, title: &Title) {
        let xlib = &self.libs.xlib;
        let Ok(text) = CString::new(title.as_str()) else {
            return;
        };
        unsafe {
            (xlib.XStoreName)(self.display, self.window, text.as_ptr() as *const c_char);
            (xlib.XChangeProperty)(
                self.display,
                self.window,
                self.atoms.net_wm_name,
                self.atoms.utf8_string,
                8,
                xlib::PropModeReplace,
                text.as_ptr() as *const c_uchar,
                title.len() as c_int,
            );
        }
    }

    fn focus(&self) {
        let xlib = &self.libs.xlib;
        unsafe {
            (xlib.XRaiseWindow)(self.display, self.window);
            (xlib.XSetInputFocus)(self.display, self.window, xlib::RevertToParent, xlib::CurrentTime);

            let mut event: XEvent = std::mem::zeroed();
            event.client_message.type_ = xlib::ClientMessage;
            event.client_message.window = self.window;
            event.client_message.message_type = self.atoms.net_active_window;
            event.client_message.format = 32;
            // Source indication 1: a normal application request.
            event.client_message.data.set_long(0, 1);
            event.client_message.data.set_long(1, xlib::CurrentTime as c_long);
            let root = (xlib.XDefaultRootWindow)(self.display);
            (xlib.XSendEvent)(
                self.display,
                root,
                xlib::False,
                xlib::SubstructureRedirectMask | xlib::SubstructureNotifyMask,
                &mut event,
            );
        }
    }

    unsafe fn read_wm_state(&self) -> Vec<Atom> {
        let xlib = &self.libs.xlib;
        let mut actual_type: Atom = 0;
        let mut actual_format: c_int = 0;
        let mut count: c_ulong = 0;
        let mut remaining: c_ulong = 0;
        let mut data: *mut c_uchar = ptr::null_mut();
        let status = (xlib.XGetWindowProperty)(
            self.display,
            self.window,
            self.atoms.net_wm_state,
            0,
            1024,
            xlib::False,
            xlib::XA_ATOM,
            &mut actual_type,
            &mut actual_format,
            &mut count,
            &mut remaining,
            &mut data,
        );
        if data.is_null() {
            return Vec::new();
        }
        let atoms = if status == xlib::Success as c_int && actual_format == 32 {
            std::slice::from_raw_parts(data as *const Atom, count as usize).to_vec()
        } else {
            Vec::new()
        };
        (xlib.XFree)(data as *mut c_void);
        atoms
    }

    /// Root coordinates of the client area's origin.
    unsafe fn root_position(&self) -> Option<(i32, i32)> {
        let xlib = &self.libs.xlib;
        let root = (xlib.XDefaultRootWindow)(self.display);
        let (mut x, mut y, mut child) = (0, 0, 0);
        let ok = (xlib.XTranslateCoordinates)(
            self.display,
            self.window,
            root,
            0,
            0,
            &mut x,
            &mut y,
            &mut child,
        );
        (ok != 0).then_some((x, y))
    }

    unsafe fn translate(&mut self, event: &XEvent) -> Vec<NativeEvent> {
        let mut out = Vec::new();
        match event.get_type() {
            xlib::ClientMessage => {
                let message = event.client_message;
                if message.data.get_long(0) as Atom == self.atoms.wm_delete_window {
                    out.push(NativeEvent::CloseRequested);
                }
            }
            xlib::ConfigureNotify => {
                let configure = event.configure;
                let (x, y) = self
                    .root_position()
                    .unwrap_or((configure.x, configure.y));
                out.extend(self.geometry.configure(x, y, configure.width, configure.height));
            }
            xlib::FocusIn => out.push(NativeEvent::FocusGained),
            xlib::FocusOut => out.push(NativeEvent::FocusLost),
            xlib::PropertyNotify => {
                if event.property.atom == self.atoms.net_wm_state {
                    let next = show_state(&self.read_wm_state(), &self.atoms);
                    out.extend(show_transition(self.show, next));
                    self.show = next;
                }
            }
            _ => {}
        }
        out
    }
}

impl Surface for GlxSurface {
    fn pump_events(&mut self, ctx: &WindowContext) {
        let libs = Arc::clone(&self.libs);
        let xlib = &libs.xlib;
        unsafe {
            while (xlib.XPending)(self.display) > 0 {
                let mut event: XEvent = std::mem::zeroed();
                (xlib.XNextEvent)(self.display, &mut event);
                for native in self.translate(&event) {
                    ctx.dispatch(native);
                }
            }
        }
    }

    fn apply_commands(&mut self, commands: &PendingCommands) {
        if let Some(style) = commands.style {
            self.apply_style(style);
        }
        if let Some(rect) = commands.rect {
            self.apply_rect(rect);
        }
        if let Some(title) = &commands.title {
            self.apply_title(title);
        }
        if commands.focus {
            self.focus();
        }
        unsafe { (self.libs.xlib.XFlush)(self.display) };
    }

    fn present(&mut self, texture: Option<TextureRef>) -> PresentStatus {
        let Some(quad) = &self.quad else {
            return PresentStatus::Skipped;
        };
        let size = self.geometry.reported;
        quad.draw(
            texture.and_then(gl_quad::texture_name),
            size.width,
            size.height,
            !self.style.transparent,
        );
        unsafe { (self.libs.glx.glXSwapBuffers)(self.display, self.window) };
        PresentStatus::Presented
    }
}

impl Drop for GlxSurface {
    fn drop(&mut self) {
        let xlib = &self.libs.xlib;
        let glx = &self.libs.glx;
        unsafe {
            if let Some(mut quad) = self.quad.take() {
                quad.release();
            }
            if !self.context.is_null() {
                (glx.glXMakeCurrent)(self.display, 0, ptr::null_mut());
                (glx.glXDestroyContext)(self.display, self.context);
            }
            if self.window != 0 {
                (xlib.XDestroyWindow)(self.display, self.window);
            }
            if self.colormap != 0 {
                (xlib.XFreeColormap)(self.display, self.colormap);
            }
            (xlib.XCloseDisplay)(self.display);
        }
        debug!("🧹 GLX surface released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn atoms() -> Atoms {
        Atoms {
            wm_delete_window: 1,
            motif_wm_hints: 2,
            net_wm_state: 3,
            net_wm_state_hidden: 10,
            net_wm_state_maximized_vert: 11,
            net_wm_state_maximized_horz: 12,
            net_wm_name: 4,
            net_active_window: 5,
            utf8_string: 6,
        }
    }

    #[test]
    fn test_default_style_keeps_decorations_and_all_functions() {
        let hints = motif_hints(WindowStyle::default());
        assert_eq!(hints[0], MWM_HINTS_FUNCTIONS | MWM_HINTS_DECORATIONS);
        assert_eq!(hints[1], 2 | 4 | 8 | 16 | 32);
        assert_eq!(hints[2], 1);
    }

    #[test]
    fn test_borderless_fixed_window_hints() {
        let hints = motif_hints(WindowStyle {
            borderless: true,
            transparent: false,
            resizable: false,
            has_min_button: false,
            has_max_button: true,
        });
        assert_eq!(hints[1], MWM_FUNC_MOVE | MWM_FUNC_CLOSE | MWM_FUNC_MAXIMIZE);
        assert_eq!(hints[2], 0);
    }

    #[test]
    fn test_host_resize_is_still_reported_by_configure() {
        let mut geometry = Geometry::new(Rect::new(100, 100, 640, 480));
        geometry.request(Rect::new(10, 20, 400, 300));
        assert_eq!(geometry.requested, Rect::new(10, 20, 400, 300));

        let events = geometry.configure(10, 20, 400, 300);
        assert_eq!(
            events,
            vec![
                NativeEvent::Resized {
                    width: 400,
                    height: 300
                },
                NativeEvent::Moved { x: 10, y: 20 },
            ]
        );
        assert_eq!(geometry.reported, Rect::new(10, 20, 400, 300));
    }

    #[test]
    fn test_repeated_configure_is_quiet() {
        let mut geometry = Geometry::new(Rect::new(0, 0, 320, 240));
        assert!(geometry.configure(0, 0, 320, 240).is_empty());
        assert_eq!(
            geometry.configure(5, 0, 320, 240),
            vec![NativeEvent::Moved { x: 5, y: 0 }]
        );
        assert!(geometry.configure(5, 0, 320, 240).is_empty());
    }

    unsafe extern "C" fn host_handler(_: *mut Display, _: *mut xlib::XErrorEvent) -> c_int {
        1
    }

    fn address(handler: XErrorHandler) -> Option<usize> {
        handler.map(|f| f as usize)
    }

    #[test]
    fn test_error_handler_is_returned_to_the_host() {
        let saved = Mutex::new(None);
        let current: Cell<XErrorHandler> = Cell::new(Some(host_handler));
        let set = |handler: XErrorHandler| current.replace(handler);

        install_error_handler(&saved, &set);
        install_error_handler(&saved, &set);
        assert_eq!(address(current.get()), address(Some(log_x_error)));
        assert!(restore_error_handler(&saved, &set));
        assert!(!restore_error_handler(&saved, &set));
        assert_eq!(address(current.get()), address(Some(host_handler)));

        // a later load installs again
        install_error_handler(&saved, &set);
        assert_eq!(address(current.get()), address(Some(log_x_error)));
    }

    #[test]
    fn test_wm_state_mapping() {
        let atoms = atoms();
        assert_eq!(show_state(&[], &atoms), ShowState::Normal);
        assert_eq!(show_state(&[10, 11, 12], &atoms), ShowState::Minimized);
        assert_eq!(show_state(&[11, 12], &atoms), ShowState::Maximized);
        // one axis only is not maximized
        assert_eq!(show_state(&[11], &atoms), ShowState::Normal);
    }

    #[test]
    fn test_show_transitions_emit_once() {
        use ShowState::*;
        assert_eq!(show_transition(Normal, Normal), None);
        assert_eq!(show_transition(Normal, Minimized), Some(NativeEvent::Minimized));
        assert_eq!(show_transition(Minimized, Maximized), Some(NativeEvent::Maximized));
        assert_eq!(show_transition(Maximized, Normal), Some(NativeEvent::Restored));
    }
}
