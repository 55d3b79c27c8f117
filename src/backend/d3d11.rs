//! Direct3D 11 backend.
//!
//! Every sub-window gets a swap chain created on the host's own device and
//! each frame copies the host texture into the back buffer. The host keeps
//! issuing commands on that device from its render thread, so every device
//! call made here runs under the device's `ID3D10Multithread` lock.

use super::win32::Win32Window;
use super::{Backend, PresentStatus, Surface, SurfaceInit};
use crate::command::{PendingCommands, TextureRef};
use crate::context::WindowContext;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::ffi::c_void;
use std::sync::Arc;
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D10::ID3D10Multithread;
use windows::Win32::Graphics::Direct3D11::{
    ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D, D3D11_TEXTURE2D_DESC,
};
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_FORMAT, DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
    DXGI_FORMAT_R10G10B10A2_UNORM, DXGI_FORMAT_R16G16B16A16_FLOAT, DXGI_FORMAT_R8G8B8A8_UNORM,
    DXGI_FORMAT_R8G8B8A8_UNORM_SRGB, DXGI_MODE_DESC, DXGI_SAMPLE_DESC,
};
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory1, IDXGIFactory1, IDXGISwapChain, DXGI_ERROR_DEVICE_REMOVED,
    DXGI_ERROR_DEVICE_RESET, DXGI_PRESENT, DXGI_SWAP_CHAIN_DESC, DXGI_SWAP_CHAIN_FLAG,
    DXGI_SWAP_EFFECT_DISCARD, DXGI_USAGE_RENDER_TARGET_OUTPUT,
};

/// Holds the device-wide multithread lock for its lifetime.
struct DeviceLock<'a>(Option<&'a ID3D10Multithread>);

impl<'a> DeviceLock<'a> {
    fn enter(multithread: Option<&'a ID3D10Multithread>) -> Self {
        if let Some(mt) = multithread {
            unsafe { mt.Enter() };
        }
        Self(multithread)
    }
}

impl Drop for DeviceLock<'_> {
    fn drop(&mut self) {
        if let Some(mt) = self.0 {
            unsafe { mt.Leave() };
        }
    }
}

#[derive(Clone)]
struct HostDevice {
    device: ID3D11Device,
    multithread: Option<ID3D10Multithread>,
}

// D3D11 devices are free-threaded. The immediate context is only touched
// under the multithread lock.
unsafe impl Send for HostDevice {}
unsafe impl Sync for HostDevice {}

/// Backend bound to the host engine's `ID3D11Device`.
#[derive(Default)]
pub struct D3D11Backend {
    host: RwLock<Option<HostDevice>>,
}

impl D3D11Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the host device and turns on multithread protection.
    ///
    /// # Safety
    /// `device` must be null or a live `ID3D11Device*`.
    pub unsafe fn attach_host_device(&self, device: *mut c_void) -> bool {
        let Some(device) = ID3D11Device::from_raw_borrowed(&device).cloned() else {
            warn!("⚠️ Host returned no D3D11 device");
            return false;
        };

        let multithread = match device.cast::<ID3D10Multithread>() {
            Ok(mt) => {
                let _ = mt.SetMultithreadProtected(true);
                Some(mt)
            }
            Err(err) => {
                warn!("⚠️ ID3D10Multithread unavailable, device calls are unguarded: {}", err);
                None
            }
        };

        info!("🎮 Captured host D3D11 device");
        *self.host.write() = Some(HostDevice {
            device,
            multithread,
        });
        true
    }

    /// Drops the device references taken at load.
    pub fn detach_host_device(&self) {
        if self.host.write().take().is_some() {
            debug!("🎮 Released host D3D11 device");
        }
    }
}

/// Swap-chain formats a host texture can be copied into directly.
fn presentable(format: DXGI_FORMAT) -> bool {
    [
        DXGI_FORMAT_R8G8B8A8_UNORM,
        DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
        DXGI_FORMAT_B8G8R8A8_UNORM,
        DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
        DXGI_FORMAT_R10G10B10A2_UNORM,
        DXGI_FORMAT_R16G16B16A16_FLOAT,
    ]
    .contains(&format)
}

impl Backend for D3D11Backend {
    type Surface = D3D11Surface;

    fn name(&self) -> &'static str {
        "d3d11"
    }

    fn host_ready(&self) -> bool {
        self.host.read().is_some()
    }

    fn create_surface(&self, ctx: &Arc<WindowContext>, init: &SurfaceInit) -> Result<D3D11Surface> {
        let host = self
            .host
            .read()
            .clone()
            .context("Host D3D11 device not captured")?;

        let window = Win32Window::create(ctx, init)?;
        let factory: IDXGIFactory1 =
            unsafe { CreateDXGIFactory1() }.context("CreateDXGIFactory1 failed")?;

        let width = init.rect.width.max(1) as u32;
        let height = init.rect.height.max(1) as u32;
        let desc = DXGI_SWAP_CHAIN_DESC {
            BufferDesc: DXGI_MODE_DESC {
                Width: width,
                Height: height,
                Format: DXGI_FORMAT_R8G8B8A8_UNORM,
                ..Default::default()
            },
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: 1,
            OutputWindow: window.hwnd(),
            Windowed: true.into(),
            SwapEffect: DXGI_SWAP_EFFECT_DISCARD,
            Flags: 0,
        };

        let (swap_chain, back_buffer, context) = {
            let _lock = DeviceLock::enter(host.multithread.as_ref());
            let mut swap_chain: Option<IDXGISwapChain> = None;
            unsafe { factory.CreateSwapChain(&host.device, &desc, &mut swap_chain) }
                .ok()
                .context("CreateSwapChain failed")?;
            let swap_chain = swap_chain.context("CreateSwapChain returned no swap chain")?;
            let back_buffer: ID3D11Texture2D =
                unsafe { swap_chain.GetBuffer(0) }.context("GetBuffer failed")?;
            let context = unsafe { host.device.GetImmediateContext() }
                .context("GetImmediateContext failed")?;
            (swap_chain, back_buffer, context)
        };

        window.show();
        info!("🖥️ D3D11 swap chain ready for sub-window {} ({}x{})", ctx.handle(), width, height);

        Ok(D3D11Surface {
            context,
            multithread: host.multithread,
            back_buffer: Some(back_buffer),
            buffer: (width, height, DXGI_FORMAT_R8G8B8A8_UNORM),
            swap_chain,
            factory,
            window,
            vsync: init.vsync,
        })
    }
}

/// Fields are declared in reverse acquisition order so drop releases the
/// immediate context first and the window last.
pub struct D3D11Surface {
    context: ID3D11DeviceContext,
    multithread: Option<ID3D10Multithread>,
    back_buffer: Option<ID3D11Texture2D>,
    buffer: (u32, u32, DXGI_FORMAT),
    swap_chain: IDXGISwapChain,
    #[allow(dead_code)]
    factory: IDXGIFactory1,
    window: Win32Window,
    vsync: bool,
}

impl D3D11Surface {
    /// Resizes the back buffer to match `texture` so `CopyResource` is valid.
    fn match_texture(&mut self, texture: &ID3D11Texture2D) -> Result<()> {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let format = if presentable(desc.Format) {
            desc.Format
        } else {
            self.buffer.2
        };
        if (desc.Width, desc.Height, format) == self.buffer {
            return Ok(());
        }

        debug!(
            "📐 Resizing back buffer {}x{} -> {}x{}",
            self.buffer.0, self.buffer.1, desc.Width, desc.Height
        );
        self.back_buffer = None;
        unsafe {
            self.swap_chain
                .ResizeBuffers(0, desc.Width, desc.Height, format, DXGI_SWAP_CHAIN_FLAG(0))
        }
        .context("ResizeBuffers failed")?;
        self.back_buffer =
            Some(unsafe { self.swap_chain.GetBuffer(0) }.context("GetBuffer failed")?);
        self.buffer = (desc.Width, desc.Height, format);
        Ok(())
    }
}

impl Surface for D3D11Surface {
    fn pump_events(&mut self, _ctx: &WindowContext) {
        self.window.pump();
    }

    fn apply_commands(&mut self, commands: &PendingCommands) {
        if let Some(style) = commands.style {
            self.window.apply_style(style);
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
        if let Some(texture) = texture {
            let raw = texture.as_raw() as *mut c_void;
            if let Some(texture) = unsafe { ID3D11Texture2D::from_raw_borrowed(&raw) } {
                let multithread = self.multithread.clone();
                let _lock = DeviceLock::enter(multithread.as_ref());
                if let Err(err) = self.match_texture(texture) {
                    warn!("⚠️ Could not match back buffer to host texture: {:#}", err);
                }
                if let Some(back_buffer) = &self.back_buffer {
                    unsafe { self.context.CopyResource(back_buffer, texture) };
                }
            }
        }

        let interval = u32::from(self.vsync);
        let hr = unsafe { self.swap_chain.Present(interval, DXGI_PRESENT(0)) };
        if hr == DXGI_ERROR_DEVICE_REMOVED || hr == DXGI_ERROR_DEVICE_RESET {
            return PresentStatus::DeviceLost;
        }
        PresentStatus::Presented
    }
}
