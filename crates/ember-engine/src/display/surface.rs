use std::sync::mpsc;
use std::sync::Arc;

use anyhow::Result;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Fullscreen, Window};

use super::state::{DisplayState, ModeTransition};
use crate::coords::Viewport;
use crate::device::{RenderDevice, WgpuDevice};
use crate::error::InitError;
use crate::vfs::Vfs;

/// Display configuration at initialization.
///
/// Keep this structure stable and minimal; runtime mode changes go through
/// [`DisplaySurface`] methods.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Start in exclusive fullscreen at the configured resolution instead
    /// of a window.
    pub fullscreen: bool,
    /// Block presentation on the display refresh (FIFO).
    pub vsync: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "ember".to_string(),
            width: 800,
            height: 600,
            fullscreen: false,
            vsync: true,
        }
    }
}

/// One acquired swapchain frame.
///
/// Short-lived; holding it prevents acquisition of subsequent frames. Pass
/// it back to [`DisplaySurface::present`] after drawing.
pub struct Frame {
    surface_texture: wgpu::SurfaceTexture,
}

/// Owns the window and the presentable surface.
///
/// Couples the pure [`DisplayState`] mode machine to winit and wgpu: every
/// size or mode change recomputes the surface configuration and the
/// orthographic projection (logical pixels, origin top-left, Y down).
pub struct DisplaySurface {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    state: DisplayState,
    resize_tx: mpsc::Sender<(u32, u32)>,
    resize_rx: mpsc::Receiver<(u32, u32)>,
}

impl DisplaySurface {
    /// Creates the window, GPU context and presentable surface.
    ///
    /// The desktop resolution is queried and cached here, once; desktop
    /// fullscreen reports it for the lifetime of the surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu; this blocks on
    /// it, matching the synchronous startup contract.
    pub fn initialize(
        event_loop: &ActiveEventLoop,
        config: &DisplayConfig,
    ) -> Result<(Self, WgpuDevice), InitError> {
        let attrs = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width.max(1), config.height.max(1)))
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .map(Arc::new)
            .map_err(|e| InitError::WindowCreation(e.to_string()))?;

        let desktop = event_loop
            .primary_monitor()
            .or_else(|| window.current_monitor())
            .map(|m| {
                let size = m.size();
                (size.width, size.height)
            })
            .unwrap_or_else(|| {
                log::warn!("no monitor handle; desktop resolution falls back to window size");
                (config.width, config.height)
            });

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| InitError::ContextCreation(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| InitError::BackendInit(e.to_string()))?;

        // Capability floor: the internal shaders are fixed, but a driver
        // without a usable shading model cannot run them either.
        if adapter.get_downlevel_capabilities().shader_model == wgpu::ShaderModel::Sm2 {
            return Err(InitError::MissingCapability);
        }

        log::info!("adapter: {}", adapter.get_info().name);
        log::info!("desktop resolution: {}x{}", desktop.0, desktop.1);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("ember device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| InitError::ContextCreation(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps)
            .ok_or_else(|| InitError::ContextCreation("no supported surface formats".into()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: config.width.max(1),
            height: config.height.max(1),
            present_mode: if config.vsync {
                wgpu::PresentMode::Fifo
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let mut render = WgpuDevice::new(device, queue, format);
        render.set_projection(Viewport::new(config.width as f32, config.height as f32));

        let (resize_tx, resize_rx) = mpsc::channel();

        let mut display = Self {
            window,
            surface,
            config: surface_config,
            state: DisplayState::new(config.width, config.height, desktop, config.vsync),
            resize_tx,
            resize_rx,
        };

        if config.fullscreen {
            // Exclusive at the configured resolution, so startup size
            // queries keep reporting the requested size.
            display.set_fullscreen(&mut render, true, true);
        }

        Ok((display, render))
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Reported logical width; follows the mode machine's rules.
    pub fn width(&self) -> u32 {
        self.state.width()
    }

    pub fn height(&self) -> u32 {
        self.state.height()
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Sender half of the resize-event stream.
    ///
    /// The windowing event dispatch pushes `(width, height)` here;
    /// [`Self::pump_resize_events`] drains it. The subscription ends when
    /// this surface (the receiver) is dropped.
    pub fn resize_notifier(&self) -> mpsc::Sender<(u32, u32)> {
        self.resize_tx.clone()
    }

    /// Drains the resize stream and applies the most recent size.
    pub fn pump_resize_events(&mut self, device: &mut WgpuDevice) {
        let mut latest = None;
        while let Ok(size) = self.resize_rx.try_recv() {
            latest = Some(size);
        }
        if let Some((w, h)) = latest {
            self.handle_resized(device, w, h);
        }
    }

    /// Requests a new logical size.
    ///
    /// A windowed resize is applied immediately and the window is
    /// re-centered on its monitor. While fullscreen the request is deferred
    /// (applied when the mode is left); while desktop fullscreen the
    /// reported size stays the cached desktop resolution regardless.
    pub fn resize(&mut self, device: &mut WgpuDevice, width: u32, height: u32) {
        if self.state.resize(width, height) {
            let _ = self.window.request_inner_size(PhysicalSize::new(width, height));
            self.reconfigure(device, width, height);
            self.center_window();
        }
    }

    /// Applies a backbuffer size reported by the windowing layer.
    pub fn handle_resized(&mut self, device: &mut WgpuDevice, width: u32, height: u32) {
        self.state.apply_backbuffer_size(width, height);
        self.reconfigure(device, width, height);
    }

    /// Enters or leaves fullscreen.
    ///
    /// `exclusive` picks a display mode matching the current size when
    /// available; otherwise this falls back to a borderless window with a
    /// warning. Leaving restores the prior windowed size and re-centers.
    pub fn set_fullscreen(&mut self, device: &mut WgpuDevice, fullscreen: bool, exclusive: bool) {
        match self.state.set_fullscreen(fullscreen, exclusive) {
            ModeTransition::None => {}
            ModeTransition::Enter(_) => {
                self.window.set_resizable(false);
                self.window.set_fullscreen(Some(self.fullscreen_handle(exclusive)));
                let (w, h) = (self.state.width(), self.state.height());
                self.reconfigure(device, w, h);
            }
            ModeTransition::Leave { size: (w, h) } => {
                self.window.set_fullscreen(None);
                let _ = self.window.request_inner_size(PhysicalSize::new(w, h));
                self.window.set_resizable(self.state.effective_resizable());
                self.center_window();
                self.reconfigure(device, w, h);
            }
        }
    }

    /// No-op while fullscreen; the preference is kept and applied on return
    /// to windowed mode.
    pub fn set_resizable(&mut self, resizable: bool) {
        self.state.set_resizable(resizable);
        if !self.state.is_fullscreen() {
            self.window.set_resizable(resizable);
        }
    }

    pub fn set_minimum_size(&self, width: u32, height: u32) {
        self.window
            .set_min_inner_size(Some(PhysicalSize::new(width, height)));
    }

    /// Shows or hides the system pointer over the window.
    pub fn show_system_pointer(&self, visible: bool) {
        self.window.set_cursor_visible(visible);
    }

    /// Loads and applies a window icon. Best-effort: failures are logged
    /// and skipped, never raised.
    pub fn set_window_icon(&self, vfs: &dyn Vfs, path: &str) {
        let bytes = match vfs.open(path) {
            Ok(b) if !b.is_empty() => b,
            Ok(_) => {
                log::warn!("window icon '{path}' is empty, skipping");
                return;
            }
            Err(e) => {
                log::warn!("failed to read window icon '{path}': {e:#}");
                return;
            }
        };

        let rgba = match image::load_from_memory(&bytes) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                log::warn!("failed to decode window icon '{path}': {e}");
                return;
            }
        };

        let (w, h) = rgba.dimensions();
        match winit::window::Icon::from_rgba(rgba.into_raw(), w, h) {
            Ok(icon) => self.window.set_window_icon(Some(icon)),
            Err(e) => log::warn!("window icon '{path}' rejected: {e}"),
        }
    }

    /// Acquires the next frame and points screen draws at it.
    ///
    /// Returns `Ok(None)` when the frame should be skipped (transient
    /// surface errors; lost/outdated surfaces are reconfigured for the next
    /// attempt). Only surface memory exhaustion is fatal.
    pub fn begin_frame(&mut self, device: &mut WgpuDevice) -> Result<Option<Frame>> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                if self.config.width > 0 && self.config.height > 0 {
                    self.surface.configure(device.device(), &self.config);
                }
                return Ok(None);
            }
            Err(wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other) => {
                log::warn!("transient surface error, skipping frame");
                return Ok(None);
            }
            Err(e @ wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow::anyhow!(e).context("surface out of memory"));
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        device.set_screen_target(Some(view));

        Ok(Some(Frame { surface_texture }))
    }

    /// Presents a frame acquired by [`Self::begin_frame`].
    ///
    /// With vsync configured (FIFO) this blocks on the display refresh.
    pub fn present(&self, device: &mut WgpuDevice, frame: Frame) {
        device.set_screen_target(None);
        frame.surface_texture.present();
    }

    fn fullscreen_handle(&self, exclusive: bool) -> Fullscreen {
        if exclusive {
            let want = (self.state.width(), self.state.height());
            let mode = self.window.current_monitor().and_then(|m| {
                m.video_modes()
                    .find(|v| v.size().width == want.0 && v.size().height == want.1)
            });
            match mode {
                Some(v) => return Fullscreen::Exclusive(v),
                None => log::warn!(
                    "no exclusive mode at {}x{}, falling back to borderless",
                    want.0,
                    want.1
                ),
            }
        }
        Fullscreen::Borderless(None)
    }

    fn center_window(&self) {
        let Some(monitor) = self.window.current_monitor() else {
            return;
        };
        let monitor_size = monitor.size();
        let window_size = self.window.outer_size();
        let origin = monitor.position();
        let x = origin.x + monitor_size.width.saturating_sub(window_size.width) as i32 / 2;
        let y = origin.y + monitor_size.height.saturating_sub(window_size.height) as i32 / 2;
        self.window.set_outer_position(PhysicalPosition::new(x, y));
    }

    fn reconfigure(&mut self, device: &mut WgpuDevice, width: u32, height: u32) {
        // A 0x0 surface cannot be configured; keep state and defer.
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(device.device(), &self.config);
        }
        device.set_projection(Viewport::new(
            self.state.width() as f32,
            self.state.height() as f32,
        ));
    }
}

fn choose_surface_format(caps: &wgpu::SurfaceCapabilities) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    // Colors are produced in straight (non-sRGB-encoded) space.
    let preferred = [
        wgpu::TextureFormat::Bgra8Unorm,
        wgpu::TextureFormat::Rgba8Unorm,
    ];
    for f in preferred {
        if caps.formats.contains(&f) {
            return Some(f);
        }
    }

    Some(caps.formats[0])
}
