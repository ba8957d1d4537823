//! Exercise binary for the ember engine.
//!
//! Opens a window and drives the immediate-mode draw surface: images
//! (plain, rotated, repeated), render-to-texture copies, gradients, boxes,
//! anti-aliased lines, circles and points. F11 toggles desktop fullscreen.

use std::sync::mpsc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CustomCursor, WindowId};

use ember_engine::cursor::{CursorRegistry, WinitCursorHost};
use ember_engine::device::{RenderDevice, WgpuDevice};
use ember_engine::display::{DisplayConfig, DisplaySurface};
use ember_engine::logging::{LoggingConfig, init_logging};
use ember_engine::paint::Color;
use ember_engine::render::{Canvas, copy_region};
use ember_engine::texture::{TextureCache, TextureKey};
use ember_engine::vfs::DiskVfs;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = Demo::default();
    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;
    Ok(())
}

#[derive(Default)]
struct Demo {
    window: Option<DemoWindow>,
}

struct DemoWindow {
    display: DisplaySurface,
    canvas: Canvas<WgpuDevice>,
    cache: TextureCache,
    cursors: CursorRegistry<CustomCursor>,
    resize_tx: mpsc::Sender<(u32, u32)>,
    checker: TextureKey,
    composite: TextureKey,
    angle: f32,
    fullscreen: bool,
}

impl DemoWindow {
    fn create(event_loop: &ActiveEventLoop) -> Result<Self> {
        let config = DisplayConfig {
            title: "ember demo".to_string(),
            width: 1024,
            height: 640,
            fullscreen: false,
            vsync: true,
        };

        let (display, mut device) = DisplaySurface::initialize(event_loop, &config)?;
        display.set_minimum_size(320, 200);
        display.set_window_icon(&DiskVfs, "assets/icon.png");

        let mut cache = TextureCache::new();

        let pixels = checker_pixels(64, 64, 8);
        let texture = device.create_texture(64, 64, Some(&pixels))?;
        let checker = cache.register(texture, 64, 64);

        let texture = device.create_texture(128, 128, None)?;
        let composite = cache.register(texture, 128, 128);

        // Bake the checkerboard into the composite target, deliberately
        // overlapping the right edge to exercise clipping.
        copy_region(&mut device, &mut cache, checker, composite, 16.0, 16.0)?;
        copy_region(&mut device, &mut cache, checker, composite, 96.0, 96.0)?;

        let resize_tx = display.resize_notifier();

        let mut cursors = CursorRegistry::new();
        let mut host = WinitCursorHost {
            event_loop,
            window: display.window(),
        };
        cursors.add_cursor(&mut host, &DiskVfs, "assets/pointer.png", 0, 0, 0);

        Ok(Self {
            display,
            canvas: Canvas::new(device),
            cache,
            cursors,
            resize_tx,
            checker,
            composite,
            angle: 0.0,
            fullscreen: false,
        })
    }

    fn render(&mut self) -> Result<()> {
        let Some(frame) = self.display.begin_frame(self.canvas.device_mut())? else {
            return Ok(());
        };

        let (w, h) = (self.display.width() as f32, self.display.height() as f32);
        let canvas = &mut self.canvas;

        canvas.clear(Color::rgb(18, 18, 26));
        canvas.draw_gradient(
            0.0,
            0.0,
            w,
            96.0,
            Color::rgb(64, 24, 96),
            Color::rgb(24, 48, 96),
            Color::rgb(18, 18, 26),
            Color::rgb(18, 18, 26),
        );

        canvas.draw_image(&self.cache, self.checker, 24.0, 120.0, 1.0, Color::WHITE);
        canvas.draw_image_rotated(
            &self.cache,
            self.checker,
            140.0,
            120.0,
            self.angle,
            Color::rgb(255, 200, 200),
            1.0,
        );
        canvas.draw_image_repeated(&self.cache, self.checker, 24.0, 210.0, 180.0, 60.0);
        canvas.draw_image(&self.cache, self.composite, 240.0, 120.0, 1.0, Color::WHITE);

        canvas.draw_box_filled(420.0, 130.0, 120.0, 60.0, Color::rgba(200, 60, 60, 255));
        canvas.draw_box(420.0, 130.0, 120.0, 60.0, Color::WHITE);

        canvas.draw_circle(640.0, 160.0, 40.0, Color::rgb(120, 220, 120), 32, 1.0, 1.0);
        canvas.draw_circle(640.0, 160.0, 40.0, Color::rgb(120, 220, 120), 32, 1.6, 0.6);

        for (i, width) in [0.5_f32, 1.0, 2.0, 4.0, 7.0].into_iter().enumerate() {
            let y = 300.0 + i as f32 * 18.0;
            canvas.draw_line(24.0, y, 280.0, y + 8.0, Color::rgb(240, 220, 120), width);
        }

        for i in 0..24 {
            canvas.draw_point(420.0 + (i % 8) as f32 * 6.0, 300.0 + (i / 8) as f32 * 6.0, Color::WHITE);
        }

        // Scissor demo: clip a gradient to a window, then release the clip.
        canvas.clip_rect(700.0, 280.0, 140.0, 90.0);
        canvas.draw_gradient(
            660.0,
            260.0,
            220.0,
            130.0,
            Color::rgb(255, 0, 0),
            Color::rgb(0, 255, 0),
            Color::rgb(0, 0, 255),
            Color::rgb(255, 255, 0),
        );
        canvas.clip_rect(0.0, 0.0, 0.0, 0.0);

        self.display.present(self.canvas.device_mut(), frame);
        self.angle = (self.angle + 0.5) % 360.0;
        Ok(())
    }
}

impl ApplicationHandler for Demo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match DemoWindow::create(event_loop) {
            Ok(w) => {
                w.display.window().request_redraw();
                self.window = Some(w);
            }
            Err(e) => {
                log::error!("failed to initialize display: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(w) = &self.window {
            w.display.window().request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                // Feed the resize stream and drain it, as the real event
                // dispatch layer would.
                let _ = window.resize_tx.send((size.width, size.height));
                let (display, canvas) = (&mut window.display, &mut window.canvas);
                display.pump_resize_events(canvas.device_mut());
            }

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
                    PhysicalKey::Code(KeyCode::F11) => {
                        window.fullscreen = !window.fullscreen;
                        let fullscreen = window.fullscreen;
                        let (display, canvas) = (&mut window.display, &mut window.canvas);
                        display.set_fullscreen(canvas.device_mut(), fullscreen, false);
                    }
                    PhysicalKey::Code(KeyCode::KeyC) if !window.cursors.is_empty() => {
                        let mut host = WinitCursorHost {
                            event_loop,
                            window: window.display.window(),
                        };
                        if let Err(e) = window.cursors.set_cursor(&mut host, 0) {
                            log::warn!("cursor activation failed: {e:#}");
                        }
                    }
                    _ => {}
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = window.render() {
                    log::error!("render failed: {e:#}");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

fn checker_pixels(width: u32, height: u32, cell: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            if on {
                out.extend_from_slice(&[235, 235, 235, 255]);
            } else {
                out.extend_from_slice(&[60, 60, 70, 255]);
            }
        }
    }
    out
}
