//! glyphgrid demo: an editable line of vector text.
//!
//! ```text
//! glyphgrid-demo [FONT] [--headless]
//! ```
//!
//! `FONT` is a font file path or a CSS-style family list; without it the
//! platform's default sans-serif face is used. Typing appends to the input
//! line, Backspace deletes, the scroll wheel zooms, Escape quits.
//! `--headless` renders one frame off-screen and logs the frame stats.

mod state;

use std::error::Error;
use std::sync::Arc;

use log::info;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes, WindowId},
};

use glyphgrid_atlas::{AtlasConfig, FontContext};
use glyphgrid_render::context::GpuContext;
use glyphgrid_render::renderer::{RenderError, TextRenderer};
use state::{load_face, AppState, FontArg, Scene};

/// Winit 0.30 application handler.
struct App {
    font: FontArg,
    window: Option<Arc<Window>>,
    state: Option<AppState>,
}

impl App {
    fn new(font: FontArg) -> Self {
        Self {
            font,
            window: None,
            state: None,
        }
    }

    fn init(&self, window: Arc<Window>) -> Result<AppState, Box<dyn Error>> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));
        let gpu = pollster::block_on(GpuContext::new_with_surface(window, width, height))?;

        let fonts = FontContext::with_config(AtlasConfig::default())?;
        let face = load_face(&fonts, &self.font);
        fonts.load_ascii(face)?;
        let scene = Scene::new(fonts, face, width, height)?;

        info!(
            "Demo initialized: {}×{}, GPU: {:?}",
            width,
            height,
            gpu.adapter.get_info().name
        );
        Ok(AppState::new(gpu, scene))
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized.
        }

        let attrs = WindowAttributes::default()
            .with_title("glyphgrid")
            .with_inner_size(LogicalSize::new(1024, 640))
            .with_min_inner_size(LogicalSize::new(320, 200));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match self.init(window.clone()) {
            Ok(state) => {
                self.state = Some(state);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("Failed to initialize: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let (Some(window), Some(state)) = (self.window.as_ref(), self.state.as_mut()) else {
            return;
        };

        match event {
            // ── Close / Escape ──────────────────────────────────
            WindowEvent::CloseRequested => {
                info!("Window closed after {} frames", state.frames());
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed =>
            {
                let edited = match &event.logical_key {
                    Key::Named(NamedKey::Escape) => {
                        event_loop.exit();
                        return;
                    }
                    Key::Named(NamedKey::Backspace) => state.scene.backspace(),
                    _ => match event.text.as_deref() {
                        Some(text) => state.scene.type_text(text),
                        None => Ok(()),
                    },
                };
                if let Err(e) = edited {
                    log::error!("Edit failed: {e}");
                }
                window.request_redraw();
            }

            // ── Resize ──────────────────────────────────────────
            WindowEvent::Resized(new_size) => {
                state.resize(new_size.width, new_size.height);
                window.request_redraw();
            }

            // ── Scroll → zoom ───────────────────────────────────
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                state.scene.zoom_by(lines);
                window.request_redraw();
            }

            // ── Redraw ──────────────────────────────────────────
            WindowEvent::RedrawRequested => {
                match state.render_frame() {
                    Ok(stats) => {
                        if state.frames() % 300 == 0 {
                            info!(
                                "Frame {}: {} glyphs, {} draw call(s)",
                                state.frames(),
                                stats.glyph_count,
                                stats.draw_calls
                            );
                        }
                    }
                    Err(RenderError::Surface(
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
                    )) => {
                        // Reconfigure surface on lost/outdated.
                        let size = window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Render error: {e}");
                    }
                }
                // Continuous redraws keep the caret blinking.
                window.request_redraw();
            }

            _ => {}
        }
    }
}

/// Render the scene once into an off-screen target.
fn run_headless(font: &FontArg) -> Result<(), Box<dyn Error>> {
    let gpu = pollster::block_on(GpuContext::new_headless())?;
    let fonts = FontContext::with_config(AtlasConfig::default())?;
    let face = load_face(&fonts, font);
    let loaded = fonts.load_ascii(face)?;
    info!("Pre-loaded {loaded} glyphs");

    let (width, height) = (1024, 640);
    let mut scene = Scene::new(fonts, face, width, height)?;
    let target = gpu.create_target(width, height);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let mut renderer = TextRenderer::new(&gpu, width, height);
    let frame = renderer.render(&gpu, &scene.fonts, &view, &[&scene.title, &scene.input], 0.0);
    scene.update_status(&frame)?;
    let status = renderer.render_also(&gpu, &scene.fonts, &view, &[&scene.status], 0.0);

    info!(
        "Headless frame: {} glyphs, {} draw call(s), {} page(s) uploaded",
        frame.glyph_count + status.glyph_count,
        frame.draw_calls + status.draw_calls,
        frame.pages_uploaded
    );
    info!("Atlas: {:?}", scene.fonts.stats());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut headless = false;
    let mut font = None;
    for arg in std::env::args().skip(1) {
        if arg == "--headless" {
            headless = true;
        } else {
            font = Some(arg);
        }
    }
    let font = FontArg::parse(font);

    if headless {
        return run_headless(&font);
    }

    info!("Starting glyphgrid demo...");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(font);
    event_loop.run_app(&mut app)?;
    Ok(())
}
