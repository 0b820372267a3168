//! Demo state: a font context, three labels, and the GPU renderer.
//!
//! `Scene` is everything that does not touch the GPU, so it can be tested
//! headless. `AppState` adds the device and renderer on top.

use std::path::PathBuf;
use std::time::Instant;

use glyphgrid_atlas::{AtlasError, FaceId, FontContext, StaticOutlines};
use glyphgrid_render::context::GpuContext;
use glyphgrid_render::label::{Align, Label};
use glyphgrid_render::renderer::{FrameStats, RenderError, TextRenderer};
use glyphgrid_render::vertex::Color;

const TITLE_COLOR: Color = Color::rgba(0xf0, 0xf0, 0xf0, 0xff);
const INPUT_COLOR: Color = Color::rgba(0x6c, 0xb4, 0xff, 0xff);
const STATUS_COLOR: Color = Color::rgba(0x90, 0x90, 0x98, 0xff);

/// Pixels per em of each label at zoom 1.
const TITLE_SCALE: f32 = 40.0;
const INPUT_SCALE: f32 = 64.0;
const STATUS_SCALE: f32 = 16.0;
const MARGIN: f32 = 16.0;

// ── Font selection ──────────────────────────────────────────────────

/// The demo's optional first argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontArg {
    /// The platform's default sans-serif face.
    Default,
    Path(PathBuf),
    /// A CSS-style family list, e.g. `"Inter, sans-serif"`.
    Family(String),
}

impl FontArg {
    pub fn parse(arg: Option<String>) -> Self {
        match arg {
            None => Self::Default,
            Some(arg) if std::path::Path::new(&arg).is_file() => Self::Path(arg.into()),
            Some(arg) => Self::Family(arg),
        }
    }
}

/// Register the requested face, falling back to built-in block glyphs when
/// the platform cannot provide it.
pub fn load_face(fonts: &FontContext, arg: &FontArg) -> FaceId {
    let loaded = match arg {
        FontArg::Default => fonts.write().default_font(),
        FontArg::Path(path) => fonts.write().font_from_path(path),
        FontArg::Family(families) => fonts.font_from_name(families),
    };
    match loaded {
        Ok(face) => face,
        Err(e) => {
            log::warn!("Font {arg:?} unavailable ({e}), using built-in block glyphs");
            fonts.add_face(StaticOutlines::block_face("builtin-blocks"))
        }
    }
}

// ── Scene ───────────────────────────────────────────────────────────

/// Title, editable input line, and status line.
pub struct Scene {
    pub fonts: FontContext,
    pub face: FaceId,
    pub title: Label,
    pub input: Label,
    pub status: Label,
    zoom: f32,
    size: [u32; 2],
}

impl Scene {
    pub fn new(fonts: FontContext, face: FaceId, width: u32, height: u32) -> Result<Self, AtlasError> {
        let mut title = Label::new(&fonts, face)?;
        title.set_text_with("glyphgrid", face, TITLE_COLOR)?;

        let mut input = Label::new(&fonts, face)?;
        input.set_alignment(Align::Center, Align::Center);
        input.set_text_with("Type here", face, INPUT_COLOR)?;
        input.show_caret(true)?;

        let mut status = Label::new(&fonts, face)?;
        status.set_alignment(Align::End, Align::End);
        status.set_text_with("", face, STATUS_COLOR)?;

        let mut scene = Self {
            fonts,
            face,
            title,
            input,
            status,
            zoom: 1.0,
            size: [width.max(1), height.max(1)],
        };
        scene.layout();
        Ok(scene)
    }

    /// Place labels for the current window size and zoom.
    fn layout(&mut self) {
        let [w, h] = [self.size[0] as f32, self.size[1] as f32];
        self.title.set_position(MARGIN, h - MARGIN);
        self.title.set_scale(TITLE_SCALE);
        self.input.set_position(w / 2.0, h / 2.0);
        self.input.set_scale(INPUT_SCALE * self.zoom);
        self.status.set_position(w - MARGIN, MARGIN);
        self.status.set_scale(STATUS_SCALE);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = [width, height];
        self.layout();
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Scroll-wheel zoom of the input line.
    pub fn zoom_by(&mut self, lines: f32) {
        self.zoom = (self.zoom * 1.1f32.powf(lines)).clamp(0.1, 50.0);
        self.layout();
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Append typed text to the input line. Control characters other than
    /// newline are dropped.
    pub fn type_text(&mut self, text: &str) -> Result<(), AtlasError> {
        let text: String = text
            .chars()
            .map(|c| if c == '\r' { '\n' } else { c })
            .filter(|&c| c == '\n' || !c.is_control())
            .collect();
        if text.is_empty() {
            return Ok(());
        }
        self.input.append_text(&text)
    }

    /// Remove the last character of the input line.
    pub fn backspace(&mut self) -> Result<(), AtlasError> {
        let mut text = self.input.text().to_string();
        if text.pop().is_none() {
            return Ok(());
        }
        self.input.set_text(&text)
    }

    /// Refresh the status line from the last frame and the atlas.
    pub fn update_status(&mut self, frame: &FrameStats) -> Result<(), AtlasError> {
        let atlas = self.fonts.stats();
        let text = format!(
            "{} glyphs drawn, {} draw calls, {} cached glyphs on {} page(s)",
            frame.glyph_count, frame.draw_calls, atlas.glyphs, atlas.pages
        );
        if text != self.status.text() {
            self.status.set_text(&text)?;
        }
        Ok(())
    }

    pub fn labels(&self) -> [&Label; 3] {
        [&self.title, &self.input, &self.status]
    }
}

// ── App state ───────────────────────────────────────────────────────

/// Owns the GPU side of the demo.
pub struct AppState {
    pub gpu: GpuContext,
    pub renderer: TextRenderer,
    pub scene: Scene,
    started: Instant,
    frames: u64,
}

impl AppState {
    pub fn new(gpu: GpuContext, scene: Scene) -> Self {
        let [width, height] = scene.size();
        let mut renderer = TextRenderer::new(&gpu, width, height);
        renderer.set_clear_color(0.08, 0.08, 0.09, 1.0);
        Self {
            gpu,
            renderer,
            scene,
            started: Instant::now(),
            frames: 0,
        }
    }

    pub fn render_frame(&mut self) -> Result<FrameStats, RenderError> {
        let time = self.started.elapsed().as_secs_f64();
        let stats = self.renderer.render_to_surface(
            &self.gpu,
            &self.scene.fonts,
            &self.scene.labels(),
            time,
        )?;
        self.frames += 1;
        if self.frames % 60 == 0 {
            self.scene.update_status(&stats)?;
        }
        Ok(stats)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        self.renderer.resize(width, height);
        self.scene.resize(width, height);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glyphgrid_atlas::AtlasConfig;

    fn scene() -> Scene {
        let fonts = FontContext::with_config(AtlasConfig::default()).unwrap();
        let face = fonts.add_face(StaticOutlines::block_face("blocks"));
        Scene::new(fonts, face, 800, 600).unwrap()
    }

    #[test]
    fn test_font_arg_parse() {
        assert_eq!(FontArg::parse(None), FontArg::Default);
        assert_eq!(
            FontArg::parse(Some("Inter, sans-serif".into())),
            FontArg::Family("Inter, sans-serif".into())
        );
        let manifest = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
        assert_eq!(
            FontArg::parse(Some(manifest.into())),
            FontArg::Path(manifest.into())
        );
    }

    #[test]
    fn test_unreadable_font_falls_back() {
        let fonts = FontContext::with_config(AtlasConfig::default()).unwrap();
        let manifest = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
        let face = load_face(&fonts, &FontArg::Path(manifest.into()));
        assert_eq!(fonts.read().face_name(face).unwrap(), "builtin-blocks");
    }

    #[test]
    fn test_scene_layout() {
        let scene = scene();
        assert_eq!(scene.title.position(), [MARGIN, 600.0 - MARGIN]);
        assert_eq!(scene.input.position(), [400.0, 300.0]);
        assert_eq!(scene.status.position(), [800.0 - MARGIN, MARGIN]);
        assert!(scene.input.caret_quad().is_some());
    }

    #[test]
    fn test_resize_moves_labels() {
        let mut scene = scene();
        scene.resize(1000, 400);
        assert_eq!(scene.input.position(), [500.0, 200.0]);
        scene.resize(0, 0);
        assert_eq!(scene.size(), [1000, 400]);
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut scene = scene();
        scene.type_text("!\u{8}\r").unwrap();
        assert_eq!(scene.input.text(), "Type here!\n");
        scene.backspace().unwrap();
        scene.backspace().unwrap();
        assert_eq!(scene.input.text(), "Type here");
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut scene = scene();
        scene.zoom_by(1000.0);
        assert_eq!(scene.zoom(), 50.0);
        assert_eq!(scene.input.scale(), INPUT_SCALE * 50.0);
        scene.zoom_by(-1000.0);
        assert!((scene.zoom() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_status_text() {
        let mut scene = scene();
        let frame = FrameStats {
            glyph_count: 12,
            draw_calls: 3,
            pages_uploaded: 0,
        };
        scene.update_status(&frame).unwrap();
        assert!(scene.status.text().starts_with("12 glyphs drawn, 3 draw calls"));
    }
}
