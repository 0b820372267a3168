//! Labels: strings assembled into glyph quads.
//!
//! A label lays its glyphs out along a pen in em units (y up), one quad
//! per visible glyph, then shifts the whole run to honor its alignment.
//! Position and scale are not baked into the vertices; the renderer passes
//! them to the shader through the per-label uniform, so moving or zooming
//! a label never rebuilds it.
//!
//! ```text
//!   ascent ┌────────────────────┐ ◄─ top      (vertical Start)
//!          │  H e l l o         │
//! baseline ┼────────────────────┤
//!          │  w o r l d         │
//!          └────────────────────┘ ◄─ bottom   (vertical End)
//!          ▲                    ▲
//!        Start                 End            (horizontal)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use glyphgrid_atlas::{AtlasError, FaceId, FaceMetrics, FontContext, Glyph};

use crate::vertex::{quad_indices, Color, GlyphVertex};

/// Codepoint drawn as the caret.
pub const CARET: char = '|';

static NEXT_LABEL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique label handle, used to key GPU-side buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(u64);

impl LabelId {
    fn next() -> Self {
        Self(NEXT_LABEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Alignment along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Align {
    /// Left, or top.
    #[default]
    Start,
    Center,
    /// Right, or bottom.
    End,
}

/// A run of text ready for upload.
#[derive(Debug)]
pub struct Label {
    id: LabelId,
    context: FontContext,
    face: FaceId,
    metrics: FaceMetrics,
    color: Color,
    text: String,

    /// Four vertices per quad, alignment shift applied.
    vertices: Vec<GlyphVertex>,
    /// Atlas page of each quad.
    quad_pages: Vec<u16>,
    caret_quad: Option<([GlyphVertex; 4], u16)>,

    /// Unshifted pen, em.
    pen: [f32; 2],
    /// Widest line so far, em.
    width: f32,
    /// Shift currently applied to `vertices`.
    shift: [f32; 2],

    align: [Align; 2],
    position: [f32; 2],
    scale: f32,
    caret: bool,
    revision: u64,
}

impl Label {
    pub fn new(context: &FontContext, face: FaceId) -> Result<Self, AtlasError> {
        let metrics = context.metrics(face)?;
        Ok(Self {
            id: LabelId::next(),
            context: context.clone(),
            face,
            metrics,
            color: Color::WHITE,
            text: String::new(),
            vertices: Vec::new(),
            quad_pages: Vec::new(),
            caret_quad: None,
            pen: [0.0, 0.0],
            width: 0.0,
            shift: [0.0, 0.0],
            align: [Align::Start, Align::Start],
            position: [0.0, 0.0],
            scale: 1.0,
            caret: false,
            revision: 0,
        })
    }

    // ── Text ────────────────────────────────────────────────────────

    /// Replace the text, keeping the current face and color.
    ///
    /// Every glyph is resolved before the label changes, so on error the
    /// label keeps its previous text, face and color.
    pub fn set_text(&mut self, text: &str) -> Result<(), AtlasError> {
        self.write_text(text, self.face, self.color, true)
    }

    pub fn set_text_with(&mut self, text: &str, face: FaceId, color: Color) -> Result<(), AtlasError> {
        self.write_text(text, face, color, true)
    }

    /// Replace the text, resolving `families` (CSS-style chain) to a face.
    pub fn set_text_by_name(&mut self, text: &str, families: &str, color: Color) -> Result<(), AtlasError> {
        let face = self.context.font_from_name(families)?;
        self.set_text_with(text, face, color)
    }

    /// Append to the text. Placed glyphs are kept; only the alignment
    /// shift is recomputed. Fails without touching the label.
    pub fn append_text(&mut self, text: &str) -> Result<(), AtlasError> {
        self.write_text(text, self.face, self.color, false)
    }

    pub fn append_text_with(&mut self, text: &str, face: FaceId, color: Color) -> Result<(), AtlasError> {
        self.write_text(text, face, color, false)
    }

    pub fn append_text_by_name(&mut self, text: &str, families: &str, color: Color) -> Result<(), AtlasError> {
        let face = self.context.font_from_name(families)?;
        self.append_text_with(text, face, color)
    }

    fn write_text(&mut self, text: &str, face: FaceId, color: Color, replace: bool) -> Result<(), AtlasError> {
        // ── Resolve ─────────────────────────────────────────────────
        let metrics = if face == self.face {
            self.metrics
        } else {
            self.context.metrics(face)?
        };
        let glyphs = text
            .chars()
            .map(|ch| match ch {
                '\n' => Ok(None),
                _ => self.context.glyph(face, ch).map(Some),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let caret = self.caret_glyph(face, self.caret)?;

        // ── Commit ──────────────────────────────────────────────────
        self.face = face;
        self.metrics = metrics;
        self.color = color;
        if replace {
            self.clear_glyphs();
        }
        for glyph in &glyphs {
            self.push_glyph(glyph.as_ref());
        }
        self.text.push_str(text);
        self.caret_quad = caret.and_then(|glyph| self.glyph_quad(&glyph));
        self.realign();
        Ok(())
    }

    fn clear_glyphs(&mut self) {
        self.text.clear();
        self.vertices.clear();
        self.quad_pages.clear();
        self.pen = [0.0, 0.0];
        self.width = 0.0;
        self.shift = [0.0, 0.0];
    }

    /// Emit `glyph` at the pen and advance; `None` is a line break.
    fn push_glyph(&mut self, glyph: Option<&Glyph>) {
        let Some(glyph) = glyph else {
            self.pen = [0.0, self.pen[1] - self.metrics.line_height()];
            return;
        };
        if let Some((quad, page)) = self.glyph_quad(glyph) {
            self.vertices.extend_from_slice(&quad);
            self.quad_pages.push(page);
        }
        self.pen[0] += glyph.advance;
        self.width = self.width.max(self.pen[0]);
    }

    /// Quad for `glyph` at the pen, with the current shift applied.
    fn glyph_quad(&self, glyph: &Glyph) -> Option<([GlyphVertex; 4], u16)> {
        let location = glyph.location?;
        let x0 = self.pen[0] + glyph.offset[0] + self.shift[0];
        let y0 = self.pen[1] + glyph.offset[1] + self.shift[1];
        let (x1, y1) = (x0 + glyph.size[0], y0 + glyph.size[1]);
        let origin = location.bezier_origin;
        let color = self.color;
        Some((
            [
                GlyphVertex::new([x0, y0], origin, [0, 0], color),
                GlyphVertex::new([x1, y0], origin, [1, 0], color),
                GlyphVertex::new([x0, y1], origin, [0, 1], color),
                GlyphVertex::new([x1, y1], origin, [1, 1], color),
            ],
            location.page,
        ))
    }

    // ── Layout ──────────────────────────────────────────────────────

    /// Shift that places the text's extent box according to the alignment.
    fn alignment_shift(&self) -> [f32; 2] {
        let top = self.metrics.ascent;
        let bottom = self.pen[1] + self.metrics.descent;
        let x = match self.align[0] {
            Align::Start => 0.0,
            Align::Center => -self.width * 0.5,
            Align::End => -self.width,
        };
        let y = match self.align[1] {
            Align::Start => -top,
            Align::Center => -(top + bottom) * 0.5,
            Align::End => -bottom,
        };
        [x, y]
    }

    fn realign(&mut self) {
        let shift = self.alignment_shift();
        let delta = [shift[0] - self.shift[0], shift[1] - self.shift[1]];
        if delta != [0.0, 0.0] {
            let quads = self.caret_quad.iter_mut().flat_map(|(q, _)| q.iter_mut());
            for v in self.vertices.iter_mut().chain(quads) {
                v.position[0] += delta[0];
                v.position[1] += delta[1];
            }
            self.shift = shift;
        }
        self.revision += 1;
    }

    pub fn set_alignment(&mut self, horizontal: Align, vertical: Align) {
        self.align = [horizontal, vertical];
        self.realign();
    }

    pub fn alignment(&self) -> (Align, Align) {
        (self.align[0], self.align[1])
    }

    /// Bottom-left of the label's origin, in pixels.
    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = [x, y];
    }

    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    /// Pixels per em.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        let quads = self.caret_quad.iter_mut().flat_map(|(q, _)| q.iter_mut());
        for v in self.vertices.iter_mut().chain(quads) {
            v.color = color;
        }
        self.revision += 1;
    }

    // ── Caret ───────────────────────────────────────────────────────

    pub fn show_caret(&mut self, show: bool) -> Result<(), AtlasError> {
        let caret = self.caret_glyph(self.face, show)?;
        self.caret = show;
        self.caret_quad = caret.and_then(|glyph| self.glyph_quad(&glyph));
        self.revision += 1;
        Ok(())
    }

    fn caret_glyph(&self, face: FaceId, show: bool) -> Result<Option<Glyph>, AtlasError> {
        show.then(|| self.context.glyph(face, CARET)).transpose()
    }

    /// Caret blinks at 1 Hz; `time` is monotonic seconds.
    pub fn caret_visible(&self, time: f64) -> bool {
        self.caret_quad.is_some() && (time * 2.0).floor() as i64 % 2 == 0
    }

    /// Caret quad and its page, when the caret is shown.
    pub fn caret_quad(&self) -> Option<&([GlyphVertex; 4], u16)> {
        self.caret_quad.as_ref()
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn id(&self) -> LabelId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn face(&self) -> FaceId {
        self.face
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn context(&self) -> &FontContext {
        &self.context
    }

    /// Glyph quads, excluding the caret.
    pub fn vertices(&self) -> &[GlyphVertex] {
        &self.vertices
    }

    pub fn quad_pages(&self) -> &[u16] {
        &self.quad_pages
    }

    pub fn glyph_count(&self) -> usize {
        self.quad_pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quad_pages.is_empty()
    }

    /// Bumped on every change that needs a re-upload.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Width and height of the text block in em.
    pub fn extent(&self) -> [f32; 2] {
        let bottom = self.pen[1] + self.metrics.descent;
        [self.width, self.metrics.ascent - bottom]
    }

    /// Quad indices grouped by page: `(page, quad indices)` in ascending
    /// page order.
    pub fn quads_by_page(&self) -> Vec<(u16, Vec<u32>)> {
        let mut groups: Vec<(u16, Vec<u32>)> = Vec::new();
        let mut pages = self.quad_pages.clone();
        pages.sort_unstable();
        pages.dedup();
        for page in pages {
            let quads = self
                .quad_pages
                .iter()
                .enumerate()
                .filter(|&(_, &p)| p == page)
                .map(|(i, _)| i as u32)
                .collect();
            groups.push((page, quads));
        }
        groups
    }

    /// Index buffer for `quads`, which refer to this label's vertices.
    pub fn indices_for(quads: &[u32]) -> Vec<u32> {
        quads.iter().flat_map(|&q| quad_indices(q)).collect()
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glyphgrid_atlas::outline::StaticOutlines;
    use glyphgrid_atlas::{AtlasConfig, FaceMetrics, GlyphOutline};

    fn setup() -> (FontContext, FaceId) {
        let context = FontContext::with_config(AtlasConfig::default()).unwrap();
        let face = context.add_face(StaticOutlines::block_face("blocks"));
        (context, face)
    }

    #[test]
    fn test_empty_label() {
        let (context, face) = setup();
        let mut label = Label::new(&context, face).unwrap();
        label.set_text("").unwrap();
        assert!(label.vertices().is_empty());
        assert_eq!(label.glyph_count(), 0);
        assert!(label.quads_by_page().is_empty());
    }

    #[test]
    fn test_one_quad_per_visible_glyph() {
        let (context, face) = setup();
        let mut label = Label::new(&context, face).unwrap();
        label.set_text("A B").unwrap();
        assert_eq!(label.glyph_count(), 2, "space emits no quad");
        assert_eq!(label.vertices().len(), 8);
        assert!((label.extent()[0] - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_append_matches_set() {
        let (context, face) = setup();
        let mut appended = Label::new(&context, face).unwrap();
        appended.set_text("AB").unwrap();
        appended.append_text("C").unwrap();

        let mut whole = Label::new(&context, face).unwrap();
        whole.set_text("ABC").unwrap();

        assert_eq!(appended.glyph_count(), whole.glyph_count());
        assert_eq!(appended.text(), "ABC");
        for (a, b) in appended.vertices().iter().zip(whole.vertices()) {
            assert!((a.position[0] - b.position[0]).abs() < 1e-5);
            assert!((a.position[1] - b.position[1]).abs() < 1e-5);
            assert_eq!(a.data, b.data);
        }
    }

    #[test]
    fn test_append_reshifts_centered_text() {
        let (context, face) = setup();
        let mut label = Label::new(&context, face).unwrap();
        label.set_alignment(Align::Center, Align::Start);
        label.set_text("AB").unwrap();
        let before = label.vertices()[0].position[0];
        label.append_text("CD").unwrap();
        let after = label.vertices()[0].position[0];
        // Two more 0.6 em advances move the first glyph left by 0.6 em.
        assert!((before - after - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_alignment_shift() {
        let (context, face) = setup();
        let mut label = Label::new(&context, face).unwrap();
        label.set_text("AA").unwrap();

        // Start/Start: top of the line at y = 0.
        let first = label.vertices()[0];
        assert!((first.position[0] - 0.05).abs() < 1e-5);
        assert!((first.position[1] + 0.8).abs() < 1e-5);

        label.set_alignment(Align::End, Align::End);
        let first = label.vertices()[0];
        assert!((first.position[0] - (0.05 - 1.2)).abs() < 1e-5);
        // Bottom of the block (descent) at y = 0.
        assert!((first.position[1] - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_newline_moves_pen_down() {
        let (context, face) = setup();
        let mut label = Label::new(&context, face).unwrap();
        label.set_text("A\nA").unwrap();
        let (a, b) = (label.vertices()[0], label.vertices()[4]);
        assert!((a.position[0] - b.position[0]).abs() < 1e-5);
        assert!((a.position[1] - b.position[1] - 1.0).abs() < 1e-5, "line height 1 em");
        assert!((label.extent()[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_missing_codepoint_renders_fallback() {
        let (context, face) = setup();
        let mut label = Label::new(&context, face).unwrap();
        label.set_text("\u{4e2d}").unwrap();
        assert_eq!(label.glyph_count(), 1);
        let glyph = context.glyph(face, '\u{4e2d}').unwrap();
        assert!(glyph.fallback);
    }

    #[test]
    fn test_caret_blink() {
        let (context, face) = setup();
        let mut label = Label::new(&context, face).unwrap();
        label.set_text("AB").unwrap();
        assert!(!label.caret_visible(0.0));

        label.show_caret(true).unwrap();
        let (quad, _) = label.caret_quad().unwrap();
        assert!((quad[0].position[0] - (1.2 + 0.05)).abs() < 1e-5, "caret at the pen");
        assert!(label.caret_visible(0.1));
        assert!(!label.caret_visible(0.6));
        assert!(label.caret_visible(1.2));
    }

    #[test]
    fn test_revision_bumps() {
        let (context, face) = setup();
        let mut label = Label::new(&context, face).unwrap();
        let r0 = label.revision();
        label.set_text("x").unwrap();
        assert!(label.revision() > r0);
        let r1 = label.revision();
        label.set_color(Color::BLACK);
        assert!(label.revision() > r1);
        assert!(label.vertices().iter().all(|v| v.color == Color::BLACK));
    }

    #[test]
    fn test_quads_grouped_by_page() {
        let (context, face) = setup();
        let mut label = Label::new(&context, face).unwrap();
        label.set_text("abc").unwrap();
        let groups = label.quads_by_page();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1, vec![0, 1, 2]);
        assert_eq!(Label::indices_for(&groups[0].1).len(), 18);
    }

    #[test]
    fn test_label_ids_unique() {
        let (context, face) = setup();
        let a = Label::new(&context, face).unwrap();
        let b = Label::new(&context, face).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_unknown_face() {
        let (context, _) = setup();
        assert!(Label::new(&context, FaceId(42)).is_err());
    }

    /// Face with a triangle 'A' and a 40-gon 'X' (122 texels before
    /// index lists).
    fn tri_and_polygon(name: &str) -> StaticOutlines {
        let polygon: Vec<(f32, f32)> = (0..40)
            .map(|i| {
                let a = i as f32 / 40.0 * std::f32::consts::TAU;
                (0.3 + 0.25 * a.cos(), 0.35 + 0.25 * a.sin())
            })
            .collect();
        let triangle: [(f32, f32); 3] = [(0.0, 0.0), (0.5, 0.0), (0.25, 0.7)];
        StaticOutlines::new(name, FaceMetrics::default())
            .with_glyph('A', GlyphOutline::from_polygons(&[triangle.as_slice()], 0.6))
            .with_glyph('X', GlyphOutline::from_polygons(&[polygon.as_slice()], 0.6))
    }

    /// Bezier rows hold 64 texels: 'A' fits, 'X' never does.
    fn cramped() -> FontContext {
        let config = AtlasConfig {
            bezier_atlas_size: [64, 4],
            grid_atlas_size: [16, 4],
            grid_size: 4,
            ..Default::default()
        };
        FontContext::with_config(config).unwrap()
    }

    #[test]
    fn test_failed_append_leaves_label_unchanged() {
        let context = cramped();
        let face = context.add_face(tri_and_polygon("cramped"));
        let mut label = Label::new(&context, face).unwrap();
        label.set_alignment(Align::Center, Align::Center);
        label.set_text("A").unwrap();
        let vertices = label.vertices().to_vec();
        let extent = label.extent();
        let revision = label.revision();

        let err = label.append_text("AX").unwrap_err();
        assert!(matches!(err, AtlasError::AtlasCapacityExceeded { .. }));
        assert_eq!(label.text(), "A");
        assert_eq!(label.vertices(), vertices.as_slice());
        assert_eq!(label.quad_pages(), &[0]);
        assert_eq!(label.extent(), extent);
        assert_eq!(label.revision(), revision);

        // The pen did not move: a later append lines up with a fresh label.
        label.append_text("A").unwrap();
        let mut whole = Label::new(&context, face).unwrap();
        whole.set_alignment(Align::Center, Align::Center);
        whole.set_text("AA").unwrap();
        assert_eq!(label.glyph_count(), 2);
        for (a, b) in label.vertices().iter().zip(whole.vertices()) {
            assert!((a.position[0] - b.position[0]).abs() < 1e-5);
            assert!((a.position[1] - b.position[1]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_failed_set_text_keeps_old_text_face_and_color() {
        let context = cramped();
        let first = context.add_face(tri_and_polygon("first"));
        let second = context.add_face(tri_and_polygon("second"));
        let mut label = Label::new(&context, first).unwrap();
        label.set_text("AA").unwrap();
        let vertices = label.vertices().to_vec();

        assert!(label.set_text_with("AX", second, Color::BLACK).is_err());
        assert_eq!(label.text(), "AA");
        assert_eq!(label.face(), first);
        assert_eq!(label.color(), Color::WHITE);
        assert_eq!(label.vertices(), vertices.as_slice());

        assert!(label.append_text_with("X", second, Color::BLACK).is_err());
        assert_eq!(label.face(), first);
        assert_eq!(label.text(), "AA");
    }
}
