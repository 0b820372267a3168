//! Outline extraction interface.
//!
//! An [`OutlineSource`] turns a codepoint into a [`GlyphOutline`]: closed
//! contours of tagged points in em units (y up). The production source is
//! [`FontFace`](crate::fonts::FontFace); [`StaticOutlines`] serves
//! hand-built outlines for tests, benches and headless demos.

use std::collections::HashMap;

use crate::error::AtlasError;
use crate::geometry::Point;

// ── Outline data ────────────────────────────────────────────────────

/// How a point participates in its contour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointTag {
    /// On the outline.
    OnCurve,
    /// Control point of a quadratic (conic) segment.
    Conic,
    /// One of the two control points of a cubic segment.
    Cubic,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutlinePoint {
    pub position: Point,
    pub tag: PointTag,
}

impl OutlinePoint {
    pub fn on(x: f32, y: f32) -> Self {
        Self { position: Point::new(x, y), tag: PointTag::OnCurve }
    }

    pub fn conic(x: f32, y: f32) -> Self {
        Self { position: Point::new(x, y), tag: PointTag::Conic }
    }

    pub fn cubic(x: f32, y: f32) -> Self {
        Self { position: Point::new(x, y), tag: PointTag::Cubic }
    }
}

/// A closed contour. The segment from the last point back to the first is
/// implied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour {
    pub points: Vec<OutlinePoint>,
}

/// A glyph's vector outline plus its advance, all in em units.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphOutline {
    pub contours: Vec<Contour>,
    pub advance: f32,
}

impl GlyphOutline {
    /// An outline with no contours (whitespace).
    pub fn empty(advance: f32) -> Self {
        Self { contours: Vec::new(), advance }
    }

    /// Build an outline from straight-edged polygons.
    pub fn from_polygons(polygons: &[&[(f32, f32)]], advance: f32) -> Self {
        let contours = polygons
            .iter()
            .map(|poly| Contour {
                points: poly.iter().map(|&(x, y)| OutlinePoint::on(x, y)).collect(),
            })
            .collect();
        Self { contours, advance }
    }

    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(|c| c.points.is_empty())
    }
}

/// Vertical metrics of a face, in em units. `descent` is negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

impl FaceMetrics {
    pub fn line_height(&self) -> f32 {
        self.ascent - self.descent + self.line_gap
    }
}

impl Default for FaceMetrics {
    fn default() -> Self {
        Self { ascent: 0.8, descent: -0.2, line_gap: 0.0 }
    }
}

// ── Source trait ────────────────────────────────────────────────────

/// Provider of glyph outlines and metrics for one face.
pub trait OutlineSource: Send + Sync {
    /// Human-readable face name, for logs.
    fn name(&self) -> &str;

    fn metrics(&self) -> FaceMetrics;

    /// Outline of `codepoint`, or [`AtlasError::GlyphNotFound`].
    fn outline(&self, codepoint: char) -> Result<GlyphOutline, AtlasError>;

    /// The face's designated missing-glyph symbol.
    fn fallback_outline(&self) -> Result<GlyphOutline, AtlasError>;
}

// ── Recorder ────────────────────────────────────────────────────────

/// Collects path commands into tagged contours, scaling every coordinate.
///
/// An unclosed contour is closed by the next `move_to` or by `finish`.
#[derive(Debug)]
pub struct OutlineRecorder {
    scale: f32,
    contours: Vec<Contour>,
    current: Vec<OutlinePoint>,
}

impl OutlineRecorder {
    /// `scale` converts source units to em (usually `1 / units_per_em`).
    pub fn new(scale: f32) -> Self {
        Self { scale, contours: Vec::new(), current: Vec::new() }
    }

    fn push(&mut self, x: f32, y: f32, tag: PointTag) {
        self.current.push(OutlinePoint {
            position: Point::new(x * self.scale, y * self.scale),
            tag,
        });
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.close();
        self.push(x, y, PointTag::OnCurve);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.push(x, y, PointTag::OnCurve);
    }

    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.push(cx, cy, PointTag::Conic);
        self.push(x, y, PointTag::OnCurve);
    }

    pub fn cubic_to(&mut self, c1: (f32, f32), c2: (f32, f32), x: f32, y: f32) {
        self.push(c1.0, c1.1, PointTag::Cubic);
        self.push(c2.0, c2.1, PointTag::Cubic);
        self.push(x, y, PointTag::OnCurve);
    }

    pub fn close(&mut self) {
        // The explicit closing point duplicates the start; the implied
        // closing segment already covers it.
        if self.current.len() > 1 {
            let first = self.current[0];
            if let Some(last) = self.current.last() {
                if last.tag == PointTag::OnCurve && last.position == first.position {
                    self.current.pop();
                }
            }
        }
        if !self.current.is_empty() {
            self.contours.push(Contour { points: std::mem::take(&mut self.current) });
        }
    }

    pub fn finish(mut self, advance: f32) -> GlyphOutline {
        self.close();
        GlyphOutline { contours: self.contours, advance }
    }
}

// ── In-memory source ────────────────────────────────────────────────

/// An [`OutlineSource`] backed by a table of prepared outlines.
#[derive(Clone, Debug)]
pub struct StaticOutlines {
    name: String,
    metrics: FaceMetrics,
    glyphs: HashMap<char, GlyphOutline>,
    fallback: Option<GlyphOutline>,
}

impl StaticOutlines {
    pub fn new(name: impl Into<String>, metrics: FaceMetrics) -> Self {
        Self {
            name: name.into(),
            metrics,
            glyphs: HashMap::new(),
            fallback: None,
        }
    }

    pub fn with_glyph(mut self, codepoint: char, outline: GlyphOutline) -> Self {
        self.glyphs.insert(codepoint, outline);
        self
    }

    pub fn with_fallback(mut self, outline: GlyphOutline) -> Self {
        self.fallback = Some(outline);
        self
    }

    /// A block face covering printable ASCII.
    ///
    /// Space is blank. Every other glyph is an outer square with a square
    /// hole whose size depends on the codepoint, so glyphs differ. The
    /// fallback is a solid box.
    pub fn block_face(name: impl Into<String>) -> Self {
        let mut face = Self::new(name, FaceMetrics::default())
            .with_glyph(' ', GlyphOutline::empty(0.3))
            .with_fallback(GlyphOutline::from_polygons(
                &[&[(0.05, 0.0), (0.55, 0.0), (0.55, 0.7), (0.05, 0.7)]],
                0.6,
            ));

        for code in 0x21u8..=0x7e {
            let inset = 0.1 + f32::from(code % 8) * 0.02;
            let outer: [(f32, f32); 4] = [(0.05, 0.0), (0.55, 0.0), (0.55, 0.7), (0.05, 0.7)];
            // Hole winds opposite to the outer square.
            let hole: [(f32, f32); 4] = [
                (0.05 + inset, inset),
                (0.05 + inset, 0.7 - inset),
                (0.55 - inset, 0.7 - inset),
                (0.55 - inset, inset),
            ];
            face.glyphs.insert(
                char::from(code),
                GlyphOutline::from_polygons(&[&outer, &hole], 0.6),
            );
        }
        face
    }
}

impl OutlineSource for StaticOutlines {
    fn name(&self) -> &str {
        &self.name
    }

    fn metrics(&self) -> FaceMetrics {
        self.metrics
    }

    fn outline(&self, codepoint: char) -> Result<GlyphOutline, AtlasError> {
        self.glyphs
            .get(&codepoint)
            .cloned()
            .ok_or(AtlasError::GlyphNotFound(codepoint))
    }

    fn fallback_outline(&self) -> Result<GlyphOutline, AtlasError> {
        self.fallback.clone().ok_or(AtlasError::GlyphNotFound('\0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_scales_and_tags() {
        let mut rec = OutlineRecorder::new(0.5);
        rec.move_to(0.0, 0.0);
        rec.line_to(2.0, 0.0);
        rec.quad_to(2.0, 2.0, 0.0, 2.0);
        rec.close();
        let outline = rec.finish(1.0);

        assert_eq!(outline.contours.len(), 1);
        let pts = &outline.contours[0].points;
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[1].position, Point::new(1.0, 0.0));
        assert_eq!(pts[2].tag, PointTag::Conic);
        assert_eq!(pts[3].tag, PointTag::OnCurve);
    }

    #[test]
    fn test_recorder_drops_duplicate_closing_point() {
        let mut rec = OutlineRecorder::new(1.0);
        rec.move_to(0.0, 0.0);
        rec.line_to(1.0, 0.0);
        rec.line_to(1.0, 1.0);
        rec.line_to(0.0, 0.0);
        rec.close();
        let outline = rec.finish(1.0);
        assert_eq!(outline.contours[0].points.len(), 3);
    }

    #[test]
    fn test_recorder_move_to_closes_previous() {
        let mut rec = OutlineRecorder::new(1.0);
        rec.move_to(0.0, 0.0);
        rec.line_to(1.0, 0.0);
        rec.line_to(1.0, 1.0);
        rec.move_to(5.0, 5.0);
        rec.line_to(6.0, 5.0);
        rec.line_to(6.0, 6.0);
        let outline = rec.finish(1.0);
        assert_eq!(outline.contours.len(), 2);
    }

    #[test]
    fn test_static_source_missing_glyph() {
        let face = StaticOutlines::new("empty", FaceMetrics::default());
        assert_eq!(face.outline('x'), Err(AtlasError::GlyphNotFound('x')));
        assert!(face.fallback_outline().is_err());
    }

    #[test]
    fn test_block_face_covers_printable_ascii() {
        let face = StaticOutlines::block_face("blocks");
        for cp in ' '..='~' {
            assert!(face.outline(cp).is_ok(), "missing {cp:?}");
        }
        assert!(face.outline(' ').map(|o| o.is_empty()).unwrap_or(false));
        assert!(face.fallback_outline().is_ok());
        assert!(face.outline('\u{4e2d}').is_err());
    }

    #[test]
    fn test_line_height() {
        let m = FaceMetrics { ascent: 0.9, descent: -0.25, line_gap: 0.1 };
        assert!((m.line_height() - 1.25).abs() < 1e-6);
    }
}
