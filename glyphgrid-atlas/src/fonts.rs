//! System font faces via `font-kit`.
//!
//! A [`FontFace`] keeps the raw font bytes and opens a `font-kit` font for
//! each query, so faces can be shared across threads. Faces are found by
//! path, by CSS-style family chain (`"Inter, Helvetica, sans-serif"`) or
//! as the system default sans-serif.
//!
//! ```text
//! "Inter, sans-serif" ──► parse_family_chain ──► [Title("Inter"), SansSerif]
//!                                                      │
//!                          SystemSource::select_best_match
//!                                                      ▼
//!                                         Handle ──► bytes ──► FontFace
//! ```

use std::path::Path;
use std::sync::Arc;

use font_kit::family_name::FamilyName;
use font_kit::font::Font;
use font_kit::handle::Handle;
use font_kit::hinting::HintingOptions;
use font_kit::outline::OutlineSink;
use font_kit::properties::Properties;
use font_kit::source::SystemSource;
use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::vector::Vector2F;

use crate::error::AtlasError;
use crate::outline::{FaceMetrics, GlyphOutline, OutlineRecorder, OutlineSource};

/// Glyph id of the missing-glyph symbol in every sfnt font.
const NOTDEF: u32 = 0;

// ── Font face ───────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    index: u32,
    name: String,
    units_per_em: f32,
    metrics: FaceMetrics,
}

impl FontFace {
    /// Parse an in-memory font file. `index` selects a face in a collection.
    pub fn from_bytes(data: Arc<Vec<u8>>, index: u32) -> Result<Self, AtlasError> {
        let font = Font::from_bytes(data.clone(), index)?;
        let raw = font.metrics();
        let units_per_em = raw.units_per_em.max(1) as f32;
        let metrics = FaceMetrics {
            ascent: raw.ascent / units_per_em,
            descent: raw.descent / units_per_em,
            line_gap: raw.line_gap / units_per_em,
        };
        let name = font.full_name();
        log::info!("Loaded face \"{name}\" ({} units/em)", raw.units_per_em);

        Ok(Self {
            data,
            index,
            name,
            units_per_em,
            metrics,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AtlasError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|err| AtlasError::FaceLoadFailure(format!("{}: {err}", path.display())))?;
        Self::from_bytes(Arc::new(data), 0)
    }

    /// Best system match for a CSS-style family chain.
    pub fn from_name(families: &str) -> Result<Self, AtlasError> {
        let chain = parse_family_chain(families);
        let handle = SystemSource::new().select_best_match(&chain, &Properties::new())?;
        Self::from_handle(handle)
    }

    /// The system's default sans-serif face.
    pub fn default_face() -> Result<Self, AtlasError> {
        Self::from_name("sans-serif")
    }

    fn from_handle(handle: Handle) -> Result<Self, AtlasError> {
        let index = match &handle {
            Handle::Path { font_index, .. } | Handle::Memory { font_index, .. } => *font_index,
        };
        let font = handle.load()?;
        let data = font.copy_font_data().ok_or_else(|| {
            AtlasError::FaceLoadFailure(format!("no font data for \"{}\"", font.full_name()))
        })?;
        Self::from_bytes(data, index)
    }

    fn font(&self) -> Result<Font, AtlasError> {
        Ok(Font::from_bytes(self.data.clone(), self.index)?)
    }

    fn glyph_outline(&self, font: &Font, glyph_id: u32) -> Result<GlyphOutline, AtlasError> {
        let scale = 1.0 / self.units_per_em;
        let mut recorder = OutlineRecorder::new(scale);
        font.outline(glyph_id, HintingOptions::None, &mut recorder)
            .map_err(|err| AtlasError::FaceLoadFailure(format!("glyph {glyph_id}: {err}")))?;
        let advance = font
            .advance(glyph_id)
            .map(|v| v.x() * scale)
            .unwrap_or(0.0);
        Ok(recorder.finish(advance))
    }
}

impl OutlineSource for FontFace {
    fn name(&self) -> &str {
        &self.name
    }

    fn metrics(&self) -> FaceMetrics {
        self.metrics
    }

    fn outline(&self, codepoint: char) -> Result<GlyphOutline, AtlasError> {
        let font = self.font()?;
        match font.glyph_for_char(codepoint) {
            Some(id) if id != NOTDEF => self.glyph_outline(&font, id),
            _ => Err(AtlasError::GlyphNotFound(codepoint)),
        }
    }

    fn fallback_outline(&self) -> Result<GlyphOutline, AtlasError> {
        let font = self.font()?;
        self.glyph_outline(&font, NOTDEF)
    }
}

impl OutlineSink for OutlineRecorder {
    fn move_to(&mut self, to: Vector2F) {
        OutlineRecorder::move_to(self, to.x(), to.y());
    }

    fn line_to(&mut self, to: Vector2F) {
        OutlineRecorder::line_to(self, to.x(), to.y());
    }

    fn quadratic_curve_to(&mut self, ctrl: Vector2F, to: Vector2F) {
        self.quad_to(ctrl.x(), ctrl.y(), to.x(), to.y());
    }

    fn cubic_curve_to(&mut self, ctrl: LineSegment2F, to: Vector2F) {
        let (c1, c2) = (ctrl.from(), ctrl.to());
        self.cubic_to((c1.x(), c1.y()), (c2.x(), c2.y()), to.x(), to.y());
    }

    fn close(&mut self) {
        OutlineRecorder::close(self);
    }
}

// ── Family chains ───────────────────────────────────────────────────

/// Parse `"Arial, 'Times New Roman', serif"` into a fallback chain.
///
/// CSS generic keywords map to `font-kit` generic families. An empty
/// chain means sans-serif.
pub fn parse_family_chain(families: &str) -> Vec<FamilyName> {
    let chain: Vec<FamilyName> = families
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\''))
        .filter(|s| !s.is_empty())
        .map(|name| parse_generic(name).unwrap_or_else(|| FamilyName::Title(name.to_string())))
        .collect();

    if chain.is_empty() {
        vec![FamilyName::SansSerif]
    } else {
        chain
    }
}

fn parse_generic(name: &str) -> Option<FamilyName> {
    match name.to_lowercase().as_str() {
        "serif" => Some(FamilyName::Serif),
        "sans-serif" => Some(FamilyName::SansSerif),
        "monospace" => Some(FamilyName::Monospace),
        "cursive" => Some(FamilyName::Cursive),
        "fantasy" => Some(FamilyName::Fantasy),
        _ => None,
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_chain() {
        let chain = parse_family_chain("Arial, Helvetica, sans-serif");
        assert_eq!(
            chain,
            vec![
                FamilyName::Title("Arial".into()),
                FamilyName::Title("Helvetica".into()),
                FamilyName::SansSerif,
            ]
        );
    }

    #[test]
    fn test_family_chain_quoted() {
        let chain = parse_family_chain("\"Times New Roman\", SERIF");
        assert_eq!(chain, vec![FamilyName::Title("Times New Roman".into()), FamilyName::Serif]);
    }

    #[test]
    fn test_family_chain_empty() {
        assert_eq!(parse_family_chain(" , "), vec![FamilyName::SansSerif]);
    }

    #[test]
    fn test_missing_path() {
        let err = FontFace::from_path("/nonexistent/face.ttf").unwrap_err();
        assert!(matches!(err, AtlasError::FaceLoadFailure(_)));
    }

    #[test]
    fn test_garbage_bytes() {
        let result = FontFace::from_bytes(Arc::new(vec![0u8; 64]), 0);
        assert!(matches!(result, Err(AtlasError::FaceLoadFailure(_))));
    }

    #[test]
    fn test_system_face_outlines() {
        // Skip on machines without fonts.
        let Ok(face) = FontFace::default_face() else {
            return;
        };
        let metrics = face.metrics();
        assert!(metrics.ascent > 0.0 && metrics.descent <= 0.0);

        let outline = face.outline('O').unwrap();
        assert!(!outline.is_empty());
        assert!(outline.advance > 0.0);

        let space = face.outline(' ').unwrap();
        assert!(space.is_empty() && space.advance > 0.0);

        assert_eq!(
            face.outline('\u{10fffd}').unwrap_err(),
            AtlasError::GlyphNotFound('\u{10fffd}')
        );
    }
}
