//! Glyph records and the per-face cache.

use rustc_hash::FxHashMap;

use crate::atlas::AtlasLocation;
use crate::manager::FaceId;

/// Everything a label needs to draw one glyph, in em units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glyph {
    /// Atlas placement; `None` for glyphs with no outline.
    pub location: Option<AtlasLocation>,
    pub advance: f32,
    /// Bottom-left of the glyph box relative to the pen.
    pub offset: [f32; 2],
    /// Width and height of the glyph box.
    pub size: [f32; 2],
    pub curve_count: u16,
    /// Stands in for a codepoint the face does not map.
    pub fallback: bool,
}

impl Glyph {
    /// A glyph that only advances the pen.
    pub fn blank(advance: f32) -> Self {
        Self {
            location: None,
            advance,
            offset: [0.0, 0.0],
            size: [0.0, 0.0],
            curve_count: 0,
            fallback: false,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.location.is_none()
    }
}

/// face → codepoint → glyph, plus one fallback glyph per face.
///
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct GlyphCache {
    faces: FxHashMap<FaceId, FxHashMap<char, Glyph>>,
    fallbacks: FxHashMap<FaceId, Glyph>,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, face: FaceId, codepoint: char) -> Option<Glyph> {
        self.faces.get(&face)?.get(&codepoint).copied()
    }

    pub fn insert(&mut self, face: FaceId, codepoint: char, glyph: Glyph) {
        self.faces.entry(face).or_default().insert(codepoint, glyph);
    }

    pub fn fallback(&self, face: FaceId) -> Option<Glyph> {
        self.fallbacks.get(&face).copied()
    }

    pub fn set_fallback(&mut self, face: FaceId, glyph: Glyph) {
        self.fallbacks.insert(face, glyph);
    }

    /// Cached codepoints for `face`.
    pub fn face_len(&self, face: FaceId) -> usize {
        self.faces.get(&face).map_or(0, |glyphs| glyphs.len())
    }

    /// Cached entries across all faces.
    pub fn len(&self) -> usize {
        self.faces.values().map(|glyphs| glyphs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
