//! Font manager: faces, glyph pipeline and atlas, behind a shared context.
//!
//! ```text
//! get_or_load(face, 'A')
//!   cache hit ─────────────────────────────────────────────► Glyph
//!   miss: OutlineSource ─► Tessellator ─► GridBuilder ─► EncodedGlyph
//!                                                             │
//!                                   AtlasAllocator::place ◄───┘
//!                                             │
//!                                   GlyphCache::insert ──────► Glyph
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use crate::atlas::{AtlasAllocator, AtlasPage, AtlasStats};
use crate::cache::{Glyph, GlyphCache};
use crate::config::AtlasConfig;
use crate::encode::EncodedGlyph;
use crate::error::AtlasError;
use crate::fonts::FontFace;
use crate::grid::GridBuilder;
use crate::outline::{FaceMetrics, GlyphOutline, OutlineSource};
use crate::tessellate::Tessellator;

/// Printable ASCII, U+0020 through U+007E.
pub const ASCII_RANGE: std::ops::RangeInclusive<char> = ' '..='~';

/// Handle of a face registered with a [`FontManager`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u32);

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "face#{}", self.0)
    }
}

struct FaceEntry {
    source: Box<dyn OutlineSource>,
    metrics: FaceMetrics,
}

/// Owns every face, the glyph cache and all atlas pages.
pub struct FontManager {
    tessellator: Tessellator,
    grid_builder: GridBuilder,
    allocator: AtlasAllocator,
    cache: GlyphCache,
    faces: Vec<FaceEntry>,
    /// Lowercased face name → id.
    names: HashMap<String, FaceId>,
}

impl FontManager {
    pub fn new(config: AtlasConfig) -> Result<Self, AtlasError> {
        config.validate()?;
        log::info!(
            "FontManager: bezier pages {:?}, grid pages {:?}, {}x{} grid",
            config.bezier_atlas_size,
            config.grid_atlas_size,
            config.grid_size,
            config.grid_size,
        );
        Ok(Self {
            tessellator: Tessellator::new(config.cubic_tolerance),
            grid_builder: GridBuilder::new(config.grid_size, config.cell_margin),
            allocator: AtlasAllocator::new(config),
            cache: GlyphCache::new(),
            faces: Vec::new(),
            names: HashMap::new(),
        })
    }

    // ── Faces ───────────────────────────────────────────────────────

    /// Register a face under a fresh id, even if another face has the same
    /// name. [`face_id`](Self::face_id) keeps resolving a name to the first
    /// face registered under it.
    pub fn add_face(&mut self, source: impl OutlineSource + 'static) -> FaceId {
        let id = FaceId(self.faces.len() as u32);
        log::info!("Registered {id}: \"{}\"", source.name());
        self.names.entry(source.name().to_lowercase()).or_insert(id);
        self.faces.push(FaceEntry {
            metrics: source.metrics(),
            source: Box::new(source),
        });
        id
    }

    pub fn font_from_path(&mut self, path: impl AsRef<Path>) -> Result<FaceId, AtlasError> {
        Ok(self.add_face(FontFace::from_path(path)?))
    }

    /// Resolve a CSS-style family chain to a system face.
    pub fn font_from_name(&mut self, families: &str) -> Result<FaceId, AtlasError> {
        if let Some(id) = self.face_id(families) {
            return Ok(id);
        }
        let id = self.add_face(FontFace::from_name(families)?);
        self.names.insert(families.to_lowercase(), id);
        Ok(id)
    }

    pub fn default_font(&mut self) -> Result<FaceId, AtlasError> {
        self.font_from_name("sans-serif")
    }

    /// Face registered under `name`, or under a family chain that resolved
    /// to it.
    pub fn face_id(&self, name: &str) -> Option<FaceId> {
        self.names.get(&name.to_lowercase()).copied()
    }

    fn face(&self, id: FaceId) -> Result<&FaceEntry, AtlasError> {
        self.faces.get(id.0 as usize).ok_or(AtlasError::UnknownFace(id))
    }

    pub fn face_name(&self, id: FaceId) -> Result<&str, AtlasError> {
        Ok(self.face(id)?.source.name())
    }

    pub fn metrics(&self, id: FaceId) -> Result<FaceMetrics, AtlasError> {
        Ok(self.face(id)?.metrics)
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    // ── Glyphs ──────────────────────────────────────────────────────

    /// Cached glyph, without loading.
    pub fn glyph(&self, face: FaceId, codepoint: char) -> Option<Glyph> {
        self.cache.get(face, codepoint)
    }

    /// Cached glyph, or extract, encode and place it.
    ///
    /// A codepoint the face does not map resolves to the face's fallback
    /// glyph, which is then cached under that codepoint too.
    pub fn get_or_load(&mut self, face: FaceId, codepoint: char) -> Result<Glyph, AtlasError> {
        if let Some(glyph) = self.cache.get(face, codepoint) {
            return Ok(glyph);
        }

        let outline = self.face(face)?.source.outline(codepoint);
        let glyph = match outline {
            Ok(outline) => self.build_glyph(&outline, false)?,
            Err(AtlasError::GlyphNotFound(_)) => {
                log::warn!("{face} has no glyph for {codepoint:?}, using fallback");
                self.fallback_glyph(face)?
            }
            Err(err) => return Err(err),
        };
        self.cache.insert(face, codepoint, glyph);
        Ok(glyph)
    }

    /// The face's missing-glyph symbol, loaded once.
    ///
    /// A face without one yields a blank zero-advance glyph.
    pub fn fallback_glyph(&mut self, face: FaceId) -> Result<Glyph, AtlasError> {
        if let Some(glyph) = self.cache.fallback(face) {
            return Ok(glyph);
        }

        let outline = self.face(face)?.source.fallback_outline();
        let glyph = match outline {
            Ok(outline) => self.build_glyph(&outline, true)?,
            Err(AtlasError::GlyphNotFound(_)) => {
                log::warn!("{face} has no fallback glyph, rendering blank");
                Glyph {
                    fallback: true,
                    ..Glyph::blank(0.0)
                }
            }
            Err(err) => return Err(err),
        };
        self.cache.set_fallback(face, glyph);
        Ok(glyph)
    }

    fn build_glyph(&mut self, outline: &GlyphOutline, fallback: bool) -> Result<Glyph, AtlasError> {
        let tessellated = self.tessellator.tessellate(outline);
        if tessellated.is_empty() {
            return Ok(Glyph {
                fallback,
                ..Glyph::blank(outline.advance)
            });
        }

        let grid = self.grid_builder.build(&tessellated.curves);
        let mut encoded = EncodedGlyph::new(&tessellated.curves, &grid)?;
        let location = self.allocator.place(&mut encoded)?;
        log::debug!(
            "Placed {} curves on page {} at {:?} (grid {:?})",
            tessellated.curves.len(),
            location.page,
            location.bezier_origin,
            location.grid_origin,
        );

        Ok(Glyph {
            location: Some(location),
            advance: outline.advance,
            offset: [tessellated.origin.x, tessellated.origin.y],
            size: [tessellated.extent.x, tessellated.extent.y],
            curve_count: tessellated.curves.len() as u16,
            fallback,
        })
    }

    /// Load all 95 printable ASCII codepoints. Returns how many are cached.
    pub fn load_ascii(&mut self, face: FaceId) -> Result<usize, AtlasError> {
        let start = Instant::now();
        for codepoint in ASCII_RANGE {
            self.get_or_load(face, codepoint)?;
        }
        log::info!(
            "Loaded ASCII for {face} in {:.1}ms ({} pages)",
            start.elapsed().as_secs_f64() * 1000.0,
            self.allocator.page_count(),
        );
        Ok(self.cache.face_len(face))
    }

    // ── Atlas ───────────────────────────────────────────────────────

    pub fn config(&self) -> &AtlasConfig {
        self.allocator.config()
    }

    pub fn pages(&self) -> &[AtlasPage] {
        self.allocator.pages()
    }

    pub fn dirty_pages(&self) -> impl Iterator<Item = (u16, &AtlasPage)> {
        self.allocator.dirty_pages()
    }

    pub fn mark_uploaded(&mut self, page: u16) {
        self.allocator.mark_uploaded(page);
    }

    pub fn mark_all_uploaded(&mut self) {
        self.allocator.mark_all_uploaded();
    }

    pub fn stats(&self) -> AtlasStats {
        self.allocator.stats()
    }

    pub fn cached_glyphs(&self) -> usize {
        self.cache.len()
    }
}

impl fmt::Debug for FontManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontManager")
            .field("faces", &self.faces.len())
            .field("glyphs", &self.cache.len())
            .field("pages", &self.allocator.page_count())
            .finish()
    }
}

// ── Shared context ──────────────────────────────────────────────────

/// Cloneable handle to one [`FontManager`], shared by every label.
///
/// Cache hits take the read lock; misses take the write lock and re-check
/// before loading, so a glyph is placed once.
#[derive(Clone, Debug)]
pub struct FontContext {
    inner: Arc<RwLock<FontManager>>,
}

impl FontContext {
    pub fn new(manager: FontManager) -> Self {
        Self {
            inner: Arc::new(RwLock::new(manager)),
        }
    }

    pub fn with_config(config: AtlasConfig) -> Result<Self, AtlasError> {
        Ok(Self::new(FontManager::new(config)?))
    }

    // Cache state is consistent between operations, so a poisoned lock
    // is still usable.
    pub fn read(&self) -> RwLockReadGuard<'_, FontManager> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, FontManager> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn glyph(&self, face: FaceId, codepoint: char) -> Result<Glyph, AtlasError> {
        if let Some(glyph) = self.read().glyph(face, codepoint) {
            return Ok(glyph);
        }
        self.write().get_or_load(face, codepoint)
    }

    pub fn add_face(&self, source: impl OutlineSource + 'static) -> FaceId {
        self.write().add_face(source)
    }

    pub fn font_from_name(&self, families: &str) -> Result<FaceId, AtlasError> {
        if let Some(id) = self.read().face_id(families) {
            return Ok(id);
        }
        self.write().font_from_name(families)
    }

    pub fn metrics(&self, face: FaceId) -> Result<FaceMetrics, AtlasError> {
        self.read().metrics(face)
    }

    pub fn load_ascii(&self, face: FaceId) -> Result<usize, AtlasError> {
        self.write().load_ascii(face)
    }

    pub fn stats(&self) -> AtlasStats {
        self.read().stats()
    }
}

// ===================================================================
// Tests
// ===================================================================
