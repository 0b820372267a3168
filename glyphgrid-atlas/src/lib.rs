//! # glyphgrid-atlas
//!
//! CPU side of resolution-independent GPU text. Glyph outlines become
//! quadratic bezier curves plus a coarse N×N acceleration grid, packed
//! into fixed-size atlas pages that a fragment shader reads directly.
//!
//! ## Architecture
//!
//! ```text
//! OutlineSource (font-kit FontFace / StaticOutlines)
//!     │ GlyphOutline (em units)
//!     ▼
//! Tessellator ──► TessellatedGlyph { Vec<QuadCurve> in [0,1]² }
//!     │
//!     ▼
//! GridBuilder ──► GlyphGrid (inside / outside / curve list per cell)
//!     │
//!     ▼
//! EncodedGlyph ──► AtlasAllocator ──► AtlasPage { bezier, grid } ──► GPU
//!     │
//!     ▼
//! GlyphCache (face → codepoint → Glyph), owned by FontManager / FontContext
//! ```
//!
//! - **`outline`**: outline types and the `OutlineSource` trait.
//! - **`fonts`**: system font faces via `font-kit`.
//! - **`tessellate`**: lines, conics and cubics to quadratics.
//! - **`grid`**: per-cell curve lists and nonzero-winding fill.
//! - **`encode`**: texel layout of curves, headers and cells.
//! - **`atlas`**: row-arena pages and the page allocator.
//! - **`cache`** / **`manager`**: glyph records, faces and the shared context.

pub mod atlas;
pub mod cache;
pub mod config;
pub mod encode;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod grid;
pub mod manager;
pub mod outline;
pub mod tessellate;

// Re-exports for ergonomic use.
pub use atlas::{AtlasAllocator, AtlasLocation, AtlasPage, AtlasStats, RowArena};
pub use cache::{Glyph, GlyphCache};
pub use config::{AtlasConfig, MAX_ATLAS_DIMENSION};
pub use encode::{EncodedGlyph, Texel};
pub use error::AtlasError;
pub use fonts::FontFace;
pub use geometry::{Bounds, Point, QuadCurve};
pub use grid::{GlyphGrid, GridBuilder, GridCell};
pub use manager::{FaceId, FontContext, FontManager, ASCII_RANGE};
pub use outline::{FaceMetrics, GlyphOutline, OutlineSource, StaticOutlines};
pub use tessellate::{TessellatedGlyph, Tessellator};
