//! Atlas pages and the page allocator.
//!
//! Each page pairs a bezier texture with a grid texture. Both are filled
//! by row-based bump allocation: a glyph's bezier run takes a slice of a
//! one-texel row, its grid block takes an N×N square on an N-texel row.
//! When a run does not fit the current row, a new row starts. Nothing is
//! ever freed.
//!
//! ```text
//! AtlasAllocator
//!   ├── page 0  [full]   bezier 1024×1024 │ grid 256×256
//!   ├── page 1  [dirty]  bezier ...       │ grid ...
//!   └── place(glyph) ──► first non-full page with room, else a new page
//! ```

use crate::config::AtlasConfig;
use crate::encode::{EncodedGlyph, Texel};
use crate::error::AtlasError;

/// Where one glyph's data lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AtlasLocation {
    pub page: u16,
    /// Texel of the glyph's header in the bezier texture.
    pub bezier_origin: [u16; 2],
    /// Bottom-left texel of the glyph's grid block.
    pub grid_origin: [u16; 2],
}

// ── Row arena ───────────────────────────────────────────────────────

/// Bump allocator over fixed-height rows of a 2D buffer.
#[derive(Clone, Debug)]
pub struct RowArena {
    width: u32,
    height: u32,
    row_height: u32,
    cursor_x: u32,
    cursor_y: u32,
}

impl RowArena {
    pub fn new(width: u16, height: u16, row_height: u16) -> Self {
        Self {
            width: u32::from(width),
            height: u32::from(height),
            row_height: u32::from(row_height),
            cursor_x: 0,
            cursor_y: 0,
        }
    }

    /// Where a run of `len` texels would go, without allocating it.
    pub fn peek(&self, len: u32) -> Option<[u16; 2]> {
        if len > self.width || self.row_height > self.height {
            return None;
        }
        let (x, y) = if self.cursor_x + len <= self.width {
            (self.cursor_x, self.cursor_y)
        } else {
            (0, self.cursor_y + self.row_height)
        };
        if y + self.row_height > self.height {
            return None;
        }
        Some([x as u16, y as u16])
    }

    /// Allocate a run of `len` texels.
    pub fn bump(&mut self, len: u32) -> Option<[u16; 2]> {
        let at = self.peek(len)?;
        self.cursor_x = u32::from(at[0]) + len;
        self.cursor_y = u32::from(at[1]);
        Some(at)
    }

    /// Texels allocated so far, including skipped row tails.
    pub fn used(&self) -> usize {
        (self.cursor_y * self.width + self.cursor_x * self.row_height) as usize
    }

    pub fn within_bounds(&self) -> bool {
        self.cursor_x <= self.width && self.cursor_y + self.row_height <= self.height
    }
}

// ── Page ────────────────────────────────────────────────────────────

/// One bezier texture plus one grid texture.
#[derive(Clone, Debug)]
pub struct AtlasPage {
    bezier_size: [u16; 2],
    grid_size: [u16; 2],
    bezier: Vec<Texel>,
    grid: Vec<Texel>,
    bezier_arena: RowArena,
    grid_arena: RowArena,
    /// A placement failed; the page is skipped from now on.
    full: bool,
    /// Touched since the last upload.
    dirty: bool,
    glyph_count: usize,
}

impl AtlasPage {
    pub fn new(config: &AtlasConfig) -> Self {
        let [bw, bh] = config.bezier_atlas_size;
        let [gw, gh] = config.grid_atlas_size;
        Self {
            bezier_size: config.bezier_atlas_size,
            grid_size: config.grid_atlas_size,
            bezier: vec![[0; 4]; usize::from(bw) * usize::from(bh)],
            grid: vec![[0; 4]; usize::from(gw) * usize::from(gh)],
            bezier_arena: RowArena::new(bw, bh, 1),
            grid_arena: RowArena::new(gw, gh, config.grid_size),
            full: false,
            dirty: false,
            glyph_count: 0,
        }
    }

    /// Place `glyph` if both runs fit. Returns `(bezier_origin,
    /// grid_origin)`; on `None` nothing was written.
    pub fn try_place(&mut self, glyph: &mut EncodedGlyph) -> Option<([u16; 2], [u16; 2])> {
        let n = u32::from(glyph.grid_size());
        let width = glyph.bezier_width() as u32;
        self.bezier_arena.peek(width)?;
        self.grid_arena.peek(n)?;

        let bezier_origin = self.bezier_arena.bump(width)?;
        let grid_origin = self.grid_arena.bump(n)?;
        glyph.set_grid_origin(grid_origin);

        let start = self.bezier_index(bezier_origin);
        self.bezier[start..start + glyph.bezier_width()].copy_from_slice(glyph.bezier());

        let n = usize::from(glyph.grid_size());
        for (row, cells) in glyph.grid().chunks(n).enumerate() {
            let at = self.grid_index([grid_origin[0], grid_origin[1] + row as u16]);
            self.grid[at..at + n].copy_from_slice(cells);
        }

        self.glyph_count += 1;
        self.dirty = true;
        Some((bezier_origin, grid_origin))
    }

    fn bezier_index(&self, at: [u16; 2]) -> usize {
        usize::from(at[1]) * usize::from(self.bezier_size[0]) + usize::from(at[0])
    }

    fn grid_index(&self, at: [u16; 2]) -> usize {
        usize::from(at[1]) * usize::from(self.grid_size[0]) + usize::from(at[0])
    }

    pub fn bezier_texel(&self, x: u16, y: u16) -> Texel {
        self.bezier[self.bezier_index([x, y])]
    }

    pub fn grid_texel(&self, x: u16, y: u16) -> Texel {
        self.grid[self.grid_index([x, y])]
    }

    /// Bezier texture contents, row-major from texel row 0.
    pub fn bezier_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.bezier)
    }

    pub fn grid_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.grid)
    }

    pub fn bezier_size(&self) -> [u16; 2] {
        self.bezier_size
    }

    pub fn grid_size(&self) -> [u16; 2] {
        self.grid_size
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_uploaded(&mut self) {
        self.dirty = false;
    }

    pub fn glyph_count(&self) -> usize {
        self.glyph_count
    }

    pub fn used_texels(&self) -> (usize, usize) {
        (self.bezier_arena.used(), self.grid_arena.used())
    }

    /// Neither write cursor is past its buffer.
    pub fn within_bounds(&self) -> bool {
        self.bezier_arena.within_bounds() && self.grid_arena.within_bounds()
    }
}

// ── Allocator ───────────────────────────────────────────────────────

/// Page counts and fill levels, for logs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AtlasStats {
    pub pages: usize,
    pub glyphs: usize,
    /// `(bezier, grid)` texels used, per page.
    pub used_texels: Vec<(usize, usize)>,
}

/// Growable list of pages sharing one configuration.
#[derive(Debug)]
pub struct AtlasAllocator {
    config: AtlasConfig,
    pages: Vec<AtlasPage>,
}

impl AtlasAllocator {
    pub fn new(config: AtlasConfig) -> Self {
        Self { config, pages: Vec::new() }
    }

    /// Place a glyph in the first page with room, opening a page if needed.
    pub fn place(&mut self, glyph: &mut EncodedGlyph) -> Result<AtlasLocation, AtlasError> {
        let width = glyph.bezier_width();
        let available = usize::from(self.config.bezier_atlas_size[0]);
        if width > available {
            return Err(AtlasError::AtlasCapacityExceeded {
                buffer: "bezier",
                needed: width,
                available,
            });
        }
        let n = glyph.grid_size();
        let [gw, gh] = self.config.grid_atlas_size;
        if n > gw || n > gh {
            return Err(AtlasError::AtlasCapacityExceeded {
                buffer: "grid",
                needed: usize::from(n) * usize::from(n),
                available: usize::from(gw) * usize::from(gh),
            });
        }

        let mut existing = None;
        for (index, page) in self.pages.iter_mut().enumerate() {
            if page.is_full() {
                continue;
            }
            if let Some(origins) = page.try_place(glyph) {
                existing = Some((index as u16, origins));
                break;
            }
            log::debug!("Atlas page {index} full after {} glyphs", page.glyph_count());
            page.full = true;
        }
        if let Some((page, (bezier_origin, grid_origin))) = existing {
            self.check_bounds();
            return Ok(AtlasLocation {
                page,
                bezier_origin,
                grid_origin,
            });
        }

        let index = u16::try_from(self.pages.len()).map_err(|_| {
            AtlasError::AtlasCapacityExceeded {
                buffer: "pages",
                needed: self.pages.len() + 1,
                available: usize::from(u16::MAX),
            }
        })?;
        let mut page = AtlasPage::new(&self.config);
        let (bezier_origin, grid_origin) =
            page.try_place(glyph).ok_or(AtlasError::AtlasCapacityExceeded {
                buffer: "bezier",
                needed: width,
                available,
            })?;
        log::info!(
            "Opened atlas page {index} (bezier {:?}, grid {:?})",
            self.config.bezier_atlas_size,
            self.config.grid_atlas_size,
        );
        self.pages.push(page);
        self.check_bounds();
        Ok(AtlasLocation {
            page: index,
            bezier_origin,
            grid_origin,
        })
    }

    fn check_bounds(&self) {
        debug_assert!(
            self.pages.iter().all(AtlasPage::within_bounds),
            "atlas cursor past page bounds"
        );
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn pages(&self) -> &[AtlasPage] {
        &self.pages
    }

    pub fn page(&self, index: u16) -> Option<&AtlasPage> {
        self.pages.get(usize::from(index))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages written since their last upload, with their indices.
    pub fn dirty_pages(&self) -> impl Iterator<Item = (u16, &AtlasPage)> {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_dirty())
            .map(|(i, p)| (i as u16, p))
    }

    pub fn mark_uploaded(&mut self, index: u16) {
        if let Some(page) = self.pages.get_mut(usize::from(index)) {
            page.mark_uploaded();
        }
    }

    pub fn mark_all_uploaded(&mut self) {
        for page in &mut self.pages {
            page.mark_uploaded();
        }
    }

    pub fn stats(&self) -> AtlasStats {
        AtlasStats {
            pages: self.pages.len(),
            glyphs: self.pages.iter().map(AtlasPage::glyph_count).sum(),
            used_texels: self.pages.iter().map(AtlasPage::used_texels).collect(),
        }
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::unpack_texel;
    use crate::geometry::{Point, QuadCurve};
    use crate::grid::GridBuilder;

    fn small_config() -> AtlasConfig {
        AtlasConfig {
            bezier_atlas_size: [64, 4],
            grid_atlas_size: [8, 8],
            grid_size: 4,
            ..Default::default()
        }
    }

    fn triangle_glyph(n: u16) -> EncodedGlyph {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        let c = Point::new(0.5, 1.0);
        let curves = vec![QuadCurve::line(a, b), QuadCurve::line(b, c), QuadCurve::line(c, a)];
        let grid = GridBuilder::new(n, 0.0).build(&curves);
        EncodedGlyph::new(&curves, &grid).unwrap()
    }

    #[test]
    fn test_arena_wraps_rows() {
        let mut arena = RowArena::new(10, 4, 2);
        assert_eq!(arena.bump(6), Some([0, 0]));
        assert_eq!(arena.bump(4), Some([6, 0]));
        assert_eq!(arena.bump(1), Some([0, 2]));
        assert_eq!(arena.peek(10), None, "no third row");
        assert_eq!(arena.bump(9), Some([1, 2]));
        assert!(arena.within_bounds());
    }

    #[test]
    fn test_arena_rejects_oversized_run() {
        let mut arena = RowArena::new(10, 10, 1);
        assert_eq!(arena.bump(11), None);
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_page_creation() {
        let page = AtlasPage::new(&AtlasConfig::default());
        assert_eq!(page.bezier_bytes().len(), 1024 * 1024 * 4);
        assert_eq!(page.grid_bytes().len(), 256 * 256 * 4);
        assert!(!page.is_dirty());
        assert!(!page.is_full());
        assert_eq!(page.glyph_count(), 0);
    }

    #[test]
    fn test_place_writes_both_buffers() {
        let mut alloc = AtlasAllocator::new(small_config());
        let mut glyph = triangle_glyph(4);
        let loc = alloc.place(&mut glyph).unwrap();
        assert_eq!(loc.page, 0);
        assert_eq!(loc.bezier_origin, [0, 0]);
        assert_eq!(loc.grid_origin, [0, 0]);

        let page = alloc.page(0).unwrap();
        assert!(page.is_dirty());
        let (curves, n) = unpack_texel(page.bezier_texel(1, 0));
        assert_eq!((curves, n), (3, 4));
        assert_eq!(page.grid_texel(3, 3), glyph.grid()[15]);
    }

    #[test]
    fn test_second_glyph_records_its_grid_origin() {
        let mut alloc = AtlasAllocator::new(small_config());
        let mut first = triangle_glyph(4);
        let mut second = triangle_glyph(4);
        alloc.place(&mut first).unwrap();
        let loc = alloc.place(&mut second).unwrap();
        assert_eq!(loc.grid_origin, [4, 0]);

        let page = alloc.page(loc.page).unwrap();
        let [x, y] = loc.bezier_origin;
        assert_eq!(unpack_texel(page.bezier_texel(x, y)), (4, 0));
    }

    #[test]
    fn test_new_page_when_full() {
        // Grid page holds 2×2 blocks of 4×4 cells.
        let mut alloc = AtlasAllocator::new(small_config());
        let mut pages = Vec::new();
        for _ in 0..5 {
            let mut glyph = triangle_glyph(4);
            pages.push(alloc.place(&mut glyph).unwrap().page);
        }
        assert_eq!(pages, vec![0, 0, 0, 0, 1]);
        assert!(alloc.page(0).unwrap().is_full());
        assert_eq!(alloc.page_count(), 2);
        assert!(alloc.pages().iter().all(AtlasPage::within_bounds));
    }

    #[test]
    fn test_oversized_glyph_is_rejected() {
        let config = AtlasConfig {
            bezier_atlas_size: [8, 8],
            ..small_config()
        };
        let mut alloc = AtlasAllocator::new(config);
        let mut glyph = triangle_glyph(4);
        let err = alloc.place(&mut glyph).unwrap_err();
        assert!(matches!(err, AtlasError::AtlasCapacityExceeded { buffer: "bezier", .. }));
        assert_eq!(alloc.page_count(), 0, "no partial placement");
    }

    #[test]
    fn test_dirty_tracking() {
        let mut alloc = AtlasAllocator::new(small_config());
        for _ in 0..5 {
            let mut glyph = triangle_glyph(4);
            alloc.place(&mut glyph).unwrap();
        }
        assert_eq!(alloc.dirty_pages().count(), 2);
        alloc.mark_uploaded(0);
        let dirty: Vec<u16> = alloc.dirty_pages().map(|(i, _)| i).collect();
        assert_eq!(dirty, vec![1]);
        alloc.mark_all_uploaded();
        assert_eq!(alloc.dirty_pages().count(), 0);
    }

    #[test]
    fn test_cursors_stay_in_bounds() {
        let mut alloc = AtlasAllocator::new(small_config());
        for _ in 0..40 {
            let mut glyph = triangle_glyph(4);
            alloc.place(&mut glyph).unwrap();
            assert!(alloc.pages().iter().all(AtlasPage::within_bounds));
        }
        let stats = alloc.stats();
        assert_eq!(stats.glyphs, 40);
        assert_eq!(stats.pages, 10);
    }
}
