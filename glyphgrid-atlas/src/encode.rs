//! Texel encoding of curves and grids.
//!
//! A texel is RGBA8 holding two little-endian `u16` values. One glyph's
//! bezier data is a single horizontal run of texels:
//!
//! ```text
//!  origin
//!  ┌────────┬─────────────┬────────┬────────┬─────┬──────────────┐
//!  │ gx, gy │ count, size │ curve0 (3 tx)   │ ... │ index lists  │
//!  └────────┴─────────────┴────────┴────────┴─────┴──────────────┘
//! ```
//!
//! Each grid cell is one texel in the grid buffer: `(offset, len)` of its
//! index list, or `(0 | 1, 0)` for a constant outside/inside cell.

use std::collections::HashMap;

use crate::error::AtlasError;
use crate::geometry::{Point, QuadCurve};
use crate::grid::{GlyphGrid, GridCell};

pub type Texel = [u8; 4];

/// Largest quantized coordinate (15 bits).
pub const COORD_MAX: u16 = 32_767;

/// Texels before the first curve.
pub const HEADER_TEXELS: usize = 2;

/// Texels per curve.
pub const CURVE_TEXELS: usize = 3;

/// Constant-fill markers stored in `lo` of an empty cell.
pub const CELL_OUTSIDE: u16 = 0;
pub const CELL_INSIDE: u16 = 1;

pub fn pack_texel(lo: u16, hi: u16) -> Texel {
    let [a, b] = lo.to_le_bytes();
    let [c, d] = hi.to_le_bytes();
    [a, b, c, d]
}

pub fn unpack_texel(texel: Texel) -> (u16, u16) {
    (
        u16::from_le_bytes([texel[0], texel[1]]),
        u16::from_le_bytes([texel[2], texel[3]]),
    )
}

/// Quantize a `[0, 1]` coordinate to 15 bits and put `flag` in bit 0.
pub fn encode_coord(value: f32, flag: bool) -> u16 {
    let q = (value.clamp(0.0, 1.0) * f32::from(COORD_MAX)).round() as u16;
    (q << 1) | u16::from(flag)
}

pub fn decode_coord(raw: u16) -> (f32, bool) {
    (f32::from(raw >> 1) / f32::from(COORD_MAX), raw & 1 == 1)
}

pub fn encode_point(p: Point, flags: [bool; 2]) -> Texel {
    pack_texel(encode_coord(p.x, flags[0]), encode_coord(p.y, flags[1]))
}

pub fn decode_point(texel: Texel) -> (Point, [bool; 2]) {
    let (x, y) = unpack_texel(texel);
    let (x, fx) = decode_coord(x);
    let (y, fy) = decode_coord(y);
    (Point::new(x, y), [fx, fy])
}

/// `p0` carries LINE in x and CLOCKWISE in y; the other low bits are zero.
pub fn encode_curve(curve: &QuadCurve) -> [Texel; 3] {
    [
        encode_point(curve.p0, [curve.line, curve.clockwise]),
        encode_point(curve.p1, [false, false]),
        encode_point(curve.p2, [false, false]),
    ]
}

pub fn decode_curve(texels: [Texel; 3]) -> QuadCurve {
    let (p0, [line, clockwise]) = decode_point(texels[0]);
    let (p1, _) = decode_point(texels[1]);
    let (p2, _) = decode_point(texels[2]);
    QuadCurve { p0, p1, p2, line, clockwise }
}

/// Header fields of an encoded glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphHeader {
    pub grid_origin: [u16; 2],
    pub curve_count: u16,
    pub grid_size: u16,
}

pub fn decode_header(texels: &[Texel]) -> Option<GlyphHeader> {
    let (gx, gy) = unpack_texel(*texels.first()?);
    let (curve_count, grid_size) = unpack_texel(*texels.get(1)?);
    Some(GlyphHeader {
        grid_origin: [gx, gy],
        curve_count,
        grid_size,
    })
}

/// One glyph's bezier run and grid block, ready for placement.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedGlyph {
    bezier: Vec<Texel>,
    grid: Vec<Texel>,
    grid_size: u16,
}

impl EncodedGlyph {
    /// Encode normalized `curves` and their `grid`.
    ///
    /// Index lists start on a texel boundary; identical lists are stored
    /// once. The grid origin in the header stays zero until
    /// [`set_grid_origin`](Self::set_grid_origin).
    pub fn new(curves: &[QuadCurve], grid: &GlyphGrid) -> Result<Self, AtlasError> {
        let curve_count = u16::try_from(curves.len()).map_err(|_| {
            AtlasError::AtlasCapacityExceeded {
                buffer: "bezier",
                needed: curves.len(),
                available: usize::from(u16::MAX),
            }
        })?;

        let mut bezier = Vec::with_capacity(HEADER_TEXELS + CURVE_TEXELS * curves.len());
        bezier.push(pack_texel(0, 0));
        bezier.push(pack_texel(curve_count, grid.size()));
        for curve in curves {
            bezier.extend_from_slice(&encode_curve(curve));
        }

        let mut offsets: HashMap<&[u16], u16> = HashMap::new();
        let mut grid_texels = Vec::with_capacity(grid.cells().len());
        for cell in grid.cells() {
            let texel = match cell {
                GridCell::Outside => pack_texel(CELL_OUTSIDE, 0),
                GridCell::Inside => pack_texel(CELL_INSIDE, 0),
                GridCell::Curves(list) => {
                    let offset = match offsets.get(list.as_slice()) {
                        Some(&offset) => offset,
                        None => {
                            let offset = texel_offset(bezier.len())?;
                            for pair in list.chunks(2) {
                                let second = pair.get(1).copied().unwrap_or(0);
                                bezier.push(pack_texel(pair[0], second));
                            }
                            offsets.insert(list.as_slice(), offset);
                            offset
                        }
                    };
                    // Lists never exceed the curve count, which fits u16.
                    pack_texel(offset, list.len() as u16)
                }
            };
            grid_texels.push(texel);
        }

        Ok(Self {
            bezier,
            grid: grid_texels,
            grid_size: grid.size(),
        })
    }

    /// Record where the grid block landed.
    pub fn set_grid_origin(&mut self, origin: [u16; 2]) {
        self.bezier[0] = pack_texel(origin[0], origin[1]);
    }

    /// Width of the bezier run, in texels.
    pub fn bezier_width(&self) -> usize {
        self.bezier.len()
    }

    pub fn bezier(&self) -> &[Texel] {
        &self.bezier
    }

    /// Grid texels, row-major from the bottom row.
    pub fn grid(&self) -> &[Texel] {
        &self.grid
    }

    pub fn grid_size(&self) -> u16 {
        self.grid_size
    }

    pub fn header(&self) -> GlyphHeader {
        // The header is written in `new`, so the run is never shorter.
        decode_header(&self.bezier).unwrap_or(GlyphHeader {
            grid_origin: [0, 0],
            curve_count: 0,
            grid_size: self.grid_size,
        })
    }

    /// Curve `index` decoded from the run.
    pub fn curve(&self, index: usize) -> Option<QuadCurve> {
        let start = HEADER_TEXELS + CURVE_TEXELS * index;
        let texels = self.bezier.get(start..start + CURVE_TEXELS)?;
        Some(decode_curve([texels[0], texels[1], texels[2]]))
    }

    /// Index list of grid cell `(col, row)`, read back from the texels.
    pub fn cell_list(&self, col: u16, row: u16) -> Option<Vec<u16>> {
        let cell = self.grid.get(usize::from(row) * usize::from(self.grid_size) + usize::from(col))?;
        let (offset, len) = unpack_texel(*cell);
        if len == 0 {
            return Some(Vec::new());
        }
        let start = usize::from(offset);
        let texels = self.bezier.get(start..start + usize::from(len).div_ceil(2))?;
        let mut list: Vec<u16> = texels
            .iter()
            .flat_map(|t| {
                let (a, b) = unpack_texel(*t);
                [a, b]
            })
            .collect();
        list.truncate(usize::from(len));
        Some(list)
    }
}

// ── Evaluation ──────────────────────────────────────────────────────

impl EncodedGlyph {
    /// Winding number at normalized point `p`, read from the texels the
    /// same way the glyph fragment shader reads them (without the
    /// antialiasing ramp). Constant cells give 0 or 1.
    pub fn winding_at(&self, p: Point) -> i32 {
        let n = self.grid_size;
        if n == 0 {
            return 0;
        }
        let cell = |v: f32| (v * f32::from(n)).floor().clamp(0.0, f32::from(n - 1)) as u16;
        let (col, row) = (cell(p.x), cell(p.y));
        let Some(&texel) = self.grid.get(usize::from(row) * usize::from(n) + usize::from(col)) else {
            return 0;
        };
        let (value, len) = unpack_texel(texel);
        if len == 0 {
            return i32::from(value == CELL_INSIDE);
        }
        self.cell_list(col, row)
            .unwrap_or_default()
            .iter()
            .filter_map(|&i| self.curve(usize::from(i)))
            .map(|curve| ray_crossings(&curve, p))
            .sum()
    }
}

/// Signed crossings of the +x ray from `p` with `curve`.
///
/// Roots count on `[0, 1)` going up and on `(0, 1]` going down, so a joint
/// between two curves counts once and a turning point not at all.
fn ray_crossings(curve: &QuadCurve, p: Point) -> i32 {
    let a = curve.p0 - curve.p1 * 2.0 + curve.p2;
    let b = (curve.p1 - curve.p0) * 2.0;
    let c = curve.p0 - p;

    let mut roots = [-1.0_f32; 2];
    if a.y.abs() < 1e-6 {
        if b.y.abs() > 1e-9 {
            roots[0] = -c.y / b.y;
        }
    } else {
        let disc = b.y * b.y - 4.0 * a.y * c.y;
        if disc >= 0.0 {
            // Cancellation-free form; near-linear curves keep an accurate root.
            let q = -0.5 * (b.y + disc.sqrt().copysign(b.y));
            roots[0] = q / a.y;
            if q != 0.0 {
                roots[1] = c.y / q;
            }
        }
    }

    roots
        .iter()
        .map(|&t| {
            let dy = 2.0 * a.y * t + b.y;
            let up = dy > 0.0 && (0.0..1.0).contains(&t);
            let down = dy < 0.0 && t > 0.0 && t <= 1.0;
            let x = (a.x * t + b.x) * t + c.x;
            if (up || down) && x > 0.0 {
                dy.signum() as i32
            } else {
                0
            }
        })
        .sum()
}

fn texel_offset(at: usize) -> Result<u16, AtlasError> {
    u16::try_from(at).map_err(|_| AtlasError::AtlasCapacityExceeded {
        buffer: "bezier",
        needed: at,
        available: usize::from(u16::MAX),
    })
}
