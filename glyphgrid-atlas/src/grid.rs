//! Per-glyph acceleration grid.
//!
//! An N×N grid is laid over the glyph's normalized box. A cell that some
//! curve touches lists every curve the +x ray from a point of the cell can
//! cross: the touching curves plus those further right in the cell's row
//! band. Cells no curve touches record whether the whole cell is inside or outside the fill.
//!
//! Fill rule: nonzero winding.
//!
//! ```text
//!  row N-1  ┌──┬──┬──┬──┐
//!           │░░│ 3│ 3│░░│   ░ = outside, █ = inside, n = curve list
//!           ├──┼──┼──┼──┤
//!           │ 2│██│██│ 2│
//!  row 0    └──┴──┴──┴──┘
//!           col 0 ──────► col N-1
//! ```

use crate::geometry::{extremum, Bounds, Point, QuadCurve};

/// Classification of one grid cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GridCell {
    /// No curve touches the cell and its center is outside the fill.
    Outside,
    /// No curve touches the cell and its center is inside the fill.
    Inside,
    /// Indices of curves a +x ray from inside the cell may cross, ascending.
    Curves(Vec<u16>),
}

impl GridCell {
    pub fn is_constant(&self) -> bool {
        !matches!(self, Self::Curves(_))
    }
}

/// Cells of one glyph, row-major from the bottom row.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphGrid {
    size: u16,
    cells: Vec<GridCell>,
}

impl GlyphGrid {
    /// Cells per side.
    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn cell(&self, col: u16, row: u16) -> &GridCell {
        &self.cells[usize::from(row) * usize::from(self.size) + usize::from(col)]
    }

    /// Normalized box of cell `(col, row)`, undilated.
    pub fn cell_bounds(&self, col: u16, row: u16) -> Bounds {
        cell_box(self.size, col, row)
    }

    /// Total number of curve references across all cells.
    pub fn reference_count(&self) -> usize {
        self.cells
            .iter()
            .map(|c| match c {
                GridCell::Curves(list) => list.len(),
                _ => 0,
            })
            .sum()
    }
}

#[derive(Clone, Debug)]
pub struct GridBuilder {
    size: u16,
    margin: f32,
}

impl GridBuilder {
    /// `margin` dilates every cell by that fraction of a cell before
    /// testing curves against it.
    pub fn new(size: u16, margin: f32) -> Self {
        Self { size, margin }
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    /// Classify every cell for `curves` (normalized glyph space).
    pub fn build(&self, curves: &[QuadCurve]) -> GlyphGrid {
        let n = self.size;
        let dilation = self.margin / f32::from(n);
        let curve_bounds: Vec<Bounds> = curves.iter().map(QuadCurve::bounds).collect();

        let mut cells = Vec::with_capacity(usize::from(n) * usize::from(n));
        for row in 0..n {
            for col in 0..n {
                let cell = cell_box(n, col, row);
                let dilated = cell.dilate(dilation);

                let touched = curves
                    .iter()
                    .zip(&curve_bounds)
                    .any(|(curve, b)| b.overlaps(&dilated) && hull_overlaps(curve, &dilated));

                let classified = if touched {
                    GridCell::Curves(ray_list(&curve_bounds, &dilated))
                } else if winding_number(curves, cell.center()) != 0 {
                    GridCell::Inside
                } else {
                    GridCell::Outside
                };
                cells.push(classified);
            }
        }

        GlyphGrid { size: n, cells }
    }
}

/// Curves whose bounds reach into `cell`'s row band at or right of its
/// left edge, ascending. Every curve touching `cell` is among them.
fn ray_list(bounds: &[Bounds], cell: &Bounds) -> Vec<u16> {
    bounds
        .iter()
        .enumerate()
        .filter(|(_, b)| {
            let in_band = b.min.y <= cell.max.y && b.max.y >= cell.min.y;
            in_band && b.max.x >= cell.min.x
        })
        .map(|(i, _)| i as u16)
        .collect()
}

fn cell_box(n: u16, col: u16, row: u16) -> Bounds {
    let n = f32::from(n);
    Bounds::new(
        Point::new(f32::from(col) / n, f32::from(row) / n),
        Point::new(f32::from(col + 1) / n, f32::from(row + 1) / n),
    )
}

// ── Curve vs. box ───────────────────────────────────────────────────

/// Separating-axis test of the curve's control triangle against `b`.
///
/// The curve lies inside its control triangle, so `false` proves the
/// curve misses the box. Collinear triangles (lines) reduce to a
/// segment test.
pub fn hull_overlaps(curve: &QuadCurve, b: &Bounds) -> bool {
    let tri = [curve.p0, curve.p1, curve.p2];
    if !curve.hull_bounds().overlaps(b) {
        return false;
    }

    let corners = b.corners();
    for i in 0..3 {
        let edge = tri[(i + 1) % 3] - tri[i];
        let axis = Point::new(-edge.y, edge.x);
        if axis.x == 0.0 && axis.y == 0.0 {
            continue;
        }
        let (t_min, t_max) = project(&tri, axis);
        let (b_min, b_max) = project(&corners, axis);
        if t_max < b_min || b_max < t_min {
            return false;
        }
    }
    true
}

fn project(points: &[Point], axis: Point) -> (f32, f32) {
    points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

// ── Winding ─────────────────────────────────────────────────────────

/// Nonzero winding number of `p` with respect to closed `curves`.
///
/// Casts a ray toward +x. Each curve is split into y-monotonic pieces;
/// a piece crossing the ray counts +1 going up and -1 going down, using a
/// half-open `[y_min, y_max)` rule so shared endpoints count once.
pub fn winding_number(curves: &[QuadCurve], p: Point) -> i32 {
    let mut winding = 0;
    for curve in curves {
        match extremum(curve.p0.y, curve.p1.y, curve.p2.y) {
            Some(t) => {
                let (a, b) = curve.split(t);
                winding += crossing(&a, p) + crossing(&b, p);
            }
            None => winding += crossing(curve, p),
        }
    }
    winding
}

/// Signed crossing of a y-monotonic curve with the +x ray from `p`.
fn crossing(curve: &QuadCurve, p: Point) -> i32 {
    let (y0, y2) = (curve.p0.y, curve.p2.y);
    if y0 == y2 {
        return 0;
    }
    let (lo, hi, dir) = if y0 < y2 { (y0, y2, 1) } else { (y2, y0, -1) };
    if p.y < lo || p.y >= hi {
        return 0;
    }

    let t = solve_monotonic(curve, p.y);
    if curve.eval(t).x > p.x {
        dir
    } else {
        0
    }
}

/// Parameter where a y-monotonic curve reaches height `y`.
fn solve_monotonic(curve: &QuadCurve, y: f32) -> f32 {
    let a = curve.p0.y - 2.0 * curve.p1.y + curve.p2.y;
    let b = 2.0 * (curve.p1.y - curve.p0.y);
    let c = curve.p0.y - y;

    if a.abs() < 1e-9 {
        if b == 0.0 {
            return 0.0;
        }
        return (-c / b).clamp(0.0, 1.0);
    }

    let disc = (b * b - 4.0 * a * c).max(0.0).sqrt();
    let q = -0.5 * (b + disc.copysign(b));
    let r1 = q / a;
    let r2 = if q != 0.0 { c / q } else { r1 };
    let outside = |t: f32| (t.clamp(0.0, 1.0) - t).abs();
    let t = if outside(r1) <= outside(r2) { r1 } else { r2 };
    t.clamp(0.0, 1.0)
}
