//! Curve tessellation: outline contours → quadratic beziers.
//!
//! Lines become zero-curvature quadratics, conics pass through, cubics are
//! split until a single quadratic approximates each piece within the
//! configured tolerance. Curves come out normalized to the glyph's control
//! point box, so every coordinate lies in `[0, 1]`.

use crate::geometry::{Bounds, Point, QuadCurve};
use crate::outline::{Contour, GlyphOutline, OutlinePoint, PointTag};

/// Recursion cap for cubic subdivision (at most 2^10 pieces per cubic).
const MAX_CUBIC_DEPTH: u32 = 10;

/// Smallest box extent (em) used for normalization.
const MIN_EXTENT: f32 = 1e-6;

/// Curves shorter than this (em) are dropped.
const DEGENERATE_EPS: f32 = 1e-7;

/// Quadratic curves of one glyph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TessellatedGlyph {
    /// Curves in normalized glyph space, contour order preserved.
    pub curves: Vec<QuadCurve>,
    /// Bottom-left of the normalization box (em).
    pub origin: Point,
    /// Size of the normalization box (em).
    pub extent: Point,
}

impl TessellatedGlyph {
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Map a normalized point back to em units.
    pub fn to_em(&self, p: Point) -> Point {
        Point::new(
            self.origin.x + p.x * self.extent.x,
            self.origin.y + p.y * self.extent.y,
        )
    }
}

#[derive(Clone, Debug)]
pub struct Tessellator {
    tolerance: f32,
}

impl Tessellator {
    /// `tolerance` bounds the cubic approximation error, in em.
    pub fn new(tolerance: f32) -> Self {
        Self { tolerance }
    }

    pub fn tessellate(&self, outline: &GlyphOutline) -> TessellatedGlyph {
        let mut curves = Vec::new();
        for contour in &outline.contours {
            let start = curves.len();
            self.contour_curves(contour, &mut curves);

            let clockwise = signed_area(&curves[start..]) < 0.0;
            for curve in &mut curves[start..] {
                curve.clockwise = clockwise;
            }
        }

        if curves.is_empty() {
            return TessellatedGlyph::default();
        }

        let mut bounds = Bounds::EMPTY;
        for c in &curves {
            bounds.include(c.p0);
            bounds.include(c.p1);
            bounds.include(c.p2);
        }

        let origin = bounds.min;
        let extent = Point::new(
            bounds.width().max(MIN_EXTENT),
            bounds.height().max(MIN_EXTENT),
        );
        let normalize = |p: Point| {
            Point::new(
                ((p.x - origin.x) / extent.x).clamp(0.0, 1.0),
                ((p.y - origin.y) / extent.y).clamp(0.0, 1.0),
            )
        };

        TessellatedGlyph {
            curves: curves.iter().map(|c| c.map(normalize)).collect(),
            origin,
            extent,
        }
    }

    /// Walk one contour, emitting curves in em units.
    fn contour_curves(&self, contour: &Contour, out: &mut Vec<QuadCurve>) {
        let seq = closed_sequence(&contour.points);
        let Some(first) = seq.first() else {
            return;
        };

        let mut cur = first.position;
        let mut i = 1;
        while i < seq.len() {
            let pt = seq[i];
            match pt.tag {
                PointTag::OnCurve => {
                    push_curve(out, QuadCurve::line(cur, pt.position));
                    cur = pt.position;
                    i += 1;
                }
                PointTag::Conic => match seq.get(i + 1) {
                    Some(next) if next.tag == PointTag::Conic => {
                        // Two conic controls in a row imply an on-curve
                        // point halfway between them.
                        let mid = pt.position.midpoint(next.position);
                        push_curve(out, QuadCurve::new(cur, pt.position, mid));
                        cur = mid;
                        i += 1;
                    }
                    Some(next) if next.tag == PointTag::OnCurve => {
                        push_curve(out, QuadCurve::new(cur, pt.position, next.position));
                        cur = next.position;
                        i += 2;
                    }
                    _ => {
                        push_curve(out, QuadCurve::line(cur, pt.position));
                        cur = pt.position;
                        i += 1;
                    }
                },
                PointTag::Cubic => match (seq.get(i + 1), seq.get(i + 2)) {
                    (Some(c2), Some(end))
                        if c2.tag == PointTag::Cubic && end.tag == PointTag::OnCurve =>
                    {
                        self.push_cubic(out, [cur, pt.position, c2.position, end.position], 0);
                        cur = end.position;
                        i += 3;
                    }
                    _ => {
                        // Malformed run: keep the outline closed with a line.
                        push_curve(out, QuadCurve::line(cur, pt.position));
                        cur = pt.position;
                        i += 1;
                    }
                },
            }
        }
    }

    fn push_cubic(&self, out: &mut Vec<QuadCurve>, p: [Point; 4], depth: u32) {
        let [p0, p1, p2, p3] = p;
        let d = p3 - p2 * 3.0 + p1 * 3.0 - p0;
        let error = d.length() * (3.0f32.sqrt() / 36.0);

        if error <= self.tolerance || depth >= MAX_CUBIC_DEPTH {
            let ctrl = ((p1 + p2) * 3.0 - p0 - p3) * 0.25;
            push_curve(out, QuadCurve::new(p0, ctrl, p3));
            return;
        }

        let p01 = p0.midpoint(p1);
        let p12 = p1.midpoint(p2);
        let p23 = p2.midpoint(p3);
        let p012 = p01.midpoint(p12);
        let p123 = p12.midpoint(p23);
        let mid = p012.midpoint(p123);
        self.push_cubic(out, [p0, p01, p012, mid], depth + 1);
        self.push_cubic(out, [mid, p123, p23, p3], depth + 1);
    }
}

/// Rotate the contour to start on an on-curve point and repeat that point
/// at the end, so the walk closes the contour explicitly.
fn closed_sequence(points: &[OutlinePoint]) -> Vec<OutlinePoint> {
    if points.len() < 2 {
        return Vec::new();
    }

    let mut seq = Vec::with_capacity(points.len() + 2);
    match points.iter().position(|p| p.tag == PointTag::OnCurve) {
        Some(start) => {
            seq.extend_from_slice(&points[start..]);
            seq.extend_from_slice(&points[..start]);
            seq.push(points[start]);
        }
        None => {
            // All control points: start halfway between the first two.
            let start = OutlinePoint {
                position: points[0].position.midpoint(points[1].position),
                tag: PointTag::OnCurve,
            };
            seq.push(start);
            seq.extend_from_slice(&points[1..]);
            seq.push(points[0]);
            seq.push(start);
        }
    }
    seq
}

fn push_curve(out: &mut Vec<QuadCurve>, curve: QuadCurve) {
    if !curve.is_degenerate(DEGENERATE_EPS) {
        out.push(curve);
    }
}

/// Shoelace area of the curves' control polygons. Positive means
/// counter-clockwise in y-up space.
fn signed_area(curves: &[QuadCurve]) -> f32 {
    curves
        .iter()
        .map(|c| c.p0.cross(c.p1) + c.p1.cross(c.p2))
        .sum::<f32>()
        * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(advance: f32) -> GlyphOutline {
        GlyphOutline::from_polygons(&[&[(0.0, 0.0), (1.0, 0.0), (1.0, 2.0), (0.0, 2.0)]], advance)
    }

    #[test]
    fn test_empty_outline_yields_no_curves() {
        let t = Tessellator::new(0.001);
        let out = t.tessellate(&GlyphOutline::empty(0.25));
        assert!(out.is_empty());
    }

    #[test]
    fn test_square_becomes_four_lines() {
        let t = Tessellator::new(0.001);
        let out = t.tessellate(&square(1.0));
        assert_eq!(out.curves.len(), 4);
        assert!(out.curves.iter().all(|c| c.line));
        assert!(out.curves.iter().all(|c| !c.clockwise), "square is CCW");
        assert_eq!(out.origin, Point::new(0.0, 0.0));
        assert_eq!(out.extent, Point::new(1.0, 2.0));
        // Normalized into the unit box.
        assert_eq!(out.curves[1].p2, Point::new(1.0, 1.0));
    }

    #[test]
    fn test_clockwise_contour_flagged() {
        let t = Tessellator::new(0.001);
        let outline =
            GlyphOutline::from_polygons(&[&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]], 1.0);
        let out = t.tessellate(&outline);
        assert!(out.curves.iter().all(|c| c.clockwise));
    }

    #[test]
    fn test_conic_passes_through() {
        let t = Tessellator::new(0.001);
        let outline = GlyphOutline {
            contours: vec![Contour {
                points: vec![
                    OutlinePoint::on(0.0, 0.0),
                    OutlinePoint::conic(0.5, 1.0),
                    OutlinePoint::on(1.0, 0.0),
                ],
            }],
            advance: 1.0,
        };
        let out = t.tessellate(&outline);
        assert_eq!(out.curves.len(), 2, "one conic plus the closing line");
        assert!(!out.curves[0].line);
        assert!(out.curves[1].line);
        assert_eq!(out.curves[0].p1, Point::new(0.5, 1.0));
    }

    #[test]
    fn test_implied_on_curve_between_conics() {
        let t = Tessellator::new(0.001);
        let outline = GlyphOutline {
            contours: vec![Contour {
                points: vec![
                    OutlinePoint::on(0.0, 0.0),
                    OutlinePoint::conic(0.0, 1.0),
                    OutlinePoint::conic(1.0, 1.0),
                    OutlinePoint::on(1.0, 0.0),
                ],
            }],
            advance: 1.0,
        };
        let out = t.tessellate(&outline);
        assert_eq!(out.curves.len(), 3);
        let em = out.to_em(out.curves[0].p2);
        assert!((em.x - 0.5).abs() < 1e-6 && (em.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_all_off_curve_contour() {
        let t = Tessellator::new(0.001);
        let outline = GlyphOutline {
            contours: vec![Contour {
                points: vec![
                    OutlinePoint::conic(0.0, 0.0),
                    OutlinePoint::conic(1.0, 0.0),
                    OutlinePoint::conic(1.0, 1.0),
                    OutlinePoint::conic(0.0, 1.0),
                ],
            }],
            advance: 1.0,
        };
        let out = t.tessellate(&outline);
        assert_eq!(out.curves.len(), 4);
        assert!(out.curves.iter().all(|c| !c.line));
        // Closed: each curve ends where the next starts.
        for pair in out.curves.windows(2) {
            assert_eq!(pair[0].p2, pair[1].p0);
        }
        assert_eq!(out.curves[3].p2, out.curves[0].p0);
    }

    #[test]
    fn test_cubic_within_tolerance() {
        let tolerance = 0.001;
        let t = Tessellator::new(tolerance);
        let (p0, p1, p2, p3) = (
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
        );
        let outline = GlyphOutline {
            contours: vec![Contour {
                points: vec![
                    OutlinePoint::on(p0.x, p0.y),
                    OutlinePoint::cubic(p1.x, p1.y),
                    OutlinePoint::cubic(p2.x, p2.y),
                    OutlinePoint::on(p3.x, p3.y),
                ],
            }],
            advance: 1.0,
        };
        let out = t.tessellate(&outline);
        let pieces: Vec<QuadCurve> =
            out.curves.iter().filter(|c| !c.line).map(|c| c.map(|p| out.to_em(p))).collect();
        assert!(pieces.len() > 1, "cubic should be split");

        // Sample the cubic and check every sample is near some piece.
        let cubic = |t: f32| {
            let mt = 1.0 - t;
            p0 * (mt * mt * mt) + p1 * (3.0 * mt * mt * t) + p2 * (3.0 * mt * t * t) + p3 * (t * t * t)
        };
        for i in 0..=64 {
            let target = cubic(i as f32 / 64.0);
            let nearest = pieces
                .iter()
                .flat_map(|c| (0..=64).map(move |j| c.eval(j as f32 / 64.0)))
                .map(|p| (p - target).length())
                .fold(f32::INFINITY, f32::min);
            assert!(nearest < tolerance * 4.0, "sample {i} off by {nearest}");
        }
    }

    #[test]
    fn test_degenerate_segments_dropped() {
        let t = Tessellator::new(0.001);
        let outline = GlyphOutline::from_polygons(
            &[&[(0.0, 0.0), (0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]],
            1.0,
        );
        let out = t.tessellate(&outline);
        assert_eq!(out.curves.len(), 3);
    }

    #[test]
    fn test_coordinates_in_unit_box() {
        let t = Tessellator::new(0.001);
        let out = t.tessellate(&square(1.0));
        for c in &out.curves {
            for p in [c.p0, c.p1, c.p2] {
                assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y));
            }
        }
    }
}
