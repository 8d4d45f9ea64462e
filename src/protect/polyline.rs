//! Feature polylines traced from the border edges of a surface mesh.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use super::ball::PolylinePosition;
use super::options::ExtractOptions;
use crate::geom::{BoundaryMesh, HalfedgeId, Point3, VertexId};

/// An ordered point sequence. For a cycle the last point equals the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    points: Vec<Point3>,
    is_cycle: bool,
    /// `cumulative[i]` is the arclength at `points[i]`.
    cumulative: Vec<f64>,
}

impl Polyline {
    #[must_use]
    pub fn new(points: Vec<Point3>, is_cycle: bool) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, &p) in points.iter().enumerate() {
            if i > 0 {
                total += points[i - 1].distance_to(p);
            }
            cumulative.push(total);
        }
        Self {
            points,
            is_cycle,
            cumulative,
        }
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn is_cycle(&self) -> bool {
        self.is_cycle
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn first(&self) -> Option<Point3> {
        self.points.first().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<Point3> {
        self.points.last().copied()
    }

    fn segment_length(&self, segment: usize) -> f64 {
        self.cumulative[segment + 1] - self.cumulative[segment]
    }

    /// Segments no longer than `tol`.
    #[must_use]
    pub fn degenerate_segments(&self, tol: f64) -> usize {
        (0..self.segment_count())
            .filter(|&s| self.segment_length(s) <= tol)
            .count()
    }

    /// Point at `arclength` from the start, with its position.
    ///
    /// Arclengths outside `[0, length]` are clamped; on a cycle they wrap.
    /// Zero-length segments are never reported as the containing segment
    /// unless the whole polyline is degenerate.
    #[must_use]
    pub fn locate(&self, arclength: f64) -> Option<(Point3, PolylinePosition)> {
        let first = self.first()?;
        let segments = self.segment_count();
        let length = self.length();
        if segments == 0 || length <= 0.0 {
            return Some((first, PolylinePosition::default()));
        }

        let mut t = arclength;
        if self.is_cycle && !(0.0..=length).contains(&t) {
            t = t.rem_euclid(length);
        }
        let t = t.clamp(0.0, length);

        let below = self.cumulative.partition_point(|&c| c <= t);
        let mut segment = below.saturating_sub(1).min(segments - 1);
        while segment > 0 && self.segment_length(segment) <= 0.0 {
            segment -= 1;
        }

        let start = self.points[segment];
        let seg_len = self.segment_length(segment);
        let offset = (t - self.cumulative[segment]).clamp(0.0, seg_len);
        let point = if seg_len > 0.0 {
            start.lerp(self.points[segment + 1], offset / seg_len)
        } else {
            start
        };

        Some((
            point,
            PolylinePosition {
                segment,
                offset,
                arclength: t,
            },
        ))
    }
}

/// Counts gathered while extracting polylines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub border_vertices: usize,
    pub corner_vertices: usize,
    /// Border vertices with a single border edge (malformed input).
    pub dangling_vertices: usize,
    pub polylines: usize,
    pub cycles: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PolylineSet {
    pub polylines: Vec<Polyline>,
    pub stats: ExtractionStats,
}

impl PolylineSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.polylines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Splits the border of `mesh` into open polylines between corners and closed
/// cycles. Open polylines come first, in corner order, then cycles.
pub fn extract_polylines<M: BoundaryMesh + ?Sized>(
    mesh: &mut M,
    options: &ExtractOptions,
) -> PolylineSet {
    mesh.normalize_border();
    let border = mesh.border_edges();

    let mut neighbors: BTreeMap<VertexId, Vec<VertexId>> = BTreeMap::new();
    for &h in &border {
        let (s, t) = (mesh.source(h), mesh.target(h));
        neighbors.entry(s).or_default().push(t);
        neighbors.entry(t).or_default().push(s);
    }

    let mut stats = ExtractionStats {
        border_vertices: neighbors.len(),
        ..ExtractionStats::default()
    };

    let mut corners: BTreeSet<VertexId> = BTreeSet::new();
    for (&v, adjacent) in &neighbors {
        match adjacent.as_slice() {
            [_] => {
                warn!("border vertex {v} has a single border edge; treating it as a corner");
                stats.dangling_vertices += 1;
                corners.insert(v);
            }
            [a, b] => {
                if options.detect_sharp_corners
                    && is_sharp(mesh.point(*a), mesh.point(v), mesh.point(*b))
                {
                    corners.insert(v);
                }
            }
            _ => {
                corners.insert(v);
            }
        }
    }
    stats.corner_vertices = corners.len();

    let mut consumed: BTreeSet<HalfedgeId> = BTreeSet::new();
    let mut polylines = Vec::new();

    for &corner in &corners {
        for &incoming in mesh.halfedges_around(corner) {
            let out = mesh.opposite(incoming);
            if !mesh.is_border_edge(out) || consumed.contains(&mesh.canonical(out)) {
                continue;
            }
            let points = trace(mesh, out, &corners, &mut consumed);
            polylines.push(Polyline::new(points, false));
        }
    }
    stats.polylines = polylines.len();

    for &h in &border {
        if consumed.contains(&h) {
            continue;
        }
        let points = trace(mesh, h, &corners, &mut consumed);
        polylines.push(Polyline::new(points, true));
        stats.cycles += 1;
    }

    debug!(
        "extracted {} polylines and {} cycles from {} border edges",
        stats.polylines,
        stats.cycles,
        border.len()
    );

    PolylineSet { polylines, stats }
}

/// Angle at `v` between `a` and `b` is below 120°.
fn is_sharp(a: Point3, v: Point3, b: Point3) -> bool {
    let av = v - a;
    let bv = v - b;
    let dot = av.dot(bv);
    dot >= 0.0 || dot * dot < av.length_squared() * bv.length_squared() / 4.0
}

/// Follows border edges from `start` until a corner is reached or no unused
/// border edge leaves the current vertex.
fn trace<M: BoundaryMesh + ?Sized>(
    mesh: &M,
    start: HalfedgeId,
    corners: &BTreeSet<VertexId>,
    consumed: &mut BTreeSet<HalfedgeId>,
) -> Vec<Point3> {
    let mut points = vec![mesh.point(mesh.source(start))];
    let mut current = start;
    loop {
        consumed.insert(mesh.canonical(current));
        let v = mesh.target(current);
        points.push(mesh.point(v));
        if corners.contains(&v) {
            break;
        }
        let next = mesh
            .halfedges_around(v)
            .iter()
            .map(|&g| mesh.opposite(g))
            .find(|&out| mesh.is_border_edge(out) && !consumed.contains(&mesh.canonical(out)));
        match next {
            Some(out) => current = out,
            None => break,
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[[f64; 3]], is_cycle: bool) -> Polyline {
        Polyline::new(points.iter().copied().map(Point3::from).collect(), is_cycle)
    }

    #[test]
    fn test_length_and_locate() {
        let poly = line(&[[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [3.0, 4.0, 0.0]], false);
        assert!((poly.length() - 7.0).abs() < 1e-12);

        let (p, pos) = poly.locate(5.0).expect("non-empty");
        assert_eq!(pos.segment, 1);
        assert!((pos.offset - 2.0).abs() < 1e-12);
        assert!(p.distance_to(Point3::new(3.0, 2.0, 0.0)) < 1e-12);

        let (end, end_pos) = poly.locate(7.0).expect("non-empty");
        assert_eq!(end_pos.segment, 1);
        assert!(end.distance_to(Point3::new(3.0, 4.0, 0.0)) < 1e-12);
    }

    #[test]
    fn test_locate_skips_zero_length_segments() {
        let poly = line(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            false,
        );
        assert_eq!(poly.degenerate_segments(1e-9), 1);

        let (_, at_joint) = poly.locate(1.0).expect("non-empty");
        assert_eq!(at_joint.segment, 2);
        let (_, at_end) = poly.locate(2.0).expect("non-empty");
        assert_eq!(at_end.segment, 2);
    }

    #[test]
    fn test_locate_wraps_on_cycle() {
        let poly = line(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]],
            true,
        );
        let (p, pos) = poly.locate(4.5).expect("non-empty");
        assert!((pos.arclength - 0.5).abs() < 1e-12);
        assert!(p.distance_to(Point3::new(0.5, 0.0, 0.0)) < 1e-12);
    }

    #[test]
    fn test_sharp_angle_threshold() {
        let v = Point3::ORIGIN;
        // Straight continuation: 180°.
        assert!(!is_sharp(Point3::new(-1.0, 0.0, 0.0), v, Point3::new(1.0, 0.0, 0.0)));
        // Right angle.
        assert!(is_sharp(Point3::new(-1.0, 0.0, 0.0), v, Point3::new(0.0, 1.0, 0.0)));
        // 135°: not a corner.
        assert!(!is_sharp(Point3::new(-1.0, 0.0, 0.0), v, Point3::new(1.0, 1.0, 0.0)));
        // 110°: corner.
        let rad = 110.0_f64.to_radians();
        assert!(is_sharp(Point3::new(1.0, 0.0, 0.0), v, Point3::new(rad.cos(), rad.sin(), 0.0)));
    }
}
